use thiserror::Error;

#[derive(Error, Debug)]
pub enum CpuMarkError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("マークデータが見つかりません: {0}")]
    NoDatasetFound(String),

    #[error("履歴ファイルが不正: {0}")]
    HistoryParse(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] cpumark_common::Error),
}

impl CpuMarkError {
    /// マークデータが読めないエラーか（終了コード判定用）
    pub fn is_dataset_unreadable(&self) -> bool {
        matches!(
            self,
            CpuMarkError::NoDatasetFound(_)
                | CpuMarkError::Common(cpumark_common::Error::DatasetUnreadable { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, CpuMarkError>;
