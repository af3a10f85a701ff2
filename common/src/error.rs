//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    /// 参照CSVが存在しない・読めない・有効な行がない
    #[error("Dataset unreadable: {path}: {reason}")]
    DatasetUnreadable { path: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn unreadable(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::DatasetUnreadable {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
