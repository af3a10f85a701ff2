use crate::error::{CpuMarkError, Result};
use cpumark_common::{DatasetOptions, ResolverOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 既定のマークデータ（タイムスタンプ付きCSVへのシンボリックリンク）
pub const DEFAULT_CSV_NAME: &str = "cpumarks.csv";

/// 環境変数でCSVを指定
pub const CSV_ENV: &str = "CPUMARK_CSV";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// cpumarks.csv を置くディレクトリ
    pub marksdata_dir: Option<PathBuf>,
    pub strict: bool,
    pub details_limit: usize,
    pub max_edit_distance: usize,
    /// 空でなければ名前にいずれかを含む行のみ読み込む
    pub vendors: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            marksdata_dir: None,
            strict: false,
            details_limit: 5,
            max_edit_distance: 2,
            vendors: Vec::new(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// 読み込めなければ既定値（照合は設定ファイルの不備で止めない）
    pub fn load_or_default() -> Self {
        Self::or_default(Self::load())
    }

    fn or_default(loaded: Result<Self>) -> Self {
        loaded.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "config unreadable, using defaults");
            Self::default()
        })
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CpuMarkError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("cpumark").join("config.json"))
    }

    /// マークデータのディレクトリ（未設定ならカレントの marksdata/）
    pub fn marksdata_dir(&self) -> PathBuf {
        self.marksdata_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("marksdata"))
    }

    /// 照合に使うCSV: 引数 > 環境変数 > marksdata_dir/cpumarks.csv
    pub fn dataset_path(&self, cli_override: Option<&Path>) -> PathBuf {
        if let Some(path) = cli_override {
            return path.to_path_buf();
        }
        if let Ok(path) = std::env::var(CSV_ENV) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }
        self.marksdata_dir().join(DEFAULT_CSV_NAME)
    }

    pub fn set_marksdata_dir(&mut self, dir: PathBuf) -> Result<()> {
        self.marksdata_dir = Some(dir);
        self.save()
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            strict: self.strict,
            details_limit: self.details_limit,
            max_edit_distance: self.max_edit_distance,
        }
    }

    pub fn dataset_options(&self) -> DatasetOptions {
        DatasetOptions {
            vendors: self.vendors.clone(),
        }
    }
}
