//! マークデータディレクトリの管理
//!
//! `cpumarks.csv` は通常 `cpumarks-YYYYMMDD.HHMMSS.csv` へのシンボリックリンク。
//! 複数世代のCSVが同じディレクトリに共存する。

use crate::config::DEFAULT_CSV_NAME;
use crate::error::{CpuMarkError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 世代付きCSVの接頭辞
const VERSIONED_PREFIX: &str = "cpumarks-";

/// 現在のマークデータの情報
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarksDataInfo {
    pub project_version: String,
    /// cpumarks.csv のパス
    pub csv_symlink: Option<String>,
    /// リンク先（相対名）。リンクでなければ null
    pub csv_target: Option<String>,
    pub csv_file: Option<String>,
    pub csv_basename: Option<String>,
    /// 更新日時（UNIX秒）
    pub csv_modified_time: Option<i64>,
    pub csv_modified_iso: Option<String>,
    /// ヘッダーを除いた行数
    pub total_cpus: Option<usize>,
    /// 監査用のファイルハッシュ
    pub csv_sha256: Option<String>,
}

/// ディレクトリ内のCSV世代
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetVersion {
    pub file_name: String,
    pub path: PathBuf,
    pub size: u64,
    /// cpumarks.csv が指している世代か
    pub is_current: bool,
}

/// 現在のマークデータの情報を取得
pub fn version_info(marksdata_dir: &Path) -> MarksDataInfo {
    let mut info = MarksDataInfo {
        project_version: env!("CARGO_PKG_VERSION").to_string(),
        ..Default::default()
    };

    let csv_link = marksdata_dir.join(DEFAULT_CSV_NAME);
    info.csv_symlink = Some(csv_link.display().to_string());

    let csv_file = match std::fs::symlink_metadata(&csv_link) {
        Ok(meta) if meta.file_type().is_symlink() => {
            let target = match std::fs::read_link(&csv_link) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!(link = %csv_link.display(), error = %e, "cannot read symlink");
                    return info;
                }
            };
            let target_name = target.display().to_string();
            info.csv_target = Some(target_name.clone());
            info.csv_basename = Some(target_name);
            marksdata_dir.join(target)
        }
        Ok(meta) if meta.is_file() => {
            info.csv_basename = Some(DEFAULT_CSV_NAME.to_string());
            csv_link.clone()
        }
        _ => return info,
    };
    info.csv_file = Some(csv_file.display().to_string());

    if let Ok(modified) = std::fs::metadata(&csv_file).and_then(|m| m.modified()) {
        let local: chrono::DateTime<chrono::Local> = modified.into();
        info.csv_modified_time = Some(local.timestamp());
        info.csv_modified_iso = Some(local.format("%Y-%m-%d %H:%M:%S").to_string());
    }

    match std::fs::read(&csv_file) {
        Ok(bytes) => {
            let lines = String::from_utf8_lossy(&bytes).lines().count();
            info.total_cpus = Some(lines.saturating_sub(1));
            info.csv_sha256 = Some(hex::encode(Sha256::digest(&bytes)));
        }
        Err(e) => {
            tracing::warn!(file = %csv_file.display(), error = %e, "cannot read marks file");
        }
    }

    info
}

/// ディレクトリ内の世代付きCSVを名前順（= 時系列順）に列挙
pub fn list_datasets(marksdata_dir: &Path) -> Result<Vec<DatasetVersion>> {
    if !marksdata_dir.is_dir() {
        return Err(CpuMarkError::NoDatasetFound(marksdata_dir.display().to_string()));
    }

    let current = std::fs::read_link(marksdata_dir.join(DEFAULT_CSV_NAME))
        .ok()
        .and_then(|t| t.file_name().map(|n| n.to_string_lossy().to_string()));

    let mut versions = Vec::new();

    for entry in WalkDir::new(marksdata_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();
        if !is_versioned_name(&file_name) {
            continue;
        }

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        versions.push(DatasetVersion {
            is_current: current.as_deref() == Some(file_name.as_str()),
            file_name,
            path: entry.path().to_path_buf(),
            size,
        });
    }

    versions.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    Ok(versions)
}

fn is_versioned_name(name: &str) -> bool {
    name.starts_with(VERSIONED_PREFIX) && name.ends_with(".csv")
}
