//! エラーケーステスト
//!
//! 運用エラー（データセット不可読）と照合結果としての失敗を区別できることを検証

use cpumark::error::CpuMarkError;
use cpumark::{marksdata, regression};
use cpumark_common::{DatasetHandle, DatasetOptions, Error};
use std::path::Path;
use tempfile::tempdir;

/// 存在しないCSVはデータセット不可読
#[test]
fn test_missing_csv_is_dataset_unreadable() {
    let err: CpuMarkError = DatasetHandle::open(Path::new("/nonexistent/path/12345/cpumarks.csv"), DatasetOptions::default())
        .err()
        .unwrap()
        .into();

    assert!(err.is_dataset_unreadable());
    assert!(matches!(err, CpuMarkError::Common(Error::DatasetUnreadable { .. })));
}

/// マークデータのディレクトリがない場合
#[test]
fn test_list_datasets_missing_dir() {
    let err = marksdata::list_datasets(Path::new("/nonexistent/path/12345")).unwrap_err();
    assert!(matches!(err, CpuMarkError::NoDatasetFound(_)));
    assert!(err.is_dataset_unreadable());
}

#[test]
fn test_missing_history_file() {
    let err = regression::load_history(Path::new("/nonexistent/history.json")).unwrap_err();
    assert!(matches!(err, CpuMarkError::FileNotFound(_)));
    assert!(!err.is_dataset_unreadable());
}

#[test]
fn test_invalid_history_json() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("history.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = regression::load_history(&path).unwrap_err();
    assert!(matches!(err, CpuMarkError::HistoryParse(_)));
}

/// CpuMarkErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        CpuMarkError::Config("テスト設定エラー".to_string()),
        CpuMarkError::FileNotFound("history.json".to_string()),
        CpuMarkError::NoDatasetFound("marksdata".to_string()),
        CpuMarkError::HistoryParse("bad".to_string()),
    ];

    for err in errors {
        let msg = err.to_string();
        assert!(!msg.is_empty());
    }

    let common: CpuMarkError = Error::unreadable("cpumarks.csv", "no parseable rows").into();
    assert_eq!(common.to_string(), "Dataset unreadable: cpumarks.csv: no parseable rows");
}

/// io::ErrorからCpuMarkErrorへの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: CpuMarkError = io_err.into();
    assert!(matches!(err, CpuMarkError::Io(_)));
}
