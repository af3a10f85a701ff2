//! データセットの共有ハンドル
//!
//! 読み込み済みデータセットを `Arc` で共有し、再読み込み時は新しいインスタンスを
//! 作ってから参照を差し替える。照合中のスレッドは常に一つのスナップショットを見る。

use crate::dataset::{DatasetOptions, ReferenceDataset};
use crate::error::Result;
use crate::resolver::Resolver;
use crate::types::LookupResult;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

struct Loaded {
    dataset: Arc<ReferenceDataset>,
    modified: Option<SystemTime>,
}

pub struct DatasetHandle {
    path: PathBuf,
    options: DatasetOptions,
    current: RwLock<Loaded>,
}

impl DatasetHandle {
    /// CSVを読み込んでハンドルを作る
    pub fn open(path: &Path, options: DatasetOptions) -> Result<Self> {
        let modified = modified_time(path);
        let dataset = ReferenceDataset::load_with(path, &options)?;

        Ok(Self {
            path: path.to_path_buf(),
            options,
            current: RwLock::new(Loaded {
                dataset: Arc::new(dataset),
                modified,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 現在のスナップショット
    pub fn snapshot(&self) -> Arc<ReferenceDataset> {
        Arc::clone(&self.current.read().dataset)
    }

    pub fn lookup(&self, resolver: &Resolver, cpustr: &str) -> LookupResult {
        let dataset = self.snapshot();
        resolver.lookup(cpustr, &dataset)
    }

    /// 再読み込みして差し替える。失敗時は以前のスナップショットを保持
    pub fn reload(&self) -> Result<Arc<ReferenceDataset>> {
        let modified = modified_time(&self.path);
        let dataset = Arc::new(ReferenceDataset::load_with(&self.path, &self.options)?);

        let mut current = self.current.write();
        current.dataset = Arc::clone(&dataset);
        current.modified = modified;
        tracing::info!(path = %self.path.display(), entries = dataset.len(), "dataset reloaded");

        Ok(dataset)
    }

    /// 更新日時が変わっていれば再読み込み
    pub fn reload_if_changed(&self) -> Result<bool> {
        let modified = modified_time(&self.path);
        if modified == self.current.read().modified {
            return Ok(false);
        }
        self.reload()?;
        Ok(true)
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
