//! CPU Mark Common Library
//!
//! CPU名からベンチマーク指標（マーク）を引く照合コア。
//! 正規化 → 参照データセット → ティア照合 → 結果レコード

pub mod error;
pub mod normalizer;
pub mod dataset;
pub mod tier;
pub mod resolver;
pub mod types;
pub mod handle;

pub use error::{Error, Result};
pub use normalizer::normalize;
pub use dataset::{DatasetOptions, LoadReport, MalformedRow, ReferenceDataset, ReferenceEntry};
pub use tier::{QueryKey, Tier};
pub use resolver::{lookup, Resolver, ResolverOptions};
pub use types::{LookupResult, NOT_FOUND};
pub use handle::DatasetHandle;
