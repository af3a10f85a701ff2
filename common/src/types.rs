//! 照合結果の型定義
//!
//! 下流（API層・監査ツール）に渡す唯一の出力レコード。

use crate::dataset::ReferenceEntry;
use serde::{Deserialize, Serialize};

/// 全ティアで一意な候補が得られなかった
pub const NOT_FOUND: &str = "NOT_FOUND";

/// CPU名の照合結果
///
/// `mark` はCSVの表記を保つため文字列。失敗時は `mark`/`linenum`/`line` が `null`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResult {
    pub error: bool,
    pub mark: Option<String>,
    pub cpustr: String,
    /// 一致したティア名、または失敗コード
    pub hint: String,
    pub cpuscsv: String,
    pub linenum: Option<String>,
    pub line: Option<String>,
    /// 失敗時の近似候補（照合ルール調整用）
    pub details: Vec<String>,
}

impl LookupResult {
    pub fn matched(cpustr: &str, cpuscsv: &str, hint: &str, entry: &ReferenceEntry) -> Self {
        Self {
            error: false,
            mark: Some(entry.mark_text.clone()),
            cpustr: cpustr.to_string(),
            hint: hint.to_string(),
            cpuscsv: cpuscsv.to_string(),
            linenum: Some(entry.source_line_number.to_string()),
            line: Some(entry.raw_line.clone()),
            details: Vec::new(),
        }
    }

    pub fn failed(cpustr: &str, cpuscsv: &str, hint: &str, details: Vec<String>) -> Self {
        Self {
            error: true,
            mark: None,
            cpustr: cpustr.to_string(),
            hint: hint.to_string(),
            cpuscsv: cpuscsv.to_string(),
            linenum: None,
            line: None,
            details,
        }
    }

    /// マークを数値で取得（カンマ区切りも許容）
    pub fn mark_value(&self) -> Option<u64> {
        self.mark.as_ref().and_then(|m| m.replace(',', "").parse().ok())
    }

    pub fn is_match(&self) -> bool {
        !self.error
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
