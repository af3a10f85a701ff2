//! 参照データセットモジュール
//!
//! ベンチマークサイト由来のCSV（CPU名とマーク）を読み込み、
//! 照合用のインデックスを構築する。読み込み後は不変。

use crate::error::{Error, Result};
use crate::normalizer;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// 名前列の候補（大文字小文字は無視）
const NAME_COLUMNS: &[&str] = &["name", "cpuname", "cpu name"];
/// マーク列の候補
const MARK_COLUMNS: &[&str] = &["cpumark", "cpu mark", "mark"];
/// 個別に警告を出す不正行の数
const MALFORMED_WARN_LIMIT: usize = 5;

/// CSVの1行に対応するエントリ
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceEntry {
    /// CSVに書かれたCPU名そのもの
    pub raw_line: String,
    /// 正規化済みキー
    pub normalized_key: String,
    pub mark: u64,
    /// 出力用にCSVの表記を保持
    pub mark_text: String,
    /// CSV上の行番号（1始まり、ヘッダーが1行目）
    pub source_line_number: usize,
    #[serde(skip)]
    tokens: Vec<String>,
}

impl ReferenceEntry {
    pub fn new(raw_line: &str, mark: u64, mark_text: &str, source_line_number: usize) -> Self {
        let normalized_key = normalizer::normalize(raw_line);
        let tokens = normalizer::unique_tokens(&normalized_key);

        Self {
            raw_line: raw_line.to_string(),
            normalized_key,
            mark,
            mark_text: mark_text.to_string(),
            source_line_number,
            tokens,
        }
    }

    /// 正規化済みトークン（重複なし、出現順）
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn has_token(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    pub fn vendor(&self) -> Option<&'static str> {
        normalizer::vendor_of(self.tokens.iter().map(|t| t.as_str()))
    }
}

/// 読み込みオプション
#[derive(Debug, Clone, Default)]
pub struct DatasetOptions {
    /// 空でなければ、いずれかを名前に含む行のみ残す
    pub vendors: Vec<String>,
}

/// 読み込み時に捨てた行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedRow {
    pub line: usize,
    pub reason: String,
}

/// 読み込み結果の統計
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    /// ヘッダー・空行を除いたデータ行数
    pub total_rows: usize,
    pub retained: usize,
    /// ベンダーフィルタで除外した行数
    pub filtered: usize,
    pub malformed: Vec<MalformedRow>,
}

/// 参照データセット全体
#[derive(Debug, Clone)]
pub struct ReferenceDataset {
    /// 読み込み順
    entries: Vec<ReferenceEntry>,
    /// raw_line → エントリ位置
    by_raw: HashMap<String, Vec<usize>>,
    /// normalized_key → エントリ位置
    by_key: HashMap<String, Vec<usize>>,
    /// 結果の `cpuscsv` に返すファイル名
    source_name: String,
    report: LoadReport,
}

impl ReferenceDataset {
    /// CSVファイルから読み込み
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with(path, &DatasetOptions::default())
    }

    pub fn load_with(path: &Path, options: &DatasetOptions) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| Error::unreadable(path.display().to_string(), e.to_string()))?;
        let content = String::from_utf8_lossy(&bytes);

        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let dataset = Self::from_csv_str(&content, &source_name, options)?;
        tracing::info!(
            path = %path.display(),
            entries = dataset.len(),
            malformed = dataset.report.malformed.len(),
            filtered = dataset.report.filtered,
            "dataset loaded"
        );
        Ok(dataset)
    }

    /// CSV文字列から読み込み
    pub fn from_csv_str(content: &str, source_name: &str, options: &DatasetOptions) -> Result<Self> {
        let layout = detect_layout(content)
            .map_err(|reason| Error::unreadable(source_name, reason))?;

        let vendors: Vec<String> = options.vendors.iter().map(|v| v.to_lowercase()).collect();
        let mut entries = Vec::new();
        let mut report = LoadReport::default();

        for (idx, line) in content.lines().enumerate() {
            let line_number = idx + 1;
            if Some(line_number) == layout.header_line || line.trim().is_empty() {
                continue;
            }
            report.total_rows += 1;

            let fields = parse_csv_line(line, layout.delimiter);
            let entry = match parse_row(&fields, &layout, line_number) {
                Ok(entry) => entry,
                Err(reason) => {
                    if report.malformed.len() < MALFORMED_WARN_LIMIT {
                        tracing::warn!(line = line_number, %reason, "dropping malformed row");
                    } else {
                        tracing::debug!(line = line_number, %reason, "dropping malformed row");
                    }
                    report.malformed.push(MalformedRow { line: line_number, reason });
                    continue;
                }
            };

            if !vendors.is_empty() {
                let lower = entry.raw_line.to_lowercase();
                if !vendors.iter().any(|v| lower.contains(v.as_str())) {
                    report.filtered += 1;
                    continue;
                }
            }

            entries.push(entry);
        }

        if entries.is_empty() {
            return Err(Error::unreadable(source_name, "no parseable rows"));
        }
        report.retained = entries.len();

        Ok(Self::from_entries(source_name, entries, report))
    }

    /// エントリ列から構築（インデックスはここで一度だけ作る）
    pub fn from_entries(source_name: &str, entries: Vec<ReferenceEntry>, report: LoadReport) -> Self {
        let mut by_raw: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_key: HashMap<String, Vec<usize>> = HashMap::new();

        for (idx, entry) in entries.iter().enumerate() {
            let same_raw = by_raw.entry(entry.raw_line.clone()).or_default();
            if !same_raw.is_empty() {
                tracing::debug!(line = entry.source_line_number, raw = %entry.raw_line, "duplicate raw line");
            }
            same_raw.push(idx);
            by_key.entry(entry.normalized_key.clone()).or_default().push(idx);
        }

        Self {
            entries,
            by_raw,
            by_key,
            source_name: source_name.to_string(),
            report,
        }
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn entry(&self, idx: usize) -> &ReferenceEntry {
        &self.entries[idx]
    }

    /// raw_line が完全一致するエントリ位置（読み込み順）
    pub fn find_raw(&self, raw: &str) -> &[usize] {
        self.by_raw.get(raw).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// 正規化キーが一致するエントリ位置（読み込み順）
    pub fn find_normalized(&self, key: &str) -> &[usize] {
        self.by_key.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 列配置
#[derive(Debug, Clone, PartialEq)]
struct CsvLayout {
    delimiter: char,
    header_line: Option<usize>,
    name_col: usize,
    mark_col: usize,
}

/// 先頭行からヘッダーの有無と区切り文字を判定
fn detect_layout(content: &str) -> std::result::Result<CsvLayout, String> {
    let (idx, first) = content
        .lines()
        .enumerate()
        .find(|(_, l)| !l.trim().is_empty())
        .ok_or_else(|| "empty file".to_string())?;

    let delimiter = if first.contains(';') { ';' } else { ',' };
    let columns: Vec<String> = parse_csv_line(first, delimiter)
        .iter()
        .map(|c| c.trim().to_lowercase())
        .collect();

    let find_column = |candidates: &[&str]| {
        candidates
            .iter()
            .find_map(|c| columns.iter().position(|col| col == c))
    };
    let name_col = find_column(NAME_COLUMNS);
    let mark_col = find_column(MARK_COLUMNS);

    match (name_col, mark_col) {
        (Some(name_col), Some(mark_col)) => Ok(CsvLayout {
            delimiter,
            header_line: Some(idx + 1),
            name_col,
            mark_col,
        }),
        (Some(_), None) => Err("unable to guess which column has the mark of the CPU".into()),
        (None, Some(_)) => Err("unable to guess which column has the name of the CPU".into()),
        (None, None) => Ok(CsvLayout {
            delimiter,
            header_line: None,
            name_col: 0,
            mark_col: 1,
        }),
    }
}

fn parse_row(
    fields: &[String],
    layout: &CsvLayout,
    line_number: usize,
) -> std::result::Result<ReferenceEntry, String> {
    let name = fields
        .get(layout.name_col)
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .ok_or_else(|| "missing CPU name".to_string())?;

    let mark_text = fields
        .get(layout.mark_col)
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .ok_or_else(|| "missing mark".to_string())?;

    let digits = mark_text.replace(',', "");
    if !digits.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(format!("non-numeric mark: {}", mark_text));
    }
    let mark: u64 = digits
        .parse()
        .map_err(|_| format!("non-numeric mark: {}", mark_text))?;

    Ok(ReferenceEntry::new(name, mark, mark_text, line_number))
}

/// CSV行をパース（ダブルクォート対応、`""` はエスケープされた引用符）
fn parse_csv_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => {
                fields.push(std::mem::take(&mut field));
            }
            _ => field.push(c),
        }
    }
    fields.push(field);

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEMICOLON_CSV: &str = "name;cores;cpumark;thread;tdp;socket;cat
Intel Celeron G5925 @ 3.60GHz;2;2808;2360;58;FCLGA1200;Desktop
AMD Ryzen 5 3600;6;17780;2574;65;AM4;Desktop
ARM Cortex-A53;4;1200;400;;;Mobile
";

    #[test]
    fn test_load_semicolon_csv_with_header() {
        let dataset = ReferenceDataset::from_csv_str(SEMICOLON_CSV, "cpumarks.csv", &DatasetOptions::default()).unwrap();
        assert_eq!(dataset.len(), 3);

        let first = dataset.entry(0);
        assert_eq!(first.raw_line, "Intel Celeron G5925 @ 3.60GHz");
        assert_eq!(first.normalized_key, "intel celeron g5925");
        assert_eq!(first.mark, 2808);
        assert_eq!(first.source_line_number, 2);
        assert_eq!(dataset.entry(2).source_line_number, 4);
    }

    #[test]
    fn test_load_headerless_comma_csv() {
        let csv = "\"Intel Celeron G5925 @ 3.60GHz\",2808\n\"AMD PRO A10-8730B R5, 10 COMPUTE CORES 4C+6G\",3361\n";
        let dataset = ReferenceDataset::from_csv_str(csv, "x.csv", &DatasetOptions::default()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.entry(0).source_line_number, 1);
        assert_eq!(dataset.entry(1).raw_line, "AMD PRO A10-8730B R5, 10 COMPUTE CORES 4C+6G");
        assert_eq!(dataset.entry(1).mark, 3361);
    }

    #[test]
    fn test_malformed_rows_are_dropped_and_reported() {
        let csv = "name;cpumark
Intel Core i3-2100 @ 3.10GHz;1500
Intel Core i5-2400 @ 3.10GHz;n/a
;1234
Intel Core i7-2600 @ 3.40GHz
Intel Core i7-3770 @ 3.40GHz;-5
Intel Core i7-4770 @ 3.40GHz;7,003
";
        let dataset = ReferenceDataset::from_csv_str(csv, "x.csv", &DatasetOptions::default()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.entry(1).mark, 7003);
        assert_eq!(dataset.entry(1).mark_text, "7,003");

        let report = dataset.report();
        assert_eq!(report.total_rows, 6);
        assert_eq!(report.retained, 2);
        let lines: Vec<usize> = report.malformed.iter().map(|m| m.line).collect();
        assert_eq!(lines, vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_signed_mark_is_malformed() {
        let csv = "name;cpumark
Intel Core i3-2100 @ 3.10GHz;+1500
AMD Ryzen 5 3600;17780
Intel Core i5-2400 @ 3.10GHz; +3200
";
        let dataset = ReferenceDataset::from_csv_str(csv, "x.csv", &DatasetOptions::default()).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.entry(0).mark_text, "17780");

        let report = dataset.report();
        let lines: Vec<usize> = report.malformed.iter().map(|m| m.line).collect();
        assert_eq!(lines, vec![2, 4]);
        assert!(report.malformed[0].reason.contains("+1500"));
    }

    #[test]
    fn test_no_parseable_rows_is_unreadable() {
        let csv = "name;cpumark\nfoo;bar\n";
        let err = ReferenceDataset::from_csv_str(csv, "x.csv", &DatasetOptions::default()).unwrap_err();
        assert!(matches!(err, Error::DatasetUnreadable { .. }));

        let err = ReferenceDataset::from_csv_str("", "x.csv", &DatasetOptions::default()).unwrap_err();
        assert!(matches!(err, Error::DatasetUnreadable { .. }));
    }

    #[test]
    fn test_missing_mark_column_is_unreadable() {
        let csv = "name;cores\nIntel Core i3-2100;2\n";
        let err = ReferenceDataset::from_csv_str(csv, "x.csv", &DatasetOptions::default()).unwrap_err();
        match err {
            Error::DatasetUnreadable { reason, .. } => assert!(reason.contains("mark")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_vendor_filter() {
        let options = DatasetOptions {
            vendors: vec!["Intel".into(), "AMD".into()],
        };
        let dataset = ReferenceDataset::from_csv_str(SEMICOLON_CSV, "x.csv", &options).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.report().filtered, 1);
        assert!(dataset.report().malformed.is_empty());
    }

    #[test]
    fn test_indexes_keep_load_order_with_duplicates() {
        let csv = "AMD Ryzen 5 3600,12500\nAMD Ryzen 5 3600,12480\n";
        let dataset = ReferenceDataset::from_csv_str(csv, "x.csv", &DatasetOptions::default()).unwrap();
        assert_eq!(dataset.find_raw("AMD Ryzen 5 3600"), &[0, 1]);
        assert_eq!(dataset.find_normalized("amd ryzen 5 3600"), &[0, 1]);
        assert!(dataset.find_raw("AMD Ryzen 7 3700X").is_empty());
    }

    #[test]
    fn test_load_missing_file_is_unreadable() {
        let err = ReferenceDataset::load(Path::new("/nonexistent/cpumarks-20250101.000000.csv")).unwrap_err();
        assert!(matches!(err, Error::DatasetUnreadable { .. }));
    }

    #[test]
    fn test_entry_tokens_dedup() {
        let entry = ReferenceEntry::new("Intel Xeon Xeon E5-2680", 100, "100", 2);
        assert_eq!(entry.tokens(), &["intel", "xeon", "e5", "2680"]);
        assert_eq!(entry.vendor(), Some("intel"));
    }

    #[test]
    fn test_parse_csv_line_quotes() {
        assert_eq!(parse_csv_line("\"a,b\",1", ','), vec!["a,b", "1"]);
        assert_eq!(parse_csv_line("a;\"say \"\"hi\"\"\";2", ';'), vec!["a", "say \"hi\"", "2"]);
        assert_eq!(parse_csv_line("a;;", ';'), vec!["a", "", ""]);
    }
}
