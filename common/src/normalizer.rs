//! CPU名の正規化モジュール
//!
//! 棚卸しデータ・ベンチマークサイトの表記揺れを吸収し、比較可能な形に揃える。
//!
//! ## 処理フロー（この順序で固定）
//! 1. 小文字化
//! 2. クロック周波数表記の除去（`@ 3.60GHz`, `(3.6 GHz)`, `2.70 GHz`）
//! 3. 区切り文字（空白・ハイフン・スラッシュ・カンマ等）を単一スペースに統一
//! 4. 商標記号などのノイズ除去（`Intel`/`AMD`/`Celeron`/`Ryzen` 等は残す）
//! 5. 前後の空白除去
//!
//! 参照データの読み込み時と照合時で必ず同じ関数を使うこと。

use regex::{Captures, Regex};
use std::collections::HashSet;

/// ベンダートークン（ティア判定で使用）
pub const VENDOR_TOKENS: &[&str] = &["intel", "amd"];

/// 型番の識別に寄与しないトークン
const NOISE_TOKENS: &[&str] = &["cpu"];

lazy_static::lazy_static! {
    // (3.6 GHz)
    static ref PAREN_CLOCK_RE: Regex =
        Regex::new(r"\(\s*@?\s*\d+(?:\.\d+)?\s*ghz\s*\)").unwrap();
    // @ 3.60GHz
    static ref AT_CLOCK_RE: Regex =
        Regex::new(r"@[\s\-/,;_]*\d+(?:\.\d+)?[\s\-/,;_]*ghz").unwrap();
    // 2.70 GHz
    static ref BARE_CLOCK_RE: Regex =
        Regex::new(r"\b\d+(?:\.\d+)?[\s\-/,;_]*ghz\b").unwrap();
    static ref SEPARATOR_RE: Regex = Regex::new(r"[\s\-/,;_@]+").unwrap();
    static ref BRACKET_RE: Regex = Regex::new(r"[()\[\]{}]").unwrap();
    // 商標記号と直後の1文字: `core(tm)2` → `core2`, `intel(r)core` → `intel core`
    static ref NOISE_MARKER_RE: Regex =
        Regex::new(r"(?:\(r\)|\(tm\)|\(c\)|®|™|©)(\p{Alphabetic}?)").unwrap();
}

/// CPU名を正規化する
///
/// 失敗しない。最悪の場合は空文字列を返す。
/// パイプラインを不動点まで繰り返すので `normalize(normalize(x)) == normalize(x)`。
///
/// 2パス目以降の各パスは文字数か非空白文字数を必ず減らすため、反復は有限回で止まる。
pub fn normalize(raw: &str) -> String {
    let mut current = normalize_pass(raw);
    loop {
        let next = normalize_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_pass(raw: &str) -> String {
    // 1. 小文字化
    let mut result = raw.to_lowercase();

    // 2. クロック周波数
    result = strip_clock_speed(&result);

    // 3. 区切り文字
    result = SEPARATOR_RE.replace_all(&result, " ").into_owned();

    // 4. ノイズ
    result = strip_noise(&result);

    // 5. 空白の整理
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// クロック周波数表記を除去
fn strip_clock_speed(text: &str) -> String {
    let result = PAREN_CLOCK_RE.replace_all(text, " ");
    let result = AT_CLOCK_RE.replace_all(&result, " ");
    BARE_CLOCK_RE.replace_all(&result, " ").into_owned()
}

/// 商標記号・ノイズトークンを除去
///
/// 記号の直後が英字なら区切りとして空白に、それ以外はその場で削除する。
fn strip_noise(text: &str) -> String {
    let result = NOISE_MARKER_RE.replace_all(text, |caps: &Captures| match &caps[1] {
        "" => String::new(),
        letter => format!(" {}", letter),
    });
    let result = BRACKET_RE.replace_all(&result, " ");

    result
        .split_whitespace()
        .filter(|t| !NOISE_TOKENS.contains(t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// 重複を除いたトークン（出現順）
pub fn unique_tokens(normalized: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    normalized
        .split_whitespace()
        .filter(|t| seen.insert(*t))
        .map(str::to_string)
        .collect()
}

/// 型番トークンか判定（数字を含む3文字以上: `g5925`, `3600`, `7500u`）
pub fn is_model_token(token: &str) -> bool {
    token.chars().count() >= 3 && token.chars().any(|c| c.is_ascii_digit())
}

/// トークン列からベンダーを取得
pub fn vendor_of<'a, I>(tokens: I) -> Option<&'static str>
where
    I: IntoIterator<Item = &'a str>,
{
    tokens
        .into_iter()
        .find_map(|t| VENDOR_TOKENS.iter().find(|v| **v == t).copied())
}
