//! 照合ティア定義
//!
//! 各ティアは `(正規化済みクエリ, 正規化済みエントリ)` に対する純粋なスコア関数。
//! `None` は不一致、`Some(weight)` は一致（小さいほど近い）。

use crate::dataset::ReferenceEntry;
use crate::normalizer;
use serde::Serialize;
use std::collections::HashSet;

/// 照合ティア（この順で試行する）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Tier {
    /// 生文字列の完全一致
    Exact,
    /// 正規化キーの一致
    Normalized,
    /// クエリのトークンがすべてエントリに含まれる
    TokenSubset,
    /// エントリのトークンがすべてクエリに含まれる（クエリ側に余分な説明がある）
    Desperate1,
    /// ベンダーと型番トークンのみで照合
    Desperate2,
    /// 正規化文字列の編集距離
    Desperate3,
}

impl Tier {
    pub const ALL: [Tier; 6] = [
        Tier::Exact,
        Tier::Normalized,
        Tier::TokenSubset,
        Tier::Desperate1,
        Tier::Desperate2,
        Tier::Desperate3,
    ];

    /// 結果の `hint` に出すコード
    pub fn hint(&self) -> &'static str {
        match self {
            Tier::Exact => "EXACT",
            Tier::Normalized => "NORMALIZED",
            Tier::TokenSubset => "TOKEN_SUBSET",
            Tier::Desperate1 => "DESPERATE_1",
            Tier::Desperate2 => "DESPERATE_2",
            Tier::Desperate3 => "DESPERATE_3",
        }
    }

    /// 曖昧一致のコード（`AMBIGUOUS_TOKEN_SUBSET` など）
    pub fn ambiguity_hint(&self) -> String {
        format!("AMBIGUOUS_{}", self.hint())
    }

    /// 型番トークンを持たないクエリには適用しないティア
    pub fn is_fuzzy(&self) -> bool {
        !matches!(self, Tier::Exact | Tier::Normalized)
    }

    /// このクエリに対して試行するか
    pub fn applies_to(&self, query: &QueryKey) -> bool {
        !self.is_fuzzy() || !query.model_tokens.is_empty()
    }

    /// エントリをスコアリング
    pub fn score(&self, query: &QueryKey, entry: &ReferenceEntry, max_edit_distance: usize) -> Option<u32> {
        match self {
            Tier::Exact => exact(query, entry),
            Tier::Normalized => normalized(query, entry),
            Tier::TokenSubset => token_subset(query, entry),
            Tier::Desperate1 => entry_subset(query, entry),
            Tier::Desperate2 => vendor_model(query, entry),
            Tier::Desperate3 => edit_distance(query, entry, max_edit_distance),
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hint())
    }
}

/// 照合用に前処理したクエリ
#[derive(Debug, Clone)]
pub struct QueryKey {
    pub raw: String,
    pub normalized: String,
    /// 重複なし、出現順
    pub tokens: Vec<String>,
    pub model_tokens: Vec<String>,
    pub vendor: Option<&'static str>,
    token_set: HashSet<String>,
}

impl QueryKey {
    pub fn new(raw: &str) -> Self {
        let normalized = normalizer::normalize(raw);
        let tokens = normalizer::unique_tokens(&normalized);
        let model_tokens = tokens
            .iter()
            .filter(|t| normalizer::is_model_token(t))
            .cloned()
            .collect();
        let vendor = normalizer::vendor_of(tokens.iter().map(|t| t.as_str()));
        let token_set = tokens.iter().cloned().collect();

        Self {
            raw: raw.to_string(),
            normalized,
            tokens,
            model_tokens,
            vendor,
            token_set,
        }
    }

    pub fn has_token(&self, token: &str) -> bool {
        self.token_set.contains(token)
    }

    /// エントリと共有するトークン数
    pub fn overlap(&self, entry: &ReferenceEntry) -> usize {
        entry.tokens().iter().filter(|t| self.has_token(t)).count()
    }
}

fn exact(query: &QueryKey, entry: &ReferenceEntry) -> Option<u32> {
    (query.raw == entry.raw_line).then_some(0)
}

fn normalized(query: &QueryKey, entry: &ReferenceEntry) -> Option<u32> {
    (query.normalized == entry.normalized_key).then_some(0)
}

/// weight = エントリ側の余分なトークン数
fn token_subset(query: &QueryKey, entry: &ReferenceEntry) -> Option<u32> {
    if query.tokens.is_empty() || query.tokens.len() > entry.tokens().len() {
        return None;
    }
    if !query.tokens.iter().all(|t| entry.has_token(t)) {
        return None;
    }
    Some((entry.tokens().len() - query.tokens.len()) as u32)
}

/// weight = クエリ側の余分なトークン数
fn entry_subset(query: &QueryKey, entry: &ReferenceEntry) -> Option<u32> {
    if entry.tokens().is_empty() || !entry.tokens().iter().all(|t| query.has_token(t)) {
        return None;
    }
    if !entry.tokens().iter().any(|t| normalizer::is_model_token(t)) {
        return None;
    }
    Some((query.tokens.len() - entry.tokens().len()) as u32)
}

/// weight = 両側の差分トークン数
fn vendor_model(query: &QueryKey, entry: &ReferenceEntry) -> Option<u32> {
    if query.model_tokens.is_empty() || query.model_tokens.len() > entry.tokens().len() {
        return None;
    }
    if !query.model_tokens.iter().all(|m| entry.has_token(m)) {
        return None;
    }
    if let Some(vendor) = query.vendor {
        if entry.vendor() != Some(vendor) {
            return None;
        }
    }
    let shared = query.overlap(entry);
    Some((query.tokens.len() + entry.tokens().len() - 2 * shared) as u32)
}

/// weight = レーベンシュタイン距離
fn edit_distance(query: &QueryKey, entry: &ReferenceEntry, max_distance: usize) -> Option<u32> {
    if query.normalized.is_empty() {
        return None;
    }
    let query_len = query.normalized.chars().count();
    let entry_len = entry.normalized_key.chars().count();
    if query_len.abs_diff(entry_len) > max_distance {
        return None;
    }
    let distance = strsim::levenshtein(&query.normalized, &entry.normalized_key);
    (distance <= max_distance).then_some(distance as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(raw: &str) -> ReferenceEntry {
        ReferenceEntry::new(raw, 1000, "1000", 2)
    }

    #[test]
    fn test_hint_codes() {
        let hints: Vec<&str> = Tier::ALL.iter().map(|t| t.hint()).collect();
        assert_eq!(
            hints,
            vec!["EXACT", "NORMALIZED", "TOKEN_SUBSET", "DESPERATE_1", "DESPERATE_2", "DESPERATE_3"]
        );
        assert_eq!(Tier::TokenSubset.ambiguity_hint(), "AMBIGUOUS_TOKEN_SUBSET");
    }

    #[test]
    fn test_exact_and_normalized() {
        let e = entry("Intel Celeron G5925 @ 3.60GHz");
        let q = QueryKey::new("Intel Celeron G5925 @ 3.60GHz");
        assert_eq!(Tier::Exact.score(&q, &e, 2), Some(0));

        let q = QueryKey::new("INTEL CELERON G5925 (3.6 GHz)");
        assert_eq!(Tier::Exact.score(&q, &e, 2), None);
        assert_eq!(Tier::Normalized.score(&q, &e, 2), Some(0));
    }

    #[test]
    fn test_token_subset_weight_counts_extra_entry_tokens() {
        let e = entry("Intel Core i7-7500U @ 2.70GHz");
        assert_eq!(Tier::TokenSubset.score(&QueryKey::new("Core i7-7500U"), &e, 2), Some(1));
        assert_eq!(Tier::TokenSubset.score(&QueryKey::new("i7 7500U Intel Core"), &e, 2), Some(0));
        assert_eq!(Tier::TokenSubset.score(&QueryKey::new("Intel Core i7-7500U vPro"), &e, 2), None);
    }

    #[test]
    fn test_entry_subset_tolerates_descriptive_query() {
        let e = entry("AMD Ryzen 7 5800X");
        let q = QueryKey::new("AMD Ryzen 7 5800X 8-Core Processor");
        assert_eq!(Tier::Desperate1.score(&q, &e, 2), Some(3));

        // 型番を共有しないエントリは対象外
        let generic = entry("AMD Ryzen");
        assert_eq!(Tier::Desperate1.score(&q, &generic, 2), None);
    }

    #[test]
    fn test_vendor_model_requires_same_vendor() {
        let q = QueryKey::new("Intel Pentium Dual T3200");
        assert!(Tier::Desperate2.score(&q, &entry("Pentium T3200 @ 2.00GHz"), 2).is_none());
        assert!(Tier::Desperate2.score(&q, &entry("Intel Pentium T3200 @ 2.00GHz"), 2).is_some());
        assert!(Tier::Desperate2.score(&q, &entry("AMD Something T3200"), 2).is_none());

        let q = QueryKey::new("Pentium T4500");
        assert_eq!(Tier::Desperate2.score(&q, &entry("Intel Pentium T4500 @ 2.30GHz"), 2), Some(1));
    }

    #[test]
    fn test_edit_distance_is_bounded() {
        let e = entry("Intel Celeron G5925");
        assert_eq!(Tier::Desperate3.score(&QueryKey::new("Intel Celeron G5952"), &e, 2), Some(2));
        assert_eq!(Tier::Desperate3.score(&QueryKey::new("Intel Celeron G5905T"), &e, 1), None);
    }

    #[test]
    fn test_fuzzy_tiers_need_model_token() {
        let q = QueryKey::new("Totally Unknown Processor XYZ");
        assert!(q.model_tokens.is_empty());
        assert!(Tier::Normalized.applies_to(&q));
        assert!(!Tier::TokenSubset.applies_to(&q));
        assert!(!Tier::Desperate3.applies_to(&q));
    }

    #[test]
    fn test_query_tokens_are_deduplicated_in_order() {
        let q = QueryKey::new("Intel Core i5 Intel i5 3380M");
        assert_eq!(q.tokens, vec!["intel", "core", "i5", "3380m"]);
        assert!(q.has_token("3380m"));
        assert!(!q.has_token("xeon"));
        assert_eq!(q.overlap(&entry("Intel Core i5-3380M @ 2.90GHz")), 4);
    }

    #[test]
    fn test_long_query_scores_quickly() {
        let raw: String = (0..40_000).map(|i| format!("tok{} ", i)).collect();
        let started = std::time::Instant::now();
        let q = QueryKey::new(&raw);
        assert_eq!(q.tokens.len(), 40_000);

        let e = entry("Intel Core i5-3380M @ 2.90GHz");
        for tier in Tier::ALL {
            assert_eq!(tier.score(&q, &e, 2), None);
        }
        assert_eq!(q.overlap(&e), 0);
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
    }
}
