//! ティア照合エンジン
//!
//! `EXACT` → `NORMALIZED` → `TOKEN_SUBSET` → `DESPERATE_*` の順に試行し、
//! 最初に一意な候補を得たティアを `hint` として返す。
//!
//! ## 候補が複数の場合
//! 1. ティアのweightが最小のグループに絞る
//! 2. strict: 2件以上なら曖昧として次のティアへ
//! 3. 通常: マークが最大のエントリを選ぶ（同一シリコンの計測ぶれ）
//! 4. それでも複数かつ正規化キーが異なれば曖昧として次のティアへ
//!
//! 反復はすべてデータセットの読み込み順。HashMapの反復順には依存しない。

use crate::dataset::ReferenceDataset;
use crate::tier::{QueryKey, Tier};
use crate::types::{LookupResult, NOT_FOUND};

/// 照合オプション
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// 複数候補を常に曖昧として扱う
    pub strict: bool,
    /// `details` に載せる近似候補の上限
    pub details_limit: usize,
    /// `DESPERATE_3` の編集距離の上限
    pub max_edit_distance: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            strict: false,
            details_limit: 5,
            max_edit_distance: 2,
        }
    }
}

/// 1ティアの判定結果
#[derive(Debug, Clone, PartialEq, Eq)]
enum Decision {
    NoCandidate,
    Unique(usize),
    Ambiguous(Vec<usize>),
}

#[derive(Debug, Clone, Default)]
pub struct Resolver {
    options: ResolverOptions,
}

impl Resolver {
    pub fn new(options: ResolverOptions) -> Self {
        Self { options }
    }

    /// CPU名を照合する（失敗も結果レコードとして返す）
    pub fn lookup(&self, cpustr: &str, dataset: &ReferenceDataset) -> LookupResult {
        let query = QueryKey::new(cpustr);
        let mut first_ambiguity: Option<(Tier, Vec<usize>)> = None;

        for tier in Tier::ALL {
            if !tier.applies_to(&query) {
                tracing::debug!(%tier, "skipped: query has no model token");
                continue;
            }

            let candidates = self.candidates(tier, &query, dataset);
            match self.decide(&candidates, dataset) {
                Decision::NoCandidate => {
                    tracing::debug!(%tier, "no candidate");
                }
                Decision::Unique(idx) => {
                    let entry = dataset.entry(idx);
                    tracing::debug!(%tier, line = entry.source_line_number, raw = %entry.raw_line, "matched");
                    return LookupResult::matched(cpustr, dataset.source_name(), tier.hint(), entry);
                }
                Decision::Ambiguous(group) => {
                    tracing::debug!(%tier, candidates = group.len(), "ambiguous");
                    if first_ambiguity.is_none() {
                        first_ambiguity = Some((tier, group));
                    }
                }
            }
        }

        match first_ambiguity {
            Some((tier, group)) => {
                let details = group
                    .iter()
                    .take(self.options.details_limit)
                    .map(|&idx| dataset.entry(idx).raw_line.clone())
                    .collect();
                LookupResult::failed(cpustr, dataset.source_name(), &tier.ambiguity_hint(), details)
            }
            None => {
                let details = self.nearest(&query, dataset);
                LookupResult::failed(cpustr, dataset.source_name(), NOT_FOUND, details)
            }
        }
    }

    /// ティアの候補 `(位置, weight)` を読み込み順で列挙
    fn candidates(&self, tier: Tier, query: &QueryKey, dataset: &ReferenceDataset) -> Vec<(usize, u32)> {
        match tier {
            Tier::Exact => dataset.find_raw(&query.raw).iter().map(|&idx| (idx, 0)).collect(),
            Tier::Normalized => dataset
                .find_normalized(&query.normalized)
                .iter()
                .map(|&idx| (idx, 0))
                .collect(),
            _ => dataset
                .entries()
                .iter()
                .enumerate()
                .filter_map(|(idx, entry)| {
                    tier.score(query, entry, self.options.max_edit_distance)
                        .map(|weight| (idx, weight))
                })
                .collect(),
        }
    }

    fn decide(&self, candidates: &[(usize, u32)], dataset: &ReferenceDataset) -> Decision {
        let Some(best) = candidates.iter().map(|&(_, w)| w).min() else {
            return Decision::NoCandidate;
        };
        let group: Vec<usize> = candidates
            .iter()
            .filter(|&&(_, w)| w == best)
            .map(|&(idx, _)| idx)
            .collect();

        if group.len() == 1 {
            return Decision::Unique(group[0]);
        }
        if self.options.strict {
            return Decision::Ambiguous(group);
        }

        let top_mark = group
            .iter()
            .map(|&idx| dataset.entry(idx).mark)
            .max()
            .unwrap_or(0);
        let top: Vec<usize> = group
            .into_iter()
            .filter(|&idx| dataset.entry(idx).mark == top_mark)
            .collect();

        let first_key = &dataset.entry(top[0]).normalized_key;
        if top.iter().all(|&idx| &dataset.entry(idx).normalized_key == first_key) {
            Decision::Unique(top[0])
        } else {
            Decision::Ambiguous(top)
        }
    }

    /// トークン共有数の多い順（同数は読み込み順）に近似候補を返す
    fn nearest(&self, query: &QueryKey, dataset: &ReferenceDataset) -> Vec<String> {
        let mut scored: Vec<(usize, usize)> = dataset
            .entries()
            .iter()
            .enumerate()
            .map(|(idx, entry)| (idx, query.overlap(entry)))
            .filter(|&(_, overlap)| overlap > 0)
            .collect();

        // 安定ソートなので同数は読み込み順のまま
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        scored
            .into_iter()
            .take(self.options.details_limit)
            .map(|(idx, _)| dataset.entry(idx).raw_line.clone())
            .collect()
    }
}

/// デフォルトオプションで照合
pub fn lookup(cpustr: &str, dataset: &ReferenceDataset) -> LookupResult {
    Resolver::default().lookup(cpustr, dataset)
}
