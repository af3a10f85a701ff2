//! 回帰テストモジュール（保守者向け）
//!
//! 別手段で得た過去のマーク（履歴JSON）と照合結果を比較し、
//! 照合ルールの精度を確認する。
//!
//! 履歴JSONの形式:
//! ```json
//! {
//!   "Intel(R) Core(TM) i7-7500U CPU @ 2.70GHz": [
//!     [3641, "BXPC24-0264/BXPC24-0264-bolc2.csv"],
//!     [3635, "SDPC25-0134/SDPC25-0134-bolc2.csv"]
//!   ]
//! }
//! ```

use crate::error::{CpuMarkError, Result};
use cpumark_common::{LookupResult, ReferenceDataset, Resolver, Tier, NOT_FOUND};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// CPU名 → [(マーク, 出典)]
pub type History = BTreeMap<String, Vec<(f64, String)>>;

/// 履歴JSONを読み込み
pub fn load_history(path: &Path) -> Result<History> {
    if !path.exists() {
        return Err(CpuMarkError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| CpuMarkError::HistoryParse(format!("{}: {}", path.display(), e)))
}

#[derive(Debug, Clone)]
pub struct RegressionOptions {
    /// 平均との差がこの割合（%）以内なら正解
    pub threshold: f64,
    pub show_progress: bool,
}

impl Default for RegressionOptions {
    fn default() -> Self {
        Self {
            threshold: 3.0,
            show_progress: false,
        }
    }
}

/// 閾値を超えて外れたCPU
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deviation {
    pub cpustr: String,
    pub mark: u64,
    pub hint: String,
    pub average: i64,
    pub min: i64,
    pub max: i64,
    pub stddev: f64,
    /// 平均との差（%）
    pub gap_avg_pct: f64,
    pub gap_min_pct: f64,
    pub gap_max_pct: f64,
    /// マーク → 出典一覧
    pub sources: BTreeMap<String, Vec<String>>,
}

/// 照合できなかったCPU
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissedCpu {
    pub cpustr: String,
    pub hint: String,
    pub history: Vec<(f64, String)>,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegressionReport {
    pub total: usize,
    pub hits: usize,
    pub misses: usize,
    pub correct: usize,
    pub wrong: usize,
    /// 平均とは合うが最小・最大のどちらかと合わない
    pub weird: usize,
    /// hint → 件数
    pub stats: BTreeMap<String, usize>,
    pub deviations: Vec<Deviation>,
    pub missed: Vec<MissedCpu>,
}

/// 履歴全件を照合して集計
pub fn run(
    history: &History,
    dataset: &ReferenceDataset,
    resolver: &Resolver,
    options: &RegressionOptions,
) -> RegressionReport {
    tracing::info!(entries = history.len(), threshold = options.threshold, "running regression");

    let progress = if options.show_progress {
        let pb = ProgressBar::new(history.len() as u64);
        if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
            pb.set_style(style);
        }
        pb
    } else {
        ProgressBar::hidden()
    };

    let names: Vec<(&String, &Vec<(f64, String)>)> = history.iter().collect();
    let results: Vec<LookupResult> = names
        .par_iter()
        .map(|(name, _)| {
            let result = resolver.lookup(name, dataset);
            progress.inc(1);
            result
        })
        .collect();
    progress.finish_and_clear();

    let mut report = RegressionReport {
        total: names.len(),
        ..Default::default()
    };
    for tier in Tier::ALL {
        report.stats.insert(tier.hint().to_string(), 0);
    }
    report.stats.insert(NOT_FOUND.to_string(), 0);

    for ((name, ours), result) in names.into_iter().zip(results) {
        *report.stats.entry(result.hint.clone()).or_insert(0) += 1;

        let Some(mark) = result.mark_value() else {
            report.misses += 1;
            report.missed.push(MissedCpu {
                cpustr: name.clone(),
                hint: result.hint,
                history: ours.clone(),
                details: result.details,
            });
            continue;
        };
        report.hits += 1;

        if ours.is_empty() {
            continue;
        }

        let marks: Vec<f64> = ours.iter().map(|(m, _)| *m).collect();
        let average = (marks.iter().sum::<f64>() / marks.len() as f64) as i64;
        let min = marks.iter().cloned().fold(f64::INFINITY, f64::min) as i64;
        let max = marks.iter().cloned().fold(f64::NEG_INFINITY, f64::max) as i64;

        let gap_avg = gap_pct(mark, average);
        let gap_min = gap_pct(mark, min);
        let gap_max = gap_pct(mark, max);

        let within = gap_avg <= options.threshold;
        if within && !(gap_min <= options.threshold && gap_max <= options.threshold) {
            report.weird += 1;
        }

        if within {
            report.correct += 1;
            continue;
        }

        let variance = marks
            .iter()
            .map(|m| (m - average as f64).powi(2))
            .sum::<f64>()
            / marks.len() as f64;
        let stddev = variance.sqrt();

        let mut sources: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (m, source) in ours {
            sources.entry(format!("{}", m)).or_default().push(source.clone());
        }

        tracing::warn!(
            cpu = %name,
            mark,
            average,
            gap_pct = gap_avg,
            "mark deviates from history"
        );

        report.wrong += 1;
        report.deviations.push(Deviation {
            cpustr: name.clone(),
            mark,
            hint: result.hint,
            average,
            min,
            max,
            stddev,
            gap_avg_pct: gap_avg,
            gap_min_pct: gap_min,
            gap_max_pct: gap_max,
            sources,
        });
    }

    report
}

/// 基準値との差（%）
fn gap_pct(value: u64, reference: i64) -> f64 {
    if reference == 0 {
        return if value == 0 { 0.0 } else { f64::INFINITY };
    }
    (100.0 * (value as f64 - reference as f64) / reference as f64).abs()
}
