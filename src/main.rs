use clap::Parser;
use cpumark::{cli, config, error, marksdata, regression};
use cli::{Cli, Commands};
use config::Config;
use cpumark_common::{DatasetHandle, LookupResult, Resolver};
use error::Result;
use std::io::IsTerminal;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);
    let config = match cli.command {
        Commands::Lookup { .. } => Config::load_or_default(),
        _ => Config::load()?,
    };

    match cli.command {
        Commands::Lookup { cpu, cpuscsv, json, strict } => {
            let path = config.dataset_path(cpuscsv.as_deref());
            tracing::info!(cpu = %cpu, path = %path.display(), "looking up");

            // データセットが読めない場合のみ異常終了（未検出は正常な結果）
            let handle = match DatasetHandle::open(&path, config.dataset_options()) {
                Ok(handle) => handle,
                Err(e) => {
                    if json {
                        let message = serde_json::json!({ "error": true, "message": e.to_string() });
                        println!("{}", message);
                    }
                    return Err(e.into());
                }
            };

            let mut options = config.resolver_options();
            options.strict |= strict;
            let result = handle.lookup(&Resolver::new(options), &cpu);

            if json {
                println!("{}", result.to_json()?);
            } else {
                print_result(&result);
            }
        }

        Commands::Info { marksdata_dir, pretty } => {
            let dir = marksdata_dir.unwrap_or_else(|| config.marksdata_dir());
            let info = marksdata::version_info(&dir);
            if pretty {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("{}", serde_json::to_string(&info)?);
            }
        }

        Commands::Datasets { marksdata_dir } => {
            let dir = marksdata_dir.unwrap_or_else(|| config.marksdata_dir());
            let versions = marksdata::list_datasets(&dir)?;
            if versions.is_empty() {
                println!("マークデータがありません: {}", dir.display());
            }
            for v in versions {
                let current = if v.is_current { " *" } else { "" };
                println!("{}  {} bytes{}", v.file_name, v.size, current);
            }
        }

        Commands::Regression { history, cpuscsv, threshold, json } => {
            let path = config.dataset_path(cpuscsv.as_deref());
            let handle = DatasetHandle::open(&path, config.dataset_options())?;
            let history = regression::load_history(&history)?;

            let options = regression::RegressionOptions {
                threshold,
                show_progress: !json && std::io::stderr().is_terminal(),
            };
            let dataset = handle.snapshot();
            let report = regression::run(&history, &dataset, &Resolver::new(config.resolver_options()), &options);

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report, threshold);
            }
        }

        Commands::Config { set_marksdata_dir, show } => {
            let mut config = config;

            if let Some(dir) = set_marksdata_dir {
                config.set_marksdata_dir(dir)?;
                println!("✔ マークデータのディレクトリを設定しました");
            }

            if show {
                println!("設定:");
                println!("  設定ファイル: {}", Config::config_path()?.display());
                println!("  マークデータ: {}", config.marksdata_dir().display());
                println!("  照合CSV: {}", config.dataset_path(None).display());
                println!("  strict: {}", config.strict);
                println!("  候補の表示件数: {}", config.details_limit);
                println!("  編集距離の上限: {}", config.max_edit_distance);
                if config.vendors.is_empty() {
                    println!("  ベンダー: (すべて)");
                } else {
                    println!("  ベンダー: {}", config.vendors.join(", "));
                }
            }
        }
    }

    Ok(())
}

/// ログ出力の初期化（stdoutはJSON出力用に空けておく）
fn init_logging(verbose: bool, debug: bool) {
    let default_level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_result(result: &LookupResult) {
    if result.is_match() {
        println!(
            "\"{}\" のマーク: {} ({}, {}, \"{}\")",
            result.cpustr,
            result.mark.as_deref().unwrap_or_default(),
            result.hint,
            result.linenum.as_deref().unwrap_or_default(),
            result.line.as_deref().unwrap_or_default()
        );
        return;
    }

    println!("\"{}\" のマーク: 0 ({})", result.cpustr, result.hint);
    for candidate in &result.details {
        println!("  候補: {}", candidate);
    }
}

fn print_report(report: &regression::RegressionReport, threshold: f64) {
    println!("📊 回帰テスト（閾値 {}%）\n", threshold);
    println!("  件数: {}", report.total);
    println!("  照合: {} / 未検出: {}", report.hits, report.misses);
    println!("  正解: {} / 不一致: {} / 要確認: {}", report.correct, report.wrong, report.weird);

    println!("\nティア別:");
    for (hint, count) in &report.stats {
        println!("  {:<24} {}", hint, count);
    }

    if !report.deviations.is_empty() {
        println!("\n不一致:");
        for d in &report.deviations {
            println!(
                "  \"{}\" = {} ({}) 平均 {} との差 {:.2}% [最小 {}, 最大 {}, 標準偏差 {:.2}]",
                d.cpustr, d.mark, d.hint, d.average, d.gap_avg_pct, d.min, d.max, d.stddev
            );
        }
    }

    if !report.missed.is_empty() {
        println!("\n未検出:");
        for m in &report.missed {
            println!("  \"{}\" ({})", m.cpustr, m.hint);
            for candidate in &m.details {
                println!("    候補: {}", candidate);
            }
        }
    }
}
