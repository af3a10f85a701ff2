use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cpumark")]
#[command(about = "CPU名からベンチマーク指標（CPUマーク）を求める監査用ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// デバッグログを出力（ティアごとの判定を含む）
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// CPU名のマークを照合
    Lookup {
        /// CPUを表す文字列（"Intel(R) Celeron(R) CPU  J1900  @ 1.99GHz" など）
        #[arg(required = true)]
        cpu: String,

        /// マークCSVファイル（省略時は設定・環境変数 CPUMARK_CSV・marksdata/cpumarks.csv の順）
        #[arg(long)]
        cpuscsv: Option<PathBuf>,

        /// 結果をJSONで出力
        #[arg(long)]
        json: bool,

        /// 複数候補をマーク最大で選ばず曖昧として扱う
        #[arg(long)]
        strict: bool,
    },

    /// 現在のマークデータの情報を表示
    Info {
        /// マークデータのディレクトリ
        #[arg(long)]
        marksdata_dir: Option<PathBuf>,

        /// JSONを整形して出力
        #[arg(long)]
        pretty: bool,
    },

    /// マークデータの世代一覧
    Datasets {
        /// マークデータのディレクトリ
        #[arg(long)]
        marksdata_dir: Option<PathBuf>,
    },

    /// 過去のマークと照合結果を比較（保守者向け）
    Regression {
        /// 履歴JSONファイル
        #[arg(short = 'n', long, required = true)]
        history: PathBuf,

        /// マークCSVファイル
        #[arg(long)]
        cpuscsv: Option<PathBuf>,

        /// 検出閾値（%）
        #[arg(short = 's', long, default_value = "3.0")]
        threshold: f64,

        /// 結果をJSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 設定を表示/編集
    Config {
        /// マークデータのディレクトリを設定
        #[arg(long)]
        set_marksdata_dir: Option<PathBuf>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lookup() {
        let cli = Cli::parse_from(["cpumark", "lookup", "Intel Celeron G5925", "--json", "--cpuscsv", "x.csv"]);
        match cli.command {
            Commands::Lookup { cpu, cpuscsv, json, strict } => {
                assert_eq!(cpu, "Intel Celeron G5925");
                assert_eq!(cpuscsv, Some(PathBuf::from("x.csv")));
                assert!(json);
                assert!(!strict);
            }
            _ => panic!("expected lookup"),
        }
    }

    #[test]
    fn test_parse_regression_defaults() {
        let cli = Cli::parse_from(["cpumark", "-v", "regression", "-n", "ours.json"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Regression { history, threshold, .. } => {
                assert_eq!(history, PathBuf::from("ours.json"));
                assert!((threshold - 3.0).abs() < f64::EPSILON);
            }
            _ => panic!("expected regression"),
        }
    }
}
