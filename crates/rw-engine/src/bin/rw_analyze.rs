//! RiskWatch analysis runner
//!
//! Loads VIX, Nikkei 225 and S&P 500 closes, computes the composite risk
//! score and writes `risk_report.json` into the output directory.
//!
//! Usage:
//!   rw-analyze --data-dir data/ --out-dir docs
//!   rw-analyze --combined-csv market.csv --history-csv docs/history.csv
//!   rw-analyze --sample 42

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use rw_engine::{AnalysisEngine, EngineConfig, InputSource};
use rw_types::AnalysisConfig;

#[derive(Parser, Debug)]
#[command(name = "rw-analyze")]
#[command(about = "VIX / Nikkei / S&P 500 crash-risk analysis")]
#[command(group(ArgGroup::new("input").required(true).args(["data_dir", "combined_csv", "sample"])))]
struct Args {
    /// Directory holding VIX.csv, Nikkei.csv and SP500.csv
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Single CSV with Date, VIX, Nikkei and SP500 columns
    #[arg(long)]
    combined_csv: Option<PathBuf>,

    /// Run on seeded synthetic data
    #[arg(long, value_name = "SEED")]
    sample: Option<u64>,

    /// JSON configuration file; unset fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for risk_report.json
    #[arg(long, default_value = "docs")]
    out_dir: PathBuf,

    /// Also write the per-period history as CSV
    #[arg(long)]
    history_csv: Option<PathBuf>,

    /// Override the lookback window (calendar days)
    #[arg(long)]
    lookback_days: Option<u32>,

    /// Last day of the lookback window (YYYY-MM-DD); defaults to today
    #[arg(long)]
    end_date: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut analysis = match &args.config {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(days) = args.lookback_days {
        analysis.data.lookback_days = days;
    }
    analysis.validate()?;

    let source = match (args.data_dir, args.combined_csv, args.sample) {
        (Some(dir), _, _) => InputSource::SeriesDirectory(dir),
        (_, Some(path), _) => InputSource::CombinedCsv(path),
        (_, _, Some(seed)) => InputSource::Sample { seed },
        (None, None, None) => anyhow::bail!("one of --data-dir, --combined-csv or --sample is required"),
    };

    let mut engine = AnalysisEngine::new(EngineConfig {
        analysis,
        out_dir: args.out_dir,
        history_csv: args.history_csv,
        end_date: args.end_date,
    });

    let output = engine.run(&source).await.context("risk analysis failed")?;
    let report = &output.report;
    let assessment = &report.risk_assessment;

    println!("==================================================");
    println!("Analysis date:   {}", report.analysis_date);
    println!("Risk score:      {:.1} / 100", assessment.total_score);
    println!("Risk level:      {}", assessment.level);
    println!(
        "  VIX {:.1} | Volatility {:.1} | Spread {:.1} | Ratio {:.1}",
        assessment.components.vix_score,
        assessment.components.volatility_score,
        assessment.components.spread_score,
        assessment.components.ratio_score
    );
    println!(
        "Signals:         warning={} crash={}",
        report.signals.warning_signal, report.signals.crash_signal
    );
    println!(
        "Alert required:  {}",
        if report.alert_required { "YES" } else { "no" }
    );
    println!("Report:          {}", output.report_path.display());
    if let Some(path) = &output.history_path {
        println!("History:         {}", path.display());
    }
    println!("==================================================");

    Ok(())
}
