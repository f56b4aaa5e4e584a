// RiskWatch analysis engine
// Loads the three market series, runs the risk monitor and writes the report

pub mod history;

use chrono::{NaiveDate, Utc};
use crossbeam_channel::{unbounded, Receiver};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use rw_data::{CsvDataProvider, MarketDataLoader, SampleDataProvider, TableLoader};
use rw_risk::{Report, RiskAlert, RiskMonitor};
use rw_types::{output_error, AnalysisConfig, RawTable, RwResult};

pub use history::{write_history, HistoryRecord};

/// File name of the JSON report inside the output directory
pub const REPORT_FILE_NAME: &str = "risk_report.json";

/// Where the raw table comes from
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    /// One CSV per series (`VIX.csv`, `Nikkei.csv`, `SP500.csv`).
    SeriesDirectory(PathBuf),
    /// A single CSV holding date, VIX, Nikkei and SP500 columns.
    CombinedCsv(PathBuf),
    /// Seeded synthetic data.
    Sample { seed: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub analysis: AnalysisConfig,
    pub out_dir: PathBuf,
    pub history_csv: Option<PathBuf>,
    /// Last day of the lookback window; today when unset.
    pub end_date: Option<NaiveDate>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            out_dir: PathBuf::from("docs"),
            history_csv: None,
            end_date: None,
        }
    }
}

/// Artifacts of one completed run
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub report: Report,
    pub report_path: PathBuf,
    pub history_path: Option<PathBuf>,
    pub alerts: Vec<RiskAlert>,
}

/// Analysis engine: one run per call to [`AnalysisEngine::run`]
pub struct AnalysisEngine {
    config: EngineConfig,
    monitor: RiskMonitor,
    alert_rx: Receiver<RiskAlert>,
}

impl AnalysisEngine {
    pub fn new(config: EngineConfig) -> Self {
        info!("Initializing RiskWatch analysis engine");
        let (alert_tx, alert_rx) = unbounded();
        let monitor = RiskMonitor::new(config.analysis.clone(), alert_tx);
        Self {
            config,
            monitor,
            alert_rx,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Load the raw table for the configured lookback window.
    pub async fn load(&self, source: &InputSource) -> RwResult<RawTable> {
        let data_config = &self.config.analysis.data;
        let end_date = self.config.end_date.unwrap_or_else(|| Utc::now().date_naive());

        match source {
            InputSource::SeriesDirectory(dir) => {
                let mut loader = MarketDataLoader::new();
                loader.add_provider(Box::new(CsvDataProvider::new(dir)));
                loader.load_raw_table(data_config, end_date).await
            }
            InputSource::Sample { seed } => {
                let mut loader = MarketDataLoader::new();
                loader.add_provider(Box::new(SampleDataProvider::new().with_seed(*seed)));
                loader.load_raw_table(data_config, end_date).await
            }
            InputSource::CombinedCsv(path) => {
                let table = TableLoader::new().load_csv_file(path)?;
                // lookback is measured from the last row unless an end date was given
                let last = match self.config.end_date {
                    Some(end) => end,
                    None => table.last_date().unwrap_or(end_date),
                };
                let start = last - chrono::Duration::days(data_config.lookback_days as i64);
                Ok(table.between(start, last))
            }
        }
    }

    /// Load, analyse and write the outputs. Fatal input errors abort before
    /// anything is written; the report is written last, so a failed history
    /// export leaves no report behind.
    pub async fn run(&mut self, source: &InputSource) -> RwResult<RunOutput> {
        let raw = self.load(source).await?;

        let report = match self.monitor.update(&raw) {
            Ok(report) => report,
            Err(e) => {
                error!("Analysis aborted: {}", e);
                return Err(e);
            }
        };

        let history_path = match (&self.config.history_csv, self.monitor.last_outcome()) {
            (Some(path), Some(outcome)) => {
                write_history(path, &outcome.observations)?;
                Some(path.clone())
            }
            _ => None,
        };

        let report_path = self.write_report(&report)?;

        let alerts: Vec<RiskAlert> = self.alert_rx.try_iter().collect();
        info!("Run complete: {} alerts emitted", alerts.len());

        Ok(RunOutput {
            report,
            report_path,
            history_path,
            alerts,
        })
    }

    fn write_report(&self, report: &Report) -> RwResult<PathBuf> {
        let out_dir = &self.config.out_dir;
        std::fs::create_dir_all(out_dir)
            .map_err(|e| output_error!("failed to create {}: {}", out_dir.display(), e))?;
        let path = out_dir.join(REPORT_FILE_NAME);
        std::fs::write(&path, report.to_json_pretty()?)
            .map_err(|e| output_error!("failed to write {}: {}", path.display(), e))?;
        info!("Report written to {}", path.display());
        Ok(path)
    }
}

/// Read a previously written report.
pub fn read_report<P: AsRef<Path>>(path: P) -> RwResult<Report> {
    let contents = std::fs::read_to_string(path)?;
    Report::from_json(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rw_risk::{RiskAlertKind, RiskLevel};
    use std::io::Write;
    use tempfile::TempDir;

    fn write_combined(dir: &TempDir, rows: usize, vix: impl Fn(usize) -> f64) -> PathBuf {
        let path = dir.path().join("combined.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "Date,VIX,Nikkei,SP500").unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for i in 0..rows {
            let date = start + chrono::Duration::days(i as i64);
            writeln!(file, "{},{},40000,5000", date, vix(i)).unwrap();
        }
        path
    }

    fn engine_in(dir: &TempDir) -> AnalysisEngine {
        AnalysisEngine::new(EngineConfig {
            out_dir: dir.path().join("docs"),
            history_csv: Some(dir.path().join("history.csv")),
            ..EngineConfig::default()
        })
    }

    #[tokio::test]
    async fn test_combined_csv_run_writes_report() {
        let dir = TempDir::new().unwrap();
        let input = write_combined(&dir, 80, |_| 18.0);
        let mut engine = engine_in(&dir);

        let output = engine.run(&InputSource::CombinedCsv(input)).await.unwrap();
        assert_eq!(output.report.risk_assessment.level, RiskLevel::Low);
        assert!(output.report_path.ends_with("risk_report.json"));

        let written = read_report(&output.report_path).unwrap();
        assert_eq!(written.analysis_date, output.report.analysis_date);
        assert!(!written.alert_required);

        let history = std::fs::read_to_string(output.history_path.unwrap()).unwrap();
        // header + 60 observations
        assert_eq!(history.lines().count(), 61);
        assert!(history.starts_with("date,vix,nikkei,sp500,"));
    }

    #[tokio::test]
    async fn test_fallback_alert_is_collected() {
        let dir = TempDir::new().unwrap();
        let input = write_combined(&dir, 40, |_| 18.0);
        let mut engine = engine_in(&dir);

        let output = engine.run(&InputSource::CombinedCsv(input)).await.unwrap();
        assert!(output
            .alerts
            .iter()
            .any(|a| matches!(a.kind, RiskAlertKind::VolatilityModelUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_fatal_input_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let input = write_combined(&dir, 10, |_| 18.0);
        let mut engine = engine_in(&dir);

        let err = engine.run(&InputSource::CombinedCsv(input)).await.unwrap_err();
        assert!(err.is_fatal_input());
        assert!(!dir.path().join("docs").join(REPORT_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn test_combined_csv_respects_end_date() {
        let dir = TempDir::new().unwrap();
        // 2024-01-01 ..= 2024-07-18
        let input = write_combined(&dir, 200, |_| 18.0);
        let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let mut engine = AnalysisEngine::new(EngineConfig {
            out_dir: dir.path().join("docs"),
            history_csv: Some(dir.path().join("history.csv")),
            end_date: Some(end),
            ..EngineConfig::default()
        });

        let raw = engine.load(&InputSource::CombinedCsv(input.clone())).await.unwrap();
        assert_eq!(raw.last_date(), Some(end));
        assert_eq!(raw.len(), 91);

        let output = engine.run(&InputSource::CombinedCsv(input)).await.unwrap();
        assert_eq!(output.report.analysis_date, end);
    }

    #[tokio::test]
    async fn test_history_write_failure_leaves_no_report() {
        let dir = TempDir::new().unwrap();
        let input = write_combined(&dir, 80, |_| 18.0);
        let mut engine = AnalysisEngine::new(EngineConfig {
            out_dir: dir.path().join("docs"),
            history_csv: Some(dir.path().join("missing").join("history.csv")),
            ..EngineConfig::default()
        });

        let err = engine.run(&InputSource::CombinedCsv(input)).await.unwrap_err();
        assert!(matches!(err, rw_types::RwError::Output(_)));
        assert!(!err.is_fatal_input());
        assert!(!dir.path().join("docs").join(REPORT_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn test_sample_source_completes() {
        let dir = TempDir::new().unwrap();
        let mut engine = AnalysisEngine::new(EngineConfig {
            out_dir: dir.path().to_path_buf(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 28),
            ..EngineConfig::default()
        });

        let output = engine.run(&InputSource::Sample { seed: 7 }).await.unwrap();
        let score = output.report.risk_assessment.total_score;
        assert!(score >= rust_decimal::Decimal::ZERO && score <= rust_decimal::Decimal::from(100));
        assert_eq!(
            output.report.analysis_date,
            NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
        );
    }
}
