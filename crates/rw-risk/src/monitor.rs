//! Risk monitor: runs the pipeline and emits alerts.
//!
//! The [`RiskMonitor`] takes a raw table, runs the [`RiskPipeline`],
//! assembles the [`Report`], and emits [`RiskAlert`]s via a channel for the
//! composite score, the latest signals and a missing volatility model.

use chrono::Utc;
use crossbeam_channel::Sender;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use rw_types::{AnalysisConfig, RawTable, RwResult};

use crate::alerts::{RiskAlert, RiskAlertKind, RiskSeverity};
use crate::pipeline::{AnalysisOutcome, RiskPipeline};
use crate::report::Report;
use crate::scoring::RiskLevel;

/// Runs the risk pipeline and reports alerts.
///
/// Alerts are emitted on the channel supplied at construction time.
pub struct RiskMonitor {
    pipeline: RiskPipeline,
    alert_tx: Sender<RiskAlert>,
    last_outcome: Option<AnalysisOutcome>,
    last_report: Option<Report>,
}

impl RiskMonitor {
    pub fn new(config: AnalysisConfig, alert_tx: Sender<RiskAlert>) -> Self {
        Self {
            pipeline: RiskPipeline::new(config),
            alert_tx,
            last_outcome: None,
            last_report: None,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        self.pipeline.config()
    }

    pub fn last_outcome(&self) -> Option<&AnalysisOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn last_report(&self) -> Option<&Report> {
        self.last_report.as_ref()
    }

    /// Main entry point: run the pipeline, check the result, emit alerts.
    ///
    /// A fatal input error is returned before anything is emitted and leaves
    /// the previous report in place.
    pub fn update(&mut self, raw: &RawTable) -> RwResult<Report> {
        let outcome = self.pipeline.run(raw)?;
        let report = Report::assemble(&outcome, Utc::now());

        self.check_volatility_model(&outcome);
        self.check_composite_score(&outcome, &report);
        self.check_signals(&outcome);

        self.last_outcome = Some(outcome);
        self.last_report = Some(report.clone());
        Ok(report)
    }

    // ---- internal checks ----

    fn check_volatility_model(&self, outcome: &AnalysisOutcome) {
        if let Some(reason) = outcome.volatility.unavailable_reason() {
            self.emit(RiskAlert::new(
                outcome.latest.date(),
                RiskSeverity::Info,
                RiskAlertKind::VolatilityModelUnavailable {
                    reason: reason.to_string(),
                },
                format!("Volatility model unavailable ({}); using 20-day realized volatility", reason),
            ));
        }
    }

    fn check_composite_score(&self, outcome: &AnalysisOutcome, report: &Report) {
        let threshold = self.config().scoring.alert_threshold;
        if outcome.score.total_score <= threshold {
            return;
        }

        let severity = if outcome.score.level == RiskLevel::High {
            RiskSeverity::Critical
        } else {
            RiskSeverity::Warning
        };
        let threshold = Decimal::from_f64_retain(threshold).unwrap_or_default();

        self.emit(RiskAlert::new(
            outcome.latest.date(),
            severity,
            RiskAlertKind::CompositeScoreElevated {
                score: report.risk_assessment.total_score,
                threshold,
            },
            format!(
                "Composite risk score {} ({}) above {}",
                report.risk_assessment.total_score, outcome.score.level, threshold
            ),
        ));
    }

    fn check_signals(&self, outcome: &AnalysisOutcome) {
        let latest = &outcome.latest;
        let conditions = latest.signals.count;

        if latest.crash() {
            self.emit(RiskAlert::new(
                latest.date(),
                RiskSeverity::Critical,
                RiskAlertKind::CrashSignal { conditions },
                format!("Crash signal: {} of 4 risk conditions active", conditions),
            ));
        } else if latest.warning() {
            self.emit(RiskAlert::new(
                latest.date(),
                RiskSeverity::Warning,
                RiskAlertKind::WarningSignal { conditions },
                format!("Warning signal: {} of 4 risk conditions active", conditions),
            ));
        }
    }

    fn emit(&self, alert: RiskAlert) {
        match alert.severity {
            RiskSeverity::Critical => warn!(%alert.message, "RISK CRITICAL"),
            RiskSeverity::Warning => warn!(%alert.message, "RISK WARNING"),
            RiskSeverity::Info => info!(%alert.message, "RISK INFO"),
        }
        if let Err(e) = self.alert_tx.try_send(alert) {
            debug!("Alert not delivered: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crossbeam_channel::unbounded;
    use rw_types::RawRow;

    fn table(n: usize, vix: impl Fn(usize) -> f64) -> RawTable {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let rows = (0..n)
            .map(|i| RawRow::new(start + chrono::Duration::days(i as i64), vix(i), 40_000.0, 5_000.0))
            .collect();
        RawTable::from_rows(rows).unwrap()
    }

    #[test]
    fn calm_market_only_reports_model_fallback() {
        let (tx, rx) = unbounded();
        let mut monitor = RiskMonitor::new(AnalysisConfig::default(), tx);
        let report = monitor.update(&table(60, |_| 18.0)).unwrap();

        assert!(!report.alert_required);
        let alerts: Vec<RiskAlert> = rx.try_iter().collect();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, RiskSeverity::Info);
        assert!(matches!(alerts[0].kind, RiskAlertKind::VolatilityModelUnavailable { .. }));
        assert!(monitor.last_report().is_some());
    }

    #[test]
    fn fear_spike_emits_warning_signal() {
        let (tx, rx) = unbounded();
        let mut monitor = RiskMonitor::new(AnalysisConfig::default(), tx);
        monitor.update(&table(60, |i| if i >= 55 { 30.0 } else { 18.0 })).unwrap();

        let alerts: Vec<RiskAlert> = rx.try_iter().collect();
        assert!(alerts
            .iter()
            .any(|a| matches!(a.kind, RiskAlertKind::WarningSignal { conditions: 2 })));
        assert!(!alerts.iter().any(|a| matches!(a.kind, RiskAlertKind::CrashSignal { .. })));
    }

    #[test]
    fn elevated_score_alerts() {
        let (tx, rx) = unbounded();
        // VIX 60 on the last row: vix 100, spread 100 -> composite 50
        let config = AnalysisConfig {
            scoring: rw_types::ScoringConfig {
                alert_threshold: 45.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut monitor = RiskMonitor::new(config, tx);
        let report = monitor.update(&table(60, |i| if i == 59 { 60.0 } else { 18.0 })).unwrap();

        assert!(report.alert_required);
        let alerts: Vec<RiskAlert> = rx.try_iter().collect();
        assert!(alerts.iter().any(|a| matches!(
            a.kind,
            RiskAlertKind::CompositeScoreElevated { .. }
        ) && a.severity == RiskSeverity::Warning));
    }

    #[test]
    fn dropped_receiver_does_not_fail_update() {
        let (tx, rx) = unbounded();
        drop(rx);
        let mut monitor = RiskMonitor::new(AnalysisConfig::default(), tx);

        let report = monitor.update(&table(60, |_| 18.0)).unwrap();
        assert_eq!(monitor.last_report(), Some(&report));
    }

    #[test]
    fn fatal_input_keeps_previous_report() {
        let (tx, _rx) = unbounded();
        let mut monitor = RiskMonitor::new(AnalysisConfig::default(), tx);
        monitor.update(&table(60, |_| 18.0)).unwrap();
        let before = monitor.last_report().cloned();

        assert!(monitor.update(&table(10, |_| 18.0)).is_err());
        assert_eq!(monitor.last_report().cloned(), before);
    }
}
