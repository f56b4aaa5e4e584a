//! Risk alert types and severity levels.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity of a risk alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskSeverity {
    /// Informational, e.g. a recoverable model failure.
    Info,
    /// Elevated risk; worth a look.
    Warning,
    /// Crash conditions or a HIGH composite score.
    Critical,
}

/// Discriminant for the kind of risk alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RiskAlertKind {
    /// Composite score above the alert threshold.
    CompositeScoreElevated { score: Decimal, threshold: Decimal },
    /// Enough conditions tripped for a crash signal.
    CrashSignal { conditions: u8 },
    /// Enough conditions tripped for a warning signal (but not a crash).
    WarningSignal { conditions: u8 },
    /// The conditional-volatility fit failed; realized volatility was used.
    VolatilityModelUnavailable { reason: String },
}

/// A single risk alert emitted by the monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAlert {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Trading date the alert refers to.
    pub analysis_date: NaiveDate,
    pub severity: RiskSeverity,
    pub kind: RiskAlertKind,
    pub message: String,
}

impl RiskAlert {
    pub fn new(analysis_date: NaiveDate, severity: RiskSeverity, kind: RiskAlertKind, message: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            analysis_date,
            severity,
            kind,
            message,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.severity == RiskSeverity::Critical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, 5).unwrap()
    }

    #[test]
    fn severity_ordering() {
        assert!(RiskSeverity::Info < RiskSeverity::Warning);
        assert!(RiskSeverity::Warning < RiskSeverity::Critical);
    }

    #[test]
    fn alert_creation() {
        let alert = RiskAlert::new(
            date(),
            RiskSeverity::Critical,
            RiskAlertKind::CrashSignal { conditions: 3 },
            "3 of 4 risk conditions active".into(),
        );
        assert!(alert.is_critical());
        assert_eq!(alert.analysis_date, date());
    }

    #[test]
    fn alert_serialization_roundtrip() {
        let alert = RiskAlert::new(
            date(),
            RiskSeverity::Warning,
            RiskAlertKind::CompositeScoreElevated {
                score: Decimal::new(642, 1),
                threshold: Decimal::from(60),
            },
            "Composite score 64.2 above 60".into(),
        );
        let json = serde_json::to_string(&alert).unwrap();
        let deserialized: RiskAlert = serde_json::from_str(&json).unwrap();
        assert_eq!(alert.severity, deserialized.severity);
        assert_eq!(alert.kind, deserialized.kind);
        assert_eq!(alert.id, deserialized.id);
    }
}
