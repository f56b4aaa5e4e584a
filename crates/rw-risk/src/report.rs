//! Serializable run report.
//!
//! Values are rounded for presentation only (scores to 1 dp, levels and
//! volatilities to 2 dp, the ratio to 4 dp); the pipeline itself works at
//! full precision.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use rw_types::RwResult;

use crate::pipeline::AnalysisOutcome;
use crate::scoring::{RiskLevel, RiskScoreResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub timestamp: DateTime<Utc>,
    pub analysis_date: NaiveDate,
    pub risk_assessment: RiskAssessment,
    pub current_metrics: CurrentMetrics,
    pub signals: SignalFlags,
    pub alert_required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_score: Decimal,
    pub level: RiskLevel,
    pub components: ScoreComponents,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    #[serde(with = "rust_decimal::serde::float")]
    pub vix_score: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub volatility_score: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub spread_score: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub ratio_score: Decimal,
}

impl ScoreComponents {
    fn from_score(score: &RiskScoreResult) -> Self {
        Self {
            vix_score: rounded(score.vix_score, 1),
            volatility_score: rounded(score.volatility_score, 1),
            spread_score: rounded(score.spread_score, 1),
            ratio_score: rounded(score.ratio_score, 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentMetrics {
    #[serde(with = "rust_decimal::serde::float")]
    pub vix: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub nikkei: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub sp500: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub nikkei_rv_20d: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub vix_rv_spread: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub nikkei_sp500_ratio: Decimal,
    /// `null` when the volatility model was unavailable for this run.
    #[serde(with = "rust_decimal::serde::float_option")]
    pub garch_vol_annualized: Option<Decimal>,
}

/// Latest-period signal flags, as 0/1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalFlags {
    pub warning_signal: u8,
    pub crash_signal: u8,
}

impl Report {
    /// Snapshot the latest state of a completed run.
    pub fn assemble(outcome: &AnalysisOutcome, timestamp: DateTime<Utc>) -> Self {
        let latest = &outcome.latest;
        let row = &latest.indicators;

        Self {
            timestamp,
            analysis_date: row.date,
            risk_assessment: RiskAssessment {
                total_score: rounded(outcome.score.total_score, 1),
                level: outcome.score.level,
                components: ScoreComponents::from_score(&outcome.score),
            },
            current_metrics: CurrentMetrics {
                vix: rounded(row.vix, 2),
                nikkei: rounded(row.nikkei, 2),
                sp500: rounded(row.sp500, 2),
                nikkei_rv_20d: rounded(row.nikkei_rv_long, 2),
                vix_rv_spread: rounded(row.vix_rv_spread, 2),
                nikkei_sp500_ratio: rounded(row.nikkei_sp500_ratio, 4),
                garch_vol_annualized: latest.garch_vol_annualized.map(|v| rounded(v, 2)),
            },
            signals: SignalFlags {
                warning_signal: u8::from(latest.warning()),
                crash_signal: u8::from(latest.crash()),
            },
            alert_required: outcome.alert_required,
        }
    }

    pub fn to_json_pretty(&self) -> RwResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> RwResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn rounded(value: f64, dp: u32) -> Decimal {
    Decimal::from_f64_retain(value)
        .unwrap_or_default()
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}
