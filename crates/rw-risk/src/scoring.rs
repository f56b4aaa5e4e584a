//! Composite risk score.
//!
//! Four bounded sub-scores are computed from the latest period and averaged
//! into one headline figure, which is then bucketed into a [`RiskLevel`].

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use rw_types::ScoringConfig;

use crate::garch::VolatilityEstimate;
use crate::indicators::IndicatorRow;

/// Three-tier risk classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Strict `>` cut-offs: a composite equal to a threshold stays below it.
    pub fn classify(total_score: f64, config: &ScoringConfig) -> Self {
        if total_score > config.high_threshold {
            RiskLevel::High
        } else if total_score > config.medium_threshold {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW RISK"),
            RiskLevel::Medium => write!(f, "MEDIUM RISK"),
            RiskLevel::High => write!(f, "HIGH RISK"),
        }
    }
}

/// Which series fed the volatility sub-score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilitySource {
    Conditional,
    RealizedFallback,
}

/// Latest-period values the scorer reads
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInputs {
    pub vix: f64,
    pub annualized_volatility: f64,
    pub volatility_source: VolatilitySource,
    pub vix_rv_spread: f64,
    pub ratio_deviation: f64,
}

impl ScoreInputs {
    /// Use the conditional volatility when the model is fitted, otherwise the
    /// long-window realized volatility.
    pub fn from_latest(row: &IndicatorRow, volatility: &VolatilityEstimate) -> Self {
        let (annualized_volatility, volatility_source) = match volatility.latest_annualized() {
            Some(v) => (v, VolatilitySource::Conditional),
            None => (row.nikkei_rv_long, VolatilitySource::RealizedFallback),
        };
        Self {
            vix: row.vix,
            annualized_volatility,
            volatility_source,
            vix_rv_spread: row.vix_rv_spread,
            ratio_deviation: row.ratio_deviation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskScoreResult {
    pub total_score: f64,
    pub level: RiskLevel,
    pub vix_score: f64,
    pub volatility_score: f64,
    pub spread_score: f64,
    pub ratio_score: f64,
    pub volatility_source: VolatilitySource,
}

pub struct RiskScorer;

impl RiskScorer {
    pub fn score(inputs: &ScoreInputs, config: &ScoringConfig) -> RiskScoreResult {
        let vix_score = bounded(inputs.vix / config.vix_full_scale * 100.0);
        let volatility_score = bounded(inputs.annualized_volatility / config.volatility_full_scale * 100.0);
        let spread_score = bounded(inputs.vix_rv_spread.abs() / config.spread_full_scale * 100.0);
        let ratio_score = bounded(inputs.ratio_deviation.abs() * config.ratio_multiplier);

        let total_score = Self::composite(vix_score, volatility_score, spread_score, ratio_score);
        let level = RiskLevel::classify(total_score, config);

        debug!(
            vix_score,
            volatility_score,
            spread_score,
            ratio_score,
            total_score,
            "Scored latest period"
        );

        RiskScoreResult {
            total_score,
            level,
            vix_score,
            volatility_score,
            spread_score,
            ratio_score,
            volatility_source: inputs.volatility_source,
        }
    }

    /// Unweighted mean of the four sub-scores.
    pub fn composite(vix_score: f64, volatility_score: f64, spread_score: f64, ratio_score: f64) -> f64 {
        (vix_score + volatility_score + spread_score + ratio_score) / 4.0
    }
}

/// Clamp to [0, 100]; NaN maps to 0.
fn bounded(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}
