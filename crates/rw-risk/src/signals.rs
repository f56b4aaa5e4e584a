//! Warning and crash signals.
//!
//! Four independent conditions are evaluated per period and counted. The
//! distribution-derived thresholds (spread quantile, ratio sigma, regime
//! terciles) are taken over the whole frame, so historical flags are
//! recomputed on every run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use rw_types::SignalConfig;

use crate::garch::VolatilityEstimate;
use crate::indicators::IndicatorFrame;
use crate::stats::{quantile, sample_std};

/// Volatility regime relative to the frame's own history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolRegime {
    Low,
    Medium,
    High,
}

impl fmt::Display for VolRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolRegime::Low => write!(f, "Low"),
            VolRegime::Medium => write!(f, "Medium"),
            VolRegime::High => write!(f, "High"),
        }
    }
}

/// The four boolean risk conditions for one period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalConditions {
    pub vix_elevated: bool,
    pub spread_wide: bool,
    pub ratio_extreme: bool,
    pub regime_high: bool,
}

impl SignalConditions {
    pub fn count(&self) -> u8 {
        [self.vix_elevated, self.spread_wide, self.ratio_extreme, self.regime_high]
            .iter()
            .filter(|c| **c)
            .count() as u8
    }
}

/// Signal outputs for one period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    pub date: NaiveDate,
    /// `None` when the volatility model is unavailable.
    pub regime: Option<VolRegime>,
    pub conditions: SignalConditions,
    pub count: u8,
    pub warning: bool,
    pub crash: bool,
}

impl SignalRow {
    pub fn new(date: NaiveDate, regime: Option<VolRegime>, conditions: SignalConditions, config: &SignalConfig) -> Self {
        let count = conditions.count();
        Self {
            date,
            regime,
            conditions,
            count,
            warning: count >= config.warning_count,
            crash: count >= config.crash_count,
        }
    }
}

/// Thresholds derived from the current history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalThresholds {
    pub vix_elevated: f64,
    pub spread: f64,
    /// `None` with fewer than two periods.
    pub ratio_deviation_std: Option<f64>,
    pub regime_low: Option<f64>,
    pub regime_high: Option<f64>,
}

impl SignalThresholds {
    pub fn ratio_deviation_limit(&self, multiple: f64) -> Option<f64> {
        self.ratio_deviation_std.map(|s| s * multiple)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalFrame {
    pub thresholds: SignalThresholds,
    pub rows: Vec<SignalRow>,
}

impl SignalFrame {
    pub fn latest(&self) -> Option<&SignalRow> {
        self.rows.last()
    }

    pub fn warning_periods(&self) -> usize {
        self.rows.iter().filter(|r| r.warning).count()
    }

    pub fn crash_periods(&self) -> usize {
        self.rows.iter().filter(|r| r.crash).count()
    }
}

pub struct SignalGenerator;

impl SignalGenerator {
    pub fn generate(frame: &IndicatorFrame, volatility: &VolatilityEstimate, config: &SignalConfig) -> SignalFrame {
        let spreads = frame.column(|r| r.vix_rv_spread);
        let deviations = frame.column(|r| r.ratio_deviation);

        let (regime_low, regime_high) = match volatility.annualized() {
            Some(vol) => (
                quantile(vol, config.regime_low_quantile),
                quantile(vol, config.regime_high_quantile),
            ),
            None => (None, None),
        };
        let regimes = Self::classify_regimes(volatility.annualized(), regime_low.zip(regime_high), frame.len());

        let thresholds = SignalThresholds {
            vix_elevated: config.vix_elevated,
            spread: quantile(&spreads, config.spread_quantile).unwrap_or(f64::INFINITY),
            ratio_deviation_std: sample_std(&deviations),
            regime_low,
            regime_high,
        };
        let ratio_limit = thresholds.ratio_deviation_limit(config.ratio_sigma_multiple);

        debug!(
            spread = thresholds.spread,
            ratio_limit = ?ratio_limit,
            regime_low = ?thresholds.regime_low,
            regime_high = ?thresholds.regime_high,
            "Signal thresholds"
        );

        let rows: Vec<SignalRow> = frame
            .rows()
            .iter()
            .zip(regimes)
            .map(|(row, regime)| {
                let conditions = SignalConditions {
                    vix_elevated: row.vix > config.vix_elevated,
                    spread_wide: row.vix_rv_spread > thresholds.spread,
                    ratio_extreme: ratio_limit.is_some_and(|limit| row.ratio_deviation.abs() > limit),
                    regime_high: regime == Some(VolRegime::High),
                };
                SignalRow::new(row.date, regime, conditions, config)
            })
            .collect();

        let signals = SignalFrame { thresholds, rows };
        info!(
            "Generated signals: {} warning periods, {} crash periods",
            signals.warning_periods(),
            signals.crash_periods()
        );
        signals
    }

    /// Tercile regime per period; all `None` without a fitted model.
    fn classify_regimes(annualized: Option<&[f64]>, bounds: Option<(f64, f64)>, len: usize) -> Vec<Option<VolRegime>> {
        let (Some(vol), Some((low, high))) = (annualized, bounds) else {
            return vec![None; len];
        };

        vol.iter()
            .map(|v| {
                Some(if *v > high {
                    VolRegime::High
                } else if *v < low {
                    VolRegime::Low
                } else {
                    VolRegime::Medium
                })
            })
            .collect()
    }
}
