//! Analysis configuration.
//!
//! Every section carries `#[serde(default)]`, so a JSON file only needs to
//! name the settings it overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::config_error;
use crate::errors::RwResult;
use crate::market::SeriesId;

/// Top-level configuration for one analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub indicators: IndicatorConfig,
    pub garch: GarchConfig,
    pub signals: SignalConfig,
    pub scoring: ScoringConfig,
    pub data: DataConfig,
}

impl AnalysisConfig {
    /// Load a configuration from a JSON file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> RwResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        info!("Loaded analysis config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> RwResult<()> {
        self.indicators.validate()?;
        self.garch.validate()?;
        self.signals.validate()?;
        self.scoring.validate()?;
        if self.data.lookback_days == 0 {
            return Err(config_error!("data.lookback_days must be positive"));
        }
        Ok(())
    }
}

/// Windows and scaling for the derived indicator columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Short realized-volatility window (periods).
    pub rv_short_window: usize,
    /// Long realized-volatility window (periods); feeds the VIX spread.
    pub rv_long_window: usize,
    /// Trailing mean window for the relative-strength ratio.
    pub ratio_ma_window: usize,
    /// Trailing window for the VIX moving average and spike test.
    pub vix_ma_window: usize,
    pub trading_days_per_year: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rv_short_window: 5,
            rv_long_window: 20,
            ratio_ma_window: 20,
            vix_ma_window: 20,
            trading_days_per_year: 252.0,
        }
    }
}

impl IndicatorConfig {
    /// Number of leading raw rows without a complete set of trailing windows.
    ///
    /// Return windows need one extra row because the first return is
    /// undefined.
    pub fn warmup_rows(&self) -> usize {
        let return_windows = self.rv_short_window.max(self.rv_long_window);
        let level_windows = self.ratio_ma_window.max(self.vix_ma_window);
        return_windows.max(level_windows.saturating_sub(1))
    }

    fn validate(&self) -> RwResult<()> {
        if self.rv_short_window < 2 || self.rv_long_window < 2 {
            return Err(config_error!("realized-volatility windows need at least 2 periods"));
        }
        if self.ratio_ma_window == 0 || self.vix_ma_window < 2 {
            return Err(config_error!("moving-average windows are too short"));
        }
        if self.trading_days_per_year <= 0.0 {
            return Err(config_error!("trading_days_per_year must be positive"));
        }
        Ok(())
    }
}

/// Fit settings for the GARCH(1,1) volatility model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GarchConfig {
    /// Minimum number of returns required to attempt a fit.
    pub min_observations: usize,
    pub max_iterations: usize,
    /// Convergence tolerance on the spread of simplex objective values.
    pub function_tolerance: f64,
    /// Convergence tolerance on the simplex diameter.
    pub parameter_tolerance: f64,
    /// Returns are multiplied by this before fitting (percentage units).
    pub return_scale: f64,
}

impl Default for GarchConfig {
    fn default() -> Self {
        Self {
            min_observations: 30,
            max_iterations: 10_000,
            function_tolerance: 1e-8,
            parameter_tolerance: 1e-6,
            return_scale: 100.0,
        }
    }
}

impl GarchConfig {
    fn validate(&self) -> RwResult<()> {
        if self.min_observations < 4 {
            return Err(config_error!("garch.min_observations must be at least 4"));
        }
        if self.max_iterations == 0 {
            return Err(config_error!("garch.max_iterations must be positive"));
        }
        if self.function_tolerance <= 0.0 || self.parameter_tolerance <= 0.0 {
            return Err(config_error!("garch tolerances must be positive"));
        }
        Ok(())
    }
}

/// Thresholds for the four warning conditions and the regime terciles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub vix_elevated: f64,
    /// Quantile of the spread history above which the spread counts as wide.
    pub spread_quantile: f64,
    /// Multiple of the ratio-deviation standard deviation that counts as extreme.
    pub ratio_sigma_multiple: f64,
    pub regime_low_quantile: f64,
    pub regime_high_quantile: f64,
    pub warning_count: u8,
    pub crash_count: u8,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            vix_elevated: 25.0,
            spread_quantile: 0.80,
            ratio_sigma_multiple: 2.0,
            regime_low_quantile: 0.33,
            regime_high_quantile: 0.67,
            warning_count: 2,
            crash_count: 3,
        }
    }
}

impl SignalConfig {
    fn validate(&self) -> RwResult<()> {
        let in_unit = |q: f64| (0.0..=1.0).contains(&q);
        if !in_unit(self.spread_quantile)
            || !in_unit(self.regime_low_quantile)
            || !in_unit(self.regime_high_quantile)
        {
            return Err(config_error!("signal quantiles must lie in [0, 1]"));
        }
        if self.regime_low_quantile > self.regime_high_quantile {
            return Err(config_error!("regime_low_quantile exceeds regime_high_quantile"));
        }
        if self.warning_count == 0 || self.warning_count > self.crash_count || self.crash_count > 4 {
            return Err(config_error!(
                "signal counts must satisfy 0 < warning ({}) <= crash ({}) <= 4",
                self.warning_count,
                self.crash_count
            ));
        }
        Ok(())
    }
}

/// Normalisers and level cut-offs for the composite score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// VIX level that maps to a full sub-score.
    pub vix_full_scale: f64,
    /// Annualised volatility (percent) that maps to a full sub-score.
    pub volatility_full_scale: f64,
    /// Absolute VIX/RV spread that maps to a full sub-score.
    pub spread_full_scale: f64,
    /// Multiplier applied to the absolute ratio deviation.
    pub ratio_multiplier: f64,
    /// Composite strictly above this is HIGH.
    pub high_threshold: f64,
    /// Composite strictly above this (and not HIGH) is MEDIUM.
    pub medium_threshold: f64,
    /// Composite strictly above this requires an alert.
    pub alert_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            vix_full_scale: 40.0,
            volatility_full_scale: 30.0,
            spread_full_scale: 15.0,
            ratio_multiplier: 1_000.0,
            high_threshold: 70.0,
            medium_threshold: 40.0,
            alert_threshold: 60.0,
        }
    }
}

impl ScoringConfig {
    fn validate(&self) -> RwResult<()> {
        if self.vix_full_scale <= 0.0
            || self.volatility_full_scale <= 0.0
            || self.spread_full_scale <= 0.0
            || self.ratio_multiplier <= 0.0
        {
            return Err(config_error!("score normalisers must be positive"));
        }
        if self.medium_threshold >= self.high_threshold {
            return Err(config_error!(
                "medium_threshold ({}) must be below high_threshold ({})",
                self.medium_threshold,
                self.high_threshold
            ));
        }
        Ok(())
    }
}

/// Input selection for the data collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Trailing calendar days of history to analyse.
    pub lookback_days: u32,
    pub vix_ticker: String,
    pub nikkei_ticker: String,
    pub sp500_ticker: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            lookback_days: 365,
            vix_ticker: SeriesId::Vix.default_ticker().to_string(),
            nikkei_ticker: SeriesId::Nikkei.default_ticker().to_string(),
            sp500_ticker: SeriesId::Sp500.default_ticker().to_string(),
        }
    }
}

impl DataConfig {
    pub fn ticker(&self, id: SeriesId) -> &str {
        match id {
            SeriesId::Vix => &self.vix_ticker,
            SeriesId::Nikkei => &self.nikkei_ticker,
            SeriesId::Sp500 => &self.sp500_ticker,
        }
    }
}
