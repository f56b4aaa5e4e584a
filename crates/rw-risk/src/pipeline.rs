//! Forward data flow from the raw table to the latest risk score.
//!
//! raw table -> indicators -> volatility model -> signals -> score. Each stage
//! consumes the complete output of the previous one; nothing is carried over
//! between runs.

use serde::{Deserialize, Serialize};
use tracing::info;

use rw_types::{internal_error, AnalysisConfig, RawTable, RwResult};

use crate::garch::{VolatilityEstimate, VolatilityModel};
use crate::indicators::{IndicatorEngine, IndicatorRow};
use crate::scoring::{RiskScoreResult, RiskScorer, ScoreInputs};
use crate::signals::{SignalGenerator, SignalRow, SignalThresholds, VolRegime};

/// One finalized period: indicators, model output and signals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub indicators: IndicatorRow,
    /// Daily conditional volatility (percent); `None` without a fitted model.
    pub garch_vol: Option<f64>,
    pub garch_vol_annualized: Option<f64>,
    pub signals: SignalRow,
}

impl Observation {
    pub fn date(&self) -> chrono::NaiveDate {
        self.indicators.date
    }

    pub fn regime(&self) -> Option<VolRegime> {
        self.signals.regime
    }

    pub fn warning(&self) -> bool {
        self.signals.warning
    }

    pub fn crash(&self) -> bool {
        self.signals.crash
    }
}

/// Everything one run produces
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub observations: Vec<Observation>,
    pub volatility: VolatilityEstimate,
    pub thresholds: SignalThresholds,
    pub score: RiskScoreResult,
    pub latest: Observation,
    pub alert_required: bool,
}

pub struct RiskPipeline {
    config: AnalysisConfig,
}

impl RiskPipeline {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn run(&self, raw: &RawTable) -> RwResult<AnalysisOutcome> {
        self.config.validate()?;

        let frame = IndicatorEngine::compute(raw, &self.config.indicators)?;
        let volatility =
            VolatilityModel::estimate(&frame, &self.config.garch, self.config.indicators.trading_days_per_year);
        let signals = SignalGenerator::generate(&frame, &volatility, &self.config.signals);

        let daily = match &volatility {
            VolatilityEstimate::Fitted(cv) => Some(cv.daily.as_slice()),
            VolatilityEstimate::Unavailable { .. } => None,
        };
        let annualized = volatility.annualized();

        let observations: Vec<Observation> = frame
            .rows()
            .iter()
            .zip(&signals.rows)
            .enumerate()
            .map(|(i, (indicators, signal))| Observation {
                indicators: *indicators,
                garch_vol: daily.and_then(|d| d.get(i).copied()),
                garch_vol_annualized: annualized.and_then(|a| a.get(i).copied()),
                signals: *signal,
            })
            .collect();

        let latest = *observations
            .last()
            .ok_or_else(|| internal_error!("indicator frame produced no observations"))?;

        let inputs = ScoreInputs::from_latest(&latest.indicators, &volatility);
        let score = RiskScorer::score(&inputs, &self.config.scoring);
        let alert_required = score.total_score > self.config.scoring.alert_threshold || latest.crash();

        info!(
            "Risk score {:.1} ({}) on {}; warning={}, crash={}, alert_required={}",
            score.total_score,
            score.level,
            latest.date(),
            latest.warning(),
            latest.crash(),
            alert_required
        );

        Ok(AnalysisOutcome {
            observations,
            volatility,
            thresholds: signals.thresholds,
            score,
            latest,
            alert_required,
        })
    }
}
