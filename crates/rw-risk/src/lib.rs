//! Risk-scoring pipeline for RiskWatch.
//!
//! Provides:
//! - Derived indicators (returns, realized volatility, spreads, ratios)
//! - GARCH(1,1) conditional volatility with a realized-volatility fallback
//! - Warning/crash signal combination and the composite risk score
//! - Report assembly and alert emission via channels

pub mod alerts;
pub mod garch;
pub mod indicators;
pub mod monitor;
pub mod optimizer;
pub mod pipeline;
pub mod report;
pub mod scoring;
pub mod signals;
pub mod stats;

pub use alerts::{RiskAlert, RiskAlertKind, RiskSeverity};
pub use garch::{ConditionalVolatility, Garch11, GarchFit, GarchParams, VolatilityEstimate, VolatilityModel};
pub use indicators::{IndicatorEngine, IndicatorFrame, IndicatorRow};
pub use monitor::RiskMonitor;
pub use pipeline::{AnalysisOutcome, Observation, RiskPipeline};
pub use report::{CurrentMetrics, Report, RiskAssessment, ScoreComponents, SignalFlags};
pub use scoring::{RiskLevel, RiskScoreResult, RiskScorer, ScoreInputs, VolatilitySource};
pub use signals::{SignalConditions, SignalFrame, SignalGenerator, SignalRow, SignalThresholds, VolRegime};
