//! GARCH(1,1) conditional volatility.
//!
//! Constant-mean model with normal innovations:
//!
//! ```text
//! r_t      = mu + e_t
//! sigma2_t = omega + alpha * e_{t-1}^2 + beta * sigma2_{t-1}
//! ```
//!
//! Parameters are estimated by maximum likelihood. The optimizer works on an
//! unconstrained vector that maps onto `omega > 0`, `alpha, beta >= 0` and
//! `alpha + beta < 1`, so every candidate it evaluates is a stationary model.
//!
//! [`VolatilityModel::estimate`] never fails: a fit error is folded into
//! [`VolatilityEstimate::Unavailable`] and callers fall back to realized
//! volatility.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use rw_types::{GarchConfig, ModelError};

use crate::indicators::IndicatorFrame;
use crate::optimizer::{NelderMead, OptimizeError};
use crate::stats::{mean, population_variance};

const LN_2PI: f64 = 1.837_877_066_409_345_5;
/// Unconstrained coordinates beyond this are rejected as degenerate.
const PARAM_BOX: f64 = 30.0;
const NUM_PARAMS: usize = 4;

/// Fitted GARCH(1,1) parameters, in the units of the fitted returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GarchParams {
    pub mu: f64,
    pub omega: f64,
    pub alpha: f64,
    pub beta: f64,
}

impl GarchParams {
    pub fn persistence(&self) -> f64 {
        self.alpha + self.beta
    }

    /// Long-run variance `omega / (1 - alpha - beta)`; `None` when the
    /// process is not covariance-stationary.
    pub fn unconditional_variance(&self) -> Option<f64> {
        let gap = 1.0 - self.persistence();
        (gap > 0.0).then(|| self.omega / gap)
    }

    /// Map an unconstrained optimizer vector onto valid parameters.
    fn from_unconstrained(theta: &[f64]) -> Option<Self> {
        if theta.len() != NUM_PARAMS || theta.iter().any(|t| !t.is_finite() || t.abs() > PARAM_BOX) {
            return None;
        }
        let a = theta[2].exp();
        let b = theta[3].exp();
        let denom = 1.0 + a + b;
        Some(Self {
            mu: theta[0],
            omega: theta[1].exp(),
            alpha: a / denom,
            beta: b / denom,
        })
    }

    fn validate(&self) -> Result<(), ModelError> {
        let valid = self.omega.is_finite()
            && self.omega > 0.0
            && self.alpha >= 0.0
            && self.beta >= 0.0
            && self.persistence() < 1.0;
        if valid {
            Ok(())
        } else {
            Err(ModelError::InvalidParameters {
                omega: self.omega,
                alpha: self.alpha,
                beta: self.beta,
            })
        }
    }
}

/// Result of a successful maximum-likelihood fit.
#[derive(Debug, Clone, PartialEq)]
pub struct GarchFit {
    pub params: GarchParams,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    pub iterations: usize,
    pub observations: usize,
    /// In-sample conditional variance, one entry per input return.
    pub conditional_variance: Vec<f64>,
}

impl GarchFit {
    /// In-sample conditional standard deviation per period.
    pub fn conditional_volatility(&self) -> Vec<f64> {
        self.conditional_variance.iter().map(|v| v.sqrt()).collect()
    }
}

/// GARCH(1,1) estimator
pub struct Garch11;

impl Garch11 {
    /// Fit the model to `returns` (already in the units the caller wants the
    /// variance in, typically percent).
    pub fn fit(returns: &[f64], config: &GarchConfig) -> Result<GarchFit, ModelError> {
        let n = returns.len();
        if n < config.min_observations {
            return Err(ModelError::InsufficientData {
                got: n,
                required: config.min_observations,
            });
        }
        if returns.iter().any(|r| !r.is_finite()) {
            return Err(ModelError::NumericalInstability {
                message: "non-finite value in return series".to_string(),
            });
        }

        let sample_mean = mean(returns).unwrap_or(0.0);
        let variance = population_variance(returns).unwrap_or(0.0);
        if variance < 1e-12 {
            return Err(ModelError::DegenerateSeries { variance });
        }
        let backcast = variance;

        let objective = |theta: &[f64]| match GarchParams::from_unconstrained(theta) {
            Some(params) => negative_log_likelihood(&params, returns, backcast),
            None => f64::INFINITY,
        };

        // alpha = 0.1, beta = 0.8, long-run variance = sample variance
        let start = [sample_mean, (variance * 0.1).ln(), 0.0, 8.0_f64.ln()];

        let optimizer = NelderMead {
            max_iterations: config.max_iterations,
            function_tolerance: config.function_tolerance,
            parameter_tolerance: config.parameter_tolerance,
            ..NelderMead::default()
        };

        let minimum = optimizer.minimize(objective, &start).map_err(|e| match e {
            OptimizeError::MaxIterations(best) => {
                debug!(nll = best.value, "GARCH optimizer stopped at iteration cap");
                ModelError::ConvergenceFailed {
                    iterations: best.iterations,
                }
            }
            OptimizeError::NonFiniteStart => ModelError::NumericalInstability {
                message: "likelihood is not finite at the starting point".to_string(),
            },
        })?;

        let params = GarchParams::from_unconstrained(&minimum.point).ok_or_else(|| {
            ModelError::NumericalInstability {
                message: "optimum lies outside the parameter box".to_string(),
            }
        })?;
        params.validate()?;

        let conditional_variance = Self::conditional_variance(&params, returns, backcast);
        if conditional_variance.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(ModelError::NumericalInstability {
                message: "conditional variance is not positive".to_string(),
            });
        }

        let log_likelihood = -minimum.value;
        let k = NUM_PARAMS as f64;
        let aic = 2.0 * k - 2.0 * log_likelihood;
        let bic = k * (n as f64).ln() - 2.0 * log_likelihood;

        debug!(
            mu = params.mu,
            omega = params.omega,
            alpha = params.alpha,
            beta = params.beta,
            log_likelihood,
            iterations = minimum.iterations,
            "GARCH(1,1) fit converged"
        );

        Ok(GarchFit {
            params,
            log_likelihood,
            aic,
            bic,
            iterations: minimum.iterations,
            observations: n,
            conditional_variance,
        })
    }

    /// Variance recursion seeded with `backcast` in place of the unobserved
    /// pre-sample shock and variance.
    pub fn conditional_variance(params: &GarchParams, returns: &[f64], backcast: f64) -> Vec<f64> {
        let mut out = Vec::with_capacity(returns.len());
        let mut prev_var = backcast;
        let mut prev_shock = backcast;
        for r in returns {
            let var = params.omega + params.alpha * prev_shock + params.beta * prev_var;
            out.push(var);
            let e = r - params.mu;
            prev_shock = e * e;
            prev_var = var;
        }
        out
    }
}

fn negative_log_likelihood(params: &GarchParams, returns: &[f64], backcast: f64) -> f64 {
    let variances = Garch11::conditional_variance(params, returns, backcast);
    let mut nll = 0.0;
    for (r, var) in returns.iter().zip(&variances) {
        if *var <= 0.0 || !var.is_finite() {
            return f64::INFINITY;
        }
        let e = r - params.mu;
        nll += LN_2PI + var.ln() + e * e / var;
    }
    0.5 * nll
}

/// Conditional volatility aligned with the indicator frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalVolatility {
    pub dates: Vec<NaiveDate>,
    /// Daily conditional volatility, percent.
    pub daily: Vec<f64>,
    /// Annualized conditional volatility, percentage points.
    pub annualized: Vec<f64>,
    pub fit: GarchFit,
}

/// Output of the volatility model: either a fitted series or the reason it
/// is missing.
#[derive(Debug, Clone, PartialEq)]
pub enum VolatilityEstimate {
    Fitted(ConditionalVolatility),
    Unavailable { reason: ModelError },
}

impl VolatilityEstimate {
    pub fn is_fitted(&self) -> bool {
        matches!(self, VolatilityEstimate::Fitted(_))
    }

    pub fn annualized(&self) -> Option<&[f64]> {
        match self {
            VolatilityEstimate::Fitted(cv) => Some(&cv.annualized),
            VolatilityEstimate::Unavailable { .. } => None,
        }
    }

    pub fn latest_annualized(&self) -> Option<f64> {
        self.annualized().and_then(|a| a.last().copied())
    }

    pub fn fit(&self) -> Option<&GarchFit> {
        match self {
            VolatilityEstimate::Fitted(cv) => Some(&cv.fit),
            VolatilityEstimate::Unavailable { .. } => None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&ModelError> {
        match self {
            VolatilityEstimate::Fitted(_) => None,
            VolatilityEstimate::Unavailable { reason } => Some(reason),
        }
    }
}

/// Fits the conditional-volatility model to the equity return column.
pub struct VolatilityModel;

impl VolatilityModel {
    pub fn estimate(frame: &IndicatorFrame, config: &GarchConfig, trading_days_per_year: f64) -> VolatilityEstimate {
        let returns: Vec<f64> = frame
            .rows()
            .iter()
            .map(|r| r.nikkei_return * config.return_scale)
            .collect();

        match Garch11::fit(&returns, config) {
            Ok(fit) => {
                let annualize = trading_days_per_year.sqrt();
                let daily = fit.conditional_volatility();
                let annualized: Vec<f64> = daily.iter().map(|d| d * annualize).collect();

                if let Some(latest) = annualized.last() {
                    info!(
                        "GARCH(1,1) fitted on {} returns (persistence {:.4}); latest annualized volatility {:.2}%",
                        fit.observations,
                        fit.params.persistence(),
                        latest
                    );
                }

                VolatilityEstimate::Fitted(ConditionalVolatility {
                    dates: frame.dates(),
                    daily,
                    annualized,
                    fit,
                })
            }
            Err(reason) => {
                warn!("GARCH fit failed, falling back to realized volatility: {}", reason);
                VolatilityEstimate::Unavailable { reason }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn standard_normal(rng: &mut StdRng) -> f64 {
        let u1: f64 = rng.random_range(f64::EPSILON..1.0);
        let u2: f64 = rng.random::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    fn simulate(params: &GarchParams, n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut var = params.unconditional_variance().unwrap();
        let mut shock = var;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            var = params.omega + params.alpha * shock + params.beta * var;
            let e = var.sqrt() * standard_normal(&mut rng);
            shock = e * e;
            out.push(params.mu + e);
        }
        out
    }

    #[test]
    fn recovers_simulated_parameters() {
        let truth = GarchParams {
            mu: 0.05,
            omega: 0.1,
            alpha: 0.1,
            beta: 0.85,
        };
        let returns = simulate(&truth, 2_000, 7);
        let fit = Garch11::fit(&returns, &GarchConfig::default()).unwrap();

        assert!(fit.params.alpha > 0.02 && fit.params.alpha < 0.3, "alpha {}", fit.params.alpha);
        assert!(fit.params.beta > 0.5 && fit.params.beta < 0.98, "beta {}", fit.params.beta);
        assert!(fit.params.persistence() < 1.0);
        assert_eq!(fit.conditional_variance.len(), returns.len());
        assert!(fit.conditional_variance.iter().all(|v| *v > 0.0));
        assert!(fit.aic < fit.bic);
    }

    #[test]
    fn fit_beats_starting_point() {
        let truth = GarchParams {
            mu: 0.0,
            omega: 0.05,
            alpha: 0.15,
            beta: 0.8,
        };
        let returns = simulate(&truth, 500, 11);
        let fit = Garch11::fit(&returns, &GarchConfig::default()).unwrap();

        let variance = population_variance(&returns).unwrap();
        let start = GarchParams {
            mu: mean(&returns).unwrap(),
            omega: variance * 0.1,
            alpha: 0.1,
            beta: 0.8,
        };
        let start_ll = -negative_log_likelihood(&start, &returns, variance);
        assert!(fit.log_likelihood >= start_ll);
    }

    #[test]
    fn constant_series_is_degenerate() {
        let err = Garch11::fit(&[0.0; 100], &GarchConfig::default()).unwrap_err();
        assert!(matches!(err, ModelError::DegenerateSeries { .. }));
    }

    #[test]
    fn short_series_is_insufficient() {
        let err = Garch11::fit(&[0.1, -0.2, 0.3], &GarchConfig::default()).unwrap_err();
        assert_eq!(err, ModelError::InsufficientData { got: 3, required: 30 });
    }

    #[test]
    fn iteration_cap_is_convergence_failure() {
        let truth = GarchParams {
            mu: 0.0,
            omega: 0.1,
            alpha: 0.1,
            beta: 0.85,
        };
        let returns = simulate(&truth, 300, 3);
        let config = GarchConfig {
            max_iterations: 2,
            ..GarchConfig::default()
        };
        let err = Garch11::fit(&returns, &config).unwrap_err();
        assert_eq!(err, ModelError::ConvergenceFailed { iterations: 2 });
    }

    #[test]
    fn reparameterisation_is_stationary() {
        for theta in [[0.0, -5.0, 10.0, 10.0], [1.0, 2.0, -10.0, 3.0], [0.0, 0.0, 29.0, -29.0]] {
            let p = GarchParams::from_unconstrained(&theta).unwrap();
            assert!(p.omega > 0.0);
            assert!(p.alpha >= 0.0 && p.beta >= 0.0);
            assert!(p.persistence() < 1.0);
        }
        assert!(GarchParams::from_unconstrained(&[0.0, 0.0, 31.0, 0.0]).is_none());
    }
}
