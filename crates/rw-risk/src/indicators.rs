//! Derived indicator columns.
//!
//! [`IndicatorEngine`] turns a [`RawTable`] into an [`IndicatorFrame`]:
//! returns, realized volatility, the VIX/RV spread and the relative-strength
//! ratio with its trailing mean. Rows whose trailing windows are incomplete
//! are dropped, so every row of the frame is fully populated.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use rw_types::{DataError, IndicatorConfig, RawTable, RwResult};

use crate::stats::{pct_change, rolling_mean, rolling_std};

/// One fully populated period of raw and derived inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub date: NaiveDate,

    // --- raw ---
    pub vix: f64,
    pub nikkei: f64,
    pub sp500: f64,

    // --- returns (fractions) ---
    pub nikkei_return: f64,
    pub sp500_return: f64,
    pub vix_return: f64,

    // --- realized volatility (annualized, percentage points) ---
    /// Short window, 5 periods by default.
    pub nikkei_rv_short: f64,
    /// Long window, 20 periods by default.
    pub nikkei_rv_long: f64,
    /// VIX minus long-window realized volatility.
    pub vix_rv_spread: f64,

    // --- relative strength ---
    pub nikkei_sp500_ratio: f64,
    pub ratio_ma: f64,
    pub ratio_deviation: f64,

    // --- fear-index spike ---
    pub vix_ma: f64,
    /// VIX above its trailing mean plus one trailing standard deviation.
    pub vix_spike: bool,
}

/// Ordered, date-indexed indicator rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorFrame {
    rows: Vec<IndicatorRow>,
}

impl IndicatorFrame {
    pub fn rows(&self) -> &[IndicatorRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn latest(&self) -> Option<&IndicatorRow> {
        self.rows.last()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    /// Extract one column as a plain vector aligned with the frame.
    pub fn column<F>(&self, f: F) -> Vec<f64>
    where
        F: Fn(&IndicatorRow) -> f64,
    {
        self.rows.iter().map(f).collect()
    }
}

/// Stateless calculator for the indicator columns.
pub struct IndicatorEngine;

impl IndicatorEngine {
    /// Compute every derived column and drop rows without complete windows.
    pub fn compute(raw: &RawTable, config: &IndicatorConfig) -> RwResult<IndicatorFrame> {
        if raw.is_empty() {
            return Err(DataError::EmptySeries {
                series: "raw table".to_string(),
            }
            .into());
        }

        let rows = raw.rows();
        let vix: Vec<f64> = rows.iter().map(|r| r.vix).collect();
        let nikkei: Vec<f64> = rows.iter().map(|r| r.nikkei).collect();
        let sp500: Vec<f64> = rows.iter().map(|r| r.sp500).collect();

        // Columns are independent given the raw inputs.
        let (vix_returns, (nikkei_returns, sp500_returns)) = rayon::join(
            || pct_change(&vix),
            || rayon::join(|| pct_change(&nikkei), || pct_change(&sp500)),
        );

        let annualize = config.trading_days_per_year.sqrt() * 100.0;
        let to_rv = |std: Option<f64>| std.map(|s| s * annualize);

        let rv_short: Vec<Option<f64>> = rolling_std(&nikkei_returns, config.rv_short_window)
            .into_iter()
            .map(to_rv)
            .collect();
        let rv_long: Vec<Option<f64>> = rolling_std(&nikkei_returns, config.rv_long_window)
            .into_iter()
            .map(to_rv)
            .collect();

        let ratio: Vec<Option<f64>> = nikkei
            .iter()
            .zip(&sp500)
            .map(|(n, s)| {
                let r = n / s;
                r.is_finite().then_some(r)
            })
            .collect();
        let ratio_ma = rolling_mean(&ratio, config.ratio_ma_window);

        let vix_levels: Vec<Option<f64>> = vix.iter().map(|&v| Some(v)).collect();
        let vix_ma = rolling_mean(&vix_levels, config.vix_ma_window);
        let vix_std = rolling_std(&vix_levels, config.vix_ma_window);

        let mut out = Vec::with_capacity(rows.len().saturating_sub(config.warmup_rows()));
        for (i, raw_row) in rows.iter().enumerate() {
            let (
                Some(nikkei_return),
                Some(sp500_return),
                Some(vix_return),
                Some(nikkei_rv_short),
                Some(nikkei_rv_long),
                Some(nikkei_sp500_ratio),
                Some(ratio_ma),
                Some(vix_ma),
                Some(vix_std),
            ) = (
                nikkei_returns[i],
                sp500_returns[i],
                vix_returns[i],
                rv_short[i],
                rv_long[i],
                ratio[i],
                ratio_ma[i],
                vix_ma[i],
                vix_std[i],
            )
            else {
                continue;
            };

            out.push(IndicatorRow {
                date: raw_row.date,
                vix: raw_row.vix,
                nikkei: raw_row.nikkei,
                sp500: raw_row.sp500,
                nikkei_return,
                sp500_return,
                vix_return,
                nikkei_rv_short,
                nikkei_rv_long,
                vix_rv_spread: raw_row.vix - nikkei_rv_long,
                nikkei_sp500_ratio,
                ratio_ma,
                ratio_deviation: nikkei_sp500_ratio - ratio_ma,
                vix_ma,
                vix_spike: raw_row.vix > vix_ma + vix_std,
            });
        }

        debug!(
            dropped = rows.len() - out.len(),
            "Dropped rows without complete trailing windows"
        );

        if out.is_empty() {
            return Err(DataError::InsufficientData {
                message: format!(
                    "{} rows cannot fill a {}-period warm-up window",
                    rows.len(),
                    config.warmup_rows()
                ),
            }
            .into());
        }

        info!("Computed indicators for {} trading days", out.len());
        Ok(IndicatorFrame { rows: out })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rw_types::{RawRow, RwError};

    fn day(n: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(n as i64)
    }

    fn table<F>(n: usize, f: F) -> RawTable
    where
        F: Fn(usize) -> (f64, f64, f64),
    {
        let rows = (0..n)
            .map(|i| {
                let (v, nk, sp) = f(i);
                RawRow::new(day(i), v, nk, sp)
            })
            .collect();
        RawTable::from_rows(rows).unwrap()
    }

    #[test]
    fn warm_up_rows_are_dropped() {
        let raw = table(25, |i| (18.0 + (i % 3) as f64, 38_000.0 + 50.0 * i as f64, 5_000.0));
        let frame = IndicatorEngine::compute(&raw, &IndicatorConfig::default()).unwrap();

        assert_eq!(frame.len(), 5);
        let expected: Vec<_> = (20..25).map(day).collect();
        assert_eq!(frame.dates(), expected);
    }

    #[test]
    fn too_short_input_is_insufficient() {
        let raw = table(20, |_| (18.0, 38_000.0, 5_000.0));
        let err = IndicatorEngine::compute(&raw, &IndicatorConfig::default()).unwrap_err();
        assert!(matches!(err, RwError::Data(DataError::InsufficientData { .. })));
    }

    #[test]
    fn flat_prices_have_zero_volatility() {
        let raw = table(30, |_| (18.0, 38_000.0, 5_000.0));
        let frame = IndicatorEngine::compute(&raw, &IndicatorConfig::default()).unwrap();

        for row in frame.rows() {
            assert_eq!(row.nikkei_return, 0.0);
            assert_eq!(row.nikkei_rv_long, 0.0);
            assert_eq!(row.vix_rv_spread, 18.0);
            assert!((row.nikkei_sp500_ratio - 7.6).abs() < 1e-12);
            assert!(row.ratio_deviation.abs() < 1e-12);
            assert!(!row.vix_spike);
        }
    }

    #[test]
    fn realized_volatility_is_annualized_percent() {
        // Nikkei alternates +1% / -1%
        let mut level = 10_000.0;
        let mut levels = vec![level];
        for i in 1..30 {
            level *= if i % 2 == 1 { 1.01 } else { 0.99 };
            levels.push(level);
        }
        let raw = table(30, |i| (20.0, levels[i], 5_000.0));
        let frame = IndicatorEngine::compute(&raw, &IndicatorConfig::default()).unwrap();
        let latest = frame.latest().unwrap();

        let returns: Vec<f64> = (10..30)
            .map(|i| if i % 2 == 1 { 0.01 } else { -0.01 })
            .collect();
        let expected = crate::stats::sample_std(&returns).unwrap() * 252.0_f64.sqrt() * 100.0;
        assert!((latest.nikkei_rv_long - expected).abs() < 1e-9);
        assert!((latest.vix_rv_spread - (20.0 - latest.nikkei_rv_long)).abs() < 1e-12);
    }

    #[test]
    fn ratio_deviation_tracks_trailing_mean() {
        // Nikkei steps up on the last row only
        let raw = table(25, |i| (18.0, if i == 24 { 42_000.0 } else { 40_000.0 }, 5_000.0));
        let frame = IndicatorEngine::compute(&raw, &IndicatorConfig::default()).unwrap();
        let latest = frame.latest().unwrap();

        let expected_ma = (19.0 * 8.0 + 8.4) / 20.0;
        assert!((latest.ratio_ma - expected_ma).abs() < 1e-12);
        assert!((latest.ratio_deviation - (8.4 - expected_ma)).abs() < 1e-12);
    }

    #[test]
    fn vix_spike_flags_jump() {
        let raw = table(25, |i| (if i == 24 { 40.0 } else { 15.0 + (i % 2) as f64 }, 38_000.0, 5_000.0));
        let frame = IndicatorEngine::compute(&raw, &IndicatorConfig::default()).unwrap();
        assert!(frame.latest().unwrap().vix_spike);
        assert!(!frame.rows()[0].vix_spike);
    }
}
