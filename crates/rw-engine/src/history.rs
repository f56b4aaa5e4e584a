//! Per-period history export for dashboards and offline inspection.

use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;
use tracing::info;

use rw_risk::{Observation, VolRegime};
use rw_types::{output_error, RwResult};

/// Flat CSV record for one finalized observation
#[derive(Debug, Clone, Serialize)]
pub struct HistoryRecord {
    pub date: NaiveDate,
    pub vix: f64,
    pub nikkei: f64,
    pub sp500: f64,
    pub nikkei_returns: f64,
    pub sp500_returns: f64,
    pub vix_returns: f64,
    pub nikkei_rv_5d: f64,
    pub nikkei_rv_20d: f64,
    pub vix_rv_spread: f64,
    pub nikkei_sp500_ratio: f64,
    pub ratio_ma20: f64,
    pub ratio_deviation: f64,
    pub vix_ma20: f64,
    pub vix_spike: bool,
    pub garch_vol: Option<f64>,
    pub garch_vol_annualized: Option<f64>,
    pub vol_regime: Option<VolRegime>,
    pub vix_elevated: bool,
    pub spread_wide: bool,
    pub ratio_extreme: bool,
    pub signal_count: u8,
    pub warning_signal: u8,
    pub crash_signal: u8,
}

impl From<&Observation> for HistoryRecord {
    fn from(obs: &Observation) -> Self {
        let row = &obs.indicators;
        let conditions = &obs.signals.conditions;
        Self {
            date: row.date,
            vix: row.vix,
            nikkei: row.nikkei,
            sp500: row.sp500,
            nikkei_returns: row.nikkei_return,
            sp500_returns: row.sp500_return,
            vix_returns: row.vix_return,
            nikkei_rv_5d: row.nikkei_rv_short,
            nikkei_rv_20d: row.nikkei_rv_long,
            vix_rv_spread: row.vix_rv_spread,
            nikkei_sp500_ratio: row.nikkei_sp500_ratio,
            ratio_ma20: row.ratio_ma,
            ratio_deviation: row.ratio_deviation,
            vix_ma20: row.vix_ma,
            vix_spike: row.vix_spike,
            garch_vol: obs.garch_vol,
            garch_vol_annualized: obs.garch_vol_annualized,
            vol_regime: obs.regime(),
            vix_elevated: conditions.vix_elevated,
            spread_wide: conditions.spread_wide,
            ratio_extreme: conditions.ratio_extreme,
            signal_count: obs.signals.count,
            warning_signal: u8::from(obs.warning()),
            crash_signal: u8::from(obs.crash()),
        }
    }
}

/// Write every observation as one CSV row.
pub fn write_history<P: AsRef<Path>>(path: P, observations: &[Observation]) -> RwResult<()> {
    let path = path.as_ref();
    let write_error = |e: &dyn std::fmt::Display| output_error!("failed to write history CSV {}: {}", path.display(), e);

    let mut writer = csv::Writer::from_path(path).map_err(|e| write_error(&e))?;
    for obs in observations {
        writer.serialize(HistoryRecord::from(obs)).map_err(|e| write_error(&e))?;
    }
    writer.flush().map_err(|e| write_error(&e))?;

    info!("Wrote {} history rows to {}", observations.len(), path.display());
    Ok(())
}
