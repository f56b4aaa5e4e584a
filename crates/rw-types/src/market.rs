use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

use crate::errors::{DataError, RwResult};

/// The three input series the analysis consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SeriesId {
    /// Volatility index
    Vix,
    /// Equity index under analysis
    Nikkei,
    /// Reference equity index
    Sp500,
}

impl SeriesId {
    pub const ALL: [SeriesId; 3] = [SeriesId::Vix, SeriesId::Nikkei, SeriesId::Sp500];

    /// Default market ticker for this series.
    pub fn default_ticker(&self) -> &'static str {
        match self {
            SeriesId::Vix => "^VIX",
            SeriesId::Nikkei => "^N225",
            SeriesId::Sp500 => "^GSPC",
        }
    }

    /// Column name used in tabular input/output.
    pub fn column_name(&self) -> &'static str {
        match self {
            SeriesId::Vix => "VIX",
            SeriesId::Nikkei => "Nikkei",
            SeriesId::Sp500 => "SP500",
        }
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column_name())
    }
}

/// Daily closing value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// A single daily close series as supplied by a data provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub id: SeriesId,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(id: SeriesId, points: Vec<PricePoint>) -> Self {
        Self { id, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn by_date(&self) -> BTreeMap<NaiveDate, f64> {
        self.points.iter().map(|p| (p.date, p.close)).collect()
    }
}

/// One aligned day of raw inputs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub date: NaiveDate,
    pub vix: f64,
    pub nikkei: f64,
    pub sp500: f64,
}

impl RawRow {
    pub fn new(date: NaiveDate, vix: f64, nikkei: f64, sp500: f64) -> Self {
        Self {
            date,
            vix,
            nikkei,
            sp500,
        }
    }

    /// Every value is finite and strictly positive, so returns and ratios
    /// are defined.
    pub fn is_valid(&self) -> bool {
        [self.vix, self.nikkei, self.sp500]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }
}

/// Raw input table: ascending, unique trading dates, all three series present
/// on every row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    rows: Vec<RawRow>,
}

impl RawTable {
    /// Build a table from pre-aligned rows. Rows are sorted by date;
    /// duplicate dates keep the last occurrence. Rows with a non-positive or
    /// non-finite value are dropped.
    pub fn from_rows(rows: Vec<RawRow>) -> RwResult<Self> {
        if rows.is_empty() {
            return Err(DataError::EmptySeries {
                series: "raw table".to_string(),
            }
            .into());
        }

        let mut by_date: BTreeMap<NaiveDate, RawRow> = BTreeMap::new();
        for row in rows {
            by_date.insert(row.date, row);
        }

        let mut kept = Vec::with_capacity(by_date.len());
        for row in by_date.into_values() {
            if row.is_valid() {
                kept.push(row);
            } else {
                warn!(date = %row.date, "Excluding row with non-positive or missing value");
            }
        }

        if kept.is_empty() {
            return Err(DataError::InsufficientData {
                message: "no row has valid values for all series".to_string(),
            }
            .into());
        }

        Ok(Self { rows: kept })
    }

    /// Align three independently fetched series on their common dates.
    ///
    /// Empty series and an empty intersection are fatal. Dates carried by
    /// only some of the series are truncated away.
    pub fn align(vix: &PriceSeries, nikkei: &PriceSeries, sp500: &PriceSeries) -> RwResult<Self> {
        for series in [vix, nikkei, sp500] {
            if series.is_empty() {
                return Err(DataError::EmptySeries {
                    series: series.id.to_string(),
                }
                .into());
            }
        }

        let vix_map = vix.by_date();
        let nikkei_map = nikkei.by_date();
        let sp500_map = sp500.by_date();

        let rows: Vec<RawRow> = vix_map
            .iter()
            .filter_map(|(date, &v)| {
                let n = nikkei_map.get(date)?;
                let s = sp500_map.get(date)?;
                Some(RawRow::new(*date, v, *n, *s))
            })
            .collect();

        if rows.is_empty() {
            return Err(DataError::NoOverlap.into());
        }

        let longest = vix_map.len().max(nikkei_map.len()).max(sp500_map.len());
        if rows.len() < longest {
            warn!(
                aligned = rows.len(),
                longest,
                "Truncated input to dates shared by all series"
            );
        }

        Self::from_rows(rows)
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    /// Keep only rows dated within `start..=end`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .filter(|r| r.date >= start && r.date <= end)
                .copied()
                .collect(),
        }
    }
}
