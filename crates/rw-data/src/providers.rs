use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use csv::ReaderBuilder;
use rw_types::{DataError, PricePoint, PriceSeries, RwResult, SeriesId};
use serde::Deserialize;
use std::path::Path;

/// Trait for data providers (CSV exports, APIs, databases, etc.)
#[async_trait]
pub trait DataProvider: Send + Sync + std::fmt::Debug {
    /// Check if this provider can serve the given series
    fn supports_series(&self, id: SeriesId, ticker: &str) -> bool;

    /// Fetch daily closes for the given series, inclusive of both dates
    async fn fetch_series(
        &mut self,
        id: SeriesId,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RwResult<PriceSeries>;

    /// Get provider name
    fn name(&self) -> &str;

    /// Get provider configuration
    fn config(&self) -> serde_json::Value;
}

/// CSV data provider reading one daily-close file per series
#[derive(Debug)]
pub struct CsvDataProvider {
    pub name: String,
    pub data_directory: std::path::PathBuf,
    pub file_pattern: String,
}

#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date", alias = "timestamp")]
    date: String,
    #[serde(alias = "Close", alias = "close", deserialize_with = "csv::invalid_option")]
    close: Option<f64>,
}

impl CsvDataProvider {
    /// Files are looked up as `{series}.csv` (`VIX.csv`, `Nikkei.csv`,
    /// `SP500.csv`) unless a different pattern is set.
    pub fn new<P: AsRef<Path>>(data_directory: P) -> Self {
        Self {
            name: "CSV Provider".to_string(),
            data_directory: data_directory.as_ref().to_path_buf(),
            file_pattern: "{series}.csv".to_string(),
        }
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.file_pattern = pattern.to_string();
        self
    }

    fn get_file_path(&self, id: SeriesId, ticker: &str) -> std::path::PathBuf {
        let clean_ticker: String = ticker.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
        let filename = self
            .file_pattern
            .replace("{series}", id.column_name())
            .replace("{ticker}", &clean_ticker);

        self.data_directory.join(filename)
    }
}

#[async_trait]
impl DataProvider for CsvDataProvider {
    fn supports_series(&self, id: SeriesId, ticker: &str) -> bool {
        self.get_file_path(id, ticker).exists()
    }

    async fn fetch_series(
        &mut self,
        id: SeriesId,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RwResult<PriceSeries> {
        let file_path = self.get_file_path(id, ticker);

        if !file_path.exists() {
            return Err(DataError::SourceNotFound(file_path.to_string_lossy().to_string()).into());
        }

        let file = std::fs::File::open(&file_path)?;
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);

        let mut points = Vec::new();

        for (line_num, result) in reader.deserialize().enumerate() {
            let record: CsvRecord = result.map_err(|e| DataError::ParseError {
                message: format!("CSV parsing error in {}: {}", file_path.display(), e),
            })?;

            let date = crate::loaders::parse_date(&record.date)?;
            let Some(close) = record.close else {
                tracing::debug!("Skipping {} row {} without a close", id, line_num + 2);
                continue;
            };

            if date >= start_date && date <= end_date {
                points.push(PricePoint::new(date, close));
            }
        }

        points.sort_by_key(|p| p.date);
        tracing::info!("Loaded {} {} closes from {}", points.len(), id, file_path.display());
        Ok(PriceSeries::new(id, points))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "csv",
            "directory": self.data_directory,
            "pattern": self.file_pattern
        })
    }
}

/// Sample data provider for demos and smoke tests.
///
/// Produces a deterministic weekday-only random walk per series.
#[derive(Debug)]
pub struct SampleDataProvider {
    pub name: String,
    pub seed: u64,
}

impl SampleDataProvider {
    pub fn new() -> Self {
        Self {
            name: "Sample Data Provider".to_string(),
            seed: 12345,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for SampleDataProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataProvider for SampleDataProvider {
    fn supports_series(&self, _id: SeriesId, _ticker: &str) -> bool {
        true
    }

    async fn fetch_series(
        &mut self,
        id: SeriesId,
        _ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RwResult<PriceSeries> {
        let (mut level, daily_move) = match id {
            SeriesId::Vix => (18.0_f64, 0.06),
            SeriesId::Nikkei => (38_000.0, 0.012),
            SeriesId::Sp500 => (5_000.0, 0.010),
        };

        let mut rng_state = self.seed ^ (id as u64 + 1).wrapping_mul(0x9E37_79B9);
        let mut points = Vec::new();
        let mut current = start_date;

        while current <= end_date {
            if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                // Simple LCG random walk
                rng_state = rng_state.wrapping_mul(1103515245).wrapping_add(12345);
                let random = ((rng_state >> 16) & 0xFFFF) as f64 / 65536.0 - 0.5;
                level *= 1.0 + random * 2.0 * daily_move;
                if id == SeriesId::Vix {
                    // keep the fear index in a plausible band
                    level = level.clamp(9.0, 80.0);
                }
                points.push(PricePoint::new(current, level));
            }
            current = current.succ_opt().ok_or_else(|| DataError::InvalidFormat {
                message: "date overflow while generating sample data".to_string(),
            })?;
        }

        Ok(PriceSeries::new(id, points))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "sample",
            "seed": self.seed
        })
    }
}
