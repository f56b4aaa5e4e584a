pub mod providers;
pub mod loaders;

pub use providers::*;
pub use loaders::*;

use chrono::NaiveDate;
use rw_types::{DataConfig, DataError, PriceSeries, RawTable, RwResult, SeriesId};

/// Market data loader coordinates the providers that supply the raw table
#[derive(Debug, Default)]
pub struct MarketDataLoader {
    pub providers: Vec<Box<dyn providers::DataProvider>>,
}

impl MarketDataLoader {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    pub fn add_provider(&mut self, provider: Box<dyn providers::DataProvider>) {
        self.providers.push(provider);
    }

    /// Fetch one series from the first provider that supports it.
    ///
    /// An empty result is surfaced as a fatal error; it is never replaced by
    /// another provider's data.
    pub async fn load_series(
        &mut self,
        id: SeriesId,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RwResult<PriceSeries> {
        for provider in &mut self.providers {
            if provider.supports_series(id, ticker) {
                let series = provider.fetch_series(id, ticker, start_date, end_date).await?;
                tracing::info!("{} supplied {} rows for {}", provider.name(), series.len(), id);

                if series.is_empty() {
                    return Err(DataError::EmptySeries {
                        series: format!("{} ({})", id, ticker),
                    }
                    .into());
                }
                return Ok(series);
            }
        }

        Err(DataError::SourceNotFound(format!("no provider supports {} ({})", id, ticker)).into())
    }

    /// Load and align the three input series over the configured lookback
    /// window ending at `end_date`.
    pub async fn load_raw_table(&mut self, config: &DataConfig, end_date: NaiveDate) -> RwResult<RawTable> {
        let start_date = end_date - chrono::Duration::days(config.lookback_days as i64);
        tracing::info!("Loading market data from {} to {}", start_date, end_date);

        let vix = self
            .load_series(SeriesId::Vix, config.ticker(SeriesId::Vix), start_date, end_date)
            .await?;
        let nikkei = self
            .load_series(SeriesId::Nikkei, config.ticker(SeriesId::Nikkei), start_date, end_date)
            .await?;
        let sp500 = self
            .load_series(SeriesId::Sp500, config.ticker(SeriesId::Sp500), start_date, end_date)
            .await?;

        let table = RawTable::align(&vix, &nikkei, &sp500)?;
        tracing::info!("Aligned raw table: {} trading days", table.len());
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rw_types::RwError;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_series(dir: &TempDir, name: &str, rows: &[(&str, f64)]) {
        let mut file = std::fs::File::create(dir.path().join(name)).unwrap();
        writeln!(file, "Date,Close").unwrap();
        for (date, close) in rows {
            writeln!(file, "{},{}", date, close).unwrap();
        }
    }

    #[tokio::test]
    async fn loads_and_aligns_from_csv() {
        let dir = TempDir::new().unwrap();
        write_series(&dir, "VIX.csv", &[("2024-01-02", 13.2), ("2024-01-03", 14.0)]);
        write_series(&dir, "Nikkei.csv", &[("2024-01-03", 33_288.0), ("2024-01-04", 33_377.0)]);
        write_series(&dir, "SP500.csv", &[("2024-01-02", 4_742.0), ("2024-01-03", 4_704.0)]);

        let mut loader = MarketDataLoader::new();
        loader.add_provider(Box::new(CsvDataProvider::new(dir.path())));

        let end = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let table = loader.load_raw_table(&DataConfig::default(), end).await.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].nikkei, 33_288.0);
    }

    #[tokio::test]
    async fn empty_series_is_fatal() {
        let dir = TempDir::new().unwrap();
        write_series(&dir, "VIX.csv", &[]);
        write_series(&dir, "Nikkei.csv", &[("2024-01-03", 33_288.0)]);
        write_series(&dir, "SP500.csv", &[("2024-01-03", 4_704.0)]);

        let mut loader = MarketDataLoader::new();
        loader.add_provider(Box::new(CsvDataProvider::new(dir.path())));
        loader.add_provider(Box::new(SampleDataProvider::new()));

        let end = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let err = loader.load_raw_table(&DataConfig::default(), end).await.unwrap_err();
        assert!(matches!(err, RwError::Data(DataError::EmptySeries { .. })));
        assert!(err.is_fatal_input());
    }

    #[tokio::test]
    async fn no_provider_is_source_not_found() {
        let mut loader = MarketDataLoader::new();
        let end = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let err = loader.load_raw_table(&DataConfig::default(), end).await.unwrap_err();
        assert!(matches!(err, RwError::Data(DataError::SourceNotFound(_))));
    }

    #[tokio::test]
    async fn sample_provider_covers_lookback() {
        let mut loader = MarketDataLoader::new();
        loader.add_provider(Box::new(SampleDataProvider::new()));

        let end = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
        let table = loader.load_raw_table(&DataConfig::default(), end).await.unwrap();
        assert!(table.len() > 250);
        assert_eq!(table.last_date(), Some(end));
    }
}
