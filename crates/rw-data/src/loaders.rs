use chrono::NaiveDate;
use rw_types::{DataError, RawRow, RawTable, RwResult, SeriesId};
use std::path::Path;

/// Loader for pre-combined tables holding all three series on one row
#[derive(Debug)]
pub struct TableLoader {
    has_headers: bool,
}

impl TableLoader {
    pub fn new() -> Self {
        Self { has_headers: true }
    }

    /// Without headers the column order is date, VIX, Nikkei, SP500.
    pub fn without_headers() -> Self {
        Self { has_headers: false }
    }

    /// Load a combined CSV file into a raw table
    pub fn load_csv_file<P: AsRef<Path>>(&self, file_path: P) -> RwResult<RawTable> {
        use csv::ReaderBuilder;

        let path = file_path.as_ref();
        tracing::info!("Loading combined CSV data from: {}", path.display());

        let mut rdr = ReaderBuilder::new()
            .has_headers(self.has_headers)
            .from_path(path)
            .map_err(|e| DataError::LoadingFailed {
                message: format!("Failed to open CSV file {}: {}", path.display(), e),
            })?;

        let columns = if self.has_headers {
            let headers = rdr
                .headers()
                .map_err(|e| DataError::LoadingFailed {
                    message: format!("Failed to read CSV headers: {}", e),
                })?
                .clone();
            tracing::debug!("CSV headers: {:?}", headers);
            Self::detect_columns(&headers)?
        } else {
            ColumnMap {
                date: 0,
                vix: 1,
                nikkei: 2,
                sp500: 3,
            }
        };

        let first_line = if self.has_headers { 2 } else { 1 };
        let mut rows = Vec::new();

        for (line_num, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| DataError::LoadingFailed {
                message: format!("Failed to read CSV record at line {}: {}", line_num + first_line, e),
            })?;

            match Self::parse_record(&record, &columns) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    tracing::warn!("Skipping invalid record at line {}: {}", line_num + first_line, e);
                    continue;
                }
            }
        }

        tracing::info!("Loaded {} combined rows from CSV file", rows.len());
        RawTable::from_rows(rows)
    }

    fn parse_record(record: &csv::StringRecord, columns: &ColumnMap) -> RwResult<RawRow> {
        let needed = columns.max_index() + 1;
        if record.len() < needed {
            return Err(DataError::ParseError {
                message: format!("CSV record has {} columns, expected at least {}", record.len(), needed),
            }
            .into());
        }

        let date = parse_date(record.get(columns.date).unwrap_or(""))?;
        let vix = parse_value(record.get(columns.vix).unwrap_or(""), SeriesId::Vix)?;
        let nikkei = parse_value(record.get(columns.nikkei).unwrap_or(""), SeriesId::Nikkei)?;
        let sp500 = parse_value(record.get(columns.sp500).unwrap_or(""), SeriesId::Sp500)?;

        Ok(RawRow::new(date, vix, nikkei, sp500))
    }

    /// Detect column positions from headers
    fn detect_columns(headers: &csv::StringRecord) -> RwResult<ColumnMap> {
        let mut date = None;
        let mut vix = None;
        let mut nikkei = None;
        let mut sp500 = None;

        for (i, header) in headers.iter().enumerate() {
            match header.trim().to_lowercase().as_str() {
                "date" | "timestamp" | "datetime" => date = Some(i),
                "vix" | "^vix" => vix = Some(i),
                "nikkei" | "n225" | "^n225" => nikkei = Some(i),
                "sp500" | "s&p500" | "gspc" | "^gspc" => sp500 = Some(i),
                _ => {} // Ignore unknown columns
            }
        }

        let missing = |name: &str| DataError::ParseError {
            message: format!("Could not find {} column in CSV headers", name),
        };

        Ok(ColumnMap {
            date: date.ok_or_else(|| missing("date"))?,
            vix: vix.ok_or_else(|| missing("VIX"))?,
            nikkei: nikkei.ok_or_else(|| missing("Nikkei"))?,
            sp500: sp500.ok_or_else(|| missing("SP500"))?,
        })
    }
}

impl Default for TableLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    date: usize,
    vix: usize,
    nikkei: usize,
    sp500: usize,
}

impl ColumnMap {
    fn max_index(&self) -> usize {
        self.date.max(self.vix).max(self.nikkei).max(self.sp500)
    }
}

/// Parse a trading date, accepting plain dates and date-times.
pub fn parse_date(value: &str) -> RwResult<NaiveDate> {
    let value = value.trim();

    let date_formats = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
    for format in &date_formats {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Ok(date);
        }
    }

    let datetime_formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%SZ"];
    for format in &datetime_formats {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt.date());
        }
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Ok(dt.date_naive());
    }

    Err(DataError::ParseError {
        message: format!("Could not parse date: {}", value),
    }
    .into())
}

fn parse_value(value: &str, series: SeriesId) -> RwResult<f64> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DataError::ParseError {
            message: format!("Empty value for {}", series),
        }
        .into());
    }

    value.parse::<f64>().map_err(|e| {
        DataError::ParseError {
            message: format!("Could not parse {} value '{}': {}", series, value, e),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_combined_table_with_any_column_order() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "SP500,Date,Nikkei,VIX,Extra").unwrap();
        writeln!(temp_file, "4700.0,2024-01-03,33288.3,14.0,x").unwrap();
        writeln!(temp_file, "4705.5,2024-01-02,33100.0,13.2,x").unwrap();
        writeln!(temp_file, "4710.0,2024-01-04,,13.9,x").unwrap();
        temp_file.flush().unwrap();

        let table = TableLoader::new().load_csv_file(temp_file.path()).unwrap();
        assert_eq!(table.len(), 2);

        let first = table.rows()[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(first.vix, 13.2);
        assert_eq!(first.nikkei, 33100.0);
        assert_eq!(first.sp500, 4705.5);
    }

    #[test]
    fn headerless_table_uses_default_order() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "2024-01-02,13.2,33100.0,4705.5").unwrap();
        temp_file.flush().unwrap();

        let table = TableLoader::without_headers().load_csv_file(temp_file.path()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].sp500, 4705.5);
    }

    #[test]
    fn missing_column_is_an_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "Date,VIX,Nikkei").unwrap();
        writeln!(temp_file, "2024-01-02,13.2,33100.0").unwrap();
        temp_file.flush().unwrap();

        assert!(TableLoader::new().load_csv_file(temp_file.path()).is_err());
    }

    #[test]
    fn date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_date("2024-03-15").unwrap(), expected);
        assert_eq!(parse_date("2024/03/15").unwrap(), expected);
        assert_eq!(parse_date("03/15/2024").unwrap(), expected);
        assert_eq!(parse_date("2024-03-15 00:00:00").unwrap(), expected);
        assert_eq!(parse_date("2024-03-15T00:00:00+09:00").unwrap(), expected);
        assert!(parse_date("15th March").is_err());
    }
}
