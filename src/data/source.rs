use crate::constants::data::{CSV_INFER_SCHEMA_ROWS, SECONDS_PER_DAY};
use crate::error::{LinkError, Result};
use polars::prelude::*;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Numeric column values shared between views without copying
pub type SharedColumn = Arc<[f64]>;

/// DataSource wraps the materialized table of one loaded dataset.
///
/// Row `i` of the table is observation `i` of the highlight state.
pub struct DataSource {
    materialized: DataFrame,
    file_path: Option<PathBuf>,
    /// Numeric conversions by column index
    numeric_cache: RefCell<HashMap<usize, SharedColumn>>,
}

impl DataSource {
    /// Load data from a file (CSV or Parquet)
    pub fn load(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| LinkError::UnsupportedFormat {
                extension: String::new(),
            })?;

        let df = match extension.to_lowercase().as_str() {
            "parquet" => LazyFrame::scan_parquet(path, Default::default())?,
            "csv" => LazyCsvReader::new(path)
                .with_has_header(true)
                .with_infer_schema_length(Some(CSV_INFER_SCHEMA_ROWS))
                .with_try_parse_dates(true)
                .finish()?,
            ext => {
                return Err(LinkError::UnsupportedFormat {
                    extension: ext.to_string(),
                });
            }
        };

        let materialized = df.collect()?;
        log::info!(
            "loaded {} ({} rows, {} columns)",
            path.display(),
            materialized.height(),
            materialized.width()
        );

        Ok(Self {
            materialized,
            file_path: Some(path.to_path_buf()),
            numeric_cache: RefCell::new(HashMap::new()),
        })
    }

    /// Create DataSource from an already-loaded DataFrame
    pub fn from_dataframe(df: DataFrame, path: Option<PathBuf>) -> Self {
        Self {
            materialized: df,
            file_path: path,
            numeric_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Number of observations
    pub fn height(&self) -> usize {
        self.materialized.height()
    }

    pub fn width(&self) -> usize {
        self.materialized.width()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.materialized
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.materialized
            .get_column_index(name)
            .ok_or_else(|| LinkError::ColumnNotFound {
                column: name.to_string(),
            })
    }

    fn column_series(&self, col_idx: usize) -> Result<Series> {
        let width = self.width();
        self.materialized
            .get_columns()
            .get(col_idx)
            .map(|c| c.as_materialized_series().clone())
            .ok_or(LinkError::InvalidColumnIndex {
                index: col_idx,
                max: width,
            })
    }

    /// Numeric column by name, converted once and cached
    pub fn numeric_column(&self, name: &str) -> Result<SharedColumn> {
        let col_idx = self.column_index(name)?;
        if let Some(cached) = self.numeric_cache.borrow().get(&col_idx) {
            return Ok(cached.clone());
        }

        let values: SharedColumn = self.column_as_f64(col_idx)?.into();
        self.numeric_cache
            .borrow_mut()
            .insert(col_idx, values.clone());
        Ok(values)
    }

    /// Get a column's numeric values as Vec<f64>
    /// Non-numeric values are converted to NaN
    /// Datetime/Date columns are converted to Unix timestamps (seconds since epoch)
    pub fn column_as_f64(&self, col_idx: usize) -> Result<Vec<f64>> {
        let series = self.column_series(col_idx)?;

        match series.dtype() {
            DataType::Datetime(unit, _) => {
                let per_second = match unit {
                    TimeUnit::Nanoseconds => 1_000_000_000.0,
                    TimeUnit::Microseconds => 1_000_000.0,
                    TimeUnit::Milliseconds => 1_000.0,
                };
                let timestamps = series
                    .datetime()?
                    .into_iter()
                    .map(|opt| opt.map(|ts| ts as f64 / per_second).unwrap_or(f64::NAN))
                    .collect();
                return Ok(timestamps);
            }
            DataType::Date => {
                let timestamps = series
                    .date()?
                    .into_iter()
                    .map(|opt| opt.map(|days| days as f64 * SECONDS_PER_DAY).unwrap_or(f64::NAN))
                    .collect();
                return Ok(timestamps);
            }
            _ => {}
        }

        match series.cast(&DataType::Float64) {
            Ok(s) => Ok(s
                .f64()?
                .into_iter()
                .map(|opt| opt.unwrap_or(f64::NAN))
                .collect()),
            Err(_) => {
                if let Ok(str_series) = series.str() {
                    Ok(str_series
                        .into_iter()
                        .map(|opt| opt.and_then(|s| s.parse::<f64>().ok()).unwrap_or(f64::NAN))
                        .collect())
                } else {
                    log::warn!(
                        "column {} has no numeric interpretation, using NaN",
                        series.name()
                    );
                    Ok(vec![f64::NAN; series.len()])
                }
            }
        }
    }

    /// Whole-column statistics by index
    pub fn column_stats(&self, col_idx: usize) -> Result<super::stats::Stats> {
        let series = self.column_series(col_idx)?;
        Ok(super::stats::calculate_stats(&series))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn write_csv(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_datasource_csv_loading() {
        let file = write_csv(&["x,y,z", "1,2,3", "4,5,6", "7,8,9"]);
        let ds = DataSource::load(file.path()).unwrap();

        assert_eq!(ds.height(), 3);
        assert_eq!(ds.width(), 3);
        assert_eq!(ds.column_names(), vec!["x", "y", "z"]);
        assert_eq!(ds.column_index("y").unwrap(), 1);
        assert_eq!(ds.column_as_f64(0).unwrap(), vec![1.0, 4.0, 7.0]);
        assert_eq!(ds.file_path(), Some(file.path()));
    }

    #[test]
    fn test_numeric_column_is_cached() {
        let file = write_csv(&["a,b", "1,2", "3,4"]);
        let ds = DataSource::load(file.path()).unwrap();

        let first = ds.numeric_column("b").unwrap();
        let second = ds.numeric_column("b").unwrap();
        assert_eq!(&*first, &[2.0, 4.0]);
        assert!(Arc::ptr_eq(&first, &second));

        let err = ds.numeric_column("missing").unwrap_err();
        assert!(matches!(err, LinkError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = Builder::new().suffix(".shp").tempfile().unwrap();
        let err = DataSource::load(file.path()).err().unwrap();
        assert!(matches!(
            err,
            LinkError::UnsupportedFormat { ref extension } if extension == "shp"
        ));
    }

    #[test]
    fn test_datasource_statistics() {
        let file = write_csv(&["values", "1", "2", "3", "4", "5"]);
        let ds = DataSource::load(file.path()).unwrap();

        let stats = ds.column_stats(0).unwrap();
        assert_eq!(stats.mean, 3.0);
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.count, 5);

        assert!(matches!(
            ds.column_stats(4),
            Err(LinkError::InvalidColumnIndex { index: 4, max: 1 })
        ));
    }

    #[test]
    fn test_datasource_date_parsing() {
        let file = write_csv(&[
            "date,value",
            "2024-01-01,10.5",
            "2024-01-02,15.3",
            "2024-01-03,12.8",
        ]);
        let ds = DataSource::load(file.path()).unwrap();

        let timestamps = ds.column_as_f64(0).unwrap();
        assert_eq!(timestamps.len(), 3);

        let start_ts = 1704067200.0; // 2024-01-01 00:00:00 UTC
        let end_ts = 1704326400.0; // 2024-01-04 00:00:00 UTC
        for &ts in &timestamps {
            assert!(ts >= start_ts && ts <= end_ts, "timestamp {} out of range", ts);
        }
        assert_eq!(ds.column_as_f64(1).unwrap(), vec![10.5, 15.3, 12.8]);
    }

    #[test]
    fn test_datasource_parquet_loading() {
        let mut df = polars::df!("id" => [1i64, 2, 3], "rate" => [0.5, 1.5, 2.5]).unwrap();
        let file = Builder::new().suffix(".parquet").tempfile().unwrap();
        ParquetWriter::new(file.reopen().unwrap())
            .finish(&mut df)
            .unwrap();

        let ds = DataSource::load(file.path()).unwrap();
        assert_eq!(ds.height(), 3);
        assert_eq!(ds.column_names(), vec!["id", "rate"]);
        assert_eq!(&*ds.numeric_column("rate").unwrap(), &[0.5, 1.5, 2.5]);
        assert_eq!(&*ds.numeric_column("id").unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_from_dataframe() {
        let df = polars::df!("id" => [1i64, 2, 3], "rate" => [0.5, 1.5, 2.5]).unwrap();
        let ds = DataSource::from_dataframe(df, None);

        assert_eq!(ds.height(), 3);
        assert!(ds.file_path().is_none());
        assert_eq!(&*ds.numeric_column("id").unwrap(), &[1.0, 2.0, 3.0]);
    }
}
