//! Time-indexed numeric tables (load and capacity-factor profiles).

use crate::source::DataSource;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use tracing::{debug, info};

pub const DEFAULT_TIMESERIES_URL: &str =
    "https://tubcloud.tu-berlin.de/s/pKttFadrbTKSJKF/download/time-series-lecture-2.csv";

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse a timestamp in any of the accepted layouts.
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN));
    }
    Err(anyhow!("unrecognised timestamp '{}'", s))
}

/// Column-oriented table with a strictly increasing datetime index
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    index: Vec<NaiveDateTime>,
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl TimeSeries {
    pub fn new(index: Vec<NaiveDateTime>) -> Result<Self> {
        if index.windows(2).any(|w| w[0] >= w[1]) {
            bail!("time index must be strictly increasing");
        }
        Ok(Self {
            index,
            names: Vec::new(),
            columns: Vec::new(),
        })
    }

    /// Add or replace a column; its length must match the index.
    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if values.len() != self.index.len() {
            bail!(
                "column '{}' has {} values for {} timestamps",
                name,
                values.len(),
                self.index.len()
            );
        }
        match self.names.iter().position(|n| *n == name) {
            Some(i) => self.columns[i] = values,
            None => {
                self.names.push(name);
                self.columns.push(values);
            }
        }
        Ok(())
    }

    /// Parse CSV text whose first column holds timestamps. Empty cells are
    /// read as missing (NaN).
    pub fn from_csv_str(text: &str) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers = rdr.headers().context("reading time-series header")?.clone();
        if headers.len() < 2 {
            bail!("time series needs an index column and at least one value column");
        }
        let names: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

        let mut index = Vec::new();
        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); names.len()];
        for (row, record) in rdr.records().enumerate() {
            let record = record.with_context(|| format!("reading time-series row {}", row + 1))?;
            let stamp = record
                .get(0)
                .ok_or_else(|| anyhow!("row {} has no timestamp", row + 1))?;
            index.push(parse_datetime(stamp).with_context(|| format!("row {}", row + 1))?);
            for (col, values) in columns.iter_mut().enumerate() {
                let cell = record.get(col + 1).unwrap_or("");
                if cell.is_empty() {
                    values.push(f64::NAN);
                    continue;
                }
                let value: f64 = cell.parse().with_context(|| {
                    format!("row {} column '{}': invalid number '{}'", row + 1, names[col], cell)
                })?;
                values.push(value);
            }
        }

        let mut series = Self::new(index)?;
        for (name, values) in names.into_iter().zip(columns) {
            series.insert_column(name, values)?;
        }
        debug!(
            "Parsed time series with {} rows and {} columns",
            series.len(),
            series.names.len()
        );
        Ok(series)
    }

    pub fn load(source: &DataSource) -> Result<Self> {
        let text = source.read_to_string()?;
        let series =
            Self::from_csv_str(&text).with_context(|| format!("parsing time series {}", source))?;
        info!(
            "Loaded {} snapshots ({}) from {}",
            series.len(),
            series.names.join(", "),
            source
        );
        Ok(series)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
            .ok_or_else(|| {
                anyhow!(
                    "time series has no column '{}' (available: {})",
                    name,
                    self.names.join(", ")
                )
            })
    }

    /// Like [`Self::column`], but fails on the first missing value.
    pub fn complete_column(&self, name: &str) -> Result<&[f64]> {
        let values = self.column(name)?;
        if let Some(row) = values.iter().position(|v| v.is_nan()) {
            let missing = values.iter().filter(|v| v.is_nan()).count();
            bail!(
                "column '{}' has {} missing values, the first at {}",
                name,
                missing,
                self.index[row]
            );
        }
        Ok(values)
    }

    /// Multiply every value of a column by `factor`.
    pub fn scale(&mut self, name: &str, factor: f64) -> Result<()> {
        let i = self
            .names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| anyhow!("time series has no column '{}'", name))?;
        for v in &mut self.columns[i] {
            *v *= factor;
        }
        Ok(())
    }

    /// Downsample to fixed buckets of `hours`, keeping the first non-missing
    /// value of each column in each bucket.
    ///
    /// Buckets start at midnight of the first timestamp's day and are labelled
    /// by their start time. Empty buckets are dropped; a bucket with no value
    /// in some column stays missing there.
    pub fn resample_first(&self, hours: u32) -> Result<Self> {
        if hours == 0 {
            bail!("resample resolution must be at least one hour");
        }
        let Some(first) = self.index.first() else {
            return Ok(self.clone());
        };
        let origin = first.date().and_time(chrono::NaiveTime::MIN);
        let width = Duration::hours(i64::from(hours));

        let mut index = Vec::new();
        let mut buckets: Vec<Vec<usize>> = Vec::new();
        let mut last_bucket = None;
        for (row, stamp) in self.index.iter().enumerate() {
            let bucket = (*stamp - origin).num_seconds().div_euclid(width.num_seconds());
            if last_bucket != Some(bucket) {
                last_bucket = Some(bucket);
                index.push(origin + width * bucket as i32);
                buckets.push(Vec::new());
            }
            if let Some(rows) = buckets.last_mut() {
                rows.push(row);
            }
        }

        let mut out = Self::new(index)?;
        for (name, values) in self.names.iter().zip(&self.columns) {
            let firsts = buckets
                .iter()
                .map(|rows| {
                    rows.iter()
                        .map(|&r| values[r])
                        .find(|v| !v.is_nan())
                        .unwrap_or(f64::NAN)
                })
                .collect();
            out.insert_column(name.clone(), firsts)?;
        }
        debug!(
            "Resampled {} rows to {} at {} h",
            self.len(),
            out.len(),
            hours
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hourly_csv(hours: usize) -> String {
        let mut text = String::from(",load,solar\n");
        for h in 0..hours {
            text.push_str(&format!(
                "2015-01-{:02} {:02}:00:00,{},{}\n",
                1 + h / 24,
                h % 24,
                h as f64,
                (h % 24) as f64 / 24.0
            ));
        }
        text
    }

    #[test]
    fn test_parse_formats() {
        let expected = NaiveDate::from_ymd_opt(2015, 1, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        for s in [
            "2015-01-01 06:00:00",
            "2015-01-01T06:00:00",
            "2015-01-01 06:00",
            "2015-01-01T06:00:00+00:00",
        ] {
            assert_eq!(parse_datetime(s).unwrap(), expected, "{}", s);
        }
        assert_eq!(
            parse_datetime("2015-01-01").unwrap(),
            expected - Duration::hours(6)
        );
        assert!(parse_datetime("first of january").is_err());
    }

    #[test]
    fn test_column_and_scale() {
        let mut ts = TimeSeries::from_csv_str(&hourly_csv(3)).unwrap();
        assert_eq!(ts.len(), 3);
        assert_eq!(ts.column_names(), &["load".to_string(), "solar".to_string()]);
        ts.scale("load", 1e3).unwrap();
        assert_eq!(ts.column("load").unwrap(), &[0.0, 1000.0, 2000.0]);
        assert!(ts.column("wind").is_err());
        assert!(ts.scale("wind", 2.0).is_err());
    }

    #[test]
    fn test_resample_keeps_every_kth_row() {
        let ts = TimeSeries::from_csv_str(&hourly_csv(48)).unwrap();
        let coarse = ts.resample_first(4).unwrap();
        assert_eq!(coarse.len(), 12);
        let load = coarse.column("load").unwrap();
        assert_eq!(load[0], 0.0);
        assert_eq!(load[1], 4.0);
        assert_eq!(load[11], 44.0);
        assert_eq!(coarse.index()[6] - coarse.index()[0], Duration::hours(24));
    }

    #[test]
    fn test_resample_aligns_to_midnight() {
        let text = "time,load\n2015-01-01 02:00,1\n2015-01-01 03:00,2\n2015-01-01 04:00,3\n2015-01-01 05:00,4\n";
        let ts = TimeSeries::from_csv_str(text).unwrap();
        let coarse = ts.resample_first(4).unwrap();
        assert_eq!(coarse.column("load").unwrap(), &[1.0, 3.0]);
        assert_eq!(coarse.index()[0].to_string(), "2015-01-01 00:00:00");
        assert_eq!(coarse.index()[1].to_string(), "2015-01-01 04:00:00");
    }

    #[test]
    fn test_empty_cells_are_missing() {
        let text = "time,load,wind\n2015-01-01 00:00,,0.5\n2015-01-01 01:00,2,\n";
        let ts = TimeSeries::from_csv_str(text).unwrap();
        let load = ts.column("load").unwrap();
        assert!(load[0].is_nan());
        assert_eq!(load[1], 2.0);
        assert!(ts.column("wind").unwrap()[1].is_nan());

        let err = ts.complete_column("load").unwrap_err().to_string();
        assert!(err.contains("1 missing"), "{}", err);
        assert!(err.contains("2015-01-01 00:00:00"), "{}", err);
    }

    #[test]
    fn test_resample_skips_missing_values() {
        let text = "time,load,wind\n\
                    2015-01-01 00:00,,\n\
                    2015-01-01 01:00,5,\n\
                    2015-01-01 02:00,6,0.3\n\
                    2015-01-01 04:00,,\n\
                    2015-01-01 05:00,,\n";
        let ts = TimeSeries::from_csv_str(text).unwrap();
        let coarse = ts.resample_first(4).unwrap();
        assert_eq!(coarse.len(), 2);

        let load = coarse.column("load").unwrap();
        assert_eq!(load[0], 5.0);
        assert!(load[1].is_nan());
        let wind = coarse.column("wind").unwrap();
        assert_eq!(wind[0], 0.3);
        assert!(wind[1].is_nan());
    }

    #[test]
    fn test_invalid_input_rejected() {
        assert!(TimeSeries::from_csv_str("time,load\n2015-01-01,abc\n").is_err());
        assert!(TimeSeries::from_csv_str("time,load\n2015-01-02,1\n2015-01-01,2\n").is_err());
        assert!(TimeSeries::from_csv_str("time\n2015-01-01\n").is_err());
        let ts = TimeSeries::from_csv_str(&hourly_csv(2)).unwrap();
        assert!(ts.resample_first(0).is_err());
    }
}
