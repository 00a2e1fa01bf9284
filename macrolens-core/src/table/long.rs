//! The long-format macro table: one row per `(country, series, year)`.
//!
//! Invariants held by every `LongTable`:
//! - schema is `country: String, series: String, year: Int32, value: Float64`
//! - no null or non-finite values
//! - rows sorted by `(country, series, year)` with no duplicate keys

use std::collections::BTreeMap;
use std::path::Path;

use polars::prelude::*;
use thiserror::Error;

use crate::domain::Observation;

pub const COUNTRY: &str = "country";
pub const SERIES: &str = "series";
pub const YEAR: &str = "year";
pub const VALUE: &str = "value";

#[derive(Debug, Error)]
pub enum TableError {
    #[error("polars: {0}")]
    Polars(#[from] PolarsError),

    #[error("schema: {0}")]
    Schema(String),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct LongTable {
    df: DataFrame,
}

impl LongTable {
    pub fn empty() -> Self {
        Self::build(BTreeMap::new()).unwrap_or_else(|_| Self {
            df: DataFrame::empty(),
        })
    }

    /// Build from observations. Later duplicates of a key win; non-finite
    /// values are dropped.
    pub fn from_observations(observations: &[Observation]) -> Result<Self, TableError> {
        let mut rows = BTreeMap::new();
        for obs in observations {
            if obs.value.is_finite() {
                rows.insert(
                    (obs.country.clone(), obs.series.clone(), obs.year),
                    obs.value,
                );
            }
        }
        Self::build(rows)
    }

    /// Adopt a DataFrame with the long schema, normalizing types and order.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self, TableError> {
        for name in [COUNTRY, SERIES, YEAR, VALUE] {
            if df.column(name).is_err() {
                return Err(TableError::Schema(format!("missing column '{name}'")));
            }
        }
        let normalized = DataFrame::new(vec![
            df.column(COUNTRY)?.cast(&DataType::String)?,
            df.column(SERIES)?.cast(&DataType::String)?,
            df.column(YEAR)?.cast(&DataType::Int32)?,
            df.column(VALUE)?.cast(&DataType::Float64)?,
        ])?;
        let observations = extract(&normalized)?;
        Self::from_observations(&observations)
    }

    fn build(rows: BTreeMap<(String, String, i32), f64>) -> Result<Self, TableError> {
        let n = rows.len();
        let mut countries = Vec::with_capacity(n);
        let mut series = Vec::with_capacity(n);
        let mut years = Vec::with_capacity(n);
        let mut values = Vec::with_capacity(n);
        for ((c, s, y), v) in rows {
            countries.push(c);
            series.push(s);
            years.push(y);
            values.push(v);
        }
        let df = DataFrame::new(vec![
            Column::new(COUNTRY.into(), countries),
            Column::new(SERIES.into(), series),
            Column::new(YEAR.into(), years),
            Column::new(VALUE.into(), values),
        ])?;
        Ok(Self { df })
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    pub fn observations(&self) -> Result<Vec<Observation>, TableError> {
        extract(&self.df)
    }

    fn filter_eq(&self, column: &str, value: &str) -> Result<Self, TableError> {
        let df = self
            .df
            .clone()
            .lazy()
            .filter(col(column).eq(lit(value)))
            .collect()?;
        Ok(Self { df })
    }

    pub fn filter_country(&self, country: &str) -> Result<Self, TableError> {
        self.filter_eq(COUNTRY, country)
    }

    pub fn filter_series(&self, series: &str) -> Result<Self, TableError> {
        self.filter_eq(SERIES, series)
    }

    /// `(year, value)` points of one series for one country, oldest first.
    pub fn series_for(&self, country: &str, series: &str) -> Result<Vec<(i32, f64)>, TableError> {
        let subset = self.filter_country(country)?.filter_series(series)?;
        Ok(subset
            .observations()?
            .into_iter()
            .map(|o| (o.year, o.value))
            .collect())
    }

    /// Most recent `(year, value)` of a series.
    pub fn latest(&self, country: &str, series: &str) -> Result<Option<(i32, f64)>, TableError> {
        Ok(self.series_for(country, series)?.last().copied())
    }

    fn distinct(&self, column: &str) -> Result<Vec<String>, TableError> {
        let ca = self.df.column(column)?.str()?;
        let mut out: Vec<String> = ca.into_iter().flatten().map(String::from).collect();
        out.dedup();
        out.sort();
        out.dedup();
        Ok(out)
    }

    pub fn countries(&self) -> Result<Vec<String>, TableError> {
        self.distinct(COUNTRY)
    }

    pub fn series_codes(&self) -> Result<Vec<String>, TableError> {
        self.distinct(SERIES)
    }

    /// Union of several tables; on key collisions the later table wins.
    pub fn concat<'a>(tables: impl IntoIterator<Item = &'a LongTable>) -> Result<Self, TableError> {
        let mut all = Vec::new();
        for t in tables {
            all.extend(t.observations()?);
        }
        Self::from_observations(&all)
    }

    /// Write as CSV with a `country,series,year,value` header.
    pub fn write_csv(&self, path: &Path) -> Result<(), TableError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut writer = csv::Writer::from_path(path)?;
        for obs in self.observations()? {
            writer.serialize(&obs)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl Default for LongTable {
    fn default() -> Self {
        Self::empty()
    }
}

fn extract(df: &DataFrame) -> Result<Vec<Observation>, TableError> {
    let countries = df.column(COUNTRY)?.str()?;
    let series = df.column(SERIES)?.str()?;
    let years = df.column(YEAR)?.i32()?;
    let values = df.column(VALUE)?.f64()?;

    let mut out = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let (Some(c), Some(s), Some(y), Some(v)) =
            (countries.get(i), series.get(i), years.get(i), values.get(i))
        else {
            continue;
        };
        if v.is_finite() {
            out.push(Observation::new(c, s, y, v));
        }
    }
    Ok(out)
}
