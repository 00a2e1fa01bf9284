//! Long/wide table reshaping on top of Polars.

pub mod long;
pub mod reshape;

pub use long::{LongTable, TableError, COUNTRY, SERIES, VALUE, YEAR};
pub use reshape::{long_from_wide_years, melt, wide_by_year, year_column};
