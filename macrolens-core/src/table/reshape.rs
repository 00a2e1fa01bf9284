//! Wide <-> long reshaping.
//!
//! Wide tables carry one row per `(country, series)` and one `YR{year}` column
//! per year, the layout the World Bank bulk downloads use.

use std::collections::BTreeMap;

use polars::prelude::*;

use super::long::{LongTable, TableError, COUNTRY, SERIES, VALUE, YEAR};
use crate::domain::Observation;

const YEAR_PREFIX: &str = "YR";

/// Column name for a year in a wide table.
pub fn year_column(year: i32) -> String {
    format!("{YEAR_PREFIX}{year}")
}

fn parse_year_column(name: &str) -> Option<i32> {
    name.strip_prefix(YEAR_PREFIX).unwrap_or(name).parse().ok()
}

/// Unpivot every column not in `id_vars` into `(variable_name, value_name)`
/// pairs, one block of rows per value column in column order.
///
/// Output height is `rows * (columns - id_vars)`. Value columns are cast to
/// `Float64`; nulls are kept.
pub fn melt(
    df: &DataFrame,
    id_vars: &[&str],
    variable_name: &str,
    value_name: &str,
) -> Result<DataFrame, TableError> {
    for id in id_vars {
        if df.column(id).is_err() {
            return Err(TableError::Schema(format!("id column '{id}' not found")));
        }
    }

    // empty `on` means every non-index column
    let mut out = df.unpivot2(UnpivotArgsIR {
        on: Vec::new(),
        index: id_vars.iter().map(|id| PlSmallStr::from(*id)).collect(),
        variable_name: Some(variable_name.into()),
        value_name: Some(value_name.into()),
    })?;
    let values = out.column(value_name)?.cast(&DataType::Float64)?;
    out.with_column(values)?;
    Ok(out)
}

/// Long -> wide: one row per `(country, series)`, one `YR{year}` column per
/// year present anywhere in the table. Gaps are null.
pub fn wide_by_year(long: &LongTable) -> Result<DataFrame, TableError> {
    let mut rows: BTreeMap<(String, String), BTreeMap<i32, f64>> = BTreeMap::new();
    let mut years = std::collections::BTreeSet::new();
    for obs in long.observations()? {
        years.insert(obs.year);
        rows.entry((obs.country, obs.series))
            .or_default()
            .insert(obs.year, obs.value);
    }

    let countries: Vec<&str> = rows.keys().map(|(c, _)| c.as_str()).collect();
    let series: Vec<&str> = rows.keys().map(|(_, s)| s.as_str()).collect();

    let mut cols = vec![
        Column::new(COUNTRY.into(), countries),
        Column::new(SERIES.into(), series),
    ];
    for year in &years {
        let values: Vec<Option<f64>> = rows.values().map(|r| r.get(year).copied()).collect();
        cols.push(Column::new(year_column(*year).into(), values));
    }
    Ok(DataFrame::new(cols)?)
}

/// Wide -> long: the inverse of [`wide_by_year`]. Year columns may be named
/// `YR2020` or `2020`; any other non-id column is a schema error. Null cells
/// are dropped.
pub fn long_from_wide_years(wide: &DataFrame) -> Result<LongTable, TableError> {
    let melted = melt(wide, &[COUNTRY, SERIES], YEAR, VALUE)?;

    let countries = melted.column(COUNTRY)?.cast(&DataType::String)?;
    let countries = countries.str()?;
    let series = melted.column(SERIES)?.cast(&DataType::String)?;
    let series = series.str()?;
    let labels = melted.column(YEAR)?.str()?;
    let values = melted.column(VALUE)?.f64()?;

    let mut observations = Vec::with_capacity(melted.height());
    for i in 0..melted.height() {
        let Some(label) = labels.get(i) else { continue };
        let year = parse_year_column(label)
            .ok_or_else(|| TableError::Schema(format!("'{label}' is not a year column")))?;
        let (Some(c), Some(s), Some(v)) = (countries.get(i), series.get(i), values.get(i)) else {
            continue;
        };
        observations.push(Observation::new(c, s, year, v));
    }
    LongTable::from_observations(&observations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide() -> DataFrame {
        DataFrame::new(vec![
            Column::new(COUNTRY.into(), ["USA", "DEU"]),
            Column::new(SERIES.into(), ["FP.CPI.TOTL.ZG", "FP.CPI.TOTL.ZG"]),
            Column::new("YR2021".into(), [Some(4.7), Some(3.1)]),
            Column::new("YR2022".into(), [Some(8.0), None]),
        ])
        .unwrap()
    }

    #[test]
    fn melt_height_is_rows_times_value_columns() {
        let out = melt(&wide(), &[COUNTRY, SERIES], "label", "v").unwrap();
        assert_eq!(out.height(), 4);
        assert_eq!(out.width(), 4);
        assert_eq!(out.column("v").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn melt_casts_integer_columns() {
        let df = DataFrame::new(vec![
            Column::new("id".into(), ["a"]),
            Column::new("n".into(), [3i64]),
        ])
        .unwrap();
        let out = melt(&df, &["id"], "variable", "value").unwrap();
        assert_eq!(out.column("value").unwrap().f64().unwrap().get(0), Some(3.0));
    }

    #[test]
    fn melt_stacks_value_columns_in_order() {
        let df = DataFrame::new(vec![
            Column::new("id".into(), ["a", "b"]),
            Column::new("x".into(), [1i32, 2]),
            Column::new("y".into(), [0.5f64, 1.5]),
        ])
        .unwrap();
        let out = melt(&df, &["id"], "variable", "value").unwrap();
        let ids: Vec<Option<&str>> = out.column("id").unwrap().str().unwrap().into_iter().collect();
        let vars: Vec<Option<&str>> = out
            .column("variable")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        let values: Vec<Option<f64>> = out.column("value").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(ids, vec![Some("a"), Some("b"), Some("a"), Some("b")]);
        assert_eq!(vars, vec![Some("x"), Some("x"), Some("y"), Some("y")]);
        assert_eq!(values, vec![Some(1.0), Some(2.0), Some(0.5), Some(1.5)]);
    }

    #[test]
    fn melt_with_no_value_columns_is_empty() {
        let df = DataFrame::new(vec![Column::new("id".into(), ["a", "b"])]).unwrap();
        let out = melt(&df, &["id"], "variable", "value").unwrap();
        assert_eq!(out.height(), 0);
        assert_eq!(out.width(), 3);
    }

    #[test]
    fn melt_rejects_unknown_id() {
        assert!(melt(&wide(), &["nope"], "variable", "value").is_err());
    }

    #[test]
    fn wide_to_long_drops_nulls() {
        let long = long_from_wide_years(&wide()).unwrap();
        assert_eq!(long.len(), 3);
        assert_eq!(
            long.series_for("USA", "FP.CPI.TOTL.ZG").unwrap(),
            vec![(2021, 4.7), (2022, 8.0)]
        );
        assert_eq!(long.latest("DEU", "FP.CPI.TOTL.ZG").unwrap(), Some((2021, 3.1)));
    }

    #[test]
    fn long_to_wide_fills_gaps_with_null() {
        let long = long_from_wide_years(&wide()).unwrap();
        let back = wide_by_year(&long).unwrap();
        assert_eq!(back.height(), 2);
        let names: Vec<String> = back.get_columns().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["country", "series", "YR2021", "YR2022"]);
        // rows are sorted, so DEU comes first
        let y2022 = back.column("YR2022").unwrap().f64().unwrap();
        assert_eq!(y2022.get(0), None);
        assert_eq!(y2022.get(1), Some(8.0));
    }

    #[test]
    fn bare_year_columns_are_accepted() {
        let df = DataFrame::new(vec![
            Column::new(COUNTRY.into(), ["JPN"]),
            Column::new(SERIES.into(), ["X"]),
            Column::new("2019".into(), [0.3f64]),
        ])
        .unwrap();
        let long = long_from_wide_years(&df).unwrap();
        assert_eq!(long.latest("JPN", "X").unwrap(), Some((2019, 0.3)));
    }

    #[test]
    fn non_year_column_is_schema_error() {
        let df = DataFrame::new(vec![
            Column::new(COUNTRY.into(), ["JPN"]),
            Column::new(SERIES.into(), ["X"]),
            Column::new("notes".into(), [1.0f64]),
        ])
        .unwrap();
        assert!(matches!(
            long_from_wide_years(&df),
            Err(TableError::Schema(_))
        ));
    }
}
