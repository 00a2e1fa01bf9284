//! Country sets: region-organized ISO3 country lists.
//!
//! Stored as TOML with regions mapping to their member countries. The
//! dashboard selects individual countries or entire regions from this tree.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A single economy, identified by its ISO3 code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Country {
    pub code: String,
    pub name: String,
}

impl Country {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into().to_uppercase(),
            name: name.into(),
        }
    }
}

/// Regions and their member countries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountrySet {
    pub regions: BTreeMap<String, Vec<Country>>,
}

impl CountrySet {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("read country file: {e}"))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("parse country TOML: {e}"))
    }

    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("serialize country set: {e}"))
    }

    /// Unique ISO3 codes across all regions, in region order.
    pub fn all_codes(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.regions
            .values()
            .flat_map(|cs| cs.iter().map(|c| c.code.as_str()))
            .filter(|code| seen.insert(*code))
            .collect()
    }

    pub fn region_codes(&self, region: &str) -> Option<Vec<&str>> {
        self.regions
            .get(region)
            .map(|cs| cs.iter().map(|c| c.code.as_str()).collect())
    }

    pub fn region_countries(&self, region: &str) -> Option<&[Country]> {
        self.regions.get(region).map(|v| v.as_slice())
    }

    pub fn region_names(&self) -> Vec<&str> {
        self.regions.keys().map(|s| s.as_str()).collect()
    }

    pub fn country_count(&self) -> usize {
        self.all_codes().len()
    }

    /// Display name for a code, falling back to the code itself.
    pub fn name_of<'a>(&'a self, code: &'a str) -> &'a str {
        self.regions
            .values()
            .flatten()
            .find(|c| c.code.eq_ignore_ascii_case(code))
            .map(|c| c.name.as_str())
            .unwrap_or(code)
    }

    pub fn default_world() -> Self {
        fn region(entries: &[(&str, &str)]) -> Vec<Country> {
            entries.iter().map(|(c, n)| Country::new(*c, *n)).collect()
        }

        let mut regions = BTreeMap::new();
        regions.insert(
            "G7".into(),
            region(&[
                ("USA", "United States"),
                ("JPN", "Japan"),
                ("DEU", "Germany"),
                ("GBR", "United Kingdom"),
                ("FRA", "France"),
                ("ITA", "Italy"),
                ("CAN", "Canada"),
            ]),
        );
        regions.insert(
            "Europe".into(),
            region(&[
                ("ESP", "Spain"),
                ("NLD", "Netherlands"),
                ("PRT", "Portugal"),
                ("POL", "Poland"),
                ("SWE", "Sweden"),
                ("CHE", "Switzerland"),
            ]),
        );
        regions.insert(
            "Emerging".into(),
            region(&[
                ("CHN", "China"),
                ("IND", "India"),
                ("IDN", "Indonesia"),
                ("TUR", "Turkiye"),
                ("ZAF", "South Africa"),
            ]),
        );
        regions.insert(
            "LatAm".into(),
            region(&[
                ("BRA", "Brazil"),
                ("MEX", "Mexico"),
                ("ARG", "Argentina"),
                ("CHL", "Chile"),
                ("COL", "Colombia"),
            ]),
        );

        Self { regions }
    }
}

impl Default for CountrySet {
    fn default() -> Self {
        Self::default_world()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_has_regions() {
        let set = CountrySet::default_world();
        assert!(set.region_names().contains(&"G7"));
        assert!(set.region_names().contains(&"LatAm"));
        assert!(set.country_count() > 20);
    }

    #[test]
    fn toml_roundtrip() {
        let set = CountrySet::default_world();
        let text = set.to_toml().unwrap();
        let parsed = CountrySet::from_toml(&text).unwrap();
        assert_eq!(set, parsed);
    }

    #[test]
    fn codes_are_unique_and_uppercase() {
        let mut set = CountrySet::default_world();
        set.regions
            .get_mut("Europe")
            .unwrap()
            .push(Country::new("usa", "Duplicate"));
        let codes = set.all_codes();
        assert_eq!(codes.iter().filter(|c| **c == "USA").count(), 1);
    }

    #[test]
    fn name_lookup_falls_back_to_code() {
        let set = CountrySet::default_world();
        assert_eq!(set.name_of("deu"), "Germany");
        assert_eq!(set.name_of("XYZ"), "XYZ");
    }
}
