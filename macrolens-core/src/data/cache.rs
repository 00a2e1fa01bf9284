//! On-disk response cache.
//!
//! Layout:
//! - `{cache_dir}/macro/{key}.parquet` + `{key}.meta.json` for long tables
//! - `{cache_dir}/fundamentals/{SYMBOL}.json` + `{SYMBOL}.meta.json`
//!
//! Keys are BLAKE3 hashes of the request arguments. Writes go to `.tmp` and
//! are renamed into place. Corrupt Parquet files are renamed to
//! `.quarantined` and read as a miss. Entries older than the TTL are stale.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::provider::{DataError, DataSource};
use crate::domain::{Fundamentals, Indicator};
use crate::table::LongTable;

const MACRO_DIR: &str = "macro";
const FUNDAMENTALS_DIR: &str = "fundamentals";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKind {
    Macro,
    Fundamentals,
}

/// Metadata sidecar for one cached response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub key: String,
    pub kind: CacheKind,
    /// Human-readable description of the request.
    pub label: String,
    pub rows: usize,
    pub cached_at: NaiveDateTime,
    pub source: DataSource,
}

/// One entry as reported by `cache status`.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub meta: CacheMeta,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub fresh: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanReport {
    pub removed: usize,
    pub bytes_freed: u64,
}

pub struct ResponseCache {
    cache_dir: PathBuf,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ttl: Duration::hours(24),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stable key for a macro request. Country order and case don't matter.
    pub fn macro_key(
        provider: &str,
        indicator: Indicator,
        countries: &[&str],
        start_year: i32,
        end_year: i32,
    ) -> String {
        let mut codes: Vec<String> = countries.iter().map(|c| c.to_uppercase()).collect();
        codes.sort();
        codes.dedup();
        let input = format!(
            "{provider}|{}|{}|{start_year}|{end_year}",
            indicator.code(),
            codes.join(";")
        );
        blake3::hash(input.as_bytes()).to_hex()[..32].to_string()
    }

    fn macro_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(MACRO_DIR).join(format!("{key}.parquet"))
    }

    fn fundamentals_path(&self, symbol: &str) -> PathBuf {
        self.cache_dir
            .join(FUNDAMENTALS_DIR)
            .join(format!("{}.json", symbol.to_uppercase()))
    }

    fn meta_path(data_path: &Path) -> PathBuf {
        data_path.with_extension("meta.json")
    }

    fn is_fresh(&self, meta: &CacheMeta) -> bool {
        now() - meta.cached_at < self.ttl
    }

    fn read_meta(data_path: &Path) -> Option<CacheMeta> {
        let content = fs::read_to_string(Self::meta_path(data_path)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Fresh cached table for `key`, or `None` on miss, staleness or corruption.
    pub fn get_macro(&self, key: &str) -> Option<LongTable> {
        let path = self.macro_path(key);
        let meta = Self::read_meta(&path)?;
        if !self.is_fresh(&meta) {
            tracing::debug!(key, label = %meta.label, "cache entry stale");
            return None;
        }
        self.load_macro(&path)
    }

    /// Cached table for `key` regardless of age, with its metadata.
    pub fn get_macro_any(&self, key: &str) -> Option<(LongTable, CacheMeta)> {
        let path = self.macro_path(key);
        let meta = Self::read_meta(&path)?;
        let table = self.load_macro(&path)?;
        Some((table, meta))
    }

    fn load_macro(&self, path: &Path) -> Option<LongTable> {
        if !path.exists() {
            return None;
        }
        match read_long_parquet(path) {
            Ok(table) => {
                tracing::debug!(path = %path.display(), rows = table.len(), "cache hit");
                Some(table)
            }
            Err(e) => {
                quarantine(path, &e);
                None
            }
        }
    }

    pub fn put_macro(
        &self,
        key: &str,
        label: &str,
        table: &LongTable,
        source: DataSource,
    ) -> Result<(), DataError> {
        if table.is_empty() {
            return Err(DataError::CacheError("no rows to cache".into()));
        }
        let path = self.macro_path(key);
        ensure_parent(&path)?;

        let tmp = path.with_extension("parquet.tmp");
        write_parquet(table.dataframe(), &tmp)?;
        rename_into_place(&tmp, &path)?;

        self.write_meta(
            &path,
            CacheMeta {
                key: key.to_string(),
                kind: CacheKind::Macro,
                label: label.to_string(),
                rows: table.len(),
                cached_at: now(),
                source,
            },
        )
    }

    pub fn get_fundamentals(&self, symbol: &str) -> Option<Fundamentals> {
        let path = self.fundamentals_path(symbol);
        let meta = Self::read_meta(&path)?;
        if !self.is_fresh(&meta) {
            return None;
        }
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(f) => Some(f),
            Err(e) => {
                quarantine(&path, &DataError::CacheError(e.to_string()));
                None
            }
        }
    }

    pub fn put_fundamentals(&self, fundamentals: &Fundamentals) -> Result<(), DataError> {
        let path = self.fundamentals_path(&fundamentals.symbol);
        ensure_parent(&path)?;
        let json = serde_json::to_string_pretty(fundamentals)
            .map_err(|e| DataError::CacheError(format!("fundamentals serialization: {e}")))?;
        write_atomic(&path, json.as_bytes())?;

        self.write_meta(
            &path,
            CacheMeta {
                key: fundamentals.symbol.to_uppercase(),
                kind: CacheKind::Fundamentals,
                label: format!("fundamentals {}", fundamentals.symbol.to_uppercase()),
                rows: 1,
                cached_at: now(),
                source: DataSource::YahooFinance,
            },
        )
    }

    fn write_meta(&self, data_path: &Path, meta: CacheMeta) -> Result<(), DataError> {
        let json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        write_atomic(&Self::meta_path(data_path), json.as_bytes())
    }

    /// Every readable entry, newest first.
    pub fn entries(&self) -> Vec<CacheEntry> {
        let mut out = Vec::new();
        for (dir, ext) in [(MACRO_DIR, "parquet"), (FUNDAMENTALS_DIR, "json")] {
            let Ok(read) = fs::read_dir(self.cache_dir.join(dir)) else {
                continue;
            };
            for entry in read.flatten() {
                let path = entry.path();
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                if !name.ends_with(".meta.json") {
                    continue;
                }
                let stem = name.trim_end_matches(".meta.json");
                let data_path = path.with_file_name(format!("{stem}.{ext}"));
                let Some(meta) = Self::read_meta(&data_path) else {
                    continue;
                };
                let size_bytes = file_size(&data_path) + file_size(&path);
                out.push(CacheEntry {
                    fresh: self.is_fresh(&meta),
                    meta,
                    path: data_path,
                    size_bytes,
                });
            }
        }
        out.sort_by(|a, b| b.meta.cached_at.cmp(&a.meta.cached_at));
        out
    }

    /// Remove entries cached more than `days` days ago, plus any quarantined
    /// or leftover temp files.
    pub fn clean_older_than(&self, days: u32) -> Result<CleanReport, DataError> {
        let cutoff = now() - Duration::days(i64::from(days));
        let mut report = CleanReport::default();

        for entry in self.entries() {
            if entry.meta.cached_at >= cutoff {
                continue;
            }
            report.bytes_freed += entry.size_bytes;
            report.removed += 1;
            remove_if_exists(&entry.path)?;
            remove_if_exists(&Self::meta_path(&entry.path))?;
        }

        for dir in [MACRO_DIR, FUNDAMENTALS_DIR] {
            let Ok(read) = fs::read_dir(self.cache_dir.join(dir)) else {
                continue;
            };
            for entry in read.flatten() {
                let path = entry.path();
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                if name.ends_with(".quarantined") || name.ends_with(".tmp") {
                    report.bytes_freed += file_size(&path);
                    remove_if_exists(&path)?;
                }
            }
        }

        tracing::info!(
            removed = report.removed,
            bytes = report.bytes_freed,
            "cache cleaned"
        );
        Ok(report)
    }
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn ensure_parent(path: &Path) -> Result<(), DataError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;
    }
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<(), DataError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DataError::CacheError(format!(
            "remove {}: {e}",
            path.display()
        ))),
    }
}

fn rename_into_place(tmp: &Path, path: &Path) -> Result<(), DataError> {
    fs::rename(tmp, path).map_err(|e| {
        let _ = fs::remove_file(tmp);
        DataError::CacheError(format!("atomic rename failed: {e}"))
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DataError> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);
    fs::write(&tmp, bytes).map_err(|e| DataError::CacheError(format!("write: {e}")))?;
    rename_into_place(&tmp, path)
}

fn quarantine(path: &Path, reason: &DataError) {
    let mut name = path.as_os_str().to_owned();
    name.push(".quarantined");
    tracing::warn!(path = %path.display(), error = %reason, "quarantining corrupt cache file");
    let _ = fs::rename(path, PathBuf::from(name));
}

fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), DataError> {
    let file =
        fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

fn read_long_parquet(path: &Path) -> Result<LongTable, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;
    if df.height() == 0 {
        return Err(DataError::ParquetError("empty parquet file".into()));
    }
    LongTable::from_dataframe(&df).map_err(|e| DataError::ParquetError(e.to_string()))
}
