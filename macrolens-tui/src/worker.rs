//! Background worker thread. All network and analytics work runs here.
//!
//! Communication with the TUI main thread is via `mpsc` channels.
//! The worker creates a private rayon::ThreadPool (not the global pool)
//! for parallel fundamentals downloads.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rayon::prelude::*;

use macrolens_core::analytics::{health_scores, scan_alerts, Alert, HealthScore};
use macrolens_core::config::DashboardConfig;
use macrolens_core::data::{
    load_fundamentals, load_macro_panel, resolve_policy_rate, risk_free_from_policy,
    CentralBankCsvProvider, CircuitBreaker, DataError, DownloadProgress, FundamentalsProvider,
    LoadError, LoadOptions, MacroPanel, MacroProvider, RateProvider, ResponseCache, Sourced,
    WorldBankProvider, YahooProvider,
};
use macrolens_core::domain::{Fundamentals, Indicator};
use macrolens_core::table::LongTable;

const POOL_THREADS: usize = 4;

/// Commands sent from the TUI to the worker.
#[derive(Debug)]
pub enum WorkerCommand {
    LoadMacro {
        countries: Vec<String>,
        indicators: Vec<Indicator>,
        start_year: i32,
        end_year: i32,
        offline: bool,
        synthetic: bool,
        force: bool,
    },
    FetchFundamentals {
        symbols: Vec<String>,
        offline: bool,
    },
    FetchPolicyRate {
        country: String,
        offline: bool,
    },
    Shutdown,
}

/// Responses sent from the worker back to the TUI.
#[derive(Debug)]
pub enum WorkerResponse {
    // Macro panel
    MacroProgress {
        item: String,
        index: usize,
        total: usize,
    },
    MacroItemDone {
        item: String,
        error: Option<String>,
    },
    MacroLoaded {
        panel: Box<MacroPanel>,
        health: Vec<HealthScore>,
        alerts: Vec<Alert>,
        /// The load was cancelled; only some indicators are present.
        partial: bool,
    },
    MacroFailed {
        error: String,
    },

    // Fundamentals
    FundamentalsLoaded {
        symbol: String,
        fundamentals: Box<Sourced<Fundamentals>>,
    },
    FundamentalsFailed {
        symbol: String,
        error: String,
    },
    FundamentalsBatchDone {
        succeeded: usize,
        failed: usize,
    },

    /// Policy rate in percent and the derived risk-free fraction.
    PolicyRate {
        country: String,
        policy: Sourced<f64>,
        risk_free: Sourced<f64>,
    },

    Cancelled {
        what: String,
    },
}

/// Providers and cache owned by the worker. Breakers persist across commands.
struct Services {
    config: DashboardConfig,
    cache: ResponseCache,
    macro_provider: Option<WorldBankProvider>,
    fundamentals_provider: Option<YahooProvider>,
    rate_provider: Option<CentralBankCsvProvider>,
}

impl Services {
    fn new(config: DashboardConfig) -> Self {
        let ttl = i64::try_from(config.data.ttl_hours).unwrap_or(24);
        let cache = ResponseCache::new(config.data.cache_dir.clone())
            .with_ttl(chrono::Duration::hours(ttl));

        let macro_provider =
            WorldBankProvider::new(Arc::new(CircuitBreaker::default_provider("world_bank")))
                .map_err(|e| tracing::warn!(error = %e, "World Bank provider unavailable"))
                .ok();
        let fundamentals_provider =
            YahooProvider::new(Arc::new(CircuitBreaker::default_provider("yahoo_finance")))
                .map_err(|e| tracing::warn!(error = %e, "Yahoo provider unavailable"))
                .ok();
        let rate_provider = CentralBankCsvProvider::new(
            Arc::new(CircuitBreaker::default_provider("central_bank_csv")),
            config.rates.fred_series.clone(),
        )
        .map_err(|e| tracing::warn!(error = %e, "policy-rate provider unavailable"))
        .ok();

        Self {
            config,
            cache,
            macro_provider,
            fundamentals_provider,
            rate_provider,
        }
    }
}

/// Spawn the background worker thread.
pub fn spawn_worker(
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
    cancel: Arc<AtomicBool>,
    config: DashboardConfig,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("macrolens-worker".into())
        .spawn(move || {
            worker_loop(rx, tx, cancel, config);
        })
}

fn worker_loop(
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
    cancel: Arc<AtomicBool>,
    config: DashboardConfig,
) {
    // Private pool so downloads never compete with the global rayon pool.
    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(POOL_THREADS)
        .thread_name(|i| format!("macrolens-pool-{i}"))
        .build()
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "failed to build worker pool");
            return;
        }
    };
    let services = Services::new(config);

    loop {
        match rx.recv() {
            Ok(WorkerCommand::Shutdown) | Err(_) => break,
            Ok(cmd) => {
                cancel.store(false, Ordering::Relaxed);
                handle_command(cmd, &services, &pool, &tx, &cancel);
            }
        }
    }
    tracing::debug!("worker stopped");
}

fn handle_command(
    cmd: WorkerCommand,
    services: &Services,
    pool: &rayon::ThreadPool,
    tx: &Sender<WorkerResponse>,
    cancel: &AtomicBool,
) {
    match cmd {
        WorkerCommand::LoadMacro {
            countries,
            indicators,
            start_year,
            end_year,
            offline,
            synthetic,
            force,
        } => {
            let opts = LoadOptions {
                start_year,
                end_year,
                offline,
                synthetic,
                force,
            };
            handle_macro(&countries, &indicators, &opts, services, tx, cancel);
        }
        WorkerCommand::FetchFundamentals { symbols, offline } => {
            handle_fundamentals(&symbols, offline, services, pool, tx, cancel);
        }
        WorkerCommand::FetchPolicyRate { country, offline } => {
            handle_policy_rate(country, offline, services, tx);
        }
        WorkerCommand::Shutdown => {} // handled in loop
    }
}

fn handle_macro(
    countries: &[String],
    indicators: &[Indicator],
    opts: &LoadOptions,
    services: &Services,
    tx: &Sender<WorkerResponse>,
    cancel: &AtomicBool,
) {
    let refs: Vec<&str> = countries.iter().map(|s| s.as_str()).collect();
    let provider = services
        .macro_provider
        .as_ref()
        .map(|p| p as &dyn MacroProvider);

    // One indicator per call so cancellation is checked between downloads.
    let outcome = load_each(indicators, cancel, |i, indicator| {
        let progress = ChannelProgress {
            tx: tx.clone(),
            offset: i,
            total: indicators.len(),
        };
        load_macro_panel(
            &[indicator],
            &refs,
            &services.cache,
            provider,
            Some(&progress),
            opts,
        )
    });

    match outcome {
        MacroOutcome::Complete(parts) => {
            let _ = tx.send(analyse(parts, &refs, false));
        }
        MacroOutcome::Cancelled(parts) => {
            if !parts.is_empty() {
                let _ = tx.send(analyse(parts, &refs, true));
            }
            let _ = tx.send(WorkerResponse::Cancelled {
                what: "macro load".into(),
            });
        }
        MacroOutcome::Failed(e) => {
            let _ = tx.send(WorkerResponse::MacroFailed {
                error: e.to_string(),
            });
        }
    }
}

enum MacroOutcome {
    Complete(Vec<MacroPanel>),
    /// Stopped early; holds the indicators loaded before the cancel.
    Cancelled(Vec<MacroPanel>),
    Failed(LoadError),
}

fn load_each(
    indicators: &[Indicator],
    cancel: &AtomicBool,
    mut load_one: impl FnMut(usize, Indicator) -> Result<MacroPanel, LoadError>,
) -> MacroOutcome {
    let mut parts = Vec::with_capacity(indicators.len());
    for (i, &indicator) in indicators.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            return MacroOutcome::Cancelled(parts);
        }
        match load_one(i, indicator) {
            Ok(panel) => parts.push(panel),
            Err(e) => return MacroOutcome::Failed(e),
        }
    }
    MacroOutcome::Complete(parts)
}

/// Merge per-indicator panels and run health scores and alerts on the result.
fn analyse(parts: Vec<MacroPanel>, refs: &[&str], partial: bool) -> WorkerResponse {
    let mut merged = MacroPanel::default();
    let mut tables = Vec::with_capacity(parts.len());
    for part in parts {
        merged.sources.extend(part.sources);
        merged.missing.extend(part.missing);
        tables.push(part.table);
    }

    let analysed = LongTable::concat(tables.iter())
        .map_err(|e| e.to_string())
        .and_then(|table| {
            let health = health_scores(&table, refs).map_err(|e| e.to_string())?;
            let alerts = scan_alerts(&table, refs).map_err(|e| e.to_string())?;
            Ok((table, health, alerts))
        });

    match analysed {
        Ok((table, health, alerts)) => {
            merged.table = table;
            tracing::info!(
                rows = merged.table.len(),
                countries = refs.len(),
                alerts = alerts.len(),
                partial,
                "macro panel loaded"
            );
            WorkerResponse::MacroLoaded {
                panel: Box::new(merged),
                health,
                alerts,
                partial,
            }
        }
        Err(error) => WorkerResponse::MacroFailed { error },
    }
}

fn handle_fundamentals(
    symbols: &[String],
    offline: bool,
    services: &Services,
    pool: &rayon::ThreadPool,
    tx: &Sender<WorkerResponse>,
    cancel: &AtomicBool,
) {
    let provider = services
        .fundamentals_provider
        .as_ref()
        .map(|p| p as &dyn FundamentalsProvider);
    let opts = LoadOptions {
        offline,
        ..LoadOptions::from_config(&services.config.data)
    };

    let results: Vec<(String, Option<Result<Sourced<Fundamentals>, LoadError>>)> =
        pool.install(|| {
            symbols
                .par_iter()
                .map(|symbol| {
                    if cancel.load(Ordering::Relaxed) {
                        return (symbol.clone(), None);
                    }
                    let result = load_fundamentals(symbol, &services.cache, provider, &opts);
                    (symbol.clone(), Some(result))
                })
                .collect()
        });

    let mut succeeded = 0usize;
    let mut failed = 0usize;
    let mut skipped = 0usize;
    for (symbol, result) in results {
        match result {
            Some(Ok(fundamentals)) => {
                succeeded += 1;
                let _ = tx.send(WorkerResponse::FundamentalsLoaded {
                    symbol,
                    fundamentals: Box::new(fundamentals),
                });
            }
            Some(Err(e)) => {
                failed += 1;
                let _ = tx.send(WorkerResponse::FundamentalsFailed {
                    symbol,
                    error: e.to_string(),
                });
            }
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        let _ = tx.send(WorkerResponse::Cancelled {
            what: format!("fundamentals ({skipped} ticker(s) skipped)"),
        });
    } else {
        let _ = tx.send(WorkerResponse::FundamentalsBatchDone { succeeded, failed });
    }
}

fn handle_policy_rate(
    country: String,
    offline: bool,
    services: &Services,
    tx: &Sender<WorkerResponse>,
) {
    let provider = services
        .rate_provider
        .as_ref()
        .map(|p| p as &dyn RateProvider);
    let opts = LoadOptions {
        offline,
        ..LoadOptions::from_config(&services.config.data)
    };
    let policy = resolve_policy_rate(&country, provider, &services.config.rates, &opts);
    let risk_free = risk_free_from_policy(policy.clone(), &services.config.valuation);
    let _ = tx.send(WorkerResponse::PolicyRate {
        country,
        policy,
        risk_free,
    });
}

/// DownloadProgress implementation that sends messages through a channel.
///
/// The loader is called once per indicator, so `offset` and `total` place
/// each call within the whole batch.
struct ChannelProgress {
    tx: Sender<WorkerResponse>,
    offset: usize,
    total: usize,
}

impl DownloadProgress for ChannelProgress {
    fn on_start(&self, item: &str, _index: usize, _total: usize) {
        let _ = self.tx.send(WorkerResponse::MacroProgress {
            item: item.to_string(),
            index: self.offset,
            total: self.total,
        });
    }

    fn on_complete(&self, item: &str, _index: usize, _total: usize, result: &Result<(), DataError>) {
        // An empty series is reported through `MacroPanel::missing`, not as a failure.
        let error = match result {
            Err(DataError::NoData { .. }) | Ok(()) => None,
            Err(e) => Some(e.to_string()),
        };
        let _ = self.tx.send(WorkerResponse::MacroItemDone {
            item: item.to_string(),
            error,
        });
    }

    fn on_batch_complete(&self, _succeeded: usize, _failed: usize, _total: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    fn offline_config(dir: &std::path::Path) -> DashboardConfig {
        let mut config = DashboardConfig::default();
        config.data.cache_dir = dir.to_path_buf();
        config
    }

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "macrolens_worker_{name}_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn worker_shutdown() {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, _resp_rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));

        let handle = spawn_worker(cmd_rx, resp_tx, cancel, DashboardConfig::default()).unwrap();
        cmd_tx.send(WorkerCommand::Shutdown).unwrap();
        handle.join().expect("worker should join cleanly");
    }

    #[test]
    fn worker_uses_private_pool() {
        let global_threads = rayon::current_num_threads();
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, _resp_rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));

        let handle = spawn_worker(cmd_rx, resp_tx, cancel, DashboardConfig::default()).unwrap();
        assert_eq!(rayon::current_num_threads(), global_threads);

        cmd_tx.send(WorkerCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn offline_synthetic_macro_load_reports_progress_and_result() {
        let dir = temp_dir("synthetic");
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let handle = spawn_worker(cmd_rx, resp_tx, cancel, offline_config(&dir)).unwrap();

        cmd_tx
            .send(WorkerCommand::LoadMacro {
                countries: vec!["USA".into(), "DEU".into()],
                indicators: vec![Indicator::GdpGrowth, Indicator::Inflation],
                start_year: 2015,
                end_year: 2020,
                offline: true,
                synthetic: true,
                force: false,
            })
            .unwrap();

        let mut progress = 0;
        let loaded = loop {
            match resp_rx.recv_timeout(Duration::from_secs(10)).unwrap() {
                WorkerResponse::MacroProgress { .. } => progress += 1,
                WorkerResponse::MacroLoaded { panel, .. } => break panel,
                WorkerResponse::MacroItemDone { .. } => {}
                other => panic!("unexpected response: {other:?}"),
            }
        };
        assert_eq!(progress, 2);
        assert!(loaded.has_synthetic());
        assert_eq!(loaded.table.len(), 2 * 2 * 6);

        cmd_tx.send(WorkerCommand::Shutdown).unwrap();
        handle.join().unwrap();
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn offline_macro_without_cache_fails() {
        let dir = temp_dir("offline_fail");
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let handle = spawn_worker(cmd_rx, resp_tx, cancel, offline_config(&dir)).unwrap();

        cmd_tx
            .send(WorkerCommand::LoadMacro {
                countries: vec!["USA".into()],
                indicators: vec![Indicator::Unemployment],
                start_year: 2015,
                end_year: 2020,
                offline: true,
                synthetic: false,
                force: false,
            })
            .unwrap();

        let failed = loop {
            match resp_rx.recv_timeout(Duration::from_secs(10)).unwrap() {
                WorkerResponse::MacroFailed { error } => break error,
                WorkerResponse::MacroLoaded { .. } => panic!("offline load should fail"),
                _ => {}
            }
        };
        assert!(failed.contains("no cached data"));

        cmd_tx.send(WorkerCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn cancel_mid_load_keeps_loaded_indicators() {
        let dir = temp_dir("cancel_mid");
        let cache = ResponseCache::new(&dir);
        let opts = LoadOptions {
            start_year: 2015,
            end_year: 2020,
            offline: true,
            synthetic: true,
            force: false,
        };
        let refs = ["USA", "BRA"];
        let indicators = [
            Indicator::GdpGrowth,
            Indicator::Inflation,
            Indicator::Unemployment,
            Indicator::LendingRate,
        ];
        let cancel = AtomicBool::new(false);
        let mut calls = 0;

        // Esc arrives while the second indicator is downloading.
        let outcome = load_each(&indicators, &cancel, |_, indicator| {
            calls += 1;
            if calls == 2 {
                cancel.store(true, Ordering::Relaxed);
            }
            load_macro_panel(&[indicator], &refs, &cache, None, None, &opts)
        });
        let MacroOutcome::Cancelled(parts) = outcome else {
            panic!("expected a cancelled load");
        };
        assert_eq!(calls, 2);
        assert_eq!(parts.len(), 2);

        match analyse(parts, &refs, true) {
            WorkerResponse::MacroLoaded {
                panel,
                health,
                partial,
                ..
            } => {
                assert!(partial);
                let kept: Vec<Indicator> = panel.sources.keys().copied().collect();
                assert_eq!(kept, vec![Indicator::GdpGrowth, Indicator::Inflation]);
                assert_eq!(panel.table.len(), 2 * 2 * 6);
                assert_eq!(health.len(), 2);
            }
            other => panic!("unexpected response: {other:?}"),
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn cancel_before_first_indicator_loads_nothing() {
        let cancel = AtomicBool::new(true);
        let outcome = load_each(&[Indicator::GdpGrowth], &cancel, |_, _| {
            panic!("nothing should load after cancel")
        });
        assert!(matches!(outcome, MacroOutcome::Cancelled(parts) if parts.is_empty()));
    }

    #[test]
    fn offline_policy_rate_uses_fallbacks() {
        let dir = temp_dir("rate");
        let config = offline_config(&dir);
        let expected_policy = config.rates.nominal_fallback;
        let expected_rf = config.valuation.risk_free_fallback;
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let handle = spawn_worker(cmd_rx, resp_tx, cancel, config).unwrap();

        cmd_tx
            .send(WorkerCommand::FetchPolicyRate {
                country: "USA".into(),
                offline: true,
            })
            .unwrap();
        match resp_rx.recv_timeout(Duration::from_secs(10)).unwrap() {
            WorkerResponse::PolicyRate {
                country,
                policy,
                risk_free,
            } => {
                assert_eq!(country, "USA");
                assert_eq!(policy.value, expected_policy);
                assert!(policy.source.is_degraded());
                assert_eq!(risk_free.value, expected_rf);
            }
            other => panic!("unexpected response: {other:?}"),
        }

        cmd_tx.send(WorkerCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn offline_fundamentals_without_cache_fail_per_ticker() {
        let dir = temp_dir("fundamentals");
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let handle = spawn_worker(cmd_rx, resp_tx, cancel, offline_config(&dir)).unwrap();

        cmd_tx
            .send(WorkerCommand::FetchFundamentals {
                symbols: vec!["AAA".into(), "BBB".into()],
                offline: true,
            })
            .unwrap();

        let mut failed = Vec::new();
        loop {
            match resp_rx.recv_timeout(Duration::from_secs(10)).unwrap() {
                WorkerResponse::FundamentalsFailed { symbol, .. } => failed.push(symbol),
                WorkerResponse::FundamentalsBatchDone { succeeded, failed: n } => {
                    assert_eq!(succeeded, 0);
                    assert_eq!(n, 2);
                    break;
                }
                other => panic!("unexpected response: {other:?}"),
            }
        }
        failed.sort();
        assert_eq!(failed, vec!["AAA".to_string(), "BBB".to_string()]);

        cmd_tx.send(WorkerCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }
}
