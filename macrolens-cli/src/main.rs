//! MacroLens CLI: macro panels, analytics, valuation and cache management.
//!
//! Commands:
//! - `macro`: fetch indicators for a set of countries, print or export them
//! - `health`: macro health score per country
//! - `alerts`: recession and overheating alerts
//! - `spread`: projected real-rate spread for one country
//! - `value`: valuation scorecard for one ticker
//! - `screen`: scorecards for several tickers in parallel
//! - `cache status` / `cache clean`: inspect and prune the response cache

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use macrolens_core::analytics::{health_scores, project, scan_alerts, RateScenario, RateVerdict};
use macrolens_core::config::DashboardConfig;
use macrolens_core::data::{
    load_fundamentals, load_macro_panel, resolve_policy_rate, resolve_risk_free, CacheKind,
    CentralBankCsvProvider, CircuitBreaker, DataSource, LoadOptions, MacroPanel, ResponseCache,
    Sourced, StdoutProgress, WorldBankProvider, YahooProvider,
};
use macrolens_core::domain::Indicator;
use macrolens_core::table::wide_by_year;
use macrolens_core::valuation::{Scorecard, ValuationOverrides};

#[derive(Parser)]
#[command(
    name = "macrolens",
    about = "MacroLens CLI: macro indicators, real-rate spreads and equity valuation"
)]
struct Cli {
    /// Path to a TOML config file. Defaults to ./macrolens.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache directory. Overrides `data.cache_dir` from the config.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// More logging (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Country selection and fetch behaviour shared by the macro commands.
#[derive(clap::Args, Clone)]
struct PanelArgs {
    /// ISO3 country codes, comma-separated (e.g. USA,DEU,JPN).
    #[arg(long, value_delimiter = ',')]
    countries: Vec<String>,

    /// Named region from the config (e.g. G7, LatAm). Ignored with --countries.
    #[arg(long)]
    region: Option<String>,

    /// First year. Defaults to `data.start_year`.
    #[arg(long)]
    start: Option<i32>,

    /// Last year. Defaults to `data.end_year` or last calendar year.
    #[arg(long)]
    end: Option<i32>,

    /// Offline mode: no network access, cache only.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Use synthetic series when nothing real is available.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Refetch even when the cache is fresh.
    #[arg(long, default_value_t = false)]
    force: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch indicators into a long table.
    Macro {
        #[command(flatten)]
        panel: PanelArgs,

        /// World Bank codes or names, comma-separated. Defaults to every indicator.
        #[arg(long, value_delimiter = ',')]
        indicators: Vec<String>,

        /// Write the long table to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Print the wide (one column per year) table instead of a summary.
        #[arg(long, default_value_t = false)]
        wide: bool,
    },
    /// Macro health score per country, best first.
    Health {
        #[command(flatten)]
        panel: PanelArgs,
    },
    /// Recession and overheating alerts, most severe first.
    Alerts {
        #[command(flatten)]
        panel: PanelArgs,
    },
    /// Project the real-rate spread (nominal rate minus expected inflation).
    Spread {
        /// ISO3 country code.
        #[arg(long, default_value = "USA")]
        country: String,

        /// Nominal policy rate in percent. Defaults to the latest published rate.
        #[arg(long)]
        nominal: Option<f64>,

        /// Current inflation in percent. Defaults to the latest World Bank reading.
        #[arg(long)]
        current: Option<f64>,

        /// Expected inflation at the horizon, in percent. Defaults to current inflation.
        #[arg(long)]
        expected: Option<f64>,

        /// Horizon in months (1-24). Defaults to `rates.horizon_months`.
        #[arg(long)]
        months: Option<u32>,

        #[arg(long, default_value_t = false)]
        offline: bool,

        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// Valuation scorecard for one ticker.
    Value {
        /// Ticker symbol (e.g. AAPL).
        ticker: String,

        #[command(flatten)]
        valuation: ValuationArgs,
    },
    /// Scorecards for several tickers, fetched in parallel.
    Screen {
        #[arg(required = true)]
        tickers: Vec<String>,

        #[command(flatten)]
        valuation: ValuationArgs,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(clap::Args, Clone)]
struct ValuationArgs {
    /// Stage-one FCF growth as a fraction (0.08 = 8%).
    #[arg(long)]
    growth: Option<f64>,

    /// Terminal growth as a fraction.
    #[arg(long)]
    terminal_growth: Option<f64>,

    /// Discount rate as a fraction. Skips CAPM.
    #[arg(long)]
    discount_rate: Option<f64>,

    /// Stage-one projection length in years.
    #[arg(long)]
    years: Option<u32>,

    /// Country whose policy rate serves as the risk-free rate.
    #[arg(long, default_value = "USA")]
    country: String,

    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Print the scorecard as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

impl ValuationArgs {
    fn overrides(&self) -> ValuationOverrides {
        ValuationOverrides {
            growth: self.growth,
            terminal_growth: self.terminal_growth,
            discount_rate: self.discount_rate,
            years: self.years,
        }
    }
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cache entries, ages and sizes.
    Status,
    /// Remove cache entries older than the given number of days.
    Clean {
        /// Remove entries cached more than this many days ago.
        #[arg(long)]
        unused_days: u32,

        /// Actually delete (without this flag, only previews what would be removed).
        #[arg(long, default_value_t = false)]
        confirm: bool,
    },
}

/// Everything a command needs from config and flags.
struct Session {
    config: DashboardConfig,
    cache: ResponseCache,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = DashboardConfig::load_or_default(cli.config.as_deref())
        .context("loading configuration")?;
    let cache_dir = cli
        .cache_dir
        .clone()
        .unwrap_or_else(|| config.data.cache_dir.clone());
    let cache = ResponseCache::new(cache_dir)
        .with_ttl(chrono::Duration::hours(config.data.ttl_hours as i64));
    let ctx = Session { config, cache };

    match cli.command {
        Commands::Macro {
            panel,
            indicators,
            csv,
            wide,
        } => run_macro(&ctx, &panel, &indicators, csv.as_deref(), wide),
        Commands::Health { panel } => run_health(&ctx, &panel),
        Commands::Alerts { panel } => run_alerts(&ctx, &panel),
        Commands::Spread {
            country,
            nominal,
            current,
            expected,
            months,
            offline,
            synthetic,
        } => run_spread(
            &ctx, &country, nominal, current, expected, months, offline, synthetic,
        ),
        Commands::Value { ticker, valuation } => run_value(&ctx, &ticker, &valuation),
        Commands::Screen { tickers, valuation } => run_screen(&ctx, &tickers, &valuation),
        Commands::Cache { action } => match action {
            CacheAction::Status => run_cache_status(&ctx.cache),
            CacheAction::Clean {
                unused_days,
                confirm,
            } => run_cache_clean(&ctx.cache, unused_days, confirm),
        },
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ── Panel loading ────────────────────────────────────────────────────

fn resolve_countries(ctx: &Session, args: &PanelArgs) -> Result<Vec<String>> {
    if !args.countries.is_empty() {
        return Ok(args
            .countries
            .iter()
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .collect());
    }
    let set = &ctx.config.countries;
    if let Some(region) = &args.region {
        return match set.region_codes(region) {
            Some(codes) => Ok(codes.into_iter().map(String::from).collect()),
            None => bail!(
                "unknown region '{region}'. Valid: {}",
                set.region_names().join(", ")
            ),
        };
    }
    Ok(set.all_codes().into_iter().map(String::from).collect())
}

fn parse_indicators(codes: &[String]) -> Result<Vec<Indicator>> {
    if codes.is_empty() {
        return Ok(Indicator::all().to_vec());
    }
    codes
        .iter()
        .map(|c| {
            Indicator::from_code(c).with_context(|| {
                let valid: Vec<&str> = Indicator::all().iter().map(|i| i.code()).collect();
                format!("unknown indicator '{c}'. Valid: {}", valid.join(", "))
            })
        })
        .collect()
}

fn load_options(ctx: &Session, args: &PanelArgs) -> Result<LoadOptions> {
    let mut opts = LoadOptions::from_config(&ctx.config.data);
    if let Some(start) = args.start {
        opts.start_year = start;
    }
    if let Some(end) = args.end {
        opts.end_year = end;
    }
    if opts.start_year > opts.end_year {
        bail!("--start ({}) is after --end ({})", opts.start_year, opts.end_year);
    }
    opts.offline = args.offline;
    opts.synthetic = args.synthetic;
    opts.force = args.force;
    Ok(opts)
}

fn load_panel(
    ctx: &Session,
    indicators: &[Indicator],
    countries: &[String],
    opts: &LoadOptions,
) -> Result<MacroPanel> {
    let breaker = Arc::new(CircuitBreaker::default_provider("world_bank"));
    let provider = WorldBankProvider::new(breaker)?;
    let provider_ref: Option<&dyn macrolens_core::data::MacroProvider> =
        if opts.offline { None } else { Some(&provider) };
    let refs: Vec<&str> = countries.iter().map(|c| c.as_str()).collect();

    let panel = load_macro_panel(
        indicators,
        &refs,
        &ctx.cache,
        provider_ref,
        Some(&StdoutProgress),
        opts,
    )?;
    print_panel_warnings(&panel);
    Ok(panel)
}

fn print_panel_warnings(panel: &MacroPanel) {
    for indicator in &panel.missing {
        println!("NOTE: no data published for {} ({})", indicator.label(), indicator.code());
    }
    for (indicator, sourced) in &panel.sources {
        if sourced.source.is_degraded() || sourced.note.is_some() {
            println!(
                "WARNING: {} from {}{}",
                indicator.code(),
                sourced.source.label(),
                sourced
                    .note
                    .as_deref()
                    .map(|n| format!(" ({n})"))
                    .unwrap_or_default()
            );
        }
    }
    if panel.has_synthetic() {
        println!("WARNING: Results include SYNTHETIC data");
    }
}

// ── Commands ─────────────────────────────────────────────────────────

fn run_macro(
    ctx: &Session,
    args: &PanelArgs,
    indicator_codes: &[String],
    csv: Option<&Path>,
    wide: bool,
) -> Result<()> {
    let indicators = parse_indicators(indicator_codes)?;
    let countries = resolve_countries(ctx, args)?;
    let opts = load_options(ctx, args)?;
    let panel = load_panel(ctx, &indicators, &countries, &opts)?;

    if let Some(path) = csv {
        panel.table.write_csv(path)?;
        println!("Wrote {} rows to {}", panel.table.len(), path.display());
    }

    if wide {
        let frame = wide_by_year(&panel.table)?;
        println!("{frame}");
        return Ok(());
    }

    println!();
    println!("=== Macro Panel ===");
    println!("Period:     {} to {}", opts.start_year, opts.end_year);
    println!("Countries:  {}", countries.join(", "));
    println!("Rows:       {}", panel.table.len());
    println!();
    println!(
        "{:<6} {:<32} {:>6} {:>16}",
        "Cntry", "Indicator", "Year", "Latest"
    );
    println!("{}", "-".repeat(63));
    for country in &countries {
        for indicator in &indicators {
            if let Some((year, value)) = panel.table.latest(country, indicator.code())? {
                println!(
                    "{:<6} {:<32} {:>6} {:>16}",
                    country,
                    indicator.label(),
                    year,
                    format_value(*indicator, value)
                );
            }
        }
    }
    Ok(())
}

fn run_health(ctx: &Session, args: &PanelArgs) -> Result<()> {
    let countries = resolve_countries(ctx, args)?;
    let opts = load_options(ctx, args)?;
    let panel = load_panel(ctx, &Indicator::health_inputs(), &countries, &opts)?;
    let refs: Vec<&str> = countries.iter().map(|c| c.as_str()).collect();
    let scores = health_scores(&panel.table, &refs)?;

    println!();
    println!("=== Macro Health ===");
    println!(
        "{:<6} {:<18} {:>6}  {:<9} {}",
        "Cntry", "Name", "Score", "Rating", "Missing"
    );
    println!("{}", "-".repeat(60));
    for s in &scores {
        let missing: Vec<&str> = s.missing.iter().map(|i| i.code()).collect();
        println!(
            "{:<6} {:<18} {:>6.1}  {:<9} {}",
            s.country,
            truncate(ctx.config.countries.name_of(&s.country), 18),
            s.score,
            s.rating.label(),
            missing.join(",")
        );
    }
    let scored: Vec<&str> = scores.iter().map(|s| s.country.as_str()).collect();
    for c in refs.iter().filter(|c| !scored.contains(c)) {
        println!("{c:<6} (no data)");
    }
    Ok(())
}

fn run_alerts(ctx: &Session, args: &PanelArgs) -> Result<()> {
    let countries = resolve_countries(ctx, args)?;
    let opts = load_options(ctx, args)?;
    let panel = load_panel(ctx, &Indicator::alert_inputs(), &countries, &opts)?;
    let refs: Vec<&str> = countries.iter().map(|c| c.as_str()).collect();
    let alerts = scan_alerts(&panel.table, &refs)?;

    println!();
    if alerts.is_empty() {
        println!("No alerts for {} countries.", refs.len());
        return Ok(());
    }
    println!("=== Alerts ({}) ===", alerts.len());
    for alert in &alerts {
        println!(
            "[{}] {:<4} {} {}",
            alert.severity.label(),
            alert.year,
            alert.country,
            alert.message
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_spread(
    ctx: &Session,
    country: &str,
    nominal: Option<f64>,
    current: Option<f64>,
    expected: Option<f64>,
    months: Option<u32>,
    offline: bool,
    synthetic: bool,
) -> Result<()> {
    let country = country.trim().to_uppercase();
    let mut opts = LoadOptions::from_config(&ctx.config.data);
    opts.offline = offline;
    opts.synthetic = synthetic;

    // `None` source means the user typed the rate.
    let (nominal, nominal_source) = match nominal {
        Some(n) => (n, None),
        None => {
            let breaker = Arc::new(CircuitBreaker::default_provider("central_bank_csv"));
            let provider =
                CentralBankCsvProvider::new(breaker, ctx.config.rates.fred_series.clone())?;
            let rate = resolve_policy_rate(&country, Some(&provider), &ctx.config.rates, &opts);
            (rate.value, Some(rate))
        }
    };

    let current = match current {
        Some(c) => c,
        None => {
            let panel = load_panel(ctx, &[Indicator::Inflation], &[country.clone()], &opts)?;
            match panel.table.latest(&country, Indicator::Inflation.code())? {
                Some((year, value)) => {
                    println!("Current inflation: {value:.2}% ({year})");
                    value
                }
                None => bail!("no inflation data for {country}; pass --current"),
            }
        }
    };

    let scenario = RateScenario {
        nominal,
        current_inflation: current,
        expected_inflation: expected.unwrap_or(current),
        months: months.unwrap_or(ctx.config.rates.horizon_months),
    };
    let projection = project(&scenario)?;

    println!();
    println!("=== Real Rate Spread: {country} ===");
    let basis = match &nominal_source {
        Some(rate) => format!(
            "{}{}",
            rate.source.label(),
            rate.note
                .as_deref()
                .map(|n| format!(", {n}"))
                .unwrap_or_default()
        ),
        None => "--nominal".to_string(),
    };
    println!("Nominal rate:   {nominal:.2}% ({basis})");
    println!("Inflation:      {current:.2}% -> {:.2}%", projection.expected_inflation);
    println!();
    println!("{:>5} {:>10} {:>10}", "Month", "Inflation", "Spread");
    println!("{}", "-".repeat(27));
    for ((m, inf), spread) in projection
        .months
        .iter()
        .zip(&projection.inflation)
        .zip(&projection.spread)
    {
        println!("{m:>5} {inf:>9.2}% {spread:>9.2}%");
    }
    println!();
    let verdict = projection.verdict();
    let tag = match verdict {
        RateVerdict::Strengthening => "OK",
        RateVerdict::CapitalFlightRisk => "WARNING",
    };
    println!(
        "{tag}: final spread {:.2}% after {} months. {}",
        projection.final_spread(),
        scenario.months,
        verdict.message()
    );
    if nominal_source.is_some_and(|r| r.source.is_degraded()) {
        println!("WARNING: nominal rate is the configured fallback, not a published figure");
    }
    Ok(())
}

fn valuation_options(ctx: &Session, args: &ValuationArgs) -> LoadOptions {
    let mut opts = LoadOptions::from_config(&ctx.config.data);
    opts.offline = args.offline;
    opts
}

fn risk_free(ctx: &Session, args: &ValuationArgs, opts: &LoadOptions) -> Result<Sourced<f64>> {
    if args.discount_rate.is_some() {
        // CAPM is skipped; keep the fallback so the card still reports a basis.
        return Ok(Sourced::fallback(
            ctx.config.valuation.risk_free_fallback,
            "discount rate overridden",
        ));
    }
    let breaker = Arc::new(CircuitBreaker::default_provider("central_bank_csv"));
    let provider = CentralBankCsvProvider::new(breaker, ctx.config.rates.fred_series.clone())?;
    Ok(resolve_risk_free(
        &args.country.to_uppercase(),
        Some(&provider),
        &ctx.config.rates,
        &ctx.config.valuation,
        opts,
    ))
}

fn run_value(ctx: &Session, ticker: &str, args: &ValuationArgs) -> Result<()> {
    let opts = valuation_options(ctx, args);
    let symbol = ticker.trim().to_uppercase();
    let breaker = Arc::new(CircuitBreaker::default_provider("yahoo_finance"));
    let provider = YahooProvider::new(breaker)?;
    let provider_ref: Option<&dyn macrolens_core::data::FundamentalsProvider> =
        if opts.offline { None } else { Some(&provider) };

    let fundamentals = load_fundamentals(&symbol, &ctx.cache, provider_ref, &opts)?;
    let rf = risk_free(ctx, args, &opts)?;
    let card = Scorecard::build(&fundamentals.value, &rf, &ctx.config.valuation, &args.overrides())
        .with_context(|| format!("valuing {symbol}"))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&card)?);
        return Ok(());
    }
    print_scorecard(&card, fundamentals.source);
    Ok(())
}

fn run_screen(ctx: &Session, tickers: &[String], args: &ValuationArgs) -> Result<()> {
    let opts = valuation_options(ctx, args);
    // One breaker for the whole batch: a 429 on one ticker pauses the rest.
    let breaker = Arc::new(CircuitBreaker::default_provider("yahoo_finance"));
    let provider = YahooProvider::new(Arc::clone(&breaker))?;
    let rf = risk_free(ctx, args, &opts)?;
    let overrides = args.overrides();

    let mut symbols: Vec<String> = tickers.iter().map(|t| t.trim().to_uppercase()).collect();
    symbols.sort();
    symbols.dedup();

    let results: Vec<(String, Result<Scorecard>)> = symbols
        .par_iter()
        .map(|symbol| {
            let provider_ref: Option<&dyn macrolens_core::data::FundamentalsProvider> =
                if opts.offline { None } else { Some(&provider) };
            let card = load_fundamentals(symbol, &ctx.cache, provider_ref, &opts)
                .map_err(anyhow::Error::from)
                .and_then(|f| {
                    Scorecard::build(&f.value, &rf, &ctx.config.valuation, &overrides)
                        .map_err(anyhow::Error::from)
                });
            (symbol.clone(), card)
        })
        .collect();

    if args.json {
        let cards: Vec<&Scorecard> = results.iter().filter_map(|(_, r)| r.as_ref().ok()).collect();
        println!("{}", serde_json::to_string_pretty(&cards)?);
    } else {
        println!();
        println!(
            "{:<8} {:>10} {:>10} {:>8} {:<14} {:>5} {:>7}",
            "Symbol", "Price", "DCF", "Upside", "Verdict", "F", "r"
        );
        println!("{}", "-".repeat(68));
        let mut ok: Vec<&Scorecard> = results.iter().filter_map(|(_, r)| r.as_ref().ok()).collect();
        ok.sort_by(|a, b| b.upside.total_cmp(&a.upside));
        for card in ok {
            println!(
                "{:<8} {:>10.2} {:>10.2} {:>7.1}% {:<14} {:>2}/{:<2} {:>6.2}%",
                card.symbol,
                card.price,
                card.dcf.per_share,
                card.upside * 100.0,
                card.verdict.label(),
                card.checklist.score(),
                card.checklist.available(),
                card.discount_rate * 100.0
            );
        }
        print_risk_free_warning(&rf);
    }

    let failures: Vec<&(String, Result<Scorecard>)> =
        results.iter().filter(|(_, r)| r.is_err()).collect();
    for (symbol, err) in &failures {
        if let Err(e) = err {
            eprintln!("Error for {symbol}: {e:#}");
        }
    }
    if failures.len() == results.len() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_cache_status(cache: &ResponseCache) -> Result<()> {
    let dir = cache.cache_dir();
    if !dir.exists() {
        println!("Cache directory does not exist: {}", dir.display());
        return Ok(());
    }

    let entries = cache.entries();
    if entries.is_empty() {
        println!("Cache is empty: {}", dir.display());
        return Ok(());
    }

    let total: u64 = entries.iter().map(|e| e.size_bytes).sum();
    let macro_count = entries
        .iter()
        .filter(|e| e.meta.kind == CacheKind::Macro)
        .count();
    let stale = entries.iter().filter(|e| !e.fresh).count();

    println!("Cache: {}", dir.display());
    println!(
        "Entries: {} ({} macro, {} fundamentals, {} stale)",
        entries.len(),
        macro_count,
        entries.len() - macro_count,
        stale
    );
    println!("Total size: {}", format_size(total));
    println!();
    println!(
        "{:<13} {:<36} {:>6} {:<17} {:>10}",
        "Kind", "Label", "Rows", "Cached", "Size"
    );
    println!("{}", "-".repeat(86));
    for e in &entries {
        let kind = match e.meta.kind {
            CacheKind::Macro => "macro",
            CacheKind::Fundamentals => "fundamentals",
        };
        println!(
            "{:<13} {:<36} {:>6} {:<17} {:>10}{}",
            kind,
            truncate(&e.meta.label, 36),
            e.meta.rows,
            e.meta.cached_at.format("%Y-%m-%d %H:%M"),
            format_size(e.size_bytes),
            if e.fresh { "" } else { "  (stale)" }
        );
    }
    Ok(())
}

fn run_cache_clean(cache: &ResponseCache, unused_days: u32, confirm: bool) -> Result<()> {
    let dir = cache.cache_dir();
    if !dir.exists() {
        println!("Cache directory does not exist: {}", dir.display());
        return Ok(());
    }

    let cutoff =
        chrono::Local::now().naive_local() - chrono::Duration::days(i64::from(unused_days));
    let to_remove: Vec<_> = cache
        .entries()
        .into_iter()
        .filter(|e| e.meta.cached_at < cutoff)
        .collect();

    if to_remove.is_empty() {
        println!("No entries older than {unused_days} days to remove.");
        return Ok(());
    }

    println!(
        "Found {} entr{} older than {unused_days} days:",
        to_remove.len(),
        if to_remove.len() == 1 { "y" } else { "ies" }
    );
    for e in &to_remove {
        println!("  {} ({})", e.meta.label, format_size(e.size_bytes));
    }

    if !confirm {
        println!();
        println!("Dry run: pass --confirm to actually delete.");
        return Ok(());
    }

    let report = cache.clean_older_than(unused_days)?;
    println!(
        "Done. Removed {} entr{}, freed {}.",
        report.removed,
        if report.removed == 1 { "y" } else { "ies" },
        format_size(report.bytes_freed)
    );
    Ok(())
}

// ── Output helpers ───────────────────────────────────────────────────

fn print_scorecard(card: &Scorecard, fundamentals_source: DataSource) {
    println!();
    println!("=== Valuation: {} ===", card.symbol);
    if let Some(name) = &card.name {
        println!("Name:           {name}");
    }
    println!(
        "Price:          {:.2} ({})",
        card.price,
        fundamentals_source.label()
    );
    if let Some(pe) = card.trailing_pe {
        println!("Trailing P/E:   {pe:.1}");
    }
    if let Some(y) = card.fcf_yield {
        println!("FCF yield:      {:.2}%", y * 100.0);
    }
    println!();
    println!("--- Discounting ---");
    println!("Discount rate:  {:.2}%", card.discount_rate * 100.0);
    println!("Basis:          {}", card.discount_basis);
    println!();
    println!("--- Two-stage DCF ---");
    println!("{:>5} {:>16} {:>16}", "Year", "FCF", "PV");
    for y in &card.dcf.years {
        println!(
            "{:>5} {:>16} {:>16}",
            y.year,
            format_money(y.fcf),
            format_money(y.discounted)
        );
    }
    println!("PV stage one:   {}", format_money(card.dcf.pv_stage_one));
    println!("Terminal value: {}", format_money(card.dcf.terminal_value));
    println!("PV terminal:    {}", format_money(card.dcf.pv_terminal));
    if let Some(w) = card.dcf.terminal_weight() {
        println!("Terminal share: {:.1}%", w * 100.0);
    }
    println!("Equity value:   {}", format_money(card.dcf.equity_value));
    println!("Per share:      {:.2}", card.dcf.per_share);
    match card.gordon_value {
        Some(g) => println!("Gordon (DDM):   {g:.2}"),
        None => println!("Gordon (DDM):   n/a (no dividend)"),
    }
    println!();
    println!(
        "Upside:         {:.1}% -> {}",
        card.upside * 100.0,
        card.verdict.label()
    );
    println!();
    println!(
        "--- Checklist {}/{} ({} available) ---",
        card.checklist.score(),
        card.checklist.max(),
        card.checklist.available()
    );
    for check in &card.checklist.checks {
        println!("  [{}] {}", check.status.symbol(), check.name);
    }
    println!();
    println!("--- Sensitivity (per share) ---");
    print!("{:>8}", "r \\ g");
    for g in &card.sensitivity.terminal_growths {
        print!(" {:>10}", format!("{:.2}%", g * 100.0));
    }
    println!();
    for (r, row) in card
        .sensitivity
        .discount_rates
        .iter()
        .zip(&card.sensitivity.values)
    {
        print!("{:>8}", format!("{:.2}%", r * 100.0));
        for v in row {
            match v {
                Some(v) => print!(" {v:>10.2}"),
                None => print!(" {:>10}", "n/a"),
            }
        }
        println!();
    }
    print_risk_free_warning(&card.risk_free);
    if fundamentals_source == DataSource::Cache {
        println!("NOTE: fundamentals served from cache");
    }
    println!();
}

fn print_risk_free_warning(rf: &Sourced<f64>) {
    if rf.source.is_degraded() {
        println!(
            "WARNING: risk-free rate {:.2}% is a fallback ({})",
            rf.value * 100.0,
            rf.note.as_deref().unwrap_or("no reason recorded")
        );
    }
}

fn format_value(indicator: Indicator, value: f64) -> String {
    if indicator == Indicator::GdpCurrentUsd {
        format_money(value)
    } else {
        format!("{value:.2}")
    }
}

fn format_money(v: f64) -> String {
    let abs = v.abs();
    if abs >= 1e12 {
        format!("{:.2}T", v / 1e12)
    } else if abs >= 1e9 {
        format!("{:.2}B", v / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", v / 1e6)
    } else {
        format!("{v:.0}")
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}~")
    }
}
