//! Criterion benchmarks for the valuation and reshaping hot paths.
//!
//! Benchmarks:
//! 1. Two-stage DCF at several projection lengths
//! 2. Sensitivity grid (nine DCFs)
//! 3. Full scorecard build
//! 4. Long -> wide -> long reshape of a synthetic panel

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use macrolens_core::config::ValuationConfig;
use macrolens_core::data::synthetic::synthetic_panel;
use macrolens_core::data::{DataSource, Sourced};
use macrolens_core::domain::{Fundamentals, Indicator};
use macrolens_core::table::{long_from_wide_years, wide_by_year, LongTable};
use macrolens_core::valuation::{
    sensitivity_matrix, two_stage_dcf, DcfInputs, Scorecard, ValuationOverrides,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn inputs(years: u32) -> DcfInputs {
    DcfInputs {
        base_fcf: 84e9,
        growth: 0.07,
        years,
        terminal_growth: 0.025,
        discount_rate: 0.095,
        total_debt: 108e9,
        total_cash: 62e9,
        shares_outstanding: 15.5e9,
    }
}

fn fundamentals() -> Fundamentals {
    let mut f = Fundamentals::new("ACME", 190.0, 15.5e9);
    f.free_cash_flow = Some(84e9);
    f.total_debt = 108e9;
    f.total_cash = 62e9;
    f.beta = Some(1.25);
    f.dividend_rate = Some(0.96);
    f.return_on_assets = Some(0.21);
    f.operating_cash_flow = Some(110e9);
    f.net_income = Some(97e9);
    f
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_dcf(c: &mut Criterion) {
    let mut group = c.benchmark_group("two_stage_dcf");
    for years in [5u32, 10, 30] {
        let i = inputs(years);
        group.bench_with_input(BenchmarkId::from_parameter(years), &i, |b, i| {
            b.iter(|| two_stage_dcf(black_box(i)))
        });
    }
    group.finish();
}

fn bench_sensitivity(c: &mut Criterion) {
    let i = inputs(5);
    c.bench_function("sensitivity_matrix", |b| {
        b.iter(|| sensitivity_matrix(black_box(&i), 0.01, 0.005))
    });
}

fn bench_scorecard(c: &mut Criterion) {
    let f = fundamentals();
    let rf = Sourced::fetched(0.043, DataSource::CentralBankCsv);
    let config = ValuationConfig::default();
    let overrides = ValuationOverrides::default();
    c.bench_function("scorecard_build", |b| {
        b.iter(|| Scorecard::build(black_box(&f), &rf, &config, &overrides))
    });
}

fn bench_reshape(c: &mut Criterion) {
    let countries = ["USA", "DEU", "JPN", "GBR", "FRA", "ITA", "CAN", "BRA", "IND", "CHN"];
    let observations = synthetic_panel(Indicator::all(), &countries, 1990, 2023);
    let long = LongTable::from_observations(&observations).unwrap();

    let mut group = c.benchmark_group("reshape");
    group.bench_function("wide_by_year", |b| b.iter(|| wide_by_year(black_box(&long))));
    let wide = wide_by_year(&long).unwrap();
    group.bench_function("long_from_wide_years", |b| {
        b.iter(|| long_from_wide_years(black_box(&wide)))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_dcf,
    bench_sensitivity,
    bench_scorecard,
    bench_reshape
);
criterion_main!(benches);
