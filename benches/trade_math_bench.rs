//! Trade Math Benchmarks - Pricing Hot Path
//!
//! Benchmarks the pure functions every trade passes through: amount
//! parsing, slippage minimums, basket price conversion, route candidate
//! generation and path encoding.
//!
//! Run with: cargo bench --bench trade_math_bench

use alloy::primitives::{U256, address};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_decimal_macros::dec;

use paloma_dex_agent::domain::amount::Amount;
use paloma_dex_agent::domain::path::{SwapPath, candidate_paths};
use paloma_dex_agent::domain::slippage::{convert_at_price, min_output};

/// Parse a typical 18-decimal input amount.
fn bench_parse_units(c: &mut Criterion) {
    c.bench_function("amount_parse_units_18", |b| {
        b.iter(|| Amount::parse_units(black_box("1234.567890123456789"), black_box(18)));
    });
}

fn bench_min_output(c: &mut Criterion) {
    let quoted = U256::from(99_000_000_000_000_000_000u128);

    c.bench_function("slippage_min_output", |b| {
        b.iter(|| min_output(black_box(quoted), black_box(dec!(0.5))));
    });
}

fn bench_convert_at_price(c: &mut Criterion) {
    let usd = U256::from(50_000_000u64);

    c.bench_function("basket_convert_at_price", |b| {
        b.iter(|| convert_at_price(black_box(usd), 6, 18, black_box(dec!(2.4731))));
    });
}

/// Candidate generation plus encoding of every candidate, as done per quote.
fn bench_candidate_paths(c: &mut Criterion) {
    let usdc = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
    let stable = address!("5151515151515151515151515151515151515151");
    let weth = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");

    c.bench_function("route_candidates_encoded", |b| {
        b.iter(|| {
            candidate_paths(black_box(usdc), black_box(stable), Some(weth))
                .iter()
                .map(SwapPath::encode)
                .count()
        });
    });
}

criterion_group!(
    benches,
    bench_parse_units,
    bench_min_output,
    bench_convert_at_price,
    bench_candidate_paths,
);
criterion_main!(benches);
