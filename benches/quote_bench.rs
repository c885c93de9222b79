use alloy_primitives::U256;
use criterion::{Criterion, criterion_group, criterion_main};
use liquidity_modules::utils::constants::KnownChain;
use liquidity_modules::{
    ConstantProductModule, LiquidityModule, PoolFamily, StableSwapModule, default_fixtures,
};

fn benchmark_quote_group(c: &mut Criterion) {
    let mut group = c.benchmark_group("quote");
    group.sample_size(100);

    let cp_module = ConstantProductModule::new(KnownChain::ETHEREUM);
    let cp_fixture = default_fixtures(PoolFamily::ConstantProduct, KnownChain::ETHEREUM)
        .into_iter()
        .next()
        .expect("constant-product fixtures");
    let amount_in = U256::from(10).pow(U256::from(18));

    group.bench_function("constant_product_out", |b| {
        b.iter(|| {
            cp_module
                .quote_out_amount(&cp_fixture.state, &cp_fixture.token_in, &cp_fixture.token_out, amount_in)
                .unwrap()
        })
    });

    group.bench_function("constant_product_in", |b| {
        b.iter(|| {
            cp_module
                .quote_in_amount(&cp_fixture.state, &cp_fixture.token_in, &cp_fixture.token_out, amount_in)
                .unwrap()
        })
    });

    let ss_module = StableSwapModule::new(KnownChain::ETHEREUM);
    let ss_fixture = default_fixtures(PoolFamily::StableSwap, KnownChain::ETHEREUM)
        .into_iter()
        .next()
        .expect("stable-swap fixtures");
    let usdc_in = U256::from(1_000_000_000u64);

    group.bench_function("stable_swap_out", |b| {
        b.iter(|| {
            ss_module
                .quote_out_amount(&ss_fixture.state, &ss_fixture.token_in, &ss_fixture.token_out, usdc_in)
                .unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_quote_group);
criterion_main!(benches);
