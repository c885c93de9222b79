use ahash::AHashMap;
use eyre::Result;
use liquidity_modules::utils::constants::KnownChain;
use liquidity_modules::{
    ConcentratedLiquidityModule, ConformanceHarness, ConstantProductModule, LendingCurveModule,
    ModuleWrapper, PoolFixture, ProtocolId, Registration, Registry, StableSwapModule,
    default_fixtures,
};

/// Runs the conformance suite against every registered module and exits
/// non-zero if any required property fails for any of them.
fn main() -> Result<()> {
    let chain = KnownChain::ETHEREUM;

    let registry = Registry::new();
    registry.register(ConstantProductModule::new(chain), Registration::new("Constant Product"));
    registry.register(StableSwapModule::new(chain), Registration::new("StableSwap"));
    registry.register(
        ConcentratedLiquidityModule::new(chain),
        Registration::new("Concentrated Liquidity"),
    );
    registry.register(LendingCurveModule::new(chain), Registration::new("Lending Curve"));

    let mut fixtures: AHashMap<ProtocolId, Vec<PoolFixture>> = AHashMap::new();
    for module in registry.modules() {
        fixtures.insert(module.protocol(), default_fixtures(module.family(), chain));
    }

    let harness = ConformanceHarness::default();
    let report = harness.run_registry(&registry, &fixtures);
    print!("{report}");

    let failed: Vec<ModuleWrapper> = registry
        .modules()
        .into_iter()
        .filter(|module| {
            report
                .modules
                .iter()
                .any(|entry| entry.protocol == module.protocol() && !entry.passed())
        })
        .collect();

    if !failed.is_empty() {
        eprintln!("{} module(s) failed conformance", failed.len());
        std::process::exit(1);
    }
    Ok(())
}
