use super::fixtures::PoolFixture;
use super::report::{ConformanceReport, ModuleReport, PropertyCheck, PropertyKind};
use crate::modules::{ModuleWrapper, ProtocolId, QuoteError, QuoteRequest};
use crate::registry::Registry;
use crate::state::{PoolFamily, PoolState};
use crate::token::Token;
use ahash::AHashMap;
use alloy_primitives::{Address, U256, U512};
use rust_decimal::Decimal;
use tracing::debug;

/// Tolerances the harness applies where exact equality is not required.
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    /// Allowed gap between aggregate TVL and the per-token sum.
    pub tvl_tolerance: Decimal,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        // 10^-6 native units
        Self { tvl_tolerance: Decimal::new(1, 6) }
    }
}

/// Drives any module against its fixtures and reports every property
/// with the concrete failing inputs, so an author can localize the bug
/// without reading the harness.
#[derive(Default)]
pub struct ConformanceHarness {
    config: HarnessConfig,
}

impl ConformanceHarness {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    /// Runs every registered module against the fixture set for its
    /// protocol id. Modules without fixtures fail no properties but are
    /// reported, so a missing fixture set is visible.
    pub fn run_registry(
        &self,
        registry: &Registry,
        fixtures: &AHashMap<ProtocolId, Vec<PoolFixture>>,
    ) -> ConformanceReport {
        let mut report = ConformanceReport::default();
        for module in registry.modules() {
            let empty = Vec::new();
            let module_fixtures = fixtures.get(&module.protocol()).unwrap_or(&empty);
            report.modules.push(self.check_module(&module, module_fixtures));
        }
        report
    }

    pub fn check_module(&self, module: &ModuleWrapper, fixtures: &[PoolFixture]) -> ModuleReport {
        let checks = vec![
            self.check_zero_amount(module, fixtures),
            self.check_monotonic_out(module, fixtures),
            self.check_monotonic_in(module, fixtures),
            self.check_round_trip_sufficiency(module, fixtures),
            self.check_round_trip_no_free_output(module, fixtures),
            self.check_invalid_token(module, fixtures),
            self.check_insufficient_liquidity(module, fixtures),
            self.check_malformed_state(module, fixtures),
            self.check_invalid_request(module, fixtures),
            self.check_tvl_additivity(module, fixtures),
            self.check_conservation(module, fixtures),
            self.check_apy_well_defined(module, fixtures),
        ];

        let failed = checks.iter().filter(|check| !check.passed()).count();
        debug!(module = %module, failed, "conformance run finished");

        ModuleReport { protocol: module.protocol(), module: format!("{module}"), checks }
    }

    fn check_zero_amount(&self, module: &ModuleWrapper, fixtures: &[PoolFixture]) -> PropertyCheck {
        let mut check = PropertyCheck::new(PropertyKind::ZeroAmount);
        for fixture in fixtures {
            match module.quote_out_amount(&fixture.state, &fixture.token_in, &fixture.token_out, U256::ZERO) {
                Ok(quote) if quote.amount.is_zero() => {}
                Ok(quote) => check.fail(&fixture.label, "amount_in=0", format!("nonzero output {}", quote.amount)),
                Err(error) => check.fail(&fixture.label, "amount_in=0", format!("unexpected error: {error}")),
            }
            match module.quote_in_amount(&fixture.state, &fixture.token_in, &fixture.token_out, U256::ZERO) {
                Ok(quote) if quote.amount.is_zero() => {}
                Ok(quote) => check.fail(&fixture.label, "amount_out=0", format!("nonzero input {}", quote.amount)),
                Err(error) => check.fail(&fixture.label, "amount_out=0", format!("unexpected error: {error}")),
            }
        }
        check
    }

    fn check_monotonic_out(&self, module: &ModuleWrapper, fixtures: &[PoolFixture]) -> PropertyCheck {
        let mut check = PropertyCheck::new(PropertyKind::MonotonicOut);
        for fixture in fixtures.iter().filter(|fixture| fixture.quotable) {
            let mut previous = U256::ZERO;
            for amount_in in &fixture.sample_inputs {
                match module.quote_out_amount(&fixture.state, &fixture.token_in, &fixture.token_out, *amount_in) {
                    Ok(quote) => {
                        if quote.amount < previous {
                            check.fail(
                                &fixture.label,
                                format!("amount_in={amount_in}"),
                                format!("output decreased: {} after {}", quote.amount, previous),
                            );
                        }
                        previous = quote.amount;
                    }
                    Err(error) => check.fail(
                        &fixture.label,
                        format!("amount_in={amount_in}"),
                        format!("quote failed: {error}"),
                    ),
                }
            }
        }
        check
    }

    fn check_monotonic_in(&self, module: &ModuleWrapper, fixtures: &[PoolFixture]) -> PropertyCheck {
        let mut check = PropertyCheck::new(PropertyKind::MonotonicIn);
        for fixture in fixtures.iter().filter(|fixture| fixture.quotable) {
            let mut previous = U256::ZERO;
            for amount_out in &fixture.sample_outputs {
                match module.quote_in_amount(&fixture.state, &fixture.token_in, &fixture.token_out, *amount_out) {
                    Ok(quote) => {
                        if quote.amount < previous {
                            check.fail(
                                &fixture.label,
                                format!("amount_out={amount_out}"),
                                format!("input decreased: {} after {}", quote.amount, previous),
                            );
                        }
                        previous = quote.amount;
                    }
                    Err(error) => check.fail(
                        &fixture.label,
                        format!("amount_out={amount_out}"),
                        format!("quote failed: {error}"),
                    ),
                }
            }
        }
        check
    }

    /// `quote_out(quote_in(y)) >= y`: the quoted input is always enough.
    fn check_round_trip_sufficiency(&self, module: &ModuleWrapper, fixtures: &[PoolFixture]) -> PropertyCheck {
        let mut check = PropertyCheck::new(PropertyKind::RoundTripSufficiency);
        for fixture in fixtures.iter().filter(|fixture| fixture.quotable) {
            for amount_out in &fixture.sample_outputs {
                let needed = match module.quote_in_amount(
                    &fixture.state,
                    &fixture.token_in,
                    &fixture.token_out,
                    *amount_out,
                ) {
                    Ok(quote) => quote,
                    Err(error) => {
                        check.fail(
                            &fixture.label,
                            format!("amount_out={amount_out}"),
                            format!("quote_in failed: {error}"),
                        );
                        continue;
                    }
                };
                match module.quote_out_amount(&fixture.state, &fixture.token_in, &fixture.token_out, needed.amount) {
                    Ok(obtained) if obtained.amount >= *amount_out => {}
                    Ok(obtained) => check.fail(
                        &fixture.label,
                        format!("amount_out={amount_out}"),
                        format!("input {} yields only {}", needed.amount, obtained.amount),
                    ),
                    Err(error) => check.fail(
                        &fixture.label,
                        format!("amount_out={amount_out}"),
                        format!("quote_out of quoted input failed: {error}"),
                    ),
                }
            }
        }
        check
    }

    /// `quote_in(quote_out(x)) >= x` over the representative samples: a
    /// caller cannot turn a quote around and be told a cheaper input.
    fn check_round_trip_no_free_output(&self, module: &ModuleWrapper, fixtures: &[PoolFixture]) -> PropertyCheck {
        let mut check = PropertyCheck::new(PropertyKind::RoundTripNoFreeOutput);
        for fixture in fixtures.iter().filter(|fixture| fixture.quotable) {
            for amount_in in &fixture.sample_inputs {
                let out = match module.quote_out_amount(
                    &fixture.state,
                    &fixture.token_in,
                    &fixture.token_out,
                    *amount_in,
                ) {
                    Ok(quote) if quote.amount.is_zero() => continue,
                    Ok(quote) => quote,
                    Err(error) => {
                        check.fail(
                            &fixture.label,
                            format!("amount_in={amount_in}"),
                            format!("quote_out failed: {error}"),
                        );
                        continue;
                    }
                };
                match module.quote_in_amount(&fixture.state, &fixture.token_in, &fixture.token_out, out.amount) {
                    Ok(round_trip) if round_trip.amount >= *amount_in => {}
                    Ok(round_trip) => check.fail(
                        &fixture.label,
                        format!("amount_in={amount_in}"),
                        format!("round trip undercharges: {} for {} out", round_trip.amount, out.amount),
                    ),
                    Err(error) => check.fail(
                        &fixture.label,
                        format!("amount_in={amount_in}"),
                        format!("quote_in of quoted output failed: {error}"),
                    ),
                }
            }
        }
        check
    }

    fn check_invalid_token(&self, module: &ModuleWrapper, fixtures: &[PoolFixture]) -> PropertyCheck {
        let mut check = PropertyCheck::new(PropertyKind::InvalidTokenRejected);
        for fixture in fixtures {
            let foreign = Token::new(fixture.token_in.get_chain_id(), Address::repeat_byte(0xEE), 18);
            let amount = U256::from(1);

            let as_input =
                module.quote_out_amount(&fixture.state, &foreign, &fixture.token_out, amount);
            if !matches!(as_input, Err(QuoteError::InvalidToken(_))) {
                check.fail(&fixture.label, "foreign input token", describe(&as_input));
            }

            let as_output =
                module.quote_in_amount(&fixture.state, &fixture.token_in, &foreign, amount);
            if !matches!(as_output, Err(QuoteError::InvalidToken(_))) {
                check.fail(&fixture.label, "foreign output token", describe(&as_output));
            }

            let as_tvl = module.tvl(&fixture.state, Some(&foreign));
            if !matches!(as_tvl, Err(QuoteError::InvalidToken(_))) {
                check.fail(&fixture.label, "foreign tvl token", "tvl accepted a non-constituent");
            }
        }
        check
    }

    fn check_insufficient_liquidity(&self, module: &ModuleWrapper, fixtures: &[PoolFixture]) -> PropertyCheck {
        let mut check = PropertyCheck::new(PropertyKind::InsufficientLiquidityRejected);
        for fixture in fixtures {
            // the whole output reserve (or more) is never quotable
            let excessive = module.quote_in_amount(
                &fixture.state,
                &fixture.token_in,
                &fixture.token_out,
                fixture.excessive_output,
            );
            if !matches!(excessive, Err(QuoteError::InsufficientLiquidity)) {
                check.fail(
                    &fixture.label,
                    format!("amount_out={}", fixture.excessive_output),
                    describe(&excessive),
                );
            }

            // absurd input sizes degrade to a refusal, never a panic or a
            // misleading error kind
            let huge =
                module.quote_out_amount(&fixture.state, &fixture.token_in, &fixture.token_out, U256::MAX);
            if !matches!(huge, Ok(_) | Err(QuoteError::InsufficientLiquidity)) {
                check.fail(&fixture.label, "amount_in=U256::MAX", describe(&huge));
            }

            // boundary pools refuse every positive quote
            if !fixture.quotable {
                for amount_in in &fixture.sample_inputs {
                    let refused = module.quote_out_amount(
                        &fixture.state,
                        &fixture.token_in,
                        &fixture.token_out,
                        *amount_in,
                    );
                    if !matches!(refused, Err(QuoteError::InsufficientLiquidity)) {
                        check.fail(&fixture.label, format!("amount_in={amount_in}"), describe(&refused));
                    }
                }
            }
        }
        check
    }

    fn check_malformed_state(&self, module: &ModuleWrapper, fixtures: &[PoolFixture]) -> PropertyCheck {
        let mut check = PropertyCheck::new(PropertyKind::MalformedStateRejected);
        for fixture in fixtures {
            let Some(malformed) = &fixture.malformed_state else { continue };
            let result =
                module.quote_out_amount(malformed, &fixture.token_in, &fixture.token_out, U256::from(1));
            if !matches!(result, Err(QuoteError::InvalidState(_))) {
                check.fail(&fixture.label, "malformed state", describe(&result));
            }
        }
        check
    }

    fn check_invalid_request(&self, module: &ModuleWrapper, fixtures: &[PoolFixture]) -> PropertyCheck {
        let mut check = PropertyCheck::new(PropertyKind::InvalidRequestRejected);
        for fixture in fixtures {
            let both = QuoteRequest {
                token_in: fixture.token_in.clone(),
                token_out: fixture.token_out.clone(),
                amount_in: Some(U256::from(1)),
                amount_out: Some(U256::from(1)),
            };
            if !matches!(module.quote(&fixture.state, &both), Err(QuoteError::InvalidRequest(_))) {
                check.fail(&fixture.label, "both amounts set", "request was not rejected");
            }

            let neither = QuoteRequest {
                token_in: fixture.token_in.clone(),
                token_out: fixture.token_out.clone(),
                amount_in: None,
                amount_out: None,
            };
            if !matches!(module.quote(&fixture.state, &neither), Err(QuoteError::InvalidRequest(_))) {
                check.fail(&fixture.label, "neither amount set", "request was not rejected");
            }
        }
        check
    }

    fn check_tvl_additivity(&self, module: &ModuleWrapper, fixtures: &[PoolFixture]) -> PropertyCheck {
        let mut check = PropertyCheck::new(PropertyKind::TvlAdditivity);
        for fixture in fixtures {
            let total = match module.tvl(&fixture.state, None) {
                Ok(total) => total,
                Err(error) => {
                    check.fail(&fixture.label, "tvl(None)", format!("tvl failed: {error}"));
                    continue;
                }
            };
            let mut sum = Decimal::ZERO;
            let mut parts_ok = true;
            for token in fixture.state.tokens() {
                match module.tvl(&fixture.state, Some(token)) {
                    Ok(part) => sum += part,
                    Err(error) => {
                        parts_ok = false;
                        check.fail(
                            &fixture.label,
                            format!("tvl({})", token.get_symbol()),
                            format!("tvl failed: {error}"),
                        );
                    }
                }
            }
            if parts_ok && (total - sum).abs() > self.config.tvl_tolerance {
                check.fail(
                    &fixture.label,
                    "tvl(None)",
                    format!("aggregate {total} != per-token sum {sum}"),
                );
            }
        }
        check
    }

    /// Constant-product pools must never shrink `k` on a quoted trade.
    fn check_conservation(&self, module: &ModuleWrapper, fixtures: &[PoolFixture]) -> PropertyCheck {
        let mut check = PropertyCheck::new(PropertyKind::Conservation);
        if module.family() != PoolFamily::ConstantProduct {
            return check;
        }
        for fixture in fixtures.iter().filter(|fixture| fixture.quotable) {
            let PoolState::ConstantProduct(cp) = &fixture.state else { continue };
            let Ok((reserve_in, reserve_out)) = cp.oriented(&fixture.token_in, &fixture.token_out) else {
                continue;
            };
            let k_before = U512::from(reserve_in) * U512::from(reserve_out);
            for amount_in in &fixture.sample_inputs {
                let Ok(quote) = module.quote_out_amount(
                    &fixture.state,
                    &fixture.token_in,
                    &fixture.token_out,
                    *amount_in,
                ) else {
                    continue;
                };
                let k_after = (U512::from(reserve_in) + U512::from(*amount_in))
                    * (U512::from(reserve_out) - U512::from(quote.amount));
                if k_after < k_before {
                    check.fail(
                        &fixture.label,
                        format!("amount_in={amount_in}"),
                        format!("invariant shrank: {k_after} < {k_before}"),
                    );
                }
            }
        }
        check
    }

    fn check_apy_well_defined(&self, module: &ModuleWrapper, fixtures: &[PoolFixture]) -> PropertyCheck {
        let mut check = PropertyCheck::new(PropertyKind::ApyWellDefined);
        for fixture in fixtures {
            match module.apy(&fixture.state) {
                Ok(apy) if apy >= Decimal::ZERO => {}
                Ok(apy) => check.fail(&fixture.label, "apy", format!("negative yield {apy}")),
                Err(QuoteError::Unavailable) => {}
                Err(error) => check.fail(&fixture.label, "apy", format!("unexpected error: {error}")),
            }
        }
        check
    }
}

fn describe<T: std::fmt::Debug>(result: &Result<T, QuoteError>) -> String {
    match result {
        Ok(value) => format!("returned a result instead of the designated error: {value:?}"),
        Err(error) => format!("wrong error kind: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformance::fixtures::default_fixtures;
    use crate::modules::{
        ConcentratedLiquidityModule, ConstantProductModule, LendingCurveModule, LiquidityModule,
        Quote, StableSwapModule,
    };
    use crate::utils::constants::KnownChain;
    use serde::{Deserialize, Serialize};

    fn harness() -> ConformanceHarness {
        ConformanceHarness::default()
    }

    #[test]
    fn test_constant_product_module_conforms() {
        let module = ModuleWrapper::from(ConstantProductModule::new(KnownChain::ETHEREUM));
        let fixtures = default_fixtures(PoolFamily::ConstantProduct, KnownChain::ETHEREUM);
        let report = harness().check_module(&module, &fixtures);
        assert!(report.passed(), "{:?}", report.failed_properties());
    }

    #[test]
    fn test_stable_swap_module_conforms() {
        let module = ModuleWrapper::from(StableSwapModule::new(KnownChain::ETHEREUM));
        let fixtures = default_fixtures(PoolFamily::StableSwap, KnownChain::ETHEREUM);
        let report = harness().check_module(&module, &fixtures);
        assert!(report.passed(), "{:?}", report.failed_properties());
    }

    #[test]
    fn test_concentrated_liquidity_module_conforms() {
        let module = ModuleWrapper::from(ConcentratedLiquidityModule::new(KnownChain::ETHEREUM));
        let fixtures = default_fixtures(PoolFamily::ConcentratedLiquidity, KnownChain::ETHEREUM);
        let report = harness().check_module(&module, &fixtures);
        assert!(report.passed(), "{:?}", report.failed_properties());
    }

    #[test]
    fn test_lending_curve_module_conforms() {
        let module = ModuleWrapper::from(LendingCurveModule::new(KnownChain::ETHEREUM));
        let fixtures = default_fixtures(PoolFamily::LendingCurve, KnownChain::ETHEREUM);
        let report = harness().check_module(&module, &fixtures);
        assert!(report.passed(), "{:?}", report.failed_properties());
    }

    /// Rounds in the taker's favor on exact-out quotes; the harness must
    /// catch the undercharge and name the failing inputs.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    struct UnderchargingModule {
        inner: ConstantProductModule,
    }

    #[typetag::serde]
    impl LiquidityModule for UnderchargingModule {
        fn protocol(&self) -> crate::modules::ProtocolId {
            crate::modules::ProtocolId::new("undercharging")
        }

        fn family(&self) -> PoolFamily {
            PoolFamily::ConstantProduct
        }

        fn chain_id(&self) -> crate::token::ChainId {
            self.inner.chain_id()
        }

        fn quote_out_amount(
            &self,
            state: &PoolState,
            token_in: &Token,
            token_out: &Token,
            amount_in: U256,
        ) -> Result<Quote, QuoteError> {
            self.inner.quote_out_amount(state, token_in, token_out, amount_in)
        }

        fn quote_in_amount(
            &self,
            state: &PoolState,
            token_in: &Token,
            token_out: &Token,
            amount_out: U256,
        ) -> Result<Quote, QuoteError> {
            // drop the round-up margin: quotes become insufficient
            let quote = self.inner.quote_in_amount(state, token_in, token_out, amount_out)?;
            let shaved = quote.amount.saturating_sub(U256::from(2));
            Ok(Quote::new(shaved, quote.fee))
        }

        fn apy(&self, state: &PoolState) -> Result<Decimal, QuoteError> {
            self.inner.apy(state)
        }

        fn tvl(&self, state: &PoolState, token: Option<&Token>) -> Result<Decimal, QuoteError> {
            self.inner.tvl(state, token)
        }
    }

    #[test]
    fn test_harness_flags_undercharging_module() {
        let module = ModuleWrapper::from(UnderchargingModule {
            inner: ConstantProductModule::new(KnownChain::ETHEREUM),
        });
        let fixtures = default_fixtures(PoolFamily::ConstantProduct, KnownChain::ETHEREUM);
        let report = harness().check_module(&module, &fixtures);

        assert!(!report.passed());
        let failed = report.failed_properties();
        assert!(
            failed.contains(&PropertyKind::RoundTripSufficiency)
                || failed.contains(&PropertyKind::RoundTripNoFreeOutput),
            "expected a round-trip failure, got {failed:?}"
        );

        // failures carry the concrete inputs
        let failing_check = report
            .checks
            .iter()
            .find(|check| !check.passed())
            .expect("at least one failed check");
        assert!(!failing_check.failures.is_empty());
        assert!(!failing_check.failures[0].input.is_empty());
    }
}
