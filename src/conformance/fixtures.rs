use crate::state::{
    ConcentratedLiquidityState, ConstantProductState, FeeStats, LendingCurveState, PoolFamily,
    PoolState, StableSwapState,
};
use crate::token::{ChainId, Token};
use crate::utils::constants::Q96;
use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;

/// One pool the harness drives a module with.
///
/// `token_in -> token_out` is the sampled direction; fixtures orient it so
/// the marginal rate is at least one and the output grid is at least as
/// fine as the input grid, the regime a router actually quotes in (the
/// reverse composition of floor/ceil quoting cannot survive sub-unit
/// truncation outside it).
#[derive(Clone, Debug)]
pub struct PoolFixture {
    pub label: String,
    pub state: PoolState,
    pub token_in: Token,
    pub token_out: Token,
    /// Ascending exact-in amounts, small relative to the pool.
    pub sample_inputs: Vec<U256>,
    /// Ascending exact-out amounts, strictly below the output reserve.
    pub sample_outputs: Vec<U256>,
    /// At or above the pool's whole output reserve; must be refused.
    pub excessive_output: U256,
    /// A structurally broken sibling of `state`, if the family has one.
    pub malformed_state: Option<PoolState>,
    /// `false` for boundary pools where any positive quote must fail.
    pub quotable: bool,
}

fn exp10(n: u32) -> U256 {
    U256::from(10).pow(U256::from(n))
}

fn token(chain_id: ChainId, byte: u8, decimals: u8, symbol: &str, price: Decimal) -> Token {
    Token::new_with_data(chain_id, Address::repeat_byte(byte), decimals, Some(symbol.to_string()), price)
}

/// Default fixture set for a family, on one chain.
pub fn default_fixtures(family: PoolFamily, chain_id: ChainId) -> Vec<PoolFixture> {
    match family {
        PoolFamily::ConstantProduct => constant_product_fixtures(chain_id),
        PoolFamily::StableSwap => stable_swap_fixtures(chain_id),
        PoolFamily::ConcentratedLiquidity => concentrated_liquidity_fixtures(chain_id),
        PoolFamily::LendingCurve => lending_curve_fixtures(chain_id),
        PoolFamily::Unknown => Vec::new(),
    }
}

pub fn constant_product_fixtures(chain_id: ChainId) -> Vec<PoolFixture> {
    let base = token(chain_id, 0x11, 18, "BASE", Decimal::ONE);
    let quoted = token(chain_id, 0x12, 18, "QUOTE", Decimal::new(5, 1));

    // 1000 : 2000 whole tokens, 30 bps, with a day of fee accrual
    let balanced = ConstantProductState {
        token0: base.clone(),
        token1: quoted.clone(),
        reserve0: exp10(21),
        reserve1: exp10(21) * U256::from(2),
        fee_bps: 30,
        fee_stats: Some(FeeStats {
            fees0: exp10(17),
            fees1: exp10(17),
            window_secs: 86_400,
        }),
    };

    // the canonical tiny pool: reserves (1000, 2000), no fee
    let tiny = ConstantProductState {
        token0: base.clone(),
        token1: quoted.clone(),
        reserve0: U256::from(1000),
        reserve1: U256::from(2000),
        fee_bps: 0,
        fee_stats: None,
    };

    let one_sided = ConstantProductState {
        token0: base.clone(),
        token1: quoted.clone(),
        reserve0: U256::from(1000),
        reserve1: U256::ZERO,
        fee_bps: 30,
        fee_stats: None,
    };

    let mut malformed = balanced.clone();
    malformed.fee_bps = 10_000;

    vec![
        PoolFixture {
            label: "cp-balanced-30bps".to_string(),
            state: PoolState::ConstantProduct(balanced),
            token_in: base.clone(),
            token_out: quoted.clone(),
            sample_inputs: vec![exp10(15), exp10(16), exp10(17), exp10(18), exp10(19), exp10(20)],
            sample_outputs: vec![exp10(15), exp10(17), exp10(19), exp10(20)],
            excessive_output: exp10(21) * U256::from(2),
            malformed_state: Some(PoolState::ConstantProduct(malformed)),
            quotable: true,
        },
        PoolFixture {
            label: "cp-tiny-zero-fee".to_string(),
            state: PoolState::ConstantProduct(tiny),
            token_in: base.clone(),
            token_out: quoted.clone(),
            sample_inputs: vec![U256::from(1), U256::from(10), U256::from(100), U256::from(400)],
            sample_outputs: vec![U256::from(1), U256::from(100), U256::from(1000)],
            excessive_output: U256::from(2000),
            malformed_state: None,
            quotable: true,
        },
        PoolFixture {
            label: "cp-one-sided".to_string(),
            state: PoolState::ConstantProduct(one_sided),
            token_in: base,
            token_out: quoted,
            sample_inputs: vec![U256::from(100)],
            sample_outputs: vec![U256::from(100)],
            excessive_output: U256::from(1),
            malformed_state: None,
            quotable: false,
        },
    ]
}

pub fn stable_swap_fixtures(chain_id: ChainId) -> Vec<PoolFixture> {
    // sampled 6-decimals -> 18-decimals so the output grid is the finer one
    let usd6 = token(chain_id, 0x21, 6, "USD6", Decimal::new(5, 4));
    let usd18 = token(chain_id, 0x22, 18, "USD18", Decimal::new(5, 4));

    // 2M : 2M at amp 200, 4 bps
    let balanced = StableSwapState {
        token0: usd6.clone(),
        token1: usd18.clone(),
        balance0: U256::from(2_000_000_000_000u64),
        balance1: exp10(24) * U256::from(2),
        amp: 200,
        fee_bps: 4,
        fee_stats: Some(FeeStats {
            fees0: U256::from(40_000_000u64),
            fees1: U256::ZERO,
            window_secs: 3_600,
        }),
    };

    let mut malformed = balanced.clone();
    malformed.amp = 0;

    vec![PoolFixture {
        label: "stable-2m-amp200".to_string(),
        state: PoolState::StableSwap(balanced),
        token_in: usd6,
        token_out: usd18,
        // whole-dollar inputs: 1, 10, 100, 1k, 10k USD6
        sample_inputs: vec![exp10(6), exp10(7), exp10(8), exp10(9), exp10(10)],
        sample_outputs: vec![exp10(18), exp10(20), exp10(21), exp10(22)],
        excessive_output: exp10(24) * U256::from(2),
        malformed_state: Some(PoolState::StableSwap(malformed)),
        quotable: true,
    }]
}

pub fn concentrated_liquidity_fixtures(chain_id: ChainId) -> Vec<PoolFixture> {
    let base = token(chain_id, 0x31, 18, "BASE", Decimal::new(2, 0));
    let quoted = token(chain_id, 0x32, 18, "QUOTE", Decimal::new(5, 1));

    // spot price 4 (sqrt 2), active range between prices 1 and 16
    let in_range = ConcentratedLiquidityState {
        token0: base.clone(),
        token1: quoted.clone(),
        liquidity: 1_000_000_000_000_000_000u128,
        sqrt_price_x96: Q96 * U256::from(2),
        sqrt_price_lower_x96: Q96,
        sqrt_price_upper_x96: Q96 * U256::from(4),
        fee_bps: 30,
    };

    let mut malformed = in_range.clone();
    malformed.sqrt_price_lower_x96 = Q96 * U256::from(8);

    let drained = ConcentratedLiquidityState {
        token0: base.clone(),
        token1: quoted.clone(),
        liquidity: 0,
        sqrt_price_x96: Q96 * U256::from(2),
        sqrt_price_lower_x96: Q96,
        sqrt_price_upper_x96: Q96 * U256::from(4),
        fee_bps: 30,
    };

    vec![
        PoolFixture {
            label: "clmm-price4-range1-16".to_string(),
            state: PoolState::ConcentratedLiquidity(in_range),
            token_in: base.clone(),
            token_out: quoted.clone(),
            sample_inputs: vec![exp10(12), exp10(13), exp10(14), exp10(15), exp10(16)],
            sample_outputs: vec![exp10(13), exp10(14), exp10(15), exp10(16)],
            // the range holds exactly `liquidity` of token1 down to its lower bound
            excessive_output: exp10(18),
            malformed_state: Some(PoolState::ConcentratedLiquidity(malformed)),
            quotable: true,
        },
        PoolFixture {
            label: "clmm-drained".to_string(),
            state: PoolState::ConcentratedLiquidity(drained),
            token_in: base,
            token_out: quoted,
            sample_inputs: vec![exp10(12)],
            sample_outputs: vec![exp10(12)],
            excessive_output: U256::from(1),
            malformed_state: None,
            quotable: false,
        },
    ]
}

pub fn lending_curve_fixtures(chain_id: ChainId) -> Vec<PoolFixture> {
    let underlying = token(chain_id, 0x41, 18, "ASSET", Decimal::ONE);
    let share = token(chain_id, 0x42, 18, "SHARE", Decimal::ZERO);

    // 1000 cash, 500 borrowed, 60 reserved, 1200 shares: rate 1.2
    let active = LendingCurveState {
        underlying: underlying.clone(),
        share: share.clone(),
        cash: exp10(21),
        borrows: exp10(20) * U256::from(5),
        reserves: exp10(19) * U256::from(6),
        total_shares: exp10(21) * U256::from(12) / U256::from(10),
        base_rate_bps: 100,
        slope1_bps: 400,
        slope2_bps: 6_000,
        kink_bps: 8_000,
        reserve_factor_bps: 1_000,
    };

    let mut malformed = active.clone();
    malformed.reserves = exp10(22);

    vec![PoolFixture {
        label: "lending-rate-1.2".to_string(),
        state: PoolState::LendingCurve(active),
        // redemption direction: one share buys 1.2 underlying
        token_in: share,
        token_out: underlying,
        sample_inputs: vec![exp10(15), exp10(16), exp10(17), exp10(18), exp10(19)],
        sample_outputs: vec![exp10(15), exp10(17), exp10(19), exp10(20)],
        // only the idle cash is withdrawable
        excessive_output: exp10(21),
        malformed_state: Some(PoolState::LendingCurve(malformed)),
        quotable: true,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::KnownChain;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_family_has_fixtures() {
        for family in PoolFamily::iter().filter(|family| *family != PoolFamily::Unknown) {
            let fixtures = default_fixtures(family, KnownChain::ETHEREUM);
            assert!(!fixtures.is_empty(), "no fixtures for {family}");
            for fixture in &fixtures {
                assert_eq!(fixture.state.family(), family, "{}", fixture.label);
                if fixture.quotable {
                    assert!(fixture.state.validate().is_ok(), "{}", fixture.label);
                    assert!(!fixture.sample_inputs.is_empty());
                    assert!(!fixture.sample_outputs.is_empty());
                }
                if let Some(malformed) = &fixture.malformed_state {
                    assert!(malformed.validate().is_err(), "{} malformed state validates", fixture.label);
                }
            }
        }
    }
}
