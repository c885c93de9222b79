use super::math::{fee_amount, gross_up_fee, mul_div_floor};
use super::module::{LiquidityModule, ProtocolId, Quote, QuoteError, StateRequirements};
use super::yield_stats::fee_apy;
use crate::state::{PoolFamily, PoolState};
use crate::token::{ChainId, Token};
use crate::utils::decimal::locked_value;
use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reference module for `x · y = k` pools with an input-side bps fee.
///
/// Exact-in quoting:
/// 1. `fee = ceil(amount_in × fee_bps / 10000)`
/// 2. `net = amount_in − fee`
/// 3. `out = floor(net × reserve_out / (reserve_in + net))`
///
/// Exact-out quoting inverts step 3 with the v2 `floor + 1` convention and
/// grosses the fee back up, so the quoted input always suffices.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConstantProductModule {
    chain_id: ChainId,
}

impl ConstantProductModule {
    pub fn new(chain_id: ChainId) -> Self {
        Self { chain_id }
    }

    fn state<'a>(&self, state: &'a PoolState) -> Result<&'a crate::state::ConstantProductState, QuoteError> {
        match state {
            PoolState::ConstantProduct(cp) => {
                cp.validate()?;
                Ok(cp)
            }
            other => Err(QuoteError::InvalidState(format!(
                "expected CONSTANT_PRODUCT state, got {}",
                other.family()
            ))),
        }
    }
}

#[typetag::serde]
impl LiquidityModule for ConstantProductModule {
    fn protocol(&self) -> ProtocolId {
        ProtocolId::new("constant-product")
    }

    fn family(&self) -> PoolFamily {
        PoolFamily::ConstantProduct
    }

    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    fn quote_out_amount(
        &self,
        state: &PoolState,
        token_in: &Token,
        token_out: &Token,
        amount_in: U256,
    ) -> Result<Quote, QuoteError> {
        let cp = self.state(state)?;
        let (reserve_in, reserve_out) = cp.oriented(token_in, token_out)?;

        if amount_in.is_zero() {
            return Ok(Quote::ZERO);
        }
        if reserve_in.is_zero() || reserve_out.is_zero() {
            return Err(QuoteError::InsufficientLiquidity);
        }

        let fee = fee_amount(amount_in, cp.fee_bps).ok_or(QuoteError::InsufficientLiquidity)?;
        let net = amount_in - fee;
        let denominator =
            reserve_in.checked_add(net).ok_or(QuoteError::InsufficientLiquidity)?;
        let out = mul_div_floor(net, reserve_out, denominator)
            .ok_or(QuoteError::InsufficientLiquidity)?;

        Ok(Quote::new(out, fee))
    }

    fn quote_in_amount(
        &self,
        state: &PoolState,
        token_in: &Token,
        token_out: &Token,
        amount_out: U256,
    ) -> Result<Quote, QuoteError> {
        let cp = self.state(state)?;
        let (reserve_in, reserve_out) = cp.oriented(token_in, token_out)?;

        if amount_out.is_zero() {
            return Ok(Quote::ZERO);
        }
        if amount_out >= reserve_out {
            return Err(QuoteError::InsufficientLiquidity);
        }
        if reserve_in.is_zero() {
            return Err(QuoteError::InsufficientLiquidity);
        }

        // net = floor(reserve_in * amount_out / (reserve_out - amount_out)) + 1
        let net = mul_div_floor(reserve_in, amount_out, reserve_out - amount_out)
            .and_then(|value| value.checked_add(U256::from(1)))
            .ok_or(QuoteError::InsufficientLiquidity)?;
        let gross = gross_up_fee(net, cp.fee_bps).ok_or(QuoteError::InsufficientLiquidity)?;
        let fee = gross - net;

        Ok(Quote::new(gross, fee))
    }

    fn apy(&self, state: &PoolState) -> Result<Decimal, QuoteError> {
        let cp = self.state(state)?;
        let tvl = self.tvl(state, None)?;
        fee_apy(cp.fee_stats.as_ref(), &cp.token0, &cp.token1, tvl)
    }

    fn tvl(&self, state: &PoolState, token: Option<&Token>) -> Result<Decimal, QuoteError> {
        let cp = self.state(state)?;
        let value_of = |token: &Token, reserve: U256| {
            locked_value(token, reserve)
                .ok_or_else(|| QuoteError::InvalidState("reserve exceeds decimal range".to_string()))
        };
        match token {
            None => {
                let value0 = value_of(&cp.token0, cp.reserve0)?;
                let value1 = value_of(&cp.token1, cp.reserve1)?;
                value0
                    .checked_add(value1)
                    .ok_or_else(|| QuoteError::InvalidState("tvl exceeds decimal range".to_string()))
            }
            Some(token) if *token == cp.token0 => value_of(&cp.token0, cp.reserve0),
            Some(token) if *token == cp.token1 => value_of(&cp.token1, cp.reserve1),
            Some(token) => Err(QuoteError::InvalidToken(token.get_address())),
        }
    }

    fn state_requirements(&self) -> StateRequirements {
        StateRequirements {
            dynamic_fields: &["reserve0", "reserve1", "fee_stats"],
            static_fields: &["token0", "token1", "fee_bps"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ConstantProductState, FeeStats, StableSwapState};
    use crate::utils::constants::KnownChain;
    use rust_decimal_macros::dec;

    fn tokens() -> (Token, Token) {
        (
            Token::new_with_data(
                KnownChain::ETHEREUM,
                alloy_primitives::Address::repeat_byte(1),
                18,
                Some("AAA".to_string()),
                dec!(1),
            ),
            Token::new_with_data(
                KnownChain::ETHEREUM,
                alloy_primitives::Address::repeat_byte(2),
                18,
                Some("BBB".to_string()),
                dec!(0.5),
            ),
        )
    }

    fn pool(reserve0: u64, reserve1: u64, fee_bps: u32) -> PoolState {
        let (t0, t1) = tokens();
        PoolState::ConstantProduct(
            ConstantProductState::new(t0, t1, U256::from(reserve0), U256::from(reserve1), fee_bps).unwrap(),
        )
    }

    fn module() -> ConstantProductModule {
        ConstantProductModule::new(KnownChain::ETHEREUM)
    }

    #[test]
    fn test_quote_out_zero_fee_exact_value() {
        // reserves (1000, 2000), zero fee: 100 in yields exactly
        // floor(2000 - 1000*2000 / 1100) = 181 out
        let (t0, t1) = tokens();
        let quote = module()
            .quote_out_amount(&pool(1000, 2000, 0), &t0, &t1, U256::from(100))
            .unwrap();
        assert_eq!(quote.amount, U256::from(181));
        assert_eq!(quote.fee, U256::ZERO);
    }

    #[test]
    fn test_quote_out_with_fee() {
        // 30 bps: fee = ceil(100 * 30 / 10000) = 1, net = 99
        // out = floor(99 * 2000 / 1099) = 180
        let (t0, t1) = tokens();
        let quote = module()
            .quote_out_amount(&pool(1000, 2000, 30), &t0, &t1, U256::from(100))
            .unwrap();
        assert_eq!(quote.fee, U256::from(1));
        assert_eq!(quote.amount, U256::from(180));
    }

    #[test]
    fn test_quote_out_zero_amount() {
        let (t0, t1) = tokens();
        let quote = module().quote_out_amount(&pool(1000, 2000, 30), &t0, &t1, U256::ZERO).unwrap();
        assert_eq!(quote, Quote::ZERO);
    }

    #[test]
    fn test_quote_out_one_sided_pool() {
        let (t0, t1) = tokens();
        let result = module().quote_out_amount(&pool(1000, 0, 30), &t0, &t1, U256::from(10));
        assert_eq!(result, Err(QuoteError::InsufficientLiquidity));
    }

    #[test]
    fn test_quote_out_huge_amount_does_not_panic() {
        let (t0, t1) = tokens();
        let result = module().quote_out_amount(&pool(1000, 2000, 30), &t0, &t1, U256::MAX);
        // either a capped quote or a clean refusal, never a panic
        if let Ok(quote) = result {
            assert!(quote.amount < U256::from(2000));
        }
    }

    #[test]
    fn test_quote_in_entire_reserve_fails() {
        let (t0, t1) = tokens();
        let result = module().quote_in_amount(&pool(1000, 2000, 0), &t0, &t1, U256::from(2000));
        assert_eq!(result, Err(QuoteError::InsufficientLiquidity));

        let beyond = module().quote_in_amount(&pool(1000, 2000, 0), &t0, &t1, U256::from(3000));
        assert_eq!(beyond, Err(QuoteError::InsufficientLiquidity));
    }

    #[test]
    fn test_quote_in_covers_quote_out() {
        let (t0, t1) = tokens();
        let state = pool(1_000_000, 2_000_000, 30);
        for amount_out in [1u64, 19, 181, 5_000, 500_000] {
            let needed = module()
                .quote_in_amount(&state, &t0, &t1, U256::from(amount_out))
                .unwrap();
            let obtained = module()
                .quote_out_amount(&state, &t0, &t1, needed.amount)
                .unwrap();
            assert!(
                obtained.amount >= U256::from(amount_out),
                "amount_out={amount_out} needed={} obtained={}",
                needed.amount,
                obtained.amount
            );
        }
    }

    #[test]
    fn test_quote_out_monotonic() {
        let (t0, t1) = tokens();
        let state = pool(1_000_000, 2_000_000, 30);
        let mut previous = U256::ZERO;
        for amount_in in [0u64, 1, 10, 100, 1_000, 10_000, 100_000, 1_000_000] {
            let quote = module()
                .quote_out_amount(&state, &t0, &t1, U256::from(amount_in))
                .unwrap();
            assert!(quote.amount >= previous, "output decreased at amount_in={amount_in}");
            previous = quote.amount;
        }
    }

    #[test]
    fn test_wrong_family_state() {
        let (t0, t1) = tokens();
        let stable = PoolState::StableSwap(
            StableSwapState::new(t0.clone(), t1.clone(), U256::from(1000), U256::from(1000), 100, 4).unwrap(),
        );
        let result = module().quote_out_amount(&stable, &t0, &t1, U256::from(10));
        assert!(matches!(result, Err(QuoteError::InvalidState(_))));
    }

    #[test]
    fn test_tvl_aggregates_constituents() {
        let (t0, t1) = tokens();
        // 1000 of AAA at 1.0 native, 2000 of BBB at 0.5 native, 18 decimals
        let state = pool(1_000_000_000_000_000_000, 2_000_000_000_000_000_000, 30);
        let module = module();

        let total = module.tvl(&state, None).unwrap();
        let part0 = module.tvl(&state, Some(&t0)).unwrap();
        let part1 = module.tvl(&state, Some(&t1)).unwrap();
        assert_eq!(total, part0 + part1);
        assert_eq!(total, dec!(2));

        let outsider = Token::repeat_byte(KnownChain::ETHEREUM, 9);
        assert!(matches!(module.tvl(&state, Some(&outsider)), Err(QuoteError::InvalidToken(_))));
    }

    #[test]
    fn test_apy_unavailable_without_fee_stats() {
        let state = pool(1_000_000_000_000_000_000, 2_000_000_000_000_000_000, 30);
        assert_eq!(module().apy(&state), Err(QuoteError::Unavailable));
    }

    #[test]
    fn test_apy_from_fee_stats() {
        let (t0, t1) = tokens();
        // TVL = 2 native. Fees of 0.002 native over one day
        // annualize to 0.73 native, so apy = 0.365.
        let state = PoolState::ConstantProduct(
            ConstantProductState::new(
                t0,
                t1,
                U256::from(1_000_000_000_000_000_000u64),
                U256::from(2_000_000_000_000_000_000u64),
                30,
            )
            .unwrap()
            .with_fee_stats(FeeStats {
                fees0: U256::from(2_000_000_000_000_000u64),
                fees1: U256::ZERO,
                window_secs: 86_400,
            }),
        );
        let apy = module().apy(&state).unwrap();
        assert_eq!(apy, dec!(0.365));
    }
}
