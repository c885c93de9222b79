use super::math::{abs_diff, div_ceil, fee_amount, gross_up_fee, mul_div_floor};
use super::module::{LiquidityModule, ProtocolId, Quote, QuoteError, StateRequirements};
use super::yield_stats::fee_apy;
use crate::state::{PoolFamily, PoolState, StableSwapState};
use crate::token::{ChainId, Token};
use crate::utils::decimal::locked_value;
use alloy_primitives::ruint::UintTryFrom;
use alloy_primitives::{U256, U512};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const N_COINS: u64 = 2;

/// Slack, in normalized units, absorbing the one-unit convergence error of the
/// invariant iteration on each leg of an exact-out quote.
const SOLVER_SLACK: u64 = 4;

/// Reference module for two-coin StableSwap pools.
///
/// Balances are normalized onto an 18-decimal grid before running the
/// invariant; the amplified invariant `D` and the post-trade balance `y`
/// are solved by Newton iteration capped at 255 steps with one-unit
/// convergence, the standard integer formulation of the curve.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StableSwapModule {
    chain_id: ChainId,
}

impl StableSwapModule {
    pub fn new(chain_id: ChainId) -> Self {
        Self { chain_id }
    }

    fn state<'a>(&self, state: &'a PoolState) -> Result<&'a StableSwapState, QuoteError> {
        match state {
            PoolState::StableSwap(ss) => {
                ss.validate()?;
                Ok(ss)
            }
            other => Err(QuoteError::InvalidState(format!(
                "expected STABLE_SWAP state, got {}",
                other.family()
            ))),
        }
    }
}

struct Oriented {
    xp_in: U256,
    xp_out: U256,
    mult_in: U256,
    mult_out: U256,
    ann: U256,
}

/// Normalizes the oriented balances onto the 18-decimal grid.
fn normalize(ss: &StableSwapState, token_in: &Token, token_out: &Token) -> Result<Oriented, QuoteError> {
    let (balance_in, balance_out) = ss.oriented(token_in, token_out)?;
    let (state_in, state_out) =
        if *token_in == ss.token0 { (&ss.token0, &ss.token1) } else { (&ss.token1, &ss.token0) };

    // decimals come from the snapshot's static token fields, never from
    // the caller's metadata
    let precision_range =
        || QuoteError::InvalidState("balance exceeds normalized precision range".to_string());
    let mult_in = state_in.precision_multiplier().ok_or_else(precision_range)?;
    let mult_out = state_out.precision_multiplier().ok_or_else(precision_range)?;
    let xp_in = balance_in.checked_mul(mult_in).ok_or_else(precision_range)?;
    let xp_out = balance_out.checked_mul(mult_out).ok_or_else(precision_range)?;
    let ann = U256::from(ss.amp) * U256::from(N_COINS * N_COINS);

    Ok(Oriented { xp_in, xp_out, mult_in, mult_out, ann })
}

/// Solves the amplified invariant `D` for the given normalized balances.
fn compute_d(xp_in: U256, xp_out: U256, ann: U256) -> Option<U256> {
    let n = U256::from(N_COINS);
    let s = xp_in.checked_add(xp_out)?;
    if s.is_zero() {
        return Some(U256::ZERO);
    }

    let mut d = s;
    for _ in 0..255 {
        // d_p = d^3 / (n^n * xp_in * xp_out)
        let mut d_p = d;
        d_p = mul_div_floor(d_p, d, xp_in.checked_mul(n)?)?;
        d_p = mul_div_floor(d_p, d, xp_out.checked_mul(n)?)?;

        let d_prev = d;
        // d = (ann*s + n*d_p) * d / ((ann - 1)*d + (n + 1)*d_p)
        let numerator = ann.checked_mul(s)?.checked_add(d_p.checked_mul(n)?)?;
        let denominator =
            (ann - U256::from(1)).checked_mul(d)?.checked_add(d_p.checked_mul(n + U256::from(1))?)?;
        d = mul_div_floor(numerator, d, denominator)?;

        if abs_diff(d, d_prev) <= U256::from(1) {
            return Some(d);
        }
    }
    None
}

/// Solves the counterpart balance `y` given the other coin's balance `x`
/// on the invariant `d`. Converges from above, so the result is within
/// one unit above the true root.
fn compute_y(x: U256, d: U256, ann: U256) -> Option<U256> {
    if x.is_zero() {
        return None;
    }
    let n = U256::from(N_COINS);

    // c = d^3 / (n^n * x * ann), b = x + d/ann
    let mut c = mul_div_floor(d, d, x.checked_mul(n)?)?;
    c = mul_div_floor(c, d, ann.checked_mul(n)?)?;
    let b = x.checked_add(d / ann)?;

    let mut y = d;
    for _ in 0..255 {
        let y_prev = y;
        // y = (y^2 + c) / (2y + b - d)
        let numerator = U512::from(y) * U512::from(y) + U512::from(c);
        let denominator =
            (U512::from(y) * U512::from(2u8) + U512::from(b)).checked_sub(U512::from(d))?;
        if denominator.is_zero() {
            return None;
        }
        y = U256::uint_try_from(numerator / denominator).ok()?;

        if abs_diff(y, y_prev) <= U256::from(1) {
            return Some(y);
        }
    }
    None
}

#[typetag::serde]
impl LiquidityModule for StableSwapModule {
    fn protocol(&self) -> ProtocolId {
        ProtocolId::new("stable-swap")
    }

    fn family(&self) -> PoolFamily {
        PoolFamily::StableSwap
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
        let ss = self.state(state)?;
        let oriented = normalize(ss, token_in, token_out)?;

        if amount_in.is_zero() {
            return Ok(Quote::ZERO);
        }
        if oriented.xp_in.is_zero() || oriented.xp_out.is_zero() {
            return Err(QuoteError::InsufficientLiquidity);
        }

        let fee = fee_amount(amount_in, ss.fee_bps).ok_or(QuoteError::InsufficientLiquidity)?;
        let net = amount_in - fee;
        if net.is_zero() {
            return Ok(Quote::new(U256::ZERO, fee));
        }

        let d = compute_d(oriented.xp_in, oriented.xp_out, oriented.ann)
            .ok_or_else(|| QuoteError::InvalidState("stable-swap invariant did not converge".to_string()))?;

        let x_new = net
            .checked_mul(oriented.mult_in)
            .and_then(|dx| oriented.xp_in.checked_add(dx))
            .ok_or(QuoteError::InsufficientLiquidity)?;
        let y_new =
            compute_y(x_new, d, oriented.ann).ok_or(QuoteError::InsufficientLiquidity)?;

        // one unit off the top absorbs the iteration error
        let dy_norm = oriented.xp_out.saturating_sub(y_new.saturating_add(U256::from(1)));
        let dy = dy_norm / oriented.mult_out;

        Ok(Quote::new(dy, fee))
    }

    fn quote_in_amount(
        &self,
        state: &PoolState,
        token_in: &Token,
        token_out: &Token,
        amount_out: U256,
    ) -> Result<Quote, QuoteError> {
        let ss = self.state(state)?;
        let oriented = normalize(ss, token_in, token_out)?;

        if amount_out.is_zero() {
            return Ok(Quote::ZERO);
        }
        if oriented.xp_in.is_zero() || oriented.xp_out.is_zero() {
            return Err(QuoteError::InsufficientLiquidity);
        }

        let dy_norm =
            amount_out.checked_mul(oriented.mult_out).ok_or(QuoteError::InsufficientLiquidity)?;
        let reserved = dy_norm.checked_add(U256::from(1)).ok_or(QuoteError::InsufficientLiquidity)?;
        if reserved >= oriented.xp_out {
            return Err(QuoteError::InsufficientLiquidity);
        }

        let d = compute_d(oriented.xp_in, oriented.xp_out, oriented.ann)
            .ok_or_else(|| QuoteError::InvalidState("stable-swap invariant did not converge".to_string()))?;

        let y_target = oriented.xp_out - reserved;
        let x_new =
            compute_y(y_target, d, oriented.ann).ok_or(QuoteError::InsufficientLiquidity)?;

        let net_norm = x_new
            .saturating_sub(oriented.xp_in)
            .checked_add(U256::from(SOLVER_SLACK))
            .ok_or(QuoteError::InsufficientLiquidity)?;
        let net = div_ceil(net_norm, oriented.mult_in).ok_or(QuoteError::InsufficientLiquidity)?;
        let gross = gross_up_fee(net, ss.fee_bps).ok_or(QuoteError::InsufficientLiquidity)?;
        let fee = gross - net;

        Ok(Quote::new(gross, fee))
    }

    fn apy(&self, state: &PoolState) -> Result<Decimal, QuoteError> {
        let ss = self.state(state)?;
        let tvl = self.tvl(state, None)?;
        fee_apy(ss.fee_stats.as_ref(), &ss.token0, &ss.token1, tvl)
    }

    fn tvl(&self, state: &PoolState, token: Option<&Token>) -> Result<Decimal, QuoteError> {
        let ss = self.state(state)?;
        let value_of = |token: &Token, balance: U256| {
            locked_value(token, balance)
                .ok_or_else(|| QuoteError::InvalidState("balance exceeds decimal range".to_string()))
        };
        match token {
            None => {
                let value0 = value_of(&ss.token0, ss.balance0)?;
                let value1 = value_of(&ss.token1, ss.balance1)?;
                value0
                    .checked_add(value1)
                    .ok_or_else(|| QuoteError::InvalidState("tvl exceeds decimal range".to_string()))
            }
            Some(token) if *token == ss.token0 => value_of(&ss.token0, ss.balance0),
            Some(token) if *token == ss.token1 => value_of(&ss.token1, ss.balance1),
            Some(token) => Err(QuoteError::InvalidToken(token.get_address())),
        }
    }

    fn state_requirements(&self) -> StateRequirements {
        StateRequirements {
            dynamic_fields: &["balance0", "balance1", "fee_stats"],
            static_fields: &["token0", "token1", "amp", "fee_bps"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::{DAI, KnownChain, USDC};
    use rust_decimal_macros::dec;

    fn usdc() -> Token {
        Token::new_with_data(KnownChain::ETHEREUM, USDC, 6, Some("USDC".to_string()), dec!(0.0005))
    }

    fn dai() -> Token {
        Token::new_with_data(KnownChain::ETHEREUM, DAI, 18, Some("DAI".to_string()), dec!(0.0005))
    }

    /// 2M USDC / 2M DAI, amp 200, 4 bps.
    fn pool() -> PoolState {
        PoolState::StableSwap(
            StableSwapState::new(
                usdc(),
                dai(),
                U256::from(2_000_000_000_000u64),
                U256::from_str_radix("2000000000000000000000000", 10).unwrap(),
                200,
                4,
            )
            .unwrap(),
        )
    }

    fn module() -> StableSwapModule {
        StableSwapModule::new(KnownChain::ETHEREUM)
    }

    #[test]
    fn test_compute_d_balanced() {
        let xp = U256::from_str_radix("2000000000000000000000000", 10).unwrap();
        let d = compute_d(xp, xp, U256::from(800)).unwrap();
        // D of a balanced pool is the sum of balances, within iteration error
        assert!(abs_diff(d, xp * U256::from(2)) <= U256::from(2));
    }

    #[test]
    fn test_quote_out_near_peg() {
        // 1000 USDC in, expect a hair under 1000 DAI out
        let quote = module()
            .quote_out_amount(&pool(), &usdc(), &dai(), U256::from(1_000_000_000u64))
            .unwrap();
        let lower = U256::from_str_radix("998000000000000000000", 10).unwrap();
        let upper = U256::from_str_radix("1000000000000000000000", 10).unwrap();
        assert!(quote.amount > lower, "amount={}", quote.amount);
        assert!(quote.amount < upper, "amount={}", quote.amount);
        // 4 bps of 1e9 = 400_000
        assert_eq!(quote.fee, U256::from(400_000u64));
    }

    #[test]
    fn test_quote_out_zero_amount() {
        let quote = module().quote_out_amount(&pool(), &usdc(), &dai(), U256::ZERO).unwrap();
        assert_eq!(quote, Quote::ZERO);
    }

    #[test]
    fn test_quote_in_covers_quote_out() {
        let module = module();
        let state = pool();
        for dai_out in ["1000000000000000000", "999000000000000000000", "50000000000000000000000"] {
            let amount_out = U256::from_str_radix(dai_out, 10).unwrap();
            let needed = module.quote_in_amount(&state, &usdc(), &dai(), amount_out).unwrap();
            let obtained = module.quote_out_amount(&state, &usdc(), &dai(), needed.amount).unwrap();
            assert!(
                obtained.amount >= amount_out,
                "out={amount_out} needed={} obtained={}",
                needed.amount,
                obtained.amount
            );
        }
    }

    #[test]
    fn test_quote_out_monotonic() {
        let module = module();
        let state = pool();
        let mut previous = U256::ZERO;
        for usdc_in in [1_000_000u64, 10_000_000, 100_000_000, 1_000_000_000, 10_000_000_000] {
            let quote = module.quote_out_amount(&state, &usdc(), &dai(), U256::from(usdc_in)).unwrap();
            assert!(quote.amount >= previous);
            previous = quote.amount;
        }
    }

    #[test]
    fn test_quote_in_entire_balance_fails() {
        let whole = U256::from_str_radix("2000000000000000000000000", 10).unwrap();
        let result = module().quote_in_amount(&pool(), &usdc(), &dai(), whole);
        assert_eq!(result, Err(QuoteError::InsufficientLiquidity));
    }

    #[test]
    fn test_one_sided_pool() {
        let state = PoolState::StableSwap(
            StableSwapState::new(
                usdc(),
                dai(),
                U256::from(1_000_000u64),
                U256::ZERO,
                200,
                4,
            )
            .unwrap(),
        );
        let result = module().quote_out_amount(&state, &usdc(), &dai(), U256::from(100));
        assert_eq!(result, Err(QuoteError::InsufficientLiquidity));
    }

    #[test]
    fn test_tvl_additive_across_decimals() {
        let module = module();
        let state = pool();
        let total = module.tvl(&state, None).unwrap();
        let usdc_part = module.tvl(&state, Some(&usdc())).unwrap();
        let dai_part = module.tvl(&state, Some(&dai())).unwrap();
        assert_eq!(total, usdc_part + dai_part);
        // 2M + 2M at 0.0005 native = 2000 native
        assert_eq!(total, dec!(2000));
    }
}
