use super::math::{div_ceil, fee_amount, gross_up_fee, mul_div_ceil, mul_div_floor};
use super::module::{LiquidityModule, ProtocolId, Quote, QuoteError, StateRequirements};
use crate::state::{ConcentratedLiquidityState, PoolFamily, PoolState};
use crate::token::{ChainId, Token};
use crate::utils::constants::Q96;
use crate::utils::decimal::locked_value;
use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reference module for concentrated-liquidity pools, quoting against the
/// liquidity of the active price range only.
///
/// Price moves are expressed on the Q64.96 sqrt grid:
///
/// - token0 amounts between two sqrt prices `a < b`:
///   `L·Q96·(b − a) / (a·b)`
/// - token1 amounts: `L·(b − a) / Q96`
///
/// A quote that would push the price past the range bound fails with
/// `InsufficientLiquidity`; crossing into the next tick range needs
/// per-protocol tick data that is not part of this snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConcentratedLiquidityModule {
    chain_id: ChainId,
}

impl ConcentratedLiquidityModule {
    pub fn new(chain_id: ChainId) -> Self {
        Self { chain_id }
    }

    fn state<'a>(&self, state: &'a PoolState) -> Result<&'a ConcentratedLiquidityState, QuoteError> {
        match state {
            PoolState::ConcentratedLiquidity(cl) => {
                cl.validate()?;
                Ok(cl)
            }
            other => Err(QuoteError::InvalidState(format!(
                "expected CONCENTRATED_LIQUIDITY state, got {}",
                other.family()
            ))),
        }
    }
}

/// `floor(lq * (b - a) / (a * b))`: token0 between two sqrt prices.
fn amount0_floor(lq: U256, a: U256, b: U256) -> Option<U256> {
    let step = mul_div_floor(lq, b.checked_sub(a)?, b)?;
    Some(step / a)
}

/// `ceil(lq * (b - a) / (a * b))`: token0, charged side.
fn amount0_ceil(lq: U256, a: U256, b: U256) -> Option<U256> {
    let step = mul_div_ceil(lq, b.checked_sub(a)?, b)?;
    div_ceil(step, a)
}

/// `floor(liquidity * (b - a) / Q96)`: token1 between two sqrt prices.
fn amount1_floor(liquidity: U256, a: U256, b: U256) -> Option<U256> {
    mul_div_floor(liquidity, b.checked_sub(a)?, Q96)
}

/// `ceil(liquidity * (b - a) / Q96)`: token1, charged side.
fn amount1_ceil(liquidity: U256, a: U256, b: U256) -> Option<U256> {
    mul_div_ceil(liquidity, b.checked_sub(a)?, Q96)
}

#[typetag::serde]
impl LiquidityModule for ConcentratedLiquidityModule {
    fn protocol(&self) -> ProtocolId {
        ProtocolId::new("concentrated-liquidity")
    }

    fn family(&self) -> PoolFamily {
        PoolFamily::ConcentratedLiquidity
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
        let cl = self.state(state)?;
        let zero_for_one = cl.zero_for_one(token_in, token_out)?;

        if amount_in.is_zero() {
            return Ok(Quote::ZERO);
        }
        if cl.liquidity == 0 {
            return Err(QuoteError::InsufficientLiquidity);
        }

        let fee = fee_amount(amount_in, cl.fee_bps).ok_or(QuoteError::InsufficientLiquidity)?;
        let net = amount_in - fee;
        if net.is_zero() {
            return Ok(Quote::new(U256::ZERO, fee));
        }

        let liquidity = U256::from(cl.liquidity);
        let lq = liquidity.checked_mul(Q96).ok_or(QuoteError::InsufficientLiquidity)?;
        let sqrt_p = cl.sqrt_price_x96;

        let amount = if zero_for_one {
            // price falls: sqrt' = ceil(lq·sqrtP / (lq + net·sqrtP))
            let shift = net.checked_mul(sqrt_p).ok_or(QuoteError::InsufficientLiquidity)?;
            let denominator = lq.checked_add(shift).ok_or(QuoteError::InsufficientLiquidity)?;
            let sqrt_new =
                mul_div_ceil(lq, sqrt_p, denominator).ok_or(QuoteError::InsufficientLiquidity)?;
            if sqrt_new < cl.sqrt_price_lower_x96 {
                return Err(QuoteError::InsufficientLiquidity);
            }
            amount1_floor(liquidity, sqrt_new, sqrt_p).ok_or(QuoteError::InsufficientLiquidity)?
        } else {
            // price rises: sqrt' = sqrtP + floor(net·Q96 / L)
            let delta = mul_div_floor(net, Q96, liquidity).ok_or(QuoteError::InsufficientLiquidity)?;
            let sqrt_new = sqrt_p.checked_add(delta).ok_or(QuoteError::InsufficientLiquidity)?;
            if sqrt_new > cl.sqrt_price_upper_x96 {
                return Err(QuoteError::InsufficientLiquidity);
            }
            amount0_floor(lq, sqrt_p, sqrt_new).ok_or(QuoteError::InsufficientLiquidity)?
        };

        Ok(Quote::new(amount, fee))
    }

    fn quote_in_amount(
        &self,
        state: &PoolState,
        token_in: &Token,
        token_out: &Token,
        amount_out: U256,
    ) -> Result<Quote, QuoteError> {
        let cl = self.state(state)?;
        let zero_for_one = cl.zero_for_one(token_in, token_out)?;

        if amount_out.is_zero() {
            return Ok(Quote::ZERO);
        }
        if cl.liquidity == 0 {
            return Err(QuoteError::InsufficientLiquidity);
        }

        let liquidity = U256::from(cl.liquidity);
        let lq = liquidity.checked_mul(Q96).ok_or(QuoteError::InsufficientLiquidity)?;
        let sqrt_p = cl.sqrt_price_x96;

        let net = if zero_for_one {
            // token1 leaves; the range holds L·(sqrtP − lower)/Q96 of it
            let available = amount1_floor(liquidity, cl.sqrt_price_lower_x96, sqrt_p)
                .ok_or(QuoteError::InsufficientLiquidity)?;
            if amount_out >= available {
                return Err(QuoteError::InsufficientLiquidity);
            }
            let delta = mul_div_ceil(amount_out, Q96, liquidity)
                .ok_or(QuoteError::InsufficientLiquidity)?;
            let sqrt_new =
                sqrt_p.checked_sub(delta).ok_or(QuoteError::InsufficientLiquidity)?;
            if sqrt_new < cl.sqrt_price_lower_x96 {
                return Err(QuoteError::InsufficientLiquidity);
            }
            amount0_ceil(lq, sqrt_new, sqrt_p).ok_or(QuoteError::InsufficientLiquidity)?
        } else {
            // token0 leaves; the range holds lq·(upper − sqrtP)/(sqrtP·upper) of it
            let available = amount0_floor(lq, sqrt_p, cl.sqrt_price_upper_x96)
                .ok_or(QuoteError::InsufficientLiquidity)?;
            if amount_out >= available {
                return Err(QuoteError::InsufficientLiquidity);
            }
            let shift = amount_out.checked_mul(sqrt_p).ok_or(QuoteError::InsufficientLiquidity)?;
            let denominator = lq.checked_sub(shift).ok_or(QuoteError::InsufficientLiquidity)?;
            if denominator.is_zero() {
                return Err(QuoteError::InsufficientLiquidity);
            }
            let sqrt_new =
                mul_div_ceil(lq, sqrt_p, denominator).ok_or(QuoteError::InsufficientLiquidity)?;
            if sqrt_new > cl.sqrt_price_upper_x96 {
                return Err(QuoteError::InsufficientLiquidity);
            }
            amount1_ceil(liquidity, sqrt_p, sqrt_new).ok_or(QuoteError::InsufficientLiquidity)?
        };

        let net = net.checked_add(U256::from(1)).ok_or(QuoteError::InsufficientLiquidity)?;
        let gross = gross_up_fee(net, cl.fee_bps).ok_or(QuoteError::InsufficientLiquidity)?;
        let fee = gross - net;

        Ok(Quote::new(gross, fee))
    }

    /// In-range liquidity carries no position-level fee accounting, so
    /// there is no well-defined yield to report.
    fn apy(&self, state: &PoolState) -> Result<Decimal, QuoteError> {
        self.state(state)?;
        Err(QuoteError::Unavailable)
    }

    fn tvl(&self, state: &PoolState, token: Option<&Token>) -> Result<Decimal, QuoteError> {
        let cl = self.state(state)?;
        let liquidity = U256::from(cl.liquidity);
        let lq = liquidity
            .checked_mul(Q96)
            .ok_or_else(|| QuoteError::InvalidState("liquidity exceeds range".to_string()))?;

        let amount_error = || QuoteError::InvalidState("range amount exceeds decimal range".to_string());
        let amount0 = amount0_floor(lq, cl.sqrt_price_x96, cl.sqrt_price_upper_x96)
            .ok_or_else(amount_error)?;
        let amount1 = amount1_floor(liquidity, cl.sqrt_price_lower_x96, cl.sqrt_price_x96)
            .ok_or_else(amount_error)?;

        let value_of = |token: &Token, amount: U256| {
            locked_value(token, amount).ok_or_else(amount_error)
        };
        match token {
            None => {
                let value0 = value_of(&cl.token0, amount0)?;
                let value1 = value_of(&cl.token1, amount1)?;
                value0.checked_add(value1).ok_or_else(amount_error)
            }
            Some(token) if *token == cl.token0 => value_of(&cl.token0, amount0),
            Some(token) if *token == cl.token1 => value_of(&cl.token1, amount1),
            Some(token) => Err(QuoteError::InvalidToken(token.get_address())),
        }
    }

    fn state_requirements(&self) -> StateRequirements {
        StateRequirements {
            dynamic_fields: &[
                "liquidity",
                "sqrt_price_x96",
                "sqrt_price_lower_x96",
                "sqrt_price_upper_x96",
            ],
            static_fields: &["token0", "token1", "fee_bps"],
        }
    }
}
