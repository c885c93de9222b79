use super::math::{mul_div_ceil, mul_div_floor};
use super::module::{LiquidityModule, ProtocolId, Quote, QuoteError, StateRequirements};
use crate::state::{LendingCurveState, PoolFamily, PoolState};
use crate::token::{ChainId, Token};
use crate::utils::constants::BPS_DENOMINATOR;
use crate::utils::decimal::{amount_to_decimal, locked_value};
use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reference module for lending pools, modeled as an exchange between the
/// underlying asset and its interest-bearing share token at
/// `exchange_rate = (cash + borrows − reserves) / total_shares`.
///
/// Deposits mint shares (round down), withdrawals burn shares for
/// underlying capped by the pool's idle cash. No swap fee; the yield
/// comes from the kinked utilization curve instead.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LendingCurveModule {
    chain_id: ChainId,
}

impl LendingCurveModule {
    pub fn new(chain_id: ChainId) -> Self {
        Self { chain_id }
    }

    fn state<'a>(&self, state: &'a PoolState) -> Result<&'a LendingCurveState, QuoteError> {
        match state {
            PoolState::LendingCurve(lc) => {
                lc.validate()?;
                Ok(lc)
            }
            other => Err(QuoteError::InvalidState(format!(
                "expected LENDING_CURVE state, got {}",
                other.family()
            ))),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Side {
    Deposit,
    Withdraw,
}

fn side(lc: &LendingCurveState, token_in: &Token, token_out: &Token) -> Result<Side, QuoteError> {
    if *token_in != lc.underlying && *token_in != lc.share {
        return Err(QuoteError::InvalidToken(token_in.get_address()));
    }
    if *token_out != lc.underlying && *token_out != lc.share {
        return Err(QuoteError::InvalidToken(token_out.get_address()));
    }
    if token_in == token_out {
        return Err(QuoteError::InvalidToken(token_out.get_address()));
    }
    if *token_in == lc.underlying { Ok(Side::Deposit) } else { Ok(Side::Withdraw) }
}

/// Utilization `borrows / (cash + borrows)` as a decimal ratio.
fn utilization(lc: &LendingCurveState) -> Result<Decimal, QuoteError> {
    let out_of_range = || QuoteError::InvalidState("balance exceeds decimal range".to_string());
    if lc.borrows.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let decimals = lc.underlying.get_decimals();
    let borrows = amount_to_decimal(lc.borrows, decimals).ok_or_else(out_of_range)?;
    let assets = amount_to_decimal(
        lc.cash.checked_add(lc.borrows).ok_or_else(out_of_range)?,
        decimals,
    )
    .ok_or_else(out_of_range)?;
    if assets.is_zero() {
        return Ok(Decimal::ZERO);
    }
    borrows.checked_div(assets).ok_or_else(out_of_range)
}

fn bps_ratio(bps: u32) -> Decimal {
    Decimal::from(bps) / Decimal::from(BPS_DENOMINATOR)
}

#[typetag::serde]
impl LiquidityModule for LendingCurveModule {
    fn protocol(&self) -> ProtocolId {
        ProtocolId::new("lending-curve")
    }

    fn family(&self) -> PoolFamily {
        PoolFamily::LendingCurve
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
        let lc = self.state(state)?;
        let side = side(lc, token_in, token_out)?;

        if amount_in.is_zero() {
            return Ok(Quote::ZERO);
        }
        if lc.total_shares.is_zero() {
            return Err(QuoteError::InsufficientLiquidity);
        }
        let value = lc.pool_value();
        if value.is_zero() {
            return Err(QuoteError::InsufficientLiquidity);
        }

        let amount = match side {
            // shares minted = floor(amount * total_shares / value)
            Side::Deposit => mul_div_floor(amount_in, lc.total_shares, value)
                .ok_or(QuoteError::InsufficientLiquidity)?,
            // underlying redeemed = floor(shares * value / total_shares)
            Side::Withdraw => {
                let out = mul_div_floor(amount_in, value, lc.total_shares)
                    .ok_or(QuoteError::InsufficientLiquidity)?;
                if out > lc.cash {
                    return Err(QuoteError::InsufficientLiquidity);
                }
                out
            }
        };

        Ok(Quote::new(amount, U256::ZERO))
    }

    fn quote_in_amount(
        &self,
        state: &PoolState,
        token_in: &Token,
        token_out: &Token,
        amount_out: U256,
    ) -> Result<Quote, QuoteError> {
        let lc = self.state(state)?;
        let side = side(lc, token_in, token_out)?;

        if amount_out.is_zero() {
            return Ok(Quote::ZERO);
        }
        if lc.total_shares.is_zero() {
            return Err(QuoteError::InsufficientLiquidity);
        }
        let value = lc.pool_value();
        if value.is_zero() {
            return Err(QuoteError::InsufficientLiquidity);
        }

        let amount = match side {
            // underlying needed = ceil(shares * value / total_shares) + 1
            Side::Deposit => mul_div_ceil(amount_out, value, lc.total_shares)
                .and_then(|needed| needed.checked_add(U256::from(1)))
                .ok_or(QuoteError::InsufficientLiquidity)?,
            // shares needed = ceil(amount * total_shares / value) + 1,
            // bounded by the idle cash actually withdrawable
            Side::Withdraw => {
                if amount_out >= lc.cash {
                    return Err(QuoteError::InsufficientLiquidity);
                }
                mul_div_ceil(amount_out, lc.total_shares, value)
                    .and_then(|needed| needed.checked_add(U256::from(1)))
                    .ok_or(QuoteError::InsufficientLiquidity)?
            }
        };

        Ok(Quote::new(amount, U256::ZERO))
    }

    /// Supply APY from the kinked borrow-rate curve:
    /// `borrow_rate × utilization × (1 − reserve_factor)`.
    fn apy(&self, state: &PoolState) -> Result<Decimal, QuoteError> {
        let lc = self.state(state)?;
        let out_of_range = || QuoteError::InvalidState("rate exceeds decimal range".to_string());

        let u = utilization(lc)?;
        let kink = bps_ratio(lc.kink_bps);
        let borrow_rate = if u <= kink {
            // base + slope1 * u / kink
            bps_ratio(lc.slope1_bps)
                .checked_mul(u)
                .and_then(|scaled| scaled.checked_div(kink))
                .and_then(|ramp| bps_ratio(lc.base_rate_bps).checked_add(ramp))
                .ok_or_else(out_of_range)?
        } else {
            // base + slope1 + slope2 * (u - kink) / (1 - kink)
            let excess = u - kink;
            bps_ratio(lc.slope2_bps)
                .checked_mul(excess)
                .and_then(|scaled| scaled.checked_div(Decimal::ONE - kink))
                .and_then(|ramp| {
                    bps_ratio(lc.base_rate_bps)
                        .checked_add(bps_ratio(lc.slope1_bps))
                        .and_then(|base| base.checked_add(ramp))
                })
                .ok_or_else(out_of_range)?
        };

        let retained = Decimal::ONE - bps_ratio(lc.reserve_factor_bps);
        borrow_rate
            .checked_mul(u)
            .and_then(|gross| gross.checked_mul(retained))
            .ok_or_else(out_of_range)
    }

    fn tvl(&self, state: &PoolState, token: Option<&Token>) -> Result<Decimal, QuoteError> {
        let lc = self.state(state)?;
        let out_of_range = || QuoteError::InvalidState("balance exceeds decimal range".to_string());
        match token {
            // the locked assets are the underlying backing the shares;
            // shares themselves are claims, not locked value
            None => locked_value(&lc.underlying, lc.pool_value()).ok_or_else(out_of_range),
            Some(token) if *token == lc.underlying => {
                locked_value(&lc.underlying, lc.pool_value()).ok_or_else(out_of_range)
            }
            Some(token) if *token == lc.share => Ok(Decimal::ZERO),
            Some(token) => Err(QuoteError::InvalidToken(token.get_address())),
        }
    }

    fn state_requirements(&self) -> StateRequirements {
        StateRequirements {
            dynamic_fields: &["cash", "borrows", "reserves", "total_shares"],
            static_fields: &[
                "underlying",
                "share",
                "base_rate_bps",
                "slope1_bps",
                "slope2_bps",
                "kink_bps",
                "reserve_factor_bps",
            ],
        }
    }
}
