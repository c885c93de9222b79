use crate::modules::QuoteError;
use crate::token::Token;
use crate::utils::constants::BPS_DENOMINATOR;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Upper bound on Q64.96 sqrt prices (they are 160-bit values on chain).
const MAX_SQRT_PRICE_X96: U256 = U256::from_limbs([u64::MAX, u64::MAX, 4294967295, 0]);

/// Snapshot of a concentrated-liquidity pool around its active price range.
///
/// `liquidity` is the virtual liquidity currently in range; the two bound
/// prices delimit the range the quote may move within. Everything here is
/// dynamic except the tokens and the fee tier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConcentratedLiquidityState {
    pub token0: Token,
    pub token1: Token,
    pub liquidity: u128,
    pub sqrt_price_x96: U256,
    pub sqrt_price_lower_x96: U256,
    pub sqrt_price_upper_x96: U256,
    pub fee_bps: u32,
}

impl ConcentratedLiquidityState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        token0: Token,
        token1: Token,
        liquidity: u128,
        sqrt_price_x96: U256,
        sqrt_price_lower_x96: U256,
        sqrt_price_upper_x96: U256,
        fee_bps: u32,
    ) -> Result<Self, QuoteError> {
        let state = Self {
            token0,
            token1,
            liquidity,
            sqrt_price_x96,
            sqrt_price_lower_x96,
            sqrt_price_upper_x96,
            fee_bps,
        };
        state.validate()?;
        Ok(state)
    }

    pub fn validate(&self) -> Result<(), QuoteError> {
        super::validate_pair(&self.token0, &self.token1)?;
        if self.fee_bps >= BPS_DENOMINATOR {
            return Err(QuoteError::InvalidState("fee_bps must be below 10000".to_string()));
        }
        if self.sqrt_price_lower_x96.is_zero() {
            return Err(QuoteError::InvalidState("sqrt price lower bound must be nonzero".to_string()));
        }
        if self.sqrt_price_lower_x96 >= self.sqrt_price_upper_x96 {
            return Err(QuoteError::InvalidState(
                "sqrt price range must be ordered lower < upper".to_string(),
            ));
        }
        if self.sqrt_price_x96 < self.sqrt_price_lower_x96
            || self.sqrt_price_x96 > self.sqrt_price_upper_x96
        {
            return Err(QuoteError::InvalidState(
                "current sqrt price outside the active range".to_string(),
            ));
        }
        if self.sqrt_price_upper_x96 > MAX_SQRT_PRICE_X96 {
            return Err(QuoteError::InvalidState("sqrt price exceeds 160 bits".to_string()));
        }
        Ok(())
    }

    /// `true` when `token_in` is token0, i.e. the price moves down.
    pub fn zero_for_one(&self, token_in: &Token, token_out: &Token) -> Result<bool, QuoteError> {
        // reuse the membership/distinctness checks; the values are unused
        super::orient_two(
            (&self.token0, U256::ZERO),
            (&self.token1, U256::ZERO),
            token_in,
            token_out,
        )?;
        Ok(*token_in == self.token0)
    }
}
