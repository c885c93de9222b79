use super::FeeStats;
use crate::modules::QuoteError;
use crate::token::Token;
use crate::utils::constants::BPS_DENOMINATOR;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Snapshot of a two-coin StableSwap pool.
///
/// Balances are raw base units; the module normalizes them onto an
/// 18-decimal grid before running the invariant, which caps supported
/// token decimals at 18 for this family.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StableSwapState {
    pub token0: Token,
    pub token1: Token,
    pub balance0: U256,
    pub balance1: U256,
    /// Amplification coefficient `A`; higher values flatten the curve
    /// around the peg.
    pub amp: u64,
    pub fee_bps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_stats: Option<FeeStats>,
}

impl StableSwapState {
    pub fn new(
        token0: Token,
        token1: Token,
        balance0: U256,
        balance1: U256,
        amp: u64,
        fee_bps: u32,
    ) -> Result<Self, QuoteError> {
        let state = Self { token0, token1, balance0, balance1, amp, fee_bps, fee_stats: None };
        state.validate()?;
        Ok(state)
    }

    pub fn with_fee_stats(mut self, fee_stats: FeeStats) -> Self {
        self.fee_stats = Some(fee_stats);
        self
    }

    pub fn validate(&self) -> Result<(), QuoteError> {
        super::validate_pair(&self.token0, &self.token1)?;
        if self.amp == 0 {
            return Err(QuoteError::InvalidState("amplification coefficient must be nonzero".to_string()));
        }
        if self.fee_bps >= BPS_DENOMINATOR {
            return Err(QuoteError::InvalidState("fee_bps must be below 10000".to_string()));
        }
        if self.token0.get_decimals() > 18 || self.token1.get_decimals() > 18 {
            return Err(QuoteError::InvalidState(
                "stable-swap tokens must have at most 18 decimals".to_string(),
            ));
        }
        if let Some(stats) = &self.fee_stats {
            stats.validate()?;
        }
        Ok(())
    }

    /// Balances seen from the `token_in -> token_out` direction.
    pub fn oriented(&self, token_in: &Token, token_out: &Token) -> Result<(U256, U256), QuoteError> {
        super::orient_two(
            (&self.token0, self.balance0),
            (&self.token1, self.balance1),
            token_in,
            token_out,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::KnownChain;
    use alloy_primitives::Address;

    fn usdc_like() -> Token {
        Token::new(KnownChain::ETHEREUM, Address::repeat_byte(1), 6)
    }

    fn dai_like() -> Token {
        Token::new(KnownChain::ETHEREUM, Address::repeat_byte(2), 18)
    }

    #[test]
    fn test_new_validates() {
        let ok = StableSwapState::new(
            usdc_like(),
            dai_like(),
            U256::from(2_000_000_000_000u64),
            U256::from_str_radix("2000000000000000000000000", 10).unwrap(),
            200,
            4,
        );
        assert!(ok.is_ok());

        let zero_amp =
            StableSwapState::new(usdc_like(), dai_like(), U256::from(1), U256::from(1), 0, 4);
        assert!(matches!(zero_amp, Err(QuoteError::InvalidState(_))));

        let fat_decimals = Token::new(KnownChain::ETHEREUM, Address::repeat_byte(3), 24);
        let decimals =
            StableSwapState::new(usdc_like(), fat_decimals, U256::from(1), U256::from(1), 200, 4);
        assert!(matches!(decimals, Err(QuoteError::InvalidState(_))));
    }
}
