use super::FeeStats;
use crate::modules::QuoteError;
use crate::token::Token;
use crate::utils::constants::BPS_DENOMINATOR;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Snapshot of an `x · y = k` pool.
///
/// `reserve0`/`reserve1` are dynamic and must be refreshed by the caller
/// every block; the tokens and fee tier are static and may also be cached
/// by the module, but the snapshot value always wins.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstantProductState {
    pub token0: Token,
    pub token1: Token,
    pub reserve0: U256,
    pub reserve1: U256,
    pub fee_bps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_stats: Option<FeeStats>,
}

impl ConstantProductState {
    pub fn new(
        token0: Token,
        token1: Token,
        reserve0: U256,
        reserve1: U256,
        fee_bps: u32,
    ) -> Result<Self, QuoteError> {
        let state = Self { token0, token1, reserve0, reserve1, fee_bps, fee_stats: None };
        state.validate()?;
        Ok(state)
    }

    pub fn with_fee_stats(mut self, fee_stats: FeeStats) -> Self {
        self.fee_stats = Some(fee_stats);
        self
    }

    pub fn validate(&self) -> Result<(), QuoteError> {
        super::validate_pair(&self.token0, &self.token1)?;
        if self.fee_bps >= BPS_DENOMINATOR {
            return Err(QuoteError::InvalidState("fee_bps must be below 10000".to_string()));
        }
        if let Some(stats) = &self.fee_stats {
            stats.validate()?;
        }
        Ok(())
    }

    /// Reserves seen from the `token_in -> token_out` direction.
    pub fn oriented(&self, token_in: &Token, token_out: &Token) -> Result<(U256, U256), QuoteError> {
        super::orient_two(
            (&self.token0, self.reserve0),
            (&self.token1, self.reserve1),
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

    fn tokens() -> (Token, Token) {
        (
            Token::repeat_byte(KnownChain::ETHEREUM, 1),
            Token::repeat_byte(KnownChain::ETHEREUM, 2),
        )
    }

    #[test]
    fn test_new_validates() {
        let (t0, t1) = tokens();
        assert!(ConstantProductState::new(t0.clone(), t1.clone(), U256::from(1000), U256::from(2000), 30).is_ok());

        // duplicated token
        let dup = ConstantProductState::new(t0.clone(), t0.clone(), U256::from(1), U256::from(1), 30);
        assert!(matches!(dup, Err(QuoteError::InvalidState(_))));

        // 100% fee
        let fee = ConstantProductState::new(t0.clone(), t1.clone(), U256::from(1), U256::from(1), 10_000);
        assert!(matches!(fee, Err(QuoteError::InvalidState(_))));

        // cross-chain pair
        let foreign = Token::repeat_byte(KnownChain::BASE, 3);
        let chains = ConstantProductState::new(t0, foreign, U256::from(1), U256::from(1), 30);
        assert!(matches!(chains, Err(QuoteError::InvalidState(_))));
    }

    #[test]
    fn test_oriented() {
        let (t0, t1) = tokens();
        let state =
            ConstantProductState::new(t0.clone(), t1.clone(), U256::from(1000), U256::from(2000), 0).unwrap();

        assert_eq!(state.oriented(&t0, &t1).unwrap(), (U256::from(1000), U256::from(2000)));
        assert_eq!(state.oriented(&t1, &t0).unwrap(), (U256::from(2000), U256::from(1000)));

        let outsider = Token::repeat_byte(KnownChain::ETHEREUM, 9);
        assert_eq!(
            state.oriented(&outsider, &t1),
            Err(QuoteError::InvalidToken(Address::repeat_byte(9)))
        );
        // same token on both sides is not a swap direction
        assert!(matches!(state.oriented(&t0, &t0), Err(QuoteError::InvalidToken(_))));
    }

    #[test]
    fn test_json_round_trip_rejects_missing_fields() {
        let (t0, t1) = tokens();
        let state = ConstantProductState::new(t0, t1, U256::from(5), U256::from(6), 30).unwrap();
        let json = serde_json::to_string(&state).unwrap();
        let back: ConstantProductState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, back);

        // a snapshot missing its reserves never reaches the math
        let truncated = "{\"fee_bps\":30}";
        assert!(serde_json::from_str::<ConstantProductState>(truncated).is_err());
    }
}
