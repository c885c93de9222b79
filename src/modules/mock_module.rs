use super::module::{LiquidityModule, ProtocolId, Quote, QuoteError};
use crate::state::PoolState;
use crate::token::{ChainId, Token};
use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fixed 1:1 module for tests: no fee, no curve, just membership checks.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MockModule {
    pub chain_id: ChainId,
}

impl MockModule {
    pub fn new(chain_id: ChainId) -> Self {
        Self { chain_id }
    }

    fn check_pair(state: &PoolState, token_in: &Token, token_out: &Token) -> Result<(), QuoteError> {
        if !state.contains(token_in) {
            return Err(QuoteError::InvalidToken(token_in.get_address()));
        }
        if !state.contains(token_out) || token_in == token_out {
            return Err(QuoteError::InvalidToken(token_out.get_address()));
        }
        Ok(())
    }
}

#[typetag::serde]
impl LiquidityModule for MockModule {
    fn protocol(&self) -> ProtocolId {
        ProtocolId::new("mock")
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
        Self::check_pair(state, token_in, token_out)?;
        Ok(Quote::new(amount_in, U256::ZERO))
    }

    fn quote_in_amount(
        &self,
        state: &PoolState,
        token_in: &Token,
        token_out: &Token,
        amount_out: U256,
    ) -> Result<Quote, QuoteError> {
        Self::check_pair(state, token_in, token_out)?;
        Ok(Quote::new(amount_out, U256::ZERO))
    }

    fn apy(&self, _state: &PoolState) -> Result<Decimal, QuoteError> {
        Err(QuoteError::Unavailable)
    }

    fn tvl(&self, state: &PoolState, token: Option<&Token>) -> Result<Decimal, QuoteError> {
        if let Some(token) = token {
            if !state.contains(token) {
                return Err(QuoteError::InvalidToken(token.get_address()));
            }
        }
        Ok(Decimal::ZERO)
    }
}
