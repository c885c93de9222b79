//! Pool state snapshots.
//!
//! A snapshot is borrowed by a module for the duration of one computation
//! and never mutated or retained. Construction validates the snapshot up
//! front so malformed state is rejected before any math runs: loose field
//! bags (JSON maps and the like) come in through `serde` and must then pass
//! `validate()`.

pub mod concentrated_liquidity;
pub mod constant_product;
pub mod lending_curve;
pub mod stable_swap;

pub use concentrated_liquidity::ConcentratedLiquidityState;
pub use constant_product::ConstantProductState;
pub use lending_curve::LendingCurveState;
pub use stable_swap::StableSwapState;

use crate::modules::QuoteError;
use crate::token::Token;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, VariantNames};

/// The AMM families a snapshot can describe.
#[derive(
    Copy, Clone, Debug, Display, PartialEq, Hash, Eq, EnumString, VariantNames, Default, Deserialize, Serialize, EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolFamily {
    #[default]
    Unknown,
    ConstantProduct,
    StableSwap,
    ConcentratedLiquidity,
    LendingCurve,
}

/// Fees collected over a sampling window, used to annualize swap-pool yield.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeStats {
    pub fees0: U256,
    pub fees1: U256,
    pub window_secs: u64,
}

impl FeeStats {
    pub fn validate(&self) -> Result<(), QuoteError> {
        if self.window_secs == 0 {
            return Err(QuoteError::InvalidState("fee stats window must be nonzero".to_string()));
        }
        Ok(())
    }
}

/// One pool snapshot, tagged by family. Each variant carries exactly the
/// fields its math requires; there is no generic field bag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolState {
    ConstantProduct(ConstantProductState),
    StableSwap(StableSwapState),
    ConcentratedLiquidity(ConcentratedLiquidityState),
    LendingCurve(LendingCurveState),
}

impl PoolState {
    pub fn family(&self) -> PoolFamily {
        match self {
            PoolState::ConstantProduct(_) => PoolFamily::ConstantProduct,
            PoolState::StableSwap(_) => PoolFamily::StableSwap,
            PoolState::ConcentratedLiquidity(_) => PoolFamily::ConcentratedLiquidity,
            PoolState::LendingCurve(_) => PoolFamily::LendingCurve,
        }
    }

    pub fn validate(&self) -> Result<(), QuoteError> {
        match self {
            PoolState::ConstantProduct(state) => state.validate(),
            PoolState::StableSwap(state) => state.validate(),
            PoolState::ConcentratedLiquidity(state) => state.validate(),
            PoolState::LendingCurve(state) => state.validate(),
        }
    }

    /// The pool's constituent tokens, in declaration order.
    pub fn tokens(&self) -> Vec<&Token> {
        match self {
            PoolState::ConstantProduct(state) => vec![&state.token0, &state.token1],
            PoolState::StableSwap(state) => vec![&state.token0, &state.token1],
            PoolState::ConcentratedLiquidity(state) => vec![&state.token0, &state.token1],
            PoolState::LendingCurve(state) => vec![&state.underlying, &state.share],
        }
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.tokens().into_iter().any(|candidate| candidate == token)
    }

    pub fn fee_bps(&self) -> u32 {
        match self {
            PoolState::ConstantProduct(state) => state.fee_bps,
            PoolState::StableSwap(state) => state.fee_bps,
            PoolState::ConcentratedLiquidity(state) => state.fee_bps,
            PoolState::LendingCurve(_) => 0,
        }
    }
}

/// Tokens of a pair must be distinct assets on the same chain.
pub(crate) fn validate_pair(token0: &Token, token1: &Token) -> Result<(), QuoteError> {
    if token0 == token1 {
        return Err(QuoteError::InvalidState("pool tokens must be distinct".to_string()));
    }
    if token0.get_chain_id() != token1.get_chain_id() {
        return Err(QuoteError::InvalidState("pool tokens must live on one chain".to_string()));
    }
    Ok(())
}

/// Picks `(value_in, value_out)` for a two-token pool, rejecting tokens
/// that are not constituents and same-token directions.
pub(crate) fn orient_two(
    slot0: (&Token, U256),
    slot1: (&Token, U256),
    token_in: &Token,
    token_out: &Token,
) -> Result<(U256, U256), QuoteError> {
    let (token0, value0) = slot0;
    let (token1, value1) = slot1;
    if token_in != token0 && token_in != token1 {
        return Err(QuoteError::InvalidToken(token_in.get_address()));
    }
    if token_out != token0 && token_out != token1 {
        return Err(QuoteError::InvalidToken(token_out.get_address()));
    }
    if token_in == token_out {
        return Err(QuoteError::InvalidToken(token_out.get_address()));
    }
    if token_in == token0 { Ok((value0, value1)) } else { Ok((value1, value0)) }
}
