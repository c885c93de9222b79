use crate::modules::QuoteError;
use crate::token::Token;
use crate::utils::constants::BPS_DENOMINATOR;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Snapshot of a lending pool exposed as an exchange between the
/// underlying asset and its interest-bearing share token.
///
/// `cash`, `borrows`, `reserves` and `total_shares` are dynamic; the
/// interest-rate model parameters are static curve configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LendingCurveState {
    pub underlying: Token,
    pub share: Token,
    /// Idle underlying held by the pool, available for withdrawal.
    pub cash: U256,
    /// Underlying currently lent out.
    pub borrows: U256,
    /// Underlying earmarked for the protocol, not backing shares.
    pub reserves: U256,
    pub total_shares: U256,
    pub base_rate_bps: u32,
    pub slope1_bps: u32,
    pub slope2_bps: u32,
    /// Utilization point where the second slope kicks in, in bps of 100%.
    pub kink_bps: u32,
    pub reserve_factor_bps: u32,
}

impl LendingCurveState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        underlying: Token,
        share: Token,
        cash: U256,
        borrows: U256,
        reserves: U256,
        total_shares: U256,
        base_rate_bps: u32,
        slope1_bps: u32,
        slope2_bps: u32,
        kink_bps: u32,
        reserve_factor_bps: u32,
    ) -> Result<Self, QuoteError> {
        let state = Self {
            underlying,
            share,
            cash,
            borrows,
            reserves,
            total_shares,
            base_rate_bps,
            slope1_bps,
            slope2_bps,
            kink_bps,
            reserve_factor_bps,
        };
        state.validate()?;
        Ok(state)
    }

    pub fn validate(&self) -> Result<(), QuoteError> {
        super::validate_pair(&self.underlying, &self.share)?;
        let assets = self
            .cash
            .checked_add(self.borrows)
            .ok_or_else(|| QuoteError::InvalidState("cash + borrows overflows".to_string()))?;
        if self.reserves > assets {
            return Err(QuoteError::InvalidState("reserves exceed pool assets".to_string()));
        }
        if assets > self.reserves && self.total_shares.is_zero() {
            return Err(QuoteError::InvalidState(
                "pool holds assets but has no shares outstanding".to_string(),
            ));
        }
        if self.kink_bps == 0 || self.kink_bps >= BPS_DENOMINATOR {
            return Err(QuoteError::InvalidState("kink must lie strictly inside (0, 100%)".to_string()));
        }
        if self.reserve_factor_bps >= BPS_DENOMINATOR {
            return Err(QuoteError::InvalidState("reserve factor must be below 100%".to_string()));
        }
        Ok(())
    }

    /// Underlying value backing the outstanding shares.
    pub fn pool_value(&self) -> U256 {
        self.cash + self.borrows - self.reserves
    }
}
