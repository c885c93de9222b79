use super::module::QuoteError;
use crate::state::FeeStats;
use crate::token::Token;
use crate::utils::constants::SECONDS_PER_YEAR;
use crate::utils::decimal::locked_value;
use rust_decimal::Decimal;

/// Annualizes a fee-accrual window against the pool's TVL.
///
/// Swap pools have no intrinsic rate curve; their yield is whatever fees
/// the pool actually earned, so a pool without sampled fee stats has no
/// well-defined APY and reports `Unavailable` rather than zero.
pub fn fee_apy(
    stats: Option<&FeeStats>,
    token0: &Token,
    token1: &Token,
    tvl: Decimal,
) -> Result<Decimal, QuoteError> {
    let stats = stats.ok_or(QuoteError::Unavailable)?;
    stats.validate()?;
    if tvl <= Decimal::ZERO {
        return Err(QuoteError::Unavailable);
    }

    let out_of_range = || QuoteError::InvalidState("fee value exceeds decimal range".to_string());
    let fees0 = locked_value(token0, stats.fees0).ok_or_else(out_of_range)?;
    let fees1 = locked_value(token1, stats.fees1).ok_or_else(out_of_range)?;
    let window_fees = fees0.checked_add(fees1).ok_or_else(out_of_range)?;

    let annualization = Decimal::from(SECONDS_PER_YEAR)
        .checked_div(Decimal::from(stats.window_secs))
        .ok_or_else(out_of_range)?;
    window_fees
        .checked_mul(annualization)
        .and_then(|annual| annual.checked_div(tvl))
        .ok_or_else(out_of_range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::KnownChain;
    use alloy_primitives::{Address, U256};
    use rust_decimal_macros::dec;

    fn token(byte: u8, price: Decimal) -> Token {
        Token::new_with_data(KnownChain::ETHEREUM, Address::repeat_byte(byte), 18, None, price)
    }

    #[test]
    fn test_missing_stats_is_unavailable() {
        let result = fee_apy(None, &token(1, dec!(1)), &token(2, dec!(1)), dec!(10));
        assert_eq!(result, Err(QuoteError::Unavailable));
    }

    #[test]
    fn test_zero_tvl_is_unavailable() {
        let stats = FeeStats { fees0: U256::from(1), fees1: U256::ZERO, window_secs: 3600 };
        let result = fee_apy(Some(&stats), &token(1, dec!(1)), &token(2, dec!(1)), dec!(0));
        assert_eq!(result, Err(QuoteError::Unavailable));
    }

    #[test]
    fn test_annualization() {
        // 0.01 native of fees per day against 36.5 native TVL = 10% APY
        let stats = FeeStats {
            fees0: U256::from(10_000_000_000_000_000u64),
            fees1: U256::ZERO,
            window_secs: 86_400,
        };
        let apy = fee_apy(Some(&stats), &token(1, dec!(1)), &token(2, dec!(1)), dec!(36.5)).unwrap();
        assert_eq!(apy, dec!(0.1));
    }
}
