use crate::token::Token;
use alloy_primitives::U256;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Converts a base-unit amount into a whole-token decimal.
///
/// Exact while the amount fits the 96-bit decimal mantissa; `None` beyond
/// that, so callers can reject instead of silently losing precision.
pub fn amount_to_decimal(amount: U256, decimals: u8) -> Option<Decimal> {
    if decimals > 28 {
        return None;
    }
    let mantissa = Decimal::from_str(&amount.to_string()).ok()?;
    // 1 * 10^-decimals is an exact multiplier, no division rounding involved
    mantissa.checked_mul(Decimal::from_i128_with_scale(1, u32::from(decimals)))
}

/// Value of `amount` base units of `token` in native-token units.
pub fn locked_value(token: &Token, amount: U256) -> Option<Decimal> {
    let whole = amount_to_decimal(amount, token.get_decimals())?;
    whole.checked_mul(token.get_reference_price())
}
