//! Integer primitives shared by the reference modules.
//!
//! Quoting math never goes through floating point: products are widened to
//! 512 bits before dividing, and every division names its rounding
//! direction. Floor favors the pool on amounts credited to the taker,
//! ceiling favors the pool on amounts charged to the taker.

use crate::utils::constants::BPS_DENOMINATOR;
use alloy_primitives::ruint::UintTryFrom;
use alloy_primitives::{U256, U512};

/// `floor(a * b / denominator)`. `None` on zero denominator or if the
/// quotient does not fit 256 bits.
pub fn mul_div_floor(a: U256, b: U256, denominator: U256) -> Option<U256> {
    if denominator.is_zero() {
        return None;
    }
    let product = U512::from(a) * U512::from(b);
    let quotient = product / U512::from(denominator);
    U256::uint_try_from(quotient).ok()
}

/// `ceil(a * b / denominator)`. `None` on zero denominator or overflow.
pub fn mul_div_ceil(a: U256, b: U256, denominator: U256) -> Option<U256> {
    if denominator.is_zero() {
        return None;
    }
    let product = U512::from(a) * U512::from(b);
    let (quotient, remainder) = product.div_rem(U512::from(denominator));
    let quotient = if remainder.is_zero() { quotient } else { quotient + U512::from(1u8) };
    U256::uint_try_from(quotient).ok()
}

/// `ceil(a / b)`. `None` on zero divisor.
pub fn div_ceil(a: U256, b: U256) -> Option<U256> {
    if b.is_zero() {
        return None;
    }
    let (quotient, remainder) = a.div_rem(b);
    if remainder.is_zero() { Some(quotient) } else { quotient.checked_add(U256::from(1)) }
}

/// Input-side fee in base units, rounded up.
pub fn fee_amount(amount: U256, fee_bps: u32) -> Option<U256> {
    mul_div_ceil(amount, U256::from(fee_bps), U256::from(BPS_DENOMINATOR))
}

/// Grosses a net input back up so that deducting the fee again yields at
/// least `net`: `ceil(net * 10000 / (10000 - fee_bps))`.
pub fn gross_up_fee(net: U256, fee_bps: u32) -> Option<U256> {
    if fee_bps >= BPS_DENOMINATOR {
        return None;
    }
    mul_div_ceil(net, U256::from(BPS_DENOMINATOR), U256::from(BPS_DENOMINATOR - fee_bps))
}

pub fn abs_diff(a: U256, b: U256) -> U256 {
    if a >= b { a - b } else { b - a }
}
