//! Bonding-curve conversion formulas (constant reserve ratio).
//!
//! All arithmetic is arbitrary-precision integer fixed point; no float,
//! randomness or system time. Same inputs yield the same amounts on every
//! replica.
//!
//! # Model
//! A coin with volume `V`, reserve `R` and constant reserve ratio `crr`
//! (integer percent) prices conversions along
//! `sale_amount = V * (1 - (1 - w/R)^(100/crr))`, where `w` is the base-coin
//! value to extract, and `sale_return = R * (1 - (1 - a/V)^(crr/100))`,
//! where `a` is the coin amount sold. Rational exponents are evaluated as an
//! integer power followed by an integer root on scaled values.

use crate::error::StakenetError;
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::Zero;
use thiserror::Error;

/// Fixed-point scale for ratio arithmetic. Sits above the network-wide max
/// coin supply so one-unit input steps stay visible after rounding.
fn scale() -> BigUint {
    BigUint::from(10u32).pow(36)
}

/// Errors produced by the conversion formulas.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormulaError {
    #[error("Invalid CRR: must be between 1 and 100, got {0}")]
    InvalidCrr(u32),

    #[error("Coin volume is zero")]
    ZeroVolume,

    #[error("Coin reserve is zero")]
    ZeroReserve,

    #[error("Conversion amount {amount} exceeds available {available}")]
    AmountTooLarge { amount: String, available: String },
}

impl From<FormulaError> for StakenetError {
    fn from(err: FormulaError) -> Self {
        StakenetError::Formula(err.to_string())
    }
}

/// Raises `base` (scaled by the fixed-point scale) to the rational power
/// `p/q`; the result carries the same scale. `p` and `q` must be coprime.
fn pow_frac(base: &BigUint, p: u32, q: u32) -> BigUint {
    let s = scale();
    let mut num = base.pow(p);
    if q >= p {
        num *= s.pow(q - p);
    } else {
        num /= s.pow(p - q);
    }
    num.nth_root(q)
}

/// Computes how much of a coin must be sold to extract `want_receive` of
/// base-coin value from its reserve.
///
/// Returns zero for a zero `want_receive`. Strictly increasing in
/// `want_receive` for fixed volume/reserve/crr; selling the whole reserve
/// consumes the whole volume. Errors when the reserve cannot cover the
/// requested value; callers pre-check reserves before conversion.
pub fn calculate_sale_amount(
    volume: &BigUint,
    reserve: &BigUint,
    crr: u32,
    want_receive: &BigUint,
) -> Result<BigUint, FormulaError> {
    if crr == 0 || crr > 100 {
        return Err(FormulaError::InvalidCrr(crr));
    }
    if want_receive.is_zero() {
        return Ok(BigUint::zero());
    }
    if volume.is_zero() {
        return Err(FormulaError::ZeroVolume);
    }
    if reserve.is_zero() {
        return Err(FormulaError::ZeroReserve);
    }
    if want_receive > reserve {
        return Err(FormulaError::AmountTooLarge {
            amount: want_receive.to_string(),
            available: reserve.to_string(),
        });
    }
    if crr == 100 {
        return Ok(volume * want_receive / reserve);
    }

    let s = scale();
    // (reserve - want_receive) / reserve, scaled
    let base = (reserve - want_receive) * &s / reserve;
    let g = 100u32.gcd(&crr);
    let powered = pow_frac(&base, 100 / g, crr / g);
    Ok(volume * (s - powered) / scale())
}

/// Computes the base-coin value returned for selling `amount` of a coin
/// back into its reserve. The inverse direction of [`calculate_sale_amount`].
pub fn calculate_sale_return(
    volume: &BigUint,
    reserve: &BigUint,
    crr: u32,
    amount: &BigUint,
) -> Result<BigUint, FormulaError> {
    if crr == 0 || crr > 100 {
        return Err(FormulaError::InvalidCrr(crr));
    }
    if amount.is_zero() {
        return Ok(BigUint::zero());
    }
    if volume.is_zero() {
        return Err(FormulaError::ZeroVolume);
    }
    if amount > volume {
        return Err(FormulaError::AmountTooLarge {
            amount: amount.to_string(),
            available: volume.to_string(),
        });
    }
    if crr == 100 {
        return Ok(reserve * amount / volume);
    }

    let s = scale();
    // (volume - amount) / volume, scaled
    let base = (volume - amount) * &s / volume;
    let g = crr.gcd(&100u32);
    let powered = pow_frac(&base, crr / g, 100 / g);
    Ok(reserve * (s - powered) / scale())
}
