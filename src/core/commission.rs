//! Commission accounting: gas units per transaction kind and conversion of
//! base-coin commission into an arbitrary gas coin.
//!
//! The conversion is side-effect free and observation-only; it is shared by
//! the mutating handlers and the read-only estimation endpoint, so it must
//! never write through the state view it is given.

use crate::core::coin::{min_coin_reserve, Coin, CoinReader};
use crate::core::formula::{calculate_sale_amount, FormulaError};
use crate::core::response::{info_map, Response, ResponseCode};
use crate::core::types::CoinId;
use crate::error::StakenetError;
use num_bigint::BigUint;
use num_traits::Zero;
use thiserror::Error;

/// Gas units charged for a candidacy declaration.
pub const DECLARE_CANDIDACY_TX_GAS: u64 = 10_000;
/// Gas units charged for recreating a coin.
pub const RECREATE_COIN_TX_GAS: u64 = 10_000_000;

/// Converts gas units into base-coin value: one unit costs
/// `gas_price * COMMISSION_MULTIPLIER` of the base coin.
pub const COMMISSION_MULTIPLIER: u64 = 1_000_000_000_000_000;

/// Errors produced by commission conversion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommissionError {
    #[error("Coin {0} not exists")]
    CoinNotExists(CoinId),

    #[error("Coin reserve balance is not sufficient for transaction. Has: {has}, required {required}")]
    ReserveNotSufficient {
        has: String,
        required: String,
        gas_coin: String,
    },

    #[error("Reserve of coin {coin} would fall below the minimum: has {has}, debit {debit}")]
    ReserveUnderflow {
        coin: String,
        has: String,
        debit: String,
    },

    #[error(transparent)]
    Formula(#[from] FormulaError),
}

impl From<CommissionError> for StakenetError {
    fn from(err: CommissionError) -> Self {
        StakenetError::Commission(err.to_string())
    }
}

/// Base-coin commission owed for a transaction:
/// `gas_price * gas_units * multiplier`, computed without overflow.
pub fn commission_in_base_coin(gas_price: u64, gas: u64, multiplier: u64) -> BigUint {
    BigUint::from(gas_price) * BigUint::from(gas) * BigUint::from(multiplier)
}

/// Converts a base-coin commission into the declared gas coin.
///
/// The base coin converts to itself unchanged. For any other coin the
/// reserve must cover the base-coin value; the payable amount then follows
/// the bonding curve of that coin.
pub fn commission_in_gas_coin<S: CoinReader>(
    state: &S,
    gas_coin: CoinId,
    base_commission: &BigUint,
) -> Result<BigUint, CommissionError> {
    if gas_coin.is_base_coin() {
        return Ok(base_commission.clone());
    }
    let coin = state
        .get_coin(gas_coin)
        .ok_or(CommissionError::CoinNotExists(gas_coin))?;
    if coin.reserve < *base_commission {
        return Err(CommissionError::ReserveNotSufficient {
            has: coin.reserve.to_string(),
            required: base_commission.to_string(),
            gas_coin: coin.full_symbol(),
        });
    }
    Ok(calculate_sale_amount(
        &coin.volume,
        &coin.reserve,
        coin.crr,
        base_commission,
    )?)
}

/// Verifies that debiting `value` from the coin's reserve keeps it at or
/// above the minimum reserve floor.
pub fn check_reserve_underflow(coin: &Coin, value: &BigUint) -> Result<(), CommissionError> {
    let remaining = if coin.reserve >= *value {
        &coin.reserve - value
    } else {
        BigUint::zero()
    };
    if coin.reserve < *value || remaining < min_coin_reserve() {
        return Err(CommissionError::ReserveUnderflow {
            coin: coin.full_symbol(),
            has: coin.reserve.to_string(),
            debit: value.to_string(),
        });
    }
    Ok(())
}

/// Maps a commission failure to the response returned by handlers.
pub fn commission_error_response(err: &CommissionError) -> Response {
    match err {
        CommissionError::CoinNotExists(id) => Response::error_with_info(
            ResponseCode::CoinNotExists,
            format!("Coin {} not exists", id),
            info_map(&[("coin", id.to_string())]),
        ),
        CommissionError::ReserveNotSufficient {
            has,
            required,
            gas_coin,
        } => Response::error_with_info(
            ResponseCode::CoinReserveNotSufficient,
            err.to_string(),
            info_map(&[
                ("has_reserve", has.clone()),
                ("commission", required.clone()),
                ("gas_coin", gas_coin.clone()),
            ]),
        ),
        CommissionError::ReserveUnderflow { coin, has, debit } => Response::error_with_info(
            ResponseCode::CoinReserveNotSufficient,
            err.to_string(),
            info_map(&[
                ("gas_coin", coin.clone()),
                ("has_reserve", has.clone()),
                ("required_value", debit.clone()),
            ]),
        ),
        CommissionError::Formula(_) => {
            Response::error(ResponseCode::CoinReserveNotSufficient, err.to_string())
        }
    }
}
