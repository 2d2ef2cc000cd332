//! Coin records: reserve-backed custom coins and their ownership info.
//!
//! The base coin is not stored as a record; it has no reserve or bonding
//! curve and is identified by [`CoinId::BASE`]. Every other coin carries a
//! volume (circulating supply), a base-coin reserve backing it, a constant
//! reserve ratio and a hard supply cap.

use crate::core::types::{Address, CoinId, CoinSymbol, BASE_COIN_SYMBOL};
use num_bigint::BigUint;

/// Lowest constant reserve ratio accepted for a new or recreated coin.
pub const MIN_CRR: u32 = 10;
/// Highest constant reserve ratio (fully reserve-backed).
pub const MAX_CRR: u32 = 100;

/// Smallest allowed initial supply of a coin, in base units.
pub fn min_coin_supply() -> BigUint {
    BigUint::from(10u32).pow(18)
}

/// Network-wide ceiling on any coin's max supply.
pub fn max_coin_supply() -> BigUint {
    BigUint::from(10u32).pow(33)
}

/// Smallest allowed reserve of a coin, in base units. Reserves may never be
/// drawn down below this floor.
pub fn min_coin_reserve() -> BigUint {
    BigUint::from(10u32).pow(22)
}

/// A reserve-backed coin record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    pub id: CoinId,
    pub symbol: CoinSymbol,
    /// Total circulating supply.
    pub volume: BigUint,
    /// Base-coin collateral backing the volume.
    pub reserve: BigUint,
    /// Constant reserve ratio, integer percent in `MIN_CRR..=MAX_CRR`.
    pub crr: u32,
    /// Hard cap: volume never exceeds this.
    pub max_supply: BigUint,
}

impl Coin {
    /// Symbol qualified with the coin identifier. The bare symbol names only
    /// the current holder of it; older recreated versions keep their ids.
    pub fn full_symbol(&self) -> String {
        format!("{}-{}", self.symbol, self.id)
    }
}

/// Ownership info attached to a coin symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    pub owner_address: Option<Address>,
}

/// Read-only coin lookup. Implemented by every state view (live, check and
/// snapshot) so commission conversion can run against any of them without
/// write access.
pub trait CoinReader {
    fn get_coin(&self, id: CoinId) -> Option<Coin>;
}

/// Resolves a display name for a coin id: the base coin symbol, the coin's
/// qualified symbol, or the bare id when unknown. Used in logs and info
/// payloads only.
pub fn coin_display<S: CoinReader>(state: &S, id: CoinId) -> String {
    if id.is_base_coin() {
        return BASE_COIN_SYMBOL.to_string();
    }
    match state.get_coin(id) {
        Some(coin) => coin.full_symbol(),
        None => id.to_string(),
    }
}
