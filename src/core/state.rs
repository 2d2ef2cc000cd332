//! Ledger state: accounts, coins, candidates and global counters, with
//! copy-on-write snapshots and a read-only check view.
//!
//! # Determinism
//! Same transaction order yields the same final state and the same state
//! root. All updates are deterministic; no randomness or system time.
//!
//! # Invariants
//! - Balances never go negative; every debit is preceded by a funds check.
//! - Reserve and volume change only through bonding-curve debits or explicit
//!   recreation, never independently.
//! - Snapshots are immutable after creation; restore is an exact rollback.
//! - Only the deliver view mutates. The check view exposes no mutators, so a
//!   check-mode caller cannot write at compile time.

use crate::core::candidates::{Candidate, Candidates};
use crate::core::coin::{Coin, CoinReader, SymbolInfo};
use crate::core::types::{Address, CoinId, CoinSymbol, Pubkey};
use crate::error::StakenetError;
use num_bigint::BigUint;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors produced by state operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: String, available: String },

    #[error("Coin id {0} already exists")]
    DuplicateCoinId(CoinId),

    #[error("Coin symbol {0} already exists")]
    DuplicateCoinSymbol(String),

    #[error("Coin symbol {0} not found")]
    SymbolNotFound(String),
}

impl From<StateError> for StakenetError {
    fn from(err: StateError) -> Self {
        StakenetError::State(err.to_string())
    }
}

/// Account balances (per coin) and nonces.
#[derive(Debug)]
pub struct Accounts {
    balances: RwLock<Arc<HashMap<(Address, CoinId), BigUint>>>,
    nonces: RwLock<Arc<HashMap<Address, u64>>>,
}

impl Accounts {
    fn new() -> Self {
        Self {
            balances: RwLock::new(Arc::new(HashMap::new())),
            nonces: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Balance of `address` in `coin`. Returns 0 if absent.
    pub fn get_balance(&self, address: &str, coin: CoinId) -> BigUint {
        let balances = self.balances.read().unwrap();
        balances
            .get(&(address.to_string(), coin))
            .cloned()
            .unwrap_or_default()
    }

    /// Sets a balance directly (genesis and test setup).
    pub fn set_balance(&self, address: &str, coin: CoinId, value: BigUint) {
        let mut arc = self.balances.write().unwrap();
        Arc::make_mut(&mut arc).insert((address.to_string(), coin), value);
    }

    pub fn add_balance(&self, address: &str, coin: CoinId, value: &BigUint) {
        let mut arc = self.balances.write().unwrap();
        let map = Arc::make_mut(&mut arc);
        let key = (address.to_string(), coin);
        let current = map.get(&key).cloned().unwrap_or_default();
        map.insert(key, current + value);
    }

    /// Debits a balance. Funds are verified before execution reaches this
    /// point; an underflow here is a broken execution pipeline.
    pub fn sub_balance(&self, address: &str, coin: CoinId, value: &BigUint) {
        let mut arc = self.balances.write().unwrap();
        let map = Arc::make_mut(&mut arc);
        let key = (address.to_string(), coin);
        let current = map.get(&key).cloned().unwrap_or_default();
        assert!(
            current >= *value,
            "balance underflow for {} in coin {}",
            address,
            coin
        );
        map.insert(key, current - value);
    }

    pub fn get_nonce(&self, address: &str) -> u64 {
        let nonces = self.nonces.read().unwrap();
        nonces.get(address).copied().unwrap_or(0)
    }

    pub fn set_nonce(&self, address: &str, nonce: u64) {
        let mut arc = self.nonces.write().unwrap();
        Arc::make_mut(&mut arc).insert(address.to_string(), nonce);
    }

    pub(crate) fn balances_arc(&self) -> Arc<HashMap<(Address, CoinId), BigUint>> {
        self.balances.read().unwrap().clone()
    }

    pub(crate) fn nonces_arc(&self) -> Arc<HashMap<Address, u64>> {
        self.nonces.read().unwrap().clone()
    }

    pub(crate) fn restore(
        &self,
        balances: Arc<HashMap<(Address, CoinId), BigUint>>,
        nonces: Arc<HashMap<Address, u64>>,
    ) {
        *self.balances.write().unwrap() = balances;
        *self.nonces.write().unwrap() = nonces;
    }
}

/// Coin records with a symbol index and per-symbol ownership info.
#[derive(Debug)]
pub struct Coins {
    coins: RwLock<Arc<HashMap<CoinId, Coin>>>,
    symbols: RwLock<Arc<HashMap<CoinSymbol, CoinId>>>,
    symbol_infos: RwLock<Arc<HashMap<CoinSymbol, SymbolInfo>>>,
}

impl Coins {
    fn new() -> Self {
        Self {
            coins: RwLock::new(Arc::new(HashMap::new())),
            symbols: RwLock::new(Arc::new(HashMap::new())),
            symbol_infos: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Whether a coin id is known. The base coin always exists even though it
    /// carries no record.
    pub fn exists(&self, id: CoinId) -> bool {
        id.is_base_coin() || self.coins.read().unwrap().contains_key(&id)
    }

    pub fn get_coin(&self, id: CoinId) -> Option<Coin> {
        self.coins.read().unwrap().get(&id).cloned()
    }

    pub fn get_coin_by_symbol(&self, symbol: &str) -> Option<Coin> {
        let symbols = self.symbols.read().unwrap();
        let id = symbols.get(symbol)?;
        self.coins.read().unwrap().get(id).cloned()
    }

    pub fn get_symbol_info(&self, symbol: &str) -> Option<SymbolInfo> {
        self.symbol_infos.read().unwrap().get(symbol).cloned()
    }

    /// Adds a new coin record (genesis, test setup and coin creation).
    pub fn create(&self, coin: Coin, owner: Option<Address>) -> Result<(), StateError> {
        let mut coins = self.coins.write().unwrap();
        let mut symbols = self.symbols.write().unwrap();
        let mut infos = self.symbol_infos.write().unwrap();
        if coins.contains_key(&coin.id) {
            return Err(StateError::DuplicateCoinId(coin.id));
        }
        if symbols.contains_key(&coin.symbol) {
            return Err(StateError::DuplicateCoinSymbol(coin.symbol.clone()));
        }
        Arc::make_mut(&mut symbols).insert(coin.symbol.clone(), coin.id);
        Arc::make_mut(&mut infos).insert(
            coin.symbol.clone(),
            SymbolInfo {
                owner_address: owner,
            },
        );
        Arc::make_mut(&mut coins).insert(coin.id, coin);
        Ok(())
    }

    /// Debits a coin's reserve. Reserve sufficiency is verified before
    /// execution reaches this point.
    pub fn sub_reserve(&self, id: CoinId, value: &BigUint) {
        let mut arc = self.coins.write().unwrap();
        let map = Arc::make_mut(&mut arc);
        let coin = map
            .get_mut(&id)
            .unwrap_or_else(|| panic!("reserve debit on unknown coin {}", id));
        assert!(coin.reserve >= *value, "reserve underflow for coin {}", id);
        coin.reserve -= value;
    }

    /// Debits a coin's volume. Paired with [`Coins::sub_reserve`]; the two
    /// change together along the bonding curve.
    pub fn sub_volume(&self, id: CoinId, value: &BigUint) {
        let mut arc = self.coins.write().unwrap();
        let map = Arc::make_mut(&mut arc);
        let coin = map
            .get_mut(&id)
            .unwrap_or_else(|| panic!("volume debit on unknown coin {}", id));
        assert!(coin.volume >= *value, "volume underflow for coin {}", id);
        coin.volume -= value;
    }

    /// Rebinds a symbol to a brand-new coin record: the old identifier is
    /// retired and the symbol resolves to the new coin from now on. Symbol
    /// ownership is unchanged.
    pub fn recreate(
        &self,
        new_id: CoinId,
        symbol: &str,
        volume: BigUint,
        crr: u32,
        reserve: BigUint,
        max_supply: BigUint,
    ) {
        let mut coins = self.coins.write().unwrap();
        let mut symbols = self.symbols.write().unwrap();
        let symbols_map = Arc::make_mut(&mut symbols);
        let old_id = symbols_map
            .get(symbol)
            .copied()
            .unwrap_or_else(|| panic!("recreate of unknown symbol {}", symbol));
        let coins_map = Arc::make_mut(&mut coins);
        coins_map.remove(&old_id);
        coins_map.insert(
            new_id,
            Coin {
                id: new_id,
                symbol: symbol.to_string(),
                volume,
                reserve,
                crr,
                max_supply,
            },
        );
        symbols_map.insert(symbol.to_string(), new_id);
    }

    pub(crate) fn coins_arc(&self) -> Arc<HashMap<CoinId, Coin>> {
        self.coins.read().unwrap().clone()
    }

    pub(crate) fn symbols_arc(&self) -> Arc<HashMap<CoinSymbol, CoinId>> {
        self.symbols.read().unwrap().clone()
    }

    pub(crate) fn symbol_infos_arc(&self) -> Arc<HashMap<CoinSymbol, SymbolInfo>> {
        self.symbol_infos.read().unwrap().clone()
    }

    pub(crate) fn restore(
        &self,
        coins: Arc<HashMap<CoinId, Coin>>,
        symbols: Arc<HashMap<CoinSymbol, CoinId>>,
        symbol_infos: Arc<HashMap<CoinSymbol, SymbolInfo>>,
    ) {
        *self.coins.write().unwrap() = coins;
        *self.symbols.write().unwrap() = symbols;
        *self.symbol_infos.write().unwrap() = symbol_infos;
    }
}

/// Global application counters.
#[derive(Debug)]
pub struct App {
    coins_count: RwLock<u32>,
}

impl App {
    fn new() -> Self {
        Self {
            coins_count: RwLock::new(0),
        }
    }

    pub fn coins_count(&self) -> u32 {
        *self.coins_count.read().unwrap()
    }

    /// The identifier the next created coin will take.
    pub fn get_next_coin_id(&self) -> CoinId {
        CoinId(self.coins_count() + 1)
    }

    pub fn set_coins_count(&self, count: u32) {
        *self.coins_count.write().unwrap() = count;
    }
}

/// The authoritative, mutating (deliver) view of the ledger. Owns all
/// records for the lifetime of the process; handlers receive it only for the
/// mutation phase of a delivered transaction.
#[derive(Debug)]
pub struct LedgerState {
    pub accounts: Accounts,
    pub coins: Coins,
    pub candidates: Candidates,
    pub app: App,
}

impl LedgerState {
    pub fn new() -> Self {
        Self {
            accounts: Accounts::new(),
            coins: Coins::new(),
            candidates: Candidates::new(),
            app: App::new(),
        }
    }

    /// Creates an immutable snapshot. O(1): only `Arc` handles are cloned;
    /// underlying maps are shared copy-on-write until the state mutates.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            balances: self.accounts.balances_arc(),
            nonces: self.accounts.nonces_arc(),
            coins: self.coins.coins_arc(),
            symbols: self.coins.symbols_arc(),
            symbol_infos: self.coins.symbol_infos_arc(),
            candidates: self.candidates.arc(),
            candidates_created: self.candidates.created(),
            coins_count: self.app.coins_count(),
        }
    }

    /// Replaces the whole state with a snapshot's contents. O(1); the
    /// snapshot itself is never modified.
    pub fn restore(&self, snapshot: &LedgerSnapshot) {
        self.accounts
            .restore(snapshot.balances.clone(), snapshot.nonces.clone());
        self.coins.restore(
            snapshot.coins.clone(),
            snapshot.symbols.clone(),
            snapshot.symbol_infos.clone(),
        );
        self.candidates
            .restore(snapshot.candidates.clone(), snapshot.candidates_created);
        self.app.set_coins_count(snapshot.coins_count);
    }

    /// Deterministic commitment over the full state.
    pub fn state_root(&self) -> String {
        self.snapshot().state_root()
    }
}

impl Default for LedgerState {
    fn default() -> Self {
        Self::new()
    }
}

impl CoinReader for LedgerState {
    fn get_coin(&self, id: CoinId) -> Option<Coin> {
        self.coins.get_coin(id)
    }
}

/// Read-only view over a [`LedgerState`]. Handlers use it for validation and
/// funds checks; it exposes no mutators.
#[derive(Debug, Clone, Copy)]
pub struct CheckState<'a> {
    state: &'a LedgerState,
}

impl<'a> CheckState<'a> {
    pub fn new(state: &'a LedgerState) -> Self {
        Self { state }
    }

    pub fn get_balance(&self, address: &str, coin: CoinId) -> BigUint {
        self.state.accounts.get_balance(address, coin)
    }

    pub fn get_nonce(&self, address: &str) -> u64 {
        self.state.accounts.get_nonce(address)
    }

    pub fn coin_exists(&self, id: CoinId) -> bool {
        self.state.coins.exists(id)
    }

    pub fn get_coin_by_symbol(&self, symbol: &str) -> Option<Coin> {
        self.state.coins.get_coin_by_symbol(symbol)
    }

    pub fn get_symbol_info(&self, symbol: &str) -> Option<SymbolInfo> {
        self.state.coins.get_symbol_info(symbol)
    }

    pub fn candidate_exists(&self, pubkey: &str) -> bool {
        self.state.candidates.exists(pubkey)
    }

    pub fn candidates_count(&self) -> usize {
        self.state.candidates.count()
    }

    pub fn is_new_candidate_stake_sufficient(
        &self,
        stake_base_value: &BigUint,
        limit: usize,
    ) -> bool {
        self.state
            .candidates
            .is_new_candidate_stake_sufficient(stake_base_value, limit)
    }
}

impl CoinReader for CheckState<'_> {
    fn get_coin(&self, id: CoinId) -> Option<Coin> {
        self.state.coins.get_coin(id)
    }
}

/// The mode-tagged state reference handed to a handler invocation. Check
/// carries only the read view; deliver additionally unlocks mutation.
#[derive(Debug, Clone, Copy)]
pub enum ExecutionState<'a> {
    Check(CheckState<'a>),
    Deliver(&'a LedgerState),
}

impl<'a> ExecutionState<'a> {
    pub fn check(state: &'a LedgerState) -> Self {
        ExecutionState::Check(CheckState::new(state))
    }

    pub fn deliver(state: &'a LedgerState) -> Self {
        ExecutionState::Deliver(state)
    }

    /// Read view used by the validation and funds-check phases in both modes.
    pub fn check_view(&self) -> CheckState<'a> {
        match self {
            ExecutionState::Check(view) => *view,
            ExecutionState::Deliver(state) => CheckState::new(state),
        }
    }

    /// The mutable state, available only in deliver mode. The mutation phase
    /// is gated on this being `Some`.
    pub fn deliver_view(&self) -> Option<&'a LedgerState> {
        match self {
            ExecutionState::Check(_) => None,
            ExecutionState::Deliver(state) => Some(state),
        }
    }

    pub fn is_check(&self) -> bool {
        matches!(self, ExecutionState::Check(_))
    }
}

/// Immutable snapshot of the whole ledger. Creation and restore are O(1)
/// (Arc handles only); contents never change after creation.
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    balances: Arc<HashMap<(Address, CoinId), BigUint>>,
    nonces: Arc<HashMap<Address, u64>>,
    coins: Arc<HashMap<CoinId, Coin>>,
    symbols: Arc<HashMap<CoinSymbol, CoinId>>,
    symbol_infos: Arc<HashMap<CoinSymbol, SymbolInfo>>,
    candidates: Arc<HashMap<Pubkey, Candidate>>,
    candidates_created: u64,
    coins_count: u32,
}

fn hash_big(hasher: &mut Sha256, value: &BigUint) {
    let bytes = value.to_bytes_be();
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(&bytes);
}

impl LedgerSnapshot {
    pub fn get_balance(&self, address: &str, coin: CoinId) -> BigUint {
        self.balances
            .get(&(address.to_string(), coin))
            .cloned()
            .unwrap_or_default()
    }

    pub fn get_nonce(&self, address: &str) -> u64 {
        self.nonces.get(address).copied().unwrap_or(0)
    }

    pub fn get_coin_by_symbol(&self, symbol: &str) -> Option<Coin> {
        let id = self.symbols.get(symbol)?;
        self.coins.get(id).cloned()
    }

    pub fn candidate_exists(&self, pubkey: &str) -> bool {
        self.candidates.contains_key(pubkey)
    }

    pub fn coins_count(&self) -> u32 {
        self.coins_count
    }

    /// Deterministic commitment over the snapshot: SHA-256 of all entries in
    /// sorted order. Two states with the same contents share the same root.
    pub fn state_root(&self) -> String {
        let mut hasher = Sha256::new();

        let mut balances: Vec<_> = self.balances.iter().collect();
        balances.sort_by(|a, b| a.0.cmp(b.0));
        for ((address, coin), value) in balances {
            hasher.update(address.as_bytes());
            hasher.update(coin.0.to_le_bytes());
            hash_big(&mut hasher, value);
        }

        let mut nonces: Vec<_> = self.nonces.iter().collect();
        nonces.sort_by(|a, b| a.0.cmp(b.0));
        for (address, nonce) in nonces {
            hasher.update(address.as_bytes());
            hasher.update(nonce.to_le_bytes());
        }

        let mut coins: Vec<_> = self.coins.values().collect();
        coins.sort_by_key(|c| c.id);
        for coin in coins {
            hasher.update(coin.id.0.to_le_bytes());
            hasher.update(coin.symbol.as_bytes());
            hash_big(&mut hasher, &coin.volume);
            hash_big(&mut hasher, &coin.reserve);
            hasher.update(coin.crr.to_le_bytes());
            hash_big(&mut hasher, &coin.max_supply);
        }

        let mut infos: Vec<_> = self.symbol_infos.iter().collect();
        infos.sort_by(|a, b| a.0.cmp(b.0));
        for (symbol, info) in infos {
            hasher.update(symbol.as_bytes());
            if let Some(owner) = &info.owner_address {
                hasher.update(owner.as_bytes());
            }
        }

        let mut candidates: Vec<_> = self.candidates.values().collect();
        candidates.sort_by(|a, b| a.pubkey.cmp(&b.pubkey));
        for candidate in candidates {
            hasher.update(candidate.pubkey.as_bytes());
            hasher.update(candidate.reward_address.as_bytes());
            hasher.update(candidate.owner_address.as_bytes());
            hasher.update(candidate.commission.to_le_bytes());
            hasher.update(candidate.registration_index.to_le_bytes());
            hash_big(&mut hasher, &candidate.total_base_stake);
            let mut stakes: Vec<_> = candidate.stakes.iter().collect();
            stakes.sort_by(|a, b| (&a.owner, a.coin).cmp(&(&b.owner, b.coin)));
            for stake in stakes {
                hasher.update(stake.owner.as_bytes());
                hasher.update(stake.coin.0.to_le_bytes());
                hash_big(&mut hasher, &stake.value);
                hash_big(&mut hasher, &stake.base_value);
            }
        }

        hasher.update(self.coins_count.to_le_bytes());
        hasher.update(self.candidates_created.to_le_bytes());
        hex::encode(hasher.finalize())
    }
}

impl PartialEq for LedgerSnapshot {
    fn eq(&self, other: &Self) -> bool {
        *self.balances == *other.balances
            && *self.nonces == *other.nonces
            && *self.coins == *other.coins
            && *self.symbols == *other.symbols
            && *self.symbol_infos == *other.symbol_infos
            && *self.candidates == *other.candidates
            && self.candidates_created == other.candidates_created
            && self.coins_count == other.coins_count
    }
}

impl Eq for LedgerSnapshot {}

impl CoinReader for LedgerSnapshot {
    fn get_coin(&self, id: CoinId) -> Option<Coin> {
        self.coins.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(n: u128) -> BigUint {
        BigUint::from(n)
    }

    fn test_coin(id: u32, symbol: &str) -> Coin {
        Coin {
            id: CoinId(id),
            symbol: symbol.to_string(),
            volume: big(1_000_000),
            reserve: big(500_000),
            crr: 50,
            max_supply: big(10_000_000),
        }
    }

    #[test]
    fn test_new_state_empty() {
        let state = LedgerState::new();
        assert_eq!(state.accounts.get_balance("addr", CoinId::BASE), big(0));
        assert_eq!(state.accounts.get_nonce("addr"), 0);
        assert_eq!(state.app.coins_count(), 0);
        assert_eq!(state.candidates.count(), 0);
    }

    #[test]
    fn test_balance_add_sub() {
        let state = LedgerState::new();
        state.accounts.set_balance("addr", CoinId::BASE, big(1000));
        state.accounts.add_balance("addr", CoinId::BASE, &big(500));
        assert_eq!(state.accounts.get_balance("addr", CoinId::BASE), big(1500));
        state.accounts.sub_balance("addr", CoinId::BASE, &big(700));
        assert_eq!(state.accounts.get_balance("addr", CoinId::BASE), big(800));
    }

    #[test]
    #[should_panic(expected = "balance underflow")]
    fn test_sub_balance_underflow_is_fatal() {
        let state = LedgerState::new();
        state.accounts.set_balance("addr", CoinId::BASE, big(10));
        state.accounts.sub_balance("addr", CoinId::BASE, &big(11));
    }

    #[test]
    fn test_balances_independent_per_coin() {
        let state = LedgerState::new();
        state.accounts.set_balance("addr", CoinId::BASE, big(100));
        state.accounts.set_balance("addr", CoinId(1), big(200));
        assert_eq!(state.accounts.get_balance("addr", CoinId::BASE), big(100));
        assert_eq!(state.accounts.get_balance("addr", CoinId(1)), big(200));
    }

    #[test]
    fn test_coin_create_and_lookup() {
        let state = LedgerState::new();
        state
            .coins
            .create(test_coin(1, "TEST"), Some("0xowner".to_string()))
            .unwrap();

        assert!(state.coins.exists(CoinId(1)));
        assert!(state.coins.exists(CoinId::BASE));
        assert!(!state.coins.exists(CoinId(2)));

        let coin = state.coins.get_coin(CoinId(1)).unwrap();
        assert_eq!(coin.symbol, "TEST");
        let by_symbol = state.coins.get_coin_by_symbol("TEST").unwrap();
        assert_eq!(by_symbol.id, CoinId(1));
        let info = state.coins.get_symbol_info("TEST").unwrap();
        assert_eq!(info.owner_address.unwrap(), "0xowner");
    }

    #[test]
    fn test_coin_create_duplicate_rejected() {
        let state = LedgerState::new();
        state.coins.create(test_coin(1, "TEST"), None).unwrap();
        assert_eq!(
            state.coins.create(test_coin(1, "OTHER"), None),
            Err(StateError::DuplicateCoinId(CoinId(1)))
        );
        assert_eq!(
            state.coins.create(test_coin(2, "TEST"), None),
            Err(StateError::DuplicateCoinSymbol("TEST".to_string()))
        );
    }

    #[test]
    fn test_sub_reserve_and_volume() {
        let state = LedgerState::new();
        state.coins.create(test_coin(1, "TEST"), None).unwrap();
        state.coins.sub_reserve(CoinId(1), &big(100_000));
        state.coins.sub_volume(CoinId(1), &big(200_000));
        let coin = state.coins.get_coin(CoinId(1)).unwrap();
        assert_eq!(coin.reserve, big(400_000));
        assert_eq!(coin.volume, big(800_000));
    }

    #[test]
    fn test_recreate_retires_old_id() {
        let state = LedgerState::new();
        state
            .coins
            .create(test_coin(1, "TEST"), Some("0xowner".to_string()))
            .unwrap();

        state
            .coins
            .recreate(CoinId(2), "TEST", big(42), 80, big(77), big(1000));

        assert!(!state.coins.exists(CoinId(1)));
        assert!(state.coins.exists(CoinId(2)));
        let coin = state.coins.get_coin_by_symbol("TEST").unwrap();
        assert_eq!(coin.id, CoinId(2));
        assert_eq!(coin.volume, big(42));
        assert_eq!(coin.crr, 80);
        // Ownership survives recreation
        let info = state.coins.get_symbol_info("TEST").unwrap();
        assert_eq!(info.owner_address.unwrap(), "0xowner");
    }

    #[test]
    fn test_next_coin_id_follows_counter() {
        let state = LedgerState::new();
        assert_eq!(state.app.get_next_coin_id(), CoinId(1));
        state.app.set_coins_count(7);
        assert_eq!(state.app.get_next_coin_id(), CoinId(8));
    }

    #[test]
    fn test_snapshot_immutable_after_mutation() {
        let state = LedgerState::new();
        state.accounts.set_balance("addr", CoinId::BASE, big(1000));
        let snapshot = state.snapshot();

        state.accounts.set_balance("addr", CoinId::BASE, big(2000));
        assert_eq!(snapshot.get_balance("addr", CoinId::BASE), big(1000));
        assert_eq!(state.accounts.get_balance("addr", CoinId::BASE), big(2000));
    }

    #[test]
    fn test_restore_identity() {
        let state = LedgerState::new();
        state.accounts.set_balance("addr", CoinId::BASE, big(1000));
        state.accounts.set_nonce("addr", 5);
        state.coins.create(test_coin(1, "TEST"), None).unwrap();
        state.app.set_coins_count(1);
        let snapshot = state.snapshot();
        let root_before = snapshot.state_root();

        state.accounts.sub_balance("addr", CoinId::BASE, &big(400));
        state.accounts.set_nonce("addr", 6);
        state.coins.sub_reserve(CoinId(1), &big(1));
        assert_ne!(state.state_root(), root_before);

        state.restore(&snapshot);
        assert_eq!(state.state_root(), root_before);
        assert_eq!(state.accounts.get_balance("addr", CoinId::BASE), big(1000));
        assert_eq!(state.accounts.get_nonce("addr"), 5);
    }

    #[test]
    fn test_state_root_deterministic_across_instances() {
        let build = || {
            let state = LedgerState::new();
            state.accounts.set_balance("zebra", CoinId::BASE, big(100));
            state.accounts.set_balance("alpha", CoinId(1), big(200));
            state.coins.create(test_coin(1, "TEST"), None).unwrap();
            state.candidates.create(
                &"0xaa".to_string(),
                &"0xaa".to_string(),
                &"pk1".to_string(),
                10,
            );
            state
        };
        let a = build();
        let b = build();
        assert_eq!(a.state_root(), b.state_root());
    }

    #[test]
    fn test_check_state_reads_through() {
        let state = LedgerState::new();
        state.accounts.set_balance("addr", CoinId::BASE, big(77));
        state.coins.create(test_coin(1, "TEST"), None).unwrap();

        let view = CheckState::new(&state);
        assert_eq!(view.get_balance("addr", CoinId::BASE), big(77));
        assert!(view.coin_exists(CoinId(1)));
        assert!(view.get_coin_by_symbol("TEST").is_some());
        assert!(!view.candidate_exists("pk"));
    }

    #[test]
    fn test_execution_state_modes() {
        let state = LedgerState::new();
        let check = ExecutionState::check(&state);
        assert!(check.is_check());
        assert!(check.deliver_view().is_none());

        let deliver = ExecutionState::deliver(&state);
        assert!(!deliver.is_check());
        assert!(deliver.deliver_view().is_some());
        // Both modes expose the same read view
        let _ = check.check_view();
        let _ = deliver.check_view();
    }
}
