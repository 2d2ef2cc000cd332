//! Candidate registry: validator candidacy records and delegated stake.
//!
//! A public key registers at most once. The registry is capped per block
//! height; once at capacity a newcomer is admitted only when its stake
//! (valued in base coin) strictly exceeds the weakest registered stake.
//!
//! # Determinism
//! Registration order is tracked with a monotonic counter so the weakest
//! candidate is a deterministic function of the registry contents: ascending
//! total stake, then latest registration first, then descending public key.

use crate::core::types::{Address, CoinId, Pubkey};
use num_bigint::BigUint;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Lowest commission a candidate may declare, integer percent.
pub const MIN_COMMISSION: u32 = 0;
/// Highest commission a candidate may declare, integer percent.
pub const MAX_COMMISSION: u32 = 100;

const CANDIDATES_PER_VALIDATOR: usize = 3;

/// Validator slots available at a block height. Starts at 16 and grows by 4
/// per growth period up to 256.
pub fn validators_count_for_block(height: u64) -> usize {
    let grown = 16 + 4 * (height / 518_400) as usize;
    grown.min(256)
}

/// Candidate slots available at a block height.
pub fn candidates_count_for_block(height: u64) -> usize {
    CANDIDATES_PER_VALIDATOR * validators_count_for_block(height)
}

/// A single delegation of `value` of `coin`, with its base-coin valuation at
/// delegation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stake {
    pub owner: Address,
    pub coin: CoinId,
    pub value: BigUint,
    pub base_value: BigUint,
}

/// A registered validator candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub pubkey: Pubkey,
    /// Address receiving block rewards.
    pub reward_address: Address,
    /// Address authorized to manage the candidacy.
    pub owner_address: Address,
    /// Reward commission, integer percent in `MIN_COMMISSION..=MAX_COMMISSION`.
    pub commission: u32,
    /// Position in registration order; ties on stake resolve against it.
    pub registration_index: u64,
    /// Sum of all delegated stake valued in base coin.
    pub total_base_stake: BigUint,
    pub stakes: Vec<Stake>,
}

/// Candidate store with copy-on-write snapshots.
#[derive(Debug)]
pub struct Candidates {
    candidates: RwLock<Arc<HashMap<Pubkey, Candidate>>>,
    created: RwLock<u64>,
}

impl Candidates {
    pub(crate) fn new() -> Self {
        Self {
            candidates: RwLock::new(Arc::new(HashMap::new())),
            created: RwLock::new(0),
        }
    }

    pub fn exists(&self, pubkey: &str) -> bool {
        self.candidates.read().unwrap().contains_key(pubkey)
    }

    pub fn count(&self) -> usize {
        self.candidates.read().unwrap().len()
    }

    pub fn get(&self, pubkey: &str) -> Option<Candidate> {
        self.candidates.read().unwrap().get(pubkey).cloned()
    }

    /// Registers a new candidate with no stake. Funds sufficiency and
    /// duplicate checks happen before this is called; a duplicate here is a
    /// broken execution pipeline.
    pub fn create(
        &self,
        reward_address: &Address,
        owner_address: &Address,
        pubkey: &Pubkey,
        commission: u32,
    ) {
        let mut created = self.created.write().unwrap();
        let mut arc = self.candidates.write().unwrap();
        let map = Arc::make_mut(&mut arc);
        assert!(
            !map.contains_key(pubkey),
            "candidate {} already registered",
            pubkey
        );
        *created += 1;
        map.insert(
            pubkey.clone(),
            Candidate {
                pubkey: pubkey.clone(),
                reward_address: reward_address.clone(),
                owner_address: owner_address.clone(),
                commission,
                registration_index: *created,
                total_base_stake: BigUint::default(),
                stakes: Vec::new(),
            },
        );
    }

    /// Records a delegation to a registered candidate. Merges with an
    /// existing (owner, coin) stake when present.
    pub fn delegate(
        &self,
        owner: &Address,
        pubkey: &Pubkey,
        coin: CoinId,
        value: BigUint,
        base_value: BigUint,
    ) {
        let mut arc = self.candidates.write().unwrap();
        let map = Arc::make_mut(&mut arc);
        let candidate = map
            .get_mut(pubkey)
            .unwrap_or_else(|| panic!("delegation to unknown candidate {}", pubkey));
        candidate.total_base_stake += &base_value;
        match candidate
            .stakes
            .iter_mut()
            .find(|s| s.owner == *owner && s.coin == coin)
        {
            Some(stake) => {
                stake.value += &value;
                stake.base_value += &base_value;
            }
            None => candidate.stakes.push(Stake {
                owner: owner.clone(),
                coin,
                value,
                base_value,
            }),
        }
    }

    /// Smallest total stake among registered candidates, or `None` when the
    /// registry is empty.
    pub fn min_total_stake(&self) -> Option<BigUint> {
        self.candidates
            .read()
            .unwrap()
            .values()
            .map(|c| c.total_base_stake.clone())
            .min()
    }

    /// Whether a newcomer with the given base-coin stake may enter a registry
    /// capped at `limit`. Below capacity everyone enters; at capacity the
    /// stake must strictly exceed the weakest registered stake, so an equal
    /// stake loses to the incumbent.
    pub fn is_new_candidate_stake_sufficient(
        &self,
        stake_base_value: &BigUint,
        limit: usize,
    ) -> bool {
        if self.count() < limit {
            return true;
        }
        match self.min_total_stake() {
            Some(min) => *stake_base_value > min,
            None => true,
        }
    }

    /// The candidate the driver evicts when the registry shrinks: ascending
    /// total stake, then latest registration first, then descending public
    /// key. Total order, so every replica picks the same one.
    pub fn weakest_candidate(&self) -> Option<Pubkey> {
        let arc = self.candidates.read().unwrap();
        arc.values()
            .min_by(|a, b| {
                a.total_base_stake
                    .cmp(&b.total_base_stake)
                    .then_with(|| b.registration_index.cmp(&a.registration_index))
                    .then_with(|| b.pubkey.cmp(&a.pubkey))
            })
            .map(|c| c.pubkey.clone())
    }

    pub(crate) fn arc(&self) -> Arc<HashMap<Pubkey, Candidate>> {
        self.candidates.read().unwrap().clone()
    }

    pub(crate) fn created(&self) -> u64 {
        *self.created.read().unwrap()
    }

    pub(crate) fn restore(&self, candidates: Arc<HashMap<Pubkey, Candidate>>, created: u64) {
        *self.candidates.write().unwrap() = candidates;
        *self.created.write().unwrap() = created;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(n: u128) -> BigUint {
        BigUint::from(n)
    }

    fn register(store: &Candidates, pubkey: &str, stake: u128) {
        let addr = format!("0x{}", pubkey);
        let pk = pubkey.to_string();
        store.create(&addr, &addr, &pk, 10);
        store.delegate(&addr, &pk, CoinId::BASE, big(stake), big(stake));
    }

    #[test]
    fn test_validators_count_growth() {
        assert_eq!(validators_count_for_block(0), 16);
        assert_eq!(validators_count_for_block(518_399), 16);
        assert_eq!(validators_count_for_block(518_400), 20);
        assert_eq!(validators_count_for_block(u64::MAX), 256);
    }

    #[test]
    fn test_candidates_count_is_triple() {
        assert_eq!(candidates_count_for_block(0), 48);
    }

    #[test]
    fn test_create_and_exists() {
        let store = Candidates::new();
        assert!(!store.exists("aa"));
        register(&store, "aa", 100);
        assert!(store.exists("aa"));
        assert_eq!(store.count(), 1);
        let c = store.get("aa").unwrap();
        assert_eq!(c.commission, 10);
        assert_eq!(c.total_base_stake, big(100));
        assert_eq!(c.registration_index, 1);
    }

    #[test]
    fn test_delegate_merges_same_owner_coin() {
        let store = Candidates::new();
        register(&store, "aa", 100);
        let addr = "0xaa".to_string();
        store.delegate(&addr, &"aa".to_string(), CoinId::BASE, big(50), big(50));
        let c = store.get("aa").unwrap();
        assert_eq!(c.total_base_stake, big(150));
        assert_eq!(c.stakes.len(), 1);
        assert_eq!(c.stakes[0].value, big(150));
    }

    #[test]
    fn test_delegate_new_coin_adds_stake_entry() {
        let store = Candidates::new();
        register(&store, "aa", 100);
        let addr = "0xaa".to_string();
        store.delegate(&addr, &"aa".to_string(), CoinId(1), big(7), big(3));
        let c = store.get("aa").unwrap();
        assert_eq!(c.stakes.len(), 2);
        assert_eq!(c.total_base_stake, big(103));
    }

    #[test]
    fn test_admission_below_capacity() {
        let store = Candidates::new();
        register(&store, "aa", 100);
        assert!(store.is_new_candidate_stake_sufficient(&big(1), 2));
    }

    #[test]
    fn test_admission_at_capacity_requires_strictly_more() {
        let store = Candidates::new();
        register(&store, "aa", 100);
        register(&store, "bb", 200);
        // At capacity 2: equal to the weakest loses, strictly more wins
        assert!(!store.is_new_candidate_stake_sufficient(&big(100), 2));
        assert!(store.is_new_candidate_stake_sufficient(&big(101), 2));
    }

    #[test]
    fn test_weakest_candidate_order() {
        let store = Candidates::new();
        register(&store, "aa", 100);
        register(&store, "bb", 50);
        register(&store, "cc", 50);
        // Equal weakest stakes: the later registration ("cc") goes first
        assert_eq!(store.weakest_candidate().unwrap(), "cc");
    }

    #[test]
    fn test_snapshot_restore_roundtrip() {
        let store = Candidates::new();
        register(&store, "aa", 100);
        let arc = store.arc();
        let created = store.created();

        register(&store, "bb", 200);
        assert_eq!(store.count(), 2);

        store.restore(arc, created);
        assert_eq!(store.count(), 1);
        assert!(store.exists("aa"));
        assert!(!store.exists("bb"));
        assert_eq!(store.created(), 1);
    }
}
