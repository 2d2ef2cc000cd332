//! Read-only commission estimation against historical state snapshots.
//!
//! Estimation never touches the reward pool or any live state: it decodes
//! the transaction without a signature, looks the gas coin up in an
//! immutable snapshot and converts the base-coin commission along that
//! coin's bonding curve. Safe to call concurrently with block execution.

use crate::core::commission::commission_in_gas_coin;
use crate::core::state::LedgerSnapshot;
use crate::core::transaction::TxDecoder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

/// Commission quoted for a transaction, as a decimal string in the gas coin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxCommissionResponse {
    pub commission: String,
}

/// Error surfaced over the read-only query interface: code, message and an
/// optional raw detail.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("RPC error {code}: {message}")]
pub struct RpcError {
    pub code: u32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Historical snapshots by committed block height. Readers share the lock;
/// it is held only long enough to clone the O(1) snapshot handle out.
#[derive(Debug, Default)]
pub struct StateHistory {
    states: RwLock<HashMap<u64, LedgerSnapshot>>,
    latest: RwLock<Option<u64>>,
}

impl StateHistory {
    pub fn new() -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            latest: RwLock::new(None),
        }
    }

    /// Stores the snapshot committed at `height`.
    pub fn save(&self, height: u64, snapshot: LedgerSnapshot) {
        let mut states = self.states.write().unwrap();
        states.insert(height, snapshot);
        let mut latest = self.latest.write().unwrap();
        match *latest {
            Some(current) if current >= height => {}
            _ => *latest = Some(height),
        }
    }

    pub fn latest_height(&self) -> Option<u64> {
        *self.latest.read().unwrap()
    }

    /// Snapshot at `height`, or the latest committed one when `None`.
    pub fn get_state_for_height(&self, height: Option<u64>) -> Result<LedgerSnapshot, RpcError> {
        let resolved = match height {
            Some(h) => h,
            None => self.latest_height().ok_or_else(|| RpcError {
                code: 404,
                message: "No committed state available".to_string(),
                data: None,
            })?,
        };
        let states = self.states.read().unwrap();
        states.get(&resolved).cloned().ok_or_else(|| RpcError {
            code: 404,
            message: format!("State at height {} not found", resolved),
            data: None,
        })
    }
}

/// Quotes the gas-coin commission for raw transaction bytes against the
/// state at `height` (or the latest state when `None`). Signature
/// verification is skipped; estimation does not require a valid signature.
pub fn estimate_tx_commission(
    history: &StateHistory,
    raw_tx: &[u8],
    height: Option<u64>,
) -> Result<TxCommissionResponse, RpcError> {
    let snapshot = history.get_state_for_height(height)?;

    let tx = TxDecoder::decode_from_bytes_without_sig(raw_tx).map_err(|e| RpcError {
        code: 400,
        message: "Cannot decode transaction".to_string(),
        data: Some(e.to_string()),
    })?;

    let base_commission = tx.commission_in_base_coin();
    let commission =
        commission_in_gas_coin(&snapshot, tx.gas_coin, &base_commission).map_err(|e| RpcError {
            code: 400,
            message: e.to_string(),
            data: None,
        })?;

    Ok(TxCommissionResponse {
        commission: commission.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coin::Coin;
    use crate::core::commission::{COMMISSION_MULTIPLIER, DECLARE_CANDIDACY_TX_GAS};
    use crate::core::declare_candidacy::DeclareCandidacyData;
    use crate::core::state::LedgerState;
    use crate::core::transaction::{Transaction, TxData};
    use crate::core::types::CoinId;
    use num_bigint::BigUint;

    fn pow10(e: u32) -> BigUint {
        BigUint::from(10u32).pow(e)
    }

    fn unsigned_declare_tx(gas_price: u64, gas_coin: CoinId) -> Vec<u8> {
        let tx = Transaction {
            nonce: 1,
            gas_price,
            gas_limit: DECLARE_CANDIDACY_TX_GAS,
            gas_coin,
            commission_multiplier: COMMISSION_MULTIPLIER,
            data: TxData::DeclareCandidacy(DeclareCandidacyData {
                reward_address: "0xaa".to_string(),
                pubkey: "pk1".to_string(),
                commission: 10,
                coin: CoinId::BASE,
                stake: Some(pow10(20)),
            }),
            signature: None,
        };
        serde_json::to_vec(&tx).unwrap()
    }

    fn history_with(state: &LedgerState, height: u64) -> StateHistory {
        let history = StateHistory::new();
        history.save(height, state.snapshot());
        history
    }

    #[test]
    fn test_estimate_base_gas_coin_exact_product() {
        let state = LedgerState::new();
        let history = history_with(&state, 10);

        let raw = unsigned_declare_tx(3, CoinId::BASE);
        let resp = estimate_tx_commission(&history, &raw, Some(10)).unwrap();
        // gas_price * gas_units * multiplier, no rounding
        let expected =
            BigUint::from(3u32) * BigUint::from(DECLARE_CANDIDACY_TX_GAS) * COMMISSION_MULTIPLIER;
        assert_eq!(resp.commission, expected.to_string());
    }

    #[test]
    fn test_estimate_uses_latest_when_height_omitted() {
        let state = LedgerState::new();
        let history = StateHistory::new();
        history.save(5, state.snapshot());
        history.save(9, state.snapshot());
        assert_eq!(history.latest_height(), Some(9));

        let raw = unsigned_declare_tx(1, CoinId::BASE);
        assert!(estimate_tx_commission(&history, &raw, None).is_ok());
    }

    #[test]
    fn test_estimate_decode_failure() {
        let state = LedgerState::new();
        let history = history_with(&state, 1);
        let err = estimate_tx_commission(&history, b"garbage", Some(1)).unwrap_err();
        assert_eq!(err.code, 400);
        assert_eq!(err.message, "Cannot decode transaction");
        assert!(err.data.is_some());
    }

    #[test]
    fn test_estimate_unknown_height() {
        let history = StateHistory::new();
        let raw = unsigned_declare_tx(1, CoinId::BASE);
        let err = estimate_tx_commission(&history, &raw, Some(3)).unwrap_err();
        assert_eq!(err.code, 404);
    }

    #[test]
    fn test_estimate_gas_coin_reserve_shortfall() {
        let state = LedgerState::new();
        state
            .coins
            .create(
                Coin {
                    id: CoinId(1),
                    symbol: "GAS".to_string(),
                    volume: pow10(24),
                    reserve: pow10(18),
                    crr: 50,
                    max_supply: pow10(30),
                },
                None,
            )
            .unwrap();
        let history = history_with(&state, 1);

        let raw = unsigned_declare_tx(1, CoinId(1));
        let err = estimate_tx_commission(&history, &raw, Some(1)).unwrap_err();
        assert_eq!(err.code, 400);
        assert!(err.message.contains("reserve"));
    }

    #[test]
    fn test_estimate_never_mutates_state() {
        let state = LedgerState::new();
        state
            .accounts
            .set_balance("0xaa", CoinId::BASE, pow10(21));
        let history = history_with(&state, 1);
        let root_before = state.state_root();

        let raw = unsigned_declare_tx(1, CoinId::BASE);
        let _ = estimate_tx_commission(&history, &raw, Some(1));
        assert_eq!(state.state_root(), root_before);
    }

    #[test]
    fn test_estimate_converts_along_gas_coin_curve() {
        let state = LedgerState::new();
        // Linear coin (crr 100): commission converts exactly
        state
            .coins
            .create(
                Coin {
                    id: CoinId(1),
                    symbol: "GAS".to_string(),
                    volume: pow10(24),
                    reserve: pow10(22),
                    crr: 100,
                    max_supply: pow10(30),
                },
                None,
            )
            .unwrap();
        let history = history_with(&state, 1);

        let raw = unsigned_declare_tx(1, CoinId(1));
        let resp = estimate_tx_commission(&history, &raw, Some(1)).unwrap();
        // base commission 10^19; volume/reserve = 100 => 10^21 in gas coin
        assert_eq!(resp.commission, pow10(21).to_string());
    }
}
