// Core module: the ledger state-transition engine.
//
// DETERMINISM GUARANTEES:
// =======================
// 1. Same transaction order → same final state and same state root
// 2. No randomness: all operations are deterministic
// 3. No system time: no timestamps or time-dependent logic
// 4. All monetary arithmetic is arbitrary precision; nothing overflows
// 5. Map iteration is sorted before hashing or ordering decisions
//
// INVARIANTS:
// - A transaction either fully applies (deliver) or leaves state untouched
// - Check-mode execution never mutates anything, success or failure
// - The reward pool is an explicit per-block accumulator, never a global

pub mod candidates;
pub mod coin;
pub mod commission;
pub mod declare_candidacy;
pub mod estimate;
pub mod formula;
pub mod recreate_coin;
pub mod response;
pub mod state;
pub mod transaction;
pub mod types;

use crate::core::estimate::StateHistory;
use crate::core::response::{Response, ResponseCode};
use crate::core::state::{ExecutionState, LedgerState};
use crate::core::transaction::TxDecoder;
use num_bigint::BigUint;

/// Per-block execution context: the current height and the base-coin
/// commission collected across the block. Owned by the block-application
/// driver, threaded by reference into every handler invocation and
/// discarded after commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockContext {
    pub height: u64,
    pub reward_pool: BigUint,
}

impl BlockContext {
    pub fn new(height: u64) -> Self {
        Self {
            height,
            reward_pool: BigUint::default(),
        }
    }
}

/// Execution engine facade: the live deliver state plus committed history.
/// This is the seam the consensus driver calls; block production, ordering
/// and voting happen outside.
#[derive(Debug)]
pub struct Ledger {
    state: LedgerState,
    history: StateHistory,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            state: LedgerState::new(),
            history: StateHistory::new(),
        }
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    /// Speculative admission check. Runs the full validation pipeline against
    /// a temporary state restored from the live snapshot, so the live deliver
    /// view is never touched regardless of outcome.
    pub fn check_tx(&self, raw: &[u8], height: u64) -> Response {
        let tx = match TxDecoder::decode_from_bytes(raw) {
            Ok(tx) => tx,
            Err(e) => return Response::error(ResponseCode::DecodeError, e.to_string()),
        };
        let snapshot = self.state.snapshot();
        let temp = LedgerState::new();
        temp.restore(&snapshot);
        let mut ctx = BlockContext::new(height);
        tx.run(&ExecutionState::check(&temp), &mut ctx)
    }

    /// Authoritative block application. Called once per transaction, in block
    /// order, with the block's context.
    pub fn deliver_tx(&self, raw: &[u8], ctx: &mut BlockContext) -> Response {
        let tx = match TxDecoder::decode_from_bytes(raw) {
            Ok(tx) => tx,
            Err(e) => return Response::error(ResponseCode::DecodeError, e.to_string()),
        };
        tx.run(&ExecutionState::deliver(&self.state), ctx)
    }

    /// Commits the live state into history at `height`, making it visible to
    /// the estimation endpoint.
    pub fn commit(&self, height: u64) {
        self.history.save(height, self.state.snapshot());
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
