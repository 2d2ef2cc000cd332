pub mod core;
pub mod error;

pub use error::{Result, StakenetError};

// Core API exports
pub use crate::core::{BlockContext, Ledger};
pub use crate::core::candidates::{
    candidates_count_for_block,
    validators_count_for_block,
    Candidate,
    Candidates,
    Stake,
    MAX_COMMISSION,
    MIN_COMMISSION,
};
pub use crate::core::coin::{
    coin_display,
    max_coin_supply,
    min_coin_reserve,
    min_coin_supply,
    Coin,
    CoinReader,
    SymbolInfo,
    MAX_CRR,
    MIN_CRR,
};
pub use crate::core::commission::{
    check_reserve_underflow,
    commission_in_base_coin,
    commission_in_gas_coin,
    CommissionError,
    COMMISSION_MULTIPLIER,
    DECLARE_CANDIDACY_TX_GAS,
    RECREATE_COIN_TX_GAS,
};
pub use crate::core::declare_candidacy::DeclareCandidacyData;
pub use crate::core::estimate::{
    estimate_tx_commission,
    RpcError,
    StateHistory,
    TxCommissionResponse,
};
pub use crate::core::formula::{calculate_sale_amount, calculate_sale_return, FormulaError};
pub use crate::core::recreate_coin::RecreateCoinData;
pub use crate::core::response::{info_map, Info, Response, ResponseCode, Tag};
pub use crate::core::state::{
    Accounts,
    App,
    CheckState,
    Coins,
    ExecutionState,
    LedgerSnapshot,
    LedgerState,
    StateError,
};
pub use crate::core::transaction::{
    sign_transaction,
    TotalSpend,
    Transaction,
    TxData,
    TxDecodeError,
    TxDecoder,
    TxType,
};
pub use crate::core::types::{
    address_from_pubkey,
    address_hex,
    Address,
    CoinId,
    CoinSymbol,
    Pubkey,
    BASE_COIN_SYMBOL,
};
