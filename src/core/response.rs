//! Execution responses: status codes, logs, structured info and result tags.
//!
//! A [`Response`] is built fresh for every executed transaction and returned
//! to the block-application driver. Failures carry a machine-readable info
//! map alongside the human-readable log so consumers never parse log text.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status code of a transaction execution. Discriminants are part of the
/// external contract and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum ResponseCode {
    Ok = 0,
    CoinNotExists = 102,
    CoinReserveNotSufficient = 103,
    DecodeError = 106,
    InsufficientFunds = 107,
    WrongCoinSupply = 204,
    WrongCrr = 205,
    IsNotOwnerOfCoin = 206,
    CandidateExists = 401,
    WrongCommission = 403,
    TooLowStake = 406,
}

impl ResponseCode {
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn is_ok(self) -> bool {
        self == ResponseCode::Ok
    }
}

/// Key/value annotation attached to a successful execution for external
/// indexing (e.g. `tx.type`, `tx.from`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Machine-readable error payload. Ordered map so serialized output is
/// deterministic.
pub type Info = BTreeMap<String, String>;

/// Builds an [`Info`] map from key/value pairs.
pub fn info_map(pairs: &[(&str, String)]) -> Info {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Result of executing one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub code: ResponseCode,
    pub log: String,
    pub info: Option<Info>,
    pub gas_used: u64,
    pub gas_wanted: u64,
    pub tags: Vec<Tag>,
}

impl Response {
    /// Successful execution: all checks passed, mutation applied (deliver)
    /// or confirmed possible (check).
    pub fn ok(gas: u64, tags: Vec<Tag>) -> Self {
        Self {
            code: ResponseCode::Ok,
            log: String::new(),
            info: None,
            gas_used: gas,
            gas_wanted: gas,
            tags,
        }
    }

    pub fn error(code: ResponseCode, log: impl Into<String>) -> Self {
        Self {
            code,
            log: log.into(),
            info: None,
            gas_used: 0,
            gas_wanted: 0,
            tags: Vec::new(),
        }
    }

    pub fn error_with_info(code: ResponseCode, log: impl Into<String>, info: Info) -> Self {
        Self {
            code,
            log: log.into(),
            info: Some(info),
            gas_used: 0,
            gas_wanted: 0,
            tags: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_values_stable() {
        assert_eq!(ResponseCode::Ok.as_u32(), 0);
        assert_eq!(ResponseCode::CoinNotExists.as_u32(), 102);
        assert_eq!(ResponseCode::CoinReserveNotSufficient.as_u32(), 103);
        assert_eq!(ResponseCode::DecodeError.as_u32(), 106);
        assert_eq!(ResponseCode::InsufficientFunds.as_u32(), 107);
        assert_eq!(ResponseCode::WrongCoinSupply.as_u32(), 204);
        assert_eq!(ResponseCode::WrongCrr.as_u32(), 205);
        assert_eq!(ResponseCode::IsNotOwnerOfCoin.as_u32(), 206);
        assert_eq!(ResponseCode::CandidateExists.as_u32(), 401);
        assert_eq!(ResponseCode::WrongCommission.as_u32(), 403);
        assert_eq!(ResponseCode::TooLowStake.as_u32(), 406);
    }

    #[test]
    fn test_ok_response() {
        let resp = Response::ok(10_000, vec![Tag::new("tx.type", "06")]);
        assert!(resp.is_ok());
        assert_eq!(resp.gas_used, 10_000);
        assert_eq!(resp.gas_wanted, 10_000);
        assert_eq!(resp.tags.len(), 1);
        assert!(resp.info.is_none());
    }

    #[test]
    fn test_error_response_with_info() {
        let resp = Response::error_with_info(
            ResponseCode::InsufficientFunds,
            "Insufficient funds",
            info_map(&[("sender", "0xaa".to_string()), ("needed_value", "5".to_string())]),
        );
        assert!(!resp.is_ok());
        assert_eq!(resp.gas_used, 0);
        let info = resp.info.unwrap();
        assert_eq!(info.get("sender").unwrap(), "0xaa");
        assert_eq!(info.get("needed_value").unwrap(), "5");
    }

    #[test]
    fn test_info_map_deterministic_order() {
        let info = info_map(&[("b", "2".to_string()), ("a", "1".to_string())]);
        let keys: Vec<_> = info.keys().cloned().collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }
}
