//! Address, public key and coin identifier types shared across the ledger.
//!
//! Addresses are derived deterministically from secp256k1 public keys; coin
//! identifiers are small integers allocated by the global coin counter, with
//! identifier 0 reserved for the base coin.

use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Account address type (alias for String, `0x`-prefixed hex).
pub type Address = String;

/// Candidate public key type (alias for String, hex).
pub type Pubkey = String;

/// Display symbol of a coin (alias for String).
pub type CoinSymbol = String;

/// Symbol of the network base coin. All commissions are denominated in it
/// before conversion into the declared gas coin.
pub const BASE_COIN_SYMBOL: &str = "STN";

/// Derives the account address from a secp256k1 public key: the last 20
/// bytes of SHA-256 over the uncompressed key body, hex encoded.
pub fn address_from_pubkey(pubkey: &PublicKey) -> Address {
    let serialized = pubkey.serialize_uncompressed();
    let mut hasher = Sha256::new();
    hasher.update(&serialized[1..]);
    let hash = hasher.finalize();
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Returns the raw hex body of an address (without the `0x` prefix), as
/// placed into `tx.from` result tags.
pub fn address_hex(address: &str) -> String {
    address.trim_start_matches("0x").to_string()
}

/// Numeric coin identifier. Distinct from the display symbol: recreating a
/// coin allocates a fresh identifier while the symbol moves over to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoinId(pub u32);

impl CoinId {
    /// Identifier of the network base coin.
    pub const BASE: CoinId = CoinId(0);

    pub fn is_base_coin(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for CoinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serde adapter serializing `BigUint` amounts as decimal strings.
pub mod dec {
    use num_bigint::BigUint;
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let s = String::deserialize(deserializer)?;
        BigUint::from_str(&s).map_err(de::Error::custom)
    }
}

/// Serde adapter for optional `BigUint` amounts. A missing field decodes to
/// `None` so handlers can reject incomplete payloads explicitly.
pub mod dec_opt {
    use num_bigint::BigUint;
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(
        value: &Option<BigUint>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<BigUint>, D::Error> {
        let opt = Option::<String>::deserialize(deserializer)?;
        match opt {
            None => Ok(None),
            Some(s) => BigUint::from_str(&s).map(Some).map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::{Secp256k1, SecretKey};

    #[test]
    fn test_address_from_pubkey_deterministic() {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&[7; 32]).unwrap();
        let pk = PublicKey::from_secret_key(&secp, &sk);

        let addr1 = address_from_pubkey(&pk);
        let addr2 = address_from_pubkey(&pk);
        assert_eq!(addr1, addr2);
        assert!(addr1.starts_with("0x"));
        assert_eq!(addr1.len(), 2 + 40); // 0x + 20 bytes hex
    }

    #[test]
    fn test_address_hex_strips_prefix() {
        assert_eq!(address_hex("0xabcdef"), "abcdef");
        assert_eq!(address_hex("abcdef"), "abcdef");
    }

    #[test]
    fn test_coin_id_base() {
        assert!(CoinId::BASE.is_base_coin());
        assert!(!CoinId(1).is_base_coin());
        assert_eq!(CoinId(5).to_string(), "5");
    }
}
