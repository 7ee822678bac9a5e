use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Native value amount, denominated in wei
pub type Wei = u128;

/// Number of wei in one unit of native value
pub const WEI_PER_UNIT: Wei = 1_000_000_000_000_000_000;

/// Length of an account address in bytes
pub const ACCOUNT_ID_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountIdError {
    #[error("Invalid hex in account id: {0}")]
    InvalidHex(String),

    #[error("Account id must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Opaque address-like identity of an airline, passenger or oracle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(pub [u8; ACCOUNT_ID_LEN]);

impl AccountId {
    pub const ZERO: AccountId = AccountId([0u8; ACCOUNT_ID_LEN]);

    /// Derive a stable account id from a human-readable label.
    ///
    /// Used by the simulator and tests to get reproducible identities.
    pub fn from_label(label: &str) -> Self {
        let digest = Sha256::digest(label.as_bytes());
        let mut bytes = [0u8; ACCOUNT_ID_LEN];
        bytes.copy_from_slice(&digest[..ACCOUNT_ID_LEN]);
        AccountId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ACCOUNT_ID_LEN] {
        &self.0
    }

    /// Abbreviated form for log lines
    pub fn short(&self) -> String {
        format!("0x{}…", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self)
    }
}

impl FromStr for AccountId {
    type Err = AccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(trimmed).map_err(|e| AccountIdError::InvalidHex(e.to_string()))?;
        if bytes.len() != ACCOUNT_ID_LEN {
            return Err(AccountIdError::InvalidLength {
                expected: ACCOUNT_ID_LEN,
                actual: bytes.len(),
            });
        }
        let mut id = [0u8; ACCOUNT_ID_LEN];
        id.copy_from_slice(&bytes);
        Ok(AccountId(id))
    }
}

impl TryFrom<String> for AccountId {
    type Error = AccountIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.to_string()
    }
}

/// Caller identity and attached value of a single ledger call.
///
/// Stands in for the platform-provided sender and payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: AccountId,
    pub value: Wei,
}

impl CallContext {
    /// A call carrying no value
    pub fn sender(caller: AccountId) -> Self {
        Self { caller, value: 0 }
    }

    /// A call carrying `value` wei
    pub fn with_value(caller: AccountId, value: Wei) -> Self {
        Self { caller, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_roundtrips_through_hex() {
        let id = AccountId::from_label("airline-1");
        let parsed: AccountId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!(id.to_string().starts_with("0x"));
        assert_eq!(id.to_string().len(), 2 + ACCOUNT_ID_LEN * 2);
    }

    #[test]
    fn test_account_id_rejects_wrong_length() {
        let err = "0xdeadbeef".parse::<AccountId>().unwrap_err();
        assert_eq!(
            err,
            AccountIdError::InvalidLength {
                expected: ACCOUNT_ID_LEN,
                actual: 4
            }
        );
        assert!(matches!(
            "0xzz".parse::<AccountId>(),
            Err(AccountIdError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_labels_produce_distinct_ids() {
        assert_ne!(AccountId::from_label("a"), AccountId::from_label("b"));
        assert_eq!(AccountId::from_label("a"), AccountId::from_label("a"));
    }

    #[test]
    fn test_account_id_serializes_as_hex_string() {
        let id = AccountId::from_label("oracle-7");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
