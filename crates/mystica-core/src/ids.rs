//! Identifier types for the Mystica economy.
//!
//! UUID-backed identifiers are generated by the `uuid_id_type!` macro so that
//! every id serializes, parses and displays the same way. Ledger transactions
//! use ULIDs instead, which keeps the audit log naturally time-ordered.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Define a UUID-based identifier newtype with the standard trait set.
///
/// Generates `Clone`, `Copy`, `Eq`, `Hash`, `Ord`, string serde, `FromStr`,
/// `Display`, `Debug`, `TryFrom<String>` and `AsRef<[u8]>`.
macro_rules! uuid_id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Create a new identifier from a UUID.
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a new random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Return the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }

            /// Return the bytes of the UUID (16 bytes).
            #[must_use]
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = uuid::Uuid::parse_str(s).map_err(|_| IdError::InvalidUuid)?;
                Ok(Self(uuid))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0.to_string()
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                self.0.as_bytes()
            }
        }
    };
}

uuid_id_type!(UserId, "A player identifier.");
uuid_id_type!(
    OperationId,
    "Idempotency key for one reward application.\n\nA reward bundle bound to an operation id is granted at most once."
);
uuid_id_type!(LocationId, "A map location that can be looted.");
uuid_id_type!(EnemyTypeId, "An enemy type that can be selected at a location.");
uuid_id_type!(ItemId, "A concrete item owned by a player.");
uuid_id_type!(ItemTypeId, "An item template (base stats, category).");
uuid_id_type!(MaterialId, "A crafting material.");
uuid_id_type!(StyleId, "A visual style variant for enemies, items and materials.");

/// A ledger transaction identifier using ULID for time-ordering.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionId(Ulid);

impl TransactionId {
    /// Create a new `TransactionId` from a ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Generate a new `TransactionId` with the current timestamp.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// Return the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> &Ulid {
        &self.0
    }

    /// Return the bytes of the ULID (16 bytes).
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 16] {
        self.0.to_bytes()
    }

    /// Create a `TransactionId` from bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Ulid::from_bytes(bytes))
    }
}

impl FromStr for TransactionId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ulid = Ulid::from_string(s).map_err(|_| IdError::InvalidUlid)?;
        Ok(Self(ulid))
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self.0)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TransactionId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TransactionId> for String {
    fn from(id: TransactionId) -> Self {
        id.0.to_string()
    }
}

/// Mints `TransactionId`s that strictly increase, even within one millisecond.
///
/// Stores hold one behind their write lock so id order matches commit order.
#[derive(Default)]
pub struct TransactionIdGenerator(ulid::Generator);

impl TransactionIdGenerator {
    /// Create a generator with no previous id.
    #[must_use]
    pub const fn new() -> Self {
        Self(ulid::Generator::new())
    }

    /// Mint the next id.
    ///
    /// # Errors
    ///
    /// Returns `IdError::Exhausted` if the random tail overflows within one millisecond.
    pub fn next_id(&mut self) -> Result<TransactionId, IdError> {
        self.0
            .generate()
            .map(TransactionId)
            .map_err(|_| IdError::Exhausted)
    }
}

impl fmt::Debug for TransactionIdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TransactionIdGenerator")
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a valid UUID.
    #[error("invalid UUID format")]
    InvalidUuid,

    /// The input is not a valid ULID.
    #[error("invalid ULID format")]
    InvalidUlid,

    /// The monotonic id space for the current millisecond is used up.
    #[error("transaction id space exhausted")]
    Exhausted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_serde_json() {
        let id = UserId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let parsed: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn operation_id_rejects_garbage() {
        assert_eq!("not-a-uuid".parse::<OperationId>(), Err(IdError::InvalidUuid));
    }

    #[test]
    fn transaction_ids_are_time_ordered() {
        let first = TransactionId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = TransactionId::generate();
        assert!(first < second);
        assert!(first.to_bytes() < second.to_bytes());
    }

    #[test]
    fn generator_ids_increase_within_one_millisecond() {
        let mut ids = TransactionIdGenerator::new();
        let minted: Vec<TransactionId> = (0..64).map(|_| ids.next_id().unwrap()).collect();
        assert!(minted.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(minted
            .windows(2)
            .all(|pair| pair[0].to_bytes() < pair[1].to_bytes()));
    }

    #[test]
    fn transaction_id_bytes_roundtrip() {
        let id = TransactionId::generate();
        assert_eq!(TransactionId::from_bytes(id.to_bytes()), id);
    }
}
