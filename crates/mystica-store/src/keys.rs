//! Key encoding utilities for `RocksDB`.
//!
//! Keys are fixed-width byte concatenations so that prefix iteration over a
//! user's rows works in every column family.

use mystica_core::{CurrencyKind, ItemId, MaterialId, OperationId, StyleId, TransactionId, UserId};

/// Create a balance key.
///
/// Format: `user_id (16 bytes) || currency tag (1 byte)`
#[must_use]
pub fn balance_key(user_id: &UserId, currency: CurrencyKind) -> Vec<u8> {
    let mut key = Vec::with_capacity(17);
    key.extend_from_slice(user_id.as_bytes());
    key.push(currency.tag());
    key
}

/// Create a transaction key from a transaction ID.
#[must_use]
pub fn transaction_key(transaction_id: &TransactionId) -> Vec<u8> {
    transaction_id.to_bytes().to_vec()
}

/// Create a user-transaction index key.
///
/// Format: `user_id (16 bytes) || transaction_id (16 bytes)`
///
/// Since ULIDs are time-ordered, a user's transactions iterate oldest first.
#[must_use]
pub fn user_transaction_key(user_id: &UserId, transaction_id: &TransactionId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&transaction_id.to_bytes());
    key
}

/// Create a prefix for iterating all of a user's rows in an index.
#[must_use]
pub fn user_prefix(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Extract the transaction ID from a user-transaction index key.
///
/// Returns `None` if the key is shorter than 32 bytes.
#[must_use]
pub fn extract_transaction_id_from_user_key(key: &[u8]) -> Option<TransactionId> {
    let bytes: [u8; 16] = key.get(16..32)?.try_into().ok()?;
    Some(TransactionId::from_bytes(bytes))
}

/// Create a reward operation key.
#[must_use]
pub fn operation_key(operation_id: &OperationId) -> Vec<u8> {
    operation_id.as_bytes().to_vec()
}

/// Create a material stack key.
///
/// Format: `user_id (16 bytes) || material_id (16 bytes) || style_id (16 bytes)`
#[must_use]
pub fn material_key(user_id: &UserId, material_id: &MaterialId, style_id: &StyleId) -> Vec<u8> {
    let mut key = Vec::with_capacity(48);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(material_id.as_bytes());
    key.extend_from_slice(style_id.as_bytes());
    key
}

/// Create an item key from an item ID.
#[must_use]
pub fn item_key(item_id: &ItemId) -> Vec<u8> {
    item_id.as_bytes().to_vec()
}

/// Create a user-item index key.
///
/// Format: `user_id (16 bytes) || item_id (16 bytes)`
#[must_use]
pub fn user_item_key(user_id: &UserId, item_id: &ItemId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(item_id.as_bytes());
    key
}

/// Create a progression key from a user ID.
#[must_use]
pub fn progression_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_keys_differ_per_currency() {
        let user_id = UserId::generate();
        let gold = balance_key(&user_id, CurrencyKind::Gold);
        let gems = balance_key(&user_id, CurrencyKind::Gems);
        assert_eq!(gold.len(), 17);
        assert_ne!(gold, gems);
        assert!(gold.starts_with(&user_prefix(&user_id)));
    }

    #[test]
    fn user_transaction_key_format() {
        let user_id = UserId::generate();
        let tx_id = TransactionId::generate();
        let key = user_transaction_key(&user_id, &tx_id);

        assert_eq!(key.len(), 32);
        assert_eq!(&key[..16], user_id.as_bytes());
        assert_eq!(extract_transaction_id_from_user_key(&key), Some(tx_id));
    }

    #[test]
    fn short_index_key_yields_none() {
        assert_eq!(extract_transaction_id_from_user_key(&[0u8; 20]), None);
    }

    #[test]
    fn material_key_length() {
        let key = material_key(
            &UserId::generate(),
            &MaterialId::generate(),
            &StyleId::generate(),
        );
        assert_eq!(key.len(), 48);
    }
}
