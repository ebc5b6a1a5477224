use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use super::crypto::{verify_signature, DigitalSignature, PublicKeyPem};

/// The only currency the ledger moves
pub const CURRENCY: &str = "Olives";

/// Errors that can occur during transaction operations
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Transaction signature invalid")]
    SignatureInvalid,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

/// A transfer of Olives from one account to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    /// Sending account name
    pub sender: String,

    /// Receiving account name
    pub receiver: String,

    /// Amount being transferred
    pub amount: u64,

    /// Currency tag, always [`CURRENCY`]
    pub currency: String,

    /// Creation time in microseconds since the Unix epoch
    pub timestamp: i64,

    /// Signature over [`Transaction::canonical_bytes`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<DigitalSignature>,

    /// Sender's public key at signing time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<PublicKeyPem>,
}

impl Transaction {
    /// Creates a new unsigned transaction stamped with the current time
    pub fn new(sender: &str, receiver: &str, amount: u64) -> Self {
        Transaction {
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            amount,
            currency: CURRENCY.to_string(),
            timestamp: Utc::now().timestamp_micros(),
            signature: None,
            public_key: None,
        }
    }

    /// Bytes covered by the signature. Signature and public key are excluded.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonical_bytes(
            &self.sender,
            &self.receiver,
            self.amount,
            &self.currency,
            self.timestamp,
        )
    }

    /// Attaches the sender's signature together with the public key that checks it
    pub fn attach_signature(&mut self, signature: DigitalSignature, public_key: PublicKeyPem) {
        self.signature = Some(signature);
        self.public_key = Some(public_key);
    }

    /// Checks the attached signature against the attached public key.
    ///
    /// An unsigned transaction, or one whose key or signature cannot be
    /// decoded, is simply not valid.
    pub fn verify_signature(&self) -> bool {
        match (&self.signature, &self.public_key) {
            (Some(signature), Some(public_key)) => {
                verify_signature(&self.canonical_bytes(), signature, public_key)
            }
            _ => false,
        }
    }

    /// Checks if the transaction carries a signature
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}

/// Canonical encoding of the signable transaction fields.
///
/// Compact JSON with keys in lexicographic order (serde_json's default map is
/// key-ordered) and the timestamp as an integer, so the same logical
/// transaction always yields the same bytes.
pub fn canonical_bytes(
    sender: &str,
    receiver: &str,
    amount: u64,
    currency: &str,
    timestamp: i64,
) -> Vec<u8> {
    serde_json::json!({
        "sender": sender,
        "receiver": receiver,
        "amount": amount,
        "currency": currency,
        "timestamp": timestamp,
    })
    .to_string()
    .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::crypto::KeyPair;

    fn sign(transaction: &mut Transaction, keys: &KeyPair) {
        let signature = keys.sign(&transaction.canonical_bytes()).unwrap();
        transaction.attach_signature(signature, keys.public_key_pem().unwrap());
    }

    #[test]
    fn test_new_transaction() {
        let transaction = Transaction::new("alice", "bob", 30);

        assert_eq!(transaction.sender, "alice");
        assert_eq!(transaction.receiver, "bob");
        assert_eq!(transaction.amount, 30);
        assert_eq!(transaction.currency, CURRENCY);
        assert!(transaction.timestamp > 0);
        assert!(!transaction.is_signed());
        assert!(transaction.public_key.is_none());
    }

    #[test]
    fn test_canonical_bytes_are_sorted_and_stable() {
        let bytes = canonical_bytes("alice", "bob", 30, "Olives", 1_700_000_000_123_456);

        assert_eq!(
            String::from_utf8(bytes.clone()).unwrap(),
            r#"{"amount":30,"currency":"Olives","receiver":"bob","sender":"alice","timestamp":1700000000123456}"#
        );
        assert_eq!(
            bytes,
            canonical_bytes("alice", "bob", 30, "Olives", 1_700_000_000_123_456)
        );
    }

    #[test]
    fn test_canonical_bytes_ignore_signature() {
        let keys = KeyPair::generate().unwrap();
        let mut transaction = Transaction::new("alice", "bob", 30);
        let before = transaction.canonical_bytes();

        sign(&mut transaction, &keys);

        assert_eq!(before, transaction.canonical_bytes());
    }

    #[test]
    fn test_attach_signature() {
        let keys = KeyPair::generate().unwrap();
        let mut transaction = Transaction::new("alice", "bob", 30);

        sign(&mut transaction, &keys);

        assert!(transaction.is_signed());
        assert_eq!(transaction.public_key, Some(keys.public_key_pem().unwrap()));
        assert!(transaction.verify_signature());
    }

    #[test]
    fn test_modified_transaction_fails_verification() {
        let keys = KeyPair::generate().unwrap();
        let mut transaction = Transaction::new("alice", "bob", 30);
        sign(&mut transaction, &keys);

        let mut inflated = transaction.clone();
        inflated.amount = 3000;
        assert!(!inflated.verify_signature());

        let mut redirected = transaction.clone();
        redirected.receiver = "mallory".to_string();
        assert!(!redirected.verify_signature());

        let mut other_key = transaction;
        other_key.public_key = Some(KeyPair::generate().unwrap().public_key_pem().unwrap());
        assert!(!other_key.verify_signature());
    }

    #[test]
    fn test_unsigned_transaction_is_not_valid() {
        let transaction = Transaction::new("alice", "bob", 30);
        assert!(!transaction.verify_signature());
    }

    #[test]
    fn test_serialized_form_carries_signature_fields() {
        let keys = KeyPair::generate().unwrap();
        let mut transaction = Transaction::new("alice", "bob", 30);

        let unsigned = serde_json::to_value(&transaction).unwrap();
        assert!(unsigned.get("signature").is_none());

        sign(&mut transaction, &keys);
        let signed = serde_json::to_value(&transaction).unwrap();
        assert!(signed["signature"].is_string());
        assert!(signed["public_key"]
            .as_str()
            .unwrap()
            .starts_with("-----BEGIN PUBLIC KEY-----"));
    }
}
