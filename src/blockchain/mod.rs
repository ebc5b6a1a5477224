// Blockchain module
//
// This module contains the core ledger implementation including:
// - Block structure and hash chaining
// - Ledger orchestration and chain validation
// - Transaction structure and canonical encoding
// - Signing and verification
// - Account registry

pub mod account;
pub mod block;
pub mod chain;
pub mod crypto;
pub mod transaction;

// Re-export main components for easier access
pub use account::{Account, AccountError, KeyRegistry};
pub use block::{Block, BlockEntry};
pub use chain::{BlockchainError, ChainViolation, Ledger, SharedLedger};
pub use crypto::{DigitalSignature, KeyPair, PublicKeyPem};
pub use transaction::{Transaction, TransactionError, CURRENCY};
