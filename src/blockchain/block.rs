use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::transaction::Transaction;

/// Payload of the genesis block
pub const GENESIS_PAYLOAD: &str = "Genesis Block";

/// Previous-hash sentinel carried by the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// One entry of a block's payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BlockEntry {
    /// A signed transfer
    Transfer(Transaction),

    /// A literal marker, used by the genesis block
    Marker(String),
}

impl BlockEntry {
    /// Gets the transaction if this entry is a transfer
    pub fn as_transaction(&self) -> Option<&Transaction> {
        match self {
            BlockEntry::Transfer(transaction) => Some(transaction),
            BlockEntry::Marker(_) => None,
        }
    }
}

impl From<Transaction> for BlockEntry {
    fn from(transaction: Transaction) -> Self {
        BlockEntry::Transfer(transaction)
    }
}

/// Represents a block in the blockchain.
///
/// Fields are only readable from outside; the hash is computed once in
/// [`Block::new`] and never refreshed.
#[derive(Debug, Clone, Serialize)]
pub struct Block {
    index: u64,

    /// Creation time in microseconds since the Unix epoch
    timestamp: i64,

    transactions: Vec<BlockEntry>,

    previous_hash: String,

    hash: String,
}

impl Block {
    /// Creates a new block
    ///
    /// # Arguments
    ///
    /// * `index` - The index of the block in the chain
    /// * `transactions` - The entries to include in the block
    /// * `previous_hash` - The hash of the previous block
    ///
    /// # Returns
    ///
    /// A new Block instance with its hash sealed
    pub fn new(index: u64, transactions: Vec<BlockEntry>, previous_hash: String) -> Self {
        let block = Block {
            index,
            timestamp: Utc::now().timestamp_micros(),
            transactions,
            previous_hash,
            hash: String::new(),
        };

        let hash = block.calculate_hash();

        Block { hash, ..block }
    }

    /// Creates the genesis block
    pub fn genesis() -> Self {
        Block::new(
            0,
            vec![BlockEntry::Marker(GENESIS_PAYLOAD.to_string())],
            GENESIS_PREVIOUS_HASH.to_string(),
        )
    }

    /// Calculates the hash of the block from its current fields
    ///
    /// # Returns
    ///
    /// The SHA-256 hash of the block as a hexadecimal string
    pub fn calculate_hash(&self) -> String {
        let mut hasher = Sha256::new();

        // Keys come out sorted, so the encoding is independent of field order
        let block_data = serde_json::json!({
            "index": self.index,
            "timestamp": self.timestamp,
            "transactions": self.transactions,
            "previous_hash": self.previous_hash,
        });

        hasher.update(block_data.to_string().as_bytes());

        format!("{:x}", hasher.finalize())
    }

    /// Position of the block in the chain
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Creation time in microseconds since the Unix epoch
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Entries recorded in this block
    pub fn transactions(&self) -> &[BlockEntry] {
        &self.transactions
    }

    /// Hash of the predecessor, or "0" for the genesis block
    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    /// Hash sealed at construction
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Checks whether the stored hash still matches the block's contents
    pub fn has_valid_hash(&self) -> bool {
        self.hash == self.calculate_hash()
    }

    #[cfg(test)]
    pub(crate) fn transactions_mut(&mut self) -> &mut Vec<BlockEntry> {
        &mut self.transactions
    }

    #[cfg(test)]
    pub(crate) fn set_previous_hash(&mut self, previous_hash: &str) {
        self.previous_hash = previous_hash.to_string();
    }
}
