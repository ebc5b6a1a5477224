use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use log::{debug, info, warn};

use super::account::{AccountError, KeyRegistry};
use super::block::{Block, BlockEntry};
use super::transaction::{Transaction, TransactionError};

/// Errors that can occur during ledger operations
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("Transaction error: {0}")]
    TransactionError(#[from] TransactionError),

    #[error("Account error: {0}")]
    AccountError(#[from] AccountError),
}

/// The first inconsistency found while walking the chain
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainViolation {
    #[error("Block {index} hash does not match its contents")]
    HashMismatch { index: usize },

    #[error("Block {index} does not link to its predecessor")]
    BrokenLink { index: usize },
}

/// Represents the ledger: the chain of blocks plus the accounts it moves funds between
#[derive(Debug)]
pub struct Ledger {
    /// The chain of blocks, never empty
    chain: Vec<Block>,

    /// Balances and key pairs
    accounts: KeyRegistry,
}

impl Default for Ledger {
    fn default() -> Self {
        Ledger::new()
    }
}

impl Ledger {
    /// Creates a new ledger holding only the genesis block
    pub fn new() -> Self {
        Ledger {
            chain: vec![Block::genesis()],
            accounts: KeyRegistry::new(),
        }
    }

    /// Registers an account with a fresh key pair
    pub fn add_account(&mut self, name: &str, initial_balance: u64) -> Result<(), BlockchainError> {
        self.accounts.add_account(name, initial_balance)?;
        Ok(())
    }

    /// Gets an account's balance
    pub fn get_balance(&self, name: &str) -> Result<u64, BlockchainError> {
        Ok(self.accounts.get_balance(name)?)
    }

    /// Checks whether an account exists
    pub fn has_account(&self, name: &str) -> bool {
        self.accounts.has_account(name)
    }

    /// Gets the account registry
    pub fn accounts(&self) -> &KeyRegistry {
        &self.accounts
    }

    /// Gets the entire chain
    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// Number of blocks, genesis included
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Always false: the genesis block is created with the ledger
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Gets the last block in the chain
    pub fn get_last_block(&self) -> &Block {
        &self.chain[self.chain.len() - 1]
    }

    /// Wraps entries into a new block chained to the current tail.
    ///
    /// The entries are assumed to have been validated already.
    pub fn append(&mut self, transactions: Vec<BlockEntry>) -> &Block {
        let previous = self.get_last_block();
        let block = Block::new(
            previous.index() + 1,
            transactions,
            previous.hash().to_string(),
        );

        debug!("Appending block {} ({})", block.index(), block.hash());
        self.chain.push(block);
        self.get_last_block()
    }

    /// Transfers `amount` Olives from `sender` to `receiver`.
    ///
    /// The transaction is signed with the sender's key, checked against the
    /// attached public key, and only then are the balances moved and a block
    /// appended. Any failure leaves balances and chain untouched.
    pub fn make_transaction(
        &mut self,
        sender: &str,
        receiver: &str,
        amount: u64,
    ) -> Result<&Block, BlockchainError> {
        if amount == 0 {
            return Err(TransactionError::InvalidAmount(
                "Amount must be positive".to_string(),
            )
            .into());
        }

        // Lookup
        let sender_account = self.accounts.get_account(sender)?;
        self.accounts.get_account(receiver)?;

        // Balance check
        if !sender_account.has_sufficient_funds(amount) {
            warn!(
                "Transaction failed: {} has {} Olives, needs {}",
                sender,
                sender_account.balance(),
                amount
            );
            return Err(AccountError::InsufficientFunds {
                account: sender.to_string(),
                required: amount,
                available: sender_account.balance(),
            }
            .into());
        }

        // Build, sign and attach
        let mut transaction = Transaction::new(sender, receiver, amount);
        let signature = self
            .accounts
            .sign_as(sender, &transaction.canonical_bytes())?;
        let public_key = self.accounts.public_key_pem(sender)?;
        transaction.attach_signature(signature, public_key);

        self.commit_transaction(transaction)
    }

    /// Self-verifies a signed transaction, then moves the balances and appends its block
    fn commit_transaction(&mut self, transaction: Transaction) -> Result<&Block, BlockchainError> {
        if !transaction.verify_signature() {
            warn!(
                "Transaction signature invalid for {} -> {}",
                transaction.sender, transaction.receiver
            );
            return Err(TransactionError::SignatureInvalid.into());
        }

        self.accounts
            .transfer(&transaction.sender, &transaction.receiver, transaction.amount)?;

        info!(
            "Transaction {} -> {} of {} Olives committed",
            transaction.sender, transaction.receiver, transaction.amount
        );

        Ok(self.append(vec![BlockEntry::Transfer(transaction)]))
    }

    /// Walks blocks 1..N and reports the first inconsistency.
    ///
    /// Each block's stored hash must match a recomputation over its current
    /// fields, and its previous hash must equal its predecessor's stored hash.
    /// The genesis block is trusted as-is.
    pub fn validate_chain(&self) -> Result<(), ChainViolation> {
        for (index, pair) in self.chain.windows(2).enumerate() {
            let (previous_block, current_block) = (&pair[0], &pair[1]);
            let index = index + 1;

            if !current_block.has_valid_hash() {
                return Err(ChainViolation::HashMismatch { index });
            }

            if current_block.previous_hash() != previous_block.hash() {
                return Err(ChainViolation::BrokenLink { index });
            }
        }

        Ok(())
    }

    /// Validates the blockchain
    ///
    /// # Returns
    ///
    /// true if the blockchain is valid, false otherwise
    pub fn is_chain_valid(&self) -> bool {
        match self.validate_chain() {
            Ok(()) => true,
            Err(violation) => {
                warn!("Chain is invalid: {}", violation);
                false
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.chain
    }
}

/// A ledger shared between callers.
///
/// Every operation holds the one lock for its whole duration, so a transfer's
/// balance check and its commit can never interleave with another writer.
#[derive(Debug, Clone, Default)]
pub struct SharedLedger {
    inner: Arc<Mutex<Ledger>>,
}

impl SharedLedger {
    /// Wraps an existing ledger
    pub fn new(ledger: Ledger) -> Self {
        SharedLedger {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    /// Locks the ledger for a sequence of operations
    pub fn lock(&self) -> MutexGuard<'_, Ledger> {
        // Operations never panic midway through a commit
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs [`Ledger::make_transaction`] under the lock
    ///
    /// # Returns
    ///
    /// The index of the block holding the transaction
    pub fn make_transaction(
        &self,
        sender: &str,
        receiver: &str,
        amount: u64,
    ) -> Result<u64, BlockchainError> {
        let mut ledger = self.lock();
        let block = ledger.make_transaction(sender, receiver, amount)?;
        Ok(block.index())
    }

    /// Runs [`Ledger::is_chain_valid`] under the lock
    pub fn is_chain_valid(&self) -> bool {
        self.lock().is_chain_valid()
    }
}
