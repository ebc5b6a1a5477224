use log::{debug, info};
use thiserror::Error;

use std::collections::HashMap;

use super::crypto::{CryptoError, DigitalSignature, KeyPair, PublicKeyPem};

/// Errors that can occur during account operations
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Account already exists: {0}")]
    DuplicateAccount(String),

    #[error("Account not found: {0}")]
    UnknownAccount(String),

    #[error("Insufficient funds in {account}: required {required}, available {available}")]
    InsufficientFunds {
        account: String,
        required: u64,
        available: u64,
    },

    #[error("Balance overflow for account: {0}")]
    BalanceOverflow(String),

    #[error("Key error: {0}")]
    KeyError(#[from] CryptoError),
}

/// Represents an account in the ledger
#[derive(Debug)]
pub struct Account {
    name: String,
    balance: u64,
    keys: KeyPair,
}

impl Account {
    /// Creates a new account with a freshly generated key pair
    pub fn new(name: &str, balance: u64) -> Result<Self, AccountError> {
        Ok(Account {
            name: name.to_string(),
            balance,
            keys: KeyPair::generate()?,
        })
    }

    /// The account's unique name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The account's balance in Olives
    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// Exports the account's public key as PEM
    pub fn public_key_pem(&self) -> Result<PublicKeyPem, AccountError> {
        Ok(self.keys.public_key_pem()?)
    }

    /// Checks if the account has sufficient funds
    pub fn has_sufficient_funds(&self, amount: u64) -> bool {
        self.balance >= amount
    }
}

/// Holds every account's balance and key pair, keyed by name
#[derive(Debug, Default)]
pub struct KeyRegistry {
    accounts: HashMap<String, Account>,

    /// Names in creation order, for listings
    order: Vec<String>,
}

impl KeyRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        KeyRegistry::default()
    }

    /// Adds an account, generating its key pair
    pub fn add_account(&mut self, name: &str, initial_balance: u64) -> Result<(), AccountError> {
        if self.accounts.contains_key(name) {
            return Err(AccountError::DuplicateAccount(name.to_string()));
        }

        let account = Account::new(name, initial_balance)?;
        self.accounts.insert(name.to_string(), account);
        self.order.push(name.to_string());

        info!("Account {} added with {} Olives", name, initial_balance);
        Ok(())
    }

    /// Checks whether an account exists
    pub fn has_account(&self, name: &str) -> bool {
        self.accounts.contains_key(name)
    }

    /// Gets an account by name
    pub fn get_account(&self, name: &str) -> Result<&Account, AccountError> {
        self.accounts
            .get(name)
            .ok_or_else(|| AccountError::UnknownAccount(name.to_string()))
    }

    /// Gets an account's balance
    pub fn get_balance(&self, name: &str) -> Result<u64, AccountError> {
        self.get_account(name).map(Account::balance)
    }

    /// Applies a signed delta to an account's balance.
    ///
    /// The balance is left untouched if the result would be negative or overflow.
    pub fn adjust_balance(&mut self, name: &str, delta: i64) -> Result<u64, AccountError> {
        let account = self
            .accounts
            .get_mut(name)
            .ok_or_else(|| AccountError::UnknownAccount(name.to_string()))?;

        let updated = if delta < 0 {
            account
                .balance
                .checked_sub(delta.unsigned_abs())
                .ok_or_else(|| AccountError::InsufficientFunds {
                    account: name.to_string(),
                    required: delta.unsigned_abs(),
                    available: account.balance,
                })?
        } else {
            account
                .balance
                .checked_add(delta.unsigned_abs())
                .ok_or_else(|| AccountError::BalanceOverflow(name.to_string()))?
        };

        account.balance = updated;
        debug!("Balance of {} adjusted by {} to {}", name, delta, updated);
        Ok(updated)
    }

    /// Moves funds between two accounts.
    ///
    /// Both balances are computed before either is written, so the debit and
    /// the credit land together or not at all.
    pub fn transfer(&mut self, from: &str, to: &str, amount: u64) -> Result<(), AccountError> {
        let sender = self.get_account(from)?;
        let recipient = self.get_account(to)?;

        if !sender.has_sufficient_funds(amount) {
            return Err(AccountError::InsufficientFunds {
                account: from.to_string(),
                required: amount,
                available: sender.balance,
            });
        }

        let sender_balance = sender.balance - amount;
        let recipient_balance = if from == to {
            sender.balance
        } else {
            recipient
                .balance
                .checked_add(amount)
                .ok_or_else(|| AccountError::BalanceOverflow(to.to_string()))?
        };

        if let Some(account) = self.accounts.get_mut(from) {
            account.balance = sender_balance;
        }
        if let Some(account) = self.accounts.get_mut(to) {
            account.balance = recipient_balance;
        }

        Ok(())
    }

    /// Signs a message on behalf of an account without exposing its private key
    pub fn sign_as(&self, name: &str, message: &[u8]) -> Result<DigitalSignature, AccountError> {
        Ok(self.get_account(name)?.keys.sign(message)?)
    }

    /// Exports an account's public key as PEM
    pub fn public_key_pem(&self, name: &str) -> Result<PublicKeyPem, AccountError> {
        self.get_account(name)?.public_key_pem()
    }

    /// Iterates over accounts in creation order
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.order.iter().filter_map(|name| self.accounts.get(name))
    }

    /// Number of registered accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Checks whether no account has been registered
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
