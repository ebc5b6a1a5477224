//! A minimal signed-transaction ledger.
//!
//! Accounts hold Olives and an Ed25519 key pair. Every transfer is signed by
//! the sender, checked, and recorded in its own hash-linked block.

pub mod blockchain;
pub mod cli;
