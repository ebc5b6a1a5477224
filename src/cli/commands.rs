use chrono::DateTime;
use log::debug;

use std::io::{self, Write};

use crate::blockchain::{Block, Ledger, CURRENCY};

/// A single user request, already parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddAccount { name: String, balance: u64 },
    ShowAccounts,
    MakeTransaction {
        sender: String,
        receiver: String,
        amount: u64,
    },
    ShowChain,
    CheckValidity,
    Exit,
}

/// Whether the menu loop should keep going after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Runs a command against the ledger and writes its outcome.
///
/// Ledger failures are reported to `out` and never end the session; only
/// write errors on `out` are returned.
pub fn execute<W: Write>(ledger: &mut Ledger, command: &Command, out: &mut W) -> io::Result<Flow> {
    debug!("Executing {:?}", command);

    match command {
        Command::AddAccount { name, balance } => add_account(ledger, name, *balance, out)?,
        Command::ShowAccounts => show_accounts(ledger, out)?,
        Command::MakeTransaction {
            sender,
            receiver,
            amount,
        } => make_transaction(ledger, sender, receiver, *amount, out)?,
        Command::ShowChain => show_chain(ledger, out)?,
        Command::CheckValidity => check_validity(ledger, out)?,
        Command::Exit => return Ok(Flow::Exit),
    }

    Ok(Flow::Continue)
}

/// Add an account with a fresh key pair
pub fn add_account<W: Write>(ledger: &mut Ledger, name: &str, balance: u64, out: &mut W) -> io::Result<()> {
    match ledger.add_account(name, balance) {
        Ok(()) => writeln!(out, "Account {} added with {} {}", name, balance, CURRENCY),
        Err(err) => writeln!(out, "Error: {}", err),
    }
}

/// List every account with its balance, in creation order
pub fn show_accounts<W: Write>(ledger: &Ledger, out: &mut W) -> io::Result<()> {
    writeln!(out, "\n--- Account Balances ---")?;
    for account in ledger.accounts().accounts() {
        writeln!(out, "{}: {} {}", account.name(), account.balance(), CURRENCY)?;
    }
    writeln!(out, "------------------------\n")
}

/// Transfer funds and report the block it landed in
pub fn make_transaction<W: Write>(
    ledger: &mut Ledger,
    sender: &str,
    receiver: &str,
    amount: u64,
    out: &mut W,
) -> io::Result<()> {
    match ledger.make_transaction(sender, receiver, amount) {
        Ok(block) => writeln!(
            out,
            "Transaction successful and added to block {}",
            block.index()
        ),
        Err(err) => writeln!(out, "Transaction failed: {}", err),
    }
}

/// Print every block of the chain
pub fn show_chain<W: Write>(ledger: &Ledger, out: &mut W) -> io::Result<()> {
    for block in ledger.chain() {
        write_block(block, out)?;
    }
    Ok(())
}

fn write_block<W: Write>(block: &Block, out: &mut W) -> io::Result<()> {
    let timestamp = DateTime::from_timestamp_micros(block.timestamp())
        .map(|time| time.to_rfc3339())
        .unwrap_or_else(|| block.timestamp().to_string());

    writeln!(out, "Index: {}", block.index())?;
    writeln!(out, "Timestamp: {}", timestamp)?;
    writeln!(out, "Transactions: {}", serde_json::to_string(block.transactions())?)?;
    writeln!(out, "Hash: {}", block.hash())?;
    writeln!(out, "Previous Hash: {}\n", block.previous_hash())
}

/// Report whether the chain is internally consistent
pub fn check_validity<W: Write>(ledger: &Ledger, out: &mut W) -> io::Result<()> {
    writeln!(out, "Is blockchain valid? {}", ledger.is_chain_valid())
}
