use anyhow::{Context, Result};
use log::info;

use std::io;

use olives_ledger::blockchain::Ledger;
use olives_ledger::cli;

/// Log filter used when RUST_LOG is not set; stdout belongs to the menu
const DEFAULT_LOG_FILTER: &str = "warn";

fn main() -> Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(DEFAULT_LOG_FILTER));

    let mut ledger = Ledger::new();
    info!(
        "Ledger initialized with genesis block {}",
        ledger.get_last_block().hash()
    );

    let stdin = io::stdin();
    let stdout = io::stdout();

    cli::run(&mut ledger, stdin.lock(), stdout.lock()).context("terminal I/O failed")?;

    Ok(())
}
