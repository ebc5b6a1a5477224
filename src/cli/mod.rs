// CLI module
//
// This module contains the interactive menu that drives the ledger

pub mod commands;
pub mod menu;

// Re-export main components for easier access
pub use commands::{execute, Command, Flow};
pub use menu::run;
