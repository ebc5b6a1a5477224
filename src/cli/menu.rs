use log::info;
use thiserror::Error;

use std::io::{self, BufRead, Write};

use super::commands::{self, Command, Flow};
use crate::blockchain::Ledger;

/// Menu entries, in display order
pub const MENU_OPTIONS: [(&str, &str); 6] = [
    ("1", "Add Account"),
    ("2", "Show Accounts"),
    ("3", "Make Transaction"),
    ("4", "Show Blockchain"),
    ("5", "Check Validity"),
    ("6", "Exit"),
];

/// Problems with what the user typed
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Invalid choice. Try again.")]
    InvalidChoice(String),

    #[error("Invalid number: {0:?}")]
    InvalidNumber(String),

    #[error("Input is not valid UTF-8")]
    InvalidEncoding,

    #[error("Account name cannot be empty")]
    EmptyName,

    #[error("End of input")]
    EndOfInput,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Line-oriented prompt over any reader/writer pair
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Prompter { input, output }
    }

    /// Writes `label` and reads one trimmed line
    pub fn prompt(&mut self, label: &str) -> Result<String, InputError> {
        write!(self.output, "{}", label)?;
        self.output.flush()?;

        let mut buf = Vec::new();
        if self.input.read_until(b'\n', &mut buf)? == 0 {
            return Err(InputError::EndOfInput);
        }

        let line = String::from_utf8(buf).map_err(|_| InputError::InvalidEncoding)?;
        Ok(line.trim().to_string())
    }

    fn prompt_name(&mut self, label: &str) -> Result<String, InputError> {
        let name = self.prompt(label)?;
        if name.is_empty() {
            return Err(InputError::EmptyName);
        }
        Ok(name)
    }

    fn prompt_number(&mut self, label: &str) -> Result<u64, InputError> {
        let raw = self.prompt(label)?;
        raw.parse().map_err(|_| InputError::InvalidNumber(raw))
    }

    /// Gives access to the output side
    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }
}

/// Writes the menu
pub fn print_menu<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "\n--- Olives Blockchain Menu ---")?;
    for (key, label) in MENU_OPTIONS {
        writeln!(out, "{}. {}", key, label)?;
    }
    Ok(())
}

/// Reads a menu choice plus whatever arguments it needs
pub fn read_command<R: BufRead, W: Write>(prompter: &mut Prompter<R, W>) -> Result<Command, InputError> {
    let choice = prompter.prompt("Enter your choice: ")?;

    let command = match choice.as_str() {
        "1" => {
            let name = prompter.prompt_name("Enter account name: ")?;
            let balance = prompter.prompt_number("Enter starting balance: ")?;
            Command::AddAccount { name, balance }
        }
        "2" => Command::ShowAccounts,
        "3" => {
            let sender = prompter.prompt_name("Sender: ")?;
            let receiver = prompter.prompt_name("Receiver: ")?;
            let amount = prompter.prompt_number("Amount of Olives: ")?;
            Command::MakeTransaction {
                sender,
                receiver,
                amount,
            }
        }
        "4" => Command::ShowChain,
        "5" => Command::CheckValidity,
        "6" => Command::Exit,
        _ => return Err(InputError::InvalidChoice(choice)),
    };

    Ok(command)
}

/// Runs the interactive menu until Exit or end of input
pub fn run<R: BufRead, W: Write>(ledger: &mut Ledger, input: R, output: W) -> io::Result<()> {
    let mut prompter = Prompter::new(input, output);

    loop {
        print_menu(prompter.output())?;

        match read_command(&mut prompter) {
            Ok(command) => {
                if commands::execute(ledger, &command, prompter.output())? == Flow::Exit {
                    break;
                }
            }
            Err(InputError::EndOfInput) => break,
            Err(InputError::Io(err)) => return Err(err),
            Err(err) => writeln!(prompter.output(), "{}", err)?,
        }
    }

    info!("Session ended with {} blocks", ledger.len());
    Ok(())
}
