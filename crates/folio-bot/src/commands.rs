//! Slash-command parsing
//!
//! Commands with missing arguments are not errors: the bot answers by
//! arming a dialog prompt and consuming the next message as the input.

use folio_core::dialog::normalize_token;
use folio_core::{FolioError, Result};

/// Parsed command from user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// Look up a single asset; no symbol arms the info dialog
    Info { symbol: Option<String> },
    /// Compare assets/portfolios; empty list arms the compare dialog
    Compare { tokens: Vec<String> },
    /// Build a weighted portfolio; empty list arms the portfolio dialog
    Portfolio { tokens: Vec<String> },
    /// Paginated listing of saved portfolios
    Portfolios,
    /// Show or set the active currency
    Currency { code: Option<String> },
    /// Show or set the active analysis period
    Period { value: Option<String> },
    /// Reset the whole context
    Clear,
    /// Not a command: free text for the dialog controller
    Text { text: String },
}

impl Command {
    /// Parse a command from user input
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        if input.is_empty() {
            return Err(FolioError::InvalidInput("empty input".to_string()));
        }

        if !input.starts_with('/') {
            return Ok(Command::Text {
                text: input.to_string(),
            });
        }

        let mut parts = input[1..].split_whitespace();
        let cmd = parts
            .next()
            .ok_or_else(|| FolioError::InvalidInput("empty command".to_string()))?
            .to_lowercase();
        let args: Vec<String> = parts.map(normalize_token).collect();

        match cmd.as_str() {
            "start" => Ok(Command::Start),
            "help" | "h" | "?" => Ok(Command::Help),
            "info" | "i" => Ok(Command::Info {
                symbol: args.into_iter().next(),
            }),
            "compare" | "cmp" | "c" => Ok(Command::Compare { tokens: args }),
            "portfolio" | "pf" | "p" => Ok(Command::Portfolio { tokens: args }),
            "portfolios" | "list" | "my" => Ok(Command::Portfolios),
            "currency" | "cur" => Ok(Command::Currency {
                code: args.into_iter().next(),
            }),
            "period" => Ok(Command::Period {
                value: args.into_iter().next(),
            }),
            "clear" | "cls" => Ok(Command::Clear),
            _ => Err(FolioError::InvalidInput(format!("unknown command: /{cmd}"))),
        }
    }
}
