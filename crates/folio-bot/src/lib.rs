//! Financial-analysis chat bot built on the `folio-core` state
//! machine.
//!
//! This crate supplies everything around the core: slash-command
//! parsing, the orchestrator that wires dialogs, keyboards, callbacks
//! and the portfolio registry to the external collaborators, message
//! formatting, the built-in local analytics/chart collaborators, the
//! OpenAI commentary client and the console platform adapter.

pub mod bot;
pub mod collaborators;
pub mod commands;
pub mod config;
pub mod format;
pub mod handlers;
pub mod platforms;

pub use bot::FolioBot;
pub use commands::Command;
pub use config::{AiConfig, BotConfig};
