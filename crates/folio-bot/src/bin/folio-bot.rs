//! Console entry point
//!
//! Runs the bot against the built-in local analytics engine with a
//! terminal REPL as the chat platform. Lines starting with `@` are
//! treated as inline-button taps (the console adapter prints each
//! button's token).

use folio_bot::collaborators::{CannedAnalyst, LocalAnalytics, LocalChartRenderer, OpenAiAnalyst};
use folio_bot::platforms::ConsolePort;
use folio_bot::{BotConfig, FolioBot};
use folio_core::{AiAnalyst, Result};
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const USER_ID: &str = "console";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = BotConfig::from_env()?;
    let analyst: Arc<dyn AiAnalyst> = match &config.ai {
        Some(ai) => Arc::new(OpenAiAnalyst::new(ai.clone())?),
        None => Arc::new(CannedAnalyst),
    };

    let bot = FolioBot::new(
        config,
        Arc::new(LocalAnalytics),
        Arc::new(LocalChartRenderer),
        analyst,
        Arc::new(ConsolePort::new()),
    );

    println!("folio-bot console. /help for commands, `@token` taps a button, `exit` quits.");
    repl(&bot).await?;
    Ok(())
}

async fn repl(bot: &FolioBot) -> Result<()> {
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        if let Some(token) = line.strip_prefix('@') {
            bot.on_callback(USER_ID, token, None).await?;
        } else {
            bot.on_text(USER_ID, line).await?;
        }
    }
    Ok(())
}
