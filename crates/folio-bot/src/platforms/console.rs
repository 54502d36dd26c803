//! Console chat adapter
//!
//! Renders outbound messages to stdout so the whole bot can be driven
//! from a terminal. Inline buttons are printed with their callback
//! tokens; typing `@token` in the REPL simulates a tap.

use async_trait::async_trait;
use folio_core::{ChatPort, InlineKeyboard, KeyboardKind, MessageRef, Result};
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug, Default)]
pub struct ConsolePort {
    next_message_id: AtomicI64,
}

impl ConsolePort {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_ref(&self) -> MessageRef {
        MessageRef(self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn print_keyboard(keyboard: &InlineKeyboard) {
        for row in &keyboard.rows {
            let cells: Vec<String> = row
                .iter()
                .map(|b| format!("[{} @{}]", b.label, b.token))
                .collect();
            println!("  {}", cells.join(" "));
        }
    }
}

#[async_trait]
impl ChatPort for ConsolePort {
    async fn send_text(&self, _user_id: &str, text: &str) -> Result<()> {
        println!("{text}");
        Ok(())
    }

    async fn send_image(&self, _user_id: &str, image: &[u8], caption: &str) -> Result<()> {
        println!("[image, {} bytes] {caption}", image.len());
        Ok(())
    }

    async fn send_with_buttons(
        &self,
        _user_id: &str,
        text: &str,
        keyboard: &InlineKeyboard,
    ) -> Result<MessageRef> {
        println!("{text}");
        Self::print_keyboard(keyboard);
        Ok(self.next_ref())
    }

    async fn show_reply_keyboard(
        &self,
        _user_id: &str,
        kind: KeyboardKind,
        rows: &[Vec<String>],
    ) -> Result<()> {
        println!("--- keyboard: {kind:?} ---");
        for row in rows {
            println!("  {}", row.join("  |  "));
        }
        Ok(())
    }

    async fn hide_reply_keyboard(&self, _user_id: &str) -> Result<()> {
        println!("--- keyboard hidden ---");
        Ok(())
    }

    async fn edit_reply_markup(
        &self,
        _user_id: &str,
        message: MessageRef,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<()> {
        match keyboard {
            Some(keyboard) => {
                println!("[message {} buttons updated]", message.0);
                Self::print_keyboard(keyboard);
            }
            None => println!("[message {} buttons removed]", message.0),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_message_refs_are_unique() {
        let port = ConsolePort::new();
        let kb = InlineKeyboard::default();
        let a = port.send_with_buttons("u1", "one", &kb).await.unwrap();
        let b = port.send_with_buttons("u1", "two", &kb).await.unwrap();
        assert_ne!(a, b);
    }
}
