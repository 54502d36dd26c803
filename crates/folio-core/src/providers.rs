//! Trait seams for the external collaborators
//!
//! The bot core never computes financial metrics, renders charts,
//! writes AI prompts or talks to a chat platform directly. It consumes
//! all four through the narrow interfaces defined here, which keeps
//! the state machine testable with mocks.

use crate::context::KeyboardKind;
use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque reference to a live computational object owned by the
/// analytics engine.
///
/// The core treats it as a token: it can be cached, dropped and
/// rebuilt, but never inspected. Engine implementations downcast to
/// their own inner type.
#[derive(Clone)]
pub struct EngineHandle(Arc<dyn Any + Send + Sync>);

impl EngineHandle {
    pub fn new<T: Any + Send + Sync>(inner: T) -> Self {
        Self(Arc::new(inner))
    }

    /// Downcast to the engine's concrete type
    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EngineHandle(..)")
    }
}

/// A metrics table produced by the analytics engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsTable {
    /// Column headers, one per instrument or basket
    pub columns: Vec<String>,
    /// Metric rows
    pub rows: Vec<MetricsRow>,
}

/// One metric across all columns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsRow {
    pub metric: String,
    pub values: Vec<String>,
}

/// A historical price series for a single instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

/// Chart flavor requested from the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Wealth,
    Drawdowns,
    Dividends,
}

/// What the renderer should draw from
#[derive(Debug, Clone)]
pub enum ChartSource {
    /// A live portfolio handle
    Handle(EngineHandle),
    /// One series per compared instrument
    Series(Vec<PriceSeries>),
}

/// The financial analytics collaborator
#[async_trait]
pub trait AnalyticsEngine: Send + Sync {
    /// Whether the engine recognizes the symbol at all
    async fn resolve_symbol(&self, symbol: &str) -> Result<bool>;

    /// Build a live portfolio object for a weighted basket
    async fn build_portfolio(
        &self,
        symbols: &[String],
        weights: &[f64],
        currency: &str,
    ) -> Result<EngineHandle>;

    /// Summary metrics for a built portfolio
    async fn describe(&self, handle: &EngineHandle) -> Result<MetricsTable>;

    /// Historical prices for a single instrument
    async fn price_series(&self, symbol: &str) -> Result<PriceSeries>;

    /// Accumulated wealth series of a built portfolio, so baskets can
    /// be charted next to plain instruments
    async fn portfolio_series(&self, handle: &EngineHandle) -> Result<PriceSeries>;
}

/// The chart rasterization collaborator
#[async_trait]
pub trait ChartRenderer: Send + Sync {
    /// Render image bytes for the given source and chart kind
    async fn render(&self, source: &ChartSource, kind: ChartKind) -> Result<Vec<u8>>;
}

/// The AI commentary collaborator
#[async_trait]
pub trait AiAnalyst: Send + Sync {
    /// Produce commentary text for structured analysis data
    async fn analyze(&self, data: &serde_json::Value) -> Result<String>;
}

/// One inline button attached to a single message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    /// Bounded opaque callback token, see [`crate::callback`]
    pub token: String,
}

/// Inline keyboard rows attached to one message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    pub fn row(mut self, buttons: Vec<InlineButton>) -> Self {
        self.rows.push(buttons);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }
}

/// Platform reference to a delivered message, used for markup edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef(pub i64);

/// The chat platform adapter surface
#[async_trait]
pub trait ChatPort: Send + Sync {
    async fn send_text(&self, user_id: &str, text: &str) -> Result<()>;

    async fn send_image(&self, user_id: &str, image: &[u8], caption: &str) -> Result<()>;

    /// Send text with an inline keyboard, returning the message ref so
    /// its markup can be edited later
    async fn send_with_buttons(
        &self,
        user_id: &str,
        text: &str,
        keyboard: &InlineKeyboard,
    ) -> Result<MessageRef>;

    /// Attach a persistent reply keyboard to the conversation
    async fn show_reply_keyboard(
        &self,
        user_id: &str,
        kind: KeyboardKind,
        rows: &[Vec<String>],
    ) -> Result<()>;

    /// Remove any persistent reply keyboard from the conversation
    async fn hide_reply_keyboard(&self, user_id: &str) -> Result<()>;

    /// Replace or remove the inline keyboard of an already sent message
    async fn edit_reply_markup(
        &self,
        user_id: &str,
        message: MessageRef,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_handle_downcast() {
        let handle = EngineHandle::new(vec![1u32, 2, 3]);
        assert_eq!(handle.downcast_ref::<Vec<u32>>().map(Vec::len), Some(3));
        assert!(handle.downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_inline_keyboard_builder() {
        let kb = InlineKeyboard::default().row(vec![InlineButton {
            label: "Wealth".to_string(),
            token: "wl".to_string(),
        }]);
        assert!(!kb.is_empty());
        assert_eq!(kb.rows[0][0].token, "wl");
    }
}
