//! Conversational context and interactive state machine for a
//! financial-analysis chat bot.
//!
//! This crate owns everything about *what each user is doing right
//! now* across many interleaved conversations:
//!
//! - [`store::ContextStore`]: keyed, mutable session state per user
//! - [`dialog::DialogController`]: the two-turn "ask then consume"
//!   pattern and the free-text classifier
//! - [`keyboard::KeyboardManager`]: the mutually-exclusive persistent
//!   keyboard lifecycle
//! - [`callback::CallbackRouter`]: inline-button token decoding and
//!   context disambiguation
//! - [`registry::PortfolioRegistry`]: stable bot-assigned portfolio
//!   identifiers that survive engine-handle rebuilds
//! - [`pagination`]: page slicing with per-namespace page memory
//!
//! Financial math, chart rendering, AI commentary and the chat
//! transport are external collaborators behind the [`providers`]
//! traits.

pub mod callback;
pub mod context;
pub mod dialog;
pub mod error;
pub mod keyboard;
pub mod pagination;
pub mod portfolio;
pub mod providers;
pub mod registry;
pub mod store;

pub use callback::{Action, CallbackRouter, CallbackTarget, CallbackToken};
pub use context::{
    AnalysisKind, ContextField, ContextPatch, DialogKind, KeyboardKind, PendingDialog,
    UserContext,
};
pub use dialog::{classify, Classified, DialogController, RoutedText};
pub use error::{FolioError, Result};
pub use keyboard::{KeyboardManager, KeyboardOp};
pub use pagination::{page, page_items, PageNav, PageSlice};
pub use portfolio::{is_portfolio_id, PortfolioRecord, WeightedSymbol};
pub use providers::{
    AiAnalyst, AnalyticsEngine, ChartKind, ChartRenderer, ChartSource, ChatPort, EngineHandle,
    InlineButton, InlineKeyboard, MessageRef, MetricsTable, MetricsRow, PriceSeries,
};
pub use registry::{CreatedPortfolio, PortfolioRegistry};
pub use store::ContextStore;
