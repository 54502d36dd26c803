//! Per-user conversational context
//!
//! One [`UserContext`] per user, holding everything the bot knows
//! about what that user is doing right now: the active comparison,
//! saved portfolios, the single outstanding dialog prompt, the visible
//! reply keyboard and per-namespace pagination positions.

use crate::portfolio::PortfolioRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Bound on the recent-history list of inspected symbols
pub const MAX_ANALYZED_TICKERS: usize = 10;

/// Which kind of result was most recently produced for the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisKind {
    Comparison,
    Portfolio,
}

/// Persistent reply keyboard families; exactly one (or none) is
/// visible per user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KeyboardKind {
    #[default]
    Hidden,
    Comparison,
    Portfolio,
}

/// What kind of free-form input the bot asked for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogKind {
    /// Waiting for a list of symbols to compare
    Compare,
    /// Waiting for a weighted symbol list to build a portfolio
    Portfolio,
    /// Waiting for a single symbol to look up; when `base_symbol` is
    /// set the reply is compared against it
    Info { base_symbol: Option<String> },
}

/// The single outstanding two-turn prompt, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDialog {
    pub kind: DialogKind,
    pub begun_at: DateTime<Utc>,
}

/// Session state for one user.
///
/// Created lazily with defaults on first interaction; lives for the
/// process lifetime or until an explicit clear.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserContext {
    /// Canonical references (tickers or portfolio ids) of the active
    /// comparison
    pub current_symbols: Vec<String>,
    /// Render labels matching `current_symbols`; never written back as
    /// identifiers
    pub display_symbols: Vec<String>,
    pub current_currency: Option<String>,
    pub current_period: Option<String>,
    pub last_analysis_type: Option<AnalysisKind>,
    /// Saved portfolios keyed by bot-assigned id
    pub saved_portfolios: HashMap<String, PortfolioRecord>,
    /// Recently inspected symbols, oldest evicted first
    pub analyzed_tickers: VecDeque<String>,
    /// Written only by the keyboard lifecycle manager
    pub active_reply_keyboard: KeyboardKind,
    /// At most one outstanding prompt
    pub dialog_state: Option<PendingDialog>,
    /// Last-viewed page index per result-set namespace
    pub pagination: HashMap<String, usize>,
    /// Monotonic portfolio id counter; never reset by deletion
    pub portfolio_seq: u64,
}

impl UserContext {
    /// Record that the user inspected a symbol, evicting the oldest
    /// entry beyond the bound
    pub fn note_analyzed(&mut self, symbol: &str) {
        if let Some(pos) = self.analyzed_tickers.iter().position(|s| s == symbol) {
            self.analyzed_tickers.remove(pos);
        }
        self.analyzed_tickers.push_back(symbol.to_string());
        while self.analyzed_tickers.len() > MAX_ANALYZED_TICKERS {
            self.analyzed_tickers.pop_front();
        }
    }

    /// Whether a comparison with usable data is active
    pub fn has_comparison_context(&self) -> bool {
        !self.current_symbols.is_empty()
    }

    /// Whether at least one saved portfolio exists
    pub fn has_portfolio_context(&self) -> bool {
        !self.saved_portfolios.is_empty()
    }

    /// Id of the most recently created portfolio, if any
    pub fn latest_portfolio_id(&self) -> Option<String> {
        self.saved_portfolios
            .values()
            .max_by_key(|record| record.seq())
            .map(|record| record.id.clone())
    }
}

/// Fields that `ContextStore::clear` can reset individually
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextField {
    Comparison,
    Currency,
    Period,
    LastAnalysis,
    Portfolios,
    AnalyzedTickers,
    Dialog,
    Pagination,
}

/// Merge patch for `ContextStore::update`; unset fields are left
/// untouched, set fields win last-write.
///
/// Keyboard, dialog, portfolio and pagination state are deliberately
/// absent: those fields are written only through their owning
/// components.
#[derive(Debug, Clone, Default)]
pub struct ContextPatch {
    pub current_symbols: Option<Vec<String>>,
    pub display_symbols: Option<Vec<String>>,
    pub current_currency: Option<Option<String>>,
    pub current_period: Option<Option<String>>,
    pub last_analysis_type: Option<Option<AnalysisKind>>,
}

impl ContextPatch {
    pub fn symbols(mut self, current: Vec<String>, display: Vec<String>) -> Self {
        self.current_symbols = Some(current);
        self.display_symbols = Some(display);
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.current_currency = Some(Some(currency.into()));
        self
    }

    pub fn period(mut self, period: impl Into<String>) -> Self {
        self.current_period = Some(Some(period.into()));
        self
    }

    pub fn last_analysis(mut self, kind: AnalysisKind) -> Self {
        self.last_analysis_type = Some(Some(kind));
        self
    }

    /// Apply the patch, last write wins per field
    pub fn apply(self, ctx: &mut UserContext) {
        if let Some(symbols) = self.current_symbols {
            ctx.current_symbols = symbols;
        }
        if let Some(display) = self.display_symbols {
            ctx.display_symbols = display;
        }
        if let Some(currency) = self.current_currency {
            ctx.current_currency = currency;
        }
        if let Some(period) = self.current_period {
            ctx.current_period = period;
        }
        if let Some(kind) = self.last_analysis_type {
            ctx.last_analysis_type = kind;
        }
    }
}
