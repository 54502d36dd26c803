//! Bot orchestrator
//!
//! Wires the context core to the external collaborators. `on_text`
//! and `on_callback` are the only entry points the platform adapter
//! calls, and they form the error boundary: every handler failure is
//! converted into a user-facing message naming the corrective
//! command(s).

use crate::commands::Command;
use crate::config::BotConfig;
use crate::format;
use folio_core::dialog::normalize_token;
use folio_core::keyboard::{self, action_for_label};
use folio_core::{
    AiAnalyst, AnalyticsEngine, CallbackRouter, ChartRenderer, ChatPort, Classified,
    ContextField, ContextPatch, ContextStore, DialogController, DialogKind, FolioError,
    KeyboardKind, KeyboardManager, KeyboardOp, MessageRef, PortfolioRegistry, Result,
    RoutedText, UserContext,
};
use std::sync::Arc;

pub struct FolioBot {
    pub(crate) store: Arc<ContextStore>,
    pub(crate) dialogs: DialogController,
    pub(crate) keyboards: KeyboardManager,
    pub(crate) router: CallbackRouter,
    pub(crate) registry: PortfolioRegistry,
    pub(crate) engine: Arc<dyn AnalyticsEngine>,
    pub(crate) charts: Arc<dyn ChartRenderer>,
    pub(crate) analyst: Arc<dyn AiAnalyst>,
    pub(crate) port: Arc<dyn ChatPort>,
    pub(crate) config: BotConfig,
}

impl FolioBot {
    pub fn new(
        config: BotConfig,
        engine: Arc<dyn AnalyticsEngine>,
        charts: Arc<dyn ChartRenderer>,
        analyst: Arc<dyn AiAnalyst>,
        port: Arc<dyn ChatPort>,
    ) -> Self {
        let store = Arc::new(ContextStore::new());
        Self {
            dialogs: DialogController::new(Arc::clone(&store), config.dialog_ttl_minutes),
            keyboards: KeyboardManager::new(Arc::clone(&store)),
            router: CallbackRouter::new(Arc::clone(&store)),
            registry: PortfolioRegistry::new(Arc::clone(&store), Arc::clone(&engine)),
            store,
            engine,
            charts,
            analyst,
            port,
            config,
        }
    }

    /// Snapshot of a user's context, mainly for tests and diagnostics
    pub fn context(&self, user_id: &str) -> UserContext {
        self.store.get(user_id)
    }

    /// Entry point for an inbound text message
    pub async fn on_text(&self, user_id: &str, text: &str) -> Result<()> {
        match self.handle_text(user_id, text).await {
            Ok(()) => Ok(()),
            Err(err) => self.report(user_id, err).await,
        }
    }

    /// Entry point for an inline-button press
    pub async fn on_callback(
        &self,
        user_id: &str,
        token: &str,
        message: Option<MessageRef>,
    ) -> Result<()> {
        let outcome = match self.router.route(user_id, token) {
            Ok(target) => self.run_target(user_id, target, message).await,
            Err(err) => Err(err),
        };
        match outcome {
            Ok(()) => Ok(()),
            Err(err) => self.report(user_id, err).await,
        }
    }

    /// Convert a handler failure into a user-facing message
    async fn report(&self, user_id: &str, err: FolioError) -> Result<()> {
        tracing::warn!(user_id, %err, "handler failed");
        self.port
            .send_text(user_id, &format::error_message(&err))
            .await
    }

    async fn handle_text(&self, user_id: &str, text: &str) -> Result<()> {
        match Command::parse(text)? {
            Command::Start => {
                self.set_keyboard(user_id, KeyboardKind::Hidden).await?;
                self.port.send_text(user_id, &format::greeting()).await
            }
            Command::Help => {
                self.set_keyboard(user_id, KeyboardKind::Hidden).await?;
                let recent: Vec<String> =
                    self.store.get(user_id).analyzed_tickers.into_iter().collect();
                self.port
                    .send_text(user_id, &format::help_text(&recent))
                    .await
            }
            Command::Info { symbol: Some(symbol) } => self.asset_info(user_id, &symbol).await,
            Command::Info { symbol: None } => {
                self.begin_dialog(user_id, DialogKind::Info { base_symbol: None })
                    .await
            }
            Command::Compare { tokens } if tokens.is_empty() => {
                self.begin_dialog(user_id, DialogKind::Compare).await
            }
            Command::Compare { tokens } => self.run_comparison(user_id, tokens).await,
            Command::Portfolio { tokens } if tokens.is_empty() => {
                self.begin_dialog(user_id, DialogKind::Portfolio).await
            }
            Command::Portfolio { tokens } => self.build_portfolio(user_id, tokens).await,
            Command::Portfolios => {
                self.set_keyboard(user_id, KeyboardKind::Hidden).await?;
                let page = folio_core::pagination::recall_page(
                    &self.store,
                    user_id,
                    crate::handlers::PORTFOLIOS_NS,
                );
                self.render_portfolio_list(user_id, page).await
            }
            Command::Currency { code } => self.set_currency(user_id, code).await,
            Command::Period { value } => self.set_period(user_id, value).await,
            Command::Clear => {
                // hide first so the visible keyboard is actually removed,
                // then reset the stored state
                self.set_keyboard(user_id, KeyboardKind::Hidden).await?;
                self.store.clear(user_id, None);
                self.port
                    .send_text(user_id, "Context cleared. Send /help to start over.")
                    .await
            }
            Command::Text { text } => self.handle_free_text(user_id, &text).await,
        }
    }

    /// Free text: reply-keyboard taps echo their label, so those are
    /// mapped to actions before the dialog slot or classifier runs
    async fn handle_free_text(&self, user_id: &str, text: &str) -> Result<()> {
        if let Some(action) = action_for_label(text) {
            let target = self.router.resolve_action(user_id, action)?;
            return self.run_target(user_id, target, None).await;
        }

        match self.dialogs.consume(user_id, text) {
            RoutedText::Dialog { kind, text } => self.handle_dialog(user_id, kind, &text).await,
            RoutedText::Classified(classified) => {
                self.handle_classified(user_id, classified).await
            }
        }
    }

    async fn handle_dialog(&self, user_id: &str, kind: DialogKind, text: &str) -> Result<()> {
        match kind {
            DialogKind::Compare => match folio_core::classify(text) {
                Classified::Comparison(tokens) => self.run_comparison(user_id, tokens).await,
                Classified::Lookup(_) => Err(FolioError::InvalidInput(
                    "a comparison needs at least two symbols".to_string(),
                )),
                Classified::Invalid => {
                    Err(FolioError::InvalidInput("empty input".to_string()))
                }
            },
            DialogKind::Portfolio => match folio_core::classify(text) {
                Classified::Comparison(tokens) => self.build_portfolio(user_id, tokens).await,
                Classified::Lookup(token) => self.build_portfolio(user_id, vec![token]).await,
                Classified::Invalid => {
                    Err(FolioError::InvalidInput("empty input".to_string()))
                }
            },
            DialogKind::Info { base_symbol } => match folio_core::classify(text) {
                Classified::Lookup(token) => match base_symbol {
                    Some(base) => self.run_comparison(user_id, vec![base, token]).await,
                    None => self.asset_info(user_id, &token).await,
                },
                Classified::Comparison(tokens) => self.run_comparison(user_id, tokens).await,
                Classified::Invalid => {
                    Err(FolioError::InvalidInput("empty input".to_string()))
                }
            },
        }
    }

    async fn handle_classified(&self, user_id: &str, classified: Classified) -> Result<()> {
        match classified {
            Classified::Comparison(tokens) => self.run_comparison(user_id, tokens).await,
            Classified::Lookup(token) => self.asset_info(user_id, &token).await,
            Classified::Invalid => Err(FolioError::InvalidInput(
                "send a symbol, a list of symbols, or /help".to_string(),
            )),
        }
    }

    async fn begin_dialog(&self, user_id: &str, kind: DialogKind) -> Result<()> {
        self.set_keyboard(user_id, KeyboardKind::Hidden).await?;
        let prompt = format::dialog_prompt(&kind);
        self.dialogs.begin(user_id, kind);
        self.port.send_text(user_id, &prompt).await
    }

    async fn set_currency(&self, user_id: &str, code: Option<String>) -> Result<()> {
        self.set_keyboard(user_id, KeyboardKind::Hidden).await?;
        match code {
            None => {
                let current = self.currency(user_id);
                self.port
                    .send_text(user_id, &format!("Active currency: {current}"))
                    .await
            }
            Some(code) => {
                if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
                    return Err(FolioError::InvalidInput(format!(
                        "`{code}` is not a 3-letter currency code"
                    )));
                }
                self.store
                    .update(user_id, ContextPatch::default().currency(code.clone()));
                self.port
                    .send_text(user_id, &format!("Currency set to {code}"))
                    .await
            }
        }
    }

    async fn set_period(&self, user_id: &str, value: Option<String>) -> Result<()> {
        self.set_keyboard(user_id, KeyboardKind::Hidden).await?;
        match value {
            None => {
                let current = self
                    .store
                    .get(user_id)
                    .current_period
                    .unwrap_or_else(|| "MAX".to_string());
                self.port
                    .send_text(user_id, &format!("Active period: {current}"))
                    .await
            }
            Some(value) => {
                let valid = value == "MAX"
                    || (value.ends_with('Y')
                        && value[..value.len() - 1].parse::<u32>().is_ok());
                if !valid {
                    return Err(FolioError::InvalidInput(format!(
                        "`{value}` is not a period; use `5Y`, `10Y` or `MAX`"
                    )));
                }
                self.store
                    .update(user_id, ContextPatch::default().period(value.clone()));
                self.port
                    .send_text(user_id, &format!("Period set to {value}"))
                    .await
            }
        }
    }

    /// Normalized symbol with any `:weight` suffix removed
    pub(crate) fn bare_symbol(token: &str) -> String {
        let normalized = normalize_token(token);
        match normalized.rsplit_once(':') {
            Some((symbol, raw)) if raw.parse::<f64>().is_ok() => symbol.to_string(),
            _ => normalized,
        }
    }

    /// Active currency: the user's choice, else the configured default
    pub(crate) fn currency(&self, user_id: &str) -> String {
        self.store
            .get(user_id)
            .current_currency
            .unwrap_or_else(|| self.config.default_currency.clone())
    }

    pub(crate) async fn set_keyboard(&self, user_id: &str, kind: KeyboardKind) -> Result<()> {
        let ops = self.keyboards.set(user_id, kind);
        self.apply_keyboard(user_id, ops).await
    }

    async fn apply_keyboard(&self, user_id: &str, ops: Vec<KeyboardOp>) -> Result<()> {
        for op in ops {
            match op {
                KeyboardOp::Hide(_) => self.port.hide_reply_keyboard(user_id).await?,
                KeyboardOp::Show(kind) => {
                    self.port
                        .show_reply_keyboard(user_id, kind, &keyboard::layout(kind))
                        .await?;
                }
            }
        }
        Ok(())
    }

    /// Drop stale comparison state when its references disappear
    pub(crate) fn forget_comparison_if(&self, user_id: &str, gone_id: &str) {
        let refers = self
            .store
            .with(user_id, |ctx| ctx.current_symbols.iter().any(|s| s == gone_id));
        if refers {
            self.store.clear(user_id, Some(&[ContextField::Comparison]));
        }
    }
}
