//! Action handlers
//!
//! Everything here re-derives its arguments (symbols, weights,
//! currency) from the context store and the identity registry; inline
//! callback tokens only ever carry an action tag and an entity id.

use crate::bot::FolioBot;
use crate::format;
use folio_core::{
    is_portfolio_id, pagination, portfolio, Action, AnalysisKind, CallbackTarget, CallbackToken,
    ChartKind, ChartSource, ContextPatch, FolioError, InlineButton, InlineKeyboard, KeyboardKind,
    MessageRef, MetricsRow, MetricsTable, PortfolioRegistry, PriceSeries, Result,
};
use serde_json::json;

/// Pagination namespace for the saved-portfolio listing
pub const PORTFOLIOS_NS: &str = "portfolios";

fn chart_kind(action: Action) -> Option<ChartKind> {
    match action {
        Action::Wealth => Some(ChartKind::Wealth),
        Action::Drawdowns => Some(ChartKind::Drawdowns),
        Action::Dividends => Some(ChartKind::Dividends),
        _ => None,
    }
}

fn chart_title(kind: ChartKind) -> &'static str {
    match kind {
        ChartKind::Wealth => "Wealth",
        ChartKind::Drawdowns => "Drawdowns",
        ChartKind::Dividends => "Dividends",
    }
}

fn button(label: &str, action: Action, entity: Option<&str>) -> Result<InlineButton> {
    Ok(InlineButton {
        label: label.to_string(),
        token: CallbackToken::new(action, entity.map(str::to_string)).encode()?,
    })
}

/// Buttons under a comparison result; no entity, the router resolves
/// the context at tap time
fn comparison_buttons() -> Result<InlineKeyboard> {
    Ok(InlineKeyboard::default()
        .row(vec![
            button("📈 Wealth", Action::Wealth, None)?,
            button("📉 Drawdowns", Action::Drawdowns, None)?,
        ])
        .row(vec![
            button("💵 Dividends", Action::Dividends, None)?,
            button("📊 Metrics", Action::Describe, None)?,
        ])
        .row(vec![button("🤖 AI take", Action::AiCommentary, None)?]))
}

/// Buttons under a portfolio result; every token names the portfolio
fn portfolio_buttons(id: &str) -> Result<InlineKeyboard> {
    Ok(InlineKeyboard::default()
        .row(vec![
            button("📈 Wealth", Action::Wealth, Some(id))?,
            button("📉 Drawdowns", Action::Drawdowns, Some(id))?,
        ])
        .row(vec![
            button("💵 Dividends", Action::Dividends, Some(id))?,
            button("📊 Metrics", Action::Describe, Some(id))?,
        ])
        .row(vec![
            button("🤖 AI take", Action::AiCommentary, Some(id))?,
            button("🗑 Delete", Action::DeletePortfolio, Some(id))?,
        ]))
}

impl FolioBot {
    /// Retry a read-only upstream call once; state-mutating calls never
    /// go through here
    pub(crate) async fn retry_once<T, Fut>(&self, call: impl Fn() -> Fut) -> Result<T>
    where
        Fut: std::future::Future<Output = Result<T>>,
    {
        match call().await {
            Err(FolioError::UpstreamUnavailable(first)) => {
                tracing::warn!(error = %first, "upstream call failed, retrying once");
                call().await
            }
            other => other,
        }
    }

    /// Run a comparison over normalized tokens (tickers and/or
    /// portfolio ids, any `:weight` suffixes ignored)
    pub(crate) async fn run_comparison(&self, user_id: &str, tokens: Vec<String>) -> Result<()> {
        let mut canonical = Vec::with_capacity(tokens.len());
        let mut labels = Vec::with_capacity(tokens.len());
        let mut dropped = Vec::new();

        for token in &tokens {
            let symbol = Self::bare_symbol(token);
            if is_portfolio_id(&symbol) {
                let record = self.registry.resolve(user_id, &symbol).await?;
                labels.push(PortfolioRegistry::label(&record));
                canonical.push(symbol);
            } else if self
                .retry_once(|| self.engine.resolve_symbol(&symbol))
                .await?
            {
                labels.push(symbol.clone());
                canonical.push(symbol);
            } else {
                dropped.push(symbol);
            }
        }

        if canonical.len() < 2 {
            return Err(FolioError::InvalidInput(if dropped.is_empty() {
                "a comparison needs at least two symbols".to_string()
            } else {
                format!(
                    "not enough valid symbols to compare (skipped: {})",
                    dropped.join(", ")
                )
            }));
        }

        let currency = self.currency(user_id);
        let source = ChartSource::Series(self.comparison_series(user_id, &canonical).await?);
        let image = self
            .retry_once(|| self.charts.render(&source, ChartKind::Wealth))
            .await?;

        self.store.with(user_id, |ctx| {
            for symbol in canonical.iter().filter(|s| !is_portfolio_id(s)) {
                ctx.note_analyzed(symbol);
            }
        });
        self.store.update(
            user_id,
            ContextPatch::default()
                .symbols(canonical, labels.clone())
                .last_analysis(AnalysisKind::Comparison),
        );

        let caption = format::comparison_caption(&labels, &currency, &dropped);
        self.port.send_image(user_id, &image, &caption).await?;
        self.port
            .send_with_buttons(user_id, "Explore the comparison:", &comparison_buttons()?)
            .await?;
        self.set_keyboard(user_id, KeyboardKind::Comparison).await
    }

    /// Single-asset lookup; afterwards the info dialog is re-armed with
    /// this symbol as the base for a quick follow-up comparison
    pub(crate) async fn asset_info(&self, user_id: &str, token: &str) -> Result<()> {
        let symbol = Self::bare_symbol(token);

        if is_portfolio_id(&symbol) {
            return self.portfolio_overview(user_id, &symbol).await;
        }

        if !self
            .retry_once(|| self.engine.resolve_symbol(&symbol))
            .await?
        {
            return Err(FolioError::InvalidInput(format!("unknown symbol `{symbol}`")));
        }

        let series = self
            .retry_once(|| self.engine.price_series(&symbol))
            .await?;
        let source = ChartSource::Series(vec![series]);
        let image = self
            .retry_once(|| self.charts.render(&source, ChartKind::Wealth))
            .await?;

        self.store.with(user_id, |ctx| ctx.note_analyzed(&symbol));
        self.store.update(
            user_id,
            ContextPatch::default()
                .symbols(vec![symbol.clone()], vec![symbol.clone()])
                .last_analysis(AnalysisKind::Comparison),
        );

        self.port.send_image(user_id, &image, &symbol).await?;
        self.set_keyboard(user_id, KeyboardKind::Comparison).await?;

        let follow_up = folio_core::DialogKind::Info {
            base_symbol: Some(symbol),
        };
        let prompt = format::dialog_prompt(&follow_up);
        self.dialogs.begin(user_id, follow_up);
        self.port.send_text(user_id, &prompt).await
    }

    /// Build and save a portfolio from `SYMBOL[:weight]` tokens
    pub(crate) async fn build_portfolio(&self, user_id: &str, tokens: Vec<String>) -> Result<()> {
        let parsed = portfolio::parse_weighted(&tokens)?;
        let (symbols, weights) = portfolio::fill_weights(&parsed)?;
        let currency = self.currency(user_id);

        let created = self
            .registry
            .create(user_id, symbols, weights, &currency)
            .await?;
        let record = created.record;

        let handle = record.engine_handle.clone().ok_or_else(|| {
            FolioError::UpstreamUnavailable("portfolio handle unavailable".to_string())
        })?;
        let table = self.retry_once(|| self.engine.describe(&handle)).await?;

        self.store.with(user_id, |ctx| {
            for symbol in &record.asset_symbols {
                ctx.note_analyzed(symbol);
            }
        });
        self.store.update(
            user_id,
            ContextPatch::default().last_analysis(AnalysisKind::Portfolio),
        );

        let text = format!(
            "{}\n{}",
            format::portfolio_caption(&record, &created.dropped),
            format::metrics_table(&table)
        );
        self.port
            .send_with_buttons(user_id, &text, &portfolio_buttons(&record.id)?)
            .await?;
        self.set_keyboard(user_id, KeyboardKind::Portfolio).await
    }

    /// Describe an already saved portfolio (e.g. the user sent `PF_2`)
    pub(crate) async fn portfolio_overview(&self, user_id: &str, id: &str) -> Result<()> {
        let record = self.registry.resolve(user_id, id).await?;
        let handle = record.engine_handle.clone().ok_or_else(|| {
            FolioError::UpstreamUnavailable("portfolio handle unavailable".to_string())
        })?;
        let table = self.retry_once(|| self.engine.describe(&handle)).await?;

        self.store.update(
            user_id,
            ContextPatch::default().last_analysis(AnalysisKind::Portfolio),
        );

        let text = format!(
            "{}\n{}",
            format::portfolio_caption(&record, &[]),
            format::metrics_table(&table)
        );
        self.port
            .send_with_buttons(user_id, &text, &portfolio_buttons(&record.id)?)
            .await?;
        self.set_keyboard(user_id, KeyboardKind::Portfolio).await
    }

    /// One series per compared entity; portfolios chart through their
    /// engine handle
    async fn comparison_series(
        &self,
        user_id: &str,
        refs: &[String],
    ) -> Result<Vec<PriceSeries>> {
        let mut series = Vec::with_capacity(refs.len());
        for reference in refs {
            if is_portfolio_id(reference) {
                let record = self.registry.resolve(user_id, reference).await?;
                let handle = record.engine_handle.clone().ok_or_else(|| {
                    FolioError::UpstreamUnavailable("portfolio handle unavailable".to_string())
                })?;
                let mut one = self
                    .retry_once(|| self.engine.portfolio_series(&handle))
                    .await?;
                one.symbol = PortfolioRegistry::label(&record);
                series.push(one);
            } else {
                series.push(
                    self.retry_once(|| self.engine.price_series(reference))
                        .await?,
                );
            }
        }
        Ok(series)
    }

    /// Dispatch a resolved callback target
    pub(crate) async fn run_target(
        &self,
        user_id: &str,
        target: CallbackTarget,
        message: Option<MessageRef>,
    ) -> Result<()> {
        match target {
            CallbackTarget::Page { action, namespace } => {
                if namespace != PORTFOLIOS_NS {
                    return Err(FolioError::InvalidInput(format!(
                        "unknown listing `{namespace}`"
                    )));
                }
                let current = pagination::recall_page(&self.store, user_id, PORTFOLIOS_NS);
                let requested = if action == Action::PageNext {
                    current.saturating_add(1)
                } else {
                    current.saturating_sub(1)
                };
                self.render_portfolio_list(user_id, requested).await
            }
            CallbackTarget::Portfolio {
                action,
                portfolio_id,
            } => {
                self.run_portfolio_action(user_id, action, &portfolio_id, message)
                    .await
            }
            CallbackTarget::Comparison { action, symbols } => {
                self.run_comparison_action(user_id, action, &symbols).await
            }
        }
    }

    async fn run_portfolio_action(
        &self,
        user_id: &str,
        action: Action,
        id: &str,
        message: Option<MessageRef>,
    ) -> Result<()> {
        if action == Action::DeletePortfolio {
            return self.delete_portfolio(user_id, id, message).await;
        }

        let record = self.registry.resolve(user_id, id).await?;
        let label = PortfolioRegistry::label(&record);
        let handle = record.engine_handle.clone().ok_or_else(|| {
            FolioError::UpstreamUnavailable("portfolio handle unavailable".to_string())
        })?;

        if let Some(kind) = chart_kind(action) {
            let source = ChartSource::Handle(handle.clone());
            let image = self.retry_once(|| self.charts.render(&source, kind)).await?;
            let caption = format!("{} — {label}", chart_title(kind));
            return self.port.send_image(user_id, &image, &caption).await;
        }

        match action {
            Action::Describe => {
                let table = self.retry_once(|| self.engine.describe(&handle)).await?;
                let text = format!("*{label}*\n{}", format::metrics_table(&table));
                self.port.send_text(user_id, &text).await
            }
            Action::AiCommentary => {
                let table = self.retry_once(|| self.engine.describe(&handle)).await?;
                let data = json!({
                    "kind": "portfolio",
                    "label": label,
                    "symbols": record.asset_symbols,
                    "weights": record.weights,
                    "currency": record.currency,
                    "metrics": table,
                });
                let commentary = self.analyst.analyze(&data).await?;
                self.port.send_text(user_id, &commentary).await
            }
            _ => Err(FolioError::InvalidInput(
                "that button does not apply to a portfolio".to_string(),
            )),
        }
    }

    async fn delete_portfolio(
        &self,
        user_id: &str,
        id: &str,
        message: Option<MessageRef>,
    ) -> Result<()> {
        self.registry.delete(user_id, id)?;
        // a comparison that referenced the record is stale now
        self.forget_comparison_if(user_id, id);

        if let Some(message) = message {
            // strip the buttons from the message that triggered this
            self.port.edit_reply_markup(user_id, message, None).await?;
        }
        if self.registry.list(user_id).is_empty()
            && self.keyboards.current(user_id) == KeyboardKind::Portfolio
        {
            self.set_keyboard(user_id, KeyboardKind::Hidden).await?;
        }
        self.port
            .send_text(user_id, &format!("Deleted {id}. /portfolios shows the rest."))
            .await
    }

    async fn run_comparison_action(
        &self,
        user_id: &str,
        action: Action,
        symbols: &[String],
    ) -> Result<()> {
        let series = self.comparison_series(user_id, symbols).await?;
        let currency = self.currency(user_id);

        if let Some(kind) = chart_kind(action) {
            let source = ChartSource::Series(series.clone());
            let image = self.retry_once(|| self.charts.render(&source, kind)).await?;
            let labels: Vec<String> = series.iter().map(|s| s.symbol.clone()).collect();
            let caption = format!(
                "{} — {}",
                chart_title(kind),
                format::comparison_caption(&labels, &currency, &[])
            );
            return self.port.send_image(user_id, &image, &caption).await;
        }

        match action {
            Action::Describe => {
                let table = endpoints_table(&series);
                self.port
                    .send_text(user_id, &format::metrics_table(&table))
                    .await
            }
            Action::AiCommentary => {
                let data = json!({
                    "kind": "comparison",
                    "currency": currency,
                    "entities": series.iter().map(|s| json!({
                        "symbol": s.symbol,
                        "from": s.dates.first(),
                        "to": s.dates.last(),
                        "start": s.values.first(),
                        "end": s.values.last(),
                    })).collect::<Vec<_>>(),
                });
                let commentary = self.analyst.analyze(&data).await?;
                self.port.send_text(user_id, &commentary).await
            }
            _ => Err(FolioError::InvalidInput(
                "that button does not apply to a comparison".to_string(),
            )),
        }
    }

    /// Render one page of the saved-portfolio listing and remember the
    /// position
    pub(crate) async fn render_portfolio_list(
        &self,
        user_id: &str,
        page_index: usize,
    ) -> Result<()> {
        let records = self.registry.list(user_id);
        if records.is_empty() {
            return self
                .port
                .send_text(
                    user_id,
                    "No saved portfolios yet. /portfolio builds one.",
                )
                .await;
        }

        let (visible, slice) = folio_core::page_items(&records, page_index, self.config.page_size);
        pagination::remember_page(&self.store, user_id, PORTFOLIOS_NS, &slice);

        let mut text = String::from("*Saved portfolios*\n");
        for record in visible {
            text.push_str(&format::portfolio_line(record));
            text.push('\n');
        }

        match pagination::nav(&slice) {
            Some(nav) => {
                text.push_str(&format!("Page {}", nav.indicator));
                let mut row = Vec::new();
                if nav.has_prev {
                    row.push(button("◀", Action::PagePrev, Some(PORTFOLIOS_NS))?);
                }
                if nav.has_next {
                    row.push(button("▶", Action::PageNext, Some(PORTFOLIOS_NS))?);
                }
                self.port
                    .send_with_buttons(user_id, &text, &InlineKeyboard::default().row(row))
                    .await?;
                Ok(())
            }
            None => self.port.send_text(user_id, &text).await,
        }
    }
}

/// Presentation-only summary of compared series: endpoints and overall
/// change, no financial metrics
fn endpoints_table(series: &[PriceSeries]) -> MetricsTable {
    let columns = series.iter().map(|s| s.symbol.clone()).collect();
    let cell = |s: &PriceSeries, f: &dyn Fn(&PriceSeries) -> Option<String>| {
        f(s).unwrap_or_else(|| "—".to_string())
    };

    let rows = vec![
        MetricsRow {
            metric: "From".to_string(),
            values: series
                .iter()
                .map(|s| cell(s, &|s| s.dates.first().map(ToString::to_string)))
                .collect(),
        },
        MetricsRow {
            metric: "To".to_string(),
            values: series
                .iter()
                .map(|s| cell(s, &|s| s.dates.last().map(ToString::to_string)))
                .collect(),
        },
        MetricsRow {
            metric: "Change".to_string(),
            values: series
                .iter()
                .map(|s| {
                    cell(s, &|s| match (s.values.first(), s.values.last()) {
                        (Some(first), Some(last)) if *first != 0.0 => {
                            Some(format!("{:+.1}%", (last / first - 1.0) * 100.0))
                        }
                        _ => None,
                    })
                })
                .collect(),
        },
    ];

    MetricsTable { columns, rows }
}
