//! User-facing text rendering
//!
//! Markdown-flavored text for captions, tables, prompts and error
//! messages. Errors always name the corrective command(s).

use folio_core::{FolioError, MetricsTable, PortfolioRecord};

/// Help text, with examples personalized from the user's recently
/// inspected symbols
pub fn help_text(recent: &[String]) -> String {
    let example = if recent.len() >= 2 {
        format!("{} {}", recent[recent.len() - 1], recent[recent.len() - 2])
    } else {
        "VOO.US AGG.US".to_string()
    };
    format!(
        "*Folio bot*\n\
        \n\
        /info `<symbol>` — look up one asset\n\
        /compare `<s1> <s2> ...` — compare assets or portfolios\n\
        /portfolio `<s1:w1> <s2:w2> ...` — build a weighted portfolio\n\
        /portfolios — your saved portfolios\n\
        /currency `<code>` — set the base currency\n\
        /period `<5Y|10Y|MAX>` — set the analysis window\n\
        /clear — forget everything\n\
        \n\
        You can also just send symbols, e.g. `{example}`.\n\
        Weights are optional: `AAA.X:0.6 BBB.X:0.4`."
    )
}

pub fn greeting() -> String {
    "Hi! I compare assets and weighted portfolios and explain the \
     results. Send a couple of tickers, or /help for the full list."
        .to_string()
}

/// Prompt shown when a bare command arms a dialog
pub fn dialog_prompt(kind: &folio_core::DialogKind) -> String {
    match kind {
        folio_core::DialogKind::Compare => {
            "Send the symbols to compare, e.g. `VOO.US AGG.US` \
             (a saved `PF_n` works too)."
                .to_string()
        }
        folio_core::DialogKind::Portfolio => {
            "Send the portfolio composition, e.g. `AAA.X:0.5 BBB.X:0.5`. \
             Weights are optional."
                .to_string()
        }
        folio_core::DialogKind::Info { base_symbol: None } => {
            "Send a symbol to look up, e.g. `VOO.US`.".to_string()
        }
        folio_core::DialogKind::Info {
            base_symbol: Some(base),
        } => {
            format!("Send another symbol to compare with {base}, or a command.")
        }
    }
}

/// Monospace rendering of an engine metrics table
pub fn metrics_table(table: &MetricsTable) -> String {
    let mut widths: Vec<usize> = Vec::new();
    let mut all_rows: Vec<Vec<String>> = Vec::with_capacity(table.rows.len() + 1);

    let mut header = vec![String::new()];
    header.extend(table.columns.iter().cloned());
    all_rows.push(header);
    for row in &table.rows {
        let mut cells = vec![row.metric.clone()];
        cells.extend(row.values.iter().cloned());
        all_rows.push(cells);
    }

    for row in &all_rows {
        for (i, cell) in row.iter().enumerate() {
            if widths.len() <= i {
                widths.push(0);
            }
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::from("```\n");
    for row in &all_rows {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{cell:<width$}", width = widths[i]))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out.push_str("```");
    out
}

/// Caption for a freshly built portfolio
pub fn portfolio_caption(record: &PortfolioRecord, dropped: &[String]) -> String {
    let mut lines = vec![format!("*{}* — {}", record.id, record.currency)];
    for (symbol, weight) in record.asset_symbols.iter().zip(&record.weights) {
        lines.push(format!("  {symbol}: {:.1}%", weight * 100.0));
    }
    if !dropped.is_empty() {
        lines.push(format!("Skipped unknown symbols: {}", dropped.join(", ")));
    }
    lines.join("\n")
}

/// Caption for a comparison result
pub fn comparison_caption(labels: &[String], currency: &str, dropped: &[String]) -> String {
    let mut text = format!("Comparing {} in {currency}", labels.join(" vs "));
    if !dropped.is_empty() {
        text.push_str(&format!(
            "\nSkipped unknown symbols: {}",
            dropped.join(", ")
        ));
    }
    text
}

/// One line per saved portfolio in a listing
pub fn portfolio_line(record: &PortfolioRecord) -> String {
    format!(
        "{} — {} ({})",
        folio_core::PortfolioRegistry::label(record),
        record.currency,
        record
            .weights
            .iter()
            .map(|w| format!("{:.0}%", w * 100.0))
            .collect::<Vec<_>>()
            .join("/")
    )
}

/// Convert an error into the message the user sees.
///
/// Every branch names the command(s) that would fix the situation.
pub fn error_message(err: &FolioError) -> String {
    match err {
        FolioError::InvalidInput(detail) => format!(
            "❌ {detail}\nSend symbols like `VOO.US AGG.US`, or /help for examples."
        ),
        FolioError::NoActiveContext => "⚠️ Nothing to act on yet. Build a comparison with \
             /compare or a portfolio with /portfolio first."
            .to_string(),
        FolioError::IdentifierNotFound(id) => format!(
            "⚠️ Portfolio `{id}` no longer exists. /portfolios shows what is saved; \
             /portfolio builds a new one."
        ),
        FolioError::UpstreamUnavailable(_) => {
            "😕 The market-data service is unavailable right now. Please try again in a \
             moment."
                .to_string()
        }
        FolioError::Platform(detail) => format!("⚠️ Delivery problem: {detail}"),
        FolioError::Config(detail) => format!("⚠️ Misconfiguration: {detail}"),
    }
}
