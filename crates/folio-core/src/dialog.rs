//! Two-turn prompt/consume dialogs and free-text classification
//!
//! A command entered without arguments arms the single per-user dialog
//! slot; the user's next message is consumed as that input. Messages
//! arriving with no armed dialog go through the free-text classifier.

use crate::context::{DialogKind, PendingDialog, UserContext};
use crate::portfolio::is_portfolio_id;
use crate::store::ContextStore;
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Where a free-text message was routed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutedText {
    /// An armed dialog consumed the message; the slot is already
    /// cleared
    Dialog { kind: DialogKind, text: String },
    /// No dialog was armed; the classifier decided
    Classified(Classified),
}

/// Free-text classifier outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// Two or more tokens: a comparison request
    Comparison(Vec<String>),
    /// Exactly one token: a single-symbol lookup
    Lookup(String),
    /// Empty or whitespace-only input
    Invalid,
}

/// Uppercase a symbol token while preserving portfolio-id case and any
/// trailing `:weight` suffix as typed
pub fn normalize_token(token: &str) -> String {
    let (symbol, suffix) = match token.rsplit_once(':') {
        Some((symbol, raw)) if raw.parse::<f64>().is_ok() => (symbol, Some(raw)),
        _ => (token, None),
    };
    let symbol = if is_portfolio_id(symbol) {
        symbol.to_string()
    } else {
        symbol.to_uppercase()
    };
    match suffix {
        Some(raw) => format!("{symbol}:{raw}"),
        None => symbol,
    }
}

/// Classify a free-text message.
///
/// Splits on `,` when present, else on whitespace. A `:weight` suffix
/// never contributes to the token count, so `"X.AA:0.5"` is one
/// weighted token, not two.
pub fn classify(text: &str) -> Classified {
    let tokens: Vec<String> = if text.contains(',') {
        text.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(normalize_token)
            .collect()
    } else {
        text.split_whitespace().map(normalize_token).collect()
    };

    match tokens.len() {
        0 => Classified::Invalid,
        1 => Classified::Lookup(tokens.into_iter().next().unwrap_or_default()),
        _ => Classified::Comparison(tokens),
    }
}

/// Owns the single waiting-dialog slot per user
pub struct DialogController {
    store: Arc<ContextStore>,
    /// An armed prompt older than this is treated as expired
    ttl: Duration,
}

impl DialogController {
    pub fn new(store: Arc<ContextStore>, ttl_minutes: i64) -> Self {
        Self {
            store,
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Arm the dialog slot, superseding any prior prompt
    pub fn begin(&self, user_id: &str, kind: DialogKind) {
        tracing::debug!(user_id, ?kind, "arming dialog");
        self.store.with(user_id, |ctx| {
            ctx.dialog_state = Some(PendingDialog {
                kind,
                begun_at: Utc::now(),
            });
        });
    }

    /// Disarm without consuming anything
    pub fn cancel(&self, user_id: &str) {
        self.store.with(user_id, |ctx| ctx.dialog_state = None);
    }

    /// Consume a message against the dialog slot.
    ///
    /// The slot is cleared *before* the caller dispatches, so a
    /// failing handler cannot leave it armed for an unrelated later
    /// message. Expired slots are discarded and the classifier runs
    /// instead.
    pub fn consume(&self, user_id: &str, text: &str) -> RoutedText {
        let taken = self.store.with(user_id, |ctx| ctx.dialog_state.take());

        match taken {
            Some(pending) if Utc::now() - pending.begun_at <= self.ttl => RoutedText::Dialog {
                kind: pending.kind,
                text: text.to_string(),
            },
            Some(pending) => {
                tracing::debug!(user_id, kind = ?pending.kind, "discarding expired dialog");
                RoutedText::Classified(classify(text))
            }
            None => RoutedText::Classified(classify(text)),
        }
    }

    /// The currently armed dialog, if any
    pub fn peek(&self, user_id: &str) -> Option<DialogKind> {
        self.store
            .with(user_id, |ctx: &mut UserContext| ctx.dialog_state.clone())
            .map(|pending| pending.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_token_counts_as_one() {
        assert_eq!(
            classify("X.AA:0.5"),
            Classified::Lookup("X.AA:0.5".to_string())
        );
    }

    #[test]
    fn test_comparison_by_whitespace_and_comma() {
        let expected = Classified::Comparison(vec!["A.AA".to_string(), "B.BB".to_string()]);
        assert_eq!(classify("A.AA B.BB"), expected);
        assert_eq!(classify("a.aa, b.bb"), expected);
    }

    #[test]
    fn test_portfolio_id_case_preserved() {
        assert_eq!(classify("PF_3"), Classified::Lookup("PF_3".to_string()));
        assert_eq!(
            classify("PF_3 voo.us"),
            Classified::Comparison(vec!["PF_3".to_string(), "VOO.US".to_string()])
        );
    }

    #[test]
    fn test_weight_suffix_retained_through_normalization() {
        assert_eq!(normalize_token("aaa.x:0.5"), "AAA.X:0.5");
        assert_eq!(normalize_token("PF_2:0.3"), "PF_2:0.3");
        // non-numeric suffix is part of the symbol, not a weight
        assert_eq!(normalize_token("brk.b"), "BRK.B");
    }

    #[test]
    fn test_empty_input_is_invalid() {
        assert_eq!(classify(""), Classified::Invalid);
        assert_eq!(classify("   "), Classified::Invalid);
        assert_eq!(classify(" , ,"), Classified::Invalid);
    }

    #[test]
    fn test_begin_supersedes_prior_prompt() {
        let store = Arc::new(ContextStore::new());
        let dialogs = DialogController::new(Arc::clone(&store), 15);

        dialogs.begin("u1", DialogKind::Compare);
        dialogs.begin("u1", DialogKind::Portfolio);

        assert_eq!(dialogs.peek("u1"), Some(DialogKind::Portfolio));
    }

    #[test]
    fn test_consume_clears_slot_before_dispatch() {
        let store = Arc::new(ContextStore::new());
        let dialogs = DialogController::new(Arc::clone(&store), 15);

        dialogs.begin("u1", DialogKind::Compare);
        let routed = dialogs.consume("u1", "A.US B.US");

        assert_eq!(
            routed,
            RoutedText::Dialog {
                kind: DialogKind::Compare,
                text: "A.US B.US".to_string()
            }
        );
        // the slot is empty even though no handler ran yet
        assert_eq!(dialogs.peek("u1"), None);
    }

    #[test]
    fn test_expired_dialog_falls_back_to_classifier() {
        let store = Arc::new(ContextStore::new());
        let dialogs = DialogController::new(Arc::clone(&store), 15);

        dialogs.begin("u1", DialogKind::Portfolio);
        store.with("u1", |ctx| {
            if let Some(pending) = ctx.dialog_state.as_mut() {
                pending.begun_at = Utc::now() - Duration::minutes(30);
            }
        });

        let routed = dialogs.consume("u1", "VOO.US");
        assert_eq!(
            routed,
            RoutedText::Classified(Classified::Lookup("VOO.US".to_string()))
        );
    }

    #[test]
    fn test_unarmed_consume_classifies() {
        let store = Arc::new(ContextStore::new());
        let dialogs = DialogController::new(store, 15);

        let routed = dialogs.consume("u1", "voo.us agg.us");
        assert_eq!(
            routed,
            RoutedText::Classified(Classified::Comparison(vec![
                "VOO.US".to_string(),
                "AGG.US".to_string()
            ]))
        );
    }
}
