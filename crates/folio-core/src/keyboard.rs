//! Persistent reply keyboard lifecycle
//!
//! At most one keyboard family is visible per user. The manager is
//! the only writer of `active_reply_keyboard`; it emits the hide/show
//! operations the platform adapter must perform, and emits none when
//! the requested family is already visible.

use crate::callback::Action;
use crate::context::KeyboardKind;
use crate::store::ContextStore;
use std::sync::Arc;

/// A platform operation the caller must apply, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardOp {
    Hide(KeyboardKind),
    Show(KeyboardKind),
}

/// Enforces the mutually-exclusive keyboard invariant
pub struct KeyboardManager {
    store: Arc<ContextStore>,
}

impl KeyboardManager {
    pub fn new(store: Arc<ContextStore>) -> Self {
        Self { store }
    }

    /// Transition the visible keyboard family.
    ///
    /// Returns the operations to apply: empty when `kind` is already
    /// visible, otherwise a hide for the old family (if any) followed
    /// by a show for the new one (if not `Hidden`).
    pub fn set(&self, user_id: &str, kind: KeyboardKind) -> Vec<KeyboardOp> {
        self.store.with(user_id, |ctx| {
            let current = ctx.active_reply_keyboard;
            if current == kind {
                return Vec::new();
            }

            let mut ops = Vec::with_capacity(2);
            if current != KeyboardKind::Hidden {
                ops.push(KeyboardOp::Hide(current));
            }
            if kind != KeyboardKind::Hidden {
                ops.push(KeyboardOp::Show(kind));
            }
            ctx.active_reply_keyboard = kind;
            tracing::debug!(user_id, from = ?current, to = ?kind, "keyboard transition");
            ops
        })
    }

    /// Currently visible family
    pub fn current(&self, user_id: &str) -> KeyboardKind {
        self.store.with(user_id, |ctx| ctx.active_reply_keyboard)
    }
}

/// Button labels for a keyboard family, row by row
pub fn layout(kind: KeyboardKind) -> Vec<Vec<String>> {
    let rows: &[&[&str]] = match kind {
        KeyboardKind::Hidden => &[],
        KeyboardKind::Comparison | KeyboardKind::Portfolio => &[
            &["📈 Wealth", "📉 Drawdowns"],
            &["💵 Dividends", "📊 Metrics"],
            &["🤖 AI take"],
        ],
    };
    rows.iter()
        .map(|row| row.iter().map(|label| (*label).to_string()).collect())
        .collect()
}

/// Map a tapped reply-keyboard label back to its action.
///
/// Reply keyboards echo the tapped label as an ordinary text message,
/// so this runs before free-text classification.
pub fn action_for_label(text: &str) -> Option<Action> {
    match text.trim() {
        "📈 Wealth" => Some(Action::Wealth),
        "📉 Drawdowns" => Some(Action::Drawdowns),
        "💵 Dividends" => Some(Action::Dividends),
        "📊 Metrics" => Some(Action::Describe),
        "🤖 AI take" => Some(Action::AiCommentary),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (Arc<ContextStore>, KeyboardManager) {
        let store = Arc::new(ContextStore::new());
        let manager = KeyboardManager::new(Arc::clone(&store));
        (store, manager)
    }

    #[test]
    fn test_repeat_kind_is_free() {
        let (_, manager) = manager();
        assert_eq!(
            manager.set("u1", KeyboardKind::Comparison),
            vec![KeyboardOp::Show(KeyboardKind::Comparison)]
        );
        // same kind again: zero operations, no flicker
        assert!(manager.set("u1", KeyboardKind::Comparison).is_empty());
        assert!(manager.set("u1", KeyboardKind::Comparison).is_empty());
    }

    #[test]
    fn test_switch_hides_then_shows() {
        let (_, manager) = manager();
        manager.set("u1", KeyboardKind::Comparison);
        assert_eq!(
            manager.set("u1", KeyboardKind::Portfolio),
            vec![
                KeyboardOp::Hide(KeyboardKind::Comparison),
                KeyboardOp::Show(KeyboardKind::Portfolio)
            ]
        );
    }

    #[test]
    fn test_hide_from_hidden_is_noop() {
        let (_, manager) = manager();
        assert!(manager.set("u1", KeyboardKind::Hidden).is_empty());
    }

    #[test]
    fn test_ops_count_equals_state_changes() {
        let (_, manager) = manager();
        let calls = [
            KeyboardKind::Comparison,
            KeyboardKind::Comparison,
            KeyboardKind::Portfolio,
            KeyboardKind::Portfolio,
            KeyboardKind::Hidden,
            KeyboardKind::Hidden,
        ];
        let ops: usize = calls.iter().map(|kind| manager.set("u1", *kind).len()).sum();
        // show, hide+show, hide — three state changes, four operations
        assert_eq!(ops, 4);
    }

    #[test]
    fn test_manager_writes_context_field() {
        let (store, manager) = manager();
        manager.set("u1", KeyboardKind::Portfolio);
        assert_eq!(
            store.get("u1").active_reply_keyboard,
            KeyboardKind::Portfolio
        );
    }

    #[test]
    fn test_labels_round_trip_to_actions() {
        for row in layout(KeyboardKind::Comparison) {
            for label in row {
                assert!(action_for_label(&label).is_some(), "unmapped label {label}");
            }
        }
        assert!(action_for_label("random text").is_none());
    }
}
