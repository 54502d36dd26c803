//! Keyed context store
//!
//! One mutable [`UserContext`] per user id. All read-modify-write
//! sequences for the same user are serialized through a per-user
//! mutex; different users never contend. The lock guards only the
//! in-memory mutation — collaborator calls are awaited outside of it,
//! which the closure-based [`ContextStore::with`] makes structural
//! (the closure is synchronous, so nothing can be awaited inside).

use crate::context::{ContextField, ContextPatch, UserContext};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// In-memory store of per-user session state
#[derive(Default)]
pub struct ContextStore {
    users: Mutex<HashMap<String, Arc<Mutex<UserContext>>>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-user entry, created lazily with defaults.
    ///
    /// The outer map lock is held only long enough to clone the Arc.
    fn entry(&self, user_id: &str) -> Arc<Mutex<UserContext>> {
        let mut users = self
            .users
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match users.get(user_id) {
            Some(slot) => Arc::clone(slot),
            None => {
                tracing::debug!(user_id, "creating default context");
                let slot = Arc::new(Mutex::new(UserContext::default()));
                users.insert(user_id.to_string(), Arc::clone(&slot));
                slot
            }
        }
    }

    /// Run a serialized read-modify-write against one user's context
    pub fn with<T>(&self, user_id: &str, f: impl FnOnce(&mut UserContext) -> T) -> T {
        let slot = self.entry(user_id);
        let mut ctx = slot.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut ctx)
    }

    /// Snapshot of the user's context, never absent
    pub fn get(&self, user_id: &str) -> UserContext {
        self.with(user_id, |ctx| ctx.clone())
    }

    /// Merge-patch the context, last write wins per field; returns the
    /// resulting context
    pub fn update(&self, user_id: &str, patch: ContextPatch) -> UserContext {
        self.with(user_id, |ctx| {
            patch.apply(ctx);
            ctx.clone()
        })
    }

    /// Reset named fields to defaults, or the whole context when no
    /// fields are given.
    ///
    /// The portfolio id counter survives a full clear so identifiers
    /// are never reused within a running process.
    pub fn clear(&self, user_id: &str, fields: Option<&[ContextField]>) {
        self.with(user_id, |ctx| match fields {
            None => {
                let seq = ctx.portfolio_seq;
                *ctx = UserContext {
                    portfolio_seq: seq,
                    ..UserContext::default()
                };
            }
            Some(fields) => {
                for field in fields {
                    match field {
                        ContextField::Comparison => {
                            ctx.current_symbols.clear();
                            ctx.display_symbols.clear();
                        }
                        ContextField::Currency => ctx.current_currency = None,
                        ContextField::Period => ctx.current_period = None,
                        ContextField::LastAnalysis => ctx.last_analysis_type = None,
                        ContextField::Portfolios => ctx.saved_portfolios.clear(),
                        ContextField::AnalyzedTickers => ctx.analyzed_tickers.clear(),
                        ContextField::Dialog => ctx.dialog_state = None,
                        ContextField::Pagination => ctx.pagination.clear(),
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AnalysisKind;

    #[test]
    fn test_get_creates_default() {
        let store = ContextStore::new();
        let ctx = store.get("u1");
        assert!(ctx.current_symbols.is_empty());
        assert!(ctx.dialog_state.is_none());
    }

    #[test]
    fn test_update_returns_result() {
        let store = ContextStore::new();
        let ctx = store.update(
            "u1",
            ContextPatch::default()
                .symbols(vec!["A.US".to_string()], vec!["A.US".to_string()])
                .last_analysis(AnalysisKind::Comparison),
        );
        assert_eq!(ctx.current_symbols, vec!["A.US"]);
        assert_eq!(ctx.last_analysis_type, Some(AnalysisKind::Comparison));
    }

    #[test]
    fn test_clear_named_fields() {
        let store = ContextStore::new();
        store.update(
            "u1",
            ContextPatch::default()
                .symbols(vec!["A.US".to_string()], vec!["A.US".to_string()])
                .currency("USD"),
        );
        store.clear("u1", Some(&[ContextField::Comparison]));
        let ctx = store.get("u1");
        assert!(ctx.current_symbols.is_empty());
        assert_eq!(ctx.current_currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_full_clear_preserves_id_counter() {
        let store = ContextStore::new();
        store.with("u1", |ctx| ctx.portfolio_seq = 4);
        store.clear("u1", None);
        assert_eq!(store.get("u1").portfolio_seq, 4);
        assert!(store.get("u1").current_symbols.is_empty());
    }

    #[test]
    fn test_users_are_isolated() {
        let store = ContextStore::new();
        store.update("u1", ContextPatch::default().currency("USD"));
        assert!(store.get("u2").current_currency.is_none());
    }

    #[test]
    fn test_concurrent_same_user_updates_are_not_lost() {
        let store = Arc::new(ContextStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    store.with("u1", |ctx| ctx.portfolio_seq += 1);
                }
            }));
        }
        for handle in handles {
            handle.join().expect("worker panicked");
        }
        assert_eq!(store.get("u1").portfolio_seq, 800);
    }
}
