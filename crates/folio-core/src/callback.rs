//! Inline-button token codec and callback disambiguation
//!
//! Platform callback payloads are size-capped, so a token carries only
//! an action tag and a minimal entity id — never symbol or weight
//! lists. Handlers re-derive their arguments from the context store
//! and the identity registry.

use crate::context::AnalysisKind;
use crate::error::{FolioError, Result};
use crate::portfolio::is_portfolio_id;
use crate::store::ContextStore;
use std::sync::Arc;

/// Hard cap on an encoded token, matching platform payload limits
pub const MAX_TOKEN_LEN: usize = 64;

/// Closed set of inline-button actions.
///
/// Unknown tags fail decoding loudly instead of falling into a
/// catch-all branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Wealth,
    Drawdowns,
    Dividends,
    /// Risk/return metrics table
    Describe,
    AiCommentary,
    PagePrev,
    PageNext,
    DeletePortfolio,
}

impl Action {
    /// Compact wire tag
    pub fn tag(self) -> &'static str {
        match self {
            Action::Wealth => "wl",
            Action::Drawdowns => "dd",
            Action::Dividends => "dv",
            Action::Describe => "ds",
            Action::AiCommentary => "ai",
            Action::PagePrev => "pp",
            Action::PageNext => "pn",
            Action::DeletePortfolio => "del",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "wl" => Action::Wealth,
            "dd" => Action::Drawdowns,
            "dv" => Action::Dividends,
            "ds" => Action::Describe,
            "ai" => Action::AiCommentary,
            "pp" => Action::PagePrev,
            "pn" => Action::PageNext,
            "del" => Action::DeletePortfolio,
            _ => return None,
        })
    }

    fn is_pagination(self) -> bool {
        matches!(self, Action::PagePrev | Action::PageNext)
    }
}

/// Decoded callback payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackToken {
    pub action: Action,
    /// Portfolio id, or a pagination namespace for page actions
    pub entity: Option<String>,
}

impl CallbackToken {
    pub fn new(action: Action, entity: Option<String>) -> Self {
        Self { action, entity }
    }

    /// Encode as `tag` or `tag:entity`, bounded to [`MAX_TOKEN_LEN`]
    pub fn encode(&self) -> Result<String> {
        let encoded = match &self.entity {
            Some(entity) => format!("{}:{entity}", self.action.tag()),
            None => self.action.tag().to_string(),
        };
        if encoded.len() > MAX_TOKEN_LEN {
            return Err(FolioError::InvalidInput(format!(
                "callback token too long: {} bytes",
                encoded.len()
            )));
        }
        Ok(encoded)
    }

    /// Decode a raw payload; unrecognized tags are rejected
    pub fn decode(raw: &str) -> Result<Self> {
        if raw.is_empty() || raw.len() > MAX_TOKEN_LEN {
            return Err(FolioError::InvalidInput(format!(
                "malformed callback token `{raw}`"
            )));
        }
        let (tag, entity) = match raw.split_once(':') {
            Some((tag, entity)) if !entity.is_empty() => (tag, Some(entity.to_string())),
            Some((tag, _)) => (tag, None),
            None => (raw, None),
        };
        let action = Action::from_tag(tag)
            .ok_or_else(|| FolioError::InvalidInput(format!("unknown callback tag `{tag}`")))?;
        Ok(Self { action, entity })
    }
}

/// Where a decoded callback was dispatched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackTarget {
    /// Explicit or disambiguated portfolio context
    Portfolio { action: Action, portfolio_id: String },
    /// Active comparison context; symbols re-derived from the store
    Comparison { action: Action, symbols: Vec<String> },
    /// Pagination within a namespaced listing
    Page { action: Action, namespace: String },
}

/// Resolves callbacks against the current per-user context
pub struct CallbackRouter {
    store: Arc<ContextStore>,
}

impl CallbackRouter {
    pub fn new(store: Arc<ContextStore>) -> Self {
        Self { store }
    }

    /// Decode a raw token and resolve its target.
    ///
    /// Resolution order: explicit entity id, then the single non-empty
    /// context, then `last_analysis_type` as tiebreak, else
    /// `NoActiveContext`.
    pub fn route(&self, user_id: &str, raw: &str) -> Result<CallbackTarget> {
        let token = CallbackToken::decode(raw)?;

        if token.action.is_pagination() {
            let namespace = token.entity.ok_or_else(|| {
                FolioError::InvalidInput("pagination token without namespace".to_string())
            })?;
            return Ok(CallbackTarget::Page {
                action: token.action,
                namespace,
            });
        }

        if let Some(entity) = token.entity {
            if !is_portfolio_id(&entity) {
                return Err(FolioError::InvalidInput(format!(
                    "unexpected callback entity `{entity}`"
                )));
            }
            let known = self
                .store
                .with(user_id, |ctx| ctx.saved_portfolios.contains_key(&entity));
            if !known {
                return Err(FolioError::IdentifierNotFound(entity));
            }
            return Ok(CallbackTarget::Portfolio {
                action: token.action,
                portfolio_id: entity,
            });
        }

        self.resolve_action(user_id, token.action)
    }

    /// Resolve an action with no explicit entity, e.g. a reply-keyboard
    /// tap
    pub fn resolve_action(&self, user_id: &str, action: Action) -> Result<CallbackTarget> {
        if action == Action::DeletePortfolio {
            // deletion always names its target explicitly
            return Err(FolioError::InvalidInput(
                "delete requires a portfolio id".to_string(),
            ));
        }

        let (symbols, latest, last_kind) = self.store.with(user_id, |ctx| {
            (
                ctx.current_symbols.clone(),
                ctx.latest_portfolio_id(),
                ctx.last_analysis_type,
            )
        });

        match (symbols.is_empty(), latest) {
            (false, None) => Ok(CallbackTarget::Comparison { action, symbols }),
            (true, Some(portfolio_id)) => Ok(CallbackTarget::Portfolio {
                action,
                portfolio_id,
            }),
            (false, Some(portfolio_id)) => match last_kind {
                Some(AnalysisKind::Portfolio) => Ok(CallbackTarget::Portfolio {
                    action,
                    portfolio_id,
                }),
                Some(AnalysisKind::Comparison) => {
                    Ok(CallbackTarget::Comparison { action, symbols })
                }
                None => {
                    tracing::warn!(
                        user_id,
                        ?action,
                        "ambiguous context with no last analysis; defaulting to comparison"
                    );
                    Ok(CallbackTarget::Comparison { action, symbols })
                }
            },
            (true, None) => Err(FolioError::NoActiveContext),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextPatch;
    use crate::portfolio::PortfolioRecord;

    fn save_portfolio(store: &ContextStore, user: &str, id: &str) {
        store.with(user, |ctx| {
            ctx.saved_portfolios.insert(
                id.to_string(),
                PortfolioRecord {
                    id: id.to_string(),
                    asset_symbols: vec!["A.US".to_string(), "B.US".to_string()],
                    weights: vec![0.5, 0.5],
                    currency: "USD".to_string(),
                    engine_handle: None,
                },
            );
        });
    }

    #[test]
    fn test_token_round_trip() {
        let token = CallbackToken::new(Action::Dividends, Some("PF_1".to_string()));
        let raw = token.encode().unwrap();
        assert_eq!(raw, "dv:PF_1");
        assert_eq!(CallbackToken::decode(&raw).unwrap(), token);
    }

    #[test]
    fn test_unknown_tag_fails_loudly() {
        assert!(matches!(
            CallbackToken::decode("zz:PF_1"),
            Err(FolioError::InvalidInput(_))
        ));
        assert!(CallbackToken::decode("").is_err());
    }

    #[test]
    fn test_token_length_bounded() {
        let token = CallbackToken::new(Action::Describe, Some("x".repeat(80)));
        assert!(token.encode().is_err());
    }

    #[test]
    fn test_rule1_entity_dispatches_directly() {
        let store = Arc::new(ContextStore::new());
        save_portfolio(&store, "u1", "PF_1");
        let router = CallbackRouter::new(Arc::clone(&store));

        let target = router.route("u1", "dv:PF_1").unwrap();
        assert_eq!(
            target,
            CallbackTarget::Portfolio {
                action: Action::Dividends,
                portfolio_id: "PF_1".to_string()
            }
        );
    }

    #[test]
    fn test_stale_entity_is_identifier_not_found() {
        let store = Arc::new(ContextStore::new());
        let router = CallbackRouter::new(store);
        assert!(matches!(
            router.route("u1", "dv:PF_9"),
            Err(FolioError::IdentifierNotFound(id)) if id == "PF_9"
        ));
    }

    #[test]
    fn test_rule2_single_context_wins() {
        let store = Arc::new(ContextStore::new());
        store.update(
            "u1",
            ContextPatch::default().symbols(
                vec!["A.US".to_string(), "B.US".to_string()],
                vec!["A.US".to_string(), "B.US".to_string()],
            ),
        );
        let router = CallbackRouter::new(Arc::clone(&store));

        match router.route("u1", "wl").unwrap() {
            CallbackTarget::Comparison { symbols, .. } => {
                assert_eq!(symbols, vec!["A.US", "B.US"]);
            }
            other => panic!("expected comparison target, got {other:?}"),
        }
    }

    #[test]
    fn test_rule3_last_analysis_breaks_tie() {
        let store = Arc::new(ContextStore::new());
        save_portfolio(&store, "u1", "PF_1");
        store.update(
            "u1",
            ContextPatch::default()
                .symbols(vec!["A.US".to_string()], vec!["A.US".to_string()])
                .last_analysis(AnalysisKind::Portfolio),
        );
        let router = CallbackRouter::new(Arc::clone(&store));

        assert!(matches!(
            router.route("u1", "ds").unwrap(),
            CallbackTarget::Portfolio { portfolio_id, .. } if portfolio_id == "PF_1"
        ));
    }

    #[test]
    fn test_rule4_nothing_active() {
        let store = Arc::new(ContextStore::new());
        let router = CallbackRouter::new(store);
        assert!(matches!(
            router.route("u1", "wl"),
            Err(FolioError::NoActiveContext)
        ));
    }

    #[test]
    fn test_pagination_token_targets_namespace() {
        let store = Arc::new(ContextStore::new());
        let router = CallbackRouter::new(store);
        assert_eq!(
            router.route("u1", "pn:portfolios").unwrap(),
            CallbackTarget::Page {
                action: Action::PageNext,
                namespace: "portfolios".to_string()
            }
        );
        assert!(router.route("u1", "pn").is_err());
    }

    #[test]
    fn test_entity_id_not_split_into_characters() {
        let store = Arc::new(ContextStore::new());
        save_portfolio(&store, "u1", "PF_12");
        let router = CallbackRouter::new(store);

        match router.route("u1", "dv:PF_12").unwrap() {
            CallbackTarget::Portfolio { portfolio_id, .. } => {
                assert_eq!(portfolio_id, "PF_12");
            }
            other => panic!("expected portfolio target, got {other:?}"),
        }
    }
}
