//! Portfolio identity registry
//!
//! The registry is the only component that writes portfolio `id`s.
//! Identifiers come from a per-user monotonic counter with a fixed
//! prefix, never from anything the analytics engine computes, and a
//! rebuild of the cached engine handle never renames a record.

use crate::context::UserContext;
use crate::error::{FolioError, Result};
use crate::portfolio::{renormalize, PortfolioRecord, PORTFOLIO_ID_PREFIX};
use crate::providers::AnalyticsEngine;
use crate::store::ContextStore;
use std::sync::Arc;

/// Result of a successful `create`
#[derive(Debug, Clone)]
pub struct CreatedPortfolio {
    pub record: PortfolioRecord,
    /// Symbols the engine did not recognize, dropped before creation
    pub dropped: Vec<String>,
}

pub struct PortfolioRegistry {
    store: Arc<ContextStore>,
    engine: Arc<dyn AnalyticsEngine>,
}

impl PortfolioRegistry {
    pub fn new(store: Arc<ContextStore>, engine: Arc<dyn AnalyticsEngine>) -> Self {
        Self { store, engine }
    }

    /// Validate a basket, assign a fresh id and save the record.
    ///
    /// Unresolvable symbols are dropped (with their weights) and the
    /// rest renormalized. The engine call happens outside the context
    /// lock and is never auto-retried; a failed build still consumes
    /// the reserved id.
    pub async fn create(
        &self,
        user_id: &str,
        asset_symbols: Vec<String>,
        weights: Vec<f64>,
        currency: &str,
    ) -> Result<CreatedPortfolio> {
        if asset_symbols.len() != weights.len() {
            return Err(FolioError::InvalidInput(format!(
                "{} symbols but {} weights",
                asset_symbols.len(),
                weights.len()
            )));
        }

        let mut kept_symbols = Vec::with_capacity(asset_symbols.len());
        let mut kept_weights = Vec::with_capacity(weights.len());
        let mut dropped = Vec::new();
        for (symbol, weight) in asset_symbols.into_iter().zip(weights) {
            if self.engine.resolve_symbol(&symbol).await? {
                kept_symbols.push(symbol);
                kept_weights.push(weight);
            } else {
                dropped.push(symbol);
            }
        }
        if kept_symbols.is_empty() {
            return Err(FolioError::InvalidInput(
                "none of the symbols could be resolved".to_string(),
            ));
        }
        renormalize(&mut kept_weights)?;

        let id = self.store.with(user_id, |ctx| {
            ctx.portfolio_seq += 1;
            format!("{PORTFOLIO_ID_PREFIX}{}", ctx.portfolio_seq)
        });

        let handle = self
            .engine
            .build_portfolio(&kept_symbols, &kept_weights, currency)
            .await?;

        let record = PortfolioRecord {
            id: id.clone(),
            asset_symbols: kept_symbols,
            weights: kept_weights,
            currency: currency.to_string(),
            engine_handle: Some(handle),
        };
        self.store.with(user_id, |ctx| {
            ctx.saved_portfolios.insert(id.clone(), record.clone());
        });
        tracing::info!(user_id, id, dropped = dropped.len(), "portfolio created");

        Ok(CreatedPortfolio { record, dropped })
    }

    /// Fetch a saved record, rebuilding the cached engine handle when
    /// it is absent. The id is never touched by a rebuild.
    pub async fn resolve(&self, user_id: &str, id: &str) -> Result<PortfolioRecord> {
        let mut record = self
            .store
            .with(user_id, |ctx| ctx.saved_portfolios.get(id).cloned())
            .ok_or_else(|| FolioError::IdentifierNotFound(id.to_string()))?;

        if record.engine_handle.is_none() {
            tracing::debug!(user_id, id, "rebuilding evicted engine handle");
            let handle = self
                .engine
                .build_portfolio(&record.asset_symbols, &record.weights, &record.currency)
                .await?;
            record.engine_handle = Some(handle.clone());
            self.store.with(user_id, |ctx| {
                if let Some(saved) = ctx.saved_portfolios.get_mut(id) {
                    saved.engine_handle = Some(handle);
                }
            });
        }

        Ok(record)
    }

    /// Remove a saved portfolio; its id is never handed out again
    pub fn delete(&self, user_id: &str, id: &str) -> Result<()> {
        let removed = self
            .store
            .with(user_id, |ctx| ctx.saved_portfolios.remove(id));
        match removed {
            Some(_) => {
                tracing::info!(user_id, id, "portfolio deleted");
                Ok(())
            }
            None => Err(FolioError::IdentifierNotFound(id.to_string())),
        }
    }

    /// Saved portfolios in stable id order
    pub fn list(&self, user_id: &str) -> Vec<PortfolioRecord> {
        self.store.with(user_id, |ctx: &mut UserContext| {
            let mut records: Vec<PortfolioRecord> =
                ctx.saved_portfolios.values().cloned().collect();
            records.sort_by_key(PortfolioRecord::seq);
            records
        })
    }

    /// Render-time label, e.g. `PF_12 (AAA.X, BBB.X)`.
    ///
    /// Computed from `id + asset_symbols` on every render and never
    /// stored back as an id, so a round trip cannot double-wrap the
    /// identifier.
    pub fn label(record: &PortfolioRecord) -> String {
        format!("{} ({})", record.id, record.asset_symbols.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{EngineHandle, MetricsTable, PriceSeries};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Engine stub: rejects symbols containing `BAD`, counts builds
    #[derive(Default)]
    struct FakeEngine {
        builds: AtomicUsize,
    }

    #[async_trait]
    impl AnalyticsEngine for FakeEngine {
        async fn resolve_symbol(&self, symbol: &str) -> Result<bool> {
            Ok(!symbol.contains("BAD"))
        }

        async fn build_portfolio(
            &self,
            symbols: &[String],
            _weights: &[f64],
            _currency: &str,
        ) -> Result<EngineHandle> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            Ok(EngineHandle::new(symbols.to_vec()))
        }

        async fn describe(&self, _handle: &EngineHandle) -> Result<MetricsTable> {
            Ok(MetricsTable::default())
        }

        async fn price_series(&self, symbol: &str) -> Result<PriceSeries> {
            Ok(PriceSeries {
                symbol: symbol.to_string(),
                dates: Vec::new(),
                values: Vec::new(),
            })
        }

        async fn portfolio_series(&self, _handle: &EngineHandle) -> Result<PriceSeries> {
            Ok(PriceSeries {
                symbol: "PF".to_string(),
                dates: Vec::new(),
                values: Vec::new(),
            })
        }
    }

    fn registry() -> (Arc<ContextStore>, Arc<FakeEngine>, PortfolioRegistry) {
        let store = Arc::new(ContextStore::new());
        let engine = Arc::new(FakeEngine::default());
        let registry = PortfolioRegistry::new(Arc::clone(&store), engine.clone());
        (store, engine, registry)
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let (_, _, registry) = registry();
        let first = registry
            .create("u1", symbols(&["AAA.X", "BBB.X"]), vec![0.5, 0.5], "USD")
            .await
            .unwrap();
        let second = registry
            .create("u1", symbols(&["CCC.X"]), vec![1.0], "USD")
            .await
            .unwrap();
        assert_eq!(first.record.id, "PF_1");
        assert_eq!(second.record.id, "PF_2");
    }

    #[tokio::test]
    async fn test_invalid_symbols_dropped_and_renormalized() {
        let (_, _, registry) = registry();
        let created = registry
            .create(
                "u1",
                symbols(&["AAA.X", "BAD.X", "BBB.X"]),
                vec![0.4, 0.4, 0.2],
                "USD",
            )
            .await
            .unwrap();
        assert_eq!(created.dropped, vec!["BAD.X"]);
        assert_eq!(created.record.asset_symbols, vec!["AAA.X", "BBB.X"]);
        let sum: f64 = created.record.weights.iter().sum();
        assert!((sum - 1.0).abs() < crate::portfolio::WEIGHT_EPSILON);
    }

    #[tokio::test]
    async fn test_length_mismatch_rejected() {
        let (_, _, registry) = registry();
        assert!(registry
            .create("u1", symbols(&["AAA.X"]), vec![0.5, 0.5], "USD")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_rebuild_never_renames() {
        let (store, engine, registry) = registry();
        let created = registry
            .create("u1", symbols(&["AAA.X", "BBB.X"]), vec![0.5, 0.5], "USD")
            .await
            .unwrap();
        let id = created.record.id.clone();

        // evict the cached handle
        store.with("u1", |ctx| {
            if let Some(record) = ctx.saved_portfolios.get_mut(&id) {
                record.engine_handle = None;
            }
        });

        let resolved = registry.resolve("u1", &id).await.unwrap();
        assert_eq!(resolved.id, id);
        assert!(resolved.engine_handle.is_some());
        assert_eq!(engine.builds.load(Ordering::SeqCst), 2);

        // the rebuilt handle is cached back
        let again = registry.resolve("u1", &id).await.unwrap();
        assert_eq!(again.id, id);
        assert_eq!(engine.builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_ids_never_reused_after_delete() {
        let (_, _, registry) = registry();
        let first = registry
            .create("u1", symbols(&["AAA.X"]), vec![1.0], "USD")
            .await
            .unwrap();
        registry.delete("u1", &first.record.id).unwrap();

        let next = registry
            .create("u1", symbols(&["BBB.X"]), vec![1.0], "USD")
            .await
            .unwrap();
        assert_eq!(next.record.id, "PF_2");
    }

    #[tokio::test]
    async fn test_resolve_unknown_id() {
        let (_, _, registry) = registry();
        assert!(matches!(
            registry.resolve("u1", "PF_404").await,
            Err(FolioError::IdentifierNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_id() {
        let (_, _, registry) = registry();
        for symbol in ["A.X", "B.X", "C.X"] {
            registry
                .create("u1", symbols(&[symbol]), vec![1.0], "USD")
                .await
                .unwrap();
        }
        let ids: Vec<String> = registry.list("u1").into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["PF_1", "PF_2", "PF_3"]);
    }

    #[test]
    fn test_label_is_render_only() {
        let record = PortfolioRecord {
            id: "PF_12".to_string(),
            asset_symbols: symbols(&["AAA.X", "BBB.X"]),
            weights: vec![0.5, 0.5],
            currency: "USD".to_string(),
            engine_handle: None,
        };
        assert_eq!(PortfolioRegistry::label(&record), "PF_12 (AAA.X, BBB.X)");
        // the label is not a valid id, so it can never round-trip into one
        assert!(!crate::portfolio::is_portfolio_id(
            &PortfolioRegistry::label(&record)
        ));
    }
}
