//! Portfolio records and weighted-symbol parsing

use crate::error::{FolioError, Result};
use crate::providers::EngineHandle;
use serde::{Deserialize, Serialize};

/// Tolerance when checking that weights sum to 1.0
pub const WEIGHT_EPSILON: f64 = 1e-6;

/// Prefix of every bot-assigned portfolio identifier
pub const PORTFOLIO_ID_PREFIX: &str = "PF_";

/// A saved weighted asset basket.
///
/// `id` is assigned by the identity registry and is never derived from
/// anything the analytics engine returns. The cached `engine_handle`
/// can be dropped and rebuilt at any time from the other fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioRecord {
    /// Stable bot-assigned identifier, e.g. `PF_3`
    pub id: String,
    /// Underlying instrument references, unique within the record
    pub asset_symbols: Vec<String>,
    /// One weight per symbol, summing to 1.0 (±epsilon)
    pub weights: Vec<f64>,
    /// Base currency of the basket
    pub currency: String,
    /// Cached live handle from the analytics engine
    #[serde(skip)]
    pub engine_handle: Option<EngineHandle>,
}

impl PortfolioRecord {
    /// Numeric suffix of the identifier, used for stable ordering
    pub fn seq(&self) -> u64 {
        self.id
            .strip_prefix(PORTFOLIO_ID_PREFIX)
            .and_then(|n| n.parse().ok())
            .unwrap_or(0)
    }
}

/// Whether a token is a reserved bot-assigned portfolio identifier
pub fn is_portfolio_id(token: &str) -> bool {
    token
        .strip_prefix(PORTFOLIO_ID_PREFIX)
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

/// A parsed `SYMBOL[:weight]` token
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedSymbol {
    pub symbol: String,
    pub weight: Option<f64>,
}

/// Parse `SYMBOL[:weight]` tokens.
///
/// Weights must be positive numbers; duplicate symbols are rejected
/// loudly rather than silently merged.
pub fn parse_weighted(tokens: &[String]) -> Result<Vec<WeightedSymbol>> {
    let mut parsed: Vec<WeightedSymbol> = Vec::with_capacity(tokens.len());

    for token in tokens {
        let (symbol, weight) = match token.rsplit_once(':') {
            Some((symbol, raw)) => {
                let weight: f64 = raw.parse().map_err(|_| {
                    FolioError::InvalidInput(format!("bad weight `{raw}` in `{token}`"))
                })?;
                if weight <= 0.0 || !weight.is_finite() {
                    return Err(FolioError::InvalidInput(format!(
                        "weight in `{token}` must be positive"
                    )));
                }
                (symbol.to_string(), Some(weight))
            }
            None => (token.clone(), None),
        };

        if symbol.is_empty() {
            return Err(FolioError::InvalidInput(format!("empty symbol in `{token}`")));
        }
        if parsed.iter().any(|w| w.symbol == symbol) {
            return Err(FolioError::InvalidInput(format!("duplicate symbol `{symbol}`")));
        }
        parsed.push(WeightedSymbol { symbol, weight });
    }

    Ok(parsed)
}

/// Turn parsed tokens into `(symbols, weights)` with weights summing
/// to 1.0.
///
/// Tokens without an explicit weight share the remainder equally; if
/// no token carries a weight the split is equal. The final vector is
/// renormalized so over-specified inputs (e.g. `0.8 0.8`) still sum
/// to 1.0.
pub fn fill_weights(parsed: &[WeightedSymbol]) -> Result<(Vec<String>, Vec<f64>)> {
    if parsed.is_empty() {
        return Err(FolioError::InvalidInput("no symbols given".to_string()));
    }

    let specified: f64 = parsed.iter().filter_map(|w| w.weight).sum();
    let missing = parsed.iter().filter(|w| w.weight.is_none()).count();
    let remainder = (1.0 - specified).max(0.0);
    let fill = if missing > 0 { remainder / missing as f64 } else { 0.0 };

    let symbols: Vec<String> = parsed.iter().map(|w| w.symbol.clone()).collect();
    let mut weights: Vec<f64> = parsed.iter().map(|w| w.weight.unwrap_or(fill)).collect();

    renormalize(&mut weights)?;
    Ok((symbols, weights))
}

/// Scale weights so they sum to exactly 1.0
pub fn renormalize(weights: &mut [f64]) -> Result<()> {
    let sum: f64 = weights.iter().sum();
    if sum <= WEIGHT_EPSILON {
        return Err(FolioError::InvalidInput(
            "weights sum to zero; give at least one positive weight".to_string(),
        ));
    }
    if (sum - 1.0).abs() > WEIGHT_EPSILON {
        for w in weights.iter_mut() {
            *w /= sum;
        }
    }
    Ok(())
}
