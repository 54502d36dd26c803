//! Self-contained analytics engine and chart renderer
//!
//! Produces deterministic synthetic monthly series derived from the
//! symbol name, so every run (and every test) sees the same data
//! without network access. The chart renderer emits small SVG
//! documents as the image bytes.

use async_trait::async_trait;
use chrono::NaiveDate;
use folio_core::{
    AnalyticsEngine, ChartKind, ChartRenderer, ChartSource, EngineHandle, FolioError,
    MetricsRow, MetricsTable, PriceSeries, Result,
};

/// Months of synthetic history per instrument
const HISTORY_MONTHS: usize = 120;

/// Inner type behind [`EngineHandle`] for the local engine
#[derive(Debug, Clone)]
struct LocalBasket {
    symbols: Vec<String>,
    weights: Vec<f64>,
    currency: String,
}

/// Deterministic offline analytics engine
#[derive(Debug, Default)]
pub struct LocalAnalytics;

impl LocalAnalytics {
    /// `TICKER.NS` shape: alphanumeric ticker, dot, 1-4 letter namespace
    fn symbol_shape_ok(symbol: &str) -> bool {
        match symbol.split_once('.') {
            Some((ticker, ns)) => {
                !ticker.is_empty()
                    && ticker.bytes().all(|b| b.is_ascii_alphanumeric())
                    && (1..=4).contains(&ns.len())
                    && ns.bytes().all(|b| b.is_ascii_uppercase())
            }
            None => false,
        }
    }

    fn seed(symbol: &str) -> u64 {
        // FNV-1a, stable across runs and platforms
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in symbol.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        hash
    }

    fn synthetic_series(symbol: &str) -> PriceSeries {
        let mut state = Self::seed(symbol);
        let mut next = move || {
            // LCG, top bits only
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            (state >> 33) as f64 / f64::from(u32::MAX >> 1)
        };

        let drift = 0.002 + next() * 0.008;
        let noise = 0.02 + next() * 0.05;

        let mut dates = Vec::with_capacity(HISTORY_MONTHS);
        let mut values = Vec::with_capacity(HISTORY_MONTHS);
        let mut value = 100.0;
        for month in 0..HISTORY_MONTHS {
            let year = 2016 + (month / 12) as i32;
            let month_of_year = (month % 12) as u32 + 1;
            if let Some(date) = NaiveDate::from_ymd_opt(year, month_of_year, 1) {
                dates.push(date);
                values.push(value);
            }
            value *= 1.0 + drift + (next() - 0.5) * 2.0 * noise;
        }

        PriceSeries {
            symbol: symbol.to_string(),
            dates,
            values,
        }
    }

    fn basket(handle: &EngineHandle) -> Result<&LocalBasket> {
        handle.downcast_ref::<LocalBasket>().ok_or_else(|| {
            FolioError::InvalidInput("handle was not built by this engine".to_string())
        })
    }

    fn weighted_series(basket: &LocalBasket) -> PriceSeries {
        let parts: Vec<PriceSeries> = basket
            .symbols
            .iter()
            .map(|s| Self::synthetic_series(s))
            .collect();
        let len = parts.iter().map(|p| p.values.len()).min().unwrap_or(0);

        let dates = parts
            .first()
            .map(|p| p.dates[..len].to_vec())
            .unwrap_or_default();
        let values = (0..len)
            .map(|i| {
                parts
                    .iter()
                    .zip(&basket.weights)
                    .map(|(part, weight)| part.values[i] / part.values[0] * 100.0 * weight)
                    .sum()
            })
            .collect();

        PriceSeries {
            symbol: basket.symbols.join("+"),
            dates,
            values,
        }
    }

    fn annualized(series: &PriceSeries) -> Option<(f64, f64)> {
        let first = *series.values.first()?;
        let last = *series.values.last()?;
        if series.values.len() < 2 || first <= 0.0 {
            return None;
        }
        let years = (series.values.len() - 1) as f64 / 12.0;
        let cagr = (last / first).powf(1.0 / years) - 1.0;

        let returns: Vec<f64> = series
            .values
            .windows(2)
            .filter(|w| w[0] > 0.0)
            .map(|w| w[1] / w[0] - 1.0)
            .collect();
        let mean = returns.iter().sum::<f64>() / returns.len() as f64;
        let variance =
            returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
        let volatility = variance.sqrt() * 12f64.sqrt();

        Some((cagr, volatility))
    }
}

#[async_trait]
impl AnalyticsEngine for LocalAnalytics {
    async fn resolve_symbol(&self, symbol: &str) -> Result<bool> {
        Ok(Self::symbol_shape_ok(symbol))
    }

    async fn build_portfolio(
        &self,
        symbols: &[String],
        weights: &[f64],
        currency: &str,
    ) -> Result<EngineHandle> {
        Ok(EngineHandle::new(LocalBasket {
            symbols: symbols.to_vec(),
            weights: weights.to_vec(),
            currency: currency.to_string(),
        }))
    }

    async fn describe(&self, handle: &EngineHandle) -> Result<MetricsTable> {
        let basket = Self::basket(handle)?;
        let series = Self::weighted_series(basket);
        let (cagr, volatility) = Self::annualized(&series).unwrap_or((0.0, 0.0));

        Ok(MetricsTable {
            columns: vec![format!("Portfolio ({})", basket.currency)],
            rows: vec![
                MetricsRow {
                    metric: "CAGR".to_string(),
                    values: vec![format!("{:.1}%", cagr * 100.0)],
                },
                MetricsRow {
                    metric: "Volatility".to_string(),
                    values: vec![format!("{:.1}%", volatility * 100.0)],
                },
                MetricsRow {
                    metric: "Assets".to_string(),
                    values: vec![basket.symbols.len().to_string()],
                },
            ],
        })
    }

    async fn price_series(&self, symbol: &str) -> Result<PriceSeries> {
        if !Self::symbol_shape_ok(symbol) {
            return Err(FolioError::InvalidInput(format!(
                "unknown symbol `{symbol}`"
            )));
        }
        Ok(Self::synthetic_series(symbol))
    }

    async fn portfolio_series(&self, handle: &EngineHandle) -> Result<PriceSeries> {
        Ok(Self::weighted_series(Self::basket(handle)?))
    }
}

/// Renders line charts as standalone SVG documents
#[derive(Debug, Default)]
pub struct LocalChartRenderer;

const CHART_WIDTH: f64 = 800.0;
const CHART_HEIGHT: f64 = 400.0;
const PALETTE: &[&str] = &["#2563eb", "#dc2626", "#16a34a", "#9333ea", "#ea580c"];

impl LocalChartRenderer {
    fn transform(values: &[f64], kind: ChartKind) -> Vec<f64> {
        match kind {
            // normalize to growth of 1
            ChartKind::Wealth => {
                let first = values.first().copied().filter(|v| *v != 0.0).unwrap_or(1.0);
                values.iter().map(|v| v / first).collect()
            }
            // distance below the running maximum
            ChartKind::Drawdowns => {
                let mut peak = f64::MIN;
                values
                    .iter()
                    .map(|v| {
                        peak = peak.max(*v);
                        if peak > 0.0 {
                            v / peak - 1.0
                        } else {
                            0.0
                        }
                    })
                    .collect()
            }
            // synthetic payout proportional to level
            ChartKind::Dividends => values.iter().map(|v| v * 0.02).collect(),
        }
    }

    fn polyline(values: &[f64], min: f64, max: f64) -> String {
        let span = (max - min).max(f64::EPSILON);
        let step = if values.len() > 1 {
            CHART_WIDTH / (values.len() - 1) as f64
        } else {
            0.0
        };
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let x = i as f64 * step;
                let y = CHART_HEIGHT - (v - min) / span * CHART_HEIGHT;
                format!("{x:.1},{y:.1}")
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl ChartRenderer for LocalChartRenderer {
    async fn render(&self, source: &ChartSource, kind: ChartKind) -> Result<Vec<u8>> {
        let series: Vec<PriceSeries> = match source {
            ChartSource::Series(series) => series.clone(),
            ChartSource::Handle(handle) => {
                vec![LocalAnalytics::weighted_series(LocalAnalytics::basket(
                    handle,
                )?)]
            }
        };
        if series.iter().all(|s| s.values.is_empty()) {
            return Err(FolioError::InvalidInput("nothing to chart".to_string()));
        }

        let transformed: Vec<(String, Vec<f64>)> = series
            .iter()
            .map(|s| (s.symbol.clone(), Self::transform(&s.values, kind)))
            .collect();
        let min = transformed
            .iter()
            .flat_map(|(_, v)| v.iter().copied())
            .fold(f64::INFINITY, f64::min);
        let max = transformed
            .iter()
            .flat_map(|(_, v)| v.iter().copied())
            .fold(f64::NEG_INFINITY, f64::max);

        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {CHART_WIDTH} {CHART_HEIGHT}\">\
             <rect width=\"100%\" height=\"100%\" fill=\"white\"/>"
        );
        for (i, (symbol, values)) in transformed.iter().enumerate() {
            let color = PALETTE[i % PALETTE.len()];
            svg.push_str(&format!(
                "<polyline fill=\"none\" stroke=\"{color}\" stroke-width=\"2\" \
                 points=\"{}\"><title>{symbol}</title></polyline>",
                Self::polyline(values, min, max)
            ));
        }
        svg.push_str("</svg>");
        Ok(svg.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_symbol_shape_validation() {
        let engine = LocalAnalytics;
        assert!(engine.resolve_symbol("VOO.US").await.unwrap());
        assert!(engine.resolve_symbol("AAA.X").await.unwrap());
        assert!(!engine.resolve_symbol("VOO").await.unwrap());
        assert!(!engine.resolve_symbol("VOO.us").await.unwrap());
        assert!(!engine.resolve_symbol(".US").await.unwrap());
    }

    #[tokio::test]
    async fn test_series_is_deterministic() {
        let engine = LocalAnalytics;
        let a = engine.price_series("VOO.US").await.unwrap();
        let b = engine.price_series("VOO.US").await.unwrap();
        assert_eq!(a.values, b.values);
        assert_eq!(a.values.len(), HISTORY_MONTHS);

        let other = engine.price_series("AGG.US").await.unwrap();
        assert_ne!(a.values, other.values);
    }

    #[tokio::test]
    async fn test_portfolio_round_trip() {
        let engine = LocalAnalytics;
        let handle = engine
            .build_portfolio(
                &["AAA.X".to_string(), "BBB.X".to_string()],
                &[0.5, 0.5],
                "USD",
            )
            .await
            .unwrap();

        let table = engine.describe(&handle).await.unwrap();
        assert_eq!(table.rows.len(), 3);

        let series = engine.portfolio_series(&handle).await.unwrap();
        assert_eq!(series.values.len(), HISTORY_MONTHS);
        // weighted series is normalized to a 100 base
        assert!((series.values[0] - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_foreign_handle_rejected() {
        let engine = LocalAnalytics;
        let foreign = EngineHandle::new("not a basket".to_string());
        assert!(engine.describe(&foreign).await.is_err());
    }

    #[test]
    fn test_drawdown_transform_never_positive() {
        let out = LocalChartRenderer::transform(&[100.0, 120.0, 90.0, 110.0], ChartKind::Drawdowns);
        assert!(out.iter().all(|v| *v <= 0.0));
        // new peak resets the drawdown to zero
        assert!((out[1] - 0.0).abs() < 1e-12);
        assert!((out[2] - (90.0 / 120.0 - 1.0)).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_render_produces_svg() {
        let renderer = LocalChartRenderer;
        let source = ChartSource::Series(vec![PriceSeries {
            symbol: "VOO.US".to_string(),
            dates: Vec::new(),
            values: vec![100.0, 110.0, 105.0],
        }]);
        let bytes = renderer.render(&source, ChartKind::Wealth).await.unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("<svg"));
        assert!(text.contains("polyline"));
    }
}
