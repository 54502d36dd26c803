//! Bot configuration

use folio_core::{FolioError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the AI commentary collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// OpenAI-compatible API base, e.g. `http://localhost:1234/v1`
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:1234/v1".to_string(),
            api_key: "not-needed".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Top-level bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Currency used when the user has not chosen one
    pub default_currency: String,
    /// Items per page in listings
    pub page_size: usize,
    /// Minutes before an armed dialog prompt expires
    pub dialog_ttl_minutes: i64,
    /// AI collaborator settings; `None` selects canned commentary
    pub ai: Option<AiConfig>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            default_currency: "USD".to_string(),
            page_size: 10,
            dialog_ttl_minutes: 15,
            ai: None,
        }
    }
}

impl BotConfig {
    pub fn builder() -> BotConfigBuilder {
        BotConfigBuilder::default()
    }

    /// Load settings from environment variables, falling back to
    /// defaults.
    ///
    /// `FOLIO_CURRENCY`, `FOLIO_PAGE_SIZE`, `FOLIO_DIALOG_TTL_MIN`;
    /// the AI collaborator is enabled when `OPENAI_API_BASE` is set,
    /// with `OPENAI_API_KEY` and `OPENAI_MODEL`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(currency) = std::env::var("FOLIO_CURRENCY") {
            config.default_currency = currency;
        }
        if let Ok(raw) = std::env::var("FOLIO_PAGE_SIZE") {
            config.page_size = raw
                .parse()
                .map_err(|_| FolioError::Config(format!("bad FOLIO_PAGE_SIZE `{raw}`")))?;
        }
        if let Ok(raw) = std::env::var("FOLIO_DIALOG_TTL_MIN") {
            config.dialog_ttl_minutes = raw
                .parse()
                .map_err(|_| FolioError::Config(format!("bad FOLIO_DIALOG_TTL_MIN `{raw}`")))?;
        }
        if let Ok(api_base) = std::env::var("OPENAI_API_BASE") {
            config.ai = Some(AiConfig {
                api_base,
                api_key: std::env::var("OPENAI_API_KEY")
                    .unwrap_or_else(|_| "not-needed".to_string()),
                model: std::env::var("OPENAI_MODEL")
                    .unwrap_or_else(|_| AiConfig::default().model),
                ..AiConfig::default()
            });
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(FolioError::Config("page_size must be positive".to_string()));
        }
        if self.dialog_ttl_minutes <= 0 {
            return Err(FolioError::Config(
                "dialog_ttl_minutes must be positive".to_string(),
            ));
        }
        if self.default_currency.len() != 3
            || !self.default_currency.bytes().all(|b| b.is_ascii_uppercase())
        {
            return Err(FolioError::Config(format!(
                "default_currency must be a 3-letter code, got `{}`",
                self.default_currency
            )));
        }
        Ok(())
    }
}

/// Builder for [`BotConfig`]
#[derive(Debug, Default)]
pub struct BotConfigBuilder {
    default_currency: Option<String>,
    page_size: Option<usize>,
    dialog_ttl_minutes: Option<i64>,
    ai: Option<AiConfig>,
}

impl BotConfigBuilder {
    pub fn default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = Some(currency.into());
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn dialog_ttl_minutes(mut self, minutes: i64) -> Self {
        self.dialog_ttl_minutes = Some(minutes);
        self
    }

    pub fn ai(mut self, ai: AiConfig) -> Self {
        self.ai = Some(ai);
        self
    }

    pub fn build(self) -> Result<BotConfig> {
        let defaults = BotConfig::default();
        let config = BotConfig {
            default_currency: self.default_currency.unwrap_or(defaults.default_currency),
            page_size: self.page_size.unwrap_or(defaults.page_size),
            dialog_ttl_minutes: self
                .dialog_ttl_minutes
                .unwrap_or(defaults.dialog_ttl_minutes),
            ai: self.ai,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(BotConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = BotConfig::builder()
            .default_currency("EUR")
            .page_size(5)
            .build()
            .unwrap();
        assert_eq!(config.default_currency, "EUR");
        assert_eq!(config.page_size, 5);
        assert_eq!(config.dialog_ttl_minutes, 15);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(BotConfig::builder().page_size(0).build().is_err());
        assert!(BotConfig::builder().default_currency("usd").build().is_err());
        assert!(BotConfig::builder().dialog_ttl_minutes(0).build().is_err());
    }
}
