//! Configuration loading
//!
//! Settings come from an optional TOML file, then `DEALBOT_*` environment
//! overrides, and are validated before anything is built from them.

use axum::http::HeaderValue;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{DealbotError, Result};
use crate::llm::OpenAiConfig;
use crate::negotiation::{DiscountBand, DiscountGenerator, NegotiationPolicy, Product};
use crate::types::Currency;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub product: ProductConfig,
    pub negotiation: NegotiationConfig,
    pub generator: GeneratorConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductConfig {
    pub name: String,
    pub description: String,
    pub list_price: Decimal,
    /// Explicit floor; takes precedence over `min_discount_percent`
    pub min_price: Option<Decimal>,
    pub min_discount_percent: Decimal,
    pub currency: Currency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationConfig {
    pub max_attempts: u32,
    pub acceptance_tolerance: Decimal,
    pub discount_band_percent: BandConfig,
    pub accept_token: String,
    pub reject_token: String,
    pub discount_code_length: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BandConfig {
    pub min: Decimal,
    pub max: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing, deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Origins allowed to call the API from a browser; `"*"` allows any
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self {
            name: "MAK wheel set".to_string(),
            description: "A set of 4 wheels by MAK, silver and black.".to_string(),
            list_price: Decimal::from(1500),
            min_price: None,
            min_discount_percent: Decimal::from(20),
            currency: Currency::GBP,
        }
    }
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            acceptance_tolerance: Decimal::new(2, 2),
            discount_band_percent: BandConfig {
                min: Decimal::from(2),
                max: Decimal::from(5),
            },
            accept_token: "Deal!".to_string(),
            reject_token: "No Deal!".to_string(),
            discount_code_length: 8,
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: 8,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5000".to_string(),
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl Config {
    /// Load from `path` (defaults if `None`), apply process environment
    /// overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DealbotError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `DEALBOT_*` overrides; `lookup` is the environment
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = get("DEALBOT_API_KEY").or_else(|| get("OPENAI_API_KEY")) {
            self.generator.api_key = Some(SecretString::from(key));
        }
        if let Some(model) = get("DEALBOT_MODEL") {
            self.generator.model = model;
        }
        if let Some(url) = get("DEALBOT_BASE_URL") {
            self.generator.base_url = url;
        }
        if let Some(bind) = get("DEALBOT_BIND") {
            self.server.bind_address = bind;
        }
        if let Some(level) = get("DEALBOT_LOG") {
            self.logging.level = level;
        }
    }

    /// The effective price floor
    pub fn min_price(&self) -> Decimal {
        let product = &self.product;
        product.min_price.unwrap_or_else(|| {
            (product.list_price * (Decimal::ONE_HUNDRED - product.min_discount_percent)
                / Decimal::ONE_HUNDRED)
                .round_dp(2)
        })
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(DealbotError::InvalidConfig(msg));
        let list = self.product.list_price;
        let min = self.min_price();
        let negotiation = &self.negotiation;
        let band = negotiation.discount_band_percent;

        if list <= Decimal::ZERO {
            return invalid(format!("list_price must be positive, got {}", list));
        }
        if self.product.min_price.is_none()
            && (self.product.min_discount_percent <= Decimal::ZERO
                || self.product.min_discount_percent >= Decimal::ONE_HUNDRED)
        {
            return invalid("min_discount_percent must be between 0 and 100".to_string());
        }
        if min <= Decimal::ZERO || min >= list {
            return invalid(format!("min_price {} must be positive and below list_price {}", min, list));
        }
        if negotiation.max_attempts < 1 {
            return invalid("max_attempts must be at least 1".to_string());
        }
        if negotiation.acceptance_tolerance <= Decimal::ZERO
            || negotiation.acceptance_tolerance >= Decimal::ONE
        {
            return invalid("acceptance_tolerance must be a fraction between 0 and 1".to_string());
        }
        if band.min <= Decimal::ZERO || band.min > band.max {
            return invalid(format!(
                "discount_band_percent needs 0 < min <= max, got {}..{}",
                band.min, band.max
            ));
        }
        let (lowest, highest) = DiscountGenerator::new(self.policy().opening_band).bounds(list);
        if lowest > highest {
            return invalid(format!(
                "discount_band_percent {}..{} holds no whole-cent price on {}",
                band.min, band.max, list
            ));
        }
        if lowest <= min {
            return invalid(format!(
                "opening band reaches {} which is not above min_price {}",
                lowest, min
            ));
        }
        if negotiation.accept_token.trim().is_empty() || negotiation.reject_token.trim().is_empty() {
            return invalid("accept_token and reject_token must not be empty".to_string());
        }
        if negotiation
            .accept_token
            .trim()
            .eq_ignore_ascii_case(negotiation.reject_token.trim())
        {
            return invalid("accept_token and reject_token must differ".to_string());
        }
        if !(4..=32).contains(&negotiation.discount_code_length) {
            return invalid("discount_code_length must be between 4 and 32".to_string());
        }
        if !(1..=60).contains(&self.generator.timeout_secs) {
            return invalid("generator timeout_secs must be between 1 and 60".to_string());
        }
        if let Some(origin) = self
            .server
            .cors_allowed_origins
            .iter()
            .find(|origin| origin.as_str() != "*" && HeaderValue::from_str(origin).is_err())
        {
            return invalid(format!("cors_allowed_origins entry {:?} is not a valid origin", origin));
        }
        Ok(())
    }

    pub fn product(&self) -> Product {
        Product {
            name: self.product.name.clone(),
            description: self.product.description.clone(),
            list_price: self.product.list_price,
            min_price: self.min_price(),
            currency: self.product.currency,
        }
    }

    pub fn policy(&self) -> NegotiationPolicy {
        let negotiation = &self.negotiation;
        NegotiationPolicy {
            max_attempts: negotiation.max_attempts,
            acceptance_tolerance: negotiation.acceptance_tolerance,
            opening_band: DiscountBand {
                min_percent: negotiation.discount_band_percent.min,
                max_percent: negotiation.discount_band_percent.max,
            },
            accept_token: negotiation.accept_token.clone(),
            reject_token: negotiation.reject_token.clone(),
            discount_code_length: negotiation.discount_code_length,
            collaborator_timeout: self.collaborator_timeout(),
        }
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.generator.timeout_secs)
    }

    /// Client settings; fails when no API key is configured
    pub fn openai(&self) -> Result<OpenAiConfig> {
        let api_key = self.generator.api_key.clone().ok_or_else(|| {
            DealbotError::Configuration(
                "no API key: set generator.api_key, DEALBOT_API_KEY or OPENAI_API_KEY".to_string(),
            )
        })?;

        Ok(OpenAiConfig {
            base_url: self.generator.base_url.clone(),
            model: self.generator.model.clone(),
            api_key,
            timeout: self.collaborator_timeout(),
        })
    }

    /// TOML rendering with the API key redacted
    pub fn to_redacted_toml(&self) -> Result<String> {
        let mut rendered = toml::to_string_pretty(self)
            .map_err(|e| DealbotError::Configuration(e.to_string()))?;
        let key_state = if self.generator.api_key.is_some() {
            "<redacted>"
        } else {
            "<unset>"
        };
        rendered.push_str(&format!("\n# generator.api_key = {}\n", key_state));
        Ok(rendered)
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .filter(|key| !key.trim().is_empty())
        .map(SecretString::from))
}
