use crate::services::{ReferenceMatch, RetryPolicy};
use anyhow::{bail, Context, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Environment {
    Development,
    Testnet,
    Production,
}

/// Subscription price and its conversion into ledger base units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pricing {
    pub price_usd: Decimal,
    pub ton_usd_rate: Decimal,
    pub jetton_decimals: u32,
}

const NANOTON_PER_TON: u64 = 1_000_000_000;

impl Pricing {
    /// Price in nanoTON, rounded up.
    pub fn native_amount(&self) -> Result<u64> {
        if self.ton_usd_rate <= Decimal::ZERO {
            bail!("TON_USD_RATE must be positive");
        }
        (self.price_usd / self.ton_usd_rate * Decimal::from(NANOTON_PER_TON))
            .ceil()
            .to_u64()
            .context("Native amount out of range")
    }

    /// Price in the jetton's smallest unit, rounded up.
    pub fn token_amount(&self) -> Result<u64> {
        let scale = 10u64
            .checked_pow(self.jetton_decimals)
            .context("JETTON_DECIMALS too large")?;
        (self.price_usd * Decimal::from(scale))
            .ceil()
            .to_u64()
            .context("Token amount out of range")
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub host: String,
    pub port: u16,

    // Ledger explorer
    pub tonapi_base_url: String,
    pub tonapi_key: Option<String>,
    pub tonapi_timeout: Duration,
    pub receiving_address: String,
    pub jetton_master_address: String,

    // Pricing
    pub pricing: Pricing,
    pub subscription_days: u32,

    // Verification
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub inter_attempt_delay: Duration,
    pub run_deadline: Duration,
    pub fetch_limit: usize,
    pub reference_match: ReferenceMatch,
    pub reference_prefix: String,

    // Collaborators
    pub redis_url: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_api_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let environment = Self::parse_environment()?;

        let config = Self {
            environment,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_var("PORT", "8080")?,

            tonapi_base_url: std::env::var("TONAPI_BASE_URL")
                .unwrap_or_else(|_| "https://tonapi.io/v2/blockchain".to_string()),
            tonapi_key: std::env::var("TONAPI_KEY").ok().filter(|k| !k.is_empty()),
            tonapi_timeout: Duration::from_secs(Self::parse_var("TONAPI_TIMEOUT_SECS", "10")?),
            receiving_address: std::env::var("RECEIVING_ADDRESS")
                .context("RECEIVING_ADDRESS required")?,
            jetton_master_address: std::env::var("JETTON_MASTER_ADDRESS")
                .context("JETTON_MASTER_ADDRESS required")?,

            pricing: Pricing {
                price_usd: Self::parse_var("SUBSCRIPTION_PRICE_USD", "5")?,
                ton_usd_rate: Self::parse_var("TON_USD_RATE", "5")?,
                jetton_decimals: Self::parse_var("JETTON_DECIMALS", "6")?,
            },
            subscription_days: Self::parse_var("SUBSCRIPTION_DAYS", "30")?,

            max_attempts: Self::parse_var("VERIFY_MAX_ATTEMPTS", "3")?,
            initial_delay: Duration::from_secs(Self::parse_var("VERIFY_INITIAL_DELAY_SECS", "10")?),
            inter_attempt_delay: Duration::from_secs(Self::parse_var(
                "VERIFY_RETRY_DELAY_SECS",
                "5",
            )?),
            run_deadline: Duration::from_secs(Self::parse_var("VERIFY_RUN_DEADLINE_SECS", "120")?),
            fetch_limit: Self::parse_var("VERIFY_FETCH_LIMIT", "20")?,
            reference_match: Self::parse_var("REFERENCE_MATCH", "substring")?,
            reference_prefix: std::env::var("REFERENCE_PREFIX")
                .unwrap_or_else(|_| "sub".to_string()),

            redis_url: std::env::var("REDIS_URL").ok().filter(|u| !u.is_empty()),
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            telegram_api_url: std::env::var("TELEGRAM_API_URL")
                .unwrap_or_else(|_| "https://api.telegram.org".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_delay: self.initial_delay,
            inter_attempt_delay: self.inter_attempt_delay,
            max_attempts: self.max_attempts,
            fetch_limit: self.fetch_limit,
        }
    }

    fn parse_environment() -> Result<Environment> {
        let env = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        match env.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testnet" | "test" => Ok(Environment::Testnet),
            "production" | "prod" => Ok(Environment::Production),
            _ => bail!("Unknown environment: {}", env),
        }
    }

    fn parse_var<T>(var: &str, default: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        std::env::var(var)
            .unwrap_or_else(|_| default.to_string())
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", var))
    }

    fn validate(&self) -> Result<()> {
        if !self.tonapi_base_url.starts_with("http") {
            bail!("TONAPI_BASE_URL must be HTTP(S) URL");
        }
        if self.receiving_address.trim().is_empty() {
            bail!("RECEIVING_ADDRESS must not be empty");
        }
        if self.max_attempts == 0 {
            bail!("VERIFY_MAX_ATTEMPTS must be at least 1");
        }
        if self.subscription_days == 0 {
            bail!("SUBSCRIPTION_DAYS must be at least 1");
        }
        if self.fetch_limit == 0 {
            bail!("VERIFY_FETCH_LIMIT must be at least 1");
        }

        let sleep_budget = self.retry_policy().sleep_budget();
        if self.run_deadline <= sleep_budget {
            bail!(
                "VERIFY_RUN_DEADLINE_SECS ({}s) must exceed the polling delays ({}s), otherwise the last attempts never run",
                self.run_deadline.as_secs(),
                sleep_budget.as_secs()
            );
        }

        // The reference ends up unescaped in the ton:// transfer link
        if self.reference_prefix.is_empty()
            || !self
                .reference_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            bail!("REFERENCE_PREFIX must be non-empty and use only A-Z, a-z, 0-9, '_' or '-'");
        }

        // Surface conversion problems at startup rather than per purchase
        self.pricing.native_amount()?;
        self.pricing.token_amount()?;

        if matches!(self.environment, Environment::Production) && self.tonapi_key.is_none() {
            tracing::warn!("TONAPI_KEY not set, ledger queries will be rate limited");
        }

        tracing::info!(
            "Configuration validated for {:?} environment",
            self.environment
        );

        Ok(())
    }
}
