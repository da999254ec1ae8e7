//! Configuration module
//!
//! Settings for talking to the statement ingestion API and tuning the drop
//! pipeline's timers. Loaded from the environment (and `.env` when present).

use std::env;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:3000";
const DEFAULT_API_PREFIX: &str = "/py-api";
const TOAST_TTL_MS: u64 = 5000;
const COMPLETION_DELAY_MS: u64 = 2000;
const HTTP_TIMEOUT_SECS: u64 = 60;

/// What the session provider hands to the pipeline: who is uploading, and where to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub organization_id: String,
    pub api_key: String,
    pub base_url: String,
}

/// Drop pipeline configuration
#[derive(Clone, Debug)]
pub struct DropConfig {
    pub api_url: String,
    pub api_key: String,
    pub organization_id: String,
    /// Path prefix in front of `/projects/...` (the ingestion API is mounted behind a rewrite).
    pub api_prefix: String,
    /// How long terminal toasts stay visible.
    pub toast_ttl: Duration,
    /// Delay before the worker reports a queued statement as completed.
    pub completion_delay: Duration,
    pub http_timeout: Duration,
}

impl DropConfig {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        organization_id: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            organization_id: organization_id.into(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            toast_ttl: Duration::from_millis(TOAST_TTL_MS),
            completion_delay: Duration::from_millis(COMPLETION_DELAY_MS),
            http_timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
        }
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let api_url = env::var("STMTDROP_API_URL")
            .or_else(|_| env::var("API_URL"))
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let api_key = env::var("STMTDROP_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .map_err(|_| anyhow::anyhow!("Missing API key. Set STMTDROP_API_KEY or API_KEY"))?;

        let organization_id = env::var("STMTDROP_ORGANIZATION_ID").map_err(|_| {
            anyhow::anyhow!("Missing organization id. Set STMTDROP_ORGANIZATION_ID")
        })?;

        let mut config = Self::new(api_url, api_key, organization_id);

        config.api_prefix = env::var("STMTDROP_API_PREFIX")
            .unwrap_or_else(|_| DEFAULT_API_PREFIX.to_string());
        config.toast_ttl = Duration::from_millis(
            env::var("STMTDROP_TOAST_TTL_MS")
                .unwrap_or_else(|_| TOAST_TTL_MS.to_string())
                .parse::<u64>()
                .unwrap_or(TOAST_TTL_MS),
        );
        config.completion_delay = Duration::from_millis(
            env::var("STMTDROP_COMPLETION_DELAY_MS")
                .unwrap_or_else(|_| COMPLETION_DELAY_MS.to_string())
                .parse::<u64>()
                .unwrap_or(COMPLETION_DELAY_MS),
        );
        config.http_timeout = Duration::from_secs(
            env::var("STMTDROP_HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| HTTP_TIMEOUT_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(HTTP_TIMEOUT_SECS),
        );

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(anyhow::anyhow!(
                "STMTDROP_API_URL must be an http(s) URL, got {}",
                self.api_url
            ));
        }

        if self.api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("STMTDROP_API_KEY must not be empty"));
        }

        if self.organization_id.trim().is_empty() {
            return Err(anyhow::anyhow!("STMTDROP_ORGANIZATION_ID must not be empty"));
        }

        if !self.api_prefix.is_empty() && !self.api_prefix.starts_with('/') {
            return Err(anyhow::anyhow!("STMTDROP_API_PREFIX must start with '/'"));
        }

        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            organization_id: self.organization_id.clone(),
            api_key: self.api_key.clone(),
            base_url: self.api_url.clone(),
        }
    }
}
