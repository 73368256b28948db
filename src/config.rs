//! Configuration for the news aggregation service
//!
//! Values come from the environment (and `.env`). API keys are opaque:
//! they are only ever placed where each source expects them.

use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::http_client::HttpClientConfig;
use crate::schemas::SourceKind;
use crate::sources::archive::NYT_BASE_URL;
use crate::sources::general::NEWSAPI_BASE_URL;
use crate::sources::magazine::GUARDIAN_BASE_URL;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // API keys, one per source
    pub news_api_key: Option<String>,
    pub nyt_api_key: Option<String>,
    pub guardian_api_key: Option<String>,

    // Base URLs; point these at the proxy when keys are injected there
    #[serde(default = "default_newsapi_base_url")]
    pub newsapi_base_url: String,
    #[serde(default = "default_nyt_base_url")]
    pub nyt_base_url: String,
    #[serde(default = "default_guardian_base_url")]
    pub guardian_base_url: String,

    // Transport
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    // Rate limiting (requests per minute)
    #[serde(default = "default_newsapi_rate_limit")]
    pub newsapi_rate_limit_rpm: u32,
    #[serde(default = "default_nyt_rate_limit")]
    pub nyt_rate_limit_rpm: u32,
    #[serde(default = "default_guardian_rate_limit")]
    pub guardian_rate_limit_rpm: u32,

    // Circuit breaker
    #[serde(default = "default_circuit_breaker_threshold")]
    pub circuit_breaker_failure_threshold: u32,
    #[serde(default = "default_circuit_breaker_timeout")]
    pub circuit_breaker_open_duration_secs: u64,
}

fn default_newsapi_base_url() -> String {
    NEWSAPI_BASE_URL.to_string()
}

fn default_nyt_base_url() -> String {
    NYT_BASE_URL.to_string()
}

fn default_guardian_base_url() -> String {
    GUARDIAN_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_concurrent_requests() -> usize {
    10
}

fn default_newsapi_rate_limit() -> u32 {
    30
}

fn default_nyt_rate_limit() -> u32 {
    5 // Article Search: 5 requests/minute
}

fn default_guardian_rate_limit() -> u32 {
    60
}

fn default_circuit_breaker_threshold() -> u32 {
    5
}

fn default_circuit_breaker_timeout() -> u64 {
    30
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Checks that every base URL parses
    pub fn validate(&self) -> Result<()> {
        for kind in SourceKind::ALL {
            let base = self.base_url(kind);
            Url::parse(&base).map_err(|e| anyhow::anyhow!("invalid base URL for {}: {} ({})", kind, base, e))?;
        }
        Ok(())
    }

    pub fn base_url(&self, kind: SourceKind) -> String {
        match kind {
            SourceKind::General => self.newsapi_base_url.clone(),
            SourceKind::Archive => self.nyt_base_url.clone(),
            SourceKind::Magazine => self.guardian_base_url.clone(),
        }
    }

    /// Non-blank API key for `kind`, if configured
    pub fn api_key(&self, kind: SourceKind) -> Option<String> {
        let key = match kind {
            SourceKind::General => &self.news_api_key,
            SourceKind::Archive => &self.nyt_api_key,
            SourceKind::Magazine => &self.guardian_api_key,
        };
        key.as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
    }

    pub fn has_key(&self, kind: SourceKind) -> bool {
        self.api_key(kind).is_some()
    }

    pub fn rate_limit_rpm(&self, kind: SourceKind) -> u32 {
        match kind {
            SourceKind::General => self.newsapi_rate_limit_rpm,
            SourceKind::Archive => self.nyt_rate_limit_rpm,
            SourceKind::Magazine => self.guardian_rate_limit_rpm,
        }
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            max_concurrent_requests: self.max_concurrent_requests,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            ..Default::default()
        }
    }

    pub fn circuit_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.circuit_breaker_failure_threshold,
            open_duration: Duration::from_secs(self.circuit_breaker_open_duration_secs),
        }
    }
}
