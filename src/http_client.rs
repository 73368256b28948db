//! HTTP Transport
//!
//! The one network capability the adapters depend on: GET a base endpoint
//! plus path with a parameter list and get parsed JSON back.
//!
//! The reqwest-backed implementation adds:
//! - Semaphore-based global concurrency limiting
//! - Per-source rate limiting
//! - Per-source circuit breakers
//!
//! It never retries. Re-issuing a query is the caller's decision.

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::Client;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::error::{NewsError, Result};
use crate::query::{ApiKey, AuthPlacement, SourceRequest};
use crate::schemas::SourceKind;

const DEFAULT_RATE_LIMIT_RPM: NonZeroU32 = match NonZeroU32::new(60) {
    Some(rpm) => rpm,
    None => unreachable!(),
};

/// HTTP GET returning a parsed JSON body
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, request: &SourceRequest) -> Result<serde_json::Value>;
}

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Maximum concurrent requests across all sources
    pub max_concurrent_requests: usize,
    /// Request timeout
    pub request_timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 10,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("newsdesk/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// reqwest client behind a global concurrency cap
pub struct ResilientHttpClient {
    client: Client,
    semaphore: Arc<Semaphore>,
}

impl ResilientHttpClient {
    pub fn new(config: &HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_requests)),
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(&HttpClientConfig::default())
    }

    /// Gets the number of available permits
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Sends one GET and decodes the body as JSON
    pub async fn get_json(&self, request: &SourceRequest) -> Result<serde_json::Value> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| NewsError::ConnectionLost("Semaphore closed".to_string()))?;

        let url = Url::parse(&request.endpoint())?;

        debug!(
            source = %request.source,
            url = %url,
            params = request.params.len(),
            "Executing HTTP request"
        );

        let mut builder = self.client.get(url).query(&request.params);
        builder = match &request.auth {
            Some(ApiKey { placement: AuthPlacement::Header(name), value }) => builder.header(*name, value),
            Some(ApiKey { placement: AuthPlacement::Query(name), value }) => builder.query(&[(*name, value)]),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NewsError::ApiError {
                code: status.as_u16().to_string(),
                message: body,
            });
        }

        debug!(source = %request.source, status = %status, "Request succeeded");
        Ok(response.json::<serde_json::Value>().await?)
    }
}

/// Rate limiter and circuit breaker for one source
pub struct SourceGuard {
    rate_limiter: DefaultDirectRateLimiter,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl SourceGuard {
    pub fn new(source: SourceKind, rate_limit_rpm: u32, breaker_config: CircuitBreakerConfig) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(rate_limit_rpm).unwrap_or(DEFAULT_RATE_LIMIT_RPM));
        Self {
            rate_limiter: RateLimiter::direct(quota),
            circuit_breaker: Arc::new(CircuitBreaker::new(source, breaker_config)),
        }
    }

    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.circuit_breaker
    }
}

/// Production transport: shared client, per-source protections
pub struct HttpTransport {
    client: ResilientHttpClient,
    guards: HashMap<SourceKind, SourceGuard>,
}

impl HttpTransport {
    pub fn new(client: ResilientHttpClient) -> Self {
        Self {
            client,
            guards: HashMap::new(),
        }
    }

    /// Registers rate limiting and a circuit breaker for `source`
    pub fn with_guard(mut self, source: SourceKind, guard: SourceGuard) -> Self {
        self.guards.insert(source, guard);
        self
    }

    pub fn guard(&self, source: SourceKind) -> Option<&SourceGuard> {
        self.guards.get(&source)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, request: &SourceRequest) -> Result<serde_json::Value> {
        let Some(guard) = self.guards.get(&request.source) else {
            return self.client.get_json(request).await;
        };

        if !guard.circuit_breaker.allow_request() {
            warn!(source = %request.source, "Circuit breaker open, request blocked");
            return Err(NewsError::CircuitBreakerOpen(request.source.to_string()));
        }

        guard.rate_limiter.until_ready().await;

        match self.client.get_json(request).await {
            Ok(body) => {
                guard.circuit_breaker.record_success();
                Ok(body)
            }
            Err(e) => {
                guard.circuit_breaker.record_failure();
                Err(e)
            }
        }
    }
}
