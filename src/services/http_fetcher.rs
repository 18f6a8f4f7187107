use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::RetryConfig;
use crate::errors::PipelineError;
use crate::services::response_cache::{CacheKey, ResponseCache};

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), base_delay, max_delay }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Wait before attempt `attempt + 1`, where `attempt` counts from 1.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// One GET against a provider. `secret` parameters are sent but never become
/// part of the cache key; the URL does.
#[derive(Debug, Clone)]
pub struct ProviderRequest<'a> {
    pub provider: &'a str,
    pub url: &'a str,
    pub query: Vec<(&'static str, String)>,
    pub secret: Vec<(&'static str, String)>,
}

impl<'a> ProviderRequest<'a> {
    pub fn new(provider: &'a str, url: &'a str, query: Vec<(&'static str, String)>) -> Self {
        Self { provider, url, query, secret: Vec::new() }
    }

    pub fn with_secret(mut self, name: &'static str, value: String) -> Self {
        self.secret.push((name, value));
        self
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(self.provider, self.url, &self.query)
    }
}

enum AttemptError {
    Transient(String),
    Fatal(String),
}

/// Cached, retrying HTTP client shared by the weather adapters.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    cache: ResponseCache,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, cache: ResponseCache, retry: RetryPolicy) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pv-visualizer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelineError::invalid(format!("http client: {}", e)))?;
        Ok(Self { client, cache, retry })
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Decoded JSON body of `request`, from the cache when a fresh entry
    /// exists. Only bodies that decode are stored.
    pub async fn get_json<T: DeserializeOwned>(&self, request: &ProviderRequest<'_>) -> Result<T, PipelineError> {
        let key = request.cache_key();
        if let Some(body) = self.cache.get(&key).await {
            match serde_json::from_str(&body) {
                Ok(value) => {
                    debug!(provider = request.provider, key = key.as_str(), "cache hit");
                    return Ok(value);
                }
                Err(e) => warn!(provider = request.provider, error = %e, "discarding undecodable cache entry"),
            }
        }
        debug!(provider = request.provider, key = key.as_str(), "cache miss");

        let body = self.get_with_retry(request).await?;
        let value = serde_json::from_str(&body)
            .map_err(|e| PipelineError::remote(request.provider, format!("invalid response body: {}", e)))?;

        if let Err(e) = self.cache.put(&key, &body).await {
            warn!(provider = request.provider, error = %e, "failed to write cache entry");
        }
        Ok(value)
    }

    async fn get_with_retry(&self, request: &ProviderRequest<'_>) -> Result<String, PipelineError> {
        let mut attempt = 1;
        loop {
            match self.attempt(request).await {
                Ok(body) => return Ok(body),
                Err(AttemptError::Fatal(reason)) => {
                    warn!(provider = request.provider, attempt, %reason, "request rejected");
                    return Err(PipelineError::remote(request.provider, reason));
                }
                Err(AttemptError::Transient(reason)) if attempt >= self.retry.max_attempts => {
                    warn!(provider = request.provider, attempt, %reason, "giving up after retries");
                    return Err(PipelineError::remote(
                        request.provider,
                        format!("{} (after {} attempts)", reason, attempt),
                    ));
                }
                Err(AttemptError::Transient(reason)) => {
                    let delay = self.retry.delay_after(attempt);
                    info!(provider = request.provider, attempt, ?delay, %reason, "retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(&self, request: &ProviderRequest<'_>) -> Result<String, AttemptError> {
        let response = self
            .client
            .get(request.url)
            .query(&request.query)
            .query(&request.secret)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() || e.is_request() {
                    AttemptError::Transient(e.to_string())
                } else {
                    AttemptError::Fatal(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AttemptError::Transient(format!("status {}", status)));
        }
        if !status.is_success() {
            return Err(AttemptError::Fatal(format!("status {}", status)));
        }
        response.text().await.map_err(|e| AttemptError::Transient(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fetcher, serve, temp_cache_dir, HitCounter};
    use axum::{http::StatusCode as AxumStatus, routing::get, Json, Router};

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::new(5, Duration::from_millis(500), Duration::from_millis(3000));
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(4), Duration::from_millis(3000));
        assert_eq!(policy.delay_after(40), Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn test_persistent_503_fails_without_caching() {
        let hits = HitCounter::default();
        let counter = hits.clone();
        let router = Router::new().route(
            "/archive",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.hit();
                    AxumStatus::SERVICE_UNAVAILABLE
                }
            }),
        );
        let base = serve(router).await;
        let url = format!("{}/archive", base);
        let fetcher = fetcher(temp_cache_dir());
        let request = ProviderRequest::new("open-meteo", &url, vec![("latitude", "40.7128".into())]);

        let err = fetcher.get_json::<serde_json::Value>(&request).await.unwrap_err();
        assert!(matches!(err, PipelineError::RemoteFetchFailure { .. }), "got {:?}", err);
        assert_eq!(hits.count(), 5);
        assert!(!fetcher.cache().contains(&request.cache_key()).await);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_errors() {
        let hits = HitCounter::default();
        let counter = hits.clone();
        let router = Router::new().route(
            "/archive",
            get(move || {
                let counter = counter.clone();
                async move {
                    if counter.hit() < 3 {
                        Err(AxumStatus::BAD_GATEWAY)
                    } else {
                        Ok(Json(serde_json::json!({ "ok": true })))
                    }
                }
            }),
        );
        let base = serve(router).await;
        let url = format!("{}/archive", base);
        let fetcher = fetcher(temp_cache_dir());
        let request = ProviderRequest::new("open-meteo", &url, Vec::new());

        let value: serde_json::Value = fetcher.get_json(&request).await.unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(hits.count(), 3);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let hits = HitCounter::default();
        let counter = hits.clone();
        let router = Router::new().route(
            "/archive",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.hit();
                    AxumStatus::BAD_REQUEST
                }
            }),
        );
        let base = serve(router).await;
        let url = format!("{}/archive", base);
        let fetcher = fetcher(temp_cache_dir());
        let request = ProviderRequest::new("open-meteo", &url, Vec::new());

        assert!(fetcher.get_json::<serde_json::Value>(&request).await.is_err());
        assert_eq!(hits.count(), 1);
    }

    #[tokio::test]
    async fn test_second_call_served_from_cache() {
        let hits = HitCounter::default();
        let counter = hits.clone();
        let router = Router::new().route(
            "/archive",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.hit();
                    Json(serde_json::json!({ "hourly": { "time": [1, 2, 3] } }))
                }
            }),
        );
        let base = serve(router).await;
        let url = format!("{}/archive", base);
        let fetcher = fetcher(temp_cache_dir());
        let request = ProviderRequest::new("open-meteo", &url, vec![("start_date", "2023-06-21".into())])
            .with_secret("appid", "secret".into());

        let first: serde_json::Value = fetcher.get_json(&request).await.unwrap();
        let second: serde_json::Value = fetcher.get_json(&request).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(hits.count(), 1);
        assert!(!request.cache_key().as_str().contains("secret"));
    }

    #[tokio::test]
    async fn test_same_provider_at_other_url_is_not_shared() {
        let hits = HitCounter::default();
        let counter = hits.clone();
        let router = Router::new().route(
            "/{mirror}/archive",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.hit();
                    Json(serde_json::json!({ "hourly": {} }))
                }
            }),
        );
        let base = serve(router).await;
        let primary = format!("{}/a/archive", base);
        let mirror = format!("{}/b/archive", base);
        let fetcher = fetcher(temp_cache_dir());
        let query = vec![("start_date", "2023-06-21".to_string())];

        let _: serde_json::Value = fetcher.get_json(&ProviderRequest::new("open-meteo", &primary, query.clone())).await.unwrap();
        let _: serde_json::Value = fetcher.get_json(&ProviderRequest::new("open-meteo", &mirror, query)).await.unwrap();
        assert_eq!(hits.count(), 2);
    }
}
