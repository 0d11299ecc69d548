//! Web Search Provider (C6): unified `search` capability over three variants — snippet-only
//! discovery, extraction-only, and hybrid (discovery + per-URL extraction).

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tracing::{instrument, warn};

use super::error::WebSearchError;
use super::rate_limit::RateLimiter;
use super::trust::{TrustConfig, trust_score};
use crate::types::WebSearchResult;

/// Discovers candidate URLs with short snippets; does not fetch full bodies.
#[async_trait]
pub trait WebSearcher: Send + Sync {
    async fn discover(&self, query: &str, max_results: usize) -> Result<Vec<WebSearchResult>, WebSearchError>;
}

/// Fetches a URL and extracts readable main text.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<String, WebSearchError>;
}

/// Unified capability the tier orchestrator (C7) calls, regardless of which of the three
/// variants (snippet-only, extraction-only, hybrid) backs it.
#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebSearchResult>, WebSearchError>;
}

fn strip_html(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut in_tag = false;
    for c in body.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Thin wrapper over a search API's JSON response, kept minimal since the exact upstream
/// schema is configuration, not part of this contract.
#[derive(Debug, serde::Deserialize)]
struct DiscoveryResponseItem {
    title: String,
    url: String,
    snippet: String,
}

/// Snippet-only discovery backed by an HTTP search API.
pub struct HttpWebSearcher {
    client: Client,
    endpoint: String,
    provider_id: String,
    trust_config: TrustConfig,
    rate_limiter: RateLimiter,
    max_queries_per_minute: u32,
}

impl HttpWebSearcher {
    pub fn new(
        endpoint: impl Into<String>,
        provider_id: impl Into<String>,
        trust_config: TrustConfig,
        max_queries_per_minute: u32,
    ) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            provider_id: provider_id.into(),
            trust_config,
            rate_limiter: RateLimiter::new(),
            max_queries_per_minute,
        }
    }
}

#[async_trait]
impl WebSearcher for HttpWebSearcher {
    #[instrument(skip(self, query))]
    async fn discover(&self, query: &str, max_results: usize) -> Result<Vec<WebSearchResult>, WebSearchError> {
        if !self.rate_limiter.try_acquire(&self.provider_id, self.max_queries_per_minute) {
            return Err(WebSearchError::RateLimited { provider: self.provider_id.clone() });
        }

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("limit", &max_results.to_string())])
            .send()
            .await
            .map_err(|e| WebSearchError::RequestFailed {
                provider: self.provider_id.clone(),
                reason: e.to_string(),
            })?;

        let items: Vec<DiscoveryResponseItem> = response.json().await.map_err(|e| {
            WebSearchError::RequestFailed { provider: self.provider_id.clone(), reason: e.to_string() }
        })?;

        Ok(items
            .into_iter()
            .take(max_results)
            .enumerate()
            .map(|(i, item)| WebSearchResult {
                rank: i + 1,
                trust_score: trust_score(&item.url, &self.trust_config),
                title: item.title,
                snippet_or_content: item.snippet,
                url: item.url,
                provider_id: self.provider_id.clone(),
                retrieved_at: Utc::now(),
                is_full_text: false,
            })
            .collect())
    }
}

/// Extraction-only: fetches each URL and strips markup, no discovery.
pub struct HttpExtractor {
    client: Client,
}

impl HttpExtractor {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }
}

impl Default for HttpExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for HttpExtractor {
    #[instrument(skip(self))]
    async fn extract(&self, url: &str) -> Result<String, WebSearchError> {
        let body = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| WebSearchError::RequestFailed { provider: "extractor".to_string(), reason: e.to_string() })?
            .text()
            .await
            .map_err(|e| WebSearchError::RequestFailed { provider: "extractor".to_string(), reason: e.to_string() })?;
        Ok(strip_html(&body))
    }
}

/// Combines a `WebSearcher` for URL discovery with an `Extractor` for full-text bodies,
/// falling back to the discovered snippet when extraction fails for a given URL.
pub struct HybridWebProvider<S, E> {
    searcher: S,
    extractor: E,
    provider_id: String,
    rate_limiter: RateLimiter,
    max_queries_per_minute: u32,
}

impl<S, E> HybridWebProvider<S, E>
where
    S: WebSearcher,
    E: Extractor,
{
    pub fn new(searcher: S, extractor: E, provider_id: impl Into<String>, max_queries_per_minute: u32) -> Self {
        Self {
            searcher,
            extractor,
            provider_id: provider_id.into(),
            rate_limiter: RateLimiter::new(),
            max_queries_per_minute,
        }
    }

    /// Discovers URLs, then extracts full text for each, up to `max_results`. A URL whose
    /// extraction fails keeps its discovered snippet rather than dropping the result. The call
    /// fails only if every target fails.
    #[instrument(skip(self, query))]
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebSearchResult>, WebSearchError> {
        if !self.rate_limiter.try_acquire(&self.provider_id, self.max_queries_per_minute) {
            return Err(WebSearchError::RateLimited { provider: self.provider_id.clone() });
        }

        let discovered = self.searcher.discover(query, max_results).await?;
        if discovered.is_empty() {
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(discovered.len());
        let mut failures = 0usize;
        for mut result in discovered {
            match self.extractor.extract(&result.url).await {
                Ok(text) if !text.trim().is_empty() => {
                    result.snippet_or_content = text;
                    result.is_full_text = true;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(url = %result.url, error = %e, "extraction failed, keeping snippet");
                    failures += 1;
                }
            }
            results.push(result);
        }

        if failures == results.len() {
            return Err(WebSearchError::AllTargetsFailed { provider: self.provider_id.clone() });
        }
        Ok(results)
    }
}

#[async_trait]
impl WebSearchProvider for HttpWebSearcher {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebSearchResult>, WebSearchError> {
        self.discover(query, max_results).await
    }
}

#[async_trait]
impl<S, E> WebSearchProvider for HybridWebProvider<S, E>
where
    S: WebSearcher,
    E: Extractor,
{
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebSearchResult>, WebSearchError> {
        self.search(query, max_results).await
    }
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;

    pub struct StubSearcher {
        pub results: Vec<WebSearchResult>,
    }

    #[async_trait]
    impl WebSearcher for StubSearcher {
        async fn discover(&self, _query: &str, max_results: usize) -> Result<Vec<WebSearchResult>, WebSearchError> {
            Ok(self.results.iter().take(max_results).cloned().collect())
        }
    }

    pub struct StubExtractor {
        pub fail_urls: Vec<String>,
    }

    #[async_trait]
    impl Extractor for StubExtractor {
        async fn extract(&self, url: &str) -> Result<String, WebSearchError> {
            if self.fail_urls.contains(&url.to_string()) {
                return Err(WebSearchError::RequestFailed {
                    provider: "stub".to_string(),
                    reason: "forced failure".to_string(),
                });
            }
            Ok(format!("full text for {url}"))
        }
    }

    /// Fixed-response [`WebSearchProvider`] for orchestrator/coordinator tests, with an
    /// optional forced error to simulate a rate-limited or timed-out tier.
    pub struct StubWebSearchProvider {
        pub results: Vec<WebSearchResult>,
        pub error: Option<WebSearchError>,
    }

    impl StubWebSearchProvider {
        pub fn with_results(results: Vec<WebSearchResult>) -> Self {
            Self { results, error: None }
        }

        pub fn rate_limited() -> Self {
            Self {
                results: Vec::new(),
                error: Some(WebSearchError::RateLimited { provider: "stub".to_string() }),
            }
        }
    }

    #[async_trait]
    impl WebSearchProvider for StubWebSearchProvider {
        async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<WebSearchResult>, WebSearchError> {
            if let Some(ref e) = self.error {
                return Err(match e {
                    WebSearchError::RateLimited { provider } => {
                        WebSearchError::RateLimited { provider: provider.clone() }
                    }
                    WebSearchError::AllTargetsFailed { provider } => {
                        WebSearchError::AllTargetsFailed { provider: provider.clone() }
                    }
                    WebSearchError::RequestFailed { provider, reason } => {
                        WebSearchError::RequestFailed { provider: provider.clone(), reason: reason.clone() }
                    }
                    WebSearchError::Timeout => WebSearchError::Timeout,
                });
            }
            Ok(self.results.iter().take(max_results).cloned().collect())
        }
    }
}
