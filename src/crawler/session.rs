//! HTTP session policy and client
//!
//! This module handles all outbound HTTP requests for the crawler, including:
//! - Choosing a user-agent (fixed or rotated) and an optional proxy
//! - Building a client with the fixed browser-like headers
//! - Bounded retry with exponential backoff for idempotent methods
//! - Error classification into `FetchError`

use crate::config::SessionConfig;
use crate::FetchError;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONNECTION, CONTENT_TYPE,
    UPGRADE_INSECURE_REQUESTS,
};
use reqwest::{Client, Method, Proxy, Response};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Statuses that are retried for idempotent requests
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Desktop browser user-agents drawn from when rotation is enabled
pub const USER_AGENT_POOL: [&str; 9] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36 Edg/91.0.864.59",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.107 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/96.0.4664.110 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/97.0.4692.71 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/96.0.4664.110 Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:95.0) Gecko/20100101 Firefox/95.0",
];

const ACCEPT_VALUE: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.5";

/// The resolved request policy for one session
///
/// User-agent and proxy are chosen once, when the policy is built, and stay
/// fixed for every request the session makes.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPolicy {
    /// The effective user-agent sent with every request
    pub user_agent: String,

    /// Whether `user_agent` was drawn from the rotation pool
    pub rotate: bool,

    /// Retries allowed after the first attempt
    pub max_retries: u32,

    pub retryable_statuses: Vec<u16>,

    /// Base delay; attempt `n` waits `backoff_factor * 2^n`
    pub backoff_factor: Duration,

    /// Proxy applied to both http and https traffic
    pub proxy: Option<String>,
}

impl SessionPolicy {
    /// Builds a policy from configuration using the thread-local RNG
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::from_config_with_rng(config, &mut rand::thread_rng())
    }

    /// Builds a policy from configuration with an explicit RNG
    pub fn from_config_with_rng<R: Rng + ?Sized>(config: &SessionConfig, rng: &mut R) -> Self {
        Self {
            user_agent: select_user_agent(config, rng),
            rotate: config.rotate_user_agents,
            max_retries: config.max_retries,
            retryable_statuses: RETRYABLE_STATUSES.to_vec(),
            backoff_factor: config.backoff_factor(),
            proxy: select_proxy(config, rng),
        }
    }

    pub fn is_retryable(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Delay before retry number `attempt` (starting at 0)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_factor
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Picks the effective user-agent
///
/// With rotation enabled the configured agent joins the browser pool and one
/// entry is drawn uniformly.
pub fn select_user_agent<R: Rng + ?Sized>(config: &SessionConfig, rng: &mut R) -> String {
    if !config.rotate_user_agents {
        return config.user_agent.clone();
    }

    let mut pool: Vec<&str> = USER_AGENT_POOL.to_vec();
    pool.push(config.user_agent.as_str());
    pool.choose(rng)
        .map(|agent| agent.to_string())
        .unwrap_or_else(|| config.user_agent.clone())
}

/// Picks a proxy when proxying is enabled and the list is non-empty
pub fn select_proxy<R: Rng + ?Sized>(config: &SessionConfig, rng: &mut R) -> Option<String> {
    if !config.use_proxies {
        return None;
    }
    config.proxies.choose(rng).cloned()
}

/// A successfully fetched response
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was requested
    pub url: Url,

    /// URL after redirects
    pub final_url: Url,

    pub status: u16,

    /// Content-Type header value, if present
    pub content_type: Option<String>,

    pub body: Vec<u8>,
}

impl FetchedPage {
    /// Whether the Content-Type indicates an HTML document
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
            .unwrap_or(false)
    }

    /// The body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    async fn read(url: &Url, response: Response) -> Result<Self, FetchError> {
        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await.map_err(|e| FetchError::Request {
            url: url.to_string(),
            source: e,
        })?;

        Ok(Self {
            url: url.clone(),
            final_url,
            status,
            content_type,
            body: body.to_vec(),
        })
    }
}

/// An HTTP session: a configured client plus its retry policy
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    policy: SessionPolicy,
}

impl Session {
    /// Builds the HTTP client for a policy
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Client` if the user-agent is not a valid header
    /// value or the proxy URL is rejected.
    pub fn new(policy: SessionPolicy) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));

        let mut builder = Client::builder()
            .user_agent(policy.user_agent.as_str())
            .default_headers(headers)
            .gzip(true)
            .brotli(true);

        if let Some(proxy) = &policy.proxy {
            let proxy = Proxy::all(proxy.as_str())
                .map_err(|e| FetchError::Client(format!("invalid proxy {}: {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        debug!(
            user_agent = %policy.user_agent,
            proxy = ?policy.proxy,
            "Built HTTP session"
        );

        Ok(Self { client, policy })
    }

    /// Resolves a policy from configuration and builds the session
    pub fn from_config(config: &SessionConfig) -> Result<Self, FetchError> {
        Self::new(SessionPolicy::from_config(config))
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Sends a GET request with retries
    pub async fn get(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchError> {
        self.send(Method::GET, url, timeout).await
    }

    /// Sends a request, retrying transient failures
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 429, 500, 502, 503, 504 | Retry up to `max_retries` times |
    /// | Connect error / timeout | Retry up to `max_retries` times |
    /// | Any other non-2xx status | Immediate `FetchError::Status` |
    /// | Any other request error | Immediate `FetchError::Request` |
    ///
    /// Only `GET`, `HEAD` and `OPTIONS` are retried. Retry `n` (from 0) is
    /// preceded by a sleep of `backoff_factor * 2^n`.
    pub async fn send(
        &self,
        method: Method,
        url: &Url,
        timeout: Duration,
    ) -> Result<FetchedPage, FetchError> {
        let idempotent = matches!(method, Method::GET | Method::HEAD | Method::OPTIONS);
        let mut attempt: u32 = 0;

        loop {
            let result = self
                .client
                .request(method.clone(), url.clone())
                .timeout(timeout)
                .send()
                .await;

            let can_retry = idempotent && attempt < self.policy.max_retries;

            match result {
                Ok(response) => {
                    let status = response.status();

                    if can_retry && self.policy.is_retryable(status.as_u16()) {
                        let delay = self.policy.backoff(attempt);
                        warn!(
                            url = %url,
                            status = status.as_u16(),
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            "Retryable status, backing off"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    if !status.is_success() {
                        return Err(FetchError::Status {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }

                    return FetchedPage::read(url, response).await;
                }
                Err(e) => {
                    if can_retry && (e.is_connect() || e.is_timeout()) {
                        let delay = self.policy.backoff(attempt);
                        warn!(
                            url = %url,
                            error = %e,
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            "Transient request failure, backing off"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    return Err(FetchError::Request {
                        url: url.to_string(),
                        source: e,
                    });
                }
            }
        }
    }
}
