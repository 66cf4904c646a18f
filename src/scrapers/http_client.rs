//! Rate-limited, retried HTTP fetcher for the statistics origin.
//!
//! https only, bounded response sizes, capped redirects, exponential
//! backoff between attempts, and a courtesy delay after every request so a
//! scrape run never hammers the origin.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use super::admission::Admission;
use crate::config::Settings;
use crate::error::FetchError;

/// Bodies under this size are treated as empty or blocked pages.
const MIN_RESPONSE_BYTES: usize = 512;

/// Maximum automatic redirects to follow.
const MAX_REDIRECTS: usize = 3;

/// Status and body of one raw HTTP exchange.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// The wire half of the fetcher, separated so retry and validation logic
/// can be tested without a network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<TransportResponse, FetchError>;
}

/// Production transport backed by reqwest.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(settings: &Settings) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Accept",
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert("Accept-Language", HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert("DNT", HeaderValue::from_static("1"));
        headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));

        let client = Client::builder()
            .user_agent(&settings.user_agent)
            .default_headers(headers)
            .timeout(settings.request_timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}

/// Fetcher with retry, backoff, throttling, and response validation.
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    admission: Admission,
    request_delay: Duration,
    retry_attempts: u32,
    max_response_bytes: usize,
}

impl HttpClient {
    pub fn new(settings: &Settings) -> Result<Self, FetchError> {
        let transport = Arc::new(ReqwestTransport::new(settings)?);
        Ok(Self::with_transport(transport, settings))
    }

    /// Build a client over an arbitrary transport (tests inject fakes here).
    pub fn with_transport(transport: Arc<dyn Transport>, settings: &Settings) -> Self {
        Self {
            transport,
            admission: Admission::new(settings.max_concurrent, settings.request_delay),
            request_delay: settings.request_delay,
            retry_attempts: settings.retry_attempts.clamp(1, 5),
            max_response_bytes: settings.max_response_bytes,
        }
    }

    /// Fetch a document, retrying transient failures with exponential backoff.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        validate_url(url)?;

        let _permit = self.admission.acquire().await;

        let mut last_error: Option<FetchError> = None;
        for attempt in 1..=self.retry_attempts {
            if attempt > 1 {
                let backoff = self.request_delay * 2u32.pow(attempt - 2);
                debug!("backing off {backoff:?} before attempt {attempt}");
                tokio::time::sleep(backoff).await;
            }

            debug!("fetching {url} (attempt {attempt}/{})", self.retry_attempts);
            match self.attempt(url).await {
                Ok(body) => {
                    debug!("fetched {url} ({} bytes)", body.len());
                    // Courtesy delay applies even on success.
                    tokio::time::sleep(self.request_delay).await;
                    return Ok(body);
                }
                Err(err) if err.is_retryable() => {
                    warn!(
                        "attempt {attempt}/{} for {url} failed: {err}",
                        self.retry_attempts
                    );
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts: self.retry_attempts,
            source: Box::new(last_error.expect("retry loop runs at least once")),
        })
    }

    async fn attempt(&self, url: &str) -> Result<String, FetchError> {
        let response = self.transport.get(url).await?;

        if !(200..300).contains(&response.status) {
            return Err(FetchError::Status {
                status: response.status,
            });
        }

        let size = response.body.len();
        if size < MIN_RESPONSE_BYTES {
            return Err(FetchError::EmptyResponse { size });
        }
        if size > self.max_response_bytes {
            return Err(FetchError::TooLarge {
                size,
                cap: self.max_response_bytes,
            });
        }

        Ok(response.body)
    }
}

/// Reject malformed or non-https targets before any network traffic.
fn validate_url(url: &str) -> Result<(), FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    if parsed.scheme() != "https" {
        return Err(FetchError::InvalidUrl {
            url: url.to_string(),
            reason: format!("scheme must be https, got {}", parsed.scheme()),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    struct FlakyTransport {
        calls: AtomicUsize,
        fail_first: usize,
        body: String,
    }

    impl FlakyTransport {
        fn new(fail_first: usize, body: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first,
                body: body.to_string(),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for FlakyTransport {
        async fn get(&self, _url: &str) -> Result<TransportResponse, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Err(FetchError::Status { status: 503 })
            } else {
                Ok(TransportResponse {
                    status: 200,
                    body: self.body.clone(),
                })
            }
        }
    }

    fn test_settings() -> Settings {
        Settings {
            base_url: "https://stats.example".to_string(),
            user_agent: "test".to_string(),
            request_delay: Duration::from_millis(1000),
            retry_attempts: 3,
            request_timeout: Duration::from_secs(10),
            max_concurrent: 2,
            max_response_bytes: 10_000,
            database_path: "unused.db".into(),
            cron_schedule: "0 0 3 * * Mon".to_string(),
            timezone: chrono_tz::Europe::Madrid,
            api_host: "127.0.0.1".to_string(),
            api_port: 0,
            leaderboard_api_url: String::new(),
            leaderboard_api_key: String::new(),
        }
    }

    fn big_body() -> String {
        "x".repeat(MIN_RESPONSE_BYTES + 1)
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let transport = Arc::new(FlakyTransport::new(2, &big_body()));
        let client = HttpClient::with_transport(transport.clone(), &test_settings());

        let body = client.fetch("https://stats.example/agents").await.unwrap();
        assert_eq!(body.len(), MIN_RESPONSE_BYTES + 1);
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_configured_attempts_with_backoff() {
        let transport = Arc::new(FlakyTransport::new(usize::MAX, &big_body()));
        let client = HttpClient::with_transport(transport.clone(), &test_settings());

        let start = Instant::now();
        let err = client
            .fetch("https://stats.example/agents")
            .await
            .unwrap_err();
        let elapsed = start.elapsed();

        assert_eq!(transport.calls(), 3);
        match err {
            FetchError::Exhausted {
                attempts, source, ..
            } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, FetchError::Status { status: 503 }));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }

        // Backoff before attempt 2 is base * 2^0, before attempt 3 base * 2^1.
        let base = Duration::from_millis(1000);
        assert!(elapsed >= base + base * 2, "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn rejects_non_https_before_any_request() {
        let transport = Arc::new(FlakyTransport::new(0, &big_body()));
        let client = HttpClient::with_transport(transport.clone(), &test_settings());

        let err = client.fetch("http://stats.example").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
        assert_eq!(transport.calls(), 0);

        let err = client.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn tiny_bodies_are_treated_as_blocked() {
        let transport = Arc::new(FlakyTransport::new(0, "nope"));
        let client = HttpClient::with_transport(transport, &test_settings());

        let err = client.fetch("https://stats.example").await.unwrap_err();
        match err {
            FetchError::Exhausted { source, .. } => {
                assert!(matches!(*source, FetchError::EmptyResponse { size: 4 }));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_bodies_are_rejected() {
        let huge = "x".repeat(20_000);
        let transport = Arc::new(FlakyTransport::new(0, &huge));
        let client = HttpClient::with_transport(transport, &test_settings());

        let err = client.fetch("https://stats.example").await.unwrap_err();
        match err {
            FetchError::Exhausted { source, .. } => {
                assert!(matches!(*source, FetchError::TooLarge { .. }));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }
}
