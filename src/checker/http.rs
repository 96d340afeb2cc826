// src/checker/http.rs
// =============================================================================
// Fetches pages over HTTP.
//
// The crawler only talks to the network through the Fetcher trait, so tests
// (or another transport) can swap in their own implementation. HttpFetcher
// is the real one, built on reqwest:
// - GET requests with a mandatory, finite per-request timeout
// - redirects followed up to a limit; the FINAL status is what counts
// - the body is only downloaded for successful HTML responses, since those
//   are the only ones we ever parse for links
// - transport failures are categorized (timeout, DNS, TLS, ...)
// =============================================================================

use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::status::TransportErrorKind;
use crate::config::CrawlConfig;

/// A response that came back from the target.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The URL that was requested
    pub url: Url,
    /// Where the request ended up after following redirects
    pub final_url: Url,
    /// Final HTTP status code
    pub status: u16,
    pub content_type: Option<String>,
    /// Only present for successful HTML responses
    pub body: Option<String>,
}

impl FetchResult {
    /// True when the response looks like an HTML document.
    ///
    /// A missing Content-Type is given the benefit of the doubt.
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(is_html_content_type)
            .unwrap_or(true)
    }
}

/// The target could not be reached at all.
#[derive(Debug, Clone)]
pub struct FetchError {
    pub url: Url,
    pub kind: TransportErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(url: Url, kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            url,
            kind,
            message: message.into(),
        }
    }
}

/// Anything that can turn a URL into a response.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError>;
}

/// reqwest-backed fetcher.
///
/// Cloning is cheap: the underlying client is reference counted and shares
/// its connection pool.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError> {
        debug!(%url, "fetching");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| categorize_error(url, &e))?;

        let status = response.status();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let wants_body = status.is_success()
            && content_type
                .as_deref()
                .map(is_html_content_type)
                .unwrap_or(true);

        let body = if wants_body {
            Some(response.text().await.map_err(|e| categorize_error(url, &e))?)
        } else {
            None
        };

        Ok(FetchResult {
            url: url.clone(),
            final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}

// reqwest wraps the interesting part (e.g. "dns error") deep in its source
// chain, so the whole chain is flattened before looking at it.
fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        text.push_str(": ");
        text.push_str(&inner.to_string());
        source = inner.source();
    }
    text
}

/// Categorizes a reqwest failure into a transport error kind.
fn categorize_error(url: &Url, error: &reqwest::Error) -> FetchError {
    let message = error_chain(error);
    let lowered = message.to_ascii_lowercase();

    let kind = if error.is_timeout() {
        TransportErrorKind::Timeout
    } else if error.is_redirect() {
        TransportErrorKind::TooManyRedirects
    } else if lowered.contains("dns") || lowered.contains("failed to lookup address") {
        TransportErrorKind::Dns
    } else if lowered.contains("certificate") || lowered.contains("tls") || lowered.contains("ssl")
    {
        TransportErrorKind::Tls
    } else if error.is_connect() {
        TransportErrorKind::Connect
    } else {
        TransportErrorKind::Other
    };

    FetchError::new(url.clone(), kind, message)
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why #[async_trait]?
//    - The crawler keeps its fetcher as Arc<dyn Fetcher> so tests can swap it
//    - Trait objects cannot have plain async methods yet; async-trait boxes
//      the returned future so the trait stays object safe
//
// 2. Why read the final URL from the response?
//    - reqwest follows redirects for us
//    - response.url() is where the chain ended, which is the page whose links
//      we extract and whose scope we check
//
// 3. Why not download every body?
//    - Bodies of images, PDFs and error pages are never parsed
//    - Skipping them saves bandwidth on large sites
// -----------------------------------------------------------------------------
