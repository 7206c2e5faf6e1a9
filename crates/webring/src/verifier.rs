//! Backlink verification.
//!
//! A member passes when its live page links to both the ring's `next` and
//! `prev` redirectors with `source=<member domain>`, under any of the accepted
//! scheme/port variants of the ring address. Every failure, including
//! transport errors, is folded into the [`VerificationResult`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use thiserror::Error;
use tracing::debug;

use crate::member::Member;
use crate::settings::{CheckerSettings, RingEndpoint};

/// Page returned by a [`PageFetcher`] after redirects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("Failed to read response body: {0}")]
    Body(String),
}

impl FetchError {
    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout
        } else if error.is_connect() {
            FetchError::Connect(error.to_string())
        } else if error.is_body() || error.is_decode() {
            FetchError::Body(error.to_string())
        } else {
            FetchError::Request(error.to_string())
        }
    }
}

/// Fetcher trait for retrieving a member's page
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `url`, following redirects, and return the final status and body
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// reqwest-backed fetcher with a bounded timeout and identifying user agent
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(settings: &CheckerSettings, ring: &RingEndpoint) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .user_agent(settings.user_agent(ring))
            .redirect(Policy::limited(settings.max_redirects))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let response = self.client.get(url).send().await.map_err(FetchError::from_reqwest)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(FetchError::from_reqwest)?;

        Ok(FetchedPage { status, body })
    }
}

/// Which redirector a marker points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Next => "next",
            Direction::Prev => "prev",
        }
    }
}

/// Every accepted spelling of a member's next and prev backlinks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacklinkMarkers {
    pub next: Vec<String>,
    pub prev: Vec<String>,
}

impl BacklinkMarkers {
    /// `<origin><ring path><direction>?source=<domain>` for each accepted origin
    pub fn for_domain(ring: &RingEndpoint, domain: &str) -> Self {
        let path = ring.normalized_path();
        let origins: Vec<String> =
            ring.accepted_variants.iter().flat_map(|variant| variant.origins(ring)).collect();

        let build = |direction: Direction| -> Vec<String> {
            origins
                .iter()
                .map(|origin| format!("{origin}{path}{}?source={domain}", direction.as_str()))
                .collect()
        };

        Self { next: build(Direction::Next), prev: build(Direction::Prev) }
    }

    /// Returns `(next_found, prev_found)` for `body`
    pub fn find_in(&self, body: &str) -> (bool, bool) {
        let found = |markers: &[String]| markers.iter().any(|marker| contains_marker(body, marker));
        (found(self.next.as_slice()), found(self.prev.as_slice()))
    }
}

/// `marker` occurs in `body` and the `source` value is not merely a prefix
/// of a longer host, so `source=a.example` does not match `source=a.example.org`
fn contains_marker(body: &str, marker: &str) -> bool {
    body.match_indices(marker).any(|(start, _)| {
        body[start + marker.len()..]
            .chars()
            .next()
            .is_none_or(|c| !(c.is_alphanumeric() || matches!(c, '.' | '-' | ':')))
    })
}

/// Why a member failed verification
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerificationFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Backlink markers missing (next found: {next_found}, prev found: {prev_found})")]
    MissingMarkers { next_found: bool, prev_found: bool },
}

/// Outcome of verifying a single member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub passed: bool,
    /// Final HTTP status, when a response was received
    pub observed_status: Option<u16>,
    pub error: Option<VerificationFailure>,
    /// Checks are disabled for the member; no request was made
    pub skipped: bool,
}

impl VerificationResult {
    pub fn skipped() -> Self {
        Self { passed: true, observed_status: None, error: None, skipped: true }
    }

    pub fn success(status: u16) -> Self {
        Self { passed: true, observed_status: Some(status), error: None, skipped: false }
    }

    pub fn failure(observed_status: Option<u16>, error: VerificationFailure) -> Self {
        Self { passed: false, observed_status, error: Some(error), skipped: false }
    }
}

/// Link verifier - decides whether a member still links into the ring
pub struct LinkVerifier {
    ring: RingEndpoint,
    fetcher: Arc<dyn PageFetcher>,
}

impl LinkVerifier {
    pub fn new(ring: RingEndpoint, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { ring, fetcher }
    }

    /// Verifier backed by a real HTTP client
    pub fn with_http(ring: RingEndpoint, settings: &CheckerSettings) -> reqwest::Result<Self> {
        let fetcher = HttpFetcher::new(settings, &ring)?;
        Ok(Self::new(ring, Arc::new(fetcher)))
    }

    pub fn ring(&self) -> &RingEndpoint {
        &self.ring
    }

    pub fn markers(&self, domain: &str) -> BacklinkMarkers {
        BacklinkMarkers::for_domain(&self.ring, domain)
    }

    /// Verify one member. Never fails: errors are captured in the result.
    pub async fn verify(&self, member: &Member) -> VerificationResult {
        if member.checks_disabled {
            return VerificationResult::skipped();
        }

        let url = member.url();
        debug!(domain = %member.domain, %url, "Fetching member page");

        let page = match self.fetcher.fetch(&url).await {
            Ok(page) => page,
            Err(e) => return VerificationResult::failure(None, e.into()),
        };

        if !(200..300).contains(&page.status) {
            return VerificationResult::failure(Some(page.status), VerificationFailure::Status(page.status));
        }

        match self.markers(&member.domain).find_in(&page.body) {
            (true, true) => VerificationResult::success(page.status),
            (next_found, prev_found) => VerificationResult::failure(
                Some(page.status),
                VerificationFailure::MissingMarkers { next_found, prev_found },
            ),
        }
    }
}
