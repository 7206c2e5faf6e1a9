//! Settings consumed by the verifier: where the ring itself is served and how
//! member pages are fetched.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Scheme/port combinations under which a member may link to the ring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerVariant {
    /// `http://host`, plus `https://host` when the ring serves HTTPS
    PlainHost,
    /// `https://host:<https_port>`, only when the ring serves HTTPS
    ExplicitHttpsPort,
    /// `http://host:<http_port>`
    ExplicitHttpPort,
}

impl MarkerVariant {
    pub const ALL: [MarkerVariant; 3] =
        [MarkerVariant::PlainHost, MarkerVariant::ExplicitHttpsPort, MarkerVariant::ExplicitHttpPort];

    /// Origins (`scheme://host[:port]`) accepted by this variant
    pub fn origins(self, ring: &RingEndpoint) -> Vec<String> {
        let host = &ring.host;
        match self {
            MarkerVariant::PlainHost => {
                let mut origins = vec![format!("http://{host}")];
                if ring.https {
                    origins.push(format!("https://{host}"));
                }
                origins
            }
            MarkerVariant::ExplicitHttpsPort if ring.https => {
                vec![format!("https://{host}:{}", ring.https_port)]
            }
            MarkerVariant::ExplicitHttpsPort => Vec::new(),
            MarkerVariant::ExplicitHttpPort => vec![format!("http://{host}:{}", ring.http_port)],
        }
    }
}

impl fmt::Display for MarkerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerVariant::PlainHost => write!(f, "plain_host"),
            MarkerVariant::ExplicitHttpsPort => write!(f, "explicit_https_port"),
            MarkerVariant::ExplicitHttpPort => write!(f, "explicit_http_port"),
        }
    }
}

/// Public location of the ring's own redirector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingEndpoint {
    pub host: String,
    pub path: String,
    pub http_port: u16,
    pub https_port: u16,
    pub https: bool,
    pub accepted_variants: Vec<MarkerVariant>,
}

impl Default for RingEndpoint {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            path: "/".into(),
            http_port: 8080,
            https_port: 8443,
            https: false,
            accepted_variants: MarkerVariant::ALL.to_vec(),
        }
    }
}

impl RingEndpoint {
    /// Path with exactly one leading and one trailing slash
    pub fn normalized_path(&self) -> String {
        let trimmed = self.path.trim_matches('/');
        if trimmed.is_empty() { "/".to_string() } else { format!("/{trimmed}/") }
    }

    /// Canonical public address of the ring
    pub fn public_url(&self) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!("{scheme}://{}{}", self.host, self.normalized_path())
    }
}

/// Outbound fetch behaviour of the link verifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerSettings {
    /// Identifying user agent; derived from the ring address when unset
    pub user_agent: Option<String>,
    pub timeout_seconds: u64,
    pub max_redirects: usize,
    /// Members verified in parallel during one run
    pub concurrency: usize,
}

impl Default for CheckerSettings {
    fn default() -> Self {
        Self { user_agent: None, timeout_seconds: 10, max_redirects: 10, concurrency: 4 }
    }
}

impl CheckerSettings {
    pub fn user_agent(&self, ring: &RingEndpoint) -> String {
        self.user_agent.clone().unwrap_or_else(|| {
            format!("Mozilla/5.0 (compatible; Website Webring Scraper; +{})", ring.public_url())
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }
}
