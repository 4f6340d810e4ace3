//! Page retrieval from the web, local files and stdin.
//!
//! Remote pages are fetched through the [`PageSource`] trait so discovery and
//! chapter fetching can run against any source. [`Fetcher`] is the HTTP
//! implementation: one GET per call, no retries. Retrying is left to callers
//! because index walking and chapter fetching use different policies.

use std::fs;
use std::future::Future;
use std::path::PathBuf;
#[cfg(feature = "fetch")]
use std::time::Duration;

#[cfg(feature = "fetch")]
use reqwest::Client;
#[cfg(feature = "fetch")]
use url::Url;

#[cfg(feature = "fetch")]
use crate::site;
use crate::{NarouError, Result};

/// Desktop browser identification sent with every request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/136.0.0.0 Safari/537.36";

/// Consent cookie required by the age-gated domain.
pub const AGE_GATE_COOKIE: &str = "over18=yes";

/// Anything that can return the HTML of a page by URL.
pub trait PageSource {
    /// Fetches the page at `url` once and returns its HTML.
    fn fetch_html(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}

/// HTTP client configuration for fetching pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Timeout for the whole request, in seconds.
    pub timeout: u64,
    /// User-Agent header value.
    pub user_agent: String,
    /// Cookie sent to the age-gated domain.
    pub age_gate_cookie: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            age_gate_cookie: AGE_GATE_COOKIE.to_string(),
        }
    }
}

/// HTTP page source backed by a shared reqwest client.
#[cfg(feature = "fetch")]
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

#[cfg(feature = "fetch")]
impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(NarouError::HttpError)?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn request(&self, url: Url) -> reqwest::RequestBuilder {
        let age_gated = site::is_age_gated(url.as_str());
        let builder = self.client.get(url).header("User-Agent", &self.config.user_agent);

        if age_gated { builder.header("Cookie", &self.config.age_gate_cookie) } else { builder }
    }
}

#[cfg(feature = "fetch")]
impl PageSource for Fetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        let parsed_url = Url::parse(url).map_err(|e| NarouError::InvalidUrl(e.to_string()))?;
        tracing::debug!(url, "fetching page");

        let timeout = self.config.timeout;
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() { NarouError::Timeout { timeout } } else { NarouError::HttpError(e) }
        };

        let response = self
            .request(parsed_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(map_err)?;

        let content = response.text().await.map_err(map_err)?;
        tracing::debug!(url, bytes = content.len(), "fetched page");

        Ok(content)
    }
}

/// Reads HTML content from a local file.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(NarouError::FileNotFound(path_buf))
    } else {
        fs::read_to_string(&path_buf).map_err(NarouError::from)
    }
}

/// Reads HTML content from standard input until EOF.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(NarouError::from)?;

    Ok(buffer)
}
