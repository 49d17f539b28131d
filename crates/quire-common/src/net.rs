//! Resource retrieval.
//!
//! Fetches are synchronous and blocking. A conversion run talks to a
//! [`ResourceLoader`], which memoizes every locator so each resource is
//! fetched at most once per run, successful or not.
//!
//! TODO: Honor `Cache-Control` when a loader is reused across runs.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use url::Url;

use crate::uri::ResourceError;

/// User-Agent header sent with all requests.
const USER_AGENT: &str = concat!("quire/", env!("CARGO_PKG_VERSION"));

/// Default request timeout.
const TIMEOUT: Duration = Duration::from_secs(30);

/// Narrow interface through which the pipeline reaches external resources.
pub trait ResourceRetriever: Send + Sync {
    /// Fetch the bytes behind an absolute locator.
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, ResourceError>;
}

/// Retriever for `data:`, `file:` and (optionally) `http(s):` locators.
#[derive(Debug, Clone)]
pub struct DefaultResourceRetriever {
    allow_network: bool,
    timeout: Duration,
}

impl Default for DefaultResourceRetriever {
    fn default() -> Self {
        Self {
            allow_network: true,
            timeout: TIMEOUT,
        }
    }
}

impl DefaultResourceRetriever {
    /// Retriever that never touches the network.
    #[must_use]
    pub const fn offline() -> Self {
        Self {
            allow_network: false,
            timeout: TIMEOUT,
        }
    }

    /// Override the HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ResourceRetriever for DefaultResourceRetriever {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, ResourceError> {
        match url.scheme() {
            "data" => DataUrl::new(url.as_str()).decode(),
            "file" => {
                let path = url.to_file_path().map_err(|()| ResourceError::Unreachable {
                    url: url.to_string(),
                    reason: "not a local path".to_string(),
                })?;
                std::fs::read(&path).map_err(|e| ResourceError::Unreachable {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
            "http" | "https" if self.allow_network => fetch_bytes(url, self.timeout),
            other => Err(ResourceError::UnsupportedScheme(other.to_string())),
        }
    }
}

/// A parsed `data:` URL that can be decoded into raw bytes.
///
/// [RFC 2397](https://www.rfc-editor.org/rfc/rfc2397)
pub struct DataUrl<'a> {
    raw: &'a str,
}

impl<'a> DataUrl<'a> {
    /// Wrap a raw `data:` URL string.
    #[must_use]
    pub const fn new(raw: &'a str) -> Self {
        Self { raw }
    }

    /// The declared media type, `text/plain` when omitted.
    #[must_use]
    pub fn media_type(&self) -> &'a str {
        let body = self.raw.trim_start_matches("data:");
        let metadata = body.split_once(',').map_or(body, |(m, _)| m);
        let media = metadata.split(';').next().unwrap_or_default();
        if media.is_empty() { "text/plain" } else { media }
    }

    /// Decode the payload. Supports base64 and percent-encoded bodies.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Unreachable`] if the URL has no payload
    /// separator or the payload is not valid base64.
    pub fn decode(&self) -> Result<Vec<u8>, ResourceError> {
        let body = self.raw.trim_start_matches("data:");
        let Some((metadata, data)) = body.split_once(',') else {
            return Err(self.unreachable("missing comma"));
        };

        if metadata.ends_with(";base64") {
            let compact: String = percent_decode(data)
                .into_iter()
                .filter(|b| !b.is_ascii_whitespace())
                .map(char::from)
                .collect();
            base64::engine::general_purpose::STANDARD
                .decode(compact)
                .map_err(|e| self.unreachable(format!("base64 decode error: {e}")))
        } else {
            Ok(percent_decode(data))
        }
    }

    fn unreachable(&self, reason: impl Into<String>) -> ResourceError {
        ResourceError::Unreachable {
            url: truncate(self.raw, 64),
            reason: reason.into(),
        }
    }
}

impl fmt::Debug for DataUrl<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataUrl")
            .field("media_type", &self.media_type())
            .finish_non_exhaustive()
    }
}

/// Decode `%XX` escapes; malformed escapes are kept literally.
fn percent_decode(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(value) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// Fetch a URL and return its body as raw bytes.
fn fetch_bytes(url: &Url, timeout: Duration) -> Result<Vec<u8>, ResourceError> {
    let unreachable = |reason: String| ResourceError::Unreachable {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| unreachable(format!("failed to create HTTP client: {e}")))?;

    let response = client
        .get(url.as_str())
        .header("User-Agent", USER_AGENT)
        .send()
        .map_err(|e| unreachable(format!("request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(unreachable(format!("HTTP error: {}", response.status())));
    }

    response
        .bytes()
        .map(|b| b.to_vec())
        .map_err(|e| unreachable(format!("failed to read response body: {e}")))
}

/// Per-run memoizing front for a [`ResourceRetriever`].
///
/// Every locator is fetched at most once; failures are remembered too, so a
/// missing image referenced ten times produces one fetch attempt.
pub struct ResourceLoader {
    retriever: Arc<dyn ResourceRetriever>,
    cache: HashMap<Url, Result<Arc<[u8]>, ResourceError>>,
    fetches: usize,
}

impl ResourceLoader {
    /// Create a loader with an empty cache.
    #[must_use]
    pub fn new(retriever: Arc<dyn ResourceRetriever>) -> Self {
        Self {
            retriever,
            cache: HashMap::new(),
            fetches: 0,
        }
    }

    /// Load `url`, hitting the retriever only on first request.
    pub fn load(&mut self, url: &Url) -> Result<Arc<[u8]>, ResourceError> {
        if let Some(cached) = self.cache.get(url) {
            return cached.clone();
        }
        self.fetches += 1;
        log::debug!(target: "quire::net", "fetching {url}");
        let result = self.retriever.fetch(url).map(Arc::from);
        let _ = self.cache.insert(url.clone(), result.clone());
        result
    }

    /// Number of distinct fetch attempts made so far.
    #[must_use]
    pub const fn fetch_count(&self) -> usize {
        self.fetches
    }
}

impl fmt::Debug for ResourceLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLoader")
            .field("cached", &self.cache.len())
            .field("fetches", &self.fetches)
            .finish_non_exhaustive()
    }
}
