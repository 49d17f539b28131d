//! URI resolution.
//!
//! [URL Standard](https://url.spec.whatwg.org/)
//!
//! Combines a base URI with a reference into one canonical absolute
//! [`Url`]. Besides ordinary URLs this understands the file-system forms that
//! show up in documents authored on different platforms: drive-letter paths
//! (`C:\docs\a.png`, `C:/docs/a.png`), UNC paths (`\\server\share\a.png`),
//! scheme-relative references (`//host/a.png`) and bare absolute or relative
//! file-system paths used as a base.
//!
//! Invalid combinations fail with a [`ResourceError`] rather than producing
//! a wrong locator.

use std::path::Path;

use thiserror::Error;
use url::Url;

/// Failure to resolve or retrieve a resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// The base URI itself is not usable.
    #[error("invalid base URI '{base}': {reason}")]
    InvalidBase {
        /// The rejected base.
        base: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The reference cannot be combined with the base.
    #[error("cannot resolve '{reference}' against '{base}': {reason}")]
    InvalidReference {
        /// The base the reference was resolved against.
        base: String,
        /// The rejected reference.
        reference: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The locator is valid but nothing could be fetched from it.
    #[error("failed to fetch '{url}': {reason}")]
    Unreachable {
        /// The locator that was fetched.
        url: String,
        /// Why the fetch failed.
        reason: String,
    },
    /// No retriever knows how to fetch this scheme.
    #[error("unsupported scheme '{0}'")]
    UnsupportedScheme(String),
}

/// A validated base URI that references are resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriResolver {
    base: Url,
}

impl UriResolver {
    /// Create a resolver for `base`.
    ///
    /// An empty base means the current working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidBase`] if `base` is neither a URL that
    /// can serve as a base nor a file-system path.
    pub fn new(base: &str) -> Result<Self, ResourceError> {
        Ok(Self {
            base: parse_base(base)?,
        })
    }

    /// Create a resolver for an already-canonical base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidBase`] for URLs that cannot be a base
    /// (`data:`, `mailto:`, ...).
    pub fn from_url(base: Url) -> Result<Self, ResourceError> {
        if base.cannot_be_a_base() {
            return Err(ResourceError::InvalidBase {
                base: base.to_string(),
                reason: "URL cannot be used as a base".to_string(),
            });
        }
        Ok(Self { base })
    }

    /// The canonical base URL.
    #[must_use]
    pub const fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve `reference` against this base.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidReference`] if the combination does not
    /// form a valid URL.
    pub fn resolve(&self, reference: &str) -> Result<Url, ResourceError> {
        let reference = reference.trim();

        // STEP 1: An empty reference designates the base document itself.
        if reference.is_empty() {
            return Ok(self.base.clone());
        }

        // STEP 2: Platform-specific absolute forms never consult the base.
        if is_drive_letter_path(reference) || is_unc_path(reference) {
            return file_url_from_path_str(reference, false).map_err(|reason| {
                self.invalid_reference(reference, reason)
            });
        }

        // STEP 3: Anything with a real scheme is already absolute.
        if let Some(url) = parse_absolute(reference) {
            return Ok(url);
        }

        // STEP 4: Relative reference. File bases accept Windows separators.
        let normalized = if self.base.scheme() == "file" {
            reference.replace('\\', "/")
        } else {
            reference.to_string()
        };
        self.base
            .join(&normalized)
            .map_err(|e| self.invalid_reference(reference, e.to_string()))
    }

    fn invalid_reference(&self, reference: &str, reason: impl Into<String>) -> ResourceError {
        ResourceError::InvalidReference {
            base: self.base.to_string(),
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }
}

/// Resolve `reference` against `base` in one step.
///
/// # Errors
///
/// Fails if either the base or the combination is invalid.
pub fn resolve_url(base: &str, reference: &str) -> Result<Url, ResourceError> {
    UriResolver::new(base)?.resolve(reference)
}

/// Parse a base URI into a canonical URL.
fn parse_base(base: &str) -> Result<Url, ResourceError> {
    let trimmed = base.trim();
    let invalid = |reason: String| ResourceError::InvalidBase {
        base: base.to_string(),
        reason,
    };

    if trimmed.is_empty() {
        let cwd = std::env::current_dir().map_err(|e| invalid(e.to_string()))?;
        return Url::from_directory_path(&cwd)
            .map_err(|()| invalid("working directory is not absolute".to_string()));
    }

    if is_drive_letter_path(trimmed) || is_unc_path(trimmed) {
        let is_dir = trimmed.ends_with(['/', '\\']);
        return file_url_from_path_str(trimmed, is_dir).map_err(invalid);
    }

    if let Some(url) = parse_absolute(trimmed) {
        if url.cannot_be_a_base() {
            return Err(invalid("URL cannot be used as a base".to_string()));
        }
        return Ok(url);
    }

    // A string that looks like a URL but failed to parse is an error, not a path.
    if looks_like_url(trimmed) {
        let reason = Url::parse(trimmed).err().map_or_else(
            || "malformed URL".to_string(),
            |e| e.to_string(),
        );
        return Err(invalid(reason));
    }

    // File-system path, absolute or relative to the working directory.
    let path = Path::new(trimmed);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| invalid(e.to_string()))?
            .join(path)
    };
    let is_dir = trimmed.ends_with(['/', '\\']) || absolute.is_dir();
    let url = if is_dir {
        Url::from_directory_path(&absolute)
    } else {
        Url::from_file_path(&absolute)
    };
    url.map_err(|()| invalid("path cannot be expressed as a file URL".to_string()))
}

/// Parse `s` as an absolute URL with a scheme of at least two characters.
///
/// Single-letter schemes are drive letters and handled separately.
fn parse_absolute(s: &str) -> Option<Url> {
    let colon = s.find(':')?;
    if colon < 2 {
        return None;
    }
    Url::parse(s).ok()
}

/// `scheme://` prefix check used to tell malformed URLs from paths.
fn looks_like_url(s: &str) -> bool {
    s.find("://").is_some_and(|idx| {
        idx >= 2
            && s[..idx]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// `C:\...`, `C:/...` or a bare `C:`.
fn is_drive_letter_path(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes.len() == 2 || matches!(bytes[2], b'/' | b'\\'))
}

/// `\\server\share\...`
fn is_unc_path(s: &str) -> bool {
    s.starts_with("\\\\")
}

/// Build a `file:` URL from a drive-letter or UNC path without consulting the
/// host platform's path rules.
fn file_url_from_path_str(path: &str, is_dir: bool) -> Result<Url, String> {
    let forward = path.replace('\\', "/");
    let mut text = if let Some(unc) = forward.strip_prefix("//") {
        format!("file://{unc}")
    } else {
        format!("file:///{forward}")
    };
    if is_dir && !text.ends_with('/') {
        text.push('/');
    }
    Url::parse(&text).map_err(|e| e.to_string())
}
