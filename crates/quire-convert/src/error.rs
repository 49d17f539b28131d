//! Error types for the conversion pipeline.
//!
//! Only [`ConfigError`] and [`ConversionError`] ever reach a caller.
//! [`HandlerError`] and [`RegistryError`] are raised inside a run and turned
//! into diagnostics at the frame boundary, except where a caller mutates a
//! registry directly.

use thiserror::Error;

/// Failure raised by a tag handler during one lifecycle call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// The content is structurally not allowed here. Only the offered text
    /// or child is dropped; the handler keeps accepting.
    #[error("rejected: {0}")]
    Rejected(String),
    /// The handler cannot continue. The node produces no result.
    #[error("handler failed: {0}")]
    Failed(String),
    /// A lifecycle call arrived after `finish`.
    #[error("handler already finished")]
    AfterFinish,
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Rejected`].
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

/// Misuse of a [`HandlerRegistry`](crate::registry::HandlerRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The registry already served a `create` call in this run.
    #[error("registry is locked; cannot change '{0}' after the run started")]
    Locked(String),
    /// Tag names must be non-empty.
    #[error("tag name must not be empty")]
    EmptyTag,
}

/// Invalid converter configuration. Raised before any node is processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The configured base URI cannot serve as a base.
    #[error("invalid base URI '{uri}': {reason}")]
    InvalidBaseUri {
        /// The rejected URI.
        uri: String,
        /// Why it was rejected.
        reason: String,
    },
    /// Two options that cannot be combined were both set.
    #[error("conflicting options: {0}")]
    ConflictingOptions(String),
    /// The font provider still held cached selections after `reset()`.
    #[error("font provider kept {cached} cached selection(s) across reset()")]
    FontProviderNotReset {
        /// Selections left in the cache.
        cached: usize,
    },
}

/// A conversion run that could not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// Configuration fault detected at run start.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The document frame or the document element's handler failed.
    #[error("root handler failed: {0}")]
    RootFailed(String),
}
