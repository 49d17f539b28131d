//! Common infrastructure for the quire conversion pipeline.
//!
//! This crate provides shared pieces used by every stage:
//! - **Diagnostics** - template-keyed, severity-tagged reports routed to an injectable sink
//! - **URI resolution** - combining a base URI with a reference into one canonical locator
//! - **Resource retrieval** - synchronous best-effort fetches of `file:`, `data:` and `http(s):` resources

pub mod diagnostics;
pub mod net;
pub mod uri;

pub use diagnostics::{
    CollectingSink, Diagnostic, DiagnosticSink, DiagnosticTemplate, LogSink, Severity, TeeSink,
};
pub use net::{DefaultResourceRetriever, ResourceLoader, ResourceRetriever};
pub use uri::{ResourceError, UriResolver, resolve_url};
