//! Per-run state shared by the engine and every handler.

use std::sync::{Arc, Mutex, PoisonError};

use quire_common::{
    Diagnostic, DiagnosticSink, DiagnosticTemplate, ResourceError, ResourceLoader, UriResolver, resolve_url,
};
use url::Url;

use crate::counters::CounterScopes;
use crate::element::RunId;
use crate::fonts::FontProvider;

/// Everything a handler may consult or update while the walk runs.
///
/// One context exists per conversion run; nothing in it is shared with a
/// concurrent run except the font provider, which the caller owns.
pub struct ConversionContext {
    run_id: RunId,
    base: Option<UriResolver>,
    loader: ResourceLoader,
    fonts: Arc<Mutex<dyn FontProvider>>,
    sink: Arc<dyn DiagnosticSink>,
    /// Live counter instances.
    pub counters: CounterScopes,
    /// Nesting depth of `open-quote` / `close-quote`.
    pub quote_depth: usize,
}

impl ConversionContext {
    /// Context for one run.
    pub fn new(
        base: Option<UriResolver>,
        loader: ResourceLoader,
        fonts: Arc<Mutex<dyn FontProvider>>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            run_id: RunId::next(),
            base,
            loader,
            fonts,
            sink,
            counters: CounterScopes::new(),
            quote_depth: 0,
        }
    }

    /// Identifier stamped on every element of this run.
    #[must_use]
    pub const fn run_id(&self) -> RunId {
        self.run_id
    }

    /// The effective document base, if any.
    #[must_use]
    pub fn base(&self) -> Option<&Url> {
        self.base.as_ref().map(UriResolver::base)
    }

    /// Resolve `reference` against the document base.
    pub fn resolve(&self, reference: &str) -> Result<Url, ResourceError> {
        match &self.base {
            Some(base) => base.resolve(reference),
            None => resolve_url("", reference),
        }
    }

    /// Resolve and fetch `reference`, reporting failures against `tag`.
    /// Returns the locator and its bytes on success.
    pub fn fetch(&mut self, reference: &str, tag: &str) -> Option<(Url, Arc<[u8]>)> {
        let url = match self.resolve(reference) {
            Ok(url) => url,
            Err(e) => {
                self.emit(Diagnostic::new(DiagnosticTemplate::ResourceUnresolved, e.to_string()).with_tag(tag));
                return None;
            }
        };
        match self.loader.load(&url) {
            Ok(bytes) => Some((url, bytes)),
            Err(e) => {
                self.emit(Diagnostic::new(DiagnosticTemplate::ResourceUnreachable, e.to_string()).with_tag(tag));
                None
            }
        }
    }

    /// First available family of a `font-family` list.
    pub fn select_font(&self, family_list: &str) -> Option<String> {
        self.fonts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .select(family_list)
    }

    /// Report a diagnostic.
    pub fn emit(&self, diagnostic: Diagnostic) {
        self.sink.emit(diagnostic);
    }

    /// Number of distinct resource fetches made in this run.
    #[must_use]
    pub const fn fetch_count(&self) -> usize {
        self.loader.fetch_count()
    }
}

impl std::fmt::Debug for ConversionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionContext")
            .field("run_id", &self.run_id)
            .field("base", &self.base())
            .field("loader", &self.loader)
            .field("counters", &self.counters.depth())
            .finish_non_exhaustive()
    }
}
