//! Conversion diagnostics with injectable sinks.
//!
//! Node-local problems (an unknown property, a rejected child, an unreachable
//! image) never abort a conversion run. They are reported through a
//! [`DiagnosticSink`] instead. Every diagnostic carries a
//! [`DiagnosticTemplate`], so tests assert on kinds and counts rather than on
//! message text.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use strum_macros::{Display, IntoStaticStr};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Expected degradation, e.g. a metadata subtree that produces no output.
    Info,
    /// Content was dropped or replaced by a fallback.
    Warning,
    /// A handler or resource failed outright; the node produced no result.
    Error,
}

/// Stable identifier of a diagnostic message.
///
/// The kebab-case string form (`Display` / `Into<&'static str>`) is the
/// template id exposed to embedders.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Display, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticTemplate {
    /// A declaration names a property the schema does not know.
    UnknownProperty,
    /// A declaration value failed validation; the initial value was used.
    InvalidPropertyValue,
    /// A selector could not be parsed; the rule was skipped.
    InvalidSelector,
    /// An at-rule the cascade does not evaluate (`@page`, `@font-face`, ...).
    UnsupportedAtRule,
    /// A `content` value component that cannot be rendered as text.
    UnsupportedContent,
    /// An external or imported stylesheet could not be loaded.
    StylesheetUnavailable,
    /// No handler exists for a tag; its children were re-parented.
    NoHandlerForTag,
    /// A tag whose category is never rendered; its subtree was dropped.
    IgnoredTag,
    /// A handler refused a text span.
    TextRejected,
    /// A handler refused a child element.
    ChildRejected,
    /// A handler failed inside a lifecycle call.
    HandlerFailed,
    /// A reference could not be combined with the base URI.
    ResourceUnresolved,
    /// A resolved resource could not be fetched.
    ResourceUnreachable,
    /// Image bytes were fetched but could not be decoded.
    ImageDecodeFailed,
}

impl DiagnosticTemplate {
    /// The severity a diagnostic of this template is reported with by default.
    #[must_use]
    pub const fn default_severity(self) -> Severity {
        match self {
            Self::IgnoredTag | Self::UnsupportedAtRule => Severity::Info,
            Self::HandlerFailed => Severity::Error,
            _ => Severity::Warning,
        }
    }
}

/// One reported problem, attributable to a template plus node/tag context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Which message this is.
    pub template: DiagnosticTemplate,
    /// How serious it is.
    pub severity: Severity,
    /// Tag name of the node the diagnostic is about, if any.
    pub tag: Option<String>,
    /// Arena index of the node the diagnostic is about, if any.
    pub node: Option<usize>,
    /// Free-form detail for humans. Never asserted on.
    pub detail: String,
}

impl Diagnostic {
    /// Create a diagnostic with the template's default severity.
    #[must_use]
    pub fn new(template: DiagnosticTemplate, detail: impl Into<String>) -> Self {
        Self {
            template,
            severity: template.default_severity(),
            tag: None,
            node: None,
            detail: detail.into(),
        }
    }

    /// Attach the tag name of the offending node.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Attach the arena index of the offending node.
    #[must_use]
    pub const fn with_node(mut self, node: usize) -> Self {
        self.node = Some(node);
        self
    }

    /// Override the default severity.
    #[must_use]
    pub const fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.template)?;
        if let Some(tag) = &self.tag {
            write!(f, " <{tag}>")?;
        }
        write!(f, " {}", self.detail)
    }
}

/// Destination for diagnostics.
///
/// Sinks are shared behind an `Arc` and may be fed from several conversion
/// runs on different threads.
pub trait DiagnosticSink: Send + Sync {
    /// Record one diagnostic.
    fn emit(&self, diagnostic: Diagnostic);
}

/// Sink that keeps every diagnostic for later inspection.
#[derive(Debug, Default)]
pub struct CollectingSink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty sink already wrapped for injection.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of diagnostics recorded for `template`.
    pub fn count(&self, template: DiagnosticTemplate) -> usize {
        self.lock().iter().filter(|d| d.template == template).count()
    }

    /// Number of diagnostics recorded overall.
    pub fn count_total(&self) -> usize {
        self.lock().len()
    }

    /// Per-template counts.
    pub fn counts(&self) -> HashMap<DiagnosticTemplate, usize> {
        let mut counts = HashMap::new();
        for diagnostic in self.lock().iter() {
            *counts.entry(diagnostic.template).or_insert(0) += 1;
        }
        counts
    }

    /// Copy of everything recorded so far.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    /// Take everything recorded so far, leaving the sink empty.
    pub fn drain(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Diagnostic>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        self.lock().push(diagnostic);
    }
}

/// Sink that forwards diagnostics to the `log` facade.
///
/// With deduplication enabled, identical messages are logged once per sink.
#[derive(Debug, Default)]
pub struct LogSink {
    seen: Option<Mutex<HashSet<String>>>,
}

impl LogSink {
    /// Log every diagnostic.
    #[must_use]
    pub fn new() -> Self {
        Self { seen: None }
    }

    /// Log each distinct diagnostic message only once.
    #[must_use]
    pub fn deduplicated() -> Self {
        Self {
            seen: Some(Mutex::new(HashSet::new())),
        }
    }

    /// Forget which messages were already logged.
    pub fn clear(&self) {
        if let Some(seen) = &self.seen {
            seen.lock().unwrap_or_else(PoisonError::into_inner).clear();
        }
    }
}

impl DiagnosticSink for LogSink {
    fn emit(&self, diagnostic: Diagnostic) {
        let message = diagnostic.to_string();
        if let Some(seen) = &self.seen {
            let fresh = seen
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(message.clone());
            if !fresh {
                return;
            }
        }
        match diagnostic.severity {
            Severity::Info => log::info!(target: "quire", "{message}"),
            Severity::Warning => log::warn!(target: "quire", "{message}"),
            Severity::Error => log::error!(target: "quire", "{message}"),
        }
    }
}

/// Sink that fans every diagnostic out to several sinks.
#[derive(Default)]
pub struct TeeSink {
    sinks: Vec<Arc<dyn DiagnosticSink>>,
}

impl TeeSink {
    /// Create a tee over `sinks`.
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn DiagnosticSink>>) -> Self {
        Self { sinks }
    }
}

impl DiagnosticSink for TeeSink {
    fn emit(&self, diagnostic: Diagnostic) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.emit(diagnostic.clone());
            }
            last.emit(diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_ids_are_kebab_case() {
        assert_eq!(DiagnosticTemplate::ChildRejected.to_string(), "child-rejected");
        let id: &'static str = DiagnosticTemplate::NoHandlerForTag.into();
        assert_eq!(id, "no-handler-for-tag");
    }

    #[test]
    fn test_collecting_sink_counts_per_template() {
        let sink = CollectingSink::new();
        sink.emit(Diagnostic::new(DiagnosticTemplate::UnknownProperty, "foo"));
        sink.emit(Diagnostic::new(DiagnosticTemplate::UnknownProperty, "bar"));
        sink.emit(Diagnostic::new(DiagnosticTemplate::TextRejected, "x").with_tag("tr"));

        assert_eq!(sink.count(DiagnosticTemplate::UnknownProperty), 2);
        assert_eq!(sink.count(DiagnosticTemplate::TextRejected), 1);
        assert_eq!(sink.count(DiagnosticTemplate::ChildRejected), 0);
        assert_eq!(sink.count_total(), 3);

        let drained = sink.drain();
        assert_eq!(drained.len(), 3);
        assert_eq!(sink.count_total(), 0);
    }

    #[test]
    fn test_tee_sink_reaches_every_sink() {
        let a = CollectingSink::shared();
        let b = CollectingSink::shared();
        let tee = TeeSink::new(vec![a.clone(), b.clone()]);
        tee.emit(Diagnostic::new(DiagnosticTemplate::HandlerFailed, "boom"));
        assert_eq!(a.count(DiagnosticTemplate::HandlerFailed), 1);
        assert_eq!(b.count(DiagnosticTemplate::HandlerFailed), 1);
    }

    #[test]
    fn test_default_severity() {
        let d = Diagnostic::new(DiagnosticTemplate::IgnoredTag, "head");
        assert_eq!(d.severity, Severity::Info);
        let d = Diagnostic::new(DiagnosticTemplate::HandlerFailed, "boom");
        assert_eq!(d.severity, Severity::Error);
        let d = d.with_severity(Severity::Warning).with_node(4);
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.node, Some(4));
    }
}
