//! Style rule store.
//!
//! [CSS Cascading § 6.1 Cascade Sorting Order](https://www.w3.org/TR/css-cascade-4/#cascade-sort)
//!
//! Holds every style rule of a run, one entry per selector, in source
//! order. Stylesheets are flattened on the way in: `@media` blocks that
//! match the configured medium are inlined, `@import`ed sheets are fetched
//! and inlined at the position of the import.

use std::sync::Arc;

use quire_common::{Diagnostic, DiagnosticSink, DiagnosticTemplate, ResourceLoader, UriResolver};
use quire_dom::{DomTree, NodeId};
use serde::Serialize;
use strum_macros::Display;
use url::Url;

use crate::declaration::{SpecifiedDeclaration, specify_block};
use crate::media::MediaContext;
use crate::parser::{AtRule, Rule, StyleRule, Stylesheet, split_top_level};
use crate::selector::{ParsedSelector, PseudoElement, Specificity, parse_selector};
use crate::values::{function_parts, is_string, split_components, unquote};

/// Nesting limit for `@import` chains. Also breaks import cycles.
const MAX_IMPORT_DEPTH: usize = 8;

/// [§ 6.2 Cascading Origins](https://www.w3.org/TR/css-cascade-4/#cascading-origins)
///
/// Declaration order is the normal-importance precedence, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize)]
#[strum(serialize_all = "kebab-case")]
pub enum CascadeOrigin {
    /// "These are the rules provided by the user agent's default style sheet."
    UserAgent,
    /// "The user may be able to specify style information for a particular document."
    User,
    /// "The author specifies style sheets for a source document"
    Author,
}

/// One selector of a style rule, with the rule's declarations.
#[derive(Debug, Clone)]
pub struct RuleEntry {
    /// The parsed selector.
    pub selector: ParsedSelector,
    /// Declarations of the rule, shared by all of its selectors.
    pub declarations: Arc<[SpecifiedDeclaration]>,
    /// Origin of the stylesheet the rule came from.
    pub origin: CascadeOrigin,
    /// Position of the rule in the flattened rule sequence. All selectors of
    /// one rule share it.
    pub source_order: usize,
}

impl RuleEntry {
    /// Specificity of this entry's selector.
    #[must_use]
    pub const fn specificity(&self) -> Specificity {
        self.selector.specificity
    }
}

/// Ordered store of style rules for one run.
#[derive(Debug)]
pub struct RuleStore {
    entries: Vec<RuleEntry>,
    // Order 0 is reserved for presentational hints.
    next_order: usize,
    media: MediaContext,
}

impl RuleStore {
    /// Create an empty store that evaluates `@media` against `media`.
    #[must_use]
    pub const fn new(media: MediaContext) -> Self {
        Self {
            entries: Vec::new(),
            next_order: 1,
            media,
        }
    }

    /// The media context rules are filtered against.
    #[must_use]
    pub const fn media(&self) -> &MediaContext {
        &self.media
    }

    /// All entries in source order.
    #[must_use]
    pub fn entries(&self) -> &[RuleEntry] {
        &self.entries
    }

    /// Number of entries (selectors, not rules).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any entry targets the given pseudo-element.
    #[must_use]
    pub fn has_pseudo_element(&self, pseudo: PseudoElement) -> bool {
        self.entries
            .iter()
            .any(|e| e.selector.pseudo_element == Some(pseudo))
    }

    /// Entries whose selector matches `node`, in store order.
    pub fn matching<'s>(
        &'s self,
        tree: &'s DomTree,
        node: NodeId,
    ) -> impl Iterator<Item = &'s RuleEntry> + 's {
        self.entries
            .iter()
            .filter(move |entry| entry.selector.matches_in_tree(tree, node))
    }

    /// Parse `css` and add its rules.
    ///
    /// `base` resolves `@import` references; imports are only followed when
    /// a `loader` is supplied.
    pub fn add_stylesheet(
        &mut self,
        css: &str,
        origin: CascadeOrigin,
        base: Option<&Url>,
        mut loader: Option<&mut ResourceLoader>,
        sink: &dyn DiagnosticSink,
    ) {
        let before = self.entries.len();
        let sheet = Stylesheet::parse(css);
        self.add_rules(&sheet.rules, origin, base, &mut loader, sink, 0);
        log::debug!(
            target: "quire::css",
            "{origin} stylesheet: {} rules, {} selector entries",
            sheet.rules.len(),
            self.entries.len() - before
        );
    }

    fn add_rules(
        &mut self,
        rules: &[Rule],
        origin: CascadeOrigin,
        base: Option<&Url>,
        loader: &mut Option<&mut ResourceLoader>,
        sink: &dyn DiagnosticSink,
        depth: usize,
    ) {
        for rule in rules {
            match rule {
                Rule::Style(style_rule) => self.add_style_rule(style_rule, origin, sink),
                Rule::At(at_rule) => self.add_at_rule(at_rule, origin, base, loader, sink, depth),
            }
        }
    }

    /// [§ 5.4.3 Consume a qualified rule](https://www.w3.org/TR/css-syntax-3/#consume-qualified-rule)
    ///
    /// Add one style rule, one entry per selector in its list. "If any
    /// selector in the list is invalid, the entire rule is invalid", so a
    /// single bad selector drops the whole rule with one diagnostic.
    pub fn add_style_rule(&mut self, rule: &StyleRule, origin: CascadeOrigin, sink: &dyn DiagnosticSink) {
        let parsed: Result<Vec<ParsedSelector>, _> = rule
            .selectors
            .iter()
            .map(|s| parse_selector(s).map_err(|e| (s, e)))
            .collect();
        let selectors = match parsed {
            Ok(selectors) if !selectors.is_empty() => selectors,
            Ok(_) => return,
            Err((text, error)) => {
                sink.emit(Diagnostic::new(
                    DiagnosticTemplate::InvalidSelector,
                    format!("'{text}': {error}"),
                ));
                return;
            }
        };

        let context = rule.selectors.join(", ");
        let declarations: Arc<[SpecifiedDeclaration]> =
            specify_block(&rule.declarations, Some(&context), sink).into();
        let source_order = self.next_order;
        self.next_order += 1;

        self.entries.extend(selectors.into_iter().map(|selector| RuleEntry {
            selector,
            declarations: Arc::clone(&declarations),
            origin,
            source_order,
        }));
    }

    fn add_at_rule(
        &mut self,
        at_rule: &AtRule,
        origin: CascadeOrigin,
        base: Option<&Url>,
        loader: &mut Option<&mut ResourceLoader>,
        sink: &dyn DiagnosticSink,
        depth: usize,
    ) {
        match at_rule.name.to_ascii_lowercase().as_str() {
            // [Media Queries § 3](https://www.w3.org/TR/mediaqueries-4/#media-descriptor-table)
            "media" => {
                if self.media.matches(&at_rule.prelude) {
                    self.add_rules(&at_rule.nested_rules(), origin, base, loader, sink, depth);
                }
            }
            // [CSS Cascading § 2 Importing Style Sheets](https://www.w3.org/TR/css-cascade-4/#at-import)
            "import" => self.add_import(&at_rule.prelude, origin, base, loader, sink, depth),
            "charset" => {}
            other => sink.emit(Diagnostic::new(
                DiagnosticTemplate::UnsupportedAtRule,
                format!("@{other}"),
            )),
        }
    }

    /// `@import [ <url> | <string> ] <media-query-list>?`
    fn add_import(
        &mut self,
        prelude: &str,
        origin: CascadeOrigin,
        base: Option<&Url>,
        loader: &mut Option<&mut ResourceLoader>,
        sink: &dyn DiagnosticSink,
        depth: usize,
    ) {
        let unavailable = |detail: String| {
            sink.emit(Diagnostic::new(DiagnosticTemplate::StylesheetUnavailable, detail));
        };

        let components = split_components(prelude);
        let Some(first) = components.first() else {
            unavailable("@import without a location".to_string());
            return;
        };
        let href = match function_parts(first) {
            Some((name, args)) if name == "url" => unquote(args.trim()),
            _ if is_string(first) => unquote(first),
            _ => {
                unavailable(format!("@import {prelude}"));
                return;
            }
        };
        let media_list = components[1..].join(" ");
        if !split_top_level(&media_list, ',').is_empty() && !self.media.matches(&media_list) {
            return;
        }
        if depth >= MAX_IMPORT_DEPTH {
            unavailable(format!("{href}: @import nested too deeply"));
            return;
        }
        let Some(loader) = loader.as_deref_mut() else {
            unavailable(format!("{href}: no resource loader"));
            return;
        };

        let resolved = match base {
            Some(base) => UriResolver::from_url(base.clone()).and_then(|r| r.resolve(&href)),
            None => quire_common::resolve_url("", &href),
        };
        let url = match resolved {
            Ok(url) => url,
            Err(e) => {
                unavailable(e.to_string());
                return;
            }
        };
        match loader.load(&url) {
            Ok(bytes) => {
                let css = String::from_utf8_lossy(&bytes).into_owned();
                let sheet = Stylesheet::parse(&css);
                log::debug!(target: "quire::css", "@import {url}: {} rules", sheet.rules.len());
                let mut nested = Some(loader);
                self.add_rules(&sheet.rules, origin, Some(&url), &mut nested, sink, depth + 1);
            }
            Err(e) => unavailable(e.to_string()),
        }
    }
}
