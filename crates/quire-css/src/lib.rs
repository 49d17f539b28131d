//! Stylesheet parsing, selector matching and the style cascade for quire.
//!
//! # Scope
//!
//! This crate implements:
//! - **CSS Parser** ([§ 5 Parsing](https://www.w3.org/TR/css-syntax-3/#parsing))
//!   - Stylesheets, style rules, at-rules and declaration blocks
//!
//! - **Rule Store** ([CSS Cascading § 6.1](https://www.w3.org/TR/css-cascade-4/#cascade-sort))
//!   - One entry per selector, in source order, tagged with origin
//!   - `@media` filtering and `@import` inlining
//!
//! - **CSS Selectors** ([Selectors Level 4](https://www.w3.org/TR/selectors-4/))
//!   - Type, class, ID, universal and attribute selectors
//!   - Structural, link, language and negation pseudo-classes
//!   - `::before` / `::after` matched against generated nodes
//!   - All four combinators and specificity
//!
//! - **CSS Cascade** ([CSS Cascading Level 4](https://www.w3.org/TR/css-cascade-4/))
//!   - Origin and importance layers, specificity, source order
//!   - Inline style, presentational hints
//!   - Inheritance, CSS-wide keywords, shorthand expansion
//!   - Generated content nodes
//!
//! # Not Implemented
//!
//! - Computed values (lengths stay as written, `em` is not resolved)
//! - `@supports`, `@page`, `@font-face`, `@layer`
//! - Dynamic pseudo-classes (`:hover` never matches)

/// CSS cascade and style resolution per [CSS Cascading Level 4](https://www.w3.org/TR/css-cascade-4/).
pub mod cascade;
/// Specified declarations: validation, shorthand expansion, CSS-wide keywords.
pub mod declaration;
/// The `display` property per [CSS Display Level 3](https://www.w3.org/TR/css-display-3/).
pub mod display;
/// Presentational hints from legacy HTML attributes.
pub mod hints;
/// Media queries per [Media Queries Level 4](https://www.w3.org/TR/mediaqueries-4/).
pub mod media;
/// CSS parser per [§ 5 Parsing](https://www.w3.org/TR/css-syntax-3/#parsing).
pub mod parser;
/// Property schema: inherited flags, initial values, value grammars.
pub mod schema;
/// CSS selector parsing and matching per [Selectors Level 4](https://www.w3.org/TR/selectors-4/).
pub mod selector;
/// Shorthand and legacy alias expansion.
pub mod shorthand;
/// `<style>` / `<link>` / `<base>` handling.
pub mod sources;
/// Rule store.
pub mod store;
/// The styled node tree produced by the cascade.
pub mod styled;
/// User-agent stylesheet per [WHATWG HTML § 15 Rendering](https://html.spec.whatwg.org/multipage/rendering.html).
pub mod ua_stylesheet;
/// CSS value syntax per [CSS Values Level 4](https://www.w3.org/TR/css-values-4/).
pub mod values;

pub use cascade::{CascadeResolver, PropertyMap, PropertyValue, ValueOrigin, compute_styles};
pub use declaration::{CssWideKeyword, SpecifiedDeclaration, SpecifiedValue};
pub use display::Display;
pub use media::{MediaContext, MediaType};
pub use parser::{CSSParser, Declaration, Rule, Stylesheet};
pub use selector::{ParsedSelector, PseudoElement, SelectorError, Specificity, parse_selector};
pub use store::{CascadeOrigin, RuleEntry, RuleStore};
pub use styled::{StyledNode, StyledTree};

use quire_common::{DiagnosticSink, ResourceLoader};
use quire_dom::DomTree;
use url::Url;

/// Stylesheets and environment for styling one document.
#[derive(Debug, Clone, Default)]
pub struct StyleConfig {
    /// Media environment for `@media` and `media` attributes.
    pub media: MediaContext,
    /// User-agent origin CSS. `None` disables the origin.
    pub user_agent_css: Option<String>,
    /// User origin CSS.
    pub user_css: Option<String>,
    /// Base for relative references before any `<base href>`.
    pub base_uri: Option<Url>,
}

impl StyleConfig {
    /// Configuration with the built-in user-agent stylesheet.
    #[must_use]
    pub fn with_default_stylesheet() -> Self {
        Self {
            user_agent_css: Some(ua_stylesheet::UA_CSS.to_string()),
            ..Self::default()
        }
    }
}

/// Build the rule store for `dom` and run the cascade over it.
///
/// Origins are loaded in cascade order: user agent, user, then the
/// document's own sheets. The store is returned alongside the styled tree
/// for callers that inspect the rules.
pub fn style_document(
    dom: DomTree,
    config: &StyleConfig,
    loader: &mut ResourceLoader,
    sink: &dyn DiagnosticSink,
) -> (StyledTree, RuleStore) {
    let base = sources::document_base(&dom, config.base_uri.as_ref()).or_else(|| config.base_uri.clone());
    let mut store = RuleStore::new(config.media);

    if let Some(css) = &config.user_agent_css {
        store.add_stylesheet(css, CascadeOrigin::UserAgent, None, Some(&mut *loader), sink);
    }
    if let Some(css) = &config.user_css {
        store.add_stylesheet(css, CascadeOrigin::User, base.as_ref(), Some(&mut *loader), sink);
    }
    sources::load_document_styles(&mut store, &dom, base.as_ref(), loader, sink);

    let styled = compute_styles(dom, &store, sink);
    (styled, store)
}
