//! Document stylesheet sources.
//!
//! [CSS Cascading § 6.1](https://www.w3.org/TR/css-cascade-4/#cascade-sort)
//!
//! "Declarations from style sheets independently linked by the originating
//! document are treated as if they were concatenated in linking order, as
//! determined by the host document language."
//!
//! `<style>` elements and `<link rel="stylesheet">` elements are collected
//! in document order, so a `<link>` after a `<style>` wins ties against it.

use quire_common::{Diagnostic, DiagnosticSink, DiagnosticTemplate, ResourceLoader, UriResolver};
use quire_dom::{DomTree, NodeId};
use url::Url;

use crate::store::{CascadeOrigin, RuleStore};

/// [HTML § 4.2.3 The base element](https://html.spec.whatwg.org/multipage/semantics.html#the-base-element)
///
/// "The document base URL ... is the frozen base URL of the first base
/// element in the Document that has an href attribute". The href is
/// resolved against the configured base. Returns `None` when the document
/// has no usable `<base href>`.
#[must_use]
pub fn document_base(tree: &DomTree, configured: Option<&Url>) -> Option<Url> {
    let href = tree
        .elements_by_tag("base")
        .into_iter()
        .find_map(|id| tree.as_element(id).and_then(|e| e.attr("href")))?;

    let resolved = match configured {
        Some(base) => UriResolver::from_url(base.clone()).and_then(|r| r.resolve(href)),
        None => Url::parse(href.trim()).map_err(|e| quire_common::ResourceError::InvalidBase {
            base: href.to_string(),
            reason: e.to_string(),
        }),
    };
    match resolved {
        Ok(url) => Some(url),
        Err(e) => {
            log::warn!(target: "quire::css", "ignoring <base href=\"{href}\">: {e}");
            None
        }
    }
}

/// Where a document stylesheet comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StylesheetSource {
    /// [§ 4.2.6 The style element](https://html.spec.whatwg.org/multipage/semantics.html#the-style-element)
    Inline {
        /// The `<style>` element.
        node: NodeId,
        /// Its text content.
        css: String,
    },
    /// [§ 4.2.4 The link element](https://html.spec.whatwg.org/multipage/semantics.html#the-link-element)
    External {
        /// The `<link>` element.
        node: NodeId,
        /// The raw `href` attribute.
        href: String,
    },
}

/// Collect the document's stylesheet sources in document order, skipping
/// those whose `media` attribute does not match and non-CSS `type`s.
#[must_use]
pub fn collect_stylesheet_sources(tree: &DomTree, store: &RuleStore) -> Vec<StylesheetSource> {
    let mut sources = Vec::new();
    for id in tree.descendants(tree.root()) {
        let Some(element) = tree.as_element(id) else {
            continue;
        };
        if element
            .attr("media")
            .is_some_and(|media| !store.media().matches(media))
        {
            continue;
        }
        match element.tag_name.as_str() {
            "style" => {
                let css_type = element.attr("type").map(|t| t.trim().to_ascii_lowercase());
                if css_type.as_deref().is_some_and(|t| !t.is_empty() && t != "text/css") {
                    continue;
                }
                sources.push(StylesheetSource::Inline {
                    node: id,
                    css: tree.text_content(id),
                });
            }
            "link" => {
                // "The rel attribute ... is a set of space-separated tokens"
                let rel = element.attr("rel").unwrap_or_default().to_ascii_lowercase();
                let tokens: Vec<&str> = rel.split_ascii_whitespace().collect();
                if !tokens.contains(&"stylesheet") || tokens.contains(&"alternate") {
                    continue;
                }
                if let Some(href) = element.attr("href").filter(|h| !h.trim().is_empty()) {
                    sources.push(StylesheetSource::External {
                        node: id,
                        href: href.to_string(),
                    });
                }
            }
            _ => {}
        }
    }
    sources
}

/// Add every document stylesheet to `store` at author origin. External
/// sheets are fetched through `loader`; failures are reported and skipped.
pub fn load_document_styles(
    store: &mut RuleStore,
    tree: &DomTree,
    base: Option<&Url>,
    loader: &mut ResourceLoader,
    sink: &dyn DiagnosticSink,
) {
    for source in collect_stylesheet_sources(tree, store) {
        match source {
            StylesheetSource::Inline { css, .. } => {
                store.add_stylesheet(&css, CascadeOrigin::Author, base, Some(&mut *loader), sink);
            }
            StylesheetSource::External { node, href } => {
                let resolved = match base {
                    Some(base) => UriResolver::from_url(base.clone()).and_then(|r| r.resolve(&href)),
                    None => quire_common::resolve_url("", &href),
                };
                let fetched = resolved.and_then(|url| loader.load(&url).map(|bytes| (url, bytes)));
                match fetched {
                    Ok((url, bytes)) => {
                        let css = String::from_utf8_lossy(&bytes).into_owned();
                        store.add_stylesheet(&css, CascadeOrigin::Author, Some(&url), Some(&mut *loader), sink);
                    }
                    Err(e) => sink.emit(
                        Diagnostic::new(DiagnosticTemplate::StylesheetUnavailable, format!("{href}: {e}"))
                            .with_tag("link")
                            .with_node(node.0),
                    ),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaContext;
    use quire_common::{CollectingSink, DefaultResourceRetriever};
    use std::sync::Arc;

    #[test]
    fn test_sources_in_document_order() {
        let tree = quire_dom::parse_html(
            r#"<head><style>p{}</style><link rel="stylesheet" href="a.css">
            <style media="screen">em{}</style><link rel="alternate stylesheet" href="b.css"></head>"#,
        );
        let store = RuleStore::new(MediaContext::default());
        let sources = collect_stylesheet_sources(&tree, &store);
        assert_eq!(sources.len(), 2);
        assert!(matches!(&sources[0], StylesheetSource::Inline { css, .. } if css == "p{}"));
        assert!(matches!(&sources[1], StylesheetSource::External { href, .. } if href == "a.css"));
    }

    #[test]
    fn test_base_element_overrides_configured_base() {
        let tree = quire_dom::parse_html(r#"<head><base href="sub/"></head>"#);
        let configured = Url::parse("https://example.com/docs/index.html").unwrap();
        let base = document_base(&tree, Some(&configured)).unwrap();
        assert_eq!(base.as_str(), "https://example.com/docs/sub/");
    }

    #[test]
    fn test_unreachable_link_is_reported() {
        let tree = quire_dom::parse_html(r#"<link rel="stylesheet" href="https://example.com/x.css"><p>x"#);
        let sink = CollectingSink::new();
        let mut store = RuleStore::new(MediaContext::default());
        let mut loader = ResourceLoader::new(Arc::new(DefaultResourceRetriever::offline()));
        load_document_styles(&mut store, &tree, None, &mut loader, &sink);
        assert!(store.is_empty());
        assert_eq!(sink.count(DiagnosticTemplate::StylesheetUnavailable), 1);
    }
}
