//! A failing or unexpected node never stops the rest of the document.

use std::sync::Arc;

use quire_common::{CollectingSink, DefaultResourceRetriever, DiagnosticTemplate, Severity};
use quire_convert::css::StyledNode;
use quire_convert::{
    ConversionContext, ConversionError, ConvertedDocument, Converter, ConverterProperties, DocumentElement,
    ElementKind, HandlerError, HandlerRegistry, Role, TagHandler,
};

fn convert_with(registry: HandlerRegistry, html: &str) -> (ConvertedDocument, Arc<CollectingSink>) {
    let sink = CollectingSink::shared();
    let properties = ConverterProperties::new()
        .resource_retriever(Arc::new(DefaultResourceRetriever::offline()))
        .diagnostics(sink.clone())
        .registry(registry);
    let document = Converter::new(properties).unwrap().convert_html(html).unwrap();
    (document, sink)
}

fn convert(html: &str) -> (ConvertedDocument, Arc<CollectingSink>) {
    convert_with(HandlerRegistry::with_defaults(), html)
}

#[test]
fn test_unknown_tag_content_is_reparented() {
    let (document, sink) = convert("<div><bogus><p>a</p><p>b</p></bogus></div>");
    assert_eq!(sink.count(DiagnosticTemplate::NoHandlerForTag), 1);
    let reported = sink.snapshot();
    assert_eq!(reported[0].tag.as_deref(), Some("bogus"));

    let div = &document.elements[0];
    assert_eq!(div.kind, ElementKind::Div);
    let texts: Vec<String> = div.children.iter().map(DocumentElement::text_content).collect();
    assert_eq!(texts, vec!["a", "b"]);
}

/// A container that refuses thematic breaks.
struct Picky {
    element: DocumentElement,
}

impl TagHandler for Picky {
    fn accept_child(&mut self, child: DocumentElement, _ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        if child.kind == ElementKind::Separator {
            return Err(HandlerError::rejected("no separators"));
        }
        self.element.children.push(child);
        Ok(())
    }

    fn finish(&mut self, _ctx: &mut ConversionContext) -> Result<Vec<DocumentElement>, HandlerError> {
        let empty = DocumentElement::new(ElementKind::Div, Role::Div, self.element.run_id);
        Ok(vec![std::mem::replace(&mut self.element, empty)])
    }
}

#[test]
fn test_rejected_child_is_dropped_and_siblings_kept() {
    let mut registry = HandlerRegistry::with_defaults();
    registry
        .register("div", |_node: &StyledNode<'_>, ctx: &mut ConversionContext| -> Box<dyn TagHandler> {
            Box::new(Picky {
                element: DocumentElement::new(ElementKind::Div, Role::Div, ctx.run_id()),
            })
        })
        .unwrap();
    let (document, sink) = convert_with(registry, "<div><p>one</p><hr><p>two</p></div>");

    let div = &document.elements[0];
    assert_eq!(div.children.len(), 2);
    assert_eq!(div.children[0].text_content(), "one");
    assert_eq!(div.children[1].text_content(), "two");

    assert_eq!(sink.count(DiagnosticTemplate::ChildRejected), 1);
    let rejected = sink.snapshot().into_iter().find(|d| d.template == DiagnosticTemplate::ChildRejected).unwrap();
    assert_eq!(rejected.tag.as_deref(), Some("hr"));
    assert_eq!(rejected.severity, Severity::Warning);
    assert_eq!(sink.count_total(), 1);
}

/// Fails when asked for its result.
struct Failing;

impl TagHandler for Failing {
    fn accept_text(&mut self, _text: &str, _ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        Ok(())
    }

    fn accept_child(&mut self, _child: DocumentElement, _ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        Ok(())
    }

    fn finish(&mut self, _ctx: &mut ConversionContext) -> Result<Vec<DocumentElement>, HandlerError> {
        Err(HandlerError::Failed("out of ink".to_string()))
    }
}

/// Panics on the first text it sees.
struct Panicking;

impl TagHandler for Panicking {
    fn accept_text(&mut self, text: &str, _ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        panic!("cannot handle {text:?}");
    }

    fn finish(&mut self, _ctx: &mut ConversionContext) -> Result<Vec<DocumentElement>, HandlerError> {
        Ok(Vec::new())
    }
}

#[test]
fn test_failing_handlers_lose_only_their_subtree() {
    let mut registry = HandlerRegistry::with_defaults();
    registry
        .register("section", |_node: &StyledNode<'_>, _ctx: &mut ConversionContext| -> Box<dyn TagHandler> {
            Box::new(Failing)
        })
        .unwrap();
    registry
        .register("aside", |_node: &StyledNode<'_>, _ctx: &mut ConversionContext| -> Box<dyn TagHandler> {
            Box::new(Panicking)
        })
        .unwrap();

    let (document, sink) = convert_with(
        registry,
        "<p>before</p><section><p>lost</p></section><aside>boom<p>gone</p></aside><p>after</p>",
    );

    assert_eq!(sink.count(DiagnosticTemplate::HandlerFailed), 2);
    let failed: Vec<String> = sink
        .snapshot()
        .into_iter()
        .filter(|d| d.template == DiagnosticTemplate::HandlerFailed)
        .filter_map(|d| d.tag)
        .collect();
    assert_eq!(failed, vec!["section", "aside"]);

    let texts: Vec<String> = document.elements.iter().map(DocumentElement::text_content).collect();
    assert_eq!(texts, vec!["before", "after"]);
}

#[test]
fn test_stray_list_text_is_rejected() {
    let (document, sink) = convert("<ul>stray<li>a</li></ul>");
    assert_eq!(sink.count(DiagnosticTemplate::TextRejected), 1);
    let list = &document.elements[0];
    assert_eq!(list.kind, ElementKind::List);
    assert_eq!(list.children.len(), 1);
    assert_eq!(list.children[0].text_content(), "a");
}

#[test]
fn test_failing_html_element_is_fatal() {
    let mut registry = HandlerRegistry::with_defaults();
    registry
        .register("html", |_node: &StyledNode<'_>, _ctx: &mut ConversionContext| -> Box<dyn TagHandler> {
            Box::new(Failing)
        })
        .unwrap();
    let sink = CollectingSink::shared();
    let properties = ConverterProperties::new()
        .resource_retriever(Arc::new(DefaultResourceRetriever::offline()))
        .diagnostics(sink.clone())
        .registry(registry);
    let result = Converter::new(properties).unwrap().convert_html("<p>x</p>");

    assert!(matches!(result, Err(ConversionError::RootFailed(ref reason)) if reason.contains("out of ink")));
    assert_eq!(sink.count(DiagnosticTemplate::HandlerFailed), 1);
}
