//! Registration, override and locking behaviour of the handler registry.

use std::sync::{Arc, Mutex};

use quire_common::{CollectingSink, DefaultResourceRetriever, DiagnosticTemplate, ResourceLoader};
use quire_convert::css::{StyleConfig, StyledNode, StyledTree, style_document};
use quire_convert::dom::parse_html;
use quire_convert::{
    BasicFontProvider, ConversionContext, Converter, ConverterProperties, DocumentElement, ElementKind, HandlerError,
    HandlerRegistry, RegistryError, Role, TagHandler,
};

/// Turns whatever it wraps into a level-two heading.
struct DemotingHandler {
    heading: DocumentElement,
}

impl TagHandler for DemotingHandler {
    fn accept_text(&mut self, text: &str, ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        self.heading.children.push(DocumentElement::text_run(text, ctx.run_id()));
        Ok(())
    }

    fn finish(&mut self, _ctx: &mut ConversionContext) -> Result<Vec<DocumentElement>, HandlerError> {
        Ok(vec![self.heading.clone()])
    }
}

fn demoting_factory(_node: &StyledNode<'_>, ctx: &mut ConversionContext) -> Box<dyn TagHandler> {
    Box::new(DemotingHandler {
        heading: DocumentElement::new(ElementKind::Paragraph, Role::H2, ctx.run_id()),
    })
}

fn convert(registry: HandlerRegistry, html: &str) -> (Vec<DocumentElement>, Arc<CollectingSink>) {
    let sink = CollectingSink::shared();
    let properties = ConverterProperties::new()
        .resource_retriever(Arc::new(DefaultResourceRetriever::offline()))
        .diagnostics(sink.clone())
        .registry(registry);
    let document = Converter::new(properties).unwrap().convert_html(html).unwrap();
    (document.elements, sink)
}

#[test]
fn test_custom_handler_overrides_default() {
    let mut registry = HandlerRegistry::with_defaults();
    registry.register("h1", demoting_factory).unwrap();
    let (elements, _sink) = convert(registry, "<h1>Title</h1>");
    assert_eq!(elements.len(), 1);
    assert_eq!(elements[0].role, Role::H2);
    assert_eq!(elements[0].text_content(), "Title");
}

#[test]
fn test_remove_restores_previous_registration() {
    let mut registry = HandlerRegistry::with_defaults();
    registry.register("H1", demoting_factory).unwrap();

    assert!(registry.remove("h1").unwrap());
    let (elements, _sink) = convert(registry.clone(), "<h1>Title</h1>");
    assert_eq!(elements[0].role, Role::H1);

    // Removing the built-in registration leaves the tag unhandled.
    assert!(registry.remove("h1").unwrap());
    let (elements, sink) = convert(registry, "<h1>Title</h1>");
    assert_eq!(sink.count(DiagnosticTemplate::NoHandlerForTag), 1);
    assert_eq!(elements.len(), 1);
    assert_eq!(elements[0].kind, ElementKind::Paragraph);
    assert_eq!(elements[0].role, Role::P);
}

fn first_with_tag<'t>(node: StyledNode<'t>, tag: &str) -> Option<StyledNode<'t>> {
    if node.tag() == Some(tag) {
        return Some(node);
    }
    node.children().find_map(|child| first_with_tag(child, tag))
}

#[test]
fn test_registry_locks_after_first_create() {
    let sink = CollectingSink::shared();
    let mut loader = ResourceLoader::new(Arc::new(DefaultResourceRetriever::offline()));
    let (styled, _store): (StyledTree, _) = style_document(
        parse_html("<p>x</p>"),
        &StyleConfig::with_default_stylesheet(),
        &mut loader,
        sink.as_ref(),
    );
    let mut ctx = ConversionContext::new(None, loader, Arc::new(Mutex::new(BasicFontProvider::new())), sink);

    let mut registry = HandlerRegistry::with_defaults();
    assert!(!registry.is_locked());
    let paragraph = first_with_tag(styled.root(), "p").unwrap();
    assert!(registry.create(&paragraph, &mut ctx).is_some());
    assert!(registry.is_locked());

    assert_eq!(
        registry.register("h1", demoting_factory),
        Err(RegistryError::Locked("h1".to_string()))
    );
    assert!(matches!(registry.remove("p"), Err(RegistryError::Locked(_))));

    // A fresh copy for the next run accepts changes again.
    let mut next = registry.clone();
    assert!(next.register("h1", demoting_factory).is_ok());
}

fn level_one_factory(_node: &StyledNode<'_>, ctx: &mut ConversionContext) -> Box<dyn TagHandler> {
    Box::new(DemotingHandler {
        heading: DocumentElement::new(ElementKind::Paragraph, Role::H1, ctx.run_id()),
    })
}

#[test]
fn test_custom_tag_registrations_stack() {
    let mut registry = HandlerRegistry::with_defaults();
    registry.register("dummy", level_one_factory).unwrap();
    registry.register("dummy", demoting_factory).unwrap();

    let (elements, _sink) = convert(registry.clone(), "<dummy>x</dummy>");
    assert_eq!(elements[0].role, Role::H2);

    assert!(registry.remove("dummy").unwrap());
    let (elements, _sink) = convert(registry.clone(), "<dummy>x</dummy>");
    assert_eq!(elements[0].role, Role::H1);

    assert!(registry.remove("dummy").unwrap());
    assert!(!registry.contains("dummy"));
    let (_elements, sink) = convert(registry, "<dummy>x</dummy>");
    assert_eq!(sink.count(DiagnosticTemplate::NoHandlerForTag), 1);
}
