//! End-to-end conversion scenarios.

use std::sync::{Arc, Mutex};

use quire_common::{CollectingSink, DefaultResourceRetriever, DiagnosticTemplate};
use quire_convert::{
    BasicFontProvider, ConfigError, ConversionError, ConvertedDocument, Converter, ConverterProperties,
    DocumentElement, ElementKind, FontProvider, Role,
};

/// Offline converter reporting into `sink`.
fn properties(sink: &Arc<CollectingSink>) -> ConverterProperties {
    ConverterProperties::new()
        .resource_retriever(Arc::new(DefaultResourceRetriever::offline()))
        .diagnostics(sink.clone())
}

fn convert_with(html: &str, sink: &Arc<CollectingSink>) -> ConvertedDocument {
    Converter::new(properties(sink))
        .expect("valid configuration")
        .convert_html(html)
        .expect("conversion succeeds")
}

fn convert(html: &str) -> (ConvertedDocument, Arc<CollectingSink>) {
    let sink = CollectingSink::shared();
    let document = convert_with(html, &sink);
    (document, sink)
}

fn assert_single_run(document: &ConvertedDocument) {
    fn walk(element: &DocumentElement, run: quire_convert::RunId) {
        assert_eq!(element.run_id, run);
        for child in &element.children {
            walk(child, run);
        }
    }
    for element in &document.elements {
        walk(element, document.run_id);
    }
}

#[test]
fn test_single_paragraph() {
    let (document, sink) = convert("<p>Hello world!</p>");
    assert_eq!(document.elements.len(), 1);
    let paragraph = &document.elements[0];
    assert_eq!(paragraph.kind, ElementKind::Paragraph);
    assert_eq!(paragraph.role, Role::P);
    assert_eq!(paragraph.text_content(), "Hello world!");
    assert_single_run(&document);
    assert_eq!(sink.count_total(), 0, "{:?}", sink.snapshot());
}

#[test]
fn test_simple_table() {
    let (document, _sink) =
        convert("<table><tr><td>123</td><td>456</td></tr><tr><td>Long cell</td></tr></table>");
    assert_eq!(document.elements.len(), 1);
    let table = &document.elements[0];
    assert_eq!(table.kind, ElementKind::Table);
    assert_eq!(table.rows().len(), 2);
    assert_eq!(table.cell(0, 0).map(DocumentElement::text_content).as_deref(), Some("123"));
    assert_eq!(table.cell(0, 1).map(DocumentElement::text_content).as_deref(), Some("456"));
    assert_eq!(table.cell(1, 0).map(DocumentElement::text_content).as_deref(), Some("Long cell"));
    assert!(table.rows().iter().all(|row| row.property("section") == Some("body")));
    assert_single_run(&document);
}

#[test]
fn test_unclosed_tags_recover_into_paragraph_and_table() {
    let (document, _sink) = convert("<p>Hello world!<table><td>123");
    assert_eq!(document.elements.len(), 2);
    assert_eq!(document.elements[0].kind, ElementKind::Paragraph);
    assert_eq!(document.elements[0].text_content(), "Hello world!");
    assert_eq!(document.elements[1].kind, ElementKind::Table);
    assert_eq!(
        document.elements[1].cell(0, 0).map(DocumentElement::text_content).as_deref(),
        Some("123")
    );
}

#[test]
fn test_resolved_display_routes_to_table_handlers() {
    let (document, sink) = convert(
        "<style>.t { display: table } .r { display: table-row } .c { display: table-cell }</style>\
         <div class=t><bogus class=r><div class=c>A</div><span class=c>B</span></bogus></div>",
    );
    assert_eq!(document.elements.len(), 1);
    let table = &document.elements[0];
    assert_eq!(table.kind, ElementKind::Table);
    assert_eq!(table.rows().len(), 1);
    assert_eq!(table.cell(0, 0).map(DocumentElement::text_content).as_deref(), Some("A"));
    assert_eq!(table.cell(0, 1).map(DocumentElement::text_content).as_deref(), Some("B"));
    assert_eq!(sink.count(DiagnosticTemplate::NoHandlerForTag), 0);
}

/// A provider whose `reset` forgets to clear its cache.
#[derive(Debug, Default)]
struct LeakyFontProvider {
    inner: BasicFontProvider,
}

impl FontProvider for LeakyFontProvider {
    fn families(&self) -> Vec<String> {
        self.inner.families()
    }

    fn select(&mut self, family_list: &str) -> Option<String> {
        self.inner.select(family_list)
    }

    fn cached_selections(&self) -> usize {
        self.inner.cached_selections()
    }

    fn reset(&mut self) {}
}

#[test]
fn test_non_resetting_font_provider_fails_second_run() {
    let sink = CollectingSink::shared();
    let provider: Arc<Mutex<dyn FontProvider>> = Arc::new(Mutex::new(LeakyFontProvider::default()));
    let converter = Converter::new(properties(&sink).font_provider(Arc::clone(&provider))).unwrap();

    assert!(converter.convert_html("<p style='font-family: serif'>one</p>").is_ok());
    let second = converter.convert_html("<p>two</p>");
    assert!(matches!(
        second,
        Err(ConversionError::Config(ConfigError::FontProviderNotReset { cached })) if cached > 0
    ));
}

#[test]
fn test_resetting_font_provider_supports_repeated_runs() {
    let sink = CollectingSink::shared();
    let converter = Converter::new(properties(&sink)).unwrap();
    let first = converter.convert_html("<p>one</p>").unwrap();
    let second = converter.convert_html("<p>two</p>").unwrap();
    assert_ne!(first.run_id, second.run_id);
}

#[test]
fn test_text_runs_record_selected_font() {
    let (document, _sink) = convert("<p style='font-family: \"Nope\", Arial'>x</p><pre>y</pre>");
    let runs = document.find_all(ElementKind::Text);
    assert_eq!(runs[0].property("font-family"), Some("Helvetica"));
    assert_eq!(runs[1].property("font-family"), Some("Courier"));
}

#[test]
fn test_invalid_configuration_is_fatal_before_conversion() {
    let sink = CollectingSink::shared();
    let conflicting = properties(&sink)
        .default_stylesheet(false)
        .user_agent_stylesheet("p { color: red }");
    assert!(matches!(Converter::new(conflicting), Err(ConfigError::ConflictingOptions(_))));

    let bad_base = properties(&sink).base_uri("data:text/plain,hello");
    assert!(matches!(Converter::new(bad_base), Err(ConfigError::InvalidBaseUri { .. })));
    assert_eq!(sink.count_total(), 0);
}

#[test]
fn test_body_text_is_wrapped_in_anonymous_paragraphs() {
    let (document, _sink) = convert("<body>  loose <b>bold</b> text <div>block</div> tail </body>");
    let kinds: Vec<ElementKind> = document.elements.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![ElementKind::Paragraph, ElementKind::Div, ElementKind::Paragraph]);
    assert_eq!(document.elements[0].text_content(), "loose bold text");
    assert_eq!(document.elements[2].text_content(), "tail");
}

#[test]
fn test_block_inside_paragraph_splits_it() {
    let dom = {
        let mut dom = quire_convert::dom::DomTree::new();
        let body = dom.alloc_element(quire_convert::dom::ElementData::new("body"));
        let p = dom.alloc_element(quire_convert::dom::ElementData::new("p"));
        let div = dom.alloc_element(quire_convert::dom::ElementData::new("div"));
        let before = dom.alloc_text("before");
        let inside = dom.alloc_text("inside");
        let after = dom.alloc_text("after");
        dom.append_child(quire_convert::dom::NodeId::ROOT, body);
        dom.append_child(body, p);
        dom.append_child(p, before);
        dom.append_child(p, div);
        dom.append_child(div, inside);
        dom.append_child(p, after);
        dom
    };
    let sink = CollectingSink::shared();
    let document = Converter::new(properties(&sink)).unwrap().convert_tree(dom).unwrap();
    let kinds: Vec<ElementKind> = document.elements.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![ElementKind::Paragraph, ElementKind::Div, ElementKind::Paragraph]);
    assert_eq!(document.text_content(), "before\ninside\nafter");
}

#[test]
fn test_headings_and_box_properties() {
    let (document, _sink) = convert("<h2 style='margin-top: 3px; color: red'>Title</h2>");
    let heading = &document.elements[0];
    assert_eq!(heading.role, Role::H2);
    assert_eq!(heading.property("margin-top"), Some("3px"));
    // Inherited properties travel with the text, not the box.
    assert_eq!(heading.property("color"), None);
    let run = &heading.find_all(ElementKind::Text)[0];
    assert_eq!(run.property("color"), Some("red"));
    assert_eq!(run.property("font-weight"), Some("bold"));
}

#[test]
fn test_whitespace_modes_and_text_transform() {
    let (document, _sink) = convert(
        "<p>  many   spaces\n here </p>\
         <pre>  kept\n  lines</pre>\
         <p style='text-transform: uppercase'>shout</p>",
    );
    assert_eq!(document.elements[0].text_content(), "many spaces here");
    assert_eq!(document.elements[1].text_content(), "  kept\n  lines");
    assert_eq!(document.elements[2].text_content(), "SHOUT");
}

#[test]
fn test_line_breaks_and_separators() {
    let (document, _sink) = convert("<p>one <br> two</p><hr>");
    let paragraph = &document.elements[0];
    assert_eq!(paragraph.text_content(), "one\ntwo");
    assert_eq!(document.elements[1].kind, ElementKind::Separator);
    assert_eq!(document.elements[1].role, Role::Artifact);
}

#[test]
fn test_links_resolve_against_base_element() {
    let (document, sink) = convert(
        "<head><base href='https://example.com/docs/'></head>\
         <p><a href='page.html'>rel</a> <a href='#top'>frag</a></p>",
    );
    let links = document.find_all(ElementKind::Link);
    assert_eq!(links.len(), 2);
    assert_eq!(links[0].property("href"), Some("https://example.com/docs/page.html"));
    assert_eq!(links[0].text_content(), "rel");
    assert_eq!(links[1].property("destination"), Some("top"));
    assert_eq!(sink.count_total(), 0, "{:?}", sink.snapshot());
}

#[test]
fn test_language_is_carried_to_elements() {
    let (document, _sink) = convert("<html lang='fr'><body><p>Bonjour <span lang='en'>hi</span></p></body></html>");
    let paragraph = &document.elements[0];
    assert_eq!(paragraph.lang.as_deref(), Some("fr"));
    let runs = paragraph.find_all(ElementKind::Text);
    assert_eq!(runs.last().and_then(|r| r.lang.as_deref()), Some("en"));
}

#[test]
fn test_display_none_is_skipped_silently() {
    let (document, sink) = convert("<p>shown</p><p style='display:none'>hidden</p><script>var x;</script>");
    assert_eq!(document.elements.len(), 1);
    assert_eq!(sink.count_total(), 0);
}

#[test]
fn test_output_serializes_to_json() {
    let (document, _sink) = convert("<p>Hi</p>");
    let json = serde_json::to_value(&document).unwrap();
    assert_eq!(json["elements"][0]["kind"], "Paragraph");
    assert_eq!(json["elements"][0]["role"], "P");
    assert_eq!(json["elements"][0]["children"][0]["text"], "Hi");
}
