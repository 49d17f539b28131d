//! Integration tests for CSS cascade and style computation.

use std::sync::Arc;

use quickcheck_macros::quickcheck;
use quire_common::{CollectingSink, DefaultResourceRetriever, DiagnosticTemplate, ResourceLoader};
use quire_css::values::canonicalize;
use quire_css::{
    CascadeOrigin, CascadeResolver, Display, MediaContext, MediaType, RuleStore, StyleConfig,
    StyledTree, ValueOrigin, parse_selector, style_document,
};
use quire_dom::{NodeId, parse_html};

fn style_with(html: &str, config: &StyleConfig) -> (StyledTree, CollectingSink) {
    let sink = CollectingSink::new();
    let mut loader = ResourceLoader::new(Arc::new(DefaultResourceRetriever::offline()));
    let (styled, _store) = style_document(parse_html(html), config, &mut loader, &sink);
    (styled, sink)
}

/// Author CSS only; no user-agent defaults.
fn style(html: &str) -> StyledTree {
    style_with(html, &StyleConfig::default()).0
}

fn first(styled: &StyledTree, tag: &str) -> NodeId {
    styled.dom().elements_by_tag(tag)[0]
}

fn value<'a>(styled: &'a StyledTree, node: NodeId, property: &str) -> &'a str {
    styled
        .style(node)
        .and_then(|s| s.value(property))
        .unwrap_or_else(|| panic!("{property} not resolved"))
}

#[test]
fn test_color_is_inherited_from_body() {
    let styled = style("<style>body { color: #333; }</style><p>text</p>");
    let p = first(&styled, "p");
    let color = styled.style(p).unwrap().get("color").unwrap();
    assert_eq!(color.value, "#333333");
    assert_eq!(color.origin, ValueOrigin::Inherited);
}

#[test]
fn test_non_inherited_property_uses_initial_value() {
    let styled = style("<style>body { margin-top: 4px; }</style><p>text</p>");
    let p = first(&styled, "p");
    let margin = styled.style(p).unwrap().get("margin-top").unwrap();
    assert_eq!(margin.value, "0");
    assert_eq!(margin.origin, ValueOrigin::Initial);
}

#[test]
fn test_higher_specificity_wins_regardless_of_order() {
    let styled = style(
        "<style>#lead { color: green } p.note { color: blue } p { color: red }</style>
         <p id=lead class=note>a</p><p class=note>b</p>",
    );
    let paragraphs = styled.dom().elements_by_tag("p");
    assert_eq!(value(&styled, paragraphs[0], "color"), "green");
    assert_eq!(value(&styled, paragraphs[1], "color"), "blue");
}

#[test]
fn test_later_rule_wins_tie() {
    let styled = style("<style>p { color: red } p { color: blue }</style><p>x</p>");
    assert_eq!(value(&styled, first(&styled, "p"), "color"), "blue");
}

#[test]
fn test_important_beats_specificity_and_inline_style() {
    let styled = style(
        r#"<style>p { color: red !important } #x { color: blue }</style>
           <p id=x style="color: green">x</p>"#,
    );
    assert_eq!(value(&styled, first(&styled, "p"), "color"), "red");
}

#[test]
fn test_inline_style_beats_id_rule() {
    let styled = style(r#"<style>#x { color: blue }</style><p id=x style="color: green">x</p>"#);
    assert_eq!(value(&styled, first(&styled, "p"), "color"), "green");
}

#[test]
fn test_shorthand_expands_into_longhands() {
    let styled = style("<style>div { margin: 1pt 2pt; border: 1px solid red }</style><div>x</div>");
    let div = first(&styled, "div");
    assert_eq!(value(&styled, div, "margin-top"), "1pt");
    assert_eq!(value(&styled, div, "margin-left"), "2pt");
    assert_eq!(value(&styled, div, "border-bottom-style"), "solid");
    assert_eq!(value(&styled, div, "border-left-color"), "red");
}

#[test]
fn test_explicit_inherit_and_initial() {
    let styled = style(
        "<style>div { margin-top: 5pt; color: red } p { margin-top: inherit; color: initial }</style>
         <div><p>x</p></div>",
    );
    let p = first(&styled, "p");
    assert_eq!(value(&styled, p, "margin-top"), "5pt");
    assert_eq!(value(&styled, p, "color"), "black");
}

#[test]
fn test_media_rules_follow_the_environment() {
    let html = "<style>p { color: red } @media screen { p { color: blue } }</style><p>x</p>";
    let print = style(html);
    assert_eq!(value(&print, first(&print, "p"), "color"), "red");

    let config = StyleConfig {
        media: MediaContext::new(MediaType::Screen),
        ..StyleConfig::default()
    };
    let (screen, _) = style_with(html, &config);
    assert_eq!(value(&screen, first(&screen, "p"), "color"), "blue");
}

#[test]
fn test_bad_rules_are_reported_and_skipped() {
    let (styled, sink) = style_with(
        "<style>p, p >> em { color: red } p { colour: blue; width: -3px } @page { margin: 0 }</style><p>x</p>",
        &StyleConfig::default(),
    );
    let p = first(&styled, "p");
    assert_eq!(value(&styled, p, "color"), "black");
    assert_eq!(value(&styled, p, "width"), "auto");
    assert_eq!(sink.count(DiagnosticTemplate::InvalidSelector), 1);
    assert_eq!(sink.count(DiagnosticTemplate::UnknownProperty), 1);
    assert_eq!(sink.count(DiagnosticTemplate::InvalidPropertyValue), 1);
    assert_eq!(sink.count(DiagnosticTemplate::UnsupportedAtRule), 1);
}

#[test]
fn test_unknown_properties_pass_through() {
    let styled = style("<style>p { -x-ink: blot }</style><p>x</p>");
    let style = styled.style(first(&styled, "p")).unwrap();
    let (name, ink) = style.unrecognized().next().unwrap();
    assert_eq!(name, "-x-ink");
    assert_eq!(ink.value, "blot");
    assert!(!ink.recognized);
}

#[test]
fn test_presentational_hints_lose_to_author_rules() {
    let styled = style(
        "<style>td.b { text-align: right }</style>
         <table><tr><td align=center>a</td><td class=b align=center>b</td></tr></table>",
    );
    let cells = styled.dom().elements_by_tag("td");
    assert_eq!(value(&styled, cells[0], "text-align"), "center");
    assert_eq!(value(&styled, cells[1], "text-align"), "right");
}

#[test]
fn test_user_agent_defaults() {
    let (styled, sink) = style_with(
        "<h1>Title</h1><ul><li>one</li></ul><table><tr><td>c</td></tr></table><span>s</span>",
        &StyleConfig::with_default_stylesheet(),
    );
    let tree = styled.dom();
    assert_eq!(styled.node(first(&styled, "h1")).display(), Display::Block);
    assert_eq!(value(&styled, first(&styled, "h1"), "font-weight"), "bold");
    assert_eq!(styled.node(first(&styled, "li")).display(), Display::ListItem);
    assert_eq!(value(&styled, first(&styled, "li"), "list-style-type"), "disc");
    assert_eq!(styled.node(first(&styled, "td")).display(), Display::TableCell);
    assert_eq!(styled.node(first(&styled, "span")).display(), Display::Inline);
    assert_eq!(styled.node(tree.elements_by_tag("head")[0]).display(), Display::None);
    assert_eq!(sink.count_total(), 0);
}

#[test]
fn test_before_and_after_are_generated() {
    let styled = style(
        r#"<style>p::before { content: "» "; color: red } p.x::after { content: none }</style>
           <p class=x>body</p>"#,
    );
    let p = styled.node(first(&styled, "p"));
    let children: Vec<_> = p.children().collect();
    assert_eq!(children.len(), 2, "content: none suppresses ::after");
    assert!(children[0].is_generated());
    assert_eq!(children[0].tag(), Some("::before"));
    let before = children[0].style().unwrap();
    assert_eq!(before.value("content"), Some("\"» \""));
    assert_eq!(before.value("color"), Some("red"));
    assert_eq!(children[1].text(), Some("body"));
}

#[test]
fn test_generated_content_inherits_from_originating_element() {
    let styled = style(
        r#"<style>q { color: teal } q::after { content: close-quote }</style><p><q>x</q></p>"#,
    );
    let q = styled.node(first(&styled, "q"));
    let after = q.children().last().unwrap();
    assert!(after.is_generated());
    assert_eq!(after.style().unwrap().value("color"), Some("teal"));
    assert_eq!(after.parent().unwrap().id(), q.id());
}

#[test]
fn test_void_elements_get_no_generated_content() {
    let styled = style(r#"<style>*::before { content: "x" }</style><p>a<br>b</p>"#);
    let br = styled.node(first(&styled, "br"));
    assert_eq!(br.children().count(), 0);
    let p = styled.node(first(&styled, "p"));
    assert!(p.children().next().unwrap().is_generated());
}

#[test]
fn test_float_blockifies_inline_elements() {
    let styled = style("<style>span { float: left }</style><p><span>x</span></p>");
    assert_eq!(styled.node(first(&styled, "span")).display(), Display::Block);
}

#[test]
fn test_every_element_is_styled() {
    let styled = style("<div><p>a <em>b</em></p></div>");
    let tree = styled.dom();
    for id in tree.descendants(tree.root()) {
        if tree.as_element(id).is_some() {
            assert!(styled.style(id).is_some(), "{:?} unstyled", tree.tag_name(id));
        }
    }
}

#[test]
fn test_extreme_nth_offsets_do_not_abort_the_cascade() {
    let styled = style(
        "<style>li:nth-child(n-2147483648) { text-transform: uppercase } \
         li:nth-last-child(-n+2147483647) { margin-top: 1pt } \
         li:nth-of-type(-2147483648n+2147483647) { margin-top: 9pt }</style>\
         <ul><li>x</li><li>y</li></ul>",
    );
    let items = styled.dom().elements_by_tag("li");
    assert_eq!(value(&styled, items[0], "text-transform"), "uppercase");
    assert_eq!(value(&styled, items[1], "margin-top"), "1pt");
}

/// Rule fragments the idempotence property draws from.
const RULES: &[&str] = &[
    "p { color: red }",
    "div p { color: blue !important }",
    ".a { margin: 1px 2px }",
    "#b { font-weight: bold }",
    "p:first-child { text-transform: uppercase }",
    "p::before { content: \"x\"; counter-increment: n }",
    "* { line-height: 2 }",
    "div > .a { border: 1px solid green }",
    "p { bogus-property: 3 }",
    "@media screen { p { color: navy } }",
];

const DOCUMENT: &str = r#"<div class=a><p id=b class=a style="color: teal">one</p><p>two</p></div>"#;

#[quickcheck]
fn prop_cascade_resolution_is_idempotent(picks: Vec<u8>) -> bool {
    let css: Vec<&str> = picks.iter().map(|i| RULES[usize::from(*i) % RULES.len()]).collect();
    let sink = CollectingSink::new();
    let tree = parse_html(DOCUMENT);
    let mut store = RuleStore::new(MediaContext::default());
    store.add_stylesheet(&css.join("\n"), CascadeOrigin::Author, None, None, &sink);
    let resolver = CascadeResolver::new(&store, &tree, &sink);

    let Some(body) = tree.body() else {
        return false;
    };
    let body_style = resolver.resolve(&tree, body, None);
    tree.descendants(body)
        .into_iter()
        .filter(|id| tree.as_element(*id).is_some())
        .all(|id| {
            let once = resolver.resolve(&tree, id, Some(&body_style));
            let twice = resolver.resolve(&tree, id, Some(&body_style));
            once == twice
        })
}

#[quickcheck]
fn prop_canonicalize_is_idempotent(value: String, lowercase: bool) -> bool {
    let once = canonicalize(&value, lowercase);
    canonicalize(&once, lowercase) == once
}

#[quickcheck]
fn prop_specificity_counts_ids_classes_and_types(ids: u8, classes: u8, types: u8) -> bool {
    let (ids, classes, types) = (ids % 4, classes % 4, types % 4 + 1);
    let mut text = String::new();
    for i in 0..types {
        if i > 0 {
            text.push(' ');
        }
        text.push_str("div");
    }
    (0..ids).for_each(|i| text.push_str(&format!("#i{i}")));
    (0..classes).for_each(|i| text.push_str(&format!(".c{i}")));

    let specificity = parse_selector(&text).map(|s| s.specificity);
    specificity.is_ok_and(|s| (s.0, s.1, s.2) == (u32::from(ids), u32::from(classes), u32::from(types)))
}
