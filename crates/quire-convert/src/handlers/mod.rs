//! Tag handlers and the pieces they share.
//!
//! A handler is bound to one styled node. The engine feeds it the node's
//! text and its children's results in document order, then calls
//! [`TagHandler::finish`] once to collect zero or more elements.

pub mod block;
pub mod image;
pub mod inline;
pub mod list;
pub mod table;

use std::mem;

use quire_css::schema;
use quire_css::{PropertyMap, StyledNode, ValueOrigin};
use quire_dom::NodeId;

use crate::context::ConversionContext;
use crate::element::{DocumentElement, ElementKind, Role, RunId};
use crate::error::HandlerError;

/// Converts one styled node into document elements.
///
/// The default `accept_text` ignores whitespace-only text and rejects
/// anything else; the default `accept_child` rejects every child. Handlers
/// override what they accept.
pub trait TagHandler {
    /// Offer a run of the node's own text, already whitespace-processed.
    fn accept_text(&mut self, text: &str, ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        let _ = ctx;
        if is_blank(text) {
            Ok(())
        } else {
            Err(HandlerError::rejected("text is not allowed here"))
        }
    }

    /// Offer one finished element produced by a child.
    fn accept_child(&mut self, child: DocumentElement, ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        let _ = ctx;
        Err(HandlerError::rejected(format!("{} is not allowed here", child.kind)))
    }

    /// All content has been offered; produce the result.
    fn finish(&mut self, ctx: &mut ConversionContext) -> Result<Vec<DocumentElement>, HandlerError>;
}

/// [CSS Text § 4.1.1 Phase I: Collapsing and Transformation](https://www.w3.org/TR/css-text-3/#white-space-phase-1)
///
/// "document white space characters": space, tab, line feed, carriage
/// return and form feed. No-break spaces are not collapsible.
#[must_use]
pub const fn is_document_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0c')
}

/// Whether `text` holds only document white space.
#[must_use]
pub fn is_blank(text: &str) -> bool {
    text.chars().all(is_document_space)
}

/// Inherited properties copied onto every text run.
const TEXT_PROPERTIES: &[&str] = &[
    "color",
    "direction",
    "font-family",
    "font-size",
    "font-style",
    "font-weight",
    "line-height",
    "text-decoration",
    "vertical-align",
    "visibility",
    "white-space",
];

/// Inherited properties an anonymous paragraph takes from its container.
const PARAGRAPH_PROPERTIES: &[&str] = &["direction", "line-height", "text-align", "text-indent", "white-space"];

/// What a handler remembers about its node.
#[derive(Debug, Clone)]
pub struct ElementSeed {
    /// Arena index of the node.
    pub node: NodeId,
    /// Tag name.
    pub tag: String,
    /// Language tag from the nearest `lang`.
    pub lang: Option<String>,
    /// Resolved style; empty for the document node.
    pub style: PropertyMap,
    font: Option<String>,
    run_id: RunId,
}

impl ElementSeed {
    /// Snapshot `node`, selecting its font once.
    pub fn from_node(node: &StyledNode<'_>, ctx: &ConversionContext) -> Self {
        let style = node.style().cloned().unwrap_or_default();
        let font = style.value("font-family").and_then(|list| ctx.select_font(list));
        Self {
            node: node.id(),
            tag: node.tag().unwrap_or_default().to_string(),
            lang: node.lang().map(str::to_string),
            style,
            font,
            run_id: ctx.run_id(),
        }
    }

    /// Seed for the document node, which has no style.
    #[must_use]
    pub fn document(ctx: &ConversionContext) -> Self {
        Self {
            node: NodeId::ROOT,
            tag: String::from("#document"),
            lang: None,
            style: PropertyMap::default(),
            font: None,
            run_id: ctx.run_id(),
        }
    }

    /// Run this seed belongs to.
    #[must_use]
    pub const fn run_id(&self) -> RunId {
        self.run_id
    }

    /// One resolved value.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.style.value(name)
    }

    /// An element for this node carrying its box properties: everything
    /// that won the cascade on the node itself and does not inherit.
    #[must_use]
    pub fn element(&self, kind: ElementKind, role: Role) -> DocumentElement {
        let mut element = DocumentElement::new(kind, role, self.run_id).with_lang(self.lang.as_deref());
        for (name, value) in self.style.iter() {
            let inherited = schema::lookup(name).is_some_and(|def| def.inherited);
            if value.origin == ValueOrigin::Cascaded && !inherited {
                let _ = element.properties.insert(name.to_string(), value.value.clone());
            }
        }
        element
    }

    /// A text run styled by this node. Inline nodes also pass their box
    /// properties (backgrounds, borders) to the run.
    #[must_use]
    pub fn text_run(&self, text: &str, inline_box: bool) -> DocumentElement {
        let mut run = if inline_box {
            let mut run = self.element(ElementKind::Text, Role::for_inline_tag(&self.tag));
            run.text = Some(text.to_string());
            run
        } else {
            DocumentElement::text_run(text, self.run_id).with_lang(self.lang.as_deref())
        };
        for name in TEXT_PROPERTIES {
            if let Some(value) = self.style.value(name) {
                let _ = run.properties.insert((*name).to_string(), value.to_string());
            }
        }
        if let Some(font) = &self.font {
            let _ = run.properties.insert("font-family".to_string(), font.clone());
        }
        run
    }

    /// An anonymous paragraph for inline content directly inside this
    /// container.
    #[must_use]
    pub fn anonymous_paragraph(&self) -> DocumentElement {
        let mut paragraph =
            DocumentElement::new(ElementKind::Paragraph, Role::P, self.run_id).with_lang(self.lang.as_deref());
        for name in PARAGRAPH_PROPERTIES {
            if let Some(value) = self.style.value(name) {
                let _ = paragraph.properties.insert((*name).to_string(), value.to_string());
            }
        }
        paragraph
    }
}

/// [CSS 2 § 9.2.1.1 Anonymous block boxes](https://www.w3.org/TR/CSS2/visuren.html#anonymous-block-level)
///
/// "if a block container box has a block-level box inside it, then we
/// force it to have only block-level boxes inside it."
///
/// Collects a container's content. Consecutive inline elements are
/// gathered into one run; a block child closes the run, which is wrapped
/// in a copy of `wrapper`.
#[derive(Debug)]
pub struct Flow {
    wrapper: DocumentElement,
    blocks: Vec<DocumentElement>,
    inline: Vec<DocumentElement>,
}

impl Flow {
    /// Empty flow whose inline runs are wrapped in `wrapper`.
    #[must_use]
    pub const fn new(wrapper: DocumentElement) -> Self {
        Self {
            wrapper,
            blocks: Vec::new(),
            inline: Vec::new(),
        }
    }

    /// Add one element in document order.
    pub fn push(&mut self, element: DocumentElement) {
        if element.is_block() {
            self.flush();
            self.blocks.push(element);
        } else {
            self.inline.push(element);
        }
    }

    /// Whether nothing has been pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.inline.is_empty()
    }

    fn flush(&mut self) {
        let mut run = mem::take(&mut self.inline);
        collapse_run_whitespace(&mut run);
        if !run.is_empty() {
            let mut wrapped = self.wrapper.clone();
            wrapped.children = run;
            self.blocks.push(wrapped);
        }
    }

    /// Close the last run and return the blocks.
    #[must_use]
    pub fn finish(mut self) -> Vec<DocumentElement> {
        self.flush();
        self.blocks
    }
}

/// [CSS Text § 4.1.1](https://www.w3.org/TR/css-text-3/#white-space-phase-1)
///
/// "Any collapsible space immediately following another collapsible space
/// ... is collapsed to have zero advance width." and
/// [§ 4.1.2](https://www.w3.org/TR/css-text-3/#white-space-phase-2)
/// "A sequence of collapsible spaces at the beginning of a line is
/// removed" (likewise at the end).
///
/// Works across run boundaries and inside links. Runs left empty are
/// removed.
pub fn collapse_run_whitespace(run: &mut Vec<DocumentElement>) {
    let mut leaves = Vec::new();
    collect_leaves(run, &mut leaves);

    let mut line_start = true;
    let mut after_space = false;
    let mut last_text: Option<usize> = None;
    for i in 0..leaves.len() {
        match leaves[i].kind {
            ElementKind::LineBreak => {
                if let Some(prev) = last_text.take() {
                    trim_end(&mut *leaves[prev]);
                }
                line_start = true;
                after_space = false;
            }
            ElementKind::Text => {
                if !collapsible(&*leaves[i]) {
                    line_start = false;
                    after_space = false;
                    last_text = None;
                    continue;
                }
                let text = leaves[i].text.get_or_insert_with(String::new);
                if line_start || after_space {
                    let trimmed = text.trim_start_matches(' ').len();
                    let _ = text.drain(..text.len() - trimmed);
                }
                if text.is_empty() {
                    continue;
                }
                after_space = text.ends_with(' ');
                line_start = false;
                last_text = Some(i);
            }
            _ => {
                line_start = false;
                after_space = false;
                last_text = None;
            }
        }
    }
    if let Some(last) = last_text {
        trim_end(&mut *leaves[last]);
    }
    drop(leaves);
    prune_empty_text(run);
}

fn collect_leaves<'a>(elements: &'a mut [DocumentElement], out: &mut Vec<&'a mut DocumentElement>) {
    for element in elements {
        if element.children.is_empty() || element.kind == ElementKind::Text {
            out.push(element);
        } else {
            collect_leaves(&mut element.children, out);
        }
    }
}

fn collapsible(run: &DocumentElement) -> bool {
    !matches!(
        run.property("white-space"),
        Some("pre" | "pre-wrap" | "break-spaces")
    )
}

fn trim_end(run: &mut DocumentElement) {
    if let Some(text) = &mut run.text {
        text.truncate(text.trim_end_matches(' ').len());
    }
}

fn prune_empty_text(elements: &mut Vec<DocumentElement>) {
    elements.retain_mut(|element| {
        if element.kind == ElementKind::Text {
            element.text.as_deref().is_some_and(|t| !t.is_empty())
        } else {
            prune_empty_text(&mut element.children);
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(t: &str, run: RunId) -> DocumentElement {
        DocumentElement::text_run(t, run)
    }

    #[test]
    fn test_spaces_collapse_across_runs_and_trim_at_edges() {
        let run_id = RunId::next();
        let mut run = vec![
            text(" Hello ", run_id),
            text(" world ", run_id),
            DocumentElement::new(ElementKind::LineBreak, Role::Artifact, run_id),
            text(" again", run_id),
        ];
        collapse_run_whitespace(&mut run);
        let texts: Vec<_> = run.iter().filter_map(|e| e.text.as_deref()).collect();
        assert_eq!(texts, vec!["Hello ", "world", "again"]);
    }

    #[test]
    fn test_preserved_runs_are_untouched() {
        let run_id = RunId::next();
        let mut run = vec![text("  code  ", run_id).with_property("white-space", "pre")];
        collapse_run_whitespace(&mut run);
        assert_eq!(run[0].text.as_deref(), Some("  code  "));
    }

    #[test]
    fn test_blank_run_produces_no_paragraph() {
        let run_id = RunId::next();
        let mut flow = Flow::new(DocumentElement::new(ElementKind::Paragraph, Role::P, run_id));
        flow.push(text(" ", run_id));
        flow.push(DocumentElement::new(ElementKind::Div, Role::Div, run_id));
        flow.push(text("tail", run_id));
        let blocks = flow.finish();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].kind, ElementKind::Div);
        assert_eq!(blocks[1].text_content(), "tail");
    }
}
