//! Block-level containers.
//!
//! [CSS 2 § 9.2.1 Block-level elements and block boxes](https://www.w3.org/TR/CSS2/visuren.html#block-boxes)

use quire_css::StyledNode;

use super::{ElementSeed, Flow, TagHandler};
use crate::context::ConversionContext;
use crate::element::{DocumentElement, ElementKind, Role};
use crate::error::HandlerError;

/// `html`, `body` and the document node: contribute their block children
/// directly, with inline runs wrapped in anonymous paragraphs.
#[derive(Debug)]
pub struct RootContainer {
    seed: ElementSeed,
    flow: Option<Flow>,
}

impl RootContainer {
    fn with_seed(seed: ElementSeed) -> Self {
        let flow = Flow::new(seed.anonymous_paragraph());
        Self { seed, flow: Some(flow) }
    }

    /// Handler for the document node itself.
    #[must_use]
    pub fn for_document(ctx: &ConversionContext) -> Self {
        Self::with_seed(ElementSeed::document(ctx))
    }

    /// Factory for `html` / `body`.
    pub fn factory(node: &StyledNode<'_>, ctx: &mut ConversionContext) -> Box<dyn TagHandler> {
        Box::new(Self::with_seed(ElementSeed::from_node(node, ctx)))
    }
}

impl TagHandler for RootContainer {
    fn accept_text(&mut self, text: &str, _ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        let run = self.seed.text_run(text, false);
        self.flow.as_mut().ok_or(HandlerError::AfterFinish)?.push(run);
        Ok(())
    }

    fn accept_child(&mut self, child: DocumentElement, _ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        self.flow.as_mut().ok_or(HandlerError::AfterFinish)?.push(child);
        Ok(())
    }

    fn finish(&mut self, _ctx: &mut ConversionContext) -> Result<Vec<DocumentElement>, HandlerError> {
        Ok(self.flow.take().ok_or(HandlerError::AfterFinish)?.finish())
    }
}

/// `div`, `section`, `blockquote` and other generic blocks: one element
/// whose children are blocks.
#[derive(Debug)]
pub struct BlockContainer {
    seed: ElementSeed,
    kind: ElementKind,
    role: Role,
    flow: Option<Flow>,
}

impl BlockContainer {
    /// Container producing one element of `kind` / `role`.
    pub fn new(node: &StyledNode<'_>, ctx: &ConversionContext, kind: ElementKind, role: Role) -> Self {
        let seed = ElementSeed::from_node(node, ctx);
        let flow = Flow::new(seed.anonymous_paragraph());
        Self {
            seed,
            kind,
            role,
            flow: Some(flow),
        }
    }

    /// Factory for generic block tags.
    pub fn factory(node: &StyledNode<'_>, ctx: &mut ConversionContext) -> Box<dyn TagHandler> {
        let role = Role::for_block_tag(node.tag().unwrap_or_default());
        Box::new(Self::new(node, ctx, ElementKind::Div, role))
    }

    pub(crate) const fn seed(&self) -> &ElementSeed {
        &self.seed
    }

    fn flow(&mut self) -> Result<&mut Flow, HandlerError> {
        self.flow.as_mut().ok_or(HandlerError::AfterFinish)
    }

    /// Close the flow and build the element.
    pub(crate) fn build(&mut self) -> Result<DocumentElement, HandlerError> {
        let children = self.flow.take().ok_or(HandlerError::AfterFinish)?.finish();
        Ok(self.seed.element(self.kind, self.role).with_children(children))
    }
}

impl TagHandler for BlockContainer {
    fn accept_text(&mut self, text: &str, _ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        let run = self.seed.text_run(text, false);
        self.flow()?.push(run);
        Ok(())
    }

    fn accept_child(&mut self, child: DocumentElement, _ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        self.flow()?.push(child);
        Ok(())
    }

    fn finish(&mut self, _ctx: &mut ConversionContext) -> Result<Vec<DocumentElement>, HandlerError> {
        Ok(vec![self.build()?])
    }
}

/// `p`, `h1`–`h6`, `pre` and friends: one paragraph of inline content.
///
/// A block child splits the paragraph; the pieces on either side become
/// separate paragraphs with the same role and properties.
#[derive(Debug)]
pub struct Paragraph {
    seed: ElementSeed,
    flow: Option<Flow>,
}

impl Paragraph {
    /// Factory for paragraph-like tags.
    pub fn factory(node: &StyledNode<'_>, ctx: &mut ConversionContext) -> Box<dyn TagHandler> {
        let seed = ElementSeed::from_node(node, ctx);
        let flow = Flow::new(seed.element(ElementKind::Paragraph, paragraph_role(&seed.tag)));
        Box::new(Self { seed, flow: Some(flow) })
    }
}

impl TagHandler for Paragraph {
    fn accept_text(&mut self, text: &str, _ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        let run = self.seed.text_run(text, false);
        self.flow.as_mut().ok_or(HandlerError::AfterFinish)?.push(run);
        Ok(())
    }

    fn accept_child(&mut self, child: DocumentElement, _ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        self.flow.as_mut().ok_or(HandlerError::AfterFinish)?.push(child);
        Ok(())
    }

    fn finish(&mut self, _ctx: &mut ConversionContext) -> Result<Vec<DocumentElement>, HandlerError> {
        let pieces = self.flow.take().ok_or(HandlerError::AfterFinish)?.finish();
        // An empty paragraph still occupies its margins.
        if pieces.is_empty() {
            return Ok(vec![self.seed.element(ElementKind::Paragraph, paragraph_role(&self.seed.tag))]);
        }
        Ok(pieces)
    }
}

/// Paragraph-like tags without a specific role are plain paragraphs.
fn paragraph_role(tag: &str) -> Role {
    match Role::for_block_tag(tag) {
        Role::Div | Role::Sect => Role::P,
        role => role,
    }
}
