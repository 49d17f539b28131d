//! Inline-level handlers.
//!
//! [CSS 2 § 9.2.2 Inline-level elements and inline boxes](https://www.w3.org/TR/CSS2/visuren.html#inline-boxes)

use quire_common::{Diagnostic, DiagnosticTemplate};
use quire_css::StyledNode;

use super::{ElementSeed, TagHandler};
use crate::context::ConversionContext;
use crate::element::{DocumentElement, ElementKind, Role};
use crate::error::HandlerError;

/// `span`, `em`, `code`, `::before` and the other phrasing tags.
///
/// An inline box does not survive as an element of its own: its text
/// becomes runs carrying the box's style snapshot, and its children's
/// results are passed through unchanged. Block children are passed
/// through too; the enclosing flow splits around them.
#[derive(Debug)]
pub struct Inline {
    seed: ElementSeed,
    out: Vec<DocumentElement>,
}

impl Inline {
    /// Factory for phrasing tags.
    pub fn factory(node: &StyledNode<'_>, ctx: &mut ConversionContext) -> Box<dyn TagHandler> {
        Box::new(Self {
            seed: ElementSeed::from_node(node, ctx),
            out: Vec::new(),
        })
    }
}

impl TagHandler for Inline {
    fn accept_text(&mut self, text: &str, _ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        self.out.push(self.seed.text_run(text, true));
        Ok(())
    }

    fn accept_child(&mut self, child: DocumentElement, _ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        self.out.push(child);
        Ok(())
    }

    fn finish(&mut self, _ctx: &mut ConversionContext) -> Result<Vec<DocumentElement>, HandlerError> {
        Ok(std::mem::take(&mut self.out))
    }
}

/// [§ 4.5.1 The a element](https://html.spec.whatwg.org/multipage/text-level-semantics.html#the-a-element)
///
/// One [`ElementKind::Link`] around the anchor's content. A same-document
/// reference (`#name`) becomes a `destination` property; anything else is
/// resolved against the document base into `href`.
#[derive(Debug)]
pub struct Link {
    seed: ElementSeed,
    href: Option<String>,
    children: Vec<DocumentElement>,
}

impl Link {
    /// Factory for `a`.
    pub fn factory(node: &StyledNode<'_>, ctx: &mut ConversionContext) -> Box<dyn TagHandler> {
        Box::new(Self {
            seed: ElementSeed::from_node(node, ctx),
            href: node.attr("href").map(|h| h.trim().to_string()),
            children: Vec::new(),
        })
    }
}

impl TagHandler for Link {
    fn accept_text(&mut self, text: &str, _ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        self.children.push(self.seed.text_run(text, false));
        Ok(())
    }

    fn accept_child(&mut self, child: DocumentElement, _ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        self.children.push(child);
        Ok(())
    }

    fn finish(&mut self, ctx: &mut ConversionContext) -> Result<Vec<DocumentElement>, HandlerError> {
        let mut link = self
            .seed
            .element(ElementKind::Link, Role::Link)
            .with_children(std::mem::take(&mut self.children));

        if let Some(href) = self.href.as_deref() {
            if let Some(fragment) = href.strip_prefix('#') {
                let _ = link.properties.insert("destination".to_string(), fragment.to_string());
            } else if !href.is_empty() {
                match ctx.resolve(href) {
                    Ok(url) => {
                        let _ = link.properties.insert("href".to_string(), url.to_string());
                    }
                    // Without a base, relative references stay as written.
                    Err(_) if ctx.base().is_none() => {
                        let _ = link.properties.insert("href".to_string(), href.to_string());
                    }
                    Err(e) => ctx.emit(
                        Diagnostic::new(DiagnosticTemplate::ResourceUnresolved, e.to_string())
                            .with_tag("a")
                            .with_node(self.seed.node.0),
                    ),
                }
            }
        }
        Ok(vec![link])
    }
}

/// A childless element: `br` or `hr`.
#[derive(Debug)]
pub struct Marker {
    element: Option<DocumentElement>,
}

impl Marker {
    /// `br`: [`ElementKind::LineBreak`].
    pub fn line_break(node: &StyledNode<'_>, ctx: &mut ConversionContext) -> Box<dyn TagHandler> {
        let seed = ElementSeed::from_node(node, ctx);
        Box::new(Self {
            element: Some(seed.element(ElementKind::LineBreak, Role::Artifact)),
        })
    }

    /// `hr`: [`ElementKind::Separator`].
    pub fn separator(node: &StyledNode<'_>, ctx: &mut ConversionContext) -> Box<dyn TagHandler> {
        let seed = ElementSeed::from_node(node, ctx);
        Box::new(Self {
            element: Some(seed.element(ElementKind::Separator, Role::Artifact)),
        })
    }
}

impl TagHandler for Marker {
    fn finish(&mut self, _ctx: &mut ConversionContext) -> Result<Vec<DocumentElement>, HandlerError> {
        Ok(vec![self.element.take().ok_or(HandlerError::AfterFinish)?])
    }
}
