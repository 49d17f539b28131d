//! The attachment engine.
//!
//! Walks the styled tree depth-first and drives one handler per node
//! through its lifecycle. Each element on the current path owns a
//! [`Frame`] on an explicit stack; a frame moves through
//!
//! ```text
//! Entered → ChildrenProcessed → Finished → Merged
//! ```
//!
//! and its results are offered to the nearest ancestor frame that has a
//! handler. Everything that goes wrong below the document element is
//! contained at the frame boundary: a rejected text run or child is
//! dropped with a diagnostic, and a failing handler takes only its own
//! node's result down with it. A failure of the document frame or of the
//! `<html>` element's frame leaves nothing to return and ends the run.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use quire_common::{Diagnostic, DiagnosticTemplate};
use quire_css::{Display, PropertyMap, StyledNode, StyledTree, schema};
use quire_dom::NodeId;

use crate::content;
use crate::context::ConversionContext;
use crate::element::DocumentElement;
use crate::error::{ConversionError, HandlerError};
use crate::handlers::block::RootContainer;
use crate::handlers::{TagHandler, is_document_space};
use crate::registry::{HandlerRegistry, is_metadata_tag};

/// Lifecycle position of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Handler created; the node's content is being offered.
    Entered,
    /// Every child has been visited and merged.
    ChildrenProcessed,
    /// `finish` has returned.
    Finished,
    /// The results were offered to the parent frame.
    Merged,
}

/// Lifecycle position of a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandlerState {
    Created,
    Accepting,
    Finished,
}

/// A handler plus the guard that keeps its calls in lifecycle order.
struct BoundHandler {
    handler: Box<dyn TagHandler>,
    state: HandlerState,
}

impl BoundHandler {
    const fn new(handler: Box<dyn TagHandler>) -> Self {
        Self {
            handler,
            state: HandlerState::Created,
        }
    }

    fn accept_text(&mut self, text: &str, ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        if self.state == HandlerState::Finished {
            return Err(HandlerError::AfterFinish);
        }
        self.state = HandlerState::Accepting;
        guarded(|| self.handler.accept_text(text, ctx))
    }

    fn accept_child(&mut self, child: DocumentElement, ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        if self.state == HandlerState::Finished {
            return Err(HandlerError::AfterFinish);
        }
        self.state = HandlerState::Accepting;
        guarded(|| self.handler.accept_child(child, ctx))
    }

    fn finish(&mut self, ctx: &mut ConversionContext) -> Result<Vec<DocumentElement>, HandlerError> {
        if self.state == HandlerState::Finished {
            return Err(HandlerError::AfterFinish);
        }
        self.state = HandlerState::Finished;
        guarded(|| self.handler.finish(ctx))
    }
}

/// Run one handler call, turning a panic into [`HandlerError::Failed`].
fn guarded<T>(call: impl FnOnce() -> Result<T, HandlerError>) -> Result<T, HandlerError> {
    panic::catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|payload| Err(HandlerError::Failed(panic_message(&*payload))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_string())
}

/// What a frame contributes.
enum Slot {
    /// A live handler.
    Active(BoundHandler),
    /// No handler: content flows through to the nearest ancestor.
    PassThrough,
    /// The handler failed; the rest of the subtree is discarded.
    Dead,
}

/// One activation record on the engine's stack.
struct Frame {
    node: NodeId,
    tag: String,
    slot: Slot,
    state: FrameState,
}

impl Frame {
    fn advance(&mut self, next: FrameState) {
        log::trace!(target: "quire::engine", "<{}> {:?} -> {next:?}", self.tag, self.state);
        self.state = next;
    }
}

enum Step {
    Enter(NodeId),
    Exit,
}

/// Drives handlers over one styled tree.
pub struct AttachmentEngine<'a> {
    tree: &'a StyledTree,
    registry: &'a mut HandlerRegistry,
    ctx: &'a mut ConversionContext,
    frames: Vec<Frame>,
    output: Vec<DocumentElement>,
    root_failure: Option<String>,
}

impl<'a> AttachmentEngine<'a> {
    /// Engine over `tree` using `registry`. The registry is locked by the
    /// first node it serves.
    pub fn new(tree: &'a StyledTree, registry: &'a mut HandlerRegistry, ctx: &'a mut ConversionContext) -> Self {
        Self {
            tree,
            registry,
            ctx,
            frames: Vec::new(),
            output: Vec::new(),
            root_failure: None,
        }
    }

    /// Walk the whole tree and return the top-level elements.
    ///
    /// # Errors
    ///
    /// [`ConversionError::RootFailed`] when the document frame or the
    /// document element's frame fails. Every other failure is reported as
    /// a diagnostic.
    pub fn run(mut self) -> Result<Vec<DocumentElement>, ConversionError> {
        let tree = self.tree;
        let root = tree.root();
        let handler: Box<dyn TagHandler> = Box::new(RootContainer::for_document(self.ctx));
        self.frames.push(Frame {
            node: root.id(),
            tag: String::from("#document"),
            slot: Slot::Active(BoundHandler::new(handler)),
            state: FrameState::Entered,
        });

        // STEP 1: Seed the walk with the document's children.
        let mut steps = vec![Step::Exit];
        let children: Vec<NodeId> = root.children().map(|c| c.id()).collect();
        steps.extend(children.into_iter().rev().map(Step::Enter));

        // STEP 2: Depth-first, one step at a time.
        while let Some(step) = steps.pop() {
            match step {
                Step::Enter(id) => {
                    let node = tree.node(id);
                    if self.enter(&node) {
                        steps.push(Step::Exit);
                        let children: Vec<NodeId> = node.children().map(|c| c.id()).collect();
                        steps.extend(children.into_iter().rev().map(Step::Enter));
                    }
                }
                Step::Exit => self.exit(),
            }
        }

        // STEP 3: Only a document-level failure is fatal.
        if let Some(reason) = self.root_failure {
            return Err(ConversionError::RootFailed(reason));
        }
        log::debug!(target: "quire::engine", "produced {} top-level element(s)", self.output.len());
        Ok(self.output)
    }

    /// Visit `node`. Returns whether a frame was pushed, in which case its
    /// children are walked next.
    fn enter(&mut self, node: &StyledNode<'_>) -> bool {
        if let Some(text) = node.text() {
            let style = node.parent().and_then(|p| p.style());
            let processed = process_text(text, style);
            if !processed.is_empty() {
                self.deliver_text(&processed);
            }
            return false;
        }
        let Some(tag) = node.tag() else {
            // Comments, doctypes and processing instructions.
            return false;
        };
        if node.display() == Display::None {
            log::trace!(target: "quire::engine", "<{tag}> skipped: display none");
            return false;
        }

        let slot = match self.registry.create(node, self.ctx) {
            Some(handler) => Slot::Active(BoundHandler::new(handler)),
            None if is_metadata_tag(tag) => {
                self.ctx.emit(
                    Diagnostic::new(DiagnosticTemplate::IgnoredTag, "metadata subtree dropped")
                        .with_tag(tag)
                        .with_node(node.id().0),
                );
                return false;
            }
            None => {
                self.ctx.emit(
                    Diagnostic::new(DiagnosticTemplate::NoHandlerForTag, "children re-parented to the enclosing element")
                        .with_tag(tag)
                        .with_node(node.id().0),
                );
                Slot::PassThrough
            }
        };

        self.apply_counters(node);
        log::trace!(target: "quire::engine", "enter <{tag}> ({})", node.id().0);
        self.frames.push(Frame {
            node: node.id(),
            tag: tag.to_string(),
            slot,
            state: FrameState::Entered,
        });

        if node.is_generated() {
            let value = node.style().and_then(|s| s.value("content")).unwrap_or("none");
            let originating = node.parent().and_then(|p| p.element());
            let text = content::evaluate(value, originating, self.ctx);
            let processed = process_text(&text, node.style());
            if !processed.is_empty() {
                self.deliver_text(&processed);
            }
        }
        true
    }

    /// [CSS Lists § 4](https://www.w3.org/TR/css-lists-3/#auto-numbering)
    ///
    /// "resets are applied first, then increments". New instances belong
    /// to the parent so that following siblings share them.
    fn apply_counters(&mut self, node: &StyledNode<'_>) {
        let Some(style) = node.style() else {
            return;
        };
        let owner = node.parent().map_or(NodeId::ROOT, |p| p.id());
        if let Some(reset) = style.value("counter-reset") {
            for (name, value) in schema::counter_pairs(reset, 0) {
                self.ctx.counters.reset(owner, &name, value);
            }
        }
        if let Some(increment) = style.value("counter-increment") {
            for (name, by) in schema::counter_pairs(increment, 1) {
                self.ctx.counters.increment(owner, &name, by);
            }
        }
    }

    fn exit(&mut self) {
        let Some(mut frame) = self.frames.pop() else {
            return;
        };
        frame.advance(FrameState::ChildrenProcessed);
        self.ctx.counters.leave(frame.node);

        let results = match &mut frame.slot {
            Slot::Active(handler) => match handler.finish(self.ctx) {
                Ok(results) => results,
                Err(e) => {
                    self.fail(&frame.tag, frame.node, &e);
                    Vec::new()
                }
            },
            Slot::PassThrough | Slot::Dead => Vec::new(),
        };
        frame.advance(FrameState::Finished);
        log::trace!(target: "quire::engine", "exit <{}> with {} result(s)", frame.tag, results.len());

        if self.frames.is_empty() {
            self.output = results;
        } else {
            for child in results {
                self.deliver_child(child, &frame.tag);
            }
        }
        frame.advance(FrameState::Merged);
    }

    /// Index of the frame that receives content: the innermost one that is
    /// not a pass-through.
    fn receiver(&self) -> Option<usize> {
        self.frames.iter().rposition(|f| !matches!(f.slot, Slot::PassThrough))
    }

    fn deliver_text(&mut self, text: &str) {
        let Some(index) = self.receiver() else {
            return;
        };
        let frame = &mut self.frames[index];
        let Slot::Active(handler) = &mut frame.slot else {
            return;
        };
        match handler.accept_text(text, self.ctx) {
            Ok(()) => {}
            Err(HandlerError::Rejected(reason)) => {
                self.ctx.emit(
                    Diagnostic::new(DiagnosticTemplate::TextRejected, reason)
                        .with_tag(frame.tag.as_str())
                        .with_node(frame.node.0),
                );
            }
            Err(e) => {
                let (tag, node) = (frame.tag.clone(), frame.node);
                frame.slot = Slot::Dead;
                self.fail(&tag, node, &e);
            }
        }
    }

    fn deliver_child(&mut self, child: DocumentElement, child_tag: &str) {
        let Some(index) = self.receiver() else {
            return;
        };
        let frame = &mut self.frames[index];
        let Slot::Active(handler) = &mut frame.slot else {
            return;
        };
        match handler.accept_child(child, self.ctx) {
            Ok(()) => {}
            Err(HandlerError::Rejected(reason)) => {
                self.ctx.emit(
                    Diagnostic::new(
                        DiagnosticTemplate::ChildRejected,
                        format!("<{}> rejected content of <{child_tag}>: {reason}", frame.tag),
                    )
                    .with_tag(child_tag)
                    .with_node(frame.node.0),
                );
            }
            Err(e) => {
                let (tag, node) = (frame.tag.clone(), frame.node);
                frame.slot = Slot::Dead;
                self.fail(&tag, node, &e);
            }
        }
    }

    fn fail(&mut self, tag: &str, node: NodeId, error: &HandlerError) {
        log::debug!(target: "quire::engine", "<{tag}> failed: {error}");
        self.ctx.emit(
            Diagnostic::new(DiagnosticTemplate::HandlerFailed, error.to_string())
                .with_tag(tag)
                .with_node(node.0),
        );
        // The document element's frame carries the whole document.
        if node == NodeId::ROOT || self.tree.dom().document_element() == Some(node) {
            self.root_failure = Some(error.to_string());
        }
    }
}

/// [CSS Text § 4.1.1 Phase I](https://www.w3.org/TR/css-text-3/#white-space-phase-1)
/// and [§ 2.1 text-transform](https://www.w3.org/TR/css-text-3/#text-transform-property)
///
/// Collapse `text` according to the `white-space` of the element it sits
/// in and apply its `text-transform`. Edge trimming happens later, once
/// the whole inline run is known.
#[must_use]
pub fn process_text(text: &str, style: Option<&PropertyMap>) -> String {
    let white_space = style.and_then(|s| s.value("white-space")).unwrap_or("normal");
    let collapsed = match white_space {
        "pre" | "pre-wrap" | "break-spaces" => text.replace("\r\n", "\n"),
        "pre-line" => collapse(text, true),
        _ => collapse(text, false),
    };
    match style.and_then(|s| s.value("text-transform")) {
        Some("uppercase") => collapsed.to_uppercase(),
        Some("lowercase") => collapsed.to_lowercase(),
        Some("capitalize") => capitalize(&collapsed),
        _ => collapsed,
    }
}

/// Replace every run of document white space by one space. With
/// `keep_newlines`, a run containing a line feed becomes one line feed.
fn collapse(text: &str, keep_newlines: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run: Option<bool> = None;
    for c in text.chars() {
        if is_document_space(c) {
            let newline = keep_newlines && c == '\n';
            run = Some(run.unwrap_or(false) || newline);
            continue;
        }
        if let Some(newline) = run.take() {
            out.push(if newline { '\n' } else { ' ' });
        }
        out.push(c);
    }
    if let Some(newline) = run {
        out.push(if newline { '\n' } else { ' ' });
    }
    out
}

/// Uppercase the first letter of every word.
fn capitalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if at_word_start && c.is_alphabetic() {
            out.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = c.is_whitespace();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_modes() {
        assert_eq!(collapse("  a \n\t b  ", false), " a b ");
        assert_eq!(collapse("a  \n  b", true), "a\nb");
        assert_eq!(process_text("a\r\n  b", None), "a b");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("hello  wide world"), "Hello  Wide World");
    }

    #[test]
    fn test_panics_become_failures() {
        let result: Result<(), HandlerError> = guarded(|| panic!("boom"));
        assert_eq!(result, Err(HandlerError::Failed("boom".to_string())));
    }
}
