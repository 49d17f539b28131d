//! Markup node source.
//!
//! Tree construction is delegated to `html5ever`; the resulting reference
//! counted tree is copied into the arena once, in document order.
//!
//! [§ 13.2 Parsing HTML documents](https://html.spec.whatwg.org/multipage/parsing.html)

use html5ever::tendril::TendrilSink as _;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{ParseOpts, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::{DomTree, ElementData, NodeId, NodeType};

/// Parse an HTML document into a [`DomTree`].
///
/// Parsing never fails: the tree builder recovers from unclosed and
/// misnested tags the way browsers do. Documents without a doctype are
/// treated as no-quirks, so a `<table>` start tag closes an open `<p>`.
#[must_use]
pub fn parse_html(html: &str) -> DomTree {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            exact_errors: false,
            scripting_enabled: false,
            // srcdoc documents are never put into quirks mode by a missing doctype
            iframe_srcdoc: true,
            ..TreeBuilderOpts::default()
        },
        ..ParseOpts::default()
    };

    let dom = parse_document(RcDom::default(), opts).one(html);

    let mut tree = DomTree::new();
    for child in dom.document.children.borrow().iter() {
        copy_node(child, NodeId::ROOT, &mut tree);
    }
    log::trace!(target: "quire::markup", "parsed {} nodes", tree.len());
    tree
}

fn copy_node(handle: &Handle, parent: NodeId, tree: &mut DomTree) {
    let node_type = match &handle.data {
        NodeData::Element { name, attrs, .. } => {
            let mut data = ElementData::new(name.local.to_string());
            for attr in attrs.borrow().iter() {
                let key = match &attr.name.prefix {
                    Some(prefix) => format!("{prefix}:{}", attr.name.local),
                    None => attr.name.local.to_string(),
                };
                let _ = data.attrs.insert(key, attr.value.to_string());
            }
            NodeType::Element(data)
        }
        NodeData::Text { contents } => {
            // html5ever may emit adjacent text nodes; keep them as one.
            let text = contents.borrow().to_string();
            if let Some(last) = tree.last_child(parent)
                && let Some(node) = tree.get_mut(last)
                && let NodeType::Text(existing) = &mut node.node_type
            {
                existing.push_str(&text);
                return;
            }
            NodeType::Text(text)
        }
        NodeData::Comment { contents } => NodeType::Comment(contents.to_string()),
        NodeData::Doctype { name, .. } => NodeType::Doctype(name.to_string()),
        NodeData::ProcessingInstruction { target, contents } => NodeType::ProcessingInstruction {
            target: target.to_string(),
            data: contents.to_string(),
        },
        NodeData::Document => {
            for child in handle.children.borrow().iter() {
                copy_node(child, parent, tree);
            }
            return;
        }
    };

    let id = tree.alloc(node_type);
    tree.append_child(parent, id);
    for child in handle.children.borrow().iter() {
        copy_node(child, id, tree);
    }
}
