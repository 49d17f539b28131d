//! Styled node tree.
//!
//! The arena tree after the cascade has run: every element (parsed or
//! generated) carries its resolved property map. Parent links are arena
//! indices, so walking the ancestor chain never takes ownership.

use std::collections::HashMap;

use quire_dom::{AttributesMap, DomTree, ElementData, NodeId};

use crate::cascade::PropertyMap;
use crate::display::Display;

/// A [`DomTree`] plus the resolved style of each element.
#[derive(Debug)]
pub struct StyledTree {
    dom: DomTree,
    styles: HashMap<NodeId, PropertyMap>,
}

impl StyledTree {
    /// Pair a tree with its resolved styles.
    #[must_use]
    pub const fn new(dom: DomTree, styles: HashMap<NodeId, PropertyMap>) -> Self {
        Self { dom, styles }
    }

    /// The underlying node tree.
    #[must_use]
    pub const fn dom(&self) -> &DomTree {
        &self.dom
    }

    /// Resolved style of element `id`.
    #[must_use]
    pub fn style(&self, id: NodeId) -> Option<&PropertyMap> {
        self.styles.get(&id)
    }

    /// Number of styled elements.
    #[must_use]
    pub fn styled_count(&self) -> usize {
        self.styles.len()
    }

    /// View of node `id`.
    #[must_use]
    pub const fn node(&self, id: NodeId) -> StyledNode<'_> {
        StyledNode { tree: self, id }
    }

    /// View of the document node.
    #[must_use]
    pub const fn root(&self) -> StyledNode<'_> {
        self.node(NodeId::ROOT)
    }
}

/// Borrowed view of one node in a [`StyledTree`].
#[derive(Debug, Clone, Copy)]
pub struct StyledNode<'t> {
    tree: &'t StyledTree,
    id: NodeId,
}

impl<'t> StyledNode<'t> {
    /// Arena index of the node.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Element data, if the node is an element.
    #[must_use]
    pub fn element(&self) -> Option<&'t ElementData> {
        self.tree.dom.as_element(self.id)
    }

    /// Tag name, if the node is an element.
    #[must_use]
    pub fn tag(&self) -> Option<&'t str> {
        self.tree.dom.tag_name(self.id)
    }

    /// Attribute map, if the node is an element.
    #[must_use]
    pub fn attrs(&self) -> Option<&'t AttributesMap> {
        self.element().map(|e| &e.attrs)
    }

    /// One attribute value.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&'t str> {
        self.element().and_then(|e| e.attr(name))
    }

    /// Text, if the node is a text node.
    #[must_use]
    pub fn text(&self) -> Option<&'t str> {
        self.tree.dom.as_text(self.id)
    }

    /// Whether the node was generated for `::before` / `::after`.
    #[must_use]
    pub fn is_generated(&self) -> bool {
        self.element().is_some_and(|e| e.generated)
    }

    /// Resolved style. Elements only.
    #[must_use]
    pub fn style(&self) -> Option<&'t PropertyMap> {
        self.tree.style(self.id)
    }

    /// Resolved display; text and other nodes are inline.
    #[must_use]
    pub fn display(&self) -> Display {
        self.style().map_or(Display::Inline, PropertyMap::display)
    }

    /// Language of the node, from the nearest `lang` / `xml:lang`.
    #[must_use]
    pub fn lang(&self) -> Option<&'t str> {
        self.tree.dom.language(self.id)
    }

    /// Parent node. The document node has none.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.tree.dom.parent(self.id).map(|id| self.tree.node(id))
    }

    /// Children in document order.
    pub fn children(&self) -> impl Iterator<Item = StyledNode<'t>> + 't {
        let tree = self.tree;
        tree.dom.children(self.id).iter().map(move |&id| tree.node(id))
    }
}
