//! Document model handed to the fixed-page renderer.
//!
//! Every handler produces [`DocumentElement`]s. The model is deliberately
//! uniform: one struct whose [`ElementKind`] says how the renderer lays it
//! out and whose [`Role`] says what it means in the structure tree.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use strum_macros::{Display, IntoStaticStr};

/// Identifier shared by every element of one conversion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RunId(u64);

static NEXT_RUN: AtomicU64 = AtomicU64::new(1);

impl RunId {
    /// A process-wide unique identifier.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_RUN.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw counter value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// How the renderer lays an element out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr)]
pub enum ElementKind {
    /// A block of inline content.
    Paragraph,
    /// A generic block container.
    Div,
    /// An ordered or unordered list.
    List,
    /// One list item; its marker is in the `marker` property.
    ListItem,
    /// A table; its children are captions then rows.
    Table,
    /// One table row; its `section` property is `head`, `body` or `foot`.
    TableRow,
    /// One table cell.
    TableCell,
    /// A table caption.
    Caption,
    /// A styled run of text.
    Text,
    /// A raster or vector image.
    Image,
    /// A hyperlink around inline content.
    Link,
    /// A forced line break.
    LineBreak,
    /// A thematic break.
    Separator,
}

impl ElementKind {
    /// Whether elements of this kind start a new block in the flow.
    #[must_use]
    pub const fn is_block(self) -> bool {
        !matches!(self, Self::Text | Self::Image | Self::Link | Self::LineBreak)
    }
}

/// Structure role, in the vocabulary of tagged PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr)]
pub enum Role {
    /// Paragraph.
    P,
    /// Heading level 1.
    H1,
    /// Heading level 2.
    H2,
    /// Heading level 3.
    H3,
    /// Heading level 4.
    H4,
    /// Heading level 5.
    H5,
    /// Heading level 6.
    H6,
    /// Generic grouping.
    Div,
    /// Thematic section.
    Sect,
    /// Quoted block.
    BlockQuote,
    /// Illustration.
    Figure,
    /// Caption of a table or figure.
    Caption,
    /// List.
    L,
    /// List item.
    #[strum(serialize = "LI")]
    #[serde(rename = "LI")]
    Li,
    /// Table.
    Table,
    /// Table row.
    #[strum(serialize = "TR")]
    #[serde(rename = "TR")]
    Tr,
    /// Header cell.
    #[strum(serialize = "TH")]
    #[serde(rename = "TH")]
    Th,
    /// Data cell.
    #[strum(serialize = "TD")]
    #[serde(rename = "TD")]
    Td,
    /// Generic inline.
    Span,
    /// Hyperlink.
    Link,
    /// Inline quotation.
    Quote,
    /// Computer code.
    Code,
    /// Decoration with no meaning, such as rules and line breaks.
    Artifact,
}

impl Role {
    /// Role of a block element by tag name. Unknown tags are [`Role::Div`].
    #[must_use]
    pub fn for_block_tag(tag: &str) -> Self {
        match tag {
            "p" | "dt" | "address" | "figcaption" => Self::P,
            "h1" => Self::H1,
            "h2" => Self::H2,
            "h3" => Self::H3,
            "h4" => Self::H4,
            "h5" => Self::H5,
            "h6" => Self::H6,
            "section" | "article" | "aside" | "header" | "footer" | "nav" | "main" => Self::Sect,
            "blockquote" => Self::BlockQuote,
            "figure" => Self::Figure,
            "pre" => Self::Code,
            _ => Self::Div,
        }
    }

    /// Role of an inline element by tag name.
    #[must_use]
    pub fn for_inline_tag(tag: &str) -> Self {
        match tag {
            "a" => Self::Link,
            "q" => Self::Quote,
            "code" | "kbd" | "samp" | "tt" => Self::Code,
            _ => Self::Span,
        }
    }
}

/// The uniform output unit of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentElement {
    /// Layout kind.
    pub kind: ElementKind,
    /// Structure role.
    pub role: Role,
    /// Language tag of the originating node, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    /// Run that produced this element.
    pub run_id: RunId,
    /// Text of a [`ElementKind::Text`] run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Resolved style and element-specific values (`href`, `colspan`, ...).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    /// Nested elements in document order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DocumentElement>,
}

impl DocumentElement {
    /// An empty element.
    #[must_use]
    pub const fn new(kind: ElementKind, role: Role, run_id: RunId) -> Self {
        Self {
            kind,
            role,
            lang: None,
            run_id,
            text: None,
            properties: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// A text run.
    #[must_use]
    pub fn text_run(text: impl Into<String>, run_id: RunId) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::new(ElementKind::Text, Role::Span, run_id)
        }
    }

    /// Set the language tag.
    #[must_use]
    pub fn with_lang(mut self, lang: Option<&str>) -> Self {
        self.lang = lang.map(str::to_string);
        self
    }

    /// Set one property.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.properties.insert(name.into(), value.into());
        self
    }

    /// Replace the children.
    #[must_use]
    pub fn with_children(mut self, children: Vec<Self>) -> Self {
        self.children = children;
        self
    }

    /// One property value.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Whether this element starts a new block.
    #[must_use]
    pub const fn is_block(&self) -> bool {
        self.kind.is_block()
    }

    /// Concatenated text of this element and its descendants. Line breaks
    /// contribute a newline.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if self.kind == ElementKind::LineBreak {
            out.push('\n');
        }
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// Rows of a table, in rendering order. Empty for other kinds.
    #[must_use]
    pub fn rows(&self) -> Vec<&Self> {
        if self.kind != ElementKind::Table {
            return Vec::new();
        }
        self.children
            .iter()
            .filter(|c| c.kind == ElementKind::TableRow)
            .collect()
    }

    /// Cell `col` of row `row` of a table.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&Self> {
        self.rows()
            .get(row)?
            .children
            .iter()
            .filter(|c| c.kind == ElementKind::TableCell)
            .nth(col)
    }

    /// This element and every descendant of `kind`, in document order.
    #[must_use]
    pub fn find_all(&self, kind: ElementKind) -> Vec<&Self> {
        let mut found = Vec::new();
        let mut stack = vec![self];
        while let Some(element) = stack.pop() {
            if element.kind == kind {
                found.push(element);
            }
            stack.extend(element.children.iter().rev());
        }
        found
    }
}
