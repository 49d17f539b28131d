//! Tables.
//!
//! [CSS 2 § 17.2 The CSS table model](https://www.w3.org/TR/CSS2/tables.html#table-display)
//!
//! Row groups dissolve into their rows: a finished table holds its
//! captions first, then every row in rendering order (header rows, body
//! rows, footer rows), each row tagged with the section it came from.

use quire_css::{Display, StyledNode};

use super::block::BlockContainer;
use super::{ElementSeed, TagHandler};
use crate::context::ConversionContext;
use crate::element::{DocumentElement, ElementKind, Role};
use crate::error::HandlerError;

/// Section a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Section {
    Head,
    Body,
    Foot,
}

impl Section {
    const fn keyword(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Body => "body",
            Self::Foot => "foot",
        }
    }

    fn of(row: &DocumentElement) -> Self {
        match row.property("section") {
            Some("head") => Self::Head,
            Some("foot") => Self::Foot,
            _ => Self::Body,
        }
    }
}

/// [§ 17.2.1 Anonymous table objects](https://www.w3.org/TR/CSS2/tables.html#anonymous-boxes)
///
/// "If a child C of a 'table' or 'inline-table' box is not a proper table
/// child, then generate an anonymous 'table-row' box around C and all
/// consecutive siblings of C that are not proper table children."
///
/// Collects rows, wrapping runs of orphan cells in implicit rows.
#[derive(Debug, Default)]
struct RowCollector {
    rows: Vec<DocumentElement>,
    implicit: Option<DocumentElement>,
}

impl RowCollector {
    fn push_row(&mut self, row: DocumentElement) {
        self.flush();
        self.rows.push(row);
    }

    fn push_orphan_cell(&mut self, seed: &ElementSeed, cell: DocumentElement) {
        self.implicit
            .get_or_insert_with(|| DocumentElement::new(ElementKind::TableRow, Role::Tr, seed.run_id()))
            .children
            .push(cell);
    }

    fn flush(&mut self) {
        if let Some(row) = self.implicit.take() {
            self.rows.push(row);
        }
    }

    fn finish(mut self) -> Vec<DocumentElement> {
        self.flush();
        self.rows
    }
}

/// `table`: one [`ElementKind::Table`].
#[derive(Debug)]
pub struct Table {
    seed: ElementSeed,
    captions: Vec<DocumentElement>,
    rows: Option<RowCollector>,
}

impl Table {
    /// Factory for `table` and anything displayed as `table`.
    pub fn factory(node: &StyledNode<'_>, ctx: &mut ConversionContext) -> Box<dyn TagHandler> {
        Box::new(Self {
            seed: ElementSeed::from_node(node, ctx),
            captions: Vec::new(),
            rows: Some(RowCollector::default()),
        })
    }
}

impl TagHandler for Table {
    fn accept_child(&mut self, child: DocumentElement, _ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        let rows = self.rows.as_mut().ok_or(HandlerError::AfterFinish)?;
        match child.kind {
            ElementKind::Caption => {
                rows.flush();
                self.captions.push(child);
            }
            ElementKind::TableRow => rows.push_row(child),
            ElementKind::TableCell => rows.push_orphan_cell(&self.seed, child),
            other => return Err(HandlerError::rejected(format!("{other} is not a table child"))),
        }
        Ok(())
    }

    fn finish(&mut self, _ctx: &mut ConversionContext) -> Result<Vec<DocumentElement>, HandlerError> {
        let mut rows = self.rows.take().ok_or(HandlerError::AfterFinish)?.finish();
        // Stable: document order survives within each section.
        rows.sort_by_key(Section::of);

        let mut children = std::mem::take(&mut self.captions);
        children.extend(rows);
        Ok(vec![self.seed.element(ElementKind::Table, Role::Table).with_children(children)])
    }
}

/// `thead`, `tbody`, `tfoot`: dissolves into its rows.
#[derive(Debug)]
pub struct RowGroup {
    seed: ElementSeed,
    section: Section,
    rows: Option<RowCollector>,
}

impl RowGroup {
    /// Factory for row groups; the section follows the resolved display.
    pub fn factory(node: &StyledNode<'_>, ctx: &mut ConversionContext) -> Box<dyn TagHandler> {
        let section = match node.display() {
            Display::TableHeaderGroup => Section::Head,
            Display::TableFooterGroup => Section::Foot,
            _ => Section::Body,
        };
        Box::new(Self {
            seed: ElementSeed::from_node(node, ctx),
            section,
            rows: Some(RowCollector::default()),
        })
    }
}

impl TagHandler for RowGroup {
    fn accept_child(&mut self, child: DocumentElement, _ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        let rows = self.rows.as_mut().ok_or(HandlerError::AfterFinish)?;
        match child.kind {
            ElementKind::TableRow => rows.push_row(child),
            ElementKind::TableCell => rows.push_orphan_cell(&self.seed, child),
            other => return Err(HandlerError::rejected(format!("{other} is not a row group child"))),
        }
        Ok(())
    }

    fn finish(&mut self, _ctx: &mut ConversionContext) -> Result<Vec<DocumentElement>, HandlerError> {
        let section = self.section.keyword();
        let rows = self.rows.take().ok_or(HandlerError::AfterFinish)?.finish();
        Ok(rows.into_iter().map(|row| row.with_property("section", section)).collect())
    }
}

/// `tr`: one [`ElementKind::TableRow`]. Only cells are accepted.
#[derive(Debug)]
pub struct TableRow {
    seed: ElementSeed,
    cells: Vec<DocumentElement>,
}

impl TableRow {
    /// Factory for `tr` and anything displayed as `table-row`.
    pub fn factory(node: &StyledNode<'_>, ctx: &mut ConversionContext) -> Box<dyn TagHandler> {
        Box::new(Self {
            seed: ElementSeed::from_node(node, ctx),
            cells: Vec::new(),
        })
    }
}

impl TagHandler for TableRow {
    fn accept_child(&mut self, child: DocumentElement, _ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        if child.kind != ElementKind::TableCell {
            return Err(HandlerError::rejected(format!("{} is not a table cell", child.kind)));
        }
        self.cells.push(child);
        Ok(())
    }

    fn finish(&mut self, _ctx: &mut ConversionContext) -> Result<Vec<DocumentElement>, HandlerError> {
        let cells = std::mem::take(&mut self.cells);
        Ok(vec![self.seed.element(ElementKind::TableRow, Role::Tr).with_children(cells)])
    }
}

/// `td` / `th`: one [`ElementKind::TableCell`] holding block content.
#[derive(Debug)]
pub struct TableCell {
    inner: BlockContainer,
    header: bool,
    colspan: Option<u32>,
    rowspan: Option<u32>,
}

impl TableCell {
    /// Factory for cells; `th` cells are header cells.
    pub fn factory(node: &StyledNode<'_>, ctx: &mut ConversionContext) -> Box<dyn TagHandler> {
        let header = node.tag() == Some("th");
        let role = if header { Role::Th } else { Role::Td };
        // [§ 4.9.11 Attributes common to td and th elements]
        // "The td and th elements may have a colspan content attribute
        // specified, whose value must be a valid non-negative integer
        // greater than zero".
        let span = |name: &str| {
            node.attr(name)
                .and_then(|v| v.trim().parse::<u32>().ok())
                .filter(|n| *n > 0)
        };
        Box::new(Self {
            inner: BlockContainer::new(node, ctx, ElementKind::TableCell, role),
            header,
            colspan: span("colspan"),
            rowspan: span("rowspan"),
        })
    }
}

impl TagHandler for TableCell {
    fn accept_text(&mut self, text: &str, ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        self.inner.accept_text(text, ctx)
    }

    fn accept_child(&mut self, child: DocumentElement, ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        self.inner.accept_child(child, ctx)
    }

    fn finish(&mut self, _ctx: &mut ConversionContext) -> Result<Vec<DocumentElement>, HandlerError> {
        let mut cell = self.inner.build()?;
        if self.header {
            let _ = cell.properties.insert("header".to_string(), "true".to_string());
        }
        for (name, span) in [("colspan", self.colspan), ("rowspan", self.rowspan)] {
            if let Some(span) = span {
                let _ = cell.properties.insert(name.to_string(), span.to_string());
            }
        }
        Ok(vec![cell])
    }
}

/// Factory for `caption` and anything displayed as `table-caption`.
pub fn caption(node: &StyledNode<'_>, ctx: &mut ConversionContext) -> Box<dyn TagHandler> {
    Box::new(BlockContainer::new(node, ctx, ElementKind::Caption, Role::Caption))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::RunId;

    fn row(section: Option<&str>, text: &str, run: RunId) -> DocumentElement {
        let row = DocumentElement::new(ElementKind::TableRow, Role::Tr, run)
            .with_children(vec![DocumentElement::text_run(text, run)]);
        match section {
            Some(s) => row.with_property("section", s),
            None => row,
        }
    }

    #[test]
    fn test_rows_sort_head_body_foot_stably() {
        let run = RunId::next();
        let mut rows = vec![
            row(Some("foot"), "f", run),
            row(None, "b1", run),
            row(Some("head"), "h", run),
            row(Some("body"), "b2", run),
        ];
        rows.sort_by_key(Section::of);
        let order: Vec<String> = rows.iter().map(DocumentElement::text_content).collect();
        assert_eq!(order, vec!["h", "b1", "b2", "f"]);
    }

    #[test]
    fn test_orphan_cells_share_one_implicit_row() {
        let run = RunId::next();
        let seed = ElementSeed {
            node: quire_dom::NodeId(1),
            tag: "table".to_string(),
            lang: None,
            style: quire_css::PropertyMap::default(),
            font: None,
            run_id: run,
        };
        let cell = || DocumentElement::new(ElementKind::TableCell, Role::Td, run);
        let mut rows = RowCollector::default();
        rows.push_orphan_cell(&seed, cell());
        rows.push_orphan_cell(&seed, cell());
        rows.push_row(row(None, "r", run));
        rows.push_orphan_cell(&seed, cell());
        let rows = rows.finish();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].children.len(), 2);
        assert_eq!(rows[2].children.len(), 1);
    }
}
