//! Lists and list items.
//!
//! [CSS Lists § 3 Markers](https://www.w3.org/TR/css-lists-3/#markers)
//!
//! Markers are assigned when the list finishes, once every item is known,
//! so that `reversed` lists can count down from the item count.

use quire_css::StyledNode;

use super::block::BlockContainer;
use super::{ElementSeed, TagHandler};
use crate::context::ConversionContext;
use crate::counters::format_counter;
use crate::element::{DocumentElement, ElementKind, Role};
use crate::error::HandlerError;

/// Styles whose marker is a symbol rather than a number.
const SYMBOLIC_STYLES: &[&str] = &["disc", "circle", "square", "none"];

/// `ul` / `ol`: one [`ElementKind::List`] of items.
///
/// Items are the only children a list keeps directly. Any other block
/// (a stray nested list, a paragraph) is appended to the preceding item,
/// or to an implicit item when the list has none yet.
#[derive(Debug)]
pub struct List {
    seed: ElementSeed,
    start: Option<i64>,
    reversed: bool,
    items: Vec<DocumentElement>,
}

impl List {
    /// Factory for `ul` and `ol`.
    pub fn factory(node: &StyledNode<'_>, ctx: &mut ConversionContext) -> Box<dyn TagHandler> {
        Box::new(Self {
            seed: ElementSeed::from_node(node, ctx),
            start: node.attr("start").and_then(|s| s.trim().parse().ok()),
            reversed: node.attr("reversed").is_some(),
            items: Vec::new(),
        })
    }

    fn implicit_item(&self) -> DocumentElement {
        let style = self.seed.value("list-style-type").unwrap_or("disc");
        self.seed
            .element(ElementKind::ListItem, Role::Li)
            .with_property("list-style-type", style)
    }

    /// [§ 4.6.9 The ol element](https://html.spec.whatwg.org/multipage/grouping-content.html#the-ol-element)
    ///
    /// "The first item in the list has the ordinal value given by the ol
    /// element's start attribute, unless that li element has a value
    /// attribute". Each later item counts on from its predecessor.
    fn assign_markers(&mut self) {
        let count = i64::try_from(self.items.len()).unwrap_or(i64::MAX);
        let step = if self.reversed { -1 } else { 1 };
        let mut ordinal = self.start.unwrap_or(if self.reversed { count } else { 1 });

        for item in &mut self.items {
            if let Some(value) = item.property("value").and_then(|v| v.parse().ok()) {
                ordinal = value;
            }
            let style = item.property("list-style-type").unwrap_or("disc").to_string();
            let mut marker = format_counter(ordinal, &style);
            if !SYMBOLIC_STYLES.contains(&style.as_str()) {
                marker.push('.');
            }
            if !marker.is_empty() {
                let _ = item.properties.insert("marker".to_string(), marker);
            }
            let _ = item.properties.insert("ordinal".to_string(), ordinal.to_string());
            ordinal = ordinal.saturating_add(step);
        }
    }
}

impl TagHandler for List {
    fn accept_child(&mut self, child: DocumentElement, _ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        if child.kind == ElementKind::ListItem {
            self.items.push(child);
            return Ok(());
        }
        if self.items.is_empty() {
            let item = self.implicit_item();
            self.items.push(item);
        }
        if let Some(last) = self.items.last_mut() {
            last.children.push(child);
        }
        Ok(())
    }

    fn finish(&mut self, _ctx: &mut ConversionContext) -> Result<Vec<DocumentElement>, HandlerError> {
        self.assign_markers();
        let list = self
            .seed
            .element(ElementKind::List, Role::L)
            .with_children(std::mem::take(&mut self.items));
        Ok(vec![list])
    }
}

/// `li`: one [`ElementKind::ListItem`] holding block content.
///
/// The item records its own `list-style-type` and `list-style-position`
/// (both inherited, so they do not travel with the box properties) and
/// its `value` attribute for the list to number from.
#[derive(Debug)]
pub struct ListItem {
    inner: BlockContainer,
    value: Option<i64>,
}

impl ListItem {
    /// Factory for `li` and anything displayed as `list-item`.
    pub fn factory(node: &StyledNode<'_>, ctx: &mut ConversionContext) -> Box<dyn TagHandler> {
        Box::new(Self {
            inner: BlockContainer::new(node, ctx, ElementKind::ListItem, Role::Li),
            value: node.attr("value").and_then(|v| v.trim().parse().ok()),
        })
    }
}

impl TagHandler for ListItem {
    fn accept_text(&mut self, text: &str, ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        self.inner.accept_text(text, ctx)
    }

    fn accept_child(&mut self, child: DocumentElement, ctx: &mut ConversionContext) -> Result<(), HandlerError> {
        self.inner.accept_child(child, ctx)
    }

    fn finish(&mut self, _ctx: &mut ConversionContext) -> Result<Vec<DocumentElement>, HandlerError> {
        let mut item = self.inner.build()?;
        let seed = self.inner.seed();
        for name in ["list-style-type", "list-style-position"] {
            if let Some(value) = seed.value(name) {
                let _ = item.properties.insert(name.to_string(), value.to_string());
            }
        }
        if let Some(value) = self.value {
            let _ = item.properties.insert("value".to_string(), value.to_string());
        }
        Ok(vec![item])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::RunId;
    use quire_dom::NodeId;

    fn list(start: Option<i64>, reversed: bool, styles: &[(&str, Option<i64>)]) -> List {
        let run = RunId::next();
        let seed = ElementSeed {
            node: NodeId(1),
            tag: "ol".to_string(),
            lang: None,
            style: quire_css::PropertyMap::default(),
            font: None,
            run_id: run,
        };
        let items = styles
            .iter()
            .map(|(style, value)| {
                let item =
                    DocumentElement::new(ElementKind::ListItem, Role::Li, run).with_property("list-style-type", *style);
                match value {
                    Some(v) => item.with_property("value", v.to_string()),
                    None => item,
                }
            })
            .collect();
        List {
            seed,
            start,
            reversed,
            items,
        }
    }

    fn markers(list: &List) -> Vec<&str> {
        list.items.iter().map(|i| i.property("marker").unwrap_or("")).collect()
    }

    #[test]
    fn test_decimal_markers_honor_start_and_value() {
        let mut ol = list(Some(3), false, &[("decimal", None), ("decimal", Some(10)), ("decimal", None)]);
        ol.assign_markers();
        assert_eq!(markers(&ol), vec!["3.", "10.", "11."]);
    }

    #[test]
    fn test_reversed_counts_down_from_item_count() {
        let mut ol = list(None, true, &[("upper-roman", None), ("upper-roman", None), ("upper-roman", None)]);
        ol.assign_markers();
        assert_eq!(markers(&ol), vec!["III.", "II.", "I."]);
    }

    #[test]
    fn test_symbolic_markers_have_no_suffix() {
        let mut ul = list(None, false, &[("disc", None), ("square", None), ("none", None)]);
        ul.assign_markers();
        assert_eq!(markers(&ul), vec!["\u{2022}", "\u{25aa}", ""]);
        assert_eq!(ul.items[2].property("ordinal"), Some("3"));
    }

    #[test]
    fn test_ordinals_saturate_at_the_integer_bounds() {
        let mut ol = list(Some(i64::MAX), false, &[("decimal", None), ("decimal", None)]);
        ol.assign_markers();
        let max = i64::MAX.to_string();
        assert_eq!(ol.items[0].property("ordinal"), Some(max.as_str()));
        assert_eq!(ol.items[1].property("ordinal"), Some(max.as_str()));

        let mut reversed = list(Some(i64::MIN), true, &[("lower-roman", None), ("lower-roman", None)]);
        reversed.assign_markers();
        let min = i64::MIN.to_string();
        assert_eq!(reversed.items[1].property("ordinal"), Some(min.as_str()));
        assert_eq!(markers(&reversed), vec![format!("{min}."), format!("{min}.")]);
    }
}
