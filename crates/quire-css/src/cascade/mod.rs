//! CSS Cascading and Style Computation
//!
//! This module implements style resolution per
//! [CSS Cascading and Inheritance Level 4](https://www.w3.org/TR/css-cascade-4/).
//!
//! Resolution of one node is a pure function of the rule store, the node's
//! position in the tree, its inline style and its parent's resolved map.
//! Running it twice yields identical maps.

use std::collections::{BTreeMap, HashMap};

use quire_common::DiagnosticSink;
use quire_dom::{DomTree, ElementData, NodeId};
use serde::Serialize;
use strum_macros::Display as StrumDisplay;

use crate::declaration::{CssWideKeyword, SpecifiedDeclaration, SpecifiedValue, specify_block};
use crate::display::Display;
use crate::hints::presentational_hints;
use crate::parser::parse_declarations;
use crate::schema::{PropertyDef, lookup, properties};
use crate::selector::{PseudoElement, Specificity};
use crate::store::{CascadeOrigin, RuleStore};
use crate::styled::StyledTree;

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, StrumDisplay)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ValueOrigin {
    /// A declaration won the cascade.
    Cascaded,
    /// Copied from the parent.
    Inherited,
    /// The schema's initial value.
    Initial,
}

/// One resolved property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyValue {
    /// Canonical value text.
    pub value: String,
    /// How the value was obtained.
    pub origin: ValueOrigin,
    /// Whether the property is part of the schema.
    pub recognized: bool,
}

/// A node's resolved properties, keyed by longhand name.
///
/// Holds every schema property plus any unrecognized properties that won
/// the cascade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PropertyMap {
    properties: BTreeMap<String, PropertyValue>,
}

impl PropertyMap {
    /// Resolved entry for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Resolved value text for `name`.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(|v| v.value.as_str())
    }

    /// Resolved value for `name`, or `default` if absent.
    #[must_use]
    pub fn value_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.value(name).unwrap_or(default)
    }

    /// The resolved `display`.
    #[must_use]
    pub fn display(&self) -> Display {
        self.value("display").map_or_else(Display::default, Display::from_keyword)
    }

    /// All entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entries for properties outside the schema.
    pub fn unrecognized(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.iter().filter(|(_, v)| !v.recognized)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    fn insert(&mut self, name: &str, value: PropertyValue) {
        let _ = self.properties.insert(name.to_string(), value);
    }
}

/// [§ 6.4 Cascade Sorting Order](https://www.w3.org/TR/css-cascade-4/#cascade-sort)
///
/// Declarations are compared by this key; the greatest wins. Field order is
/// the comparison order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct CascadeKey {
    layer: u8,
    specificity: Specificity,
    source_order: usize,
    position: usize,
}

/// [§ 6.4.1 Cascade Origin and Importance](https://www.w3.org/TR/css-cascade-4/#cascade-origin)
///
/// "Transition declarations > Important user agent declarations > Important
/// user declarations > Important author declarations > Animation
/// declarations > Normal author declarations > Normal user declarations >
/// Normal user agent declarations"
///
/// Inline style sits above the author origin at each importance. `None`
/// stands for the element's `style` attribute.
const fn layer(origin: Option<CascadeOrigin>, important: bool) -> u8 {
    match (origin, important) {
        (Some(CascadeOrigin::UserAgent), false) => 0,
        (Some(CascadeOrigin::User), false) => 1,
        (Some(CascadeOrigin::Author), false) => 2,
        (None, false) => 3,
        (Some(CascadeOrigin::Author), true) => 4,
        (None, true) => 5,
        (Some(CascadeOrigin::User), true) => 6,
        (Some(CascadeOrigin::UserAgent), true) => 7,
    }
}

/// Per-property winners while resolving one node.
type Winners<'d> = BTreeMap<&'d str, (CascadeKey, &'d SpecifiedValue)>;

fn offer<'d>(winners: &mut Winners<'d>, key: CascadeKey, decl: &'d SpecifiedDeclaration) {
    let current = winners.entry(decl.name.as_str()).or_insert((key, &decl.value));
    if key > current.0 {
        *current = (key, &decl.value);
    }
}

/// Resolves property maps for the nodes of one tree.
///
/// Inline `style` attributes and presentational hints are read once, when
/// the resolver is built, so their diagnostics are reported once.
#[derive(Debug)]
pub struct CascadeResolver<'a> {
    store: &'a RuleStore,
    inline: HashMap<NodeId, Vec<SpecifiedDeclaration>>,
    hints: HashMap<NodeId, Vec<SpecifiedDeclaration>>,
}

impl<'a> CascadeResolver<'a> {
    /// Build a resolver for `tree`.
    pub fn new(store: &'a RuleStore, tree: &DomTree, sink: &dyn DiagnosticSink) -> Self {
        let mut inline = HashMap::new();
        let mut hints = HashMap::new();

        for id in tree.descendants(tree.root()) {
            let Some(element) = tree.as_element(id) else {
                continue;
            };
            if element.generated {
                continue;
            }
            if let Some(style) = element.attr("style") {
                let declarations = specify_block(&parse_declarations(style), Some(&element.tag_name), sink);
                if !declarations.is_empty() {
                    let _ = inline.insert(id, declarations);
                }
            }
            let hinted = presentational_hints(element);
            if !hinted.is_empty() {
                let _ = hints.insert(id, specify_block(&hinted, Some(&element.tag_name), sink));
            }
        }

        log::debug!(
            target: "quire::cascade",
            "{} inline styles, {} hinted elements",
            inline.len(),
            hints.len()
        );
        Self {
            store,
            inline,
            hints,
        }
    }

    /// [§ 6 Cascading](https://www.w3.org/TR/css-cascade-4/#cascading)
    ///
    /// Resolve the full property map of `node`. `parent` is the resolved map
    /// of the node's parent element, `None` for the root element.
    #[must_use]
    pub fn resolve(&self, tree: &DomTree, node: NodeId, parent: Option<&PropertyMap>) -> PropertyMap {
        let mut winners: Winners<'_> = BTreeMap::new();

        // STEP 1: Rules from the store, including pseudo-element rules that
        // match generated nodes.
        for entry in self.store.matching(tree, node) {
            for (position, decl) in entry.declarations.iter().enumerate() {
                let key = CascadeKey {
                    layer: layer(Some(entry.origin), decl.important),
                    specificity: entry.specificity(),
                    source_order: entry.source_order,
                    position,
                };
                offer(&mut winners, key, decl);
            }
        }

        // STEP 2: Presentational hints, author origin with zero specificity
        // ahead of every author rule.
        for (position, decl) in self.hints.get(&node).into_iter().flatten().enumerate() {
            let key = CascadeKey {
                layer: layer(Some(CascadeOrigin::Author), decl.important),
                specificity: Specificity::default(),
                source_order: 0,
                position,
            };
            offer(&mut winners, key, decl);
        }

        // STEP 3: Inline style. Pinned (!important) rule declarations sit in
        // a higher layer and survive it.
        for (position, decl) in self.inline.get(&node).into_iter().flatten().enumerate() {
            let key = CascadeKey {
                layer: layer(None, decl.important),
                specificity: Specificity::default(),
                source_order: 0,
                position,
            };
            offer(&mut winners, key, decl);
        }

        // STEP 4: Defaulting. `color` goes first so `currentcolor` can be
        // resolved for every other property.
        let mut map = PropertyMap::default();
        let color_def = lookup("color");
        let color = color_def.map_or_else(
            || "black".to_string(),
            |def| {
                let value = resolve_property(def, winners.get("color").map(|w| w.1), parent, "black");
                let text = value.value.clone();
                map.insert(def.name, value);
                text
            },
        );
        for def in properties().iter().filter(|d| d.name != "color") {
            let winner = winners.get(def.name).map(|w| w.1);
            map.insert(def.name, resolve_property(def, winner, parent, &color));
        }

        // STEP 5: Unrecognized properties pass through, flagged.
        for (name, (_, value)) in &winners {
            if lookup(name).is_some() {
                continue;
            }
            let resolved = match value {
                SpecifiedValue::Unrecognized(text) | SpecifiedValue::Value(text) => Some(PropertyValue {
                    value: text.clone(),
                    origin: ValueOrigin::Cascaded,
                    recognized: false,
                }),
                SpecifiedValue::CssWide(CssWideKeyword::Inherit) => {
                    parent.and_then(|p| p.get(name)).map(|v| PropertyValue {
                        origin: ValueOrigin::Inherited,
                        ..v.clone()
                    })
                }
                SpecifiedValue::CssWide(_) | SpecifiedValue::Invalid => None,
            };
            if let Some(resolved) = resolved {
                map.insert(name, resolved);
            }
        }

        // STEP 6: [CSS 2.1 § 9.7](https://www.w3.org/TR/CSS2/visuren.html#dis-pos-flo)
        // "if 'float' has a value other than 'none', the box is floated and
        // 'display' is set according to the table below."
        if map.value("float").is_some_and(|f| f != "none") {
            let display = map.display();
            let blockified = blockify(display);
            if blockified != display
                && let Some(entry) = map.properties.get_mut("display")
            {
                entry.value = blockified.keyword().to_string();
            }
        }

        map
    }
}

/// [§ 7 Defaulting](https://www.w3.org/TR/css-cascade-4/#defaulting)
fn resolve_property(
    def: &PropertyDef,
    winner: Option<&SpecifiedValue>,
    parent: Option<&PropertyMap>,
    current_color: &str,
) -> PropertyValue {
    let initial = || PropertyValue {
        value: if def.initial == "currentcolor" {
            current_color.to_string()
        } else {
            def.initial.to_string()
        },
        origin: ValueOrigin::Initial,
        recognized: true,
    };
    // "If there is no parent element, the inherited value is the initial value."
    let inherit = || {
        parent
            .and_then(|p| p.get(def.name))
            .map_or_else(initial, |v| PropertyValue {
                value: v.value.clone(),
                origin: ValueOrigin::Inherited,
                recognized: true,
            })
    };

    match winner {
        // [CSS Color § 4.4](https://www.w3.org/TR/css-color-4/#currentcolor-color)
        // "If currentcolor is the specified value of the color property, it is
        // treated as if the specified value was inherit."
        Some(SpecifiedValue::Value(v)) if v == "currentcolor" => {
            if def.name == "color" {
                inherit()
            } else {
                PropertyValue {
                    value: current_color.to_string(),
                    origin: ValueOrigin::Cascaded,
                    recognized: true,
                }
            }
        }
        Some(SpecifiedValue::Value(v)) => PropertyValue {
            value: v.clone(),
            origin: ValueOrigin::Cascaded,
            recognized: true,
        },
        Some(SpecifiedValue::CssWide(CssWideKeyword::Inherit)) => inherit(),
        Some(SpecifiedValue::CssWide(CssWideKeyword::Initial) | SpecifiedValue::Invalid) => initial(),
        // "If the cascaded value of a property is the unset keyword, then if it
        // is an inherited property, this is treated as inherit, and if it is
        // not, this is treated as initial."
        Some(SpecifiedValue::CssWide(CssWideKeyword::Unset) | SpecifiedValue::Unrecognized(_))
        | None => {
            if def.inherited {
                inherit()
            } else {
                initial()
            }
        }
    }
}

/// [CSS Display § 2.7 Automatic Box Type Transformations](https://www.w3.org/TR/css-display-3/#transformations)
const fn blockify(display: Display) -> Display {
    match display {
        Display::InlineTable => Display::Table,
        Display::InlineFlex => Display::Flex,
        Display::InlineGrid => Display::Grid,
        Display::Inline
        | Display::InlineBlock
        | Display::RunIn
        | Display::TableRowGroup
        | Display::TableHeaderGroup
        | Display::TableFooterGroup
        | Display::TableRow
        | Display::TableColumnGroup
        | Display::TableColumn
        | Display::TableCell
        | Display::TableCaption => Display::Block,
        other => other,
    }
}

/// [CSS Pseudo-Elements § 3.1](https://www.w3.org/TR/css-pseudo-4/#treelike)
///
/// Replaced and void elements have no content to generate around.
const NO_GENERATED_CONTENT: &[&str] = &[
    "img", "br", "hr", "input", "area", "base", "col", "embed", "link", "meta", "source",
    "track", "wbr", "iframe", "video", "audio", "canvas", "textarea", "select",
];

/// [§ 6 Cascading](https://www.w3.org/TR/css-cascade-4/#cascading)
///
/// Resolve every element of `tree` in document order. Generated content
/// nodes for `::before` / `::after` are inserted as the first / last child
/// of their originating element right after it is resolved, then resolved
/// themselves; they are removed again when their `content` computes to
/// `none` or `normal`.
pub fn compute_styles(mut tree: DomTree, store: &RuleStore, sink: &dyn DiagnosticSink) -> StyledTree {
    let resolver = CascadeResolver::new(store, &tree, sink);
    let pseudo_elements: Vec<PseudoElement> = [PseudoElement::Before, PseudoElement::After]
        .into_iter()
        .filter(|p| store.has_pseudo_element(*p))
        .collect();

    let mut styles: HashMap<NodeId, PropertyMap> = HashMap::new();
    let mut generated = 0usize;
    let mut stack: Vec<NodeId> = tree.children(tree.root()).iter().rev().copied().collect();

    while let Some(id) = stack.pop() {
        let Some(element) = tree.as_element(id) else {
            continue;
        };
        let tag = element.tag_name.clone();

        let parent_style = tree.parent(id).and_then(|p| styles.get(&p));
        let style = resolver.resolve(&tree, id, parent_style);
        let _ = styles.insert(id, style);

        if !NO_GENERATED_CONTENT.contains(&tag.as_str()) {
            for &pseudo in &pseudo_elements {
                if let Some((node, style)) = generate(&mut tree, &resolver, &styles, id, pseudo) {
                    let _ = styles.insert(node, style);
                    generated += 1;
                }
            }
        }

        stack.extend(
            tree.children(id)
                .iter()
                .rev()
                .copied()
                .filter(|&c| !tree.as_element(c).is_some_and(|e| e.generated)),
        );
    }

    log::debug!(
        target: "quire::cascade",
        "resolved {} elements against {} rule entries, {generated} generated nodes",
        styles.len(),
        store.len()
    );
    StyledTree::new(tree, styles)
}

fn generate(
    tree: &mut DomTree,
    resolver: &CascadeResolver<'_>,
    styles: &HashMap<NodeId, PropertyMap>,
    originating: NodeId,
    pseudo: PseudoElement,
) -> Option<(NodeId, PropertyMap)> {
    let node = tree.alloc_element(ElementData {
        generated: true,
        ..ElementData::new(pseudo.tag_name())
    });
    match (pseudo, tree.first_child(originating)) {
        (PseudoElement::Before, Some(first)) => tree.insert_before(originating, node, first),
        _ => tree.append_child(originating, node),
    }

    let style = resolver.resolve(tree, node, styles.get(&originating));
    if matches!(style.value("content"), None | Some("none" | "normal")) {
        tree.remove_child(originating, node);
        return None;
    }
    log::trace!(target: "quire::cascade", "generated {} under {originating:?}", pseudo.tag_name());
    Some((node, style))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaContext;
    use quire_common::{CollectingSink, DiagnosticTemplate};

    fn author_store(css: &str, sink: &CollectingSink) -> RuleStore {
        let mut store = RuleStore::new(MediaContext::default());
        store.add_stylesheet(css, CascadeOrigin::Author, None, None, sink);
        store
    }

    fn element_tree(tag: &str, attrs: &[(&str, &str)]) -> (DomTree, NodeId) {
        let mut tree = DomTree::new();
        let data = attrs
            .iter()
            .fold(ElementData::new(tag), |d, (k, v)| d.with_attr(*k, *v));
        let id = tree.alloc_element(data);
        tree.append_child(NodeId::ROOT, id);
        (tree, id)
    }

    #[test]
    fn test_layers_order_importance() {
        assert!(layer(None, false) > layer(Some(CascadeOrigin::Author), false));
        assert!(layer(Some(CascadeOrigin::Author), true) > layer(None, false));
        assert!(layer(Some(CascadeOrigin::UserAgent), true) > layer(None, true));
    }

    #[test]
    fn test_inline_style_beats_rules() {
        let sink = CollectingSink::new();
        let store = author_store("#x { color: red }", &sink);
        let (tree, id) = element_tree("p", &[("id", "x"), ("style", "color: blue")]);
        let map = CascadeResolver::new(&store, &tree, &sink).resolve(&tree, id, None);
        assert_eq!(map.value("color"), Some("blue"));
    }

    #[test]
    fn test_pinned_rule_survives_inline_style() {
        let sink = CollectingSink::new();
        let store = author_store("p { color: red !important }", &sink);
        let (tree, id) = element_tree("p", &[("style", "color: blue")]);
        let map = CascadeResolver::new(&store, &tree, &sink).resolve(&tree, id, None);
        assert_eq!(map.value("color"), Some("red"));
    }

    #[test]
    fn test_invalid_value_falls_back_to_initial() {
        let sink = CollectingSink::new();
        let store = author_store("p { display: sideways }", &sink);
        let (tree, id) = element_tree("p", &[]);
        let resolver = CascadeResolver::new(&store, &tree, &sink);
        let map = resolver.resolve(&tree, id, None);
        let display = map.get("display").unwrap();
        assert_eq!(display.value, "inline");
        assert_eq!(display.origin, ValueOrigin::Initial);
        let _ = resolver.resolve(&tree, id, None);
        assert_eq!(sink.count(DiagnosticTemplate::InvalidPropertyValue), 1);
    }

    #[test]
    fn test_unknown_property_is_flagged() {
        let sink = CollectingSink::new();
        let store = author_store("p { -x-flavor: Vanilla }", &sink);
        let (tree, id) = element_tree("p", &[]);
        let map = CascadeResolver::new(&store, &tree, &sink).resolve(&tree, id, None);
        let flavor = map.get("-x-flavor").unwrap();
        assert!(!flavor.recognized);
        assert_eq!(flavor.value, "Vanilla");
        assert_eq!(sink.count(DiagnosticTemplate::UnknownProperty), 1);
    }

    #[test]
    fn test_currentcolor_follows_color() {
        let sink = CollectingSink::new();
        let store = author_store("p { color: #0F0; border: 1px solid }", &sink);
        let (tree, id) = element_tree("p", &[]);
        let map = CascadeResolver::new(&store, &tree, &sink).resolve(&tree, id, None);
        assert_eq!(map.value("color"), Some("#00ff00"));
        assert_eq!(map.value("border-top-color"), Some("#00ff00"));
    }

    #[test]
    fn test_presentational_hint_loses_to_author_rule() {
        let sink = CollectingSink::new();
        let store = author_store("* { text-align: right }", &sink);
        let (tree, id) = element_tree("p", &[("align", "center")]);
        let map = CascadeResolver::new(&store, &tree, &sink).resolve(&tree, id, None);
        assert_eq!(map.value("text-align"), Some("right"));
    }

    #[test]
    fn test_float_blockifies() {
        let sink = CollectingSink::new();
        let store = author_store("span { float: left }", &sink);
        let mut tree = DomTree::new();
        let div = tree.alloc_element(ElementData::new("div"));
        let span = tree.alloc_element(ElementData::new("span"));
        tree.append_child(NodeId::ROOT, div);
        tree.append_child(div, span);
        let map = CascadeResolver::new(&store, &tree, &sink).resolve(&tree, span, None);
        assert_eq!(map.display(), Display::Block);
    }
}
