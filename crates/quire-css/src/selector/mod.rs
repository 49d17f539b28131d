//! CSS Selector parsing and matching
//!
//! This module implements selector parsing and matching per
//! [Selectors Level 4](https://www.w3.org/TR/selectors-4/).
//!
//! Matching is a pure predicate over a node and the tree that supplies its
//! ancestor and sibling chain. The matcher keeps no state between calls.
//!
//! Generated content nodes (`::before`/`::after`) are ordinary arena nodes.
//! A selector ending in a pseudo-element matches exactly those nodes whose
//! originating element matches the rest of the selector. Structural
//! pseudo-classes on real elements do not count generated siblings.

use std::fmt;

use quire_dom::{DomTree, ElementData, NodeId, NodeType};
use serde::Serialize;
use thiserror::Error;

/// Why a selector was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    /// The selector text is empty.
    #[error("empty selector")]
    Empty,
    /// A combinator has no compound selector on one side.
    #[error("dangling combinator '{0}'")]
    DanglingCombinator(char),
    /// A character that cannot start any simple selector.
    #[error("unexpected character '{0}'")]
    Unexpected(char),
    /// Malformed attribute selector.
    #[error("malformed attribute selector")]
    BadAttribute,
    /// Malformed pseudo-class or pseudo-element.
    #[error("malformed pseudo-class '{0}'")]
    BadPseudo(String),
    /// A pseudo-element that is not the last thing in the selector.
    #[error("pseudo-element must be last")]
    MisplacedPseudoElement,
}

/// [§ 5 Elemental selectors](https://www.w3.org/TR/selectors-4/#elemental-selectors)
/// [§ 6 Attribute selectors](https://www.w3.org/TR/selectors-4/#attribute-selectors)
///
/// A simple selector is a single condition on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    /// [§ 5.1 Type selector](https://www.w3.org/TR/selectors-4/#type-selectors)
    /// "A type selector is the name of a document language element type,
    /// and represents an instance of that element type in the document tree."
    Type(String),

    /// [§ 6.6 Class selector](https://www.w3.org/TR/selectors-4/#class-html)
    Class(String),

    /// [§ 6.7 ID selector](https://www.w3.org/TR/selectors-4/#id-selectors)
    Id(String),

    /// [§ 5.2 Universal selector](https://www.w3.org/TR/selectors-4/#universal-selector)
    Universal,

    /// Pseudo-class that never matches in a static document: interactive
    /// states (`:hover`, `:focus`, `:visited`) and unknown pseudo-classes.
    /// Keeping it lets the rest of a selector list survive.
    NeverMatch,

    /// [§ 4 Pseudo-classes](https://www.w3.org/TR/selectors-4/#pseudo-classes)
    PseudoClass(PseudoClass),

    /// [§ 6.4 Attribute selectors](https://www.w3.org/TR/selectors-4/#attribute-selectors)
    Attribute(AttributeSelector),
}

/// Pseudo-classes per [§ 4 Pseudo-classes](https://www.w3.org/TR/selectors-4/#pseudo-classes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoClass {
    /// [§ 4.4 :root](https://www.w3.org/TR/selectors-4/#the-root-pseudo)
    /// "The :root pseudo-class represents an element that is the root of the document."
    Root,
    /// [§ 14.3.1 :first-child](https://www.w3.org/TR/selectors-4/#the-first-child-pseudo)
    FirstChild,
    /// [§ 14.3.2 :last-child](https://www.w3.org/TR/selectors-4/#the-last-child-pseudo)
    LastChild,
    /// [§ 14.3.3 :only-child](https://www.w3.org/TR/selectors-4/#the-only-child-pseudo)
    OnlyChild,
    /// [§ 14.4.3 :first-of-type](https://www.w3.org/TR/selectors-4/#the-first-of-type-pseudo)
    FirstOfType,
    /// [§ 14.4.4 :last-of-type](https://www.w3.org/TR/selectors-4/#the-last-of-type-pseudo)
    LastOfType,
    /// [§ 14.4.5 :only-of-type](https://www.w3.org/TR/selectors-4/#the-only-of-type-pseudo)
    OnlyOfType,
    /// [§ 14.3.4 :nth-child()](https://www.w3.org/TR/selectors-4/#the-nth-child-pseudo)
    NthChild(Nth),
    /// [§ 14.3.5 :nth-last-child()](https://www.w3.org/TR/selectors-4/#the-nth-last-child-pseudo)
    NthLastChild(Nth),
    /// [§ 14.4.1 :nth-of-type()](https://www.w3.org/TR/selectors-4/#the-nth-of-type-pseudo)
    NthOfType(Nth),
    /// [§ 14.4.2 :nth-last-of-type()](https://www.w3.org/TR/selectors-4/#the-nth-last-of-type-pseudo)
    NthLastOfType(Nth),
    /// [§ 14.2 :empty](https://www.w3.org/TR/selectors-4/#the-empty-pseudo)
    Empty,
    /// [§ 8.2 :link](https://www.w3.org/TR/selectors-4/#the-link-pseudo)
    /// In a static document every hyperlink is unvisited.
    Link,
    /// [§ 7.2 :lang()](https://www.w3.org/TR/selectors-4/#the-lang-pseudo)
    Lang(String),
    /// [§ 4.3 :not()](https://www.w3.org/TR/selectors-4/#negation)
    /// Restricted to a single compound selector.
    Not(Box<CompoundSelector>),
    /// [§ 12.1.2 :disabled](https://www.w3.org/TR/selectors-4/#disabled-pseudo)
    Disabled,
    /// [§ 12.1.1 :enabled](https://www.w3.org/TR/selectors-4/#enabled-pseudo)
    Enabled,
    /// [§ 12.3.1 :checked](https://www.w3.org/TR/selectors-4/#checked)
    Checked,
}

/// The `An+B` microsyntax.
///
/// [CSS Syntax § 6 The An+B microsyntax](https://www.w3.org/TR/css-syntax-3/#anb-microsyntax)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nth {
    /// Step.
    pub a: i32,
    /// Offset.
    pub b: i32,
}

impl Nth {
    /// Whether the 1-based `index` is selected.
    #[must_use]
    pub fn matches(self, index: i32) -> bool {
        // Widened so that extreme stylesheet values cannot overflow.
        let (a, b, index) = (i64::from(self.a), i64::from(self.b), i64::from(index));
        if a == 0 {
            return index == b;
        }
        let diff = index - b;
        diff % a == 0 && diff / a >= 0
    }

    fn parse(text: &str) -> Option<Self> {
        let text: String = text.split_whitespace().collect::<String>().to_ascii_lowercase();
        match text.as_str() {
            "odd" => return Some(Self { a: 2, b: 1 }),
            "even" => return Some(Self { a: 2, b: 0 }),
            _ => {}
        }
        let Some(n_pos) = text.find('n') else {
            return text.parse().ok().map(|b| Self { a: 0, b });
        };
        let a = match &text[..n_pos] {
            "" | "+" => 1,
            "-" => -1,
            other => other.parse().ok()?,
        };
        let rest = &text[n_pos + 1..];
        let b = if rest.is_empty() {
            0
        } else {
            rest.strip_prefix('+').unwrap_or(rest).parse().ok()?
        };
        Some(Self { a, b })
    }
}

/// Attribute selectors per [§ 6.4](https://www.w3.org/TR/selectors-4/#attribute-selectors)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeSelector {
    /// `[attr]`: "Represents an element with the att attribute"
    Exists(String),
    /// `[attr=value]`: value is exactly `value`.
    Equals(String, String),
    /// `[attr~=value]`: one of the whitespace-separated words is `value`.
    Includes(String, String),
    /// `[attr|=value]`: value is `value` or begins with `value-`.
    DashMatch(String, String),
    /// `[attr^=value]`: value begins with `value`.
    PrefixMatch(String, String),
    /// `[attr$=value]`: value ends with `value`.
    SuffixMatch(String, String),
    /// `[attr*=value]`: value contains `value`.
    SubstringMatch(String, String),
}

/// [§ 4.2 Compound selectors](https://www.w3.org/TR/selectors-4/#compound)
///
/// "A compound selector is a sequence of simple selectors that are not
/// separated by a combinator, and represents a set of simultaneous
/// conditions on a single element."
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompoundSelector {
    /// The list of simple selectors that make up this compound selector.
    pub simple_selectors: Vec<SimpleSelector>,
}

/// [§ 16 Combinators](https://www.w3.org/TR/selectors-4/#combinators)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// [§ 16.1](https://www.w3.org/TR/selectors-4/#descendant-combinators) `A B`
    Descendant,
    /// [§ 16.2](https://www.w3.org/TR/selectors-4/#child-combinators) `A > B`
    Child,
    /// [§ 16.3](https://www.w3.org/TR/selectors-4/#adjacent-sibling-combinators) `A + B`
    NextSibling,
    /// [§ 16.4](https://www.w3.org/TR/selectors-4/#general-sibling-combinators) `A ~ B`
    SubsequentSibling,
}

/// Pseudo-elements that produce generated content nodes.
///
/// [CSS Pseudo-Elements § 3](https://www.w3.org/TR/css-pseudo-4/#generated-content)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PseudoElement {
    /// `::before`
    Before,
    /// `::after`
    After,
    /// Any other pseudo-element (`::first-line`, `::marker`, ...). Never
    /// generated, so selectors carrying it never match.
    Unsupported,
}

impl PseudoElement {
    /// The tag name given to generated nodes of this kind.
    #[must_use]
    pub const fn tag_name(self) -> &'static str {
        match self {
            Self::Before => "::before",
            Self::After => "::after",
            Self::Unsupported => "::unsupported",
        }
    }
}

/// [§ 4.3 Complex selectors](https://www.w3.org/TR/selectors-4/#complex)
///
/// Example: `div.container > ul.nav li a.active` is parsed as:
/// ```text
/// [div.container] --(Child)--> [ul.nav] --(Descendant)--> [li] --(Descendant)--> [a.active]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComplexSelector {
    /// The rightmost compound selector (the subject of the selector).
    pub subject: CompoundSelector,

    /// Chain of (combinator, compound) pairs going left from the subject.
    ///
    /// For `A > B C` this is `[(Descendant, B), (Child, A)]`; matching walks
    /// from the subject outward.
    pub combinators: Vec<(Combinator, CompoundSelector)>,
}

/// [§ 17 Calculating Specificity](https://www.w3.org/TR/selectors-4/#specificity-rules)
///
/// "count the number of ID selectors in the selector (= A); count the number
/// of class selectors, attributes selectors, and pseudo-classes in the
/// selector (= B); count the number of type selectors and pseudo-elements in
/// the selector (= C)". Compared component-wise, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Specificity(pub u32, pub u32, pub u32);

impl Specificity {
    /// Create a new specificity with (A, B, C) components.
    #[must_use]
    pub const fn new(a: u32, b: u32, c: u32) -> Self {
        Self(a, b, c)
    }
}

impl fmt::Display for Specificity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.0, self.1, self.2)
    }
}

/// A parsed CSS selector ready for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSelector {
    /// The complex selector (compound selectors with combinators).
    pub complex: ComplexSelector,
    /// Trailing pseudo-element, if any.
    pub pseudo_element: Option<PseudoElement>,
    /// The specificity of this selector.
    pub specificity: Specificity,
}

impl ParsedSelector {
    /// Check if this is a simple selector (no combinators).
    #[must_use]
    pub const fn is_simple(&self) -> bool {
        self.complex.combinators.is_empty()
    }

    /// [§ 4.1 Selector Matching](https://www.w3.org/TR/selectors-4/#match-a-selector-against-an-element)
    ///
    /// Match against a detached element. Only selectors without combinators
    /// or tree-dependent pseudo-classes can match here.
    #[must_use]
    pub fn matches(&self, element: &ElementData) -> bool {
        self.pseudo_element.is_none()
            && self.complex.combinators.is_empty()
            && !self.complex.subject.simple_selectors.is_empty()
            && self
                .complex
                .subject
                .simple_selectors
                .iter()
                .all(|simple| simple.matches(element))
    }

    /// [§ 4.1 Selector Matching](https://www.w3.org/TR/selectors-4/#match-a-selector-against-an-element)
    /// "A selector is said to match an element when..."
    ///
    /// Match against `node_id` using `tree` for the ancestor and sibling chain.
    #[must_use]
    pub fn matches_in_tree(&self, tree: &DomTree, node_id: NodeId) -> bool {
        // A selector with no components matches nothing.
        if self.complex.subject.simple_selectors.is_empty() && self.pseudo_element.is_none() {
            return false;
        }

        let Some(element) = tree.as_element(node_id) else {
            return false;
        };

        // STEP 1: Resolve the element the compound chain is evaluated on.
        let subject_id = match self.pseudo_element {
            None if element.generated => return false,
            None => node_id,
            Some(PseudoElement::Unsupported) => return false,
            Some(pseudo) => {
                if !element.generated || element.tag_name != pseudo.tag_name() {
                    return false;
                }
                let Some(originating) = tree.parent(node_id) else {
                    return false;
                };
                originating
            }
        };

        // STEP 2: The subject compound must match.
        if !compound_matches_in_tree(&self.complex.subject, tree, subject_id) {
            return false;
        }

        // STEP 3: Walk the combinator chain outward.
        self.complex.combinators.is_empty() || self.matches_combinators(tree, subject_id)
    }

    /// [§ 16 Combinators](https://www.w3.org/TR/selectors-4/#combinators)
    ///
    /// The chain is stored right-to-left, so each step finds an element in
    /// the required relationship to the previous one. Descendant and
    /// subsequent-sibling steps backtrack over every candidate.
    fn matches_combinators(&self, tree: &DomTree, subject_id: NodeId) -> bool {
        match_chain(&self.complex.combinators, tree, subject_id)
    }
}

fn match_chain(chain: &[(Combinator, CompoundSelector)], tree: &DomTree, current: NodeId) -> bool {
    let Some(((combinator, compound), rest)) = chain.split_first() else {
        return true;
    };

    let mut try_candidate =
        |candidate: NodeId| compound_matches_in_tree(compound, tree, candidate) && match_chain(rest, tree, candidate);

    match combinator {
        // "A selector of the form 'A B' represents an element B that is an
        // arbitrary descendant of some ancestor element A."
        Combinator::Descendant => tree.ancestors(current).any(&mut try_candidate),

        // "A selector of the form 'A > B' represents an element B that is a
        // direct child of element A."
        Combinator::Child => tree.parent(current).is_some_and(&mut try_candidate),

        // "A selector of the form 'A + B' represents an element B that
        // immediately follows element A, where A and B share the same parent."
        Combinator::NextSibling => element_siblings_before(tree, current)
            .next()
            .is_some_and(&mut try_candidate),

        // "A selector of the form 'A ~ B' represents an element B that
        // follows element A (not necessarily immediately)"
        Combinator::SubsequentSibling => {
            element_siblings_before(tree, current).any(&mut try_candidate)
        }
    }
}

/// Source element siblings preceding `node_id`, nearest first.
fn element_siblings_before(tree: &DomTree, node_id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    tree.preceding_siblings(node_id)
        .filter(move |&s| tree.is_source_element(s))
}

/// Source element siblings following `node_id`, nearest first.
fn element_siblings_after(tree: &DomTree, node_id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    tree.following_siblings(node_id)
        .filter(move |&s| tree.is_source_element(s))
}

fn compound_matches_in_tree(compound: &CompoundSelector, tree: &DomTree, node_id: NodeId) -> bool {
    let Some(element) = tree.as_element(node_id) else {
        return false;
    };
    compound.simple_selectors.iter().all(|simple| match simple {
        SimpleSelector::PseudoClass(pc) => pseudo_class_matches(pc, tree, node_id, element),
        _ => simple.matches(element),
    })
}

/// 1-based position among source element siblings, counted from the
/// start or the end, optionally restricted to the same tag.
fn sibling_index(tree: &DomTree, node_id: NodeId, from_end: bool, same_type: Option<&str>) -> i32 {
    let same = |s: &NodeId| same_type.is_none_or(|tag| tree.tag_name(*s) == Some(tag));
    let count = if from_end {
        element_siblings_after(tree, node_id).filter(same).count()
    } else {
        element_siblings_before(tree, node_id).filter(same).count()
    };
    i32::try_from(count).map_or(i32::MAX, |c| c + 1)
}

fn pseudo_class_matches(
    pc: &PseudoClass,
    tree: &DomTree,
    node_id: NodeId,
    element: &ElementData,
) -> bool {
    let tag = Some(element.tag_name.as_str());
    match pc {
        PseudoClass::Root => tree.document_element() == Some(node_id),

        PseudoClass::FirstChild => sibling_index(tree, node_id, false, None) == 1,
        PseudoClass::LastChild => sibling_index(tree, node_id, true, None) == 1,
        PseudoClass::OnlyChild => {
            sibling_index(tree, node_id, false, None) == 1
                && sibling_index(tree, node_id, true, None) == 1
        }
        PseudoClass::FirstOfType => sibling_index(tree, node_id, false, tag) == 1,
        PseudoClass::LastOfType => sibling_index(tree, node_id, true, tag) == 1,
        PseudoClass::OnlyOfType => {
            sibling_index(tree, node_id, false, tag) == 1
                && sibling_index(tree, node_id, true, tag) == 1
        }
        PseudoClass::NthChild(nth) => nth.matches(sibling_index(tree, node_id, false, None)),
        PseudoClass::NthLastChild(nth) => nth.matches(sibling_index(tree, node_id, true, None)),
        PseudoClass::NthOfType(nth) => nth.matches(sibling_index(tree, node_id, false, tag)),
        PseudoClass::NthLastOfType(nth) => nth.matches(sibling_index(tree, node_id, true, tag)),

        // "The :empty pseudo-class represents an element that has no children
        // except, optionally, document white space characters."
        PseudoClass::Empty => tree.children(node_id).iter().all(|&c| {
            match tree.get(c).map(|n| &n.node_type) {
                Some(NodeType::Text(t)) => t.trim().is_empty(),
                Some(NodeType::Element(e)) => e.generated,
                _ => true,
            }
        }),

        PseudoClass::Link => {
            matches!(element.tag_name.as_str(), "a" | "area")
                && element.attrs.contains_key("href")
        }

        // "The :lang pseudo-class ... matches if the element's content language
        // is equal to or a hyphen-separated prefix of the given tag"
        PseudoClass::Lang(wanted) => tree.language(node_id).is_some_and(|lang| {
            lang.eq_ignore_ascii_case(wanted)
                || lang
                    .to_ascii_lowercase()
                    .starts_with(&format!("{}-", wanted.to_ascii_lowercase()))
        }),

        PseudoClass::Not(inner) => !compound_matches_in_tree(inner, tree, node_id),

        PseudoClass::Disabled => element.attrs.contains_key("disabled"),
        PseudoClass::Enabled => {
            matches!(
                element.tag_name.as_str(),
                "input" | "button" | "select" | "textarea" | "option" | "fieldset"
            ) && !element.attrs.contains_key("disabled")
        }
        PseudoClass::Checked => {
            element.attrs.contains_key("checked") || element.attrs.contains_key("selected")
        }
    }
}

impl ComplexSelector {
    /// [§ 17 Calculating Specificity](https://www.w3.org/TR/selectors-4/#specificity-rules)
    #[must_use]
    pub fn calculate_specificity(&self) -> Specificity {
        std::iter::once(&self.subject)
            .chain(self.combinators.iter().map(|(_, c)| c))
            .map(calculate_compound_specificity)
            .fold(Specificity::default(), |acc, s| {
                Specificity(acc.0 + s.0, acc.1 + s.1, acc.2 + s.2)
            })
    }
}

fn calculate_compound_specificity(compound: &CompoundSelector) -> Specificity {
    let mut spec = Specificity::default();

    for simple in &compound.simple_selectors {
        match simple {
            SimpleSelector::Id(_) => spec.0 += 1,

            // "The specificity of a :not() pseudo-class is replaced by the
            // specificity of the most specific complex selector in its
            // selector list argument."
            SimpleSelector::PseudoClass(PseudoClass::Not(inner)) => {
                let inner = calculate_compound_specificity(inner);
                spec = Specificity(spec.0 + inner.0, spec.1 + inner.1, spec.2 + inner.2);
            }

            SimpleSelector::Class(_)
            | SimpleSelector::PseudoClass(_)
            | SimpleSelector::Attribute(_)
            | SimpleSelector::NeverMatch => spec.1 += 1,

            SimpleSelector::Type(_) => spec.2 += 1,

            SimpleSelector::Universal => {}
        }
    }

    spec
}

impl SimpleSelector {
    /// Match a tree-independent simple selector against an element.
    /// Pseudo-classes need tree context and never match here.
    #[must_use]
    pub fn matches(&self, element: &ElementData) -> bool {
        match self {
            Self::Type(name) => element.tag_name.eq_ignore_ascii_case(name),
            Self::Class(class_name) => element.has_class(class_name),
            Self::Id(id) => element.id() == Some(id.as_str()),
            Self::Universal => true,
            Self::NeverMatch | Self::PseudoClass(_) => false,
            Self::Attribute(attr_sel) => attr_sel.matches(element),
        }
    }
}

impl AttributeSelector {
    fn matches(&self, element: &ElementData) -> bool {
        let value_of = |name: &str| element.attr(name);
        match self {
            Self::Exists(name) => value_of(name).is_some(),
            Self::Equals(name, val) => value_of(name) == Some(val.as_str()),
            Self::Includes(name, val) => {
                value_of(name).is_some_and(|v| v.split_ascii_whitespace().any(|w| w == val))
            }
            Self::DashMatch(name, val) => value_of(name).is_some_and(|v| {
                v == val || v.strip_prefix(val.as_str()).is_some_and(|r| r.starts_with('-'))
            }),
            Self::PrefixMatch(name, val) => {
                !val.is_empty() && value_of(name).is_some_and(|v| v.starts_with(val.as_str()))
            }
            Self::SuffixMatch(name, val) => {
                !val.is_empty() && value_of(name).is_some_and(|v| v.ends_with(val.as_str()))
            }
            Self::SubstringMatch(name, val) => {
                !val.is_empty() && value_of(name).is_some_and(|v| v.contains(val.as_str()))
            }
        }
    }
}

const fn is_ident_start_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

const fn is_ident_char(c: char) -> bool {
    is_ident_start_char(c) || c.is_ascii_digit() || c == '-'
}

/// Hand-written selector parser over the characters of one selector.
struct SelectorParser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl SelectorParser<'_> {
    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while self.chars.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            let _ = self.chars.next();
            skipped = true;
        }
        skipped
    }

    fn ident(&mut self) -> String {
        let mut out = String::new();
        while let Some(&c) = self.chars.peek() {
            if c == '\\' {
                let _ = self.chars.next();
                if let Some(escaped) = self.chars.next() {
                    out.push(escaped);
                }
            } else if is_ident_char(c) {
                out.push(c);
                let _ = self.chars.next();
            } else {
                break;
            }
        }
        out
    }

    /// Text up to the matching `)`, consuming it.
    fn parenthesized(&mut self) -> Option<String> {
        let mut depth = 1u32;
        let mut out = String::new();
        for c in self.chars.by_ref() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(out);
                    }
                }
                _ => {}
            }
            out.push(c);
        }
        None
    }

    fn attr_value(&mut self) -> Option<String> {
        let _ = self.skip_whitespace();
        match self.chars.peek().copied() {
            Some(q @ ('"' | '\'')) => {
                let _ = self.chars.next();
                let mut val = String::new();
                while let Some(c) = self.chars.next() {
                    if c == q {
                        return Some(val);
                    }
                    if c == '\\' {
                        if let Some(escaped) = self.chars.next() {
                            val.push(escaped);
                        }
                    } else {
                        val.push(c);
                    }
                }
                None
            }
            Some(_) => {
                let val = self.ident();
                (!val.is_empty()).then_some(val)
            }
            None => None,
        }
    }

    /// `[` has been consumed.
    fn attribute(&mut self) -> Result<AttributeSelector, SelectorError> {
        let _ = self.skip_whitespace();
        let name = self.ident().to_ascii_lowercase();
        if name.is_empty() {
            return Err(SelectorError::BadAttribute);
        }
        let _ = self.skip_whitespace();

        let op = match self.chars.next() {
            Some(']') => return Ok(AttributeSelector::Exists(name)),
            Some('=') => '=',
            Some(op @ ('~' | '|' | '^' | '$' | '*')) => {
                if self.chars.next() != Some('=') {
                    return Err(SelectorError::BadAttribute);
                }
                op
            }
            _ => return Err(SelectorError::BadAttribute),
        };

        let val = self.attr_value().ok_or(SelectorError::BadAttribute)?;
        let _ = self.skip_whitespace();
        // Case-sensitivity flags are accepted and ignored.
        if self.chars.peek().is_some_and(|&c| c == 'i' || c == 's' || c == 'I' || c == 'S') {
            let _ = self.chars.next();
            let _ = self.skip_whitespace();
        }
        if self.chars.next() != Some(']') {
            return Err(SelectorError::BadAttribute);
        }

        Ok(match op {
            '=' => AttributeSelector::Equals(name, val),
            '~' => AttributeSelector::Includes(name, val),
            '|' => AttributeSelector::DashMatch(name, val),
            '^' => AttributeSelector::PrefixMatch(name, val),
            '$' => AttributeSelector::SuffixMatch(name, val),
            _ => AttributeSelector::SubstringMatch(name, val),
        })
    }

    /// `:` has been consumed. Returns a simple selector or a pseudo-element.
    fn pseudo(&mut self) -> Result<Result<SimpleSelector, PseudoElement>, SelectorError> {
        let double_colon = self.chars.peek() == Some(&':');
        if double_colon {
            let _ = self.chars.next();
        }
        let name = self.ident().to_ascii_lowercase();
        if name.is_empty() {
            return Err(SelectorError::BadPseudo(String::new()));
        }
        let argument = if self.chars.peek() == Some(&'(') {
            let _ = self.chars.next();
            Some(
                self.parenthesized()
                    .ok_or_else(|| SelectorError::BadPseudo(name.clone()))?,
            )
        } else {
            None
        };

        // [CSS Pseudo-Elements § 2](https://www.w3.org/TR/css-pseudo-4/)
        // "For compatibility with existing style sheets, user agents must also
        // accept the previous one-colon notation for pseudo-elements
        // introduced in CSS levels 1 and 2 (namely, :first-line,
        // :first-letter, :before, and :after)."
        match (name.as_str(), double_colon) {
            ("before", _) => return Ok(Err(PseudoElement::Before)),
            ("after", _) => return Ok(Err(PseudoElement::After)),
            ("first-line" | "first-letter", _) | (_, true) => {
                return Ok(Err(PseudoElement::Unsupported));
            }
            _ => {}
        }

        let bad = || SelectorError::BadPseudo(name.clone());
        let nth = |arg: &Option<String>| arg.as_deref().and_then(Nth::parse).ok_or_else(bad);

        let pc = match name.as_str() {
            "root" => PseudoClass::Root,
            "first-child" => PseudoClass::FirstChild,
            "last-child" => PseudoClass::LastChild,
            "only-child" => PseudoClass::OnlyChild,
            "first-of-type" => PseudoClass::FirstOfType,
            "last-of-type" => PseudoClass::LastOfType,
            "only-of-type" => PseudoClass::OnlyOfType,
            "nth-child" => PseudoClass::NthChild(nth(&argument)?),
            "nth-last-child" => PseudoClass::NthLastChild(nth(&argument)?),
            "nth-of-type" => PseudoClass::NthOfType(nth(&argument)?),
            "nth-last-of-type" => PseudoClass::NthLastOfType(nth(&argument)?),
            "empty" => PseudoClass::Empty,
            "link" | "any-link" => PseudoClass::Link,
            "lang" => PseudoClass::Lang(
                argument
                    .as_deref()
                    .map(|a| a.trim().trim_matches(['"', '\'']).to_string())
                    .filter(|a| !a.is_empty())
                    .ok_or_else(bad)?,
            ),
            "not" => {
                let inner = argument.as_deref().ok_or_else(bad)?;
                let parsed = parse_selector(inner).map_err(|_| bad())?;
                if !parsed.is_simple() || parsed.pseudo_element.is_some() {
                    return Err(bad());
                }
                PseudoClass::Not(Box::new(parsed.complex.subject))
            }
            "disabled" => PseudoClass::Disabled,
            "enabled" => PseudoClass::Enabled,
            "checked" => PseudoClass::Checked,
            // Interactive and unknown pseudo-classes.
            _ => return Ok(Ok(SimpleSelector::NeverMatch)),
        };
        Ok(Ok(SimpleSelector::PseudoClass(pc)))
    }
}

/// Parse one complex selector (no commas).
///
/// # Errors
///
/// Returns a [`SelectorError`] describing the first syntax problem.
pub fn parse_selector(raw: &str) -> Result<ParsedSelector, SelectorError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SelectorError::Empty);
    }

    let mut parser = SelectorParser {
        chars: trimmed.chars().peekable(),
    };
    let mut compounds: Vec<CompoundSelector> = Vec::new();
    let mut combinators_between: Vec<Combinator> = Vec::new();
    let mut current = CompoundSelector::default();
    let mut pseudo_element: Option<PseudoElement> = None;
    let mut pending: Option<Combinator> = None;

    loop {
        let saw_space = parser.skip_whitespace();
        let Some(&c) = parser.chars.peek() else { break };

        // STEP 1: Combinators end the current compound.
        let explicit = match c {
            '>' => Some(Combinator::Child),
            '+' => Some(Combinator::NextSibling),
            '~' => Some(Combinator::SubsequentSibling),
            _ => None,
        };
        if let Some(combinator) = explicit {
            let _ = parser.chars.next();
            let leading = current.simple_selectors.is_empty() && compounds.len() == combinators_between.len();
            if leading || pending.is_some() {
                return Err(SelectorError::DanglingCombinator(c));
            }
            pending = Some(combinator);
            continue;
        }
        if saw_space || pending.is_some() {
            if !current.simple_selectors.is_empty() {
                if pseudo_element.is_some() {
                    return Err(SelectorError::MisplacedPseudoElement);
                }
                compounds.push(std::mem::take(&mut current));
                combinators_between.push(pending.take().unwrap_or(Combinator::Descendant));
            } else if let Some(combinator) = pending.take() {
                combinators_between.push(combinator);
            }
        }

        // STEP 2: Simple selectors.
        if pseudo_element.is_some() {
            return Err(SelectorError::MisplacedPseudoElement);
        }
        let simple = match c {
            '*' => {
                let _ = parser.chars.next();
                SimpleSelector::Universal
            }
            '.' | '#' => {
                let _ = parser.chars.next();
                let name = parser.ident();
                if name.is_empty() {
                    return Err(SelectorError::Unexpected(c));
                }
                if c == '.' {
                    SimpleSelector::Class(name)
                } else {
                    SimpleSelector::Id(name)
                }
            }
            '[' => {
                let _ = parser.chars.next();
                SimpleSelector::Attribute(parser.attribute()?)
            }
            ':' => {
                let _ = parser.chars.next();
                match parser.pseudo()? {
                    Ok(simple) => simple,
                    Err(pseudo) => {
                        pseudo_element = Some(pseudo);
                        continue;
                    }
                }
            }
            c if is_ident_start_char(c) || c == '-' || c == '\\' => {
                SimpleSelector::Type(parser.ident().to_ascii_lowercase())
            }
            other => return Err(SelectorError::Unexpected(other)),
        };
        current.simple_selectors.push(simple);
    }

    if let Some(combinator) = pending {
        let symbol = match combinator {
            Combinator::Child => '>',
            Combinator::NextSibling => '+',
            Combinator::SubsequentSibling => '~',
            Combinator::Descendant => ' ',
        };
        return Err(SelectorError::DanglingCombinator(symbol));
    }

    // `::before` alone has an implied universal subject.
    let mut subject = current;
    if subject.simple_selectors.is_empty() {
        if pseudo_element.is_none() {
            return Err(SelectorError::Empty);
        }
        subject.simple_selectors.push(SimpleSelector::Universal);
    }

    let combinators = compounds
        .into_iter()
        .zip(combinators_between)
        .rev()
        .map(|(compound, combinator)| (combinator, compound))
        .collect();

    let complex = ComplexSelector {
        subject,
        combinators,
    };
    let mut specificity = complex.calculate_specificity();
    if pseudo_element.is_some() {
        specificity.2 += 1;
    }

    Ok(ParsedSelector {
        complex,
        pseudo_element,
        specificity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nth_microsyntax() {
        let odd = Nth::parse("odd").unwrap();
        assert!(odd.matches(1) && odd.matches(3) && !odd.matches(2));
        let third_on = Nth::parse("n+3").unwrap();
        assert!(!third_on.matches(2) && third_on.matches(3) && third_on.matches(10));
        let first_two = Nth::parse("-n + 2").unwrap();
        assert!(first_two.matches(1) && first_two.matches(2) && !first_two.matches(3));
        assert_eq!(Nth::parse("4"), Some(Nth { a: 0, b: 4 }));
        assert_eq!(Nth::parse("x"), None);
    }

    #[test]
    fn test_nth_extreme_offsets() {
        let low = Nth::parse("n-2147483648").unwrap();
        assert_eq!(low, Nth { a: 1, b: i32::MIN });
        assert!(low.matches(1) && low.matches(i32::MAX));
        let high = Nth::parse("-n+2147483647").unwrap();
        assert!(high.matches(1) && high.matches(i32::MAX));
        let step = Nth { a: i32::MIN, b: i32::MAX };
        assert!(step.matches(i32::MAX) && !step.matches(1));
        let reverse = Nth { a: -1, b: i32::MIN };
        assert!(!reverse.matches(1));
    }

    #[test]
    fn test_pseudo_element_specificity() {
        let selector = parse_selector("p.note::before").unwrap();
        assert_eq!(selector.pseudo_element, Some(PseudoElement::Before));
        assert_eq!(selector.specificity, Specificity(0, 1, 2));
    }

    #[test]
    fn test_pseudo_element_must_be_last() {
        assert_eq!(
            parse_selector("p::before span"),
            Err(SelectorError::MisplacedPseudoElement)
        );
    }

    #[test]
    fn test_not_takes_inner_specificity() {
        let selector = parse_selector("li:not(.done)").unwrap();
        assert_eq!(selector.specificity, Specificity(0, 1, 1));
    }
}
