//! Property schema.
//!
//! [CSS Cascading § 7 Defaulting](https://www.w3.org/TR/css-cascade-4/#defaulting)
//!
//! Every property the cascade knows about has a name, an inherited flag,
//! an initial value and a value grammar. Anything else passes through the
//! cascade flagged as unrecognized.

use crate::values::{
    canonical_color, canonicalize, function_parts, is_integer, is_length, is_number, is_string,
    split_components, unquote,
};
use crate::parser::split_top_level;

/// The value grammar a property accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// One keyword from the list.
    Keyword(&'static [&'static str]),
    /// A length (and percentage, if allowed) or one of the keywords.
    Length {
        /// Negative lengths allowed.
        negative: bool,
        /// Percentages allowed.
        percent: bool,
        /// Extra keyword values.
        keywords: &'static [&'static str],
    },
    /// A color.
    Color,
    /// `font-family`: comma-separated family names.
    FontFamily,
    /// `font-weight`: keywords or numbers in `1..=1000`.
    FontWeight,
    /// `line-height`: `normal`, a number, a length or a percentage.
    LineHeight,
    /// `text-decoration` line keywords, optionally with style and color.
    TextDecoration,
    /// `content` list.
    Content,
    /// `counter-reset` / `counter-increment`.
    CounterList,
}

/// One entry in the property schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDef {
    /// Property name.
    pub name: &'static str,
    /// Whether the property inherits by default.
    pub inherited: bool,
    /// Initial value, in canonical form.
    pub initial: &'static str,
    /// Value grammar.
    pub kind: ValueKind,
}

const fn keyword(
    name: &'static str,
    inherited: bool,
    initial: &'static str,
    keywords: &'static [&'static str],
) -> PropertyDef {
    PropertyDef {
        name,
        inherited,
        initial,
        kind: ValueKind::Keyword(keywords),
    }
}

const fn length(
    name: &'static str,
    initial: &'static str,
    negative: bool,
    keywords: &'static [&'static str],
) -> PropertyDef {
    PropertyDef {
        name,
        inherited: false,
        initial,
        kind: ValueKind::Length {
            negative,
            percent: true,
            keywords,
        },
    }
}

const fn other(name: &'static str, inherited: bool, initial: &'static str, kind: ValueKind) -> PropertyDef {
    PropertyDef {
        name,
        inherited,
        initial,
        kind,
    }
}

/// [CSS Display § 2](https://www.w3.org/TR/css-display-3/#the-display-properties)
pub const DISPLAY_KEYWORDS: &[&str] = &[
    "inline", "block", "inline-block", "list-item", "table", "inline-table", "table-row-group",
    "table-header-group", "table-footer-group", "table-row", "table-column-group",
    "table-column", "table-cell", "table-caption", "flex", "inline-flex", "grid",
    "inline-grid", "flow-root", "contents", "run-in", "none",
];

/// [CSS Backgrounds § 3.2](https://www.w3.org/TR/css-backgrounds-3/#border-style)
pub const BORDER_STYLES: &[&str] = &[
    "none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset", "outset",
];

/// [CSS Backgrounds § 3.3](https://www.w3.org/TR/css-backgrounds-3/#border-width)
pub const BORDER_WIDTH_KEYWORDS: &[&str] = &["thin", "medium", "thick"];

/// [CSS Lists § 4](https://www.w3.org/TR/css-lists-3/#text-markers)
pub const LIST_STYLE_TYPES: &[&str] = &[
    "disc", "circle", "square", "decimal", "decimal-leading-zero", "lower-roman",
    "upper-roman", "lower-alpha", "upper-alpha", "lower-latin", "upper-latin", "lower-greek",
    "none",
];

/// [CSS Fonts § 2.3](https://www.w3.org/TR/css-fonts-4/#font-style-prop)
pub const FONT_STYLES: &[&str] = &["normal", "italic", "oblique"];

/// [CSS Fonts § 2.5](https://www.w3.org/TR/css-fonts-4/#font-size-prop)
pub const FONT_SIZE_KEYWORDS: &[&str] = &[
    "xx-small", "x-small", "small", "medium", "large", "x-large", "xx-large", "larger",
    "smaller",
];

const MARGIN_KEYWORDS: &[&str] = &["auto"];
const NO_KEYWORDS: &[&str] = &[];
const SIZE_KEYWORDS: &[&str] = &["auto"];
const BREAK_BETWEEN: &[&str] = &[
    "auto", "avoid", "always", "all", "avoid-page", "page", "left", "right", "recto", "verso",
    "avoid-column", "column",
];
const BREAK_INSIDE: &[&str] = &["auto", "avoid", "avoid-page", "avoid-column"];
const VERTICAL_ALIGN: &[&str] = &[
    "baseline", "sub", "super", "text-top", "text-bottom", "middle", "top", "bottom",
];

/// The property schema, sorted by name.
static SCHEMA: &[PropertyDef] = &[
    other("background-color", false, "transparent", ValueKind::Color),
    other("border-bottom-color", false, "currentcolor", ValueKind::Color),
    keyword("border-bottom-style", false, "none", BORDER_STYLES),
    length("border-bottom-width", "medium", false, BORDER_WIDTH_KEYWORDS),
    keyword("border-collapse", true, "separate", &["separate", "collapse"]),
    other("border-left-color", false, "currentcolor", ValueKind::Color),
    keyword("border-left-style", false, "none", BORDER_STYLES),
    length("border-left-width", "medium", false, BORDER_WIDTH_KEYWORDS),
    other("border-right-color", false, "currentcolor", ValueKind::Color),
    keyword("border-right-style", false, "none", BORDER_STYLES),
    length("border-right-width", "medium", false, BORDER_WIDTH_KEYWORDS),
    other("border-top-color", false, "currentcolor", ValueKind::Color),
    keyword("border-top-style", false, "none", BORDER_STYLES),
    length("border-top-width", "medium", false, BORDER_WIDTH_KEYWORDS),
    keyword("break-after", false, "auto", BREAK_BETWEEN),
    keyword("break-before", false, "auto", BREAK_BETWEEN),
    keyword("break-inside", false, "auto", BREAK_INSIDE),
    keyword("clear", false, "none", &["none", "left", "right", "both"]),
    other("color", true, "black", ValueKind::Color),
    other("content", false, "normal", ValueKind::Content),
    other("counter-increment", false, "none", ValueKind::CounterList),
    other("counter-reset", false, "none", ValueKind::CounterList),
    keyword("direction", true, "ltr", &["ltr", "rtl"]),
    keyword("display", false, "inline", DISPLAY_KEYWORDS),
    keyword("float", false, "none", &["none", "left", "right"]),
    other("font-family", true, "serif", ValueKind::FontFamily),
    PropertyDef {
        name: "font-size",
        inherited: true,
        initial: "medium",
        kind: ValueKind::Length {
            negative: false,
            percent: true,
            keywords: FONT_SIZE_KEYWORDS,
        },
    },
    keyword("font-style", true, "normal", FONT_STYLES),
    other("font-weight", true, "normal", ValueKind::FontWeight),
    length("height", "auto", false, SIZE_KEYWORDS),
    other("line-height", true, "normal", ValueKind::LineHeight),
    keyword("list-style-position", true, "outside", &["inside", "outside"]),
    keyword("list-style-type", true, "disc", LIST_STYLE_TYPES),
    length("margin-bottom", "0", true, MARGIN_KEYWORDS),
    length("margin-left", "0", true, MARGIN_KEYWORDS),
    length("margin-right", "0", true, MARGIN_KEYWORDS),
    length("margin-top", "0", true, MARGIN_KEYWORDS),
    length("padding-bottom", "0", false, NO_KEYWORDS),
    length("padding-left", "0", false, NO_KEYWORDS),
    length("padding-right", "0", false, NO_KEYWORDS),
    length("padding-top", "0", false, NO_KEYWORDS),
    keyword("text-align", true, "start", &["left", "right", "center", "justify", "start", "end"]),
    other("text-decoration", false, "none", ValueKind::TextDecoration),
    PropertyDef {
        name: "text-indent",
        inherited: true,
        initial: "0",
        kind: ValueKind::Length {
            negative: true,
            percent: true,
            keywords: NO_KEYWORDS,
        },
    },
    keyword("text-transform", true, "none", &["none", "capitalize", "uppercase", "lowercase"]),
    length("vertical-align", "baseline", true, VERTICAL_ALIGN),
    keyword("visibility", true, "visible", &["visible", "hidden", "collapse"]),
    keyword(
        "white-space",
        true,
        "normal",
        &["normal", "pre", "nowrap", "pre-wrap", "pre-line", "break-spaces"],
    ),
    length("width", "auto", false, SIZE_KEYWORDS),
];

/// Look up a property by (lowercase) name.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static PropertyDef> {
    SCHEMA
        .binary_search_by(|def| def.name.cmp(name))
        .ok()
        .map(|i| &SCHEMA[i])
}

/// All schema entries, sorted by name.
#[must_use]
pub fn properties() -> &'static [PropertyDef] {
    SCHEMA
}

impl PropertyDef {
    /// Validate `value` against this property's grammar and return its
    /// canonical form, or `None` if the value is malformed.
    #[must_use]
    pub fn validate(&self, value: &str) -> Option<String> {
        let lowered = canonicalize(value, true);
        let components = split_components(&lowered);
        if components.is_empty() {
            return None;
        }

        match self.kind {
            ValueKind::Keyword(keywords) => {
                (components.len() == 1 && keywords.contains(&components[0])).then_some(lowered)
            }
            ValueKind::Length {
                negative,
                percent,
                keywords,
            } => {
                let [single] = components.as_slice() else {
                    return None;
                };
                (keywords.contains(single) || is_length(single, negative, percent))
                    .then_some(lowered)
            }
            ValueKind::Color => {
                let [single] = components.as_slice() else {
                    return None;
                };
                canonical_color(single)
            }
            ValueKind::FontWeight => {
                let [single] = components.as_slice() else {
                    return None;
                };
                let numeric = single
                    .parse::<f64>()
                    .is_ok_and(|w| (1.0..=1000.0).contains(&w));
                (numeric || matches!(*single, "normal" | "bold" | "bolder" | "lighter"))
                    .then_some(lowered)
            }
            ValueKind::LineHeight => {
                let [single] = components.as_slice() else {
                    return None;
                };
                (*single == "normal" || is_number(single, false) || is_length(single, false, true))
                    .then_some(lowered)
            }
            ValueKind::TextDecoration => {
                const LINES: &[&str] = &["none", "underline", "overline", "line-through", "blink"];
                const STYLES: &[&str] = &["solid", "double", "dotted", "dashed", "wavy"];
                components
                    .iter()
                    .all(|c| LINES.contains(c) || STYLES.contains(c) || canonical_color(c).is_some())
                    .then_some(lowered)
            }
            ValueKind::FontFamily => canonical_font_family(value),
            ValueKind::Content => canonical_content(value),
            ValueKind::CounterList => canonical_counter_list(value),
        }
    }
}

/// [CSS Fonts § 2.1](https://www.w3.org/TR/css-fonts-4/#font-family-prop)
///
/// Family names keep their case; generic families are lowercased.
/// Unquoted multi-word names have their whitespace collapsed.
#[must_use]
pub fn canonical_font_family(value: &str) -> Option<String> {
    const GENERIC: &[&str] = &["serif", "sans-serif", "monospace", "cursive", "fantasy", "system-ui"];
    let mut families = Vec::new();
    for family in split_top_level(value, ',') {
        let family = family.trim();
        if is_string(family) {
            families.push(family.to_string());
            continue;
        }
        let words = split_components(family);
        if words.is_empty() || words.iter().any(|w| is_string(w) || w.contains('(')) {
            return None;
        }
        let joined = words.join(" ");
        let lower = joined.to_ascii_lowercase();
        families.push(if GENERIC.contains(&lower.as_str()) { lower } else { joined });
    }
    (!families.is_empty()).then(|| families.join(", "))
}

/// [CSS Generated Content § 2](https://www.w3.org/TR/css-content-3/#content-property)
fn canonical_content(value: &str) -> Option<String> {
    let canonical = canonicalize(value, false);
    let components = split_components(&canonical);
    if let [single] = components.as_slice() {
        let lower = single.to_ascii_lowercase();
        if lower == "normal" || lower == "none" {
            return Some(lower);
        }
    }

    let mut out = Vec::with_capacity(components.len());
    for component in components {
        if is_string(component) {
            out.push(component.to_string());
            continue;
        }
        let lower = component.to_ascii_lowercase();
        if matches!(
            lower.as_str(),
            "open-quote" | "close-quote" | "no-open-quote" | "no-close-quote"
        ) {
            out.push(lower);
            continue;
        }
        let (name, args) = function_parts(component)?;
        let args: Vec<&str> = split_top_level(args, ',').into_iter().map(str::trim).collect();
        let valid = match name.as_str() {
            "attr" => args.len() == 1 && !args[0].is_empty(),
            "counter" => {
                matches!(args.len(), 1 | 2)
                    && args.get(1).is_none_or(|s| LIST_STYLE_TYPES.contains(&s.to_ascii_lowercase().as_str()))
            }
            "counters" => {
                matches!(args.len(), 2 | 3)
                    && is_string(args[1])
                    && args.get(2).is_none_or(|s| LIST_STYLE_TYPES.contains(&s.to_ascii_lowercase().as_str()))
            }
            "url" => true,
            _ => false,
        };
        if !valid {
            return None;
        }
        // Counter names are case-sensitive; style names and function names are not.
        let args: Vec<String> = args
            .iter()
            .enumerate()
            .map(|(i, a)| {
                if name == "attr" {
                    a.to_ascii_lowercase()
                } else if i == 0 || is_string(a) || name == "url" {
                    (*a).to_string()
                } else {
                    a.to_ascii_lowercase()
                }
            })
            .collect();
        out.push(format!("{name}({})", args.join(", ")));
    }
    Some(out.join(" "))
}

/// [CSS Lists § 4.5](https://www.w3.org/TR/css-lists-3/#counter-properties)
///
/// `none | [ <counter-name> <integer>? ]+`
fn canonical_counter_list(value: &str) -> Option<String> {
    let canonical = canonicalize(value, false);
    let components = split_components(&canonical);
    if let [single] = components.as_slice()
        && single.eq_ignore_ascii_case("none")
    {
        return Some("none".to_string());
    }
    let mut iter = components.iter().peekable();
    let mut out = Vec::new();
    while let Some(name) = iter.next() {
        let valid_name = name
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '-')
            && !matches!(name.to_ascii_lowercase().as_str(), "none" | "inherit" | "initial" | "unset");
        if !valid_name {
            return None;
        }
        out.push((*name).to_string());
        if let Some(number) = iter.next_if(|c| is_integer(c)) {
            out.push((*number).to_string());
        }
    }
    (!out.is_empty()).then(|| out.join(" "))
}

/// Parse a counter list into `(name, value)` pairs, using `default` where
/// no integer follows a name.
#[must_use]
pub fn counter_pairs(value: &str, default: i64) -> Vec<(String, i64)> {
    let components = split_components(value);
    let mut pairs = Vec::new();
    let mut iter = components.iter().peekable();
    while let Some(name) = iter.next() {
        if name.eq_ignore_ascii_case("none") {
            continue;
        }
        let amount = iter
            .next_if(|c| is_integer(c))
            .and_then(|n| n.parse().ok())
            .unwrap_or(default);
        pairs.push((unquote(name), amount));
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_sorted() {
        assert!(SCHEMA.windows(2).all(|w| w[0].name < w[1].name));
    }

    #[test]
    fn test_lookup() {
        assert!(lookup("color").unwrap().inherited);
        assert!(!lookup("display").unwrap().inherited);
        assert_eq!(lookup("display").unwrap().initial, "inline");
        assert!(lookup("colour").is_none());
    }

    #[test]
    fn test_keyword_values_are_lowercased() {
        let display = lookup("display").unwrap();
        assert_eq!(display.validate("TABLE-Row").as_deref(), Some("table-row"));
        assert_eq!(display.validate("tabel"), None);
    }

    #[test]
    fn test_font_family_keeps_case() {
        let family = lookup("font-family").unwrap();
        assert_eq!(
            family.validate("Times   New Roman, 'DejaVu Serif', SERIF").as_deref(),
            Some("Times New Roman, 'DejaVu Serif', serif")
        );
    }

    #[test]
    fn test_content_values() {
        let content = lookup("content").unwrap();
        assert_eq!(
            content.validate("\"Ch. \" COUNTER(chapter, Upper-Roman) \": \"").as_deref(),
            Some("\"Ch. \" counter(chapter, upper-roman) \": \"")
        );
        assert_eq!(content.validate("attr(HREF)").as_deref(), Some("attr(href)"));
        assert_eq!(content.validate("NONE").as_deref(), Some("none"));
        assert_eq!(content.validate("bogus(1)"), None);
    }

    #[test]
    fn test_counter_lists() {
        let reset = lookup("counter-reset").unwrap();
        assert_eq!(reset.validate("chapter  section 2").as_deref(), Some("chapter section 2"));
        assert_eq!(reset.validate("3"), None);
        assert_eq!(
            counter_pairs("chapter section 2", 0),
            vec![("chapter".to_string(), 0), ("section".to_string(), 2)]
        );
    }
}
