//! CSS counters and counter representations.
//!
//! [CSS Lists § 4 Automatic numbering](https://www.w3.org/TR/css-lists-3/#auto-numbering)
//!
//! "Counters are 'self-nesting'; instantiating a new counter on an element
//! which inherited an identically-named counter from its parent creates a
//! new counter of the same name, nested inside the existing counter."
//!
//! An instance created by an element is owned by the element's parent:
//! it stays visible to the element's following siblings and is popped
//! when the parent's frame is left.

use quire_dom::NodeId;

#[derive(Debug, Clone)]
struct Scope {
    owner: NodeId,
    name: String,
    value: i64,
}

/// Counter instances live during one conversion run.
#[derive(Debug, Clone, Default)]
pub struct CounterScopes {
    scopes: Vec<Scope>,
}

impl CounterScopes {
    /// No counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// [§ 4.1 counter-reset](https://www.w3.org/TR/css-lists-3/#counter-reset)
    ///
    /// Instantiate `name` on `owner` with `value`. An instance `owner`
    /// already holds is reset in place.
    pub fn reset(&mut self, owner: NodeId, name: &str, value: i64) {
        if let Some(scope) = self.scopes.iter_mut().rev().find(|s| s.name == name)
            && scope.owner == owner
        {
            scope.value = value;
            return;
        }
        self.scopes.push(Scope {
            owner,
            name: name.to_string(),
            value,
        });
    }

    /// [§ 4.2 counter-increment](https://www.w3.org/TR/css-lists-3/#propdef-counter-increment)
    ///
    /// "If there is not currently a counter of the given name on the
    /// element, the element instantiates a new counter of the given name
    /// with a starting value of 0 before setting or incrementing its value."
    pub fn increment(&mut self, owner: NodeId, name: &str, by: i64) {
        match self.scopes.iter_mut().rev().find(|s| s.name == name) {
            Some(scope) => scope.value = scope.value.saturating_add(by),
            None => self.reset(owner, name, by),
        }
    }

    /// Innermost value of `name`, 0 when no instance exists.
    #[must_use]
    pub fn value(&self, name: &str) -> i64 {
        self.scopes
            .iter()
            .rev()
            .find(|s| s.name == name)
            .map_or(0, |s| s.value)
    }

    /// Values of every nested instance of `name`, outermost first.
    #[must_use]
    pub fn values(&self, name: &str) -> Vec<i64> {
        let values: Vec<i64> = self.scopes.iter().filter(|s| s.name == name).map(|s| s.value).collect();
        if values.is_empty() { vec![0] } else { values }
    }

    /// Drop every instance created by `owner`.
    pub fn leave(&mut self, owner: NodeId) {
        while self.scopes.last().is_some_and(|s| s.owner == owner) {
            let _ = self.scopes.pop();
        }
    }

    /// Number of live instances.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

/// [CSS Counter Styles § 6 Simple predefined counter styles](https://www.w3.org/TR/css-counter-styles-3/#simple-numeric)
///
/// Representation of `value` in `style`. Styles whose range does not cover
/// the value fall back to `decimal`. Unknown styles are treated as
/// `decimal`.
#[must_use]
pub fn format_counter(value: i64, style: &str) -> String {
    match style {
        "none" => String::new(),
        "disc" => "\u{2022}".to_string(),
        "circle" => "\u{25e6}".to_string(),
        "square" => "\u{25aa}".to_string(),
        "decimal-leading-zero" if (-9..=9).contains(&value) => {
            let sign = if value < 0 { "-" } else { "" };
            format!("{sign}0{}", value.unsigned_abs())
        }
        "lower-roman" | "upper-roman" if (1..=3999).contains(&value) => {
            let roman = roman(value);
            if style == "lower-roman" { roman.to_ascii_lowercase() } else { roman }
        }
        "lower-alpha" | "lower-latin" if value >= 1 => alphabetic(value, &LATIN_LOWER),
        "upper-alpha" | "upper-latin" if value >= 1 => alphabetic(value, &LATIN_UPPER),
        "lower-greek" if value >= 1 => alphabetic(value, &GREEK_LOWER),
        _ => value.to_string(),
    }
}

const LATIN_LOWER: [char; 26] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't',
    'u', 'v', 'w', 'x', 'y', 'z',
];
const LATIN_UPPER: [char; 26] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T',
    'U', 'V', 'W', 'X', 'Y', 'Z',
];
const GREEK_LOWER: [char; 24] = [
    'α', 'β', 'γ', 'δ', 'ε', 'ζ', 'η', 'θ', 'ι', 'κ', 'λ', 'μ', 'ν', 'ξ', 'ο', 'π', 'ρ', 'σ', 'τ', 'υ',
    'φ', 'χ', 'ψ', 'ω',
];

/// [§ 3.1.2 alphabetic](https://www.w3.org/TR/css-counter-styles-3/#alphabetic-system)
///
/// Bijective base-N: 1 → a, 26 → z, 27 → aa.
fn alphabetic(value: i64, symbols: &[char]) -> String {
    let base = symbols.len() as u64;
    let mut n = value.unsigned_abs();
    let mut out = Vec::new();
    while n > 0 {
        n -= 1;
        #[allow(clippy::cast_possible_truncation)]
        out.push(symbols[(n % base) as usize]);
        n /= base;
    }
    out.iter().rev().collect()
}

/// [§ 3.1.3 additive](https://www.w3.org/TR/css-counter-styles-3/#additive-system), upper-case.
fn roman(value: i64) -> String {
    const TABLE: &[(i64, &str)] = &[
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut rest = value;
    let mut out = String::new();
    for &(weight, symbol) in TABLE {
        while rest >= weight {
            out.push_str(symbol);
            rest -= weight;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_counters() {
        let mut counters = CounterScopes::new();
        let (outer, inner) = (NodeId(1), NodeId(2));
        counters.reset(outer, "section", 0);
        counters.increment(outer, "section", 1);
        counters.increment(outer, "section", 1);
        counters.reset(inner, "section", 0);
        counters.increment(inner, "section", 1);
        assert_eq!(counters.values("section"), vec![2, 1]);
        counters.leave(inner);
        assert_eq!(counters.value("section"), 2);
        counters.leave(outer);
        assert_eq!(counters.depth(), 0);
        assert_eq!(counters.value("section"), 0);
    }

    #[test]
    fn test_sibling_reset_replaces_instance() {
        let mut counters = CounterScopes::new();
        counters.reset(NodeId(1), "item", 4);
        counters.reset(NodeId(1), "item", 0);
        assert_eq!(counters.values("item"), vec![0]);
    }

    #[test]
    fn test_increment_without_reset_instantiates() {
        let mut counters = CounterScopes::new();
        counters.increment(NodeId(3), "figure", 1);
        assert_eq!(counters.value("figure"), 1);
    }

    #[test]
    fn test_counter_styles() {
        assert_eq!(format_counter(4, "upper-roman"), "IV");
        assert_eq!(format_counter(1994, "lower-roman"), "mcmxciv");
        assert_eq!(format_counter(28, "lower-alpha"), "ab");
        assert_eq!(format_counter(2, "lower-greek"), "β");
        assert_eq!(format_counter(7, "decimal-leading-zero"), "07");
        assert_eq!(format_counter(0, "upper-alpha"), "0");
        assert_eq!(format_counter(3, "disc"), "\u{2022}");
        assert_eq!(format_counter(3, "none"), "");
    }
}
