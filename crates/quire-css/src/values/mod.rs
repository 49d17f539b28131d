//! CSS value syntax per [CSS Values and Units Level 4](https://www.w3.org/TR/css-values-4/).
//!
//! Values stay textual. This module splits them into components, checks
//! them against the value types the property schema needs, and produces
//! the canonical text form stored in a resolved property map.

use std::fmt::Write as _;

/// [§ 6 Distance Units](https://www.w3.org/TR/css-values-4/#lengths)
///
/// Units accepted by [`is_length`].
const LENGTH_UNITS: &[&str] = &[
    "px", "pt", "pc", "cm", "mm", "q", "in", "em", "ex", "ch", "rem", "vw", "vh", "vmin", "vmax",
];

/// [CSS Color § 6.1 Named Colors](https://www.w3.org/TR/css-color-4/#named-colors)
const NAMED_COLORS: &[&str] = &[
    "aliceblue", "antiquewhite", "aqua", "aquamarine", "azure", "beige", "bisque", "black",
    "blanchedalmond", "blue", "blueviolet", "brown", "burlywood", "cadetblue", "chartreuse",
    "chocolate", "coral", "cornflowerblue", "cornsilk", "crimson", "cyan", "darkblue",
    "darkcyan", "darkgoldenrod", "darkgray", "darkgreen", "darkgrey", "darkkhaki",
    "darkmagenta", "darkolivegreen", "darkorange", "darkorchid", "darkred", "darksalmon",
    "darkseagreen", "darkslateblue", "darkslategray", "darkslategrey", "darkturquoise",
    "darkviolet", "deeppink", "deepskyblue", "dimgray", "dimgrey", "dodgerblue", "firebrick",
    "floralwhite", "forestgreen", "fuchsia", "gainsboro", "ghostwhite", "gold", "goldenrod",
    "gray", "green", "greenyellow", "grey", "honeydew", "hotpink", "indianred", "indigo",
    "ivory", "khaki", "lavender", "lavenderblush", "lawngreen", "lemonchiffon", "lightblue",
    "lightcoral", "lightcyan", "lightgoldenrodyellow", "lightgray", "lightgreen", "lightgrey",
    "lightpink", "lightsalmon", "lightseagreen", "lightskyblue", "lightslategray",
    "lightslategrey", "lightsteelblue", "lightyellow", "lime", "limegreen", "linen", "magenta",
    "maroon", "mediumaquamarine", "mediumblue", "mediumorchid", "mediumpurple",
    "mediumseagreen", "mediumslateblue", "mediumspringgreen", "mediumturquoise",
    "mediumvioletred", "midnightblue", "mintcream", "mistyrose", "moccasin", "navajowhite",
    "navy", "oldlace", "olive", "olivedrab", "orange", "orangered", "orchid", "palegoldenrod",
    "palegreen", "paleturquoise", "palevioletred", "papayawhip", "peachpuff", "peru", "pink",
    "plum", "powderblue", "purple", "rebeccapurple", "red", "rosybrown", "royalblue",
    "saddlebrown", "salmon", "sandybrown", "seagreen", "seashell", "sienna", "silver",
    "skyblue", "slateblue", "slategray", "slategrey", "snow", "springgreen", "steelblue", "tan",
    "teal", "thistle", "tomato", "turquoise", "violet", "wheat", "white", "whitesmoke",
    "yellow", "yellowgreen",
];

/// Split a value into whitespace-separated components, keeping quoted
/// strings and function arguments intact.
#[must_use]
pub fn split_components(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start: Option<usize> = None;

    for (i, c) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        let boundary = quote.is_none() && depth == 0 && c.is_whitespace();
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            _ => {}
        }
        match (boundary, start) {
            (true, Some(s)) => {
                parts.push(&value[s..i]);
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        parts.push(&value[s..]);
    }
    parts
}

/// Split a component into its numeric part and unit, e.g. `"1.5em"` into
/// `(1.5, "em")`.
#[must_use]
pub fn split_dimension(component: &str) -> Option<(f64, &str)> {
    let end = component
        .char_indices()
        .find(|&(i, c)| {
            !(c.is_ascii_digit() || c == '.' || ((c == '-' || c == '+') && i == 0))
        })
        .map_or(component.len(), |(i, _)| i);
    let number: f64 = component[..end].parse().ok()?;
    Some((number, &component[end..]))
}

/// [§ 5.2 Numbers](https://www.w3.org/TR/css-values-4/#numbers)
#[must_use]
pub fn is_number(component: &str, allow_negative: bool) -> bool {
    matches!(split_dimension(component), Some((n, "")) if allow_negative || n >= 0.0)
}

/// [§ 5.1 Integers](https://www.w3.org/TR/css-values-4/#integers)
#[must_use]
pub fn is_integer(component: &str) -> bool {
    component.parse::<i64>().is_ok()
}

/// [§ 6 Distance Units](https://www.w3.org/TR/css-values-4/#lengths)
///
/// "for zero lengths the unit identifier is optional"
#[must_use]
pub fn is_length(component: &str, allow_negative: bool, allow_percent: bool) -> bool {
    let Some((number, unit)) = split_dimension(component) else {
        return false;
    };
    if number < 0.0 && !allow_negative {
        return false;
    }
    match unit {
        "" => number == 0.0,
        "%" => allow_percent,
        unit => LENGTH_UNITS.iter().any(|u| unit.eq_ignore_ascii_case(u)),
    }
}

/// [CSS Color § 4 Color syntax](https://www.w3.org/TR/css-color-4/#color-syntax)
///
/// Validate a color and return its canonical form: lowercase, hex colors
/// expanded to six (or eight) digits, function arguments whitespace
/// collapsed. `currentcolor` is kept for the cascade to resolve.
#[must_use]
pub fn canonical_color(component: &str) -> Option<String> {
    let lower = component.trim().to_ascii_lowercase();

    if let Some(hex) = lower.strip_prefix('#') {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        // [§ 4.2.1] "The three-digit RGB notation (#RGB) is converted into
        // six-digit form (#RRGGBB) by replicating digits, not by adding zeros."
        return match hex.len() {
            3 | 4 => Some(hex.chars().fold(String::from("#"), |mut out, c| {
                out.push(c);
                out.push(c);
                out
            })),
            6 | 8 => Some(lower),
            _ => None,
        };
    }

    if lower == "transparent" || lower == "currentcolor" || NAMED_COLORS.binary_search(&lower.as_str()).is_ok() {
        return Some(lower);
    }

    let (function, args) = lower.split_once('(')?;
    let args = args.strip_suffix(')')?;
    if !matches!(function, "rgb" | "rgba" | "hsl" | "hsla") {
        return None;
    }
    let mut out = format!("{function}(");
    let pieces: Vec<String> = args
        .split(',')
        .map(|a| a.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();
    if pieces.iter().any(String::is_empty) || !(1..=4).contains(&pieces.len()) {
        return None;
    }
    let _ = write!(out, "{})", pieces.join(", "));
    Some(out)
}

/// Whether the component is a `"..."` or `'...'` string.
#[must_use]
pub fn is_string(component: &str) -> bool {
    let mut chars = component.chars();
    matches!((chars.next(), chars.next_back()), (Some(a), Some(b)) if a == b && (a == '"' || a == '\''))
        && component.len() >= 2
}

/// Strip the quotes from a string component and process escapes.
///
/// [CSS Syntax § 4.3.7 Consume an escaped code point](https://www.w3.org/TR/css-syntax-3/#consume-escaped-code-point)
///
/// Up to six hex digits name a code point (`\A` is a newline) and one
/// following space is consumed. Any other escaped character stands for
/// itself; an escaped newline is a line continuation.
#[must_use]
pub fn unquote(component: &str) -> String {
    let inner = if is_string(component) {
        &component[1..component.len() - 1]
    } else {
        component
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let mut hex = String::new();
        while hex.len() < 6 && chars.peek().is_some_and(char::is_ascii_hexdigit) {
            hex.extend(chars.next());
        }
        if hex.is_empty() {
            match chars.next() {
                Some('\n') | None => {}
                Some(other) => out.push(other),
            }
            continue;
        }
        let _ = chars.next_if(|c| *c == ' ');
        out.push(
            u32::from_str_radix(&hex, 16)
                .ok()
                .and_then(char::from_u32)
                .filter(|c| *c != '\0')
                .unwrap_or('\u{fffd}'),
        );
    }
    out
}

/// `name(args)` split into lowercase name and raw argument text.
#[must_use]
pub fn function_parts(component: &str) -> Option<(String, &str)> {
    let open = component.find('(')?;
    let args = component.get(open + 1..)?.strip_suffix(')')?;
    let name = &component[..open];
    (!name.is_empty()).then(|| (name.to_ascii_lowercase(), args))
}

/// [§ 3 Value Definition Syntax](https://www.w3.org/TR/css-values-4/#value-defs)
///
/// Canonical textual form: whitespace runs collapsed to one space, and
/// everything outside strings and `url()` lowercased when `lowercase` is
/// set. Canonicalizing twice yields the same text.
#[must_use]
pub fn canonicalize(value: &str, lowercase: bool) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value.trim();

    while let Some(c) = rest.chars().next() {
        // Quoted strings are copied verbatim.
        if c == '"' || c == '\'' {
            let end = string_end(rest, c);
            out.push_str(&rest[..end]);
            rest = &rest[end..];
            continue;
        }
        // url(...) contents are copied verbatim.
        if rest.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("url(")) {
            let close = rest.find(')');
            out.push_str("url(");
            out.push_str(rest[4..close.unwrap_or(rest.len())].trim());
            if let Some(close) = close {
                out.push(')');
                rest = &rest[close + 1..];
            } else {
                rest = "";
            }
            continue;
        }
        if c.is_whitespace() {
            let trimmed = rest.trim_start();
            // No space after '(' or ',' or before ')' / ','.
            let next = trimmed.chars().next();
            if !matches!(out.chars().last(), Some('(' | ',') | None)
                && !matches!(next, Some(')' | ','))
            {
                out.push(' ');
            }
            rest = trimmed;
            continue;
        }
        if c == ',' {
            out.push_str(", ");
            rest = rest[1..].trim_start();
            continue;
        }
        if lowercase {
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }
    out.trim_end().to_string()
}

/// Byte offset just past the string starting at the beginning of `text`.
fn string_end(text: &str, quote: char) -> usize {
    let mut escaped = false;
    for (i, c) in text.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return i + 1;
        }
    }
    text.len()
}
