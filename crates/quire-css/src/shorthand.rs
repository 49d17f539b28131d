//! Shorthand expansion.
//!
//! [CSS Cascading § 1.2 Shorthand Properties](https://www.w3.org/TR/css-cascade-4/#shorthand)
//!
//! "Some properties are shorthand properties, meaning that they allow
//! authors to specify the values of several properties with a single
//! property. A shorthand property sets all of its longhand sub-properties,
//! exactly as if expanded in place."
//!
//! Legacy aliases (`page-break-*`) are handled here too: they expand to
//! exactly one canonical longhand.

use crate::schema::{
    BORDER_STYLES, BORDER_WIDTH_KEYWORDS, FONT_SIZE_KEYWORDS, LIST_STYLE_TYPES, canonical_font_family,
    lookup,
};
use crate::values::{canonical_color, is_length, is_number, split_components};

const SIDES: [&str; 4] = ["top", "right", "bottom", "left"];

/// Longhands set by `shorthand`, or `None` if it is not a shorthand.
#[must_use]
pub fn longhands(shorthand: &str) -> Option<Vec<String>> {
    let sided = |prefix: &str, suffix: &str| {
        SIDES
            .iter()
            .map(|side| format!("{prefix}{side}{suffix}"))
            .collect::<Vec<_>>()
    };
    let side_border = |side: &str| {
        ["width", "style", "color"]
            .iter()
            .map(|part| format!("border-{side}-{part}"))
            .collect::<Vec<_>>()
    };

    let names = match shorthand {
        "margin" => sided("margin-", ""),
        "padding" => sided("padding-", ""),
        "border-width" => sided("border-", "-width"),
        "border-style" => sided("border-", "-style"),
        "border-color" => sided("border-", "-color"),
        "border" => SIDES.iter().flat_map(|side| side_border(side)).collect(),
        "border-top" | "border-right" | "border-bottom" | "border-left" => {
            side_border(&shorthand["border-".len()..])
        }
        "list-style" => vec!["list-style-type".into(), "list-style-position".into()],
        "font" => vec![
            "font-style".into(),
            "font-weight".into(),
            "font-size".into(),
            "line-height".into(),
            "font-family".into(),
        ],
        "background" => vec!["background-color".into()],
        "page-break-before" => vec!["break-before".into()],
        "page-break-after" => vec!["break-after".into()],
        "page-break-inside" => vec!["break-inside".into()],
        _ => return None,
    };
    Some(names)
}

/// Expand a shorthand into canonical longhand values.
///
/// Returns `None` when the value does not fit the shorthand's grammar.
/// Callers must check [`longhands`] first; non-shorthands return `None`.
#[must_use]
pub fn expand(shorthand: &str, value: &str) -> Option<Vec<(String, String)>> {
    match shorthand {
        "margin" | "padding" => expand_box(value, |side| format!("{shorthand}-{side}")),
        "border-width" | "border-style" | "border-color" => {
            let part = &shorthand["border-".len()..];
            expand_box(value, |side| format!("border-{side}-{part}"))
        }
        "border" => {
            let (width, style, color) = parse_border(value)?;
            Some(
                SIDES
                    .iter()
                    .flat_map(|side| border_side(side, &width, &style, &color))
                    .collect(),
            )
        }
        "border-top" | "border-right" | "border-bottom" | "border-left" => {
            let (width, style, color) = parse_border(value)?;
            Some(border_side(&shorthand["border-".len()..], &width, &style, &color))
        }
        "list-style" => expand_list_style(value),
        "font" => expand_font(value),
        "background" => expand_background(value),
        "page-break-before" | "page-break-after" => {
            let target = shorthand.trim_start_matches("page-");
            let lower = value.trim().to_ascii_lowercase();
            // [CSS Fragmentation § 3.4] "page-break-before: always" is an
            // alias of "break-before: page".
            let mapped = match lower.as_str() {
                "always" => "page",
                "auto" | "avoid" | "left" | "right" => lower.as_str(),
                _ => return None,
            };
            Some(vec![(target.to_string(), mapped.to_string())])
        }
        "page-break-inside" => {
            let lower = value.trim().to_ascii_lowercase();
            matches!(lower.as_str(), "auto" | "avoid")
                .then(|| vec![("break-inside".to_string(), lower)])
        }
        _ => None,
    }
}

/// [CSS Box § 6](https://www.w3.org/TR/css-box-4/#margin-shorthand)
///
/// "If there is only one component value, it applies to all sides. If
/// there are two values, the top and bottom are set to the first value and
/// the right and left are set to the second. If there are three values, the
/// top is set to the first value, the left and right are set to the second,
/// and the bottom is set to the third. If there are four values they apply
/// to the top, right, bottom, and left, respectively."
fn expand_box(value: &str, name_for: impl Fn(&str) -> String) -> Option<Vec<(String, String)>> {
    let components = split_components(value);
    let [top, right, bottom, left] = match components.as_slice() {
        [all] => [*all; 4],
        [vertical, horizontal] => [*vertical, *horizontal, *vertical, *horizontal],
        [top, horizontal, bottom] => [*top, *horizontal, *bottom, *horizontal],
        [top, right, bottom, left] => [*top, *right, *bottom, *left],
        _ => return None,
    };

    SIDES
        .iter()
        .zip([top, right, bottom, left])
        .map(|(side, component)| {
            let name = name_for(side);
            let canonical = lookup(&name)?.validate(component)?;
            Some((name, canonical))
        })
        .collect()
}

/// `<line-width> || <line-style> || <color>`, each optional, each at most once.
fn parse_border(value: &str) -> Option<(String, String, String)> {
    let mut width = None;
    let mut style = None;
    let mut color = None;

    for component in split_components(value) {
        let lower = component.to_ascii_lowercase();
        if style.is_none() && BORDER_STYLES.contains(&lower.as_str()) {
            style = Some(lower);
        } else if width.is_none()
            && (BORDER_WIDTH_KEYWORDS.contains(&lower.as_str()) || is_length(&lower, false, false))
        {
            width = Some(lower);
        } else if color.is_none()
            && let Some(canonical) = canonical_color(&lower)
        {
            color = Some(canonical);
        } else {
            return None;
        }
    }

    if width.is_none() && style.is_none() && color.is_none() {
        return None;
    }
    Some((
        width.unwrap_or_else(|| "medium".into()),
        style.unwrap_or_else(|| "none".into()),
        color.unwrap_or_else(|| "currentcolor".into()),
    ))
}

fn border_side(side: &str, width: &str, style: &str, color: &str) -> Vec<(String, String)> {
    vec![
        (format!("border-{side}-width"), width.to_string()),
        (format!("border-{side}-style"), style.to_string()),
        (format!("border-{side}-color"), color.to_string()),
    ]
}

/// [CSS Lists § 5](https://www.w3.org/TR/css-lists-3/#list-style-property)
///
/// Images are not supported; a `url()` component is accepted and dropped.
fn expand_list_style(value: &str) -> Option<Vec<(String, String)>> {
    let mut kind = None;
    let mut position = None;
    let mut none_count = 0;

    for component in split_components(value) {
        let lower = component.to_ascii_lowercase();
        match lower.as_str() {
            "none" => none_count += 1,
            "inside" | "outside" if position.is_none() => position = Some(lower),
            _ if lower.starts_with("url(") => {}
            other if kind.is_none() && LIST_STYLE_TYPES.contains(&other) => kind = Some(lower),
            _ => return None,
        }
    }

    // "none" sets list-style-type unless a type was already given, in which
    // case it refers to the image.
    if none_count > 2 || (none_count == 2 && kind.is_some()) {
        return None;
    }
    let kind = match (kind, none_count) {
        (Some(kind), _) => kind,
        (None, n) if n > 0 => "none".to_string(),
        (None, _) => "disc".to_string(),
    };
    Some(vec![
        ("list-style-type".into(), kind),
        ("list-style-position".into(), position.unwrap_or_else(|| "outside".into())),
    ])
}

/// [CSS Fonts § 2.8](https://www.w3.org/TR/css-fonts-4/#font-prop)
///
/// `[ <font-style> || <font-weight> || small-caps ]? <font-size> [ / <line-height> ]? <font-family>`
fn expand_font(value: &str) -> Option<Vec<(String, String)>> {
    let components = split_components(value);
    let mut style = None;
    let mut weight = None;
    let mut index = 0;

    // STEP 1: Optional style/weight/variant prefix.
    while let Some(component) = components.get(index) {
        let lower = component.to_ascii_lowercase();
        match lower.as_str() {
            "normal" | "small-caps" => {}
            "italic" | "oblique" if style.is_none() => style = Some(lower),
            "bold" | "bolder" | "lighter" if weight.is_none() => weight = Some(lower),
            numeric if weight.is_none() && is_number(numeric, false) && !numeric.contains('.') => {
                weight = Some(lower);
            }
            _ => break,
        }
        index += 1;
    }

    // STEP 2: Mandatory size with optional /line-height, written as
    // "12pt/1.5", "12pt / 1.5" or "12pt /1.5".
    let size_component = components.get(index)?.to_ascii_lowercase();
    index += 1;
    let (size, attached) = match size_component.split_once('/') {
        Some((size, lh)) => (size.to_string(), Some(lh.to_string())),
        None => (size_component, None),
    };
    if !(FONT_SIZE_KEYWORDS.contains(&size.as_str()) || is_length(&size, false, true)) {
        return None;
    }
    let line_height = match attached {
        Some(lh) if !lh.is_empty() => Some(lh),
        Some(_) => {
            let lh = components.get(index)?.to_ascii_lowercase();
            index += 1;
            Some(lh)
        }
        None => match components.get(index).map(|c| c.to_ascii_lowercase()) {
            Some(slash) if slash == "/" => {
                let lh = components.get(index + 1)?.to_ascii_lowercase();
                index += 2;
                Some(lh)
            }
            Some(slash) if slash.len() > 1 && slash.starts_with('/') => {
                index += 1;
                Some(slash[1..].to_string())
            }
            _ => None,
        },
    };
    let line_height = match line_height {
        Some(lh) => lookup("line-height")?.validate(&lh)?,
        None => "normal".to_string(),
    };

    // STEP 3: Everything left is the family list.
    let family = components.get(index..).filter(|rest| !rest.is_empty())?.join(" ");
    let family = canonical_font_family(&family)?;

    Some(vec![
        ("font-style".into(), style.unwrap_or_else(|| "normal".into())),
        ("font-weight".into(), weight.unwrap_or_else(|| "normal".into())),
        ("font-size".into(), size),
        ("line-height".into(), line_height),
        ("font-family".into(), family),
    ])
}

/// [CSS Backgrounds § 3.10](https://www.w3.org/TR/css-backgrounds-3/#background)
///
/// Only the color layer is kept.
fn expand_background(value: &str) -> Option<Vec<(String, String)>> {
    let components = split_components(value);
    if components.is_empty() {
        return None;
    }
    let colors: Vec<String> = components
        .iter()
        .filter(|c| !c.to_ascii_lowercase().starts_with("url("))
        .filter_map(|c| canonical_color(c))
        .collect();
    let color = match colors.as_slice() {
        [] => "transparent".to_string(),
        [color] => color.clone(),
        _ => return None,
    };
    Some(vec![("background-color".into(), color)])
}
