//! Presentational hints.
//!
//! [HTML § 15.3 Non-CSS presentational hints](https://html.spec.whatwg.org/multipage/rendering.html#presentational-hints)
//!
//! "User agents are expected to use the attributes on HTML elements to
//! provide presentational hints. These are treated as author-level
//! declarations with zero specificity placed before all other author
//! style sheets."

use quire_dom::ElementData;

use crate::parser::Declaration;

/// Declarations implied by the presentational attributes of `element`.
#[must_use]
pub fn presentational_hints(element: &ElementData) -> Vec<Declaration> {
    let mut hints = Vec::new();
    let tag = element.tag_name.as_str();

    // [§ 15.3.3 Flow content] "align" on block elements maps to text-align.
    if let Some(align) = element.attr("align").map(str::to_ascii_lowercase) {
        match tag {
            "table" => match align.as_str() {
                "left" | "right" => hints.push(Declaration::new("float", align)),
                "center" => {
                    hints.push(Declaration::new("margin-left", "auto"));
                    hints.push(Declaration::new("margin-right", "auto"));
                }
                _ => {}
            },
            "img" => {
                if matches!(align.as_str(), "left" | "right") {
                    hints.push(Declaration::new("float", align));
                }
            }
            "p" | "div" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "td" | "th" | "tr" | "caption"
            | "thead" | "tbody" | "tfoot" => {
                let value = match align.as_str() {
                    "middle" | "center" => "center",
                    other => other,
                };
                hints.push(Declaration::new("text-align", value));
            }
            _ => {}
        }
    }

    // [§ 15.3.10 Tables] "valign" maps to vertical-align.
    if let Some(valign) = element.attr("valign")
        && matches!(tag, "td" | "th" | "tr" | "thead" | "tbody" | "tfoot")
    {
        hints.push(Declaration::new("vertical-align", valign.to_ascii_lowercase()));
    }

    if let Some(bgcolor) = element.attr("bgcolor")
        && matches!(tag, "body" | "table" | "tr" | "td" | "th" | "thead" | "tbody" | "tfoot")
    {
        hints.push(Declaration::new("background-color", legacy_color(bgcolor)));
    }

    // [§ 15.3.4 Phrasing content] "The font element is expected to override
    // the color of any element..."
    if tag == "font" {
        if let Some(color) = element.attr("color") {
            hints.push(Declaration::new("color", legacy_color(color)));
        }
        if let Some(face) = element.attr("face") {
            hints.push(Declaration::new("font-family", face));
        }
        if let Some(size) = element.attr("size").and_then(legacy_font_size) {
            hints.push(Declaration::new("font-size", size));
        }
    }

    if matches!(tag, "img" | "table" | "td" | "th" | "hr" | "col" | "iframe" | "video" | "canvas") {
        for (attr, property) in [("width", "width"), ("height", "height")] {
            if let Some(value) = element.attr(attr).and_then(dimension) {
                hints.push(Declaration::new(property, value));
            }
        }
    }

    // [§ 15.3.10 Tables] "table[border]" sets a border on the table and,
    // when non-zero, on its cells' outer edges.
    if matches!(tag, "table" | "img")
        && let Some(border) = element.attr("border")
    {
        let width = border.trim().parse::<u32>().unwrap_or(1);
        if width == 0 {
            hints.push(Declaration::new("border-style", "none"));
        } else {
            hints.push(Declaration::new("border", format!("{width}px solid")));
        }
    }

    if matches!(tag, "td" | "th") && element.attr("nowrap").is_some() {
        hints.push(Declaration::new("white-space", "nowrap"));
    }

    // [§ 15.3.8 Lists] "ol[type]" and "ul[type]" map to list-style-type.
    if let Some(kind) = element.attr("type")
        && matches!(tag, "ol" | "ul" | "li")
        && let Some(style) = list_type(kind)
    {
        hints.push(Declaration::new("list-style-type", style));
    }

    // [§ 15.3.5 Bidirectional text] "dir" sets direction.
    if let Some(dir) = element.attr("dir").map(str::to_ascii_lowercase)
        && matches!(dir.as_str(), "ltr" | "rtl")
    {
        hints.push(Declaration::new("direction", dir));
    }

    hints
}

/// [§ 2.3.6 Rules for parsing a legacy colour value](https://html.spec.whatwg.org/multipage/common-microsyntaxes.html#rules-for-parsing-a-legacy-colour-value)
///
/// Only the common case is handled: six hex digits without the `#`.
fn legacy_color(value: &str) -> String {
    let value = value.trim();
    if value.len() == 6 && value.chars().all(|c| c.is_ascii_hexdigit()) {
        format!("#{value}")
    } else {
        value.to_string()
    }
}

/// [§ 2.3.4.3 Rules for parsing dimension values](https://html.spec.whatwg.org/multipage/common-microsyntaxes.html#rules-for-parsing-dimension-values)
fn dimension(value: &str) -> Option<String> {
    let value = value.trim();
    let digits: String = value
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.is_empty() {
        return None;
    }
    let percent = value[digits.len()..].starts_with('%');
    Some(if percent { format!("{digits}%") } else { format!("{digits}px") })
}

/// [§ 15.3.4 Phrasing content] `<font size>` maps 1..7 to keyword sizes;
/// `+n`/`-n` are relative to 3.
fn legacy_font_size(value: &str) -> Option<&'static str> {
    let value = value.trim();
    let number: i32 = value.trim_start_matches('+').parse().ok()?;
    let level = if value.starts_with('+') || value.starts_with('-') {
        3 + number
    } else {
        number
    };
    Some(match level.clamp(1, 7) {
        1 => "x-small",
        2 => "small",
        3 => "medium",
        4 => "large",
        5 => "x-large",
        _ => "xx-large",
    })
}

/// [§ 15.3.8 Lists]
fn list_type(value: &str) -> Option<&'static str> {
    Some(match value.trim() {
        "1" => "decimal",
        "a" => "lower-alpha",
        "A" => "upper-alpha",
        "i" => "lower-roman",
        "I" => "upper-roman",
        other => match other.to_ascii_lowercase().as_str() {
            "disc" => "disc",
            "circle" => "circle",
            "square" => "square",
            "none" => "none",
            _ => return None,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hint(element: &ElementData, name: &str) -> Option<String> {
        presentational_hints(element)
            .into_iter()
            .find(|d| d.name == name)
            .map(|d| d.value)
    }

    #[test]
    fn test_align_on_paragraph() {
        let p = ElementData::new("p").with_attr("align", "CENTER");
        assert_eq!(hint(&p, "text-align").as_deref(), Some("center"));
    }

    #[test]
    fn test_table_attributes() {
        let table = ElementData::new("table")
            .with_attr("bgcolor", "ff0000")
            .with_attr("width", "50%")
            .with_attr("border", "2");
        assert_eq!(hint(&table, "background-color").as_deref(), Some("#ff0000"));
        assert_eq!(hint(&table, "width").as_deref(), Some("50%"));
        assert_eq!(hint(&table, "border").as_deref(), Some("2px solid"));
    }

    #[test]
    fn test_font_element() {
        let font = ElementData::new("font")
            .with_attr("color", "red")
            .with_attr("size", "+2");
        assert_eq!(hint(&font, "color").as_deref(), Some("red"));
        assert_eq!(hint(&font, "font-size").as_deref(), Some("x-large"));
    }

    #[test]
    fn test_ordered_list_type() {
        let ol = ElementData::new("ol").with_attr("type", "I");
        assert_eq!(hint(&ol, "list-style-type").as_deref(), Some("upper-roman"));
    }

    #[test]
    fn test_plain_elements_have_no_hints() {
        assert!(presentational_hints(&ElementData::new("span").with_attr("align", "left")).is_empty());
    }
}
