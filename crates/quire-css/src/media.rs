//! Media queries.
//!
//! [Media Queries Level 4](https://www.w3.org/TR/mediaqueries-4/)
//!
//! Only media types and the `width` range features are evaluated. A query
//! using anything else does not match.

use serde::Serialize;
use strum_macros::{Display, EnumString};

use crate::parser::split_top_level;
use crate::values::split_dimension;

/// [§ 2.3 Media Types](https://www.w3.org/TR/mediaqueries-4/#media-types)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// "Matches printers, and devices intended to reproduce a printed display"
    #[default]
    Print,
    /// "Matches all devices that aren't matched by print."
    Screen,
}

/// The environment media queries are evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MediaContext {
    /// Output medium.
    pub media_type: MediaType,
    /// Viewport width in CSS pixels.
    pub viewport_width_px: f32,
}

impl Default for MediaContext {
    fn default() -> Self {
        // A4 portrait at 96dpi.
        Self {
            media_type: MediaType::Print,
            viewport_width_px: 794.0,
        }
    }
}

impl MediaContext {
    /// Create a context for `media_type` with the default viewport.
    #[must_use]
    pub fn new(media_type: MediaType) -> Self {
        Self {
            media_type,
            ..Self::default()
        }
    }

    /// [§ 3 Syntax](https://www.w3.org/TR/mediaqueries-4/#mq-syntax)
    ///
    /// "A media query list is a comma-separated list of media queries. ...
    /// The result of a media query list is true if any of its component
    /// media queries are true." An empty list is true.
    #[must_use]
    pub fn matches(&self, media_list: &str) -> bool {
        let queries = split_top_level(media_list, ',');
        queries.is_empty() || queries.iter().any(|q| self.matches_query(q))
    }

    fn matches_query(&self, query: &str) -> bool {
        let lower = query.trim().to_ascii_lowercase();
        let mut rest = lower.as_str();

        // STEP 1: Optional modifier.
        let negated = if let Some(r) = strip_word(rest, "not") {
            rest = r;
            true
        } else {
            if let Some(r) = strip_word(rest, "only") {
                rest = r;
            }
            false
        };

        // STEP 2: Optional media type.
        let mut result = true;
        if !rest.starts_with('(') {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            let media_type = &rest[..end];
            result = match media_type {
                "all" => true,
                other => other.parse::<MediaType>().is_ok_and(|t| t == self.media_type),
            };
            rest = rest[end..].trim_start();
            match strip_word(rest, "and") {
                Some(r) => rest = r,
                None if rest.is_empty() => return result != negated,
                // "A media query that does not match the grammar ... is
                // replaced by not all"
                None => return false,
            }
        }

        // STEP 3: `(feature) and (feature) ...`
        for condition in rest.split(" and ") {
            let condition = condition.trim();
            let Some(inner) = condition.strip_prefix('(').and_then(|c| c.strip_suffix(')')) else {
                return false;
            };
            match self.evaluate_feature(inner) {
                Some(matched) => result &= matched,
                None => return false,
            }
        }
        result != negated
    }

    /// [§ 4 Media Features](https://www.w3.org/TR/mediaqueries-4/#mq-features)
    fn evaluate_feature(&self, feature: &str) -> Option<bool> {
        let (name, value) = feature.split_once(':')?;
        let px = length_to_px(value.trim())?;
        let width = f64::from(self.viewport_width_px);
        match name.trim() {
            "min-width" => Some(width >= px),
            "max-width" => Some(width <= px),
            "width" => Some((width - px).abs() < f64::EPSILON),
            _ => None,
        }
    }
}

fn strip_word<'a>(text: &'a str, word: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(word)?;
    rest.starts_with(char::is_whitespace)
        .then(|| rest.trim_start())
}

/// [CSS Values § 6.2 Absolute lengths](https://www.w3.org/TR/css-values-4/#absolute-lengths)
///
/// `em` in media queries is relative to the initial font size (16px).
fn length_to_px(value: &str) -> Option<f64> {
    let (number, unit) = split_dimension(value)?;
    let factor = match unit {
        "px" => 1.0,
        "" if number == 0.0 => 1.0,
        "em" | "rem" => 16.0,
        "in" => 96.0,
        "cm" => 96.0 / 2.54,
        "mm" => 96.0 / 25.4,
        "pt" => 96.0 / 72.0,
        "pc" => 16.0,
        _ => return None,
    };
    Some(number * factor)
}
