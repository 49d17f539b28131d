//! Font family selection.
//!
//! [CSS Fonts § 5.2 Matching font styles](https://www.w3.org/TR/css-fonts-4/#font-style-matching)
//!
//! "For each family in the family list, if the family name is available
//! ... the user agent uses that family. Otherwise, the user agent moves on
//! to the next family in the list."
//!
//! Text runs record the selected family in their `font-family` property;
//! the renderer embeds or references whatever that names.

use std::collections::HashMap;

use quire_css::parser::split_top_level;
use quire_css::values::unquote;

/// Supplies the font families available to the renderer.
///
/// A provider may be shared by several converters, but each run resets it
/// first. A provider whose `reset` leaves cached selections behind is a
/// configuration fault detected at the start of the next run.
pub trait FontProvider: Send {
    /// Families this provider can supply, by canonical name.
    fn families(&self) -> Vec<String>;

    /// Pick the first available family of a CSS `font-family` list.
    /// Results are memoized until the next [`reset`](Self::reset).
    fn select(&mut self, family_list: &str) -> Option<String>;

    /// Number of memoized selections.
    fn cached_selections(&self) -> usize;

    /// Drop all per-run state.
    fn reset(&mut self);
}

/// Standard PDF base-14 families.
const STANDARD_FAMILIES: &[&str] = &["Courier", "Helvetica", "Symbol", "Times-Roman", "ZapfDingbats"];

/// Generic families and common system names mapped onto the standard set.
const ALIASES: &[(&str, &str)] = &[
    ("arial", "Helvetica"),
    ("courier new", "Courier"),
    ("cursive", "Times-Roman"),
    ("fantasy", "Helvetica"),
    ("monospace", "Courier"),
    ("sans-serif", "Helvetica"),
    ("serif", "Times-Roman"),
    ("system-ui", "Helvetica"),
    ("times", "Times-Roman"),
    ("times new roman", "Times-Roman"),
];

/// [`FontProvider`] over the standard PDF families.
#[derive(Debug, Default)]
pub struct BasicFontProvider {
    cache: HashMap<String, Option<String>>,
    default_family: Option<String>,
}

impl BasicFontProvider {
    /// Provider that falls back to nothing when no family matches.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that falls back to `family` when no listed family matches.
    #[must_use]
    pub fn with_default_family(family: impl Into<String>) -> Self {
        Self {
            default_family: Some(family.into()),
            ..Self::default()
        }
    }

    fn lookup(name: &str) -> Option<&'static str> {
        let lower = name.to_ascii_lowercase();
        STANDARD_FAMILIES
            .iter()
            .find(|f| f.eq_ignore_ascii_case(&lower))
            .copied()
            .or_else(|| ALIASES.iter().find(|(alias, _)| *alias == lower).map(|(_, f)| *f))
    }
}

impl FontProvider for BasicFontProvider {
    fn families(&self) -> Vec<String> {
        STANDARD_FAMILIES.iter().map(|f| (*f).to_string()).collect()
    }

    fn select(&mut self, family_list: &str) -> Option<String> {
        if let Some(hit) = self.cache.get(family_list) {
            return hit.clone();
        }
        let selected = split_top_level(family_list, ',')
            .into_iter()
            .map(|family| unquote(family.trim()))
            .find_map(|family| Self::lookup(&family))
            .map(str::to_string)
            .or_else(|| self.default_family.clone());
        log::trace!(target: "quire::fonts", "font-family {family_list:?} -> {selected:?}");
        let _ = self.cache.insert(family_list.to_string(), selected.clone());
        selected
    }

    fn cached_selections(&self) -> usize {
        self.cache.len()
    }

    fn reset(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_available_family_wins() {
        let mut fonts = BasicFontProvider::new();
        assert_eq!(fonts.select("\"Fancy Face\", Arial, serif").as_deref(), Some("Helvetica"));
        assert_eq!(fonts.select("monospace").as_deref(), Some("Courier"));
        assert_eq!(fonts.select("Unknown"), None);
        assert_eq!(fonts.cached_selections(), 3);
    }

    #[test]
    fn test_default_family_and_reset() {
        let mut fonts = BasicFontProvider::with_default_family("Times-Roman");
        assert_eq!(fonts.select("Unknown").as_deref(), Some("Times-Roman"));
        fonts.reset();
        assert_eq!(fonts.cached_selections(), 0);
    }
}
