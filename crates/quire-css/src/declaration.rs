//! Specified declarations.
//!
//! Raw parsed declarations are turned into longhand, validated,
//! canonical declarations exactly once, when a rule enters the store or an
//! inline style is first read. Problems are reported at that point, so a
//! declaration produces at most one diagnostic however many nodes it
//! applies to.

use quire_common::{Diagnostic, DiagnosticSink, DiagnosticTemplate};
use strum_macros::{Display, EnumString};

use crate::parser::Declaration;
use crate::schema::lookup;
use crate::shorthand::{expand, longhands};
use crate::values::canonicalize;

/// [CSS Cascading § 7.3 Explicit Defaulting](https://www.w3.org/TR/css-cascade-4/#defaulting-keywords)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CssWideKeyword {
    /// "the cascaded value of the property on the parent element"
    Inherit,
    /// "the property's initial value"
    Initial,
    /// `inherit` for inherited properties, `initial` otherwise.
    Unset,
}

/// The value side of a specified declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecifiedValue {
    /// A valid value in canonical form.
    Value(String),
    /// A CSS-wide keyword.
    CssWide(CssWideKeyword),
    /// A malformed value for a known property. Resolves to the initial value.
    Invalid,
    /// A value for a property outside the schema, canonicalized.
    Unrecognized(String),
}

/// One longhand declaration ready for the cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecifiedDeclaration {
    /// Longhand property name.
    pub name: String,
    /// Validated value.
    pub value: SpecifiedValue,
    /// Whether the declaration is `!important`.
    pub important: bool,
}

/// Expand and validate one parsed declaration.
///
/// Returns the longhand declarations plus the diagnostic template that
/// applies, if the declaration was unknown or malformed.
#[must_use]
pub fn specify(decl: &Declaration) -> (Vec<SpecifiedDeclaration>, Option<DiagnosticTemplate>) {
    let important = decl.important;
    let make = |name: &str, value: SpecifiedValue| SpecifiedDeclaration {
        name: name.to_string(),
        value,
        important,
    };
    let wide: Option<CssWideKeyword> = decl.value.trim().parse().ok();

    // STEP 1: Shorthands and legacy aliases.
    if let Some(names) = longhands(&decl.name) {
        if let Some(keyword) = wide {
            let out = names
                .iter()
                .map(|n| make(n, SpecifiedValue::CssWide(keyword)))
                .collect();
            return (out, None);
        }
        return match expand(&decl.name, &decl.value) {
            Some(pairs) => (
                pairs
                    .into_iter()
                    .map(|(n, v)| make(&n, SpecifiedValue::Value(v)))
                    .collect(),
                None,
            ),
            None => (
                names.iter().map(|n| make(n, SpecifiedValue::Invalid)).collect(),
                Some(DiagnosticTemplate::InvalidPropertyValue),
            ),
        };
    }

    // STEP 2: Longhands from the schema.
    if let Some(def) = lookup(&decl.name) {
        let (value, issue) = match (wide, def.validate(&decl.value)) {
            (Some(keyword), _) => (SpecifiedValue::CssWide(keyword), None),
            (None, Some(value)) => (SpecifiedValue::Value(value), None),
            (None, None) => (
                SpecifiedValue::Invalid,
                Some(DiagnosticTemplate::InvalidPropertyValue),
            ),
        };
        return (vec![make(def.name, value)], issue);
    }

    // STEP 3: Everything else passes through. Custom properties are
    // well-formed by definition and are not reported.
    let value = wide.map_or_else(
        || SpecifiedValue::Unrecognized(canonicalize(&decl.value, false)),
        SpecifiedValue::CssWide,
    );
    let issue = (!decl.name.starts_with("--")).then_some(DiagnosticTemplate::UnknownProperty);
    (vec![make(&decl.name, value)], issue)
}

/// Specify a whole declaration block, reporting problems to `sink`.
///
/// `context` names where the block came from (a selector, or the tag of an
/// element with a `style` attribute).
pub fn specify_block(
    declarations: &[Declaration],
    context: Option<&str>,
    sink: &dyn DiagnosticSink,
) -> Vec<SpecifiedDeclaration> {
    let mut out = Vec::with_capacity(declarations.len());
    for decl in declarations {
        let (specified, issue) = specify(decl);
        if let Some(template) = issue {
            let mut diagnostic = Diagnostic::new(template, format!("{}: {}", decl.name, decl.value));
            if let Some(context) = context {
                diagnostic = diagnostic.with_tag(context);
            }
            sink.emit(diagnostic);
        }
        out.extend(specified);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_property_passes_through() {
        let (out, issue) = specify(&Declaration::new("-x-frobnicate", "  Loud  "));
        assert_eq!(issue, Some(DiagnosticTemplate::UnknownProperty));
        assert_eq!(out[0].value, SpecifiedValue::Unrecognized("Loud".to_string()));
    }

    #[test]
    fn test_custom_property_is_not_reported() {
        let (_, issue) = specify(&Declaration::new("--accent", "red"));
        assert_eq!(issue, None);
    }

    #[test]
    fn test_invalid_shorthand_invalidates_all_longhands() {
        let (out, issue) = specify(&Declaration::new("margin", "1px 2px 3px 4px 5px"));
        assert_eq!(issue, Some(DiagnosticTemplate::InvalidPropertyValue));
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|d| d.value == SpecifiedValue::Invalid));
    }

    #[test]
    fn test_css_wide_keyword_on_shorthand() {
        let (out, issue) = specify(&Declaration::new("padding", "INHERIT"));
        assert_eq!(issue, None);
        assert!(
            out.iter()
                .all(|d| d.value == SpecifiedValue::CssWide(CssWideKeyword::Inherit))
        );
    }
}
