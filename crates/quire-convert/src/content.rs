//! Text of generated content.
//!
//! [CSS Generated Content § 2](https://www.w3.org/TR/css-content-3/#content-property)
//!
//! The cascade only inserts `::before` / `::after` nodes; their text is
//! computed here, during the walk, so that counters and quote depth hold
//! the values they have at that point of the document.

use quire_common::{Diagnostic, DiagnosticTemplate};
use quire_css::parser::split_top_level;
use quire_css::values::{function_parts, is_string, split_components, unquote};
use quire_dom::ElementData;

use crate::context::ConversionContext;
use crate::counters::format_counter;

/// Evaluate a canonical `content` value for a node generated on
/// `originating`. Components that cannot be rendered as text are skipped
/// with an `UnsupportedContent` diagnostic.
pub fn evaluate(value: &str, originating: Option<&ElementData>, ctx: &mut ConversionContext) -> String {
    let mut out = String::new();
    if matches!(value, "none" | "normal") {
        return out;
    }

    for component in split_components(value) {
        if is_string(component) {
            out.push_str(&unquote(component));
            continue;
        }
        match component {
            // Quotes render as straight quotes: double outside, single nested.
            "open-quote" => {
                out.push(if ctx.quote_depth == 0 { '"' } else { '\'' });
                ctx.quote_depth += 1;
            }
            "close-quote" => {
                ctx.quote_depth = ctx.quote_depth.saturating_sub(1);
                out.push(if ctx.quote_depth == 0 { '"' } else { '\'' });
            }
            "no-open-quote" => ctx.quote_depth += 1,
            "no-close-quote" => ctx.quote_depth = ctx.quote_depth.saturating_sub(1),
            _ => match function_parts(component) {
                Some((name, args)) => {
                    let args: Vec<&str> = split_top_level(args, ',').into_iter().map(str::trim).collect();
                    match (name.as_str(), args.as_slice()) {
                        ("attr", [attr]) => {
                            out.push_str(originating.and_then(|e| e.attr(attr)).unwrap_or_default());
                        }
                        ("counter", [counter, rest @ ..]) => {
                            let style = rest.first().copied().unwrap_or("decimal");
                            out.push_str(&format_counter(ctx.counters.value(counter), style));
                        }
                        ("counters", [counter, separator, rest @ ..]) => {
                            let style = rest.first().copied().unwrap_or("decimal");
                            let joined: Vec<String> = ctx
                                .counters
                                .values(counter)
                                .into_iter()
                                .map(|v| format_counter(v, style))
                                .collect();
                            out.push_str(&joined.join(&unquote(separator)));
                        }
                        _ => unsupported(component, ctx),
                    }
                }
                None => unsupported(component, ctx),
            },
        }
    }
    out
}

fn unsupported(component: &str, ctx: &ConversionContext) {
    ctx.emit(Diagnostic::new(
        DiagnosticTemplate::UnsupportedContent,
        format!("content component '{component}' skipped"),
    ));
}
