//! Tag name → handler factory lookup.
//!
//! Registrations stack per tag: the last registration wins, and removing
//! it brings back whatever was registered before (the default handler,
//! for built-in tags). The first [`HandlerRegistry::create`] call locks
//! the registry for the rest of the run; every run works on its own
//! clone, which starts unlocked.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use quire_css::{Display, StyledNode};

use crate::context::ConversionContext;
use crate::error::RegistryError;
use crate::handlers::TagHandler;
use crate::handlers::block::{BlockContainer, Paragraph, RootContainer};
use crate::handlers::image::Image;
use crate::handlers::inline::{Inline, Link, Marker};
use crate::handlers::list::{List, ListItem};
use crate::handlers::table::{self, RowGroup, Table, TableCell, TableRow};

/// Builds the handler for one node.
pub type HandlerFactory = Arc<dyn Fn(&StyledNode<'_>, &mut ConversionContext) -> Box<dyn TagHandler> + Send + Sync>;

const ROOT_TAGS: &[&str] = &["html", "body"];

const PARAGRAPH_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "pre", "address", "dt", "figcaption", "listing", "plaintext", "xmp",
];

const BLOCK_TAGS: &[&str] = &[
    "div", "section", "article", "aside", "header", "footer", "nav", "main", "blockquote", "figure", "dl", "dd",
    "form", "fieldset", "center", "details", "summary", "hgroup", "search", "menu", "dir", "legend", "dialog",
];

const INLINE_TAGS: &[&str] = &[
    "span", "b", "strong", "i", "em", "u", "s", "strike", "del", "ins", "code", "small", "big", "sub", "sup",
    "label", "abbr", "acronym", "cite", "dfn", "q", "mark", "font", "kbd", "samp", "tt", "var", "time", "bdi",
    "bdo", "nobr", "::before", "::after",
];

/// Tags whose subtree is dropped when no handler claims them.
const METADATA_TAGS: &[&str] = &[
    "head", "title", "meta", "link", "script", "style", "noscript", "template", "base",
];

/// Whether `tag` belongs to the metadata category, whose subtrees never
/// render.
#[must_use]
pub fn is_metadata_tag(tag: &str) -> bool {
    METADATA_TAGS.contains(&tag)
}

/// [CSS Display § 2](https://www.w3.org/TR/css-display-3/#the-display-properties)
///
/// The tag that natively carries a routed display value. Nodes showing
/// one of these displays may be handled as if they had this tag.
const fn routed_tag(display: Display) -> Option<&'static str> {
    match display {
        Display::Table | Display::InlineTable => Some("table"),
        Display::TableRow => Some("tr"),
        Display::TableRowGroup => Some("tbody"),
        Display::TableHeaderGroup => Some("thead"),
        Display::TableFooterGroup => Some("tfoot"),
        Display::TableCell => Some("td"),
        Display::TableCaption => Some("caption"),
        Display::ListItem => Some("li"),
        _ => None,
    }
}

/// Display a built-in tag has under the default stylesheet, or `None`
/// for tags this crate knows nothing about.
fn native_display(tag: &str) -> Option<Display> {
    let display = match tag {
        "table" => Display::Table,
        "tr" => Display::TableRow,
        "tbody" => Display::TableRowGroup,
        "thead" => Display::TableHeaderGroup,
        "tfoot" => Display::TableFooterGroup,
        "td" | "th" => Display::TableCell,
        "caption" => Display::TableCaption,
        "li" => Display::ListItem,
        "img" => Display::InlineBlock,
        "ul" | "ol" | "hr" => Display::Block,
        "a" | "br" => Display::Inline,
        _ if ROOT_TAGS.contains(&tag) || PARAGRAPH_TAGS.contains(&tag) || BLOCK_TAGS.contains(&tag) => {
            Display::Block
        }
        _ if INLINE_TAGS.contains(&tag) => Display::Inline,
        _ => return None,
    };
    Some(display)
}

/// String-keyed handler factories.
pub struct HandlerRegistry {
    handlers: HashMap<String, Vec<HandlerFactory>>,
    locked: bool,
}

impl HandlerRegistry {
    /// A registry with no handlers at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
            locked: false,
        }
    }

    /// A registry with the built-in handler for every supported tag.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.insert_all(ROOT_TAGS, RootContainer::factory);
        registry.insert_all(PARAGRAPH_TAGS, Paragraph::factory);
        registry.insert_all(BLOCK_TAGS, BlockContainer::factory);
        registry.insert_all(INLINE_TAGS, Inline::factory);
        registry.insert_all(&["a"], Link::factory);
        registry.insert_all(&["br"], Marker::line_break);
        registry.insert_all(&["hr"], Marker::separator);
        registry.insert_all(&["img"], Image::factory);
        registry.insert_all(&["ul", "ol"], List::factory);
        registry.insert_all(&["li"], ListItem::factory);
        registry.insert_all(&["table"], Table::factory);
        registry.insert_all(&["thead", "tbody", "tfoot"], RowGroup::factory);
        registry.insert_all(&["tr"], TableRow::factory);
        registry.insert_all(&["td", "th"], TableCell::factory);
        registry.insert_all(&["caption"], table::caption);
        registry
    }

    fn insert_all<F>(&mut self, tags: &[&str], factory: F)
    where
        F: Fn(&StyledNode<'_>, &mut ConversionContext) -> Box<dyn TagHandler> + Send + Sync + 'static,
    {
        let factory: HandlerFactory = Arc::new(factory);
        for tag in tags {
            self.handlers
                .entry((*tag).to_string())
                .or_default()
                .push(Arc::clone(&factory));
        }
    }

    fn ensure_unlocked(&self, tag: &str) -> Result<(), RegistryError> {
        if self.locked {
            return Err(RegistryError::Locked(tag.to_string()));
        }
        if tag.is_empty() {
            return Err(RegistryError::EmptyTag);
        }
        Ok(())
    }

    /// Register `factory` for `tag`, shadowing any earlier registration.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Locked`] once the registry has served a node, and
    /// [`RegistryError::EmptyTag`] for an empty tag name.
    pub fn register<F>(&mut self, tag: &str, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(&StyledNode<'_>, &mut ConversionContext) -> Box<dyn TagHandler> + Send + Sync + 'static,
    {
        self.ensure_unlocked(tag)?;
        let tag = tag.to_ascii_lowercase();
        log::debug!(target: "quire::registry", "registering handler for <{tag}>");
        self.handlers.entry(tag).or_default().push(Arc::new(factory));
        Ok(())
    }

    /// Remove the most recent registration for `tag`. Returns whether
    /// there was one.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub fn remove(&mut self, tag: &str) -> Result<bool, RegistryError> {
        self.ensure_unlocked(tag)?;
        let tag = tag.to_ascii_lowercase();
        let Some(stack) = self.handlers.get_mut(&tag) else {
            return Ok(false);
        };
        let removed = stack.pop().is_some();
        if stack.is_empty() {
            let _ = self.handlers.remove(&tag);
        }
        log::debug!(target: "quire::registry", "removed handler for <{tag}>");
        Ok(removed)
    }

    /// Whether any handler is registered for `tag`.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }

    /// Whether the registry has served a node and refuses changes.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    fn factory(&self, tag: &str) -> Option<&HandlerFactory> {
        self.handlers.get(tag).and_then(|stack| stack.last())
    }

    /// Tag whose handler serves `node`, or `None` when nothing does.
    ///
    /// The exact tag wins unless the node's resolved display is one of
    /// the table or list-item displays and either the tag has no handler
    /// or its native display differs. Then the tag natively carrying
    /// that display is used, falling back to the exact tag if the routed
    /// tag has no handler either.
    #[must_use]
    pub fn resolve_tag<'n>(&self, node: &StyledNode<'n>) -> Option<&'n str> {
        let tag = node.tag()?;
        let display = node.display();
        let exact = self.contains(tag);
        if let Some(routed) = routed_tag(display).filter(|routed| *routed != tag) {
            let reroute = !exact || native_display(tag).is_some_and(|native| native != display);
            if reroute && self.contains(routed) {
                return Some(routed);
            }
        }
        exact.then_some(tag)
    }

    /// Build the handler for `node`. Locks the registry.
    pub fn create(&mut self, node: &StyledNode<'_>, ctx: &mut ConversionContext) -> Option<Box<dyn TagHandler>> {
        self.locked = true;
        let tag = self.resolve_tag(node)?;
        if Some(tag) != node.tag() {
            log::debug!(
                target: "quire::registry",
                "<{}> routed to the <{tag}> handler by display: {}",
                node.tag().unwrap_or_default(),
                node.display().keyword()
            );
        }
        let factory = self.factory(tag)?;
        Some(factory(node, ctx))
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Clone for HandlerRegistry {
    /// The clone shares the factories and starts unlocked.
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
            locked: false,
        }
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        tags.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("tags", &tags)
            .field("locked", &self.locked)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_builtin_tags() {
        let registry = HandlerRegistry::with_defaults();
        for tag in ["body", "p", "div", "span", "a", "img", "ul", "li", "table", "tbody", "tr", "td", "::before"] {
            assert!(registry.contains(tag), "{tag}");
        }
        assert!(!registry.contains("head"));
        assert!(!registry.contains("script"));
    }

    #[test]
    fn test_native_displays_agree_with_routing() {
        for display in [Display::Table, Display::TableRow, Display::TableCell, Display::ListItem] {
            let tag = routed_tag(display).unwrap();
            assert_eq!(native_display(tag), Some(display));
        }
        assert_eq!(native_display("th"), Some(Display::TableCell));
        assert_eq!(native_display("bogus"), None);
    }

    #[test]
    fn test_remove_pops_one_registration() {
        let mut registry = HandlerRegistry::with_defaults();
        registry.register("p", Inline::factory).unwrap();
        assert_eq!(registry.handlers["p"].len(), 2);
        assert!(registry.remove("p").unwrap());
        assert_eq!(registry.handlers["p"].len(), 1);
        assert!(registry.remove("p").unwrap());
        assert!(!registry.contains("p"));
        assert!(!registry.remove("p").unwrap());
    }

    #[test]
    fn test_empty_tag_is_refused() {
        let mut registry = HandlerRegistry::empty();
        assert_eq!(registry.register("", Inline::factory), Err(RegistryError::EmptyTag));
    }

    #[test]
    fn test_clone_starts_unlocked() {
        let mut registry = HandlerRegistry::with_defaults();
        registry.locked = true;
        assert!(registry.register("x", Inline::factory).is_err());
        let mut clone = registry.clone();
        assert!(clone.register("x", Inline::factory).is_ok());
    }
}
