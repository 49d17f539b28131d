//! The conversion entry point and its configuration.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use quire_common::{DefaultResourceRetriever, DiagnosticSink, LogSink, ResourceLoader, ResourceRetriever, UriResolver};
use quire_css::sources::document_base;
use quire_css::ua_stylesheet::UA_CSS;
use quire_css::{MediaContext, MediaType, StyleConfig, style_document};
use quire_dom::DomTree;
use quire_dom::markup::parse_html;
use serde::Serialize;
use url::Url;

use crate::context::ConversionContext;
use crate::element::{DocumentElement, ElementKind, RunId};
use crate::engine::AttachmentEngine;
use crate::error::{ConfigError, ConversionError};
use crate::fonts::{BasicFontProvider, FontProvider};
use crate::registry::HandlerRegistry;

/// Everything a [`Converter`] can be configured with.
///
/// Built with chained setters:
///
/// ```ignore
/// let properties = ConverterProperties::new()
///     .base_uri("https://example.com/docs/")
///     .media(MediaType::Screen)
///     .user_stylesheet("p { color: navy }");
/// ```
pub struct ConverterProperties {
    base_uri: Option<String>,
    media: MediaType,
    viewport_width_px: f32,
    default_stylesheet: bool,
    user_agent_stylesheet: Option<String>,
    user_stylesheet: Option<String>,
    registry: HandlerRegistry,
    font_provider: Arc<Mutex<dyn FontProvider>>,
    resource_retriever: Arc<dyn ResourceRetriever>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl Default for ConverterProperties {
    fn default() -> Self {
        Self {
            base_uri: None,
            media: MediaType::Print,
            viewport_width_px: MediaContext::default().viewport_width_px,
            default_stylesheet: true,
            user_agent_stylesheet: None,
            user_stylesheet: None,
            registry: HandlerRegistry::with_defaults(),
            font_provider: Arc::new(Mutex::new(BasicFontProvider::new())),
            resource_retriever: Arc::new(DefaultResourceRetriever::default()),
            diagnostics: Arc::new(LogSink::new()),
        }
    }
}

impl ConverterProperties {
    /// Defaults: print media, built-in stylesheet, default handlers,
    /// diagnostics forwarded to the `log` facade.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Base for relative references (file path or URL).
    #[must_use]
    pub fn base_uri(mut self, uri: impl Into<String>) -> Self {
        self.base_uri = Some(uri.into());
        self
    }

    /// Media type `@media` rules are evaluated against.
    #[must_use]
    pub const fn media(mut self, media: MediaType) -> Self {
        self.media = media;
        self
    }

    /// Viewport width for `min-width` / `max-width` media features.
    #[must_use]
    pub const fn viewport_width_px(mut self, width: f32) -> Self {
        self.viewport_width_px = width;
        self
    }

    /// Whether the user-agent origin is applied at all.
    #[must_use]
    pub const fn default_stylesheet(mut self, enabled: bool) -> Self {
        self.default_stylesheet = enabled;
        self
    }

    /// Replace the built-in user-agent stylesheet.
    #[must_use]
    pub fn user_agent_stylesheet(mut self, css: impl Into<String>) -> Self {
        self.user_agent_stylesheet = Some(css.into());
        self
    }

    /// CSS applied at the user origin.
    #[must_use]
    pub fn user_stylesheet(mut self, css: impl Into<String>) -> Self {
        self.user_stylesheet = Some(css.into());
        self
    }

    /// Handler registry; each run works on its own clone.
    #[must_use]
    pub fn registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Font provider, reset at the start of every run.
    #[must_use]
    pub fn font_provider(mut self, provider: Arc<Mutex<dyn FontProvider>>) -> Self {
        self.font_provider = provider;
        self
    }

    /// Where stylesheets and images are fetched from.
    #[must_use]
    pub fn resource_retriever(mut self, retriever: Arc<dyn ResourceRetriever>) -> Self {
        self.resource_retriever = retriever;
        self
    }

    /// Where diagnostics go.
    #[must_use]
    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }
}

impl fmt::Debug for ConverterProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterProperties")
            .field("base_uri", &self.base_uri)
            .field("media", &self.media)
            .field("viewport_width_px", &self.viewport_width_px)
            .field("default_stylesheet", &self.default_stylesheet)
            .field("custom_ua_stylesheet", &self.user_agent_stylesheet.is_some())
            .field("user_stylesheet", &self.user_stylesheet.is_some())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Result of one conversion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvertedDocument {
    /// Identifier shared by every element below.
    pub run_id: RunId,
    /// Top-level elements in document order.
    pub elements: Vec<DocumentElement>,
}

impl ConvertedDocument {
    /// Every element of `kind` anywhere in the result, in document order.
    #[must_use]
    pub fn find_all(&self, kind: ElementKind) -> Vec<&DocumentElement> {
        self.elements.iter().flat_map(|e| e.find_all(kind)).collect()
    }

    /// Text of the whole result, blocks separated by newlines.
    #[must_use]
    pub fn text_content(&self) -> String {
        self.elements
            .iter()
            .map(DocumentElement::text_content)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Converts markup into document elements.
///
/// A converter validates its configuration once and may then run any
/// number of conversions. Runs on one converter share its font provider,
/// which is why each run starts by resetting it.
#[derive(Debug)]
pub struct Converter {
    properties: ConverterProperties,
    base: Option<Url>,
    style: StyleConfig,
}

impl Converter {
    /// Validate `properties`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidBaseUri`] when the base cannot serve as one,
    /// and [`ConfigError::ConflictingOptions`] for a custom user-agent
    /// stylesheet with the user-agent origin disabled.
    pub fn new(properties: ConverterProperties) -> Result<Self, ConfigError> {
        let base = match properties.base_uri.as_deref() {
            Some(uri) => Some(
                UriResolver::new(uri)
                    .map_err(|e| ConfigError::InvalidBaseUri {
                        uri: uri.to_string(),
                        reason: e.to_string(),
                    })?
                    .base()
                    .clone(),
            ),
            None => None,
        };

        if properties.user_agent_stylesheet.is_some() && !properties.default_stylesheet {
            return Err(ConfigError::ConflictingOptions(
                "a user-agent stylesheet was supplied but the user-agent origin is disabled".to_string(),
            ));
        }
        let user_agent_css = properties
            .default_stylesheet
            .then(|| properties.user_agent_stylesheet.clone().unwrap_or_else(|| UA_CSS.to_string()));
        let style = StyleConfig {
            media: MediaContext {
                media_type: properties.media,
                viewport_width_px: properties.viewport_width_px,
            },
            user_agent_css,
            user_css: properties.user_stylesheet.clone(),
            base_uri: base.clone(),
        };

        Ok(Self { properties, base, style })
    }

    /// The validated configuration.
    #[must_use]
    pub const fn properties(&self) -> &ConverterProperties {
        &self.properties
    }

    /// Parse `html` and convert it.
    ///
    /// # Errors
    ///
    /// See [`convert_tree`](Self::convert_tree).
    pub fn convert_html(&self, html: &str) -> Result<ConvertedDocument, ConversionError> {
        self.convert_tree(parse_html(html))
    }

    /// Convert an already-built node tree.
    ///
    /// # Errors
    ///
    /// [`ConfigError::FontProviderNotReset`] (wrapped) when the font
    /// provider keeps state across `reset()`, and
    /// [`ConversionError::RootFailed`] when no result could be produced.
    pub fn convert_tree(&self, dom: DomTree) -> Result<ConvertedDocument, ConversionError> {
        let sink = Arc::clone(&self.properties.diagnostics);

        // STEP 1: Reset shared provider state before touching any node.
        {
            let mut fonts = self
                .properties
                .font_provider
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            fonts.reset();
            let cached = fonts.cached_selections();
            if cached != 0 {
                return Err(ConfigError::FontProviderNotReset { cached }.into());
            }
        }

        // STEP 2: Collect stylesheets and run the cascade.
        let mut loader = ResourceLoader::new(Arc::clone(&self.properties.resource_retriever));
        let (styled, store) = style_document(dom, &self.style, &mut loader, sink.as_ref());
        log::debug!(
            target: "quire::convert",
            "{} rule(s), {} styled element(s)",
            store.len(),
            styled.styled_count()
        );

        // STEP 3: Per-run context; `<base href>` overrides the configured base.
        let base = document_base(styled.dom(), self.base.as_ref())
            .or_else(|| self.base.clone())
            .and_then(|url| UriResolver::from_url(url).ok());
        let mut ctx = ConversionContext::new(base, loader, Arc::clone(&self.properties.font_provider), sink);

        // STEP 4: Attach.
        let mut registry = self.properties.registry.clone();
        let elements = AttachmentEngine::new(&styled, &mut registry, &mut ctx).run()?;
        log::debug!(
            target: "quire::convert",
            "{}: {} element(s), {} fetch(es)",
            ctx.run_id(),
            elements.len(),
            ctx.fetch_count()
        );

        Ok(ConvertedDocument {
            run_id: ctx.run_id(),
            elements,
        })
    }
}
