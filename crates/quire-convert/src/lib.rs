//! Markup-to-document-model conversion for quire.
//!
//! # Scope
//!
//! This crate provides:
//! - **Document Model** - [`DocumentElement`] trees for a fixed-page renderer
//! - **Handler Registry** - string-keyed tag handler factories with
//!   display-driven routing
//! - **Attachment Engine** - the depth-first walk that drives handlers and
//!   contains their failures
//! - **Generated Content** - `content` text, counters and quotes
//! - **Font Selection** - a resettable [`FontProvider`]
//! - **Converter** - configuration and the per-run pipeline
//!
//! # Example
//!
//! ```ignore
//! use quire_convert::{Converter, ConverterProperties, ElementKind};
//!
//! let converter = Converter::new(ConverterProperties::new())?;
//! let document = converter.convert_html("<p>Hello world!</p>")?;
//! assert_eq!(document.elements[0].kind, ElementKind::Paragraph);
//! ```
//!
//! # Not Implemented
//!
//! - Line breaking, pagination and any other layout
//! - Forms, frames and embedded media other than images

pub mod content;
pub mod context;
pub mod converter;
pub mod counters;
pub mod element;
pub mod engine;
pub mod error;
pub mod fonts;
pub mod handlers;
pub mod registry;

pub use quire_common as common;
pub use quire_css as css;
pub use quire_dom as dom;

pub use context::ConversionContext;
pub use converter::{ConvertedDocument, Converter, ConverterProperties};
pub use element::{DocumentElement, ElementKind, Role, RunId};
pub use engine::{AttachmentEngine, FrameState};
pub use error::{ConfigError, ConversionError, HandlerError, RegistryError};
pub use fonts::{BasicFontProvider, FontProvider};
pub use handlers::TagHandler;
pub use registry::{HandlerFactory, HandlerRegistry};
