//! The `img` handler.
//!
//! [§ 4.8.3 The img element](https://html.spec.whatwg.org/multipage/embedded-content.html#the-img-element)
//!
//! The image is fetched through the run's resource loader and probed for
//! its intrinsic size. Pixels are never decoded here; the renderer embeds
//! the bytes behind the resolved locator.
//!
//! When the image cannot be used, the element's `alt` text stands in for
//! it; an image without `alt` produces nothing.

use std::io::Cursor;

use image::ImageReader;
use quire_common::{Diagnostic, DiagnosticTemplate};
use quire_css::StyledNode;
use url::Url;

use super::{ElementSeed, TagHandler};
use crate::context::ConversionContext;
use crate::element::{DocumentElement, ElementKind, Role};
use crate::error::HandlerError;

/// Detected image format.
///
/// The `image` crate sniffs raster sub-formats (PNG, JPEG, GIF) itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// SVG vector image; its size is read from the root element.
    Svg,
    /// Anything else; probed with the `image` crate.
    Raster,
}

/// Detect whether `bytes` behind `url` are SVG or raster.
///
/// 1. **Extension check**: `.svg` in the locator path.
/// 2. **Data URL MIME check**: a `data:image/svg` prefix.
/// 3. **Magic-byte sniffing**: leading `<?xml` or `<svg` in the first
///    256 bytes after white space.
/// 4. **Default**: [`ImageFormat::Raster`].
#[must_use]
pub fn detect_format(url: &Url, bytes: &[u8]) -> ImageFormat {
    if std::path::Path::new(url.path())
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
    {
        return ImageFormat::Svg;
    }

    if url.scheme() == "data" && url.path().starts_with("image/svg") {
        return ImageFormat::Svg;
    }

    let head: Vec<u8> = bytes
        .iter()
        .skip_while(|b| b.is_ascii_whitespace())
        .take(256)
        .copied()
        .collect();
    if head.starts_with(b"<?xml") || head.starts_with(b"<svg") {
        return ImageFormat::Svg;
    }

    ImageFormat::Raster
}

/// Intrinsic `(width, height)` of an image in pixels.
///
/// # Errors
///
/// Returns a description of the failure when the bytes are not an image
/// the `image` crate can read, or an SVG without usable dimensions.
pub fn intrinsic_size(format: ImageFormat, bytes: &[u8]) -> Result<(u32, u32), String> {
    match format {
        ImageFormat::Raster => ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| format!("failed to read image header: {e}"))?
            .into_dimensions()
            .map_err(|e| format!("failed to decode image: {e}")),
        ImageFormat::Svg => svg_size(bytes).ok_or_else(|| "SVG root has no usable width/height or viewBox".to_string()),
    }
}

/// Size of an SVG from its root element's `width`/`height` attributes,
/// falling back to the `viewBox` extent.
fn svg_size(bytes: &[u8]) -> Option<(u32, u32)> {
    let text = std::str::from_utf8(bytes).ok()?;
    let start = text.find("<svg")?;
    let end = start + text[start..].find('>')?;
    let root = &text[start..end];

    let width = svg_attr(root, "width").and_then(parse_svg_length);
    let height = svg_attr(root, "height").and_then(parse_svg_length);
    if let (Some(w), Some(h)) = (width, height) {
        return Some((w, h));
    }

    let view_box: Vec<u32> = svg_attr(root, "viewBox")?
        .split(|c: char| c == ',' || c.is_ascii_whitespace())
        .filter(|s| !s.is_empty())
        .filter_map(parse_svg_length)
        .collect();
    match view_box.as_slice() {
        [_, _, w, h] => Some((*w, *h)),
        _ => None,
    }
}

fn svg_attr<'a>(root: &'a str, name: &str) -> Option<&'a str> {
    let pattern = format!(" {name}=");
    let at = root.find(&pattern)? + pattern.len();
    let rest = &root[at..];
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    Some(&value[..value.find(quote)?])
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_svg_length(value: &str) -> Option<u32> {
    let number = value.trim().trim_end_matches("px");
    let parsed: f64 = number.parse().ok()?;
    (parsed.is_finite() && parsed >= 0.0).then(|| parsed.round() as u32)
}

/// Handler for `img`.
#[derive(Debug)]
pub struct Image {
    seed: ElementSeed,
    src: Option<String>,
    alt: Option<String>,
}

impl Image {
    /// Factory for `img`.
    pub fn factory(node: &StyledNode<'_>, ctx: &mut ConversionContext) -> Box<dyn TagHandler> {
        Box::new(Self {
            seed: ElementSeed::from_node(node, ctx),
            src: node.attr("src").map(str::trim).filter(|s| !s.is_empty()).map(str::to_string),
            alt: node.attr("alt").map(str::to_string),
        })
    }

    fn fallback(&self) -> Vec<DocumentElement> {
        match self.alt.as_deref() {
            Some(alt) if !alt.trim().is_empty() => vec![self.seed.text_run(alt, false)],
            _ => Vec::new(),
        }
    }

    fn load(&self, ctx: &mut ConversionContext) -> Option<DocumentElement> {
        let src = self.src.as_deref()?;
        let (url, bytes) = ctx.fetch(src, "img")?;
        let format = detect_format(&url, &bytes);
        let (width, height) = match intrinsic_size(format, &bytes) {
            Ok(size) => size,
            Err(reason) => {
                ctx.emit(
                    Diagnostic::new(DiagnosticTemplate::ImageDecodeFailed, format!("{url}: {reason}"))
                        .with_tag("img")
                        .with_node(self.seed.node.0),
                );
                return None;
            }
        };
        log::trace!(target: "quire::convert", "image {url} is {width}x{height} ({format:?})");

        let mut image = self
            .seed
            .element(ElementKind::Image, Role::Figure)
            .with_property("src", url.as_str())
            .with_property("intrinsic-width", width.to_string())
            .with_property("intrinsic-height", height.to_string());
        if let Some(alt) = &self.alt {
            let _ = image.properties.insert("alt".to_string(), alt.clone());
        }
        Some(image)
    }
}

impl TagHandler for Image {
    fn finish(&mut self, ctx: &mut ConversionContext) -> Result<Vec<DocumentElement>, HandlerError> {
        Ok(self.load(ctx).map_or_else(|| self.fallback(), |image| vec![image]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(&url("file:///a/logo.SVG"), b""), ImageFormat::Svg);
        assert_eq!(detect_format(&url("data:image/svg+xml,<svg/>"), b"<svg/>"), ImageFormat::Svg);
        assert_eq!(detect_format(&url("file:///a/img"), b"  \n<?xml version"), ImageFormat::Svg);
        assert_eq!(detect_format(&url("file:///a/photo.png"), b"\x89PNG"), ImageFormat::Raster);
    }

    #[test]
    fn test_svg_size_from_attributes_or_view_box() {
        let sized = br#"<svg xmlns="http://www.w3.org/2000/svg" width="120px" height='40'></svg>"#;
        assert_eq!(svg_size(sized), Some((120, 40)));
        let boxed = br#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 16"/>"#;
        assert_eq!(svg_size(boxed), Some((24, 16)));
        assert_eq!(svg_size(b"<svg/>"), None);
    }

    #[test]
    fn test_garbage_raster_fails() {
        assert!(intrinsic_size(ImageFormat::Raster, b"not an image").is_err());
    }
}
