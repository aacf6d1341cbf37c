//! Asset resolution – loads linked stylesheets and images relative to the
//! document's base location and inlines images as `data:` URIs so that
//! layout and rendering never touch the filesystem.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};

use crate::dom::{try_visit_elements_mut, DomNode, ElementNode, Tag};
use crate::error::RenderError;

/// Resolves references found in markup against a base directory.
#[derive(Debug, Clone, Default)]
pub struct AssetResolver {
    base: Option<PathBuf>,
}

impl AssetResolver {
    /// `base` is the directory relative references are resolved against;
    /// `None` resolves them against the working directory.
    pub fn new(base: Option<&Path>) -> Self {
        Self {
            base: base.map(Path::to_path_buf),
        }
    }

    pub fn base(&self) -> Option<&Path> {
        self.base.as_deref()
    }

    /// Map a reference to a filesystem path.
    ///
    /// Accepts relative paths, absolute paths and `file://` URLs. Query
    /// strings and fragments are ignored. Other schemes are rejected.
    pub fn locate(&self, reference: &str) -> Result<PathBuf, RenderError> {
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(RenderError::asset(reference, "empty reference"));
        }
        let without_suffix = trimmed
            .split(['?', '#'])
            .next()
            .unwrap_or(trimmed);

        let raw = if let Some(rest) = without_suffix.strip_prefix("file://") {
            rest
        } else if let Some((scheme, _)) = without_suffix.split_once("://") {
            return Err(RenderError::asset(
                reference,
                format!("unsupported scheme '{scheme}'"),
            ));
        } else {
            without_suffix
        };

        let path = Path::new(raw);
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }
        Ok(match &self.base {
            Some(base) => base.join(path),
            None => path.to_path_buf(),
        })
    }

    pub fn read_bytes(&self, reference: &str) -> Result<Vec<u8>, RenderError> {
        let path = self.locate(reference)?;
        std::fs::read(&path).map_err(|e| RenderError::asset(reference, format!("{}: {e}", path.display())))
    }

    pub fn read_text(&self, reference: &str) -> Result<String, RenderError> {
        let bytes = self.read_bytes(reference)?;
        String::from_utf8(bytes).map_err(|_| RenderError::asset(reference, "not valid UTF-8"))
    }

    /// Replace every `<img src>` with a `data:` URI.
    ///
    /// Fails on the first image that cannot be read or decoded.
    pub fn inline_images(&self, nodes: &mut [DomNode]) -> Result<(), RenderError> {
        try_visit_elements_mut(nodes, &mut |e: &mut ElementNode| {
            if e.tag != Tag::Img {
                return Ok(());
            }
            let Some(src) = e.src().map(str::to_string) else {
                log::debug!("<img> without src is laid out as an empty box");
                return Ok(());
            };
            let uri = self.image_data_uri(&src)?;
            e.attributes.insert("src".to_string(), uri);
            Ok(())
        })
    }

    fn image_data_uri(&self, src: &str) -> Result<String, RenderError> {
        if src.starts_with("data:") {
            let (_, bytes) = decode_data_uri(src)?;
            ensure_decodable(src, &bytes)?;
            return Ok(src.to_string());
        }
        let bytes = self.read_bytes(src)?;
        ensure_decodable(src, &bytes)?;
        let mime = mime_for(src, &bytes);
        log::debug!("Inlined image {src} ({} bytes, {mime})", bytes.len());
        Ok(data_uri(mime, &bytes))
    }
}

fn ensure_decodable(reference: &str, bytes: &[u8]) -> Result<(), RenderError> {
    ::image::load_from_memory(bytes)
        .map(|_| ())
        .map_err(|e| RenderError::asset(reference, format!("undecodable image: {e}")))
}

fn mime_for(reference: &str, bytes: &[u8]) -> &'static str {
    let ext = Path::new(reference)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => match ::image::guess_format(bytes) {
            Ok(::image::ImageFormat::Jpeg) => "image/jpeg",
            _ => "image/png",
        },
    }
}

/// Encode bytes as a base64 `data:` URI.
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", BASE64_STD.encode(bytes))
}

/// Parse a `data:<mime>;base64,<data>` URI into its media type and bytes.
pub fn decode_data_uri(src: &str) -> Result<(String, Vec<u8>), RenderError> {
    let preview: String = src.chars().take(40).collect();
    let rest = src
        .strip_prefix("data:")
        .ok_or_else(|| RenderError::asset(&preview, "not a data URI"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| RenderError::asset(&preview, "missing ',' separator"))?;
    let Some(mime) = header.strip_suffix(";base64") else {
        return Err(RenderError::asset(&preview, "only base64 data URIs are supported"));
    };
    let bytes = BASE64_STD
        .decode(payload.trim())
        .map_err(|e| RenderError::asset(&preview, format!("base64 decode error: {e}")))?;
    Ok((mime.to_string(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_document;

    fn png_bytes() -> Vec<u8> {
        let img = ::image::RgbImage::from_pixel(4, 2, ::image::Rgb([200, 16, 46]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, ::image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn locate_resolves_against_base() {
        let resolver = AssetResolver::new(Some(Path::new("/srv/templates")));
        assert_eq!(
            resolver.locate("css/estilos.css?v=2").unwrap(),
            PathBuf::from("/srv/templates/css/estilos.css")
        );
        assert_eq!(
            resolver.locate("file:///opt/logo.png").unwrap(),
            PathBuf::from("/opt/logo.png")
        );
    }

    #[test]
    fn remote_references_are_rejected() {
        let resolver = AssetResolver::default();
        let err = resolver.locate("https://www.bmv.com.mx/logo.png").unwrap_err();
        assert!(matches!(err, RenderError::Asset { .. }));
    }

    #[test]
    fn data_uri_round_trip() {
        let uri = data_uri("image/png", b"abc");
        let (mime, bytes) = decode_data_uri(&uri).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, b"abc");
        assert!(decode_data_uri("data:text/plain,abc").is_err());
    }

    #[test]
    fn images_are_inlined_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("logo.png"), png_bytes()).unwrap();
        let mut nodes = parse_document(r#"<div><img src="logo.png"></div>"#).unwrap();
        AssetResolver::new(Some(dir.path()))
            .inline_images(&mut nodes)
            .unwrap();

        let mut srcs = Vec::new();
        crate::dom::visit_elements(&nodes, &mut |e: &ElementNode| {
            if let Some(src) = e.src() {
                srcs.push(src.to_string());
            }
        });
        assert_eq!(srcs.len(), 1);
        assert!(srcs[0].starts_with("data:image/png;base64,"));
    }

    #[test]
    fn missing_and_corrupt_images_fail() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("roto.png"), b"not a png").unwrap();
        let resolver = AssetResolver::new(Some(dir.path()));

        for html in [r#"<img src="nada.png">"#, r#"<img src="roto.png">"#] {
            let mut nodes = parse_document(html).unwrap();
            let err = resolver.inline_images(&mut nodes).unwrap_err();
            assert!(matches!(err, RenderError::Asset { .. }), "{html}: {err}");
        }
    }
}
