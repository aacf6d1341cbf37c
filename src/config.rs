//! Settings for the generator service, loaded from a JSON file.
//!
//! Every field has a default, so `{}` is a valid settings file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::models::Empresa;
use crate::page::{PageGeometry, PageMargins, PageSize, PT_PER_MM};
use crate::stylesheet::{parse_length, parse_page_size};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory of `*.html` templates layered over the embedded ones.
    pub templates_dir: Option<PathBuf>,
    /// Base directory for relative stylesheet and image references.
    pub assets_dir: PathBuf,
    /// PDF title for documents without a `<title>`.
    pub title: String,
    pub default_font: String,
    pub default_font_size: f32,
    /// Page size used when a document has no `@page` rule, e.g. `"A4"` or
    /// `"letter landscape"`.
    pub page_size: String,
    pub margins: MarginsMm,
    /// TTF/OTF file whose advances are used to measure text.
    pub metrics_font: Option<PathBuf>,
    /// Company block printed on the sales report.
    pub empresa: Empresa,
}

/// Default page margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginsMm {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Default for MarginsMm {
    fn default() -> Self {
        Self {
            top: 20.0,
            right: 20.0,
            bottom: 20.0,
            left: 20.0,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            templates_dir: None,
            assets_dir: PathBuf::from("templates"),
            title: "EMISNET".to_string(),
            default_font: "Helvetica".to_string(),
            default_font_size: 12.0,
            page_size: "A4".to_string(),
            margins: MarginsMm::default(),
            metrics_font: None,
            empresa: Empresa::default(),
        }
    }
}

impl Settings {
    pub fn from_json_str(json: &str) -> Result<Self, RenderError> {
        serde_json::from_str(json).map_err(|e| RenderError::Config(e.to_string()))
    }

    pub fn from_json_file(path: &Path) -> Result<Self, RenderError> {
        let contents = std::fs::read_to_string(path).map_err(|e| RenderError::io(path, e))?;
        let settings = Self::from_json_str(&contents)
            .map_err(|e| RenderError::Config(format!("{}: {e}", path.display())))?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Default page geometry in points.
    pub fn page_geometry(&self) -> Result<PageGeometry, RenderError> {
        let unknown = || RenderError::Config(format!("unknown page size '{}'", self.page_size));
        let known_token = |t: &str| {
            matches!(t.to_ascii_lowercase().as_str(), "portrait" | "landscape")
                || PageSize::from_name(t).is_some()
                || parse_length(t).is_some()
        };
        if !self.page_size.split_whitespace().all(known_token) {
            return Err(unknown());
        }
        let size = parse_page_size(&self.page_size).ok_or_else(unknown)?;
        let m = self.margins;
        if [m.top, m.right, m.bottom, m.left].iter().any(|v| *v < 0.0) {
            return Err(RenderError::Config("margins must not be negative".into()));
        }
        Ok(PageGeometry {
            size,
            margins: PageMargins {
                top: m.top * PT_PER_MM,
                right: m.right * PT_PER_MM,
                bottom: m.bottom * PT_PER_MM,
                left: m.left * PT_PER_MM,
            },
        })
    }
}
