//! Pipeline – ties together parsing, asset resolution, styling, layout,
//! pagination and PDF serialization.
//!
//! Page geometry comes from the document's `@page` rule; the configured
//! geometry fills in whatever the rule leaves out.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::assets::AssetResolver;
use crate::config::Settings;
use crate::dom::{
    body_children, collect_stylesheets, document_title, parse_document, visit_elements, DomNode,
    ElementNode, StyleSource, Tag,
};
use crate::error::RenderError;
use crate::fonts::FontManager;
use crate::layout::compute_layout;
use crate::layout_config::LayoutConfig;
use crate::page::PageGeometry;
use crate::pagination::paginate;
use crate::render::render_pdf;
use crate::style::{build_styled_tree, resolve_style, ComputedStyle, StyledNode};
use crate::stylesheet::Stylesheet;

/// Configuration for the PDF generation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Title used when the document has no `<title>`.
    pub title: String,
    /// Geometry used when the document has no `@page` rule.
    pub page: PageGeometry,
    /// Directory relative asset references resolve against.
    pub base_dir: Option<PathBuf>,
    pub default_font: String,
    /// Root font size in pt.
    pub default_font_size: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            title: "EMISNET".to_string(),
            page: PageGeometry::default(),
            base_dir: None,
            default_font: "Helvetica".to_string(),
            default_font_size: 12.0,
        }
    }
}

impl PipelineConfig {
    /// Create an A4 landscape config.
    pub fn a4_landscape() -> Self {
        let mut config = Self::default();
        config.page.size = config.page.size.landscape();
        config
    }
}

/// A parsed document with its cascade resolved, ready for layout.
struct PreparedDocument {
    title: String,
    page: PageGeometry,
    styled: Vec<StyledNode>,
}

fn find_body(nodes: &[DomNode]) -> Option<ElementNode> {
    let mut body = None;
    visit_elements(nodes, &mut |e: &ElementNode| {
        if body.is_none() && e.tag == Tag::Body {
            body = Some(e.clone());
        }
    });
    body
}

fn prepare(
    html: &str,
    config: &PipelineConfig,
    resolver: &AssetResolver,
) -> Result<PreparedDocument, RenderError> {
    // 1. Parse
    let dom = parse_document(html)?;

    // 2. Stylesheets, in document order
    let mut sheet = Stylesheet::default();
    for source in collect_stylesheets(&dom) {
        match source {
            StyleSource::Inline(css) => sheet.append(&css),
            StyleSource::Linked(href) => {
                let css = resolver.read_text(&href)?;
                log::debug!("Loaded stylesheet {href} ({} bytes)", css.len());
                sheet.append(&css);
            }
        }
    }

    let page = config.page.with_rule(sheet.page());
    let title = document_title(&dom).unwrap_or_else(|| config.title.clone());

    // 3. Images become data URIs
    let mut content = body_children(&dom);
    resolver.inline_images(&mut content)?;

    // 4. Cascade, with <body> rules inherited by everything below it
    let root = ComputedStyle::root(&config.default_font, config.default_font_size);
    let body_style = find_body(&dom).map(|body| resolve_style(&body, Some(&root), &sheet));
    let styled = build_styled_tree(&content, Some(body_style.as_ref().unwrap_or(&root)), &sheet);

    log::debug!(
        "Prepared '{title}': {} top-level nodes, {}x{}pt page",
        styled.len(),
        page.size.width,
        page.size.height
    );
    Ok(PreparedDocument {
        title,
        page,
        styled,
    })
}

fn layout_with(
    html: &str,
    config: &PipelineConfig,
    base: Option<&Path>,
    fonts: &FontManager,
) -> Result<LayoutConfig, RenderError> {
    let resolver = AssetResolver::new(base.or(config.base_dir.as_deref()));
    let doc = prepare(html, config, &resolver)?;
    let boxes = compute_layout(&doc.styled, &doc.page, fonts)?;
    Ok(paginate(&boxes, &doc.page, &doc.title, fonts))
}

/// Full pipeline: HTML string → PDF bytes plus the layout that produced them.
pub fn generate_pdf(
    html: &str,
    config: &PipelineConfig,
) -> Result<(Vec<u8>, LayoutConfig), RenderError> {
    let layout = compute_layout_config(html, config)?;
    let bytes = render_pdf(&layout)?;
    Ok((bytes, layout))
}

/// Convenience: generate a PDF with the default config.
pub fn generate_pdf_from_html(html: &str) -> Result<Vec<u8>, RenderError> {
    let (bytes, _) = generate_pdf(html, &PipelineConfig::default())?;
    Ok(bytes)
}

/// Generate only the layout config (no PDF serialization).
pub fn compute_layout_config(html: &str, config: &PipelineConfig) -> Result<LayoutConfig, RenderError> {
    layout_with(html, config, None, &FontManager::default())
}

// ---------------------------------------------------------------------------
// Renderer handle
// ---------------------------------------------------------------------------

/// Converts final HTML into PDF bytes.
///
/// Holds only immutable configuration and font metrics, so one renderer can
/// be shared across threads.
#[derive(Clone)]
pub struct PdfRenderer {
    config: PipelineConfig,
    fonts: FontManager,
}

impl std::fmt::Debug for PdfRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfRenderer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl PdfRenderer {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_fonts(config, FontManager::default())
    }

    pub fn with_fonts(config: PipelineConfig, fonts: FontManager) -> Self {
        Self { config, fonts }
    }

    /// Renderer for the page defaults, asset root and metrics font in
    /// `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, RenderError> {
        let mut fonts = FontManager::new();
        if let Some(path) = &settings.metrics_font {
            fonts.load_font_file(&settings.default_font, path)?;
        }
        fonts.ensure_default();

        let config = PipelineConfig {
            title: settings.title.clone(),
            page: settings.page_geometry()?,
            base_dir: Some(settings.assets_dir.clone()),
            default_font: settings.default_font.clone(),
            default_font_size: settings.default_font_size,
        };
        Ok(Self::with_fonts(config, fonts))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Lay out and paginate `markup` without serializing it.
    pub fn layout(&self, markup: &str, base: Option<&Path>) -> Result<LayoutConfig, RenderError> {
        layout_with(markup, &self.config, base, &self.fonts)
    }

    /// Render `markup` to an in-memory PDF. Relative asset references
    /// resolve against `base`, or the configured base directory.
    pub fn to_pdf(&self, markup: &str, base: Option<&Path>) -> Result<Vec<u8>, RenderError> {
        let layout = self.layout(markup, base)?;
        render_pdf(&layout)
    }

    /// Render and write to `out`. Nothing is written if rendering fails.
    pub fn write_pdf<W: Write + ?Sized>(
        &self,
        markup: &str,
        base: Option<&Path>,
        out: &mut W,
    ) -> Result<usize, RenderError> {
        let bytes = self.to_pdf(markup, base)?;
        out.write_all(&bytes).map_err(RenderError::Output)?;
        out.flush().map_err(RenderError::Output)?;
        Ok(bytes.len())
    }

    /// Render and write to `path`. The file is only created once the whole
    /// document has been produced.
    pub fn write_pdf_file(
        &self,
        markup: &str,
        base: Option<&Path>,
        path: &Path,
    ) -> Result<usize, RenderError> {
        let bytes = self.to_pdf(markup, base)?;
        write_file(path, &bytes)?;
        Ok(bytes.len())
    }
}

/// Write `bytes` to `path`, creating missing parent directories.
///
/// The bytes go to a temporary file in the target directory that is renamed
/// over `path` once complete, so a failed write never leaves a truncated
/// document behind.
pub(crate) fn write_file(path: &Path, bytes: &[u8]) -> Result<(), RenderError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| RenderError::io(dir, e))?;

    let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(|e| RenderError::io(dir, e))?;
    staged.write_all(bytes).map_err(|e| RenderError::io(staged.path(), e))?;
    staged.flush().map_err(|e| RenderError::io(staged.path(), e))?;
    staged.persist(path).map_err(|e| RenderError::io(path, e.error))?;
    Ok(())
}
