//! The report generator: one handle that binds a context to a named template
//! and renders the result to PDF.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::config::Settings;
use crate::context::Context;
use crate::engine::TemplateEngine;
use crate::error::RenderError;
use crate::models::Empresa;
use crate::pipeline::{write_file, PdfRenderer};

/// Template engine plus renderer, cheap to clone and safe to share between
/// threads.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    engine: Arc<TemplateEngine>,
    renderer: PdfRenderer,
    empresa: Empresa,
}

impl ReportGenerator {
    pub fn new(engine: Arc<TemplateEngine>, renderer: PdfRenderer) -> Self {
        Self {
            engine,
            renderer,
            empresa: Empresa::default(),
        }
    }

    /// Built-in templates and default page settings.
    pub fn embedded() -> Result<Self, RenderError> {
        Ok(Self::new(
            Arc::new(TemplateEngine::embedded()?),
            PdfRenderer::default(),
        ))
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, RenderError> {
        let engine = TemplateEngine::with_overrides(settings.templates_dir.as_deref())?;
        let renderer = PdfRenderer::from_settings(settings)?;
        Ok(Self::new(Arc::new(engine), renderer).with_empresa(settings.empresa.clone()))
    }

    pub fn with_empresa(mut self, empresa: Empresa) -> Self {
        self.empresa = empresa;
        self
    }

    pub fn engine(&self) -> &TemplateEngine {
        &self.engine
    }

    pub fn renderer(&self) -> &PdfRenderer {
        &self.renderer
    }

    pub fn empresa(&self) -> &Empresa {
        &self.empresa
    }

    /// Bound markup for `name`, without rendering it.
    pub fn render_html(&self, name: &str, context: &Context) -> Result<String, RenderError> {
        let html = self.engine.render(name, context)?;
        log::debug!("Template '{name}' bound, {} bytes of markup", html.len());
        Ok(html)
    }

    /// Bind `context` to `name` and render the document to PDF bytes.
    pub fn render(&self, name: &str, context: &Context) -> Result<Vec<u8>, RenderError> {
        log::info!("Rendering '{name}' with {} variable(s)", context.len());
        let html = self.render_html(name, context)?;
        let bytes = self.renderer.to_pdf(&html, None)?;
        log::info!("Rendered '{name}': {} bytes", bytes.len());
        Ok(bytes)
    }

    /// Render and write to `out`. Nothing is written if rendering fails.
    pub fn render_to_writer<W: Write + ?Sized>(
        &self,
        name: &str,
        context: &Context,
        out: &mut W,
    ) -> Result<usize, RenderError> {
        let bytes = self.render(name, context)?;
        out.write_all(&bytes).map_err(RenderError::Output)?;
        out.flush().map_err(RenderError::Output)?;
        Ok(bytes.len())
    }

    /// Render and write to `path`. The file is not created if rendering
    /// fails.
    pub fn render_to_file(&self, name: &str, context: &Context, path: &Path) -> Result<usize, RenderError> {
        let bytes = self.render(name, context)?;
        write_file(path, &bytes)?;
        log::info!("Wrote {}", path.display());
        Ok(bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn generator_is_shareable() {
        assert_send_sync::<ReportGenerator>();
    }

    #[test]
    fn smoke_test_document_renders() {
        let generator = ReportGenerator::embedded().unwrap();
        let html = generator.render_html("prueba-simple", &Context::new()).unwrap();
        assert!(html.contains("Test PDF"));
        let bytes = generator.simple_test().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn unknown_template_is_not_found() {
        let generator = ReportGenerator::embedded().unwrap();
        let err = generator.render("no-existe", &Context::new()).unwrap_err();
        assert!(matches!(err, RenderError::TemplateNotFound { name } if name == "no-existe"));
    }
}
