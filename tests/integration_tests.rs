//! Integration tests for the report generator.
//!
//! These tests validate:
//! - Every built-in document binds and renders to a PDF
//! - Values reach the page exactly as supplied
//! - `@page` rules drive page geometry
//! - Errors are distinguishable and never leave partial output
//! - Generators can be shared across threads
//! - Layout and PDF bytes are reproducible run to run

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};

use emisnet_pdf::flatten::{flatten, flatten_excluding, flatten_with_ancestors, Ancestry, Flatten};
use emisnet_pdf::layout_config::LayoutConfig;
use emisnet_pdf::models::{DatosReporte, Empresa, Posicion, ReportePosiciones, Venta};
use emisnet_pdf::pipeline::{PdfRenderer, PipelineConfig};
use emisnet_pdf::reports::{position_context, sales_context, REPORTE_POSICIONES, REPORTE_VENTAS};
use emisnet_pdf::samples::{self, SampleKind};
use emisnet_pdf::{Context, PageOrientation, RenderError, ReportGenerator, TemplateEngine};

// =====================================================================
// Helper
// =====================================================================

fn generator() -> ReportGenerator {
    ReportGenerator::embedded().unwrap()
}

fn fecha(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 100, "PDF too small: {} bytes", bytes.len());
    assert_eq!(&bytes[0..4], b"%PDF", "Missing PDF header");
}

/// Bind `name` and lay it out without serializing.
fn layout_of(generator: &ReportGenerator, name: &str, ctx: &Context) -> LayoutConfig {
    let html = generator.render_html(name, ctx).unwrap();
    generator.renderer().layout(&html, None).unwrap()
}

fn digest(layout: &LayoutConfig) -> String {
    let json = layout.to_json().unwrap();
    Sha256::digest(json.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

// =====================================================================
// Report scenarios
// =====================================================================

#[test]
fn sales_report_with_one_sale() {
    let datos = DatosReporte::new(
        "Enero 2024",
        vec![Venta::new(fecha(2024, 1, 15), "BBVA Bancomer", "Acciones AMXL", 100, 25.50, 2550.00)],
    );
    let bytes = generator().sales_report(&datos).unwrap();
    assert_valid_pdf(&bytes);
}

#[test]
fn sales_report_without_sales() {
    let g = generator();
    let datos = DatosReporte::new("Febrero 2024", Vec::new());
    let ctx = sales_context(&datos, g.empresa(), fecha(2024, 3, 1)).unwrap();
    assert_eq!(ctx.get("resumen").unwrap()["ventaPromedio"], json!("$0.00"));

    let layout = layout_of(&g, REPORTE_VENTAS, &ctx);
    assert_eq!(layout.orientation(), PageOrientation::Portrait);
    assert_valid_pdf(&g.sales_report(&datos).unwrap());
}

#[test]
fn sales_report_shows_company_and_totals() {
    let g = generator().with_empresa(Empresa {
        nombre: "Casa de Prueba".into(),
        ..Empresa::default()
    });
    let ctx = sales_context(&samples::datos_reporte(), g.empresa(), fecha(2024, 2, 1)).unwrap();
    let text = layout_of(&g, REPORTE_VENTAS, &ctx).text_lines().join("\n");
    assert!(text.contains("Casa de Prueba"), "company name missing:\n{text}");
    assert!(text.contains("$53,433.00"), "total missing:\n{text}");
}

#[test]
fn position_amounts_are_shown_as_supplied() {
    let g = generator();
    let reporte = ReportePosiciones {
        casa_bolsa: "ACTIN".into(),
        posiciones: vec![Posicion::sin_movimientos(
            "WALMEX",
            "1",
            [300.0, 9655.0, 0.0],
            [300.0, 9666.0, 0.0, 9966.0],
        )],
        ..ReportePosiciones::default()
    };
    let layout = layout_of(&g, REPORTE_POSICIONES, &position_context(&reporte));
    let text = layout.text_lines().join(" ");
    assert!(text.contains("9,966"), "total missing:\n{text}");
    assert!(text.contains("9,666"), "VCT missing:\n{text}");
    assert!(text.contains("WALMEX"));
}

#[test]
fn fractional_positions_are_not_rounded() {
    let g = generator();
    let mut posicion = Posicion::sin_movimientos("WALMEX", "1", [300.0, 9655.0, 0.0], [300.0, 9666.0, 0.0, 9966.0]);
    posicion.posicion_total = 9966.4;
    posicion.saldo_anterior_vct = 9655.25;
    let reporte = ReportePosiciones {
        casa_bolsa: "ACTIN".into(),
        posiciones: vec![posicion],
        ..ReportePosiciones::default()
    };
    let html = g.render_html(REPORTE_POSICIONES, &position_context(&reporte)).unwrap();
    assert!(html.contains(">9,966.4<"), "total rounded:\n{html}");
    assert!(html.contains(">9,655.25<"), "balance rounded:\n{html}");
    assert!(html.contains(">9,666<"));
}

#[test]
fn position_report_is_landscape() {
    let g = generator();
    let layout = layout_of(&g, REPORTE_POSICIONES, &position_context(&samples::reporte_posiciones()));
    assert!(layout.page_width_pt > layout.page_height_pt);
    assert_eq!(layout.orientation(), PageOrientation::Landscape);
    assert_valid_pdf(&g.position_report(&samples::reporte_posiciones()).unwrap());
}

#[test]
fn confirmation_and_notice_render() {
    let g = generator();
    let confirmacion = samples::confirmacion_envio();
    let ctx = flatten_with_ancestors(&confirmacion);
    let text = layout_of(&g, "confirmacion-envio", &ctx).text_lines().join(" ");
    assert!(text.contains("1452904"));
    assert!(text.contains("ACTIN"));
    assert_valid_pdf(&g.dispatch_confirmation(&confirmacion).unwrap());

    let aviso = samples::aviso_extemporaneidad(fecha(2025, 9, 3));
    assert_valid_pdf(&g.lateness_notice(&aviso).unwrap());
}

#[test]
fn every_sample_renders() {
    let g = generator();
    for kind in SampleKind::ALL {
        let ctx = kind.context(g.empresa(), fecha(2025, 9, 3)).unwrap();
        let bytes = g.render(kind.template(), &ctx).unwrap();
        assert_valid_pdf(&bytes);
    }
}

// =====================================================================
// Template resolution and binding errors
// =====================================================================

#[test]
fn missing_template_is_not_found() {
    let err = generator().render("reporte-inexistente", &Context::new()).unwrap_err();
    assert!(matches!(err, RenderError::TemplateNotFound { ref name } if name == "reporte-inexistente"));
}

#[test]
fn path_like_names_are_not_found() {
    let g = generator();
    for name in ["../secreto", "/etc/passwd", "reporte-*", "a//b", "./reporte-ventas", ""] {
        let err = g.render(name, &Context::new()).unwrap_err();
        assert!(matches!(err, RenderError::TemplateNotFound { .. }), "{name:?} gave {err:?}");
    }
}

#[test]
fn missing_variable_is_a_binding_error() {
    let engine = TemplateEngine::from_sources([("saludo", "<p>{{ nombre }}</p>")]).unwrap();
    let g = ReportGenerator::new(Arc::new(engine), PdfRenderer::default());
    let err = g.render("saludo", &Context::new()).unwrap_err();
    assert!(matches!(err, RenderError::ContextBinding { ref template, .. } if template == "saludo"));
}

#[test]
fn templates_directory_overrides_embedded() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("prueba-simple.html"), "<p>{{ saludo }}</p>").unwrap();
    std::fs::create_dir(dir.path().join("extra")).unwrap();
    std::fs::write(dir.path().join("extra/nota.html"), "<p>nota</p>").unwrap();

    let engine = TemplateEngine::with_overrides(Some(dir.path())).unwrap();
    assert!(engine.has_template("reporte-ventas"));
    assert!(engine.has_template("extra/nota"));

    let mut ctx = Context::new();
    ctx.set("saludo", "hola");
    assert_eq!(engine.render("prueba-simple", &ctx).unwrap(), "<p>hola</p>");
}

// =====================================================================
// Assets
// =====================================================================

const LINKED: &str = r#"<html><head><link rel="stylesheet" href="estilo.css"/></head>
<body><p class="aviso">hola</p></body></html>"#;

#[test]
fn linked_stylesheet_resolves_against_base() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("estilo.css"), ".aviso { font-size: 20px; }").unwrap();

    let layout = PdfRenderer::default().layout(LINKED, Some(dir.path())).unwrap();
    let text = layout.pages[0].boxes[0].children[0].text.as_ref().unwrap();
    assert_eq!(text.font_size, 20.0);
}

#[test]
fn missing_linked_stylesheet_is_an_asset_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = PdfRenderer::default().to_pdf(LINKED, Some(dir.path())).unwrap_err();
    assert!(matches!(err, RenderError::Asset { ref reference, .. } if reference == "estilo.css"));
}

#[test]
fn missing_image_is_an_asset_error() {
    let dir = tempfile::tempdir().unwrap();
    let html = r#"<div><img src="logo.png" width="50" height="20"/></div>"#;
    let err = PdfRenderer::default().to_pdf(html, Some(dir.path())).unwrap_err();
    assert!(matches!(err, RenderError::Asset { .. }));
}

// =====================================================================
// Output destinations
// =====================================================================

#[test]
fn file_output_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("salida/prueba.pdf");
    let written = generator().render_to_file("prueba-simple", &Context::new(), &path).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(written, bytes.len());
    assert_valid_pdf(&bytes);
}

#[test]
fn failed_render_creates_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-debe-existir.pdf");
    assert!(generator().render_to_file("no-existe", &Context::new(), &path).is_err());
    assert!(!path.exists());

    let renderer = PdfRenderer::default();
    assert!(renderer.write_pdf_file("<div><p>roto</div>", None, &path).is_err());
    assert!(!Path::new(&path).exists());
}

#[test]
fn failed_render_writes_nothing_to_writer() {
    let mut out = Vec::new();
    let err = generator().render_to_writer("no-existe", &Context::new(), &mut out);
    assert!(err.is_err());
    assert!(out.is_empty());
}

// =====================================================================
// Concurrency
// =====================================================================

#[test]
fn concurrent_renders_share_one_generator() {
    let g = generator();
    let datos = samples::datos_reporte();
    let reporte = samples::reporte_posiciones();

    thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let g = g.clone();
                let datos = &datos;
                let reporte = &reporte;
                s.spawn(move || {
                    if i % 2 == 0 {
                        g.sales_report(datos)
                    } else {
                        g.position_report(reporte)
                    }
                })
            })
            .collect();
        for handle in handles {
            assert_valid_pdf(&handle.join().unwrap().unwrap());
        }
    });
}

// =====================================================================
// Determinism
// =====================================================================

#[test]
fn layout_is_reproducible() {
    let g = generator();
    let ctx = sales_context(&samples::datos_reporte(), g.empresa(), fecha(2024, 2, 1)).unwrap();
    let first = layout_of(&g, REPORTE_VENTAS, &ctx);
    let second = layout_of(&g, REPORTE_VENTAS, &ctx);
    assert_eq!(first, second);
    assert_eq!(digest(&first), digest(&second));
}

#[test]
fn pdf_bytes_are_reproducible() {
    let renderer = PdfRenderer::default();
    let html = "<html><body><p>hola</p></body></html>";
    let first = renderer.to_pdf(html, None).unwrap();
    thread::sleep(Duration::from_millis(1100));
    let second = renderer.to_pdf(html, None).unwrap();
    assert_eq!(first, second);
}

#[test]
fn report_bytes_are_reproducible() {
    let g = generator();
    let ctx = position_context(&samples::reporte_posiciones());
    let first = g.render(REPORTE_POSICIONES, &ctx).unwrap();
    let second = g.render(REPORTE_POSICIONES, &ctx).unwrap();
    assert_eq!(Sha256::digest(&first), Sha256::digest(&second));
}

#[test]
fn layout_survives_json_round_trip() {
    let g = generator();
    let ctx = position_context(&samples::reporte_posiciones());
    let layout = layout_of(&g, REPORTE_POSICIONES, &ctx);
    let back = LayoutConfig::from_json(&layout.to_json().unwrap()).unwrap();
    assert_eq!(digest(&layout), digest(&back));
}

#[test]
fn default_pipeline_config_is_portrait_a4() {
    let config = PipelineConfig::default();
    assert_eq!(config.page.orientation(), PageOrientation::Portrait);
    assert_eq!(PipelineConfig::a4_landscape().page.orientation(), PageOrientation::Landscape);
}

// =====================================================================
// Flattening properties
// =====================================================================

#[derive(Serialize)]
struct Base {
    clave: String,
    nivel: u32,
}

impl Ancestry for Base {}

#[derive(Serialize)]
struct Derivado {
    #[serde(skip)]
    base: Base,
    nivel: u32,
    nota: Option<String>,
}

impl Ancestry for Derivado {
    fn parent(&self) -> Option<&dyn Flatten> {
        Some(&self.base)
    }
}

fn derivado() -> Derivado {
    Derivado {
        base: Base {
            clave: "ACTIN".into(),
            nivel: 1,
        },
        nivel: 2,
        nota: None,
    }
}

#[test]
fn flatten_is_stable() {
    let d = derivado();
    assert_eq!(flatten(&d), flatten(&d));
}

#[test]
fn derived_fields_shadow_ancestors() {
    let ctx = flatten_with_ancestors(&derivado());
    assert_eq!(ctx.get("nivel"), Some(&json!(2)));
    assert_eq!(ctx.get("clave"), Some(&json!("ACTIN")));
    assert!(!flatten(&derivado()).contains_key("clave"));
}

#[test]
fn excluded_names_never_appear() {
    let d = derivado();
    assert!(!flatten_excluding(&d, &["nivel"]).contains_key("nivel"));
    assert!(!flatten_excluding(&d, &["ausente"]).contains_key("ausente"));
    assert!(flatten_excluding(&d, &["ausente"]).contains_key("nota"));
}

#[test]
fn empty_inputs_flatten_to_empty_contexts() {
    assert!(flatten(&()).is_empty());
    assert!(flatten(&None::<Base>).is_empty());
    assert!(flatten(&json!(42)).is_empty());
}
