//! Tera template engine – named HTML templates bound to a [`Context`].
//!
//! A logical name such as `reporte-ventas` resolves to
//! `<root>/reporte-ventas.html`. Names may contain `/` to reach
//! sub-directories, but never `..`, absolute paths or glob characters.
//!
//! Templates are registered with their `.html` suffix so Tera's HTML
//! autoescaping applies to every `{{ }}` substitution.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::error::Error as _;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tera::Tera;

use crate::context::Context;
use crate::error::RenderError;

const TEMPLATE_SUFFIX: &str = ".html";

// ---------------------------------------------------------------------------
// Embedded templates, baked into the binary at compile time
// ---------------------------------------------------------------------------

const EMBEDDED: &[(&str, &str)] = &[
    ("reporte-ventas", include_str!("templates/reporte-ventas.html")),
    ("reporte-posiciones", include_str!("templates/reporte-posiciones.html")),
    ("confirmacion-envio", include_str!("templates/confirmacion-envio.html")),
    (
        "aviso-extemporaneidad",
        include_str!("templates/aviso-extemporaneidad.html"),
    ),
    ("prueba-simple", include_str!("templates/prueba-simple.html")),
];

// ---------------------------------------------------------------------------
// Name validation and directory loading
// ---------------------------------------------------------------------------

/// Check that `name` is a plain relative logical name.
fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("empty name");
    }
    if name.starts_with('/') || name.contains('\\') || name.contains(':') {
        return Err("absolute or platform-specific path");
    }
    if name.chars().any(|c| matches!(c, '*' | '?' | '[' | ']' | '{' | '}')) {
        return Err("pattern characters");
    }
    if name
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err("relative path segment");
    }
    Ok(())
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RenderError> {
    let entries = std::fs::read_dir(dir).map_err(|e| RenderError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| RenderError::io(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| RenderError::io(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

/// Read every `*.html` under `dir`, keyed by logical name.
fn load_dir_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    let mut files = Vec::new();
    collect_template_files(dir, &mut files)?;
    files.sort();

    let mut templates = Vec::new();
    for path in files {
        if path.extension().and_then(|s| s.to_str()) != Some("html") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let rel = rel.to_string_lossy().replace('\\', "/");
        let name = rel.trim_end_matches(TEMPLATE_SUFFIX).to_string();
        let contents = std::fs::read_to_string(&path).map_err(|e| RenderError::io(&path, e))?;
        templates.push((name, contents));
    }
    Ok(templates)
}

/// Flatten an error and its sources into one line.
fn describe(err: &tera::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}

/// Pull `name` out of a Tera message like `Failed to parse 'name.html'`.
fn quoted_template_name(message: &str) -> Option<String> {
    let start = message.find('\'')? + 1;
    let end = start + message[start..].find('\'')?;
    Some(message[start..end].trim_end_matches(TEMPLATE_SUFFIX).to_string())
}

// ---------------------------------------------------------------------------
// Number formatting (shared by the filters and report summaries)
// ---------------------------------------------------------------------------

/// Insert comma thousands separators into `abs` (an unsigned decimal) and
/// restore the sign of `value` unless the digits are all zero.
fn group_digits(value: f64, abs: &str) -> String {
    let (int_part, frac_part) = match abs.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (abs, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }

    let is_zero = abs.chars().all(|c| c == '0' || c == '.');
    if value.is_sign_negative() && !is_zero {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Format with `decimals` places and comma thousands separators.
pub fn format_number(value: f64, decimals: usize) -> String {
    group_digits(value, &format!("{:.*}", decimals, value.abs()))
}

/// Format with comma thousands separators, keeping every digit of `value`:
/// `9966.0` gives `9,966` and `9966.4` gives `9,966.4`.
pub fn format_exact(value: f64) -> String {
    group_digits(value, &value.abs().to_string())
}

/// Format as an amount of money: `$1,234.50`, `-$3.00`.
pub fn format_money(value: f64) -> String {
    let formatted = format_number(value, 2);
    match formatted.strip_prefix('-') {
        Some(abs) => format!("-${abs}"),
        None => format!("${formatted}"),
    }
}

fn number_arg(filter: &str, value: &Value) -> tera::Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| tera::Error::msg(format!("Filter `{filter}` expected a number, got {value}")))
}

/// `{{ x | numero }}` keeps the value's own precision;
/// `{{ x | numero(decimales=0) }}` rounds to a fixed number of places.
fn numero_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let number = number_arg("numero", value)?;
    let formatted = match args.get("decimales") {
        Some(d) => {
            let decimals = d.as_u64().ok_or_else(|| {
                tera::Error::msg("Filter `numero`: `decimales` must be a non-negative integer")
            })?;
            format_number(number, decimals as usize)
        }
        None => format_exact(number),
    };
    Ok(Value::String(formatted))
}

/// `{{ x | moneda }}`
fn moneda_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let number = number_arg("moneda", value)?;
    Ok(Value::String(format_money(number)))
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// A set of named templates ready to be bound against contexts.
///
/// Immutable after construction; share it across threads behind an `Arc`.
pub struct TemplateEngine {
    tera: Tera,
    names: BTreeSet<String>,
}

impl std::fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateEngine")
            .field("templates", &self.names)
            .finish()
    }
}

impl TemplateEngine {
    /// Build an engine from `(logical name, source)` pairs.
    pub fn from_sources<I, N, S>(sources: I) -> Result<Self, RenderError>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        let mut templates: BTreeMap<String, String> = BTreeMap::new();
        for (name, source) in sources {
            let name = name.into();
            if let Err(reason) = validate_name(&name) {
                return Err(RenderError::TemplateSyntax {
                    message: format!("invalid template name ({reason})"),
                    name,
                });
            }
            templates.insert(name, source.into());
        }

        let mut tera = Tera::default();
        tera.register_filter("numero", numero_filter);
        tera.register_filter("moneda", moneda_filter);

        let items: Vec<(String, String)> = templates
            .iter()
            .map(|(name, source)| (format!("{name}{TEMPLATE_SUFFIX}"), source.clone()))
            .collect();
        tera.add_raw_templates(items).map_err(|e| {
            let message = describe(&e);
            RenderError::TemplateSyntax {
                name: quoted_template_name(&message).unwrap_or_else(|| "<templates>".into()),
                message,
            }
        })?;

        let names: BTreeSet<String> = templates.into_keys().collect();
        log::debug!("Template engine ready with {} template(s)", names.len());
        Ok(Self { tera, names })
    }

    /// Every `*.html` file under `root`.
    pub fn from_dir(root: impl AsRef<Path>) -> Result<Self, RenderError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(RenderError::io(
                root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "template root is not a directory"),
            ));
        }
        log::info!("Loading templates from {}", root.display());
        Self::from_sources(load_dir_templates(root)?)
    }

    /// The built-in report templates.
    pub fn embedded() -> Result<Self, RenderError> {
        Self::with_overrides(None)
    }

    /// Built-in templates, replaced or extended by the files in `dir`.
    pub fn with_overrides(dir: Option<&Path>) -> Result<Self, RenderError> {
        let mut sources: BTreeMap<String, String> = EMBEDDED
            .iter()
            .map(|(name, source)| (name.to_string(), source.to_string()))
            .collect();
        if let Some(dir) = dir {
            if dir.is_dir() {
                for (name, source) in load_dir_templates(dir)? {
                    log::debug!("Template '{name}' overridden from {}", dir.display());
                    sources.insert(name, source);
                }
            } else {
                log::warn!("Template override directory {} does not exist", dir.display());
            }
        }
        Self::from_sources(sources)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Logical names of every registered template, sorted.
    pub fn template_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Bind `context` to the template called `name` and return the markup.
    pub fn render(&self, name: &str, context: &Context) -> Result<String, RenderError> {
        if let Err(reason) = validate_name(name) {
            log::warn!("Rejected template name {name:?}: {reason}");
            return Err(RenderError::TemplateNotFound {
                name: name.to_string(),
            });
        }
        if !self.has_template(name) {
            return Err(RenderError::TemplateNotFound {
                name: name.to_string(),
            });
        }

        let key = format!("{name}{TEMPLATE_SUFFIX}");
        self.tera
            .render(&key, &context.to_tera())
            .map_err(|e| match &e.kind {
                tera::ErrorKind::TemplateNotFound(missing) => RenderError::TemplateNotFound {
                    name: missing.trim_end_matches(TEMPLATE_SUFFIX).to_string(),
                },
                _ => RenderError::ContextBinding {
                    template: name.to_string(),
                    message: describe(&e),
                },
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine(sources: &[(&str, &str)]) -> TemplateEngine {
        TemplateEngine::from_sources(sources.iter().copied()).unwrap()
    }

    #[test]
    fn renders_with_autoescape() {
        let e = engine(&[("saludo", "<p>{{ nombre }}</p>")]);
        let mut ctx = Context::new();
        ctx.set("nombre", "<b>A & B</b>");
        let html = e.render("saludo", &ctx).unwrap();
        assert_eq!(html, "<p>&lt;b&gt;A &amp; B&lt;&#x2F;b&gt;</p>");
    }

    #[test]
    fn traversal_names_are_not_found() {
        let e = engine(&[("saludo", "hola")]);
        for name in ["../secreto", "/etc/passwd", "a//b", "*", "saludo.html", ""] {
            let err = e.render(name, &Context::new()).unwrap_err();
            assert!(
                matches!(err, RenderError::TemplateNotFound { .. }),
                "{name}: {err:?}"
            );
        }
    }

    #[test]
    fn missing_variable_is_a_binding_error() {
        let e = engine(&[("folio", "<p>{{ folioRecepcion }}</p>")]);
        let err = e.render("folio", &Context::new()).unwrap_err();
        match err {
            RenderError::ContextBinding { template, message } => {
                assert_eq!(template, "folio");
                assert!(message.contains("folioRecepcion"), "{message}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn syntax_errors_surface_at_build_time() {
        let err = TemplateEngine::from_sources([("roto", "{% if %}")]).unwrap_err();
        assert!(matches!(err, RenderError::TemplateSyntax { .. }));
    }

    #[test]
    fn number_filters() {
        let e = engine(&[("n", "{{ a | numero(decimales=0) }} {{ b | moneda }} {{ c | numero }}")]);
        let mut ctx = Context::new();
        ctx.set("a", json!(1234567));
        ctx.set("b", json!(-2550.5));
        ctx.set("c", json!(0.126));
        assert_eq!(e.render("n", &ctx).unwrap(), "1,234,567 -$2,550.50 0.126");
    }

    #[test]
    fn numero_without_places_keeps_supplied_precision() {
        let e = engine(&[("n", "{{ a | numero }}|{{ b | numero }}|{{ c | numero }}")]);
        let mut ctx = Context::new();
        ctx.set("a", json!(9966.4));
        ctx.set("b", json!(9966.0));
        ctx.set("c", json!(-1234567.25));
        assert_eq!(e.render("n", &ctx).unwrap(), "9,966.4|9,966|-1,234,567.25");
    }

    #[test]
    fn format_helpers() {
        assert_eq!(format_number(999.0, 0), "999");
        assert_eq!(format_number(1000.0, 1), "1,000.0");
        assert_eq!(format_number(-0.001, 2), "0.00");
        assert_eq!(format_money(0.0), "$0.00");
        assert_eq!(format_exact(533200.0), "533,200");
        assert_eq!(format_exact(0.5), "0.5");
        assert_eq!(format_exact(-0.0), "0");
    }

    #[test]
    fn embedded_templates_are_registered() {
        let e = TemplateEngine::embedded().unwrap();
        let names: Vec<_> = e.template_names().collect();
        assert_eq!(
            names,
            vec![
                "aviso-extemporaneidad",
                "confirmacion-envio",
                "prueba-simple",
                "reporte-posiciones",
                "reporte-ventas",
            ]
        );
    }

    #[test]
    fn directory_templates_include_subfolders() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("avisos")).unwrap();
        std::fs::write(dir.path().join("avisos/breve.html"), "<p>{{ t }}</p>").unwrap();
        std::fs::write(dir.path().join("notas.txt"), "ignored").unwrap();
        let e = TemplateEngine::from_dir(dir.path()).unwrap();
        assert!(e.has_template("avisos/breve"));
        assert_eq!(e.template_names().count(), 1);
    }

    #[test]
    fn overrides_replace_embedded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("prueba-simple.html"), "<p>propia</p>").unwrap();
        let e = TemplateEngine::with_overrides(Some(dir.path())).unwrap();
        assert_eq!(e.render("prueba-simple", &Context::new()).unwrap(), "<p>propia</p>");
        assert!(e.has_template("reporte-ventas"));
    }

    #[test]
    fn missing_root_is_an_io_error() {
        let err = TemplateEngine::from_dir("/definitely/not/here").unwrap_err();
        assert!(matches!(err, RenderError::Io { .. }));
    }
}
