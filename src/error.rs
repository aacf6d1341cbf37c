//! Error types for template binding and PDF rendering.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while resolving, binding, or rendering a
/// document.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No template resource matches the logical name.
    #[error("template not found: {name}")]
    TemplateNotFound { name: String },

    /// A template failed to parse when the engine was built.
    #[error("template syntax error in '{name}': {message}")]
    TemplateSyntax { name: String, message: String },

    /// The template referenced something the context does not provide.
    #[error("context binding failed for '{template}': {message}")]
    ContextBinding { template: String, message: String },

    /// A context value could not be serialized.
    #[error("context serialization error: {0}")]
    Context(#[from] serde_json::Error),

    /// The bound markup is not a well-formed document.
    #[error("malformed markup: {0}")]
    Markup(String),

    /// A referenced image or stylesheet could not be loaded.
    #[error("asset '{reference}' could not be loaded: {reason}")]
    Asset { reference: String, reason: String },

    /// Layout or PDF serialization failed.
    #[error("layout failed: {0}")]
    Layout(String),

    /// Settings could not be read or parsed.
    #[error("invalid settings: {0}")]
    Config(String),

    /// The caller-supplied output sink rejected the PDF bytes.
    #[error("failed to write PDF output: {0}")]
    Output(#[source] std::io::Error),

    /// Filesystem error while loading templates or writing output.
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl RenderError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RenderError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn asset(reference: &str, reason: impl ToString) -> Self {
        RenderError::Asset {
            reference: reference.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A single field that could not be read while flattening a value.
///
/// Never returned to callers: the flattener logs it and omits the field.
#[derive(Debug, Error)]
#[error("field '{field}' could not be read: {reason}")]
pub struct FieldAccessError {
    pub field: String,
    pub reason: String,
}
