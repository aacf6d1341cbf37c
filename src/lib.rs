//! # emisnet-pdf – named HTML report templates rendered to PDF
//!
//! A report is produced in two steps: a named template is bound against a
//! [`Context`] of variables, and the resulting HTML is laid out and written
//! as a PDF. The rendering stages are:
//!
//! 1. **Bind** – Tera template + context → HTML ([`engine`], [`context`])
//! 2. **Parse** – HTML string → DOM tree ([`dom`])
//! 3. **Resolve** – linked stylesheets and images from disk ([`assets`])
//! 4. **Style** – stylesheet cascade and inline styles ([`stylesheet`], [`style`])
//! 5. **Layout** – flexbox/grid layout with Taffy ([`layout`])
//! 6. **Paginate** – split into pages honouring `@page` ([`pagination`])
//! 7. **Render** – emit PDF bytes via printpdf ([`render`])
//!
//! [`ReportGenerator`] ties both steps together and adds one entry point per
//! built-in document ([`reports`]).

pub mod assets;
pub mod config;
pub mod context;
pub mod dom;
pub mod engine;
pub mod error;
pub mod flatten;
pub mod fonts;
pub mod layout;
pub mod layout_config;
pub mod models;
pub mod page;
pub mod pagination;
pub mod pipeline;
pub mod render;
pub mod reports;
pub mod samples;
pub mod service;
pub mod style;
pub mod stylesheet;

// Re-exports for convenience
pub use config::Settings;
pub use context::{Context, ContextBuilder};
pub use engine::TemplateEngine;
pub use error::RenderError;
pub use flatten::{flatten, flatten_excluding, flatten_with_ancestors, Ancestry, Flatten};
pub use layout_config::LayoutConfig;
pub use page::{PageGeometry, PageOrientation, PageSize};
pub use pipeline::{generate_pdf, generate_pdf_from_html, PdfRenderer, PipelineConfig};
pub use service::ReportGenerator;
