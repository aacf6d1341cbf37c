//! Layout config – the frozen, paginated description of a document that sits
//! between layout computation and PDF serialization. It is plain data, so it
//! can be dumped as JSON for inspection and diffed between runs.

use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::page::{PageGeometry, PageOrientation};

/// A complete document layout ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Document title embedded in the PDF metadata.
    #[serde(default = "LayoutConfig::default_title")]
    pub title: String,
    /// Width of each page in PDF points (1 pt = 1/72 inch).
    pub page_width_pt: f32,
    /// Height of each page in PDF points.
    pub page_height_pt: f32,
    pub pages: Vec<PageLayout>,
}

/// One page of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_index: usize,
    pub boxes: Vec<LayoutBox>,
}

/// A positioned rectangle with optional content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutBox {
    /// Position relative to page top-left, in points.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,

    pub background_color: Option<[f32; 4]>,
    pub border: Option<BorderStyle>,

    /// Content (mutually exclusive in practice)
    pub text: Option<TextContent>,
    pub image: Option<ImageContent>,

    pub children: Vec<LayoutBox>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorderStyle {
    pub width: f32,
    pub color: [f32; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    /// Pre-wrapped lines of text.
    pub lines: Vec<TextLine>,
    pub font_family: String,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub color: [f32; 4],
    pub line_height: f32,
    pub text_align: String,
    pub underline: bool,
    /// List bullet/number prefix (e.g. "• " or "1. ")
    pub list_marker: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    /// X offset within the layout box (for alignment)
    pub x_offset: f32,
    /// Y offset from the top of the text content area
    pub y_offset: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    /// A `data:` URI; external references are inlined before layout.
    pub src: String,
    pub width: f32,
    pub height: f32,
}

impl LayoutConfig {
    /// An empty layout for pages of the given geometry.
    pub fn new(title: impl Into<String>, page: &PageGeometry) -> Self {
        Self {
            title: title.into(),
            page_width_pt: page.size.width,
            page_height_pt: page.size.height,
            pages: Vec::new(),
        }
    }

    fn default_title() -> String {
        "EMISNET".to_string()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn orientation(&self) -> PageOrientation {
        if self.page_width_pt > self.page_height_pt {
            PageOrientation::Landscape
        } else {
            PageOrientation::Portrait
        }
    }

    /// Every text line on every page, in drawing order.
    pub fn text_lines(&self) -> Vec<&str> {
        fn walk<'a>(lbox: &'a LayoutBox, out: &mut Vec<&'a str>) {
            if let Some(text) = &lbox.text {
                out.extend(text.lines.iter().map(|l| l.text.as_str()));
            }
            for child in &lbox.children {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        for page in &self.pages {
            for lbox in &page.boxes {
                walk(lbox, &mut out);
            }
        }
        out
    }

    pub fn to_json(&self) -> Result<String, RenderError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, RenderError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl LayoutBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            background_color: None,
            border: None,
            text: None,
            image: None,
            children: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{PageMargins, PageSize};

    #[test]
    fn json_keeps_geometry_and_defaults_title() {
        let page = PageGeometry {
            size: PageSize::LETTER,
            margins: PageMargins::uniform(36.0),
        };
        let config = LayoutConfig::new("Aviso", &page);
        let json = config.to_json().unwrap();
        let back = LayoutConfig::from_json(&json).unwrap();
        assert_eq!(back, config);

        let untitled =
            LayoutConfig::from_json(r#"{"page_width_pt": 612, "page_height_pt": 792, "pages": []}"#)
                .unwrap();
        assert_eq!(untitled.title, "EMISNET");
        assert_eq!(untitled.orientation(), PageOrientation::Portrait);
    }
}
