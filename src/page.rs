//! Page geometry – paper sizes, orientation and margins in PDF points.
//!
//! Geometry is a property of the document: it comes from the CSS `@page`
//! rule of the template, falling back to the configured defaults.

use serde::{Deserialize, Serialize};

/// Points per millimetre.
pub const PT_PER_MM: f32 = 72.0 / 25.4;

/// Page orientation for the generated PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageOrientation {
    /// Portrait mode: height > width (default).
    #[default]
    Portrait,
    /// Landscape mode: width > height.
    Landscape,
}

/// Physical page size in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub const A3: Self = Self::new(841.89, 1190.55);
    pub const A4: Self = Self::new(595.28, 841.89);
    pub const A5: Self = Self::new(419.53, 595.28);
    pub const LETTER: Self = Self::new(612.0, 792.0);
    pub const LEGAL: Self = Self::new(612.0, 1008.0);

    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Look up a named paper size (`A4`, `letter`, ...). Case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "a3" => Some(Self::A3),
            "a4" => Some(Self::A4),
            "a5" => Some(Self::A5),
            "letter" | "carta" => Some(Self::LETTER),
            "legal" | "oficio" => Some(Self::LEGAL),
            _ => None,
        }
    }

    pub fn orientation(&self) -> PageOrientation {
        if self.width > self.height {
            PageOrientation::Landscape
        } else {
            PageOrientation::Portrait
        }
    }

    /// Same paper, rotated so that width >= height.
    pub fn landscape(self) -> Self {
        if self.width >= self.height {
            self
        } else {
            Self::new(self.height, self.width)
        }
    }

    /// Same paper, rotated so that height >= width.
    pub fn portrait(self) -> Self {
        if self.height >= self.width {
            self
        } else {
            Self::new(self.height, self.width)
        }
    }

    pub fn with_orientation(self, orientation: PageOrientation) -> Self {
        match orientation {
            PageOrientation::Portrait => self.portrait(),
            PageOrientation::Landscape => self.landscape(),
        }
    }
}

/// Page margins in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageMargins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl PageMargins {
    pub const fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// Expand a CSS-style 1–4 value list (top, right, bottom, left).
    pub fn from_values(values: &[f32]) -> Option<Self> {
        match *values {
            [all] => Some(Self::uniform(all)),
            [vertical, horizontal] => Some(Self {
                top: vertical,
                right: horizontal,
                bottom: vertical,
                left: horizontal,
            }),
            [top, horizontal, bottom] => Some(Self {
                top,
                right: horizontal,
                bottom,
                left: horizontal,
            }),
            [top, right, bottom, left] => Some(Self {
                top,
                right,
                bottom,
                left,
            }),
            _ => None,
        }
    }
}

/// Full page geometry used by layout and pagination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub size: PageSize,
    pub margins: PageMargins,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            margins: PageMargins::uniform(40.0),
        }
    }
}

impl PageGeometry {
    pub fn content_width(&self) -> f32 {
        (self.size.width - self.margins.left - self.margins.right).max(1.0)
    }

    pub fn content_height(&self) -> f32 {
        (self.size.height - self.margins.top - self.margins.bottom).max(1.0)
    }

    pub fn orientation(&self) -> PageOrientation {
        self.size.orientation()
    }

    /// Overlay the parts of an `@page` rule that were specified.
    pub fn with_rule(mut self, rule: &PageRule) -> Self {
        if let Some(size) = rule.size {
            self.size = size;
        }
        if let Some(margins) = rule.margins {
            self.margins = margins;
        }
        self
    }
}

/// The declarations of a CSS `@page` rule that affect geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PageRule {
    pub size: Option<PageSize>,
    pub margins: Option<PageMargins>,
}

impl PageRule {
    /// Later rules override the fields they set.
    pub fn merge(&mut self, other: &PageRule) {
        if other.size.is_some() {
            self.size = other.size;
        }
        if other.margins.is_some() {
            self.margins = other.margins;
        }
    }
}
