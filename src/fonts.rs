//! Font metrics and text measurement using `ttf-parser`.
//!
//! Text is drawn with the PDF base-14 Helvetica family. Widths come from a
//! loaded TTF/OTF face when one is registered for the family, otherwise from
//! an average-advance heuristic.

use std::collections::HashMap;
use std::path::Path;

use crate::error::RenderError;

/// A loaded font face with metrics.
#[derive(Clone)]
pub struct FontData {
    /// Raw font bytes (kept alive for ttf-parser's zero-copy API).
    pub bytes: Vec<u8>,
    pub units_per_em: f32,
    pub ascender: f32,
    pub descender: f32,
    pub line_gap: f32,
}

impl FontData {
    fn synthetic() -> Self {
        Self {
            bytes: Vec::new(),
            units_per_em: 1000.0,
            ascender: 750.0,
            descender: -250.0,
            line_gap: 0.0,
        }
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct FontKey {
    pub family: String,
    pub bold: bool,
    pub italic: bool,
}

impl FontKey {
    fn new(family: &str, bold: bool, italic: bool) -> Self {
        Self {
            family: family.to_ascii_lowercase(),
            bold,
            italic,
        }
    }
}

/// Registry of font metrics shared by every render of a renderer.
#[derive(Clone)]
pub struct FontManager {
    fonts: HashMap<FontKey, FontData>,
    default_key: FontKey,
}

impl FontManager {
    pub fn new() -> Self {
        Self {
            fonts: HashMap::new(),
            default_key: FontKey::new("Helvetica", false, false),
        }
    }

    /// Load a TTF/OTF font from bytes.
    pub fn load_font(
        &mut self,
        family: &str,
        bold: bool,
        italic: bool,
        bytes: Vec<u8>,
    ) -> Result<(), RenderError> {
        let face = ttf_parser::Face::parse(&bytes, 0)
            .map_err(|e| RenderError::asset(family, format!("failed to parse font: {e}")))?;

        let data = FontData {
            units_per_em: face.units_per_em() as f32,
            ascender: face.ascender() as f32,
            descender: face.descender() as f32,
            line_gap: face.line_gap() as f32,
            bytes,
        };
        log::debug!("Loaded metrics for {family} (bold={bold}, italic={italic})");
        self.fonts.insert(FontKey::new(family, bold, italic), data);
        Ok(())
    }

    /// Read a font file and use its advances for regular `family` text.
    pub fn load_font_file(&mut self, family: &str, path: &Path) -> Result<(), RenderError> {
        let bytes = std::fs::read(path).map_err(|e| RenderError::io(path, e))?;
        self.load_font(family, false, false, bytes)
    }

    /// Register synthetic Helvetica-like metrics when nothing is loaded.
    pub fn ensure_default(&mut self) {
        if self.fonts.is_empty() {
            for bold in [false, true] {
                self.fonts
                    .insert(FontKey::new("Helvetica", bold, false), FontData::synthetic());
            }
        }
    }

    /// Font data for a key, falling back to the regular face of the family
    /// and then to the default.
    pub fn get(&self, family: &str, bold: bool, italic: bool) -> Option<&FontData> {
        self.fonts
            .get(&FontKey::new(family, bold, italic))
            .or_else(|| self.fonts.get(&FontKey::new(family, false, false)))
            .or_else(|| self.fonts.get(&self.default_key))
    }

    /// Measure the width of a string at a given font size (in pt).
    ///
    /// Real font bytes are measured glyph by glyph; otherwise the average
    /// advance is 0.5 × font size (0.55 for bold).
    pub fn measure_text_width(
        &self,
        text: &str,
        font_size: f32,
        bold: bool,
        italic: bool,
        family: &str,
    ) -> f32 {
        let avg = if bold { 0.55 } else { 0.5 };
        let heuristic = text.chars().count() as f32 * font_size * avg;

        let Some(data) = self.get(family, bold, italic) else {
            return heuristic;
        };
        if data.bytes.is_empty() {
            return heuristic;
        }

        match ttf_parser::Face::parse(&data.bytes, 0) {
            Ok(face) => {
                let scale = font_size / data.units_per_em;
                let mut width: f32 = text
                    .chars()
                    .map(|ch| match face.glyph_index(ch) {
                        Some(gid) => face.glyph_hor_advance(gid).unwrap_or(0) as f32 * scale,
                        None => font_size * 0.5,
                    })
                    .sum();
                // Regular metrics stand in for bold faces that are not loaded.
                if bold && !self.fonts.contains_key(&FontKey::new(family, true, italic)) {
                    width *= 1.1;
                }
                width
            }
            Err(_) => heuristic,
        }
    }

    /// Line height in pt.
    pub fn line_height_px(&self, font_size: f32, line_height_factor: f32) -> f32 {
        font_size * line_height_factor
    }
}

impl Default for FontManager {
    fn default() -> Self {
        let mut mgr = Self::new();
        mgr.ensure_default();
        mgr
    }
}

/// Word-wrap text to fit within `max_width` points. Returns a vec of lines.
/// Existing `\n` characters are hard breaks.
pub fn wrap_text(
    text: &str,
    font_size: f32,
    bold: bool,
    italic: bool,
    family: &str,
    max_width: f32,
    fonts: &FontManager,
) -> Vec<String> {
    if max_width <= 0.0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let mut lines: Vec<String> = Vec::new();
    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current_line = String::new();
        for word in &words {
            let candidate = if current_line.is_empty() {
                word.to_string()
            } else {
                format!("{current_line} {word}")
            };
            let w = fonts.measure_text_width(&candidate, font_size, bold, italic, family);
            if w > max_width && !current_line.is_empty() {
                lines.push(current_line);
                current_line = word.to_string();
            } else {
                current_line = candidate;
            }
        }
        if !current_line.is_empty() {
            lines.push(current_line);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
