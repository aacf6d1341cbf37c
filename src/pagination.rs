//! Pagination – splits the positioned document flow into pages.
//!
//! Handles:
//! - page boundaries from the resolved [`PageGeometry`]
//! - `page-break-before` / `page-break-after` hints
//! - table row splitting across pages
//! - per-line horizontal alignment of text

use crate::fonts::FontManager;
use crate::layout::{BoxContent, PositionedBox};
use crate::layout_config::*;
use crate::page::PageGeometry;
use crate::style;

/// Recursively expand any pure-container box whose height exceeds a single
/// page so its children can be split across pages individually.
fn flatten_for_pagination(boxes: &[PositionedBox], content_height: f32) -> Vec<&PositionedBox> {
    let mut result = Vec::new();
    for pbox in boxes {
        if pbox.height > content_height
            && matches!(pbox.content, BoxContent::None)
            && !pbox.children.is_empty()
            && !pbox.is_table_like()
        {
            result.extend(flatten_for_pagination(&pbox.children, content_height));
        } else {
            result.push(pbox);
        }
    }
    result
}

/// Page-splitting state.
struct Paginator<'a> {
    config: LayoutConfig,
    current: PageLayout,
    /// Document-space y at which the current page begins.
    page_start_doc_y: f32,
    page: &'a PageGeometry,
    fonts: &'a FontManager,
}

impl<'a> Paginator<'a> {
    fn new(title: &str, page: &'a PageGeometry, fonts: &'a FontManager) -> Self {
        Self {
            config: LayoutConfig::new(title, page),
            current: PageLayout {
                page_index: 0,
                boxes: Vec::new(),
            },
            page_start_doc_y: 0.0,
            page,
            fonts,
        }
    }

    fn content_height(&self) -> f32 {
        self.page.content_height()
    }

    fn y_on_page(&self, pbox: &PositionedBox) -> f32 {
        (pbox.y - self.page_start_doc_y).max(0.0)
    }

    fn start_new_page(&mut self, doc_y: f32) {
        let next = PageLayout {
            page_index: self.config.pages.len() + 1,
            boxes: Vec::new(),
        };
        let done = std::mem::replace(&mut self.current, next);
        self.config.pages.push(done);
        self.page_start_doc_y = doc_y;
    }

    fn place(&mut self, pbox: &PositionedBox) {
        let y = self.page.margins.top + self.y_on_page(pbox);
        let lbox = build_layout_box(pbox, pbox.x, y, self.fonts);
        self.current.boxes.push(lbox);
    }

    fn push(&mut self, pbox: &PositionedBox) {
        if pbox.page_break_before && !self.current.boxes.is_empty() {
            self.start_new_page(pbox.y);
        }

        let overflows = self.y_on_page(pbox) + pbox.height > self.content_height();
        if overflows && pbox.is_table_like() && !pbox.page_break_inside_avoid {
            self.split_table(pbox);
        } else {
            if overflows && !self.current.boxes.is_empty() {
                self.start_new_page(pbox.y);
            }
            self.place(pbox);
        }

        if pbox.page_break_after {
            self.start_new_page(pbox.y + pbox.height);
        }
    }

    /// Place a table row by row, breaking between rows. The table's own
    /// border is drawn around the part of it that lands on each page.
    fn split_table(&mut self, table: &PositionedBox) {
        for row in &table.children {
            let overflows = self.y_on_page(row) + row.height > self.content_height();
            if overflows && !self.current.boxes.is_empty() {
                self.start_new_page(row.y);
            }
            self.place(row);
        }
    }

    fn finish(mut self) -> LayoutConfig {
        if !self.current.boxes.is_empty() || self.config.pages.is_empty() {
            self.config.pages.push(self.current);
        }
        self.config
    }
}

/// Convert positioned boxes into a paginated [`LayoutConfig`].
///
/// A document always has at least one page, even when it has no content.
pub fn paginate(
    boxes: &[PositionedBox],
    page: &PageGeometry,
    title: &str,
    fonts: &FontManager,
) -> LayoutConfig {
    let flat = flatten_for_pagination(boxes, page.content_height());
    let mut paginator = Paginator::new(title, page, fonts);
    for pbox in flat {
        paginator.push(pbox);
    }
    let config = paginator.finish();
    log::debug!("Paginated into {} page(s)", config.pages.len());
    config
}

/// Recursively build a LayoutBox tree where every box carries page-absolute
/// coordinates (origin = top-left of the physical page).
///
/// `PositionedBox.y` values are document-space absolutes, so
/// `child.y - parent.y` is the child's offset within its parent.
fn build_layout_box(pbox: &PositionedBox, abs_x: f32, abs_y: f32, fonts: &FontManager) -> LayoutBox {
    let mut lb = LayoutBox::new(abs_x, abs_y, pbox.width, pbox.height);
    let s = &pbox.style;

    if !s.background_color.is_transparent() {
        let c = &s.background_color;
        lb.background_color = Some([c.r, c.g, c.b, c.a]);
    }

    if s.border_width > 0.0 && !s.border_color.is_transparent() {
        let c = &s.border_color;
        lb.border = Some(BorderStyle {
            width: s.border_width,
            color: [c.r, c.g, c.b, c.a],
        });
    }

    match &pbox.content {
        BoxContent::Text { lines, .. } => {
            let line_height = fonts.line_height_px(s.font_size, s.line_height);
            let bold = s.font_weight == style::FontWeight::Bold;
            let italic = s.font_style == style::FontStyle::Italic;
            let text_lines = lines
                .iter()
                .enumerate()
                .map(|(i, line)| {
                    let line_width =
                        fonts.measure_text_width(line, s.font_size, bold, italic, &s.font_family);
                    let slack = (pbox.width - line_width).max(0.0);
                    let x_offset = match s.text_align {
                        style::TextAlign::Left => 0.0,
                        style::TextAlign::Center => slack / 2.0,
                        style::TextAlign::Right => slack,
                    };
                    TextLine {
                        text: line.clone(),
                        x_offset,
                        y_offset: i as f32 * line_height,
                    }
                })
                .collect();
            lb.text = Some(text_content(s, text_lines, line_height, None));
        }
        BoxContent::Image { src } => {
            lb.image = Some(ImageContent {
                src: src.clone(),
                width: pbox.width,
                height: pbox.height,
            });
        }
        BoxContent::ListItem { marker } => {
            // The marker is drawn in the gutter left of the <li>; the item's
            // own text comes from its children.
            let line_height = fonts.line_height_px(s.font_size, s.line_height);
            lb.text = Some(text_content(s, Vec::new(), line_height, Some(marker.clone())));
        }
        BoxContent::None => {}
    }

    for child in &pbox.children {
        let child_abs_y = abs_y + (child.y - pbox.y);
        lb.children
            .push(build_layout_box(child, child.x, child_abs_y, fonts));
    }

    lb
}

fn text_content(
    s: &style::ComputedStyle,
    lines: Vec<TextLine>,
    line_height: f32,
    list_marker: Option<String>,
) -> TextContent {
    let c = &s.color;
    TextContent {
        lines,
        font_family: s.font_family.clone(),
        font_size: s.font_size,
        bold: s.font_weight == style::FontWeight::Bold,
        italic: s.font_style == style::FontStyle::Italic,
        color: [c.r, c.g, c.b, c.a],
        line_height,
        text_align: match s.text_align {
            style::TextAlign::Left => "left",
            style::TextAlign::Center => "center",
            style::TextAlign::Right => "right",
        }
        .to_string(),
        underline: s.text_decoration == style::TextDecoration::Underline,
        list_marker,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use crate::layout::compute_layout;
    use crate::page::{PageMargins, PageSize};
    use crate::style::{build_styled_tree, ComputedStyle};
    use crate::stylesheet::Stylesheet;

    fn paginate_html(html: &str, page: &PageGeometry) -> LayoutConfig {
        let dom = parse_html(html);
        let root = ComputedStyle::root("Helvetica", 10.0);
        let styled = build_styled_tree(&dom, Some(&root), &Stylesheet::default());
        let fonts = FontManager::default();
        let boxes = compute_layout(&styled, page, &fonts).unwrap();
        paginate(&boxes, page, "Prueba", &fonts)
    }

    #[test]
    fn single_page() {
        let config = paginate_html("<p>Short text</p>", &PageGeometry::default());
        assert_eq!(config.pages.len(), 1);
        assert_eq!(config.title, "Prueba");
        assert_eq!(config.text_lines(), vec!["Short text"]);
    }

    #[test]
    fn empty_document_has_one_page() {
        let config = paginate(&[], &PageGeometry::default(), "Vacio", &FontManager::default());
        assert_eq!(config.pages.len(), 1);
        assert!(config.pages[0].boxes.is_empty());
    }

    #[test]
    fn multiple_pages() {
        let html: String = (0..80)
            .map(|i| format!("<p>Paragraph {i} with some text</p>"))
            .collect();
        let config = paginate_html(&html, &PageGeometry::default());
        assert!(config.pages.len() > 1, "got {}", config.pages.len());
        for (i, page) in config.pages.iter().enumerate() {
            assert_eq!(page.page_index, i);
        }
    }

    #[test]
    fn boxes_respect_top_and_bottom_margins() {
        let page = PageGeometry {
            size: PageSize::A5,
            margins: PageMargins {
                top: 60.0,
                right: 20.0,
                bottom: 80.0,
                left: 30.0,
            },
        };
        let html: String = (0..60).map(|i| format!("<p>Fila {i}</p>")).collect();
        let config = paginate_html(&html, &page);
        let bottom_limit = page.size.height - page.margins.bottom + 0.5;
        for page_layout in &config.pages {
            for lbox in &page_layout.boxes {
                assert!(lbox.y >= 60.0 - 0.01);
                assert!(lbox.y + lbox.height <= bottom_limit, "box ends at {}", lbox.y + lbox.height);
                assert_eq!(lbox.x, 30.0);
            }
        }
    }

    #[test]
    fn long_tables_split_between_rows() {
        let rows: String = (0..120)
            .map(|i| format!("<tr><td>AMX{i}</td><td>{i}</td></tr>"))
            .collect();
        let config = paginate_html(&format!("<table>{rows}</table>"), &PageGeometry::default());
        assert!(config.pages.len() > 1);
        let total_rows: usize = config.pages.iter().map(|p| p.boxes.len()).sum();
        assert_eq!(total_rows, 120);
    }

    #[test]
    fn forced_break_starts_a_new_page() {
        let html = r#"<p>Uno</p><p style="page-break-before: always">Dos</p>"#;
        let config = paginate_html(html, &PageGeometry::default());
        assert_eq!(config.pages.len(), 2);
        assert!((config.pages[1].boxes[0].y - 40.0).abs() < 0.01);
    }

    #[test]
    fn centered_lines_get_an_offset() {
        let html = r#"<p style="text-align: center">Centro</p>"#;
        let config = paginate_html(html, &PageGeometry::default());
        let p = &config.pages[0].boxes[0];
        let text = p.children[0].text.as_ref().unwrap();
        assert!(text.lines[0].x_offset > 100.0);
    }
}
