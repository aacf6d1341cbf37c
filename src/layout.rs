//! Layout engine – uses Taffy to compute flexbox layout from a styled tree,
//! then converts the result into positioned boxes in document coordinates.
//!
//! Blocks whose children are all inline (text, `<span>`, `<strong>`, `<br>`)
//! become a container plus a single wrapped text leaf. Table rows lay their
//! cells out as a flex row: cells with an explicit width keep it, the rest
//! share the remaining space equally.

use std::collections::HashMap;

use taffy::prelude::*;

use crate::dom::Tag;
use crate::error::RenderError;
use crate::fonts::{wrap_text, FontManager};
use crate::page::PageGeometry;
use crate::style::{
    self, ComputedStyle, Dimension as CssDimension, FontStyle as CssFontStyle, FontWeight,
    StyledNode,
};

// ---------------------------------------------------------------------------
// Intermediate layout tree (pre-pagination)
// ---------------------------------------------------------------------------

/// A positioned box in document coordinates (before page splitting).
///
/// `x` already includes the left page margin; `y` is measured from the top
/// of the content flow.
#[derive(Debug, Clone)]
pub struct PositionedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub tag: Option<Tag>,
    pub style: ComputedStyle,
    pub content: BoxContent,
    pub children: Vec<PositionedBox>,
    pub page_break_before: bool,
    pub page_break_after: bool,
    pub page_break_inside_avoid: bool,
}

#[derive(Debug, Clone)]
pub enum BoxContent {
    None,
    Text { text: String, lines: Vec<String> },
    Image { src: String },
    /// List item marker
    ListItem { marker: String },
}

impl PositionedBox {
    /// True for `<table>` boxes and grid containers that have rows to split.
    pub fn is_table_like(&self) -> bool {
        !self.children.is_empty()
            && (self.tag == Some(Tag::Table) || self.style.display == style::Display::Grid)
    }
}

// ---------------------------------------------------------------------------
// Build Taffy tree from styled nodes
// ---------------------------------------------------------------------------

struct LayoutBuilder<'a> {
    taffy: TaffyTree<()>,
    fonts: &'a FontManager,
    node_styles: HashMap<NodeId, ComputedStyle>,
    node_tags: HashMap<NodeId, Tag>,
    node_content: HashMap<NodeId, BoxContent>,
    available_width: f32,
}

fn layout_err(e: taffy::TaffyError) -> RenderError {
    RenderError::Layout(e.to_string())
}

impl<'a> LayoutBuilder<'a> {
    fn new(fonts: &'a FontManager, available_width: f32) -> Self {
        Self {
            taffy: TaffyTree::new(),
            fonts,
            node_styles: HashMap::new(),
            node_tags: HashMap::new(),
            node_content: HashMap::new(),
            available_width,
        }
    }

    /// Text of an inline subtree; `<br>` becomes a hard line break.
    fn collect_inline_text(node: &StyledNode) -> String {
        match node {
            StyledNode::Text { text, .. } => text.clone(),
            StyledNode::Element { tag: Tag::Br, .. } => "\n".to_string(),
            StyledNode::Element { children, .. } => {
                children.iter().map(Self::collect_inline_text).collect()
            }
        }
    }

    /// Return true when every child is a text node or a display:inline element
    /// (no block-level children, no images).
    fn all_inline(children: &[StyledNode]) -> bool {
        children.iter().all(|c| match c {
            StyledNode::Text { .. } => true,
            StyledNode::Element {
                tag,
                style,
                children: gc,
                ..
            } => {
                *tag != Tag::Img
                    && style.display == style::Display::Inline
                    && Self::all_inline(gc)
            }
        })
    }

    fn build_node(&mut self, styled: &StyledNode, parent_width: f32) -> Result<NodeId, RenderError> {
        match styled {
            StyledNode::Text { text, style } => {
                let normalized = normalize_whitespace(text);
                self.build_text_node(&normalized, style, parent_width)
            }
            StyledNode::Element {
                tag,
                style,
                children,
                attrs,
            } => self.build_element_node(tag, style, children, attrs, parent_width),
        }
    }

    fn build_text_node(
        &mut self,
        text: &str,
        style: &ComputedStyle,
        max_width: f32,
    ) -> Result<NodeId, RenderError> {
        let bold = style.font_weight == FontWeight::Bold;
        let italic = style.font_style == CssFontStyle::Italic;
        let family = &style.font_family;
        let font_size = style.font_size;
        let line_height_px = self.fonts.line_height_px(font_size, style.line_height);

        let max_w = if max_width > 0.0 {
            max_width
        } else {
            self.available_width
        };
        let lines = wrap_text(text, font_size, bold, italic, family, max_w, self.fonts);

        let text_width = lines
            .iter()
            .map(|l| self.fonts.measure_text_width(l, font_size, bold, italic, family))
            .fold(0.0f32, f32::max);
        let text_height = lines.len() as f32 * line_height_px;

        // Aligned text stretches across its container so the renderer can
        // offset each line; left-aligned text keeps its measured width.
        let taffy_style = if style.text_align == style::TextAlign::Left {
            Style {
                size: Size {
                    width: length(text_width),
                    height: length(text_height),
                },
                flex_shrink: 0.0,
                ..Default::default()
            }
        } else {
            Style {
                size: Size {
                    width: auto(),
                    height: length(text_height),
                },
                min_size: Size {
                    width: length(text_width.min(max_w)),
                    height: auto(),
                },
                flex_grow: 1.0,
                flex_shrink: 0.0,
                ..Default::default()
            }
        };

        let node = self.taffy.new_leaf(taffy_style).map_err(layout_err)?;
        self.node_styles.insert(node, style.clone());
        self.node_content.insert(
            node,
            BoxContent::Text {
                text: text.to_string(),
                lines,
            },
        );
        Ok(node)
    }

    fn build_element_node(
        &mut self,
        tag: &Tag,
        style: &ComputedStyle,
        children: &[StyledNode],
        attrs: &HashMap<String, String>,
        parent_width: f32,
    ) -> Result<NodeId, RenderError> {
        let my_width = resolve_width(style.width, parent_width);
        let inner_width = (my_width
            - style.padding_left
            - style.padding_right
            - 2.0 * style.border_width)
            .max(1.0);

        let is_flex_row = style.display == style::Display::Flex
            && style.flex_direction == style::FlexDirection::Row;
        let is_table_row = *tag == Tag::Tr;

        // Block elements with purely inline content get a single text leaf.
        let mut child_nodes = Vec::new();
        let merged = !children.is_empty()
            && !is_table_row
            && *tag != Tag::Img
            && style.display != style::Display::Inline
            && Self::all_inline(children);
        if merged {
            let raw: String = children.iter().map(Self::collect_inline_text).collect();
            let combined = normalize_whitespace(&raw);
            if !combined.is_empty() {
                let leaf_style = text_leaf_style(style);
                child_nodes.push(self.build_text_node(&combined, &leaf_style, inner_width)?);
            }
        } else {
            let widths = if is_table_row {
                row_cell_widths(children, inner_width)
            } else if is_flex_row {
                let count = children
                    .iter()
                    .filter(|c| matches!(c, StyledNode::Element { .. }))
                    .count()
                    .max(1);
                let gap_total = style.gap * count.saturating_sub(1) as f32;
                vec![((inner_width - gap_total) / count as f32).max(1.0); children.len()]
            } else {
                vec![inner_width; children.len()]
            };

            let mut list_counter = 0u32;
            for (child, width) in children.iter().zip(widths) {
                let marker = match child {
                    StyledNode::Element { tag: Tag::Li, .. } => {
                        list_counter += 1;
                        Some(if *tag == Tag::Ol {
                            format!("{list_counter}. ")
                        } else {
                            "\u{2022} ".to_string()
                        })
                    }
                    _ => None,
                };

                let child_id = self.build_node(child, width)?;
                if let Some(marker) = marker {
                    self.node_content
                        .insert(child_id, BoxContent::ListItem { marker });
                }
                child_nodes.push(child_id);
            }
        }

        // <img> with an Auto dimension takes its intrinsic size.
        let style_override = if *tag == Tag::Img
            && (style.width == CssDimension::Auto || style.height == CssDimension::Auto)
        {
            let src = attrs.get("src").map(String::as_str).unwrap_or("");
            resolve_img_auto_dimensions(src, style, parent_width)
        } else {
            None
        };

        let effective_style = style_override.as_ref().unwrap_or(style);
        let taffy_style = computed_to_taffy(effective_style, tag);
        let node = self
            .taffy
            .new_with_children(taffy_style, &child_nodes)
            .map_err(layout_err)?;
        self.node_styles.insert(node, effective_style.clone());
        self.node_tags.insert(node, tag.clone());

        if *tag == Tag::Img {
            let src = attrs.get("src").cloned().unwrap_or_default();
            self.node_content.insert(node, BoxContent::Image { src });
        }

        Ok(node)
    }

    /// Extract positioned boxes after layout computation.
    fn extract(&self, node: NodeId, offset_x: f32, offset_y: f32) -> Result<PositionedBox, RenderError> {
        let layout = self.taffy.layout(node).map_err(layout_err)?;
        let style = self.node_styles.get(&node).cloned().unwrap_or_default();
        let content = self
            .node_content
            .get(&node)
            .cloned()
            .unwrap_or(BoxContent::None);

        let x = offset_x + layout.location.x;
        let y = offset_y + layout.location.y;

        let children = self
            .taffy
            .children(node)
            .map_err(layout_err)?
            .iter()
            .map(|&child| self.extract(child, x, y))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PositionedBox {
            x,
            y,
            width: layout.size.width,
            height: layout.size.height,
            tag: self.node_tags.get(&node).cloned(),
            page_break_before: style.page_break_before,
            page_break_after: style.page_break_after,
            page_break_inside_avoid: style.page_break_inside_avoid,
            style,
            content,
            children,
        })
    }
}

// ---------------------------------------------------------------------------
// Style conversion
// ---------------------------------------------------------------------------

fn dim_to_taffy(d: CssDimension) -> taffy::Dimension {
    match d {
        CssDimension::Auto => taffy::Dimension::Auto,
        CssDimension::Px(v) => taffy::Dimension::Length(v),
        CssDimension::Percent(v) => taffy::Dimension::Percent(v / 100.0),
    }
}

fn resolve_width(d: CssDimension, parent_width: f32) -> f32 {
    match d {
        CssDimension::Px(w) => w,
        CssDimension::Percent(p) => parent_width * p / 100.0,
        CssDimension::Auto => parent_width,
    }
}

fn margins(s: &ComputedStyle) -> Rect<LengthPercentageAuto> {
    Rect {
        top: LengthPercentageAuto::Length(s.margin_top),
        right: LengthPercentageAuto::Length(s.margin_right),
        bottom: LengthPercentageAuto::Length(s.margin_bottom),
        left: LengthPercentageAuto::Length(s.margin_left),
    }
}

fn paddings(s: &ComputedStyle) -> Rect<LengthPercentage> {
    Rect {
        top: LengthPercentage::Length(s.padding_top),
        right: LengthPercentage::Length(s.padding_right),
        bottom: LengthPercentage::Length(s.padding_bottom),
        left: LengthPercentage::Length(s.padding_left),
    }
}

fn borders(s: &ComputedStyle) -> Rect<LengthPercentage> {
    let w = LengthPercentage::Length(s.border_width);
    Rect {
        top: w,
        right: w,
        bottom: w,
        left: w,
    }
}

fn computed_to_taffy(s: &ComputedStyle, tag: &Tag) -> Style {
    let mut ts = Style::default();

    // -----------------------------------------------------------------
    // HTML table model: always flex regardless of computed display.
    // -----------------------------------------------------------------
    match tag {
        Tag::Table => {
            ts.display = taffy::Display::Flex;
            ts.flex_direction = taffy::FlexDirection::Column;
            ts.size.width = dim_to_taffy(s.width);
            ts.size.height = dim_to_taffy(s.height);
            ts.min_size.width = length(0.0);
            ts.flex_shrink = 0.0;
            ts.padding = paddings(s);
            ts.margin = margins(s);
            ts.border = borders(s);
            return ts;
        }
        Tag::Tr => {
            ts.display = taffy::Display::Flex;
            ts.flex_direction = taffy::FlexDirection::Row;
            ts.align_items = Some(taffy::AlignItems::Stretch);
            ts.size.width = percent(1.0);
            ts.min_size.width = length(0.0);
            ts.flex_shrink = 0.0;
            ts.margin = margins(s);
            return ts;
        }
        Tag::Td | Tag::Th => {
            ts.display = taffy::Display::Flex;
            ts.flex_direction = taffy::FlexDirection::Column;
            ts.flex_shrink = 1.0;
            if s.width == CssDimension::Auto {
                ts.flex_grow = 1.0;
                ts.flex_basis = length(0.0);
            } else {
                ts.flex_grow = 0.0;
                ts.flex_basis = dim_to_taffy(s.width);
            }
            ts.min_size.width = length(0.0);
            ts.padding = paddings(s);
            ts.border = borders(s);
            return ts;
        }
        _ => {}
    }

    match s.display {
        style::Display::Flex => {
            ts.display = taffy::Display::Flex;
            ts.flex_direction = match s.flex_direction {
                style::FlexDirection::Row => taffy::FlexDirection::Row,
                style::FlexDirection::Column => taffy::FlexDirection::Column,
            };
            ts.flex_wrap = match s.flex_wrap {
                style::FlexWrap::NoWrap => taffy::FlexWrap::NoWrap,
                style::FlexWrap::Wrap => taffy::FlexWrap::Wrap,
            };
            ts.justify_content = Some(match s.justify_content {
                style::JustifyContent::Start => taffy::JustifyContent::Start,
                style::JustifyContent::End => taffy::JustifyContent::End,
                style::JustifyContent::Center => taffy::JustifyContent::Center,
                style::JustifyContent::SpaceBetween => taffy::JustifyContent::SpaceBetween,
                style::JustifyContent::SpaceAround => taffy::JustifyContent::SpaceAround,
                style::JustifyContent::SpaceEvenly => taffy::JustifyContent::SpaceEvenly,
            });
            ts.align_items = Some(match s.align_items {
                style::AlignItems::Start => taffy::AlignItems::Start,
                style::AlignItems::End => taffy::AlignItems::End,
                style::AlignItems::Center => taffy::AlignItems::Center,
                style::AlignItems::Stretch => taffy::AlignItems::Stretch,
            });
        }
        style::Display::Grid => {
            ts.display = taffy::Display::Grid;
            ts.grid_template_columns = if s.grid_template_columns.is_empty() {
                vec![taffy::TrackSizingFunction::from_flex(1.0)]
            } else {
                s.grid_template_columns
                    .iter()
                    .map(|track| match *track {
                        style::GridTrack::Px(v) => taffy::TrackSizingFunction::from_length(v),
                        style::GridTrack::Fr(v) => taffy::TrackSizingFunction::from_flex(v),
                        style::GridTrack::Auto => taffy::TrackSizingFunction::AUTO,
                    })
                    .collect()
            };
        }
        style::Display::Block
        | style::Display::ListItem
        | style::Display::TableRow
        | style::Display::TableCell
        | style::Display::InlineBlock => {
            ts.display = taffy::Display::Flex;
            ts.flex_direction = taffy::FlexDirection::Column;
        }
        style::Display::Inline => {
            ts.display = taffy::Display::Flex;
            ts.flex_direction = taffy::FlexDirection::Row;
            ts.flex_wrap = taffy::FlexWrap::Wrap;
        }
        style::Display::None => {
            ts.display = taffy::Display::None;
        }
    }

    ts.size = Size {
        width: dim_to_taffy(s.width),
        height: dim_to_taffy(s.height),
    };
    // Allow flex items to compress below their natural content size.
    ts.min_size = Size {
        width: if s.flex_shrink > 0.0 || s.flex_grow > 0.0 {
            length(0.0)
        } else {
            dim_to_taffy(s.min_width)
        },
        height: auto(),
    };
    ts.max_size = Size {
        width: dim_to_taffy(s.max_width),
        height: auto(),
    };

    ts.flex_grow = s.flex_grow;
    ts.flex_shrink = s.flex_shrink;
    ts.margin = margins(s);
    ts.padding = paddings(s);
    ts.border = borders(s);
    ts.gap = Size {
        width: LengthPercentage::Length(s.gap),
        height: LengthPercentage::Length(s.gap),
    };

    ts
}

/// The style of the text leaf generated for an inline-only block: the
/// block's text properties without any of its box properties.
fn text_leaf_style(block: &ComputedStyle) -> ComputedStyle {
    ComputedStyle {
        font_size: block.font_size,
        font_weight: block.font_weight,
        font_family: block.font_family.clone(),
        color: block.color,
        text_align: block.text_align,
        line_height: block.line_height,
        text_decoration: block.text_decoration,
        font_style: block.font_style,
        uppercase: block.uppercase,
        ..ComputedStyle::default()
    }
}

/// Collapse whitespace runs inside each line, keeping hard breaks.
fn normalize_whitespace(raw: &str) -> String {
    let lines: Vec<String> = raw
        .split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();
    // A break with nothing after it adds no line.
    let mut end = lines.len();
    while end > 0 && lines[end - 1].is_empty() {
        end -= 1;
    }
    let mut start = 0;
    while start < end && lines[start].is_empty() {
        start += 1;
    }
    lines[start..end].join("\n")
}

/// Build-time widths of the cells of a table row, used for word wrapping.
fn row_cell_widths(cells: &[StyledNode], row_width: f32) -> Vec<f32> {
    let explicit: Vec<Option<f32>> = cells
        .iter()
        .map(|cell| match cell {
            StyledNode::Element { style, .. } => match style.width {
                CssDimension::Auto => None,
                d => Some(resolve_width(d, row_width)),
            },
            StyledNode::Text { .. } => None,
        })
        .collect();
    let fixed: f32 = explicit.iter().flatten().sum();
    let auto_count = explicit.iter().filter(|w| w.is_none()).count().max(1);
    let share = ((row_width - fixed) / auto_count as f32).max(1.0);
    explicit.into_iter().map(|w| w.unwrap_or(share)).collect()
}

// ---------------------------------------------------------------------------
// Image intrinsic-size helper
// ---------------------------------------------------------------------------

/// Return a copy of `style` with `Auto` image dimensions replaced by values
/// derived from the image's intrinsic size.
///
/// Returns `None` when the src is not a decodable data URI or both
/// dimensions are already specified.
fn resolve_img_auto_dimensions(
    src: &str,
    style: &ComputedStyle,
    parent_width: f32,
) -> Option<ComputedStyle> {
    let (_, bytes) = crate::assets::decode_data_uri(src).ok()?;
    let img = ::image::load_from_memory(&bytes).ok()?;
    let (px_w, px_h) = (img.width() as f32, img.height() as f32);
    if px_w == 0.0 || px_h == 0.0 {
        return None;
    }
    let aspect = px_w / px_h;

    let known_w = match style.width {
        CssDimension::Px(v) => Some(v),
        CssDimension::Percent(p) => Some(parent_width * p / 100.0),
        CssDimension::Auto => None,
    };
    let known_h = match style.height {
        CssDimension::Px(v) => Some(v),
        _ => None,
    };

    let mut s = style.clone();
    match (known_w, known_h) {
        (Some(w), None) => s.height = CssDimension::Px((w / aspect).max(1.0)),
        (None, Some(h)) => s.width = CssDimension::Px((h * aspect).max(1.0)),
        // 1 px = 1 pt, capped to the available width.
        (None, None) => {
            let w = px_w.min(parent_width.max(1.0));
            s.width = CssDimension::Px(w);
            s.height = CssDimension::Px(w / aspect);
        }
        (Some(_), Some(_)) => return None,
    }
    Some(s)
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute layout for a styled tree, returning the top-level positioned
/// boxes in document coordinates.
pub fn compute_layout(
    styled_nodes: &[StyledNode],
    page: &PageGeometry,
    fonts: &FontManager,
) -> Result<Vec<PositionedBox>, RenderError> {
    let content_width = page.content_width();
    let mut builder = LayoutBuilder::new(fonts, content_width);

    let child_ids = styled_nodes
        .iter()
        .map(|node| builder.build_node(node, content_width))
        .collect::<Result<Vec<_>, _>>()?;

    let root_style = Style {
        display: taffy::Display::Flex,
        flex_direction: taffy::FlexDirection::Column,
        size: Size {
            width: length(content_width),
            height: auto(),
        },
        ..Default::default()
    };

    let root = builder
        .taffy
        .new_with_children(root_style, &child_ids)
        .map_err(layout_err)?;

    builder
        .taffy
        .compute_layout(
            root,
            Size {
                width: AvailableSpace::Definite(content_width),
                height: AvailableSpace::MaxContent,
            },
        )
        .map_err(layout_err)?;

    let root_box = builder.extract(root, page.margins.left, 0.0)?;
    log::debug!(
        "Laid out {} top-level boxes, {:.1}pt tall",
        root_box.children.len(),
        root_box.height
    );
    Ok(root_box.children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use crate::page::{PageMargins, PageSize};
    use crate::style::build_styled_tree;
    use crate::stylesheet::Stylesheet;

    fn layout(html: &str, css: &str) -> Vec<PositionedBox> {
        let dom = parse_html(html);
        let root = ComputedStyle::root("Helvetica", 10.0);
        let styled = build_styled_tree(&dom, Some(&root), &Stylesheet::parse(css));
        compute_layout(&styled, &PageGeometry::default(), &FontManager::default()).unwrap()
    }

    fn first_text(pbox: &PositionedBox) -> Option<&PositionedBox> {
        if matches!(pbox.content, BoxContent::Text { .. }) {
            return Some(pbox);
        }
        pbox.children.iter().find_map(first_text)
    }

    #[test]
    fn layout_simple_paragraph() {
        let boxes = layout("<p>Hello world</p>", "");
        assert_eq!(boxes.len(), 1);
        let first = &boxes[0];
        assert!(first.width > 0.0);
        assert!(first.height > 0.0);
        assert_eq!(first.x, 40.0);
    }

    #[test]
    fn inline_children_merge_into_one_text_leaf() {
        let boxes = layout("<p>Total: <strong>$1,200.00</strong> MXN</p>", "");
        let p = &boxes[0];
        assert_eq!(p.children.len(), 1);
        match &p.children[0].content {
            BoxContent::Text { text, .. } => assert_eq!(text, "Total: $1,200.00 MXN"),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn line_breaks_are_kept() {
        let boxes = layout("<p>Uno<br>Dos</p>", "");
        match &first_text(&boxes[0]).unwrap().content {
            BoxContent::Text { lines, .. } => assert_eq!(lines, &vec!["Uno", "Dos"]),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn explicit_cell_width_is_honoured() {
        let boxes = layout(
            r#"<table style="width: 100%"><tr><td class="campo">Emisora</td><td>AMX</td></tr></table>"#,
            "td { padding: 0; border: 0 } td.campo { width: 100pt }",
        );
        let row = &boxes[0].children[0];
        assert_eq!(row.children.len(), 2);
        assert!((row.children[0].width - 100.0).abs() < 0.5);
        assert!(row.children[1].width > row.children[0].width);
    }

    #[test]
    fn centered_text_spans_its_container() {
        let boxes = layout(r#"<h1 style="text-align: center">Reporte</h1>"#, "");
        let h1 = &boxes[0];
        let text = first_text(h1).unwrap();
        assert!((text.width - h1.width).abs() < 0.5);
    }

    #[test]
    fn grid_columns_follow_track_list() {
        let boxes = layout(
            r#"<div class="rejilla"><div>Clave</div><div>Serie</div></div>"#,
            ".rejilla { display: grid; grid-template-columns: 100px 1fr }",
        );
        let grid = &boxes[0];
        assert_eq!(grid.children.len(), 2);
        let (left, right) = (&grid.children[0], &grid.children[1]);
        assert!((left.width - 100.0).abs() < 0.5);
        assert!((right.x - (left.x + 100.0)).abs() < 0.5);
        assert!((right.width - (grid.width - 100.0)).abs() < 0.5);
    }

    #[test]
    fn landscape_geometry_widens_content() {
        let dom = parse_html("<div>x</div>");
        let styled = build_styled_tree(&dom, None, &Stylesheet::default());
        let page = PageGeometry {
            size: PageSize::A4.landscape(),
            margins: PageMargins::uniform(10.0),
        };
        let boxes = compute_layout(&styled, &page, &FontManager::default()).unwrap();
        assert!((boxes[0].width - (841.89 - 20.0)).abs() < 0.5);
        assert_eq!(boxes[0].x, 10.0);
    }

    #[test]
    fn whitespace_normalisation_keeps_breaks() {
        assert_eq!(normalize_whitespace("  a \n  b   c \n"), "a\nb c");
    }
}
