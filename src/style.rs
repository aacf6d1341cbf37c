//! Style resolver – runs the cascade (tag defaults, stylesheet rules, inline
//! `style`) into a flat [`ComputedStyle`] consumed by the layout engine.

use std::collections::HashMap;

use crate::dom::{DomNode, ElementNode, Tag};
use crate::stylesheet::{parse_declarations, parse_length, Stylesheet};

/// Fully resolved style for a single element.
#[derive(Debug, Clone)]
pub struct ComputedStyle {
    // Display / layout
    pub display: Display,
    pub flex_direction: FlexDirection,
    pub flex_wrap: FlexWrap,
    pub flex_grow: f32,
    pub flex_shrink: f32,
    pub justify_content: JustifyContent,
    pub align_items: AlignItems,
    pub gap: f32,

    // Grid
    pub grid_template_columns: Vec<GridTrack>,

    // Sizing
    pub width: Dimension,
    pub height: Dimension,
    pub min_width: Dimension,
    pub max_width: Dimension,

    // Spacing (pt)
    pub margin_top: f32,
    pub margin_right: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub padding_top: f32,
    pub padding_right: f32,
    pub padding_bottom: f32,
    pub padding_left: f32,

    // Border
    pub border_width: f32,
    pub border_color: Color,

    // Typography
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_family: String,
    pub color: Color,
    pub text_align: TextAlign,
    pub line_height: f32,
    pub text_decoration: TextDecoration,
    pub font_style: FontStyle,
    pub uppercase: bool,

    // Background
    pub background_color: Color,

    // Page break
    pub page_break_before: bool,
    pub page_break_after: bool,
    pub page_break_inside_avoid: bool,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            flex_direction: FlexDirection::Row,
            flex_wrap: FlexWrap::NoWrap,
            flex_grow: 0.0,
            flex_shrink: 1.0,
            justify_content: JustifyContent::Start,
            align_items: AlignItems::Stretch,
            gap: 0.0,
            grid_template_columns: Vec::new(),
            width: Dimension::Auto,
            height: Dimension::Auto,
            min_width: Dimension::Auto,
            max_width: Dimension::Auto,
            margin_top: 0.0,
            margin_right: 0.0,
            margin_bottom: 0.0,
            margin_left: 0.0,
            padding_top: 0.0,
            padding_right: 0.0,
            padding_bottom: 0.0,
            padding_left: 0.0,
            border_width: 0.0,
            border_color: Color::BLACK,
            font_size: 12.0,
            font_weight: FontWeight::Normal,
            font_family: "Helvetica".to_string(),
            color: Color::BLACK,
            text_align: TextAlign::Left,
            line_height: 1.4,
            text_decoration: TextDecoration::None,
            font_style: FontStyle::Normal,
            uppercase: false,
            background_color: Color::TRANSPARENT,
            page_break_before: false,
            page_break_after: false,
            page_break_inside_avoid: false,
        }
    }
}

impl ComputedStyle {
    /// Root style for a document body.
    pub fn root(font_family: &str, font_size: f32) -> Self {
        Self {
            font_family: font_family.to_string(),
            font_size,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Supporting enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Flex,
    Grid,
    Inline,
    InlineBlock,
    ListItem,
    TableRow,
    TableCell,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexDirection {
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexWrap {
    NoWrap,
    Wrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JustifyContent {
    Start,
    End,
    Center,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignItems {
    Start,
    End,
    Center,
    Stretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDecoration {
    None,
    Underline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Auto,
    Px(f32),
    Percent(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridTrack {
    Px(f32),
    Fr(f32),
    Auto,
}

/// RGBA colour (0.0 – 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: 1.0,
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => Some(Self::rgb(
                channel(&hex[0..1].repeat(2))?,
                channel(&hex[1..2].repeat(2))?,
                channel(&hex[2..3].repeat(2))?,
            )),
            _ => None,
        }
    }

    /// Parse `#rgb`, `#rrggbb`, `rgb()`/`rgba()` or a basic colour keyword.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.starts_with('#') {
            return Self::from_hex(value);
        }
        let lower = value.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let parts: Vec<&str> = args.split(',').map(str::trim).collect();
            if parts.len() < 3 {
                return None;
            }
            let mut color = Self::rgb(
                parts[0].parse().ok()?,
                parts[1].parse().ok()?,
                parts[2].parse().ok()?,
            );
            if let Some(alpha) = parts.get(3) {
                color.a = alpha.parse::<f32>().ok()?.clamp(0.0, 1.0);
            }
            return Some(color);
        }
        Some(match lower.as_str() {
            "black" => Self::BLACK,
            "white" => Self::WHITE,
            "transparent" => Self::TRANSPARENT,
            "gray" | "grey" => Self::rgb(128, 128, 128),
            "silver" | "lightgray" | "lightgrey" => Self::rgb(211, 211, 211),
            "red" => Self::rgb(255, 0, 0),
            "green" => Self::rgb(0, 128, 0),
            "blue" => Self::rgb(0, 0, 255),
            "navy" => Self::rgb(0, 0, 128),
            "orange" => Self::rgb(255, 165, 0),
            _ => return None,
        })
    }
}

// ---------------------------------------------------------------------------
// Style resolution
// ---------------------------------------------------------------------------

/// Resolve the style for an element, inheriting text properties from its
/// parent and applying the cascade in order: tag defaults, stylesheet rules,
/// inline `style`.
pub fn resolve_style(
    element: &ElementNode,
    parent: Option<&ComputedStyle>,
    sheet: &Stylesheet,
) -> ComputedStyle {
    let mut style = ComputedStyle::default();

    // Inherit text properties from parent
    if let Some(p) = parent {
        style.font_size = p.font_size;
        style.font_weight = p.font_weight;
        style.font_family = p.font_family.clone();
        style.color = p.color;
        style.text_align = p.text_align;
        style.line_height = p.line_height;
        style.font_style = p.font_style;
        style.uppercase = p.uppercase;
    }

    apply_tag_defaults(&mut style, &element.tag);

    for (prop, value) in sheet.declarations_for(element) {
        apply_css_property(&mut style, prop, value);
    }

    if let Some(inline) = element.inline_style() {
        for (prop, value) in parse_declarations(inline) {
            apply_css_property(&mut style, &prop, &value);
        }
    }

    style
}

/// Default styles based on tag semantics. Heading sizes are relative to the
/// inherited font size.
fn apply_tag_defaults(s: &mut ComputedStyle, tag: &Tag) {
    let em = s.font_size;
    match tag {
        Tag::H1 | Tag::H2 | Tag::H3 | Tag::H4 => {
            let scale = match tag {
                Tag::H1 => 2.0,
                Tag::H2 => 1.5,
                Tag::H3 => 1.17,
                _ => 1.0,
            };
            s.font_size = em * scale;
            s.font_weight = FontWeight::Bold;
            s.margin_top = s.font_size * 0.5;
            s.margin_bottom = s.font_size * 0.4;
        }
        Tag::P => {
            s.margin_bottom = em * 0.6;
        }
        Tag::Ul | Tag::Ol => {
            s.margin_bottom = em * 0.6;
            s.padding_left = em * 2.0;
        }
        Tag::Li => {
            s.display = Display::ListItem;
            s.margin_bottom = em * 0.25;
        }
        Tag::Table => {
            s.display = Display::Grid;
            s.border_width = 1.0;
        }
        Tag::Tr => {
            s.display = Display::TableRow;
        }
        Tag::Td | Tag::Th => {
            s.display = Display::TableCell;
            s.padding_top = 3.0;
            s.padding_right = 6.0;
            s.padding_bottom = 3.0;
            s.padding_left = 6.0;
            s.border_width = 1.0;
            if *tag == Tag::Th {
                s.font_weight = FontWeight::Bold;
                s.background_color = Color::rgb(237, 237, 237);
            }
        }
        Tag::Span | Tag::Br => {
            s.display = Display::Inline;
        }
        Tag::Strong => {
            s.display = Display::Inline;
            s.font_weight = FontWeight::Bold;
        }
        Tag::Em => {
            s.display = Display::Inline;
            s.font_style = FontStyle::Italic;
        }
        Tag::Img => {
            s.display = Display::InlineBlock;
        }
        Tag::Div | Tag::Body | Tag::Html => {}
        Tag::Head | Tag::Title | Tag::Style | Tag::Link | Tag::Meta | Tag::Script => {
            s.display = Display::None;
        }
        Tag::Unknown(name) => {
            log::debug!("Unsupported element <{name}> is not rendered");
            s.display = Display::None;
        }
    }
}

// ---------------------------------------------------------------------------
// CSS declarations (limited subset)
// ---------------------------------------------------------------------------

fn apply_css_property(s: &mut ComputedStyle, prop: &str, val: &str) {
    let keyword = val.to_ascii_lowercase();
    let val_lc = keyword.as_str();
    match prop {
        "display" => {
            s.display = match val_lc {
                "flex" => Display::Flex,
                "grid" => Display::Grid,
                "block" => Display::Block,
                "inline" => Display::Inline,
                "inline-block" => Display::InlineBlock,
                "none" => Display::None,
                _ => s.display,
            }
        }
        "flex-direction" => {
            s.flex_direction = match val_lc {
                "row" => FlexDirection::Row,
                "column" => FlexDirection::Column,
                _ => s.flex_direction,
            }
        }
        "flex-wrap" => s.flex_wrap = if val_lc == "wrap" { FlexWrap::Wrap } else { FlexWrap::NoWrap },
        "flex" => {
            if let Some(grow) = val_lc.split_whitespace().next().and_then(|v| v.parse().ok()) {
                s.flex_grow = grow;
                s.flex_shrink = 1.0;
            }
        }
        "flex-grow" => {
            if let Ok(v) = val_lc.parse() {
                s.flex_grow = v;
            }
        }
        "justify-content" => {
            s.justify_content = match val_lc {
                "flex-start" | "start" => JustifyContent::Start,
                "flex-end" | "end" => JustifyContent::End,
                "center" => JustifyContent::Center,
                "space-between" => JustifyContent::SpaceBetween,
                "space-around" => JustifyContent::SpaceAround,
                "space-evenly" => JustifyContent::SpaceEvenly,
                _ => s.justify_content,
            }
        }
        "align-items" => {
            s.align_items = match val_lc {
                "flex-start" | "start" => AlignItems::Start,
                "flex-end" | "end" => AlignItems::End,
                "center" => AlignItems::Center,
                "stretch" => AlignItems::Stretch,
                _ => s.align_items,
            }
        }
        "font-size" => {
            if let Some(size) = parse_font_size(val_lc, s.font_size) {
                s.font_size = size;
            }
        }
        "font-family" => {
            if let Some(first) = val.split(',').next() {
                s.font_family = first.trim().trim_matches(['"', '\'']).to_string();
            }
        }
        "font-weight" => {
            s.font_weight = match val_lc {
                "bold" | "bolder" | "600" | "700" | "800" | "900" => FontWeight::Bold,
                _ => FontWeight::Normal,
            }
        }
        "font-style" => {
            s.font_style = match val_lc {
                "italic" | "oblique" => FontStyle::Italic,
                _ => FontStyle::Normal,
            }
        }
        "text-decoration" => {
            s.text_decoration = if val_lc.contains("underline") {
                TextDecoration::Underline
            } else {
                TextDecoration::None
            }
        }
        "text-transform" => s.uppercase = val_lc == "uppercase",
        "color" => {
            if let Some(c) = Color::parse(val) {
                s.color = c;
            }
        }
        "background-color" | "background" => {
            if let Some(c) = Color::parse(val) {
                s.background_color = c;
            }
        }
        "text-align" => {
            s.text_align = match val_lc {
                "center" => TextAlign::Center,
                "right" | "end" => TextAlign::Right,
                _ => TextAlign::Left,
            }
        }
        "width" => s.width = parse_dimension(val_lc),
        "height" => s.height = parse_dimension(val_lc),
        "min-width" => s.min_width = parse_dimension(val_lc),
        "max-width" => s.max_width = parse_dimension(val_lc),
        "margin" => apply_shorthand_spacing(
            val_lc,
            [&mut s.margin_top, &mut s.margin_right, &mut s.margin_bottom, &mut s.margin_left],
        ),
        "padding" => apply_shorthand_spacing(
            val_lc,
            [&mut s.padding_top, &mut s.padding_right, &mut s.padding_bottom, &mut s.padding_left],
        ),
        "margin-top" | "margin-right" | "margin-bottom" | "margin-left" | "padding-top"
        | "padding-right" | "padding-bottom" | "padding-left" => {
            if let Some(v) = parse_length(val_lc) {
                let side = match prop {
                    "margin-top" => &mut s.margin_top,
                    "margin-right" => &mut s.margin_right,
                    "margin-bottom" => &mut s.margin_bottom,
                    "margin-left" => &mut s.margin_left,
                    "padding-top" => &mut s.padding_top,
                    "padding-right" => &mut s.padding_right,
                    "padding-bottom" => &mut s.padding_bottom,
                    _ => &mut s.padding_left,
                };
                *side = v;
            }
        }
        "border" => {
            // `1px solid #ccc` / `none`
            if val_lc == "none" || val_lc == "0" {
                s.border_width = 0.0;
            }
            for token in val.split_whitespace() {
                if let Some(w) = parse_length(token) {
                    s.border_width = w;
                } else if let Some(c) = Color::parse(token) {
                    s.border_color = c;
                }
            }
        }
        "border-width" => {
            if let Some(w) = parse_length(val_lc) {
                s.border_width = w;
            }
        }
        "border-color" => {
            if let Some(c) = Color::parse(val) {
                s.border_color = c;
            }
        }
        "line-height" => {
            if let Ok(v) = val_lc.parse::<f32>() {
                s.line_height = v;
            } else if let Some(px) = parse_length(val_lc) {
                s.line_height = px / s.font_size;
            }
        }
        "gap" => {
            if let Some(v) = parse_length(val_lc) {
                s.gap = v;
            }
        }
        "grid-template-columns" => {
            if let Some(tracks) = parse_grid_tracks(val_lc) {
                s.grid_template_columns = tracks;
            }
        }
        "break-before" | "page-break-before" => {
            s.page_break_before = val_lc == "always" || val_lc == "page";
        }
        "break-after" | "page-break-after" => {
            s.page_break_after = val_lc == "always" || val_lc == "page";
        }
        "break-inside" | "page-break-inside" => {
            s.page_break_inside_avoid = val_lc == "avoid";
        }
        _ => log::trace!("Ignoring unsupported property {prop}"),
    }
}

fn parse_font_size(val: &str, inherited: f32) -> Option<f32> {
    if let Some(em) = val.strip_suffix("em") {
        return em.trim().parse::<f32>().ok().map(|v| v * inherited);
    }
    if let Some(pct) = val.strip_suffix('%') {
        return pct.trim().parse::<f32>().ok().map(|v| v / 100.0 * inherited);
    }
    parse_length(val)
}

fn parse_dimension(s: &str) -> Dimension {
    let s = s.trim();
    if s == "auto" {
        Dimension::Auto
    } else if let Some(pct) = s.strip_suffix('%') {
        pct.trim()
            .parse::<f32>()
            .map(Dimension::Percent)
            .unwrap_or(Dimension::Auto)
    } else {
        parse_length(s).map(Dimension::Px).unwrap_or(Dimension::Auto)
    }
}

/// Parse a track list: space-separated `<length>`, `<n>fr` and `auto`
/// entries, with `repeat(<count>, <tracks>)` expanded in place.
fn parse_grid_tracks(value: &str) -> Option<Vec<GridTrack>> {
    let mut tracks = Vec::new();
    let mut rest = value.trim();
    while !rest.is_empty() {
        if let Some(inner) = rest.strip_prefix("repeat(") {
            let close = inner.find(')')?;
            let (count, pattern) = inner[..close].split_once(',')?;
            let count: usize = count.trim().parse().ok()?;
            let pattern = parse_grid_tracks(pattern)?;
            for _ in 0..count {
                tracks.extend_from_slice(&pattern);
            }
            rest = inner[close + 1..].trim_start();
            continue;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (token, tail) = rest.split_at(end);
        tracks.push(match token {
            "auto" => GridTrack::Auto,
            t if t.ends_with("fr") => GridTrack::Fr(t.trim_end_matches("fr").parse().ok()?),
            t => GridTrack::Px(parse_length(t)?),
        });
        rest = tail.trim_start();
    }
    if tracks.is_empty() {
        None
    } else {
        Some(tracks)
    }
}

fn set_sides(top: &mut f32, right: &mut f32, bottom: &mut f32, left: &mut f32, v: [f32; 4]) {
    (*top, *right, *bottom, *left) = (v[0], v[1], v[2], v[3]);
}

fn apply_shorthand_spacing(val: &str, [top, right, bottom, left]: [&mut f32; 4]) {
    let parts: Vec<f32> = val.split_whitespace().filter_map(parse_length).collect();
    if let Some(m) = crate::page::PageMargins::from_values(&parts) {
        set_sides(top, right, bottom, left, [m.top, m.right, m.bottom, m.left]);
    }
}

// ---------------------------------------------------------------------------
// Styled DOM tree
// ---------------------------------------------------------------------------

/// A DOM node annotated with its computed style.
#[derive(Debug, Clone)]
pub enum StyledNode {
    Element {
        tag: Tag,
        style: ComputedStyle,
        children: Vec<StyledNode>,
        /// Original attributes (for images src, etc.)
        attrs: HashMap<String, String>,
    },
    Text {
        text: String,
        style: ComputedStyle,
    },
}

/// Build a styled tree from a DOM tree, resolving styles top-down.
/// Elements with `display: none` are dropped along with their subtree.
pub fn build_styled_tree(
    nodes: &[DomNode],
    parent_style: Option<&ComputedStyle>,
    sheet: &Stylesheet,
) -> Vec<StyledNode> {
    let mut result = Vec::new();
    for node in nodes {
        match node {
            DomNode::Element(e) => {
                let style = resolve_style(e, parent_style, sheet);
                if style.display == Display::None {
                    continue;
                }
                let children = build_styled_tree(&e.children, Some(&style), sheet);
                result.push(StyledNode::Element {
                    tag: e.tag.clone(),
                    style,
                    children,
                    attrs: e.attributes.clone(),
                });
            }
            DomNode::Text(text) => {
                if text.trim().is_empty() {
                    continue;
                }
                let mut style = parent_style.cloned().unwrap_or_default();
                // Text renders inline: box-model properties are not inherited.
                style.border_width = 0.0;
                style.background_color = Color::TRANSPARENT;
                style.width = Dimension::Auto;
                style.height = Dimension::Auto;
                set_sides(&mut style.margin_top, &mut style.margin_right, &mut style.margin_bottom, &mut style.margin_left, [0.0; 4]);
                set_sides(&mut style.padding_top, &mut style.padding_right, &mut style.padding_bottom, &mut style.padding_left, [0.0; 4]);
                let text = if style.uppercase {
                    text.to_uppercase()
                } else {
                    text.clone()
                };
                result.push(StyledNode::Text { text, style });
            }
        }
    }
    result
}
