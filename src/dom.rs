//! HTML parser – converts bound template markup into a simple DOM tree.
//!
//! We support a controlled subset of elements:
//! - Structural: div, section, header, footer, p, h1-h4, ul, ol, li, table,
//!   tr, td, th (thead/tbody/tfoot are transparent), img, br
//! - Inline: span, strong/b, em/i
//! - Document: html, head, body, title, style, link, meta
//! - Styling via `class`, `id` and `style` attributes plus `<style>` blocks
//!
//! [`parse_document`] is strict and reports structural problems as
//! [`RenderError::Markup`]; [`parse_html`] recovers silently.

use std::collections::HashMap;

use crate::error::RenderError;

// ---------------------------------------------------------------------------
// DOM types
// ---------------------------------------------------------------------------

/// The tag name of a supported element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Div,
    P,
    H1,
    H2,
    H3,
    H4,
    Ul,
    Ol,
    Li,
    Table,
    Tr,
    Td,
    Th,
    Span,
    Strong,
    Em,
    Br,
    Img,
    Body,
    Html,
    Head,
    Title,
    Style,
    Link,
    Meta,
    Script,
    /// Catch-all for unknown tags – they are kept but treated as divs.
    Unknown(String),
}

impl Tag {
    pub fn from_name(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "div" | "section" | "header" | "footer" | "article" | "main" => Tag::Div,
            "p" => Tag::P,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "h4" => Tag::H4,
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "table" => Tag::Table,
            "tr" => Tag::Tr,
            "td" => Tag::Td,
            "th" => Tag::Th,
            "span" => Tag::Span,
            "strong" | "b" => Tag::Strong,
            "em" | "i" => Tag::Em,
            "br" => Tag::Br,
            "img" => Tag::Img,
            "body" => Tag::Body,
            "html" => Tag::Html,
            "head" => Tag::Head,
            "title" => Tag::Title,
            "style" => Tag::Style,
            "link" => Tag::Link,
            "meta" => Tag::Meta,
            "script" => Tag::Script,
            _ => Tag::Unknown(s.to_string()),
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(
            self,
            Tag::Div
                | Tag::P
                | Tag::H1
                | Tag::H2
                | Tag::H3
                | Tag::H4
                | Tag::Ul
                | Tag::Ol
                | Tag::Li
                | Tag::Table
                | Tag::Tr
                | Tag::Td
                | Tag::Th
                | Tag::Body
                | Tag::Html
                | Tag::Unknown(_)
        )
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Tag::Span | Tag::Strong | Tag::Em | Tag::Br)
    }

    pub fn is_table_part(&self) -> bool {
        matches!(self, Tag::Table | Tag::Tr | Tag::Td | Tag::Th)
    }

    /// Elements that never produce boxes.
    pub fn is_metadata(&self) -> bool {
        matches!(
            self,
            Tag::Head | Tag::Title | Tag::Style | Tag::Link | Tag::Meta | Tag::Script
        )
    }
}

fn is_void(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "img" | "br" | "hr" | "meta" | "link" | "input" | "col" | "base"
    )
}

fn is_raw_text(name: &str) -> bool {
    matches!(name.to_ascii_lowercase().as_str(), "style" | "script")
}

fn is_transparent(name: &str) -> bool {
    matches!(name, "thead" | "tbody" | "tfoot")
}

/// A node in our DOM tree.
#[derive(Debug, Clone)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

/// An element node carrying tag, attributes, and children.
#[derive(Debug, Clone)]
pub struct ElementNode {
    pub tag: Tag,
    /// Lower-cased source tag name (`section`, `b`, ...).
    pub name: String,
    pub attributes: HashMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(name: &str) -> Self {
        Self {
            tag: Tag::from_name(name),
            name: name.to_ascii_lowercase(),
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn inline_style(&self) -> Option<&str> {
        self.attr("style")
    }

    pub fn src(&self) -> Option<&str> {
        self.attr("src")
    }

    /// Concatenated text of all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[DomNode], out: &mut String) {
    for node in nodes {
        match node {
            DomNode::Text(t) => out.push_str(t),
            DomNode::Element(e) => collect_text(&e.children, out),
        }
    }
}

// ---------------------------------------------------------------------------
// Parser – simple recursive descent over HTML
// ---------------------------------------------------------------------------

/// Parse an HTML string into a list of DOM nodes, recovering from errors.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    let mut parser = Parser::new(html);
    parser.parse_root()
}

/// Parse a complete document, rejecting malformed structure.
pub fn parse_document(html: &str) -> Result<Vec<DomNode>, RenderError> {
    if html.trim().is_empty() {
        return Err(RenderError::Markup("document is empty".into()));
    }
    let mut parser = Parser::new(html);
    let nodes = parser.parse_root();
    if let Some(first) = parser.errors.first() {
        let more = parser.errors.len() - 1;
        let message = if more > 0 {
            format!("{first} (and {more} more)")
        } else {
            first.clone()
        };
        return Err(RenderError::Markup(message));
    }
    if !nodes.iter().any(|n| matches!(n, DomNode::Element(_))) {
        return Err(RenderError::Markup("document has no elements".into()));
    }
    Ok(nodes)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    errors: Vec<String>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            errors: Vec::new(),
        }
    }

    fn error(&mut self, message: String) {
        log::debug!("markup error at byte {}: {message}", self.pos);
        self.errors.push(message);
    }

    fn parse_root(&mut self) -> Vec<DomNode> {
        let mut nodes = self.parse_nodes();
        while !self.eof() {
            // Only a stray closing tag stops parse_nodes before EOF.
            self.advance(2);
            let name = self.parse_tag_name();
            self.error(format!("unexpected closing tag </{name}>"));
            self.skip_past('>');
            nodes.extend(self.parse_nodes());
        }
        nodes
    }

    fn parse_nodes(&mut self) -> Vec<DomNode> {
        let mut nodes = Vec::new();
        loop {
            self.skip_whitespace_preserve();
            if self.eof() || self.starts_with("</") {
                break;
            }
            match self.parse_node() {
                Some(DomNode::Element(e)) if is_transparent(&e.name) => nodes.extend(e.children),
                Some(node) => nodes.push(node),
                None => {}
            }
        }
        nodes
    }

    fn parse_node(&mut self) -> Option<DomNode> {
        if self.starts_with("<!--") {
            self.skip_comment();
            return None;
        }
        if self.starts_with("<!") || self.starts_with("<?") {
            // Skip doctype / processing instructions
            self.skip_past('>');
            return None;
        }
        if self.starts_with("<") {
            let next = self.input[self.pos + 1..].chars().next();
            if next.is_some_and(|c| c.is_ascii_alphabetic()) {
                return Some(self.parse_element());
            }
            self.error("unescaped '<' in text".into());
            self.advance(1);
            return Some(DomNode::Text(format!("<{}", self.read_text())));
        }
        Some(DomNode::Text(self.read_text()))
    }

    fn read_text(&mut self) -> String {
        let start = self.pos;
        while !self.eof() && !self.starts_with("<") {
            self.advance(1);
        }
        decode_entities(&self.input[start..self.pos])
    }

    fn parse_element(&mut self) -> DomNode {
        // Consume '<'
        self.advance(1);
        let tag_name = self.parse_tag_name();
        let mut elem = ElementNode::new(&tag_name);

        // Parse attributes
        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            match self.parse_attribute() {
                Some((key, value)) => {
                    elem.attributes.insert(key.to_ascii_lowercase(), value);
                }
                None => {
                    self.error(format!("invalid attribute syntax in <{tag_name}>"));
                    self.advance(1);
                }
            }
        }

        if self.eof() {
            self.error(format!("unterminated start tag <{tag_name}"));
            return DomNode::Element(elem);
        }
        if self.starts_with("/>") {
            self.advance(2);
            return DomNode::Element(elem);
        }
        self.advance(1); // '>'
        if is_void(&tag_name) {
            return DomNode::Element(elem);
        }

        if is_raw_text(&tag_name) {
            let close = format!("</{}", elem.name);
            let rest = self.input[self.pos..].to_ascii_lowercase();
            let end = rest.find(&close).map(|i| self.pos + i);
            let end = match end {
                Some(end) => end,
                None => {
                    self.error(format!("unclosed <{tag_name}>"));
                    self.input.len()
                }
            };
            let raw = &self.input[self.pos..end];
            if !raw.trim().is_empty() {
                elem.children.push(DomNode::Text(raw.to_string()));
            }
            self.pos = end;
        } else {
            elem.children = self.parse_nodes();
        }

        // Consume closing tag
        if self.starts_with("</") {
            self.advance(2);
            let closing = self.parse_tag_name();
            if !closing.eq_ignore_ascii_case(&tag_name) {
                self.error(format!(
                    "mismatched closing tag </{closing}> for <{tag_name}>"
                ));
            }
            self.skip_whitespace();
            if self.starts_with(">") {
                self.advance(1);
            }
        } else {
            self.error(format!("unclosed <{tag_name}>"));
        }

        DomNode::Element(elem)
    }

    fn parse_tag_name(&mut self) -> String {
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' {
                self.advance(1);
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_attribute(&mut self) -> Option<(String, String)> {
        let key = self.parse_tag_name();
        if key.is_empty() {
            return None;
        }
        self.skip_whitespace();
        if !self.starts_with("=") {
            return Some((key, String::new()));
        }
        self.advance(1); // skip '='
        self.skip_whitespace();
        let value = self.parse_attr_value();
        Some((key, value))
    }

    fn parse_attr_value(&mut self) -> String {
        for quote in ["\"", "'"] {
            if self.starts_with(quote) {
                self.advance(1);
                let start = self.pos;
                while !self.eof() && !self.starts_with(quote) {
                    self.advance(1);
                }
                let val = decode_entities(&self.input[start..self.pos]);
                if self.eof() {
                    self.error("unterminated attribute value".into());
                } else {
                    self.advance(1);
                }
                return val;
            }
        }
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_whitespace() || c == '>' || c == '/' {
                break;
            }
            self.advance(1);
        }
        decode_entities(&self.input[start..self.pos])
    }

    fn skip_whitespace(&mut self) {
        while !self.eof() && self.current_char().is_whitespace() {
            self.advance(1);
        }
    }

    fn skip_whitespace_preserve(&mut self) {
        // Skip runs of pure whitespace between elements.
        let saved = self.pos;
        self.skip_whitespace();
        // If we reached a tag or EOF, keep the skip. Otherwise revert.
        if !self.eof() && !self.starts_with("<") {
            self.pos = saved;
        }
    }

    fn skip_past(&mut self, c: char) {
        match self.input[self.pos..].find(c) {
            Some(i) => self.pos += i + c.len_utf8(),
            None => self.pos = self.input.len(),
        }
    }

    fn skip_comment(&mut self) {
        self.advance(4); // skip <!--
        match self.input[self.pos..].find("-->") {
            Some(i) => self.pos += i + 3,
            None => {
                self.error("unterminated comment".into());
                self.pos = self.input.len();
            }
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input[self.pos..].chars().next().unwrap_or('\0')
    }

    fn advance(&mut self, n: usize) {
        // Advance by `n` characters (not bytes).
        for _ in 0..n {
            if let Some(c) = self.input[self.pos..].chars().next() {
                self.pos += c.len_utf8();
            }
        }
    }
}

/// Decode named and numeric character references. Unknown references are
/// kept verbatim.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&after[..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &after[end + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{00A0}',
        "copy" => '©',
        "reg" => '®',
        "deg" => '°',
        "middot" => '·',
        "ndash" => '–',
        "mdash" => '—',
        "laquo" => '«',
        "raquo" => '»',
        _ => return None,
    })
}

// ---------------------------------------------------------------------------
// Convenience helpers
// ---------------------------------------------------------------------------

/// Find the `<body>` element and return its children, or return all nodes if
/// no `<body>` is present.
pub fn body_children(nodes: &[DomNode]) -> Vec<DomNode> {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Body {
                return e.children.clone();
            }
            // Recurse into <html>
            if e.tag == Tag::Html {
                let inner = body_children(&e.children);
                if !inner.is_empty() {
                    return inner;
                }
            }
        }
    }
    nodes.to_vec()
}

/// A stylesheet referenced by the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleSource {
    /// Contents of a `<style>` element.
    Inline(String),
    /// `href` of a `<link rel="stylesheet">`.
    Linked(String),
}

/// All stylesheets in document order.
pub fn collect_stylesheets(nodes: &[DomNode]) -> Vec<StyleSource> {
    let mut out = Vec::new();
    visit_elements(nodes, &mut |e: &ElementNode| match e.tag {
        Tag::Style => out.push(StyleSource::Inline(e.text_content())),
        Tag::Link => {
            let is_sheet = e
                .attr("rel")
                .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet")));
            if let (true, Some(href)) = (is_sheet, e.attr("href")) {
                out.push(StyleSource::Linked(href.to_string()));
            }
        }
        _ => {}
    });
    out
}

/// Text of the first `<title>` element, if any and non-blank.
pub fn document_title(nodes: &[DomNode]) -> Option<String> {
    let mut title = None;
    visit_elements(nodes, &mut |e: &ElementNode| {
        if title.is_none() && e.tag == Tag::Title {
            let text = e.text_content().split_whitespace().collect::<Vec<_>>().join(" ");
            if !text.is_empty() {
                title = Some(text);
            }
        }
    });
    title
}

/// Depth-first, pre-order walk over every element.
pub fn visit_elements(nodes: &[DomNode], f: &mut dyn FnMut(&ElementNode)) {
    for node in nodes {
        if let DomNode::Element(e) = node {
            f(e);
            visit_elements(&e.children, f);
        }
    }
}

/// Mutable walk that stops at the first error.
pub fn try_visit_elements_mut<E>(
    nodes: &mut [DomNode],
    f: &mut dyn FnMut(&mut ElementNode) -> Result<(), E>,
) -> Result<(), E> {
    for node in nodes {
        if let DomNode::Element(e) = node {
            f(e)?;
            try_visit_elements_mut(&mut e.children, f)?;
        }
    }
    Ok(())
}
