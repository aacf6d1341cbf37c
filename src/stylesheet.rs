//! Stylesheet parsing – `<style>` blocks and linked `.css` files.
//!
//! Supported: simple selectors (`tag`, `.class`, `#id`, `tag.class`, `*`) and
//! comma-separated lists of them, plus the `@page` at-rule for size and
//! margins. Combinators, pseudo-classes and attribute selectors are skipped.

use crate::dom::ElementNode;
use crate::page::{PageMargins, PageRule, PageSize, PT_PER_MM};

/// A parsed stylesheet (possibly merged from several sources).
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    rules: Vec<StyleRule>,
    page: PageRule,
}

/// One selector with its declaration block.
#[derive(Debug, Clone)]
pub struct StyleRule {
    pub selector: Selector,
    pub declarations: Vec<(String, String)>,
    order: usize,
}

/// A compound selector: optional tag, classes and id, all of which must match.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selector {
    pub tag: Option<String>,
    pub classes: Vec<String>,
    pub id: Option<String>,
}

impl Selector {
    /// Parse a single compound selector. Returns `None` for anything outside
    /// the supported subset.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty()
            || text
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '>' | '+' | '~' | '[' | ':'))
        {
            return None;
        }

        let mut selector = Selector::default();
        let mut rest = text;

        // Leading type selector (or universal).
        let tag_end = rest.find(['.', '#']).unwrap_or(rest.len());
        let tag = &rest[..tag_end];
        if !tag.is_empty() && tag != "*" {
            if !is_ident(tag) {
                return None;
            }
            selector.tag = Some(tag.to_ascii_lowercase());
        }
        rest = &rest[tag_end..];

        while !rest.is_empty() {
            let marker = rest.as_bytes()[0];
            let body = &rest[1..];
            let end = body.find(['.', '#']).unwrap_or(body.len());
            let name = &body[..end];
            if !is_ident(name) {
                return None;
            }
            match marker {
                b'.' => selector.classes.push(name.to_string()),
                b'#' => selector.id = Some(name.to_string()),
                _ => return None,
            }
            rest = &body[end..];
        }
        Some(selector)
    }

    /// CSS specificity as (ids, classes, types).
    pub fn specificity(&self) -> (usize, usize, usize) {
        (
            usize::from(self.id.is_some()),
            self.classes.len(),
            usize::from(self.tag.is_some()),
        )
    }

    pub fn matches(&self, element: &ElementNode) -> bool {
        if let Some(tag) = &self.tag {
            if !element.name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.id() != Some(id.as_str()) {
                return false;
            }
        }
        let classes = element.classes();
        self.classes.iter().all(|c| classes.contains(&c.as_str()))
    }
}

fn is_ident(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl Stylesheet {
    /// Parse CSS source text.
    pub fn parse(css: &str) -> Self {
        let mut sheet = Stylesheet::default();
        sheet.append(css);
        sheet
    }

    /// Parse `css` and append its rules after the existing ones.
    pub fn append(&mut self, css: &str) {
        let css = strip_comments(css);
        let mut rest = css.as_str();

        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }

            if rest.starts_with('@') {
                rest = self.parse_at_rule(rest);
                continue;
            }

            let Some(open) = rest.find('{') else {
                log::debug!("Ignoring trailing CSS without a block: {rest:?}");
                break;
            };
            let prelude = &rest[..open];
            let (block, remainder) = split_block(&rest[open + 1..]);
            rest = remainder;

            let declarations = parse_declarations(block);
            for part in prelude.split(',') {
                match Selector::parse(part) {
                    Some(selector) => {
                        let order = self.rules.len();
                        self.rules.push(StyleRule {
                            selector,
                            declarations: declarations.clone(),
                            order,
                        });
                    }
                    None => log::debug!("Skipping unsupported selector {:?}", part.trim()),
                }
            }
        }
    }

    /// Handle an at-rule starting at `input`; returns the remaining input.
    fn parse_at_rule<'a>(&mut self, input: &'a str) -> &'a str {
        let name_end = input[1..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
            .map(|i| i + 1)
            .unwrap_or(input.len());
        let name = input[1..name_end].to_ascii_lowercase();

        let next_semicolon = input.find(';');
        let next_brace = input.find('{');
        match (next_brace, next_semicolon) {
            // Statement at-rule such as @import or @charset.
            (Some(brace), Some(semi)) if semi < brace => {
                log::debug!("Ignoring @{name} statement");
                &input[semi + 1..]
            }
            (None, Some(semi)) => {
                log::debug!("Ignoring @{name} statement");
                &input[semi + 1..]
            }
            (Some(brace), _) => {
                let (block, remainder) = split_block(&input[brace + 1..]);
                if name == "page" {
                    let rule = parse_page_rule(block);
                    self.page.merge(&rule);
                } else {
                    log::debug!("Skipping @{name} block");
                }
                remainder
            }
            (None, None) => "",
        }
    }

    /// Append every rule of `other` after this sheet's rules.
    pub fn merge(&mut self, other: Stylesheet) {
        let offset = self.rules.len();
        self.rules
            .extend(other.rules.into_iter().map(|mut rule| {
                rule.order += offset;
                rule
            }));
        self.page.merge(&other.page);
    }

    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }

    /// The merged `@page` rule.
    pub fn page(&self) -> &PageRule {
        &self.page
    }

    /// Declarations that apply to `element`, in cascade order (lowest
    /// specificity first, then source order).
    pub fn declarations_for(&self, element: &ElementNode) -> Vec<(&str, &str)> {
        let mut matching: Vec<&StyleRule> = self
            .rules
            .iter()
            .filter(|rule| rule.selector.matches(element))
            .collect();
        matching.sort_by_key(|rule| (rule.selector.specificity(), rule.order));
        matching
            .into_iter()
            .flat_map(|rule| {
                rule.declarations
                    .iter()
                    .map(|(p, v)| (p.as_str(), v.as_str()))
            })
            .collect()
    }
}

/// Split `input` (just after an opening brace) into the block body and the
/// text after its matching closing brace.
fn split_block(input: &str) -> (&str, &str) {
    let mut depth = 1usize;
    for (i, c) in input.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return (&input[..i], &input[i + 1..]);
                }
            }
            _ => {}
        }
    }
    (input, "")
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Parse `prop: value; ...` into lowercase property names and trimmed values.
pub fn parse_declarations(block: &str) -> Vec<(String, String)> {
    block
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim().to_ascii_lowercase();
            let value = value.trim().trim_end_matches("!important").trim();
            if prop.is_empty() || value.is_empty() {
                None
            } else {
                Some((prop, value.to_string()))
            }
        })
        .collect()
}

fn parse_page_rule(block: &str) -> PageRule {
    let mut rule = PageRule::default();
    for (prop, value) in parse_declarations(block) {
        match prop.as_str() {
            "size" => rule.size = parse_page_size(&value),
            "margin" => {
                let values: Vec<f32> = value.split_whitespace().filter_map(parse_length).collect();
                rule.margins = PageMargins::from_values(&values);
            }
            "margin-top" | "margin-right" | "margin-bottom" | "margin-left" => {
                if let Some(v) = parse_length(&value) {
                    let m = rule.margins.get_or_insert(PageMargins::uniform(0.0));
                    match prop.as_str() {
                        "margin-top" => m.top = v,
                        "margin-right" => m.right = v,
                        "margin-bottom" => m.bottom = v,
                        _ => m.left = v,
                    }
                }
            }
            other => log::debug!("Ignoring @page property {other}"),
        }
    }
    rule
}

/// Parse the value of an `@page { size: ... }` declaration.
pub fn parse_page_size(value: &str) -> Option<PageSize> {
    let mut named: Option<PageSize> = None;
    let mut orientation = None;
    let mut lengths = Vec::new();

    for token in value.split_whitespace() {
        match token.to_ascii_lowercase().as_str() {
            "auto" => return None,
            "landscape" => orientation = Some(crate::page::PageOrientation::Landscape),
            "portrait" => orientation = Some(crate::page::PageOrientation::Portrait),
            other => {
                if let Some(size) = PageSize::from_name(other) {
                    named = Some(size);
                } else if let Some(len) = parse_length(other) {
                    lengths.push(len);
                } else {
                    log::debug!("Unknown @page size token {token:?}");
                }
            }
        }
    }

    let base = match (named, lengths.as_slice()) {
        (Some(size), _) => size,
        (None, [side]) => PageSize::new(*side, *side),
        (None, [w, h]) => PageSize::new(*w, *h),
        (None, _) => PageSize::A4,
    };
    Some(match orientation {
        Some(o) => base.with_orientation(o),
        None => base,
    })
}

/// Parse a CSS length into points. Bare numbers and `px` are treated as
/// points (1px = 1pt throughout the layout engine).
pub fn parse_length(value: &str) -> Option<f32> {
    let value = value.trim();
    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: f32 = number.parse().ok()?;
    let factor = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "px" | "pt" => 1.0,
        "mm" => PT_PER_MM,
        "cm" => PT_PER_MM * 10.0,
        "in" => 72.0,
        "pc" => 12.0,
        _ => return None,
    };
    Some(number * factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{parse_html, DomNode};
    use crate::page::PageOrientation;

    fn element(html: &str) -> ElementNode {
        match parse_html(html).into_iter().next() {
            Some(DomNode::Element(e)) => e,
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn page_rule_landscape() {
        let sheet = Stylesheet::parse("@page { size: A4 landscape; margin: 10mm; }");
        let size = sheet.page().size.unwrap();
        assert_eq!(size.orientation(), PageOrientation::Landscape);
        let margins = sheet.page().margins.unwrap();
        assert!((margins.left - 28.35).abs() < 0.01);
    }

    #[test]
    fn explicit_page_size_lengths() {
        let size = parse_page_size("210mm 297mm").unwrap();
        assert!((size.width - 595.28).abs() < 0.1);
        assert!((size.height - 841.89).abs() < 0.1);
        assert!(parse_page_size("auto").is_none());
    }

    #[test]
    fn selectors_match_by_tag_class_and_id() {
        let td = element(r#"<td class="num total" id="grand">1</td>"#);
        assert!(Selector::parse("td").unwrap().matches(&td));
        assert!(Selector::parse(".num").unwrap().matches(&td));
        assert!(Selector::parse("td.num.total").unwrap().matches(&td));
        assert!(Selector::parse("#grand").unwrap().matches(&td));
        assert!(!Selector::parse("th.num").unwrap().matches(&td));
        assert!(Selector::parse("table td").is_none());
        assert!(Selector::parse("a:hover").is_none());
    }

    #[test]
    fn cascade_orders_by_specificity_then_source() {
        let sheet = Stylesheet::parse(
            ".num { color: #ff0000 } td { color: #00ff00; text-align: left } /* note */ td { text-align: center }",
        );
        let td = element(r#"<td class="num">1</td>"#);
        let decls = sheet.declarations_for(&td);
        // td rules first (lower specificity), class rule last.
        assert_eq!(
            decls,
            vec![
                ("color", "#00ff00"),
                ("text-align", "left"),
                ("text-align", "center"),
                ("color", "#ff0000"),
            ]
        );
    }

    #[test]
    fn skips_media_blocks_and_imports() {
        let sheet = Stylesheet::parse(
            "@import url(x.css); @media print { p { color: red } } p { font-size: 9pt }",
        );
        assert_eq!(sheet.rules().len(), 1);
        assert_eq!(sheet.rules()[0].declarations[0].0, "font-size");
    }

    #[test]
    fn lengths_convert_to_points() {
        assert_eq!(parse_length("12px"), Some(12.0));
        assert_eq!(parse_length("1in"), Some(72.0));
        assert!((parse_length("2.54cm").unwrap() - 72.0).abs() < 0.01);
        assert_eq!(parse_length("bold"), None);
    }
}
