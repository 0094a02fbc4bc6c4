//! Content normalizer
//!
//! Sites disagree on how a chapter body is marked up: some use `<p>` tags,
//! some separate lines with runs of `<br>`, some ship bare text with
//! newlines. The normalizer turns all of them into the same shape:
//!
//! ```html
//! <div>
//! <p>first paragraph</p>
//! <p>second paragraph</p>
//! </div>
//! ```
//!
//! Running it on its own output returns the same string.

use crate::config::CrawlConfig;
use crate::html::extractor::strip_disallowed;
use scraper::{ElementRef, Html};

/// Elements whose boundaries separate lines in the plain-text fallback
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li",
    "section", "tr",
];

/// Canonicalizes extracted fragments into paragraph-delimited HTML
#[derive(Debug, Clone)]
pub struct ContentNormalizer {
    ad_patterns: Vec<String>,
}

impl Default for ContentNormalizer {
    fn default() -> Self {
        Self::from_config(&CrawlConfig::default())
    }
}

impl ContentNormalizer {
    pub fn new(ad_patterns: Vec<String>) -> Self {
        Self { ad_patterns }
    }

    pub fn from_config(config: &CrawlConfig) -> Self {
        Self::new(config.ad_patterns.clone())
    }

    pub fn ad_patterns(&self) -> &[String] {
        &self.ad_patterns
    }

    /// Normalizes a fragment into `<div>` wrapped `<p>` paragraphs
    ///
    /// A fragment without any text produces `<div></div>`; that is a valid
    /// result, not an error.
    pub fn normalize(&self, fragment: &str) -> String {
        let mut document = Html::parse_fragment(fragment);
        strip_disallowed(&mut document, &self.ad_patterns);

        // Detached nodes stay in the arena, so only walk from the live root
        let root = document.root_element();
        let paragraphs = if has_descendant(root, "p") {
            paragraph_units(root)
        } else {
            paragraphs_from_text(root)
        };

        wrap_paragraphs(&paragraphs)
    }
}

/// Collects paragraphs from a fragment that has `<p>` elements
///
/// Every `<p>` is a unit. Content between units (loose text, `<br>` runs,
/// other elements) is kept and split into lines like the plain-text path.
fn paragraph_units(root: ElementRef<'_>) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut loose = String::new();
    collect_units(root, &mut paragraphs, &mut loose);
    flush_loose(&mut loose, &mut paragraphs);
    paragraphs
}

fn collect_units(element: ElementRef<'_>, paragraphs: &mut Vec<String>, loose: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            loose.push_str(text);
        } else if let Some(child_element) = ElementRef::wrap(child) {
            if child_element.value().name() == "p" {
                flush_loose(loose, paragraphs);
                paragraphs.extend(split_paragraph_unit(child_element));
            } else if has_descendant(child_element, "p") {
                loose.push('\n');
                collect_units(child_element, paragraphs, loose);
                loose.push('\n');
            } else {
                push_element_text(child_element, loose);
            }
        }
    }
}

fn flush_loose(loose: &mut String, paragraphs: &mut Vec<String>) {
    let text = std::mem::take(loose);
    paragraphs.extend(text_lines(&text));
}

/// Splits one `<p>` unit at every `<br>`, keeping inline markup balanced
fn split_paragraph_unit(unit: ElementRef<'_>) -> Vec<String> {
    let mut splitter = UnitSplitter::default();
    splitter.walk(unit);
    splitter.finish()
}

/// Serializes a unit segment by segment
///
/// A `<br>` nested in inline markup closes the open tags at the break and
/// reopens them in the next segment, so `<em>a<br>b</em>` becomes
/// `<em>a</em>` and `<em>b</em>`.
#[derive(Default)]
struct UnitSplitter {
    /// Open inline ancestors: (tag name, serialized start tag)
    open: Vec<(String, String)>,
    current: String,
    has_content: bool,
    segments: Vec<String>,
}

impl UnitSplitter {
    fn walk(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                if !text.trim().is_empty() {
                    self.has_content = true;
                }
                self.current.push_str(&escape_text(text));
            } else if let Some(child_element) = ElementRef::wrap(child) {
                self.push_element(child_element);
            }
        }
    }

    fn push_element(&mut self, element: ElementRef<'_>) {
        let name = element.value().name();
        if name == "br" {
            self.break_segment();
            return;
        }

        if !has_descendant(element, "br") {
            if has_visible_content(element) {
                self.has_content = true;
            }
            self.current.push_str(&element.html());
            return;
        }

        let start = start_tag(element);
        self.current.push_str(&start);
        self.open.push((name.to_string(), start));
        self.walk(element);
        self.open.pop();
        self.current.push_str(&format!("</{}>", name));
    }

    fn break_segment(&mut self) {
        let mut segment = std::mem::take(&mut self.current);
        for (name, _) in self.open.iter().rev() {
            segment.push_str(&format!("</{}>", name));
        }
        if self.has_content {
            self.segments.push(format!("<p>{}</p>", segment.trim()));
        }

        self.has_content = false;
        for (_, start) in &self.open {
            self.current.push_str(start);
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.break_segment();
        self.segments
    }
}

/// True if `element` or anything below it is a `<name>` element
fn has_descendant(element: ElementRef<'_>, name: &str) -> bool {
    element
        .descendants()
        .filter_map(ElementRef::wrap)
        .any(|el| el.value().name() == name)
}

fn has_visible_content(element: ElementRef<'_>) -> bool {
    element.text().any(|t| !t.trim().is_empty()) || has_descendant(element, "img")
}

fn start_tag(element: ElementRef<'_>) -> String {
    let mut tag = format!("<{}", element.value().name());
    for (name, value) in element.value().attrs() {
        tag.push_str(&format!(" {}=\"{}\"", name, escape_attribute(value)));
    }
    tag.push('>');
    tag
}

/// Builds paragraphs from the fragment's text, one per non-empty line
fn paragraphs_from_text(root: ElementRef<'_>) -> Vec<String> {
    let mut text = String::new();
    collect_text(root, &mut text);
    text_lines(&text)
}

fn text_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| format!("<p>{}</p>", escape_text(line)))
        .collect()
}

/// Flattens an element to text; `<br>` and block boundaries become newlines
fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_element) = ElementRef::wrap(child) {
            push_element_text(child_element, out);
        }
    }
}

fn push_element_text(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if name == "br" {
        out.push('\n');
        return;
    }

    let is_block = BLOCK_TAGS.contains(&name);
    if is_block {
        out.push('\n');
    }
    collect_text(element, out);
    if is_block {
        out.push('\n');
    }
}

fn wrap_paragraphs(paragraphs: &[String]) -> String {
    if paragraphs.is_empty() {
        return "<div></div>".to_string();
    }
    format!("<div>\n{}\n</div>", paragraphs.join("\n"))
}

/// Escapes text the way the HTML serializer does, so reparsing is stable
fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\u{a0}' => escaped.push_str("&nbsp;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('\u{a0}', "&nbsp;")
        .replace('"', "&quot;")
}
