//! HTML extractor
//!
//! Locates a target element by a prioritized selector list, strips
//! disallowed sub-elements and returns the cleaned markup. Everything here
//! is a pure transform over strings; no I/O.

use regex::Regex;
use scraper::node::Element;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Elements that never carry chapter text
pub const DISALLOWED_TAGS: &[&str] = &["script", "style", "iframe", "ins"];

/// Elements considered containers for advertisement matching
const AD_CONTAINER_TAGS: &str = "div, section, aside";

fn re_numeric_entity() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"(?i)&#(x[0-9a-f]+|[0-9]+);").unwrap())
}

/// Parses a CSS selector, logging and skipping invalid ones
pub fn parse_selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::warn!("Invalid selector '{}': {:?}", css, e);
            None
        }
    }
}

/// Returns the first element matched by the first selector that matches anything
///
/// Selectors are tried in order; the first one with a match wins even if a
/// later selector would match an element earlier in the document.
pub fn select_first<'a>(document: &'a Html, selectors: &[&str]) -> Option<ElementRef<'a>> {
    selectors
        .iter()
        .filter_map(|css| parse_selector(css))
        .find_map(|selector| document.select(&selector).next())
}

/// Returns the trimmed text of the first element matching any selector
pub fn select_text(document: &Html, selectors: &[&str]) -> Option<String> {
    select_first(document, selectors)
        .map(|element| collapse_text(element, " "))
        .filter(|text| !text.is_empty())
}

/// Returns an attribute of the first element matching any selector
pub fn select_attr(document: &Html, selectors: &[&str], attr: &str) -> Option<String> {
    selectors
        .iter()
        .filter_map(|css| parse_selector(css))
        .flat_map(|selector| {
            document
                .select(&selector)
                .filter_map(|el| el.value().attr(attr))
                .map(|value| value.trim().to_string())
                .collect::<Vec<_>>()
        })
        .find(|value| !value.is_empty())
}

/// Joins an element's trimmed, non-empty text nodes with `separator`
pub fn collapse_text(element: ElementRef<'_>, separator: &str) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Extracts the inner markup of the first matching container, cleaned
///
/// # Arguments
///
/// * `html` - The full page markup
/// * `containers` - Container selectors in priority order
/// * `ad_patterns` - id/class fragments marking advertisement containers
///
/// # Returns
///
/// * `Some(String)` - Cleaned inner markup of the container
/// * `None` - No selector matched
pub fn extract_container(html: &str, containers: &[&str], ad_patterns: &[String]) -> Option<String> {
    let document = Html::parse_document(html);
    let container = select_first(&document, containers)?;
    let inner = container.inner_html();

    let mut fragment = Html::parse_fragment(&inner);
    strip_disallowed(&mut fragment, ad_patterns);
    Some(fragment.root_element().inner_html())
}

/// Removes disallowed elements and advertisement containers in place
pub fn strip_disallowed(document: &mut Html, ad_patterns: &[String]) {
    let mut doomed = Vec::new();

    if let Some(selector) = parse_selector(&DISALLOWED_TAGS.join(", ")) {
        doomed.extend(document.select(&selector).map(|el| el.id()));
    }

    if !ad_patterns.is_empty() {
        if let Some(selector) = parse_selector(AD_CONTAINER_TAGS) {
            doomed.extend(
                document
                    .select(&selector)
                    .filter(|el| is_ad_container(el.value(), ad_patterns))
                    .map(|el| el.id()),
            );
        }
    }

    for id in doomed {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Returns true if the element's id or class contains an ad pattern
fn is_ad_container(element: &Element, ad_patterns: &[String]) -> bool {
    let id = element.id().unwrap_or("").to_lowercase();
    let class = element.attr("class").unwrap_or("").to_lowercase();

    ad_patterns.iter().any(|pattern| {
        let pattern = pattern.to_lowercase();
        id.contains(&pattern) || class.contains(&pattern)
    })
}

/// Decodes the entities a listing payload uses to smuggle markup through JSON
///
/// Only applied to fragments that arrive escaped (no literal `<` but an
/// encoded one); fragments that are already markup are returned untouched.
pub fn unescape_fragment(fragment: &str) -> String {
    if fragment.contains('<') || !(fragment.contains("&lt;") || fragment.contains("&#60;")) {
        return fragment.to_string();
    }

    let named = fragment
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", "\u{a0}");

    let numeric = re_numeric_entity().replace_all(&named, |caps: &regex::Captures<'_>| {
        let code = &caps[1];
        let value = match code.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        value
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    // &amp; last so "&amp;lt;" decodes to "&lt;" rather than "<"
    numeric.replace("&amp;", "&")
}
