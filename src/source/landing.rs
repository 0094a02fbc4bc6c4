//! Landing-page helpers shared by the source adapters
//!
//! URL splitting, cover download, and the prioritized heuristics used to
//! discover a novel's numeric ID.

use crate::html::extractor::{select_attr, select_text};
use crate::http::HttpClient;
use crate::{NovelError, Result};
use regex::Regex;
use scraper::Html;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use url::Url;

/// Author shown when a page does not name one
pub const UNKNOWN_AUTHOR: &str = "Không rõ";

/// Range of the cosmetic slug-hash identifier
const SLUG_HASH_MODULUS: u64 = 100_000;

fn re_first_number() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"\d+").unwrap())
}

/// Where a novel lives: site origin plus its slug
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NovelLocation {
    /// `scheme://host[:port]`, no trailing slash
    pub base_url: String,
    pub slug: String,
}

/// Splits a novel URL into its site origin and slug
pub fn locate_novel(url: &str) -> Result<NovelLocation> {
    let parsed = Url::parse(url.trim())?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(NovelError::parse(url, "novel URL must use http or https"));
    }

    let slug = parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or_default()
        .to_string();

    Ok(NovelLocation {
        base_url: parsed.origin().ascii_serialization(),
        slug,
    })
}

/// Resolves a possibly relative href against the site origin
pub fn resolve_url(base_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("data:") {
        return None;
    }
    Url::parse(base_url)
        .ok()?
        .join(href)
        .ok()
        .map(|url| url.to_string())
}

/// Picks the page title, falling back to a title built from the slug
///
/// Fails with `MetadataNotFound` when neither source yields anything.
pub fn title_or_slug(title: Option<String>, slug: &str, url: &str) -> Result<String> {
    if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
        return Ok(title.trim().to_string());
    }

    let from_slug = crate::model::title_from_slug(slug);
    if from_slug.is_empty() {
        return Err(NovelError::MetadataNotFound {
            url: url.to_string(),
        });
    }

    tracing::debug!("No title element, using slug-derived title '{}'", from_slug);
    Ok(from_slug)
}

/// Downloads the cover image; any failure downgrades to no cover
pub async fn download_cover(client: &HttpClient, cover_url: Option<String>) -> Option<Vec<u8>> {
    let cover_url = cover_url?;
    tracing::info!("Downloading cover image {}", cover_url);

    match client.get_bytes(&cover_url).await {
        Ok(bytes) if !bytes.is_empty() => Some(bytes),
        Ok(_) => {
            tracing::warn!("Cover image {} is empty, continuing without cover", cover_url);
            None
        }
        Err(e) => {
            tracing::warn!("Cover download failed, continuing without cover: {}", e);
            None
        }
    }
}

/// Discovers a numeric novel ID from the strongest available signal
///
/// Order: inline script variable, then hidden form field, then microdata.
/// The first heuristic that yields a value wins.
pub fn discover_novel_id(raw_html: &str, document: &Html, variable: &str, input_name: &str) -> Option<u64> {
    if let Some(id) = script_variable_id(raw_html, variable) {
        tracing::debug!("Novel ID {} from script variable '{}'", id, variable);
        return Some(id);
    }
    if let Some(id) = hidden_input_id(document, input_name) {
        tracing::debug!("Novel ID {} from hidden input '{}'", id, input_name);
        return Some(id);
    }
    if let Some(id) = microdata_id(document) {
        tracing::debug!("Novel ID {} from microdata", id);
        return Some(id);
    }
    None
}

/// Scans inline scripts for `var <name> = '123'`
pub fn script_variable_id(raw_html: &str, variable: &str) -> Option<u64> {
    let pattern = format!(r#"var\s+{}\s*=\s*['"](\d+)['"]"#, regex::escape(variable));
    let re = Regex::new(&pattern).ok()?;
    re.captures(raw_html)?[1].parse().ok().filter(|id| *id > 0)
}

/// Reads `<input type="hidden" name="<name>" value="123">`
pub fn hidden_input_id(document: &Html, name: &str) -> Option<u64> {
    let css = format!("input[type='hidden'][name='{}']", name);
    select_attr(document, &[css.as_str()], "value")?
        .parse()
        .ok()
        .filter(|id| *id > 0)
}

/// Reads an `itemprop="identifier"` microdata value (attribute or text)
pub fn microdata_id(document: &Html) -> Option<u64> {
    select_attr(document, &["[itemprop='identifier'][content]"], "content")
        .or_else(|| select_text(document, &["[itemprop='identifier']"]))
        .and_then(|value| first_number(&value))
        .map(u64::from)
        .filter(|id| *id > 0)
}

/// First run of ASCII digits in `text`
pub fn first_number(text: &str) -> Option<u32> {
    re_first_number().find(text)?.as_str().parse().ok()
}

/// Cosmetic ID derived from the slug for sites that expose none
///
/// Not collision-free and not meant to identify a novel across runs or
/// implementations.
pub fn slug_hash_id(slug: &str) -> u64 {
    let digest = Sha256::digest(slug.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix) % SLUG_HASH_MODULUS
}
