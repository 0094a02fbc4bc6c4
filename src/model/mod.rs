//! Data model shared by sources, the crawler and output sinks
//!
//! - `NovelMetadata`: what a source learned from the novel's landing page
//! - `ChapterRef`: one entry of the ordered chapter list
//! - `ChapterRecord`: a chapter after its content fetch, success or not

use std::fmt;

/// Novel-level information parsed from a landing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NovelMetadata {
    /// Scheme, host and port of the site (no trailing slash)
    pub source_base_url: String,

    /// Last path segment of the novel URL
    pub slug: String,

    /// Site-internal numeric identifier
    pub id: u64,

    pub title: String,

    pub author: String,

    pub description: Option<String>,

    /// Raw cover image bytes, absent if the page had none or the download failed
    pub cover_image: Option<Vec<u8>>,

    /// Total chapters as announced by the site
    pub total_chapters: Option<u32>,

    /// Page cap for the listing endpoint
    pub max_listing_pages: Option<u32>,
}

/// Computes the listing page cap from a chapter total and a page size
///
/// Returns `ceil(total / per_page)`; a page size of zero yields no cap.
pub fn listing_page_cap(total_chapters: u32, chapters_per_page: u32) -> Option<u32> {
    if chapters_per_page == 0 {
        return None;
    }
    Some(total_chapters.div_ceil(chapters_per_page))
}

/// A chapter entry in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRef {
    pub title: String,

    /// Absolute chapter URL
    pub url: String,

    pub slug: String,
}

/// Final outcome of a chapter's content fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchStatus {
    Ok,
    FailedExhausted,
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::FailedExhausted => write!(f, "failed_exhausted"),
        }
    }
}

/// A chapter together with its fetched (or placeholder) content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRecord {
    pub chapter: ChapterRef,

    /// Normalized HTML, or a visible placeholder when the fetch failed
    pub content_html: String,

    pub fetch_status: FetchStatus,

    /// Number of fetch attempts made
    pub attempts: u32,
}

impl ChapterRecord {
    pub fn title(&self) -> &str {
        &self.chapter.title
    }

    pub fn is_ok(&self) -> bool {
        self.fetch_status == FetchStatus::Ok
    }
}

/// Content returned by a source for a single chapter page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedChapter {
    /// The chapter's real title when the page carries one
    pub title: Option<String>,

    pub content_html: String,
}

/// Turns a URL slug into a display title ("tien-nghich" -> "Tien Nghich")
pub fn title_from_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
