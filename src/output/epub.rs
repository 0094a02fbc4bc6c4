//! EPUB document sink
//!
//! Builds the archive in memory with `epub-builder`, writes it to a temporary
//! file next to the destination and renames it into place once complete.

use crate::config::OutputConfig;
use crate::model::{ChapterRecord, NovelMetadata};
use crate::output::traits::{DocumentSink, OutputError, OutputResult};
use epub_builder::{EpubBuilder, EpubContent, EpubVersion, ReferenceType, ZipLibrary};
use regex::Regex;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::NamedTempFile;

const STYLESHEET: &str = "\
body { font-family: serif; line-height: 1.6; margin: 0 5%; }
h1 { font-size: 1.4em; text-align: center; margin: 1em 0; }
p { text-indent: 1.5em; margin: 0.4em 0; text-align: justify; }
";

fn re_non_word() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"[^\w\s-]").unwrap())
}

fn re_separator_run() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"[-\s]+").unwrap())
}

/// Writes novels as EPUB 3 files into a directory
#[derive(Debug, Clone)]
pub struct EpubSink {
    directory: PathBuf,
    language: String,
}

impl EpubSink {
    pub fn new(directory: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            language: language.into(),
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(&config.directory, &config.language)
    }

    /// Destination path for a novel title
    pub fn output_path(&self, title: &str) -> PathBuf {
        self.directory.join(output_file_name(title))
    }

    fn build(&self, metadata: &NovelMetadata, records: &[ChapterRecord]) -> OutputResult<Vec<u8>> {
        let identifier = book_identifier(metadata.id, chrono::Utc::now().timestamp());

        let zip = ZipLibrary::new().map_err(epub_error)?;
        let mut book = EpubBuilder::new(zip).map_err(epub_error)?;
        book.epub_version(EpubVersion::V30);

        book.metadata("title", metadata.title.as_str()).map_err(epub_error)?;
        book.metadata("author", metadata.author.as_str()).map_err(epub_error)?;
        book.metadata("lang", self.language.as_str()).map_err(epub_error)?;
        book.metadata("toc_name", metadata.title.as_str()).map_err(epub_error)?;
        book.metadata("generator", format!("novelsmith ({})", identifier))
            .map_err(epub_error)?;
        if let Some(description) = metadata.description.as_deref() {
            book.metadata("description", description).map_err(epub_error)?;
        }

        book.stylesheet(Cursor::new(STYLESHEET.as_bytes())).map_err(epub_error)?;

        if let Some(cover) = metadata.cover_image.as_deref() {
            let (mime, extension) = sniff_image_type(cover);
            book.add_cover_image(format!("images/cover.{}", extension), Cursor::new(cover.to_vec()), mime)
                .map_err(epub_error)?;
        }

        for (index, record) in records.iter().enumerate() {
            let file_name = format!("chapter_{}.xhtml", index + 1);
            let body = chapter_xhtml(record.title(), &record.content_html, &self.language);
            book.add_content(
                EpubContent::new(file_name, Cursor::new(body.into_bytes()))
                    .title(record.title())
                    .reftype(ReferenceType::Text),
            )
            .map_err(epub_error)?;
        }

        book.inline_toc();

        let mut buffer = Vec::new();
        book.generate(&mut buffer).map_err(epub_error)?;
        tracing::debug!("Built {} ({} bytes, {} chapters)", identifier, buffer.len(), records.len());
        Ok(buffer)
    }
}

impl DocumentSink for EpubSink {
    fn write(&self, metadata: &NovelMetadata, records: &[ChapterRecord]) -> OutputResult<PathBuf> {
        let bytes = self.build(metadata, records)?;

        fs::create_dir_all(&self.directory)?;
        let path = self.output_path(&metadata.title);
        persist_atomically(&self.directory, &path, &bytes)?;

        tracing::info!("Wrote {}", path.display());
        Ok(path)
    }
}

/// Writes `bytes` into a temp file in `directory`, then renames it to `path`
fn persist_atomically(directory: &Path, path: &Path, bytes: &[u8]) -> OutputResult<()> {
    let mut file = NamedTempFile::new_in(directory)?;
    file.write_all(bytes)?;
    file.flush()?;
    file.persist(path)?;
    Ok(())
}

fn epub_error(e: impl ToString) -> OutputError {
    OutputError::Epub(e.to_string())
}

/// `novel_{id}_{unix_ts}`
pub fn book_identifier(novel_id: u64, timestamp: i64) -> String {
    format!("novel_{}_{}", novel_id, timestamp)
}

/// File name derived from the title
///
/// Drops everything but word characters, whitespace and hyphens, then turns
/// each run of hyphens/whitespace into a single underscore.
pub fn output_file_name(title: &str) -> String {
    let cleaned = re_non_word().replace_all(title.trim(), "");
    let joined = re_separator_run().replace_all(&cleaned, "_");
    let stem = joined.trim_matches('_');
    if stem.is_empty() {
        "novel.epub".to_string()
    } else {
        format!("{}.epub", stem)
    }
}

/// Detects the image format from magic bytes, defaulting to JPEG
pub fn sniff_image_type(bytes: &[u8]) -> (&'static str, &'static str) {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return ("image/jpeg", "jpg");
    }
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return ("image/png", "png");
    }
    if bytes.len() >= 6 && bytes.starts_with(b"GIF") {
        return ("image/gif", "gif");
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return ("image/webp", "webp");
    }
    ("image/jpeg", "jpg")
}

fn chapter_xhtml(title: &str, content_html: &str, language: &str) -> String {
    let title = escape_xml(title);
    format!(
        "<?xml version='1.0' encoding='utf-8'?>\n<!DOCTYPE html>\n<html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\" lang=\"{lang}\" xml:lang=\"{lang}\">\n  <head>\n    <title>{title}</title>\n    <link href=\"stylesheet.css\" rel=\"stylesheet\" type=\"text/css\"/>\n  </head>\n  <body>\n    <h1>{title}</h1>\n{content}\n  </body>\n</html>",
        lang = escape_xml(language),
        title = title,
        content = xhtml_entities(content_html),
    )
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// XHTML only knows the XML entities; `&nbsp;` must become numeric
fn xhtml_entities(html: &str) -> String {
    html.replace("&nbsp;", "&#160;")
}
