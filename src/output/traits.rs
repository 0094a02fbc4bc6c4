//! Document sink trait and output errors

use crate::model::{ChapterRecord, NovelMetadata};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing a document
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to build e-book: {0}")]
    Epub(String),

    #[error("Failed to move finished file into place: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Consumes the ordered chapter records of a crawl
///
/// Implementations must keep record order and must never leave a partially
/// written file at the returned path.
pub trait DocumentSink {
    /// Writes one document for the novel
    ///
    /// # Arguments
    ///
    /// * `metadata` - Novel-level information
    /// * `records` - Chapters in reading order, failed ones included
    ///
    /// # Returns
    ///
    /// * `Ok(PathBuf)` - Location of the finished document
    /// * `Err(OutputError)` - Nothing was written at the destination
    fn write(&self, metadata: &NovelMetadata, records: &[ChapterRecord]) -> OutputResult<PathBuf>;
}
