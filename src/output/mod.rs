//! Output module for writing crawled novels
//!
//! This module handles:
//! - The `DocumentSink` interface consuming ordered chapter records
//! - EPUB generation
//! - The end-of-run report

mod epub;
pub mod stats;
mod traits;

pub use epub::{book_identifier, output_file_name, sniff_image_type, EpubSink};
pub use stats::{print_report, CrawlReport};
pub use traits::{DocumentSink, OutputError, OutputResult};
