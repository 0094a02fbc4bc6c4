//! End-of-run report
//!
//! Summarizes a crawl outcome: how many chapters made it, which ones were
//! replaced by placeholders, and where the document went.

use crate::crawler::CrawlOutcome;
use crate::model::NovelMetadata;
use std::path::{Path, PathBuf};

/// Per-run crawl summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub title: String,

    /// Chapters processed (succeeded + failed)
    pub processed: usize,

    pub succeeded: usize,

    /// Titles of chapters that exhausted their retries, in order
    pub failed_titles: Vec<String>,

    pub interrupted: bool,

    /// Written document, if any
    pub output: Option<PathBuf>,
}

impl CrawlReport {
    pub fn new(metadata: &NovelMetadata, outcome: &CrawlOutcome) -> Self {
        Self {
            title: metadata.title.clone(),
            processed: outcome.records.len(),
            succeeded: outcome.succeeded(),
            failed_titles: outcome.failed().map(|r| r.title().to_string()).collect(),
            interrupted: outcome.interrupted,
            output: None,
        }
    }

    pub fn with_output(mut self, path: &Path) -> Self {
        self.output = Some(path.to_path_buf());
        self
    }

    pub fn failed(&self) -> usize {
        self.failed_titles.len()
    }

    /// Share of processed chapters that succeeded, in percent
    pub fn success_rate(&self) -> f64 {
        if self.processed == 0 {
            return 0.0;
        }
        (self.succeeded as f64 / self.processed as f64) * 100.0
    }
}

/// Prints the report to stdout
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report: {} ===\n", report.title);

    println!("Chapters:");
    println!("  Processed: {}", report.processed);
    println!(
        "  Succeeded: {} ({:.1}%)",
        report.succeeded,
        report.success_rate()
    );
    println!("  Failed: {}", report.failed());
    println!();

    if !report.failed_titles.is_empty() {
        println!("Failed Chapters ({}):", report.failed());
        for title in &report.failed_titles {
            println!("  - {}", title);
        }
        println!();
    }

    if report.interrupted {
        println!("Run was interrupted before all chapters were fetched.");
    }

    match &report.output {
        Some(path) => println!("Output: {}", path.display()),
        None => println!("Output: none written"),
    }
}
