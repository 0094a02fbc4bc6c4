//! Crawl orchestrator - sequential chapter fetching with bounded retries
//!
//! Chapters are fetched strictly in input order, one at a time. Each chapter
//! runs through the [`ChapterState`] machine:
//!
//! - success stores the content and sleeps `chapter_delay` before the next chapter
//! - failure sleeps `chapter_delay * 2` and tries again, up to `max_retries` attempts
//! - exhaustion stores a visible placeholder and moves on
//!
//! A single chapter's failure never aborts the run.

use crate::config::CrawlConfig;
use crate::model::{ChapterRecord, ChapterRef, FetchStatus};
use crate::source::NovelSource;
use crate::state::ChapterState;
use crate::NovelError;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Fixed multiplier applied to the chapter delay after a failed attempt
pub const BACKOFF_MULTIPLIER: u32 = 2;

/// Records produced by a crawl, in input order
#[derive(Debug, Clone, Default)]
pub struct CrawlOutcome {
    pub records: Vec<ChapterRecord>,

    /// True when the crawl was cancelled before every chapter was processed
    pub interrupted: bool,
}

impl CrawlOutcome {
    pub fn succeeded(&self) -> usize {
        self.records.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &ChapterRecord> {
        self.records.iter().filter(|r| !r.is_ok())
    }
}

/// Fetches chapter content for an ordered chapter list
#[derive(Debug, Clone)]
pub struct CrawlOrchestrator {
    chapter_delay: Duration,
    max_retries: u32,
    cancel: CancellationToken,
}

impl CrawlOrchestrator {
    /// Creates an orchestrator
    ///
    /// # Arguments
    ///
    /// * `chapter_delay` - Sleep after each successful chapter; failures back off twice as long
    /// * `max_retries` - Total attempts per chapter (values below 1 are treated as 1)
    pub fn new(chapter_delay: Duration, max_retries: u32) -> Self {
        Self {
            chapter_delay,
            max_retries: max_retries.max(1),
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_config(config: &CrawlConfig) -> Self {
        Self::new(config.chapter_delay(), config.max_retries)
    }

    /// Uses `token` to stop the crawl between chapters and during sleeps
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Crawls every chapter in order
    ///
    /// The returned records keep the input order. When cancelled, the
    /// records finished so far are returned with `interrupted` set.
    pub async fn crawl<S>(&self, source: &S, chapters: Vec<ChapterRef>) -> CrawlOutcome
    where
        S: NovelSource + ?Sized,
    {
        let total = chapters.len();
        let mut outcome = CrawlOutcome {
            records: Vec::with_capacity(total),
            interrupted: false,
        };

        tracing::info!("Crawling content of {} chapters", total);

        for (index, chapter) in chapters.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                outcome.interrupted = true;
                break;
            }

            match self.crawl_chapter(source, chapter, index + 1, total).await {
                Some(record) => outcome.records.push(record),
                None => {
                    outcome.interrupted = true;
                    break;
                }
            }
        }

        if outcome.interrupted {
            tracing::warn!(
                "Crawl interrupted after {} of {} chapters",
                outcome.records.len(),
                total
            );
        } else {
            tracing::info!(
                "Crawl finished: {} succeeded, {} failed",
                outcome.succeeded(),
                outcome.records.len() - outcome.succeeded()
            );
        }

        outcome
    }

    /// Runs one chapter to a terminal state; `None` if cancelled mid-way
    async fn crawl_chapter<S>(
        &self,
        source: &S,
        mut chapter: ChapterRef,
        index: usize,
        total: usize,
    ) -> Option<ChapterRecord>
    where
        S: NovelSource + ?Sized,
    {
        let mut state = ChapterState::Pending;
        let mut attempts = 0u32;

        tracing::info!("[{}/{}] {}", index, total, chapter.title);

        loop {
            state = advance(state, ChapterState::Fetching);
            attempts += 1;

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                result = source.fetch_chapter_content(&chapter.url) => result,
            };

            match result {
                Ok(fetched) => {
                    advance(state, ChapterState::Succeeded);

                    if let Some(title) = fetched.title.filter(|t| !t.trim().is_empty()) {
                        chapter.title = title;
                    }
                    tracing::debug!("[{}/{}] fetched {}", index, total, chapter.title);

                    let record = ChapterRecord {
                        chapter,
                        content_html: fetched.content_html,
                        fetch_status: FetchStatus::Ok,
                        attempts,
                    };

                    // The record is complete even if the pause is cut short
                    self.pause(self.chapter_delay).await;
                    return Some(record);
                }
                Err(error) => {
                    state = advance(state, ChapterState::Retrying);

                    if attempts < self.max_retries {
                        tracing::warn!(
                            "[{}/{}] {} failed ({}), retry {}/{}",
                            index,
                            total,
                            chapter.title,
                            error,
                            attempts,
                            self.max_retries
                        );
                        if !self.pause(self.chapter_delay * BACKOFF_MULTIPLIER).await {
                            return None;
                        }
                        continue;
                    }

                    advance(state, ChapterState::FailedExhausted);
                    tracing::warn!(
                        "[{}/{}] {} skipped after {} attempts: {}",
                        index,
                        total,
                        chapter.title,
                        attempts,
                        error
                    );

                    return Some(ChapterRecord {
                        chapter,
                        content_html: failure_placeholder(attempts, &error),
                        fetch_status: FetchStatus::FailedExhausted,
                        attempts,
                    });
                }
            }
        }
    }

    /// Sleeps unless cancelled; returns false if the token fired
    async fn pause(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.cancel.is_cancelled();
        }
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}

fn advance(from: ChapterState, to: ChapterState) -> ChapterState {
    debug_assert!(
        from.can_transition_to(to),
        "invalid chapter transition {} -> {}",
        from,
        to
    );
    tracing::trace!("chapter state {} -> {}", from, to);
    to
}

/// Placeholder body stored for a chapter whose every attempt failed
pub fn failure_placeholder(attempts: u32, error: &NovelError) -> String {
    let message = error
        .to_string()
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!(
        "<div>\n<p>Failed to load chapter after {} attempts: {}</p>\n</div>",
        attempts, message
    )
}
