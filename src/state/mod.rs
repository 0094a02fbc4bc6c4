//! State module for tracking crawl progress
//!
//! `ChapterState` tracks a single chapter through fetch, retry and its
//! terminal outcome.

mod chapter_state;

pub use chapter_state::ChapterState;
