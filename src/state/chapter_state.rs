/// Chapter state definitions for tracking crawl progress
///
/// Each chapter moves through a small bounded state machine while the
/// orchestrator fetches it:
///
/// ```text
/// Pending -> Fetching -> Succeeded
///               |  ^
///               v  |
///            Retrying -> FailedExhausted
/// ```
use std::fmt;

/// Represents the current state of a chapter in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChapterState {
    // ===== Active States =====
    /// Chapter is waiting for its first fetch attempt
    Pending,

    /// A fetch attempt is in flight
    Fetching,

    /// The last attempt failed and the chapter is backing off before the next one
    Retrying,

    // ===== Terminal States =====
    /// Content was fetched and stored
    Succeeded,

    /// Every allowed attempt failed; a placeholder was stored instead
    FailedExhausted,
}

impl ChapterState {
    /// Returns true if no further processing will happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::FailedExhausted)
    }

    /// Returns true if the transition `self -> next` is allowed
    pub fn can_transition_to(&self, next: ChapterState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Fetching)
                | (Self::Fetching, Self::Succeeded)
                | (Self::Fetching, Self::Retrying)
                | (Self::Retrying, Self::Fetching)
                | (Self::Retrying, Self::FailedExhausted)
        )
    }

    /// Short lowercase name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Retrying => "retrying",
            Self::Succeeded => "succeeded",
            Self::FailedExhausted => "failed_exhausted",
        }
    }
}

impl fmt::Display for ChapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
