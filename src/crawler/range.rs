//! Chapter range selection
//!
//! Operators pick a 1-based inclusive `start..=end` slice of the discovered
//! chapter list. Both bounds are validated against the total count.

use crate::{NovelError, Result};

/// A 1-based inclusive chapter range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterRange {
    pub start: usize,
    pub end: usize,
}

impl ChapterRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Builds a range from optional bounds, defaulting to the whole list
    ///
    /// A missing start means chapter 1, a missing end means the last chapter.
    pub fn from_bounds(start: Option<usize>, end: Option<usize>, total: usize) -> Result<Self> {
        let range = Self::new(start.unwrap_or(1), end.unwrap_or(total));
        range.validate(total)?;
        Ok(range)
    }

    /// Checks `1 <= start <= end <= total`
    pub fn validate(&self, total: usize) -> Result<()> {
        if self.start < 1 || self.start > self.end || self.end > total {
            return Err(NovelError::InvalidRange {
                start: self.start,
                end: self.end,
                total,
            });
        }
        Ok(())
    }

    /// Number of chapters the range selects
    pub fn len(&self) -> usize {
        (self.end + 1).saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keeps only the items inside the range, in their original order
    pub fn apply<T>(&self, items: Vec<T>) -> Result<Vec<T>> {
        self.validate(items.len())?;
        Ok(items
            .into_iter()
            .skip(self.start - 1)
            .take(self.len())
            .collect())
    }
}
