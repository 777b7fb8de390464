//! Batch window type

use std::fmt;

/// One contiguous `(offset, limit)` slice of the matched result set
///
/// Windows are created by the batch planner and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchWindow {
    /// Number of matching documents to skip
    pub offset: u64,
    /// Maximum number of documents in this window
    pub limit: u64,
}

impl BatchWindow {
    /// Create a new window
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// Exclusive end of the window in offset space
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.limit)
    }
}

impl fmt::Display for BatchWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.offset, self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_end_and_display() {
        let window = BatchWindow::new(1000, 1000);
        assert_eq!(window.end(), 2000);
        assert_eq!(window.to_string(), "1000 - 2000");
    }
}
