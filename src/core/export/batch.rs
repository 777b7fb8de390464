//! Batch planning
//!
//! The matched result set is split into fixed-size `(offset, limit)` windows
//! that are fetched and appended independently.

use crate::domain::BatchWindow;

/// Documents per batch window
pub const BATCH_SIZE: u64 = 1000;

/// Partitions `total_count` matching documents into batch windows
///
/// Windows start at offset 0 and advance by `batch_size` while
/// `offset <= total_count`. The window starting exactly at `total_count` is
/// included, so a count of 0 still yields one window and a count that went
/// stale between counting and fetching is less likely to lose documents.
///
/// The plan is lazy: windows are produced as the pipeline pulls them, so the
/// size of the count never decides how much memory is allocated up front.
///
/// # Example
///
/// ```
/// use mongo_exporter::core::export::{plan_batches, BATCH_SIZE};
///
/// let offsets: Vec<u64> = plan_batches(2500, BATCH_SIZE).map(|w| w.offset).collect();
/// assert_eq!(offsets, vec![0, 1000, 2000]);
/// ```
pub fn plan_batches(total_count: u64, batch_size: u64) -> BatchPlan {
    BatchPlan {
        next_offset: (batch_size > 0).then_some(0),
        total_count,
        batch_size,
    }
}

/// Iterator over the windows of one export, in offset order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    next_offset: Option<u64>,
    total_count: u64,
    batch_size: u64,
}

impl BatchPlan {
    /// Number of windows not yet produced
    ///
    /// Saturates at `u64::MAX` for a plan of `2^64` one-document windows.
    pub fn window_count(&self) -> u64 {
        match self.next_offset {
            Some(offset) if offset <= self.total_count => {
                ((self.total_count - offset) / self.batch_size).saturating_add(1)
            }
            _ => 0,
        }
    }
}

impl Iterator for BatchPlan {
    type Item = BatchWindow;

    fn next(&mut self) -> Option<BatchWindow> {
        let offset = self.next_offset.filter(|&o| o <= self.total_count)?;
        // An offset past u64::MAX ends the plan
        self.next_offset = offset.checked_add(self.batch_size);
        Some(BatchWindow::new(offset, self.batch_size))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.window_count();
        match usize::try_from(remaining) {
            Ok(n) if remaining < u64::MAX => (n, Some(n)),
            _ => (usize::MAX, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_zero_count_yields_single_window() {
        let windows: Vec<_> = plan_batches(0, BATCH_SIZE).collect();
        assert_eq!(windows, vec![BatchWindow::new(0, 1000)]);
    }

    #[test_case(1, vec![0] ; "below one batch")]
    #[test_case(999, vec![0] ; "just under a batch")]
    #[test_case(1000, vec![0, 1000] ; "exact batch keeps boundary window")]
    #[test_case(1500, vec![0, 1000] ; "partial second batch")]
    #[test_case(2000, vec![0, 1000, 2000] ; "two exact batches")]
    #[test_case(2500, vec![0, 1000, 2000] ; "partial third batch")]
    fn test_window_offsets(total: u64, expected: Vec<u64>) {
        let offsets: Vec<u64> = plan_batches(total, BATCH_SIZE).map(|w| w.offset).collect();
        assert_eq!(offsets, expected);
    }

    #[test]
    fn test_windows_are_contiguous_and_cover_count() {
        for total in [0u64, 1, 999, 1000, 1001, 12_345, 100_000] {
            let windows: Vec<_> = plan_batches(total, BATCH_SIZE).collect();

            assert_eq!(windows[0].offset, 0);
            for pair in windows.windows(2) {
                assert_eq!(pair[0].end(), pair[1].offset);
            }
            let last = windows.last().unwrap();
            assert!(last.offset <= total);
            assert!(last.end() > total);
            assert!(windows.iter().all(|w| w.limit == BATCH_SIZE));
        }
    }

    #[test]
    fn test_custom_batch_size() {
        let windows: Vec<_> = plan_batches(25, 10).collect();
        assert_eq!(
            windows,
            vec![
                BatchWindow::new(0, 10),
                BatchWindow::new(10, 10),
                BatchWindow::new(20, 10),
            ]
        );
    }

    #[test]
    fn test_zero_batch_size_is_empty_plan() {
        let mut plan = plan_batches(100, 0);
        assert_eq!(plan.window_count(), 0);
        assert!(plan.next().is_none());
    }

    #[test]
    fn test_plan_is_deterministic() {
        assert!(plan_batches(7_777, BATCH_SIZE).eq(plan_batches(7_777, BATCH_SIZE)));
    }

    #[test_case(0, 1 ; "empty count")]
    #[test_case(2500, 3 ; "partial last batch")]
    #[test_case(3000, 4 ; "boundary window counted")]
    fn test_window_count_matches_iteration(total: u64, expected: u64) {
        let plan = plan_batches(total, BATCH_SIZE);
        assert_eq!(plan.window_count(), expected);
        assert_eq!(plan.count() as u64, expected);
    }

    #[test]
    fn test_window_count_shrinks_as_windows_are_taken() {
        let mut plan = plan_batches(2500, BATCH_SIZE);
        plan.next();
        assert_eq!(plan.window_count(), 2);
        assert_eq!(plan.size_hint(), (2, Some(2)));
    }

    #[test]
    fn test_huge_counts_do_not_overflow() {
        let plan = plan_batches(u64::MAX, 1);
        assert_eq!(plan.window_count(), u64::MAX);

        let first: Vec<u64> = plan.take(3).map(|w| w.offset).collect();
        assert_eq!(first, vec![0, 1, 2]);

        let plan = plan_batches(i64::MAX as u64, 1);
        assert_eq!(plan.window_count(), i64::MAX as u64 + 1);
    }

    #[test]
    fn test_plan_ends_at_top_of_offset_range() {
        // Last offset is u64::MAX - 1; the next one would overflow
        let mut plan = plan_batches(u64::MAX, u64::MAX / 2);
        let offsets: Vec<u64> = plan.by_ref().map(|w| w.offset).collect();
        assert_eq!(offsets, vec![0, u64::MAX / 2, u64::MAX - 1]);
        assert!(plan.next().is_none());
        assert_eq!(plan.window_count(), 0);
    }
}
