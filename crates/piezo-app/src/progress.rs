//! Inference of page progress from the engine's free-text log output.
//!
//! The engine exposes no structured progress API; the only signal is its
//! human-readable page log. Two line shapes are recognized, everything else
//! is ignored (callers may still surface unrecognized lines verbatim as
//! diagnostics).

use std::sync::LazyLock;

use regex::Regex;

static PAGE_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)processing pages (\d+) through (\d+)").unwrap());

static SINGLE_PAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^page\s+(\d+)$").unwrap());

/// Point-in-time view of one job's page progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub percent: u8,
    pub current_page: u32,
    pub total_pages: Option<u32>,
}

/// Line-oriented parser maintaining `(current_page, total_pages)` for a
/// single in-flight job.
///
/// One tracker exists per job and is dropped with it; trackers are never
/// shared or reused across jobs. `current_page` is non-decreasing and
/// `total_pages`, once observed, never decreases.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    current_page: u32,
    total_pages: Option<u32>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of engine log output. Chunks may span multiple lines;
    /// each line is interpreted independently. Returns one snapshot per
    /// line that advanced the progress state.
    pub fn observe(&mut self, chunk: &str) -> Vec<ProgressSnapshot> {
        chunk
            .lines()
            .filter_map(|line| self.observe_line(line))
            .collect()
    }

    /// Interpret a single log line; `None` when it does not advance
    /// progress.
    pub fn observe_line(&mut self, line: &str) -> Option<ProgressSnapshot> {
        let line = line.trim();

        if let Some(caps) = PAGE_RANGE.captures(line) {
            let start: u32 = caps[1].parse().ok()?;
            let end: u32 = caps[2].parse().ok()?;
            if end < start {
                return None;
            }
            let span = end - start + 1;
            // A revised total may only grow; an earlier observation stays
            // authoritative otherwise.
            self.total_pages = Some(self.total_pages.map_or(span, |t| t.max(span)));
            return Some(self.snapshot());
        }

        if let Some(caps) = SINGLE_PAGE.captures(line) {
            let page: u32 = caps[1].parse().ok()?;
            if page <= self.current_page {
                return None;
            }
            self.current_page = page;
            if self.total_pages.is_none() && page == 1 {
                // Provisional single-page estimate until a range line shows up.
                self.total_pages = Some(1);
            }
            return Some(self.snapshot());
        }

        None
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            percent: self.percent(),
            current_page: self.current_page,
            total_pages: self.total_pages,
        }
    }

    /// Bounded percentage. An unknown total always reports 0 (callers may
    /// still render the raw page number); a known total caps at 99 so that
    /// 100 is only ever emitted for confirmed completion, never inferred
    /// from log text.
    ///
    /// Not monotonic by construction: a range line revising the total
    /// upward can lower the percentage. Display-side smoothing is the
    /// caller's concern.
    pub fn percent(&self) -> u8 {
        match self.total_pages {
            None => 0,
            Some(total) => {
                let raw = (f64::from(self.current_page) / f64::from(total) * 100.0).floor();
                raw.clamp(0.0, 99.0) as u8
            }
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_line_establishes_the_total() {
        let mut tracker = ProgressTracker::new();
        let snapshot = tracker
            .observe_line("Processing pages 3 through 12.")
            .expect("range recognized");
        assert_eq!(snapshot.total_pages, Some(10));
        assert_eq!(snapshot.current_page, 0);
        assert_eq!(snapshot.percent, 0);

        let snapshot = tracker.observe_line("Page 5").expect("page recognized");
        assert_eq!(snapshot.current_page, 5);
        assert_eq!(snapshot.total_pages, Some(10));
        assert_eq!(snapshot.percent, 50);
    }

    #[test]
    fn lone_first_page_becomes_a_provisional_single_page_total() {
        let mut tracker = ProgressTracker::new();
        let snapshot = tracker.observe_line("Page 1").expect("page recognized");
        assert_eq!(snapshot.total_pages, Some(1));
        assert_eq!(snapshot.current_page, 1);
        // Raw 1/1 would be 100; the cap keeps 100 reserved for completion.
        assert_eq!(snapshot.percent, 99);
    }

    #[test]
    fn pages_without_a_total_report_zero_percent() {
        let mut tracker = ProgressTracker::new();
        let snapshot = tracker.observe_line("Page 7").expect("page recognized");
        assert_eq!(snapshot.total_pages, None);
        assert_eq!(snapshot.current_page, 7);
        assert_eq!(snapshot.percent, 0);
    }

    #[test]
    fn current_page_never_moves_backwards() {
        let mut tracker = ProgressTracker::new();
        tracker.observe_line("Processing pages 1 through 9.");
        tracker.observe_line("Page 5");
        assert!(tracker.observe_line("Page 4").is_none());
        assert!(tracker.observe_line("Page 5").is_none());
        assert_eq!(tracker.current_page(), 5);
    }

    #[test]
    fn total_never_shrinks_once_observed() {
        let mut tracker = ProgressTracker::new();
        tracker.observe_line("Processing pages 1 through 10.");
        tracker.observe_line("Processing pages 1 through 4.");
        assert_eq!(tracker.total_pages(), Some(10));
    }

    #[test]
    fn revised_total_may_lower_the_percentage() {
        // Intentional non-monotonicity: the provisional single-page estimate
        // is superseded by the authoritative range line.
        let mut tracker = ProgressTracker::new();
        let first = tracker.observe_line("Page 1").expect("page recognized");
        assert_eq!(first.percent, 99);
        let revised = tracker
            .observe_line("Processing pages 1 through 3.")
            .expect("range recognized");
        assert_eq!(revised.total_pages, Some(3));
        assert_eq!(revised.percent, 33);
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let mut tracker = ProgressTracker::new();
        assert!(tracker.observe_line("Processing pages 9 through 2.").is_none());
        assert_eq!(tracker.total_pages(), None);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let mut tracker = ProgressTracker::new();
        assert!(tracker.observe_line("PROCESSING PAGES 1 THROUGH 4.").is_some());
        assert!(tracker.observe_line("PAGE 2").is_some());
        assert_eq!(tracker.current_page(), 2);
        assert_eq!(tracker.total_pages(), Some(4));
    }

    #[test]
    fn page_must_be_the_whole_line() {
        let mut tracker = ProgressTracker::new();
        assert!(tracker.observe_line("Page 3 had a rendering warning").is_none());
        assert!(tracker.observe_line("Loading font on Page 3").is_none());
        assert_eq!(tracker.current_page(), 0);
    }

    #[test]
    fn unrecognized_lines_are_ignored() {
        let mut tracker = ProgressTracker::new();
        assert!(tracker.observe_line("GPL Ghostscript 10.02.1").is_none());
        assert!(tracker.observe_line("").is_none());
        assert!(tracker.observe_line("Copying font Helvetica").is_none());
    }

    #[test]
    fn multi_line_chunks_are_split_and_processed_in_order() {
        let mut tracker = ProgressTracker::new();
        let snapshots =
            tracker.observe("Processing pages 1 through 2.\nPage 1\nnoise\nPage 2\n");
        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[0].total_pages, Some(2));
        assert_eq!(snapshots[1].percent, 50);
        assert_eq!(snapshots[2].percent, 99);
        assert_eq!(snapshots[2].current_page, 2);
    }

    #[test]
    fn single_page_document_caps_below_one_hundred() {
        let mut tracker = ProgressTracker::new();
        tracker.observe_line("Processing pages 1 through 1.");
        let snapshot = tracker.observe_line("Page 1").expect("page recognized");
        assert_eq!(snapshot.percent, 99);
    }
}
