//! Progress reporting and cooperative cancellation.
//!
//! A run emits discrete [`ProgressEvent`]s on a fixed, monotonic schedule:
//! 0% when the model loads, 5% when the PDF opens, a per-page band from 10%
//! to 95% split evenly across the selected pages (with four sub-steps per
//! page), 95% when the output is written and 100% on completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One progress notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// Human-readable stage name.
    pub stage: String,
    /// One-based page currently being processed; 0 outside the page loop.
    pub current_page: usize,
    /// Number of pages selected for this run (not the document total).
    pub total_pages: usize,
    /// Overall completion in `[0, 100]`, non-decreasing within a run.
    pub percent: f32,
}

/// Callback invoked for every progress event of a run.
pub type ProgressCallback = dyn Fn(ProgressEvent) + Send + Sync;

/// The four per-page sub-steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStage {
    /// Rasterizing the page.
    Rasterize,
    /// Running layout detection.
    DetectLayout,
    /// Extracting and matching text.
    ExtractText,
    /// Translating the matched regions.
    Translate,
}

impl PageStage {
    /// Stage label used in progress events.
    pub fn label(self) -> &'static str {
        match self {
            PageStage::Rasterize => "rendering page",
            PageStage::DetectLayout => "detecting layout",
            PageStage::ExtractText => "extracting text",
            PageStage::Translate => "translating",
        }
    }

    fn fraction(self) -> f32 {
        match self {
            PageStage::Rasterize => 0.0,
            PageStage::DetectLayout => 0.2,
            PageStage::ExtractText => 0.4,
            PageStage::Translate => 0.6,
        }
    }
}

/// Percent for sub-step `stage` of page `index` (zero-based) out of `total`
/// selected pages. The page band spans 10..95.
pub fn page_percent(index: usize, total: usize, stage: PageStage) -> f32 {
    let per_page = 85.0 / total as f32;
    10.0 + index as f32 * per_page + per_page * stage.fraction()
}

/// Shared abort flag, polled at coarse checkpoints.
///
/// Setting the flag does not preempt in-flight work; the run aborts at the
/// next checkpoint (start of a page, or just before the write stage), so the
/// worst-case latency is one page of work plus one in-flight translation.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of the run holding this flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_is_monotonic() {
        let total = 3;
        let mut last = 5.0;
        for page in 0..total {
            for stage in [
                PageStage::Rasterize,
                PageStage::DetectLayout,
                PageStage::ExtractText,
                PageStage::Translate,
            ] {
                let pct = page_percent(page, total, stage);
                assert!(pct > last, "percent went backwards at page {page}");
                last = pct;
            }
        }
        assert!(last < 95.0);
    }

    #[test]
    fn single_page_band_starts_at_ten() {
        assert_eq!(page_percent(0, 1, PageStage::Rasterize), 10.0);
        assert_eq!(page_percent(0, 1, PageStage::Translate), 10.0 + 85.0 * 0.6);
    }

    #[test]
    fn cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());
        flag.cancel();
        assert!(clone.is_cancelled());
    }
}
