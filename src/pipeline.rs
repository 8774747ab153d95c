//! The end-to-end translation pipeline.
//!
//! One run sequences, per selected page: rasterize, detect layout, extract
//! text, match regions, translate; then rewrites the whole document once.
//! Pages are processed strictly sequentially; the only concurrency lives
//! inside the LLM translator's batch. The orchestrator is expected to run
//! off the UI thread; progress events are safe to consume elsewhere.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, info};

use crate::core::errors::{Result, TranslateError};
use crate::core::progress::{page_percent, CancelFlag, PageStage, ProgressEvent};
use crate::core::settings::AppSettings;
use crate::layout::LayoutDetector;
use crate::pdf::raster::{bind_pdfium, rasterize};
use crate::pdf::text::extract_blocks;
use crate::pdf::writer::write_translated_pdf;
use crate::region::{match_regions, PageRegions, TranslatedRegion};
use crate::translator::{Translator, TranslatorUsage};

/// File assets a run depends on.
#[derive(Debug, Clone)]
pub struct PipelineAssets {
    /// DocLayout-YOLO ONNX export.
    pub model_path: PathBuf,
    /// TTF covering the target language's script; required.
    pub regular_font: PathBuf,
    /// Optional bold TTF used for titles.
    pub bold_font: Option<PathBuf>,
}

/// Everything needed to translate one document.
#[derive(Debug, Clone)]
pub struct TranslateRequest {
    /// Source PDF.
    pub input_path: PathBuf,
    /// Destination path for the translated PDF.
    pub output_path: PathBuf,
    /// User settings (translator choice, target language, LLM options).
    pub settings: AppSettings,
    /// Model and font files.
    pub assets: PipelineAssets,
    /// One-based page numbers to translate; empty means all pages. Values
    /// outside the document are silently dropped.
    pub selected_pages: Vec<u32>,
    /// Per-run system-prompt override for the LLM translator.
    pub custom_prompt: Option<String>,
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct TranslateOutcome {
    /// Pages that went through the pipeline.
    pub pages_processed: usize,
    /// Regions that received a translation.
    pub regions_translated: usize,
    /// Token and cost totals across all batches.
    pub usage: TranslatorUsage,
}

/// Translates one PDF end to end.
///
/// The cancel flag is checked before every page and before the write stage;
/// in-flight translation calls are not interrupted. Cancellation surfaces
/// as [`TranslateError::Cancelled`] and leaves no file at the output path.
pub async fn translate_pdf(
    request: &TranslateRequest,
    cancel: &CancelFlag,
    on_progress: &(dyn Fn(ProgressEvent) + Send + Sync),
) -> Result<TranslateOutcome> {
    let started = Instant::now();
    let emit = |stage: &str, current_page: usize, total_pages: usize, percent: f32| {
        on_progress(ProgressEvent {
            stage: stage.to_string(),
            current_page,
            total_pages,
            percent,
        });
    };

    emit("loading layout model", 0, 0, 0.0);
    let detector = LayoutDetector::load(&request.assets.model_path)?;

    emit("loading document", 0, 0, 5.0);
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_file(&request.input_path, None)
        .map_err(|e| TranslateError::ExtractionFailed {
            message: format!("could not open {}: {e}", request.input_path.display()),
        })?;
    let document_pages = document.pages();
    let page_count = document_pages.len() as usize;
    let selected = resolve_page_selection(&request.selected_pages, page_count);
    let total = selected.len();
    info!(
        "Translating {total} of {page_count} pages from {}",
        request.input_path.display()
    );

    let translator = Translator::from_settings(&request.settings, request.custom_prompt.as_deref())?;

    let mut pages = PageRegions::new();
    let mut usage = TranslatorUsage::default();
    let mut regions_translated = 0usize;

    for (position, &page_number) in selected.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(TranslateError::Cancelled);
        }
        let page_started = Instant::now();

        emit(
            PageStage::Rasterize.label(),
            page_number,
            total,
            page_percent(position, total, PageStage::Rasterize),
        );
        let page = document_pages
            .get((page_number - 1) as u16)
            .map_err(|e| TranslateError::RenderFailed {
                page: page_number,
                message: e.to_string(),
            })?;
        let page_height = page.height().value;
        let raster = rasterize(&page, page_number)?;

        emit(
            PageStage::DetectLayout.label(),
            page_number,
            total,
            page_percent(position, total, PageStage::DetectLayout),
        );
        let layout_boxes = detector.detect(&raster)?;

        emit(
            PageStage::ExtractText.label(),
            page_number,
            total,
            page_percent(position, total, PageStage::ExtractText),
        );
        let blocks = extract_blocks(&page)?;
        let regions = match_regions(&layout_boxes, &blocks, page_height, raster.scale);
        // Release the page once matching is done; peak memory stays at one
        // page regardless of document size.
        drop(page);

        emit(
            PageStage::Translate.label(),
            page_number,
            total,
            page_percent(position, total, PageStage::Translate),
        );
        if regions.is_empty() {
            debug!("Page {page_number} has no translatable regions, skipping");
            continue;
        }

        let texts: Vec<String> = regions
            .iter()
            .map(|region| region.full_text.clone())
            .collect();
        let translations = translator
            .translate_batch(&texts, "", &request.settings.target_language)
            .await?;
        usage.add(&translator.usage());
        regions_translated += regions.len();

        let translated: Vec<TranslatedRegion> = regions
            .into_iter()
            .zip(translations)
            .map(|(region, translated_text)| TranslatedRegion {
                region,
                translated_text,
            })
            .collect();
        pages.insert(page_number - 1, translated);
        info!(
            "Page {page_number} done in {:.2}ms",
            page_started.elapsed().as_secs_f64() * 1000.0
        );
    }

    if cancel.is_cancelled() {
        return Err(TranslateError::Cancelled);
    }

    emit("writing output", 0, total, 95.0);
    write_translated_pdf(
        &request.input_path,
        &pages,
        &request.assets.regular_font,
        request.assets.bold_font.as_deref(),
        &request.output_path,
    )?;

    emit("complete", 0, total, 100.0);
    info!(
        "Translated {regions_translated} regions on {total} pages in {:.2}s",
        started.elapsed().as_secs_f64()
    );

    Ok(TranslateOutcome {
        pages_processed: total,
        regions_translated,
        usage,
    })
}

/// Intersects the caller's one-based selection with the document, keeping
/// page order. Empty input selects every page.
fn resolve_page_selection(selected: &[u32], page_count: usize) -> Vec<usize> {
    if selected.is_empty() {
        return (1..=page_count).collect();
    }
    let mut pages: Vec<usize> = selected
        .iter()
        .map(|&page| page as usize)
        .filter(|&page| page >= 1 && page <= page_count)
        .collect();
    pages.sort_unstable();
    pages.dedup();
    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_selection_means_all_pages() {
        assert_eq!(resolve_page_selection(&[], 3), vec![1, 2, 3]);
    }

    #[test]
    fn out_of_range_pages_are_dropped() {
        assert_eq!(resolve_page_selection(&[0, 3, 99], 5), vec![3]);
    }

    #[test]
    fn duplicates_collapse_and_order_is_by_page() {
        assert_eq!(resolve_page_selection(&[4, 2, 4, 1], 5), vec![1, 2, 4]);
    }

    #[test]
    fn selection_on_empty_document_is_empty() {
        assert!(resolve_page_selection(&[1], 0).is_empty());
        assert!(resolve_page_selection(&[], 0).is_empty());
    }
}
