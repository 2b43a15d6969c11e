//! # Page Sessions
//!
//! Asynchronous glue between the synchronous core and the collaborators that
//! decode and rewrite pages. Extraction awaits the page's runs and viewport
//! height and then reconstructs lines without suspending. Saving fires off
//! every page at once and joins them; each page applies its operations to
//! its sink in order, and a failing page never stops its siblings.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::config::{EditConfig, ReconstructionConfig};
use crate::error::RelineError;
use crate::font::FontResolver;
use crate::layout::LineReconstructor;
use crate::model::{EditSet, GlyphRun, Line, PageInput};
use crate::pdf::{EditApplier, EditWarning};
use crate::text::{TextMetrics, WidthEstimator};

/// A decoded page able to hand out its glyph runs.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn runs(&self) -> Result<Vec<GlyphRun>, RelineError>;
    async fn viewport_height(&self) -> Result<f64, RelineError>;
}

/// A page able to accept draw operations.
#[async_trait]
pub trait PageSink: Send {
    /// Commit `ops` in order.
    async fn apply(&mut self, ops: &[crate::model::DrawOp]) -> Result<(), RelineError>;
}

#[async_trait]
impl PageSource for PageInput {
    async fn runs(&self) -> Result<Vec<GlyphRun>, RelineError> {
        Ok(self.runs.clone())
    }

    async fn viewport_height(&self) -> Result<f64, RelineError> {
        Ok(self.viewport_height)
    }
}

/// Reconstruct the lines of one page.
pub async fn extract_lines<S, M>(
    source: &S,
    estimator: &WidthEstimator<M>,
    config: &ReconstructionConfig,
) -> Result<Vec<Line>, RelineError>
where
    S: PageSource + ?Sized,
    M: TextMetrics,
{
    let runs = source.runs().await?;
    let viewport_height = source.viewport_height().await?;
    let lines = LineReconstructor::with_config(estimator, config.clone())
        .reconstruct(&runs, viewport_height);
    debug!(runs = runs.len(), lines = lines.len(), "extracted lines");
    Ok(lines)
}

/// One page's share of a save.
pub struct PageJob<K> {
    pub page_index: usize,
    pub page_height: f64,
    pub edits: EditSet,
    pub sink: K,
}

/// Result of saving one page successfully.
#[derive(Debug)]
pub struct PageOutcome<K> {
    pub page_index: usize,
    pub ops_applied: usize,
    pub warnings: Vec<EditWarning>,
    pub sink: K,
}

/// Everything a save produced, in page order.
#[derive(Debug)]
pub struct SaveReport<K> {
    pub pages: Vec<PageOutcome<K>>,
    pub failures: Vec<(usize, RelineError)>,
}

impl<K> SaveReport<K> {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn warning_count(&self) -> usize {
        self.pages.iter().map(|p| p.warnings.len()).sum()
    }
}

/// Apply every page's edits concurrently.
pub async fn save_document<K, R>(
    jobs: Vec<PageJob<K>>,
    fonts: &R,
    config: &EditConfig,
) -> SaveReport<K>
where
    K: PageSink,
    R: FontResolver + Sync,
{
    save_document_with_progress(jobs, fonts, config, |_, _| {}).await
}

/// Like [`save_document`], calling `progress(pages_done, total)` as each page
/// finishes, whether it succeeded or not.
pub async fn save_document_with_progress<K, R, P>(
    jobs: Vec<PageJob<K>>,
    fonts: &R,
    config: &EditConfig,
    progress: P,
) -> SaveReport<K>
where
    K: PageSink,
    R: FontResolver + Sync,
    P: Fn(usize, usize) + Sync,
{
    let total = jobs.len();
    let done = AtomicUsize::new(0);
    let applier = EditApplier::with_config(fonts, config.clone());

    let results = join_all(jobs.into_iter().map(|job| {
        let applier = &applier;
        let done = &done;
        let progress = &progress;
        async move {
            let page_index = job.page_index;
            let result = save_page(applier, job).await;
            let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
            progress(finished, total);
            (page_index, result)
        }
    }))
    .await;

    let mut report = SaveReport {
        pages: Vec::new(),
        failures: Vec::new(),
    };
    for (page_index, result) in results {
        match result {
            Ok(outcome) => report.pages.push(outcome),
            Err(error) => {
                warn!(page_index, %error, "page failed to save");
                report.failures.push((page_index, error));
            }
        }
    }

    info!(
        pages = report.pages.len(),
        failed = report.failures.len(),
        warnings = report.warning_count(),
        "save finished"
    );
    report
}

async fn save_page<K, R>(
    applier: &EditApplier<'_, R>,
    job: PageJob<K>,
) -> Result<PageOutcome<K>, RelineError>
where
    K: PageSink,
    R: FontResolver,
{
    let PageJob {
        page_index,
        page_height,
        edits,
        mut sink,
    } = job;

    let applied = applier.apply(page_height, &edits);
    sink.apply(&applied.ops)
        .await
        .map_err(|e| match e {
            RelineError::Page { .. } => e,
            other => RelineError::Page {
                page_index,
                reason: other.to_string(),
            },
        })?;

    Ok(PageOutcome {
        page_index,
        ops_applied: applied.ops.len(),
        warnings: applied.warnings,
        sink,
    })
}
