//! # Line Reconstruction
//!
//! A content stream has no notion of words or lines, only positioned runs.
//! This module groups those runs back into editable lines in two steps:
//!
//! ```text
//!   GlyphRun[] ──place──→ PlacedRun[] ──band by y, sort by x──→ merge ──→ Line[]
//!   page space            screen space, padded widths
//! ```
//!
//! Placement discards empty and rotated runs, estimates each run's width and
//! inflates it by a safety padding. Merging walks the runs in reading order
//! and extends the open line while the next run sits on the same baseline
//! band and close enough horizontally; otherwise the line is closed.
//!
//! The reading order is top-to-bottom by same-line band, left-to-right within
//! a band. Multi-column
//! layouts where a lower run in the left column precedes a higher run in the
//! right column are not detected.

use tracing::debug;

use crate::config::ReconstructionConfig;
use crate::geometry::{flip_y, round1};
use crate::model::{GlyphRun, Line, PlacedRun};
use crate::text::{TextMetrics, WidthEstimator};

/// Groups a page's glyph runs into lines.
pub struct LineReconstructor<'a, M> {
    estimator: &'a WidthEstimator<M>,
    config: ReconstructionConfig,
}

impl<'a, M: TextMetrics> LineReconstructor<'a, M> {
    pub fn new(estimator: &'a WidthEstimator<M>) -> Self {
        Self::with_config(estimator, ReconstructionConfig::default())
    }

    pub fn with_config(estimator: &'a WidthEstimator<M>, config: ReconstructionConfig) -> Self {
        Self { estimator, config }
    }

    /// Place runs in screen space, dropping empty and rotated ones.
    ///
    /// Indices (and therefore line ids) count only runs with visible text,
    /// so rotated runs still consume an index.
    pub fn place_runs(&self, runs: &[GlyphRun], viewport_height: f64) -> Vec<PlacedRun> {
        let mut rotated = 0usize;
        let placed: Vec<PlacedRun> = runs
            .iter()
            .filter(|run| !run.text.trim().is_empty())
            .enumerate()
            .filter_map(|(index, run)| {
                if run.is_rotated(self.config.rotation_limit_degrees) {
                    rotated += 1;
                    return None;
                }
                Some(self.place_run(index, run, viewport_height))
            })
            .collect();
        if rotated > 0 {
            debug!(rotated, "skipped rotated runs");
        }
        placed
    }

    fn place_run(&self, index: usize, run: &GlyphRun, viewport_height: f64) -> PlacedRun {
        let font_size = run.font_size();
        let height = run
            .declared_height
            .filter(|h| *h > 0.0)
            .unwrap_or(font_size * self.config.line_height_ratio);
        let estimated = self.estimator.estimate_width(
            &run.text,
            font_size,
            &run.font_name,
            run.usable_declared_width(),
        );
        let padding_px = self
            .config
            .min_padding_px
            .max(estimated * self.config.padding_ratio);

        PlacedRun {
            index,
            x: run.origin_x,
            y: flip_y(viewport_height, run.origin_y, height),
            width: estimated + padding_px,
            height,
            padding_px,
            font_size,
            rotation_degrees: run.rotation_degrees(),
            run: run.clone(),
        }
    }

    /// Reconstruct the lines of one page.
    pub fn reconstruct(&self, runs: &[GlyphRun], viewport_height: f64) -> Vec<Line> {
        let placed = self.place_runs(runs, viewport_height);
        merge_runs(placed, &self.config)
    }
}

/// Sort placed runs into reading order and merge them into lines.
///
/// Lines come back top-to-bottom, left-to-right. Every input run ends up in
/// exactly one line.
pub fn merge_runs(runs: Vec<PlacedRun>, config: &ReconstructionConfig) -> Vec<Line> {
    let mut builder = LineBuilder::new(config);
    for run in reading_order(runs, config) {
        builder.push(run);
    }
    builder.finish()
}

/// Order runs top-to-bottom, then left-to-right within a band.
///
/// Runs whose top edges are within the same-line tolerance of a band's first
/// run share that band, so baseline jitter and mixed font sizes on one
/// baseline still read left to right.
pub fn reading_order(mut runs: Vec<PlacedRun>, config: &ReconstructionConfig) -> Vec<PlacedRun> {
    runs.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

    let mut ordered = Vec::with_capacity(runs.len());
    let mut band: Vec<PlacedRun> = Vec::new();
    let mut band_y = 0.0;
    let mut band_size = 0.0_f64;

    for run in runs {
        if !band.is_empty() {
            let size = band_size.max(run.font_size);
            if (run.y - band_y).abs() >= size * config.same_line_ratio {
                flush_band(&mut band, &mut ordered);
            }
        }
        if band.is_empty() {
            band_y = run.y;
            band_size = run.font_size;
        } else {
            band_size = band_size.max(run.font_size);
        }
        band.push(run);
    }
    flush_band(&mut band, &mut ordered);
    ordered
}

fn flush_band(band: &mut Vec<PlacedRun>, ordered: &mut Vec<PlacedRun>) {
    band.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    ordered.append(band);
}

struct LineBuilder<'c> {
    config: &'c ReconstructionConfig,
    lines: Vec<Line>,
    current: Option<Line>,
}

impl<'c> LineBuilder<'c> {
    fn new(config: &'c ReconstructionConfig) -> Self {
        Self {
            config,
            lines: Vec::new(),
            current: None,
        }
    }

    fn push(&mut self, run: PlacedRun) {
        if let Some(line) = self.current.as_mut() {
            if accepts(self.config, line, &run) {
                merge_into(line, run, self.config);
                return;
            }
        }
        if let Some(done) = self.current.replace(open_line(run)) {
            self.lines.push(done);
        }
    }

    fn finish(mut self) -> Vec<Line> {
        if let Some(done) = self.current.take() {
            self.lines.push(done);
        }
        self.lines
    }
}

/// Same baseline band, and horizontally touching or close enough.
fn accepts(config: &ReconstructionConfig, line: &Line, run: &PlacedRun) -> bool {
    let font_size = line.font_size.max(run.font_size);
    let same_line = (run.y - line.y).abs() < font_size * config.same_line_ratio;
    let gap = run.x - line.bounds().right();
    let adjacent = gap >= -line.padding_px && gap < font_size * config.adjacency_ratio;
    same_line && adjacent
}

fn open_line(run: PlacedRun) -> Line {
    Line {
        id: format!("text-{}", run.index),
        text: run.text().to_string(),
        x: run.x,
        y: run.y,
        width: run.width,
        height: run.height,
        padding_px: run.padding_px,
        font_size: run.font_size,
        font_name: run.font_name().to_string(),
        member_runs: vec![run],
    }
}

fn merge_into(line: &mut Line, run: PlacedRun, config: &ReconstructionConfig) {
    let font_size = line.font_size.max(run.font_size);

    // Measure the gap against the line's true right edge, without padding.
    let true_gap = run.x - (line.x + line.width - line.padding_px);
    if round1(true_gap) >= round1(font_size * config.space_ratio) {
        line.text.push(' ');
    }
    line.text.push_str(run.text());

    let right = line.bounds().right().max(run.x + run.width);
    line.width = right - line.x;
    line.height = line.height.max(run.height);
    line.font_size = font_size;
    line.padding_px = run.padding_px;
    line.member_runs.push(run);
}
