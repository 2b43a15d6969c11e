//! Integration tests for the Reline pipeline.
//!
//! These tests exercise the full path from page input to draw operations.
//! They verify:
//! - Runs are merged into lines at the right thresholds
//! - Every visible, unrotated run lands in exactly one line
//! - Edits produce cover and redraw operations in page space
//! - Multi-page saves survive failing pages

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reline::config::{Config, EditConfig, ReconstructionConfig};
use reline::font::FontContext;
use reline::geometry::Bounds;
use reline::layout::{merge_runs, LineReconstructor};
use reline::model::*;
use reline::pdf::{ContentStreamSink, EditApplier};
use reline::session::{extract_lines, save_document, PageJob, PageSink};
use reline::text::{NoTextMetrics, WidthCache, WidthEstimator};
use reline::RelineError;

// ─── Helpers ────────────────────────────────────────────────────

fn make_placed(index: usize, x: f64, y: f64, width: f64, padding_px: f64) -> PlacedRun {
    PlacedRun {
        index,
        x,
        y,
        width,
        height: 12.0,
        padding_px,
        font_size: 10.0,
        rotation_degrees: 0.0,
        run: GlyphRun::new(&format!("r{}", index), x, 0.0, 10.0, "Helvetica"),
    }
}

fn make_rotated(text: &str, x: f64, y: f64, font_size: f64, degrees: f64) -> GlyphRun {
    let rad = degrees.to_radians();
    let mut run = GlyphRun::new(text, x, y, font_size, "Helvetica");
    run.scale_x = font_size * rad.cos();
    run.skew_y = font_size * rad.sin();
    run
}

fn make_estimator() -> WidthEstimator<FontContext> {
    WidthEstimator::new(FontContext::new(), Arc::new(WidthCache::default()))
}

/// Deterministic pseudo-random sequence in [0, 1).
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

fn make_page(seed: u64, count: usize) -> PageInput {
    let mut rng = Lcg(seed);
    let runs = (0..count)
        .map(|i| {
            let x = (rng.next() * 500.0).round();
            let y = 700.0 - (rng.next() * 20.0).floor() * 14.0;
            let size = 8.0 + (rng.next() * 6.0).round();
            let text = if rng.next() < 0.1 {
                "  ".to_string()
            } else {
                format!("w{}", i)
            };
            if rng.next() < 0.15 {
                make_rotated(&text, x, y, size, 30.0 + rng.next() * 60.0)
            } else {
                GlyphRun::new(&text, x, y, size, "Times-Roman")
            }
        })
        .collect();
    PageInput {
        viewport_height: 792.0,
        runs,
    }
}

struct FailingSink;

#[async_trait]
impl PageSink for FailingSink {
    async fn apply(&mut self, _ops: &[DrawOp]) -> Result<(), RelineError> {
        Err(RelineError::Page {
            page_index: 1,
            reason: "page object is locked".to_string(),
        })
    }
}

enum TestSink {
    Stream(ContentStreamSink),
    Failing(FailingSink),
}

#[async_trait]
impl PageSink for TestSink {
    async fn apply(&mut self, ops: &[DrawOp]) -> Result<(), RelineError> {
        match self {
            TestSink::Stream(s) => s.apply(ops).await,
            TestSink::Failing(s) => s.apply(ops).await,
        }
    }
}

// ─── Reconstruction ─────────────────────────────────────────────

#[test]
fn test_adjacent_runs_merge_then_gap_splits() {
    let config = ReconstructionConfig::default();
    let lines = merge_runs(
        vec![
            make_placed(0, 0.0, 100.0, 20.0, 1.0),
            make_placed(1, 21.0, 100.0, 15.0, 1.0),
            make_placed(2, 60.0, 100.0, 10.0, 1.0),
        ],
        &config,
    );
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].member_runs.len(), 2);
    assert_eq!(lines[0].id, "text-0");
    assert_eq!(lines[1].id, "text-2");
    assert!((lines[0].width - 36.0).abs() < 1e-9);
}

#[test]
fn test_space_inserted_at_exact_threshold() {
    let config = ReconstructionConfig::default();
    // De-padded gap: 21.5 - (20 - 1) = 2.5 = 10 * 0.25
    let lines = merge_runs(
        vec![
            make_placed(0, 0.0, 50.0, 20.0, 1.0),
            make_placed(1, 21.5, 50.0, 10.0, 1.0),
        ],
        &config,
    );
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].text, "r0 r1");
}

#[test]
fn test_every_visible_run_in_exactly_one_line() {
    let estimator = make_estimator();
    let reconstructor = LineReconstructor::new(&estimator);

    for seed in 1..=20u64 {
        let page = make_page(seed, 60);
        let lines = reconstructor.reconstruct(&page.runs, page.viewport_height);

        let expected: Vec<usize> = page
            .runs
            .iter()
            .filter(|r| !r.text.trim().is_empty())
            .enumerate()
            .filter(|(_, r)| !r.is_rotated(5.0))
            .map(|(i, _)| i)
            .collect();

        let mut seen: HashMap<usize, usize> = HashMap::new();
        for line in &lines {
            for member in &line.member_runs {
                *seen.entry(member.index).or_default() += 1;
            }
        }
        let mut got: Vec<usize> = seen.keys().copied().collect();
        got.sort();
        assert_eq!(got, expected, "seed {}", seed);
        assert!(seen.values().all(|n| *n == 1), "seed {}", seed);
    }
}

#[test]
fn test_rotated_runs_never_appear() {
    let estimator = make_estimator();
    let runs = vec![
        GlyphRun::new("Upright", 10.0, 500.0, 12.0, "Helvetica"),
        make_rotated("Sideways", 60.0, 500.0, 12.0, 90.0),
        make_rotated("Tilted", 10.0, 400.0, 12.0, 5.5),
        make_rotated("Nearly", 10.0, 300.0, 12.0, 4.5),
    ];
    let lines = LineReconstructor::new(&estimator).reconstruct(&runs, 792.0);
    let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["Upright", "Nearly"]);
    assert_eq!(lines[1].id, "text-3");
}

#[test]
fn test_declared_width_drives_line_width() {
    let estimator = WidthEstimator::new(NoTextMetrics, Arc::new(WidthCache::default()));
    let mut run = GlyphRun::new("Total", 72.0, 700.0, 12.0, "ABCDEF+Arial-BoldMT");
    run.declared_width = Some(400.0);
    let lines = LineReconstructor::new(&estimator).reconstruct(&[run], 792.0);
    // padding = max(10, 400 * 0.03) = 12
    assert!((lines[0].width - 412.0).abs() < 1e-9);
    assert!((lines[0].padding_px - 12.0).abs() < 1e-9);
    assert!((lines[0].y - (792.0 - 700.0 - 14.4)).abs() < 1e-9);
}

#[test]
fn test_reconstruct_json_with_config() {
    let json = r#"{
        "viewportHeight": 200,
        "runs": [
            { "text": "Hello", "originX": 10, "originY": 150, "scaleX": 10, "declaredWidth": 30 },
            { "text": "world", "originX": 45, "originY": 150, "scaleX": 10, "declaredWidth": 30 }
        ]
    }"#;
    let lines = reline::reconstruct_json(json, &Config::default()).unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].text, "Hello world");
    assert_eq!(lines[0].font_name, "Helvetica");

    let tight = Config::from_json(r#"{ "reconstruction": { "adjacencyRatio": 0.1 } }"#).unwrap();
    let lines = reline::reconstruct_json(json, &tight).unwrap();
    assert_eq!(lines.len(), 1);

    let far = r#"{
        "viewportHeight": 200,
        "runs": [
            { "text": "Hello", "originX": 10, "originY": 150, "scaleX": 10, "declaredWidth": 30 },
            { "text": "world", "originX": 60, "originY": 150, "scaleX": 10, "declaredWidth": 30 }
        ]
    }"#;
    assert_eq!(reline::reconstruct_json(far, &Config::default()).unwrap().len(), 1);
    assert_eq!(reline::reconstruct_json(far, &tight).unwrap().len(), 2);
}

#[test]
fn test_malformed_page_json_is_parse_error() {
    let err = reline::reconstruct_json("{ \"runs\": [", &Config::default()).unwrap_err();
    assert!(matches!(err, RelineError::Parse { .. }));
}

// ─── Edits ──────────────────────────────────────────────────────

#[test]
fn test_edit_cover_and_text_geometry() {
    let fonts = FontContext::new();
    let mut edits = EditSet::new();
    edits.insert(
        "text-0",
        Edit {
            bounds: Bounds::new(10.0, 10.0, 50.0, 12.0),
            new_text: "Replaced".to_string(),
            font_size: 10.0,
            font_name: "Helvetica-Bold".to_string(),
        },
    );
    let applier = EditApplier::new(&fonts);
    let cover = applier.cover_bounds(edits.get("text-0").unwrap());
    assert_eq!(cover, Bounds::new(8.0, 8.0, 54.0, 16.0));

    let applied = applier.apply(792.0, &edits);
    assert_eq!(applied.ops[0].bounds(), Bounds::new(8.0, 792.0 - 8.0 - 16.0, 54.0, 16.0));
    match &applied.ops[1] {
        DrawOp::DrawText { text, font_name, .. } => {
            assert_eq!(text, "Replaced");
            assert_eq!(font_name, "Arial-Bold");
        }
        other => panic!("expected DrawText, got {:?}", other),
    }
}

#[test]
fn test_unencodable_text_warns_but_covers() {
    let fonts = FontContext::new();
    let mut edits = EditSet::new();
    edits.insert(
        "text-3",
        Edit {
            bounds: Bounds::new(0.0, 0.0, 40.0, 12.0),
            new_text: "日本語".to_string(),
            font_size: 10.0,
            font_name: "Arial".to_string(),
        },
    );
    let applied = EditApplier::new(&fonts).apply(100.0, &edits);
    assert_eq!(applied.ops.len(), 1);
    assert!(matches!(applied.ops[0], DrawOp::CoverRect { .. }));
    assert_eq!(applied.warnings.len(), 1);
    assert_eq!(applied.warnings[0].line_id, "text-3");
}

#[test]
fn test_edits_json_replaces_in_place() {
    let json = r#"[
        { "lineId": "text-0", "bounds": { "x": 0, "y": 0, "width": 10, "height": 10 },
          "newText": "a", "fontSize": 10, "fontName": "Arial" },
        { "lineId": "text-4", "bounds": { "x": 0, "y": 20, "width": 10, "height": 10 },
          "newText": "b", "fontSize": 10, "fontName": "Arial" },
        { "lineId": "text-0", "bounds": { "x": 0, "y": 0, "width": 10, "height": 10 },
          "newText": "c", "fontSize": 10, "fontName": "Arial" }
    ]"#;
    let edits: EditSet = serde_json::from_str(json).unwrap();
    let order: Vec<(&str, &str)> = edits
        .iter()
        .map(|(id, e)| (id, e.new_text.as_str()))
        .collect();
    assert_eq!(order, vec![("text-0", "c"), ("text-4", "b")]);
}

// ─── End to end ─────────────────────────────────────────────────

#[tokio::test]
async fn test_extract_edit_and_write_stream() {
    let page = PageInput {
        viewport_height: 792.0,
        runs: vec![
            GlyphRun::new("Invoice", 72.0, 720.0, 18.0, "Helvetica-Bold"),
            GlyphRun::new("Due:", 72.0, 690.0, 10.0, "Times-Roman"),
            GlyphRun::new("March 1", 100.0, 690.0, 10.0, "Times-Roman"),
        ],
    };
    let fonts = Arc::new(FontContext::new());
    let estimator = WidthEstimator::new(Arc::clone(&fonts), Arc::new(WidthCache::default()));
    let lines = extract_lines(&page, &estimator, &ReconstructionConfig::default())
        .await
        .unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1].text, "Due: March 1");

    let mut edits = EditSet::new();
    edits.insert(&lines[1].id, lines[1].edit("Due: April 1"));

    let job = PageJob {
        page_index: 0,
        page_height: page.viewport_height,
        edits,
        sink: ContentStreamSink::new(Arc::clone(&fonts)),
    };
    let report = save_document(vec![job], fonts.as_ref(), &EditConfig::default()).await;
    assert!(report.is_complete());

    let content = report.pages[0].sink.content();
    assert!(content.contains(" re\nf\n"));
    assert!(content.contains("(Due: April 1) Tj"));
    assert_eq!(
        report.pages[0].sink.font_resources()[0].1,
        reline::SubstituteFont::TimesRoman
    );
}

#[tokio::test]
async fn test_failed_page_does_not_block_siblings() {
    let fonts = Arc::new(FontContext::new());
    let mut edits = EditSet::new();
    edits.insert(
        "text-0",
        Edit {
            bounds: Bounds::new(10.0, 10.0, 50.0, 12.0),
            new_text: "x".to_string(),
            font_size: 10.0,
            font_name: "Courier".to_string(),
        },
    );
    let jobs: Vec<PageJob<TestSink>> = (0..3)
        .map(|i| PageJob {
            page_index: i,
            page_height: 792.0,
            edits: edits.clone(),
            sink: if i == 1 {
                TestSink::Failing(FailingSink)
            } else {
                TestSink::Stream(ContentStreamSink::new(Arc::clone(&fonts)))
            },
        })
        .collect();

    let report = save_document(jobs, fonts.as_ref(), &EditConfig::default()).await;
    assert!(!report.is_complete());
    let saved: Vec<usize> = report.pages.iter().map(|p| p.page_index).collect();
    assert_eq!(saved, vec![0, 2]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, 1);
    assert!(matches!(report.failures[0].1, RelineError::Page { page_index: 1, .. }));
}
