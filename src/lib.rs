//! # Reline
//!
//! Line reconstruction and non-destructive text replacement for PDF pages.
//!
//! A page's content stream does not know about lines. It knows about glyph
//! runs: short strings placed at a baseline origin with a transform, in
//! whatever order the producing application happened to emit them. Reline
//! groups those runs back into the lines a reader sees, estimates how wide
//! each line really is, and turns edits to those lines into draw operations
//! that paint over the original glyphs and draw the replacement on top.
//!
//! Nothing is ever removed from the original content stream. An edit is a
//! white rectangle plus new text, so the geometry has to err on the wide
//! side: a rectangle that is too narrow leaves the edges of the old glyphs
//! showing through.
//!
//! ## Architecture
//!
//! ```text
//! PageSource (runs, viewport height)
//!       ↓
//!   [text]     : Width estimation: declared → measured → heuristic
//!       ↓
//!   [layout]   : Place runs in screen space, merge into lines
//!       ↓
//!   [model]    : Lines, edits keyed by line id
//!       ↓
//!   [pdf]      : Cover + redraw operations, content-stream output
//!       ↓
//! PageSink
//! ```
//!
//! [`font`] maps arbitrary source font names onto a small set of substitute
//! families and resolves the font each replacement is drawn with.
//! [`session`] runs extraction and multi-page saves asynchronously.

pub mod config;
pub mod error;
pub mod font;
pub mod geometry;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod session;
pub mod text;

use std::sync::Arc;

pub use config::Config;
pub use error::RelineError;
pub use font::{map_font, FontContext, SubstituteFont};
pub use geometry::Bounds;
pub use layout::LineReconstructor;
pub use model::{DrawOp, Edit, EditSet, GlyphRun, Line, PageInput};
pub use pdf::{AppliedEdits, ContentStreamSink, EditApplier};
pub use session::{PageSink, PageSource};
pub use text::{TextMetrics, WidthCache, WidthEstimator};

/// Reconstruct the lines of a page using the built-in font metrics.
pub fn reconstruct_page(page: &PageInput, config: &Config, fonts: &FontContext) -> Vec<Line> {
    let cache = Arc::new(WidthCache::new(config.estimator.cache_capacity));
    let estimator = WidthEstimator::with_config(fonts, cache, config.estimator.clone());
    LineReconstructor::with_config(&estimator, config.reconstruction.clone())
        .reconstruct(&page.runs, page.viewport_height)
}

/// Reconstruct the lines of a page described as JSON.
pub fn reconstruct_json(json: &str, config: &Config) -> Result<Vec<Line>, RelineError> {
    let page: PageInput = serde_json::from_str(json)?;
    let mut fonts = FontContext::new();
    fonts.register_entries(&config.fonts)?;
    Ok(reconstruct_page(&page, config, &fonts))
}
