//! # Text Width Estimation
//!
//! Width of a string is needed before any line can be reconstructed, and no
//! ground truth is available at that point. Three sources are tried in order:
//!
//! 1. the width declared by the source document, used verbatim;
//! 2. the host measurement facility ([`TextMetrics`]), measuring with the
//!    substitute font and inflated by a 3% safety buffer;
//! 3. a character-class heuristic, inflated by 5%.
//!
//! Results of tiers 2 and 3 are cached in a [`WidthCache`] owned by the caller.
//! Every tier errs on the wide side: a width that is too small lets the
//! white-out rectangle miss the edges of the original glyphs.

pub mod cache;

use std::sync::Arc;

use tracing::debug;

use crate::config::EstimatorConfig;
use crate::error::RelineError;
use crate::font::{map_font, FontCategory};

pub use cache::{CacheKey, CacheStats, WidthCache};

/// A host facility able to measure rendered text.
pub trait TextMetrics {
    /// Width in pixels of `text` at `font_size` in `family`.
    ///
    /// Fails with [`RelineError::MeasurementUnavailable`] when the facility
    /// cannot measure, which sends the estimator to its heuristic tier.
    fn measure(&self, text: &str, font_size: f64, family: &str) -> Result<f64, RelineError>;
}

impl<T: TextMetrics + ?Sized> TextMetrics for &T {
    fn measure(&self, text: &str, font_size: f64, family: &str) -> Result<f64, RelineError> {
        (**self).measure(text, font_size, family)
    }
}

impl<T: TextMetrics + ?Sized> TextMetrics for Arc<T> {
    fn measure(&self, text: &str, font_size: f64, family: &str) -> Result<f64, RelineError> {
        (**self).measure(text, font_size, family)
    }
}

/// A host without any measurement facility.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTextMetrics;

impl TextMetrics for NoTextMetrics {
    fn measure(&self, _text: &str, _font_size: f64, _family: &str) -> Result<f64, RelineError> {
        Err(RelineError::MeasurementUnavailable(
            "no text metrics facility".to_string(),
        ))
    }
}

/// Relative advance of a character compared to an average glyph.
pub fn char_weight(ch: char) -> f64 {
    match ch {
        'W' | 'M' | 'w' | 'm' | '@' | '%' => 1.3,
        'i' | 'I' | 'l' | 'j' | '1' | '!' | '|' | '.' | '\'' | ',' | ';' | ':' => 0.4,
        'f' | 'r' | 't' => 0.6,
        _ => 1.0,
    }
}

/// Character-class width heuristic, before any safety buffer.
pub fn heuristic_width(text: &str, font_size: f64, family: &str) -> f64 {
    let ratio = FontCategory::of(family).base_width_ratio();
    let weight: f64 = text.chars().map(char_weight).sum();
    weight * ratio * font_size
}

/// Estimates rendered text width through the three-tier fallback.
pub struct WidthEstimator<M> {
    metrics: M,
    cache: Arc<WidthCache>,
    config: EstimatorConfig,
}

impl<M: TextMetrics> WidthEstimator<M> {
    pub fn new(metrics: M, cache: Arc<WidthCache>) -> Self {
        Self::with_config(metrics, cache, EstimatorConfig::default())
    }

    pub fn with_config(metrics: M, cache: Arc<WidthCache>, config: EstimatorConfig) -> Self {
        Self {
            metrics,
            cache,
            config,
        }
    }

    /// Estimate the width of `text` in pixels.
    ///
    /// A positive `declared_width` is returned unchanged and never cached.
    pub fn estimate_width(
        &self,
        text: &str,
        font_size: f64,
        family: &str,
        declared_width: Option<f64>,
    ) -> f64 {
        if let Some(width) = declared_width.filter(|w| *w > 0.0) {
            return width;
        }

        let key = CacheKey::new(text, font_size, family);
        if let Some(width) = self.cache.get(&key) {
            return width;
        }

        let substitute = map_font(family);
        let width = match self.metrics.measure(text, font_size, substitute.id()) {
            Ok(raw) => raw * self.config.measured_safety,
            Err(e) => {
                debug!(error = %e, family, "falling back to character estimate");
                heuristic_width(text, font_size, family) * self.config.estimated_safety
            }
        };

        self.cache.insert(key, width);
        width
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn metrics(&self) -> &M {
        &self.metrics
    }
}
