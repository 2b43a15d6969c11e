//! # Configuration
//!
//! Tuning constants for reconstruction, estimation and edit application.
//! Every field has a serde default equal to the empirically chosen value, so
//! an empty JSON object (`{}`) yields exactly [`Config::default`].

use serde::{Deserialize, Serialize};

use crate::error::RelineError;

/// Complete configuration for a reline session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub reconstruction: ReconstructionConfig,
    #[serde(default)]
    pub estimator: EstimatorConfig,
    #[serde(default)]
    pub edits: EditConfig,
    /// Substitute fonts to register before measuring or rendering.
    #[serde(default)]
    pub fonts: Vec<FontEntry>,
}

impl Config {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, RelineError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Geometric tolerances used when grouping runs into lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconstructionConfig {
    /// Runs rotated by more than this many degrees are not editable.
    pub rotation_limit_degrees: f64,
    /// Max vertical offset between a run and a line, as a multiple of font size.
    pub same_line_ratio: f64,
    /// Max horizontal gap between a line and the next run, as a multiple of font size.
    pub adjacency_ratio: f64,
    /// De-padded gap that inserts a space, as a multiple of font size.
    pub space_ratio: f64,
    pub min_padding_px: f64,
    pub padding_ratio: f64,
    /// Run height used when the source declares none.
    pub line_height_ratio: f64,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            rotation_limit_degrees: 5.0,
            same_line_ratio: 0.6,
            adjacency_ratio: 1.8,
            space_ratio: 0.25,
            min_padding_px: 10.0,
            padding_ratio: 0.03,
            line_height_ratio: 1.2,
        }
    }
}

/// Width estimator cache and safety buffers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EstimatorConfig {
    pub cache_capacity: usize,
    /// Multiplier applied to host measurements (Tier 2).
    pub measured_safety: f64,
    /// Multiplier applied to the character heuristic (Tier 3).
    pub estimated_safety: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 1000,
            measured_safety: 1.03,
            estimated_safety: 1.05,
        }
    }
}

/// Geometry of the cover-and-redraw operations emitted for an edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditConfig {
    /// Padding added on every side of the cover rectangle.
    pub cover_padding_px: f64,
    /// Extra horizontal room given to replacement text.
    pub text_slack_px: f64,
    pub line_height_ratio: f64,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            cover_padding_px: 2.0,
            text_slack_px: 20.0,
            line_height_ratio: 1.2,
        }
    }
}

/// A substitute font to register with the font registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontEntry {
    /// Substitute font id (e.g. "Arial", "Arial-Bold", "Times-Roman").
    pub family: String,
    /// Base64-encoded font data, or a data URI (e.g. "data:font/ttf;base64,...").
    pub src: String,
}
