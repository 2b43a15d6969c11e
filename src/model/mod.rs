//! # Data Model
//!
//! The values that flow through the pipeline:
//!
//! ```text
//! GlyphRun ──place──→ PlacedRun ──merge──→ Line ──user──→ Edit ──apply──→ DrawOp
//! (page space)        (screen space)                      (EditSet)       (page space)
//! ```
//!
//! Everything here is plain data with serde support so pages, edits and
//! draw operations can be exchanged as JSON with whatever renders the page.

use serde::{Deserialize, Serialize};

use crate::geometry::Bounds;

/// One positioned text-showing operation from a page's content stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlyphRun {
    pub text: String,
    /// Baseline origin in bottom-left-origin page space.
    pub origin_x: f64,
    pub origin_y: f64,
    /// Horizontal scale component of the run's transform.
    pub scale_x: f64,
    /// Vertical skew component of the run's transform.
    #[serde(default)]
    pub skew_y: f64,
    /// Authoritative width, if the source provided one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_height: Option<f64>,
    #[serde(default = "default_font_name")]
    pub font_name: String,
}

fn default_font_name() -> String {
    "Helvetica".to_string()
}

impl GlyphRun {
    /// Build an unrotated run at `(x, y)` with the given size.
    pub fn new(text: &str, x: f64, y: f64, font_size: f64, font_name: &str) -> Self {
        Self {
            text: text.to_string(),
            origin_x: x,
            origin_y: y,
            scale_x: font_size,
            skew_y: 0.0,
            declared_width: None,
            declared_height: None,
            font_name: font_name.to_string(),
        }
    }

    pub fn font_size(&self) -> f64 {
        self.scale_x.hypot(self.skew_y)
    }

    pub fn rotation_degrees(&self) -> f64 {
        self.skew_y.atan2(self.scale_x).to_degrees()
    }

    /// Whether the run is rotated beyond `limit_degrees` in either direction.
    pub fn is_rotated(&self, limit_degrees: f64) -> bool {
        self.rotation_degrees().abs() > limit_degrees
    }

    /// The declared width, when present and positive.
    pub fn usable_declared_width(&self) -> Option<f64> {
        self.declared_width.filter(|w| *w > 0.0)
    }
}

/// A glyph run placed in top-left-origin screen space, ready for merging.
///
/// `width` already includes `padding_px`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedRun {
    /// Position of the run in the page's (non-empty) run list.
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub padding_px: f64,
    pub font_size: f64,
    pub rotation_degrees: f64,
    pub run: GlyphRun,
}

impl PlacedRun {
    pub fn text(&self) -> &str {
        &self.run.text
    }

    pub fn font_name(&self) -> &str {
        &self.run.font_name
    }
}

/// A reconstructed, editable line of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    /// Derived from the seeding run's index (`text-{index}`).
    pub id: String,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Padding baked into `width` by the most recently merged run.
    pub padding_px: f64,
    /// Largest font size among member runs.
    pub font_size: f64,
    /// Font of the seeding run.
    pub font_name: String,
    pub member_runs: Vec<PlacedRun>,
}

impl Line {
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }

    /// Capture an edit against this line's current geometry.
    pub fn edit(&self, new_text: &str) -> Edit {
        Edit {
            bounds: self.bounds(),
            new_text: new_text.to_string(),
            font_size: self.font_size,
            font_name: self.font_name.clone(),
        }
    }
}

/// A user's replacement text for one line.
///
/// `bounds` is a screen-space snapshot taken when the edit was made and is
/// never updated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edit {
    pub bounds: Bounds,
    /// Empty means "delete the text and leave the area blank".
    #[serde(default)]
    pub new_text: String,
    pub font_size: f64,
    pub font_name: String,
}

/// An edit together with the line it targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditEntry {
    pub line_id: String,
    #[serde(flatten)]
    pub edit: Edit,
}

/// Edits for one page, in the order they were first made.
///
/// Serialized as a JSON array of [`EditEntry`] values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<EditEntry>", into = "Vec<EditEntry>")]
pub struct EditSet {
    entries: Vec<EditEntry>,
}

impl EditSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edit. A later edit for the same line replaces the earlier
    /// one wholesale but keeps its position in the order.
    pub fn insert(&mut self, line_id: &str, edit: Edit) {
        match self.entries.iter_mut().find(|e| e.line_id == line_id) {
            Some(existing) => existing.edit = edit,
            None => self.entries.push(EditEntry {
                line_id: line_id.to_string(),
                edit,
            }),
        }
    }

    pub fn get(&self, line_id: &str) -> Option<&Edit> {
        self.entries
            .iter()
            .find(|e| e.line_id == line_id)
            .map(|e| &e.edit)
    }

    pub fn remove(&mut self, line_id: &str) -> Option<Edit> {
        let pos = self.entries.iter().position(|e| e.line_id == line_id)?;
        Some(self.entries.remove(pos).edit)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Edit)> {
        self.entries.iter().map(|e| (e.line_id.as_str(), &e.edit))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<EditEntry>> for EditSet {
    fn from(entries: Vec<EditEntry>) -> Self {
        let mut set = EditSet::new();
        for entry in entries {
            set.insert(&entry.line_id, entry.edit);
        }
        set
    }
}

impl From<EditSet> for Vec<EditEntry> {
    fn from(set: EditSet) -> Self {
        set.entries
    }
}

/// One primitive drawing instruction, in bottom-left-origin page space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DrawOp {
    /// Paint an opaque white rectangle over the original text.
    CoverRect { bounds: Bounds },
    /// Draw a single line of replacement text inside `bounds`.
    #[serde(rename_all = "camelCase")]
    DrawText {
        bounds: Bounds,
        text: String,
        font_size: f64,
        /// Substitute font id (e.g. "Arial-Bold").
        font_name: String,
    },
}

impl DrawOp {
    pub fn bounds(&self) -> Bounds {
        match self {
            DrawOp::CoverRect { bounds } | DrawOp::DrawText { bounds, .. } => *bounds,
        }
    }
}

/// A page described directly as data: its viewport height and glyph runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInput {
    pub viewport_height: f64,
    pub runs: Vec<GlyphRun>,
}
