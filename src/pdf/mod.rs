//! # Edit Application
//!
//! Turns a page's edits into draw operations and writes those operations as
//! PDF content-stream operators.
//!
//! Original glyphs are never removed from the content stream. Each edit is a
//! white rectangle painted over the line's captured bounds, followed by the
//! replacement text drawn at the line's original top-left corner:
//!
//! ```text
//! screen space (edit bounds)          page space (draw ops)
//! ┌ ─ ─ ─ ─ ─ ─ ─ ─ ┐ ← +2px
//!   ┌─────────────┐                   CoverRect  (expanded, flipped)
//!   │ old text    │        ──→        DrawText   (x, top, width + 20, size × 1.2)
//!   └─────────────┘
//! └ ─ ─ ─ ─ ─ ─ ─ ─ ┘
//! ```
//!
//! If the replacement font cannot render the text, the cover rectangle is
//! still emitted and a warning is returned for that edit.

use std::fmt::Write as FmtWrite;
use std::sync::Arc;

use async_trait::async_trait;
use miniz_oxide::deflate::compress_to_vec_zlib;
use tracing::{debug, warn};

use crate::config::EditConfig;
use crate::error::RelineError;
use crate::font::{unicode_to_winansi, FontContext, FontData, FontResolver, SubstituteFont};
use crate::geometry::Bounds;
use crate::model::{DrawOp, Edit, EditSet};
use crate::session::PageSink;

/// A non-fatal problem with one edit.
#[derive(Debug)]
pub struct EditWarning {
    pub line_id: String,
    pub error: RelineError,
}

/// Draw operations for a page plus any per-edit warnings.
#[derive(Debug, Default)]
pub struct AppliedEdits {
    pub ops: Vec<DrawOp>,
    pub warnings: Vec<EditWarning>,
}

/// Builds draw operations for a page of height `page_height`.
pub struct EditApplier<'a, R> {
    fonts: &'a R,
    config: EditConfig,
}

impl<'a, R: FontResolver> EditApplier<'a, R> {
    pub fn new(fonts: &'a R) -> Self {
        Self::with_config(fonts, EditConfig::default())
    }

    pub fn with_config(fonts: &'a R, config: EditConfig) -> Self {
        Self { fonts, config }
    }

    /// Produce draw operations for every edit, in the set's order.
    pub fn apply(&self, page_height: f64, edits: &EditSet) -> AppliedEdits {
        let mut out = AppliedEdits::default();
        for (line_id, edit) in edits.iter() {
            out.ops.push(DrawOp::CoverRect {
                bounds: self.cover_bounds(edit).flipped(page_height),
            });

            let Some(text) = replacement_text(&edit.new_text) else {
                debug!(line_id, "edit clears the line");
                continue;
            };

            match self.fonts.resolve_font(&edit.font_name, text) {
                Ok(resolved) => out.ops.push(DrawOp::DrawText {
                    bounds: self.text_bounds(edit).flipped(page_height),
                    text: text.to_string(),
                    font_size: edit.font_size,
                    font_name: resolved.font.id().to_string(),
                }),
                Err(error) => {
                    warn!(line_id, %error, "dropping replacement text");
                    out.warnings.push(EditWarning {
                        line_id: line_id.to_string(),
                        error,
                    });
                }
            }
        }
        out
    }

    /// Screen-space rectangle that hides the original text.
    pub fn cover_bounds(&self, edit: &Edit) -> Bounds {
        edit.bounds.expand(self.config.cover_padding_px)
    }

    /// Screen-space box the replacement text is drawn into.
    pub fn text_bounds(&self, edit: &Edit) -> Bounds {
        Bounds::new(
            edit.bounds.x,
            edit.bounds.y,
            edit.bounds.width + self.config.text_slack_px,
            edit.font_size * self.config.line_height_ratio,
        )
    }
}

/// The single line of text an edit draws, if any.
///
/// Only the first line of multi-line input is used.
pub fn replacement_text(new_text: &str) -> Option<&str> {
    if new_text.trim().is_empty() {
        return None;
    }
    let first = new_text.lines().next().unwrap_or("");
    if first.trim().is_empty() {
        None
    } else {
        Some(first)
    }
}

/// Writes draw operations as PDF content-stream operators.
///
/// Fonts are referenced as `/F1`, `/F2`, ... in order of first use; the
/// caller adds matching entries to the page's resource dictionary using
/// [`ContentStreamSink::font_dictionary`].
pub struct ContentStreamSink {
    fonts: Arc<FontContext>,
    stream: String,
    font_order: Vec<SubstituteFont>,
}

impl ContentStreamSink {
    pub fn new(fonts: Arc<FontContext>) -> Self {
        Self {
            fonts,
            stream: String::new(),
            font_order: Vec::new(),
        }
    }

    /// Append operators for each draw operation, in order.
    ///
    /// Every font is checked before anything is written, so an error leaves
    /// the stream unchanged.
    pub fn write_ops(&mut self, ops: &[DrawOp]) -> Result<(), RelineError> {
        let fonts = ops
            .iter()
            .map(|op| match op {
                DrawOp::DrawText { font_name, .. } => SubstituteFont::from_id(font_name).map(Some),
                DrawOp::CoverRect { .. } => Ok(None),
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (op, font) in ops.iter().zip(fonts) {
            match (op, font) {
                (
                    DrawOp::DrawText {
                        bounds,
                        text,
                        font_size,
                        ..
                    },
                    Some(font),
                ) => self.write_text(bounds, text, *font_size, font),
                (op, _) => self.write_cover(&op.bounds()),
            }
        }
        Ok(())
    }

    fn write_cover(&mut self, b: &Bounds) {
        let _ = write!(
            self.stream,
            "q\n1 1 1 rg\n{:.2} {:.2} {:.2} {:.2} re\nf\nQ\n",
            b.x, b.y, b.width, b.height
        );
    }

    fn write_text(&mut self, b: &Bounds, text: &str, font_size: f64, font: SubstituteFont) {
        let resource = self.font_resource(font);
        let ascent = font.standard().metrics().ascent as f64 / 1000.0;
        let baseline = b.y + b.height - font_size * ascent;

        let _ = write!(
            self.stream,
            "BT\n0 0 0 rg\n/{} {:.1} Tf\n{:.2} {:.2} Td\n",
            resource, font_size, b.x, baseline
        );

        if self.is_custom(font) {
            let hex = glyph_hex(text, |ch| self.fonts.glyph_id(font, ch));
            let _ = writeln!(self.stream, "<{}> Tj", hex);
        } else {
            let _ = writeln!(self.stream, "({}) Tj", encode_winansi_literal(text));
        }

        self.stream.push_str("ET\n");
    }

    fn is_custom(&self, font: SubstituteFont) -> bool {
        matches!(self.fonts.resolve(font), FontData::Custom { .. })
    }

    fn font_resource(&mut self, font: SubstituteFont) -> String {
        let idx = match self.font_order.iter().position(|f| *f == font) {
            Some(idx) => idx,
            None => {
                self.font_order.push(font);
                self.font_order.len() - 1
            }
        };
        format!("F{}", idx + 1)
    }

    /// Resource names paired with the substitute fonts they refer to.
    pub fn font_resources(&self) -> Vec<(String, SubstituteFont)> {
        self.font_order
            .iter()
            .enumerate()
            .map(|(i, f)| (format!("F{}", i + 1), *f))
            .collect()
    }

    /// `/Font` resource dictionary entries for the standard fonts in use.
    ///
    /// Registered custom fonts are left out; the caller embeds those.
    pub fn font_dictionary(&self) -> String {
        let mut dict = String::from("<<");
        for (name, font) in self.font_resources() {
            if self.is_custom(font) {
                continue;
            }
            let _ = write!(
                dict,
                " /{} << /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                name,
                font.standard().pdf_name()
            );
        }
        dict.push_str(" >>");
        dict
    }

    /// The uncompressed operators written so far.
    pub fn content(&self) -> &str {
        &self.stream
    }

    /// A complete FlateDecode stream object body for the operators.
    pub fn to_stream_object(&self) -> Vec<u8> {
        let compressed = compress_to_vec_zlib(self.stream.as_bytes(), 6);
        let mut data = format!(
            "<< /Length {} /Filter /FlateDecode >>\nstream\n",
            compressed.len()
        )
        .into_bytes();
        data.extend_from_slice(&compressed);
        data.extend_from_slice(b"\nendstream");
        data
    }
}

#[async_trait]
impl PageSink for ContentStreamSink {
    async fn apply(&mut self, ops: &[DrawOp]) -> Result<(), RelineError> {
        self.write_ops(ops)
    }
}

/// Encode text as hex glyph ids for a custom font.
///
/// Whitespace the font has no glyph for is drawn with the space glyph, or
/// dropped if there is none.
fn glyph_hex(text: &str, glyph_id: impl Fn(char) -> Option<u16>) -> String {
    let mut hex = String::new();
    for ch in text.chars() {
        let gid = match glyph_id(ch) {
            Some(gid) => gid,
            None if ch.is_whitespace() => match glyph_id(' ') {
                Some(gid) => gid,
                None => continue,
            },
            None => 0,
        };
        let _ = write!(hex, "{:04X}", gid);
    }
    hex
}

/// Encode text as the body of a PDF literal string in WinAnsiEncoding.
fn encode_winansi_literal(text: &str) -> String {
    let mut out = String::new();
    for ch in text.chars() {
        let b = unicode_to_winansi(ch).unwrap_or(b'?');
        match b {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            0x20..=0x7E => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{:03o}", b);
            }
        }
    }
    out
}
