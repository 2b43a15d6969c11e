//! # Font Management
//!
//! Source documents name fonts freely ("ABCDEF+ArialMT", "TimesNewRomanPS-BoldMT",
//! "CourierNewPSMT"). Replacement text can only be drawn with a small closed set
//! of substitute fonts, so every source name is first mapped onto that set.
//!
//! Only the Arial-class substitute ships bold and italic variants. Times and
//! Courier names collapse to their single regular face.
//!
//! The [`FontContext`] holds the registry of substitute fonts. By default each
//! substitute is backed by a standard PDF font; a TrueType file can be
//! registered for any substitute to get its real metrics and glyph coverage.

pub mod metrics;

use std::collections::HashMap;

use tracing::debug;

use crate::config::FontEntry;
use crate::error::RelineError;
use crate::text::TextMetrics;

pub use metrics::{unicode_to_winansi, StandardFont, StandardFontMetrics};

/// The closed set of fonts replacement text is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubstituteFont {
    Arial,
    ArialBold,
    ArialItalic,
    ArialBoldItalic,
    TimesRoman,
    Courier,
}

impl SubstituteFont {
    pub const ALL: [SubstituteFont; 6] = [
        Self::Arial,
        Self::ArialBold,
        Self::ArialItalic,
        Self::ArialBoldItalic,
        Self::TimesRoman,
        Self::Courier,
    ];

    /// The identifier used in draw operations and configuration.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Arial => "Arial",
            Self::ArialBold => "Arial-Bold",
            Self::ArialItalic => "Arial-Italic",
            Self::ArialBoldItalic => "Arial-BoldItalic",
            Self::TimesRoman => "Times-Roman",
            Self::Courier => "Courier",
        }
    }

    /// Parse an identifier produced by [`SubstituteFont::id`].
    pub fn from_id(id: &str) -> Result<Self, RelineError> {
        Self::ALL
            .into_iter()
            .find(|f| f.id() == id)
            .ok_or_else(|| RelineError::UnknownFont(id.to_string()))
    }

    /// The standard PDF font used when no TrueType data is registered.
    pub fn standard(&self) -> StandardFont {
        match self {
            Self::Arial => StandardFont::Helvetica,
            Self::ArialBold => StandardFont::HelveticaBold,
            Self::ArialItalic => StandardFont::HelveticaOblique,
            Self::ArialBoldItalic => StandardFont::HelveticaBoldOblique,
            Self::TimesRoman => StandardFont::TimesRoman,
            Self::Courier => StandardFont::Courier,
        }
    }
}

/// Strip a six-letter subset tag ("ABCDEF+") from an embedded font name.
pub fn strip_subset_prefix(name: &str) -> &str {
    if let Some((prefix, rest)) = name.split_once('+') {
        if prefix.len() == 6 && prefix.chars().all(|ch| ch.is_ascii_uppercase()) {
            return rest;
        }
    }
    name
}

/// Map a source font name to the substitute it should be rendered with.
///
/// Matching runs on the name without its subset tag: tags are random
/// uppercase letters and may spell "BOLD" or "TIMES" by accident.
/// Unknown or empty names fall back to the Arial-class base.
pub fn map_font(source: &str) -> SubstituteFont {
    let name = strip_subset_prefix(source);
    let lower = name.to_lowercase();

    if !lower.contains("arial") && !lower.contains("helvetica") {
        if lower.contains("times") {
            return SubstituteFont::TimesRoman;
        }
        if lower.contains("courier") {
            return SubstituteFont::Courier;
        }
    }

    let bold = lower.contains("bold");
    let italic = lower.contains("italic") || lower.contains("oblique");
    match (bold, italic) {
        (true, true) => SubstituteFont::ArialBoldItalic,
        (true, false) => SubstituteFont::ArialBold,
        (false, true) => SubstituteFont::ArialItalic,
        (false, false) => SubstituteFont::Arial,
    }
}

/// Broad typeface class used by the character-width heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontCategory {
    Monospace,
    SansSerif,
    Serif,
    Default,
}

impl FontCategory {
    /// Classify a family name by pattern.
    pub fn of(family: &str) -> Self {
        let lower = family.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));
        if has(&["mono", "courier", "consolas"]) {
            Self::Monospace
        } else if has(&["arial", "helvetica", "sans", "verdana", "roboto"]) {
            Self::SansSerif
        } else if has(&["times", "serif", "georgia", "palatino"]) {
            Self::Serif
        } else {
            Self::Default
        }
    }

    /// Average glyph advance as a fraction of the font size.
    pub fn base_width_ratio(&self) -> f64 {
        match self {
            Self::Monospace => 0.60,
            Self::SansSerif => 0.52,
            Self::Serif | Self::Default => 0.55,
        }
    }
}

/// Backing data for one substitute font.
#[derive(Debug, Clone)]
pub enum FontData {
    /// One of the standard PDF fonts. No embedding needed.
    Standard(StandardFont),
    /// A TrueType/OpenType font registered for this substitute.
    Custom {
        data: Vec<u8>,
        /// Parsed metrics from ttf-parser, if the data could be parsed.
        metrics: Option<CustomFontMetrics>,
    },
}

/// Parsed metrics from a TrueType/OpenType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct CustomFontMetrics {
    pub units_per_em: u16,
    pub advance_widths: HashMap<char, u16>,
    pub default_advance: u16,
    /// Maps characters to their glyph IDs in the font.
    pub glyph_ids: HashMap<char, u16>,
}

impl CustomFontMetrics {
    /// Get the advance width of a character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let w = self
            .advance_widths
            .get(&ch)
            .copied()
            .unwrap_or(self.default_advance);
        (w as f64 / self.units_per_em as f64) * font_size
    }

    pub fn measure_string(&self, text: &str, font_size: f64) -> f64 {
        text.chars().map(|ch| self.char_width(ch, font_size)).sum()
    }

    /// Parse metrics from font data using ttf-parser.
    pub fn from_font_data(data: &[u8]) -> Option<Self> {
        let face = ttf_parser::Face::parse(data, 0).ok()?;
        let units_per_em = face.units_per_em();

        let mut advance_widths = HashMap::new();
        let mut glyph_ids = HashMap::new();
        let mut default_advance = 0u16;

        for code in 32u32..=0xFFFF {
            if let Some(ch) = char::from_u32(code) {
                if let Some(glyph_id) = face.glyph_index(ch) {
                    let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                    advance_widths.insert(ch, advance);
                    glyph_ids.insert(ch, glyph_id.0);
                    if ch == ' ' {
                        default_advance = advance;
                    }
                }
            }
        }

        if default_advance == 0 {
            default_advance = units_per_em / 2;
        }

        Some(CustomFontMetrics {
            units_per_em,
            advance_widths,
            default_advance,
            glyph_ids,
        })
    }
}

/// A font able to render a particular replacement string.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFont {
    pub font: SubstituteFont,
    /// Whether text must be written as glyph ids rather than WinAnsi bytes.
    pub is_custom: bool,
}

/// Resolves the font used to draw replacement text.
pub trait FontResolver {
    fn resolve_font(&self, font_name: &str, text: &str) -> Result<ResolvedFont, RelineError>;
}

static FALLBACK_FONT: FontData = FontData::Standard(StandardFont::Helvetica);

/// Registry of substitute fonts, shared by measurement and rendering.
#[derive(Debug, Clone)]
pub struct FontContext {
    fonts: HashMap<SubstituteFont, FontData>,
}

impl Default for FontContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FontContext {
    /// A context where every substitute is backed by its standard font.
    pub fn new() -> Self {
        let fonts = SubstituteFont::ALL
            .into_iter()
            .map(|f| (f, FontData::Standard(f.standard())))
            .collect();
        Self { fonts }
    }

    /// Register TrueType data for a substitute font.
    pub fn register(&mut self, font: SubstituteFont, data: Vec<u8>) {
        let metrics = CustomFontMetrics::from_font_data(&data);
        if metrics.is_none() {
            debug!(font = font.id(), "registered font data could not be parsed");
        }
        self.fonts.insert(font, FontData::Custom { data, metrics });
    }

    /// Register every font listed in the configuration.
    pub fn register_entries(&mut self, entries: &[FontEntry]) -> Result<(), RelineError> {
        for entry in entries {
            let font = SubstituteFont::from_id(&entry.family)?;
            let data = decode_font_src(&entry.src).map_err(|reason| RelineError::FontData {
                family: entry.family.clone(),
                reason,
            })?;
            self.register(font, data);
        }
        Ok(())
    }

    pub fn resolve(&self, font: SubstituteFont) -> &FontData {
        self.fonts.get(&font).unwrap_or(&FALLBACK_FONT)
    }

    /// Glyph id for a character in a registered custom font.
    pub fn glyph_id(&self, font: SubstituteFont, ch: char) -> Option<u16> {
        match self.resolve(font) {
            FontData::Custom {
                metrics: Some(m), ..
            } => m.glyph_ids.get(&ch).copied(),
            _ => None,
        }
    }
}

impl TextMetrics for FontContext {
    fn measure(&self, text: &str, font_size: f64, family: &str) -> Result<f64, RelineError> {
        let font = SubstituteFont::from_id(family).unwrap_or_else(|_| map_font(family));
        match self.resolve(font) {
            FontData::Standard(std_font) => {
                Ok(std_font.metrics().measure_string(text, font_size, 0.0))
            }
            FontData::Custom {
                metrics: Some(m), ..
            } => Ok(m.measure_string(text, font_size)),
            FontData::Custom { metrics: None, .. } => Err(RelineError::MeasurementUnavailable(
                format!("font data for '{}' could not be parsed", font.id()),
            )),
        }
    }
}

impl FontResolver for FontContext {
    fn resolve_font(&self, font_name: &str, text: &str) -> Result<ResolvedFont, RelineError> {
        let font = map_font(font_name);
        let fail = |reason: String| RelineError::FontResolutionFailed {
            font: font.id().to_string(),
            reason,
        };
        match self.resolve(font) {
            FontData::Standard(_) => {
                if let Some(ch) = text.chars().find(|c| unicode_to_winansi(*c).is_none()) {
                    return Err(fail(format!("'{}' is not encodable in WinAnsi", ch)));
                }
                Ok(ResolvedFont {
                    font,
                    is_custom: false,
                })
            }
            FontData::Custom { metrics: None, .. } => {
                Err(fail("font data could not be parsed".to_string()))
            }
            FontData::Custom {
                metrics: Some(m), ..
            } => {
                if let Some(ch) = text
                    .chars()
                    .find(|c| !c.is_whitespace() && !m.glyph_ids.contains_key(c))
                {
                    return Err(fail(format!("no glyph for '{}'", ch)));
                }
                Ok(ResolvedFont {
                    font,
                    is_custom: true,
                })
            }
        }
    }
}

/// Decode a base64 string or `data:` URI into raw font bytes.
fn decode_font_src(src: &str) -> Result<Vec<u8>, String> {
    use base64::Engine;
    let b64 = if src.starts_with("data:") {
        let comma_pos = src
            .find(',')
            .ok_or_else(|| "Invalid data URI: missing comma".to_string())?;
        &src[comma_pos + 1..]
    } else {
        src
    };
    base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|e| format!("Base64 decode error: {}", e))
}
