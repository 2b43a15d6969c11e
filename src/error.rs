//! Structured error types for the reline pipeline.
//!
//! Most of these are recovered locally: a missing measurement facility falls
//! through to the character heuristic, and a font that cannot render an edit
//! only drops that edit's text. Nothing here aborts a whole save.

use thiserror::Error;

/// The unified error type returned by all public reline API functions.
#[derive(Debug, Error)]
pub enum RelineError {
    /// The host text-measurement facility is missing or failed.
    #[error("Text measurement unavailable: {0}")]
    MeasurementUnavailable(String),

    /// A substitute font could not render the replacement text.
    #[error("Font resolution failed for '{font}': {reason}")]
    FontResolutionFailed { font: String, reason: String },

    /// A string that is not one of the known substitute font ids.
    #[error("Unknown substitute font: '{0}'")]
    UnknownFont(String),

    /// JSON input failed to parse.
    #[error("Failed to parse input: {source}{}", format_hint(.hint))]
    Parse {
        source: serde_json::Error,
        hint: String,
    },

    /// A page collaborator failed to produce runs or accept draw operations.
    #[error("Page {page_index} failed: {reason}")]
    Page { page_index: usize, reason: String },

    /// Substitute font data in the configuration is not valid base64.
    #[error("Invalid font data for '{family}': {reason}")]
    FontData { family: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for RelineError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the expected schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input, is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        RelineError::Parse { source: e, hint }
    }
}
