use serde::Serialize;

use crate::foundation::error::{ClipframeError, ClipframeResult};

/// Maximum label length in Unicode scalar values.
pub const MAX_LABEL_CHARS: usize = 50;

/// User-supplied label, validated and normalized for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OverlayLabel {
    raw: String,
    display: String,
}

impl OverlayLabel {
    /// Validate `raw` and derive its display form.
    ///
    /// Surrounding whitespace is trimmed. Empty labels, labels longer than [`MAX_LABEL_CHARS`]
    /// and labels containing control characters (line breaks included) are rejected.
    pub fn parse(raw: &str) -> ClipframeResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ClipframeError::validation("Label is required"));
        }
        let len = trimmed.chars().count();
        if len > MAX_LABEL_CHARS {
            return Err(ClipframeError::validation(format!(
                "Label must be at most {MAX_LABEL_CHARS} characters (got {len})"
            )));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(ClipframeError::validation(
                "Label must be a single line of text",
            ));
        }
        Ok(Self {
            raw: trimmed.to_string(),
            display: capitalize_words(trimmed),
        })
    }

    /// Trimmed input as the user typed it.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Text that is drawn onto the frame.
    pub fn display(&self) -> &str {
        &self.display
    }
}

/// Uppercase the first letter of every whitespace-separated word, leaving the rest untouched.
///
/// Mirrors CSS `text-transform: capitalize`: "dr. asha rao" becomes "Dr. Asha Rao" while
/// "McDonald" keeps its inner capital.
pub fn capitalize_words(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start && c.is_alphabetic() {
            out.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            // Leading punctuation such as quotes does not end the word start.
            if c.is_alphanumeric() {
                at_word_start = false;
            }
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/composition/label.rs"]
mod tests;
