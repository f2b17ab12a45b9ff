//! Number extraction from generated text

use once_cell::sync::Lazy;
use regex::Regex;

use super::ReadingError;

/// Optional sign, optional integer part, optional fraction
static NUMBER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[-+]?[0-9]*\.?[0-9]+").unwrap_or_else(|e| panic!("invalid number pattern: {}", e))
});

/// Parse the first decimal number in `content`
///
/// Empty content is a generation failure and is reported before any parsing
/// is attempted. Whitespace is ordinary text with no number in it.
pub fn extract_number(content: &str) -> Result<f64, ReadingError> {
    if content.is_empty() {
        return Err(ReadingError::ContentGenerationError);
    }

    NUMBER_PATTERN
        .find(content)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .ok_or(ReadingError::NumberExtractionError)
}
