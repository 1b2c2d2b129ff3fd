mod kakasi;

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use crate::error::ReadError;
use crate::ocr::normalize_recognized_text;

pub use kakasi::Kakasi;

/// Converts mixed kanji/kana text into its hiragana reading.
pub trait PhoneticConverter: Send + Sync {
    fn to_hiragana(&self, text: &str) -> Result<String>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Readings {
    pub hiragana: String,
}

/// Recognized text collapsed to one line, plus its reading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub japanese: String,
    pub readings: Readings,
}

/// Normalizes raw engine output and derives the reading.
///
/// Empty text never reaches the converter.
pub fn annotate(raw: &str, converter: &dyn PhoneticConverter) -> Result<Annotation, ReadError> {
    let japanese = normalize_recognized_text(raw);
    if japanese.is_empty() {
        debug!("no text recognized; skipping reading");
        return Ok(Annotation::default());
    }
    let hiragana = converter
        .to_hiragana(&japanese)
        .map_err(ReadError::ReadingUnavailable)?;
    Ok(Annotation {
        japanese,
        readings: Readings { hiragana },
    })
}
