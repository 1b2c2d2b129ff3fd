mod engine;

use anyhow::{Result, anyhow};
use std::fmt;
use std::str::FromStr;

pub use engine::{
    PreprocessParams, RecognitionEngine, Tesseract, crop_region, decode_image, decode_image_b64,
    list_tesseract_languages, normalize_recognized_text, preprocess_capture, read_text, recognize,
    upscale_if_small,
};
pub use engine::{
    DEFAULT_MAX_PIXELS, DEFAULT_MIN_SIDE, RECOGNITION_MIN_SIDE, binarize_and_sharpen,
    correct_orientation, equalize_and_denoise, upscaled_dimensions,
};

/// Caller-supplied crop rectangle in source image pixels.
///
/// A region with a non-positive width or height means "use the whole image".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CropRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl CropRegion {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn full() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// Text-layout assumption handed to the recognition engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecognitionMode {
    #[default]
    Auto,
    Column,
    Line,
}

impl RecognitionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecognitionMode::Auto => "auto",
            RecognitionMode::Column => "column",
            RecognitionMode::Line => "line",
        }
    }

    pub fn layout(&self) -> PageLayout {
        match self {
            RecognitionMode::Auto => PageLayout::Block,
            RecognitionMode::Column => PageLayout::SingleColumn,
            RecognitionMode::Line => PageLayout::SingleLine,
        }
    }

    /// Lenient parse for request parameters: anything unknown falls back to `Auto`.
    pub fn from_param(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            tracing::warn!("unknown recognition mode '{}', using auto", value.trim());
            RecognitionMode::Auto
        })
    }
}

impl FromStr for RecognitionMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "auto" | "" => Ok(RecognitionMode::Auto),
            "column" => Ok(RecognitionMode::Column),
            "line" => Ok(RecognitionMode::Line),
            other => Err(anyhow!(
                "unknown recognition mode '{}' (expected auto, column or line)",
                other
            )),
        }
    }
}

impl fmt::Display for RecognitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page segmentation assumption, expressed as a tesseract `--psm` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLayout {
    Block,
    SingleColumn,
    SingleLine,
}

impl PageLayout {
    pub fn psm(&self) -> u32 {
        match self {
            PageLayout::Block => 6,
            PageLayout::SingleColumn => 5,
            PageLayout::SingleLine => 7,
        }
    }
}

/// Script/orientation profile the engine should load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptProfile {
    Vertical,
    Horizontal,
}

impl ScriptProfile {
    pub fn from_hint(vertical: bool) -> Self {
        if vertical {
            ScriptProfile::Vertical
        } else {
            ScriptProfile::Horizontal
        }
    }
}

/// Parameters of one preprocess+recognize call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    pub region: CropRegion,
    pub vertical: bool,
    pub mode: RecognitionMode,
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self {
            region: CropRegion::full(),
            vertical: true,
            mode: RecognitionMode::Auto,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_map_to_page_segmentation() {
        assert_eq!(RecognitionMode::Auto.layout().psm(), 6);
        assert_eq!(RecognitionMode::Column.layout().psm(), 5);
        assert_eq!(RecognitionMode::Line.layout().psm(), 7);
    }

    #[test]
    fn unknown_mode_param_falls_back_to_auto() {
        assert_eq!(RecognitionMode::from_param("sideways"), RecognitionMode::Auto);
        assert_eq!(RecognitionMode::from_param(" Column "), RecognitionMode::Column);
        assert!("sideways".parse::<RecognitionMode>().is_err());
    }

    #[test]
    fn non_positive_region_is_empty() {
        assert!(CropRegion::full().is_empty());
        assert!(CropRegion::new(10, 10, 0, 50).is_empty());
        assert!(CropRegion::new(10, 10, 50, -1).is_empty());
        assert!(!CropRegion::new(0, 0, 1, 1).is_empty());
    }

    #[test]
    fn default_request_expects_vertical_text() {
        let request = CaptureRequest::default();
        assert!(request.vertical);
        assert_eq!(request.mode, RecognitionMode::Auto);
        assert_eq!(ScriptProfile::from_hint(request.vertical), ScriptProfile::Vertical);
    }
}
