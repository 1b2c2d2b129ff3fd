use serde::{Deserialize, Serialize};

use crate::ocr::{CaptureRequest, CropRegion, RecognitionMode};

fn default_vertical() -> i64 {
    1
}

/// Form body of `POST /capture_analyze`.
#[derive(Debug, Deserialize)]
pub(crate) struct CaptureForm {
    pub(crate) image_b64: String,
    #[serde(default)]
    pub(crate) x: i32,
    #[serde(default)]
    pub(crate) y: i32,
    #[serde(default)]
    pub(crate) w: i32,
    #[serde(default)]
    pub(crate) h: i32,
    #[serde(default = "default_vertical")]
    pub(crate) vertical: i64,
    #[serde(default)]
    pub(crate) psm: Option<String>,
}

impl CaptureForm {
    pub(crate) fn capture_request(&self) -> CaptureRequest {
        CaptureRequest {
            region: CropRegion::new(self.x, self.y, self.w, self.h),
            vertical: self.vertical != 0,
            mode: self
                .psm
                .as_deref()
                .map(RecognitionMode::from_param)
                .unwrap_or_default(),
        }
    }
}

/// Form body of `POST /explain_gpt`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ExplainForm {
    pub(crate) japanese: String,
    pub(crate) context_hint: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}
