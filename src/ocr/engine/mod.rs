mod filters;
mod geom;
mod preprocess;
mod tesseract;
mod text;

use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{GrayImage, RgbaImage};
use tracing::{debug, info};

use crate::error::ReadError;
use crate::ocr::{CaptureRequest, PageLayout, ScriptProfile};

pub use geom::crop_region;
pub use preprocess::{
    DEFAULT_MAX_PIXELS, DEFAULT_MIN_SIDE, PreprocessParams, RECOGNITION_MIN_SIDE,
    binarize_and_sharpen, correct_orientation, equalize_and_denoise, upscale_if_small,
    upscaled_dimensions,
};
pub use tesseract::{Tesseract, list_tesseract_languages};
pub use text::normalize_recognized_text;

/// Black-box optical character recognition.
///
/// Implementations receive the fully preprocessed single-channel buffer and only decide
/// how to turn it into text; profile and layout are chosen by the caller.
pub trait RecognitionEngine: Send + Sync {
    fn recognize(
        &self,
        image: &GrayImage,
        profile: ScriptProfile,
        layout: PageLayout,
    ) -> Result<String>;
}

pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, ReadError> {
    let image = image::load_from_memory(bytes)
        .map_err(|err| ReadError::InvalidInput(format!("failed to decode image: {}", err)))?;
    Ok(image.to_rgba8())
}

/// Decodes base64 image data, accepting an optional `data:<mime>;base64,` prefix.
/// ASCII whitespace inside the payload, such as line wrapping, is ignored.
pub fn decode_image_b64(payload: &str) -> Result<RgbaImage, ReadError> {
    let encoded = match payload.split_once(',') {
        Some((_, data)) => data,
        None => payload,
    };
    let compact: Vec<u8> = encoded
        .bytes()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect();
    let bytes = BASE64
        .decode(&compact)
        .map_err(|err| ReadError::InvalidInput(format!("failed to decode base64: {}", err)))?;
    decode_image(&bytes)
}

/// Crop, orientation, scale, contrast/denoise and binarize/sharpen.
pub fn preprocess_capture(
    image: RgbaImage,
    request: &CaptureRequest,
    params: &PreprocessParams,
) -> Result<GrayImage, ReadError> {
    let (width, height) = image.dimensions();
    let cropped = crop_region(image, &request.region)?;
    debug!(
        "cropped {}x{} source to {}x{}",
        width,
        height,
        cropped.width(),
        cropped.height()
    );
    preprocess::preprocess_for_ocr(cropped, request.vertical, params)
}

/// Picks profile and layout for `request` and runs the engine; returns trimmed text.
pub fn recognize(
    engine: &dyn RecognitionEngine,
    image: &GrayImage,
    request: &CaptureRequest,
) -> Result<String, ReadError> {
    let profile = ScriptProfile::from_hint(request.vertical);
    let layout = request.mode.layout();
    info!(
        "recognizing {}x{} buffer (profile={:?}, mode={}, psm={})",
        image.width(),
        image.height(),
        profile,
        request.mode,
        layout.psm()
    );
    let text = engine
        .recognize(image, profile, layout)
        .map_err(ReadError::RecognitionUnavailable)?;
    Ok(text.trim().to_string())
}

pub fn read_text(
    image_bytes: &[u8],
    request: &CaptureRequest,
    params: &PreprocessParams,
    engine: &dyn RecognitionEngine,
) -> Result<String, ReadError> {
    let image = decode_image(image_bytes)?;
    let prepared = preprocess_capture(image, request, params)?;
    recognize(engine, &prepared, request)
}
