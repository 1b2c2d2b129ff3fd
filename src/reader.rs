use image::{GrayImage, RgbaImage};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::error::ReadError;
use crate::ocr::{
    CaptureRequest, PreprocessParams, RecognitionEngine, decode_image, preprocess_capture,
    recognize,
};
use crate::reading::{PhoneticConverter, Readings, annotate};
use crate::settings::Settings;

pub const TRANSLATION_HINT: &str = "Tap Explain for a literal → natural translation with grammar.";

/// Result of reading one capture: the text, its reading and a hint for the explain step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureAnalysis {
    pub japanese: String,
    pub readings: Readings,
    pub translation: String,
}

/// Preprocess, recognize and annotate a capture with injected collaborators.
#[derive(Clone)]
pub struct Reader {
    engine: Arc<dyn RecognitionEngine>,
    converter: Arc<dyn PhoneticConverter>,
    params: PreprocessParams,
}

impl Reader {
    pub fn new(
        engine: Arc<dyn RecognitionEngine>,
        converter: Arc<dyn PhoneticConverter>,
        params: PreprocessParams,
    ) -> Self {
        Self {
            engine,
            converter,
            params,
        }
    }

    /// Tesseract and kakasi as configured.
    pub fn from_settings(settings: &Settings) -> Self {
        let engine: Arc<dyn RecognitionEngine> = Arc::new(settings.ocr.tesseract());
        let converter: Arc<dyn PhoneticConverter> = Arc::new(settings.ocr.kakasi());
        Self::new(engine, converter, settings.preprocess.clone())
    }

    pub fn params(&self) -> &PreprocessParams {
        &self.params
    }

    pub fn preprocess(
        &self,
        image: RgbaImage,
        request: &CaptureRequest,
    ) -> Result<GrayImage, ReadError> {
        preprocess_capture(image, request, &self.params)
    }

    pub fn analyze(
        &self,
        image: RgbaImage,
        request: &CaptureRequest,
    ) -> Result<CaptureAnalysis, ReadError> {
        let prepared = self.preprocess(image, request)?;
        self.analyze_prepared(&prepared, request)
    }

    pub fn analyze_bytes(
        &self,
        bytes: &[u8],
        request: &CaptureRequest,
    ) -> Result<CaptureAnalysis, ReadError> {
        self.analyze(decode_image(bytes)?, request)
    }

    /// Recognition and annotation of an already preprocessed buffer.
    pub fn analyze_prepared(
        &self,
        prepared: &GrayImage,
        request: &CaptureRequest,
    ) -> Result<CaptureAnalysis, ReadError> {
        let raw = recognize(self.engine.as_ref(), prepared, request)?;
        let annotation = annotate(&raw, self.converter.as_ref())?;
        info!("recognized {} chars", annotation.japanese.chars().count());
        Ok(CaptureAnalysis {
            japanese: annotation.japanese,
            readings: annotation.readings,
            translation: TRANSLATION_HINT.to_string(),
        })
    }
}
