use thiserror::Error;

/// Failures of the capture read operation (preprocess, recognize, annotate).
///
/// An empty recognition result is not an error: it means no text was found.
#[derive(Error, Debug)]
pub enum ReadError {
    /// The payload could not be decoded into an image.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The crop rectangle does not overlap the source image at all.
    #[error(
        "crop region ({x}, {y}, {width}x{height}) is outside the {image_width}x{image_height} image"
    )]
    OutOfBounds {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        image_width: u32,
        image_height: u32,
    },

    /// The recognition engine is missing, misconfigured or failed.
    #[error("recognition unavailable: {0:#}")]
    RecognitionUnavailable(anyhow::Error),

    /// The phonetic converter is missing or failed.
    #[error("reading unavailable: {0:#}")]
    ReadingUnavailable(anyhow::Error),
}

impl ReadError {
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ReadError::InvalidInput(_) | ReadError::OutOfBounds { .. }
        )
    }
}
