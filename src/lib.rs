pub mod error;
pub mod explain;
pub mod logging;
pub mod ocr;
pub mod providers;
pub mod reader;
pub mod reading;
pub mod server;
pub mod settings;
mod test_util;

pub use error::ReadError;
pub use explain::{Explainer, Explanation};
pub use ocr::{CaptureRequest, CropRegion, RecognitionMode};
pub use reader::{CaptureAnalysis, Reader};
pub use settings::Settings;
