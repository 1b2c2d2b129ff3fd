use std::sync::{Arc, Mutex};

use image::{GrayImage, Luma, Rgba, RgbaImage};
use urzasight::ocr::{PageLayout, PreprocessParams, RecognitionEngine, ScriptProfile};
use urzasight::reading::PhoneticConverter;
use urzasight::{CaptureRequest, CropRegion, Reader, RecognitionMode};

#[derive(Default)]
struct RecordingEngine {
    calls: Mutex<Vec<(u32, u32, ScriptProfile, PageLayout)>>,
}

impl RecognitionEngine for RecordingEngine {
    fn recognize(
        &self,
        image: &GrayImage,
        profile: ScriptProfile,
        layout: PageLayout,
    ) -> anyhow::Result<String> {
        assert!(
            image
                .pixels()
                .all(|Luma([value])| *value == 0 || *value == 255),
            "engine must receive a binary buffer"
        );
        self.calls
            .lock()
            .unwrap()
            .push((image.width(), image.height(), profile, layout));
        if image.height() >= image.width() {
            Ok("今日は\nいい天気\n".to_string())
        } else {
            Ok(String::new())
        }
    }
}

struct TableConverter;

impl PhoneticConverter for TableConverter {
    fn to_hiragana(&self, text: &str) -> anyhow::Result<String> {
        Ok(text.replace("今日", "きょう").replace("天気", "てんき"))
    }
}

fn page() -> RgbaImage {
    let mut page = RgbaImage::from_pixel(800, 800, Rgba([245, 245, 245, 255]));
    for y in (120..780).step_by(40) {
        for x in (120..780).step_by(40) {
            for dy in 0..12 {
                for dx in 0..12 {
                    page.put_pixel(x + dx, y + dy, Rgba([20, 20, 20, 255]));
                }
            }
        }
    }
    page
}

fn reader(engine: Arc<RecordingEngine>) -> Reader {
    Reader::new(engine, Arc::new(TableConverter), PreprocessParams::default())
}

#[test]
fn portrait_crop_is_read_without_rotation() {
    let engine = Arc::new(RecordingEngine::default());
    let request = CaptureRequest {
        region: CropRegion::new(100, 100, 200, 600),
        vertical: true,
        mode: RecognitionMode::Auto,
    };
    let analysis = reader(engine.clone())
        .analyze(page(), &request)
        .unwrap();

    assert_eq!(analysis.japanese, "今日は いい天気");
    assert_eq!(analysis.readings.hiragana, "きょうは いいてんき");
    let calls = engine.calls.lock().unwrap();
    assert_eq!(
        calls.as_slice(),
        &[(1100, 3300, ScriptProfile::Vertical, PageLayout::Block)]
    );
}

#[test]
fn landscape_crop_is_rotated_to_portrait() {
    let portrait = image::imageops::crop_imm(&page(), 100, 100, 200, 600).to_image();
    let landscape = image::imageops::rotate90(&portrait);
    assert!(landscape.width() > landscape.height());

    let reader = reader(Arc::new(RecordingEngine::default()));
    let request = CaptureRequest::default();
    let upright = reader.preprocess(portrait, &request).unwrap();
    let turned = reader.preprocess(landscape, &request).unwrap();

    assert_eq!(turned.dimensions(), (1100, 3300));
    assert!(
        turned.as_raw() == upright.as_raw(),
        "rotated landscape crop must preprocess to the portrait buffer"
    );
}

#[test]
fn horizontal_hint_keeps_landscape_and_switches_profile() {
    let engine = Arc::new(RecordingEngine::default());
    let request = CaptureRequest {
        region: CropRegion::new(100, 100, 600, 200),
        vertical: false,
        mode: RecognitionMode::Line,
    };
    let analysis = reader(engine.clone()).analyze(page(), &request).unwrap();

    assert_eq!(analysis.japanese, "");
    assert_eq!(analysis.readings.hiragana, "");
    let calls = engine.calls.lock().unwrap();
    assert_eq!(
        calls.as_slice(),
        &[(3300, 1100, ScriptProfile::Horizontal, PageLayout::SingleLine)]
    );
}
