use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::ocr::{PreprocessParams, Tesseract};
use crate::providers::DEFAULT_MODEL;
use crate::reading::Kakasi;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub ocr: OcrSettings,
    pub preprocess: PreprocessParams,
    pub explain: ExplainSettings,
    pub server: ServerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ocr: OcrSettings::default(),
            preprocess: PreprocessParams::default(),
            explain: ExplainSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

/// Listen address, body limit and UI file locations of the HTTP service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub addr: String,
    pub max_body_bytes: usize,
    pub index: PathBuf,
    pub static_dir: PathBuf,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: DEFAULT_SERVER_ADDR.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            index: PathBuf::from("index.html"),
            static_dir: PathBuf::from("static"),
        }
    }
}

/// External commands used for recognition and readings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrSettings {
    pub tesseract: String,
    pub vertical_lang: String,
    pub horizontal_lang: String,
    pub kakasi: String,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            tesseract: "tesseract".to_string(),
            vertical_lang: "jpn_vert".to_string(),
            horizontal_lang: "jpn".to_string(),
            kakasi: "kakasi".to_string(),
        }
    }
}

impl OcrSettings {
    pub fn tesseract(&self) -> Tesseract {
        Tesseract::new(&self.tesseract).with_languages(&self.vertical_lang, &self.horizontal_lang)
    }

    pub fn kakasi(&self) -> Kakasi {
        Kakasi::new(&self.kakasi)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExplainSettings {
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub api_key: Option<String>,
}

impl Default for ExplainSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            temperature: 0.3,
            timeout_secs: 60,
            api_key: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    ocr: Option<OcrSection>,
    preprocess: Option<PreprocessSection>,
    explain: Option<ExplainSection>,
    server: Option<ServerSection>,
}

#[derive(Debug, Default, Deserialize)]
struct OcrSection {
    tesseract: Option<String>,
    vertical_lang: Option<String>,
    horizontal_lang: Option<String>,
    kakasi: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PreprocessSection {
    min_side: Option<u32>,
    max_pixels: Option<u64>,
    clahe_clip_limit: Option<f32>,
    clahe_tiles: Option<u32>,
    bilateral_diameter: Option<u32>,
    bilateral_sigma_color: Option<f32>,
    bilateral_sigma_space: Option<f32>,
    threshold_block: Option<u32>,
    threshold_offset: Option<f32>,
    unsharp_sigma: Option<f32>,
    unsharp_amount: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct ExplainSection {
    model: Option<String>,
    base_url: Option<String>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    addr: Option<String>,
    max_body_bytes: Option<usize>,
    index: Option<String>,
    static_dir: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            debug!("merging settings from {}", path.display());
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(ocr) = incoming.ocr {
            if let Some(command) = non_blank(ocr.tesseract) {
                self.ocr.tesseract = command;
            }
            if let Some(lang) = non_blank(ocr.vertical_lang) {
                self.ocr.vertical_lang = lang;
            }
            if let Some(lang) = non_blank(ocr.horizontal_lang) {
                self.ocr.horizontal_lang = lang;
            }
            if let Some(command) = non_blank(ocr.kakasi) {
                self.ocr.kakasi = command;
            }
        }
        if let Some(section) = incoming.preprocess {
            self.preprocess.merge(section);
        }
        if let Some(explain) = incoming.explain {
            if let Some(model) = non_blank(explain.model) {
                self.explain.model = model;
            }
            if let Some(base_url) = non_blank(explain.base_url) {
                self.explain.base_url = Some(base_url);
            }
            if let Some(temperature) = explain.temperature
                && (0.0..=2.0).contains(&temperature)
            {
                self.explain.temperature = temperature;
            }
            if let Some(timeout) = explain.timeout_secs
                && timeout > 0
            {
                self.explain.timeout_secs = timeout;
            }
            if let Some(key) = non_blank(explain.api_key) {
                self.explain.api_key = Some(key);
            }
        }
        if let Some(server) = incoming.server {
            if let Some(addr) = non_blank(server.addr) {
                self.server.addr = addr;
            }
            if let Some(limit) = server.max_body_bytes.filter(|value| *value > 0) {
                self.server.max_body_bytes = limit;
            }
            if let Some(index) = non_blank(server.index) {
                self.server.index = PathBuf::from(index);
            }
            if let Some(dir) = non_blank(server.static_dir) {
                self.server.static_dir = PathBuf::from(dir);
            }
        }
    }
}

impl PreprocessParams {
    fn merge(&mut self, section: PreprocessSection) {
        let positive = |value: Option<f32>| value.filter(|value| *value > 0.0);
        if let Some(min_side) = section.min_side.filter(|value| *value > 0) {
            self.min_side = min_side;
        }
        if let Some(max_pixels) = section.max_pixels.filter(|value| *value > 0) {
            self.max_pixels = max_pixels;
        }
        if let Some(limit) = positive(section.clahe_clip_limit) {
            self.clahe_clip_limit = limit;
        }
        if let Some(tiles) = section.clahe_tiles.filter(|value| *value > 0) {
            self.clahe_tiles = tiles;
        }
        if let Some(diameter) = section.bilateral_diameter.filter(|value| *value > 0) {
            self.bilateral_diameter = diameter;
        }
        if let Some(sigma) = positive(section.bilateral_sigma_color) {
            self.bilateral_sigma_color = sigma;
        }
        if let Some(sigma) = positive(section.bilateral_sigma_space) {
            self.bilateral_sigma_space = sigma;
        }
        // block must stay odd and at least 3
        if let Some(block) = section
            .threshold_block
            .filter(|value| *value >= 3 && value % 2 == 1)
        {
            self.threshold_block = block;
        }
        if let Some(offset) = section.threshold_offset {
            self.threshold_offset = offset;
        }
        if let Some(sigma) = positive(section.unsharp_sigma) {
            self.unsharp_sigma = sigma;
        }
        if let Some(amount) = section.unsharp_amount.filter(|value| *value >= 0.0) {
            self.unsharp_amount = amount;
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".urzasight"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;

    fn parse(content: &str) -> SettingsFile {
        toml::from_str(content).expect("parse settings")
    }

    #[test]
    fn embedded_defaults_match_built_in_defaults() {
        let mut settings = Settings::default();
        settings.merge(parse(DEFAULT_SETTINGS_TOML));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn merge_overrides_valid_values_only() {
        let mut settings = Settings::default();
        settings.merge(parse(
            r#"
[ocr]
tesseract = "/opt/tesseract/bin/tesseract"
vertical_lang = ""

[preprocess]
min_side = 0
max_pixels = 0
threshold_block = 34
clahe_clip_limit = 3.5
unsharp_sigma = -1.0

[explain]
model = "gpt-4o"
temperature = 7.0
timeout_secs = 15

[server]
addr = "0.0.0.0:9000"
max_body_bytes = 67108864
static_dir = "/srv/urzasight/static"
"#,
        ));
        assert_eq!(settings.ocr.tesseract, "/opt/tesseract/bin/tesseract");
        assert_eq!(settings.ocr.vertical_lang, "jpn_vert");
        assert_eq!(settings.preprocess.min_side, 1100);
        assert_eq!(settings.preprocess.max_pixels, 40_000_000);
        assert_eq!(settings.preprocess.threshold_block, 35);
        assert_eq!(settings.preprocess.clahe_clip_limit, 3.5);
        assert_eq!(settings.preprocess.unsharp_sigma, 1.0);
        assert_eq!(settings.explain.model, "gpt-4o");
        assert_eq!(settings.explain.temperature, 0.3);
        assert_eq!(settings.explain.timeout_secs, 15);
        assert_eq!(settings.server.addr, "0.0.0.0:9000");
        assert_eq!(settings.server.max_body_bytes, 64 * 1024 * 1024);
        assert_eq!(settings.server.index, PathBuf::from("index.html"));
        assert_eq!(
            settings.server.static_dir,
            PathBuf::from("/srv/urzasight/static")
        );
    }

    #[test]
    fn home_settings_file_is_created() {
        with_temp_home(|home| {
            let settings = load_settings(None).expect("load");
            assert_eq!(settings.explain.model, DEFAULT_MODEL);
            let written = home.join(".urzasight").join("settings.toml");
            assert_eq!(
                fs::read_to_string(written).expect("read"),
                DEFAULT_SETTINGS_TOML
            );
        });
    }

    #[test]
    fn explicit_settings_file_is_applied_last() {
        with_temp_home(|home| {
            let local = home.join(".urzasight");
            fs::create_dir_all(&local).expect("mkdir");
            fs::write(
                local.join("settings.local.toml"),
                "[explain]\nmodel = \"from-home\"\n",
            )
            .expect("write");
            let extra = home.join("extra.toml");
            fs::write(&extra, "[explain]\nmodel = \"from-extra\"\n").expect("write");

            let settings = load_settings(Some(&extra)).expect("load");
            assert_eq!(settings.explain.model, "from-extra");
        });
    }

    #[test]
    fn missing_explicit_settings_file_is_an_error() {
        with_temp_home(|home| {
            let err = load_settings(Some(&home.join("nope.toml"))).unwrap_err();
            assert!(err.to_string().contains("settings file not found"));
        });
    }
}
