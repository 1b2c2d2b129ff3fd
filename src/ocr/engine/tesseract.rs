use anyhow::{Context, Result, anyhow};
use image::GrayImage;
use std::io::Write;
use std::process::Command;
use tracing::debug;

use super::RecognitionEngine;
use crate::ocr::{PageLayout, ScriptProfile};

pub const DEFAULT_COMMAND: &str = "tesseract";
pub const DEFAULT_VERTICAL_LANG: &str = "jpn_vert";
pub const DEFAULT_HORIZONTAL_LANG: &str = "jpn";

/// Recognition engine backed by the `tesseract` command line tool.
#[derive(Debug, Clone)]
pub struct Tesseract {
    command: String,
    vertical_lang: String,
    horizontal_lang: String,
}

impl Default for Tesseract {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            vertical_lang: DEFAULT_VERTICAL_LANG.to_string(),
            horizontal_lang: DEFAULT_HORIZONTAL_LANG.to_string(),
        }
    }
}

impl Tesseract {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn with_languages(
        mut self,
        vertical_lang: impl Into<String>,
        horizontal_lang: impl Into<String>,
    ) -> Self {
        self.vertical_lang = vertical_lang.into();
        self.horizontal_lang = horizontal_lang.into();
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn language_for(&self, profile: ScriptProfile) -> &str {
        match profile {
            ScriptProfile::Vertical => &self.vertical_lang,
            ScriptProfile::Horizontal => &self.horizontal_lang,
        }
    }

    /// Profile languages that the installed tesseract does not know about.
    pub fn missing_languages(&self) -> Result<Vec<String>> {
        let available = list_tesseract_languages(&self.command)?;
        let mut missing = Vec::new();
        for lang in [&self.vertical_lang, &self.horizontal_lang] {
            for part in lang.split('+') {
                let part = part.trim();
                if !part.is_empty() && !available.iter().any(|value| value == part) {
                    missing.push(part.to_string());
                }
            }
        }
        missing.dedup();
        Ok(missing)
    }
}

impl RecognitionEngine for Tesseract {
    fn recognize(
        &self,
        image: &GrayImage,
        profile: ScriptProfile,
        layout: PageLayout,
    ) -> Result<String> {
        let mut tmp = tempfile::Builder::new()
            .prefix("urzasight-")
            .suffix(".png")
            .tempfile()
            .with_context(|| "failed to create temp file for OCR")?;
        image
            .write_to(&mut tmp, image::ImageFormat::Png)
            .with_context(|| "failed to write temp image for OCR")?;
        tmp.flush()
            .with_context(|| "failed to flush temp image for OCR")?;

        let lang = self.language_for(profile);
        debug!(
            "running {} -l {} --psm {} on {}x{}",
            self.command,
            lang,
            layout.psm(),
            image.width(),
            image.height()
        );
        let output = Command::new(&self.command)
            .arg(tmp.path())
            .arg("stdout")
            .arg("-l")
            .arg(lang)
            .arg("--oem")
            .arg("1")
            .arg("--psm")
            .arg(layout.psm().to_string())
            .output()
            .with_context(|| format!("failed to run {} (is it installed?)", self.command))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("tesseract failed: {}", stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

pub fn list_tesseract_languages(command: &str) -> Result<Vec<String>> {
    let output = Command::new(command)
        .arg("--list-langs")
        .output()
        .with_context(|| format!("failed to run {} --list-langs", command))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("tesseract --list-langs failed: {}", stderr.trim()));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_language_list(&stdout))
}

fn parse_language_list(stdout: &str) -> Vec<String> {
    let mut langs = Vec::new();
    for (idx, line) in stdout.lines().enumerate() {
        if idx == 0 {
            continue;
        }
        let value = line.trim();
        if !value.is_empty() {
            langs.push(value.to_string());
        }
    }
    langs
}
