use anyhow::{Context, Result, anyhow};
use std::io::Write;
use std::process::{Command, Stdio};

use super::PhoneticConverter;

pub const DEFAULT_COMMAND: &str = "kakasi";

/// Phonetic converter backed by the `kakasi` command (kanji and katakana to hiragana).
#[derive(Debug, Clone)]
pub struct Kakasi {
    command: String,
}

impl Default for Kakasi {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND)
    }
}

impl Kakasi {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl PhoneticConverter for Kakasi {
    fn to_hiragana(&self, text: &str) -> Result<String> {
        let mut child = Command::new(&self.command)
            .args(["-i", "utf8", "-o", "utf8", "-JH", "-KH"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to run {} (is it installed?)", self.command))?;
        let stdin = child.stdin.take();
        // stdin is fed from its own thread so a full stdout pipe cannot stall the writer
        let output = std::thread::scope(|scope| -> Result<std::process::Output> {
            let writer = scope.spawn(move || -> Result<()> {
                if let Some(mut stdin) = stdin {
                    stdin
                        .write_all(text.as_bytes())
                        .with_context(|| "failed to write text to kakasi")?;
                }
                Ok(())
            });
            let output = child
                .wait_with_output()
                .with_context(|| "failed to read kakasi output");
            let written = writer
                .join()
                .map_err(|_| anyhow!("kakasi writer thread panicked"))?;
            written?;
            output
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("kakasi failed: {}", stderr.trim()));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.trim_end_matches(['\r', '\n']).to_string())
    }
}
