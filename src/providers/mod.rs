use std::future::Future;
use std::pin::Pin;

mod openai;

pub use openai::{DEFAULT_MODEL, OpenAI};

/// Outcome of a single text-generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Text(String),
    Failed(String),
}

pub type CompletionFuture = Pin<Box<dyn Future<Output = Completion> + Send>>;

/// External text-generation service: one prompt in, one completion (or failure) out.
pub trait TextGenerator: Send + Sync {
    fn complete(&self, prompt: String) -> CompletionFuture;
}

/// API key precedence: explicit override, configured value, then `OPENAI_API_KEY`.
pub fn resolve_key(override_key: Option<&str>, configured: Option<&str>) -> Option<String> {
    override_key
        .or(configured)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| get_env("OPENAI_API_KEY"))
}

fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
