use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tera::{Context as TeraContext, Tera};
use tracing::{error, info};

use crate::providers::{Completion, OpenAI, TextGenerator};
use crate::settings::ExplainSettings;

const TUTOR_PROMPT: &str = include_str!("prompts/tutor_prompt.tera");
const OFFLINE_TEMPLATE: &str = include_str!("prompts/offline_template.tera");

pub const NO_TEXT_MESSAGE: &str = "No Japanese text provided.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Explanation {
    pub ok: bool,
    pub explanation: String,
}

impl Explanation {
    fn ok(explanation: String) -> Self {
        Self {
            ok: true,
            explanation,
        }
    }

    fn failed(explanation: String) -> Self {
        Self {
            ok: false,
            explanation,
        }
    }
}

/// Produces study notes for recognized text.
///
/// With a generator the notes come from a single completion request; without one a
/// static Markdown worksheet is returned.
#[derive(Clone, Default)]
pub struct Explainer {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl Explainer {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { generator }
    }

    pub fn offline() -> Self {
        Self::default()
    }

    pub fn with_generator(generator: impl TextGenerator + 'static) -> Self {
        let generator: Arc<dyn TextGenerator> = Arc::new(generator);
        Self::new(Some(generator))
    }

    /// Builds an OpenAI-backed explainer when `api_key` is present, offline otherwise.
    pub fn from_settings(settings: &ExplainSettings, api_key: Option<String>) -> Self {
        let Some(key) = api_key else {
            return Self::offline();
        };
        let mut provider = OpenAI::new(key)
            .with_model(settings.model.clone())
            .with_temperature(settings.temperature)
            .with_timeout(Duration::from_secs(settings.timeout_secs));
        if let Some(base_url) = settings.base_url.as_deref() {
            provider = provider.with_base_url(base_url);
        }
        info!("explanations via OpenAI model {}", provider.model());
        Self::with_generator(provider)
    }

    pub fn is_online(&self) -> bool {
        self.generator.is_some()
    }

    pub async fn explain(&self, japanese: &str, context_hint: &str) -> Explanation {
        let text = japanese.trim();
        if text.is_empty() {
            return Explanation::failed(NO_TEXT_MESSAGE.to_string());
        }

        let Some(generator) = &self.generator else {
            return match render_offline_template(text) {
                Ok(template) => Explanation::ok(template),
                Err(err) => {
                    error!("failed to render offline template: {:#}", err);
                    Explanation::ok(text.to_string())
                }
            };
        };

        let prompt = match render_tutor_prompt(text, context_hint) {
            Ok(prompt) => prompt,
            Err(err) => return Explanation::failed(format!("LLM call failed: {:#}", err)),
        };
        match generator.complete(prompt).await {
            Completion::Text(explanation) => Explanation::ok(explanation),
            Completion::Failed(reason) => Explanation::failed(format!("LLM call failed: {}", reason)),
        }
    }
}

pub fn render_tutor_prompt(japanese: &str, context_hint: &str) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("japanese", japanese);
    context.insert("context_hint", context_hint);
    Tera::one_off(TUTOR_PROMPT, &context, false).with_context(|| "failed to render tutor prompt")
}

pub fn render_offline_template(japanese: &str) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("japanese", japanese);
    Tera::one_off(OFFLINE_TEMPLATE, &context, false)
        .with_context(|| "failed to render offline template")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::CompletionFuture;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedGenerator {
        reply: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl TextGenerator for ScriptedGenerator {
        fn complete(&self, prompt: String) -> CompletionFuture {
            self.prompts.lock().expect("prompts").push(prompt);
            let completion = match &self.reply {
                Some(text) => Completion::Text(text.clone()),
                None => Completion::Failed("timed out".to_string()),
            };
            Box::pin(async move { completion })
        }
    }

    #[tokio::test]
    async fn empty_text_is_rejected_without_a_call() {
        let generator = Arc::new(ScriptedGenerator {
            reply: Some("unused".to_string()),
            ..Default::default()
        });
        let online = Explainer::new(Some(generator.clone() as Arc<dyn TextGenerator>));
        for explainer in [Explainer::offline(), online] {
            let explanation = explainer.explain("  \n", "bubble").await;
            assert_eq!(
                explanation,
                Explanation {
                    ok: false,
                    explanation: NO_TEXT_MESSAGE.to_string()
                }
            );
        }
        assert!(generator.prompts.lock().expect("prompts").is_empty());
    }

    #[tokio::test]
    async fn offline_template_contains_the_text() {
        let explanation = Explainer::offline().explain(" やめてくれ ", "").await;
        assert!(explanation.ok);
        assert!(explanation.explanation.contains("“やめてくれ”"));
        assert!(explanation.explanation.contains("**Vocab:**"));
    }

    #[tokio::test]
    async fn generator_reply_is_passed_through() {
        let generator = Arc::new(ScriptedGenerator {
            reply: Some("**Literal:** stop it".to_string()),
            ..Default::default()
        });
        let explainer = Explainer::new(Some(generator.clone() as Arc<dyn TextGenerator>));
        let explanation = explainer.explain("やめてくれ", "shouted").await;
        assert_eq!(explanation, Explanation::ok("**Literal:** stop it".to_string()));

        let prompts = generator.prompts.lock().expect("prompts");
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Japanese: やめてくれ"));
        assert!(prompts[0].contains("Context (optional): shouted"));
    }

    #[tokio::test]
    async fn generator_failure_is_recovered() {
        let explainer = Explainer::with_generator(ScriptedGenerator::default());
        let explanation = explainer.explain("やめてくれ", "").await;
        assert_eq!(
            explanation,
            Explanation::failed("LLM call failed: timed out".to_string())
        );
    }

    #[test]
    fn settings_without_key_stay_offline() {
        let settings = ExplainSettings::default();
        assert!(!Explainer::from_settings(&settings, None).is_online());
        assert!(Explainer::from_settings(&settings, Some("sk-test".to_string())).is_online());
    }

    #[test]
    fn prompt_lists_all_five_sections() {
        let prompt = render_tutor_prompt("猫", "").expect("prompt");
        for marker in ["1) Literal", "2) Natural", "3) Key grammar", "4) Tone", "5) Useful vocab"] {
            assert!(prompt.contains(marker), "missing {}", marker);
        }
    }
}
