//! LLM translation backend.
//!
//! Talks to any OpenAI-compatible chat-completions endpoint. A batch is
//! drained by a bounded pool of worker tasks sharing an atomic cursor over
//! the input array; each worker writes into its own result slot, so order
//! is preserved without coordination beyond the cursor. Token usage and an
//! estimated cost accumulate per response and reset at the start of every
//! batch.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::debug;

use crate::core::errors::{Result, TranslateError};
use crate::core::settings::AppSettings;
use crate::translator::{language_name, TranslatorUsage};

/// Default system prompt; overridable per run and via settings.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a professional translator. Translate the following text accurately and naturally. Output only the translated text, nothing else. Preserve any formatting, numbers, and special characters.";

/// Number of concurrent in-flight requests per batch.
const WORKER_POOL_SIZE: usize = 5;

const TEMPERATURE: f64 = 0.3;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug)]
struct LlmInner {
    client: reqwest::Client,
    endpoint: String,
    api_token: String,
    model: String,
    system_prompt: String,
    price_per_million: (f64, f64),
    usage: Mutex<TranslatorUsage>,
}

/// Chat-completion translator with a bounded worker pool.
#[derive(Debug)]
pub struct LlmTranslator {
    inner: Arc<LlmInner>,
}

impl LlmTranslator {
    /// Builds the translator from settings, resolving the provider's base
    /// URL and validating the model.
    pub fn from_settings(settings: &AppSettings, custom_prompt: Option<&str>) -> Result<Self> {
        let base_url = if !settings.llm_base_url.is_empty() {
            settings.llm_base_url.trim_end_matches('/').to_string()
        } else {
            match settings.llm_provider.as_str() {
                "openai" => "https://api.openai.com/v1".to_string(),
                "deepseek" => "https://api.deepseek.com/v1".to_string(),
                "openrouter" => "https://openrouter.ai/api/v1".to_string(),
                "ollama" => "http://localhost:11434/v1".to_string(),
                "custom" => {
                    return Err(TranslateError::config(
                        "custom LLM provider requires llmBaseUrl",
                    ));
                }
                other => {
                    return Err(TranslateError::config(format!(
                        "unknown LLM provider '{other}'"
                    )));
                }
            }
        };
        if settings.llm_model.is_empty() {
            return Err(TranslateError::config(
                "llmModel must be set for the LLM translator",
            ));
        }

        let system_prompt = custom_prompt
            .map(str::to_string)
            .filter(|prompt| !prompt.is_empty())
            .or_else(|| {
                (!settings.custom_prompt.is_empty()).then(|| settings.custom_prompt.clone())
            })
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        Ok(Self {
            inner: Arc::new(LlmInner {
                client: reqwest::Client::new(),
                endpoint: format!("{base_url}/chat/completions"),
                api_token: settings.llm_api_token.clone(),
                model: settings.llm_model.clone(),
                system_prompt,
                price_per_million: price_per_million(&settings.llm_model),
                usage: Mutex::new(TranslatorUsage::default()),
            }),
        })
    }

    /// Translates one text.
    pub async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String> {
        self.inner.translate_one(text, from, to).await
    }

    /// Translates a batch with up to five in-flight requests.
    ///
    /// Workers atomically advance a shared cursor and fill distinct result
    /// slots; the returned vector is index-aligned with the input.
    pub async fn translate_batch(
        &self,
        texts: &[String],
        from: &str,
        to: &str,
    ) -> Result<Vec<String>> {
        self.inner.reset_usage()?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let texts = Arc::new(texts.to_vec());
        let slots: Arc<Mutex<Vec<Option<String>>>> =
            Arc::new(Mutex::new(vec![None; texts.len()]));
        let cursor = Arc::new(AtomicUsize::new(0));
        let from = from.to_string();
        let to = to.to_string();

        let mut workers: JoinSet<Result<()>> = JoinSet::new();
        for _ in 0..WORKER_POOL_SIZE.min(texts.len()) {
            let inner = self.inner.clone();
            let texts = texts.clone();
            let slots = slots.clone();
            let cursor = cursor.clone();
            let from = from.clone();
            let to = to.clone();
            workers.spawn(async move {
                loop {
                    let index = cursor.fetch_add(1, Ordering::SeqCst);
                    if index >= texts.len() {
                        return Ok(());
                    }
                    let translated = inner.translate_one(&texts[index], &from, &to).await?;
                    let mut slots = slots.lock().map_err(|_| {
                        TranslateError::translation("result slots poisoned".to_string())
                    })?;
                    slots[index] = Some(translated);
                }
            });
        }

        while let Some(joined) = workers.join_next().await {
            joined.map_err(|e| {
                TranslateError::translation(format!("translation worker panicked: {e}"))
            })??;
        }

        let slots = Arc::try_unwrap(slots)
            .map_err(|_| TranslateError::translation("worker still holds results".to_string()))?
            .into_inner()
            .map_err(|_| TranslateError::translation("result slots poisoned".to_string()))?;
        slots
            .into_iter()
            .map(|slot| {
                slot.ok_or_else(|| {
                    TranslateError::translation("batch finished with an empty slot".to_string())
                })
            })
            .collect()
    }

    /// Usage of the most recent completed batch.
    pub fn usage(&self) -> TranslatorUsage {
        self.inner
            .usage
            .lock()
            .map(|usage| *usage)
            .unwrap_or_default()
    }
}

impl LlmInner {
    fn reset_usage(&self) -> Result<()> {
        let mut usage = self
            .usage
            .lock()
            .map_err(|_| TranslateError::translation("usage counters poisoned".to_string()))?;
        *usage = TranslatorUsage::default();
        Ok(())
    }

    fn record_usage(&self, response: &ChatUsage) {
        if let Ok(mut usage) = self.usage.lock() {
            let (input_rate, output_rate) = self.price_per_million;
            usage.input_tokens += response.prompt_tokens;
            usage.output_tokens += response.completion_tokens;
            usage.total_cost += response.prompt_tokens as f64 * input_rate / 1_000_000.0
                + response.completion_tokens as f64 * output_rate / 1_000_000.0;
        }
    }

    async fn translate_one(&self, text: &str, from: &str, to: &str) -> Result<String> {
        let source = if from.is_empty() {
            "auto-detect"
        } else {
            language_name(from)
        };
        let target = language_name(to);

        let request = ChatRequest {
            model: &self.model,
            temperature: TEMPERATURE,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: self.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user",
                    content: format!("Translate from {source} to {target}:\n\n{text}"),
                },
            ],
        };

        let mut call = self.client.post(&self.endpoint).json(&request);
        if !self.api_token.is_empty() {
            call = call.bearer_auth(&self.api_token);
        }
        let response = call
            .send()
            .await
            .map_err(|e| TranslateError::translation(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslateError::translation(format!(
                "provider returned {status}: {body}"
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| TranslateError::translation(format!("malformed response: {e}")))?;
        if let Some(usage) = &chat.usage {
            self.record_usage(usage);
        }

        match chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
        {
            Some(translated) => Ok(translated),
            None => {
                debug!("Provider returned no text, passing input through");
                Ok(text.to_string())
            }
        }
    }
}

/// USD per million input/output tokens for models with known pricing;
/// unknown models translate fine but report zero cost.
fn price_per_million(model: &str) -> (f64, f64) {
    match model {
        m if m.starts_with("gpt-4o-mini") => (0.15, 0.60),
        m if m.starts_with("gpt-4o") => (2.50, 10.00),
        m if m.starts_with("deepseek-chat") => (0.27, 1.10),
        m if m.starts_with("deepseek-reasoner") => (0.55, 2.19),
        _ => (0.0, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::TranslatorKind;

    fn llm_settings() -> AppSettings {
        AppSettings {
            translator_type: TranslatorKind::Llm,
            llm_provider: "openai".into(),
            llm_model: "gpt-4o-mini".into(),
            llm_api_token: "sk-test".into(),
            ..AppSettings::default()
        }
    }

    #[test]
    fn provider_table_resolves_endpoint() {
        let translator = LlmTranslator::from_settings(&llm_settings(), None).unwrap();
        assert_eq!(
            translator.inner.endpoint,
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn base_url_override_wins() {
        let mut settings = llm_settings();
        settings.llm_base_url = "https://proxy.example.com/v1/".into();
        let translator = LlmTranslator::from_settings(&settings, None).unwrap();
        assert_eq!(
            translator.inner.endpoint,
            "https://proxy.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let mut settings = llm_settings();
        settings.llm_provider = "skynet".into();
        let err = LlmTranslator::from_settings(&settings, None).unwrap_err();
        assert!(matches!(err, TranslateError::ConfigInvalid { .. }));
    }

    #[test]
    fn custom_provider_requires_base_url() {
        let mut settings = llm_settings();
        settings.llm_provider = "custom".into();
        assert!(LlmTranslator::from_settings(&settings, None).is_err());
    }

    #[test]
    fn empty_model_is_rejected() {
        let mut settings = llm_settings();
        settings.llm_model = String::new();
        assert!(LlmTranslator::from_settings(&settings, None).is_err());
    }

    #[test]
    fn prompt_priority_is_run_then_settings_then_default() {
        let mut settings = llm_settings();
        settings.custom_prompt = "from settings".into();
        let translator = LlmTranslator::from_settings(&settings, Some("from run")).unwrap();
        assert_eq!(translator.inner.system_prompt, "from run");

        let translator = LlmTranslator::from_settings(&settings, None).unwrap();
        assert_eq!(translator.inner.system_prompt, "from settings");

        settings.custom_prompt = String::new();
        let translator = LlmTranslator::from_settings(&settings, None).unwrap();
        assert_eq!(translator.inner.system_prompt, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn pricing_covers_known_models_only() {
        assert_eq!(price_per_million("gpt-4o-mini"), (0.15, 0.60));
        assert_eq!(price_per_million("gpt-4o"), (2.50, 10.00));
        assert_eq!(price_per_million("mystery-model"), (0.0, 0.0));
    }

    #[test]
    fn usage_math_matches_price_table() {
        let translator = LlmTranslator::from_settings(&llm_settings(), None).unwrap();
        translator.inner.record_usage(&ChatUsage {
            prompt_tokens: 1_000_000,
            completion_tokens: 500_000,
        });
        let usage = translator.usage();
        assert_eq!(usage.input_tokens, 1_000_000);
        assert_eq!(usage.output_tokens, 500_000);
        assert!((usage.total_cost - (0.15 + 0.30)).abs() < 1e-9);
    }
}
