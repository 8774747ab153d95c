//! Translation backends.
//!
//! Two variants behind one tagged dispatch: a free web service translated
//! one text at a time with rate-limit pacing, and an LLM provider with a
//! bounded worker pool and usage accounting. Each variant owns its own
//! state (delay, counters); a small enum beats open trait inheritance here
//! because the set is closed and construction is settings-driven.

pub mod google;
pub mod llm;

use crate::core::errors::Result;
use crate::core::settings::{AppSettings, TranslatorKind};

pub use google::GoogleTranslator;
pub use llm::LlmTranslator;

/// Token and cost totals for the most recent batch (additive across a run
/// when summed by the caller). All zero for the Google variant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TranslatorUsage {
    /// Prompt tokens consumed.
    pub input_tokens: u64,
    /// Completion tokens produced.
    pub output_tokens: u64,
    /// Estimated cost in USD.
    pub total_cost: f64,
}

impl TranslatorUsage {
    /// Adds another usage record into this one.
    pub fn add(&mut self, other: &TranslatorUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_cost += other.total_cost;
    }
}

/// A configured translation backend.
pub enum Translator {
    /// Free web translation service.
    Google(GoogleTranslator),
    /// Chat-completion LLM provider.
    Llm(LlmTranslator),
}

impl Translator {
    /// Builds a translator from application settings.
    ///
    /// `custom_prompt` overrides the settings' prompt for this run.
    pub fn from_settings(settings: &AppSettings, custom_prompt: Option<&str>) -> Result<Self> {
        match settings.translator_type {
            TranslatorKind::Google => Ok(Translator::Google(GoogleTranslator::new())),
            TranslatorKind::Llm => Ok(Translator::Llm(LlmTranslator::from_settings(
                settings,
                custom_prompt,
            )?)),
        }
    }

    /// Translates one text.
    pub async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String> {
        match self {
            Translator::Google(google) => google.translate(text, from, to).await,
            Translator::Llm(llm) => llm.translate(text, from, to).await,
        }
    }

    /// Translates a batch, preserving input order and length.
    pub async fn translate_batch(
        &self,
        texts: &[String],
        from: &str,
        to: &str,
    ) -> Result<Vec<String>> {
        match self {
            Translator::Google(google) => google.translate_batch(texts, from, to).await,
            Translator::Llm(llm) => llm.translate_batch(texts, from, to).await,
        }
    }

    /// Usage of the most recent completed batch.
    pub fn usage(&self) -> TranslatorUsage {
        match self {
            Translator::Google(_) => TranslatorUsage::default(),
            Translator::Llm(llm) => llm.usage(),
        }
    }
}

/// Expands a language code to the plain-English name LLM prompts use.
/// Unknown codes pass through unchanged.
pub fn language_name(code: &str) -> &str {
    match code {
        "zh-CN" => "Simplified Chinese",
        "zh-TW" => "Traditional Chinese",
        "ja" => "Japanese",
        "ko" => "Korean",
        "fr" => "French",
        "de" => "German",
        "es" => "Spanish",
        "en" => "English",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_expand() {
        assert_eq!(language_name("zh-CN"), "Simplified Chinese");
        assert_eq!(language_name("ja"), "Japanese");
    }

    #[test]
    fn unknown_codes_pass_through() {
        assert_eq!(language_name("pt-BR"), "pt-BR");
    }

    #[test]
    fn usage_is_additive() {
        let mut total = TranslatorUsage::default();
        total.add(&TranslatorUsage {
            input_tokens: 100,
            output_tokens: 40,
            total_cost: 0.002,
        });
        total.add(&TranslatorUsage {
            input_tokens: 50,
            output_tokens: 10,
            total_cost: 0.001,
        });
        assert_eq!(total.input_tokens, 150);
        assert_eq!(total.output_tokens, 50);
        assert!((total.total_cost - 0.003).abs() < 1e-9);
    }

    #[test]
    fn google_variant_reports_zero_usage() {
        let translator = Translator::Google(GoogleTranslator::new());
        assert_eq!(translator.usage(), TranslatorUsage::default());
    }
}
