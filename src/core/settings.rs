//! Application settings.
//!
//! Settings are read from a small TOML document with camelCase keys. Unknown
//! keys are ignored and missing keys take defaults, so older settings files
//! keep working as options are added.

use std::path::Path;

use serde::Deserialize;

use crate::core::errors::{Result, TranslateError};

/// Which translator backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslatorKind {
    /// Free web translation service, one text at a time.
    #[default]
    Google,
    /// Chat-completion LLM provider with usage accounting.
    Llm,
}

/// User-facing options consumed by the pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Translation backend.
    pub translator_type: TranslatorKind,
    /// BCP-47-ish target language code, e.g. `zh-CN`.
    pub target_language: String,
    /// LLM provider id: `openai`, `deepseek`, `openrouter`, `ollama`, or
    /// `custom`.
    pub llm_provider: String,
    /// Model identifier passed through to the provider.
    pub llm_model: String,
    /// API token; may stay empty for local providers.
    pub llm_api_token: String,
    /// Overrides the provider's default base URL when non-empty.
    pub llm_base_url: String,
    /// System prompt override; empty means the built-in default.
    pub custom_prompt: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            translator_type: TranslatorKind::Google,
            target_language: "zh-CN".to_string(),
            llm_provider: String::new(),
            llm_model: String::new(),
            llm_api_token: String::new(),
            llm_base_url: String::new(),
            custom_prompt: String::new(),
        }
    }
}

impl AppSettings {
    /// Loads settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| TranslateError::asset(path.display().to_string(), e.to_string()))?;
        toml::from_str(&raw)
            .map_err(|e| TranslateError::config(format!("settings file: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_for_missing_keys() {
        let settings: AppSettings = toml::from_str("").unwrap();
        assert_eq!(settings.translator_type, TranslatorKind::Google);
        assert_eq!(settings.target_language, "zh-CN");
        assert!(settings.custom_prompt.is_empty());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let settings: AppSettings = toml::from_str(
            r#"
            translatorType = "llm"
            targetLanguage = "ja"
            windowWidth = 1280
            theme = "dark"
            "#,
        )
        .unwrap();
        assert_eq!(settings.translator_type, TranslatorKind::Llm);
        assert_eq!(settings.target_language, "ja");
    }

    #[test]
    fn llm_fields_parse() {
        let settings: AppSettings = toml::from_str(
            r#"
            translatorType = "llm"
            llmProvider = "openai"
            llmModel = "gpt-4o-mini"
            llmApiToken = "sk-test"
            "#,
        )
        .unwrap();
        assert_eq!(settings.llm_provider, "openai");
        assert_eq!(settings.llm_model, "gpt-4o-mini");
    }
}
