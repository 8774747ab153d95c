//! Free web translation backend.
//!
//! Uses the unauthenticated `translate_a/single` endpoint. Requests run
//! strictly one at a time with a fixed delay between them to stay under the
//! service's informal rate limits; there is no usage accounting because the
//! service is free.

use std::time::Duration;

use serde_json::Value;
use tokio::time::sleep;

use crate::core::errors::{Result, TranslateError};

const ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Pause between consecutive requests.
const REQUEST_DELAY: Duration = Duration::from_millis(100);

/// Sequential free-web translator.
#[derive(Debug, Default)]
pub struct GoogleTranslator {
    client: reqwest::Client,
}

impl GoogleTranslator {
    /// Creates a translator with a fresh HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Translates one text.
    pub async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String> {
        let source = if from.is_empty() { "auto" } else { from };
        let response = self
            .client
            .get(ENDPOINT)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", to),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| TranslateError::translation(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::translation(format!(
                "translation service returned {status}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TranslateError::translation(format!("malformed response: {e}")))?;
        parse_response(&body)
            .ok_or_else(|| TranslateError::translation("unexpected response shape".to_string()))
    }

    /// Translates texts one at a time, pacing requests with a fixed delay.
    pub async fn translate_batch(
        &self,
        texts: &[String],
        from: &str,
        to: &str,
    ) -> Result<Vec<String>> {
        let mut translations = Vec::with_capacity(texts.len());
        for (index, text) in texts.iter().enumerate() {
            if index > 0 {
                sleep(REQUEST_DELAY).await;
            }
            translations.push(self.translate(text, from, to).await?);
        }
        Ok(translations)
    }
}

/// The endpoint answers with nested arrays; element 0 lists translated
/// segments whose first field is the segment text.
fn parse_response(body: &Value) -> Option<String> {
    let segments = body.get(0)?.as_array()?;
    let mut translated = String::new();
    for segment in segments {
        if let Some(text) = segment.get(0).and_then(Value::as_str) {
            translated.push_str(text);
        }
    }
    Some(translated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_multi_segment_responses() {
        let body = json!([
            [
                ["Hallo ", "Hello ", null, null, 10],
                ["Welt", "world", null, null, 10]
            ],
            null,
            "en"
        ]);
        assert_eq!(parse_response(&body).unwrap(), "Hallo Welt");
    }

    #[test]
    fn rejects_unexpected_shapes() {
        assert!(parse_response(&json!({"error": "nope"})).is_none());
        assert!(parse_response(&json!(null)).is_none());
    }
}
