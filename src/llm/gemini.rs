//! Google Gemini 客户端（REST）
//!
//! 直接调用 generativelanguage v1beta 的 generateContent；消息序列压平为单段提示词，
//! response_format 为 Json 时设置 responseMimeType=application/json。

use async_trait::async_trait;
use serde_json::json;

use crate::core::PanelError;
use crate::llm::{CompletionOptions, LlmClient, Message, ResponseFormat, Role};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini 客户端：持有 HTTP Client、API Key 与 model 名
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, request_timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(request_timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: GEMINI_API_BASE.to_string(),
        }
    }

    /// 覆盖 API 基址（测试用本地端点）
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 将消息序列压平为 Gemini 的单段提示词
    fn flatten_messages(messages: &[Message]) -> String {
        let mut parts = Vec::with_capacity(messages.len());
        for m in messages {
            match m.role {
                Role::System => parts.push(format!("System Instructions: {}\n", m.content)),
                Role::User => parts.push(format!("User: {}\n", m.content)),
                Role::Assistant => parts.push(format!("Assistant: {}\n", m.content)),
            }
        }
        parts.join("\n")
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, PanelError> {
        let prompt = Self::flatten_messages(messages);

        let mut generation_config = serde_json::Map::new();
        if let Some(t) = options.temperature {
            generation_config.insert("temperature".to_string(), json!(t));
        }
        if let Some(max) = options.max_output_tokens {
            generation_config.insert("maxOutputTokens".to_string(), json!(max));
        }
        if options.response_format == ResponseFormat::Json {
            generation_config.insert(
                "responseMimeType".to_string(),
                json!("application/json"),
            );
        }

        let payload = json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": generation_config,
        });

        let url = format!(
            "{}/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let resp = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PanelError::Provider(format!("Gemini request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PanelError::Provider(format!(
                "Gemini API error {}: {}",
                status,
                body.chars().take(300).collect::<String>()
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| PanelError::Provider(format!("Gemini response body: {}", e)))?;

        let text = body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| {
                PanelError::Provider("Gemini response missing candidates[0] text".to_string())
            })?;

        tracing::debug!(model = %self.model, chars = text.len(), "gemini completion");

        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_messages_keeps_role_labels() {
        let messages = vec![
            Message::system("Be precise."),
            Message::user("Score this."),
            Message::assistant("Thinking..."),
        ];
        let prompt = GeminiClient::flatten_messages(&messages);
        assert!(prompt.contains("System Instructions: Be precise."));
        assert!(prompt.contains("User: Score this."));
        assert!(prompt.contains("Assistant: Thinking..."));
    }
}
