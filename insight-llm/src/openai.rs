use crate::traits::{LlmClient, LlmError, LlmResponse};
use async_trait::async_trait;
use insight_http::{Auth, HttpClient, RequestOpts};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1/";

/// Chat completions client (`POST chat/completions`).
pub struct OpenAiClient {
    client: HttpClient,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base", &self.client.base_url().as_str())
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub total_tokens: Option<u32>,
}

impl OpenAiClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Config("OpenAI API key is empty".into()));
        }
        let client = HttpClient::new(base_url)
            .map_err(|e| LlmError::Config(format!("HttpClient init failed: {e}")))?
            .with_timeout(timeout);

        Ok(Self {
            client,
            api_key,
            model: model.into(),
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let req = ChatRequest {
            model: &self.model,
            messages,
            temperature,
            max_tokens,
        };

        tracing::debug!(
            model = %self.model,
            prompt_len = prompt.len(),
            "llm.chat.request"
        );
        let resp: ChatResponse = self
            .client
            .post_json(
                "chat/completions",
                &req,
                RequestOpts {
                    auth: Some(Auth::Bearer(&self.api_key)),
                    ..Default::default()
                },
            )
            .await?;

        let text = resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content);
        let tokens_used = resp.usage.and_then(|u| u.total_tokens);
        tracing::debug!(
            has_text = text.is_some(),
            tokens_used,
            "llm.chat.response"
        );

        Ok(LlmResponse {
            text,
            model: resp.model,
            tokens_used,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_chat_shape() {
        let req = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "sys",
                },
                ChatMessage {
                    role: "user",
                    content: "hi",
                },
            ],
            temperature: Some(0.5),
            max_tokens: None,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][1]["content"], "hi");
        assert_eq!(v["temperature"], 0.5);
        assert!(v.get("max_tokens").is_none());
    }

    #[test]
    fn blank_key_is_a_config_error() {
        let err = OpenAiClient::new(OPENAI_API_BASE, " ", "gpt-4o", Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(err, LlmError::Config(_)));
    }
}
