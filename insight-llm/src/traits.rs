use async_trait::async_trait;
use insight_http::HttpError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Text of the first completion choice; `None` when the provider returned none.
    pub text: Option<String>,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
}

#[derive(thiserror::Error, Debug)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl LlmError {
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<HttpError> for LlmError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Api {
                status, message, ..
            } => LlmError::Api {
                status: status.as_u16(),
                message,
            },
            HttpError::Decode(e, snippet) => LlmError::Decode(format!("{e} ({snippet})")),
            HttpError::Url(e) | HttpError::Build(e) => LlmError::Config(e),
            HttpError::Network(e) => LlmError::Network(e),
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response to the given prompt with optional system prompt
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse, LlmError>;

    /// Get the model name being used
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use insight_http::StatusCode;

    #[test]
    fn api_errors_keep_their_status() {
        let err: LlmError = HttpError::Api {
            status: StatusCode::UNAUTHORIZED,
            message: "Incorrect API key provided".into(),
            body: "{}".into(),
        }
        .into();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "API error 401: Incorrect API key provided");
    }

    #[test]
    fn transport_errors_have_no_status() {
        let err: LlmError = HttpError::Network("reset".into()).into();
        assert_eq!(err.status(), None);
    }
}
