//! LLM integration for Insight.
//!
//! This crate exposes a provider-neutral [`traits::LlmClient`] interface, the
//! OpenAI chat completions client, and the [`analysis::Analyzer`] that turns an
//! extraction batch into a single analysis request.
//!
//! # Examples
//! ```no_run
//! use insight_llm::{openai_analyzer, OpenAiSettings};
//!
//! let analyzer = openai_analyzer(&OpenAiSettings::default(), Some("sk-..."))?;
//! assert_eq!(analyzer.model_name(), Some("gpt-4o-mini"));
//! # Ok::<(), insight_llm::traits::LlmError>(())
//! ```
pub mod analysis;
pub mod openai;
pub mod traits;

use analysis::{Analyzer, GenerationOptions};
use openai::OpenAiClient;
use std::time::Duration;
use traits::LlmError;

pub use analysis::{AnalysisError, AVAILABLE_MODELS, DEFAULT_MODEL};

/// Connection and generation settings for the OpenAI backend.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiSettings {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub options: GenerationOptions,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            base_url: openai::OPENAI_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(120),
            options: GenerationOptions::default(),
        }
    }
}

/// Build an analyzer over OpenAI. A missing or blank key yields an analyzer
/// that rejects every request with [`AnalysisError::MissingApiKey`].
pub fn openai_analyzer(
    settings: &OpenAiSettings,
    api_key: Option<&str>,
) -> Result<Analyzer, LlmError> {
    let client = match api_key.map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => {
            if !AVAILABLE_MODELS.contains(&settings.model.as_str()) {
                tracing::warn!(model = %settings.model, "llm.model.unlisted");
            }
            let client =
                OpenAiClient::new(&settings.base_url, key, &settings.model, settings.timeout)?;
            Some(Box::new(client) as Box<dyn traits::LlmClient>)
        }
        None => None,
    };
    Ok(Analyzer::new(client).with_options(settings.options))
}
