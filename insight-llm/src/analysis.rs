//! Batch analysis through a chat completion model.
//!
//! The batch is rendered as plain text with fixed labels, appended to the
//! user's prompt, and sent as one system + user exchange. Requests that cannot
//! succeed (no key, no batch, blank prompt) are rejected before any network
//! traffic.
use crate::traits::{LlmClient, LlmError};
use insight_common::activity::ActivityLog;
use insight_common::busy::BusyFlag;
use insight_common::model::{ExtractionBatch, ExtractionResult, Profile, SingleTweet, UserTweets};
use std::fmt::Write;

pub const SYSTEM_PROMPT: &str = "You are an expert in social media and Twitter data analysis. Provide detailed, structured analyses.";
pub const NO_ANALYSIS_PLACEHOLDER: &str = "Could not get analysis";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const AVAILABLE_MODELS: &[&str] = &["gpt-4o-mini", "gpt-4o", "gpt-4.5-preview"];

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("OpenAI API key is not configured")]
    MissingApiKey,
    #[error("no data to analyze; extract Twitter data first")]
    NoData,
    #[error("analysis prompt is empty")]
    EmptyPrompt,
    #[error("analysis already in progress")]
    Busy,
    #[error("OpenAI API error: {0}")]
    Llm(#[from] LlmError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2000,
        }
    }
}

/// User message: the prompt followed by the rendered data.
pub fn user_message(prompt: &str, data: &str) -> String {
    format!("{prompt}\n\nData for analysis:\n{data}")
}

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

fn write_profile_details(out: &mut String, p: &Profile, indent: &str) {
    let _ = writeln!(out, "{indent}Description: {}", or_default(&p.description, "No description"));
    let _ = writeln!(out, "{indent}Followers: {}", p.followers_count);
    let _ = writeln!(out, "{indent}Location: {}", or_default(&p.location, "Not specified"));
}

fn write_single(out: &mut String, n: usize, t: &SingleTweet) {
    let d = &t.tweet_data;
    let author = t
        .author_profile
        .as_ref()
        .map(|p| p.username.as_str())
        .unwrap_or("Unknown");
    let _ = writeln!(out, "\nTweet {n}:");
    let _ = writeln!(out, "URL: {}", t.tweet_url);
    let _ = writeln!(out, "Text: {}", d.text);
    let _ = writeln!(out, "Author: {author}");
    let _ = writeln!(out, "Likes: {}", d.like_count);
    let _ = writeln!(out, "Retweets: {}", d.retweet_count);
    let _ = writeln!(out, "Views: {}", d.view_count);
    let _ = writeln!(out, "Date: {}", d.created_at.as_deref().unwrap_or("Unknown"));
    if let Some(p) = &t.author_profile {
        let _ = writeln!(out, "Author profile:");
        write_profile_details(out, p, "  ");
    }
}

fn write_user(out: &mut String, u: &UserTweets) {
    let p = &u.user_profile;
    let _ = writeln!(out, "\nProfile: {}", or_default(&p.username, "Unknown"));
    let _ = writeln!(out, "Profile URL: {}", u.profile_url);
    write_profile_details(out, p, "");
    let _ = writeln!(out, "\nUser tweets:");
    for (i, s) in u.tweets.iter().enumerate() {
        let _ = writeln!(out, "{}. URL: {}", i + 1, s.tweet_url.as_deref().unwrap_or("n/a"));
        let _ = writeln!(out, "   Text: {}", s.tweet.text);
        let _ = writeln!(out, "   Views: {}", s.tweet.view_count);
        let _ = writeln!(out, "   Date: {}\n", s.tweet.created_at.as_deref().unwrap_or("Unknown"));
    }
}

/// Render every record of the batch as labelled text, in batch order.
pub fn format_batch(batch: &ExtractionBatch) -> String {
    let mut out = String::new();
    for (i, result) in batch.results().iter().enumerate() {
        match result {
            ExtractionResult::SingleTweet(t) => write_single(&mut out, i + 1, t),
            ExtractionResult::UserTweets(u) => write_user(&mut out, u),
        }
    }
    out
}

pub struct Analyzer {
    client: Option<Box<dyn LlmClient>>,
    options: GenerationOptions,
    busy: BusyFlag,
}

impl Analyzer {
    /// `None` means no API key is configured; every request is then rejected.
    pub fn new(client: Option<Box<dyn LlmClient>>) -> Self {
        Self {
            client,
            options: GenerationOptions::default(),
            busy: BusyFlag::new("analysis"),
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn model_name(&self) -> Option<&str> {
        self.client.as_deref().map(|c| c.model_name())
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// The local checks that need no batch: an API key and a non-blank prompt.
    pub fn check_ready(&self, prompt: &str) -> Result<(), AnalysisError> {
        if self.client.is_none() {
            return Err(AnalysisError::MissingApiKey);
        }
        if prompt.trim().is_empty() {
            return Err(AnalysisError::EmptyPrompt);
        }
        Ok(())
    }

    /// Analyze `batch` with `prompt`, returning the first completion verbatim.
    pub async fn analyze(
        &self,
        batch: Option<&ExtractionBatch>,
        prompt: &str,
        log: &mut ActivityLog,
    ) -> Result<String, AnalysisError> {
        let client = self.client.as_deref().ok_or(AnalysisError::MissingApiKey)?;
        let batch = batch.ok_or(AnalysisError::NoData)?;
        if prompt.trim().is_empty() {
            return Err(AnalysisError::EmptyPrompt);
        }
        let _guard = self.busy.try_acquire().map_err(|_| AnalysisError::Busy)?;

        log.info("Starting AI analysis");
        tracing::info!(
            model = client.model_name(),
            records = batch.total_results(),
            "analysis.start"
        );

        let message = user_message(prompt, &format_batch(batch));
        let result = client
            .generate(
                &message,
                Some(SYSTEM_PROMPT),
                Some(self.options.max_tokens),
                Some(self.options.temperature),
            )
            .await;

        match result {
            Ok(resp) => {
                let text = resp
                    .text
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| NO_ANALYSIS_PLACEHOLDER.to_string());
                tracing::info!(tokens_used = resp.tokens_used, "analysis.done");
                log.success("AI analysis completed");
                Ok(text)
            }
            Err(e) => {
                let err = AnalysisError::from(e);
                tracing::error!(error = %err, "analysis.failed");
                log.error(format!("AI analysis error: {err}"));
                Err(err)
            }
        }
    }
}
