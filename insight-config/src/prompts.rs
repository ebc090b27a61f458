//! Saved analysis prompts, stored as a JSON array under [`PROMPTS_KEY`].
use crate::store::KeyValueStore;
use insight_common::model::Prompt;
use insight_common::{InsightError, Result};

pub const PROMPTS_KEY: &str = "aiPrompts";

pub fn default_prompts() -> Vec<Prompt> {
    vec![
        Prompt::new(
            "Sentiment analysis",
            "Analyze the mood and tone of the following tweets. Identify the overall emotional coloring, the main themes, and the author's attitudes.",
        ),
        Prompt::new(
            "Key topic extraction",
            "Extract the main topics and keywords from the provided tweets. Group the content by theme and identify the most discussed topics.",
        ),
        Prompt::new(
            "Engagement analysis",
            "Analyze the audience engagement level using the like, retweet and view metrics. Identify the most successful types of content.",
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptLibrary {
    prompts: Vec<Prompt>,
}

impl PromptLibrary {
    /// Load saved prompts, seeding the store with the defaults on first use.
    pub fn load(store: &dyn KeyValueStore) -> Result<Self> {
        match store.get(PROMPTS_KEY)? {
            Some(raw) => Ok(Self {
                prompts: serde_json::from_str(&raw)?,
            }),
            None => {
                let prompts = default_prompts();
                store.set(PROMPTS_KEY, &serde_json::to_string(&prompts)?)?;
                tracing::debug!(count = prompts.len(), "prompts.seeded");
                Ok(Self { prompts })
            }
        }
    }

    /// Append a prompt and persist the whole list.
    pub fn add(&mut self, store: &dyn KeyValueStore, prompt: Prompt) -> Result<()> {
        if prompt.name.trim().is_empty() {
            return Err(InsightError::Config("prompt name must not be empty".into()));
        }
        if prompt.content.trim().is_empty() {
            return Err(InsightError::Config(
                "prompt content must not be empty".into(),
            ));
        }
        let mut prompts = self.prompts.clone();
        prompts.push(prompt);
        store.set(PROMPTS_KEY, &serde_json::to_string(&prompts)?)?;
        self.prompts = prompts;
        Ok(())
    }

    /// First prompt with the given name, compared case-insensitively.
    pub fn find(&self, name: &str) -> Option<&Prompt> {
        let name = name.trim();
        self.prompts
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }
}
