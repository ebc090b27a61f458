pub mod analyze;
pub mod extract;
pub mod prompts;
pub mod settings;

use anyhow::Result;
use clap::Args;
use insight_config::prompts::PromptLibrary;
use insight_config::store::KeyValueStore;

use crate::Commands;
use crate::session::Session;

pub async fn run(command: &Commands, session: &mut Session) -> Result<()> {
    match command {
        Commands::Extract(args) => extract::run(args, session).await,
        Commands::Analyze(args) => analyze::run(args, session).await,
        Commands::Settings(args) => settings::run(args, session),
        Commands::Prompts(args) => prompts::run(args, session),
    }
}

/// Where the analysis prompt comes from.
#[derive(Args, Debug, Clone, Default)]
pub struct PromptArgs {
    /// Prompt text.
    #[arg(long, conflicts_with = "saved")]
    pub prompt: Option<String>,

    /// Name of a saved prompt (see `insight prompts list`).
    #[arg(long)]
    pub saved: Option<String>,

    /// Chat model, e.g. gpt-4o-mini, gpt-4o or gpt-4.5-preview.
    #[arg(long)]
    pub model: Option<String>,
}

impl PromptArgs {
    /// Prompt text to send. An absent prompt resolves to empty and is rejected by the analyzer.
    pub fn resolve(&self, store: &dyn KeyValueStore) -> Result<String> {
        if let Some(text) = &self.prompt {
            return Ok(text.clone());
        }
        match &self.saved {
            Some(name) => {
                let library = PromptLibrary::load(store)?;
                let prompt = library
                    .find(name)
                    .ok_or_else(|| anyhow::anyhow!("no saved prompt named '{name}'"))?;
                Ok(prompt.content.clone())
            }
            None => Ok(String::new()),
        }
    }
}
