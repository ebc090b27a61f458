//! `insight prompts`: the saved prompt library.
use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};
use insight_common::model::Prompt;
use insight_config::prompts::PromptLibrary;

use crate::session::Session;

const PREVIEW_CHARS: usize = 60;

#[derive(Args, Debug)]
pub struct PromptsArgs {
    #[command(subcommand)]
    pub action: PromptsAction,
}

#[derive(Subcommand, Debug)]
pub enum PromptsAction {
    /// List saved prompts.
    List,

    /// Save a new prompt.
    Add {
        /// Name used with `--saved`.
        name: String,
        /// Prompt text.
        content: String,
    },

    /// Print one saved prompt.
    Show { name: String },
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

pub fn run(args: &PromptsArgs, session: &mut Session) -> Result<()> {
    let mut library = PromptLibrary::load(session.store())?;
    match &args.action {
        PromptsAction::List => {
            for p in library.prompts() {
                println!("{:<24} {}", p.name, preview(&p.content));
            }
        }
        PromptsAction::Add { name, content } => {
            library.add(session.store(), Prompt::new(name.trim(), content.clone()))?;
            session.log_mut().info(format!("Saved new prompt: {}", name.trim()));
            println!("Prompt \"{}\" added", name.trim());
        }
        PromptsAction::Show { name } => {
            let prompt = library
                .find(name)
                .ok_or_else(|| anyhow!("no saved prompt named '{name}'"))?;
            println!("{}", prompt.content);
        }
    }
    Ok(())
}
