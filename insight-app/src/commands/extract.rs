//! `insight extract`: fetch tweets or profiles for a list of URLs.
use anyhow::{Context, Result};
use clap::Args;
use insight_common::export::to_pretty_json;
use insight_common::model::ExtractionType;
use insight_config::ScrapeBackend;
use insight_social::twitter::ExtractRequest;
use std::path::PathBuf;

use super::PromptArgs;
use crate::session::Session;

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// What the URLs point at: tweets (status URLs) or accounts (profile URLs).
    #[arg(long, short, default_value = "tweets")]
    pub mode: ExtractionType,

    /// Fetch backend; defaults to `extraction.backend` from the config.
    #[arg(long, short)]
    pub backend: Option<ScrapeBackend>,

    /// Recent tweets kept per account; defaults to `extraction.tweet_count`.
    #[arg(long, short = 'n')]
    pub count: Option<u32>,

    /// Read URLs from a file, one per line.
    #[arg(long, short, conflicts_with = "urls")]
    pub file: Option<PathBuf>,

    /// URLs to process.
    pub urls: Vec<String>,

    /// Directory to write `twitter_data_<date>.json` into. Prints the batch when omitted.
    #[arg(long, short)]
    pub out: Option<PathBuf>,

    /// Run an AI analysis over the batch afterwards.
    #[arg(long)]
    pub analyze: bool,

    #[command(flatten)]
    pub prompt: PromptArgs,
}

impl ExtractArgs {
    fn request(&self, default_count: u32) -> Result<ExtractRequest> {
        let count = self.count.unwrap_or(default_count);
        match &self.file {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading URLs from {}", path.display()))?;
                Ok(ExtractRequest::from_text(&text, self.mode, count))
            }
            None => Ok(ExtractRequest::new(self.urls.clone(), self.mode, count)),
        }
    }
}

pub async fn run(args: &ExtractArgs, session: &mut Session) -> Result<()> {
    let extraction = &session.config().extraction;
    let backend = args.backend.unwrap_or(extraction.backend);
    let req = args.request(extraction.tweet_count)?;

    let prompt = if args.analyze {
        let prompt = args.prompt.resolve(session.store())?;
        session.check_analysis(&prompt, args.prompt.model.as_deref())?;
        Some(prompt)
    } else {
        None
    };

    let batch = session.extract(&req, backend).await?;

    match &args.out {
        Some(dir) => {
            let path = session.export_batch(dir, &batch)?;
            println!(
                "Extracted {} records from {} URLs -> {}",
                batch.total_results(),
                req.lines.len(),
                path.display()
            );
        }
        None => println!("{}", to_pretty_json(&batch)?),
    }

    if let Some(prompt) = prompt {
        let text = session
            .analyze(Some(&batch), &prompt, args.prompt.model.as_deref())
            .await?;
        println!("\n{text}");
    }
    Ok(())
}
