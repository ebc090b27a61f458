//! `insight analyze`: run an exported batch through the chat model.
use anyhow::{Context, Result};
use clap::Args;
use insight_common::export::read_json_export;
use insight_common::model::ExtractionBatch;
use std::path::PathBuf;

use super::PromptArgs;
use crate::session::Session;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// A `twitter_data_<date>.json` file written by `insight extract --out`.
    #[arg(long)]
    pub batch: PathBuf,

    #[command(flatten)]
    pub prompt: PromptArgs,
}

pub async fn run(args: &AnalyzeArgs, session: &mut Session) -> Result<()> {
    let batch: ExtractionBatch = read_json_export(&args.batch)
        .with_context(|| format!("loading batch from {}", args.batch.display()))?;
    let prompt = args.prompt.resolve(session.store())?;

    let text = session
        .analyze(Some(&batch), &prompt, args.prompt.model.as_deref())
        .await?;
    println!("{text}");
    Ok(())
}
