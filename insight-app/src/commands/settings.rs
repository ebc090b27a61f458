//! `insight settings`: manage stored API credentials.
use anyhow::Result;
use clap::{Args, Subcommand};
use insight_config::settings::{Credentials, mask_secret};

use crate::session::Session;

#[derive(Args, Debug)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub action: SettingsAction,
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Show configured credentials (masked) and effective endpoints.
    Show,

    /// Store one or more credentials. An empty value removes the key.
    Set {
        #[arg(long)]
        twitter_api_key: Option<String>,
        #[arg(long)]
        openai_api_key: Option<String>,
        #[arg(long)]
        apify_token: Option<String>,
    },

    /// Remove every stored credential.
    Clear,
}

fn shown(value: &Option<String>) -> String {
    value
        .as_deref()
        .map(mask_secret)
        .unwrap_or_else(|| "(not set)".to_string())
}

pub fn run(args: &SettingsArgs, session: &mut Session) -> Result<()> {
    match &args.action {
        SettingsAction::Show => {
            let creds = Credentials::load(session.store())?;
            let cfg = session.config();
            println!("Twitter API key: {}", shown(&creds.twitter_api_key));
            println!("OpenAI API key:  {}", shown(&creds.openai_api_key));
            println!("Apify token:     {}", shown(&creds.apify_token));
            println!();
            println!("Scraping API:    {}", cfg.scraper.base_url);
            println!("Actor API:       {} ({})", cfg.actor_job.base_url, cfg.actor_job.actor_id);
            println!("Chat API:        {} ({})", cfg.llm.base_url, cfg.llm.model);
            println!("Backend:         {}", cfg.extraction.backend);
            println!("Store:           {}", cfg.storage.resolved_path().display());
        }
        SettingsAction::Set {
            twitter_api_key,
            openai_api_key,
            apify_token,
        } => {
            let mut creds = Credentials::load(session.store())?;
            if let Some(v) = twitter_api_key {
                creds.twitter_api_key = Some(v.clone());
            }
            if let Some(v) = openai_api_key {
                creds.openai_api_key = Some(v.clone());
            }
            if let Some(v) = apify_token {
                creds.apify_token = Some(v.clone());
            }
            creds.save(session.store())?;
            session.log_mut().info("API key settings updated");
            println!("Settings saved");
        }
        SettingsAction::Clear => {
            Credentials::clear(session.store())?;
            session.log_mut().info("API key settings cleared");
            println!("Settings cleared");
        }
    }
    Ok(())
}
