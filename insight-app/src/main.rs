//! Insight CLI: extract Twitter/X data and analyze it with a chat model.
//!
//! ```bash
//! insight settings set --twitter-api-key KEY --openai-api-key sk-...
//! insight extract --mode tweets https://x.com/alice/status/42 --out exports/
//! insight extract --mode accounts --file accounts.txt --count 20 --analyze --saved "Engagement analysis"
//! insight analyze --batch exports/twitter_data_2025-01-07.json --prompt "Summarize the main topics"
//! insight prompts list
//! ```
mod commands;
mod session;

use anyhow::Result;
use clap::{Parser, Subcommand};
use insight_common::activity::{LogEntry, LogLevel};
use insight_common::observability::{LogConfig, LogFormat, init_logging};
use insight_config::store::JsonFileStore;
use insight_config::{DEFAULT_CONFIG_FILE, InsightConfig, InsightConfigLoader};
use session::Session;
use std::path::PathBuf;

use commands::{analyze, extract, prompts, settings};

#[derive(Parser, Debug)]
#[command(name = "insight")]
#[command(about = "Twitter/X data extraction and AI analysis")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file; `insight.yaml` in the working directory is used if present.
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Export this run's activity log as `logs_<date>.json` into the directory.
    #[arg(long, global = true)]
    pub log_out: Option<PathBuf>,

    /// Mirror debug logs to stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch tweets or account timelines for a list of URLs.
    Extract(extract::ExtractArgs),
    /// Analyze an exported batch with a chat model.
    Analyze(analyze::AnalyzeArgs),
    /// Manage stored API credentials.
    Settings(settings::SettingsArgs),
    /// Manage saved analysis prompts.
    Prompts(prompts::PromptsArgs),
}

fn load_config(cli: &Cli) -> Result<InsightConfig> {
    let loader = match &cli.config {
        Some(path) => InsightConfigLoader::new().with_file(path),
        None => InsightConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    Ok(loader.load()?)
}

fn log_config(cfg: &InsightConfig, verbose: bool) -> Result<LogConfig> {
    let format: LogFormat = cfg.logging.format.parse().map_err(anyhow::Error::msg)?;
    Ok(LogConfig {
        app_name: "insight",
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.stderr || verbose,
        format,
        default_filter: if verbose {
            "debug".to_string()
        } else {
            cfg.logging.filter.clone()
        },
    })
}

/// Warnings and errors from the activity log, oldest first, on stderr.
fn print_problems(session: &Session) {
    let mut problems: Vec<&LogEntry> = session
        .log()
        .entries()
        .filter(|e| matches!(e.level, LogLevel::Warning | LogLevel::Error))
        .collect();
    problems.reverse();
    for entry in problems {
        eprintln!("[{}] {}", entry.level.as_str(), entry.message);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Config (env wins over file)
    let cfg = load_config(&cli)?;

    // 2) Logging
    let log_path = init_logging(log_config(&cfg, cli.verbose)?)?;
    tracing::debug!(path = %log_path.display(), "logging.ready");

    // 3) Store + session
    let store = JsonFileStore::open(cfg.storage.resolved_path())?;
    let mut session = Session::new(cfg, Box::new(store));

    let outcome = commands::run(&cli.command, &mut session).await;
    if let Err(e) = &outcome {
        tracing::error!(error = %e, "command.failed");
    }
    print_problems(&session);

    if let Some(dir) = &cli.log_out {
        let path = session.export_log(dir)?;
        println!("Activity log exported to {}", path.display());
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use insight_common::model::ExtractionType;
    use insight_config::ScrapeBackend;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_extract_with_analysis() {
        let cli = Cli::try_parse_from([
            "insight",
            "extract",
            "--mode",
            "accounts",
            "--backend",
            "actor",
            "-n",
            "20",
            "https://x.com/alice",
            "https://x.com/bob",
            "--analyze",
            "--saved",
            "Engagement analysis",
            "--log-out",
            "logs/",
        ])
        .unwrap();
        let Commands::Extract(args) = &cli.command else {
            panic!("expected extract");
        };
        assert_eq!(args.mode, ExtractionType::Accounts);
        assert_eq!(args.backend, Some(ScrapeBackend::Actor));
        assert_eq!(args.count, Some(20));
        assert_eq!(args.urls.len(), 2);
        assert!(args.analyze);
        assert_eq!(args.prompt.saved.as_deref(), Some("Engagement analysis"));
        assert_eq!(cli.log_out, Some(PathBuf::from("logs/")));
    }

    #[test]
    fn file_and_positional_urls_conflict() {
        let res = Cli::try_parse_from([
            "insight",
            "extract",
            "--file",
            "urls.txt",
            "https://x.com/alice",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn prompt_and_saved_conflict() {
        let res = Cli::try_parse_from([
            "insight",
            "analyze",
            "--batch",
            "b.json",
            "--prompt",
            "x",
            "--saved",
            "y",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn log_config_follows_settings() {
        let mut cfg = InsightConfig::default();
        cfg.logging.format = "json".into();
        let lc = log_config(&cfg, true).unwrap();
        assert_eq!(lc.format, LogFormat::Json);
        assert!(lc.emit_stderr);
        assert_eq!(lc.default_filter, "debug");

        cfg.logging.format = "yaml".into();
        assert!(log_config(&cfg, false).is_err());
    }
}
