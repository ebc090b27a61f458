//! Loader for Insight configuration with YAML + environment overlays.
//!
//! Sources, lowest precedence first: built-in defaults, an optional
//! `insight.yaml` (or any file the `config` crate understands), inline YAML
//! snippets, then `INSIGHT__SECTION__KEY` environment variables. String values
//! may reference `${VAR}` placeholders, which are expanded after merging.
//!
//! Credentials and saved prompts are not part of this file; they live in the
//! key-value [`store`] and are handled by [`settings`] and [`prompts`].
use config::{Config, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub mod prompts;
pub mod settings;
pub mod store;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const DEFAULT_CONFIG_FILE: &str = "insight.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error(transparent)]
    Source(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Schema(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    pub scraper: ScraperConfig,
    pub actor_job: ActorJobConfig,
    pub llm: LlmConfig,
    pub extraction: ExtractionConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Direct scraping API (tweet lookup, user info, last tweets).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.twitterapi.io/".into(),
            timeout_secs: 30,
        }
    }
}

/// Hosted scraping job service used by the `actor` backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActorJobConfig {
    pub base_url: String,
    pub actor_id: String,
    pub poll_interval_secs: u64,
    pub timeout_secs: u64,
    pub with_replies: bool,
    pub include_user_info: bool,
}

impl Default for ActorJobConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.apify.com/v2/".into(),
            actor_id: "apidojo~tweet-scraper".into(),
            poll_interval_secs: 5,
            timeout_secs: 300,
            with_replies: false,
            include_user_info: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1/".into(),
            model: "gpt-4o-mini".into(),
            temperature: 0.7,
            max_tokens: 2000,
            timeout_secs: 120,
        }
    }
}

/// Which upstream fetches the data for an extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeBackend {
    /// Per-URL lookups against the scraping API.
    #[default]
    Direct,
    /// One asynchronous scraping job for the whole batch.
    Actor,
}

impl fmt::Display for ScrapeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScrapeBackend::Direct => "direct",
            ScrapeBackend::Actor => "actor",
        })
    }
}

impl FromStr for ScrapeBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(ScrapeBackend::Direct),
            "actor" | "job" => Ok(ScrapeBackend::Actor),
            other => Err(format!(
                "unknown backend '{other}' (expected 'direct' or 'actor')"
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Recent tweets kept per account.
    pub tweet_count: u32,
    pub backend: ScrapeBackend,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            tweet_count: 10,
            backend: ScrapeBackend::Direct,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Credential/prompt store; defaults to `<data dir>/insight/store.json`.
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(p) => p.clone(),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("insight")
                .join("store.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: Option<PathBuf>,
    pub format: String,
    pub stderr: bool,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            format: "text".into(),
            stderr: false,
            filter: "info".into(),
        }
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring.
pub struct InsightConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    files: Vec<(PathBuf, bool)>,
    snippets: Vec<String>,
}

impl Default for InsightConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightConfigLoader {
    /// Start from built-in defaults; env overrides are applied last in [`load`](Self::load).
    ///
    /// ```
    /// use insight_config::InsightConfigLoader;
    ///
    /// let config = InsightConfigLoader::new()
    ///     .with_yaml_str("extraction:\n  tweet_count: 25")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.extraction.tweet_count, 25);
    /// assert_eq!(config.llm.model, "gpt-4o-mini");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            files: Vec::new(),
            snippets: Vec::new(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; the format is inferred from the suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), true));
        self
    }

    /// Attach a file that is silently skipped when absent.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), false));
        self
    }

    /// Merge an inline YAML snippet (tests and CLI overrides).
    ///
    /// ```
    /// use insight_config::{InsightConfigLoader, ScrapeBackend};
    ///
    /// let cfg = InsightConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// extraction:
    ///   backend: actor
    /// actor_job:
    ///   poll_interval_secs: 2
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.extraction.backend, ScrapeBackend::Actor);
    /// assert_eq!(cfg.actor_job.poll_interval_secs, 2);
    /// assert_eq!(cfg.actor_job.timeout_secs, 300);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.snippets.push(yaml.to_string());
        self
    }

    /// Merge all sources, expand `${VAR}` placeholders and deserialize.
    pub fn load(self) -> Result<InsightConfig, ConfigLoadError> {
        let mut builder = self.builder;
        for (path, required) in &self.files {
            builder = builder.add_source(File::from(path.as_path()).required(*required));
        }
        for yaml in &self.snippets {
            builder = builder.add_source(File::from_str(yaml, config::FileFormat::Yaml));
        }
        builder = builder.add_source(
            Environment::with_prefix("INSIGHT")
                .separator("__")
                .try_parsing(true),
        );

        let mut v: Value = builder.build()?.try_deserialize()?;
        expand_env_in_value(&mut v);
        if v.is_null() {
            v = Value::Object(Default::default());
        }

        let typed: InsightConfig = serde_json::from_value(v)?;
        tracing::debug!(
            backend = %typed.extraction.backend,
            model = %typed.llm.model,
            "config.loaded"
        );
        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("INSIGHT_TEST_FOO", Some("bar"), || {
            let mut v = json!("prefix-${INSIGHT_TEST_FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_nested_values() {
        temp_env::with_vars(
            [
                ("INSIGHT_TEST_HOST", Some("proxy.local")),
                ("INSIGHT_TEST_URL", Some("https://${INSIGHT_TEST_HOST}/v1")),
            ],
            || {
                let mut v = json!({ "llm": { "base_url": "${INSIGHT_TEST_URL}" }, "n": [1, "$INSIGHT_TEST_HOST"] });
                expand_env_in_value(&mut v);
                assert_eq!(
                    v,
                    json!({ "llm": { "base_url": "https://proxy.local/v1" }, "n": [1, "proxy.local"] })
                );
            },
        );
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars(
            [
                ("INSIGHT_TEST_A", Some("${INSIGHT_TEST_B}")),
                ("INSIGHT_TEST_B", Some("${INSIGHT_TEST_A}")),
            ],
            || {
                let mut v = json!("x=${INSIGHT_TEST_A}");
                expand_env_in_value(&mut v);
                assert!(v.as_str().unwrap().contains("${"));
            },
        );
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${INSIGHT_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${INSIGHT_DOES_NOT_EXIST}"));
    }

    #[test]
    fn backend_parses() {
        assert_eq!("Actor".parse::<ScrapeBackend>(), Ok(ScrapeBackend::Actor));
        assert!("browser".parse::<ScrapeBackend>().is_err());
    }

    #[test]
    fn storage_path_prefers_explicit() {
        let cfg = StorageConfig {
            path: Some(PathBuf::from("/tmp/store.json")),
        };
        assert_eq!(cfg.resolved_path(), PathBuf::from("/tmp/store.json"));
    }
}
