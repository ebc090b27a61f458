//! Per-invocation state: configuration, the credential store and the activity log.
//!
//! Credentials are read from the store each time a client is built, so a
//! `settings set` earlier in the same process takes effect immediately.
use anyhow::Result;
use insight_common::activity::ActivityLog;
use insight_common::export::{BATCH_EXPORT_PREFIX, LOG_EXPORT_PREFIX, write_json_export};
use insight_common::model::ExtractionBatch;
use insight_config::settings::Credentials;
use insight_config::store::KeyValueStore;
use insight_config::{InsightConfig, ScrapeBackend};
use insight_llm::analysis::{Analyzer, GenerationOptions};
use insight_llm::{AnalysisError, OpenAiSettings, openai_analyzer};
use insight_social::twitter::job::{ApifyClient, PollPolicy, TokioClock};
use insight_social::twitter::{
    DirectSource, ExtractError, ExtractRequest, Extractor, JobSource, TwitterApi,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct Session {
    config: InsightConfig,
    store: Box<dyn KeyValueStore>,
    log: ActivityLog,
}

impl Session {
    pub fn new(config: InsightConfig, store: Box<dyn KeyValueStore>) -> Self {
        Self {
            config,
            store,
            log: ActivityLog::new(),
        }
    }

    pub fn config(&self) -> &InsightConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut ActivityLog {
        &mut self.log
    }

    fn credentials(&self) -> Result<Credentials> {
        Ok(Credentials::load(self.store())?)
    }

    fn extractor(&self, backend: ScrapeBackend) -> Result<Extractor> {
        let creds = self.credentials()?;
        let extractor = match backend {
            ScrapeBackend::Direct => {
                let key = creds
                    .twitter_api_key
                    .ok_or(ExtractError::MissingCredential("Twitter API key"))?;
                let cfg = &self.config.scraper;
                let api = TwitterApi::new(&cfg.base_url, &key, Duration::from_secs(cfg.timeout_secs))
                    .map_err(ExtractError::Client)?;
                Extractor::new(DirectSource::new(api))
            }
            ScrapeBackend::Actor => {
                let token = creds
                    .apify_token
                    .ok_or(ExtractError::MissingCredential("Apify token"))?;
                let cfg = &self.config.actor_job;
                let api = ApifyClient::new(
                    &cfg.base_url,
                    cfg.actor_id.clone(),
                    token,
                    Duration::from_secs(self.config.scraper.timeout_secs),
                )
                .map_err(ExtractError::Client)?;
                let policy = PollPolicy {
                    interval: Duration::from_secs(cfg.poll_interval_secs.max(1)),
                    timeout: Duration::from_secs(cfg.timeout_secs),
                };
                Extractor::new(
                    JobSource::new(api, TokioClock, policy)
                        .with_replies(cfg.with_replies)
                        .include_user_info(cfg.include_user_info),
                )
            }
        };
        Ok(extractor)
    }

    /// Run one extraction. Setup failures are logged like any other fatal error.
    pub async fn extract(
        &mut self,
        req: &ExtractRequest,
        backend: ScrapeBackend,
    ) -> Result<ExtractionBatch> {
        let extractor = match self.extractor(backend) {
            Ok(x) => x,
            Err(e) => {
                self.log.error(format!("Critical extraction error: {e}"));
                return Err(e);
            }
        };
        tracing::debug!(%backend, "session.extract");
        Ok(extractor.run(req, &mut self.log).await?)
    }

    fn analyzer(&self, model: Option<&str>) -> Result<Analyzer> {
        let creds = self.credentials()?;
        let cfg = &self.config.llm;
        let settings = OpenAiSettings {
            base_url: cfg.base_url.clone(),
            model: model.unwrap_or(&cfg.model).to_string(),
            timeout: Duration::from_secs(cfg.timeout_secs),
            options: GenerationOptions {
                temperature: cfg.temperature,
                max_tokens: cfg.max_tokens,
            },
        };
        Ok(openai_analyzer(&settings, creds.openai_api_key.as_deref())?)
    }

    pub async fn analyze(
        &mut self,
        batch: Option<&ExtractionBatch>,
        prompt: &str,
        model: Option<&str>,
    ) -> Result<String> {
        let analyzer = self.analyzer(model)?;
        match analyzer.analyze(batch, prompt, &mut self.log).await {
            Ok(text) => Ok(text),
            Err(e @ AnalysisError::Llm(_)) => Err(e.into()),
            Err(e) => {
                self.log.warning(format!("AI analysis not started: {e}"));
                Err(e.into())
            }
        }
    }

    /// Reject an analysis that could never start, before anything is fetched.
    pub fn check_analysis(&mut self, prompt: &str, model: Option<&str>) -> Result<()> {
        let analyzer = self.analyzer(model)?;
        if let Err(e) = analyzer.check_ready(prompt) {
            self.log.warning(format!("AI analysis not started: {e}"));
            return Err(e.into());
        }
        Ok(())
    }

    /// Write the batch as `twitter_data_<date>.json` into `dir`.
    pub fn export_batch(&mut self, dir: &Path, batch: &ExtractionBatch) -> Result<PathBuf> {
        let path = write_json_export(dir, BATCH_EXPORT_PREFIX, batch)?;
        tracing::info!(path = %path.display(), records = batch.total_results(), "batch.exported");
        self.log.success(format!("JSON file saved: {}", path.display()));
        Ok(path)
    }

    /// Write the activity log as `logs_<date>.json` into `dir`.
    pub fn export_log(&self, dir: &Path) -> Result<PathBuf> {
        let path = write_json_export(dir, LOG_EXPORT_PREFIX, &self.log.export())?;
        tracing::info!(path = %path.display(), entries = self.log.len(), "log.exported");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insight_common::activity::{LogExport, LogLevel};
    use insight_common::export::read_json_export;
    use insight_common::model::ExtractionType;
    use insight_config::store::MemoryStore;

    fn session() -> Session {
        Session::new(InsightConfig::default(), Box::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn missing_twitter_key_is_fatal_and_logged() {
        let mut s = session();
        let req = ExtractRequest::new(
            vec!["https://x.com/a/status/1".into()],
            ExtractionType::Tweets,
            10,
        );
        let err = s.extract(&req, ScrapeBackend::Direct).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExtractError>(),
            Some(ExtractError::MissingCredential("Twitter API key"))
        ));
        assert_eq!(s.log().count(LogLevel::Error), 1);
    }

    #[tokio::test]
    async fn missing_apify_token_blocks_actor_backend() {
        let mut s = session();
        Credentials {
            twitter_api_key: Some("tw-key".into()),
            ..Credentials::default()
        }
        .save(s.store())
        .unwrap();
        let req = ExtractRequest::new(vec!["https://x.com/a".into()], ExtractionType::Accounts, 5);
        let err = s.extract(&req, ScrapeBackend::Actor).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExtractError>(),
            Some(ExtractError::MissingCredential("Apify token"))
        ));
    }

    #[tokio::test]
    async fn analysis_without_key_is_rejected_locally() {
        let mut s = session();
        let batch = ExtractionBatch::new(ExtractionType::Tweets, Vec::new());
        let err = s.analyze(Some(&batch), "Summarize", None).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalysisError>(),
            Some(AnalysisError::MissingApiKey)
        ));
        assert_eq!(s.log().count(LogLevel::Warning), 1);
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_before_extraction() {
        let mut s = session();
        Credentials {
            openai_api_key: Some("sk-test-key".into()),
            ..Credentials::default()
        }
        .save(s.store())
        .unwrap();

        let err = s.check_analysis("   ", None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalysisError>(),
            Some(AnalysisError::EmptyPrompt)
        ));
        assert_eq!(s.log().count(LogLevel::Warning), 1);
        assert!(s.check_analysis("Summarize", None).is_ok());
    }

    #[test]
    fn batch_export_is_logged_as_success() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session();
        let batch = ExtractionBatch::new(ExtractionType::Tweets, Vec::new());

        let path = s.export_batch(dir.path(), &batch).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("twitter_data_"));
        let newest = s.log().entries().next().unwrap();
        assert_eq!(newest.level, LogLevel::Success);
        assert!(newest.message.starts_with("JSON file saved: "));
    }

    #[test]
    fn log_export_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session();
        s.log_mut().info("first");
        s.log_mut().error("second");

        let path = s.export_log(dir.path()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("logs_") && name.ends_with(".json"));

        let back: LogExport = read_json_export(&path).unwrap();
        assert_eq!(back.total_logs, 2);
        assert_eq!(back.logs[0].message, "second");
    }
}
