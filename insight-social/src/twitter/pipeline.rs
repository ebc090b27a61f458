//! Batch orchestration.
//!
//! [`prepare`] classifies the pasted lines, a [`RecordSource`] turns the
//! accepted targets into records, and [`Extractor`] wraps the run with the
//! busy guard and the start/summary log entries. URLs that fail are logged
//! and left out of the batch; only [`ExtractError`] aborts a run.
use crate::twitter::client::ScrapeApi;
use crate::twitter::error::{ExtractError, describe};
use crate::twitter::job::{self, Clock, JobApi, JobInput, MAX_TWEETS_DESIRED, PollPolicy};
use crate::twitter::normalize;
use crate::twitter::url::{self, ParsedUrl};
use async_trait::async_trait;
use insight_common::activity::ActivityLog;
use insight_common::busy::BusyFlag;
use insight_common::model::{
    ExtractionBatch, ExtractionResult, ExtractionType, SingleTweet, UserTweets,
};
use insight_http::HttpError;
use serde_json::Value;

pub const MAX_DIRECT_TWEETS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRequest {
    pub lines: Vec<String>,
    pub mode: ExtractionType,
    /// Tweets kept per profile.
    pub tweet_count: u32,
}

impl ExtractRequest {
    pub fn new(lines: Vec<String>, mode: ExtractionType, tweet_count: u32) -> Self {
        Self {
            lines,
            mode,
            tweet_count,
        }
    }

    /// One URL per line; blank lines are ignored.
    pub fn from_text(text: &str, mode: ExtractionType, tweet_count: u32) -> Self {
        let lines = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        Self::new(lines, mode, tweet_count)
    }

    fn non_empty_lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty())
    }
}

/// A classified input line accepted for the current mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub original_url: String,
    pub parsed: ParsedUrl,
}

/// Classify every line, logging the ones that are skipped.
pub fn prepare(req: &ExtractRequest, log: &mut ActivityLog) -> Result<Vec<Target>, ExtractError> {
    let mut seen_any = false;
    let mut targets = Vec::new();
    for line in req.non_empty_lines() {
        seen_any = true;
        let Some(parsed) = url::classify(line) else {
            tracing::warn!(url = %line, "extract.url.invalid");
            log.error(format!("Invalid URL format: {line}"));
            continue;
        };
        let kind = parsed.kind();
        if !kind.fits(req.mode) {
            tracing::warn!(url = %line, %kind, mode = %req.mode, "extract.url.mode_mismatch");
            log.warning(format!(
                "Extraction mode \"{}\" does not match URL type \"{kind}\": {line}",
                req.mode
            ));
            continue;
        }
        log.info(format!("Processing {kind}: {line}"));
        targets.push(Target {
            original_url: line.to_string(),
            parsed,
        });
    }
    if !seen_any {
        return Err(ExtractError::EmptyInput);
    }
    Ok(targets)
}

/// Backend that produces records for prepared targets.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn collect(
        &self,
        targets: &[Target],
        req: &ExtractRequest,
        log: &mut ActivityLog,
    ) -> Result<Vec<ExtractionResult>, ExtractError>;
}

fn url_failed(log: &mut ActivityLog, target: &Target, what: String, err: &HttpError) {
    tracing::warn!(
        url = %target.original_url,
        status = err.status().map(|s| s.as_u16()),
        error = %err,
        "extract.url.failed"
    );
    log.error(format!("Failed to fetch {what}: {}", describe(err)));
}

// ==============================
// Direct API
// ==============================

/// Sequential requests against the scraping API, one URL at a time.
pub struct DirectSource<A> {
    api: A,
}

impl<A: ScrapeApi> DirectSource<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    async fn single_tweet(
        &self,
        target: &Target,
        handle: &str,
        id: &str,
        log: &mut ActivityLog,
    ) -> Result<ExtractionResult, HttpError> {
        let resp = self.api.tweet_lookup(id).await?;
        let tweet = normalize::lookup_tweet(&resp);
        let author = normalize::author_handle(tweet);

        let author_profile = match &author {
            Some(a) => match self.api.user_info(a).await {
                Ok(v) => Some(normalize::profile(&v, a)),
                Err(e) => {
                    tracing::warn!(author = %a, error = %e, "extract.author.failed");
                    log.warning(format!("Could not fetch author profile @{a}: {}", describe(&e)));
                    None
                }
            },
            None => None,
        };

        let author = author.as_deref().unwrap_or(handle);
        Ok(ExtractionResult::SingleTweet(SingleTweet {
            original_url: target.original_url.clone(),
            tweet_url: url::tweet_url(author, id),
            tweet_data: normalize::tweet_data(tweet, id),
            author_profile,
        }))
    }

    async fn user_tweets(
        &self,
        target: &Target,
        handle: &str,
        count: usize,
        log: &mut ActivityLog,
    ) -> Result<ExtractionResult, HttpError> {
        let info = self.api.user_info(handle).await?;
        let user_profile = normalize::profile(&info, handle);

        let tweets = match self.api.last_tweets(handle).await {
            Ok(resp) => normalize::tweet_list(&resp)
                .into_iter()
                .take(count)
                .enumerate()
                .map(|(i, t)| normalize::tweet_summary(t, i, handle))
                .collect(),
            Err(e) => {
                tracing::warn!(%handle, error = %e, "extract.timeline.failed");
                log.warning(format!("Could not fetch tweets of @{handle}: {}", describe(&e)));
                Vec::new()
            }
        };

        Ok(ExtractionResult::UserTweets(UserTweets::new(
            target.original_url.clone(),
            url::profile_url(handle),
            user_profile,
            tweets,
        )))
    }
}

#[async_trait]
impl<A: ScrapeApi> RecordSource for DirectSource<A> {
    async fn collect(
        &self,
        targets: &[Target],
        req: &ExtractRequest,
        log: &mut ActivityLog,
    ) -> Result<Vec<ExtractionResult>, ExtractError> {
        let count = req.tweet_count.clamp(1, MAX_DIRECT_TWEETS) as usize;
        let mut results = Vec::with_capacity(targets.len());

        for target in targets {
            match &target.parsed {
                ParsedUrl::Tweet { handle, id } => {
                    match self.single_tweet(target, handle, id, log).await {
                        Ok(record) => {
                            log.success(format!("Extracted tweet {id}"));
                            results.push(record);
                        }
                        Err(e) => url_failed(log, target, format!("tweet {id}"), &e),
                    }
                }
                ParsedUrl::User { handle } => {
                    match self.user_tweets(target, handle, count, log).await {
                        Ok(record) => {
                            if let ExtractionResult::UserTweets(u) = &record {
                                log.success(format!(
                                    "Extracted {} tweets from @{handle}",
                                    u.total_tweets
                                ));
                            }
                            results.push(record);
                        }
                        Err(e) => url_failed(log, target, format!("user {handle}"), &e),
                    }
                }
            }
        }
        Ok(results)
    }
}

// ==============================
// Hosted job
// ==============================

/// One scraping job for the whole batch; its dataset is grouped back per URL.
pub struct JobSource<J, C> {
    api: J,
    clock: C,
    policy: PollPolicy,
    with_replies: bool,
    include_user_info: bool,
}

impl<J: JobApi, C: Clock> JobSource<J, C> {
    pub fn new(api: J, clock: C, policy: PollPolicy) -> Self {
        Self {
            api,
            clock,
            policy,
            with_replies: false,
            include_user_info: true,
        }
    }

    pub fn with_replies(mut self, yes: bool) -> Self {
        self.with_replies = yes;
        self
    }

    pub fn include_user_info(mut self, yes: bool) -> Self {
        self.include_user_info = yes;
        self
    }

    fn job_input(&self, targets: &[Target], tweet_count: u32) -> JobInput {
        let mut start_urls = Vec::with_capacity(targets.len());
        let mut handles = Vec::new();
        for t in targets {
            match &t.parsed {
                ParsedUrl::Tweet { handle, id } => start_urls.push(url::tweet_url(handle, id)),
                ParsedUrl::User { handle } => {
                    start_urls.push(url::profile_url(handle));
                    handles.push(handle.clone());
                }
            }
        }
        let mut input = JobInput::new(start_urls, handles, tweet_count);
        input.with_replies = self.with_replies;
        input.include_user_info = self.include_user_info;
        input
    }
}

fn same_handle(candidate: Option<String>, handle: &str) -> bool {
    candidate.is_some_and(|c| c.eq_ignore_ascii_case(handle))
}

fn tweet_from_items(target: &Target, handle: &str, id: &str, items: &[Value]) -> Option<ExtractionResult> {
    let item = items.iter().find(|i| {
        normalize::first_str(i, normalize::TWEET_ID).as_deref() == Some(id)
    })?;
    let author = normalize::author_handle(item);
    let author_profile = normalize::author_object(item)
        .map(|a| normalize::profile(a, author.as_deref().unwrap_or(handle)));
    Some(ExtractionResult::SingleTweet(SingleTweet {
        original_url: target.original_url.clone(),
        tweet_url: url::tweet_url(author.as_deref().unwrap_or(handle), id),
        tweet_data: normalize::tweet_data(item, id),
        author_profile,
    }))
}

fn user_from_items(target: &Target, handle: &str, count: usize, items: &[Value]) -> Option<ExtractionResult> {
    let profile_item = items.iter().find(|i| {
        normalize::first_str(i, normalize::TWEET_ID).is_none()
            && same_handle(normalize::first_str(i, normalize::USERNAME), handle)
    });
    let tweets: Vec<&Value> = items
        .iter()
        .filter(|i| same_handle(normalize::author_handle(i), handle))
        .collect();
    if profile_item.is_none() && tweets.is_empty() {
        return None;
    }

    let user_profile = match profile_item {
        Some(p) => normalize::profile(p, handle),
        None => tweets
            .first()
            .and_then(|t| normalize::author_object(t))
            .map(|a| normalize::profile(a, handle))
            .unwrap_or_else(|| normalize::profile(&Value::Null, handle)),
    };
    let tweets = tweets
        .into_iter()
        .take(count)
        .enumerate()
        .map(|(i, t)| normalize::tweet_summary(t, i, handle))
        .collect();

    Some(ExtractionResult::UserTweets(UserTweets::new(
        target.original_url.clone(),
        url::profile_url(handle),
        user_profile,
        tweets,
    )))
}

#[async_trait]
impl<J: JobApi, C: Clock> RecordSource for JobSource<J, C> {
    async fn collect(
        &self,
        targets: &[Target],
        req: &ExtractRequest,
        log: &mut ActivityLog,
    ) -> Result<Vec<ExtractionResult>, ExtractError> {
        if targets.is_empty() {
            return Ok(Vec::new());
        }
        let input = self.job_input(targets, req.tweet_count);
        let items = job::run_job(&self.api, &self.clock, self.policy, &input, log).await?;
        let count = req.tweet_count.clamp(1, MAX_TWEETS_DESIRED) as usize;

        let mut results = Vec::with_capacity(targets.len());
        for target in targets {
            let record = match &target.parsed {
                ParsedUrl::Tweet { handle, id } => tweet_from_items(target, handle, id, &items),
                ParsedUrl::User { handle } => user_from_items(target, handle, count, &items),
            };
            match record {
                Some(ExtractionResult::SingleTweet(t)) => {
                    log.success(format!("Extracted tweet {}", t.tweet_data.id));
                    results.push(ExtractionResult::SingleTweet(t));
                }
                Some(ExtractionResult::UserTweets(u)) => {
                    log.success(format!(
                        "Extracted {} tweets from @{}",
                        u.total_tweets, target.parsed.id_or_handle()
                    ));
                    results.push(ExtractionResult::UserTweets(u));
                }
                None => {
                    tracing::warn!(url = %target.original_url, "extract.job.unmatched");
                    log.warning(format!("No job results for {}", target.original_url));
                }
            }
        }
        Ok(results)
    }
}

// ==============================
// Orchestrator
// ==============================

pub struct Extractor {
    source: Box<dyn RecordSource>,
    busy: BusyFlag,
}

impl Extractor {
    pub fn new(source: impl RecordSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            busy: BusyFlag::new("extraction"),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Run one batch. Per-URL failures are logged into `log`; a returned error
    /// means no batch was produced.
    pub async fn run(
        &self,
        req: &ExtractRequest,
        log: &mut ActivityLog,
    ) -> Result<ExtractionBatch, ExtractError> {
        let _guard = self.busy.try_acquire().map_err(|_| ExtractError::Busy)?;

        let url_count = req.non_empty_lines().count();
        tracing::info!(mode = %req.mode, urls = url_count, "extract.start");
        log.info(format!(
            "Starting extraction. Mode: {}, URLs: {url_count}",
            req.mode
        ));

        let results = match self.collect(req, log).await {
            Ok(results) => results,
            Err(e) => {
                tracing::error!(error = %e, "extract.failed");
                log.error(format!("Critical extraction error: {e}"));
                return Err(e);
            }
        };

        let batch = ExtractionBatch::new(req.mode, results);
        tracing::info!(records = batch.total_results(), "extract.done");
        if batch.is_empty() {
            log.warning("No records extracted");
        } else {
            log.success(format!(
                "Extraction completed: {} records",
                batch.total_results()
            ));
        }
        Ok(batch)
    }

    async fn collect(
        &self,
        req: &ExtractRequest,
        log: &mut ActivityLog,
    ) -> Result<Vec<ExtractionResult>, ExtractError> {
        let targets = prepare(req, log)?;
        self.source.collect(&targets, req, log).await
    }
}
