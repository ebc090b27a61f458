//! Direct scraping API client.
//!
//! Three read endpoints, all authenticated with an `X-API-Key` header. Responses
//! are returned as raw JSON because field names drift between API revisions;
//! [`crate::twitter::normalize`] maps them onto the output schema.
use async_trait::async_trait;
use insight_http::{Auth, HttpClient, HttpError, RequestOpts};
use serde_json::Value;
use std::borrow::Cow;
use std::time::Duration;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Read access to tweets and profiles. Implemented by [`TwitterApi`] and by test fakes.
#[async_trait]
pub trait ScrapeApi: Send + Sync {
    async fn tweet_lookup(&self, tweet_id: &str) -> Result<Value, HttpError>;
    async fn user_info(&self, handle: &str) -> Result<Value, HttpError>;
    async fn last_tweets(&self, handle: &str) -> Result<Value, HttpError>;
}

#[derive(Clone)]
pub struct TwitterApi {
    http: HttpClient,
    auth: Auth<'static>,
}

impl std::fmt::Debug for TwitterApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterApi")
            .field("base", &self.http.base_url().as_str())
            .finish_non_exhaustive()
    }
}

impl TwitterApi {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, HttpError> {
        let http = HttpClient::new(base_url)?.with_timeout(timeout);
        let auth = Auth::api_key_header(API_KEY_HEADER, api_key)?;
        Ok(Self { http, auth })
    }

    async fn get(&self, path: &str, param: &'static str, value: &str) -> Result<Value, HttpError> {
        let resp: Value = self
            .http
            .get_json(
                path,
                RequestOpts {
                    auth: Some(self.auth.clone()),
                    query: Some(vec![(param, Cow::Borrowed(value))]),
                    ..Default::default()
                },
            )
            .await?;
        tracing::debug!(path, %value, "scrape api response received");
        Ok(resp)
    }
}

#[async_trait]
impl ScrapeApi for TwitterApi {
    async fn tweet_lookup(&self, tweet_id: &str) -> Result<Value, HttpError> {
        self.get("twitter/tweet/lookup", "tweetId", tweet_id).await
    }

    async fn user_info(&self, handle: &str) -> Result<Value, HttpError> {
        self.get("twitter/user/info", "userName", handle).await
    }

    async fn last_tweets(&self, handle: &str) -> Result<Value, HttpError> {
        self.get("twitter/user/last_tweets", "userName", handle).await
    }
}
