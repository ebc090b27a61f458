//! Stable output schema for extraction runs.
//!
//! Upstream providers disagree on field names; everything in here is the
//! normalized shape that gets exported and fed to the analyzer. Outer records
//! use camelCase keys and tweet metrics use snake_case, matching the export
//! format consumers already parse.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which kind of URL a run is meant to process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionType {
    /// Individual status URLs.
    #[default]
    Tweets,
    /// Bare profile URLs.
    Accounts,
}

impl ExtractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionType::Tweets => "tweets",
            ExtractionType::Accounts => "accounts",
        }
    }
}

impl fmt::Display for ExtractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tweets" | "tweet" => Ok(ExtractionType::Tweets),
            "accounts" | "account" | "users" => Ok(ExtractionType::Accounts),
            other => Err(format!(
                "unknown extraction type '{other}' (expected 'tweets' or 'accounts')"
            )),
        }
    }
}

/// Normalized account profile. Missing upstream fields default to empty/zero.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub username: String,
    pub name: String,
    pub description: String,
    pub followers_count: u64,
    pub following_count: u64,
    pub tweet_count: u64,
    pub verified: bool,
    pub location: String,
    pub profile_image_url: String,
}

/// Content and public metrics of one tweet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TweetData {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub view_count: u64,
}

/// One entry of a profile's recent tweets.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TweetSummary {
    #[serde(flatten)]
    pub tweet: TweetData,
    /// `None` when upstream did not report an id for the tweet.
    #[serde(rename = "tweetUrl", default)]
    pub tweet_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleTweet {
    pub original_url: String,
    pub tweet_url: String,
    pub tweet_data: TweetData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_profile: Option<Profile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTweets {
    pub original_url: String,
    pub profile_url: String,
    pub user_profile: Profile,
    pub tweets: Vec<TweetSummary>,
    pub total_tweets: usize,
}

impl UserTweets {
    /// Build a record, keeping `total_tweets` in step with `tweets`.
    pub fn new(
        original_url: String,
        profile_url: String,
        user_profile: Profile,
        tweets: Vec<TweetSummary>,
    ) -> Self {
        let total_tweets = tweets.len();
        Self {
            original_url,
            profile_url,
            user_profile,
            tweets,
            total_tweets,
        }
    }
}

/// A successfully processed input URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtractionResult {
    SingleTweet(SingleTweet),
    UserTweets(UserTweets),
}

impl ExtractionResult {
    /// The input line this record was produced from.
    pub fn original_url(&self) -> &str {
        match self {
            ExtractionResult::SingleTweet(t) => &t.original_url,
            ExtractionResult::UserTweets(u) => &u.original_url,
        }
    }

    /// Discriminant as it appears in exported JSON.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionResult::SingleTweet(_) => "single_tweet",
            ExtractionResult::UserTweets(_) => "user_tweets",
        }
    }
}

/// Results of one user-triggered extraction run.
///
/// Constructed once via [`ExtractionBatch::new`] and never mutated afterwards;
/// `total_results` always equals `results.len()` for batches built here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionBatch {
    extracted_at: DateTime<Utc>,
    extraction_type: ExtractionType,
    total_results: usize,
    results: Vec<ExtractionResult>,
}

impl ExtractionBatch {
    pub fn new(extraction_type: ExtractionType, results: Vec<ExtractionResult>) -> Self {
        Self::at(Utc::now(), extraction_type, results)
    }

    pub fn at(
        extracted_at: DateTime<Utc>,
        extraction_type: ExtractionType,
        results: Vec<ExtractionResult>,
    ) -> Self {
        Self {
            extracted_at,
            extraction_type,
            total_results: results.len(),
            results,
        }
    }

    pub fn extracted_at(&self) -> DateTime<Utc> {
        self.extracted_at
    }

    pub fn extraction_type(&self) -> ExtractionType {
        self.extraction_type
    }

    pub fn total_results(&self) -> usize {
        self.total_results
    }

    pub fn results(&self) -> &[ExtractionResult] {
        &self.results
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// A saved analysis prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    pub content: String,
}

impl Prompt {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}
