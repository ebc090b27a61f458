//! Field aliasing from upstream JSON onto the stable output schema.
//!
//! Providers (and revisions of the same provider) name the same metric
//! differently. Each output field has an ordered alias list; the first alias
//! holding a meaningful value wins. `null`, `""`, `0` and `false` are treated
//! as absent and fall through to the next alias.
use crate::twitter::url;
use insight_common::model::{Profile, TweetData, TweetSummary};
use serde_json::Value;

pub const TEXT_PLACEHOLDER: &str = "Text unavailable";

pub const TEXT: &[&str] = &["full_text", "text", "fullText"];
pub const CREATED_AT: &[&str] = &["created_at", "createdAt"];
pub const LIKES: &[&str] = &["favorite_count", "like_count", "likeCount", "favoriteCount"];
pub const RETWEETS: &[&str] = &["retweet_count", "retweetCount"];
pub const REPLIES: &[&str] = &["reply_count", "replyCount"];
pub const VIEWS: &[&str] = &["view_count", "viewCount", "views"];
pub const TWEET_ID: &[&str] = &["id_str", "id", "tweet_id", "tweetId"];

pub const USERNAME: &[&str] = &["username", "userName", "screen_name"];
pub const NAME: &[&str] = &["name", "display_name"];
pub const DESCRIPTION: &[&str] = &["description", "bio"];
pub const FOLLOWERS: &[&str] = &["followers_count", "followers", "followersCount"];
pub const FOLLOWING: &[&str] = &["following_count", "following", "followingCount", "friends_count"];
pub const TWEET_COUNT: &[&str] = &["statuses_count", "tweet_count", "statusesCount"];
pub const VERIFIED: &[&str] = &["verified", "isVerified", "isBlueVerified"];
pub const LOCATION: &[&str] = &["location"];
pub const PROFILE_IMAGE: &[&str] = &["profile_image_url", "profilePicture", "profile_image_url_https"];

const AUTHOR_OBJECTS: &[&str] = &["author", "user"];

/// First non-empty string among `keys`; numbers are rendered as text.
pub fn first_str(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match v.get(*k)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First non-zero count among `keys`, accepting numeric strings.
pub fn first_count(v: &Value, keys: &[&str]) -> u64 {
    keys.iter()
        .find_map(|k| {
            let n = match v.get(*k)? {
                Value::Number(n) => n
                    .as_u64()
                    .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64)),
                Value::String(s) => s.trim().replace(',', "").parse::<u64>().ok(),
                _ => None,
            }?;
            (n > 0).then_some(n)
        })
        .unwrap_or(0)
}

pub fn first_flag(v: &Value, keys: &[&str]) -> bool {
    keys.iter().any(|k| match v.get(*k) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}

/// Strip a `{ "data": { ... } }` envelope if present.
pub fn unwrap_envelope(v: &Value) -> &Value {
    match v.get("data") {
        Some(inner @ Value::Object(_)) => inner,
        _ => v,
    }
}

/// The tweet object of a lookup response, which may be bare or wrapped in a `tweets` list.
pub fn lookup_tweet(v: &Value) -> &Value {
    let v = unwrap_envelope(v);
    match v.get("tweets").and_then(Value::as_array).and_then(|a| a.first()) {
        Some(first) => first,
        None => v,
    }
}

/// Tweets of a timeline response: a bare array, or a `tweets` array at the top or under `data`.
pub fn tweet_list(v: &Value) -> Vec<&Value> {
    if let Some(items) = v.as_array() {
        return items.iter().collect();
    }
    let v = unwrap_envelope(v);
    if let Some(items) = v.as_array() {
        return items.iter().collect();
    }
    v.get("tweets")
        .and_then(Value::as_array)
        .map(|items| items.iter().collect())
        .unwrap_or_default()
}

/// Embedded author object of a tweet (`author` or `user`).
pub fn author_object(tweet: &Value) -> Option<&Value> {
    AUTHOR_OBJECTS
        .iter()
        .filter_map(|k| tweet.get(*k))
        .find(|a| a.is_object())
}

/// Handle of the tweet's author, if upstream reported one.
pub fn author_handle(tweet: &Value) -> Option<String> {
    author_object(tweet).and_then(|a| first_str(a, USERNAME))
}

pub fn tweet_data(v: &Value, id: &str) -> TweetData {
    TweetData {
        id: id.to_string(),
        text: first_str(v, TEXT).unwrap_or_else(|| TEXT_PLACEHOLDER.to_string()),
        created_at: first_str(v, CREATED_AT),
        like_count: first_count(v, LIKES),
        retweet_count: first_count(v, RETWEETS),
        reply_count: first_count(v, REPLIES),
        view_count: first_count(v, VIEWS),
    }
}

/// One timeline entry; `index` backs the id when upstream omits it.
pub fn tweet_summary(v: &Value, index: usize, handle: &str) -> TweetSummary {
    let id = first_str(v, TWEET_ID);
    let tweet_url = id.as_deref().map(|id| url::tweet_url(handle, id));
    let id = id.unwrap_or_else(|| format!("tweet_{index}"));
    TweetSummary {
        tweet: tweet_data(v, &id),
        tweet_url,
    }
}

/// Normalize a user object (bare or enveloped); `handle` backs a missing username.
pub fn profile(v: &Value, handle: &str) -> Profile {
    let v = unwrap_envelope(v);
    Profile {
        username: first_str(v, USERNAME).unwrap_or_else(|| handle.to_string()),
        name: first_str(v, NAME).unwrap_or_default(),
        description: first_str(v, DESCRIPTION).unwrap_or_default(),
        followers_count: first_count(v, FOLLOWERS),
        following_count: first_count(v, FOLLOWING),
        tweet_count: first_count(v, TWEET_COUNT),
        verified: first_flag(v, VERIFIED),
        location: first_str(v, LOCATION).unwrap_or_default(),
        profile_image_url: first_str(v, PROFILE_IMAGE).unwrap_or_default(),
    }
}
