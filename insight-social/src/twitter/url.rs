//! Classification of pasted Twitter/X URLs.
//!
//! Query strings and fragments are dropped first. A status URL always wins
//! over a profile reading of the same string, and a bare `status` segment is
//! never taken for a handle. Handles are not validated beyond that.
use insight_common::model::ExtractionType;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static TWEET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[/.])(?:twitter|x)\.com/([^/]+)/status/(\d+)").expect("tweet URL pattern")
});

static USER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[/.])(?:twitter|x)\.com/([^/]+)/?$").expect("profile URL pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlKind {
    Tweet,
    User,
}

impl UrlKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrlKind::Tweet => "tweet",
            UrlKind::User => "user",
        }
    }

    /// Whether URLs of this kind are processed in the given extraction mode.
    pub fn fits(&self, mode: ExtractionType) -> bool {
        matches!(
            (self, mode),
            (UrlKind::Tweet, ExtractionType::Tweets) | (UrlKind::User, ExtractionType::Accounts)
        )
    }
}

impl fmt::Display for UrlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedUrl {
    /// `handle` is the path segment before `/status/`; upstream may report a different author.
    Tweet { handle: String, id: String },
    User { handle: String },
}

impl ParsedUrl {
    pub fn kind(&self) -> UrlKind {
        match self {
            ParsedUrl::Tweet { .. } => UrlKind::Tweet,
            ParsedUrl::User { .. } => UrlKind::User,
        }
    }

    /// Numeric status id for tweets, handle for profiles.
    pub fn id_or_handle(&self) -> &str {
        match self {
            ParsedUrl::Tweet { id, .. } => id,
            ParsedUrl::User { handle } => handle,
        }
    }
}

fn strip_query_and_fragment(raw: &str) -> &str {
    let no_query = raw.split('?').next().unwrap_or(raw);
    no_query.split('#').next().unwrap_or(no_query)
}

/// Classify one input line. `None` means the URL matches neither pattern.
pub fn classify(raw: &str) -> Option<ParsedUrl> {
    let clean = strip_query_and_fragment(raw.trim());

    if let Some(caps) = TWEET_RE.captures(clean) {
        return Some(ParsedUrl::Tweet {
            handle: caps[1].to_string(),
            id: caps[2].to_string(),
        });
    }

    let handle = USER_RE.captures(clean).map(|caps| caps[1].to_string())?;
    if handle.eq_ignore_ascii_case("status") {
        return None;
    }
    Some(ParsedUrl::User { handle })
}

pub fn tweet_url(handle: &str, id: &str) -> String {
    format!("https://twitter.com/{handle}/status/{id}")
}

pub fn profile_url(handle: &str) -> String {
    format!("https://twitter.com/{handle}")
}
