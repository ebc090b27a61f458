//! Minimal HTTP client with safe logging and flexible auth.
//!
//! - Request options: headers, `Auth`, query params, timeout
//! - Redacts sensitive query params and never logs secret values
//! - One attempt per request: failures surface immediately with status and body
//! - Optional *raw* request/response logging via `INSIGHT_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), insight_http::HttpError> {
//! let client = insight_http::HttpClient::new("https://api.example.com")?;
//! let got: serde_json::Value = client
//!     .get_json("v1/items", insight_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Security: `Auth::Bearer` values are sanitized before use, and logs only
//! ever include the auth kind (bearer/header/query/none), not the secret.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::env;
use std::time::Duration;
use thiserror::Error;

pub use reqwest::StatusCode;

const RAW_ENV: &str = "INSIGHT_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_MAX: usize = 500;

const SECRET_PARAMS: &[&str] = &[
    "access_token",
    "authorization",
    "auth",
    "key",
    "api_key",
    "apikey",
    "token",
    "secret",
    "client_secret",
    "bearer",
];

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn is_secret_param(name: &str) -> bool {
    SECRET_PARAMS.contains(&name.to_ascii_lowercase().as_str())
}

fn is_secret_header(name: &str) -> bool {
    let lname = name.to_ascii_lowercase();
    lname == "authorization" || lname.contains("api-key") || lname.contains("token")
}

/// Render a best-effort curl command for repro/debug, with secrets redacted.
fn make_curl(method: &Method, url: &Url, headers: &HeaderMap, body: Option<&[u8]>) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{method}")];
    for (name, val) in headers.iter() {
        let v = if is_secret_header(name.as_str()) {
            "<redacted>".to_string()
        } else {
            val.to_str().unwrap_or("").to_string()
        };
        parts.push(format!(
            "-H '{}: {}'",
            name.as_str(),
            v.replace('\'', r"'\''")
        ));
    }
    if let Some(bytes) = body {
        match std::str::from_utf8(bytes) {
            Ok(s) => {
                let mut s = s.to_string();
                truncate_on_char_boundary(&mut s, RAW_MAX_BODY);
                parts.push(format!("-d '{}'", s.replace('\'', r"'\''")));
            }
            Err(_) => parts.push(format!("--data-binary @- # ({} bytes)", bytes.len())),
        }
    }
    let mut shown = url.clone();
    let redacted: Vec<(String, String)> = redact_pairs(url);
    if !redacted.is_empty() {
        shown.query_pairs_mut().clear().extend_pairs(redacted);
    }
    parts.push(format!("'{}'", shown.as_str()));
    parts.join(" ")
}

fn redact_pairs(url: &Url) -> Vec<(String, String)> {
    url.query_pairs()
        .map(|(k, v)| {
            let v = if is_secret_param(&k) {
                "<redacted>".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect()
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}")]
    Api {
        status: StatusCode,
        message: String,
        /// Response body, truncated for display.
        body: String,
    },
}

impl HttpError {
    /// Status code for upstream rejections, `None` for local or transport failures.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ==============================
// Auth & Request Options
// ==============================

/// Authentication strategies supported by the HTTP client helpers.
///
/// ```
/// use insight_http::Auth;
///
/// let auth = Auth::api_key_header("X-API-Key", "secret").unwrap();
/// assert!(matches!(auth, Auth::Header { .. }));
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// Authorization: Bearer <token>
    Bearer(&'a str),
    /// Custom header (e.g. `X-API-Key`)
    Header {
        name: HeaderName,
        value: HeaderValue,
    },
    /// Auth via query param
    Query {
        name: &'a str,
        value: Cow<'a, str>,
    },
    None,
}

impl Auth<'_> {
    /// Build a custom-header auth, validating both name and value.
    pub fn api_key_header(name: &str, key: &str) -> Result<Self, HttpError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| HttpError::Build(format!("invalid header name: {e}")))?;
        let mut value = HeaderValue::from_str(&sanitize_api_key(key)?)
            .map_err(|e| HttpError::Build(format!("invalid header value: {e}")))?;
        value.set_sensitive(true);
        Ok(Auth::Header { name, value })
    }

    fn kind(&self) -> &'static str {
        match self {
            Auth::Bearer(_) => "bearer",
            Auth::Header { .. } => "header",
            Auth::Query { .. } => "query",
            Auth::None => "none",
        }
    }
}

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use insight_http::{Auth, RequestOpts};
/// use std::borrow::Cow;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     auth: Some(Auth::Bearer("token")),
///     query: Some(vec![("userName", Cow::Borrowed("alice"))]),
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 30);
/// assert!(!opts.allow_absolute);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub auth: Option<Auth<'a>>,
    pub headers: Option<HeaderMap>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
    /// If true and `path` is an absolute URL, use it as-is (ignore base).
    pub allow_absolute: bool,
}

// ==============================
// Client
// ==============================

#[derive(Clone, Debug)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// A trailing slash is added to the base so relative paths join beneath it.
    ///
    /// ```no_run
    /// use insight_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com/v1")?;
    /// assert_eq!(client.base_url().as_str(), "https://api.example.com/v1/");
    /// assert_eq!(client.default_timeout, Duration::from_secs(30));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let normalized = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        };
        let base = Url::parse(&normalized).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(30),
        })
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// GET JSON with per-request options.
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        self.request_json::<(), T>(Method::GET, path, None, opts)
            .await
    }

    /// POST a JSON body with per-request options.
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(Method::POST, path, Some(body), opts)
            .await
    }

    fn resolve(&self, path: &str, allow_absolute: bool) -> Result<Url, HttpError> {
        if allow_absolute {
            if let Ok(abs) = Url::parse(path) {
                return Ok(abs);
            }
        }
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| HttpError::Url(e.to_string()))
    }

    async fn request_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut url = self.resolve(path, opts.allow_absolute)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in opts.query.iter().flatten() {
                pairs.append_pair(k, v);
            }
            if let Some(Auth::Query { name, value }) = &opts.auth {
                pairs.append_pair(name, value);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let mut rb = self
            .inner
            .request(method.clone(), url.clone())
            .timeout(timeout)
            .header(reqwest::header::ACCEPT, "application/json");

        let request_body = match body {
            Some(b) => Some(serde_json::to_vec(b).map_err(|e| HttpError::Build(e.to_string()))?),
            None => None,
        };
        if let Some(bytes) = &request_body {
            rb = rb
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(bytes.clone());
        }

        if let Some(hdrs) = &opts.headers {
            rb = rb.headers(hdrs.clone());
        }

        match &opts.auth {
            Some(Auth::Bearer(tok)) => {
                rb = rb.bearer_auth(sanitize_api_key(tok)?);
            }
            Some(Auth::Header { name, value }) => {
                rb = rb.header(name, value);
            }
            Some(Auth::Query { .. }) | Some(Auth::None) | None => {}
        }

        let auth_kind = opts.auth.as_ref().map(Auth::kind).unwrap_or("none");
        let host_path = format!("{}{}", url.host_str().unwrap_or("-"), url.path());

        tracing::debug!(
            %method,
            host_path = %host_path,
            query = ?redact_pairs(&url),
            timeout_ms = timeout.as_millis() as u64,
            auth_kind,
            has_body = request_body.is_some(),
            "http.request.start"
        );

        if raw_enabled() {
            let curl = make_curl(
                &method,
                &url,
                opts.headers.as_ref().unwrap_or(&HeaderMap::new()),
                request_body.as_deref(),
            );
            tracing::debug!(target: "http.raw", %curl, "request");
        }

        let t0 = std::time::Instant::now();
        let resp = rb.send().await.map_err(|err| {
            tracing::warn!(host_path = %host_path, message = %err, "http.network_error.send");
            HttpError::Network(err.to_string())
        })?;
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|err| {
            tracing::warn!(host_path = %host_path, message = %err, "http.network_error.body");
            HttpError::Network(err.to_string())
        })?;
        let duration_ms = t0.elapsed().as_millis() as u64;
        let snippet = snip_body(&bytes);

        tracing::debug!(
            host_path = %host_path,
            %status,
            duration_ms,
            body_len = bytes.len(),
            "http.response"
        );
        if raw_enabled() {
            let mut text = String::from_utf8_lossy(&bytes).into_owned();
            truncate_on_char_boundary(&mut text, RAW_MAX_BODY);
            tracing::debug!(target: "http.raw", %status, body = %text, "response");
        }

        if status.is_success() {
            return serde_json::from_slice::<T>(&bytes).map_err(|e| {
                tracing::warn!(
                    host_path = %host_path,
                    serde_err = %e,
                    body_snippet = %snippet,
                    "http.response.decode_error"
                );
                HttpError::Decode(e.to_string(), snippet)
            });
        }

        let message = extract_error_message(&bytes);
        tracing::warn!(
            host_path = %host_path,
            %status,
            message = %message,
            body_snippet = %snippet,
            "http.error"
        );
        Err(HttpError::Api {
            status,
            message,
            body: snippet,
        })
    }
}

// ==============================
// Helpers
// ==============================

/// Pull a human-readable message out of the usual JSON error envelopes.
fn extract_error_message(body: &[u8]) -> String {
    let Ok(v) = serde_json::from_slice::<serde_json::Value>(body) else {
        return snip_body(body);
    };

    let non_empty = |v: Option<&serde_json::Value>| {
        v.and_then(|s| s.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    // {"error":{"message":"..."}} (OpenAI, Apify)
    if let Some(msg) = non_empty(v.get("error").and_then(|e| e.get("message"))) {
        return msg;
    }
    // {"errors":[{"message"|"detail"|"title": "..."}]}
    if let Some(first) = v.get("errors").and_then(|e| e.get(0)) {
        for key in ["message", "detail", "title"] {
            if let Some(msg) = non_empty(first.get(key)) {
                return msg;
            }
        }
    }
    // {"message"|"msg"|"detail"|"error": "..."}
    for key in ["message", "msg", "detail", "error"] {
        if let Some(msg) = non_empty(v.get(key)) {
            return msg;
        }
    }
    snip_body(body)
}

fn truncate_on_char_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
    s.push_str("...");
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).into_owned();
    truncate_on_char_boundary(&mut snip, SNIPPET_MAX);
    snip
}

fn sanitize_api_key(raw: &str) -> Result<String, HttpError> {
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    s.retain(|ch| !ch.is_ascii_whitespace());

    if s.is_empty() {
        return Err(HttpError::Build("API key is empty".into()));
    }
    if !s.is_ascii() {
        return Err(HttpError::Build("API key contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build(
            "API key contains control characters".into(),
        ));
    }
    HeaderValue::from_str(&format!("Bearer {s}"))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_quotes_and_whitespace() {
        assert_eq!(sanitize_api_key("  \"sk-abc 123\n\" ").unwrap(), "sk-abc123");
    }

    #[test]
    fn sanitize_rejects_empty_and_non_ascii() {
        assert!(sanitize_api_key("   ").is_err());
        assert!(sanitize_api_key("ключ").is_err());
    }

    #[test]
    fn error_message_prefers_nested_envelopes() {
        assert_eq!(
            extract_error_message(br#"{"error":{"message":"Incorrect API key"}}"#),
            "Incorrect API key"
        );
        assert_eq!(
            extract_error_message(br#"{"errors":[{"detail":"Not Found Error"}]}"#),
            "Not Found Error"
        );
        assert_eq!(
            extract_error_message(br#"{"status":"error","msg":"user not found"}"#),
            "user not found"
        );
        assert_eq!(extract_error_message(b"Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn snippets_are_truncated_on_char_boundaries() {
        let body = "ж".repeat(400);
        let snip = snip_body(body.as_bytes());
        assert!(snip.ends_with("..."));
        assert!(snip.len() <= SNIPPET_MAX + 3);
    }

    #[test]
    fn curl_redacts_secret_query_and_headers() {
        let url = Url::parse("https://api.example.com/x?userName=bob&token=abc").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("supersecret"));
        let curl = make_curl(&Method::GET, &url, &headers, None);
        assert!(!curl.contains("abc"));
        assert!(!curl.contains("supersecret"));
        assert!(curl.contains("userName=bob"));
    }

    #[test]
    fn relative_paths_join_under_base() {
        let client = HttpClient::new("https://api.example.com/v2").unwrap();
        let url = client.resolve("/acts/run", false).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v2/acts/run");
    }
}
