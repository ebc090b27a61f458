use crate::twitter::job::JobState;
use insight_http::HttpError;
use thiserror::Error;

/// Failures that abort a whole extraction run.
///
/// Per-URL problems (unparseable input, a missing author profile) are logged
/// and skipped instead; they never surface here.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{0} is not configured")]
    MissingCredential(&'static str),
    #[error("no URLs provided")]
    EmptyInput,
    #[error("extraction already in progress")]
    Busy,
    #[error("HTTP client setup failed: {0}")]
    Client(#[source] HttpError),
    #[error("Failed to start job: {}", describe(.0))]
    JobStart(#[source] HttpError),
    #[error("Failed to check status of job {run_id}: {}", describe(.source))]
    JobPoll {
        run_id: String,
        #[source]
        source: HttpError,
    },
    #[error("Job {run_id} ended with status {state}")]
    JobEnded { run_id: String, state: JobState },
    #[error("Failed to fetch results of job {run_id}: {}", describe(.source))]
    JobDataset {
        run_id: String,
        #[source]
        source: HttpError,
    },
}

/// Upstream rejections read as `<status> - <body>`; other failures use their own message.
pub fn describe(err: &HttpError) -> String {
    match err {
        HttpError::Api { status, body, .. } => format!("{} - {}", status.as_u16(), body),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_errors_carry_run_and_state() {
        let err = ExtractError::JobEnded {
            run_id: "r1".into(),
            state: JobState::Failed,
        };
        assert_eq!(err.to_string(), "Job r1 ended with status FAILED");
    }

    #[test]
    fn transport_failures_keep_their_message() {
        let err = ExtractError::JobStart(HttpError::Network("connection refused".into()));
        assert_eq!(
            err.to_string(),
            "Failed to start job: network error: connection refused"
        );
    }
}
