use std::time::Duration;
use thiserror::Error;

/// Errors raised while driving the platform and Slack.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Non-2xx response from the platform API
    #[error("{method} {url} returned {status}: {body}")]
    Http {
        method: String,
        url: String,
        status: u16,
        body: String,
    },
    /// Transport-level failure
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Response body did not match the expected shape
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Slack Web API answered with `ok: false`
    #[error("Slack {method} failed: {error}")]
    Slack { method: String, error: String },
    /// A wait helper never saw its job complete after the fence
    #[error("{operation} not completed within {waited:?}")]
    Timeout { operation: String, waited: Duration },
    /// Required environment variable is unset
    #[error("Missing environment variable: {0}")]
    MissingEnv(String),
    /// Resource not found
    #[error("Not Found: {0}")]
    NotFound(String),
    /// Login did not yield a session cookie
    #[error("Login failed: {0}")]
    Login(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A scenario check did not hold
    #[error("Expectation failed: {0}")]
    Expectation(String),
}

impl HarnessError {
    /// Slack error code, if this is a Slack API failure.
    pub fn slack_code(&self) -> Option<&str> {
        match self {
            HarnessError::Slack { error, .. } => Some(error.as_str()),
            _ => None,
        }
    }

    /// HTTP status, if this is a non-2xx platform response.
    pub fn status(&self) -> Option<u16> {
        match self {
            HarnessError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;
