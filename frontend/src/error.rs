use reqwest::StatusCode;
use thiserror::Error;

use crate::models::PageInvariantError;

/// A listing request that did not produce a usable page. Callers treat
/// every variant the same way; the split only helps the log line.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend answered {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed page: {0}")]
    MalformedPage(#[from] PageInvariantError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("identity provider request failed: {0}")]
    Provider(#[from] reqwest::Error),

    #[error("identity provider answered {status}: {body}")]
    ProviderStatus { status: StatusCode, body: String },

    #[error("login state does not match the pending request")]
    StateMismatch,

    #[error("no refresh token in session")]
    MissingRefreshToken,

    #[error("invalid identity provider url: {0}")]
    InvalidUrl(String),
}

pub type SessionResult<T> = Result<T, SessionError>;
