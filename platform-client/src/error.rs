//! Error type for the platform client.

use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server returned malformed response: {0}")]
    InvalidResponse(String),

    /// The server answered with `{"success": false, ...}`. `status` is the
    /// HTTP status code it used to convey the error kind.
    #[error("{message} ({status})")]
    Api { status: u16, message: String },

    #[error("invalid base url: {0}")]
    InvalidUrl(String),
}
