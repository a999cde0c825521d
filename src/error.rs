use reqwest::StatusCode;
use std::{io, path::PathBuf};
use thiserror::Error;

use crate::config::ACCESS_TOKEN_ENV;

/// Problems with the run configuration.
///
/// These are detected before any record is read and abort the whole run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "{} not found. Set it using: export {}=<your token>",
        ACCESS_TOKEN_ENV,
        ACCESS_TOKEN_ENV
    )]
    MissingAccessToken,

    #[error("the access token must not be empty")]
    EmptyAccessToken,

    #[error("invalid URL template `{template}`: {reason}")]
    InvalidUrlTemplate { template: String, reason: String },
}

/// Why a single record could not be materialized.
///
/// None of these abort a batch. The record's file is left absent so the
/// next run picks it up again.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("malformed record: {0}")]
    Record(String),

    #[error("failed formatting URL: {0}")]
    Url(String),

    #[error("received status {status}")]
    Status { status: StatusCode },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("failed writing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Transport(format!("timed out: {}", e))
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}
