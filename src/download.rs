use anyhow::{Context, Result};
use clap::crate_version;
use futures::future::{BoxFuture, FutureExt};
use reqwest::StatusCode;

use crate::config::{Config, ZERO_DURATION};
use crate::error::FetchError;

/// The transport's answer to an image request.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Something that can fetch the bytes behind a URL.
///
/// Implemented over HTTP by [`HttpDownloader`]. The batch fetcher bounds
/// every call by [`Config::timeout`], running into that bound is a
/// [`FetchError::Transport`].
pub trait Download {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Response, FetchError>>;
}

/// Fetches images using a shared `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new(cfg: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if cfg.timeout > ZERO_DURATION {
            builder = builder.timeout(cfg.timeout);
        }

        let mut headers = reqwest::header::HeaderMap::new();
        headers.append(
            reqwest::header::USER_AGENT,
            format!("satellite-tile-fetcher_rs_{}", crate_version!())
                .parse()
                .context("invalid user agent")?,
        );

        let client = builder
            .default_headers(headers)
            .build()
            .context("failed creating HTTP client")?;

        Ok(Self { client })
    }
}

impl Download for HttpDownloader {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Response, FetchError>> {
        async move {
            let response = self.client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Ok(Response {
                    status,
                    body: Vec::new(),
                });
            }

            let body = response.bytes().await?.to_vec();

            Ok(Response { status, body })
        }
        .boxed()
    }
}
