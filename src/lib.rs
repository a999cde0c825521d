//! Download a satellite image for every row of a CSV file.
//!
//! Every row names an `id` and a coordinate (`lat`, `long`). The image for
//! a row is requested from a static map provider (Mapbox by default) and
//! stored as `{id}_{row}.png`, `row` being the 0-based position of the row
//! in the file. Images already on disk are not requested again, so an
//! interrupted or partially failed run is completed by simply running it
//! again.
//!
//! # Usage
//!
//! The access token is read from the `MAPBOX_API_KEY` environment variable.
//!
//! # CLI Example
//!
//! ```bash
//! MAPBOX_API_KEY=pk.xxx satellite-tile-fetcher \
//!   --input data/raw/train.csv --output data/images/train \
//!   --input data/raw/test.csv --output data/images/test \
//!   --zoom 17 \
//!   --size 256
//! ```
//!
//! # Library Example
//! ```rust,no_run
//! use satellite_tile_fetcher::{fetch_all, Config, HttpDownloader, RecordSource};
//! use std::{path::Path, time::Duration};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::from_env()?
//!     .with_zoom(16)
//!     .with_timeout(Duration::from_secs(30));
//! let source = RecordSource::from_path("data/raw/train.csv")?;
//! let downloader = HttpDownloader::new(&config)?;
//!
//! let report = fetch_all(&source, Path::new("data/images/train"), &config, &downloader).await?;
//! eprintln!("{}", report);
//! # Ok(())
//! # }
//! ```

mod config;
mod download;
mod error;
mod fetch;
mod outcome;
mod record;
mod url;

pub use config::{
    Config, ACCESS_TOKEN_ENV, DEFAULT_IMAGE_SIZE, DEFAULT_STYLE, DEFAULT_TIMEOUT,
    DEFAULT_ZOOM, MAPBOX_URL_TEMPLATE,
};
pub use download::{Download, HttpDownloader, Response};
pub use error::{ConfigError, FetchError};
pub use fetch::{fetch_all, fetch_images, plan, Plan};
pub use outcome::{Outcome, RecordOutcome, Report};
pub use record::{check_id, target_path, Record, RecordSource};
pub use url::build_url;

pub use reqwest::StatusCode;
