use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tokio::fs;

use crate::config::{Config, ZERO_DURATION};
use crate::download::{Download, HttpDownloader};
use crate::error::FetchError;
use crate::outcome::{Outcome, RecordOutcome, Report};
use crate::record::{Record, RecordSource};
use crate::url::build_url;

/// Reads the CSV file at `csv_path` and fetches an image for every row into
/// `output_folder` over HTTP.
///
/// # Example
/// ```rust,no_run
/// use satellite_tile_fetcher::{fetch_images, Config};
///
/// # #[tokio::main]
/// # async fn main() {
/// let config = Config::from_env().expect("MAPBOX_API_KEY must be set");
///
/// let report = fetch_images("data/raw/train.csv", "data/images/train", &config)
///     .await
///     .expect("failed fetching images");
/// println!("{}", report);
/// # }
/// ```
pub async fn fetch_images(
    csv_path: impl AsRef<Path>,
    output_folder: impl AsRef<Path>,
    cfg: &Config,
) -> Result<Report> {
    let source = RecordSource::from_path(csv_path)?;
    let downloader = HttpDownloader::new(cfg)?;

    fetch_all(&source, output_folder.as_ref(), cfg, &downloader).await
}

/// Fetches an image for every record of `source` and stores it as
/// `{id}_{ordinal}.png` in `output_folder`.
///
/// Records whose file already exists are skipped without a request, so
/// running a batch again only fetches what is still missing. Records are
/// handled one after the other. A failing record is reported and left
/// absent, it never aborts the batch.
///
/// Creates the output folder recursively if required. Only problems with
/// the output folder itself are returned as an error.
pub async fn fetch_all(
    source: &RecordSource,
    output_folder: &Path,
    cfg: &Config,
    downloader: &dyn Download,
) -> Result<Report> {
    prepare_output_folder(output_folder).await?;

    eprintln!("Fetching images for: {}", source.label());
    eprintln!("Total rows: {}", source.len());

    let pb = if source.is_empty() {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(source.len() as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:60.cyan/blue} {pos:>7}/{len:7} ETA: {eta} {msg}")
            .progress_chars("##-"),
    );

    let mut report = Report::new(output_folder);

    for (ordinal, row) in source.records() {
        let (target, outcome) = match row {
            Ok(record) => {
                let target = record.target_path(output_folder, ordinal);
                let outcome = fetch_record(&record, &target, cfg, downloader).await;
                (Some(target), outcome)
            }
            Err(e) => (None, Outcome::Failed(e)),
        };

        if let Outcome::Failed(e) = &outcome {
            print_line(&pb, &failure_message(ordinal, target.as_deref(), e));
        }

        pb.inc(1);
        report.push(RecordOutcome {
            ordinal,
            target,
            outcome,
        });
    }

    pb.finish_and_clear();
    eprintln!("Completed: {}", output_folder.display());

    Ok(report)
}

/// How many records of a batch would be fetched.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Plan {
    /// Records without an image on disk.
    pub pending: usize,

    /// Records whose image already exists.
    pub present: usize,

    /// Rows that could not be read as a record.
    pub malformed: usize,
}

/// Determines what [`fetch_all`] would do, without any requests or writes.
pub fn plan(source: &RecordSource, output_folder: &Path) -> Plan {
    source
        .records()
        .fold(Plan::default(), |mut plan, (ordinal, row)| {
            match row {
                Ok(record) if record.target_path(output_folder, ordinal).exists() => {
                    plan.present += 1
                }
                Ok(_) => plan.pending += 1,
                Err(_) => plan.malformed += 1,
            }
            plan
        })
}

async fn prepare_output_folder(output_folder: &Path) -> Result<()> {
    if output_folder.exists() {
        if !output_folder.is_dir() {
            bail!("output {} must be a directory", output_folder.display());
        }
        return Ok(());
    }

    fs::create_dir_all(output_folder).await.with_context(|| {
        format!(
            "failed to create output directory {}",
            output_folder.display()
        )
    })
}

async fn fetch_record(
    record: &Record,
    target: &Path,
    cfg: &Config,
    downloader: &dyn Download,
) -> Outcome {
    // already downloaded by an earlier run
    if target.exists() {
        return Outcome::Skipped;
    }

    match download(record, target, cfg, downloader).await {
        Ok(bytes) => Outcome::Saved { bytes },
        Err(e) => Outcome::Failed(e),
    }
}

async fn download(
    record: &Record,
    target: &Path,
    cfg: &Config,
    downloader: &dyn Download,
) -> Result<usize, FetchError> {
    let url = build_url(record.lat, record.lon, cfg)?;

    let response = if cfg.timeout > ZERO_DURATION {
        tokio::time::timeout(cfg.timeout, downloader.fetch(&url))
            .await
            .map_err(|_| {
                FetchError::Transport(format!("no response within {:?}", cfg.timeout))
            })??
    } else {
        downloader.fetch(&url).await?
    };

    if !response.status.is_success() {
        return Err(FetchError::Status {
            status: response.status,
        });
    }

    fs::write(target, &response.body)
        .await
        .map_err(|source| FetchError::Io {
            path: target.to_path_buf(),
            source,
        })?;

    Ok(response.body.len())
}

fn failure_message(ordinal: usize, target: Option<&Path>, e: &FetchError) -> String {
    let target = match target {
        Some(path) => path.display().to_string(),
        None => format!("row {}", ordinal),
    };

    match e {
        FetchError::Status { status } => format!("Failed ({}) -> {}", status.as_u16(), target),
        e => format!("Error for {}: {}", target, e),
    }
}

fn print_line(pb: &ProgressBar, line: &str) {
    if pb.is_hidden() {
        eprintln!("{}", line);
    } else {
        pb.println(line);
    }
}
