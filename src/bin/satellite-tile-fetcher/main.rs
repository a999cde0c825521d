mod args;
mod validators;

use anyhow::Result;
use args::Args;
use satellite_tile_fetcher::{fetch_images, plan, RecordSource};

/// Rough size of a 256x256 satellite image.
const APPROX_IMAGE_BYTES: f64 = 50_000f64;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.dry_run {
        for job in &args.jobs {
            let source = RecordSource::from_path(&job.input)?;
            let plan = plan(&source, &job.output_dir);

            eprintln!(
                "{}: would download {} images (approx {}), {} already present, {} malformed rows",
                job.input.display(),
                plan.pending,
                pretty_bytes::converter::convert((plan.pending as f64) * APPROX_IMAGE_BYTES),
                plan.present,
                plan.malformed,
            );
        }

        return Ok(());
    }

    let config = args.config()?;

    for job in &args.jobs {
        let report = fetch_images(&job.input, &job.output_dir, &config).await?;
        eprintln!("{}", report);
    }

    Ok(())
}
