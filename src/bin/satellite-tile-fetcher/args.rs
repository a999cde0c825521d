use clap::{
    app_from_crate, crate_authors, crate_description, crate_name, crate_version,
    value_t, App, Arg, ArgMatches, ErrorKind,
};
use std::{path::PathBuf, time::Duration};

use crate::validators::*;
use satellite_tile_fetcher::{Config, ConfigError};

const INPUT_ARG: &str = "input";
const OUTPUT_DIR_ARG: &str = "output_dir";
const ZOOM_ARG: &str = "zoom";
const SIZE_ARG: &str = "size";
const STYLE_ARG: &str = "style";
const URL_ARG: &str = "url";
const TIMEOUT_ARG: &str = "timeout";
const DRY_RUN_ARG: &str = "dry_run";

/// Jobs run when neither `--input` nor `--output` is given.
const DEFAULT_JOBS: &[(&str, &str)] = &[
    ("data/raw/train.csv", "data/images/train"),
    ("data/raw/test.csv", "data/images/test"),
];

/// A CSV file and the folder its images go to.
pub struct Job {
    pub input: PathBuf,
    pub output_dir: PathBuf,
}

pub struct Args {
    pub jobs: Vec<Job>,
    pub zoom: u8,
    pub image_size: u16,
    pub style: String,
    pub url: Option<String>,
    pub timeout: Duration,
    pub dry_run: bool,
}

impl Args {
    pub fn parse() -> Self {
        let matches = get_matches();

        let inputs = paths(&matches, INPUT_ARG);
        let outputs = paths(&matches, OUTPUT_DIR_ARG);

        let jobs = if inputs.is_empty() && outputs.is_empty() {
            DEFAULT_JOBS
                .iter()
                .map(|&(input, output_dir)| Job {
                    input: input.into(),
                    output_dir: output_dir.into(),
                })
                .collect()
        } else if inputs.len() == outputs.len() {
            inputs
                .into_iter()
                .zip(outputs)
                .map(|(input, output_dir)| Job { input, output_dir })
                .collect()
        } else {
            clap::Error::with_description(
                "every --input needs exactly one matching --output",
                ErrorKind::WrongNumberOfValues,
            )
            .exit()
        };

        Self {
            jobs,
            zoom: value_t!(matches, ZOOM_ARG, u8).unwrap_or_else(|e| e.exit()),
            image_size: value_t!(matches, SIZE_ARG, u16).unwrap_or_else(|e| e.exit()),
            style: value_t!(matches, STYLE_ARG, String).unwrap_or_else(|e| e.exit()),
            url: matches.value_of(URL_ARG).map(ToOwned::to_owned),
            timeout: Duration::from_secs(
                value_t!(matches, TIMEOUT_ARG, u64).unwrap_or_else(|e| e.exit()),
            ),
            dry_run: matches.is_present(DRY_RUN_ARG),
        }
    }

    /// Builds the run configuration, taking the access token from the
    /// environment.
    pub fn config(&self) -> Result<Config, ConfigError> {
        let config = Config::from_env()?
            .with_style(self.style.as_str())
            .with_zoom(self.zoom)
            .with_image_size(self.image_size)
            .with_timeout(self.timeout);

        match &self.url {
            Some(template) => config.with_url_template(template.as_str()),
            None => Ok(config),
        }
    }
}

fn paths(matches: &ArgMatches<'_>, name: &str) -> Vec<PathBuf> {
    matches
        .values_of(name)
        .map(|values| values.map(PathBuf::from).collect())
        .unwrap_or_default()
}

fn get_matches() -> ArgMatches<'static> {
    app().get_matches()
}

fn app() -> App<'static, 'static> {
    app_from_crate!()
        .arg(
            Arg::with_name(INPUT_ARG)
                .help("CSV file with the columns `id`, `lat` and `long`. May be given multiple times, each paired with an --output in the same order. Defaults to data/raw/train.csv and data/raw/test.csv.")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .short("i")
                .long("input"),
        )
        .arg(
            Arg::with_name(OUTPUT_DIR_ARG)
                .help("The folder to store the images of the matching --input in. Created if missing.")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .short("o")
                .long("output"),
        )
        .arg(
            Arg::with_name(ZOOM_ARG)
                .help("The zoom level of the images")
                .validator(is_zoom)
                .default_value("17")
                .takes_value(true)
                .short("z")
                .long("zoom"),
        )
        .arg(
            Arg::with_name(SIZE_ARG)
                .help("Width and height of the images in pixels")
                .validator(is_image_size)
                .default_value("256")
                .takes_value(true)
                .long("size"),
        )
        .arg(
            Arg::with_name(STYLE_ARG)
                .help("The map style to render")
                .default_value("satellite-v9")
                .takes_value(true)
                .long("style"),
        )
        .arg(
            Arg::with_name(URL_ARG)
                .help("Request images from another provider. The URL may contain the format specifiers `{style}`, `{lon}`, `{lat}`, `{zoom}`, `{width}`, `{height}` and `{token}`, `{lat}` and `{lon}` are required.")
                .takes_value(true)
                .short("u")
                .long("url"),
        )
        .arg(
            Arg::with_name(TIMEOUT_ARG)
                .help("The timeout (in seconds) for fetching a single image. Pass 0 for no timeout.")
                .validator(is_numeric_min(0))
                .default_value("10")
                .takes_value(true)
                .short("t")
                .long("timeout"),
        )
        .arg(
            Arg::with_name(DRY_RUN_ARG)
                .help("Don't actually fetch anything, just determine how many images would be fetched.")
                .required(false)
                .takes_value(false)
                .long("dry-run"),
        )
}
