use futures::future::{self, BoxFuture, FutureExt};
use satellite_tile_fetcher::*;
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

/// Answers every request with a PNG body, except for URLs containing one of
/// the configured fragments.
#[derive(Default)]
struct FakeDownloader {
    requests: Mutex<Vec<String>>,
    failing: Vec<(&'static str, StatusCode)>,
    unreachable: Vec<&'static str>,
}

impl FakeDownloader {
    fn failing_on(fragment: &'static str, status: StatusCode) -> Self {
        Self {
            failing: vec![(fragment, status)],
            ..Self::default()
        }
    }

    fn unreachable_on(fragment: &'static str) -> Self {
        Self {
            unreachable: vec![fragment],
            ..Self::default()
        }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Download for FakeDownloader {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Response, FetchError>> {
        self.requests.lock().unwrap().push(url.to_owned());

        let result = if self.unreachable.iter().any(|f| url.contains(f)) {
            Err(FetchError::Transport("connection refused".to_owned()))
        } else {
            let status = self
                .failing
                .iter()
                .find(|(f, _)| url.contains(f))
                .map(|&(_, status)| status)
                .unwrap_or(StatusCode::OK);

            Ok(Response {
                status,
                body: if status.is_success() { PNG.to_vec() } else { Vec::new() },
            })
        };

        future::ready(result).boxed()
    }
}

/// Never answers.
struct HangingDownloader;

impl Download for HangingDownloader {
    fn fetch<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<Response, FetchError>> {
        future::pending().boxed()
    }
}

fn config() -> Config {
    Config::new("pk.test").unwrap()
}

fn source(csv: &str) -> RecordSource {
    RecordSource::from_reader("houses.csv", csv.as_bytes()).unwrap()
}

fn files(dir: &Path) -> HashSet<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

const THREE_HOUSES: &str = "id,lat,long\n\
    100,47.1,-122.1\n\
    200,47.2,-122.2\n\
    300,47.3,-122.3\n";

#[tokio::test]
async fn saves_every_record() {
    let dir = tempfile::tempdir().unwrap();
    let downloader = FakeDownloader::default();

    let report = fetch_all(&source(THREE_HOUSES), dir.path(), &config(), &downloader)
        .await
        .unwrap();

    assert_eq!((report.saved(), report.skipped(), report.failed()), (3, 0, 0));
    assert_eq!(report.bytes_saved(), 3 * PNG.len());
    assert_eq!(report.directory(), dir.path());
    for name in &["100_0.png", "200_1.png", "300_2.png"] {
        assert_eq!(fs::read(dir.path().join(name)).unwrap(), PNG);
    }

    let requests = downloader.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].contains("/-122.1,47.1,17/256x256?access_token=pk.test"));
    assert!(requests[2].contains("/-122.3,47.3,17/"));
}

#[tokio::test]
async fn second_run_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let src = source(THREE_HOUSES);

    let first = FakeDownloader::default();
    fetch_all(&src, dir.path(), &config(), &first).await.unwrap();
    let after_first = files(dir.path());

    let second = FakeDownloader::default();
    let report = fetch_all(&src, dir.path(), &config(), &second).await.unwrap();

    assert!(second.requests().is_empty());
    assert_eq!(report.skipped(), 3);
    assert_eq!(files(dir.path()), after_first);
}

#[tokio::test]
async fn existing_file_is_not_requested() {
    let dir = tempfile::tempdir().unwrap();
    let existing = dir.path().join("42_3.png");
    fs::write(&existing, b"old").unwrap();

    let src = source("id,lat,long\n1,0,0\n2,0,0\n3,0,0\n42,47.6,-122.3\n");
    let downloader = FakeDownloader::default();
    let report = fetch_all(&src, dir.path(), &config(), &downloader).await.unwrap();

    assert_eq!(downloader.requests().len(), 3);
    assert!(downloader
        .requests()
        .iter()
        .all(|url| !url.contains("-122.3,47.6")));
    assert!(matches!(report.outcomes()[3].outcome, Outcome::Skipped));
    assert_eq!(report.outcomes()[3].target.as_deref(), Some(existing.as_path()));
    assert_eq!(fs::read(&existing).unwrap(), b"old");
}

#[tokio::test]
async fn failed_status_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let downloader = FakeDownloader::failing_on("-122.2,47.2", StatusCode::FORBIDDEN);

    let report = fetch_all(&source(THREE_HOUSES), dir.path(), &config(), &downloader)
        .await
        .unwrap();

    assert_eq!(downloader.requests().len(), 3);
    assert!(dir.path().join("100_0.png").exists());
    assert!(!dir.path().join("200_1.png").exists());
    assert!(dir.path().join("300_2.png").exists());

    assert_eq!((report.saved(), report.failed()), (2, 1));
    let failure = report.failures().next().unwrap();
    assert_eq!(failure.ordinal, 1);
    assert!(matches!(
        failure.outcome,
        Outcome::Failed(FetchError::Status {
            status: StatusCode::FORBIDDEN
        })
    ));
}

#[tokio::test]
async fn failed_record_is_retried_by_the_next_run() {
    let dir = tempfile::tempdir().unwrap();
    let src = source(THREE_HOUSES);

    let flaky = FakeDownloader::unreachable_on("-122.2,47.2");
    let report = fetch_all(&src, dir.path(), &config(), &flaky).await.unwrap();
    assert!(matches!(
        report.outcomes()[1].outcome,
        Outcome::Failed(FetchError::Transport(_))
    ));

    let healthy = FakeDownloader::default();
    let report = fetch_all(&src, dir.path(), &config(), &healthy).await.unwrap();

    assert_eq!(healthy.requests().len(), 1);
    assert!(healthy.requests()[0].contains("-122.2,47.2"));
    assert_eq!((report.saved(), report.skipped()), (1, 2));
}

#[tokio::test]
async fn malformed_rows_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let src = source("id,lat,long\n1,47.6,-122.3\n2,,-122.3\n3,47.6,west\n4,47.6,-122.3\n");
    let downloader = FakeDownloader::default();

    let report = fetch_all(&src, dir.path(), &config(), &downloader).await.unwrap();

    assert_eq!(downloader.requests().len(), 2);
    assert_eq!(report.failed(), 2);
    assert!(report.outcomes()[1].target.is_none());
    assert!(dir.path().join("1_0.png").exists());
    assert!(dir.path().join("4_3.png").exists());
}

#[tokio::test]
async fn duplicate_ids_do_not_collide() {
    let dir = tempfile::tempdir().unwrap();
    let src = source("id,lat,long\n7,1,1\n7,2,2\n");

    fetch_all(&src, dir.path(), &config(), &FakeDownloader::default())
        .await
        .unwrap();

    assert!(dir.path().join("7_0.png").exists());
    assert!(dir.path().join("7_1.png").exists());
}

#[tokio::test]
async fn empty_source_creates_directory() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("images").join("train");
    let downloader = FakeDownloader::default();

    let report = fetch_all(&source("id,lat,long\n"), &dir, &config(), &downloader)
        .await
        .unwrap();

    assert!(dir.is_dir());
    assert!(report.is_empty());
    assert!(downloader.requests().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn write_failure_is_per_record() {
    let dir = tempfile::tempdir().unwrap();
    // dangling link: the target does not exist, writing through it fails
    std::os::unix::fs::symlink(
        dir.path().join("missing").join("x.png"),
        dir.path().join("broken_0.png"),
    )
    .unwrap();

    let src = source("id,lat,long\nbroken,1,1\nok,2,2\n");
    let downloader = FakeDownloader::default();

    let report = fetch_all(&src, dir.path(), &config(), &downloader).await.unwrap();

    assert_eq!(downloader.requests().len(), 2);
    assert!(matches!(
        report.outcomes()[0].outcome,
        Outcome::Failed(FetchError::Io { .. })
    ));
    assert!(!dir.path().join("missing").exists());
    assert!(dir.path().join("ok_1.png").exists());
}

#[tokio::test]
async fn ids_cannot_escape_the_output_folder() {
    let root = tempfile::tempdir().unwrap();
    let out = root.path().join("out");
    let absolute = root.path().join("abs").join("x");
    let csv = format!(
        "id,lat,long\n../escaped,1,1\n{},2,2\na/b,3,3\n",
        absolute.display()
    );
    let downloader = FakeDownloader::default();

    let report = fetch_all(&source(&csv), &out, &config(), &downloader)
        .await
        .unwrap();

    assert_eq!(report.failed(), 3);
    for outcome in report.outcomes() {
        assert!(outcome.target.is_none());
        assert!(matches!(
            outcome.outcome,
            Outcome::Failed(FetchError::Record(_))
        ));
    }
    assert!(downloader.requests().is_empty());
    assert!(!root.path().join("escaped_0.png").exists());
    assert!(!root.path().join("abs").exists());
    assert!(files(&out).is_empty());
}

#[tokio::test]
async fn hanging_request_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config().with_timeout(Duration::from_millis(50));

    let report = fetch_all(&source("id,lat,long\n1,0,0\n"), dir.path(), &cfg, &HangingDownloader)
        .await
        .unwrap();

    assert!(matches!(
        report.outcomes()[0].outcome,
        Outcome::Failed(FetchError::Transport(_))
    ));
    assert!(!dir.path().join("1_0.png").exists());
}

#[tokio::test]
async fn output_must_be_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("not-a-dir");
    fs::write(&file, b"").unwrap();

    let result = fetch_all(
        &source(THREE_HOUSES),
        &file,
        &config(),
        &FakeDownloader::default(),
    )
    .await;

    assert!(result.is_err());
}
