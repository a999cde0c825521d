use std::{
    fmt,
    path::{Path, PathBuf},
};

use crate::error::FetchError;

/// What happened to a single record.
#[derive(Debug)]
pub enum Outcome {
    /// The image was already on disk, nothing was requested.
    Skipped,

    /// The image was downloaded and written.
    Saved { bytes: usize },

    /// The record was given up on for this run. Its file is absent.
    Failed(FetchError),
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

#[derive(Debug)]
pub struct RecordOutcome {
    pub ordinal: usize,

    /// `None` when the row was too malformed to derive a file name.
    pub target: Option<PathBuf>,

    pub outcome: Outcome,
}

/// The outcomes of one batch, in source order.
#[derive(Debug)]
pub struct Report {
    directory: PathBuf,
    outcomes: Vec<RecordOutcome>,
}

impl Report {
    pub(crate) fn new(directory: &Path) -> Self {
        Self {
            directory: directory.to_path_buf(),
            outcomes: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, outcome: RecordOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn outcomes(&self) -> &[RecordOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped))
    }

    pub fn saved(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Saved { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(Outcome::is_failed)
    }

    pub fn bytes_saved(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o.outcome {
                Outcome::Saved { bytes } => bytes,
                _ => 0,
            })
            .sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RecordOutcome> {
        self.outcomes.iter().filter(|o| o.outcome.is_failed())
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.outcome)).count()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} saved ({}), {} skipped, {} failed",
            self.directory.display(),
            self.saved(),
            pretty_bytes::converter::convert(self.bytes_saved() as f64),
            self.skipped(),
            self.failed(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn counts() {
        let mut report = Report::new(Path::new("out"));
        report.push(RecordOutcome {
            ordinal: 0,
            target: Some("out/a_0.png".into()),
            outcome: Outcome::Saved { bytes: 2048 },
        });
        report.push(RecordOutcome {
            ordinal: 1,
            target: Some("out/b_1.png".into()),
            outcome: Outcome::Skipped,
        });
        report.push(RecordOutcome {
            ordinal: 2,
            target: Some("out/c_2.png".into()),
            outcome: Outcome::Failed(FetchError::Status {
                status: StatusCode::FORBIDDEN,
            }),
        });

        assert_eq!(report.len(), 3);
        assert_eq!(
            (report.saved(), report.skipped(), report.failed()),
            (1, 1, 1)
        );
        assert_eq!(report.bytes_saved(), 2048);
        assert_eq!(
            report.failures().map(|o| o.ordinal).collect::<Vec<_>>(),
            vec![2]
        );

        let summary = report.to_string();
        assert!(summary.starts_with("out: 1 saved"));
        assert!(summary.ends_with("1 skipped, 1 failed"));
    }
}
