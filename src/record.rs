use anyhow::{Context, Result};
use csv::{ByteRecord, ReaderBuilder, Trim};
use std::{
    fs::File,
    io::Read,
    path::{Component, Path, PathBuf},
    str,
};

use crate::error::FetchError;

const ID_COLUMN: &str = "id";
const LAT_COLUMN: &str = "lat";
const LON_COLUMN: &str = "long";

/// One input row: an identifier and the coordinate to fetch an image for.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// Opaque identifier, may repeat across rows.
    pub id: String,
    pub lat: f64,
    pub lon: f64,
}

impl Record {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            lat,
            lon,
        }
    }

    /// Where the image for this record is stored when it sits at `ordinal`
    /// in its source.
    pub fn target_path(&self, dir: &Path, ordinal: usize) -> PathBuf {
        target_path(dir, &self.id, ordinal)
    }
}

/// `{dir}/{id}_{ordinal}.png`
///
/// This layout doubles as the record of what has already been downloaded,
/// so it must stay stable across runs. `id` is expected to have passed
/// [`check_id`], otherwise the path may point outside of `dir`.
pub fn target_path(dir: &Path, id: &str, ordinal: usize) -> PathBuf {
    dir.join(format!("{}_{}.png", id, ordinal))
}

/// Makes sure `id` can be used as part of a file name inside the output
/// folder: not empty, no path separators, not `.` or `..`.
pub fn check_id(id: &str) -> std::result::Result<(), FetchError> {
    if id.is_empty() {
        return Err(FetchError::Record(format!("empty `{}`", ID_COLUMN)));
    }

    let mut components = Path::new(id).components();
    let single_name = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_name || id.contains(|c: char| c == '/' || c == '\\') {
        return Err(FetchError::Record(format!(
            "`{}` {:?} is not a plain file name",
            ID_COLUMN, id
        )));
    }

    Ok(())
}

/// An ordered sequence of records read from a CSV file.
///
/// Rows that cannot be turned into a [`Record`] are kept in place so the
/// ordinals of the following rows stay put. They surface as
/// [`FetchError::Record`] when iterating.
#[derive(Clone, Debug)]
pub struct RecordSource {
    label: String,
    rows: Vec<std::result::Result<Record, String>>,
}

impl RecordSource {
    /// Reads all rows of the CSV file at `path`.
    ///
    /// The file needs a header row. The columns `id`, `lat` and `long` are
    /// used, all others are ignored.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed opening record source {}", path.display()))?;

        Self::from_reader(path.display().to_string(), file)
    }

    pub fn from_reader(label: impl Into<String>, reader: impl Read) -> Result<Self> {
        let label = label.into();
        let mut csv = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = csv
            .byte_headers()
            .with_context(|| format!("failed reading header of {}", label))?
            .clone();
        let columns = Columns::locate(&headers);

        // only the used columns are decoded, others may hold any bytes
        let rows = csv
            .byte_records()
            .map(|row| {
                row.map_err(|e| e.to_string())
                    .and_then(|row| columns.parse(&row))
            })
            .collect();

        Ok(Self { label, rows })
    }

    /// Wraps records that were obtained elsewhere.
    ///
    /// Records with an unusable id become per-record errors.
    pub fn from_records(label: impl Into<String>, records: Vec<Record>) -> Self {
        let rows = records
            .into_iter()
            .map(|record| match check_id(&record.id) {
                Ok(()) => Ok(record),
                Err(e) => Err(reason(e)),
            })
            .collect();

        Self {
            label: label.into(),
            rows,
        }
    }

    /// Human-readable name of the source, usually its path.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates all rows in source order together with their 0-based ordinal.
    pub fn records(
        &self,
    ) -> impl Iterator<Item = (usize, std::result::Result<Record, FetchError>)> + '_ {
        self.rows.iter().enumerate().map(|(ordinal, row)| {
            let row = row
                .as_ref()
                .map(Clone::clone)
                .map_err(|reason| FetchError::Record(reason.clone()));
            (ordinal, row)
        })
    }
}

struct Columns {
    id: Option<usize>,
    lat: Option<usize>,
    lon: Option<usize>,
}

impl Columns {
    fn locate(headers: &ByteRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| h == name.as_bytes());

        Self {
            id: find(ID_COLUMN),
            lat: find(LAT_COLUMN),
            lon: find(LON_COLUMN),
        }
    }

    fn parse(&self, row: &ByteRecord) -> std::result::Result<Record, String> {
        let id = field(row, self.id, ID_COLUMN)?;
        check_id(id).map_err(reason)?;

        Ok(Record {
            id: id.to_owned(),
            lat: coordinate(row, self.lat, LAT_COLUMN)?,
            lon: coordinate(row, self.lon, LON_COLUMN)?,
        })
    }
}

fn field<'r>(
    row: &'r ByteRecord,
    column: Option<usize>,
    name: &str,
) -> std::result::Result<&'r str, String> {
    let column = column.ok_or_else(|| format!("missing column `{}`", name))?;
    let raw = row
        .get(column)
        .ok_or_else(|| format!("missing field `{}`", name))?;

    str::from_utf8(raw).map_err(|_| format!("`{}` is not valid UTF-8", name))
}

fn reason(e: FetchError) -> String {
    match e {
        FetchError::Record(reason) => reason,
        e => e.to_string(),
    }
}

fn coordinate(
    row: &ByteRecord,
    column: Option<usize>,
    name: &str,
) -> std::result::Result<f64, String> {
    let raw = field(row, column, name)?;
    if raw.is_empty() {
        return Err(format!("missing value for `{}`", name));
    }

    match raw.parse::<f64>() {
        Ok(val) if val.is_finite() => Ok(val),
        _ => Err(format!("`{}` is not a number: {:?}", name, raw)),
    }
}
