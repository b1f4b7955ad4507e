use crate::person::{PersonId, PersonRecord, Sex, parse_date};
use crate::records::RecordStore;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Canonical fields every family sheet must provide
pub const REQUIRED_COLUMNS: [&str; 6] = ["id", "name", "sex", "father_id", "birth", "death"];

// Raw header spellings seen in family sheets, compared case-insensitively
const COLUMN_ALIASES: &[(&str, &str)] = &[
    ("id", "id"),
    ("full name", "name"),
    ("name", "name"),
    ("sex (m/f)", "sex"),
    ("sex", "sex"),
    ("gender", "sex"),
    ("father id", "father_id"),
    ("father_id", "father_id"),
    ("date of birth", "birth"),
    ("birth", "birth"),
    ("date of death", "death"),
    ("death", "death"),
];

/// Errors that make a source unusable for the session
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read workbook {}: {message}", path.display())]
    Excel { path: PathBuf, message: String },

    #[error("failed to fetch {url}: {message}")]
    Http { url: String, message: String },

    #[error("source {0} has no header row")]
    Empty(String),

    #[error("source is missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("unsupported source: {0}")]
    Unsupported(String),
}

/// Where the family sheet comes from
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RecordSource {
    CsvFile(PathBuf),
    /// Any workbook calamine can read: xlsx, xlsm, xlsb, xls or ods
    ExcelFile(PathBuf),
    /// A published CSV export of a hosted spreadsheet
    RemoteCsv(String),
}

impl RecordSource {
    /// Picks a source kind from a URL or a file extension
    pub fn detect(location: &str) -> Result<Self, LoadError> {
        let location = location.trim();
        if location.starts_with("http://") || location.starts_with("https://") {
            return Ok(RecordSource::RemoteCsv(location.to_string()));
        }

        let path = PathBuf::from(location);
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(RecordSource::CsvFile(path)),
            Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => Ok(RecordSource::ExcelFile(path)),
            Some(ext) => Err(LoadError::Unsupported(format!("file extension .{}", ext))),
            None => Err(LoadError::Unsupported(format!("{} has no extension", location))),
        }
    }
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordSource::CsvFile(path) | RecordSource::ExcelFile(path) => {
                write!(f, "{}", path.display())
            }
            RecordSource::RemoteCsv(url) => f.write_str(url),
        }
    }
}

/// Header row plus data rows, before any cleaning
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Loads and cleans the records behind `source`
pub async fn load(source: &RecordSource) -> Result<RecordStore, LoadError> {
    let table = match source {
        RecordSource::CsvFile(path) => from_csv(path)?,
        RecordSource::ExcelFile(path) => from_excel(path)?,
        RecordSource::RemoteCsv(url) => from_remote_csv(url).await?,
    };
    let store = build_store(table)?;
    log::info!("loaded {} people from {}", store.len(), source);
    Ok(store)
}

/// Reads a CSV file into a raw table
pub fn from_csv(filepath: impl AsRef<Path>) -> Result<RawTable, LoadError> {
    let path = filepath.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    from_csv_str(&text).ok_or_else(|| LoadError::Empty(path.display().to_string()))
}

/// Parses CSV text; `None` when there is not even a header row
pub fn from_csv_str(text: &str) -> Option<RawTable> {
    let mut records = parse_csv_records(text).into_iter();
    let headers = records.next()?;
    let rows = records
        .filter(|row| row.iter().any(|field| !field.trim().is_empty()))
        .collect();
    Some(RawTable { headers, rows })
}

/// Reads the first worksheet of a workbook into a raw table
#[cfg(feature = "web")]
pub fn from_excel(filepath: impl AsRef<Path>) -> Result<RawTable, LoadError> {
    use calamine::{Data, Reader, open_workbook_auto};

    let path = filepath.as_ref();
    let excel_error = |message: String| LoadError::Excel {
        path: path.to_path_buf(),
        message,
    };

    // The reader is picked from the extension, so .xls gets the BIFF reader
    let mut workbook = open_workbook_auto(path).map_err(|e| excel_error(format!("{}", e)))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| excel_error("no worksheets found".to_string()))?
        .map_err(|e| excel_error(format!("{}", e)))?;

    let mut rows = range.rows().map(|row| {
        row.iter()
            .map(|cell| match cell {
                Data::Empty => String::new(),
                Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
                Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()),
                other => other.to_string(),
            })
            .collect::<Vec<String>>()
    });

    let headers = rows
        .next()
        .ok_or_else(|| LoadError::Empty(path.display().to_string()))?;
    let rows = rows
        .filter(|row| row.iter().any(|field| !field.trim().is_empty()))
        .collect();

    Ok(RawTable { headers, rows })
}

#[cfg(not(feature = "web"))]
pub fn from_excel(filepath: impl AsRef<Path>) -> Result<RawTable, LoadError> {
    Err(LoadError::Unsupported(format!(
        "{} (Excel support requires the 'web' feature)",
        filepath.as_ref().display()
    )))
}

#[cfg(feature = "web")]
fn excel_serial_to_date(serial: f64) -> String {
    use chrono::{Duration, NaiveDate};

    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|epoch| epoch.checked_add_signed(Duration::days(serial.floor() as i64)))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Downloads a published CSV export
#[cfg(feature = "web")]
pub async fn from_remote_csv(url: &str) -> Result<RawTable, LoadError> {
    let http_error = |e: reqwest::Error| LoadError::Http {
        url: url.to_string(),
        message: e.to_string(),
    };

    let text = reqwest::get(url)
        .await
        .map_err(http_error)?
        .error_for_status()
        .map_err(http_error)?
        .text()
        .await
        .map_err(http_error)?;

    from_csv_str(&text).ok_or_else(|| LoadError::Empty(url.to_string()))
}

#[cfg(not(feature = "web"))]
pub async fn from_remote_csv(url: &str) -> Result<RawTable, LoadError> {
    Err(LoadError::Unsupported(format!(
        "{} (remote sources require the 'web' feature)",
        url
    )))
}

/// Cleans a raw table into a record store
///
/// Headers are trimmed and mapped onto the canonical fields, repeated
/// columns keep their first occurrence, and rows without an id are left
/// out. Every other column is carried along as an extra attribute.
///
/// # Errors
/// * `LoadError::MissingColumns` if any canonical field has no column
pub fn build_store(table: RawTable) -> Result<RecordStore, LoadError> {
    let mut seen = HashSet::new();
    let mut kept: Vec<(usize, String)> = Vec::new();
    for (index, header) in table.headers.iter().enumerate() {
        let name = canonical_column(header.trim());
        if seen.insert(name.clone()) {
            kept.push((index, name));
        } else {
            log::warn!("dropping repeated column '{}'", header.trim());
        }
    }

    let column = |name: &str| kept.iter().find(|(_, n)| n == name).map(|(i, _)| *i);
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| column(**name).is_none())
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns(missing));
    }

    let id_col = column("id").unwrap_or_default();
    let name_col = column("name").unwrap_or_default();
    let sex_col = column("sex").unwrap_or_default();
    let father_col = column("father_id").unwrap_or_default();
    let birth_col = column("birth").unwrap_or_default();
    let death_col = column("death").unwrap_or_default();
    let extra_cols: Vec<(usize, String)> = kept
        .iter()
        .filter(|(_, name)| !REQUIRED_COLUMNS.contains(&name.as_str()))
        .cloned()
        .collect();

    let mut records = Vec::with_capacity(table.rows.len());
    let mut excluded = 0usize;
    for row in &table.rows {
        let field = |index: usize| row.get(index).map(|s| s.trim()).unwrap_or("");

        let Some(id) = PersonId::parse(field(id_col)) else {
            excluded += 1;
            continue;
        };

        let name = field(name_col);
        records.push(PersonRecord {
            id,
            name: (!name.is_empty()).then(|| name.to_string()),
            sex: Sex::parse(field(sex_col)),
            father_id: PersonId::parse(field(father_col)),
            birth: parse_date(field(birth_col)),
            death: parse_date(field(death_col)),
            extras: extra_cols
                .iter()
                .map(|(index, name)| (name.clone(), field(*index).to_string()))
                .collect(),
        });
    }

    if excluded > 0 {
        log::warn!("excluded {} row(s) without an id", excluded);
    }

    Ok(RecordStore::new(
        records,
        extra_cols.into_iter().map(|(_, name)| name).collect(),
    ))
}

fn canonical_column(header: &str) -> String {
    let lowered = header.to_lowercase();
    COLUMN_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| header.to_string())
}

// Quoted fields may contain commas, doubled quotes and line breaks
fn parse_csv_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut current_row = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = text.trim_start_matches('\u{feff}').chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current_field.is_empty() => in_quotes = true,
            ',' if !in_quotes => {
                current_row.push(std::mem::take(&mut current_field));
            }
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                current_row.push(std::mem::take(&mut current_field));
                records.push(std::mem::take(&mut current_row));
            }
            _ => current_field.push(c),
        }
    }

    if !current_field.is_empty() || !current_row.is_empty() {
        current_row.push(current_field);
        records.push(current_row);
    }

    records
}
