//! Record sources: where raw passenger rows come from.
//!
//! A [`RecordSource`] hands back the complete row set or an error. Partial
//! results are never returned: a malformed line, an unreadable file or a
//! failed page request aborts the whole fetch.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use manifest_core::error::{ManifestError, Result};
use manifest_core::models::RawRecord;
use manifest_core::settings::DEFAULT_ORDER_COLUMN;

/// Rows requested per page from the REST endpoint.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Longest slice of an error body echoed back in a connection error.
const MAX_ERROR_BODY: usize = 200;

// ── RecordSource ──────────────────────────────────────────────────────────────

/// A read-only supplier of raw records.
pub trait RecordSource {
    /// Short human-readable label, e.g. `"postgrest:Passengers"`.
    fn describe(&self) -> String;

    /// Fetch every row of the underlying table.
    fn fetch_all(&self) -> Result<Vec<RawRecord>>;
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn fetch_all(&self) -> Result<Vec<RawRecord>> {
        (**self).fetch_all()
    }
}

// ── FileSource ────────────────────────────────────────────────────────────────

/// Reads records from a `.json` array file, a `.jsonl` file, or a directory
/// of such files.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource for FileSource {
    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }

    fn fetch_all(&self) -> Result<Vec<RawRecord>> {
        if !self.path.exists() {
            return Err(ManifestError::DataPathNotFound(self.path.clone()));
        }

        if self.path.is_file() {
            return read_record_file(&self.path);
        }

        let files = find_record_files(&self.path)?;
        if files.is_empty() {
            warn!("No .json or .jsonl files found in {}", self.path.display());
        }

        let mut records: Vec<RawRecord> = Vec::new();
        for file in &files {
            records.extend(read_record_file(file)?);
        }

        debug!(
            "Loaded {} records from {} files under {}",
            records.len(),
            files.len(),
            self.path.display()
        );
        Ok(records)
    }
}

/// Find all `.json` / `.jsonl` files recursively under `dir`, sorted by path.
///
/// Any entry that cannot be read (permissions, dangling links, link loops)
/// fails the whole scan.
pub fn find_record_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in walkdir::WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(walk_error)?;
        if entry.file_type().is_file() && record_format(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

fn walk_error(err: walkdir::Error) -> ManifestError {
    let path = err.path().map(Path::to_path_buf);
    let source = std::io::Error::from(err);
    match path {
        Some(path) => ManifestError::FileRead { path, source },
        None => ManifestError::Io(source),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordFormat {
    JsonArray,
    JsonLines,
}

fn record_format(path: &Path) -> Option<RecordFormat> {
    match path.extension()?.to_str()?.to_lowercase().as_str() {
        "json" => Some(RecordFormat::JsonArray),
        "jsonl" => Some(RecordFormat::JsonLines),
        _ => None,
    }
}

fn read_record_file(path: &Path) -> Result<Vec<RawRecord>> {
    match record_format(path) {
        Some(RecordFormat::JsonLines) => read_json_lines(path),
        Some(RecordFormat::JsonArray) => read_json_array(path),
        None => Err(ManifestError::Config(format!(
            "Unsupported file format: {}. Supported formats: json, jsonl",
            path.display()
        ))),
    }
}

fn read_json_lines(path: &Path) -> Result<Vec<RawRecord>> {
    let file = std::fs::File::open(path).map_err(|source| ManifestError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let mut records: Vec<RawRecord> = Vec::new();
    for (index, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| ManifestError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let malformed = |message: String| ManifestError::MalformedRecord {
            path: path.to_path_buf(),
            line: index + 1,
            message,
        };

        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => records.push(map),
            Ok(_) => return Err(malformed("expected a JSON object".to_string())),
            Err(e) => return Err(malformed(e.to_string())),
        }
    }

    debug!("File {}: {} records", path.display(), records.len());
    Ok(records)
}

fn read_json_array(path: &Path) -> Result<Vec<RawRecord>> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&content)?;

    into_records(value).map_err(|(position, message)| ManifestError::MalformedRecord {
        path: path.to_path_buf(),
        line: position,
        message,
    })
}

/// Split a JSON array into records. On failure returns the 1-based position
/// of the offending element (0 for the document itself) and a message.
fn into_records(value: Value) -> std::result::Result<Vec<RawRecord>, (usize, String)> {
    let Value::Array(items) = value else {
        return Err((0, "expected a JSON array of objects".to_string()));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(map),
            _ => Err((i + 1, "array element is not a JSON object".to_string())),
        })
        .collect()
}

// ── PostgrestSource ───────────────────────────────────────────────────────────

/// Reads a table through a hosted Postgres REST endpoint (`/rest/v1/<table>`).
///
/// Blocking reqwest client (no async runtime required). Pages are requested
/// with `limit`/`offset` over a fixed `order` column and `Prefer: count=exact`.
/// Paging continues until the reported total is reached or an empty page
/// comes back, so a server-side row cap below the page size is harmless. A
/// result whose length disagrees with the reported total is an error.
pub struct PostgrestSource {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    table: String,
    order_column: String,
    page_size: usize,
}

/// One response: its rows plus the table total from `Content-Range`, if any.
#[derive(Debug, Default)]
struct Page {
    records: Vec<RawRecord>,
    total: Option<usize>,
}

impl PostgrestSource {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        table: impl Into<String>,
    ) -> Result<Self> {
        let table = table.into();
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("manifest-view/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ManifestError::connection(format!("postgrest:{}", table), e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            table,
            order_column: DEFAULT_ORDER_COLUMN.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Column the pages are sorted by. It should be unique per row.
    pub fn with_order_column(mut self, column: impl Into<String>) -> Self {
        self.order_column = column.into();
        self
    }

    /// URL of the page starting at `offset`.
    pub fn page_url(&self, offset: usize) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            ManifestError::Config(format!("invalid database url '{}': {}", self.base_url, e))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                ManifestError::Config(format!("database url '{}' cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .extend(["rest", "v1", self.table.as_str()]);

        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("order", &format!("{}.asc", self.order_column))
            .append_pair("limit", &self.page_size.to_string())
            .append_pair("offset", &offset.to_string());

        Ok(url)
    }

    fn fetch_page(&self, offset: usize) -> Result<Page> {
        let url = self.page_url(offset)?;
        let response = self
            .http
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .header("Prefer", "count=exact")
            .send()
            .map_err(|e| ManifestError::connection(self.describe(), e.to_string()))?;

        let total = response
            .headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(content_range_total);

        let status = response.status();
        // Asking past the end of the table.
        if status == reqwest::StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(Page {
                records: Vec::new(),
                total,
            });
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let snippet: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(ManifestError::connection(
                self.describe(),
                format!("HTTP {}: {}", status.as_u16(), snippet.trim()),
            ));
        }

        let body: Value = response
            .json()
            .map_err(|e| ManifestError::connection(self.describe(), e.to_string()))?;

        let records =
            parse_page(body).map_err(|message| ManifestError::connection(self.describe(), message))?;
        Ok(Page { records, total })
    }
}

/// Interpret one response body as a page of records.
fn parse_page(body: Value) -> std::result::Result<Vec<RawRecord>, String> {
    into_records(body).map_err(|(position, message)| {
        if position == 0 {
            format!("unexpected response: {}", message)
        } else {
            format!("unexpected response row {}: {}", position, message)
        }
    })
}

/// Table total from a `Content-Range` value such as `0-999/2201` or `*/2201`.
/// `None` when the server did not count (`0-999/*`).
fn content_range_total(value: &str) -> Option<usize> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

impl RecordSource for PostgrestSource {
    fn describe(&self) -> String {
        format!("postgrest:{}", self.table)
    }

    fn fetch_all(&self) -> Result<Vec<RawRecord>> {
        let mut records: Vec<RawRecord> = Vec::new();
        let mut total: Option<usize> = None;

        loop {
            let offset = records.len();
            let page = self.fetch_page(offset)?;
            total = page.total.or(total);
            let count = page.records.len();
            debug!(offset, count, total = ?total, table = %self.table, "fetched page");

            if count == 0 {
                break;
            }
            records.extend(page.records);

            if total.is_some_and(|expected| records.len() >= expected) {
                break;
            }
        }

        if let Some(expected) = total {
            if records.len() != expected {
                return Err(ManifestError::connection(
                    self.describe(),
                    format!(
                        "received {} of {} rows reported by the server",
                        records.len(),
                        expected
                    ),
                ));
            }
        } else {
            warn!(table = %self.table, "server did not report a row count");
        }

        info!("Loaded {} records from table '{}'", records.len(), self.table);
        Ok(records)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
