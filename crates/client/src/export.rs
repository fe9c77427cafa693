//! Chunked CSV export.
//!
//! Pulls a dataset page by page through `range.delivery.paas` and streams
//! each page straight to disk. At most one page of rows is resident at a
//! time, so peak memory does not grow with the dataset.
//!
//! Page content on the wire:
//!
//! ```text
//! {"total": 2500, "columns": [{"name": "id"}, ...], "content": "<base64 of JSON rows>"}
//! ```
//!
//! Rows are objects keyed by column name or positional arrays. A plain JSON
//! array in `content` is accepted as well as the base64 form.
//!
//! The export stops on the first of: an empty page, a page shorter than the
//! requested size, or the written row count reaching the reported `total`.
//! On failure the partial file is left in place.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use base64::Engine as _;
use serde::Serialize;
use serde_json::Value;

use crate::client::PlatformClient;
use crate::envelope::{Method, RequestEnvelope};
use crate::error::ClientError;
use crate::transport::Transport;

pub const DEFAULT_EXPORT_PAGE_SIZE: u32 = 1000;

/// How the `offset` parameter advances between pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetMode {
    /// `offset` is the zero-based page index
    #[default]
    Page,
    /// `offset` is the number of rows already fetched
    Row,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Destination; defaults to `<metano>.csv` in the working directory
    pub output: Option<PathBuf>,
    /// Rows requested per page (`limit`)
    pub page_size: u32,
    pub offset_mode: OffsetMode,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output: None,
            page_size: DEFAULT_EXPORT_PAGE_SIZE,
            offset_mode: OffsetMode::Page,
        }
    }
}

/// Outcome of a completed export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub filename: String,
    pub row_count: u64,
    pub pages: u64,
    /// Largest number of rows held in memory at once
    pub peak_page_rows: usize,
}

/// State for one export call. Owns the output file; dropping it releases
/// the handle whether the export finished or not.
struct ExportJob<'a> {
    metano: &'a str,
    path: PathBuf,
    writer: csv::Writer<BufWriter<File>>,
    header: Option<Vec<String>>,
    offset: u64,
    rows_written: u64,
    pages: u64,
    peak_page_rows: usize,
}

/// One decoded page.
#[derive(Debug, Default)]
struct Page {
    total: Option<u64>,
    columns: Vec<String>,
    rows: Vec<Value>,
}

impl<T: Transport> PlatformClient<T> {
    /// Export dataset `metano` to CSV.
    ///
    /// Failures keep their classification; the message is prefixed with
    /// "export failed" and the platform cause is preserved.
    pub fn export_csv(&self, metano: &str, options: &ExportOptions) -> Result<ExportSummary, ClientError> {
        self.run_export(metano, options)
            .map_err(|e| e.context("export failed"))
    }

    fn run_export(&self, metano: &str, options: &ExportOptions) -> Result<ExportSummary, ClientError> {
        if metano.trim().is_empty() {
            return Err(ClientError::bad_request("metano must not be empty"));
        }
        if options.page_size == 0 {
            return Err(ClientError::bad_request("page size must be at least 1"));
        }

        let path = options
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(metano));
        let mut job = ExportJob::open(metano, path)?;
        let limit = options.page_size as u64;

        loop {
            let env = RequestEnvelope::build(Method::RangeDelivery)
                .param("metano", metano)
                .param("limit", options.page_size)
                .param("offset", job.offset);

            let page = parse_page(self.call(&env)?)?;
            let fetched = page.rows.len();
            let total = page.total;
            job.write_page(page)?;

            log::info!(
                "export {}: page {} wrote {} rows ({} so far{})",
                job.metano,
                job.pages,
                fetched,
                job.rows_written,
                total.map(|t| format!(" of {}", t)).unwrap_or_default(),
            );

            let exhausted = fetched == 0
                || (fetched as u64) < limit
                || total.is_some_and(|t| job.rows_written >= t);
            if exhausted {
                break;
            }

            job.offset = match options.offset_mode {
                OffsetMode::Page => job.offset + 1,
                OffsetMode::Row => job.rows_written,
            };
        }

        job.finish()
    }
}

impl<'a> ExportJob<'a> {
    fn open(metano: &'a str, path: PathBuf) -> Result<Self, ClientError> {
        let file = File::create(&path).map_err(|e| {
            ClientError::server(format!("cannot create {}: {}", path.display(), e))
        })?;
        let writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .flexible(true)
            .from_writer(BufWriter::new(file));

        Ok(Self {
            metano,
            path,
            writer,
            header: None,
            offset: 0,
            rows_written: 0,
            pages: 0,
            peak_page_rows: 0,
        })
    }

    /// Write one page, consuming it so its rows are freed before the next fetch.
    fn write_page(&mut self, page: Page) -> Result<(), ClientError> {
        self.pages += 1;
        self.peak_page_rows = self.peak_page_rows.max(page.rows.len());

        if self.header.is_none() {
            let columns = if page.columns.is_empty() {
                page.rows.first().map(header_from_row).unwrap_or_default()
            } else {
                page.columns
            };
            if !columns.is_empty() {
                self.writer.write_record(&columns).map_err(|e| self.write_error(e))?;
                self.header = Some(columns);
            }
        }

        let header = self.header.as_deref().unwrap_or(&[]);
        for row in &page.rows {
            let record = row_to_record(row, header);
            self.writer.write_record(&record).map_err(|e| self.write_error(e))?;
        }
        self.rows_written += page.rows.len() as u64;
        Ok(())
    }

    fn finish(mut self) -> Result<ExportSummary, ClientError> {
        self.writer
            .flush()
            .map_err(|e| ClientError::server(format!("cannot flush {}: {}", self.path.display(), e)))?;

        Ok(ExportSummary {
            filename: self.path.display().to_string(),
            row_count: self.rows_written,
            pages: self.pages,
            peak_page_rows: self.peak_page_rows,
        })
    }

    fn write_error(&self, e: csv::Error) -> ClientError {
        ClientError::server(format!("cannot write {}: {}", self.path.display(), e))
    }
}

/// `<metano>.csv` in the working directory.
pub fn default_output_path(metano: &str) -> PathBuf {
    PathBuf::from(format!("{}.csv", metano))
}

fn parse_page(content: Option<Value>) -> Result<Page, ClientError> {
    let Some(content) = content else {
        return Ok(Page::default());
    };
    let Value::Object(mut obj) = content else {
        return Err(malformed("page content is not an object"));
    };

    let total = match obj.get("total") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };

    let columns = match obj.get("columns") {
        Some(Value::Array(cols)) => cols
            .iter()
            .filter_map(|c| match c {
                Value::String(s) => Some(s.clone()),
                Value::Object(o) => o.get("name").and_then(Value::as_str).map(String::from),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    let rows = match obj.remove("content") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(rows)) => rows,
        Some(Value::String(encoded)) if encoded.is_empty() => Vec::new(),
        Some(Value::String(encoded)) => {
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| malformed(&format!("rows are not valid base64: {}", e)))?;
            match serde_json::from_slice::<Value>(&decoded)
                .map_err(|e| malformed(&format!("rows are not valid JSON: {}", e)))?
            {
                Value::Array(rows) => rows,
                Value::Null => Vec::new(),
                _ => return Err(malformed("decoded rows are not an array")),
            }
        }
        Some(_) => return Err(malformed("rows must be an array or base64 string")),
    };

    Ok(Page { total, columns, rows })
}

fn header_from_row(row: &Value) -> Vec<String> {
    match row {
        Value::Object(obj) => obj.keys().cloned().collect(),
        Value::Array(cells) => (1..=cells.len()).map(|i| format!("column_{}", i)).collect(),
        _ => vec!["value".to_string()],
    }
}

fn row_to_record(row: &Value, header: &[String]) -> Vec<String> {
    match row {
        Value::Object(obj) if !header.is_empty() => header
            .iter()
            .map(|col| obj.get(col).map(cell_text).unwrap_or_default())
            .collect(),
        Value::Object(obj) => obj.values().map(cell_text).collect(),
        Value::Array(cells) => cells.iter().map(cell_text).collect(),
        scalar => vec![cell_text(scalar)],
    }
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn malformed(reason: &str) -> ClientError {
    ClientError::network(format!("malformed page: {}", reason))
}
