use crate::error::{FitsColsError, Result};
use crate::fits::card::{Card, Value};
use crate::fits::{writer, ColumnDesc, FitsReader, Header, TableSchema, TableWriter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};

/// Rows copied per write batch when no chunk size is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

/// Structural keywords recomputed for the destination header, never
/// copied from the source: they describe the source's own layout.
const STRUCTURAL_KEYWORDS: &[&str] = &[
    "XTENSION", "BITPIX", "NAXIS", "NAXIS1", "NAXIS2", "PCOUNT", "GCOUNT", "TFIELDS", "THEAP",
];

/// Per-column keyword bases carried over to destination indices. Covers
/// scaling, display, and table-coordinate conventions as well as the
/// TLMIN/TLMAX and TDMIN/TDMAX range keywords.
const CARRIED_COLUMN_KEYWORDS: &[&str] = &[
    "TUNIT", "TSCAL", "TZERO", "TNULL", "TDISP", "TDIM", "TCTYP", "TCUNI", "TCRPX", "TCRVL",
    "TCDLT", "TLMIN", "TLMAX", "TDMIN", "TDMAX",
];

/// Indexed keywords that describe a source column and must never be
/// copied under their source index. TBCOL is ASCII-table layout and is
/// dropped rather than carried.
const COLUMN_KEYWORD_BASES: &[&str] = &[
    "TTYPE", "TFORM", "TBCOL", "TUNIT", "TSCAL", "TZERO", "TNULL", "TDISP", "TDIM", "TCTYP",
    "TCUNI", "TCRPX", "TCRVL", "TCDLT", "TLMIN", "TLMAX", "TDMIN", "TDMAX",
];

/// Running state of a copy operation, reported once per chunk.
#[derive(Debug, Clone)]
pub struct ExtractionProgress {
    pub rows_processed: u64,
    pub total_rows: u64,
    pub chunks_processed: usize,
    pub bytes_processed: u64,
    pub start_time: Instant,
}

impl ExtractionProgress {
    pub fn new(total_rows: u64) -> Self {
        Self {
            rows_processed: 0,
            total_rows,
            chunks_processed: 0,
            bytes_processed: 0,
            start_time: Instant::now(),
        }
    }

    pub fn update_chunk(&mut self, rows: u64, bytes: u64) {
        self.rows_processed += rows;
        self.bytes_processed += bytes;
        self.chunks_processed += 1;
    }

    /// Percentage of rows completed; a zero-row table is complete.
    pub fn percentage(&self) -> f64 {
        if self.total_rows == 0 {
            100.0
        } else {
            (self.rows_processed as f64 / self.total_rows as f64) * 100.0
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn estimated_remaining(&self) -> Duration {
        if self.rows_processed == 0 {
            return Duration::from_secs(0);
        }

        let elapsed = self.elapsed();
        let rate = self.rows_processed as f64 / elapsed.as_secs_f64();
        let remaining = self.total_rows - self.rows_processed;

        if rate > 0.0 {
            Duration::from_secs_f64(remaining as f64 / rate)
        } else {
            Duration::from_secs(0)
        }
    }
}

/// One extracted column as reported to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub tform: String,
    pub width: usize,
}

impl From<&ColumnDesc> for ColumnInfo {
    fn from(column: &ColumnDesc) -> Self {
        Self {
            name: column.name.clone(),
            tform: column.format.as_str().to_string(),
            width: column.width,
        }
    }
}

/// Settings in effect for a run, echoed into the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub chunk_size: usize,
    pub hdu: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub input: String,
    pub output: String,
    pub columns: Vec<ColumnInfo>,
    pub rows: u64,
    pub chunks: usize,
    pub bytes_written: u64,
    /// Source header keywords that could not be assigned and were skipped.
    pub skipped_keywords: Vec<String>,
    pub extraction_time: DateTime<Utc>,
    pub duration: Duration,
    pub config_used: ConfigSnapshot,
}

/// What an extraction would do, without touching the output path.
#[derive(Debug, Clone)]
pub struct ExtractionPlan {
    pub rows: u64,
    pub columns: Vec<ColumnInfo>,
    /// Bytes per destination row.
    pub row_stride: usize,
    pub chunks: usize,
}

/// Copies a named subset of columns from a FITS binary table into a
/// new file, streaming rows in bounded chunks over a memory-mapped
/// source.
pub struct ColumnExtractor {
    chunk_size: usize,
    hdu: Option<usize>,
}

impl ColumnExtractor {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            hdu: None,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Force a specific HDU index instead of searching for the first
    /// BINTABLE extension.
    pub fn with_hdu(mut self, hdu: Option<usize>) -> Self {
        self.hdu = hdu;
        self
    }

    /// Validate a request against the source without creating output.
    pub fn preview(&self, input: &Path, columns: &[String]) -> Result<ExtractionPlan> {
        self.check_request(columns)?;
        let reader = FitsReader::open(input)?;
        let schema = reader.table_schema(self.hdu)?;
        let selected = select_columns(&schema, columns)?;

        let row_stride: usize = selected.iter().map(|c| c.width).sum();
        Ok(ExtractionPlan {
            rows: schema.nrows,
            columns: selected.iter().map(|c| ColumnInfo::from(*c)).collect(),
            row_stride,
            chunks: chunk_count(schema.nrows, self.chunk_size),
        })
    }

    /// Extract `columns` from `input` into `output`.
    ///
    /// Validation failures happen before the output file is created; an
    /// I/O failure during the copy loop may leave a partially written
    /// file behind.
    pub fn extract(
        &self,
        input: &Path,
        output: &Path,
        columns: &[String],
        progress_callback: Option<&dyn Fn(&ExtractionProgress)>,
    ) -> Result<ExtractionReport> {
        let started_at = Utc::now();
        self.check_request(columns)?;

        let reader = FitsReader::open(input)?;
        let hdu = reader.data_table(self.hdu)?;
        let schema = TableSchema::from_header(&hdu.header)?;
        let selected = select_columns(&schema, columns)?;

        // Destination layout: requested columns, requested order.
        let dst_stride: usize = selected.iter().map(|c| c.width).sum();
        let mut dst_offsets = Vec::with_capacity(selected.len());
        let mut offset = 0usize;
        for column in &selected {
            dst_offsets.push(offset);
            offset += column.width;
        }

        let (dest_header, skipped_keywords) =
            build_table_header(&hdu.header, &selected, schema.nrows, dst_stride);

        // All validation is done; from here on the output file exists.
        writer::write_empty(output, &dest_header)?;
        let mut writer = TableWriter::open(output)?;

        let src = reader.data(hdu);
        let src_stride = schema.row_stride;
        let nrows = schema.nrows as usize;
        let dst = writer.data_mut();

        let mut progress = ExtractionProgress::new(schema.nrows);
        if let Some(callback) = progress_callback {
            callback(&progress);
        }

        let mut start = 0usize;
        while start < nrows {
            let end = (start + self.chunk_size).min(nrows);

            for (slot, column) in selected.iter().enumerate() {
                let dst_off = dst_offsets[slot];
                for row in start..end {
                    let s = row * src_stride + column.offset;
                    let d = row * dst_stride + dst_off;
                    dst[d..d + column.width].copy_from_slice(&src[s..s + column.width]);
                }
            }

            let rows = (end - start) as u64;
            progress.update_chunk(rows, rows * dst_stride as u64);
            if let Some(callback) = progress_callback {
                callback(&progress);
            }
            start = end;
        }

        writer.finish()?;

        Ok(ExtractionReport {
            input: input.display().to_string(),
            output: output.display().to_string(),
            columns: selected.iter().map(|c| ColumnInfo::from(*c)).collect(),
            rows: schema.nrows,
            chunks: progress.chunks_processed,
            bytes_written: progress.bytes_processed,
            skipped_keywords,
            extraction_time: started_at,
            duration: progress.elapsed(),
            config_used: ConfigSnapshot {
                chunk_size: self.chunk_size,
                hdu: self.hdu,
            },
        })
    }

    fn check_request(&self, columns: &[String]) -> Result<()> {
        if columns.is_empty() {
            return Err(FitsColsError::EmptyColumnList);
        }
        if self.chunk_size == 0 {
            return Err(FitsColsError::InvalidChunkSize { value: 0 });
        }
        Ok(())
    }
}

impl Default for ColumnExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve requested names against the schema, in request order.
/// Missing names are collected so the error reports all of them.
fn select_columns<'a>(schema: &'a TableSchema, columns: &[String]) -> Result<Vec<&'a ColumnDesc>> {
    let missing: Vec<String> = columns
        .iter()
        .filter(|name| schema.column(name).is_none())
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(FitsColsError::MissingColumns { names: missing });
    }

    let selected: Vec<&ColumnDesc> = columns
        .iter()
        .map(|name| schema.column(name).expect("presence checked above"))
        .collect();

    for column in &selected {
        if column.format.is_variable_length() {
            return Err(FitsColsError::UnsupportedColumn {
                name: column.name.clone(),
                tform: column.format.as_str().to_string(),
            });
        }
    }

    Ok(selected)
}

fn chunk_count(nrows: u64, chunk_size: usize) -> usize {
    if chunk_size == 0 {
        return 0;
    }
    nrows.div_ceil(chunk_size as u64) as usize
}

/// Build the destination BINTABLE header.
///
/// Mandatory keywords are recomputed for the narrower schema. Column
/// keywords are regenerated under destination indices, carrying the
/// source values for each selected column. Every other source card is
/// copied in order; a card that cannot be assigned is skipped and its
/// keyword recorded.
fn build_table_header(
    source: &Header,
    selected: &[&ColumnDesc],
    nrows: u64,
    row_stride: usize,
) -> (Header, Vec<String>) {
    let mut header = Header::new();
    let mut skipped = Vec::new();

    let mandatory = [
        ("XTENSION", Value::String("BINTABLE".to_string()), "binary table extension"),
        ("BITPIX", Value::Integer(8), "array data type"),
        ("NAXIS", Value::Integer(2), "number of array dimensions"),
        ("NAXIS1", Value::Integer(row_stride as i64), "length of dimension 1"),
        ("NAXIS2", Value::Integer(nrows as i64), "length of dimension 2"),
        ("PCOUNT", Value::Integer(0), "number of group parameters"),
        ("GCOUNT", Value::Integer(1), "number of groups"),
        ("TFIELDS", Value::Integer(selected.len() as i64), "number of table fields"),
    ];
    for (keyword, value, comment) in mandatory {
        header.push(Card::new(keyword, value, Some(comment)).expect("fixed keywords are valid"));
    }

    for (slot, column) in selected.iter().enumerate() {
        let index = slot + 1;
        match Card::new(
            &format!("TTYPE{}", index),
            Value::String(column.name.clone()),
            None,
        ) {
            Ok(card) => header.push(card),
            Err(_) => skipped.push(format!("TTYPE{}", index)),
        }
        match Card::new(
            &format!("TFORM{}", index),
            Value::String(column.format.as_str().to_string()),
            None,
        ) {
            Ok(card) => header.push(card),
            Err(_) => skipped.push(format!("TFORM{}", index)),
        }

        for base in CARRIED_COLUMN_KEYWORDS {
            let source_keyword = format!("{}{}", base, column.index);
            if let Some(card) = source.get(&source_keyword) {
                let dest_keyword = format!("{}{}", base, index);
                match card.with_keyword(&dest_keyword) {
                    Ok(card) => header.push(card),
                    Err(_) => skipped.push(source_keyword),
                }
            }
        }
    }

    for card in source.cards() {
        let keyword = card.keyword();
        if STRUCTURAL_KEYWORDS.contains(&keyword)
            || is_axis_keyword(keyword)
            || is_column_keyword(keyword)
        {
            continue;
        }
        if card.value().is_none() {
            // Commentary cards copy verbatim.
            header.push(card.clone());
        } else if header.push_checked(card.clone()).is_err() {
            skipped.push(keyword.to_string());
        }
    }

    (header, skipped)
}

fn is_axis_keyword(keyword: &str) -> bool {
    keyword
        .strip_prefix("NAXIS")
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

fn is_column_keyword(keyword: &str) -> bool {
    COLUMN_KEYWORD_BASES.iter().any(|base| {
        keyword
            .strip_prefix(base)
            .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
    })
}
