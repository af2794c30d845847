// 📄 Row Source - delimited text files as headers + chunks of rows
//
// Every input (regional reports, housing-fund exports, the registry) arrives as a
// delimited text file of unknown encoding and delimiter:
// - encoding: UTF-8 with BOM, then UTF-8, then Windows-1251
// - delimiter: sniffed among `,` `;` TAB `|`
//
// Both encodings are streamed (Windows-1251 is transcoded block by block), and rows
// are handed out in bounded chunks so callers never hold a whole export.

use crate::error::{ImportError, Result};
use csv::{ReaderBuilder, StringRecord};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Bytes inspected for encoding and delimiter detection
pub const SNIFF_SAMPLE_BYTES: usize = 256 * 1024;

/// Delimiter candidates, in preference order for ties
pub const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Lines looked at when sniffing the delimiter
const SNIFF_LINES: usize = 5;

/// Malformed rows reported individually before switching to a summary
const MAX_ROW_WARNINGS: usize = 20;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Raw bytes transcoded per refill of a Windows-1251 source
const TRANSCODE_BLOCK_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8Bom,
    Utf8,
    Windows1251,
}

// ============================================================================
// SNIFFING
// ============================================================================

pub fn sniff_encoding(sample: &[u8]) -> SourceEncoding {
    if sample.starts_with(&UTF8_BOM) {
        return SourceEncoding::Utf8Bom;
    }
    match std::str::from_utf8(sample) {
        Ok(_) => SourceEncoding::Utf8,
        // Sample boundary cut a multi-byte character: still UTF-8
        Err(e) if e.error_len().is_none() => SourceEncoding::Utf8,
        Err(_) => SourceEncoding::Windows1251,
    }
}

/// Delimiter giving the most columns, preferring ones consistent across sample lines
pub fn sniff_delimiter(text: &str) -> u8 {
    let lines: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();

    let mut best = (b',', false, 1usize);
    for &delimiter in &DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|l| l.split(delimiter as char).count())
            .collect();
        let Some(&columns) = counts.first() else {
            continue;
        };
        if columns < 2 {
            continue;
        }
        let consistent = counts.iter().all(|&c| c == columns);
        if (consistent, columns) > (best.1, best.2) {
            best = (delimiter, consistent, columns);
        }
    }
    best.0
}

fn decode_sample(sample: &[u8], encoding: SourceEncoding) -> String {
    match encoding {
        SourceEncoding::Windows1251 => encoding_rs::WINDOWS_1251.decode(sample).0.into_owned(),
        _ => String::from_utf8_lossy(sample).into_owned(),
    }
}

// ============================================================================
// TRANSCODING
// ============================================================================

/// Windows-1251 bytes in, UTF-8 bytes out, one raw block at a time
pub struct Windows1251Reader<R> {
    inner: R,
    label: String,
    decoder: encoding_rs::Decoder,
    raw: Vec<u8>,
    decoded: Vec<u8>,
    position: usize,
    finished: bool,
    replaced: bool,
}

impl<R: Read> Windows1251Reader<R> {
    pub fn new(inner: R, label: String) -> Self {
        Self::with_block_size(inner, label, TRANSCODE_BLOCK_BYTES)
    }

    pub fn with_block_size(inner: R, label: String, block_size: usize) -> Self {
        Windows1251Reader {
            inner,
            label,
            decoder: encoding_rs::WINDOWS_1251.new_decoder_without_bom_handling(),
            raw: vec![0; block_size.max(1)],
            decoded: Vec::new(),
            position: 0,
            finished: false,
            replaced: false,
        }
    }

    /// Transcode the next raw block; false once the input is exhausted
    fn refill(&mut self) -> io::Result<bool> {
        let read = self.inner.read(&mut self.raw)?;
        let last = read == 0;

        let capacity = self
            .decoder
            .max_utf8_buffer_length(read)
            .unwrap_or(read * 3 + 16);
        self.decoded.clear();
        self.decoded.resize(capacity, 0);
        self.position = 0;

        let (_, _, written, had_errors) = self
            .decoder
            .decode_to_utf8(&self.raw[..read], &mut self.decoded, last);
        self.decoded.truncate(written);

        if had_errors && !self.replaced {
            self.replaced = true;
            warn!(file = %self.label, "undecodable bytes replaced while reading as windows-1251");
        }
        if last {
            self.finished = true;
        }
        Ok(!last || written > 0)
    }
}

impl<R: Read> Read for Windows1251Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.position >= self.decoded.len() {
            if self.finished || !self.refill()? {
                return Ok(0);
            }
        }
        let available = &self.decoded[self.position..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.position += n;
        Ok(n)
    }
}

// ============================================================================
// ROWS
// ============================================================================

/// Header row shared by every row of one file
#[derive(Debug)]
struct HeaderIndex {
    record: StringRecord,
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    fn new(record: StringRecord) -> Self {
        let names: Vec<String> = record.iter().map(|h| h.replace('\u{feff}', "")).collect();
        let mut positions = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            // duplicate header names: first column wins
            positions.entry(name.clone()).or_insert(i);
        }
        HeaderIndex {
            record: StringRecord::from(names.clone()),
            names,
            positions,
        }
    }
}

/// One data row with its 1-based source line
#[derive(Debug, Clone)]
pub struct Row {
    pub line: u64,
    headers: Arc<HeaderIndex>,
    record: StringRecord,
}

impl Row {
    /// Trimmed cell under `column`, None when absent or blank
    pub fn get(&self, column: &str) -> Option<&str> {
        let index = *self.headers.positions.get(column)?;
        let value = self.record.get(index)?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// `get` for an optional column (as returned by the field extractor)
    pub fn field(&self, column: Option<&str>) -> Option<&str> {
        column.and_then(|c| self.get(c))
    }

    /// Deserialize the row by header name into a serde struct
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        self.record
            .deserialize(Some(&self.headers.record))
            .map_err(|e| ImportError::Row {
                line: self.line,
                message: e.to_string(),
            })
    }
}

// ============================================================================
// ROW SOURCE TRAIT
// ============================================================================

/// Anything that yields a header row and then rows in bounded chunks
pub trait RowSource {
    fn headers(&self) -> &[String];

    /// Up to `max_rows` rows; an empty chunk means the source is exhausted
    fn next_chunk(&mut self, max_rows: usize) -> Result<Vec<Row>>;

    /// File name (or label) used in logs
    fn source_name(&self) -> &str;

    /// Convenience for small inputs: every remaining row
    fn read_all(&mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        loop {
            let chunk = self.next_chunk(usize::MAX)?;
            if chunk.is_empty() {
                return Ok(rows);
            }
            rows.extend(chunk);
        }
    }
}

// ============================================================================
// CSV ROW READER
// ============================================================================

pub struct CsvRowReader {
    name: String,
    encoding: SourceEncoding,
    delimiter: u8,
    reader: csv::Reader<Box<dyn Read>>,
    headers: Arc<HeaderIndex>,
    rows_read: u64,
    rows_skipped: u64,
}

impl CsvRowReader {
    /// Open a file, sniffing encoding and delimiter
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ImportError::MissingSource(path.to_path_buf()));
        }

        let mut file = File::open(path)?;
        let mut sample = Vec::with_capacity(SNIFF_SAMPLE_BYTES);
        (&mut file).take(SNIFF_SAMPLE_BYTES as u64).read_to_end(&mut sample)?;

        let encoding = sniff_encoding(&sample);
        let delimiter = sniff_delimiter(&decode_sample(&sample, encoding));

        let input: Box<dyn Read> = match encoding {
            SourceEncoding::Utf8Bom => {
                file.seek(SeekFrom::Start(UTF8_BOM.len() as u64))?;
                Box::new(BufReader::new(file))
            }
            SourceEncoding::Utf8 => {
                file.seek(SeekFrom::Start(0))?;
                Box::new(BufReader::new(file))
            }
            SourceEncoding::Windows1251 => {
                file.seek(SeekFrom::Start(0))?;
                Box::new(Windows1251Reader::new(file, path.display().to_string()))
            }
        };

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.csv")
            .to_string();

        debug!(file = %name, ?encoding, delimiter = %(delimiter as char).escape_default(), "opened source");
        Self::build(name, encoding, delimiter, input)
    }

    /// Reader over in-memory UTF-8 text with a known delimiter
    pub fn from_reader(name: &str, delimiter: u8, input: impl Read + 'static) -> Result<Self> {
        Self::build(name.to_string(), SourceEncoding::Utf8, delimiter, Box::new(input))
    }

    fn build(name: String, encoding: SourceEncoding, delimiter: u8, input: Box<dyn Read>) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(input);
        let headers = Arc::new(HeaderIndex::new(reader.headers()?.clone()));

        Ok(CsvRowReader {
            name,
            encoding,
            delimiter,
            reader,
            headers,
            rows_read: 0,
            rows_skipped: 0,
        })
    }

    pub fn encoding(&self) -> SourceEncoding {
        self.encoding
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Rows dropped because the CSV layer could not decode them
    pub fn rows_skipped(&self) -> u64 {
        self.rows_skipped
    }
}

impl RowSource for CsvRowReader {
    fn headers(&self) -> &[String] {
        &self.headers.names
    }

    fn next_chunk(&mut self, max_rows: usize) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        let mut record = StringRecord::new();

        while rows.len() < max_rows {
            match self.reader.read_record(&mut record) {
                Ok(false) => break,
                Ok(true) => {
                    self.rows_read += 1;
                    let line = record
                        .position()
                        .map(|p| p.line())
                        .unwrap_or(self.rows_read + 1);
                    rows.push(Row {
                        line,
                        headers: Arc::clone(&self.headers),
                        record: record.clone(),
                    });
                }
                Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => return Err(e.into()),
                Err(e) => {
                    self.rows_skipped += 1;
                    if self.rows_skipped as usize <= MAX_ROW_WARNINGS {
                        warn!(file = %self.name, error = %e, "malformed row skipped");
                    } else if self.rows_skipped as usize == MAX_ROW_WARNINGS + 1 {
                        warn!(file = %self.name, "further malformed rows are only counted");
                    }
                }
            }
        }

        Ok(rows)
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// TESTS
// ============================================================================
