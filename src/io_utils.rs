//! Decoding survey exports and reading/writing CSV tables.
//!
//! All file I/O flows through this module:
//!
//! - **Encoding**: an explicit label is resolved through `encoding_rs` and
//!   decoded strictly. Without a label the bytes are sniffed for a BOM, then
//!   tried as strict UTF-8, and finally decoded as windows-1252 (the WHATWG
//!   reading of ISO-8859-1), which accepts any byte sequence.
//! - **Delimiters**: `.tsv` inputs default to tab, everything else to comma.
//! - **stdin/stdout**: the `-` path convention routes through standard streams.
//! - **Output**: always UTF-8, header order and row order exactly as given.

use std::{
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use log::{debug, warn};

use crate::{data::Table, error::NormalizeError};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

/// `None` requests auto-detection.
pub fn resolve_encoding(label: Option<&str>) -> Result<Option<&'static Encoding>> {
    label
        .map(|value| {
            Encoding::for_label(value.trim().as_bytes())
                .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
        })
        .transpose()
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static Encoding,
    /// True when detection gave up on UTF-8 and fell back to windows-1252.
    pub fell_back: bool,
}

/// Strict decode with `encoding`. A byte-order mark is stripped only when it
/// names the same encoding; any other BOM is decoded as ordinary bytes.
pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let body = match Encoding::for_bom(bytes) {
        Some((bom_encoding, bom_len)) if bom_encoding == encoding => &bytes[bom_len..],
        _ => bytes,
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned())
        .ok_or_else(|| {
            anyhow!(
                "Failed to decode text with encoding {}",
                encoding.name()
            )
        })
}

pub fn decode_input(bytes: &[u8], explicit: Option<&'static Encoding>) -> Result<DecodedText> {
    if let Some(encoding) = explicit {
        return Ok(DecodedText {
            text: decode_bytes(bytes, encoding)?,
            encoding,
            fell_back: false,
        });
    }
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        debug!("Detected {} byte-order mark", encoding.name());
        return Ok(DecodedText {
            text: decode_bytes(&bytes[bom_len..], encoding)?,
            encoding,
            fell_back: false,
        });
    }
    if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        return Ok(DecodedText {
            text: text.into_owned(),
            encoding: UTF_8,
            fell_back: false,
        });
    }
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    Ok(DecodedText {
        text: text.into_owned(),
        encoding: WINDOWS_1252,
        fell_back: true,
    })
}

/// Decoded header row and data records of one input file.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
    pub encoding: &'static Encoding,
}

pub fn read_input_bytes(path: &Path) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    if is_dash(path) {
        io::stdin()
            .lock()
            .read_to_end(&mut bytes)
            .context("Reading stdin")?;
    } else {
        File::open(path)
            .with_context(|| format!("Opening input file {path:?}"))?
            .read_to_end(&mut bytes)
            .with_context(|| format!("Reading input file {path:?}"))?;
    }
    Ok(bytes)
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

/// Parses already-decoded CSV text. Fails with
/// [`NormalizeError::EmptyHeaderRow`] when the header row has no columns.
pub fn parse_csv_text(
    text: &str,
    delimiter: u8,
    path: &Path,
) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = open_csv_reader(text.as_bytes(), delimiter);
    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Reading header row of {path:?}"))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.is_empty() || (headers.len() == 1 && headers[0].trim().is_empty()) {
        return Err(NormalizeError::EmptyHeaderRow {
            path: path.to_path_buf(),
        }
        .into());
    }
    let mut records = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Reading row {} of {path:?}", idx + 2))?;
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok((headers, records))
}

pub fn read_raw_table(
    path: &Path,
    delimiter: u8,
    encoding: Option<&'static Encoding>,
) -> Result<RawTable> {
    let bytes = read_input_bytes(path)?;
    let decoded = decode_input(&bytes, encoding)
        .with_context(|| format!("Decoding input file {path:?}"))?;
    if decoded.fell_back {
        warn!(
            "{path:?} is not valid UTF-8; decoded as {} instead",
            decoded.encoding.name()
        );
    } else {
        debug!("Decoded {path:?} as {}", decoded.encoding.name());
    }
    let (headers, records) = parse_csv_text(&decoded.text, delimiter, path)?;
    Ok(RawTable {
        headers,
        records,
        encoding: decoded.encoding,
    })
}

pub fn open_csv_writer(path: Option<&Path>, delimiter: u8) -> Result<csv::Writer<Box<dyn Write>>> {
    let base: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(io::stdout()),
    };
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    Ok(builder.from_writer(base))
}

pub fn write_table(path: Option<&Path>, table: &Table, delimiter: u8) -> Result<()> {
    let mut writer = open_csv_writer(path, delimiter)?;
    writer
        .write_record(table.headers.iter())
        .context("Writing output headers")?;
    for (idx, row) in table.text_rows().iter().enumerate() {
        writer
            .write_record(row.iter())
            .with_context(|| format!("Writing output row {}", idx + 2))?;
    }
    writer.flush().context("Flushing output writer")?;
    Ok(())
}
