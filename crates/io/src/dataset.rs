// Delimited-text dataset loading (CSV/TSV/semicolon/pipe)

use std::io::Read;
use std::path::{Path, PathBuf};

use belcheck_recon::{Cell, Dataset};

/// Tokens read as a missing cell (compared after trimming).
pub const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None", "#N/A"];

#[derive(Debug)]
pub enum LoadError {
    Io { path: PathBuf, message: String },
    Csv { path: PathBuf, message: String },
    /// No header record.
    Empty(PathBuf),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "cannot read {}: {message}", path.display()),
            Self::Csv { path, message } => write!(f, "cannot parse {}: {message}", path.display()),
            Self::Empty(path) => write!(f, "{} has no header row", path.display()),
        }
    }
}

impl std::error::Error for LoadError {}

pub fn load_dataset(path: &Path) -> Result<Dataset, LoadError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    log::debug!("{}: sniffed delimiter {:?}", path.display(), delimiter as char);
    parse_dataset(path, &content, delimiter)
}

pub fn load_dataset_with_delimiter(path: &Path, delimiter: u8) -> Result<Dataset, LoadError> {
    let content = read_file_as_utf8(path)?;
    parse_dataset(path, &content, delimiter)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).take(10).collect();

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let Some(&target) = counts.first() else { continue };
        if target <= 1 {
            continue;
        }

        // lines agreeing with the header, weighted by field count
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read a file as UTF-8 text. Strips a UTF-8 BOM; otherwise falls back to
/// EUC-KR (Korean Excel exports), then Windows-1252.
pub fn read_file_as_utf8(path: &Path) -> Result<String, LoadError> {
    let io_err = |e: std::io::Error| LoadError::Io { path: path.to_path_buf(), message: e.to_string() };
    let mut file = std::fs::File::open(path).map_err(io_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(io_err)?;
    Ok(decode_bytes(path, bytes))
}

/// Same decoding rules as [`read_file_as_utf8`] for an in-memory buffer.
pub fn decode_bytes(source: &Path, bytes: Vec<u8>) -> String {
    let bytes = match bytes.strip_prefix(b"\xEF\xBB\xBF") {
        Some(rest) => rest.to_vec(),
        None => bytes,
    };

    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            if let Some(text) = encoding_rs::EUC_KR.decode_without_bom_handling_and_without_replacement(&bytes) {
                log::info!("{}: not UTF-8, decoded as EUC-KR", source.display());
                return text.into_owned();
            }
            log::warn!("{}: not UTF-8 or EUC-KR, decoded as Windows-1252", source.display());
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    }
}

pub fn is_missing_token(field: &str) -> bool {
    MISSING_TOKENS.contains(&field.trim())
}

/// Parse delimited text into a typed dataset. The first record is the header.
pub fn parse_dataset(source: &Path, content: &str, delimiter: u8) -> Result<Dataset, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let csv_err = |e: csv::Error| LoadError::Csv { path: source.to_path_buf(), message: e.to_string() };

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::Empty(source.to_path_buf()));
    }
    let width = headers.len();

    // Raw fields per column; None = missing token.
    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); width];
    let mut record = csv::StringRecord::new();
    let mut rows = 0usize;
    while reader.read_record(&mut record).map_err(csv_err)? {
        for (col, column) in columns.iter_mut().enumerate() {
            let field = record.get(col).filter(|f| !is_missing_token(f));
            column.push(field.map(str::to_string));
        }
        rows += 1;
    }

    let typed: Vec<Vec<Cell>> = columns.into_iter().map(type_column).collect();
    let numeric = typed
        .iter()
        .filter(|c| c.iter().any(|cell| matches!(cell, Cell::Number(_))))
        .count();

    let mut data: Vec<Vec<Cell>> = (0..rows).map(|_| Vec::with_capacity(width)).collect();
    for column in typed {
        for (row, cell) in data.iter_mut().zip(column) {
            row.push(cell);
        }
    }

    log::info!(
        "loaded {}: {} rows x {} columns ({} numeric)",
        source.display(),
        rows,
        width,
        numeric
    );
    Ok(Dataset::new(headers, data))
}

/// A column is numeric when every present field parses as a finite number;
/// otherwise every present field stays text as written.
fn type_column(fields: Vec<Option<String>>) -> Vec<Cell> {
    let parsed: Option<Vec<Option<f64>>> = fields
        .iter()
        .map(|f| match f {
            None => Some(None),
            Some(s) => parse_number(s).map(Some),
        })
        .collect();

    match parsed {
        Some(numbers) => numbers.into_iter().map(Cell::from).collect(),
        None => fields.into_iter().map(Cell::from).collect(),
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}
