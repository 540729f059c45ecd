//! Parsing of Quicken Interchange Format (QIF) files.
//!
//! A QIF file is line oriented. Lines starting with `!` are section headers (`!Account`,
//! `!Type:Bank`, `!Option:AutoSwitch`), a line holding only `^` ends a record, and every other
//! non-blank line is a field whose first character is a one-letter code.
//!
//! Parsing never fails on content: records that are missing required fields are dropped and
//! values that cannot be normalized become `None`. Only a missing or empty source is an error.

mod assembler;
mod line;
mod normalize;
mod parser;

pub use line::{Header, Line};
pub use normalize::{looks_like_date, parse_amount, parse_date, parse_date_iso};
pub use parser::parse;

use crate::model::QifData;
use crate::Result;
use anyhow::{bail, Context};
use std::path::Path;
use tracing::{debug, warn};

/// Files larger than this are still loaded, but with a warning.
const LARGE_FILE_BYTES: u64 = 100 * 1024 * 1024;

/// Checks that `path` is a non-empty regular file and returns its size in bytes.
///
/// # Errors
/// - The path does not exist or is not a regular file.
/// - The file is empty.
pub async fn check_source(path: &Path) -> Result<u64> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("QIF file does not exist: {}", path.display()))?;
    if !metadata.is_file() {
        bail!("QIF path is not a file: {}", path.display());
    }
    if metadata.len() == 0 {
        bail!("QIF file is empty: {}", path.display());
    }
    Ok(metadata.len())
}

/// Reads a QIF file into a `String`. Invalid UTF-8 is replaced rather than rejected.
///
/// # Errors
/// - Any error of `check_source`.
/// - The file cannot be read.
pub async fn read_source(path: &Path) -> Result<String> {
    let len = check_source(path).await?;
    if len > LARGE_FILE_BYTES {
        warn!(
            "Large QIF file detected: {:.1}MB",
            len as f64 / (1024.0 * 1024.0)
        );
    }
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read QIF file at {}", path.display()))?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Reads and parses a QIF file.
pub async fn parse_file(path: &Path) -> Result<QifData> {
    let text = read_source(path).await?;
    Ok(parse(&text))
}
