//! Field helpers shared by the CSV repositories.

use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord, Writer};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

/// Text of column `index`, named `column` in error messages.
pub(crate) fn field<'r>(record: &'r StringRecord, index: usize, column: &str) -> Result<&'r str> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| anyhow!("missing column '{}' in row {:?}", column, record.position().map(|p| p.line())))
}

pub(crate) fn decimal_field(record: &StringRecord, index: usize, column: &str) -> Result<Decimal> {
    let raw = field(record, index, column)?;
    if raw.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(raw).with_context(|| format!("invalid amount '{}' in column '{}'", raw, column))
}

/// Parse a column through its type's `FromStr`, carrying the message into the error.
pub(crate) fn parsed_field<T>(record: &StringRecord, index: usize, column: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = field(record, index, column)?;
    raw.parse::<T>()
        .map_err(|e| anyhow!("invalid value '{}' in column '{}': {}", raw, column, e))
}

/// Every data row of a CSV file with a header line. A missing file has no rows.
pub(crate) fn read_rows(path: &Path) -> Result<Vec<StringRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.with_context(|| format!("reading {}", path.display()))?;
        if record.iter().all(|value| value.trim().is_empty()) {
            continue;
        }
        rows.push(record);
    }
    Ok(rows)
}

/// Serialize a header and rows into CSV bytes.
pub(crate) fn encode_rows(header: &[&str], rows: impl IntoIterator<Item = Vec<String>>) -> Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    writer.flush()?;
    writer.into_inner().map_err(|e| anyhow!("flushing csv buffer: {}", e))
}
