use super::traits::MolecularFile;
use crate::core::models::coordinates::CoordinateSet;
use crate::core::models::topology::ConsistencyError;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CoordinateError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: CoordinateParseErrorKind,
    },
    #[error("The box must be cubic, got {x} x {y} x {z}")]
    NonCubicBox { x: f64, y: f64, z: f64 },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
    #[error("Inconsistent data: {0}")]
    Consistency(#[from] ConsistencyError),
}

#[derive(Debug, Error)]
pub enum CoordinateParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Line is too short for an atom record (must be at least {0} chars)")]
    LineTooShort(usize),
    #[error("Box line must hold three numbers (got '{0}')")]
    InvalidBox(String),
}

pub(crate) fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end).unwrap_or("").trim()
}

pub(crate) fn parse_int(
    line: &str,
    line_num: usize,
    start: usize,
    end: usize,
) -> Result<usize, CoordinateError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| CoordinateError::Parse {
        line: line_num,
        kind: CoordinateParseErrorKind::InvalidInt {
            columns: format!("{}-{}", start + 1, end),
            value: value.into(),
        },
    })
}

pub(crate) fn parse_float(
    line: &str,
    line_num: usize,
    start: usize,
    end: usize,
) -> Result<f64, CoordinateError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| CoordinateError::Parse {
        line: line_num,
        kind: CoordinateParseErrorKind::InvalidFloat {
            columns: format!("{}-{}", start + 1, end),
            value: value.into(),
        },
    })
}

/// Parses the first three whitespace-separated numbers of `fields`.
pub(crate) fn parse_box<'a>(
    mut fields: impl Iterator<Item = &'a str>,
    raw: &str,
    line_num: usize,
) -> Result<[f64; 3], CoordinateError> {
    let invalid = || CoordinateError::Parse {
        line: line_num,
        kind: CoordinateParseErrorKind::InvalidBox(raw.trim().to_string()),
    };
    let mut out = [0.0; 3];
    for slot in &mut out {
        *slot = fields
            .next()
            .and_then(|f| f.parse().ok())
            .ok_or_else(invalid)?;
    }
    Ok(out)
}

/// Writes `set` to `path` in format `F` if it changed since it was last
/// written, or unconditionally with `force`.
///
/// Returns whether anything was written. The modified flag is cleared after
/// a successful write.
pub fn write_if_modified<F, P>(
    set: &mut CoordinateSet,
    options: &F::Options,
    path: P,
    force: bool,
) -> Result<bool, F::Error>
where
    F: MolecularFile<Data = CoordinateSet>,
    P: AsRef<Path>,
{
    if !set.is_modified() && !force {
        debug!("Skipping write of {}, nothing changed", path.as_ref().display());
        return Ok(false);
    }
    F::write_to_path(set, options, path)?;
    set.clear_modified();
    Ok(true)
}
