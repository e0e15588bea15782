use moltopo::core::models::atom::AtomId;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid atom id '{0}'. Expected a positive integer.")]
    InvalidId(String),

    #[error("Invalid id range '{0}'. Expected 'start-end' with start <= end.")]
    InvalidRange(String),

    #[error("The id list '{0}' is empty.")]
    Empty(String),
}

fn parse_id(token: &str) -> Result<AtomId, ParseError> {
    match token.trim().parse::<AtomId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ParseError::InvalidId(token.trim().to_string())),
    }
}

/// Parses a comma-separated list of ids and inclusive ranges such as
/// `1,4-6`. Duplicates collapse; the result is ascending.
pub fn parse_id_list(input: &str) -> Result<BTreeSet<AtomId>, ParseError> {
    let mut ids = BTreeSet::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (parse_id(start)?, parse_id(end)?);
                if start > end {
                    return Err(ParseError::InvalidRange(part.to_string()));
                }
                ids.extend(start..=end);
            }
            None => {
                ids.insert(parse_id(part)?);
            }
        }
    }
    if ids.is_empty() {
        return Err(ParseError::Empty(input.to_string()));
    }
    Ok(ids)
}
