use crate::error::{Error, Result};

/// Parse a comma separated list of column numbers into positions,
/// adding `shift` to each.
///
/// Tokens are trimmed and blank tokens are skipped, so `"1,  2,,,3"`
/// yields `[1, 2, 3]` with a shift of zero. A token that is not an
/// integer, or one that lands below zero after shifting, is rejected.
pub fn parse_indices_shift(list: &str, shift: i64) -> Result<Vec<usize>> {
    list.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<i64>()
                .ok()
                .and_then(|parsed| parsed.checked_add(shift))
                .and_then(|position| usize::try_from(position).ok())
                .ok_or_else(|| Error::ParseIndex {
                    token: token.to_string(),
                })
        })
        .collect()
}

/// Parse 1-based column numbers into 0-based positions.
pub fn parse_indices(list: &str) -> Result<Vec<usize>> {
    parse_indices_shift(list, -1)
}

/// Build query text from the selected columns of `row`.
///
/// Fields equal to `null_value` contribute nothing. Selected fields are
/// joined by single spaces and the result is trimmed.
pub fn project(
    row: &[String],
    positions: &[usize],
    null_value: &str,
) -> Result<String> {
    let mut text = String::new();
    for &index in positions {
        let value = row.get(index).ok_or(Error::OutOfRange {
            index,
            width: row.len(),
        })?;
        if value == null_value {
            continue;
        }
        text.push_str(value);
        text.push(' ');
    }
    Ok(text.trim().to_string())
}
