use super::lines::Line;
use crate::row::{Row, RowError};
use serde_json::{Map, Value};

/// Decode one line into a row. Blank lines yield nothing; lines that are not
/// a JSON object yield a row carrying the decode error.
pub fn decode_line(line: &[u8]) -> Option<Row> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return None;
    }

    Some(match serde_json::from_slice::<Map<String, Value>>(line) {
        Ok(data) => Row::from_data(data),
        Err(err) => Row::from_error(RowError::Decode(err.to_string())),
    })
}

pub fn line_to_row(line: Line) -> Option<Row> {
    match line {
        Line::Complete(bytes) => decode_line(&bytes),
        Line::Overlong => Some(Row::from_error(RowError::Overlong)),
    }
}
