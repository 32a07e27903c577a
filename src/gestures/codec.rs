// Instruction text codec
// Reads and writes rows of [motor_id, start_beat, position, length] as delimited text

use std::io::Write;
use thiserror::Error;

use super::types::InstructionRow;

/// Number of numeric fields in one instruction row
pub const FIELDS_PER_ROW: usize = 4;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("File contains no values")]
    Empty,

    #[error("'{token}' is not a number (value {position})")]
    NotANumber { position: usize, token: String },

    #[error("{0} values do not form whole rows of four")]
    RaggedRows(usize),

    #[error("Motor id {0} is not a whole number")]
    FractionalMotorId(f64),
}

/// Parse delimited instruction text
///
/// Values may be separated by commas, whitespace or newlines and are grouped
/// in fours, so both one-row-per-line files and single-line dumps load.
pub fn parse_rows(text: &str) -> Result<Vec<InstructionRow>, CodecError> {
    let values = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .enumerate()
        .map(|(position, token)| {
            token.parse::<f64>().map_err(|_| CodecError::NotANumber {
                position,
                token: token.to_string(),
            })
        })
        .collect::<Result<Vec<f64>, CodecError>>()?;

    if values.is_empty() {
        return Err(CodecError::Empty);
    }
    if values.len() % FIELDS_PER_ROW != 0 {
        return Err(CodecError::RaggedRows(values.len()));
    }

    values
        .chunks_exact(FIELDS_PER_ROW)
        .map(|fields| -> Result<InstructionRow, CodecError> {
            Ok(InstructionRow::new(
                motor_id_from(fields[0])?,
                fields[1],
                fields[2],
                fields[3],
            ))
        })
        .collect()
}

fn motor_id_from(value: f64) -> Result<i32, CodecError> {
    if value.fract() != 0.0 || value < i32::MIN as f64 || value > i32::MAX as f64 {
        return Err(CodecError::FractionalMotorId(value));
    }
    Ok(value as i32)
}

/// Write rows one per line, comma separated, no header
pub fn write_rows<W: Write>(writer: &mut W, rows: &[InstructionRow]) -> std::io::Result<()> {
    for row in rows {
        writeln!(
            writer,
            "{},{},{},{}",
            row.motor_id, row.start_beat, row.position_degrees, row.length_beats
        )?;
    }
    Ok(())
}

/// Render rows to a string, one per line
pub fn rows_to_string(rows: &[InstructionRow]) -> String {
    rows.iter()
        .map(|row| {
            format!(
                "{},{},{},{}\n",
                row.motor_id, row.start_beat, row.position_degrees, row.length_beats
            )
        })
        .collect()
}
