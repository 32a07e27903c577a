// Instruction table adapter
// Cell-level view of a gesture's rows for the table editor

use thiserror::Error;

use super::types::{validate_instructions, GestureError, InstructionRow};

/// Column headers shown by the table editor
pub const COLUMN_HEADERS: [&str; 4] = ["Motor ID", "Beat #", "Position (°)", "Length (beats)"];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("Cell ({row}, {column}) is outside the table")]
    OutOfBounds { row: usize, column: usize },

    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("Motor id must be a whole number, got '{0}'")]
    InvalidMotorId(String),

    #[error("A gesture must keep at least one row")]
    LastRow,

    #[error(transparent)]
    Invalid(#[from] GestureError),
}

/// Editable table over an instruction set
///
/// Edits apply to a working copy; `into_rows` hands back validated rows for
/// the library or a placement to commit.
#[derive(Debug, Clone, PartialEq)]
pub struct InstructionTable {
    rows: Vec<InstructionRow>,
}

impl InstructionTable {
    pub fn new(rows: Vec<InstructionRow>) -> Self {
        InstructionTable { rows }
    }

    /// Table for a brand new gesture
    pub fn blank() -> Self {
        InstructionTable::new(vec![InstructionRow::default()])
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        COLUMN_HEADERS.len()
    }

    pub fn header(&self, column: usize) -> Option<&'static str> {
        COLUMN_HEADERS.get(column).copied()
    }

    /// Numeric value of a cell
    pub fn value(&self, row: usize, column: usize) -> Option<f64> {
        let instruction = self.rows.get(row)?;
        match column {
            0 => Some(instruction.motor_id as f64),
            1 => Some(instruction.start_beat),
            2 => Some(instruction.position_degrees),
            3 => Some(instruction.length_beats),
            _ => None,
        }
    }

    /// Text shown in a cell
    pub fn display(&self, row: usize, column: usize) -> Option<String> {
        let instruction = self.rows.get(row)?;
        match column {
            0 => Some(instruction.motor_id.to_string()),
            1..=3 => self.value(row, column).map(|v| v.to_string()),
            _ => None,
        }
    }

    /// Edit a cell from user text
    ///
    /// A rejected edit leaves the table untouched.
    pub fn set_cell(&mut self, row: usize, column: usize, text: &str) -> Result<(), TableError> {
        if row >= self.rows.len() || column >= COLUMN_HEADERS.len() {
            return Err(TableError::OutOfBounds { row, column });
        }

        let text = text.trim();
        let mut edited = self.rows[row];
        if column == 0 {
            edited.motor_id = text
                .parse::<i32>()
                .map_err(|_| TableError::InvalidMotorId(text.to_string()))?;
        } else {
            let value = text
                .parse::<f64>()
                .map_err(|_| TableError::NotANumber(text.to_string()))?;
            match column {
                1 => edited.start_beat = value,
                2 => edited.position_degrees = value,
                _ => edited.length_beats = value,
            }
        }

        validate_instructions(std::slice::from_ref(&edited))?;
        self.rows[row] = edited;
        Ok(())
    }

    /// Append a row that starts where the gesture currently ends
    pub fn add_row(&mut self) -> usize {
        let start_beat = super::types::beat_length_of(&self.rows);
        let motor_id = self.rows.last().map(|r| r.motor_id).unwrap_or(0);
        self.rows
            .push(InstructionRow::new(motor_id, start_beat, 0.0, 1.0));
        self.rows.len() - 1
    }

    pub fn remove_row(&mut self, row: usize) -> Result<InstructionRow, TableError> {
        if row >= self.rows.len() {
            return Err(TableError::OutOfBounds { row, column: 0 });
        }
        if self.rows.len() == 1 {
            return Err(TableError::LastRow);
        }
        Ok(self.rows.remove(row))
    }

    pub fn rows(&self) -> &[InstructionRow] {
        &self.rows
    }

    /// Finish editing, returning rows that satisfy every gesture invariant
    pub fn into_rows(self) -> Result<Vec<InstructionRow>, TableError> {
        validate_instructions(&self.rows)?;
        Ok(self.rows)
    }
}
