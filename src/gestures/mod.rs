// Gesture module
// Reusable motor instruction blocks and their table/text representations

pub mod codec;
pub mod table;
pub mod types;

pub use codec::{parse_rows, rows_to_string, write_rows, CodecError};
pub use table::{InstructionTable, TableError, COLUMN_HEADERS};
pub use types::{beat_length_of, validate_instructions, GestureBlock, GestureError, InstructionRow, Rgb};
