// Gesture types
// Motor instruction rows, block colors and the reusable gesture block

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GestureError {
    #[error("A gesture needs at least one instruction row")]
    EmptyInstructions,

    #[error("Row {row}: length must be greater than zero, got {value}")]
    NonPositiveLength { row: usize, value: f64 },

    #[error("Row {row}: value is not a finite number")]
    NonFinite { row: usize },

    #[error("Row {row}: start beat cannot be negative, got {value}")]
    NegativeStart { row: usize, value: f64 },

    #[error("Invalid color '{0}', expected #rrggbb")]
    InvalidColor(String),
}

/// One motor command within a gesture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstructionRow {
    /// Motor that receives the command
    pub motor_id: i32,

    /// Beat the command starts on, relative to the start of the gesture
    pub start_beat: f64,

    /// Target position in degrees
    pub position_degrees: f64,

    /// Duration of the move in beats
    pub length_beats: f64,
}

impl InstructionRow {
    pub fn new(motor_id: i32, start_beat: f64, position_degrees: f64, length_beats: f64) -> Self {
        InstructionRow {
            motor_id,
            start_beat,
            position_degrees,
            length_beats,
        }
    }

    /// Beat on which this command finishes
    pub fn end_beat(&self) -> f64 {
        self.start_beat + self.length_beats
    }

    /// Same row moved by a beat offset
    pub fn shifted(&self, beat_offset: f64) -> Self {
        InstructionRow {
            start_beat: self.start_beat + beat_offset,
            ..*self
        }
    }
}

impl Default for InstructionRow {
    /// Starting row for a freshly created gesture
    fn default() -> Self {
        InstructionRow::new(0, 0.0, 0.0, 1.0)
    }
}

/// Check the invariants every instruction set must hold
pub fn validate_instructions(rows: &[InstructionRow]) -> Result<(), GestureError> {
    if rows.is_empty() {
        return Err(GestureError::EmptyInstructions);
    }

    for (row, instruction) in rows.iter().enumerate() {
        let values = [
            instruction.start_beat,
            instruction.position_degrees,
            instruction.length_beats,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(GestureError::NonFinite { row });
        }
        if instruction.start_beat < 0.0 {
            return Err(GestureError::NegativeStart {
                row,
                value: instruction.start_beat,
            });
        }
        if instruction.length_beats <= 0.0 {
            return Err(GestureError::NonPositiveLength {
                row,
                value: instruction.length_beats,
            });
        }
    }

    Ok(())
}

/// Beat length of an instruction set: the latest end beat of any row
pub fn beat_length_of(rows: &[InstructionRow]) -> f64 {
    rows.iter()
        .map(InstructionRow::end_beat)
        .fold(0.0, f64::max)
}

/// Block color shown on the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Random light color, each channel in [128, 255)
    pub fn random() -> Self {
        // A v4 UUID is 122 bits of OS randomness, plenty for three channels
        let bytes = Uuid::new_v4().into_bytes();
        let channel = |byte: u8| 128 + byte % 127;
        Rgb::new(channel(bytes[0]), channel(bytes[1]), channel(bytes[2]))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn from_hex(hex: &str) -> Result<Self, GestureError> {
        let invalid = || GestureError::InvalidColor(hex.to_string());

        let digits = hex.strip_prefix('#').ok_or_else(invalid)?;
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(invalid());
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|_| invalid())
        };
        Ok(Rgb::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

/// A named, reusable pattern of motor instructions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureBlock {
    /// Stable identity, shared by nothing else
    id: Uuid,

    /// Gesture name, unique within its library
    name: String,

    /// Ordered instruction rows
    instructions: Vec<InstructionRow>,

    /// Display color
    color: Rgb,
}

impl GestureBlock {
    /// Create a gesture with a random color
    pub fn new(name: impl Into<String>, instructions: Vec<InstructionRow>) -> Result<Self, GestureError> {
        Self::with_color(name, instructions, Rgb::random())
    }

    pub fn with_color(
        name: impl Into<String>,
        instructions: Vec<InstructionRow>,
        color: Rgb,
    ) -> Result<Self, GestureError> {
        validate_instructions(&instructions)?;

        Ok(GestureBlock {
            id: Uuid::new_v4(),
            name: name.into(),
            instructions,
            color,
        })
    }

    /// Copy with identical content and a fresh id
    pub fn copy_with_new_id(&self) -> Self {
        GestureBlock {
            id: Uuid::new_v4(),
            ..self.clone()
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &[InstructionRow] {
        &self.instructions
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    /// Number of beats the gesture occupies
    pub fn beat_length(&self) -> f64 {
        beat_length_of(&self.instructions)
    }

    /// Width of the gesture on the full-track timeline
    pub fn display_width_pixels(&self, tempo_bpm: u32, track_duration_secs: f64, render_width: u32) -> f64 {
        let seconds = self.beat_length() / tempo_bpm as f64 * 60.0;
        seconds / track_duration_secs * render_width as f64
    }

    /// Replace all rows, keeping identity and color
    pub fn set_instructions(&mut self, instructions: Vec<InstructionRow>) -> Result<(), GestureError> {
        validate_instructions(&instructions)?;
        self.instructions = instructions;
        Ok(())
    }
}
