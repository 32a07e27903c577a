// Arranger - Gesture placement and sequence export
// Drops gesture blocks into segments and flattens them into one playable stream

pub mod export;
pub mod placement;
pub mod sequence;

pub use export::{export_bytes, export_sequence, flatten, ExportError};
pub use placement::{BlockLayout, CapacityExceeded, DuplicateReport, PlacementError, SegmentPlacement};
pub use sequence::{Cue, Sequence};
