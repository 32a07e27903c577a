// Groove Engine - Beat grid, segments and playhead
// The quantized coordinate system every placement is expressed in

pub mod grid;
pub mod playhead;
pub mod segments;

pub use grid::{BeatGrid, GridError};
pub use playhead::{
    click_at_pixel, cursor_seek_secs, format_seconds, position_to_beat_and_segment,
    segment_start_secs, PlayheadPosition, SegmentCursor, TimelineClick,
};
pub use segments::{Segment, SegmentError, SegmentIndex};
