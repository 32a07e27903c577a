// Playhead tracking and segment navigation
// Maps playback ticks and timeline clicks onto beats and segments

use serde::Serialize;

use super::grid::{BeatGrid, GridError};
use super::segments::SegmentIndex;

/// Where the playhead currently sits on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlayheadPosition {
    /// Nearest beat to the playback time
    pub beat_index: usize,

    /// Segment holding that beat, if any starts at or before it
    pub segment_index: Option<usize>,
}

/// Result of clicking on the rendered timeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelineClick {
    /// Clicked position snapped onto the nearest beat
    pub snapped_pixel: f64,

    /// Beat under the click
    pub beat_index: usize,

    /// Segment under the click
    pub segment_index: Option<usize>,

    /// Playback time to seek to
    pub seek_secs: f64,
}

/// Map a playback time to its beat and segment
///
/// Called on every playback tick, so this stays a pure lookup.
pub fn position_to_beat_and_segment(
    grid: &BeatGrid,
    segments: &SegmentIndex,
    time_secs: f64,
) -> PlayheadPosition {
    let beat_index = grid.beat_index_at(time_secs);
    let segment_index = segments
        .segment_containing_beat(beat_index)
        .map(|segment| segment.index);

    PlayheadPosition {
        beat_index,
        segment_index,
    }
}

/// Resolve a click on the timeline to a beat-aligned seek target
pub fn click_at_pixel(grid: &BeatGrid, segments: &SegmentIndex, pixel: f64) -> TimelineClick {
    let beat_index = grid.beat_of(pixel);
    let seek_secs = grid.beats()[beat_index];

    TimelineClick {
        snapped_pixel: grid.time_to_pixel(seek_secs),
        beat_index,
        segment_index: segments
            .segment_containing_beat(beat_index)
            .map(|segment| segment.index),
        seek_secs,
    }
}

/// Playback time of a segment's first beat
pub fn segment_start_secs(
    grid: &BeatGrid,
    segments: &SegmentIndex,
    segment_index: usize,
) -> Option<f64> {
    let segment = segments.get(segment_index)?;
    grid.time_of(segment.start_beat).ok()
}

/// Format seconds as `h:mm:ss` for the transport label
pub fn format_seconds(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{}:{:02}:{:02}", hours, minutes, secs)
}

/// Currently selected segment in the editor, wrapping at both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentCursor {
    index: usize,
    count: usize,
}

impl SegmentCursor {
    pub fn new(count: usize) -> Self {
        SegmentCursor { index: 0, count }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn go_to_start(&mut self) -> usize {
        self.index = 0;
        self.index
    }

    pub fn next(&mut self) -> usize {
        if self.count > 0 {
            self.index = (self.index + 1) % self.count;
        }
        self.index
    }

    pub fn previous(&mut self) -> usize {
        if self.count > 0 {
            self.index = (self.index + self.count - 1) % self.count;
        }
        self.index
    }

    /// Jump to a segment, ignoring indices past the end
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.count {
            self.index = index;
            true
        } else {
            false
        }
    }

    /// Follow the playhead into whichever segment it reports
    pub fn follow(&mut self, position: &PlayheadPosition) -> usize {
        if let Some(index) = position.segment_index {
            self.select(index);
        }
        self.index
    }
}

/// Seek target for the cursor's segment
pub fn cursor_seek_secs(
    grid: &BeatGrid,
    segments: &SegmentIndex,
    cursor: &SegmentCursor,
) -> Result<f64, GridError> {
    match segments.get(cursor.index()) {
        Some(segment) => grid.time_of(segment.start_beat),
        None => Ok(0.0),
    }
}
