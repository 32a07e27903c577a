// Segment Index - Structural sections of the track on the beat grid
// Snaps segmentation markers to beats and lays the sections out in pixels

use serde::Serialize;
use thiserror::Error;

use super::grid::BeatGrid;
use crate::analysis::AnalysisData;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SegmentError {
    #[error("Analysis has no segmentation markers")]
    NoSegmentation,

    #[error(
        "Segmentation markers {index} and {next} both snap to beat {beat}, \
         producing an empty segment"
    )]
    DegenerateSegment { index: usize, next: usize, beat: usize },
}

/// A contiguous run of beats bounded by segmentation markers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    /// Position of this segment in the index
    pub index: usize,

    /// First beat of the segment
    pub start_beat: usize,

    /// Beat after the last one in the segment (exclusive)
    pub end_beat: usize,

    /// Left edge on the rendered timeline
    pub start_pixel: u32,

    /// Rendered width in pixels
    pub width_pixels: u32,
}

impl Segment {
    /// Length of the segment in beats
    pub fn beat_length(&self) -> usize {
        self.end_beat - self.start_beat
    }

    /// Check if a beat falls within this segment
    pub fn contains_beat(&self, beat: usize) -> bool {
        beat >= self.start_beat && beat < self.end_beat
    }
}

/// Ordered, contiguous partition of the beat grid
#[derive(Debug, Clone, Serialize)]
pub struct SegmentIndex {
    segments: Vec<Segment>,
}

impl SegmentIndex {
    /// Build segments by snapping every segmentation marker to its nearest beat
    ///
    /// Consecutive snapped beats bound a segment. The last marker closes the
    /// segment before it and the final segment runs through the last beat.
    pub fn build(analysis: &AnalysisData, grid: &BeatGrid) -> Result<Self, SegmentError> {
        let snapped: Vec<usize> = analysis
            .segment_timestamps()
            .iter()
            .map(|&time| grid.beat_index_at(time))
            .collect();

        if snapped.is_empty() {
            return Err(SegmentError::NoSegmentation);
        }

        for (k, pair) in snapped.windows(2).enumerate() {
            if pair[0] == pair[1] {
                return Err(SegmentError::DegenerateSegment {
                    index: k,
                    next: k + 1,
                    beat: pair[0],
                });
            }
        }

        let starts = if snapped.len() > 1 {
            &snapped[..snapped.len() - 1]
        } else {
            &snapped[..]
        };

        let segments = starts
            .iter()
            .enumerate()
            .map(|(k, &start_beat)| {
                let end_beat = starts.get(k + 1).copied().unwrap_or(grid.beat_count());
                Segment {
                    index: k,
                    start_beat,
                    end_beat,
                    start_pixel: 0,
                    width_pixels: 0,
                }
            })
            .collect();

        let mut index = SegmentIndex { segments };
        index.relayout(grid);

        log::debug!(
            "Built {} segments from {} markers",
            index.segments.len(),
            snapped.len()
        );

        Ok(index)
    }

    /// Recompute pixel extents for the grid's current render width
    ///
    /// The first segment starts at pixel 0 and the last one absorbs the
    /// rounding remainder, so widths always sum to the render width.
    pub fn relayout(&mut self, grid: &BeatGrid) {
        let render_width = grid.render_width();

        let starts: Vec<u32> = self
            .segments
            .iter()
            .enumerate()
            .map(|(k, segment)| {
                if k == 0 {
                    0
                } else {
                    let pixel = grid.time_to_pixel(grid.beats()[segment.start_beat]);
                    (pixel.max(0.0) as u32).min(render_width)
                }
            })
            .collect();

        for (k, segment) in self.segments.iter_mut().enumerate() {
            let end = starts.get(k + 1).copied().unwrap_or(render_width);
            segment.start_pixel = starts[k];
            segment.width_pixels = end.saturating_sub(starts[k]);
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    /// Segment containing a beat, or the nearest one starting before it
    ///
    /// A beat on a boundary belongs to the segment that starts there.
    /// Beats before the first segment have no segment.
    pub fn segment_containing_beat(&self, beat: usize) -> Option<&Segment> {
        let after = self.segments.partition_point(|s| s.start_beat <= beat);
        after.checked_sub(1).map(|i| &self.segments[i])
    }

    /// Segment under a pixel position on the rendered timeline
    ///
    /// The pixel snaps to its nearest beat first, so pixel and beat lookups
    /// always agree. Pixels in the lead-in before the first marker's beat have
    /// no segment even though the first segment is drawn from pixel 0.
    pub fn segment_containing_pixel(&self, grid: &BeatGrid, pixel: f64) -> Option<&Segment> {
        self.segment_containing_beat(grid.beat_of(pixel))
    }

    /// Sum of all segment widths
    pub fn total_width(&self) -> u32 {
        self.segments.iter().map(|s| s.width_pixels).sum()
    }
}
