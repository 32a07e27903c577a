// Sequence - Every segment placement for the loaded track
// Bulk edits and the cue list of gestures in playback order

use serde::Serialize;
use uuid::Uuid;

use super::placement::SegmentPlacement;
use crate::gestures::GestureBlock;
use crate::groove::SegmentIndex;

/// A placed gesture and the global beat it starts on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cue {
    pub name: String,
    pub block_id: Uuid,
    pub segment_index: usize,
    pub start_beat: f64,
}

/// Placements for all segments, indexed by segment order
#[derive(Debug, Clone, Serialize)]
pub struct Sequence {
    placements: Vec<SegmentPlacement>,
}

impl Sequence {
    /// One empty placement per segment
    pub fn new(segments: &SegmentIndex) -> Self {
        Sequence {
            placements: segments.segments().iter().map(SegmentPlacement::new).collect(),
        }
    }

    pub fn placements(&self) -> &[SegmentPlacement] {
        &self.placements
    }

    pub fn placement(&self, segment_index: usize) -> Option<&SegmentPlacement> {
        self.placements.get(segment_index)
    }

    pub fn placement_mut(&mut self, segment_index: usize) -> Option<&mut SegmentPlacement> {
        self.placements.get_mut(segment_index)
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Total number of placed blocks across all segments
    pub fn block_count(&self) -> usize {
        self.placements.iter().map(SegmentPlacement::len).sum()
    }

    /// Locate a placed block anywhere in the sequence
    pub fn find_block(&self, id: Uuid) -> Option<(usize, &GestureBlock)> {
        self.placements.iter().find_map(|placement| {
            placement
                .get(id)
                .map(|block| (placement.segment_index(), block))
        })
    }

    /// Empty one segment, returning how many blocks were removed
    pub fn clear_segment(&mut self, segment_index: usize) -> Option<usize> {
        self.placements
            .get_mut(segment_index)
            .map(SegmentPlacement::clear)
    }

    /// Empty every segment, returning how many blocks were removed
    pub fn clear_all(&mut self) -> usize {
        let removed = self.placements.iter_mut().map(SegmentPlacement::clear).sum();
        log::info!("Cleared {} gestures from the sequence", removed);
        removed
    }

    /// Every placed gesture with its global start beat, in playback order
    pub fn cue_list(&self) -> Vec<Cue> {
        self.placements
            .iter()
            .flat_map(|placement| {
                placement.offsets().map(move |(offset, block)| Cue {
                    name: block.name().to_string(),
                    block_id: block.id(),
                    segment_index: placement.segment_index(),
                    start_beat: placement.start_beat() as f64 + offset,
                })
            })
            .collect()
    }
}
