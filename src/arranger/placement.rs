// Segment Placement - Gesture blocks dropped into one segment
// Keeps drop order and never lets the blocks outgrow the segment's beats

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::gestures::{beat_length_of, validate_instructions, GestureBlock, GestureError, InstructionRow};
use crate::groove::Segment;

/// Slack allowed when summed fractional beat lengths meet the capacity exactly
const CAPACITY_TOLERANCE: f64 = 1e-9;

/// Rejection for a block that does not fit
///
/// Carries the remaining room so the caller can tell the user how much is left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Error)]
#[error("Gesture is too long for this segment ({required_beats} beats needed, {remaining_beats} beats left)")]
pub struct CapacityExceeded {
    /// Beats still free in the segment
    pub remaining_beats: f64,

    /// Beats the rejected block needed
    pub required_beats: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlacementError {
    #[error("No gesture with id {0} in this segment")]
    NotFound(Uuid),

    #[error(transparent)]
    Capacity(#[from] CapacityExceeded),

    #[error(transparent)]
    Invalid(#[from] GestureError),
}

/// Outcome of duplicating a placed block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateReport {
    /// Copies asked for
    pub requested: usize,

    /// Ids of the copies that fit, in placement order
    pub added: Vec<Uuid>,

    /// Why duplication stopped early, if it did
    pub rejected: Option<CapacityExceeded>,
}

impl DuplicateReport {
    pub fn added_count(&self) -> usize {
        self.added.len()
    }
}

/// Horizontal extent of a block inside the segment view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockLayout {
    pub id: Uuid,
    pub x_pixels: u32,
    pub width_pixels: u32,
}

/// Blocks placed in one segment, in drop order
#[derive(Debug, Clone, Serialize)]
pub struct SegmentPlacement {
    /// Segment this placement belongs to
    segment_index: usize,

    /// First beat of the segment on the global grid
    start_beat: usize,

    /// Beat length of the segment
    capacity_beats: f64,

    /// Placed blocks in drop order
    placed: Vec<GestureBlock>,
}

impl SegmentPlacement {
    /// Empty placement for a segment
    pub fn new(segment: &Segment) -> Self {
        SegmentPlacement {
            segment_index: segment.index,
            start_beat: segment.start_beat,
            capacity_beats: segment.beat_length() as f64,
            placed: Vec::new(),
        }
    }

    pub fn segment_index(&self) -> usize {
        self.segment_index
    }

    pub fn start_beat(&self) -> usize {
        self.start_beat
    }

    pub fn capacity_beats(&self) -> f64 {
        self.capacity_beats
    }

    /// Beats taken by all placed blocks
    pub fn occupied_beats(&self) -> f64 {
        self.placed.iter().map(GestureBlock::beat_length).sum()
    }

    pub fn remaining_beats(&self) -> f64 {
        (self.capacity_beats - self.occupied_beats()).max(0.0)
    }

    pub fn blocks(&self) -> &[GestureBlock] {
        &self.placed
    }

    pub fn len(&self) -> usize {
        self.placed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&GestureBlock> {
        self.placed.iter().find(|block| block.id() == id)
    }

    fn position(&self, id: Uuid) -> Option<usize> {
        self.placed.iter().position(|block| block.id() == id)
    }

    fn check_fits(&self, occupied: f64, required_beats: f64) -> Result<(), CapacityExceeded> {
        if occupied + required_beats <= self.capacity_beats + CAPACITY_TOLERANCE {
            Ok(())
        } else {
            Err(CapacityExceeded {
                remaining_beats: (self.capacity_beats - occupied).max(0.0),
                required_beats,
            })
        }
    }

    /// Append a block if it fits in the remaining beats
    pub fn try_add(&mut self, block: GestureBlock) -> Result<Uuid, CapacityExceeded> {
        self.check_fits(self.occupied_beats(), block.beat_length())?;

        let id = block.id();
        log::debug!(
            "Placed '{}' ({} beats) in segment {}",
            block.name(),
            block.beat_length(),
            self.segment_index
        );
        self.placed.push(block);
        Ok(id)
    }

    /// Remove a block by id; `None` when no such block is placed here
    pub fn remove(&mut self, id: Uuid) -> Option<GestureBlock> {
        let index = self.position(id)?;
        Some(self.placed.remove(index))
    }

    /// Append up to `count` copies of a placed block
    ///
    /// Stops at the first copy that does not fit; that copy is discarded.
    pub fn duplicate(&mut self, id: Uuid, count: usize) -> Result<DuplicateReport, PlacementError> {
        let source = self.get(id).cloned().ok_or(PlacementError::NotFound(id))?;

        let mut report = DuplicateReport {
            requested: count,
            added: Vec::new(),
            rejected: None,
        };

        for _ in 0..count {
            match self.try_add(source.copy_with_new_id()) {
                Ok(copy_id) => report.added.push(copy_id),
                Err(rejection) => {
                    report.rejected = Some(rejection);
                    break;
                }
            }
        }

        Ok(report)
    }

    /// Remove every block, returning how many were placed
    pub fn clear(&mut self) -> usize {
        let removed = self.placed.len();
        self.placed.clear();
        removed
    }

    /// Edit a placed block's rows in place
    ///
    /// The new rows must still fit alongside the other blocks.
    pub fn replace_instructions(
        &mut self,
        id: Uuid,
        instructions: Vec<InstructionRow>,
    ) -> Result<(), PlacementError> {
        let index = self.position(id).ok_or(PlacementError::NotFound(id))?;
        validate_instructions(&instructions)?;

        let others: f64 = self
            .placed
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, block)| block.beat_length())
            .sum();
        self.check_fits(others, beat_length_of(&instructions))?;

        self.placed[index].set_instructions(instructions)?;
        Ok(())
    }

    /// Blocks with their beat offset from the segment start
    pub fn offsets(&self) -> impl Iterator<Item = (f64, &GestureBlock)> + '_ {
        self.placed.iter().scan(0.0, |offset, block| {
            let start = *offset;
            *offset += block.beat_length();
            Some((start, block))
        })
    }

    /// Lay blocks out left to right in a view of the given width
    ///
    /// Each block gets a width proportional to its share of the segment's beats.
    pub fn block_layout(&self, view_width: u32) -> Vec<BlockLayout> {
        let mut x = 0u32;
        self.placed
            .iter()
            .map(|block| {
                let width = if self.capacity_beats > 0.0 {
                    (block.beat_length() * view_width as f64 / self.capacity_beats) as u32
                } else {
                    0
                };
                let layout = BlockLayout {
                    id: block.id(),
                    x_pixels: x,
                    width_pixels: width,
                };
                x += width;
                layout
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start_beat: usize, end_beat: usize) -> Segment {
        Segment {
            index: 0,
            start_beat,
            end_beat,
            start_pixel: 0,
            width_pixels: 100,
        }
    }

    fn block(name: &str, beats: f64) -> GestureBlock {
        GestureBlock::new(name, vec![InstructionRow::new(1, 0.0, 30.0, beats)]).unwrap()
    }

    fn assert_invariants(placement: &SegmentPlacement) {
        let sum: f64 = placement.blocks().iter().map(|b| b.beat_length()).sum();
        assert_eq!(placement.occupied_beats(), sum);
        assert!(placement.occupied_beats() <= placement.capacity_beats() + CAPACITY_TOLERANCE);
    }

    #[test]
    fn test_capacity_from_segment() {
        let placement = SegmentPlacement::new(&segment(4, 10));

        assert_eq!(placement.capacity_beats(), 6.0);
        assert_eq!(placement.start_beat(), 4);
        assert!(placement.is_empty());
    }

    #[test]
    fn test_block_too_long_is_rejected() {
        let mut placement = SegmentPlacement::new(&segment(0, 4));

        let result = placement.try_add(block("lunge", 5.0));

        assert_eq!(
            result,
            Err(CapacityExceeded {
                remaining_beats: 4.0,
                required_beats: 5.0
            })
        );
        assert!(placement.is_empty());
    }

    #[test]
    fn test_exact_fit_is_accepted() {
        let mut placement = SegmentPlacement::new(&segment(0, 4));

        placement.try_add(block("a", 1.5)).unwrap();
        placement.try_add(block("b", 2.5)).unwrap();

        assert_eq!(placement.remaining_beats(), 0.0);
        assert_invariants(&placement);
    }

    #[test]
    fn test_rejection_is_repeatable() {
        let mut placement = SegmentPlacement::new(&segment(0, 4));
        placement.try_add(block("a", 3.0)).unwrap();

        let too_big = block("b", 2.0);
        let first = placement.try_add(too_big.clone());
        let second = placement.try_add(too_big);

        assert!(first.is_err());
        assert_eq!(first, second);
        assert_eq!(placement.len(), 1);
    }

    #[test]
    fn test_remove_by_id() {
        let mut placement = SegmentPlacement::new(&segment(0, 8));
        let a = block("same", 2.0);
        let b = a.copy_with_new_id();
        let a_id = placement.try_add(a).unwrap();
        let b_id = placement.try_add(b).unwrap();

        let removed = placement.remove(a_id).unwrap();

        assert_eq!(removed.id(), a_id);
        assert_eq!(placement.len(), 1);
        assert_eq!(placement.blocks()[0].id(), b_id);
        assert_eq!(placement.occupied_beats(), 2.0);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut placement = SegmentPlacement::new(&segment(0, 8));
        placement.try_add(block("a", 2.0)).unwrap();

        assert!(placement.remove(Uuid::new_v4()).is_none());
        assert_eq!(placement.len(), 1);
    }

    #[test]
    fn test_duplicate_stops_when_full() {
        let mut placement = SegmentPlacement::new(&segment(0, 7));
        let id = placement.try_add(block("step", 2.0)).unwrap();

        let report = placement.duplicate(id, 3).unwrap();

        assert_eq!(report.requested, 3);
        assert_eq!(report.added_count(), 2);
        assert_eq!(
            report.rejected,
            Some(CapacityExceeded {
                remaining_beats: 1.0,
                required_beats: 2.0
            })
        );
        assert_eq!(placement.len(), 3);
        assert!(report.added.iter().all(|copy| *copy != id));
        assert!(placement
            .blocks()
            .iter()
            .all(|b| b.instructions() == placement.blocks()[0].instructions()));
        assert_invariants(&placement);
    }

    #[test]
    fn test_duplicate_huge_count_fills_what_fits() {
        let mut placement = SegmentPlacement::new(&segment(0, 7));
        let id = placement.try_add(block("step", 2.0)).unwrap();

        let report = placement.duplicate(id, usize::MAX).unwrap();

        assert_eq!(report.requested, usize::MAX);
        assert_eq!(report.added_count(), 2);
        assert!(report.rejected.is_some());
        assert_eq!(placement.len(), 3);
        assert_invariants(&placement);
    }

    #[test]
    fn test_fractional_blocks_fill_segment_exactly() {
        let mut placement = SegmentPlacement::new(&segment(0, 1));

        placement.try_add(block("a", 0.1)).unwrap();
        placement.try_add(block("b", 0.2)).unwrap();
        placement.try_add(block("c", 0.7)).unwrap();

        assert_eq!(placement.len(), 3);
        assert_eq!(placement.remaining_beats(), 0.0);
        assert!(placement.try_add(block("d", 0.1)).is_err());
        assert_invariants(&placement);
    }

    #[test]
    fn test_duplicate_unknown_block() {
        let mut placement = SegmentPlacement::new(&segment(0, 7));
        let missing = Uuid::new_v4();

        assert_eq!(
            placement.duplicate(missing, 2),
            Err(PlacementError::NotFound(missing))
        );
    }

    #[test]
    fn test_clear() {
        let mut placement = SegmentPlacement::new(&segment(0, 8));
        placement.try_add(block("a", 2.0)).unwrap();
        placement.try_add(block("b", 3.0)).unwrap();

        assert_eq!(placement.clear(), 2);
        assert_eq!(placement.occupied_beats(), 0.0);
    }

    #[test]
    fn test_replace_instructions_respects_capacity() {
        let mut placement = SegmentPlacement::new(&segment(0, 6));
        let a = placement.try_add(block("a", 2.0)).unwrap();
        placement.try_add(block("b", 3.0)).unwrap();

        let grow_too_much = vec![InstructionRow::new(1, 0.0, 0.0, 4.0)];
        assert_eq!(
            placement.replace_instructions(a, grow_too_much),
            Err(PlacementError::Capacity(CapacityExceeded {
                remaining_beats: 3.0,
                required_beats: 4.0
            }))
        );
        assert_eq!(placement.get(a).unwrap().beat_length(), 2.0);

        let grow_to_fit = vec![InstructionRow::new(1, 1.0, 0.0, 2.0)];
        placement.replace_instructions(a, grow_to_fit).unwrap();
        assert_eq!(placement.occupied_beats(), 6.0);
        assert_invariants(&placement);
    }

    #[test]
    fn test_replace_instructions_rejects_invalid_rows() {
        let mut placement = SegmentPlacement::new(&segment(0, 6));
        let a = placement.try_add(block("a", 2.0)).unwrap();

        assert!(matches!(
            placement.replace_instructions(a, vec![]),
            Err(PlacementError::Invalid(GestureError::EmptyInstructions))
        ));
    }

    #[test]
    fn test_mixed_operations_keep_invariants() {
        let mut placement = SegmentPlacement::new(&segment(0, 10));
        let lengths = [3.0, 0.5, 4.0, 2.5, 1.0, 6.0, 0.25];
        let mut ids = Vec::new();

        for (i, beats) in lengths.iter().enumerate() {
            if let Ok(id) = placement.try_add(block("g", *beats)) {
                ids.push(id);
            }
            assert_invariants(&placement);

            if i % 3 == 2 {
                let id = ids.remove(0);
                assert!(placement.remove(id).is_some());
                assert_invariants(&placement);
            }
        }
    }

    #[test]
    fn test_offsets_accumulate_in_drop_order() {
        let mut placement = SegmentPlacement::new(&segment(4, 10));
        placement.try_add(block("a", 2.0)).unwrap();
        placement.try_add(block("b", 3.0)).unwrap();

        let offsets: Vec<f64> = placement.offsets().map(|(offset, _)| offset).collect();
        assert_eq!(offsets, vec![0.0, 2.0]);
    }

    #[test]
    fn test_block_layout() {
        let mut placement = SegmentPlacement::new(&segment(0, 8));
        let a = placement.try_add(block("a", 2.0)).unwrap();
        let b = placement.try_add(block("b", 3.0)).unwrap();

        let layout = placement.block_layout(400);

        assert_eq!(
            layout,
            vec![
                BlockLayout { id: a, x_pixels: 0, width_pixels: 100 },
                BlockLayout { id: b, x_pixels: 100, width_pixels: 150 },
            ]
        );
    }
}
