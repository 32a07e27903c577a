// Sequence Export - Flatten every segment into one global instruction stream
// Produces delimited text the robot controller plays back beat by beat

use std::path::{Path, PathBuf};
use thiserror::Error;

use super::placement::SegmentPlacement;
use crate::gestures::{rows_to_string, InstructionRow};
use crate::groove::SegmentIndex;
use crate::state::storage::{self, StorageError};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{placements} placements for {segments} segments")]
    SegmentMismatch { placements: usize, segments: usize },

    #[error("Placement {index} does not match the current segmentation")]
    StaleSegment { index: usize },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Translate every placed row to global beat coordinates
///
/// Rows come out segment by segment, then in drop order, then in row order.
/// A block's offset is the summed beat length of the blocks dropped before it.
pub fn flatten(
    placements: &[SegmentPlacement],
    segments: &SegmentIndex,
) -> Result<Vec<InstructionRow>, ExportError> {
    if placements.len() != segments.len() {
        return Err(ExportError::SegmentMismatch {
            placements: placements.len(),
            segments: segments.len(),
        });
    }

    let mut rows = Vec::new();
    for (placement, segment) in placements.iter().zip(segments.segments()) {
        if placement.segment_index() != segment.index
            || placement.start_beat() != segment.start_beat
        {
            return Err(ExportError::StaleSegment {
                index: placement.segment_index(),
            });
        }

        let segment_start = segment.start_beat as f64;
        for (offset, block) in placement.offsets() {
            rows.extend(
                block
                    .instructions()
                    .iter()
                    .map(|row| row.shifted(segment_start + offset)),
            );
        }
    }

    Ok(rows)
}

/// Serialize flattened rows, one per line, no header
pub fn export_bytes(rows: &[InstructionRow]) -> Vec<u8> {
    rows_to_string(rows).into_bytes()
}

/// Write flattened rows to `<dir>/<name>.csv`
pub fn export_sequence(dir: &Path, name: &str, rows: &[InstructionRow]) -> Result<PathBuf, ExportError> {
    let path = storage::store_named_file(dir, name, &export_bytes(rows))?;
    log::info!("Exported {} instruction rows to {}", rows.len(), path.display());
    Ok(path)
}
