// Editor commands
// The session facade the view layer and the CLI drive; every error surfaces as a CommandError
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::AnalysisData;
use crate::arranger::{self, BlockLayout, Cue, DuplicateReport, Sequence};
use crate::audio::{self, TrackInfo};
use crate::gestures::{GestureBlock, InstructionRow, InstructionTable};
use crate::groove::{
    self, BeatGrid, PlayheadPosition, SegmentCursor, SegmentIndex, TimelineClick,
};
use crate::state::{GestureLibrary, LoadReport, SessionConfig};

#[derive(Debug, Serialize)]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl<E: std::fmt::Display> From<E> for CommandError {
    fn from(error: E) -> Self {
        CommandError {
            message: error.to_string(),
        }
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

fn no_segment(segment_index: usize) -> CommandError {
    CommandError {
        message: format!("No segment {}", segment_index),
    }
}

// ==================== VIEW MODELS ====================

/// One segment as the timeline and segment view show it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSummary {
    pub index: usize,
    pub start_beat: usize,
    pub end_beat: usize,
    pub start_secs: f64,
    pub start_pixel: u32,
    pub width_pixels: u32,
    pub capacity_beats: f64,
    pub occupied_beats: f64,
    pub remaining_beats: f64,
    pub block_count: usize,
}

/// A gesture as the library palette shows it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GestureSummary {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub beat_length: f64,
    pub row_count: usize,
    pub display_width_pixels: f64,
}

/// A placed block inside the segment view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedBlockView {
    pub gesture: GestureSummary,
    pub offset_beats: f64,
    pub layout: BlockLayout,
}

/// Track-level facts for the transport bar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub tempo_bpm: u32,
    pub beat_count: usize,
    pub duration_secs: f64,
    pub duration_label: String,
    pub render_width: u32,
    pub segments: Vec<SegmentSummary>,
    pub library: Vec<String>,
}

// ==================== COMPOSITION PLANS ====================

/// Library gesture names to drop into each segment, in order
///
/// Serialized as `[["wave", "nod"], [], ["spin"]]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositionPlan {
    pub segments: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanRejection {
    pub segment_index: usize,
    pub gesture: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanReport {
    pub placed: usize,
    pub rejected: Vec<PlanRejection>,
}

// ==================== SESSION ====================

/// Everything loaded for one track plus the edits made to it
#[derive(Debug)]
pub struct EditorSession {
    config: SessionConfig,
    analysis: AnalysisData,
    track: TrackInfo,
    grid: BeatGrid,
    segments: SegmentIndex,
    sequence: Sequence,
    library: GestureLibrary,
    cursor: SegmentCursor,
}

impl EditorSession {
    /// Load the analysis, track and gesture library named by the config
    pub fn open(config: SessionConfig) -> CommandResult<(Self, LoadReport)> {
        config.validate()?;

        let analysis_path = config.analysis_path()?.to_path_buf();
        let analysis = AnalysisData::load(&analysis_path)?;

        let audio_path = config.resolved_audio_path()?;
        let track = audio::ingest_wav(&audio_path).map_err(|e| CommandError {
            message: format!("Failed to read track {}: {}", audio_path.display(), e),
        })?;

        let (library, report) = GestureLibrary::open(config.library_dir.clone())?;
        let session = Self::assemble(config, analysis, track, library)?;

        log::info!(
            "Opened session for {}: {} segments, {} gestures",
            analysis_path.display(),
            session.segments.len(),
            session.library.len()
        );

        Ok((session, report))
    }

    /// Build a session from already loaded parts
    pub fn assemble(
        config: SessionConfig,
        analysis: AnalysisData,
        track: TrackInfo,
        library: GestureLibrary,
    ) -> CommandResult<Self> {
        analysis.check_duration(track.duration_secs)?;

        let grid = BeatGrid::new(&analysis, &track, config.render_width)?;
        let segments = SegmentIndex::build(&analysis, &grid)?;
        let sequence = Sequence::new(&segments);
        let cursor = SegmentCursor::new(segments.len());

        Ok(EditorSession {
            config,
            analysis,
            track,
            grid,
            segments,
            sequence,
            library,
            cursor,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn grid(&self) -> &BeatGrid {
        &self.grid
    }

    pub fn segments(&self) -> &SegmentIndex {
        &self.segments
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn library(&self) -> &GestureLibrary {
        &self.library
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            tempo_bpm: self.analysis.tempo_bpm(),
            beat_count: self.grid.beat_count(),
            duration_secs: self.track.duration_secs,
            duration_label: groove::format_seconds(self.track.duration_secs),
            render_width: self.grid.render_width(),
            segments: self.segment_summaries(),
            library: self.library.names().map(str::to_string).collect(),
        }
    }

    pub fn segment_summaries(&self) -> Vec<SegmentSummary> {
        self.segments
            .segments()
            .iter()
            .zip(self.sequence.placements())
            .map(|(segment, placement)| SegmentSummary {
                index: segment.index,
                start_beat: segment.start_beat,
                end_beat: segment.end_beat,
                start_secs: groove::segment_start_secs(&self.grid, &self.segments, segment.index)
                    .unwrap_or(0.0),
                start_pixel: segment.start_pixel,
                width_pixels: segment.width_pixels,
                capacity_beats: placement.capacity_beats(),
                occupied_beats: placement.occupied_beats(),
                remaining_beats: placement.remaining_beats(),
                block_count: placement.len(),
            })
            .collect()
    }

    fn gesture_summary(&self, block: &GestureBlock) -> GestureSummary {
        GestureSummary {
            id: block.id(),
            name: block.name().to_string(),
            color: block.color().to_hex(),
            beat_length: block.beat_length(),
            row_count: block.instructions().len(),
            display_width_pixels: block.display_width_pixels(
                self.analysis.tempo_bpm(),
                self.track.duration_secs,
                self.grid.render_width(),
            ),
        }
    }

    pub fn library_gestures(&self) -> Vec<GestureSummary> {
        self.library
            .gestures()
            .map(|block| self.gesture_summary(block))
            .collect()
    }

    /// Blocks of one segment laid out in a view of the given width
    pub fn segment_blocks(
        &self,
        segment_index: usize,
        view_width: u32,
    ) -> CommandResult<Vec<PlacedBlockView>> {
        let placement = self
            .sequence
            .placement(segment_index)
            .ok_or_else(|| no_segment(segment_index))?;

        Ok(placement
            .offsets()
            .zip(placement.block_layout(view_width))
            .map(|((offset_beats, block), layout)| PlacedBlockView {
                gesture: self.gesture_summary(block),
                offset_beats,
                layout,
            })
            .collect())
    }

    // ==================== PLACEMENT ====================

    /// Drop a fresh copy of a library gesture at the end of a segment
    pub fn drop_gesture(&mut self, segment_index: usize, name: &str) -> CommandResult<Uuid> {
        let block = self.library.instantiate(name)?;
        let placement = self
            .sequence
            .placement_mut(segment_index)
            .ok_or_else(|| no_segment(segment_index))?;

        Ok(placement.try_add(block)?)
    }

    /// Remove a placed block; `false` when it was not in the segment
    pub fn remove_block(&mut self, segment_index: usize, id: Uuid) -> CommandResult<bool> {
        let placement = self
            .sequence
            .placement_mut(segment_index)
            .ok_or_else(|| no_segment(segment_index))?;

        Ok(placement.remove(id).is_some())
    }

    pub fn duplicate_block(
        &mut self,
        segment_index: usize,
        id: Uuid,
        count: usize,
    ) -> CommandResult<DuplicateReport> {
        let placement = self
            .sequence
            .placement_mut(segment_index)
            .ok_or_else(|| no_segment(segment_index))?;

        let report = placement.duplicate(id, count)?;
        if let Some(rejection) = &report.rejected {
            log::info!(
                "Duplicated {} of {} copies in segment {}: {}",
                report.added_count(),
                count,
                segment_index,
                rejection
            );
        }
        Ok(report)
    }

    pub fn clear_segment(&mut self, segment_index: usize) -> CommandResult<usize> {
        self.sequence
            .clear_segment(segment_index)
            .ok_or_else(|| no_segment(segment_index))
    }

    pub fn clear_all(&mut self) -> usize {
        self.sequence.clear_all()
    }

    /// Drop every gesture a plan names, segment by segment
    ///
    /// Rejected drops are collected and the rest of the plan still applies.
    pub fn apply_plan(&mut self, plan: &CompositionPlan) -> CommandResult<PlanReport> {
        if plan.segments.len() > self.segments.len() {
            return Err(CommandError {
                message: format!(
                    "Plan covers {} segments but the track has {}",
                    plan.segments.len(),
                    self.segments.len()
                ),
            });
        }

        let mut report = PlanReport::default();
        for (segment_index, names) in plan.segments.iter().enumerate() {
            for name in names {
                match self.drop_gesture(segment_index, name) {
                    Ok(_) => report.placed += 1,
                    Err(error) => {
                        log::warn!(
                            "Plan: could not place '{}' in segment {}: {}",
                            name,
                            segment_index,
                            error.message
                        );
                        report.rejected.push(PlanRejection {
                            segment_index,
                            gesture: name.clone(),
                            reason: error.message,
                        });
                    }
                }
            }
        }

        Ok(report)
    }

    // ==================== GESTURE EDITING ====================

    /// Table editor over a library gesture
    pub fn library_table(&self, name: &str) -> CommandResult<InstructionTable> {
        let block = self.library.get(name).ok_or_else(|| CommandError {
            message: format!("No gesture named '{}'", name),
        })?;
        Ok(InstructionTable::new(block.instructions().to_vec()))
    }

    /// Commit a table edit back to the library file
    pub fn save_library_table(
        &mut self,
        name: &str,
        table: InstructionTable,
    ) -> CommandResult<GestureSummary> {
        let rows = table.into_rows()?;
        let saved = self.library.save(name, rows)?.clone();
        Ok(self.gesture_summary(&saved))
    }

    /// Table editor over a block already placed in a segment
    pub fn placed_table(&self, segment_index: usize, id: Uuid) -> CommandResult<InstructionTable> {
        let placement = self
            .sequence
            .placement(segment_index)
            .ok_or_else(|| no_segment(segment_index))?;
        let block = placement.get(id).ok_or_else(|| CommandError {
            message: format!("No gesture with id {} in segment {}", id, segment_index),
        })?;
        Ok(InstructionTable::new(block.instructions().to_vec()))
    }

    /// Commit a table edit to one placed block, leaving the library untouched
    pub fn save_placed_table(
        &mut self,
        segment_index: usize,
        id: Uuid,
        table: InstructionTable,
    ) -> CommandResult<()> {
        let rows = table.into_rows()?;
        let placement = self
            .sequence
            .placement_mut(segment_index)
            .ok_or_else(|| no_segment(segment_index))?;
        placement.replace_instructions(id, rows)?;
        Ok(())
    }

    pub fn create_gesture(&mut self, name: &str) -> CommandResult<GestureSummary> {
        let created = self.library.create(name)?.clone();
        Ok(self.gesture_summary(&created))
    }

    /// Delete a library gesture; copies already placed stay where they are
    pub fn delete_gesture(&mut self, name: &str) -> CommandResult<()> {
        self.library.delete(name)?;
        Ok(())
    }

    pub fn reload_library(&mut self) -> CommandResult<LoadReport> {
        Ok(self.library.reload()?)
    }

    // ==================== TIMELINE ====================

    /// Re-lay the timeline for a new width; placements are unaffected
    pub fn resize(&mut self, render_width: u32) -> CommandResult<()> {
        self.grid.set_render_width(render_width)?;
        self.segments.relayout(&self.grid);
        self.config.render_width = render_width;
        Ok(())
    }

    /// Playback callback: map the position and move the cursor along with it
    pub fn playback_tick(&mut self, time_secs: f64) -> PlayheadPosition {
        let position = groove::position_to_beat_and_segment(&self.grid, &self.segments, time_secs);
        self.cursor.follow(&position);
        position
    }

    /// Click on the full-track timeline
    pub fn click(&mut self, pixel: f64) -> TimelineClick {
        let click = groove::click_at_pixel(&self.grid, &self.segments, pixel);
        if let Some(index) = click.segment_index {
            self.cursor.select(index);
        }
        click
    }

    pub fn selected_segment(&self) -> usize {
        self.cursor.index()
    }

    pub fn select_segment(&mut self, segment_index: usize) -> CommandResult<()> {
        if self.cursor.select(segment_index) {
            Ok(())
        } else {
            Err(no_segment(segment_index))
        }
    }

    pub fn next_segment(&mut self) -> usize {
        self.cursor.next()
    }

    pub fn previous_segment(&mut self) -> usize {
        self.cursor.previous()
    }

    pub fn go_to_start(&mut self) -> usize {
        self.cursor.go_to_start()
    }

    /// Playback time of the selected segment's first beat
    pub fn seek_target(&self) -> CommandResult<f64> {
        Ok(groove::cursor_seek_secs(&self.grid, &self.segments, &self.cursor)?)
    }

    // ==================== EXPORT ====================

    pub fn cue_list(&self) -> Vec<Cue> {
        self.sequence.cue_list()
    }

    pub fn flatten(&self) -> CommandResult<Vec<InstructionRow>> {
        Ok(arranger::flatten(self.sequence.placements(), &self.segments)?)
    }

    /// Write the flattened sequence to `<export_dir>/<name>.csv`
    pub fn export(&self, name: &str) -> CommandResult<PathBuf> {
        let rows = self.flatten()?;
        Ok(arranger::export_sequence(&self.config.export_dir, name, &rows)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const SAMPLE_RATE: u32 = 1000;

    fn write_wav(path: &Path, seconds: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..seconds * SAMPLE_RATE {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    /// Ten beats one second apart, segments [0,4) and [4,10)
    fn session(temp: &TempDir) -> EditorSession {
        let analysis = temp.path().join("song.json");
        fs::write(
            &analysis,
            r#"{
                "tempo": 60.0,
                "beats": [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
                "segmentation": [[0.0, 0.1], [4.1, 0.5], [9.0, 0.2]]
            }"#,
        )
        .unwrap();
        write_wav(&temp.path().join("song.wav"), 10);

        let library_dir = temp.path().join("gestures");
        fs::create_dir_all(&library_dir).unwrap();
        fs::write(library_dir.join("nod.csv"), "1,0,10,2\n").unwrap();
        fs::write(library_dir.join("sway.csv"), "2,0,20,1\n2,1,-20,2\n").unwrap();
        fs::write(library_dir.join("long.csv"), "3,0,0,5\n").unwrap();

        let config = SessionConfig {
            analysis_path: Some(analysis),
            audio_path: None,
            library_dir,
            export_dir: temp.path().join("exports"),
            render_width: 1000,
        };

        let (session, report) = EditorSession::open(config).unwrap();
        assert_eq!(report.loaded, 3);
        session
    }

    #[test]
    fn test_open_builds_timeline() {
        let temp = TempDir::new().unwrap();
        let session = session(&temp);
        let summary = session.summary();

        assert_eq!(summary.tempo_bpm, 60);
        assert_eq!(summary.beat_count, 10);
        assert_eq!(summary.duration_label, "0:00:10");
        assert_eq!(summary.library, vec!["long", "nod", "sway"]);

        let segments = &summary.segments;
        assert_eq!(segments.len(), 2);
        assert_eq!((segments[0].start_beat, segments[0].end_beat), (0, 4));
        assert_eq!((segments[1].start_beat, segments[1].end_beat), (4, 10));
        assert_eq!(segments[1].start_secs, 4.0);
        assert_eq!(
            segments.iter().map(|s| s.width_pixels).sum::<u32>(),
            1000
        );
    }

    #[test]
    fn test_open_missing_track_reports_path() {
        let temp = TempDir::new().unwrap();
        let analysis = temp.path().join("song.json");
        fs::write(&analysis, r#"{"tempo": 60, "beats": [0, 1], "segmentation": [[0, 0]]}"#).unwrap();

        let config = SessionConfig {
            analysis_path: Some(analysis),
            library_dir: temp.path().join("gestures"),
            ..SessionConfig::default()
        };

        let error = EditorSession::open(config).unwrap_err();
        assert!(error.message().contains("song.wav"));
    }

    #[test]
    fn test_drop_and_capacity_rejection() {
        let temp = TempDir::new().unwrap();
        let mut session = session(&temp);

        let error = session.drop_gesture(0, "long").unwrap_err();
        assert!(error.message().contains("4 beats left"));

        session.drop_gesture(0, "nod").unwrap();
        session.drop_gesture(0, "nod").unwrap();
        assert!(session.drop_gesture(0, "nod").is_err());

        let summary = &session.segment_summaries()[0];
        assert_eq!(summary.occupied_beats, 4.0);
        assert_eq!(summary.remaining_beats, 0.0);
        assert_eq!(summary.block_count, 2);

        assert!(session.drop_gesture(5, "nod").is_err());
        assert!(session.drop_gesture(1, "missing").is_err());
    }

    #[test]
    fn test_remove_and_duplicate() {
        let temp = TempDir::new().unwrap();
        let mut session = session(&temp);
        let id = session.drop_gesture(1, "nod").unwrap();

        let report = session.duplicate_block(1, id, 3).unwrap();
        assert_eq!(report.added_count(), 2);
        assert!(report.rejected.is_some());

        assert!(session.remove_block(1, id).unwrap());
        assert!(!session.remove_block(1, id).unwrap());
        assert!(session.duplicate_block(1, id, 1).is_err());
        assert_eq!(session.sequence().block_count(), 2);
    }

    #[test]
    fn test_plan_and_export() {
        let temp = TempDir::new().unwrap();
        let mut session = session(&temp);
        let plan: CompositionPlan =
            serde_json::from_str(r#"[["long"], ["nod", "sway"]]"#).unwrap();

        let report = session.apply_plan(&plan).unwrap();
        assert_eq!(report.placed, 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].gesture, "long");

        let cues: Vec<f64> = session.cue_list().iter().map(|c| c.start_beat).collect();
        assert_eq!(cues, vec![4.0, 6.0]);

        let path = session.export("show").unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text, "1,4,10,2\n2,6,20,1\n2,7,-20,2\n");
    }

    #[test]
    fn test_plan_longer_than_track_is_rejected() {
        let temp = TempDir::new().unwrap();
        let mut session = session(&temp);
        let plan = CompositionPlan {
            segments: vec![vec![], vec![], vec!["nod".to_string()]],
        };

        assert!(session.apply_plan(&plan).is_err());
        assert_eq!(session.sequence().block_count(), 0);
    }

    #[test]
    fn test_edit_placed_block_leaves_library_alone() {
        let temp = TempDir::new().unwrap();
        let mut session = session(&temp);
        let id = session.drop_gesture(0, "nod").unwrap();

        let mut table = session.placed_table(0, id).unwrap();
        table.set_cell(0, 3, "3").unwrap();
        session.save_placed_table(0, id, table).unwrap();

        assert_eq!(session.segment_summaries()[0].occupied_beats, 3.0);
        assert_eq!(session.library().get("nod").unwrap().beat_length(), 2.0);

        let mut too_long = session.placed_table(0, id).unwrap();
        too_long.set_cell(0, 3, "6").unwrap();
        assert!(session.save_placed_table(0, id, too_long).is_err());
        assert_eq!(session.segment_summaries()[0].occupied_beats, 3.0);
    }

    #[test]
    fn test_library_edits_persist() {
        let temp = TempDir::new().unwrap();
        let mut session = session(&temp);

        let created = session.create_gesture("spin").unwrap();
        assert_eq!(created.beat_length, 1.0);

        let mut table = session.library_table("spin").unwrap();
        table.add_row();
        let saved = session.save_library_table("spin", table).unwrap();
        assert_eq!(saved.beat_length, 2.0);

        session.delete_gesture("long").unwrap();
        let report = session.reload_library().unwrap();
        assert_eq!(report.loaded, 3);
        assert!(session.library().get("long").is_none());
        assert_eq!(session.library().get("spin").unwrap().instructions().len(), 2);
    }

    #[test]
    fn test_playback_and_navigation() {
        let temp = TempDir::new().unwrap();
        let mut session = session(&temp);

        let position = session.playback_tick(5.2);
        assert_eq!(position.beat_index, 5);
        assert_eq!(position.segment_index, Some(1));
        assert_eq!(session.selected_segment(), 1);
        assert_eq!(session.seek_target().unwrap(), 4.0);

        assert_eq!(session.next_segment(), 0);
        assert_eq!(session.previous_segment(), 1);
        assert_eq!(session.go_to_start(), 0);
        assert!(session.select_segment(7).is_err());

        let click = session.click(420.0);
        assert_eq!(click.beat_index, 4);
        assert_eq!(click.segment_index, Some(1));
        assert_eq!(session.selected_segment(), 1);
    }

    #[test]
    fn test_resize_keeps_placements() {
        let temp = TempDir::new().unwrap();
        let mut session = session(&temp);
        session.drop_gesture(1, "sway").unwrap();

        session.resize(500).unwrap();

        let summaries = session.segment_summaries();
        assert_eq!(summaries.iter().map(|s| s.width_pixels).sum::<u32>(), 500);
        assert_eq!(summaries[1].block_count, 1);
        assert!(session.resize(0).is_err());
    }

    #[test]
    fn test_segment_blocks_layout() {
        let temp = TempDir::new().unwrap();
        let mut session = session(&temp);
        session.drop_gesture(1, "nod").unwrap();
        session.drop_gesture(1, "sway").unwrap();

        let blocks = session.segment_blocks(1, 600).unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].offset_beats, 2.0);
        assert_eq!(blocks[0].layout.width_pixels, 200);
        assert_eq!(blocks[1].layout.x_pixels, 200);
        assert_eq!(blocks[1].layout.width_pixels, 300);
        assert_eq!(blocks[1].gesture.name, "sway");
    }

    #[test]
    fn test_clear() {
        let temp = TempDir::new().unwrap();
        let mut session = session(&temp);
        session.drop_gesture(0, "nod").unwrap();
        session.drop_gesture(1, "nod").unwrap();
        session.drop_gesture(1, "sway").unwrap();

        assert_eq!(session.clear_segment(1).unwrap(), 2);
        assert!(session.clear_segment(9).is_err());
        assert_eq!(session.clear_all(), 1);
        assert!(session.flatten().unwrap().is_empty());
    }
}
