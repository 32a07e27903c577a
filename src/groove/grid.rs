// Beat Grid - Time, beat, pixel and sample coordinates
// Quantizes any position on the timeline to the nearest detected beat

use thiserror::Error;

use crate::analysis::AnalysisData;
use crate::audio::TrackInfo;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("Analysis contains no beats, the timeline cannot be built")]
    EmptyGrid,

    #[error("Beat index {index} is out of range (grid has {len} beats)")]
    BeatOutOfRange { index: usize, len: usize },

    #[error("Render width must be at least one pixel")]
    ZeroWidth,
}

/// Beat grid for one track at one rendering width
#[derive(Debug, Clone)]
pub struct BeatGrid {
    /// Detected beat timestamps in seconds, strictly increasing
    beats: Vec<f64>,

    /// Track duration in seconds
    duration_secs: f64,

    /// Sample rate used for sample-index conversions
    sample_rate: u32,

    /// Width of the rendered timeline in pixels
    render_width: u32,
}

impl BeatGrid {
    /// Create a grid from analysis results and track timing
    pub fn new(
        analysis: &AnalysisData,
        track: &TrackInfo,
        render_width: u32,
    ) -> Result<Self, GridError> {
        Self::from_beats(
            analysis.beat_timestamps().to_vec(),
            track.duration_secs,
            track.sample_rate,
            render_width,
        )
    }

    /// Create a grid directly from beat timestamps
    pub fn from_beats(
        beats: Vec<f64>,
        duration_secs: f64,
        sample_rate: u32,
        render_width: u32,
    ) -> Result<Self, GridError> {
        if beats.is_empty() {
            return Err(GridError::EmptyGrid);
        }
        if render_width == 0 {
            return Err(GridError::ZeroWidth);
        }

        Ok(BeatGrid {
            beats,
            duration_secs,
            sample_rate,
            render_width,
        })
    }

    /// Update the rendering width after a resize
    pub fn set_render_width(&mut self, render_width: u32) -> Result<(), GridError> {
        if render_width == 0 {
            return Err(GridError::ZeroWidth);
        }
        self.render_width = render_width;
        Ok(())
    }

    pub fn render_width(&self) -> u32 {
        self.render_width
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn beat_count(&self) -> usize {
        self.beats.len()
    }

    pub fn last_beat(&self) -> usize {
        self.beats.len() - 1
    }

    pub fn beats(&self) -> &[f64] {
        &self.beats
    }

    /// Find the beat nearest to a timestamp
    ///
    /// Equidistant timestamps resolve to the earlier beat.
    pub fn beat_index_at(&self, time_secs: f64) -> usize {
        // First beat at or after the query
        let upper = self.beats.partition_point(|&beat| beat < time_secs);

        if upper == 0 {
            return 0;
        }
        if upper == self.beats.len() {
            return self.beats.len() - 1;
        }

        let below = time_secs - self.beats[upper - 1];
        let above = self.beats[upper] - time_secs;
        if below <= above {
            upper - 1
        } else {
            upper
        }
    }

    /// Timestamp of a beat in seconds
    pub fn time_of(&self, beat_index: usize) -> Result<f64, GridError> {
        self.beats
            .get(beat_index)
            .copied()
            .ok_or(GridError::BeatOutOfRange {
                index: beat_index,
                len: self.beats.len(),
            })
    }

    /// Horizontal pixel position of a beat
    pub fn pixel_of(&self, beat_index: usize) -> Result<f64, GridError> {
        let time = self.time_of(beat_index)?;
        Ok(self.time_to_pixel(time))
    }

    /// Nearest beat to a pixel position
    pub fn beat_of(&self, pixel: f64) -> usize {
        self.beat_index_at(self.pixel_to_time(pixel))
    }

    /// Snap a pixel position onto the nearest beat's pixel position
    pub fn snap_pixel(&self, pixel: f64) -> f64 {
        let beat = self.beat_of(pixel);
        self.time_to_pixel(self.beats[beat])
    }

    /// Sample index of a beat (truncated)
    pub fn sample_of(&self, beat_index: usize) -> Result<u64, GridError> {
        let time = self.time_of(beat_index)?;
        Ok((time * self.sample_rate as f64) as u64)
    }

    /// Nearest beat to a sample index
    pub fn beat_at_sample(&self, sample: u64) -> usize {
        self.beat_index_at(sample as f64 / self.sample_rate as f64)
    }

    /// Linear map from seconds to pixels
    pub fn time_to_pixel(&self, time_secs: f64) -> f64 {
        time_secs / self.duration_secs * self.render_width as f64
    }

    /// Linear map from pixels to seconds
    pub fn pixel_to_time(&self, pixel: f64) -> f64 {
        pixel / self.render_width as f64 * self.duration_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_grid(width: u32) -> BeatGrid {
        // Beats every second over a ten second track
        BeatGrid::from_beats((0..9).map(|i| i as f64).collect(), 10.0, 1000, width).unwrap()
    }

    #[test]
    fn test_empty_beats_rejected() {
        let result = BeatGrid::from_beats(vec![], 10.0, 44100, 700);
        assert_eq!(result.unwrap_err(), GridError::EmptyGrid);
    }

    #[test]
    fn test_zero_width_rejected() {
        assert_eq!(
            BeatGrid::from_beats(vec![0.0], 10.0, 44100, 0).unwrap_err(),
            GridError::ZeroWidth
        );

        let mut grid = unit_grid(100);
        assert_eq!(grid.set_render_width(0), Err(GridError::ZeroWidth));
        assert_eq!(grid.render_width(), 100);
    }

    #[test]
    fn test_nearest_beat() {
        let grid = unit_grid(100);

        assert_eq!(grid.beat_index_at(2.2), 2);
        assert_eq!(grid.beat_index_at(2.7), 3);
        assert_eq!(grid.beat_index_at(-5.0), 0);
        assert_eq!(grid.beat_index_at(42.0), 8);
    }

    #[test]
    fn test_tie_breaks_toward_lower_index() {
        let grid = BeatGrid::from_beats(vec![0.0, 1.0, 3.0], 4.0, 1000, 100).unwrap();

        assert_eq!(grid.beat_index_at(0.5), 0);
        assert_eq!(grid.beat_index_at(2.0), 1);
    }

    #[test]
    fn test_time_round_trip_for_every_beat() {
        let beats = vec![0.12, 0.61, 1.07, 1.58, 2.02, 2.55, 3.01];
        let grid = BeatGrid::from_beats(beats, 3.5, 44100, 700).unwrap();

        for i in 0..grid.beat_count() {
            let time = grid.time_of(i).unwrap();
            assert_eq!(grid.beat_index_at(time), i);
        }
    }

    #[test]
    fn test_pixel_mapping() {
        let grid = unit_grid(100);

        assert!((grid.pixel_of(4).unwrap() - 40.0).abs() < 1e-9);
        assert_eq!(grid.beat_of(41.0), 4);
        assert_eq!(grid.beat_of(46.0), 5);
        assert!((grid.snap_pixel(38.0) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_pixel_mapping_follows_resize() {
        let mut grid = unit_grid(100);
        grid.set_render_width(200).unwrap();

        assert!((grid.pixel_of(4).unwrap() - 80.0).abs() < 1e-9);
        assert_eq!(grid.beat_of(81.0), 4);
    }

    #[test]
    fn test_out_of_range_beat() {
        let grid = unit_grid(100);
        assert_eq!(
            grid.time_of(9),
            Err(GridError::BeatOutOfRange { index: 9, len: 9 })
        );
        assert!(grid.pixel_of(20).is_err());
    }

    #[test]
    fn test_sample_mapping() {
        let grid = unit_grid(100);

        assert_eq!(grid.sample_of(3).unwrap(), 3000);
        assert_eq!(grid.beat_at_sample(3400), 3);
        assert_eq!(grid.beat_at_sample(3600), 4);
    }
}
