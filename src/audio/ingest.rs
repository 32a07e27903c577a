// Audio ingestion module
// Reads the WAV header of a track to recover its duration and sample rate

use hound::WavReader;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Failed to read WAV file: {0}")]
    WavReadError(#[from] hound::Error),

    #[error("Invalid track timing: {0}")]
    InvalidTiming(String),
}

/// Timing facts about a track, everything the timeline needs from the audio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackInfo {
    /// Total duration in seconds
    pub duration_secs: f64,

    /// Sample rate in Hz (e.g., 44100, 48000)
    pub sample_rate: u32,

    /// Number of frames (samples per channel)
    pub frame_count: u64,
}

impl TrackInfo {
    /// Build from a known frame count and sample rate
    pub fn from_frames(frame_count: u64, sample_rate: u32) -> Result<Self, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidTiming("sample rate is zero".to_string()));
        }
        if frame_count == 0 {
            return Err(AudioError::InvalidTiming("track has no frames".to_string()));
        }

        Ok(TrackInfo {
            duration_secs: frame_count as f64 / sample_rate as f64,
            sample_rate,
            frame_count,
        })
    }

    /// Build from a duration in seconds, deriving the frame count
    pub fn from_duration(duration_secs: f64, sample_rate: u32) -> Result<Self, AudioError> {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(AudioError::InvalidTiming(format!(
                "duration must be positive, got {}",
                duration_secs
            )));
        }
        if sample_rate == 0 {
            return Err(AudioError::InvalidTiming("sample rate is zero".to_string()));
        }

        Ok(TrackInfo {
            duration_secs,
            sample_rate,
            frame_count: (duration_secs * sample_rate as f64) as u64,
        })
    }
}

/// Read track timing from any WAV stream without decoding samples
pub fn read_track_info<R: Read + Seek>(reader: R) -> Result<TrackInfo, AudioError> {
    let reader = WavReader::new(reader)?;
    let spec = reader.spec();

    // duration() is already expressed in frames
    TrackInfo::from_frames(reader.duration() as u64, spec.sample_rate)
}

/// Read track timing from a WAV file on disk
pub fn ingest_wav(path: &Path) -> Result<TrackInfo, AudioError> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let info = TrackInfo::from_frames(reader.duration() as u64, spec.sample_rate)?;

    log::info!(
        "Ingested track {}: {} Hz, {} channels, {:.2}s",
        path.display(),
        spec.sample_rate,
        spec.channels,
        info.duration_secs
    );

    Ok(info)
}

/// Audio file that sits next to an analysis artifact (`song.json` -> `song.wav`)
pub fn companion_wav_path(analysis_path: &Path) -> PathBuf {
    analysis_path.with_extension("wav")
}
