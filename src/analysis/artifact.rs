// Analysis artifact loading
// Parses the beat tracker's JSON output and validates the timestamp arrays

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid analysis JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tempo must be a positive number, got {0}")]
    InvalidTempo(f64),

    #[error("{field}[{index}] is negative or not finite: {value}")]
    InvalidTimestamp {
        field: &'static str,
        index: usize,
        value: f64,
    },

    #[error("{field} must be strictly increasing (index {index})")]
    NotIncreasing { field: &'static str, index: usize },

    #[error("segmentation[{0}] is an empty pair")]
    EmptySegmentationPair(usize),

    #[error("{field} extends past the end of the track ({value}s > {duration}s)")]
    PastTrackEnd {
        field: &'static str,
        value: f64,
        duration: f64,
    },
}

/// Raw analysis artifact as written by the beat tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisArtifact {
    /// Detected tempo in BPM (may be fractional on disk)
    pub tempo: f64,

    /// Beat timestamps in seconds
    pub beats: Vec<f64>,

    /// Segmentation pairs of `[seconds, energy]`
    pub segmentation: Vec<Vec<f64>>,
}

/// Validated analysis results for one track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisData {
    tempo_bpm: u32,
    beat_timestamps: Vec<f64>,
    segment_timestamps: Vec<f64>,
}

impl AnalysisData {
    /// Build from already-extracted arrays, validating ordering and ranges
    pub fn new(
        tempo_bpm: u32,
        beat_timestamps: Vec<f64>,
        segment_timestamps: Vec<f64>,
    ) -> Result<Self, AnalysisError> {
        if tempo_bpm == 0 {
            return Err(AnalysisError::InvalidTempo(0.0));
        }

        validate_timestamps("beats", &beat_timestamps)?;
        validate_timestamps("segmentation", &segment_timestamps)?;

        Ok(AnalysisData {
            tempo_bpm,
            beat_timestamps,
            segment_timestamps,
        })
    }

    /// Convert a raw artifact, keeping only the time of each segmentation pair
    pub fn from_artifact(artifact: AnalysisArtifact) -> Result<Self, AnalysisError> {
        if !artifact.tempo.is_finite() || artifact.tempo < 1.0 {
            return Err(AnalysisError::InvalidTempo(artifact.tempo));
        }

        let segment_timestamps = artifact
            .segmentation
            .iter()
            .enumerate()
            .map(|(i, pair)| {
                pair.first()
                    .copied()
                    .ok_or(AnalysisError::EmptySegmentationPair(i))
            })
            .collect::<Result<Vec<f64>, AnalysisError>>()?;

        // Integer BPM, truncated like the tracker's consumers always did
        Self::new(
            artifact.tempo.trunc() as u32,
            artifact.beats,
            segment_timestamps,
        )
    }

    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        let artifact: AnalysisArtifact = serde_json::from_str(json)?;
        Self::from_artifact(artifact)
    }

    /// Load an artifact file from disk
    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        let contents = std::fs::read_to_string(path)?;
        let data = Self::from_json(&contents)?;

        log::info!(
            "Loaded analysis {}: {} BPM, {} beats, {} segment markers",
            path.display(),
            data.tempo_bpm,
            data.beat_timestamps.len(),
            data.segment_timestamps.len()
        );

        Ok(data)
    }

    /// Check that no timestamp lies past the end of the track
    pub fn check_duration(&self, duration_secs: f64) -> Result<(), AnalysisError> {
        let last_values = [
            ("beats", self.beat_timestamps.last()),
            ("segmentation", self.segment_timestamps.last()),
        ];

        for (field, last) in last_values {
            if let Some(&value) = last {
                if value > duration_secs {
                    return Err(AnalysisError::PastTrackEnd {
                        field,
                        value,
                        duration: duration_secs,
                    });
                }
            }
        }

        Ok(())
    }

    pub fn tempo_bpm(&self) -> u32 {
        self.tempo_bpm
    }

    pub fn beat_timestamps(&self) -> &[f64] {
        &self.beat_timestamps
    }

    pub fn segment_timestamps(&self) -> &[f64] {
        &self.segment_timestamps
    }
}

fn validate_timestamps(field: &'static str, values: &[f64]) -> Result<(), AnalysisError> {
    for (index, &value) in values.iter().enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(AnalysisError::InvalidTimestamp { field, index, value });
        }
        if index > 0 && value <= values[index - 1] {
            return Err(AnalysisError::NotIncreasing { field, index });
        }
    }
    Ok(())
}
