// Session configuration
// Paths and view settings for one editing session, stored as JSON

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::storage;
use crate::audio::companion_wav_path;

/// Timeline width used until the view reports its real size
pub const DEFAULT_RENDER_WIDTH: u32 = 700;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Render width must be greater than zero")]
    ZeroRenderWidth,

    #[error("No analysis file configured")]
    MissingAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Beat/segmentation artifact for the track
    pub analysis_path: Option<PathBuf>,

    /// Track audio; defaults to the analysis path with a `.wav` extension
    pub audio_path: Option<PathBuf>,

    /// Directory of gesture files
    pub library_dir: PathBuf,

    /// Directory exported sequences are written to
    pub export_dir: PathBuf,

    /// Width of the full-track timeline in pixels
    pub render_width: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            analysis_path: None,
            audio_path: None,
            library_dir: storage::get_gesture_dir().unwrap_or_else(|_| PathBuf::from("gestures")),
            export_dir: storage::get_export_dir().unwrap_or_else(|_| PathBuf::from("exports")),
            render_width: DEFAULT_RENDER_WIDTH,
        }
    }
}

impl SessionConfig {
    /// Load a config file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: SessionConfig = serde_json::from_str(&contents)?;
        config.validate()?;

        log::debug!("Loaded session config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.render_width == 0 {
            return Err(ConfigError::ZeroRenderWidth);
        }
        Ok(())
    }

    pub fn analysis_path(&self) -> Result<&Path, ConfigError> {
        self.analysis_path.as_deref().ok_or(ConfigError::MissingAnalysis)
    }

    /// Audio path to open, falling back to the analysis file's companion WAV
    pub fn resolved_audio_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.audio_path {
            Some(path) => Ok(path.clone()),
            None => Ok(companion_wav_path(self.analysis_path()?)),
        }
    }
}
