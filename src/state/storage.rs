// File system operations for gesture files and exported sequences
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extension used for gesture files and exported sequences
pub const SEQUENCE_EXTENSION: &str = "csv";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to get app data directory")]
    NoAppDataDir,
    #[error("Invalid file name '{0}'")]
    InvalidName(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Get the app data directory for the gesture composer
pub fn get_app_data_dir() -> StorageResult<PathBuf> {
    let data_dir = dirs::data_dir().ok_or(StorageError::NoAppDataDir)?;
    Ok(data_dir.join("com.gesturecomposer.app"))
}

/// Default gesture library directory
pub fn get_gesture_dir() -> StorageResult<PathBuf> {
    Ok(get_app_data_dir()?.join("gestures"))
}

/// Default directory for exported sequences
pub fn get_export_dir() -> StorageResult<PathBuf> {
    Ok(get_app_data_dir()?.join("exports"))
}

/// Check that a user-supplied name can be used as a file stem
pub fn validate_file_stem(name: &str) -> StorageResult<()> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Path of `<dir>/<name>.csv`
pub fn named_file_path(dir: &Path, name: &str) -> StorageResult<PathBuf> {
    validate_file_stem(name)?;
    Ok(dir.join(format!("{}.{}", name, SEQUENCE_EXTENSION)))
}

/// Write `<dir>/<name>.csv`, creating the directory, and return its path
pub fn store_named_file(dir: &Path, name: &str, data: &[u8]) -> StorageResult<PathBuf> {
    let file_path = named_file_path(dir, name)?;
    fs::create_dir_all(dir)?;

    let mut file = fs::File::create(&file_path)?;
    file.write_all(data)?;

    Ok(file_path)
}

/// Read a file from disk
pub fn read_file(path: &Path) -> StorageResult<Vec<u8>> {
    Ok(fs::read(path)?)
}
