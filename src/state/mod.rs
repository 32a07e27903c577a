// State management module
// Session configuration, the on-disk gesture library and file storage

pub mod config;
pub mod library;
pub mod storage;

pub use config::{ConfigError, SessionConfig, DEFAULT_RENDER_WIDTH};
pub use library::{GestureLibrary, LibraryError, LoadReport, SkippedFile};
pub use storage::{StorageError, StorageResult};
