// Gesture library
// One delimited file per gesture, loaded from and saved to a library directory

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use super::storage::{self, StorageError, SEQUENCE_EXTENSION};
use crate::gestures::{parse_rows, rows_to_string, GestureBlock, GestureError, InstructionRow};

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Invalid(#[from] GestureError),

    #[error("No gesture named '{0}'")]
    NotFound(String),

    #[error("A gesture named '{0}' already exists")]
    AlreadyExists(String),
}

pub type LibraryResult<T> = Result<T, LibraryError>;

/// A library file that could not be loaded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of scanning the library directory
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: Vec<SkippedFile>,
}

/// Named gestures backed by a directory of `<name>.csv` files
#[derive(Debug, Clone)]
pub struct GestureLibrary {
    dir: PathBuf,
    gestures: BTreeMap<String, GestureBlock>,
}

impl GestureLibrary {
    /// Open a library directory, creating it if needed, and load every gesture
    pub fn open(dir: impl Into<PathBuf>) -> LibraryResult<(Self, LoadReport)> {
        let mut library = GestureLibrary {
            dir: dir.into(),
            gestures: BTreeMap::new(),
        };
        fs::create_dir_all(&library.dir)?;
        let report = library.reload()?;
        Ok((library, report))
    }

    /// Rescan the directory
    ///
    /// Gestures that were already loaded keep their color. Malformed files are
    /// skipped and reported rather than failing the whole load.
    pub fn reload(&mut self) -> LibraryResult<LoadReport> {
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path.extension().and_then(|ext| ext.to_str()) == Some(SEQUENCE_EXTENSION)
            })
            .collect();
        paths.sort();

        let mut report = LoadReport::default();
        let mut gestures = BTreeMap::new();

        for path in paths {
            match self.load_file(&path) {
                Ok(block) => {
                    gestures.insert(block.name().to_string(), block);
                    report.loaded += 1;
                }
                Err(reason) => {
                    log::warn!("Skipping gesture file {}: {}", path.display(), reason);
                    report.skipped.push(SkippedFile { path, reason });
                }
            }
        }

        self.gestures = gestures;
        log::info!(
            "Loaded {} gestures from {} ({} skipped)",
            report.loaded,
            self.dir.display(),
            report.skipped.len()
        );

        Ok(report)
    }

    fn load_file(&self, path: &Path) -> Result<GestureBlock, String> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| "file name is not valid UTF-8".to_string())?;
        let bytes = storage::read_file(path).map_err(|e| e.to_string())?;
        let text = String::from_utf8(bytes).map_err(|_| "contents are not valid UTF-8".to_string())?;
        let rows = parse_rows(&text).map_err(|e| e.to_string())?;

        let block = match self.gestures.get(name) {
            Some(existing) => GestureBlock::with_color(name, rows, existing.color()),
            None => GestureBlock::new(name, rows),
        };
        block.map_err(|e| e.to_string())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.gestures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gestures.is_empty()
    }

    /// Gesture names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.gestures.keys().map(String::as_str)
    }

    pub fn gestures(&self) -> impl Iterator<Item = &GestureBlock> {
        self.gestures.values()
    }

    pub fn get(&self, name: &str) -> Option<&GestureBlock> {
        self.gestures.get(name)
    }

    /// Fresh copy of a library gesture, ready to be placed
    pub fn instantiate(&self, name: &str) -> LibraryResult<GestureBlock> {
        self.get(name)
            .map(GestureBlock::copy_with_new_id)
            .ok_or_else(|| LibraryError::NotFound(name.to_string()))
    }

    /// Write a gesture's rows to disk, replacing any gesture of the same name
    pub fn save(&mut self, name: &str, rows: Vec<InstructionRow>) -> LibraryResult<&GestureBlock> {
        let block = match self.gestures.get(name) {
            Some(existing) => {
                let mut updated = existing.clone();
                updated.set_instructions(rows)?;
                updated
            }
            None => GestureBlock::new(name, rows)?,
        };

        let path = storage::store_named_file(
            &self.dir,
            name,
            rows_to_string(block.instructions()).as_bytes(),
        )?;
        log::info!("Saved gesture '{}' to {}", name, path.display());

        match self.gestures.entry(name.to_string()) {
            Entry::Occupied(mut slot) => {
                slot.insert(block);
                Ok(&*slot.into_mut())
            }
            Entry::Vacant(slot) => Ok(&*slot.insert(block)),
        }
    }

    /// Create a new gesture holding the default single row
    pub fn create(&mut self, name: &str) -> LibraryResult<&GestureBlock> {
        if self.gestures.contains_key(name) {
            return Err(LibraryError::AlreadyExists(name.to_string()));
        }
        self.save(name, vec![InstructionRow::default()])
    }

    /// Remove a gesture and its file
    pub fn delete(&mut self, name: &str) -> LibraryResult<GestureBlock> {
        let path = storage::named_file_path(&self.dir, name)?;
        let block = self
            .gestures
            .remove(name)
            .ok_or_else(|| LibraryError::NotFound(name.to_string()))?;

        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Gesture file {} was already gone", path.display());
            }
            Err(e) => {
                self.gestures.insert(name.to_string(), block);
                return Err(e.into());
            }
        }

        log::info!("Deleted gesture '{}'", name);
        Ok(block)
    }
}
