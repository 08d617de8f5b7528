//! Bounded, most-recent-first history of analyses persisted as one JSON file.

use crate::error::HistoryError;
use crate::record::AnalysisResult;
use std::{fs, path::PathBuf};

/// Maximum number of records kept.
pub const HISTORY_CAPACITY: usize = 25;

pub struct HistoryStore {
    path: PathBuf,
    entries: Vec<AnalysisResult>,
}

impl HistoryStore {
    /// Loads the stored history. Missing or unreadable content yields an empty store.
    pub fn load(path: PathBuf) -> Self {
        let mut entries = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str::<Vec<AnalysisResult>>(&contents)
                .unwrap_or_else(|e| {
                    log::warn!("Ignoring corrupt history at {}: {e}", path.display());
                    Vec::new()
                }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                log::warn!("Could not read history at {}: {e}", path.display());
                Vec::new()
            }
        };
        // files written elsewhere may break the cap or the record rules
        if entries.len() > HISTORY_CAPACITY {
            let dropped = entries.len() - HISTORY_CAPACITY;
            log::warn!("Dropping {dropped} history entries past capacity");
            entries.truncate(HISTORY_CAPACITY);
        }
        for entry in &mut entries {
            entry.core.sanitize();
        }
        log::debug!("Loaded {} history entries", entries.len());

        Self { path, entries }
    }

    /// Prepends `entry`, drops anything past capacity and rewrites the file.
    ///
    /// The in-memory sequence is updated even when the write fails.
    pub fn record(&mut self, entry: AnalysisResult) -> Result<&[AnalysisResult], HistoryError> {
        self.entries.insert(0, entry);
        self.entries.truncate(HISTORY_CAPACITY);
        self.persist()?;
        Ok(&self.entries)
    }

    pub fn select_by_index(&self, index: usize) -> Option<&AnalysisResult> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[AnalysisResult] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn persist(&self) -> Result<(), HistoryError> {
        let serialized = serde_json::to_string_pretty(&self.entries)?;
        let io_err = |source: std::io::Error| HistoryError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&self.path, serialized).map_err(io_err)
    }
}
