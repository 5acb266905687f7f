use crate::dataset::Dataset;
use crate::error::{AppError, Result};
use crate::loader::load_records;
use crate::normalize::{NormalizeStats, Normalizer};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceKey {
    path: PathBuf,
    modified: Option<SystemTime>,
}

#[derive(Debug)]
struct CachedLoad {
    key: SourceKey,
    dataset: Dataset,
    stats: NormalizeStats,
}

/// Holds the most recent load of a station file.
///
/// A cached dataset is reused while the path and the file's modification time
/// are unchanged. Owned by the caller; nothing is shared between instances.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entry: Option<CachedLoad>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the dataset for `path`, reloading and renormalizing when the
    /// file changed or was never loaded. A failed reload leaves the cache empty.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<&Dataset> {
        let key = source_key(path.as_ref())?;

        let cached = match self.entry.take() {
            Some(cached) if cached.key == key => {
                debug!("Using cached dataset for {}", key.path.display());
                cached
            }
            _ => {
                info!("Loading dataset from {}", key.path.display());
                let records = load_records(&key.path)?;
                let (stations, stats) = Normalizer::normalize(&records);
                CachedLoad {
                    key,
                    dataset: Dataset::new(stations),
                    stats,
                }
            }
        };

        Ok(&self.entry.insert(cached).dataset)
    }

    /// Statistics from the load currently held, if any.
    pub fn stats(&self) -> Option<&NormalizeStats> {
        self.entry.as_ref().map(|cached| &cached.stats)
    }

    pub fn is_cached<P: AsRef<Path>>(&self, path: P) -> bool {
        match (&self.entry, source_key(path.as_ref())) {
            (Some(cached), Ok(key)) => cached.key == key,
            _ => false,
        }
    }

    pub fn invalidate(&mut self) {
        if self.entry.take().is_some() {
            debug!("Dataset cache invalidated");
        }
    }
}

fn source_key(path: &Path) -> Result<SourceKey> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::SourceNotFound(path.to_path_buf())
        } else {
            AppError::Io(e)
        }
    })?;

    Ok(SourceKey {
        path: path.to_path_buf(),
        modified: metadata.modified().ok(),
    })
}
