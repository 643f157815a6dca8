use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::loader;
use super::model::PassengerDataset;
use crate::error::Result;

/// Loaded datasets keyed by source identity (the canonical path).
///
/// A hit hands back the same `Arc`, so downstream caches keyed by
/// dataset identity stay valid across repeated loads.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<PathBuf, Arc<PassengerDataset>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `path`, parsing only on the first request for that source.
    pub fn load(&mut self, path: &Path) -> Result<Arc<PassengerDataset>> {
        let key = source_key(path);
        if let Some(ds) = self.entries.get(&key) {
            log::debug!("Dataset cache hit for {}", key.display());
            return Ok(Arc::clone(ds));
        }
        let ds = Arc::new(loader::load_file(path)?);
        self.entries.insert(key, Arc::clone(&ds));
        Ok(ds)
    }

    /// Forget one source so the next load re-reads it.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        self.entries.remove(&source_key(path)).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Canonical path when the file exists, the path as given otherwise.
fn source_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::tests::SAMPLE_CSV;
    use crate::error::ExplorerError;
    use std::io::Write;

    fn sample_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(SAMPLE_CSV.as_bytes()).unwrap();
        file
    }

    #[test]
    fn repeated_loads_share_one_dataset() {
        let file = sample_file();
        let mut cache = DatasetCache::new();

        let a = cache.load(file.path()).unwrap();
        let b = cache.load(file.path()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_forces_a_reload() {
        let file = sample_file();
        let mut cache = DatasetCache::new();

        let a = cache.load(file.path()).unwrap();
        assert!(cache.invalidate(file.path()));
        let b = cache.load(file.path()).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_ne!(a.id(), b.id());
        assert_eq!(a.passengers, b.passengers);
    }

    #[test]
    fn failures_are_not_cached() {
        let mut cache = DatasetCache::new();
        let err = cache.load(Path::new("/no/such/titanic.csv")).unwrap_err();
        assert!(matches!(err, ExplorerError::DataUnavailable(_)));
        assert!(cache.is_empty());
    }
}
