//! Nourish - Memoized catalog loads
//!
//! The catalog is read once and reused across queries. Entries are keyed by
//! path and file modification time, so an edited file is re-read on the next
//! lookup.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

use crate::config::ColumnMapping;
use crate::data::{Catalog, STDIN_PATH};
use crate::error::Result;

struct Entry {
    modified: Option<SystemTime>,
    catalog: Arc<Catalog>,
}

/// LRU of loaded catalogs
pub struct CatalogCache {
    mapping: ColumnMapping,
    entries: LruCache<PathBuf, Entry>,
    hits: u64,
    misses: u64,
}

impl CatalogCache {
    /// A capacity of zero is treated as one.
    pub fn new(mapping: ColumnMapping, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            mapping,
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Return the cached catalog for `path`, loading it on first use.
    ///
    /// Stdin cannot be re-read, so `-` is loaded once and kept.
    pub fn get_or_load<P: AsRef<Path>>(&mut self, path: P) -> Result<Arc<Catalog>> {
        let path = path.as_ref();
        let modified = modified_time(path);

        if let Some(entry) = self.entries.get(path) {
            if path.as_os_str() == STDIN_PATH || entry.modified == modified {
                self.hits += 1;
                debug!("Catalog cache hit: {}", path.display());
                return Ok(Arc::clone(&entry.catalog));
            }
            debug!("Catalog {} changed on disk; reloading", path.display());
        }

        self.misses += 1;
        let catalog = Arc::new(Catalog::load(path, &self.mapping)?);
        self.entries.put(
            path.to_path_buf(),
            Entry {
                modified,
                catalog: Arc::clone(&catalog),
            },
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses)
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_second_load_is_memoized() {
        let file = csv_file("Food Item,Category\nKale,Vegetable\n");
        let mut cache = CatalogCache::new(ColumnMapping::default(), 2);

        let first = cache.get_or_load(file.path()).unwrap();
        let second = cache.get_or_load(file.path()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn test_changed_file_is_reloaded() {
        let file = csv_file("Food Item,Category\nKale,Vegetable\n");
        let mut cache = CatalogCache::new(ColumnMapping::default(), 2);
        let first = cache.get_or_load(file.path()).unwrap();

        std::fs::write(file.path(), "Food Item,Category\nKale,Vegetable\nOats,Grain\n").unwrap();
        let later = SystemTime::now() + std::time::Duration::from_secs(10);
        file.as_file().set_modified(later).unwrap();

        let second = cache.get_or_load(file.path()).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.contains("Oats"));
        assert!(!first.contains("Oats"));
        assert_eq!(cache.stats(), (0, 2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let a = csv_file("Food Item\nKale\n");
        let b = csv_file("Food Item\nOats\n");
        let mut cache = CatalogCache::new(ColumnMapping::default(), 1);

        cache.get_or_load(a.path()).unwrap();
        cache.get_or_load(b.path()).unwrap();
        assert_eq!(cache.len(), 1);
        cache.get_or_load(a.path()).unwrap();
        assert_eq!(cache.stats(), (0, 3));
    }

    #[test]
    fn test_load_errors_are_not_cached() {
        let mut cache = CatalogCache::new(ColumnMapping::default(), 2);
        assert!(cache.get_or_load("/no/such/file.csv").is_err());
        assert!(cache.is_empty());
    }
}
