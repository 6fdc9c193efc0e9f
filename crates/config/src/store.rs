//! Durable storage for the configuration snapshot.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{Error, Snapshot};

/// Key-value style store holding the last saved snapshot document.
pub trait ConfigStore: Send + Sync {
    /// Return the stored document, or `None` when nothing was saved yet.
    fn load(&self) -> Result<Option<String>, Error>;
    /// Replace the stored document.
    fn save(&self, document: &str) -> Result<(), Error>;
}

/// Load the stored snapshot, recovering from any read or decode failure with defaults.
pub fn load_snapshot(store: &dyn ConfigStore) -> Snapshot {
    match store.load() {
        Ok(doc) => Snapshot::parse_or_default(doc.as_deref()),
        Err(e) => {
            warn!(error = %e.pretty(), "config_store_read_failed_using_defaults");
            Snapshot::default()
        }
    }
}

/// Encode and store `snapshot`.
pub fn save_snapshot(store: &dyn ConfigStore, snapshot: &Snapshot) -> Result<(), Error> {
    let doc = snapshot.to_json()?;
    store.save(&doc)
}

/// Snapshot stored as a JSON file.
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Location of the JSON document.
    path: PathBuf,
}

impl FileStore {
    /// Create a store backed by `path`; the file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wrap an I/O error as a write error for this store.
    fn write_err(&self, e: &io::Error) -> Error {
        Error::Write {
            path: Some(self.path.clone()),
            message: e.to_string(),
        }
    }
}

impl ConfigStore for FileStore {
    fn load(&self) -> Result<Option<String>, Error> {
        match fs::read_to_string(&self.path) {
            Ok(doc) => Ok(Some(doc)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Read {
                path: Some(self.path.clone()),
                message: e.to_string(),
            }),
        }
    }

    fn save(&self, document: &str) -> Result<(), Error> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.write_err(&e))?;
        }
        // Sibling file plus rename keeps the target whole.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, document).map_err(|e| self.write_err(&e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.write_err(&e))?;
        debug!(path = %self.path.display(), bytes = document.len(), "config_saved");
        Ok(())
    }
}

/// In-memory store, used by tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Last saved document.
    doc: Mutex<Option<String>>,
    /// Number of successful saves.
    saves: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with `document`.
    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            doc: Mutex::new(Some(document.into())),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of saves performed so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Decode the current document, if any.
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.doc
            .lock()
            .as_deref()
            .and_then(|d| Snapshot::parse(d).ok())
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self) -> Result<Option<String>, Error> {
        Ok(self.doc.lock().clone())
    }

    fn save(&self, document: &str) -> Result<(), Error> {
        *self.doc.lock() = Some(document.to_string());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Configuration, SessionMode};

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("config.json"));
        assert_eq!(store.load().unwrap(), None);

        let snap = Snapshot::new(
            Configuration {
                window_title: "Notepad".into(),
                mode: SessionMode::Auto,
                ..Configuration::default()
            },
            3,
        );
        save_snapshot(&store, &snap).unwrap();
        assert_eq!(load_snapshot(&store), snap);
    }

    #[test]
    fn corrupt_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{{{").unwrap();
        let store = FileStore::new(&path);
        assert_eq!(load_snapshot(&store), Snapshot::default());
    }

    #[test]
    fn memory_store_counts_saves() {
        let store = MemoryStore::with_document(r#"{"clickCounter": 5}"#);
        assert_eq!(load_snapshot(&store).click_counter, 5);
        save_snapshot(&store, &Snapshot::default()).unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.snapshot(), Some(Snapshot::default()));
    }
}
