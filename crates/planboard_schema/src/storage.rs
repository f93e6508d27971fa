//! Schema file storage
//!
//! Persists a [`SchemaCollection`] as a pretty-printed JSON document so a
//! later run can hand it to [`SchemaStore::bootstrap`](crate::SchemaStore::bootstrap).

use crate::collection::SchemaCollection;
use crate::error::Result;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// JSON file holding one saved schema.
#[derive(Debug, Clone)]
pub struct SchemaFileStorage {
    path: PathBuf,
}

impl SchemaFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw saved document, or `None` when nothing has been saved yet.
    pub fn load_raw(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No saved schema");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Parsed and validated saved schema.
    pub fn load(&self) -> Result<Option<SchemaCollection>> {
        match self.load_raw()? {
            Some(contents) => Ok(Some(SchemaCollection::from_json_str(&contents)?)),
            None => Ok(None),
        }
    }

    /// Write the collection, replacing any previous save.
    ///
    /// The document is written to a sibling temp file first and renamed
    /// into place so a crash never leaves a truncated save behind.
    pub fn save(&self, collection: &SchemaCollection) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(collection)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        info!(
            path = %self.path.display(),
            items = collection.items.len(),
            "Schema saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let storage = SchemaFileStorage::new(dir.path().join("schema.json"));
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let storage = SchemaFileStorage::new(dir.path().join("nested").join("schema.json"));
        let collection = crate::defaults::default_schema().unwrap();

        storage.save(&collection).unwrap();
        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(loaded.items, collection.items);
        assert_eq!(loaded.content_hash(), collection.content_hash());
    }

    #[test]
    fn test_load_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(&path, "{\"version\": \"1\"}").unwrap();
        let storage = SchemaFileStorage::new(&path);
        assert!(matches!(storage.load(), Err(SchemaError::Validation(_))));
        assert!(storage.load_raw().unwrap().is_some());
    }
}
