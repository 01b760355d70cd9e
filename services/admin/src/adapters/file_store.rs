//! services/admin/src/adapters/file_store.rs
//!
//! A `KeyValueStore` persisted as one JSON file per key in a directory.
//! Backs the response cache when `CACHE_DIR` is configured.

use async_trait::async_trait;
use lam_phuong_core::ports::{KeyValueStore, PortError, PortResult};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

const EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, key: &str) -> PortResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(PortError::Storage(format!("Unsupported key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.{}", key, EXTENSION)))
    }
}

fn storage_error(e: std::io::Error) -> PortError {
    PortError::Storage(e.to_string())
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)?).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error(e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> PortResult<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).await.map_err(storage_error)?;

        // Write then rename so readers never see a half-written file.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value).await.map_err(storage_error)?;
        fs::rename(&tmp, &path).await.map_err(storage_error)
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        match fs::remove_file(self.path_for(key)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error(e)),
        }
    }

    async fn keys(&self) -> PortResult<Vec<String>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_error(e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(storage_error)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_survive_a_new_store_instance() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("cache"));

        assert_eq!(store.keys().await.unwrap(), Vec::<String>::new());
        store.set("lp_cache_locations", "[1,2]").await.unwrap();
        store.set("lp_cache_job_types", "[]").await.unwrap();

        let reopened = FileStore::new(dir.path().join("cache"));
        assert_eq!(
            reopened.get("lp_cache_locations").await.unwrap().as_deref(),
            Some("[1,2]")
        );
        assert_eq!(
            reopened.keys().await.unwrap(),
            vec!["lp_cache_job_types".to_string(), "lp_cache_locations".to_string()]
        );

        reopened.remove("lp_cache_locations").await.unwrap();
        reopened.remove("lp_cache_locations").await.unwrap();
        assert_eq!(reopened.get("lp_cache_locations").await.unwrap(), None);
    }

    #[tokio::test]
    async fn path_like_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());

        assert!(matches!(
            store.set("../escape", "x").await,
            Err(PortError::Storage(_))
        ));
    }
}
