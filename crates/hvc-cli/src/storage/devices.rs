//! Known-device store.
//!
//! One pretty-printed JSON file per appliance, named after its unique id.

use std::path::PathBuf;

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::fs;

use hvc_core::DeviceSession;

use crate::error::StorageError;

/// Valid unique ids: alphanumeric plus `_ . : -`
const NAME_PATTERN: &str = r"^[A-Za-z0-9_.:-]+$";

/// Maximum unique id length
const MAX_NAME_LENGTH: usize = 64;

/// An appliance remembered between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownDevice {
    pub unique_id: String,
    pub host: String,
    pub port: u16,
    pub name: String,
    /// RFC 3339 timestamp of when the device was stored
    pub added_at: String,
}

impl KnownDevice {
    pub fn from_session(session: &DeviceSession) -> Self {
        let peer = session.peer();
        Self {
            unique_id: session.unique_id().to_string(),
            host: peer.ip().to_string(),
            port: peer.port(),
            name: session.name().to_string(),
            added_at: Utc::now().to_rfc3339(),
        }
    }
}

/// File-based store of known devices.
pub struct DeviceStore {
    dir: PathBuf,
    name_regex: Regex,
}

impl DeviceStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: PathBuf) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&dir)
            .map_err(|e| StorageError::DirectoryAccess(format!("{}: {}", dir.display(), e)))?;

        let name_regex =
            Regex::new(NAME_PATTERN).map_err(|e| StorageError::InvalidName(e.to_string()))?;

        Ok(Self { dir, name_regex })
    }

    fn validate_name(&self, unique_id: &str) -> Result<(), StorageError> {
        if unique_id.is_empty() {
            return Err(StorageError::InvalidName(
                "Unique id cannot be empty".to_string(),
            ));
        }

        if unique_id.len() > MAX_NAME_LENGTH {
            return Err(StorageError::InvalidName(format!(
                "Unique id exceeds maximum length of {} characters",
                MAX_NAME_LENGTH
            )));
        }

        if !self.name_regex.is_match(unique_id) {
            return Err(StorageError::InvalidName(format!(
                "Unique id '{}' contains characters that cannot be used in a file name",
                unique_id
            )));
        }

        Ok(())
    }

    fn get_path(&self, unique_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", unique_id))
    }

    /// List all known devices, sorted by unique id.
    ///
    /// Files that fail to parse are skipped.
    pub async fn list(&self) -> Result<Vec<KnownDevice>, StorageError> {
        let mut devices = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            let content = fs::read_to_string(&path).await?;
            match serde_json::from_str::<KnownDevice>(&content) {
                Ok(device) => devices.push(device),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable device file");
                }
            }
        }

        devices.sort_by(|a, b| a.unique_id.cmp(&b.unique_id));

        Ok(devices)
    }

    /// Read a known device by unique id.
    pub async fn read(&self, unique_id: &str) -> Result<Option<KnownDevice>, StorageError> {
        self.validate_name(unique_id)?;

        let path = self.get_path(unique_id);

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Save a device, overwriting any previous entry with the same id.
    pub async fn save(&self, device: &KnownDevice) -> Result<(), StorageError> {
        self.validate_name(&device.unique_id)?;

        let content = serde_json::to_string_pretty(device)?;
        fs::write(self.get_path(&device.unique_id), content).await?;

        Ok(())
    }

    /// Forget a device.
    pub async fn delete(&self, unique_id: &str) -> Result<(), StorageError> {
        self.validate_name(unique_id)?;

        let path = self.get_path(unique_id);

        if !path.exists() {
            return Err(StorageError::NotFound(unique_id.to_string()));
        }

        fs::remove_file(&path).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> (DeviceStore, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = DeviceStore::new(temp_dir.path().to_path_buf()).unwrap();
        (store, temp_dir)
    }

    fn make_device(unique_id: &str) -> KnownDevice {
        KnownDevice {
            unique_id: unique_id.to_string(),
            host: "192.168.1.40".to_string(),
            port: 38866,
            name: "Utility room".to_string(),
            added_at: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_and_read() {
        let (store, _tmp) = create_test_store();

        store.save(&make_device("hvc-a1b2c3")).await.unwrap();

        let loaded = store.read("hvc-a1b2c3").await.unwrap().unwrap();
        assert_eq!(loaded, make_device("hvc-a1b2c3"));
        assert!(store.read("hvc-missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_sorted_and_skips_garbage() {
        let (store, tmp) = create_test_store();

        store.save(&make_device("beta")).await.unwrap();
        store.save(&make_device("alpha")).await.unwrap();
        std::fs::write(tmp.path().join("broken.json"), "not json").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let devices = store.list().await.unwrap();
        let ids: Vec<_> = devices.iter().map(|d| d.unique_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_delete() {
        let (store, _tmp) = create_test_store();

        store.save(&make_device("to-delete")).await.unwrap();
        store.delete("to-delete").await.unwrap();

        assert!(store.read("to-delete").await.unwrap().is_none());
        assert!(matches!(
            store.delete("to-delete").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_validate_name() {
        let (store, _tmp) = create_test_store();

        assert!(store.validate_name("hvc-a1b2c3").is_ok());
        assert!(store.validate_name("aa:bb:cc_01.x").is_ok());
        assert!(store.validate_name("").is_err());
        assert!(store.validate_name("../escape").is_err());
        assert!(store.validate_name(&"x".repeat(65)).is_err());
    }
}
