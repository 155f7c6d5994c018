//! JSON-file plant store
//!
//! The whole store is one pretty-printed JSON array, rewritten on every change.
//! Meant for a single local process; there is no file locking.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::utils::{GreenTwinError, Result};

use super::{InMemoryStore, PlantId, PlantRecord, PlantStore};

/// Plant store persisted to a JSON file
///
/// Changes are written to disk first and only then become visible through
/// `get`/`list`, so a failed write leaves the store as it was.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: InMemoryStore,
}

impl JsonFileStore {
    /// Open the store at `path`; a missing file is an empty store
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let inner = if path.exists() {
            let json = fs::read_to_string(&path)?;
            let records: Vec<PlantRecord> = serde_json::from_str(&json).map_err(|e| {
                GreenTwinError::Serialization(format!("Failed to read store {:?}: {}", path, e))
            })?;

            let mut by_id = BTreeMap::new();
            for record in records {
                if by_id.insert(record.id, record).is_some() {
                    return Err(GreenTwinError::Serialization(format!(
                        "Duplicate plant id in {:?}",
                        path
                    )));
                }
            }
            info!("Loaded {} plants from {:?}", by_id.len(), path);
            InMemoryStore::from_records(by_id)
        } else {
            debug!("No store at {:?}, starting empty", path);
            InMemoryStore::new()
        };

        Ok(Self { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Sibling of the store file, e.g. `.plants.json.tmp`
    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(".");
        name.push(self.path.file_name().unwrap_or_else(|| "plants.json".as_ref()));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Write `records` to a temp file, then swap it into place
    fn write_records(&self, records: &BTreeMap<PlantId, PlantRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let records: Vec<&PlantRecord> = records.values().collect();
        let json = serde_json::to_string_pretty(&records)?;

        let tmp = self.temp_path();
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            warn!("Could not replace {:?}: {}", self.path, e);
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!("Store written to {:?}", self.path);
        Ok(())
    }

    /// Persist the changed map, then make it the visible state
    fn commit(&mut self, records: BTreeMap<PlantId, PlantRecord>) -> Result<()> {
        self.write_records(&records)?;
        self.inner = InMemoryStore::from_records(records);
        Ok(())
    }
}

impl PlantStore for JsonFileStore {
    fn get(&self, id: PlantId) -> Result<Option<PlantRecord>> {
        self.inner.get(id)
    }

    fn put(&mut self, record: PlantRecord) -> Result<()> {
        let mut records = self.inner.records().clone();
        records.insert(record.id, record);
        self.commit(records)
    }

    fn delete(&mut self, id: PlantId) -> Result<bool> {
        if !self.inner.records().contains_key(&id) {
            return Ok(false);
        }

        let mut records = self.inner.records().clone();
        records.remove(&id);
        self.commit(records)?;
        Ok(true)
    }

    fn list(&self) -> Result<Vec<PlantRecord>> {
        self.inner.list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PlantLog;
    use crate::twin::TwinEngine;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("plants.json")).unwrap();
        assert!(store.list().unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data/plants.json");

        let mut record = PlantRecord::new(1, "Tomato", "Solanum lycopersicum");
        TwinEngine::default().update_stress(&mut record.state, 0.3, 0.1);
        record.logs.push(PlantLog::note("First true leaves", Utc::now()));

        {
            let mut store = JsonFileStore::open(&path).unwrap();
            store.put(record.clone()).unwrap();
            store.put(PlantRecord::new(2, "Mint", "Mentha")).unwrap();
        }

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.list().unwrap().len(), 2);

        let loaded = store.get(1).unwrap().unwrap();
        assert_eq!(loaded.name, "Tomato");
        assert!(loaded.state.same_condition(&record.state));
        assert_eq!(loaded.state.last_updated(), record.state.last_updated());
        assert_eq!(loaded.logs, record.logs);

        // No temp file is left behind
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_records_without_logs_still_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plants.json");
        fs::write(
            &path,
            r#"[{
                "id": 3,
                "name": "Basil",
                "species": "Ocimum basilicum",
                "created_at": "2024-05-01T12:00:00Z",
                "state": {
                    "water_stress": 0.2,
                    "heat_stress": 0.0,
                    "disease_risk_index": 0.0,
                    "health_score": 96.0,
                    "last_updated": "2024-05-01T12:00:00Z"
                }
            }]"#,
        )
        .unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        let record = store.get(3).unwrap().unwrap();
        assert!(record.logs.is_empty());
        assert!((record.state.health_score() - 96.0).abs() < 1e-9);
    }

    #[test]
    fn test_delete_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plants.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        let mut record = PlantRecord::new(1, "Aloe", "Aloe vera");
        record.logs.push(PlantLog::note("Repotted", Utc::now()));
        store.put(record).unwrap();
        assert!(store.delete(1).unwrap());
        assert!(!store.delete(1).unwrap());

        let reopened = JsonFileStore::open(&path).unwrap();
        assert!(reopened.get(1).unwrap().is_none());
        assert!(!fs::read_to_string(&path).unwrap().contains("Repotted"));
    }

    #[test]
    fn test_failed_write_leaves_store_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub/plants.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        // A regular file where the parent directory should be
        fs::write(dir.path().join("sub"), "blocker").unwrap();

        assert!(store.put(PlantRecord::new(1, "Fern", "Nephrolepis")).is_err());

        assert!(store.get(1).unwrap().is_none());
        assert!(store.list().unwrap().is_empty());
        assert_eq!(store.next_id().unwrap(), 1);
    }

    #[test]
    fn test_failed_delete_keeps_record() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        let path = sub.join("plants.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        store.put(PlantRecord::new(1, "Fern", "Nephrolepis")).unwrap();

        fs::remove_dir_all(&sub).unwrap();
        fs::write(&sub, "blocker").unwrap();

        assert!(store.delete(1).is_err());
        assert!(store.get(1).unwrap().is_some());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plants.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            JsonFileStore::open(&path),
            Err(GreenTwinError::Serialization(_))
        ));
    }
}
