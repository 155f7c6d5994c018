//! In-memory plant store

use std::collections::BTreeMap;

use crate::utils::Result;

use super::{PlantId, PlantRecord, PlantStore};

/// Plant store backed by an ordered map
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    records: BTreeMap<PlantId, PlantRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn from_records(records: BTreeMap<PlantId, PlantRecord>) -> Self {
        Self { records }
    }

    pub(crate) fn records(&self) -> &BTreeMap<PlantId, PlantRecord> {
        &self.records
    }
}

impl PlantStore for InMemoryStore {
    fn get(&self, id: PlantId) -> Result<Option<PlantRecord>> {
        Ok(self.records.get(&id).cloned())
    }

    fn put(&mut self, record: PlantRecord) -> Result<()> {
        self.records.insert(record.id, record);
        Ok(())
    }

    fn delete(&mut self, id: PlantId) -> Result<bool> {
        Ok(self.records.remove(&id).is_some())
    }

    fn list(&self) -> Result<Vec<PlantRecord>> {
        Ok(self.records.values().cloned().collect())
    }
}
