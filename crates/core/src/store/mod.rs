//! Persistence collaborator.
//!
//! The engine never assumes anything about storage beyond the [`Store`]
//! capability set, so a durable backend can replace [`InMemoryStore`]
//! without touching mission logic.

mod records;

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::error::StoreError;

pub use records::{PerformanceLog, Session, Team};

/// A value addressable by a string id within a named collection.
pub trait Record: Clone + Send + Sync + 'static {
    /// Collection name used in error messages.
    const COLLECTION: &'static str;

    /// Primary key of the record.
    fn id(&self) -> &str;
}

/// Keyed storage for one record type.
pub trait Store<T: Record>: Send + Sync {
    /// Fetch a copy of the record.
    fn get(&self, id: &str) -> Result<T, StoreError>;

    /// Insert a new record, rejecting duplicate ids.
    fn create(&self, record: T) -> Result<T, StoreError>;

    /// Apply `patch` to the stored record and return the updated copy.
    fn update(&self, id: &str, patch: &mut dyn FnMut(&mut T)) -> Result<T, StoreError>;

    /// Every stored record, in no particular order.
    fn list(&self) -> Vec<T>;

    /// Delete and return the record.
    fn remove(&self, id: &str) -> Result<T, StoreError>;
}

/// Store kept in process memory.
pub struct InMemoryStore<T> {
    records: RwLock<HashMap<String, T>>,
}

impl<T: Record> InMemoryStore<T> {
    /// Empty store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Empty store behind an `Arc`, ready to share.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl<T: Record> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found<T: Record>(id: &str) -> StoreError {
    StoreError::NotFound {
        collection: T::COLLECTION,
        id: id.to_string(),
    }
}

impl<T: Record> Store<T> for InMemoryStore<T> {
    fn get(&self, id: &str) -> Result<T, StoreError> {
        self.records
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| not_found::<T>(id))
    }

    fn create(&self, record: T) -> Result<T, StoreError> {
        let mut records = self.records.write();
        if records.contains_key(record.id()) {
            return Err(StoreError::Duplicate {
                collection: T::COLLECTION,
                id: record.id().to_string(),
            });
        }
        records.insert(record.id().to_string(), record.clone());
        Ok(record)
    }

    fn update(&self, id: &str, patch: &mut dyn FnMut(&mut T)) -> Result<T, StoreError> {
        let mut records = self.records.write();
        let record = records.get_mut(id).ok_or_else(|| not_found::<T>(id))?;
        patch(record);
        Ok(record.clone())
    }

    fn list(&self) -> Vec<T> {
        self.records.read().values().cloned().collect()
    }

    fn remove(&self, id: &str) -> Result<T, StoreError> {
        self.records
            .write()
            .remove(id)
            .ok_or_else(|| not_found::<T>(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn create_get_update_remove() {
        let store = InMemoryStore::<Team>::new();
        let team = Team::new("t1".into(), "Night Shift".into(), Utc::now());
        store.create(team.clone()).unwrap();
        assert_eq!(
            store.create(team).unwrap_err(),
            StoreError::Duplicate {
                collection: "teams",
                id: "t1".into()
            }
        );

        let updated = store
            .update("t1", &mut |team| team.total_score += 40)
            .unwrap();
        assert_eq!(updated.total_score, 40);
        assert_eq!(store.get("t1").unwrap().total_score, 40);
        assert_eq!(store.list().len(), 1);

        store.remove("t1").unwrap();
        assert!(store.is_empty());
        assert!(matches!(
            store.get("t1"),
            Err(StoreError::NotFound { collection: "teams", .. })
        ));
    }
}
