use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::{BackendKind, Medium, MediumResult, Op};
use crate::error::MediumError;

/// Which web-storage area a [`WebStorage`] models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageArea {
    /// Survives across sessions and is shared between tabs.
    Local,
    /// Cleared when the browsing session ends.
    Session,
}

/// A string key-value storage area (`localStorage` / `sessionStorage`).
///
/// Clones share the same entries. An optional quota bounds the total
/// number of bytes held in keys and values.
#[derive(Debug, Clone)]
pub struct WebStorage {
    area: StorageArea,
    entries: Arc<RwLock<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl WebStorage {
    pub fn new(area: StorageArea) -> Self {
        Self {
            area,
            entries: Arc::new(RwLock::new(HashMap::new())),
            quota: None,
        }
    }

    /// Limit the area to `bytes` of keys plus values.
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    pub fn area(&self) -> StorageArea {
        self.area
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    pub fn set_item(&self, key: &str, value: &str) -> MediumResult<()> {
        let mut entries = self.entries.write();
        if let Some(quota) = self.quota {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(MediumError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn remove_item(&self, key: &str) {
        self.entries.write().remove(key);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Persists JSON text into a [`WebStorage`] area.
#[derive(Debug, Clone)]
pub struct StorageMedium {
    storage: WebStorage,
}

impl StorageMedium {
    pub fn new(storage: WebStorage) -> Self {
        Self { storage }
    }
}

impl Medium for StorageMedium {
    fn kind(&self) -> BackendKind {
        match self.storage.area() {
            StorageArea::Local => BackendKind::Local,
            StorageArea::Session => BackendKind::Session,
        }
    }

    fn read(&self, key: &str) -> Op<Option<Value>> {
        let parsed = match self.storage.get_item(key) {
            Some(text) if !text.is_empty() => serde_json::from_str(&text).map(Some),
            _ => Ok(None),
        };
        Op::Ready(parsed.map_err(MediumError::from))
    }

    fn write(&self, key: &str, value: &Value) -> Op<()> {
        Op::Ready(self.storage.set_item(key, &value.to_string()))
    }

    fn delete(&self, key: &str) -> Op<()> {
        self.storage.remove_item(key);
        Op::ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ready<T>(op: Op<T>) -> MediumResult<T> {
        match op {
            Op::Ready(result) => result,
            Op::Pending(_) => panic!("web storage never suspends"),
        }
    }

    #[test]
    fn values_are_stored_as_json_text() {
        let storage = WebStorage::new(StorageArea::Local);
        let medium = StorageMedium::new(storage.clone());

        ready(medium.write("health:theme", &json!("dark"))).unwrap();
        assert_eq!(storage.get_item("health:theme").as_deref(), Some("\"dark\""));
        assert_eq!(ready(medium.read("health:theme")), Ok(Some(json!("dark"))));

        ready(medium.delete("health:theme")).unwrap();
        assert_eq!(ready(medium.read("health:theme")), Ok(None));
    }

    #[test]
    fn corrupt_text_is_a_serialization_error() {
        let storage = WebStorage::new(StorageArea::Session);
        storage.set_item("health:broken", "{not json").unwrap();
        let medium = StorageMedium::new(storage);

        assert_eq!(medium.kind(), BackendKind::Session);
        assert!(matches!(
            ready(medium.read("health:broken")),
            Err(MediumError::Serialization(_))
        ));
    }

    #[test]
    fn quota_rejects_oversized_writes() {
        let storage = WebStorage::new(StorageArea::Local).with_quota(16);
        storage.set_item("a", "1234").unwrap();

        let err = storage.set_item("b", "0123456789abcdef").unwrap_err();
        assert!(matches!(err, MediumError::QuotaExceeded { quota: 16, .. }));
        assert!(!storage.contains_key("b"));

        // Overwriting an entry only counts its new size.
        storage.set_item("a", "0123456789").unwrap();
        assert_eq!(storage.len(), 1);
    }
}
