use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{BackendKind, Medium, MediumResult, Op};
use crate::config::IndexedSettings;
use crate::error::MediumError;

/// A stored object: primary key plus value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub value: Value,
}

/// An asynchronous, versioned, object-store database (IndexedDB-like).
///
/// Every request completes on a later poll, after the configured latency.
/// Clones share the same databases.
#[derive(Debug, Clone, Default)]
pub struct IdbFactory {
    inner: Arc<FactoryInner>,
}

#[derive(Debug, Default)]
struct FactoryInner {
    databases: Mutex<HashMap<String, DatabaseState>>,
    latency: Mutex<Duration>,
    failures: AtomicUsize,
    opens: AtomicUsize,
}

#[derive(Debug, Default)]
struct DatabaseState {
    version: u32,
    stores: HashMap<String, BTreeMap<String, Record>>,
}

impl IdbFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay applied to every request before it completes.
    pub fn set_latency(&self, latency: Duration) {
        *self.inner.latency.lock() = latency;
    }

    /// Make the next `count` requests fail.
    pub fn fail_next(&self, count: usize) {
        self.inner.failures.store(count, Ordering::SeqCst);
    }

    /// Number of successful `open` calls so far.
    pub fn open_count(&self) -> usize {
        self.inner.opens.load(Ordering::SeqCst)
    }

    /// Open `name` at `version`, running `on_upgrade` when the database is
    /// new or older than `version`.
    pub async fn open(
        &self,
        name: &str,
        version: u32,
        on_upgrade: impl FnOnce(&IdbDatabase),
    ) -> MediumResult<IdbDatabase> {
        self.request().await?;

        let upgrade = {
            let mut databases = self.inner.databases.lock();
            let state = databases.entry(name.to_string()).or_default();
            if state.version > version {
                return Err(MediumError::Database(format!(
                    "version error: {name} is at {}, requested {version}",
                    state.version
                )));
            }
            let upgrade = state.version < version;
            state.version = version;
            upgrade
        };

        let db = IdbDatabase {
            factory: self.clone(),
            name: name.to_string(),
        };
        if upgrade {
            on_upgrade(&db);
        }
        self.inner.opens.fetch_add(1, Ordering::SeqCst);
        Ok(db)
    }

    /// Snapshot of one record, bypassing the request queue.
    pub fn peek(&self, database: &str, store: &str, key: &str) -> Option<Record> {
        self.inner
            .databases
            .lock()
            .get(database)?
            .stores
            .get(store)?
            .get(key)
            .cloned()
    }

    async fn request(&self) -> MediumResult<()> {
        let latency = *self.inner.latency.lock();
        if latency.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(latency).await;
        }

        let injected = self
            .inner
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match injected {
            Ok(_) => Err(MediumError::Database("request failed".to_string())),
            Err(_) => Ok(()),
        }
    }

    fn with_store<R>(
        &self,
        database: &str,
        store: &str,
        f: impl FnOnce(&mut BTreeMap<String, Record>) -> R,
    ) -> MediumResult<R> {
        let mut databases = self.inner.databases.lock();
        let records = databases
            .get_mut(database)
            .and_then(|db| db.stores.get_mut(store))
            .ok_or_else(|| {
                MediumError::Database(format!("object store not found: {database}/{store}"))
            })?;
        Ok(f(records))
    }
}

/// An open connection to one database.
#[derive(Debug, Clone)]
pub struct IdbDatabase {
    factory: IdbFactory,
    name: String,
}

impl IdbDatabase {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn object_store_names(&self) -> Vec<String> {
        let databases = self.factory.inner.databases.lock();
        let mut names: Vec<String> = databases
            .get(&self.name)
            .map(|db| db.stores.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn contains_object_store(&self, store: &str) -> bool {
        self.factory
            .inner
            .databases
            .lock()
            .get(&self.name)
            .is_some_and(|db| db.stores.contains_key(store))
    }

    pub fn create_object_store(&self, store: &str) {
        if let Some(db) = self.factory.inner.databases.lock().get_mut(&self.name) {
            db.stores.entry(store.to_string()).or_default();
        }
    }

    pub async fn get(&self, store: &str, key: &str) -> MediumResult<Option<Record>> {
        self.factory.request().await?;
        self.factory
            .with_store(&self.name, store, |records| records.get(key).cloned())
    }

    pub async fn put(&self, store: &str, record: Record) -> MediumResult<()> {
        self.factory.request().await?;
        self.factory.with_store(&self.name, store, |records| {
            records.insert(record.id.clone(), record);
        })
    }

    pub async fn delete(&self, store: &str, key: &str) -> MediumResult<()> {
        self.factory.request().await?;
        self.factory.with_store(&self.name, store, |records| {
            records.remove(key);
        })
    }
}

/// Persists values as `{id, value}` records in a single object store.
///
/// Each operation opens the database (creating the object store on
/// upgrade) and completes asynchronously.
#[derive(Debug, Clone)]
pub struct IndexedMedium {
    factory: IdbFactory,
    settings: Arc<IndexedSettings>,
}

impl IndexedMedium {
    pub fn new(factory: IdbFactory, settings: IndexedSettings) -> Self {
        Self {
            factory,
            settings: Arc::new(settings),
        }
    }
}

async fn open_store(factory: &IdbFactory, settings: &IndexedSettings) -> MediumResult<IdbDatabase> {
    factory
        .open(&settings.database, settings.version, |db| {
            if !db.contains_object_store(&settings.object_store) {
                db.create_object_store(&settings.object_store);
            }
        })
        .await
}

impl Medium for IndexedMedium {
    fn kind(&self) -> BackendKind {
        BackendKind::Indexed
    }

    fn read(&self, key: &str) -> Op<Option<Value>> {
        let factory = self.factory.clone();
        let settings = Arc::clone(&self.settings);
        let key = key.to_string();
        Op::Pending(
            async move {
                let db = open_store(&factory, &settings).await?;
                let record = db.get(&settings.object_store, &key).await?;
                Ok(record.map(|record| record.value))
            }
            .boxed(),
        )
    }

    fn write(&self, key: &str, value: &Value) -> Op<()> {
        let factory = self.factory.clone();
        let settings = Arc::clone(&self.settings);
        let record = Record {
            id: key.to_string(),
            value: value.clone(),
        };
        Op::Pending(
            async move {
                let db = open_store(&factory, &settings).await?;
                db.put(&settings.object_store, record).await
            }
            .boxed(),
        )
    }

    fn delete(&self, key: &str) -> Op<()> {
        let factory = self.factory.clone();
        let settings = Arc::clone(&self.settings);
        let key = key.to_string();
        Op::Pending(
            async move {
                let db = open_store(&factory, &settings).await?;
                db.delete(&settings.object_store, &key).await
            }
            .boxed(),
        )
    }
}
