use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{btree_map, BTreeMap};
use std::sync::Arc;
use tokio::runtime::Handle;

use super::backend::{Backend, StoreContext};
use super::dispatch::Dispatcher;
use super::report::ErrorObserver;
use crate::browser::Browser;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::medium::{
    BackendKind, CookieMedium, IndexedMedium, Medium, MemoryMedium, StorageMedium, UrlMedium,
};

/// Value a store holds when its medium has nothing saved.
pub const SENTINEL: i64 = 0;

/// Named, singleton stores over one [`Browser`].
///
/// Names are unique: each name maps to exactly one backend for as long as
/// it is registered, and [`get`](Registry::get) always hands back that same
/// instance.
///
/// ```
/// use keepsake::{Browser, Registry, StoreError};
/// use serde_json::json;
///
/// let browser = Browser::default();
/// let registry = Registry::new(browser.clone());
///
/// registry.create("local", "theme", Some(json!("dark"))).unwrap();
/// assert!(matches!(
///     registry.create("session", "theme", None),
///     Err(StoreError::DuplicateName(_))
/// ));
///
/// // A new registry over the same browser is a page reload.
/// let reloaded = Registry::new(browser);
/// let theme = reloaded.create("local", "theme", None).unwrap();
/// assert_eq!(theme.get().unwrap(), json!("dark"));
/// ```
pub struct Registry {
    browser: Browser,
    config: StoreConfig,
    context: StoreContext,
    entries: Mutex<BTreeMap<String, Entry>>,
    retired: Mutex<Vec<Arc<Dispatcher>>>,
}

struct Entry {
    kind: BackendKind,
    backend: Backend<Value>,
}

/// Builder for a [`Registry`].
pub struct RegistryBuilder {
    browser: Browser,
    config: StoreConfig,
    handle: Option<Handle>,
    observer: Option<ErrorObserver>,
}

impl RegistryBuilder {
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Runtime that drives the indexed medium.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Receive every persistence failure the stores absorb.
    pub fn on_error(mut self, observer: ErrorObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Registry {
        let mut context = StoreContext::new(self.config.project.clone());
        if let Some(handle) = self.handle {
            context = context.with_runtime(handle);
        }
        if let Some(observer) = self.observer {
            context = context.with_error_observer(observer);
        }

        Registry {
            browser: self.browser,
            config: self.config,
            context,
            entries: Mutex::new(BTreeMap::new()),
            retired: Mutex::new(Vec::new()),
        }
    }
}

impl Registry {
    pub fn new(browser: Browser) -> Self {
        Self::builder(browser).build()
    }

    pub fn builder(browser: Browser) -> RegistryBuilder {
        RegistryBuilder {
            browser,
            config: StoreConfig::default(),
            handle: None,
            observer: None,
        }
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Create and register the store `name` with the backend tagged `kind`.
    ///
    /// Fails with [`StoreError::DuplicateName`] if the name is taken (the
    /// existing store is left untouched), then with
    /// [`StoreError::UnknownBackendType`] for an unrecognized tag.
    ///
    /// No registry lock is held while the store hydrates, so an error
    /// observer may call back into the registry.
    pub fn create(&self, kind: &str, name: &str, initial: Option<Value>) -> StoreResult<Backend<Value>> {
        self.ensure_vacant(name)?;
        let kind: BackendKind = kind.parse()?;
        self.insert(kind, name, initial)
    }

    /// Like [`create`](Self::create), with an already-parsed backend kind.
    pub fn create_kind(
        &self,
        kind: BackendKind,
        name: &str,
        initial: Option<Value>,
    ) -> StoreResult<Backend<Value>> {
        self.ensure_vacant(name)?;
        self.insert(kind, name, initial)
    }

    fn ensure_vacant(&self, name: &str) -> StoreResult<()> {
        if self.entries.lock().contains_key(name) {
            return Err(StoreError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    fn insert(&self, kind: BackendKind, name: &str, initial: Option<Value>) -> StoreResult<Backend<Value>> {
        let backend = Backend::open(self.medium(kind), &self.context, name, Value::from(SENTINEL));
        if let Some(value) = initial {
            backend.set(value)?;
        }

        // Another caller may have registered the name while we hydrated.
        match self.entries.lock().entry(name.to_string()) {
            btree_map::Entry::Occupied(_) => {
                return Err(StoreError::DuplicateName(name.to_string()));
            }
            btree_map::Entry::Vacant(slot) => {
                slot.insert(Entry {
                    kind,
                    backend: backend.clone(),
                });
            }
        }
        tracing::debug!(store = name, %kind, "registered store");
        Ok(backend)
    }

    /// The registered store `name`.
    pub fn get(&self, name: &str) -> StoreResult<Backend<Value>> {
        self.entries
            .lock()
            .get(name)
            .map(|entry| entry.backend.clone())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    pub fn kind_of(&self, name: &str) -> StoreResult<BackendKind> {
        self.entries
            .lock()
            .get(name)
            .map(|entry| entry.kind)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    /// Remove the store `name`, deleting its medium entry.
    pub fn remove(&self, name: &str) -> StoreResult<()> {
        let entry = self
            .entries
            .lock()
            .remove(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        self.retire(entry)
    }

    /// Remove every store.
    pub fn clear_all(&self) {
        let entries = std::mem::take(&mut *self.entries.lock());
        for (name, entry) in entries {
            if let Err(err) = self.retire(entry) {
                tracing::debug!(store = %name, %err, "store was already removed");
            }
        }
    }

    // Keeps the dispatcher around only while its delete is still queued.
    fn retire(&self, entry: Entry) -> StoreResult<()> {
        let removed = entry.backend.remove();
        let dispatcher = entry.backend.dispatcher();

        let mut retired = self.retired.lock();
        retired.retain(|queued| queued.pending() > 0);
        if dispatcher.pending() > 0 {
            retired.push(dispatcher);
        }
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.lock().contains_key(name)
    }

    /// Registered names, in order.
    pub fn names(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Wait until every queued medium operation, including deletes issued
    /// by removals, has finished.
    pub async fn settle(&self) {
        let retired = std::mem::take(&mut *self.retired.lock());
        for dispatcher in retired {
            dispatcher.settle().await;
        }

        let live: Vec<Backend<Value>> = self
            .entries
            .lock()
            .values()
            .map(|entry| entry.backend.clone())
            .collect();
        for backend in live {
            backend.settle().await;
        }
    }

    /// Build the medium for a backend kind over this registry's browser.
    pub fn medium(&self, kind: BackendKind) -> Arc<dyn Medium> {
        match kind {
            BackendKind::Memory => Arc::new(MemoryMedium),
            BackendKind::Local => Arc::new(StorageMedium::new(self.browser.local_storage.clone())),
            BackendKind::Session => {
                Arc::new(StorageMedium::new(self.browser.session_storage.clone()))
            }
            BackendKind::Cookie => Arc::new(CookieMedium::new(
                self.browser.cookies.clone(),
                self.config.cookie.clone(),
            )),
            BackendKind::Url => Arc::new(UrlMedium::new(
                self.browser.location.clone(),
                self.config.url.history,
            )),
            BackendKind::Indexed => Arc::new(IndexedMedium::new(
                self.browser.indexed_db.clone(),
                self.config.indexed.clone(),
            )),
        }
    }
}
