use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;

use super::dispatch::Dispatcher;
use super::report::{ErrorObserver, Reporter};
use crate::cell::{Cell, Computed};
use crate::config::StoreConfig;
use crate::error::{MediumError, Operation, StoreResult};
use crate::medium::{BackendKind, Medium, MediumResult, Op};

/// What every backend needs besides its medium.
#[derive(Clone, Debug)]
pub struct StoreContext {
    project: String,
    reporter: Reporter,
    handle: Option<Handle>,
}

impl Default for StoreContext {
    fn default() -> Self {
        Self::new(StoreConfig::default().project)
    }
}

impl StoreContext {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            reporter: Reporter::default(),
            handle: None,
        }
    }

    /// Runtime that drives asynchronous media. Without one, the runtime
    /// current at the time of the first asynchronous operation is used.
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn with_error_observer(mut self, observer: ErrorObserver) -> Self {
        self.reporter = Reporter::new(Some(observer));
        self
    }

    pub fn project(&self) -> &str {
        &self.project
    }
}

/// A reactive cell persisted into one medium.
///
/// Opening a backend reads the medium once and seeds the cell with what it
/// finds, then writes the resulting value back; from then on every change
/// to the cell is written back too. Medium
/// failures are reported, never returned: the in-memory value stays the
/// source of truth.
///
/// Clones are handles to the same store.
///
/// ```
/// use std::sync::Arc;
/// use keepsake::{Backend, StorageArea, StorageMedium, StoreContext, WebStorage};
///
/// let storage = WebStorage::new(StorageArea::Local);
/// let medium = Arc::new(StorageMedium::new(storage.clone()));
/// let context = StoreContext::new("health");
///
/// let theme = Backend::open(medium.clone(), &context, "theme", String::new());
/// theme.set("dark".to_string()).unwrap();
/// assert_eq!(storage.get_item("health:theme").as_deref(), Some("\"dark\""));
///
/// let reopened = Backend::open(medium, &context, "theme", String::new());
/// assert_eq!(reopened.get().unwrap(), "dark");
/// ```
pub struct Backend<T> {
    inner: Arc<BackendInner<T>>,
}

struct BackendInner<T> {
    name: String,
    key: String,
    medium: Arc<dyn Medium>,
    cell: Cell<T>,
    dispatcher: Arc<Dispatcher>,
    reporter: Reporter,
}

impl<T> fmt::Debug for Backend<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("name", &self.inner.name)
            .field("key", &self.inner.key)
            .field("kind", &self.inner.medium.kind())
            .finish()
    }
}

impl<T> Clone for Backend<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Backend<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Open the store `name` on `medium`, starting from `sentinel` when the
    /// medium holds nothing.
    pub fn open(medium: Arc<dyn Medium>, context: &StoreContext, name: &str, sentinel: T) -> Self {
        let key = medium.storage_key(&context.project, name);
        let backend = Self {
            inner: Arc::new(BackendInner {
                name: name.to_string(),
                key,
                cell: Cell::new(sentinel),
                dispatcher: Arc::new(Dispatcher::new(context.handle.clone())),
                reporter: context.reporter.clone(),
                medium,
            }),
        };

        backend.inner.hydrate();
        if backend.inner.medium.persistent() {
            BackendInner::wire(&backend.inner);
        }

        tracing::debug!(
            store = %backend.inner.name,
            key = %backend.inner.key,
            kind = %backend.kind(),
            "opened store"
        );
        backend
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Key the value is stored under in the medium.
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn kind(&self) -> BackendKind {
        self.inner.medium.kind()
    }

    pub fn cell(&self) -> &Cell<T> {
        &self.inner.cell
    }

    pub fn get(&self) -> StoreResult<T> {
        Ok(self.inner.cell.get()?)
    }

    pub fn set(&self, value: T) -> StoreResult<()> {
        Ok(self.inner.cell.set(value)?)
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) -> StoreResult<()> {
        Ok(self.inner.cell.update(f)?)
    }

    pub fn derive<U, F>(&self, f: F) -> StoreResult<Computed<U>>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        Ok(self.inner.cell.derive(f)?)
    }

    pub fn register_effect<F>(&self, f: F) -> StoreResult<()>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Ok(self.inner.cell.register_effect(f)?)
    }

    /// The full current address, for media that live in the URL.
    pub fn shareable_url(&self) -> Option<String> {
        self.inner.medium.shareable_url()
    }

    /// Destroy the cell and delete the medium entry.
    ///
    /// An asynchronous delete is queued behind any pending writes; use
    /// [`settle`](Self::settle) to wait for it.
    pub fn remove(&self) -> StoreResult<()> {
        self.inner.cell.destroy()?;
        let op = self.inner.medium.delete(&self.inner.key);
        self.inner.run(op, Operation::Delete);
        tracing::debug!(store = %self.inner.name, key = %self.inner.key, "removed store");
        Ok(())
    }

    pub fn is_removed(&self) -> bool {
        self.inner.cell.is_destroyed()
    }

    /// Wait for every queued medium operation to finish.
    pub async fn settle(&self) {
        self.inner.dispatcher.settle().await;
    }

    /// Whether both handles refer to the same store.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.inner.dispatcher)
    }
}

impl<T> BackendInner<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn hydrate(&self) {
        match self.medium.read(&self.key) {
            Op::Ready(result) => seed(&self.cell, &self.key, &self.reporter, result, None),
            Op::Pending(read) => {
                // A write that lands before the read resolves wins.
                let issued_at = self.cell.version();
                let cell = self.cell.clone();
                let key = self.key.clone();
                let reporter = self.reporter.clone();
                let job = async move {
                    let result = read.await;
                    seed(&cell, &key, &reporter, result, Some(issued_at));
                }
                .boxed();
                self.dispatch(job, Operation::Read);
            }
        }
    }

    fn wire(this: &Arc<Self>) {
        let backend: Weak<Self> = Arc::downgrade(this);
        // The registration-time run persists the sentinel or hydrated value.
        let wired = this.cell.register_effect(move |value| {
            if let Some(backend) = backend.upgrade() {
                backend.persist(value);
            }
        });
        if let Err(err) = wired {
            tracing::debug!(key = %this.key, %err, "store closed before persistence was wired");
        }
    }

    fn persist(&self, value: &T) {
        match serde_json::to_value(value) {
            Ok(encoded) => {
                let op = self.medium.write(&self.key, &encoded);
                self.run(op, Operation::Write);
            }
            Err(err) => self.reporter.report(&self.key, Operation::Write, err.into()),
        }
    }

    fn run(&self, op: Op<()>, operation: Operation) {
        match op {
            Op::Ready(Ok(())) => {}
            Op::Ready(Err(err)) => self.reporter.report(&self.key, operation, err),
            Op::Pending(future) => {
                let key = self.key.clone();
                let reporter = self.reporter.clone();
                let job = async move {
                    if let Err(err) = future.await {
                        reporter.report(&key, operation, err);
                    }
                }
                .boxed();
                self.dispatch(job, operation);
            }
        }
    }

    fn dispatch(&self, job: super::dispatch::Job, operation: Operation) {
        if let Err(err) = self.dispatcher.submit(job) {
            self.reporter.report(&self.key, operation, err);
        }
    }
}

/// Apply a hydration read. With `issued_at`, the value is dropped if the
/// cell was written after the read was issued.
fn seed<T>(
    cell: &Cell<T>,
    key: &str,
    reporter: &Reporter,
    result: MediumResult<Option<Value>>,
    issued_at: Option<u64>,
) where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    let decoded = result.and_then(|found| {
        found
            .map(serde_json::from_value::<T>)
            .transpose()
            .map_err(MediumError::from)
    });

    match decoded {
        Ok(Some(value)) => {
            let applied = match issued_at {
                Some(version) => cell.set_if_unchanged(version, value),
                None => cell.set(value).map(|()| true),
            };
            match applied {
                Ok(true) => tracing::debug!(key, "hydrated store"),
                Ok(false) => tracing::debug!(key, "discarding stale hydration"),
                Err(_) => {}
            }
        }
        Ok(None) => {}
        Err(err) => reporter.report(key, Operation::Read, err),
    }
}
