use crate::runtime::ReactiveRuntime;
use parking_lot::RwLock;
use std::sync::Arc;

/// A memoized computed value that automatically tracks dependencies.
///
/// Memos only recompute when their dependencies change.
#[derive(Clone)]
pub struct Memo<T> {
    compute: Arc<dyn Fn() -> T + Send + Sync>,
    cached: Arc<RwLock<Option<T>>>,
    id: usize,
    runtime: Arc<ReactiveRuntime>,
}

impl<T: Clone + 'static> Memo<T> {
    /// Create a new memo with the given computation function.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let runtime = ReactiveRuntime::current();
        let id = runtime.next_id();
        runtime.register_memo(id);

        Self {
            compute: Arc::new(compute),
            cached: Arc::new(RwLock::new(None)),
            id,
            runtime,
        }
    }

    /// Get the current value, recomputing if necessary.
    pub fn get(&self) -> T {
        self.runtime.track_read(self.id);

        if !self.runtime.is_memo_dirty(self.id) {
            if let Some(value) = self.cached.read().as_ref() {
                return value.clone();
            }
        }

        let value = self.runtime.with_observer(self.id, || (self.compute)());
        *self.cached.write() = Some(value.clone());
        self.runtime.mark_memo_clean(self.id);
        value
    }

    /// Detach the memo from the reactive graph and drop its cached value.
    pub fn dispose(&self) {
        self.runtime.dispose(self.id);
        *self.cached.write() = None;
    }

    /// Get the memo's unique ID.
    pub fn id(&self) -> usize {
        self.id
    }
}

/// Create a new memoized computation.
///
/// # Example
///
/// ```
/// use keepsake::{create_memo, Signal};
///
/// let count = Signal::new(5);
/// let doubled = create_memo({
///     let count = count.clone();
///     move || count.get() * 2
/// });
/// assert_eq!(doubled.get(), 10);
/// ```
pub fn create_memo<T, F>(compute: F) -> Memo<T>
where
    T: Clone + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    Memo::new(compute)
}
