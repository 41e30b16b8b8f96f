use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

type Observer = Arc<dyn Fn() + Send + Sync>;

/// Dependency graph shared by every primitive created in one runtime.
pub struct RuntimeInner {
    // observer currently running on each thread
    current_observer: HashMap<ThreadId, usize>,
    // signal ID -> observers that read it, ordered by registration
    dependencies: HashMap<usize, BTreeSet<usize>>,
    // observer ID -> signals it read
    observer_deps: HashMap<usize, BTreeSet<usize>>,
    observers: HashMap<usize, Observer>,
    memo_dirty: HashMap<usize, bool>,
}

impl RuntimeInner {
    fn new() -> Self {
        Self {
            current_observer: HashMap::new(),
            dependencies: HashMap::new(),
            observer_deps: HashMap::new(),
            observers: HashMap::new(),
            memo_dirty: HashMap::new(),
        }
    }

    /// Forget an observer (effect or memo) and every edge pointing at it.
    pub fn remove_observer(&mut self, observer_id: usize) {
        self.observers.remove(&observer_id);
        self.memo_dirty.remove(&observer_id);

        if let Some(old_deps) = self.observer_deps.remove(&observer_id) {
            for signal_id in old_deps {
                if let Some(deps) = self.dependencies.get_mut(&signal_id) {
                    deps.remove(&observer_id);
                }
            }
        }
        // Anything that observed a memo loses that edge too.
        self.dependencies.remove(&observer_id);
    }

    fn clear(&mut self) {
        self.current_observer.clear();
        self.dependencies.clear();
        self.observer_deps.clear();
        self.observers.clear();
        self.memo_dirty.clear();
    }
}

/// Hybrid reactive runtime for managing reactive primitives.
///
/// Supports both a global runtime (default) and scoped runtimes for
/// isolation. Every primitive remembers the runtime it was created in, so
/// notifications issued from another thread (an async hydration finishing
/// on a tokio worker, say) still reach the right observers.
///
/// # Examples
///
/// ```
/// use keepsake::runtime::ReactiveRuntime;
/// use keepsake::Cell;
///
/// ReactiveRuntime::scope(|| {
///     let cell = Cell::new(0);
///     assert_eq!(cell.get().unwrap(), 0);
/// });
/// ```
pub struct ReactiveRuntime {
    next_id: AtomicUsize,
    inner: Arc<Mutex<RuntimeInner>>,
}

thread_local! {
    static RUNTIME_STACK: RefCell<Vec<Arc<ReactiveRuntime>>> = const { RefCell::new(Vec::new()) };
}

impl ReactiveRuntime {
    fn new() -> Arc<Self> {
        Arc::new(ReactiveRuntime {
            next_id: AtomicUsize::new(0),
            inner: Arc::new(Mutex::new(RuntimeInner::new())),
        })
    }

    /// Run a function with a fresh isolated runtime.
    ///
    /// The runtime is dropped when the function returns, unless a primitive
    /// created inside it is still alive.
    pub fn scope<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let runtime = Self::new();
        Self::with_runtime(runtime, f)
    }

    /// Get or create the global runtime (fallback).
    pub fn global() -> Arc<Self> {
        use std::sync::OnceLock;
        static RUNTIME: OnceLock<Arc<ReactiveRuntime>> = OnceLock::new();
        Arc::clone(RUNTIME.get_or_init(Self::new))
    }

    /// Get the current reactive runtime (scoped or global fallback).
    pub fn current() -> Arc<Self> {
        RUNTIME_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .cloned()
                .unwrap_or_else(Self::global)
        })
    }

    /// Run a function with a specific runtime as the current context.
    pub fn with_runtime<F, R>(runtime: Arc<Self>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().push(runtime);
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// Clear all observers, dependencies, and state from this runtime.
    pub fn clear(&self) {
        self.inner.lock().clear();
        self.next_id.store(0, Ordering::SeqCst);
    }

    /// Get a handle to the inner graph state.
    pub fn inner(&self) -> Arc<Mutex<RuntimeInner>> {
        Arc::clone(&self.inner)
    }

    /// Generate the next unique ID for a reactive primitive.
    pub fn next_id(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Track a read of a signal by the current observer.
    pub fn track_read(&self, signal_id: usize) {
        let mut ctx = self.inner.lock();
        if let Some(current_observer) = ctx.current_observer.get(&thread::current().id()).copied() {
            ctx.dependencies
                .entry(signal_id)
                .or_default()
                .insert(current_observer);
            ctx.observer_deps
                .entry(current_observer)
                .or_default()
                .insert(signal_id);
        }
    }

    /// Notify all observers that depend on a signal.
    ///
    /// Effects run synchronously, in registration order, before this
    /// returns. No lock is held while an effect runs.
    pub fn notify_observers(&self, signal_id: usize) {
        let observers = {
            let ctx = self.inner.lock();
            ctx.dependencies
                .get(&signal_id)
                .map(|obs| obs.iter().copied().collect::<Vec<_>>())
        };

        for observer_id in observers.unwrap_or_default() {
            self.mark_observer_dirty(observer_id);
        }
    }

    /// Mark an observer (memo or effect) as dirty and propagate to dependents.
    fn mark_observer_dirty(&self, observer_id: usize) {
        let mut ctx = self.inner.lock();

        if let Some(already_dirty) = ctx.memo_dirty.get(&observer_id).copied() {
            if already_dirty {
                return;
            }
            ctx.memo_dirty.insert(observer_id, true);

            let dependents = ctx
                .dependencies
                .get(&observer_id)
                .map(|deps| deps.iter().copied().collect::<Vec<_>>());
            drop(ctx);

            for dependent_id in dependents.unwrap_or_default() {
                self.mark_observer_dirty(dependent_id);
            }
            return;
        }

        let effect = ctx.observers.get(&observer_id).cloned();
        drop(ctx);

        if let Some(effect) = effect {
            self.with_observer(observer_id, || effect());
        }
    }

    /// Register the function run when an observer is notified.
    pub fn create_observer<F>(&self, observer_id: usize, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut ctx = self.inner.lock();

        if let Some(old_deps) = ctx.observer_deps.remove(&observer_id) {
            for signal_id in old_deps {
                if let Some(deps) = ctx.dependencies.get_mut(&signal_id) {
                    deps.remove(&observer_id);
                }
            }
        }
        ctx.observers.insert(observer_id, Arc::new(f));
    }

    /// Run a function with a specific observer as the current context.
    pub fn with_observer<F, R>(&self, observer_id: usize, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let thread = thread::current().id();
        let prev = self.inner.lock().current_observer.insert(thread, observer_id);
        let result = f();
        let mut ctx = self.inner.lock();
        match prev {
            Some(prev) => ctx.current_observer.insert(thread, prev),
            None => ctx.current_observer.remove(&thread),
        };
        result
    }

    /// Register a memo and mark it as dirty initially.
    pub fn register_memo(&self, memo_id: usize) {
        self.inner.lock().memo_dirty.insert(memo_id, true);
    }

    /// Check if a memo is dirty (needs recomputation).
    pub fn is_memo_dirty(&self, memo_id: usize) -> bool {
        self.inner
            .lock()
            .memo_dirty
            .get(&memo_id)
            .copied()
            .unwrap_or(true)
    }

    /// Mark a memo as clean (after recomputation).
    pub fn mark_memo_clean(&self, memo_id: usize) {
        self.inner.lock().memo_dirty.insert(memo_id, false);
    }

    /// Drop an observer and its edges from the graph.
    pub fn dispose(&self, observer_id: usize) {
        self.inner.lock().remove_observer(observer_id);
    }

    /// Number of live observers (effects and memos).
    pub fn observer_count(&self) -> usize {
        let ctx = self.inner.lock();
        ctx.observers.len() + ctx.memo_dirty.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn effects_run_in_registration_order() {
        ReactiveRuntime::scope(|| {
            let runtime = ReactiveRuntime::current();
            let signal = runtime.next_id();
            let log = Arc::new(Mutex::new(Vec::new()));

            for tag in ["first", "second", "third"] {
                let id = runtime.next_id();
                let log = Arc::clone(&log);
                runtime.create_observer(id, move || log.lock().push(tag));
                runtime.with_observer(id, || runtime.track_read(signal));
            }

            runtime.notify_observers(signal);
            assert_eq!(*log.lock(), vec!["first", "second", "third"]);
        });
    }

    #[test]
    fn disposed_observer_is_not_notified() {
        ReactiveRuntime::scope(|| {
            let runtime = ReactiveRuntime::current();
            let signal = runtime.next_id();
            let observer = runtime.next_id();
            let runs = Arc::new(AtomicUsize::new(0));
            let runs_clone = Arc::clone(&runs);

            runtime.create_observer(observer, move || {
                runs_clone.fetch_add(1, Ordering::SeqCst);
            });
            runtime.with_observer(observer, || runtime.track_read(signal));
            runtime.dispose(observer);
            runtime.notify_observers(signal);

            assert_eq!(runs.load(Ordering::SeqCst), 0);
            assert_eq!(runtime.observer_count(), 0);
        });
    }

    #[test]
    fn clear_resets_ids() {
        let runtime = ReactiveRuntime::new();
        runtime.next_id();
        runtime.next_id();
        runtime.clear();
        assert_eq!(runtime.next_id(), 0);
    }
}
