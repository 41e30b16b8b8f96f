use crate::error::CellError;
use crate::runtime::ReactiveRuntime;
use crate::signal::{Effect, Memo, Signal};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Lifecycle of a [`Cell`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Active,
    Destroyed,
}

/// A single reactive value with derived computations and effects.
///
/// The cell owns everything derived from it: [`destroy`](Cell::destroy)
/// tears down its computations and effects and clears the value. Clones
/// share the same underlying state.
///
/// ```
/// use keepsake::{Cell, CellError};
///
/// let cell = Cell::new(2);
/// let squared = cell.derive(|n| n * n).unwrap();
/// assert_eq!(squared.get(), Ok(4));
///
/// cell.set(3).unwrap();
/// assert_eq!(squared.get(), Ok(9));
///
/// cell.destroy().unwrap();
/// assert_eq!(cell.get(), Err(CellError::Destroyed));
/// assert_eq!(squared.get(), Err(CellError::Destroyed));
/// ```
pub struct Cell<T> {
    inner: Arc<CellInner<T>>,
}

struct CellInner<T> {
    value: Signal<Option<T>>,
    lifecycle: Arc<RwLock<Lifecycle>>,
    computeds: Mutex<Vec<Box<dyn Fn() + Send + Sync>>>,
    effects: Mutex<Vec<Effect>>,
    writes: AtomicU64,
    // serializes writers; effects may re-enter on the same thread
    writer: ReentrantMutex<()>,
}

impl<T> Clone for Cell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Cell<T> {
    /// Create an active cell holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(CellInner {
                value: Signal::new(Some(initial)),
                lifecycle: Arc::new(RwLock::new(Lifecycle::Active)),
                computeds: Mutex::new(Vec::new()),
                effects: Mutex::new(Vec::new()),
                writes: AtomicU64::new(0),
                writer: ReentrantMutex::new(()),
            }),
        }
    }

    /// Current value, tracked by any running memo or effect.
    pub fn get(&self) -> Result<T, CellError> {
        self.ensure_active()?;
        self.inner.value.get().ok_or(CellError::Destroyed)
    }

    /// Replace the value and notify dependents.
    ///
    /// There is no equality check: assigning the current value again still
    /// re-runs every effect.
    pub fn set(&self, value: T) -> Result<(), CellError> {
        let _writer = self.inner.writer.lock();
        self.ensure_active()?;
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.value.set(Some(value));
        Ok(())
    }

    /// Set `value` only if no write was accepted since `version` was read.
    ///
    /// Returns whether the value was applied. The check and the write
    /// happen under the same writer lock as [`set`](Cell::set).
    pub fn set_if_unchanged(&self, version: u64, value: T) -> Result<bool, CellError> {
        let _writer = self.inner.writer.lock();
        self.ensure_active()?;
        if self.version() != version {
            return Ok(false);
        }
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.value.set(Some(value));
        Ok(true)
    }

    /// Mutate the value in place and notify dependents.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> Result<(), CellError> {
        let _writer = self.inner.writer.lock();
        self.ensure_active()?;
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.value.update(|value| {
            if let Some(value) = value.as_mut() {
                f(value);
            }
        });
        Ok(())
    }

    /// Derive a read-only value that follows this cell.
    pub fn derive<U, F>(&self, f: F) -> Result<Computed<U>, CellError>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        self.ensure_active()?;
        let source = self.inner.value.clone();
        let memo = ReactiveRuntime::with_runtime(Arc::clone(source.runtime()), || {
            Memo::new(move || source.with(|value| value.as_ref().map(&f)))
        });

        let disposer = memo.clone();
        self.inner
            .computeds
            .lock()
            .push(Box::new(move || disposer.dispose()));

        Ok(Computed {
            memo,
            lifecycle: Arc::clone(&self.inner.lifecycle),
        })
    }

    /// Run `f` with the current value now and after every change.
    pub fn register_effect<F>(&self, f: F) -> Result<(), CellError>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.ensure_active()?;
        let source = self.inner.value.clone();
        let effect = ReactiveRuntime::with_runtime(Arc::clone(source.runtime()), || {
            Effect::new(move || {
                // Cloned out so the effect may write back into this cell.
                if let Some(value) = source.get() {
                    f(&value);
                }
            })
        });
        self.inner.effects.lock().push(effect);
        Ok(())
    }

    /// Tear down computations and effects and clear the value.
    ///
    /// The cell is inert afterwards: every operation, including reads of
    /// previously derived values, fails with [`CellError::Destroyed`].
    pub fn destroy(&self) -> Result<(), CellError> {
        let _writer = self.inner.writer.lock();
        {
            let mut lifecycle = self.inner.lifecycle.write();
            if *lifecycle == Lifecycle::Destroyed {
                return Err(CellError::Destroyed);
            }
            *lifecycle = Lifecycle::Destroyed;
        }

        let computeds = std::mem::take(&mut *self.inner.computeds.lock());
        for dispose in computeds {
            dispose();
        }
        let effects = std::mem::take(&mut *self.inner.effects.lock());
        drop(effects);

        self.inner.value.set(None);
        Ok(())
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        *self.inner.lifecycle.read()
    }

    pub fn is_destroyed(&self) -> bool {
        self.lifecycle() == Lifecycle::Destroyed
    }

    /// The underlying signal, for composing with other reactive code.
    ///
    /// Holds `None` once the cell is destroyed.
    pub fn signal(&self) -> Signal<Option<T>> {
        self.inner.value.clone()
    }

    /// Number of writes accepted so far.
    pub fn version(&self) -> u64 {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Whether both handles refer to the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn ensure_active(&self) -> Result<(), CellError> {
        match *self.inner.lifecycle.read() {
            Lifecycle::Active => Ok(()),
            Lifecycle::Destroyed => Err(CellError::Destroyed),
        }
    }
}

/// A read-only value derived from a [`Cell`].
#[derive(Clone)]
pub struct Computed<U> {
    memo: Memo<Option<U>>,
    lifecycle: Arc<RwLock<Lifecycle>>,
}

impl<U: Clone + Send + Sync + 'static> Computed<U> {
    /// Current derived value, recomputed if the source changed.
    pub fn get(&self) -> Result<U, CellError> {
        if *self.lifecycle.read() == Lifecycle::Destroyed {
            return Err(CellError::Destroyed);
        }
        self.memo.get().ok_or(CellError::Destroyed)
    }
}
