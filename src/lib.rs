//! # Keepsake
//!
//! Reactive cells that persist themselves.
//!
//! Keepsake provides three layers:
//!
//! ## Signals (Low-level primitives)
//!
//! Fine-grained reactive primitives with automatic dependency tracking:
//! - `Signal<T>` - Reactive values that notify dependents when changed
//! - `Memo<T>` - Computed values that automatically track dependencies
//! - `Effect` - Side effects that run when dependencies change
//!
//! ## Cells
//!
//! - `Cell<T>` - One value with derived computations and effects, and an
//!   explicit `Active -> Destroyed` lifecycle
//!
//! ## Stores
//!
//! - `Backend<T>` - A cell hydrated from, and written back to, a medium:
//!   memory, local or session storage, cookies, the URL query string, or
//!   an asynchronous IndexedDB-like database
//! - `Registry` - Named singleton stores over one `Browser`
//!
//! Persistence is best-effort: medium failures are logged through
//! `tracing` and handed to an optional observer, while the in-memory value
//! stays authoritative.

pub mod browser;
pub mod cell;
pub mod config;
pub mod error;
pub mod form;
pub mod medium;
pub mod runtime;
pub mod signal;
pub mod store;

pub use browser::Browser;
pub use cell::{Cell, Computed, Lifecycle};
pub use config::{CookieSettings, HistoryMode, IndexedSettings, SameSitePolicy, StoreConfig, UrlSettings};
pub use error::{CellError, ConfigError, MediumError, MediumFailure, Operation, StoreError, StoreResult};
pub use form::{form_object, FormEvent, FormValue};
pub use medium::{
    BackendKind, CookieJar, CookieMedium, IdbFactory, IndexedMedium, Location, Medium,
    MemoryMedium, Op, StorageArea, StorageMedium, UrlMedium, WebStorage,
};
pub use signal::{create_effect, create_memo, Effect, Memo, Signal};
pub use store::{Backend, ErrorObserver, Registry, RegistryBuilder, StoreContext};
