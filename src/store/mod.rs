//! Persisted stores and the registry that names them.
//!
//! A [`Backend`] binds one reactive [`Cell`](crate::Cell) to one
//! [`Medium`](crate::medium::Medium). The [`Registry`] hands out backends
//! by name, at most one per name.

mod backend;
mod dispatch;
mod registry;
mod report;

pub use backend::{Backend, StoreContext};
pub use registry::{Registry, RegistryBuilder, SENTINEL};
pub use report::{ErrorObserver, Reporter};
