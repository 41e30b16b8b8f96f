//! Persistence media.
//!
//! A [`Medium`] is the small capability a backend needs from its storage:
//! read, write and delete a JSON value under a key. Synchronous media answer
//! with [`Op::Ready`]; asynchronous ones hand back a future in
//! [`Op::Pending`], which the owning backend queues and drives.
//!
//! The host-side facilities the media talk to ([`WebStorage`],
//! [`CookieJar`], [`Location`], [`IdbFactory`]) are plain shareable values,
//! bundled together in [`Browser`](crate::Browser).

mod cookie;
mod indexed;
mod memory;
mod url;
mod web_storage;

pub use self::cookie::{CookieJar, CookieMedium};
pub use self::indexed::{IdbDatabase, IdbFactory, IndexedMedium, Record};
pub use self::memory::MemoryMedium;
pub use self::url::{Location, UrlMedium};
pub use self::web_storage::{StorageArea, StorageMedium, WebStorage};

use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{MediumError, StoreError};

/// Outcome of a medium operation.
pub type MediumResult<T> = Result<T, MediumError>;

/// A medium operation that either finished inline or is still running.
pub enum Op<T> {
    Ready(MediumResult<T>),
    Pending(BoxFuture<'static, MediumResult<T>>),
}

impl<T> Op<T> {
    pub fn ok(value: T) -> Self {
        Op::Ready(Ok(value))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Op::Pending(_))
    }
}

impl<T> From<MediumResult<T>> for Op<T> {
    fn from(result: MediumResult<T>) -> Self {
        Op::Ready(result)
    }
}

/// Storage a backend persists its cell into.
pub trait Medium: Send + Sync + 'static {
    /// Which backend variant this medium implements.
    fn kind(&self) -> BackendKind;

    /// Key under which a store named `name` lives.
    fn storage_key(&self, project: &str, name: &str) -> String {
        format!("{project}:{name}")
    }

    /// Whether writes go anywhere. Non-persistent media get no
    /// persistence effect.
    fn persistent(&self) -> bool {
        true
    }

    fn read(&self, key: &str) -> Op<Option<Value>>;

    fn write(&self, key: &str, value: &Value) -> Op<()>;

    fn delete(&self, key: &str) -> Op<()>;

    /// Address at which the current state can be shared, if the medium
    /// has one.
    fn shareable_url(&self) -> Option<String> {
        None
    }
}

/// The six backend variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackendKind {
    Memory,
    Local,
    Session,
    Cookie,
    Url,
    Indexed,
}

impl BackendKind {
    pub const ALL: [BackendKind; 6] = [
        BackendKind::Memory,
        BackendKind::Local,
        BackendKind::Session,
        BackendKind::Cookie,
        BackendKind::Url,
        BackendKind::Indexed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Local => "local",
            BackendKind::Session => "session",
            BackendKind::Cookie => "cookie",
            BackendKind::Url => "url",
            BackendKind::Indexed => "indexed",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = StoreError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "memory" | "mySignal" => Ok(BackendKind::Memory),
            "local" | "localStore" => Ok(BackendKind::Local),
            "session" | "sessionStore" => Ok(BackendKind::Session),
            "cookie" | "cookieStore" => Ok(BackendKind::Cookie),
            "url" | "urlStore" => Ok(BackendKind::Url),
            "indexed" | "indexDbStore" => Ok(BackendKind::Indexed),
            other => Err(StoreError::UnknownBackendType(other.to_string())),
        }
    }
}
