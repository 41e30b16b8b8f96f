//! The host facilities stores persist into.

use crate::medium::{CookieJar, IdbFactory, Location, StorageArea, WebStorage};

const DEFAULT_HREF: &str = "http://localhost:3000/";

/// Everything a page gets from its browser that stores can persist into.
///
/// Clones share state, so handing a clone of the same `Browser` to a new
/// registry models a page reload: persisted stores hydrate from it, while
/// in-memory stores start over.
#[derive(Debug, Clone)]
pub struct Browser {
    pub local_storage: WebStorage,
    pub session_storage: WebStorage,
    pub cookies: CookieJar,
    pub location: Location,
    pub indexed_db: IdbFactory,
}

impl Browser {
    /// A fresh browser showing `href`.
    pub fn new(href: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            local_storage: WebStorage::new(StorageArea::Local),
            session_storage: WebStorage::new(StorageArea::Session),
            cookies: CookieJar::new(),
            location: Location::new(href)?,
            indexed_db: IdbFactory::new(),
        })
    }

    /// End the browsing session, dropping session storage.
    pub fn end_session(&self) {
        self.session_storage.clear();
    }
}

impl Default for Browser {
    fn default() -> Self {
        Self::new(DEFAULT_HREF).expect("default href is a valid url")
    }
}
