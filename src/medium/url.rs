use ::url::Url;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

use super::{BackendKind, Medium, Op};
use crate::config::HistoryMode;
use crate::error::MediumError;

/// The page's current address and session history.
///
/// History updates (`replace_state` / `push_state`) change the address
/// without a navigation; `navigate` models a full page load.
#[derive(Debug, Clone)]
pub struct Location {
    state: Arc<Mutex<LocationState>>,
}

#[derive(Debug)]
struct LocationState {
    current: Url,
    history: Vec<Url>,
    navigations: usize,
}

impl Location {
    pub fn new(href: &str) -> Result<Self, ::url::ParseError> {
        let current = Url::parse(href)?;
        Ok(Self {
            state: Arc::new(Mutex::new(LocationState {
                history: vec![current.clone()],
                current,
                navigations: 0,
            })),
        })
    }

    pub fn href(&self) -> String {
        self.state.lock().current.to_string()
    }

    pub fn url(&self) -> Url {
        self.state.lock().current.clone()
    }

    /// Raw (decoded) value of a query parameter.
    pub fn search_param(&self, name: &str) -> Option<String> {
        self.state
            .lock()
            .current
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    pub fn replace_state(&self, url: Url) {
        let mut state = self.state.lock();
        if let Some(entry) = state.history.last_mut() {
            *entry = url.clone();
        }
        state.current = url;
    }

    pub fn push_state(&self, url: Url) {
        let mut state = self.state.lock();
        state.history.push(url.clone());
        state.current = url;
    }

    /// Load a new document at `href`.
    pub fn navigate(&self, href: &str) -> Result<(), ::url::ParseError> {
        let url = self.state.lock().current.join(href)?;
        let mut state = self.state.lock();
        state.history.push(url.clone());
        state.current = url;
        state.navigations += 1;
        Ok(())
    }

    pub fn history_len(&self) -> usize {
        self.state.lock().history.len()
    }

    /// Number of full page loads since the location was created.
    pub fn navigations(&self) -> usize {
        self.state.lock().navigations
    }
}

/// Persists JSON text into a query parameter named after the store.
#[derive(Debug, Clone)]
pub struct UrlMedium {
    location: Location,
    history: HistoryMode,
}

impl UrlMedium {
    pub fn new(location: Location, history: HistoryMode) -> Self {
        Self { location, history }
    }

    fn rewrite(&self, edit: impl FnOnce(&mut Vec<(String, String)>)) {
        let mut url = self.location.url();
        let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        edit(&mut pairs);

        if pairs.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(pairs.iter());
        }

        match self.history {
            HistoryMode::Replace => self.location.replace_state(url),
            HistoryMode::Push => self.location.push_state(url),
        }
    }
}

impl Medium for UrlMedium {
    fn kind(&self) -> BackendKind {
        BackendKind::Url
    }

    // Query parameters carry no project prefix.
    fn storage_key(&self, _project: &str, name: &str) -> String {
        name.to_string()
    }

    fn read(&self, key: &str) -> Op<Option<Value>> {
        let parsed = match self.location.search_param(key) {
            Some(text) if !text.is_empty() => serde_json::from_str(&text).map(Some),
            _ => Ok(None),
        };
        Op::Ready(parsed.map_err(MediumError::from))
    }

    fn write(&self, key: &str, value: &Value) -> Op<()> {
        let text = value.to_string();
        self.rewrite(|pairs| match pairs.iter_mut().find(|(name, _)| name == key) {
            Some(pair) => pair.1 = text,
            None => pairs.push((key.to_string(), text)),
        });
        Op::ok(())
    }

    fn delete(&self, key: &str) -> Op<()> {
        self.rewrite(|pairs| pairs.retain(|(name, _)| name != key));
        Op::ok(())
    }

    fn shareable_url(&self) -> Option<String> {
        Some(self.location.href())
    }
}
