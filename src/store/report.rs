use std::fmt;
use std::sync::Arc;

use crate::error::{MediumError, MediumFailure, Operation};

/// Callback receiving every absorbed medium failure.
pub type ErrorObserver = Arc<dyn Fn(&MediumFailure) + Send + Sync>;

/// Where medium failures go: always the log, optionally an observer.
#[derive(Clone, Default)]
pub struct Reporter {
    observer: Option<ErrorObserver>,
}

impl Reporter {
    pub fn new(observer: Option<ErrorObserver>) -> Self {
        Self { observer }
    }

    pub fn report(&self, key: &str, operation: Operation, error: MediumError) {
        tracing::warn!(key, %operation, %error, "persistence failed");
        if let Some(observer) = &self.observer {
            observer(&MediumFailure {
                key: key.to_string(),
                operation,
                error,
            });
        }
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
