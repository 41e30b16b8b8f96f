//! Turning a submitted form into a plain key-value object.

use serde::Serialize;
use serde_json::{Map, Value};

/// One entry of a form's data set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FormValue {
    Text(String),
    File {
        name: String,
        size: u64,
        #[serde(rename = "type")]
        content_type: String,
    },
}

impl From<&str> for FormValue {
    fn from(text: &str) -> Self {
        FormValue::Text(text.to_string())
    }
}

impl From<String> for FormValue {
    fn from(text: String) -> Self {
        FormValue::Text(text)
    }
}

/// A form submission about to navigate the page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormEvent {
    entries: Vec<(String, FormValue)>,
    default_prevented: bool,
}

impl FormEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, in document order.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<FormValue>) -> Self {
        self.entries.push((name.into(), value.into()));
        self
    }

    pub fn entries(&self) -> &[(String, FormValue)] {
        &self.entries
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Stop the submission's navigation and collect its fields.
///
/// When a name repeats, the last value wins.
///
/// ```
/// use keepsake::{form_object, FormEvent};
/// use serde_json::json;
///
/// let mut event = FormEvent::new()
///     .field("email", "ana@example.com")
///     .field("role", "patient");
///
/// let data = form_object(&mut event);
/// assert!(event.default_prevented());
/// assert_eq!(data["email"], json!("ana@example.com"));
/// ```
pub fn form_object(event: &mut FormEvent) -> Map<String, Value> {
    event.prevent_default();
    event
        .entries
        .iter()
        .map(|(name, value)| {
            let value = serde_json::to_value(value).unwrap_or(Value::Null);
            (name.clone(), value)
        })
        .collect()
}
