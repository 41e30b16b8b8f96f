use ::cookie::{Cookie, CookieJar as Jar};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};

use super::{BackendKind, Medium, Op};
use crate::config::CookieSettings;
use crate::error::MediumError;

/// The document's cookies.
///
/// Clones share the same jar. Cookies whose expiry has passed are treated
/// as absent.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    jar: Arc<Mutex<Jar>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// A live (unexpired) cookie by name.
    pub fn get(&self, name: &str) -> Option<Cookie<'static>> {
        let jar = self.jar.lock();
        let cookie = jar.get(name)?;
        if is_expired(cookie, OffsetDateTime::now_utc()) {
            return None;
        }
        Some(cookie.clone())
    }

    pub fn set(&self, cookie: Cookie<'static>) {
        self.jar.lock().add(cookie);
    }

    pub fn remove(&self, name: &str) {
        self.jar.lock().remove(Cookie::new(name.to_string(), ""));
    }

    /// Live cookies rendered the way `document.cookie` shows them.
    pub fn document_cookie(&self) -> String {
        let now = OffsetDateTime::now_utc();
        let jar = self.jar.lock();
        let mut pairs: Vec<String> = jar
            .iter()
            .filter(|cookie| !is_expired(cookie, now))
            .map(|cookie| format!("{}={}", cookie.name(), cookie.value()))
            .collect();
        pairs.sort();
        pairs.join("; ")
    }

    pub fn len(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        self.jar
            .lock()
            .iter()
            .filter(|cookie| !is_expired(cookie, now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_expired(cookie: &Cookie<'_>, now: OffsetDateTime) -> bool {
    cookie
        .expires_datetime()
        .is_some_and(|expires| expires <= now)
}

/// Persists JSON text into a cookie named after the store key.
#[derive(Debug, Clone)]
pub struct CookieMedium {
    jar: CookieJar,
    settings: CookieSettings,
}

impl CookieMedium {
    pub fn new(jar: CookieJar, settings: CookieSettings) -> Self {
        Self { jar, settings }
    }
}

impl Medium for CookieMedium {
    fn kind(&self) -> BackendKind {
        BackendKind::Cookie
    }

    fn read(&self, key: &str) -> Op<Option<Value>> {
        let parsed = match self.jar.get(key) {
            Some(cookie) if !cookie.value().is_empty() => {
                serde_json::from_str(cookie.value()).map(Some)
            }
            _ => Ok(None),
        };
        Op::Ready(parsed.map_err(MediumError::from))
    }

    fn write(&self, key: &str, value: &Value) -> Op<()> {
        let expires = OffsetDateTime::now_utc() + Duration::days(self.settings.expires_days);
        let cookie = Cookie::build((key.to_string(), value.to_string()))
            .path(self.settings.path.clone())
            .same_site(self.settings.same_site.into())
            .expires(expires)
            .build();
        self.jar.set(cookie);
        Op::ok(())
    }

    fn delete(&self, key: &str) -> Op<()> {
        self.jar.remove(key);
        Op::ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::cookie::SameSite;
    use serde_json::json;

    fn medium(jar: &CookieJar) -> CookieMedium {
        CookieMedium::new(jar.clone(), CookieSettings::default())
    }

    #[test]
    fn write_sets_site_wide_strict_cookie_for_a_week() {
        let jar = CookieJar::new();
        let before = OffsetDateTime::now_utc();
        let written = medium(&jar).write("health:session-id", &json!("abc123"));
        assert!(matches!(written, Op::Ready(Ok(()))));

        let cookie = jar.get("health:session-id").unwrap();
        assert_eq!(cookie.value(), "\"abc123\"");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));

        let expires = cookie.expires_datetime().unwrap();
        assert!(expires >= before + Duration::days(7));
        assert!(expires <= OffsetDateTime::now_utc() + Duration::days(7));
    }

    #[test]
    fn expired_cookie_reads_as_absent() {
        let jar = CookieJar::new();
        jar.set(
            Cookie::build(("health:stale", "1"))
                .expires(OffsetDateTime::now_utc() - Duration::hours(1))
                .build(),
        );

        assert!(jar.get("health:stale").is_none());
        assert!(jar.is_empty());
        let read = medium(&jar).read("health:stale");
        assert!(matches!(read, Op::Ready(Ok(None))));
    }

    #[test]
    fn delete_removes_cookie() {
        let jar = CookieJar::new();
        let medium = medium(&jar);
        let _ = medium.write("health:a", &json!(1));
        let _ = medium.write("health:b", &json!(2));
        assert_eq!(jar.document_cookie(), "health:a=1; health:b=2");

        let _ = medium.delete("health:a");
        assert!(jar.get("health:a").is_none());
        assert_eq!(jar.len(), 1);
    }
}
