//! Integration tests for Keepsake

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, OnceLock,
};
use time::{Duration, OffsetDateTime};

use keepsake::{
    create_effect, create_memo, BackendKind, Browser, Cell, MediumError, MediumFailure,
    Operation, Registry, SameSitePolicy, Signal, StoreConfig, StoreError,
};

#[test]
fn signal_integration() {
    let count = Signal::new(0);
    assert_eq!(count.get(), 0);

    count.set(42);
    assert_eq!(count.get(), 42);

    count.update(|n| *n += 10);
    assert_eq!(count.get(), 52);
}

#[test]
fn complex_reactive_chain() {
    let input = Signal::new(1);

    let doubled = create_memo({
        let input = input.clone();
        move || input.get() * 2
    });

    let quadrupled = create_memo({
        let doubled = doubled.clone();
        move || doubled.get() * 2
    });

    assert_eq!(quadrupled.get(), 4);

    input.set(5);
    assert_eq!(quadrupled.get(), 20);
}

#[test]
fn effect_over_memo_reruns() {
    let input = Signal::new(1);
    let doubled = create_memo({
        let input = input.clone();
        move || input.get() * 2
    });
    let seen = Arc::new(Mutex::new(Vec::new()));

    let _effect = create_effect({
        let seen = Arc::clone(&seen);
        move || seen.lock().push(doubled.get())
    });

    input.set(2);
    input.set(3);
    assert_eq!(*seen.lock(), vec![2, 4, 6]);
}

#[test]
fn cell_effect_counts() {
    let cell = Cell::new(0);
    let counter = Arc::new(AtomicUsize::new(0));

    cell.register_effect({
        let counter = Arc::clone(&counter);
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    })
    .unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    cell.set(1).unwrap();
    cell.set(1).unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[test]
fn every_persistent_kind_survives_reload() {
    let browser = Browser::default();
    let registry = Registry::new(browser.clone());
    let kinds = [
        BackendKind::Local,
        BackendKind::Session,
        BackendKind::Cookie,
        BackendKind::Url,
    ];

    for kind in kinds {
        let name = format!("{kind}-store");
        registry
            .create_kind(kind, &name, Some(json!({"kind": kind.as_str()})))
            .unwrap();
    }

    let reloaded = Registry::new(browser);
    for kind in kinds {
        let store = reloaded.create_kind(kind, &format!("{kind}-store"), None).unwrap();
        assert_eq!(store.get().unwrap(), json!({"kind": kind.as_str()}), "{kind}");
    }
}

#[test]
fn memory_store_does_not_survive_reload() {
    let browser = Browser::default();
    Registry::new(browser.clone())
        .create("memory", "scratch", Some(json!("draft")))
        .unwrap();

    let store = Registry::new(browser).create("memory", "scratch", None).unwrap();
    assert_eq!(store.get().unwrap(), json!(0));
}

#[test]
fn removed_values_do_not_hydrate() {
    let browser = Browser::default();
    let registry = Registry::new(browser.clone());

    for kind in ["local", "session", "cookie", "url"] {
        registry.create(kind, kind, Some(json!("kept"))).unwrap();
        registry.remove(kind).unwrap();
    }

    let reloaded = Registry::new(browser);
    for kind in ["local", "session", "cookie", "url"] {
        let store = reloaded.create(kind, kind, None).unwrap();
        assert_eq!(store.get().unwrap(), json!(0), "{kind}");
    }
}

#[test]
fn theme_scenario() {
    let browser = Browser::default();
    let registry = Registry::new(browser.clone());

    let theme = registry.create("local", "theme", Some(json!("dark"))).unwrap();
    assert_eq!(theme.get().unwrap(), json!("dark"));

    let reloaded = Registry::new(browser.clone());
    let theme = reloaded.create("local", "theme", None).unwrap();
    assert_eq!(theme.get().unwrap(), json!("dark"));

    reloaded.remove("theme").unwrap();
    let fresh = Registry::new(browser).create("local", "theme", None).unwrap();
    assert_eq!(fresh.get().unwrap(), json!(0));
}

#[test]
fn session_id_cookie_scenario() {
    let browser = Browser::default();
    let registry = Registry::new(browser.clone());
    let before = OffsetDateTime::now_utc();

    registry
        .create("cookie", "session-id", Some(json!("abc123")))
        .unwrap();

    let cookie = browser.cookies.get("health:session-id").unwrap();
    assert_eq!(cookie.value(), "\"abc123\"");
    assert_eq!(cookie.path(), Some("/"));
    assert_eq!(cookie.same_site(), Some(SameSitePolicy::Strict.into()));
    let expires = cookie.expires_datetime().unwrap();
    assert!(expires >= before + Duration::days(7));
    assert!(expires < before + Duration::days(8));
}

#[test]
fn opening_writes_current_value_to_every_medium() {
    let browser = Browser::new("http://localhost:3000/records").unwrap();
    let registry = Registry::new(browser.clone());

    let page = registry.create("url", "page", None).unwrap();
    registry.create("local", "count", None).unwrap();
    registry.create("session", "step", None).unwrap();
    registry.create("cookie", "token", None).unwrap();

    assert_eq!(
        page.shareable_url().as_deref(),
        Some("http://localhost:3000/records?page=0")
    );
    assert_eq!(browser.local_storage.get_item("health:count").as_deref(), Some("0"));
    assert_eq!(browser.session_storage.get_item("health:step").as_deref(), Some("0"));
    assert_eq!(browser.cookies.get("health:token").unwrap().value(), "0");
    assert_eq!(browser.location.navigations(), 0);
}

#[test]
fn page_url_scenario() {
    let browser = Browser::new("http://localhost:3000/records").unwrap();
    let registry = Registry::new(browser.clone());

    let page = registry.create("url", "page", Some(json!(2))).unwrap();
    assert_eq!(browser.location.search_param("page").as_deref(), Some("2"));
    assert_eq!(browser.location.navigations(), 0);
    assert_eq!(browser.location.history_len(), 1);
    assert_eq!(
        page.shareable_url().as_deref(),
        Some("http://localhost:3000/records?page=2")
    );
}

#[test]
fn url_store_hydrates_from_shared_link() {
    let browser = Browser::new("http://localhost:3000/records?page=5&sort=%22name%22").unwrap();
    let registry = Registry::new(browser);

    assert_eq!(registry.create("url", "page", None).unwrap().get().unwrap(), json!(5));
    assert_eq!(
        registry.create("url", "sort", None).unwrap().get().unwrap(),
        json!("name")
    );
}

#[test]
fn session_store_is_cleared_with_the_session() {
    let browser = Browser::default();
    Registry::new(browser.clone())
        .create("session", "wizard", Some(json!(3)))
        .unwrap();

    browser.end_session();
    let store = Registry::new(browser).create("session", "wizard", None).unwrap();
    assert_eq!(store.get().unwrap(), json!(0));
}

#[test]
fn derived_values_follow_store() {
    let registry = Registry::new(Browser::default());
    let vitals = registry
        .create("local", "vitals", Some(json!({"pulse": 60})))
        .unwrap();
    let elevated = vitals
        .derive(|v: &Value| v["pulse"].as_u64().unwrap_or(0) > 100)
        .unwrap();
    assert_eq!(elevated.get(), Ok(false));

    vitals.set(json!({"pulse": 120})).unwrap();
    assert_eq!(elevated.get(), Ok(true));

    registry.remove("vitals").unwrap();
    assert!(elevated.get().is_err());
}

#[test]
fn clear_all_leaves_nothing_behind() {
    let browser = Browser::default();
    let registry = Registry::new(browser.clone());
    for (index, kind) in ["memory", "local", "session", "cookie", "url"].iter().enumerate() {
        registry.create(kind, &format!("s{index}"), Some(json!(index))).unwrap();
    }

    registry.clear_all();
    assert!(registry.is_empty());
    assert!(registry.get("s1").is_err());

    let reloaded = Registry::new(browser);
    for index in 0..5 {
        let store = reloaded
            .create_kind(BackendKind::Local, &format!("s{index}"), None)
            .unwrap();
        assert_eq!(store.get().unwrap(), json!(0));
    }
}

#[test]
fn quota_failure_is_observed_and_value_kept() {
    let mut browser = Browser::default();
    browser.local_storage = browser.local_storage.clone().with_quota(32);
    let failures = Arc::new(Mutex::new(Vec::<MediumFailure>::new()));
    let registry = Registry::builder(browser)
        .on_error({
            let failures = Arc::clone(&failures);
            Arc::new(move |failure: &MediumFailure| failures.lock().push(failure.clone()))
        })
        .build();

    let notes = registry
        .create("local", "notes", Some(json!("a very long clinical note text")))
        .unwrap();
    assert_eq!(notes.get().unwrap(), json!("a very long clinical note text"));

    let failures = failures.lock();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].operation, Operation::Write);
    assert!(matches!(failures[0].error, MediumError::QuotaExceeded { .. }));
}

#[test]
fn observer_can_inspect_registry_during_create() {
    let mut browser = Browser::default();
    browser.local_storage = browser.local_storage.clone().with_quota(8);
    let slot: Arc<OnceLock<Arc<Registry>>> = Arc::new(OnceLock::new());
    let names = Arc::new(Mutex::new(Vec::new()));

    let registry = Arc::new(
        Registry::builder(browser)
            .on_error({
                let slot = Arc::clone(&slot);
                let names = Arc::clone(&names);
                Arc::new(move |_: &MediumFailure| {
                    if let Some(registry) = slot.get() {
                        names.lock().push((registry.len(), registry.get("notes").is_ok()));
                    }
                })
            })
            .build(),
    );
    assert!(slot.set(Arc::clone(&registry)).is_ok());

    let worker = std::thread::spawn({
        let registry = Arc::clone(&registry);
        move || {
            registry
                .create("local", "notes", Some(json!("far too long for quota")))
                .is_ok()
        }
    });
    assert!(worker.join().unwrap());

    assert_eq!(registry.len(), 1);
    let names = names.lock();
    assert_eq!(names.len(), 2);
    assert!(names.iter().all(|&seen| seen == (0, false)));
}

#[test]
fn registry_errors() {
    let registry = Registry::new(Browser::default());
    registry.create("local", "theme", None).unwrap();

    assert_eq!(
        registry.create("local", "theme", None).unwrap_err(),
        StoreError::DuplicateName("theme".to_string())
    );
    assert_eq!(
        registry.create("filesystem", "other", None).unwrap_err(),
        StoreError::UnknownBackendType("filesystem".to_string())
    );
    assert_eq!(
        registry.get("missing").unwrap_err(),
        StoreError::NotFound("missing".to_string())
    );
    assert_eq!(
        registry.remove("missing").unwrap_err(),
        StoreError::NotFound("missing".to_string())
    );
}

#[test]
fn config_from_toml_drives_registry() {
    let config = StoreConfig::from_toml_str(
        r#"
        project = "clinic"

        [cookie]
        expires_days = 1
        same_site = "lax"
        "#,
    )
    .unwrap();
    let browser = Browser::default();
    let registry = Registry::builder(browser.clone()).config(config).build();

    registry.create("cookie", "token", Some(json!("t"))).unwrap();
    let cookie = browser.cookies.get("clinic:token").unwrap();
    assert_eq!(cookie.same_site(), Some(SameSitePolicy::Lax.into()));
    assert!(cookie.expires_datetime().unwrap() < OffsetDateTime::now_utc() + Duration::days(2));
}
