//! Persisted stores across a simulated page reload

use serde_json::{json, Value};

use keepsake::{form_object, Browser, FormEvent, Registry};

fn main() {
    println!("=== Store Example ===\n");

    let browser = Browser::new("http://localhost:3000/records").unwrap();
    let registry = Registry::new(browser.clone());

    // A store per medium
    let theme = registry.create("local", "theme", Some(json!("dark"))).unwrap();
    let page = registry.create("url", "page", Some(json!(1))).unwrap();
    let profile = registry.create("cookie", "profile", None).unwrap();

    theme
        .register_effect(|value: &Value| println!("Theme is now {value}"))
        .unwrap();

    println!("\nSwitching theme...");
    theme.set(json!("light")).unwrap();

    println!("\nTurning the page...");
    page.update(|n| *n = json!(n.as_i64().unwrap_or(0) + 1)).unwrap();
    println!("Share this link: {}", page.shareable_url().unwrap());

    println!("\nSubmitting the profile form...");
    let mut submit = FormEvent::new()
        .field("name", "Ana")
        .field("email", "ana@example.com");
    profile.set(Value::Object(form_object(&mut submit))).unwrap();

    // Same browser, fresh registry
    println!("\nReloading...");
    let reloaded = Registry::new(browser);
    for name in ["theme", "page", "profile"] {
        let kind = registry.kind_of(name).unwrap();
        let store = reloaded.create_kind(kind, name, None).unwrap();
        println!("{name} ({kind}): {}", store.get().unwrap());
    }
}
