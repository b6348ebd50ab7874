//! End-to-end activation flows across the public API.

mod common;

use chrono::{Duration, Utc};
use common::{payload_json, public_pem, sign_code, RecordingListener, ISSUER_KEY};
use ilicense_client::{LicenseConfig, LicenseError, LicenseManager, StartupOutcome};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

fn config(dir: &TempDir) -> LicenseConfig {
    LicenseConfig {
        public_key: Some(public_pem(&ISSUER_KEY)),
        validate_on_startup: true,
        ..LicenseConfig::default()
    }
    .with_storage_path(dir.path().join("license.dat"))
}

#[test]
fn activate_then_restart() {
    let dir = TempDir::new().unwrap();
    let payload = payload_json("Acme", Utc::now() + Duration::days(10), &["base", "advanced"]);
    let code = sign_code(&ISSUER_KEY, &payload);

    let listener = Arc::new(RecordingListener::default());
    let manager = LicenseManager::from_config(config(&dir))
        .unwrap()
        .with_listener(listener.clone());
    let license = manager.activate(&code).unwrap();

    assert_eq!(license.customer_name, "Acme");
    assert!((9..=10).contains(&license.days_left()));
    assert!(!license.is_expired());
    manager.check_module("advanced").unwrap();
    assert!(manager.check_module("reports").is_err());
    assert_eq!(listener.events(), vec!["activated:Acme".to_string()]);

    let stored = std::fs::read_to_string(dir.path().join("license.dat")).unwrap();
    assert_eq!(stored, code);

    let restarted = LicenseManager::from_config(config(&dir)).unwrap();
    assert_eq!(restarted.initialize().unwrap(), StartupOutcome::Valid);
    let reloaded = restarted.current_license().unwrap();
    assert_eq!(reloaded.license_code, license.license_code);
    assert_eq!(reloaded.customer_name, license.customer_name);
    assert_eq!(reloaded.expire_at, license.expire_at);
    assert_eq!(reloaded.modules, license.modules);
    restarted.check_module("base").unwrap();
}

#[test]
fn readers_never_observe_a_torn_license() {
    let dir = TempDir::new().unwrap();
    let manager = Arc::new(LicenseManager::from_config(config(&dir)).unwrap());

    let expire_at = Utc::now() + Duration::days(30);
    let codes: Vec<String> = ["Alpha", "Beta"]
        .iter()
        .map(|customer| {
            let module = customer.to_lowercase();
            sign_code(&ISSUER_KEY, &payload_json(customer, expire_at, &[module.as_str()]))
        })
        .collect();
    manager.activate(&codes[0]).unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                for _ in 0..500 {
                    let license = manager.current_license().unwrap();
                    let expected = license.customer_name.to_lowercase();
                    assert_eq!(license.modules, vec![expected]);
                }
            })
        })
        .collect();

    for i in 0..20 {
        manager.activate(&codes[i % 2]).unwrap();
    }

    for reader in readers {
        reader.join().unwrap();
    }
}

#[test]
fn concurrent_checks_see_not_activated_or_valid() {
    const READERS: usize = 8;

    let dir = TempDir::new().unwrap();
    let manager = Arc::new(LicenseManager::from_config(config(&dir)).unwrap());
    let code = sign_code(
        &ISSUER_KEY,
        &payload_json("Acme", Utc::now() + Duration::days(30), &["base"]),
    );

    let start = Arc::new(Barrier::new(READERS + 1));
    let activated = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let start = Arc::clone(&start);
            let activated = Arc::clone(&activated);
            thread::spawn(move || {
                start.wait();
                let mut saw_valid = false;
                loop {
                    let done = activated.load(Ordering::Acquire);
                    match manager.check_license() {
                        Ok(()) => {
                            saw_valid = true;
                            let license = manager.current_license().unwrap();
                            assert_eq!(license.customer_name, "Acme");
                            assert_eq!(license.modules, vec!["base".to_string()]);
                        }
                        Err(LicenseError::NotActivated) => {
                            assert!(!saw_valid, "license disappeared after activation");
                        }
                        Err(other) => panic!("unexpected error {other:?}"),
                    }
                    if done {
                        break;
                    }
                }
                saw_valid
            })
        })
        .collect();

    start.wait();
    manager.activate(&code).unwrap();
    activated.store(true, Ordering::Release);

    for reader in readers {
        assert!(reader.join().unwrap());
    }
}
