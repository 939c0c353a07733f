//! Integration tests for the [`Watchdog`] trait surface.
//!
//! `companion_supervisor` is a binary crate with no library target, so
//! these tests exercise the trait and its associated types from
//! `companion_common` directly, the same way a third crate implementing
//! its own `Watchdog` would. The real `CompanionWatchdog` implementation
//! spawns actual worker processes and is covered by unit tests in
//! `src/watchdog.rs` instead, where process-spawning can be scoped tightly
//! and doesn't need a test harness binary on `PATH`.

use companion_common::watchdog::{HealthStatus, ManagedModule, Watchdog, WatchdogError};
use std::path::Path;

#[test]
fn health_status_variants_carry_their_payload() {
    assert_eq!(HealthStatus::Healthy, HealthStatus::Healthy);

    let stale = HealthStatus::Stale { age_secs: 5 };
    match stale {
        HealthStatus::Stale { age_secs } => assert_eq!(age_secs, 5),
        _ => panic!("expected Stale"),
    }

    let dead = HealthStatus::Dead { exit_code: Some(137) };
    match dead {
        HealthStatus::Dead { exit_code } => assert_eq!(exit_code, Some(137)),
        _ => panic!("expected Dead"),
    }

    assert_eq!(HealthStatus::Unknown, HealthStatus::Unknown);
}

#[test]
fn managed_module_covers_every_worker() {
    assert_ne!(ManagedModule::Vision, ManagedModule::Audio);
    assert_eq!(ManagedModule::Planner, ManagedModule::Planner);

    let _all = [ManagedModule::Vision, ManagedModule::Audio, ManagedModule::Planner];
}

#[test]
fn watchdog_error_display_mentions_module_and_reason() {
    let spawn_failed = WatchdogError::SpawnFailed {
        module: ManagedModule::Vision,
        reason: "binary not found".into(),
    };
    let msg = format!("{spawn_failed}");
    assert!(msg.contains("Vision"), "error should mention module: {msg}");
    assert!(msg.contains("binary not found"), "error should contain reason: {msg}");

    let exhausted = WatchdogError::RestartsExhausted { module: ManagedModule::Audio, max: 5 };
    let msg2 = format!("{exhausted}");
    assert!(msg2.contains('5'), "should show max count: {msg2}");
}

/// Verify the trait is object-safe (usable as `dyn Watchdog`), the same
/// way `companion_supervisor`'s `main` would hold one behind a trait
/// object if it ever needed to swap implementations.
#[test]
fn watchdog_trait_is_object_safe() {
    struct DummyWatchdog;
    impl Watchdog for DummyWatchdog {
        fn spawn_module(&mut self, _module: ManagedModule, _config_dir: &Path) -> Result<u32, WatchdogError> {
            Ok(12345)
        }
        fn health_check(&self, _module: ManagedModule) -> HealthStatus {
            HealthStatus::Unknown
        }
        fn restart_module(&mut self, _module: ManagedModule) -> Result<u32, WatchdogError> {
            Err(WatchdogError::Other("not implemented".into()))
        }
        fn shutdown_all(&mut self) -> Result<(), WatchdogError> {
            Ok(())
        }
    }

    let mut wd: Box<dyn Watchdog> = Box::new(DummyWatchdog);
    let pid = wd.spawn_module(ManagedModule::Vision, Path::new("/tmp")).unwrap();
    assert_eq!(pid, 12345);
    assert_eq!(wd.health_check(ManagedModule::Audio), HealthStatus::Unknown);
    assert!(wd.shutdown_all().is_ok());
}
