//! Contract Test: Runtime Toggle
//!
//! Verifies the enabled/disabled flag and its interaction with the mount.
//!
//! Constraints verified:
//! - `is_active()` is exactly `enabled && mounted` after every `set_active`
//! - `set_active` never opens or closes files
//! - Enabling after init opens the file lazily on the next write
//! - The initial flag comes from the config store, defaulting to disabled
//!
//! If this test fails, the toggle has grown side effects.

mod common;

use common::*;
use rtcm_sdlog_core::{MemoryConfigStore, WriteOutcome};

#[test]
fn is_active_tracks_flag_and_mount() {
    for mount_ok in [true, false] {
        let h = Harness::start(Some(false), mount_ok, ManualClock::at(2024, 5, 20, 12, 0, 0));

        for value in [true, false, true, true, false, false, true] {
            h.logger.set_active(value);
            assert_eq!(h.logger.is_active(), value && mount_ok);
            assert_eq!(h.logger.is_card_mounted(), mount_ok);
        }

        assert_eq!(h.storage.open_attempts(), 0, "set_active must not open files");
    }
}

#[test]
fn set_active_twice_equals_once() {
    let once = Harness::start(Some(false), true, ManualClock::at(2024, 5, 20, 12, 0, 0));
    let twice = Harness::start(Some(false), true, ManualClock::at(2024, 5, 20, 12, 0, 0));

    once.logger.set_active(true);
    twice.logger.set_active(true);
    twice.logger.set_active(true);

    assert_eq!(once.logger.status(), twice.logger.status());
    assert_eq!(once.storage.open_attempts(), twice.storage.open_attempts());
}

#[test]
fn enabling_after_init_opens_file_on_write() {
    let h = Harness::start(Some(false), true, ManualClock::at(2024, 5, 20, 12, 0, 0));

    h.logger.set_active(true);
    assert_eq!(h.storage.open_count(), 0, "file must not open on set_active");
    assert_eq!(h.logger.status().current_file, None);

    assert_eq!(h.logger.write(b"RTCM"), WriteOutcome::Written { bytes: 4 });

    assert_eq!(h.storage.opened(), vec!["20240520.rtcm".to_string()]);
    assert_eq!(h.storage.file("20240520.rtcm").unwrap(), b"RTCM");
}

#[test]
fn disabled_without_file_does_not_open() {
    let h = Harness::start(Some(false), true, ManualClock::at(2024, 5, 20, 12, 0, 0));

    assert_eq!(h.logger.write(b"RTCM"), WriteOutcome::Disabled);
    assert_eq!(h.storage.open_attempts(), 0);
}

#[test]
fn disabling_keeps_file_open_but_stops_event_logging() {
    let h = Harness::start(Some(true), true, ManualClock::at(2024, 5, 20, 12, 0, 0));
    h.publish(b"on");

    h.logger.set_active(false);
    assert!(h.logger.status().current_file.is_some(), "set_active must not close");
    assert_eq!(h.storage.open_handles(), 1);

    h.publish(b"off");
    assert_eq!(h.storage.file("20240520.rtcm").unwrap(), b"on");

    h.logger.set_active(true);
    h.publish(b"again");
    assert_eq!(h.storage.file("20240520.rtcm").unwrap(), b"onagain");
    assert_eq!(h.storage.open_count(), 1);
}

#[test]
fn absent_flag_defaults_to_disabled() {
    let h = Harness::start(None, true, ManualClock::at(2024, 5, 20, 12, 0, 0));

    assert!(h.logger.is_card_mounted());
    assert!(!h.logger.is_active());
}

#[test]
fn unreadable_config_defaults_to_disabled_and_still_mounts() {
    let h = Harness::start_with(
        &FailingConfigStore,
        MockStorage::new(),
        true,
        ManualClock::at(2024, 5, 20, 12, 0, 0),
    );

    assert!(h.logger.is_card_mounted());
    assert!(!h.logger.is_active());
}

#[test]
fn integer_flag_enables_logging() {
    let store = MemoryConfigStore::new();
    store.set_value("sd_log_active", serde_json::json!(1));

    let h = Harness::start_with(
        &store,
        MockStorage::new(),
        true,
        ManualClock::at(2024, 5, 20, 12, 0, 0),
    );

    assert!(h.logger.is_active());
    assert_eq!(h.storage.opened(), vec!["20240520.rtcm".to_string()]);
}
