//! Contract Test: Storage Absence
//!
//! Verifies that a missing card turns the logger into a silent no-op.
//!
//! Constraints verified:
//! - A failed mount leaves the logger unmounted and inactive, whatever the flag
//! - No write ever creates or opens a file without a mount
//! - The mount is attempted exactly once
//! - The data handler is subscribed anyway
//!
//! If this test fails, storage absence has become an error path.

mod common;

use common::*;
use rtcm_sdlog_core::WriteOutcome;

#[test]
fn mount_failure_disables_logging_regardless_of_flag() {
    for flag in [Some(true), Some(false), None] {
        let h = Harness::start(flag, false, ManualClock::at(2024, 5, 20, 12, 0, 0));

        assert!(!h.logger.is_card_mounted(), "flag {:?}", flag);
        assert!(!h.logger.is_active(), "flag {:?}", flag);
        assert_eq!(h.logger.write(b"abc"), WriteOutcome::NotMounted);
        assert!(h.storage.file_names().is_empty(), "flag {:?}", flag);
        assert_eq!(h.storage.open_attempts(), 0);
    }
}

#[test]
fn writes_never_create_files_without_mount() {
    let h = Harness::start(Some(true), false, ManualClock::at(2024, 5, 20, 12, 0, 0));

    for i in 0..50u8 {
        if i % 7 == 0 {
            h.logger.set_active(i % 2 == 0);
        }
        h.clock.advance(chrono::Duration::hours(5));
        let _ = h.logger.write(&[i; 16]);
        h.publish(&[i; 8]);
    }

    assert!(h.storage.file_names().is_empty());
    assert_eq!(h.storage.open_attempts(), 0);
    assert_eq!(h.logger.status().current_file, None);
}

#[test]
fn failed_mount_is_not_retried() {
    let h = Harness::start(Some(true), false, ManualClock::at(2024, 5, 20, 12, 0, 0));

    h.logger.set_active(true);
    for _ in 0..10 {
        let _ = h.logger.write(b"RTCM");
    }

    assert_eq!(h.storage.mount_calls(), 1);
    assert!(!h.logger.is_card_mounted());
}

#[test]
fn handler_is_subscribed_even_without_mount() {
    let h = Harness::start(Some(true), false, ManualClock::at(2024, 5, 20, 12, 0, 0));

    assert_eq!(h.bus.subscriber_count(TOPIC), 1);
    assert_eq!(h.publish(b"abc"), 1, "handler should still receive events");
    assert!(h.storage.file_names().is_empty());
}

#[test]
fn mount_is_attempted_when_logging_starts_disabled() {
    let h = Harness::start(Some(false), true, ManualClock::at(2024, 5, 20, 12, 0, 0));

    assert_eq!(h.storage.mount_calls(), 1);
    assert!(h.logger.is_card_mounted());
    assert!(!h.logger.is_active());
    assert_eq!(h.storage.open_attempts(), 0, "no file while disabled");
}
