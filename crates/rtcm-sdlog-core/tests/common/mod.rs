//! Test doubles and common utilities for logger contract tests
//!
//! The mock storage is an in-memory "card" shared between the test and the
//! logger, with switches for the failures the logger has to survive.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use rtcm_sdlog_core::config::{LoggerConfig, MountConfig};
use rtcm_sdlog_core::error::{Error, Result};
use rtcm_sdlog_core::traits::{
    Clock, ConfigStore, EventBus, LogFile, MountAdapter, SubscriptionId, Volume,
};
use rtcm_sdlog_core::{LocalEventBus, MemoryConfigStore, SdLogger};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Topic used by all contract tests
pub const TOPIC: &str = "serial.read";

/// A settable UTC clock shared between the test and the logger
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn at(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Self::new(utc(year, month, day, hour, min, sec))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    type Tz = Utc;

    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Shorthand for a UTC instant
pub fn utc(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, sec).unwrap()
}

/// State of the in-memory card
#[derive(Default)]
struct MockDisk {
    /// File contents by name
    files: BTreeMap<String, Vec<u8>>,
    /// Names of successfully opened files, in order
    opened: Vec<String>,
    /// Number of open attempts, successful or not
    open_attempts: usize,
    /// Handles currently open
    open_handles: usize,
    /// Fail this many upcoming opens
    failing_opens: usize,
    /// Fail every open
    fail_all_opens: bool,
    /// Most bytes a single write call accepts
    write_limit: Option<usize>,
    /// Number of write calls on any handle
    write_calls: usize,
    /// Number of mount calls
    mount_calls: usize,
    /// Number of unmount calls
    unmount_calls: usize,
}

/// In-memory storage with failure injection
#[derive(Clone, Default)]
pub struct MockStorage {
    disk: Arc<Mutex<MockDisk>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount adapter that mounts this storage
    pub fn mount_adapter(&self) -> Box<dyn MountAdapter> {
        Box::new(MockMount {
            disk: Arc::clone(&self.disk),
            fail: false,
        })
    }

    /// Mount adapter that reports the card as absent
    pub fn failing_mount_adapter(&self) -> Box<dyn MountAdapter> {
        Box::new(MockMount {
            disk: Arc::clone(&self.disk),
            fail: true,
        })
    }

    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.disk.lock().unwrap().files.get(name).cloned()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.disk.lock().unwrap().files.keys().cloned().collect()
    }

    pub fn opened(&self) -> Vec<String> {
        self.disk.lock().unwrap().opened.clone()
    }

    pub fn open_count(&self) -> usize {
        self.disk.lock().unwrap().opened.len()
    }

    pub fn open_attempts(&self) -> usize {
        self.disk.lock().unwrap().open_attempts
    }

    pub fn open_handles(&self) -> usize {
        self.disk.lock().unwrap().open_handles
    }

    pub fn mount_calls(&self) -> usize {
        self.disk.lock().unwrap().mount_calls
    }

    pub fn unmount_calls(&self) -> usize {
        self.disk.lock().unwrap().unmount_calls
    }

    pub fn fail_next_opens(&self, count: usize) {
        self.disk.lock().unwrap().failing_opens = count;
    }

    pub fn set_fail_all_opens(&self, fail: bool) {
        self.disk.lock().unwrap().fail_all_opens = fail;
    }

    /// Cap every write call at `limit` bytes (`None` accepts everything)
    pub fn set_write_limit(&self, limit: Option<usize>) {
        self.disk.lock().unwrap().write_limit = limit;
    }

    pub fn write_calls(&self) -> usize {
        self.disk.lock().unwrap().write_calls
    }
}

struct MockMount {
    disk: Arc<Mutex<MockDisk>>,
    fail: bool,
}

impl MountAdapter for MockMount {
    fn mount(&mut self, config: &MountConfig) -> Result<Box<dyn Volume>> {
        self.disk.lock().unwrap().mount_calls += 1;
        if self.fail {
            return Err(Error::mount("card not present"));
        }
        Ok(Box::new(MockVolume {
            root: config.mount_point.clone(),
            disk: Arc::clone(&self.disk),
        }))
    }

    fn unmount(&mut self, _volume: Box<dyn Volume>) -> Result<()> {
        self.disk.lock().unwrap().unmount_calls += 1;
        Ok(())
    }
}

struct MockVolume {
    root: PathBuf,
    disk: Arc<Mutex<MockDisk>>,
}

impl Volume for MockVolume {
    fn mount_point(&self) -> &Path {
        &self.root
    }

    fn open_append(&self, file_name: &str) -> Result<LogFile> {
        let mut disk = self.disk.lock().unwrap();
        disk.open_attempts += 1;

        if disk.fail_all_opens {
            return Err(Error::open(format!("{}: card removed", file_name)));
        }
        if disk.failing_opens > 0 {
            disk.failing_opens -= 1;
            return Err(Error::open(format!("{}: filesystem full", file_name)));
        }

        disk.files.entry(file_name.to_string()).or_default();
        disk.opened.push(file_name.to_string());
        disk.open_handles += 1;

        Ok(Box::new(MockFile {
            name: file_name.to_string(),
            disk: Arc::clone(&self.disk),
        }))
    }
}

struct MockFile {
    name: String,
    disk: Arc<Mutex<MockDisk>>,
}

impl Write for MockFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut disk = self.disk.lock().unwrap();
        disk.write_calls += 1;
        let accepted = disk.write_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        disk.files
            .entry(self.name.clone())
            .or_default()
            .extend_from_slice(&buf[..accepted]);
        Ok(accepted)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for MockFile {
    fn drop(&mut self) {
        self.disk.lock().unwrap().open_handles -= 1;
    }
}

/// A config store that cannot be read
pub struct FailingConfigStore;

impl ConfigStore for FailingConfigStore {
    fn get_bool(&self, _key: &str) -> Result<Option<bool>> {
        Err(Error::config_store("flash read failed"))
    }

    fn set_bool(&self, _key: &str, _value: bool) -> Result<()> {
        Err(Error::config_store("flash write failed"))
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// A logger wired to mock storage, a memory config store and a local bus
pub struct Harness {
    pub logger: SdLogger<ManualClock>,
    pub subscription: SubscriptionId,
    pub bus: Arc<LocalEventBus>,
    pub storage: MockStorage,
    pub clock: ManualClock,
}

impl Harness {
    /// Start a logger; `flag` is the persisted enabled flag (`None` = absent)
    pub fn start(flag: Option<bool>, mount_ok: bool, clock: ManualClock) -> Self {
        let storage = MockStorage::new();
        let store = MemoryConfigStore::new();
        if let Some(flag) = flag {
            store.set_bool("sd_log_active", flag).unwrap();
        }
        Self::start_with(&store, storage, mount_ok, clock)
    }

    pub fn start_with(
        store: &dyn ConfigStore,
        storage: MockStorage,
        mount_ok: bool,
        clock: ManualClock,
    ) -> Self {
        let bus = Arc::new(LocalEventBus::new());
        let mount = if mount_ok {
            storage.mount_adapter()
        } else {
            storage.failing_mount_adapter()
        };

        let (logger, subscription) = SdLogger::init(
            LoggerConfig::default(),
            store,
            mount,
            bus.as_ref(),
            clock.clone(),
        )
        .expect("logger init succeeds");

        Self {
            logger,
            subscription,
            bus,
            storage,
            clock,
        }
    }

    /// Publish a serial chunk the way the UART driver does (id = length)
    pub fn publish(&self, payload: &[u8]) -> usize {
        self.bus
            .publish(TOPIC, payload.len() as i32, payload)
            .expect("publish succeeds")
    }
}
