#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use photostash_core::error::{Error, Result};
use photostash_core::media::CaptureTime;
use photostash_core::remote::ObjectStore;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Capture dates keyed by file name.
#[derive(Default)]
pub struct FixedCaptureTime {
    dates: HashMap<String, NaiveDateTime>,
}

impl FixedCaptureTime {
    pub fn with(mut self, file_name: &str, date: NaiveDateTime) -> Self {
        self.dates.insert(file_name.to_string(), date);
        self
    }
}

impl CaptureTime for FixedCaptureTime {
    fn captured_at(&self, path: &Path) -> Option<NaiveDateTime> {
        let name = path.file_name()?.to_str()?;
        self.dates.get(name).copied()
    }
}

pub fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
}

/// Bucket held in memory. Counts every upload.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    uploads: Mutex<Vec<String>>,
    list_calls: AtomicUsize,
    /// Remaining transient failures to inject into `put`.
    flaky_puts: AtomicUsize,
}

impl MemoryStore {
    pub fn with_object(self, key: &str, body: &[u8]) -> Self {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), body.to_vec());
        self
    }

    pub fn failing_puts(self, count: usize) -> Self {
        self.flaky_puts.store(count, Ordering::SeqCst);
        self
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

impl ObjectStore for MemoryStore {
    fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn put(&self, key: &str, body: Vec<u8>) -> Result<()> {
        let remaining = self.flaky_puts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.flaky_puts.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Io(io::Error::new(io::ErrorKind::TimedOut, "injected")));
        }
        self.uploads.lock().unwrap().push(key.to_string());
        self.objects.lock().unwrap().insert(key.to_string(), body);
        Ok(())
    }
}

pub fn write_file(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}
