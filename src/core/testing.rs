//! Shared fixtures for the core unit tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::entities::{Decoder, Requester, Resource};
use crate::error::LoadError;

/// Minimal resource: remembers which key it was decoded for
#[derive(Debug, PartialEq)]
pub struct Blob {
    pub key: String,
    pub size: usize,
}

impl Resource for Blob {
    fn mem(&self) -> usize {
        self.size
    }
}

/// Decoder that counts calls and the peak number of concurrent decodes.
/// Payload `b"bad"` fails to decode.
#[derive(Debug, Default)]
pub struct CountingDecoder {
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    sleep: Duration,
}

impl CountingDecoder {
    pub fn with_sleep(sleep: Duration) -> Self {
        Self { sleep, ..Default::default() }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl Decoder<Blob> for CountingDecoder {
    fn decode(&self, key: &str, bytes: Vec<u8>) -> Result<Blob, LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        if !self.sleep.is_zero() {
            std::thread::sleep(self.sleep);
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if bytes == b"bad" {
            return Err(LoadError::decode(key, "bad payload"));
        }
        Ok(Blob { key: key.to_string(), size: bytes.len() })
    }
}

/// Collects "name:key" on delivery and "name:!key" on failure, in call order
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    log: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requester(&self, name: &str) -> Requester<Blob> {
        let (ok_log, err_log) = (Arc::clone(&self.log), Arc::clone(&self.log));
        let (ok_name, err_name) = (name.to_string(), name.to_string());
        Requester::new(move |blob: Arc<Blob>| {
            ok_log.lock().unwrap().push(format!("{}:{}", ok_name, blob.key));
        })
        .on_failure(move |e: &LoadError| {
            err_log.lock().unwrap().push(format!("{}:!{}", err_name, e.key()));
        })
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}
