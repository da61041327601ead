use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use realm_storage::{FlushSink, StorageError};

/// A flush sink that records what the cache persisted, with a failure
/// switch for retry/alert tests.
pub struct RecordingSink {
    flushed: Mutex<Vec<(String, Vec<u8>)>>,
    fail: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            flushed: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::Release);
    }

    pub fn flushed(&self) -> Vec<(String, Vec<u8>)> {
        self.flushed.lock().clone()
    }

    pub fn flush_count(&self) -> usize {
        self.flushed.lock().len()
    }
}

impl FlushSink<String, Vec<u8>> for RecordingSink {
    fn flush(&self, key: &String, value: &Vec<u8>) -> Result<(), StorageError> {
        if self.fail.load(Ordering::Acquire) {
            return Err(StorageError::Unreachable {
                endpoint: "db:3306".to_string(),
            });
        }
        self.flushed.lock().push((key.clone(), value.clone()));
        Ok(())
    }
}
