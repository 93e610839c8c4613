use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use crate::{domain::Channel, errors::Error, ports::ChannelStore, Result};

/// Non-durable store, for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Channel>>,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn with_channels(rows: Vec<Channel>) -> Self {
        Self {
            rows: Mutex::new(rows),
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Make every following `save` fail (simulates a full disk).
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl ChannelStore for MemoryStore {
    fn load(&self) -> Result<Vec<Channel>> {
        Ok(self.rows.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, channels: &[Channel]) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::Storage {
                path: "<memory>".into(),
                reason: "saves disabled".to_string(),
            });
        }
        *self.rows.lock().unwrap_or_else(|e| e.into_inner()) = channels.to_vec();
        Ok(())
    }
}
