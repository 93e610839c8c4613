use std::{fs, path::PathBuf};

use crate::{domain::Channel, errors::Error, ports::ChannelStore, Result};

/// JSON file-backed channel store.
///
/// The whole list lives in one file. Writes go to a temp file that is renamed
/// over the target, so the target is never missing. The previous version is
/// copied to `.bak` first and `load` falls back to it when the main file is
/// gone.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn backup_path(&self) -> PathBuf {
        self.path.with_extension("json.bak")
    }

    fn read_rows(&self, path: &std::path::Path) -> Result<Vec<Channel>> {
        let txt = fs::read_to_string(path)?;
        if txt.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&txt).map_err(|e| self.storage_err(format!("invalid json: {e}")))
    }

    fn storage_err(&self, reason: impl std::fmt::Display) -> Error {
        Error::Storage {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl ChannelStore for JsonFileStore {
    fn load(&self) -> Result<Vec<Channel>> {
        if self.path.exists() {
            return self.read_rows(&self.path);
        }
        let bak = self.backup_path();
        if bak.exists() {
            tracing::warn!(path = %self.path.display(), "Channel file missing, loading backup");
            return self.read_rows(&bak);
        }
        Ok(Vec::new())
    }

    fn save(&self, channels: &[Channel]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(channels)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json.as_bytes())?;

        if self.path.exists() {
            fs::copy(&self.path, self.backup_path())?;
        }

        fs::rename(&tmp, &self.path).map_err(|e| self.storage_err(e))
    }
}
