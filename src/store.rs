use std::io;
use std::path::{Path, PathBuf};

use crate::models::AuditRecord;

const STORE_FILENAME: &str = "audits.json";

/// Default namespace directory for the persisted audit log.
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("VOXAUDIT_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voxaudit")
}

/// Persistence adapter: one JSON snapshot of the full audit sequence under a
/// fixed filename in the namespace directory. Last writer wins; concurrent
/// processes sharing a directory can race (known limitation).
pub struct AuditStore {
    dir: PathBuf,
}

impl AuditStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STORE_FILENAME)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the persisted sequence. A missing file, unreadable JSON, or a
    /// non-array payload all degrade to an empty log; corruption is logged
    /// and never surfaced to the user.
    pub fn load(&self) -> Vec<AuditRecord> {
        let path = self.path();
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str::<Vec<AuditRecord>>(&data) {
            Ok(audits) => audits,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Discarding corrupt audit store");
                Vec::new()
            }
        }
    }

    /// Save the full sequence as pretty-printed JSON. Called once per
    /// completed analysis, never per UI frame.
    pub fn save(&self, audits: &[AuditRecord]) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(audits)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        std::fs::write(self.path(), json)
    }

    /// Erase the store. Removing the snapshot itself must succeed (the purge
    /// caller reports failures); sweeping any leftover files out of the
    /// namespace directory is best-effort.
    pub fn clear(&self) -> io::Result<()> {
        let path = self.path();
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        if let Ok(entries) = std::fs::read_dir(&self.dir) {
            for entry in entries.flatten() {
                let _ = std::fs::remove_file(entry.path());
            }
        }
        let _ = std::fs::remove_dir(&self.dir);
        Ok(())
    }
}
