//! Persisted session state mirror.

use crate::{SessionState, StateResult};
use std::path::PathBuf;
use tracing::debug;

/// Pure persistence for the local session state snapshot.
///
/// No merge logic: callers hand in a complete state, get a complete
/// state back. One store per client process; never shared.
pub trait StateStore: Send + Sync {
    /// Persist the given state, replacing any previous snapshot.
    fn save(&self, state: &SessionState) -> StateResult<()>;

    /// Load the last persisted snapshot, if any.
    fn load(&self) -> StateResult<Option<SessionState>>;

    /// Remove the persisted snapshot (logout).
    fn clear(&self) -> StateResult<()>;
}

/// JSON-file backed state store.
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a store persisting to `path`.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl StateStore for FileStateStore {
    fn save(&self, state: &SessionState) -> StateResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(state)?;
        // Write-then-rename so a crash mid-write can't leave a torn file.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "Persisted session state");
        Ok(())
    }

    fn load(&self) -> StateResult<Option<SessionState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let state: SessionState = serde_json::from_str(&content)?;
        Ok(Some(state))
    }

    fn clear(&self) -> StateResult<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientKind;
    use serde_json::json;
    use tempfile::tempdir;

    fn store_in(dir: &std::path::Path) -> FileStateStore {
        FileStateStore::new(dir.join("session-state.json"))
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let mut state = SessionState::new("user-1", ClientKind::Desktop);
        state.apply_local_setting("theme", json!("dark"), ClientKind::Desktop);
        store.save(&state).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.session_id, state.session_id);
        assert_eq!(loaded.user_id, "user-1");
        assert_eq!(loaded.settings["theme"], json!("dark"));
    }

    #[test]
    fn test_load_missing_returns_none() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_clear_removes_snapshot() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let state = SessionState::new("user-1", ClientKind::Web);
        store.save(&state).unwrap();
        assert!(store.load().unwrap().is_some());

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_clear_when_empty_is_ok() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store.clear().unwrap();
        store.clear().unwrap();
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let first = SessionState::new("user-1", ClientKind::Web);
        store.save(&first).unwrap();

        let second = SessionState::new("user-2", ClientKind::Desktop);
        store.save(&second).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.user_id, "user-2");
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("nested/deeper/state.json"));

        let state = SessionState::new("user-1", ClientKind::Web);
        store.save(&state).unwrap();
        assert!(store.load().unwrap().is_some());
    }
}
