//! Signed-in user state for the client.
//!
//! One `Session` is created at startup with `Session::init`, which
//! hydrates it from disk once, and is then handed to whatever needs to
//! know who is logged in. `logout` clears both the in-memory copy and the
//! file.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use super::ClientError;
use crate::config;
use crate::models::UserSummary;

/// What survives a restart: the bearer token and who it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub user: UserSummary,
}

pub struct Session {
    path: PathBuf,
    current: RwLock<Option<StoredSession>>,
}

impl Session {
    /// `~/ClinicData/session.json`
    pub fn default_path() -> PathBuf {
        config::app_data_dir().join("session.json")
    }

    /// Load the persisted session at `path`, if any.
    ///
    /// A missing file means logged out. An unreadable or corrupt file is
    /// logged and also treated as logged out.
    pub fn init(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let current = match load(&path) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable session file");
                None
            }
        };
        if let Some(stored) = &current {
            tracing::debug!(user_id = stored.user.id, "Session restored");
        }
        Self {
            path,
            current: RwLock::new(current),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn user(&self) -> Option<UserSummary> {
        self.read().map(|s| s.user)
    }

    pub fn token(&self) -> Option<String> {
        self.read().map(|s| s.token)
    }

    pub fn is_logged_in(&self) -> bool {
        self.read().is_some()
    }

    /// Persist, then publish in memory.
    pub fn login(&self, token: String, user: UserSummary) -> Result<(), ClientError> {
        let stored = StoredSession { token, user };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(&stored)?)?;

        let mut guard = self.current.write().map_err(|_| ClientError::LockPoisoned)?;
        *guard = Some(stored);
        Ok(())
    }

    /// Forget the user in memory and on disk.
    pub fn logout(&self) -> Result<(), ClientError> {
        {
            let mut guard = self.current.write().map_err(|_| ClientError::LockPoisoned)?;
            *guard = None;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn read(&self) -> Option<StoredSession> {
        self.current.read().ok().and_then(|guard| guard.clone())
    }
}

fn load(path: &Path) -> Result<Option<StoredSession>, ClientError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
