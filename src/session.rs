//! Persisted authenticated identifier
//!
//! Written on successful login, read for the command interface greeting and
//! cleared by the logout command. Clones share the same state.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub user_email: String,
    pub logged_in_at: DateTime<Utc>,
}

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<Option<StoredSession>>>,
    path: Option<PathBuf>,
}

impl SessionStore {
    /// Store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// File-backed store; an unreadable file starts the store empty
    pub fn open(path: &Path) -> Self {
        let stored = match fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<StoredSession>(&content) {
                Ok(session) => {
                    log::info!("Restored session for {}", session.user_email);
                    Some(session)
                }
                Err(e) => {
                    log::warn!("Ignoring corrupt session file {}: {}", path.display(), e);
                    None
                }
            },
            Err(_) => None,
        };

        Self {
            inner: Arc::new(Mutex::new(stored)),
            path: Some(path.to_path_buf()),
        }
    }

    pub fn identifier(&self) -> Option<String> {
        self.inner.lock().as_ref().map(|s| s.user_email.clone())
    }

    pub fn current(&self) -> Option<StoredSession> {
        self.inner.lock().clone()
    }

    pub fn set(&self, identifier: &str) {
        let session = StoredSession {
            user_email: identifier.to_string(),
            logged_in_at: Utc::now(),
        };
        self.persist(Some(&session));
        *self.inner.lock() = Some(session);
        log::info!("Session stored for {}", identifier);
    }

    pub fn clear(&self) {
        let previous = self.inner.lock().take();
        self.persist(None);
        if let Some(session) = previous {
            log::info!("Session cleared for {}", session.user_email);
        }
    }

    /// "Welcome, <id>!" or "Welcome, User!" when nobody is logged in
    pub fn greeting(&self) -> String {
        format!(
            "Welcome, {}!",
            self.identifier().unwrap_or_else(|| "User".to_string())
        )
    }

    // Persistence is best effort; the in-memory value stays authoritative
    fn persist(&self, session: Option<&StoredSession>) {
        let Some(path) = &self.path else {
            return;
        };

        let result = match session {
            Some(session) => toml::to_string_pretty(session)
                .map_err(|e| e.to_string())
                .and_then(|content| fs::write(path, content).map_err(|e| e.to_string())),
            None if path.exists() => fs::remove_file(path).map_err(|e| e.to_string()),
            None => Ok(()),
        };

        if let Err(e) = result {
            log::error!("Failed to persist session to {}: {}", path.display(), e);
        }
    }
}
