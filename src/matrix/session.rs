//! Persistence of the Matrix login session and sync token.
//!
//! The bot stores two things under its data directory:
//! - `session`: a JSON file with the authenticated user session and the last
//!   sync token
//! - `sqlite`: the SQLite store the Matrix SDK uses for state and keys

use std::{fs::exists, path::PathBuf};

use log::{debug, trace};
use matrix_sdk::authentication::matrix;
use serde::{Deserialize, Serialize};
use tokio::fs;

/// On-disk shape of the `session` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedSession {
    /// The authenticated Matrix user session.
    user_session: matrix::MatrixSession,

    /// The latest sync token, absent until the first successful sync.
    #[serde(skip_serializing_if = "Option::is_none")]
    sync_token: Option<String>,
}

/// Loads and persists the bot's Matrix session.
///
/// Created once at startup from the data directory. When a `session` file is
/// found it is loaded so the client can be restored without logging in again.
#[derive(Clone)]
pub struct MatrixSession {
    /// The loaded session, if a session file existed.
    session: Option<PersistedSession>,
    /// `dir_path/sqlite`
    sqlite_path: String,
    /// `dir_path/session`
    session_path: String,
}

impl MatrixSession {
    /// Creates a session manager rooted at `dir_path`.
    ///
    /// An existing `session` file is loaded if present; a missing or unreadable
    /// file just means no session, never an error.
    pub async fn new(dir_path: &str) -> Result<MatrixSession, anyhow::Error> {
        let sqlite_path_buf: PathBuf = [dir_path, "sqlite"].iter().collect();
        let sqlite_path = sqlite_path_buf.to_str().unwrap().to_owned();

        let session_path_buf: PathBuf = [dir_path, "session"].iter().collect();
        let session_path = session_path_buf.to_str().unwrap().to_owned();
        debug!("session file at {}", session_path);

        let session = MatrixSession::read_session(&session_path).await.ok();
        debug!("found stored session: {}", session.is_some());

        Ok(MatrixSession {
            session,
            sqlite_path,
            session_path,
        })
    }

    /// Reads and parses the session file at `session_path`.
    async fn read_session(session_path: &str) -> Result<PersistedSession, anyhow::Error> {
        if !exists(session_path).unwrap_or_default() {
            return Err(anyhow::anyhow!("session file does not exist"));
        }

        let session_data = fs::read_to_string(session_path).await?;
        let session: PersistedSession = serde_json::from_str(&session_data)?;
        Ok(session)
    }

    /// Whether a stored session was found at startup.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Path to the SQLite store used by the Matrix SDK.
    pub fn get_sqlite_path(&self) -> String {
        self.sqlite_path.clone()
    }

    /// The stored user session, if one was loaded.
    pub fn get_user_session(&self) -> Option<&matrix::MatrixSession> {
        self.session.as_ref().map(|s| &s.user_session)
    }

    /// The stored sync token, if one was loaded.
    pub fn get_sync_token(&self) -> Option<String> {
        self.session.as_ref().and_then(|s| s.sync_token.clone())
    }

    /// Writes a new sync token into the session file, keeping the user
    /// session that is already there.
    pub async fn persist_sync_token(&self, sync_token: String) -> anyhow::Result<()> {
        trace!("persist sync token {}", sync_token);

        let serialized = fs::read_to_string(&self.session_path).await?;
        let mut stored: PersistedSession = serde_json::from_str(&serialized)?;

        stored.sync_token = Some(sync_token);
        let serialized = serde_json::to_string(&stored)?;
        fs::write(&self.session_path, serialized).await?;

        Ok(())
    }

    /// Writes a freshly authenticated user session to disk.
    ///
    /// The sync token starts out empty; it is filled in by
    /// [`MatrixSession::persist_sync_token`] once syncing starts.
    pub async fn persist_user_session(
        &self,
        user_session: &matrix::MatrixSession,
    ) -> anyhow::Result<()> {
        trace!("persist user session");

        let stored = PersistedSession {
            user_session: user_session.clone(),
            sync_token: None,
        };

        let serialized = serde_json::to_string(&stored)?;
        fs::write(&self.session_path, serialized).await?;

        Ok(())
    }
}
