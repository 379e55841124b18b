//! Stored Board Game Arena credentials and preferences.
//!
//! Every chat user who links a BGA account gets one [`CredentialRecord`],
//! persisted as a JSON file under the bot's data directory. The record also
//! carries the user's saved table option preferences, global and per-game.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Stored account data for one chat user.
///
/// An empty `password` means the account is linked to the chat user but the
/// bot may not act on their behalf.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialRecord {
    /// BGA account name
    pub username: String,
    /// BGA password, empty for link-only records
    #[serde(default)]
    pub password: String,
    /// BGA player id, filled in after the first successful lookup
    #[serde(default)]
    pub bga_user_id: Option<String>,
    /// Table option preferences applied to every game
    #[serde(default)]
    pub default_options: BTreeMap<String, String>,
    /// Table option preferences per game display name
    #[serde(default)]
    pub game_options: BTreeMap<String, BTreeMap<String, String>>,
}

impl CredentialRecord {
    /// The saved preferences for one game, global and per-game merged views
    /// are assembled by the caller.
    pub fn options_for_game(&self, game: &str) -> Vec<(String, String)> {
        self.game_options
            .get(game)
            .map(|options| {
                options
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The saved global preferences as an ordered list.
    pub fn global_options(&self) -> Vec<(String, String)> {
        self.default_options
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// JSON-file-backed store of credential records, keyed by chat user id.
pub struct CredStore {
    /// Path of the JSON file
    path: PathBuf,
    /// In-memory records, flushed to disk after every change
    records: Mutex<HashMap<String, CredentialRecord>>,
}

impl CredStore {
    /// Opens the store, reading the JSON file when it exists.
    ///
    /// # Errors
    ///
    /// Fails when the file exists but cannot be read or parsed. A corrupt
    /// credential file should stop the bot rather than silently losing
    /// everyone's accounts.
    pub async fn open(path: &Path) -> Result<Self> {
        let records = match tokio::fs::read_to_string(path).await {
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("Unable to parse {}", path.display()))?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                info!("no credential file at {}, starting empty", path.display());
                HashMap::new()
            }
            Err(error) => {
                return Err(error).with_context(|| format!("Unable to read {}", path.display()));
            }
        };

        Ok(CredStore {
            path: path.to_path_buf(),
            records: Mutex::new(records),
        })
    }

    /// The record of a chat user, if they linked an account.
    pub async fn get(&self, user_id: &str) -> Option<CredentialRecord> {
        self.records.lock().await.get(user_id).cloned()
    }

    /// Applies a change to a chat user's record and persists the store.
    ///
    /// The record is created on first use. Any change is written to disk
    /// before this returns, so a restart never loses a saved credential.
    pub async fn update<F>(&self, user_id: &str, apply: F) -> Result<CredentialRecord>
    where
        F: FnOnce(&mut CredentialRecord),
    {
        let mut records = self.records.lock().await;
        let record = records.entry(user_id.to_owned()).or_default();
        apply(record);
        let updated = record.clone();

        let serialized = serde_json::to_string_pretty(&*records)?;
        tokio::fs::write(&self.path, serialized)
            .await
            .with_context(|| format!("Unable to write {}", self.path.display()))?;
        debug!("credential store persisted for {}", user_id);

        Ok(updated)
    }

    /// Saves or deletes one option preference.
    ///
    /// `game` of `None` targets the global preferences. An empty value deletes
    /// the preference instead of storing it.
    pub async fn set_preference(
        &self,
        user_id: &str,
        game: Option<&str>,
        key: &str,
        value: &str,
    ) -> Result<CredentialRecord> {
        self.update(user_id, |record| {
            let options = match game {
                Some(game) => record.game_options.entry(game.to_owned()).or_default(),
                None => &mut record.default_options,
            };
            if value.is_empty() {
                options.remove(key);
            } else {
                options.insert(key.to_owned(), value.to_owned());
            }
            if let Some(game) = game
                && record
                    .game_options
                    .get(game)
                    .is_some_and(|options| options.is_empty())
            {
                record.game_options.remove(game);
            }
        })
        .await
    }
}
