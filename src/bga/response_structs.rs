//! Response structures for Board Game Arena endpoints.
//!
//! This module contains structures for deserializing JSON responses from the
//! BGA website. BGA is not a stable API: numbers arrive as strings or integers
//! depending on the endpoint, so the models are deliberately forgiving.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// Generic envelope for the dojo endpoints (`createnew.html`, `invitePlayer.html`, ...).
///
/// A `status` of `"0"` (or `0`) means the operation failed and `error` carries
/// the human-readable reason.
#[derive(Deserialize, Debug)]
pub struct StatusResponse {
    /// Operation status, `"0"`/`0` on failure
    #[serde(default)]
    pub status: Value,
    /// Error message when the status signals failure
    #[serde(default)]
    pub error: Option<String>,
    /// Endpoint-specific payload
    #[serde(default)]
    pub data: Option<Value>,
}

impl StatusResponse {
    /// Whether the response signals an application-level failure.
    pub fn is_error(&self) -> bool {
        match &self.status {
            Value::String(s) => s == "0",
            Value::Number(n) => n.as_i64() == Some(0),
            _ => false,
        }
    }

    /// The table id from a `createnew.html` response, if present.
    ///
    /// BGA returns the id as either a number or a numeric string.
    pub fn table_id(&self) -> Option<u64> {
        let table = self.data.as_ref()?.get("table")?;
        match table {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Response from `/player/player/findplayer.html`.
#[derive(Deserialize, Debug)]
pub struct FindPlayerResponse {
    /// Matching players, best match first
    #[serde(default)]
    pub items: Vec<FindPlayerItem>,
}

/// A single player search result.
#[derive(Deserialize, Debug)]
pub struct FindPlayerItem {
    /// BGA player id, as either a number or a numeric string
    pub id: Value,
}

impl FindPlayerItem {
    /// The player id as a string, whatever JSON type BGA used.
    pub fn id_string(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Response from `/tablemanager/tablemanager/tableinfos.html`.
#[derive(Deserialize, Debug)]
pub struct TableInfosResponse {
    /// Payload wrapper
    pub data: TableInfosData,
}

/// Payload of a `tableinfos.html` response.
#[derive(Deserialize, Debug)]
pub struct TableInfosData {
    /// The player's tables, indexed by table id
    #[serde(default)]
    pub tables: HashMap<String, TableInfo>,
}

/// A running or scheduled table a player sits at.
#[derive(Deserialize, Debug, Clone)]
pub struct TableInfo {
    /// Table id
    pub id: String,
    /// Internal game name, used in the game page url
    #[serde(default)]
    pub game_name: String,
    /// Catalog id of the game
    #[serde(default)]
    pub game_id: String,
    /// Game server host fragment, used in the game page url
    #[serde(default)]
    pub gameserver: String,
    /// Players at the table, indexed by player id
    #[serde(default)]
    pub players: HashMap<String, TablePlayer>,
    /// Ids of the players at the table
    #[serde(default)]
    pub player_display: Vec<String>,
    /// Unix timestamp of the game start, absent for scheduled games
    #[serde(default)]
    pub gamestart: Option<String>,
    /// Unix timestamp of the scheduled start, for games not yet started
    #[serde(default)]
    pub scheduled: Option<String>,
}

impl TableInfo {
    /// The start timestamp: the actual start when available, the scheduled one otherwise.
    pub fn start_timestamp(&self) -> Option<i64> {
        self.gamestart
            .as_deref()
            .or(self.scheduled.as_deref())
            .and_then(|ts| ts.parse().ok())
    }
}

impl fmt::Display for TableInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "table-id={}, game={}, players={:?}",
            self.id, self.game_name, self.player_display
        )
    }
}

/// A player entry inside a [`TableInfo`].
#[derive(Deserialize, Debug, Clone)]
pub struct TablePlayer {
    /// Display name of the player
    #[serde(default)]
    pub fullname: String,
}
