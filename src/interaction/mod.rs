//! Interactive multi-turn menus.
//!
//! A command given without enough arguments does not fail: it opens a
//! per-user session and the bot walks the user through numbered menus until
//! the operation is fully specified or the user cancels. This module contains
//! the session types, their storage ([`store`]) and the state machine that
//! advances a session on each message ([`engine`]).
//!
//! The engine itself is synchronous and talks to nobody: it receives a catalog
//! snapshot and the user's credential record along with the message, and hands
//! any finished operation back as a [`CompletedAction`] for the command
//! handlers to execute. This keeps every state transition unit-testable and
//! means a session is never left locked across a network call.

pub mod engine;
mod friend;
mod play;
mod setup;
mod status;
pub mod store;

use std::time::Instant;

use crate::bga::GameCatalogEntry;
use crate::creds::CredentialRecord;

pub use crate::interaction::engine::{EngineInput, InteractionEngine};

/// The command a session is gathering arguments for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subcommand {
    Play,
    Setup,
    Status,
    Friend,
}

/// Where in its menu graph a session currently sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuContext {
    /// Waiting for a game name
    ChooseGame,
    /// Main play menu: create, add player, set option, change channel
    GameOptionMenu,
    /// Waiting for a player name to add to the table
    AddPlayer,
    /// Numbered list of option keys
    OptionMenu,
    /// Waiting for a value for the named option
    OptionValue(String),
    /// Waiting for a room to announce the table in
    ChangeChannel,
    /// Main setup menu: username, password, default options, per-game options
    SetupMenu,
    /// Waiting for a BGA username
    Username,
    /// Waiting for a BGA password
    Password,
    /// Waiting for the game whose preferences to edit
    ChooseGamePrefs,
    /// Main status menu: show, filter by game, add player
    StatusMenu,
    /// Waiting for the game to filter the status listing by
    ChooseStatusGame,
    /// Waiting for a player name to include in the status listing
    AddStatusPlayer,
    /// Waiting for a friend name, `0` finishes
    AddFriendName,
}

/// Arguments gathered so far for the session's command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    /// Resolved game for table creation
    pub game: Option<GameCatalogEntry>,
    /// Player names or mentions, the invoker first
    pub players: Vec<String>,
    /// Table options given so far, in order
    pub options: Vec<(String, String)>,
    /// Room to announce the created table in
    pub channel: Option<String>,
    /// Game display name the session's preference edits are pinned to
    pub pinned_game: Option<String>,
    /// BGA username typed earlier in the same setup session
    pub username: Option<String>,
}

/// One user's interactive session.
#[derive(Debug, Clone)]
pub struct UserSession {
    /// Chat user the session belongs to
    pub user_id: String,
    /// Command being gathered
    pub subcommand: Subcommand,
    /// Current menu state
    pub context: MenuContext,
    /// Arguments gathered so far
    pub draft: Draft,
    /// When the user last said something, for expiry
    pub last_activity: Instant,
}

/// Arguments a session seeds from the command that opened it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSeed {
    /// Raw game name, resolved when the session opens
    pub game_name: Option<String>,
    /// Player names given on the command line
    pub players: Vec<String>,
    /// Options given on the command line
    pub options: Vec<(String, String)>,
}

/// A fully specified operation handed back by the engine for execution.
///
/// These are executed by the same handlers the one-shot command path uses, so
/// interactive and one-shot invocations cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletedAction {
    /// Create a table, apply options, invite players
    CreateGame {
        game: GameCatalogEntry,
        players: Vec<String>,
        options: Vec<(String, String)>,
        channel: String,
    },
    /// Save a BGA username for the user
    SaveUsername { username: String },
    /// Verify a username/password pair against BGA and save it
    VerifyAndSavePassword { username: String, password: String },
    /// Save one option preference, global or pinned to a game
    SavePreference {
        game: Option<String>,
        key: String,
        value: String,
    },
    /// List running tables for the named players
    ShowTables {
        game: Option<String>,
        players: Vec<String>,
    },
    /// Add the named players as BGA friends
    AddFriends { names: Vec<String> },
}

/// Context the subcommand state machines receive along with each message.
pub struct StepInput<'a> {
    /// Trimmed message body
    pub body: &'a str,
    /// Catalog snapshot for game name resolution
    pub catalog: &'a [GameCatalogEntry],
    /// The user's stored credentials, if any
    pub record: Option<&'a CredentialRecord>,
}

/// Outcome of advancing a session by one message.
pub struct Step {
    /// Replies to send, in order
    pub messages: Vec<String>,
    /// Operation to execute, if one completed
    pub action: Option<CompletedAction>,
    /// Whether the session is finished and should be dropped
    pub done: bool,
}

impl Step {
    /// A reply that keeps the session in place.
    pub fn reply(message: String) -> Self {
        Step {
            messages: vec![message],
            action: None,
            done: false,
        }
    }

    /// A reply with an action that keeps the session in place.
    pub fn reply_with_action(message: String, action: CompletedAction) -> Self {
        Step {
            messages: vec![message],
            action: Some(action),
            done: false,
        }
    }

    /// Ends the session, optionally handing over a final action.
    pub fn finish(messages: Vec<String>, action: Option<CompletedAction>) -> Self {
        Step {
            messages,
            action,
            done: true,
        }
    }
}
