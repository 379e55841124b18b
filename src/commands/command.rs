//! Command registry and dispatch decisions.
//!
//! This module maps a tokenized message onto the bot's command registry and
//! decides whether the command runs immediately or opens an interactive
//! session. A command below its minimum argument count does not fail: whatever
//! was given seeds the session so the user is only asked for what is missing.

use log::debug;

use crate::commands::tokenizer::TokenizedInput;
use crate::interaction::{SessionSeed, Subcommand};

/// A fully specified one-shot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a table: game name, co-players, table options
    Play {
        game: String,
        players: Vec<String>,
        options: Vec<(String, String)>,
    },
    /// Link and verify a BGA account for the sender
    Setup { username: String, password: String },
    /// Link a BGA username to a user without a password
    Link { user: String, username: String },
    /// List running tables for the named players
    Status { players: Vec<String> },
    /// Add the named players as BGA friends
    Friend { names: Vec<String> },
    /// List the games BGA offers
    List,
    /// Describe the table options
    Options,
    /// Describe the commands
    Help,
}

/// What the dispatcher decided to do with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Enough arguments: execute now
    OneShot(Command),
    /// Too few arguments for an interactive command: open a session
    StartSession {
        subcommand: Subcommand,
        seed: SessionSeed,
    },
}

/// Errors mapping a tokenized message onto the registry.
#[derive(Debug, PartialEq, Eq)]
pub enum DispatchError {
    /// The first token does not name a command
    Unknown(String),
    /// A one-shot-only command is missing arguments
    MissingArguments(&'static str),
}

/// The command keywords, as `help` lists them.
pub const COMMAND_NAMES: [&str; 8] = [
    "play", "setup", "link", "status", "friend", "list", "options", "help",
];

/// Maps a tokenized message onto the registry.
///
/// The caller has already checked the `!` sigil; `input.command` arrives with
/// it still attached. Aliases (`make` for `play`, `tables` for `status`) are
/// resolved here.
pub fn dispatch(input: &TokenizedInput) -> Result<Dispatch, DispatchError> {
    let keyword = input
        .command
        .trim_start_matches('!')
        .to_lowercase();
    debug!("dispatching command {}", &keyword);

    match keyword.as_str() {
        "play" | "make" => Ok(dispatch_play(input)),
        "setup" => Ok(dispatch_setup(input)),
        "link" => dispatch_link(input),
        "status" | "tables" => Ok(dispatch_status(input)),
        "friend" => Ok(dispatch_friend(input)),
        "list" => Ok(Dispatch::OneShot(Command::List)),
        "options" => Ok(Dispatch::OneShot(Command::Options)),
        "help" => Ok(Dispatch::OneShot(Command::Help)),
        _ => Err(DispatchError::Unknown(keyword)),
    }
}

/// `play` needs a game and at least one player to run one-shot.
fn dispatch_play(input: &TokenizedInput) -> Dispatch {
    if input.positional.len() >= 2 {
        Dispatch::OneShot(Command::Play {
            game: input.positional[0].clone(),
            players: input.positional[1..].to_vec(),
            options: input.options.clone(),
        })
    } else {
        Dispatch::StartSession {
            subcommand: Subcommand::Play,
            seed: SessionSeed {
                game_name: input.positional.first().cloned(),
                players: Vec::new(),
                options: input.options.clone(),
            },
        }
    }
}

/// `setup` needs a username and a password to run one-shot.
fn dispatch_setup(input: &TokenizedInput) -> Dispatch {
    if input.positional.len() >= 2 {
        Dispatch::OneShot(Command::Setup {
            username: input.positional[0].clone(),
            password: input.positional[1].clone(),
        })
    } else {
        Dispatch::StartSession {
            subcommand: Subcommand::Setup,
            seed: SessionSeed {
                players: input.positional.clone(),
                ..Default::default()
            },
        }
    }
}

/// `link` is one-shot only; missing arguments get a usage message.
fn dispatch_link(input: &TokenizedInput) -> Result<Dispatch, DispatchError> {
    if input.positional.len() >= 2 {
        Ok(Dispatch::OneShot(Command::Link {
            user: input.positional[0].clone(),
            username: input.positional[1].clone(),
        }))
    } else {
        Err(DispatchError::MissingArguments(
            "Usage: `!link <user> <BGA username>`.",
        ))
    }
}

fn dispatch_status(input: &TokenizedInput) -> Dispatch {
    if !input.positional.is_empty() {
        Dispatch::OneShot(Command::Status {
            players: input.positional.clone(),
        })
    } else {
        Dispatch::StartSession {
            subcommand: Subcommand::Status,
            seed: SessionSeed::default(),
        }
    }
}

fn dispatch_friend(input: &TokenizedInput) -> Dispatch {
    if !input.positional.is_empty() {
        Dispatch::OneShot(Command::Friend {
            names: input.positional.clone(),
        })
    } else {
        Dispatch::StartSession {
            subcommand: Subcommand::Friend,
            seed: SessionSeed::default(),
        }
    }
}
