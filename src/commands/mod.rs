//! Bot command parsing and response formatting.
//!
//! This module provides the command processing pipeline for the Meeple bot,
//! letting Matrix users create and monitor Board Game Arena tables from chat.
//!
//! # Overview
//!
//! The commands module handles the lifecycle of a bot command:
//! 1. **Tokenizing** - Splitting the message into positional arguments and
//!    `key:value` options with shell quoting rules ([`tokenizer`])
//! 2. **Dispatch** - Mapping the first token onto the command registry and
//!    deciding between one-shot execution and an interactive session
//!    ([`command`], [`commander`])
//! 3. **Execution** - Running the BGA operation ([`actions`])
//! 4. **Response** - Formatting results as Markdown for Matrix display
//!    ([`markdown_response`])
//!
//! # Command Structure
//!
//! All commands start with `!`: `!play <game> <players...> [options...]`.
//!
//! | Command | Alias | Minimum arguments | Below the minimum |
//! |---------|-------|-------------------|-------------------|
//! | `play` | `make` | 2 (game + a player) | interactive menu |
//! | `setup` | | 2 (username + password) | interactive menu |
//! | `link` | | 2 (user + BGA username) | usage message |
//! | `status` | `tables` | 1 (a player) | interactive menu |
//! | `friend` | | 1 (a player) | interactive menu |
//! | `list` | | 0 | |
//! | `options` | | 0 | |
//! | `help` | | 0 | |
//!
//! # Error Handling
//!
//! - **Silent** ([`CommandParseError::NotForBot`]): the message does not start
//!   with `!`. The bot never reacts to ordinary chat.
//! - **User errors** ([`CommandParseError::InvalidCommand`]): unbalanced
//!   quotes, an unknown command, or missing arguments for a one-shot-only
//!   command. The carried message is sent back to the user.

mod actions;
pub mod command;
mod commander;
pub mod markdown_response;
pub mod tokenizer;

pub use crate::commands::actions::{
    execute_add_friends, execute_create_game, execute_link, execute_list,
    execute_save_preference, execute_save_username, execute_show_tables,
    execute_verify_and_save,
};
pub use crate::commands::command::{Command, Dispatch};
pub use crate::commands::commander::Commander;

/// Errors that can occur during command parsing.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandParseError {
    /// Message is not a command at all (silent)
    NotForBot,
    /// Invalid command, with the message to send back
    InvalidCommand(String),
}
