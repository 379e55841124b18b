//! Command orchestration.
//!
//! This module provides the [`Commander`] struct, the entry point turning a raw
//! Matrix message into a dispatch decision.
//!
//! # Flow
//!
//! ```text
//! Matrix Message → parse() → Dispatch::OneShot(Command)
//!                          → Dispatch::StartSession { subcommand, seed }
//! ```
//!
//! Messages that do not start with `!` are silently ignored
//! ([`CommandParseError::NotForBot`]); anything else that fails to parse gets a
//! user-facing error message.

use crate::commands::command::{DispatchError, dispatch};
use crate::commands::markdown_response::{format_unbalanced_quotes, format_unknown_command};
use crate::commands::tokenizer::{TokenizeError, tokenize};
use crate::commands::{CommandParseError, Dispatch};

/// Parser and dispatcher for bot commands.
///
/// # Examples
///
/// ```
/// # use meeple::commands::{Commander, Dispatch, Command};
/// let commander = Commander::new();
/// let dispatch = commander.parse("!help").unwrap();
/// assert_eq!(dispatch, Dispatch::OneShot(Command::Help));
/// ```
pub struct Commander;

impl Default for Commander {
    fn default() -> Self {
        Self::new()
    }
}

impl Commander {
    pub fn new() -> Self {
        Commander
    }

    /// Parses a Matrix message body into a dispatch decision.
    ///
    /// # Arguments
    ///
    /// * `body` - The raw message text from Matrix
    ///
    /// # Returns
    ///
    /// * `Ok(Dispatch)` - The command to run, or the session to open
    /// * `Err(CommandParseError::NotForBot)` - Not a command; stay silent
    /// * `Err(CommandParseError::InvalidCommand)` - Bad command, with the
    ///   message to send back
    pub fn parse(&self, body: &str) -> Result<Dispatch, CommandParseError> {
        let trimmed = body.trim();
        if !trimmed.starts_with('!') {
            return Err(CommandParseError::NotForBot);
        }

        let input = match tokenize(trimmed) {
            Ok(input) => input,
            Err(TokenizeError::UnbalancedQuotes(raw)) => {
                return Err(CommandParseError::InvalidCommand(format_unbalanced_quotes(
                    &raw,
                )));
            }
        };

        match dispatch(&input) {
            Ok(dispatch) => Ok(dispatch),
            Err(DispatchError::Unknown(keyword)) => Err(CommandParseError::InvalidCommand(
                format_unknown_command(&keyword),
            )),
            Err(DispatchError::MissingArguments(usage)) => {
                Err(CommandParseError::InvalidCommand(usage.to_owned()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;
    use crate::interaction::Subcommand;

    #[test]
    fn test_parse_plain_chat_is_not_for_bot() {
        let commander = Commander::new();
        assert_eq!(
            commander.parse("shall we play a game?"),
            Err(CommandParseError::NotForBot)
        );
    }

    #[test]
    fn test_parse_one_shot_play() {
        let commander = Commander::new();
        let dispatch = commander.parse("!play ra bob").unwrap();
        assert!(matches!(dispatch, Dispatch::OneShot(Command::Play { .. })));
    }

    #[test]
    fn test_parse_interactive_play() {
        let commander = Commander::new();
        let dispatch = commander.parse("!play").unwrap();
        assert!(matches!(
            dispatch,
            Dispatch::StartSession {
                subcommand: Subcommand::Play,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_unknown_command_lists_registry() {
        let commander = Commander::new();
        match commander.parse("!dance") {
            Err(CommandParseError::InvalidCommand(message)) => {
                assert!(message.contains("dance"));
                assert!(message.contains("play"));
                assert!(message.contains("help"));
            }
            other => panic!("expected InvalidCommand, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_unbalanced_quotes_echoes_input() {
        let commander = Commander::new();
        match commander.parse("!play \"race for the") {
            Err(CommandParseError::InvalidCommand(message)) => {
                assert!(message.contains("race for the"));
            }
            other => panic!("expected InvalidCommand, got {:?}", other),
        }
    }
}
