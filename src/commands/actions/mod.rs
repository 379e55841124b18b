//! Command action handlers.
//!
//! Individual handler functions for each BGA operation the bot performs. Both
//! invocation paths end here: a one-shot command calls a handler directly, and
//! an interactive session hands its
//! [`CompletedAction`](crate::interaction::CompletedAction) to the very same
//! handler, so the two paths cannot drift apart.
//!
//! # Handler Pattern
//!
//! Handlers follow a consistent pattern:
//! 1. Receive a fresh [`Requester`](crate::bga::requester::Requester) and the stores
//! 2. Resolve an authenticated session from the invoker's credentials
//! 3. Drive the BGA endpoints
//! 4. Return the Markdown reply for the room
//!
//! Handlers own their error reporting: an expected failure (no credentials, a
//! player BGA does not know) becomes part of the reply, never a crash.

mod friend;
mod link;
mod list;
mod play;
mod setup;
mod status;

pub use crate::commands::actions::{
    friend::execute_add_friends, link::execute_link, list::execute_list,
    play::execute_create_game, setup::execute_save_preference, setup::execute_save_username,
    setup::execute_verify_and_save, status::execute_show_tables,
};

use crate::bga::account::BgaSession;
use crate::bga::requester::Requester;
use crate::creds::CredStore;

/// Turns a player argument into a BGA player id.
///
/// A chat mention (`@alice:example.com`) resolves through the credential
/// store; anything else is looked up on BGA by name. The error is the
/// user-facing reason the player could not be resolved.
pub(crate) async fn resolve_player_id<R: Requester>(
    session: &BgaSession<R>,
    creds: &CredStore,
    player: &str,
) -> Result<String, String> {
    let name = if player.starts_with('@') {
        match creds.get(player).await {
            Some(record) if !record.username.is_empty() => {
                if let Some(id) = record.bga_user_id {
                    return Ok(id);
                }
                record.username
            }
            _ => return Err(format!("{} has no linked BGA account", player)),
        }
    } else {
        player.to_owned()
    };

    match session.find_player_id(&name).await {
        Ok(Some(id)) => Ok(id),
        Ok(None) => Err(format!("no BGA player named {}", name)),
        Err(error) => Err(error.to_string()),
    }
}
