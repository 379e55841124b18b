//! Handler for linking an account without a password.

use log::warn;

use crate::commands::markdown_response::format_link_saved;
use crate::creds::CredStore;

/// Links a BGA username to a user with an empty password.
///
/// A link-only record lets the bot resolve the user's mentions to a BGA
/// player, but it never acts on their behalf. The password stays empty until
/// the user runs `setup` themselves.
pub async fn execute_link(creds: &CredStore, user: &str, username: &str) -> String {
    let update = creds
        .update(user, |record| {
            record.username = username.to_owned();
            record.password = String::new();
        })
        .await;
    match update {
        Ok(_) => format_link_saved(user, username),
        Err(error) => {
            warn!("linking {} failed: {:#}", user, error);
            "I could not save the link, please try again.".to_owned()
        }
    }
}
