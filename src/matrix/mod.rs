//! Matrix protocol integration for the bot.
//!
//! Everything the bot needs to live on a Matrix homeserver:
//! - End-to-end encryption with cross-signing and key backup
//! - Session persistence so restarts don't re-login
//! - Real-time sync with auto-join on invites
//! - Message sending with replies, mentions and redactions
//!
//! The [`client::MatrixClient`] is the only type the rest of the bot talks
//! to; the encryption, session and sync submodules are wiring behind it.

mod client;
mod encryption;
mod session;
mod sync;

pub use crate::matrix::client::MatrixClient;

/// Credentials for the bot's Matrix account.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    /// Fully qualified Matrix user id, e.g. `@meeple:example.com`
    pub user_id: String,
    /// Account password
    pub password: String,
    /// Passphrase protecting the secret storage and the local store
    pub passphrase: String,
}
