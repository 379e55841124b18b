//! Authenticated Board Game Arena sessions.
//!
//! Acting on BGA on a user's behalf requires their stored credentials and a
//! fresh login. [`get_active_session`] turns a [`CredentialRecord`] into a
//! [`BgaSession`], distinguishing the ways this can fail so the caller can
//! tell the user exactly what to fix. The session wraps a [`Requester`] and
//! orchestrates the multi-request operations, like creating a table and then
//! applying each of its options.

use std::fmt;

use log::{info, warn};

use crate::bga::BgaError;
use crate::bga::options::{OptionError, build_option_requests};
use crate::bga::requester::Requester;
use crate::creds::CredentialRecord;

/// Why a session could not be established for a user.
#[derive(Debug)]
pub enum SessionError {
    /// The user never linked a BGA account
    NoCredentials,
    /// The account is linked without a password, so the bot may not act as them
    NoPasswordOnFile,
    /// BGA rejected the stored credentials
    AuthenticationFailed,
    /// Talking to BGA failed before credentials could be checked
    Remote(BgaError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NoCredentials => {
                write!(
                    f,
                    "You have no Board Game Arena account linked. Run `!setup` to link one."
                )
            }
            SessionError::NoPasswordOnFile => {
                write!(
                    f,
                    "Your Board Game Arena account is linked without a password, so I cannot act on your behalf. Run `!setup` to save one."
                )
            }
            SessionError::AuthenticationFailed => {
                write!(
                    f,
                    "Board Game Arena rejected your stored credentials. Run `!setup` to update them."
                )
            }
            SessionError::Remote(error) => write!(f, "{}", error),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<BgaError> for SessionError {
    fn from(error: BgaError) -> Self {
        SessionError::Remote(error)
    }
}

/// Why applying options to a freshly created table failed.
#[derive(Debug)]
pub enum ApplyOptionsError {
    /// The user supplied an invalid option
    Invalid(OptionError),
    /// An endpoint call failed
    Remote(BgaError),
}

impl fmt::Display for ApplyOptionsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyOptionsError::Invalid(error) => write!(f, "{}", error),
            ApplyOptionsError::Remote(error) => write!(f, "{}", error),
        }
    }
}

impl std::error::Error for ApplyOptionsError {}

impl From<OptionError> for ApplyOptionsError {
    fn from(error: OptionError) -> Self {
        ApplyOptionsError::Invalid(error)
    }
}

impl From<BgaError> for ApplyOptionsError {
    fn from(error: BgaError) -> Self {
        ApplyOptionsError::Remote(error)
    }
}

/// An authenticated session on BGA, acting as one user.
pub struct BgaSession<R: Requester> {
    requester: R,
    /// BGA account name, for log lines
    username: String,
}

/// Logs in with a user's stored credentials.
///
/// # Errors
///
/// * [`SessionError::NoCredentials`] when `record` is `None`
/// * [`SessionError::NoPasswordOnFile`] for link-only records
/// * [`SessionError::AuthenticationFailed`] when BGA rejects the password
/// * [`SessionError::Remote`] when BGA is unreachable
pub async fn get_active_session<R: Requester>(
    requester: R,
    record: Option<&CredentialRecord>,
) -> Result<BgaSession<R>, SessionError> {
    let record = record.ok_or(SessionError::NoCredentials)?;
    if record.password.is_empty() {
        return Err(SessionError::NoPasswordOnFile);
    }

    if !requester.login(&record.username, &record.password).await? {
        return Err(SessionError::AuthenticationFailed);
    }

    Ok(BgaSession {
        requester,
        username: record.username.clone(),
    })
}

impl<R: Requester> BgaSession<R> {
    /// Creates a new async table and returns its id.
    ///
    /// The account is first removed from any leftover realtime table or
    /// friends session, since BGA refuses to create a table otherwise.
    pub async fn create_table(&self, game_id: u32) -> Result<u64, BgaError> {
        self.requester.quit_table().await?;
        self.requester.quit_playing_with_friends().await?;

        let table_id = self.requester.create_table(game_id).await?;
        info!("created table {} as {}", table_id, &self.username);
        Ok(table_id)
    }

    /// Applies a merged option list to a table, in order.
    ///
    /// The creator's group list is only scraped when an option needs it. The
    /// first invalid option aborts before any request is sent, so a rejected
    /// command never leaves a half-configured table behind.
    pub async fn apply_options(
        &self,
        table_id: u64,
        options: &[(String, String)],
        is_contributor: bool,
    ) -> Result<(), ApplyOptionsError> {
        let groups = if options.iter().any(|(key, _)| key == "restrictgroup") {
            self.requester.get_group_options(table_id).await?
        } else {
            Vec::new()
        };

        let requests = build_option_requests(options, &groups, is_contributor)?;
        for request in &requests {
            self.requester.set_option(table_id, request).await?;
        }
        Ok(())
    }

    /// Invites a BGA player to a table.
    pub async fn invite_player(&self, table_id: u64, player_id: &str) -> Result<(), BgaError> {
        self.requester.invite_player(table_id, player_id).await
    }

    /// Finds a BGA player id by name.
    pub async fn find_player_id(&self, name: &str) -> Result<Option<String>, BgaError> {
        self.requester.find_player_id(name).await
    }

    /// Adds a player to the account's friend list.
    pub async fn add_friend(&self, player_id: &str) -> Result<(), BgaError> {
        self.requester.add_friend(player_id).await
    }

    /// Lists the tables a player sits at.
    pub async fn get_tables(
        &self,
        player_id: &str,
    ) -> Result<Vec<crate::bga::response_structs::TableInfo>, BgaError> {
        self.requester.get_tables(player_id).await
    }

    /// Scrapes progress and move count for a table.
    pub async fn get_table_stats(
        &self,
        table: &crate::bga::response_structs::TableInfo,
    ) -> Result<crate::bga::requester::TableStats, BgaError> {
        self.requester.get_table_stats(table).await
    }

    /// Abandons a table the session's account created.
    ///
    /// Used to undo a creation after a later step failed.
    pub async fn abandon_table(&self) -> Result<(), BgaError> {
        self.requester.quit_table().await
    }

    /// Public url of a table.
    pub fn table_url(&self, table_id: u64) -> String {
        self.requester.table_url(table_id)
    }

    /// Logs the session out. Failures are logged, not propagated, since the
    /// operation the user asked for already happened.
    pub async fn close(self) {
        if let Err(error) = self.requester.logout().await {
            warn!("logout as {} failed: {}", &self.username, error);
        }
    }
}
