//! Matrix client encryption setup and recovery.
//!
//! End-to-end encryption needs three pieces working together: cross-signing
//! for device trust, key backup so message keys survive restarts, and secret
//! storage protected by a passphrase. [`setup_client`] wires all three up,
//! either by logging in fresh or by restoring a persisted session.

use anyhow::bail;
use log::{debug, error, info};
use matrix_sdk::{
    Client,
    encryption::{
        BackupDownloadStrategy, EncryptionSettings,
        recovery::{RecoveryError, RecoveryState},
    },
    ruma::{OwnedUserId, api::client::uiaa},
};

use crate::matrix::{UserCredentials, session::MatrixSession};

/// Bootstraps cross-signing if the account does not have it yet.
///
/// The first attempt runs without authentication; when the homeserver answers
/// with a UIAA challenge the call is retried with the account password.
///
/// See <https://docs.rs/matrix-sdk/latest/matrix_sdk/encryption/struct.Encryption.html#method.bootstrap_cross_signing_if_needed>
async fn bootstrap_cross_signing(
    client: &Client,
    credentials: &UserCredentials,
) -> Result<(), anyhow::Error> {
    debug!("setting up cross signing");

    if let Err(e) = client
        .encryption()
        .bootstrap_cross_signing_if_needed(None)
        .await
    {
        let Some(response) = e.as_uiaa_response() else {
            bail!("cross signing bootstrap failed: {:?}", e);
        };
        let mut password = uiaa::Password::new(
            uiaa::UserIdentifier::UserIdOrLocalpart(credentials.user_id.clone()),
            credentials.password.clone(),
        );
        password.session = response.session.clone();

        client
            .encryption()
            .bootstrap_cross_signing(Some(uiaa::AuthData::Password(password)))
            .await?;

        debug!("cross signing set up");
        return Ok(());
    }

    debug!("cross signing already set up");
    Ok(())
}

/// Enables key backup and secret storage with the account passphrase.
///
/// A backup already existing on the server is fine; any other failure is an
/// error.
async fn enable_recovery(
    client: &Client,
    credentials: &UserCredentials,
) -> Result<(), anyhow::Error> {
    debug!("enabling recovery");

    let recovery = client.encryption().recovery();

    match recovery
        .enable()
        .with_passphrase(&credentials.passphrase)
        .await
    {
        Ok(_) => debug!("recovery enabled"),
        Err(e) => match e {
            RecoveryError::BackupExistsOnServer => {
                debug!("recovery already enabled");
            }
            _ => bail!("error enabling recovery: {:?}", e),
        },
    }

    Ok(())
}

/// Checks that recovery is enabled and our own device is verified.
///
/// Both must hold before the bot joins encrypted rooms.
async fn encryption_check(client: &Client) -> Result<(), anyhow::Error> {
    let recovery = client.encryption().recovery();
    if recovery.state() != RecoveryState::Enabled {
        error!("recovery is not enabled after enabling it");
        return Err(anyhow::anyhow!("recovery is disabled after enabling it"));
    }

    // The client is logged in at this point so the own device exists
    let Some(device) = client.encryption().get_own_device().await? else {
        return Err(anyhow::anyhow!("own device not found"));
    };
    if !device.is_verified() {
        error!("device is not verified after setting up encryption");
        return Err(anyhow::anyhow!(
            "device is not verified after setting up encryption"
        ));
    }

    Ok(())
}

/// Logs in and sets up encryption from scratch.
///
/// Builds the client with cross-signing and backups enabled, logs in,
/// bootstraps cross-signing, enables recovery, recovers the secrets, checks
/// the result and finally persists the session for the next start.
async fn create_session(
    credentials: &UserCredentials,
    matrix_session: &MatrixSession,
) -> Result<Client, anyhow::Error> {
    let encryption_settings = EncryptionSettings {
        auto_enable_cross_signing: true,
        backup_download_strategy: BackupDownloadStrategy::default(),
        auto_enable_backups: true,
    };

    let bot_user: OwnedUserId = credentials.user_id.clone().try_into()?;
    let client = Client::builder()
        .sqlite_store(
            matrix_session.get_sqlite_path(),
            Some(&credentials.passphrase),
        )
        .with_encryption_settings(encryption_settings)
        .server_name(bot_user.server_name())
        .build()
        .await?;

    debug!("matrix client created");

    client
        .matrix_auth()
        .login_username(bot_user, &credentials.password)
        .initial_device_display_name("meeple bot")
        .send()
        .await?;

    bootstrap_cross_signing(&client, credentials).await?;
    enable_recovery(&client, credentials).await?;

    // Pull every secret from secret storage using the passphrase
    debug!("trying to recover secrets");
    let recovery = client.encryption().recovery();
    recovery.recover(&credentials.passphrase).await?;
    debug!("secrets recovered");

    encryption_check(&client).await?;

    let Some(user_session) = client.matrix_auth().session() else {
        return Err(anyhow::anyhow!("no session after login"));
    };
    if let Err(err) = matrix_session.persist_user_session(&user_session).await {
        error!("error persisting user session: {:?}", err);
        return Err(anyhow::anyhow!("error persisting user session: {:?}", err));
    }

    info!("matrix client setup complete");
    Ok(client)
}

/// Restores a persisted session without logging in again.
///
/// Rebuilds the client on top of the existing SQLite store, restores the
/// stored authentication, imports the secrets from secret storage and checks
/// the encryption state.
async fn restore_session(
    credentials: &UserCredentials,
    matrix_session: &MatrixSession,
) -> Result<Client, anyhow::Error> {
    info!("restoring matrix session from disk");

    let bot_user: OwnedUserId = credentials.user_id.clone().try_into()?;
    let client: Client = Client::builder()
        .server_name(bot_user.server_name())
        .sqlite_store(
            matrix_session.get_sqlite_path(),
            Some(&credentials.passphrase),
        )
        .build()
        .await?;

    let Some(user_session) = matrix_session.get_user_session() else {
        return Err(anyhow::anyhow!("no stored user session to restore"));
    };
    client.restore_session(user_session.clone()).await?;

    let secret_store = client
        .encryption()
        .secret_storage()
        .open_secret_store(&credentials.passphrase)
        .await?;
    secret_store.import_secrets().await?;

    encryption_check(&client).await?;

    info!("matrix session restored successfully");

    Ok(client)
}

/// Builds a fully encrypted Matrix client.
///
/// Restores the persisted session when one exists, otherwise logs in and sets
/// everything up from scratch. Either way the returned client has
/// cross-signing, key backup and secret storage in place and its own device
/// verified.
pub async fn setup_client(
    credentials: &UserCredentials,
    matrix_session: &MatrixSession,
) -> Result<Client, anyhow::Error> {
    info!("setting up matrix client for {}", credentials.user_id);

    if matrix_session.has_session() {
        restore_session(credentials, matrix_session).await
    } else {
        create_session(credentials, matrix_session).await
    }
}
