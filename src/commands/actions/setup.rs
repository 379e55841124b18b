//! Handlers for linking accounts and saving preferences.

use anyhow::Result;
use log::{info, warn};

use crate::bga::requester::Requester;
use crate::commands::markdown_response::{format_setup_rejected, format_setup_saved};
use crate::creds::CredStore;

/// Verifies a username/password pair against BGA and saves it on success.
///
/// Nothing is stored when BGA rejects the pair, so a typo cannot clobber a
/// working record. The player id is looked up best-effort while the session is
/// live; it saves a lookup on every later operation.
pub async fn execute_verify_and_save<R: Requester>(
    requester: R,
    creds: &CredStore,
    user_id: &str,
    username: &str,
    password: &str,
) -> String {
    let accepted = match requester.login(username, password).await {
        Ok(accepted) => accepted,
        Err(error) => return format!("Unable to reach Board Game Arena: {}", error),
    };
    if !accepted {
        return format_setup_rejected();
    }

    let bga_user_id = match requester.find_player_id(username).await {
        Ok(id) => id,
        Err(error) => {
            warn!("player id lookup for {} failed: {}", username, error);
            None
        }
    };
    if let Err(error) = requester.logout().await {
        warn!("logout after setup failed: {}", error);
    }

    let update = creds
        .update(user_id, |record| {
            record.username = username.to_owned();
            record.password = password.to_owned();
            if bga_user_id.is_some() {
                record.bga_user_id = bga_user_id.clone();
            }
        })
        .await;
    match update {
        Ok(_) => {
            info!("credentials verified and saved for {}", user_id);
            format_setup_saved(username)
        }
        Err(error) => {
            warn!("saving credentials for {} failed: {:#}", user_id, error);
            "Your credentials checked out but I could not save them, please try again.".to_owned()
        }
    }
}

/// Saves a username typed in a setup menu. The confirmation was already sent
/// by the menu, so this only persists.
pub async fn execute_save_username(creds: &CredStore, user_id: &str, username: &str) -> Result<()> {
    creds
        .update(user_id, |record| {
            record.username = username.to_owned();
        })
        .await?;
    Ok(())
}

/// Saves one option preference chosen in a setup menu.
pub async fn execute_save_preference(
    creds: &CredStore,
    user_id: &str,
    game: Option<&str>,
    key: &str,
    value: &str,
) -> Result<()> {
    creds.set_preference(user_id, game, key, value).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bga::requester::MockRequester;

    async fn create_store() -> (CredStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = CredStore::open(&dir.path().join("creds.json")).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_verify_and_save_success() {
        let (creds, _dir) = create_store().await;
        let mut requester = MockRequester::new();
        requester
            .expect_login()
            .withf(|username, password| username == "alice_bga" && password == "secret")
            .returning(|_, _| Ok(true));
        requester
            .expect_find_player_id()
            .returning(|_| Ok(Some("777".to_owned())));
        requester.expect_logout().returning(|| Ok(()));

        let reply = execute_verify_and_save(
            requester,
            &creds,
            "@alice:example.com",
            "alice_bga",
            "secret",
        )
        .await;
        assert!(reply.contains("alice_bga is linked"));

        let record = creds.get("@alice:example.com").await.unwrap();
        assert_eq!(record.username, "alice_bga");
        assert_eq!(record.password, "secret");
        assert_eq!(record.bga_user_id.as_deref(), Some("777"));
    }

    #[tokio::test]
    async fn test_verify_and_save_rejected_stores_nothing() {
        let (creds, _dir) = create_store().await;
        let mut requester = MockRequester::new();
        requester.expect_login().returning(|_, _| Ok(false));

        let reply = execute_verify_and_save(
            requester,
            &creds,
            "@alice:example.com",
            "alice_bga",
            "wrong",
        )
        .await;
        assert!(reply.contains("rejected"));
        assert!(creds.get("@alice:example.com").await.is_none());
    }

    #[tokio::test]
    async fn test_save_username_keeps_other_fields() {
        let (creds, _dir) = create_store().await;
        creds
            .update("@alice:example.com", |record| {
                record.password = "secret".to_owned();
            })
            .await
            .unwrap();

        execute_save_username(&creds, "@alice:example.com", "alice_bga")
            .await
            .unwrap();

        let record = creds.get("@alice:example.com").await.unwrap();
        assert_eq!(record.username, "alice_bga");
        assert_eq!(record.password, "secret");
    }
}
