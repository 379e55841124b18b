//! High-level Matrix client for the bot.
//!
//! [`MatrixClient`] wraps the Matrix SDK client and exposes the handful of
//! operations the bot needs: start syncing, reply to a message, mention a
//! user and redact an event. Outbound bodies are split so they stay under the
//! homeserver's event size limits.

use log::{error, info};
use matrix_sdk::{
    Client,
    ruma::{
        EventId, RoomId, UserId,
        events::{
            Mentions,
            room::message::{AddMentions, ForwardThread, ReplyMetadata, RoomMessageEventContent},
        },
    },
};

use crate::matrix::{
    UserCredentials, encryption::setup_client, session::MatrixSession, sync::MatrixSync,
};
use crate::utils::split_message;

/// Messaging and synchronization interface to the Matrix homeserver.
pub struct MatrixClient {
    /// Synchronization service for real-time events
    matrix_sync: MatrixSync,
    /// Underlying Matrix SDK client
    client: Client,
}

impl MatrixClient {
    /// Creates and initializes a Matrix client with full encryption setup.
    ///
    /// Loads or creates the session under `session_path`, sets up the client
    /// through [`setup_client`] and sets the bot's display name.
    ///
    /// # Arguments
    ///
    /// * `user_credentials` - User id, password and passphrase of the bot account
    /// * `session_path` - Directory for the session file and the SQLite store
    ///
    /// # Errors
    ///
    /// Returns an error if session loading or the encryption setup fails.
    pub async fn new(
        user_credentials: &UserCredentials,
        session_path: &str,
    ) -> Result<Self, anyhow::Error> {
        let matrix_session = MatrixSession::new(session_path).await?;
        let client = setup_client(user_credentials, &matrix_session).await?;

        client.account().set_display_name(Some("Meeple")).await?;

        let matrix_sync = MatrixSync::new(&client, &matrix_session);

        Ok(MatrixClient {
            matrix_sync,
            client,
        })
    }

    /// Starts the Matrix synchronization loop.
    ///
    /// Runs until the underlying sync ends. The callback fires for every text
    /// message in a joined room, with `(body, room_id, sender_id, event_id)`.
    /// Invitations are accepted automatically and sync tokens are persisted so
    /// a restart resumes where the bot left off.
    pub async fn sync<F>(&self, on_message: F) -> Result<(), anyhow::Error>
    where
        F: Fn(String, String, String, String) + Send + Sync + 'static + Clone,
    {
        match self.matrix_sync.sync(on_message).await {
            Ok(_) => info!("matrix sync ended successfully"),
            Err(e) => error!("matrix sync ended with error: {:?}", e),
        }

        Ok(())
    }

    /// Sends a Markdown message that mentions a user.
    ///
    /// The mention triggers a notification for `user_id`. Bodies over the
    /// message length limit are split; only the first chunk carries the
    /// mention.
    pub async fn send_mention(&self, room_id: &str, body: &str, user_id: &str) {
        let Ok(mentioned) = UserId::parse(user_id) else {
            error!("invalid user id {}", user_id);
            return;
        };

        let mut chunks = split_message(body).into_iter();
        if let Some(first) = chunks.next() {
            let content = RoomMessageEventContent::text_markdown(first)
                .add_mentions(Mentions::with_user_ids([mentioned]));
            self.send(room_id, content).await;
        }
        for chunk in chunks {
            self.send(room_id, RoomMessageEventContent::text_markdown(chunk))
                .await;
        }
    }

    /// Sends a Markdown reply to an existing message.
    ///
    /// Bodies over the message length limit are split; the first chunk is the
    /// actual reply and the rest follow as plain messages.
    pub async fn send_reply(&self, room_id: &str, sender_id: &str, event_id: &str, body: &str) {
        let Ok(sender) = UserId::parse(sender_id) else {
            error!("invalid sender id {}", sender_id);
            return;
        };
        let Ok(event) = EventId::parse(event_id) else {
            error!("invalid event id {}", event_id);
            return;
        };

        let mut chunks = split_message(body).into_iter();
        if let Some(first) = chunks.next() {
            let content = RoomMessageEventContent::text_markdown(first).make_reply_to(
                ReplyMetadata::new(&event, &sender, None),
                ForwardThread::No,
                AddMentions::No,
            );
            self.send(room_id, content).await;
        }
        for chunk in chunks {
            self.send(room_id, RoomMessageEventContent::text_markdown(chunk))
                .await;
        }
    }

    /// Redacts an event, removing its content for everyone in the room.
    ///
    /// Used to scrub messages that carry credentials once they have been
    /// processed. Failures are logged; there is nothing more to do about them.
    pub async fn redact_message(&self, room_id: &str, event_id: &str, reason: &str) {
        let Ok(room_id) = RoomId::parse(room_id) else {
            error!("invalid room id {}", room_id);
            return;
        };
        let Ok(event_id) = EventId::parse(event_id) else {
            error!("invalid event id {}", event_id);
            return;
        };

        let Some(room) = self.client.get_room(&room_id) else {
            error!("room {} not found for redaction", room_id);
            return;
        };
        if let Err(e) = room.redact(&event_id, Some(reason), None).await {
            error!("failed to redact event {}: {:?}", event_id, e);
        }
    }

    /// Sends prepared message content to a room.
    async fn send(&self, room_id: &str, content: RoomMessageEventContent) {
        let Ok(room_id) = RoomId::parse(room_id) else {
            error!("invalid room id {}", room_id);
            return;
        };

        if let Some(room) = self.client.get_room(&room_id)
            && let Err(e) = room.send(content).await
        {
            error!("failed to send message: {:?}", e);
        }
    }
}
