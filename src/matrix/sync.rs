//! Matrix synchronization loop and event handling.
//!
//! [`MatrixSync::sync`] catches up on events missed while the bot was offline
//! (invitations in particular), registers handlers for auto-joining rooms and
//! incoming messages, and then syncs forever, persisting the sync token after
//! every pass.

use std::sync::Arc;

use anyhow::Result;
use log::{error, info, warn};
use matrix_sdk::{
    Client, LoopCtrl, Room, RoomState,
    config::SyncSettings,
    ruma::{
        api::client::filter::FilterDefinition,
        events::room::{
            member::StrippedRoomMemberEvent,
            message::{MessageType, OriginalSyncRoomMessageEvent},
        },
    },
};
use tokio::time::{Duration, sleep};

use crate::matrix::session::MatrixSession;

/// Drives the Matrix sync loop and dispatches incoming messages.
pub struct MatrixSync {
    /// The matrix client
    client: Client,
    /// The matrix session, for sync token persistence
    session: MatrixSession,
}

impl MatrixSync {
    /// Creates a new `MatrixSync`. Nothing happens until
    /// [`MatrixSync::sync`] is called.
    pub fn new(client: &Client, session: &MatrixSession) -> Self {
        MatrixSync {
            client: client.to_owned(),
            session: session.to_owned(),
        }
    }

    /// Starts syncing and never returns under normal operation.
    ///
    /// The sequence is:
    /// 1. Register the auto-join handler for room invitations
    /// 2. Run an initial sync to process events received while offline
    /// 3. Register the message handler with the provided callback
    /// 4. Loop forever, persisting the sync token after each pass
    ///
    /// The callback fires for every text message in a joined room with
    /// `(body, room_id, sender_id, event_id)`. The bot's own messages are
    /// filtered out before the callback. Token persistence failures are
    /// logged and do not stop the loop.
    pub async fn sync<F>(&self, on_message: F) -> Result<()>
    where
        F: Fn(String, String, String, String) + Send + Sync + 'static + Clone,
    {
        info!("start syncing");

        // Auto join rooms when invited
        self.client.add_event_handler(auto_join_rooms);

        // Enable room members lazy-loading
        // See <https://spec.matrix.org/v1.6/client-server-api/#lazy-loading-room-members>.
        let filter = FilterDefinition::with_lazy_loading();
        let mut sync_settings = SyncSettings::default().filter(filter.into());

        // Resume from the last persisted sync token if there is one
        if let Some(sync_token) = self.session.get_sync_token() {
            sync_settings = sync_settings.token(sync_token);
        }

        // Initial sync, retried until it goes through. The message handler is
        // not registered yet so pending invitations are processed without
        // replaying old commands.
        let response = loop {
            match self.client.sync_once(sync_settings.clone()).await {
                Ok(response) => break response,
                Err(error) => {
                    error!("an error occurred during initial sync: {error}");
                    sleep(Duration::from_secs(2)).await;
                }
            }
        };
        if let Err(err) = self
            .session
            .persist_sync_token(response.next_batch.clone())
            .await
        {
            error!("failed to persist sync token: {:?}", err);
        }

        let on_message_arc = Arc::new(on_message);

        // Listen to incoming room messages. Registered after the initial sync,
        // so only new messages reach the callback.
        self.client.add_event_handler({
            let on_message = Arc::clone(&on_message_arc);
            move |event: OriginalSyncRoomMessageEvent, room: Room| async move {
                on_room_message(event, room, &on_message).await
            }
        });

        // The sync loop must continue from the initial sync's token
        sync_settings = sync_settings.token(response.next_batch);

        self.client
            .sync_with_result_callback(sync_settings, |sync_result| async move {
                let response = sync_result?;

                // Persist the token each pass so a restart can resume
                if let Err(err) = self.session.persist_sync_token(response.next_batch).await {
                    error!("failed to persist sync token: {:?}", err);
                }

                Ok(LoopCtrl::Continue)
            })
            .await?;

        Ok(())
    }
}

/// Joins a room when the bot receives an invitation.
///
/// Synapse can deliver the invite before the invited user is allowed to join,
/// so joining is retried with exponential backoff. See
/// <https://github.com/matrix-org/synapse/issues/4345>.
async fn auto_join_rooms(room_member: StrippedRoomMemberEvent, client: Client, room: Room) {
    let Some(user_id) = client.user_id() else {
        warn!("could not get user id from client");
        return;
    };

    // Ignore invites meant for someone else
    if room_member.state_key != user_id {
        return;
    }

    tokio::spawn(async move {
        info!("auto joining room {}", room.room_id());
        let mut delay = 2;

        while let Err(err) = room.join().await {
            error!(
                "failed to join room {} ({err:?}), retrying in {delay}s",
                room.room_id()
            );

            sleep(Duration::from_secs(delay)).await;
            delay *= 2;

            if delay > 3600 {
                error!("can't join room {} ({err:?})", room.room_id());
                return;
            }
        }
        info!("successfully joined room {}", room.room_id());
    });
}

/// Forwards a room message to the user callback.
///
/// Messages from non-joined rooms, non-text messages and the bot's own
/// messages are dropped here.
async fn on_room_message<F>(event: OriginalSyncRoomMessageEvent, room: Room, on_message: &Arc<F>)
where
    F: Fn(String, String, String, String) + Send + Sync + 'static,
{
    if room.state() != RoomState::Joined {
        return;
    }

    // The bot must never react to its own replies
    if event.sender == room.own_user_id() {
        return;
    }

    let MessageType::Text(text_content) = event.content.msgtype else {
        return;
    };

    on_message(
        text_content.body,
        room.room_id().to_string(),
        event.sender.to_string(),
        event.event_id.to_string(),
    );
}
