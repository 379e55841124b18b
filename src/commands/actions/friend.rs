//! Handler for adding BGA friends.

use crate::bga::account::get_active_session;
use crate::bga::requester::Requester;
use crate::commands::actions::resolve_player_id;
use crate::commands::markdown_response::{format_friend_added, format_friend_failed};
use crate::creds::CredStore;

/// Adds each named player to the invoker's BGA friend list.
///
/// One player failing does not stop the rest; every name gets its own line in
/// the reply.
pub async fn execute_add_friends<R: Requester>(
    requester: R,
    creds: &CredStore,
    invoker: &str,
    names: &[String],
) -> String {
    let record = creds.get(invoker).await;
    let session = match get_active_session(requester, record.as_ref()).await {
        Ok(session) => session,
        Err(error) => return error.to_string(),
    };

    let mut lines = Vec::new();
    for name in names {
        let line = match resolve_player_id(&session, creds, name).await {
            Ok(player_id) => match session.add_friend(&player_id).await {
                Ok(()) => format_friend_added(name),
                Err(error) => format_friend_failed(name, &error.to_string()),
            },
            Err(reason) => format_friend_failed(name, &reason),
        };
        lines.push(line);
    }

    session.close().await;
    lines.join("\n")
}
