//! Handler for creating a table and inviting its players.

use log::{info, warn};

use crate::bga::GameCatalogEntry;
use crate::bga::account::get_active_session;
use crate::bga::options::merge_options;
use crate::bga::requester::Requester;
use crate::commands::actions::resolve_player_id;
use crate::commands::markdown_response::{
    format_invite_failure, format_invite_success, format_table_created,
};
use crate::creds::CredStore;

/// Creates a table for the invoker, applies their options and invites the
/// players.
///
/// The option layers are merged per the invoker's record: built-in defaults,
/// then their global preferences, then their preferences for this game, then
/// the options given on the command. If anything fails after the table exists,
/// the table is abandoned best-effort so a half-configured table is not left
/// waiting for players.
///
/// The returned string is the complete Markdown reply for the room.
pub async fn execute_create_game<R: Requester>(
    requester: R,
    creds: &CredStore,
    contributors: &[String],
    invoker: &str,
    game: &GameCatalogEntry,
    players: &[String],
    options: &[(String, String)],
) -> String {
    let record = creds.get(invoker).await;
    let session = match get_active_session(requester, record.as_ref()).await {
        Ok(session) => session,
        Err(error) => return error.to_string(),
    };
    // get_active_session succeeded, so a record exists
    let record = record.unwrap_or_default();

    let merged = merge_options(
        &record.global_options(),
        &record.options_for_game(&game.display_name),
        options,
    );
    let is_contributor = contributors.iter().any(|c| c == invoker);

    let table_id = match session.create_table(game.bga_id).await {
        Ok(table_id) => table_id,
        Err(error) => {
            session.close().await;
            return format!("Unable to create the table: {}", error);
        }
    };
    info!(
        "created table {} ({}) for {}",
        table_id, &game.display_name, invoker
    );

    if let Err(error) = session.apply_options(table_id, &merged, is_contributor).await {
        if let Err(quit_error) = session.abandon_table().await {
            warn!("abandoning table {} failed: {}", table_id, quit_error);
        }
        session.close().await;
        return format!("{} The table was abandoned, nothing to clean up.", error);
    }

    let mut lines = vec![format_table_created(
        &game.display_name,
        &session.table_url(table_id),
    )];

    for player in players {
        // The invoker sits at the table already
        if player == invoker || player.eq_ignore_ascii_case(&record.username) {
            continue;
        }

        let line = match resolve_player_id(&session, creds, player).await {
            Ok(player_id) => match session.invite_player(table_id, &player_id).await {
                Ok(()) => format_invite_success(player),
                Err(error) => format_invite_failure(player, &error.to_string()),
            },
            Err(reason) => format_invite_failure(player, &reason),
        };
        lines.push(line);
    }

    session.close().await;
    lines.join("\n")
}
