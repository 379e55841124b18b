//! Handler for listing the tables a set of players share.

use std::time::{SystemTime, UNIX_EPOCH};

use futures::future::join_all;
use log::debug;

use crate::bga::account::get_active_session;
use crate::bga::requester::Requester;
use crate::bga::resolver::normalize_name;
use crate::bga::response_structs::TableInfo;
use crate::commands::actions::resolve_player_id;
use crate::commands::markdown_response::{format_no_tables, format_table_summary};
use crate::creds::CredStore;

/// Lists the running tables every named player sits at.
///
/// Each player's table list is fetched concurrently, then intersected: a
/// table counts only when all the players are at it. `game` limits the listing
/// to one game by normalized name.
pub async fn execute_show_tables<R: Requester>(
    requester: R,
    creds: &CredStore,
    invoker: &str,
    game: Option<&str>,
    players: &[String],
) -> String {
    let record = creds.get(invoker).await;
    let session = match get_active_session(requester, record.as_ref()).await {
        Ok(session) => session,
        Err(error) => return error.to_string(),
    };

    let mut player_ids = Vec::new();
    for player in players {
        match resolve_player_id(&session, creds, player).await {
            Ok(id) => player_ids.push(id),
            Err(reason) => {
                session.close().await;
                return format!("- {}", reason);
            }
        }
    }

    let lookups = join_all(
        player_ids
            .iter()
            .map(|player_id| session.get_tables(player_id)),
    )
    .await;

    let mut table_lists = Vec::new();
    for lookup in lookups {
        match lookup {
            Ok(tables) => table_lists.push(tables),
            Err(error) => {
                session.close().await;
                return format!("Unable to list the tables: {}", error);
            }
        }
    }
    debug!("fetched {} table lists", table_lists.len());

    let shared = intersect_tables(table_lists, &player_ids, game);
    if shared.is_empty() {
        session.close().await;
        return format_no_tables(players);
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default();

    let mut lines = Vec::new();
    for table in &shared {
        let age_days = table
            .start_timestamp()
            .map(|start| (now - start).max(0) / 86400)
            .unwrap_or_default();
        match session.get_table_stats(table).await {
            Ok(stats) => lines.push(format_table_summary(age_days, &table.game_name, &stats)),
            Err(error) => lines.push(format!(
                "- {}: unable to read the table page ({})",
                &table.game_name, error
            )),
        }
    }

    session.close().await;
    lines.join("\n")
}

/// Keeps the tables every player sits at, optionally limited to one game.
fn intersect_tables(
    table_lists: Vec<Vec<TableInfo>>,
    player_ids: &[String],
    game: Option<&str>,
) -> Vec<TableInfo> {
    let Some(first) = table_lists.into_iter().next() else {
        return Vec::new();
    };

    first
        .into_iter()
        .filter(|table| {
            player_ids
                .iter()
                .all(|player_id| table.player_display.contains(player_id))
        })
        .filter(|table| match game {
            Some(game) => normalize_name(&table.game_name) == normalize_name(game),
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bga::requester::{MockRequester, TableStats};

    fn table(id: &str, game_name: &str, players: &[&str]) -> TableInfo {
        TableInfo {
            id: id.to_owned(),
            game_name: game_name.to_owned(),
            game_id: "1".to_owned(),
            gameserver: "5".to_owned(),
            players: Default::default(),
            player_display: players.iter().map(|p| (*p).to_owned()).collect(),
            gamestart: Some("1600000000".to_owned()),
            scheduled: None,
        }
    }

    #[test]
    fn test_intersect_keeps_shared_tables_only() {
        let lists = vec![vec![
            table("1", "ra", &["7", "8"]),
            table("2", "carcassonne", &["7"]),
        ]];
        let ids = vec!["7".to_owned(), "8".to_owned()];

        let shared = intersect_tables(lists, &ids, None);
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].id, "1");
    }

    #[test]
    fn test_intersect_filters_by_game() {
        let lists = vec![vec![
            table("1", "ra", &["7"]),
            table("2", "carcassonne", &["7"]),
        ]];
        let ids = vec!["7".to_owned()];

        let shared = intersect_tables(lists, &ids, Some("Carcassonne"));
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].id, "2");
    }

    async fn creds_with_invoker() -> (CredStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = CredStore::open(&dir.path().join("creds.json")).await.unwrap();
        store
            .update("@alice:example.com", |record| {
                record.username = "alice_bga".to_owned();
                record.password = "secret".to_owned();
                record.bga_user_id = Some("7".to_owned());
            })
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_show_tables_summarizes_shared_table() {
        let (creds, _dir) = creds_with_invoker().await;
        let mut requester = MockRequester::new();
        requester.expect_login().returning(|_, _| Ok(true));
        requester
            .expect_get_tables()
            .withf(|player_id| player_id == "7")
            .returning(|_| Ok(vec![table("11", "ra", &["7"])]));
        requester.expect_get_table_stats().returning(|_| {
            Ok(TableStats {
                progress: "45".to_owned(),
                moves: "120".to_owned(),
                url: "https://bga.test/5/ra?table=11".to_owned(),
            })
        });
        requester.expect_logout().returning(|| Ok(()));

        let reply = execute_show_tables(
            requester,
            &creds,
            "@alice:example.com",
            None,
            &["@alice:example.com".to_owned()],
        )
        .await;
        assert!(reply.contains("ra"));
        assert!(reply.contains("45% done"));
        assert!(reply.contains("120 moves"));
    }

    #[tokio::test]
    async fn test_show_tables_none_shared() {
        let (creds, _dir) = creds_with_invoker().await;
        let mut requester = MockRequester::new();
        requester.expect_login().returning(|_, _| Ok(true));
        requester.expect_get_tables().returning(|_| Ok(vec![]));
        requester.expect_logout().returning(|| Ok(()));

        let reply = execute_show_tables(
            requester,
            &creds,
            "@alice:example.com",
            None,
            &["@alice:example.com".to_owned()],
        )
        .await;
        assert_eq!(reply, "No running table with @alice:example.com.");
    }
}
