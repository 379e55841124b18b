//! HTTP client for the Board Game Arena website.
//!
//! This module provides the [`BgaRequester`] struct for driving BGA's dojo
//! endpoints. BGA has no public API: table management happens through the same
//! GET endpoints the website's JavaScript calls, authenticated by session
//! cookies, and a couple of values are scraped out of HTML pages.

use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};
use mockall::automock;
use regex::Regex;
use reqwest::Client;

use crate::bga::BgaError;
use crate::bga::options::OptionRequest;
use crate::bga::response_structs::{
    FindPlayerResponse, StatusResponse, TableInfo, TableInfosResponse,
};

/// Progress information scraped from a running game's page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStats {
    /// Completion percentage as BGA reports it, empty at 0%
    pub progress: String,
    /// Number of moves played, empty when unavailable
    pub moves: String,
    /// Url of the game page
    pub url: String,
}

/// Trait for making requests to Board Game Arena.
///
/// This trait abstracts the HTTP operations for easier testing with mocks.
/// Privileged operations require a prior successful [`Requester::login`] on the
/// same instance, because authentication lives in the cookie jar.
#[automock]
pub trait Requester {
    /// Logs in and reports whether BGA accepted the credentials.
    async fn login(&self, username: &str, password: &str) -> Result<bool, BgaError>;
    /// Logs out the current session.
    async fn logout(&self) -> Result<(), BgaError>;
    /// Quits the realtime table the account currently sits at, if any.
    async fn quit_table(&self) -> Result<(), BgaError>;
    /// Leaves any "play with friends" session.
    async fn quit_playing_with_friends(&self) -> Result<(), BgaError>;
    /// Creates a new async table for a game and returns the table id.
    async fn create_table(&self, game_id: u32) -> Result<u64, BgaError>;
    /// Applies one table option.
    async fn set_option(&self, table_id: u64, request: &OptionRequest) -> Result<(), BgaError>;
    /// Finds a player id by name, `None` when no player matches.
    async fn find_player_id(&self, name: &str) -> Result<Option<String>, BgaError>;
    /// Invites a player to a table.
    async fn invite_player(&self, table_id: u64, player_id: &str) -> Result<(), BgaError>;
    /// Adds a player to the account's friend list.
    async fn add_friend(&self, player_id: &str) -> Result<(), BgaError>;
    /// Lists the tables a player sits at.
    async fn get_tables(&self, player_id: &str) -> Result<Vec<TableInfo>, BgaError>;
    /// Scrapes progress and move count from a table's game page.
    async fn get_table_stats(&self, table: &TableInfo) -> Result<TableStats, BgaError>;
    /// Scrapes the creator's group list from a table page.
    async fn get_group_options(&self, table_id: u64) -> Result<Vec<(String, String)>, BgaError>;
    /// Public url of a table.
    fn table_url(&self, table_id: u64) -> String;
}

/// HTTP client implementing [`Requester`] against a BGA base url.
pub struct BgaRequester {
    /// BGA base url, without trailing slash
    base_url: String,
    /// HTTP client with a cookie jar holding the session
    client: Client,
}

impl BgaRequester {
    /// Creates a new [`BgaRequester`] with a fresh cookie jar.
    ///
    /// Each requester carries its own session, so operations on behalf of
    /// different users never share cookies.
    pub fn new(base_url: &str) -> Result<Self, BgaError> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(BgaRequester {
            base_url: base_url.to_string(),
            client,
        })
    }

    /// The `dojo.preventCache` value the website appends to every call.
    fn prevent_cache() -> String {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default()
            .to_string()
    }

    /// GET a url under the base url and return the body text.
    async fn fetch(&self, path: &str, params: &[(String, String)]) -> Result<String, BgaError> {
        let url = format!("{}{}", &self.base_url, path);
        debug!("request {} with {} params", &url, params.len());

        let text = self
            .client
            .get(&url)
            .query(params)
            .query(&[("dojo.preventCache", Self::prevent_cache())])
            .send()
            .await?
            .text()
            .await?;

        Ok(text)
    }

    /// GET a url and parse the body as a dojo status envelope.
    async fn fetch_status(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<StatusResponse, BgaError> {
        let body = self.fetch(path, params).await?;
        serde_json::from_str(&body)
            .map_err(|_| BgaError::BadResponse(format!("{} returned non-json: {:.80}", path, body)))
    }
}

impl Requester for BgaRequester {
    /// POST `/account/account/login.html` and verify the session is privileged.
    ///
    /// BGA answers 200 even for wrong credentials, so success is verified by
    /// fetching the community page, which tells anonymous visitors to log in.
    async fn login(&self, username: &str, password: &str) -> Result<bool, BgaError> {
        let url = format!("{}/account/account/login.html", &self.base_url);
        info!("logging in to bga as {}", username);

        self.client
            .post(&url)
            .form(&[
                ("email", username),
                ("password", password),
                ("rememberme", "on"),
                ("redirect", "join"),
                ("form_id", "loginform"),
                ("dojo.preventCache", &Self::prevent_cache()),
            ])
            .send()
            .await?;

        let community = self.fetch("/community", &[]).await?;
        Ok(!community.contains("You must be logged in to see this page."))
    }

    async fn logout(&self) -> Result<(), BgaError> {
        self.fetch("/account/account/logout.html", &[]).await?;
        Ok(())
    }

    /// GET `/player` and quit the table the page says the account is playing at.
    ///
    /// An account can only sit at one realtime table; a leftover table from an
    /// earlier run would make table creation fail.
    async fn quit_table(&self) -> Result<(), BgaError> {
        let player_page = self.fetch("/player", &[]).await?;

        // Some version of "You are playing" or "Playing now at:"
        let pattern = Regex::new(r#"[Pp]laying[^<]*<a href="/table\?table=(\d+)"#).unwrap();
        if let Some(captures) = pattern.captures(&player_page) {
            let table_id = captures[1].to_owned();
            info!("quitting leftover table {}", table_id);
            self.fetch(
                "/table/table/quitgame.html",
                &[
                    ("table".to_owned(), table_id),
                    ("neutralized".to_owned(), "true".to_owned()),
                    ("s".to_owned(), "table_quitgame".to_owned()),
                ],
            )
            .await?;
        }

        Ok(())
    }

    async fn quit_playing_with_friends(&self) -> Result<(), BgaError> {
        self.fetch("/group/group/removeAllFromGameSession.html", &[])
            .await?;
        Ok(())
    }

    /// GET `/table/table/createnew.html` to create an async table.
    async fn create_table(&self, game_id: u32) -> Result<u64, BgaError> {
        info!("creating table for game {}", game_id);
        let response = self
            .fetch_status(
                "/table/table/createnew.html",
                &[
                    ("game".to_owned(), game_id.to_string()),
                    ("gamemode".to_owned(), "async".to_owned()),
                    ("forceManual".to_owned(), "true".to_owned()),
                    ("is_meeting".to_owned(), "false".to_owned()),
                ],
            )
            .await?;

        if response.is_error() {
            return Err(BgaError::Service(
                response.error.unwrap_or_else(|| "table creation failed".to_owned()),
            ));
        }

        response
            .table_id()
            .ok_or_else(|| BgaError::BadResponse("createnew returned no table id".to_owned()))
    }

    async fn set_option(&self, table_id: u64, request: &OptionRequest) -> Result<(), BgaError> {
        let mut params = request.params.clone();
        params.push(("table".to_owned(), table_id.to_string()));
        debug!("setting option {} on table {}", request.path, table_id);
        self.fetch(request.path, &params).await?;
        Ok(())
    }

    /// GET `/player/player/findplayer.html` and return the best match's id.
    async fn find_player_id(&self, name: &str) -> Result<Option<String>, BgaError> {
        let body = self
            .fetch(
                "/player/player/findplayer.html",
                &[
                    ("q".to_owned(), name.to_owned()),
                    ("start".to_owned(), "0".to_owned()),
                    ("count".to_owned(), "Infinity".to_owned()),
                ],
            )
            .await?;

        let response: FindPlayerResponse = serde_json::from_str(&body).map_err(|_| {
            BgaError::BadResponse(format!("findplayer returned non-json: {:.80}", body))
        })?;

        Ok(response.items.first().map(|item| item.id_string()))
    }

    async fn invite_player(&self, table_id: u64, player_id: &str) -> Result<(), BgaError> {
        let response = self
            .fetch_status(
                "/table/table/invitePlayer.html",
                &[
                    ("table".to_owned(), table_id.to_string()),
                    ("player".to_owned(), player_id.to_owned()),
                ],
            )
            .await?;

        if response.is_error() {
            return Err(BgaError::Service(
                response.error.unwrap_or_else(|| "invitation failed".to_owned()),
            ));
        }
        Ok(())
    }

    async fn add_friend(&self, player_id: &str) -> Result<(), BgaError> {
        self.fetch(
            "/community/community/addToFriend.html",
            &[("id".to_owned(), player_id.to_owned())],
        )
        .await?;
        Ok(())
    }

    /// GET `/tablemanager/tablemanager/tableinfos.html` for a player's tables.
    async fn get_tables(&self, player_id: &str) -> Result<Vec<TableInfo>, BgaError> {
        let body = self
            .fetch(
                "/tablemanager/tablemanager/tableinfos.html",
                &[("playerfilter".to_owned(), player_id.to_owned())],
            )
            .await?;

        let response: TableInfosResponse = serde_json::from_str(&body).map_err(|_| {
            BgaError::BadResponse(format!("tableinfos returned non-json: {:.80}", body))
        })?;

        Ok(response.data.tables.into_values().collect())
    }

    /// Scrapes `updateGameProgression` and `move_nbr` from the game page.
    async fn get_table_stats(&self, table: &TableInfo) -> Result<TableStats, BgaError> {
        let url = format!(
            "{}/{}/{}?table={}",
            &self.base_url, table.gameserver, table.game_name, table.id
        );
        debug!("request {}", &url);
        let body = self.client.get(&url).send().await?.text().await?;

        let capture = |pattern: &str| {
            Regex::new(pattern)
                .unwrap()
                .captures(&body)
                .map(|captures| captures[1].to_owned())
                .unwrap_or_default()
        };

        Ok(TableStats {
            progress: capture(r#"updateGameProgression":"([^"]*)""#),
            moves: capture(r#"move_nbr":"([^"]*)""#),
            url,
        })
    }

    /// Scrapes the `restrictToGroup` select box from the table page.
    ///
    /// The group ids are unique per user, so they can only be read from a page
    /// rendered for the logged-in creator.
    async fn get_group_options(&self, table_id: u64) -> Result<Vec<(String, String)>, BgaError> {
        let body = self
            .fetch("/table", &[("table".to_owned(), table_id.to_string())])
            .await?;
        Ok(parse_group_options(&body))
    }

    fn table_url(&self, table_id: u64) -> String {
        format!("{}/table?table={}", &self.base_url, table_id)
    }
}

/// Extracts `(id, name)` pairs from the `restrictToGroup` select box.
pub fn parse_group_options(html: &str) -> Vec<(String, String)> {
    let select = Regex::new(r#"<select id="restrictToGroup">([\s\S]*?)</select>"#).unwrap();
    let Some(captures) = select.captures(html) else {
        return Vec::new();
    };

    let option = Regex::new(r#""(\d*)">([^<]*)"#).unwrap();
    option
        .captures_iter(&captures[0])
        .map(|c| (c[1].to_owned(), c[2].to_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_login_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/account/account/login.html")
            .with_status(200)
            .create_async()
            .await;
        server
            .mock("GET", "/community")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("<html>Welcome back, alice!</html>")
            .create_async()
            .await;

        let requester = BgaRequester::new(&server.url()).unwrap();
        assert!(requester.login("alice", "secret").await.unwrap());
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/account/account/login.html")
            .with_status(200)
            .create_async()
            .await;
        server
            .mock("GET", "/community")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("You must be logged in to see this page.")
            .create_async()
            .await;

        let requester = BgaRequester::new(&server.url()).unwrap();
        assert!(!requester.login("alice", "wrong").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_table_returns_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/table/table/createnew.html")
            .match_query(mockito::Matcher::UrlEncoded(
                "game".to_owned(),
                "42".to_owned(),
            ))
            .with_status(200)
            .with_body(r#"{"status": "1", "data": {"table": "123456"}}"#)
            .create_async()
            .await;

        let requester = BgaRequester::new(&server.url()).unwrap();
        assert_eq!(requester.create_table(42).await.unwrap(), 123456);
    }

    #[tokio::test]
    async fn test_create_table_service_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/table/table/createnew.html")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status": "0", "error": "You have a game in progress"}"#)
            .create_async()
            .await;

        let requester = BgaRequester::new(&server.url()).unwrap();
        match requester.create_table(42).await {
            Err(BgaError::Service(message)) => {
                assert_eq!(message, "You have a game in progress")
            }
            other => panic!("expected Service error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_find_player_id_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/player/player/findplayer.html")
            .match_query(mockito::Matcher::UrlEncoded(
                "q".to_owned(),
                "alice".to_owned(),
            ))
            .with_status(200)
            .with_body(r#"{"items": [{"id": 84781234}]}"#)
            .create_async()
            .await;

        let requester = BgaRequester::new(&server.url()).unwrap();
        assert_eq!(
            requester.find_player_id("alice").await.unwrap(),
            Some("84781234".to_owned())
        );
    }

    #[tokio::test]
    async fn test_find_player_id_missing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/player/player/findplayer.html")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"items": []}"#)
            .create_async()
            .await;

        let requester = BgaRequester::new(&server.url()).unwrap();
        assert_eq!(requester.find_player_id("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invite_player_error_carries_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/table/table/invitePlayer.html")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status": "0", "error": "This player has blocked invitations"}"#)
            .create_async()
            .await;

        let requester = BgaRequester::new(&server.url()).unwrap();
        match requester.invite_player(1, "7").await {
            Err(BgaError::Service(message)) => {
                assert_eq!(message, "This player has blocked invitations")
            }
            other => panic!("expected Service error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_tables() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/tablemanager/tablemanager/tableinfos.html")
            .match_query(mockito::Matcher::UrlEncoded(
                "playerfilter".to_owned(),
                "7".to_owned(),
            ))
            .with_status(200)
            .with_body(
                r#"{"data": {"tables": {"11": {"id": "11", "game_name": "carcassonne",
                    "game_id": "1", "gameserver": "5", "players": {},
                    "player_display": ["7"], "gamestart": "1600000000"}}}}"#,
            )
            .create_async()
            .await;

        let requester = BgaRequester::new(&server.url()).unwrap();
        let tables = requester.get_tables("7").await.unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].game_name, "carcassonne");
    }

    #[tokio::test]
    async fn test_get_table_stats_scrapes_progress_and_moves() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/5/carcassonne")
            .match_query(mockito::Matcher::UrlEncoded(
                "table".to_owned(),
                "11".to_owned(),
            ))
            .with_status(200)
            .with_body(r#"..."updateGameProgression":"45"..."move_nbr":"120"..."#)
            .create_async()
            .await;

        let requester = BgaRequester::new(&server.url()).unwrap();
        let table = TableInfo {
            id: "11".to_owned(),
            game_name: "carcassonne".to_owned(),
            game_id: "1".to_owned(),
            gameserver: "5".to_owned(),
            players: Default::default(),
            player_display: vec![],
            gamestart: None,
            scheduled: None,
        };
        let stats = requester.get_table_stats(&table).await.unwrap();
        assert_eq!(stats.progress, "45");
        assert_eq!(stats.moves, "120");
    }

    #[test]
    fn test_parse_group_options() {
        let html = r#"
            <select id="restrictToGroup">
                <option value="0">-</option>
                <option value="123">My Gaming Group</option>
                <option value="456">Work Friends</option>
            </select>
        "#;
        let groups = parse_group_options(html);
        assert_eq!(
            groups,
            vec![
                ("0".to_owned(), "-".to_owned()),
                ("123".to_owned(), "My Gaming Group".to_owned()),
                ("456".to_owned(), "Work Friends".to_owned()),
            ]
        );
    }

    #[test]
    fn test_parse_group_options_missing_select() {
        assert!(parse_group_options("<html></html>").is_empty());
    }

    #[test]
    fn test_table_url() {
        let requester = BgaRequester::new("https://boardgamearena.com").unwrap();
        assert_eq!(
            requester.table_url(123456),
            "https://boardgamearena.com/table?table=123456"
        );
    }
}
