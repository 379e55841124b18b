//! Scraped catalog of the games Board Game Arena offers.
//!
//! There is no JSON endpoint for the game list, so the catalog is scraped from
//! the public `gamelist` page and cached. The list changes rarely; a weekly
//! refresh is plenty, and a stale catalog is still served when BGA is
//! unreachable rather than failing every game-name resolution.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use regex::Regex;
use tokio::sync::Mutex;

use crate::bga::BgaError;

/// How long a scraped catalog stays fresh.
const CATALOG_REFRESH: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// One game BGA offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameCatalogEntry {
    /// The game name as BGA displays it
    pub display_name: String,
    /// The id BGA assigns to the game, used to create tables
    pub bga_id: u32,
}

/// Cached snapshot of the scraped game list.
struct CachedCatalog {
    fetched_at: Instant,
    entries: Arc<Vec<GameCatalogEntry>>,
}

/// Scraper and cache for the BGA game list.
///
/// [`GameCatalog::snapshot`] hands out an `Arc` to an immutable entry list, so
/// a resolution operation always sees one consistent catalog even if a refresh
/// happens concurrently.
pub struct GameCatalog {
    /// HTTP client
    client: reqwest::Client,
    /// Full url of the game list page
    url: String,
    /// Last scraped catalog, if any
    cache: Mutex<Option<CachedCatalog>>,
}

impl GameCatalog {
    /// Creates a new catalog for the given BGA base url.
    pub fn new(base_url: &str) -> Self {
        GameCatalog {
            client: reqwest::Client::new(),
            url: format!("{}/gamelist?section=all", base_url),
            cache: Mutex::new(None),
        }
    }

    /// Returns a consistent snapshot of the game list.
    ///
    /// Serves the cached list when it is younger than a week. Otherwise the
    /// list page is scraped again; if that fails and a stale cache exists, the
    /// stale list is served instead of an error.
    ///
    /// # Errors
    ///
    /// Returns [`BgaError`] only when the scrape fails and no cached catalog
    /// exists at all.
    pub async fn snapshot(&self) -> Result<Arc<Vec<GameCatalogEntry>>, BgaError> {
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.as_ref()
            && cached.fetched_at.elapsed() < CATALOG_REFRESH
        {
            debug!("serving game catalog from cache");
            return Ok(Arc::clone(&cached.entries));
        }

        match self.fetch().await {
            Ok(entries) => {
                info!("scraped {} games from the bga game list", entries.len());
                let entries = Arc::new(entries);
                *cache = Some(CachedCatalog {
                    fetched_at: Instant::now(),
                    entries: Arc::clone(&entries),
                });
                Ok(entries)
            }
            Err(error) => match cache.as_ref() {
                Some(cached) => {
                    warn!("game list fetch failed ({}), serving stale catalog", error);
                    Ok(Arc::clone(&cached.entries))
                }
                None => Err(error),
            },
        }
    }

    /// Fetches and parses the game list page.
    async fn fetch(&self) -> Result<Vec<GameCatalogEntry>, BgaError> {
        debug!("request {}", &self.url);
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(BgaError::BadResponse(format!(
                "game list page returned {}",
                response.status()
            )));
        }

        let html = response.text().await?;
        let entries = parse_game_list(&html);
        if entries.is_empty() {
            return Err(BgaError::BadResponse(
                "game list page contained no games".to_owned(),
            ));
        }
        Ok(entries)
    }
}

/// Parses the game list page HTML into catalog entries.
///
/// Entries are sorted by display name; a name appearing twice keeps the last id.
pub fn parse_game_list(html: &str) -> Vec<GameCatalogEntry> {
    // Each game appears as an item_tag_<n>_<game id> anchor followed by a name node
    let pattern = Regex::new(r#"item_tag_\d+_(\d+)[\s\S]*?name">\s+([^<>]*)\n"#).unwrap();

    let mut entries: Vec<GameCatalogEntry> = Vec::new();
    for captures in pattern.captures_iter(html) {
        let Ok(bga_id) = captures[1].parse::<u32>() else {
            continue;
        };
        let display_name = captures[2].trim().to_owned();
        if display_name.is_empty() {
            continue;
        }

        match entries
            .iter_mut()
            .find(|entry| entry.display_name == display_name)
        {
            Some(entry) => entry.bga_id = bga_id,
            None => entries.push(GameCatalogEntry {
                display_name,
                bga_id,
            }),
        }
    }

    entries.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAME_LIST_HTML: &str = r#"
        <div id="item_tag_3_42" class="gamelist_item">
            <div class="name">
                Race for the Galaxy
            </div>
        </div>
        <div id="item_tag_4_7" class="gamelist_item">
            <div class="name">
                Carcassonne
            </div>
        </div>
        <div id="item_tag_5_99" class="gamelist_item">
            <div class="name">
                Ra
            </div>
        </div>
    "#;

    #[test]
    fn test_parse_game_list_extracts_ids_and_names() {
        let entries = parse_game_list(GAME_LIST_HTML);
        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries[2],
            GameCatalogEntry {
                display_name: "Race for the Galaxy".to_owned(),
                bga_id: 42,
            }
        );
    }

    #[test]
    fn test_parse_game_list_sorted_by_name() {
        let entries = parse_game_list(GAME_LIST_HTML);
        let names: Vec<&str> = entries
            .iter()
            .map(|entry| entry.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["Carcassonne", "Ra", "Race for the Galaxy"]);
    }

    #[test]
    fn test_parse_game_list_empty_html() {
        assert!(parse_game_list("<html></html>").is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_scrapes_and_caches() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/gamelist?section=all")
            .with_status(200)
            .with_body(GAME_LIST_HTML)
            .expect(1)
            .create_async()
            .await;

        let catalog = GameCatalog::new(&server.url());
        let first = catalog.snapshot().await.unwrap();
        let second = catalog.snapshot().await.unwrap();

        assert_eq!(first.len(), 3);
        assert!(Arc::ptr_eq(&first, &second));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_snapshot_error_without_cache() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/gamelist?section=all")
            .with_status(503)
            .create_async()
            .await;

        let catalog = GameCatalog::new(&server.url());
        assert!(catalog.snapshot().await.is_err());
    }
}
