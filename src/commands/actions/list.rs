//! Handler for listing the game catalog.

use crate::bga::GameCatalogEntry;
use crate::commands::markdown_response::format_game_list;

/// Formats the catalog for the `list` command.
///
/// The catalog snapshot is fetched by the caller; the splitter in the chat
/// boundary takes care of the message length ceiling.
pub fn execute_list(entries: &[GameCatalogEntry]) -> String {
    format_game_list(entries)
}
