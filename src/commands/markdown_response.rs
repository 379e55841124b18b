//! Markdown response formatters for bot commands.
//!
//! This module provides functions to format bot responses in Markdown format
//! for display in Matrix chat rooms. Keeping them in one place makes the bot's
//! voice consistent and lets tests pin the exact wording.

use crate::bga::GameCatalogEntry;
use crate::bga::requester::TableStats;
use crate::commands::command::COMMAND_NAMES;

/// Width game names are truncated to in the `list` columns.
const LIST_NAME_WIDTH: usize = 22;

/// Games per row in the `list` output.
const LIST_COLUMNS: usize = 5;

/// Formats the help message showing available bot commands.
///
/// # Examples
///
/// ```
/// # use meeple::commands::markdown_response::format_help;
/// let help = format_help();
/// assert!(help.contains("!play"));
/// ```
pub fn format_help() -> String {
    [
        "I create and watch Board Game Arena tables. Commands:",
        "- `!play <game> <player...> [option:value...]`: create a table and invite the players (alias `!make`)",
        "- `!setup <username> <password>`: link your BGA account, or `!setup` alone for the menu",
        "- `!link <user> <BGA username>`: link someone's account without a password",
        "- `!status <player...>`: list running tables (alias `!tables`)",
        "- `!friend <player...>`: add BGA friends",
        "- `!list`: the games BGA offers",
        "- `!options`: the table options `play` understands",
        "- `!help`: show this help message",
        "",
        "A command missing arguments opens a menu; answer with the numbers, or `cancel`.",
    ]
    .join("\n")
}

/// Formats the help message describing the table options.
pub fn format_options_help() -> String {
    [
        "Options are given as `key:value`. I understand:",
        "- `mode`: `normal` or `training`",
        "- `speed`: `fast`, `normal`, `slow`, `24/day`, `12/day`, `8/day`, `4/day`, `3/day`, `2/day`, `1/day`, `1/2days` or `nolimit`",
        "- `minrep`: minimum karma, one of `0`, `50`, `65`, `75`, `85`",
        "- `players`: wanted player count, like `players:2-5`",
        "- `levels`: allowed experience range, like `levels:good-strong` (beginner, apprentice, average, good, strong, expert, master)",
        "- `restrictgroup`: restrict the table to one of your BGA groups",
        "- `lang`: restrict the table to a language, like `lang:en`",
        "- `open`: `true` opens the table to the public right away",
        "- a raw numeric option id is passed to BGA as-is, like `201:1`",
        "",
        "Set them on the command, or save defaults with `!setup`.",
    ]
    .join("\n")
}

/// Formats the error for a command keyword that is not in the registry.
pub fn format_unknown_command(keyword: &str) -> String {
    format!(
        "Unknown command `{}`. Available commands: {}.",
        keyword,
        COMMAND_NAMES.join(", ")
    )
}

/// Formats the error for a message with an unmatched quote.
pub fn format_unbalanced_quotes(body: &str) -> String {
    format!("There is an unmatched quote in `{}`.", body)
}

/// Formats the announcement for a freshly created table.
pub fn format_table_created(game_name: &str, url: &str) -> String {
    format!("Your {} table is ready: [{}]({})", game_name, url, url)
}

/// Formats the per-player line for a successful invitation.
pub fn format_invite_success(player: &str) -> String {
    format!("- invited {}", player)
}

/// Formats the per-player line for a failed invitation.
pub fn format_invite_failure(player: &str, reason: &str) -> String {
    format!("- could not invite {}: {}", player, reason)
}

/// Formats the game catalog as fixed-width columns.
///
/// Names longer than the column are truncated rather than wrapped, the way a
/// directory listing would. Rows start with a tab so the message splitter
/// preserves the alignment.
pub fn format_game_list(entries: &[GameCatalogEntry]) -> String {
    let mut lines = vec![format!("{} games on Board Game Arena:", entries.len())];

    for row in entries.chunks(LIST_COLUMNS) {
        let line = row
            .iter()
            .map(|entry| {
                let name: String = entry.display_name.chars().take(LIST_NAME_WIDTH).collect();
                format!("{:<width$}", name, width = LIST_NAME_WIDTH + 1)
            })
            .collect::<String>();
        lines.push(format!("\t{}", line.trim_end()));
    }

    lines.join("\n")
}

/// Formats one line of the `status` listing.
pub fn format_table_summary(table_age_days: i64, game_name: &str, stats: &TableStats) -> String {
    let progress = if stats.progress.is_empty() {
        "0".to_owned()
    } else {
        stats.progress.clone()
    };
    let moves = if stats.moves.is_empty() {
        "no".to_owned()
    } else {
        stats.moves.clone()
    };
    format!(
        "- {}: {} days old, {}% done, {} moves: [{}]({})",
        game_name, table_age_days, progress, moves, stats.url, stats.url
    )
}

/// Formats the reply when a status lookup finds no shared table.
pub fn format_no_tables(players: &[String]) -> String {
    format!("No running table with {}.", players.join(", "))
}

/// Formats the confirmation after credentials were verified and saved.
pub fn format_setup_saved(username: &str) -> String {
    format!(
        "Your Board Game Arena account {} is linked, I can now create tables for you.",
        username
    )
}

/// Formats the rejection when BGA refuses a username/password pair.
pub fn format_setup_rejected() -> String {
    "Board Game Arena rejected these credentials, nothing was saved.".to_owned()
}

/// Formats the confirmation after a password-less link.
pub fn format_link_saved(user: &str, username: &str) -> String {
    format!(
        "Linked {} to the Board Game Arena account {}.",
        user, username
    )
}

/// Formats the per-player line for the `friend` command.
pub fn format_friend_added(player: &str) -> String {
    format!("- {} is now a friend", player)
}

/// Formats the per-player failure line for the `friend` command.
pub fn format_friend_failed(player: &str, reason: &str) -> String {
    format!("- could not add {}: {}", player, reason)
}

/// Generic reply when an unexpected infrastructure error was caught.
pub fn format_internal_error() -> String {
    "Something went wrong on my side, please try again.".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_unknown_command() {
        assert_eq!(
            format_unknown_command("dance"),
            "Unknown command `dance`. Available commands: play, setup, link, status, friend, list, options, help."
        );
    }

    #[test]
    fn test_format_unbalanced_quotes() {
        assert_eq!(
            format_unbalanced_quotes("!play \"race for the"),
            "There is an unmatched quote in `!play \"race for the`."
        );
    }

    #[test]
    fn test_format_table_created() {
        assert_eq!(
            format_table_created("Ra", "https://boardgamearena.com/table?table=1"),
            "Your Ra table is ready: [https://boardgamearena.com/table?table=1](https://boardgamearena.com/table?table=1)"
        );
    }

    #[test]
    fn test_format_table_summary() {
        let stats = TableStats {
            progress: "45".to_owned(),
            moves: "120".to_owned(),
            url: "https://example.com/t".to_owned(),
        };
        assert_eq!(
            format_table_summary(3, "Ra", &stats),
            "- Ra: 3 days old, 45% done, 120 moves: [https://example.com/t](https://example.com/t)"
        );
    }

    #[test]
    fn test_format_table_summary_empty_stats() {
        let stats = TableStats {
            progress: String::new(),
            moves: String::new(),
            url: "u".to_owned(),
        };
        assert_eq!(
            format_table_summary(0, "Ra", &stats),
            "- Ra: 0 days old, 0% done, no moves: [u](u)"
        );
    }

    #[test]
    fn test_format_game_list_columns_and_truncation() {
        let entries: Vec<GameCatalogEntry> = [
            "Carcassonne",
            "Ra",
            "Race for the Galaxy Deluxe",
            "Hanabi",
            "Azul",
            "Wingspan",
        ]
        .iter()
        .enumerate()
        .map(|(i, name)| GameCatalogEntry {
            display_name: (*name).to_owned(),
            bga_id: i as u32,
        })
        .collect();

        let listing = format_game_list(&entries);
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines[0], "6 games on Board Game Arena:");
        // 5 per row, names cut at 22 characters
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("Race for the Galaxy De"));
        assert!(!lines[1].contains("Deluxe"));
        assert!(lines[2].contains("Wingspan"));
    }

    #[test]
    fn test_format_setup_saved() {
        assert_eq!(
            format_setup_saved("alice_bga"),
            "Your Board Game Arena account alice_bga is linked, I can now create tables for you."
        );
    }

    #[test]
    fn test_format_help_mentions_every_command() {
        let help = format_help();
        for name in COMMAND_NAMES {
            assert!(help.contains(name), "help does not mention {}", name);
        }
    }
}
