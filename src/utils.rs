//! Utility functions for path manipulation and chat message handling.
//!
//! This module provides helper functions used throughout the Meeple bot application
//! for file system operations, long message splitting and log redaction.

use std::path::PathBuf;

/// Maximum length of a single outbound chat message.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Constructs a file system path by joining a directory path with a subdirectory.
///
/// This is a convenience function that combines path components and returns a
/// platform-independent path string. It handles the path separator automatically
/// based on the operating system.
///
/// # Arguments
///
/// * `dir_path` - The base directory path
/// * `subdir_path` - The subdirectory or file name to append
///
/// # Returns
///
/// A `String` containing the joined path.
///
/// # Panics
///
/// Panics if the resulting path contains invalid UTF-8 characters.
///
/// # Examples
///
/// ```
/// # use meeple::utils::get_path;
/// let path = get_path("/home/user", "config");
/// assert_eq!(path, "/home/user/config");
/// ```
pub fn get_path(dir_path: &str, subdir_path: &str) -> String {
    let path_buf: PathBuf = [dir_path, subdir_path].iter().collect();
    path_buf.to_str().unwrap().to_owned()
}

/// Splits a message body into chunks that fit within [`MAX_MESSAGE_LENGTH`].
///
/// Splitting happens on line boundaries so a word is never cut in half. A line
/// longer than the limit on its own is hard-split at the limit. When a
/// continuation chunk would start with a tab, the tab is replaced with a `.   `
/// sentinel so chat clients don't trim the indentation away.
///
/// # Arguments
///
/// * `body` - The full message text to split
///
/// # Returns
///
/// A vector of message chunks, each at most [`MAX_MESSAGE_LENGTH`] characters.
pub fn split_message(body: &str) -> Vec<String> {
    if body.len() <= MAX_MESSAGE_LENGTH {
        return vec![body.to_owned()];
    }

    let mut chunks = Vec::new();
    let mut remaining = body.to_owned();

    while remaining.len() > MAX_MESSAGE_LENGTH {
        // Back the limit off to a char boundary so a multi-byte char is never cut
        let mut limit = MAX_MESSAGE_LENGTH;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }

        // Find the last newline that keeps the chunk under the limit
        let split_at = match remaining[..limit].rfind('\n') {
            Some(position) => position,
            // A single line longer than the limit, hard split
            None => limit,
        };

        chunks.push(remaining[..split_at].to_owned());
        let mut rest = remaining[split_at..].trim_start_matches('\n').to_owned();
        if let Some(stripped) = rest.strip_prefix('\t') {
            rest = format!(".   {}", stripped);
        }
        remaining = rest;
    }

    if !remaining.is_empty() {
        chunks.push(remaining);
    }

    chunks
}

/// Redacts credentials from a message body before it reaches the logs.
///
/// `setup` commands carry a password in clear text. Everything after the
/// command keyword is replaced so debug logging never records it.
///
/// # Arguments
///
/// * `body` - The raw message body
///
/// # Returns
///
/// The body unchanged, or `!setup [redacted]` when the message is a setup command.
///
/// # Examples
///
/// ```
/// # use meeple::utils::redact_credentials;
/// assert_eq!(redact_credentials("!setup alice hunter2"), "!setup [redacted]");
/// assert_eq!(redact_credentials("!list"), "!list");
/// ```
pub fn redact_credentials(body: &str) -> String {
    let trimmed = body.trim_start();
    match trimmed.strip_prefix("!setup") {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
            "!setup [redacted]".to_owned()
        }
        _ => body.to_owned(),
    }
}

/// Builds the loggable form of an inbound message body.
///
/// While the sender has an interactive session open, any bare message may be an
/// answer to a password prompt, so the body is replaced with a length marker.
/// Outside a session only `setup` bodies carry credentials and
/// [`redact_credentials`] handles those.
///
/// # Arguments
///
/// * `body` - The raw message body
/// * `has_open_session` - Whether the sender has an interactive session open
///
/// # Returns
///
/// A string safe to write to the logs.
pub fn loggable_body(body: &str, has_open_session: bool) -> String {
    if has_open_session {
        format!("[session message, {} chars]", body.chars().count())
    } else {
        redact_credentials(body)
    }
}
