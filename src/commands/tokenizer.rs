//! Shell-style argument tokenizing for bot commands.
//!
//! This module turns a raw message body into positional arguments and
//! `key:value` option pairs. Quoting follows shell semantics via the
//! `shell-words` crate, so `"Race for the Galaxy"` is a single token.
//!
//! # Quote normalization
//!
//! Chat clients on phones love to substitute locale quote glyphs (`“ ” « » 「」` ...)
//! for the straight quotes the user typed. All of them are normalized to `"` before
//! splitting so quoting works no matter what keyboard produced the message.

use log::debug;

/// Quote glyphs that are normalized to a straight double quote before splitting.
const QUOTE_GLYPHS: [char; 22] = [
    '\'', '‹', '›', '«', '»', '‘', '’', '‚', '“', '”', '„', '′', '″', '「', '」', '﹁', '﹂',
    '『', '』', '﹃', '﹄', '〝',
];

/// Placeholder for a colon that appeared inside quotes.
///
/// Quoted colons must survive splitting as literal text instead of turning the
/// token into an option pair. They are masked before the split and restored after.
const QUOTED_COLON: char = '\u{e000}';

/// A message body split into a command keyword, positional arguments and options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedInput {
    /// First token of the message, including any leading sigil
    pub command: String,
    /// Arguments that are not `key:value` pairs, in order
    pub positional: Vec<String>,
    /// `key:value` pairs in insertion order, duplicate keys last-wins
    pub options: Vec<(String, String)>,
}

/// Errors that can occur while tokenizing a message body.
#[derive(Debug, PartialEq, Eq)]
pub enum TokenizeError {
    /// The message contains an unmatched quote. Carries the offending input
    /// so it can be echoed back to the user.
    UnbalancedQuotes(String),
}

/// Tokenizes a raw message body into command, positional arguments and options.
///
/// # Arguments
///
/// * `body` - The raw message text
///
/// # Returns
///
/// * `Ok(TokenizedInput)` - The split message. `command` is the first token.
/// * `Err(TokenizeError::UnbalancedQuotes)` - The body has an unmatched quote.
///
/// # Option extraction
///
/// Every token containing an unquoted `:` is split on the *first* colon into a
/// `key:value` pair. Tokens starting with `@` are exempt, because chat user ids
/// (`@alice:example.com`) carry a colon of their own. A repeated key keeps its
/// original position but takes the last value.
///
/// # Examples
///
/// ```
/// # use meeple::commands::tokenizer::tokenize;
/// let input = tokenize("!play chess alice speed:fast").unwrap();
/// assert_eq!(input.command, "!play");
/// assert_eq!(input.positional, vec!["chess", "alice"]);
/// assert_eq!(input.options, vec![("speed".to_owned(), "fast".to_owned())]);
/// ```
pub fn tokenize(body: &str) -> Result<TokenizedInput, TokenizeError> {
    let normalized = normalize_quotes(body);
    let masked = mask_quoted_colons(&normalized);

    let tokens = match shell_words::split(&masked) {
        Ok(tokens) => tokens,
        Err(_) => return Err(TokenizeError::UnbalancedQuotes(body.to_owned())),
    };

    debug!("tokenized message into {} tokens", tokens.len());

    let mut tokens = tokens.into_iter();
    let command = tokens.next().unwrap_or_default();

    let mut positional = Vec::new();
    let mut options: Vec<(String, String)> = Vec::new();

    for token in tokens {
        let had_quoted_colon = token.contains(QUOTED_COLON);
        let token = token.replace(QUOTED_COLON, ":");

        if let Some((key, value)) = split_option(&token, had_quoted_colon) {
            match options.iter_mut().find(|(existing, _)| *existing == key) {
                Some(entry) => entry.1 = value,
                None => options.push((key, value)),
            }
        } else {
            positional.push(token);
        }
    }

    Ok(TokenizedInput {
        command: command.replace(QUOTED_COLON, ":"),
        positional,
        options,
    })
}

/// Replaces locale quote glyphs with straight double quotes.
pub fn normalize_quotes(body: &str) -> String {
    body.chars()
        .map(|c| if QUOTE_GLYPHS.contains(&c) { '"' } else { c })
        .collect()
}

/// Masks colons that appear inside double quotes so they survive splitting.
fn mask_quoted_colons(body: &str) -> String {
    let mut in_quotes = false;
    body.chars()
        .map(|c| match c {
            '"' => {
                in_quotes = !in_quotes;
                c
            }
            ':' if in_quotes => QUOTED_COLON,
            _ => c,
        })
        .collect()
}

/// Splits a token into a `key:value` pair when it qualifies as an option.
fn split_option(token: &str, had_quoted_colon: bool) -> Option<(String, String)> {
    // Chat user ids carry a colon but are positional arguments
    if token.starts_with('@') || had_quoted_colon {
        return None;
    }
    let (key, value) = token.split_once(':')?;
    Some((key.to_owned(), value.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_simple_command() {
        let input = tokenize("!play chess").unwrap();
        assert_eq!(input.command, "!play");
        assert_eq!(input.positional, vec!["chess"]);
        assert!(input.options.is_empty());
    }

    #[test]
    fn test_tokenize_quoted_token_with_spaces() {
        let input = tokenize("!play \"Race for the Galaxy\" alice").unwrap();
        assert_eq!(input.positional, vec!["Race for the Galaxy", "alice"]);
    }

    #[test]
    fn test_tokenize_locale_quotes_normalized() {
        let input = tokenize("!setup “Al Ice” secret").unwrap();
        assert_eq!(input.positional, vec!["Al Ice", "secret"]);
    }

    #[test]
    fn test_tokenize_unbalanced_quotes_is_hard_error() {
        let result = tokenize("!play \"Race for the");
        assert_eq!(
            result,
            Err(TokenizeError::UnbalancedQuotes(
                "!play \"Race for the".to_owned()
            ))
        );
    }

    #[test]
    fn test_tokenize_option_partition() {
        let input = tokenize("!play foo:bar baz").unwrap();
        assert_eq!(input.positional, vec!["baz"]);
        assert_eq!(input.options, vec![("foo".to_owned(), "bar".to_owned())]);
    }

    #[test]
    fn test_tokenize_option_splits_on_first_colon() {
        let input = tokenize("!play presentation:come:play").unwrap();
        assert_eq!(
            input.options,
            vec![("presentation".to_owned(), "come:play".to_owned())]
        );
    }

    #[test]
    fn test_tokenize_duplicate_option_last_wins_keeps_position() {
        let input = tokenize("!play speed:fast mode:normal speed:slow").unwrap();
        assert_eq!(
            input.options,
            vec![
                ("speed".to_owned(), "slow".to_owned()),
                ("mode".to_owned(), "normal".to_owned()),
            ]
        );
    }

    #[test]
    fn test_tokenize_quoted_colon_stays_positional() {
        let input = tokenize("!play \"chess: the gathering\"").unwrap();
        assert_eq!(input.positional, vec!["chess: the gathering"]);
        assert!(input.options.is_empty());
    }

    #[test]
    fn test_tokenize_matrix_user_id_stays_positional() {
        let input = tokenize("!play chess @alice:example.com").unwrap();
        assert_eq!(input.positional, vec!["chess", "@alice:example.com"]);
        assert!(input.options.is_empty());
    }

    #[test]
    fn test_tokenize_empty_body() {
        let input = tokenize("").unwrap();
        assert_eq!(input.command, "");
        assert!(input.positional.is_empty());
    }

    #[test]
    fn test_tokenize_quoted_option_value() {
        let input = tokenize("!play presentation:\"friendly game\"").unwrap();
        assert_eq!(
            input.options,
            vec![("presentation".to_owned(), "friendly game".to_owned())]
        );
    }
}
