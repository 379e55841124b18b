//! Fuzzy name resolution for games and other user-typed labels.
//!
//! Users rarely type a game name the way Board Game Arena spells it. This module
//! normalizes both sides to lowercase alphanumerics and matches with an
//! exact-match-wins-else-prefix rule, so `race`, `RaceForTheGalaxy` and
//! `"Race for the Galaxy"` all land on the same catalog entry.

use crate::bga::catalog::GameCatalogEntry;

/// Errors that can occur while resolving a name against a candidate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// Nothing matched. Carries the original input for the error message.
    NotFound(String),
    /// Several candidates share the prefix. Carries the input and the
    /// display names of every candidate, in catalog order.
    Ambiguous(String, Vec<String>),
}

/// Normalizes a name for comparison.
///
/// Lowercases the input and strips everything that is not an ASCII letter or
/// digit, so capitalization, spaces and punctuation never matter.
///
/// # Examples
///
/// ```
/// # use meeple::bga::resolver::normalize_name;
/// assert_eq!(normalize_name("Race for the Galaxy"), "raceforthegalaxy");
/// assert_eq!(normalize_name("7 Wonders!"), "7wonders");
/// ```
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Resolves a user-typed game name against the catalog.
///
/// An exact normalized match wins outright, even when it is also a prefix of
/// other entries. Otherwise every entry the input is a prefix of is a
/// candidate: exactly one candidate resolves, zero is [`ResolutionError::NotFound`],
/// several are [`ResolutionError::Ambiguous`].
///
/// # Arguments
///
/// * `name_part` - What the user typed
/// * `catalog` - A catalog snapshot to match against
pub fn resolve_game<'a>(
    name_part: &str,
    catalog: &'a [GameCatalogEntry],
) -> Result<&'a GameCatalogEntry, ResolutionError> {
    let needle = normalize_name(name_part);
    if needle.is_empty() {
        return Err(ResolutionError::NotFound(name_part.to_owned()));
    }

    let mut candidates = Vec::new();
    for entry in catalog {
        let normalized = normalize_name(&entry.display_name);
        if normalized == needle {
            return Ok(entry);
        }
        if normalized.starts_with(&needle) {
            candidates.push(entry);
        }
    }

    match candidates.len() {
        0 => Err(ResolutionError::NotFound(name_part.to_owned())),
        1 => Ok(candidates[0]),
        _ => Err(ResolutionError::Ambiguous(
            name_part.to_owned(),
            candidates
                .iter()
                .map(|entry| entry.display_name.clone())
                .collect(),
        )),
    }
}

/// Resolves a user-typed label against an arbitrary list of names.
///
/// Same matching rule as [`resolve_game`]. Used for group names and per-game
/// preference keys, where the candidates are plain strings.
pub fn resolve_label<'a>(
    name_part: &str,
    labels: &'a [String],
) -> Result<&'a String, ResolutionError> {
    let needle = normalize_name(name_part);
    if needle.is_empty() {
        return Err(ResolutionError::NotFound(name_part.to_owned()));
    }

    let mut candidates = Vec::new();
    for label in labels {
        let normalized = normalize_name(label);
        if normalized == needle {
            return Ok(label);
        }
        if normalized.starts_with(&needle) {
            candidates.push(label);
        }
    }

    match candidates.len() {
        0 => Err(ResolutionError::NotFound(name_part.to_owned())),
        1 => Ok(candidates[0]),
        _ => Err(ResolutionError::Ambiguous(
            name_part.to_owned(),
            candidates.iter().map(|label| (*label).clone()).collect(),
        )),
    }
}
