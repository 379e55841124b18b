//! Table option validation for Board Game Arena.
//!
//! A table on BGA is configured after creation, one HTTP request per option.
//! This module validates the `key:value` options a user supplied, merges them
//! with defaults and stored preferences, and turns them into
//! [`OptionRequest`]s ready to drive the endpoints.

use std::fmt;

use crate::bga::resolver::resolve_label;

/// Game mode names and the BGA value for table option id 201.
pub const MODE_TYPES: [(&str, u32); 2] = [("normal", 0), ("training", 1)];

/// Game speed names and the BGA value for table option id 200.
pub const SPEED_TYPES: [(&str, u32); 12] = [
    ("fast", 0),
    ("normal", 1),
    ("slow", 2),
    ("24/day", 10),
    ("12/day", 11),
    ("8/day", 12),
    ("4/day", 13),
    ("3/day", 14),
    ("2/day", 15),
    ("1/day", 17),
    ("1/2days", 19),
    ("nolimit", 20),
];

/// Minimum reputation (karma) thresholds and their BGA enum values.
pub const KARMA_TYPES: [(&str, u32); 5] = [("0", 0), ("50", 1), ("65", 2), ("75", 3), ("85", 4)];

/// Player experience levels, ordered. The index is the BGA level number.
pub const LEVEL_VALUES: [&str; 7] = [
    "beginner",
    "apprentice",
    "average",
    "good",
    "strong",
    "expert",
    "master",
];

/// Option keys users can set, in the order menus display them.
pub const OPTION_KEYS: [&str; 9] = [
    "mode",
    "speed",
    "minrep",
    "presentation",
    "players",
    "levels",
    "restrictgroup",
    "lang",
    "open",
];

/// Default table presentation, applied when the user sets none.
pub const DEFAULT_PRESENTATION: &str =
    "Created with meeple, a chat bot for Board Game Arena tables.";

/// A single option translated into an endpoint path and its query parameters.
///
/// The `table` and `dojo.preventCache` parameters are appended by the requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionRequest {
    /// Endpoint path under the BGA base url
    pub path: &'static str,
    /// Query parameters specific to this option
    pub params: Vec<(String, String)>,
}

/// Errors raised while validating user options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionError {
    /// The key is not in the schema and is not a raw numeric option id
    UnknownOption(String),
    /// The key is known but the value is out of its domain
    InvalidValue { key: String, message: String },
    /// The option is reserved to the contributor allow-list
    ReservedOption(String),
    /// `restrictgroup` named a group the creator is not a member of
    UnknownGroup { name: String, groups: Vec<String> },
}

impl fmt::Display for OptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionError::UnknownOption(key) => {
                write!(
                    f,
                    "Option `{}` is not a valid option. See `!options` for the list.",
                    key
                )
            }
            OptionError::InvalidValue { key, message } => {
                write!(f, "Invalid value for `{}`: {}", key, message)
            }
            OptionError::ReservedOption(key) => {
                write!(f, "Option `{}` is reserved to bot contributors.", key)
            }
            OptionError::UnknownGroup { name, groups } => {
                let groups = groups
                    .iter()
                    .map(|g| format!("`{}`", g))
                    .collect::<Vec<String>>()
                    .join(", ");
                write!(
                    f,
                    "Unable to find group `{}`. You are a member of groups [{}].",
                    name, groups
                )
            }
        }
    }
}

impl std::error::Error for OptionError {}

/// Merges option layers into a single insertion-ordered list.
///
/// Later layers override earlier ones: defaults, then the user's global
/// preferences, then their per-game preferences, then the options given on the
/// command itself. An overriding value keeps the position of the key's first
/// appearance so validation still reports the first invalid option the user set.
pub fn merge_options(
    global: &[(String, String)],
    per_game: &[(String, String)],
    provided: &[(String, String)],
) -> Vec<(String, String)> {
    let defaults = [
        ("mode".to_owned(), "normal".to_owned()),
        ("presentation".to_owned(), DEFAULT_PRESENTATION.to_owned()),
    ];

    let mut merged: Vec<(String, String)> = Vec::new();
    for (key, value) in defaults
        .iter()
        .chain(global.iter())
        .chain(per_game.iter())
        .chain(provided.iter())
    {
        match merged.iter_mut().find(|(existing, _)| existing == key) {
            Some(entry) => entry.1 = value.clone(),
            None => merged.push((key.clone(), value.clone())),
        }
    }

    // Groups can only restrict an open table
    let has_group = merged.iter().any(|(key, _)| key == "restrictgroup");
    let has_open = merged.iter().any(|(key, _)| key == "open");
    if has_group && !has_open {
        merged.push(("open".to_owned(), "true".to_owned()));
    }

    merged
}

/// Validates one option value against its static domain.
///
/// `restrictgroup` passes here because its domain (the creator's group list)
/// is only known at table-creation time; [`build_option_requests`] checks it.
///
/// # Arguments
///
/// * `key` - The option key
/// * `value` - The value to validate
pub fn validate_option(key: &str, value: &str) -> Result<(), OptionError> {
    match key {
        "mode" => lookup(&MODE_TYPES, key, value, "Valid modes are normal and training.")
            .map(|_| ()),
        "speed" => lookup(
            &SPEED_TYPES,
            key,
            value,
            "Valid speeds are fast, normal, slow, 24/day, 12/day, 8/day, 4/day, 3/day, 2/day, 1/day, 1/2days and nolimit.",
        )
        .map(|_| ()),
        "minrep" => lookup(
            &KARMA_TYPES,
            key,
            value,
            "Valid minimum karma values are 0, 50, 65, 75 and 85.",
        )
        .map(|_| ()),
        "presentation" | "restrictgroup" => Ok(()),
        "players" => parse_players(value).map(|_| ()),
        "levels" => expand_levels(value).map(|_| ()),
        "lang" => {
            if value.len() == 2 && value.chars().all(|c| c.is_ascii_alphabetic()) {
                Ok(())
            } else {
                Err(OptionError::InvalidValue {
                    key: key.to_owned(),
                    message: "language must be a 2-letter code like `en` or `fr`.".to_owned(),
                })
            }
        }
        "open" => match value.to_lowercase().as_str() {
            "1" | "on" | "true" | "y" | "yes" | "0" | "off" | "false" | "n" | "no" => Ok(()),
            _ => Err(OptionError::InvalidValue {
                key: key.to_owned(),
                message: "`open` should have value `true` or `false`.".to_owned(),
            }),
        },
        _ if key.chars().all(|c| c.is_ascii_digit()) && !key.is_empty() => Ok(()),
        _ => Err(OptionError::UnknownOption(key.to_owned())),
    }
}

/// Expands a `lo-hi` level range into the 7 per-level booleans BGA expects.
///
/// A reversed range such as `strong-good` is rejected instead of swapped, so
/// the user notices the mistake rather than getting a silently different table.
pub fn expand_levels(value: &str) -> Result<[bool; 7], OptionError> {
    let invalid = |message: String| OptionError::InvalidValue {
        key: "levels".to_owned(),
        message,
    };

    let (min_level, max_level) = value
        .to_lowercase()
        .split_once('-')
        .map(|(lo, hi)| (lo.to_owned(), hi.to_owned()))
        .ok_or_else(|| {
            invalid("levels requires a dash between levels like `good-strong`.".to_owned())
        })?;

    let level_index = |name: &str| LEVEL_VALUES.iter().position(|level| *level == name);
    let min_index = level_index(&min_level).ok_or_else(|| {
        invalid(format!(
            "`{}` is not a valid level ({}).",
            min_level,
            LEVEL_VALUES.join(", ")
        ))
    })?;
    let max_index = level_index(&max_level).ok_or_else(|| {
        invalid(format!(
            "`{}` is not a valid level ({}).",
            max_level,
            LEVEL_VALUES.join(", ")
        ))
    })?;

    if min_index > max_index {
        return Err(invalid(format!(
            "`{}` is above `{}`; give the range as `lowest-highest`.",
            min_level, max_level
        )));
    }

    let mut levels = [false; 7];
    for (i, slot) in levels.iter_mut().enumerate() {
        *slot = min_index <= i && i <= max_index;
    }
    Ok(levels)
}

/// Turns a validated option list into requests against the table endpoints.
///
/// Options are processed in insertion order; the first invalid one aborts with
/// its error so the user is told about the option *they* got wrong first.
///
/// # Arguments
///
/// * `options` - Merged options, normally from [`merge_options`]
/// * `groups` - The creator's `(id, name)` group list, for `restrictgroup`
/// * `is_contributor` - Whether the creator may set reserved options
pub fn build_option_requests(
    options: &[(String, String)],
    groups: &[(String, String)],
    is_contributor: bool,
) -> Result<Vec<OptionRequest>, OptionError> {
    let mut requests = Vec::new();

    for (key, value) in options {
        validate_option(key, value)?;

        let request = match key.as_str() {
            "mode" => {
                let mode_id = lookup(&MODE_TYPES, key, value, "")?;
                OptionRequest {
                    path: "/table/table/changeoption.html",
                    params: vec![
                        ("id".to_owned(), "201".to_owned()),
                        ("value".to_owned(), mode_id.to_string()),
                    ],
                }
            }
            "speed" => {
                let speed_id = lookup(&SPEED_TYPES, key, value, "")?;
                OptionRequest {
                    path: "/table/table/changeoption.html",
                    params: vec![
                        ("id".to_owned(), "200".to_owned()),
                        ("value".to_owned(), speed_id.to_string()),
                    ],
                }
            }
            "minrep" => {
                let karma = lookup(&KARMA_TYPES, key, value, "")?;
                OptionRequest {
                    path: "/table/table/changeTableAccessReputation.html",
                    params: vec![("karma".to_owned(), karma.to_string())],
                }
            }
            "presentation" => {
                if !is_contributor && value != DEFAULT_PRESENTATION {
                    return Err(OptionError::ReservedOption(key.clone()));
                }
                OptionRequest {
                    path: "/table/table/setpresentation.html",
                    params: vec![("value".to_owned(), value.clone())],
                }
            }
            "levels" => {
                let levels = expand_levels(value)?;
                OptionRequest {
                    path: "/table/table/changeTableAccessLevel.html",
                    params: levels
                        .iter()
                        .enumerate()
                        .map(|(i, enabled)| (format!("level{}", i), enabled.to_string()))
                        .collect(),
                }
            }
            "players" => {
                let (min_players, max_players) = parse_players(value)?;
                OptionRequest {
                    path: "/table/table/changeWantedPlayers.html",
                    params: vec![
                        ("minp".to_owned(), min_players.to_string()),
                        ("maxp".to_owned(), max_players.to_string()),
                    ],
                }
            }
            "restrictgroup" => {
                let group_id = resolve_group(value, groups)?;
                OptionRequest {
                    path: "/table/table/restrictToGroup.html",
                    params: vec![("group".to_owned(), group_id)],
                }
            }
            "lang" => OptionRequest {
                path: "/table/table/restrictToLanguage.html",
                params: vec![("lang".to_owned(), value.clone())],
            },
            "open" => match value.to_lowercase().as_str() {
                "1" | "on" | "true" | "y" | "yes" => OptionRequest {
                    path: "/table/table/openTableNow.html",
                    params: vec![],
                },
                _ => continue,
            },
            // Raw numeric BGA option id, passed through as-is
            _ => OptionRequest {
                path: "/table/table/changeoption.html",
                params: vec![
                    ("id".to_owned(), key.clone()),
                    ("value".to_owned(), value.clone()),
                ],
            },
        };

        requests.push(request);
    }

    Ok(requests)
}

/// Looks up a named value in one of the constant tables.
fn lookup(
    table: &[(&str, u32)],
    key: &str,
    value: &str,
    message: &str,
) -> Result<u32, OptionError> {
    table
        .iter()
        .find(|(name, _)| *name == value)
        .map(|(_, id)| *id)
        .ok_or_else(|| OptionError::InvalidValue {
            key: key.to_owned(),
            message: format!("`{}` is not recognized. {}", value, message),
        })
}

/// Parses a `min-max` player count pair.
fn parse_players(value: &str) -> Result<(u32, u32), OptionError> {
    let invalid = |message: String| OptionError::InvalidValue {
        key: "players".to_owned(),
        message,
    };

    let (min_raw, max_raw) = value
        .split_once('-')
        .ok_or_else(|| invalid("players requires a range like `2-5`.".to_owned()))?;

    let min_players: u32 = min_raw
        .parse()
        .map_err(|_| invalid(format!("`{}` is not a number.", min_raw)))?;
    let max_players: u32 = max_raw
        .parse()
        .map_err(|_| invalid(format!("`{}` is not a number.", max_raw)))?;

    if min_players == 0 {
        return Err(invalid("a table needs at least one player.".to_owned()));
    }

    if min_players > max_players {
        return Err(invalid(format!(
            "minimum {} is above maximum {}.",
            min_players, max_players
        )));
    }

    Ok((min_players, max_players))
}

/// Resolves a group name against the creator's groups.
///
/// Matching goes through [`resolve_label`], so capitalization, spaces and
/// punctuation don't matter and an exact name beats a longer one it prefixes.
/// The `-` placeholder BGA puts at the top of the list is not a real group.
fn resolve_group(name: &str, groups: &[(String, String)]) -> Result<String, OptionError> {
    let names: Vec<String> = groups
        .iter()
        .map(|(_, group_name)| group_name.clone())
        .filter(|group_name| group_name != "-")
        .collect();

    let matched = resolve_label(name, &names).ok().and_then(|group_name| {
        groups
            .iter()
            .find(|(_, candidate)| candidate == group_name)
            .map(|(id, _)| id.clone())
    });

    matched.ok_or_else(|| OptionError::UnknownGroup {
        name: name.to_owned(),
        groups: names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_merge_options_applies_defaults() {
        let merged = merge_options(&[], &[], &[]);
        assert_eq!(
            merged,
            options(&[("mode", "normal"), ("presentation", DEFAULT_PRESENTATION)])
        );
    }

    #[test]
    fn test_merge_options_user_overrides_defaults() {
        let merged = merge_options(&[], &[], &options(&[("mode", "training")]));
        assert_eq!(merged[0], ("mode".to_owned(), "training".to_owned()));
    }

    #[test]
    fn test_merge_options_per_game_overrides_global() {
        let merged = merge_options(
            &options(&[("speed", "fast")]),
            &options(&[("speed", "1/day")]),
            &[],
        );
        let speed = merged.iter().find(|(k, _)| k == "speed").unwrap();
        assert_eq!(speed.1, "1/day");
    }

    #[test]
    fn test_merge_options_command_overrides_everything() {
        let merged = merge_options(
            &options(&[("speed", "fast")]),
            &options(&[("speed", "1/day")]),
            &options(&[("speed", "nolimit")]),
        );
        let speed = merged.iter().find(|(k, _)| k == "speed").unwrap();
        assert_eq!(speed.1, "nolimit");
    }

    #[test]
    fn test_merge_options_restrictgroup_implies_open() {
        let merged = merge_options(&[], &[], &options(&[("restrictgroup", "friends")]));
        assert!(merged.iter().any(|(k, v)| k == "open" && v == "true"));
    }

    #[test]
    fn test_expand_levels_range() {
        let levels = expand_levels("good-strong").unwrap();
        assert_eq!(levels, [false, false, false, true, true, false, false]);
    }

    #[test]
    fn test_expand_levels_full_range() {
        let levels = expand_levels("beginner-master").unwrap();
        assert_eq!(levels, [true; 7]);
    }

    #[test]
    fn test_expand_levels_reversed_range_rejected() {
        let result = expand_levels("strong-good");
        match result {
            Err(OptionError::InvalidValue { key, message }) => {
                assert_eq!(key, "levels");
                assert!(message.contains("lowest-highest"));
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_expand_levels_missing_dash() {
        assert!(expand_levels("good").is_err());
    }

    #[test]
    fn test_expand_levels_unknown_level() {
        let result = expand_levels("good-grandmaster");
        assert!(matches!(result, Err(OptionError::InvalidValue { .. })));
    }

    #[test]
    fn test_validate_option_invalid_speed_names_the_key() {
        let result = validate_option("speed", "warp");
        match result {
            Err(OptionError::InvalidValue { key, .. }) => assert_eq!(key, "speed"),
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_option_unknown_key() {
        assert_eq!(
            validate_option("colour", "blue"),
            Err(OptionError::UnknownOption("colour".to_owned()))
        );
    }

    #[test]
    fn test_validate_option_numeric_key_passthrough() {
        assert!(validate_option("105", "3").is_ok());
    }

    #[test]
    fn test_build_option_requests_mode_and_speed_ids() {
        let requests = build_option_requests(
            &options(&[("mode", "training"), ("speed", "1/day")]),
            &[],
            false,
        )
        .unwrap();
        assert_eq!(requests[0].path, "/table/table/changeoption.html");
        assert_eq!(
            requests[0].params,
            options(&[("id", "201"), ("value", "1")])
        );
        assert_eq!(
            requests[1].params,
            options(&[("id", "200"), ("value", "17")])
        );
    }

    #[test]
    fn test_build_option_requests_minrep_maps_to_karma_enum() {
        let requests =
            build_option_requests(&options(&[("minrep", "75")]), &[], false).unwrap();
        assert_eq!(requests[0].path, "/table/table/changeTableAccessReputation.html");
        assert_eq!(requests[0].params, options(&[("karma", "3")]));
    }

    #[test]
    fn test_build_option_requests_levels_params() {
        let requests =
            build_option_requests(&options(&[("levels", "good-strong")]), &[], false).unwrap();
        assert_eq!(requests[0].path, "/table/table/changeTableAccessLevel.html");
        assert_eq!(
            requests[0].params,
            options(&[
                ("level0", "false"),
                ("level1", "false"),
                ("level2", "false"),
                ("level3", "true"),
                ("level4", "true"),
                ("level5", "false"),
                ("level6", "false"),
            ])
        );
    }

    #[test]
    fn test_build_option_requests_first_invalid_option_reported() {
        let result = build_option_requests(
            &options(&[("speed", "warp"), ("mode", "bogus")]),
            &[],
            false,
        );
        match result {
            Err(OptionError::InvalidValue { key, .. }) => assert_eq!(key, "speed"),
            other => panic!("expected InvalidValue for speed, got {:?}", other),
        }
    }

    #[test]
    fn test_build_option_requests_presentation_gated() {
        let result = build_option_requests(
            &options(&[("presentation", "my fancy table")]),
            &[],
            false,
        );
        assert_eq!(
            result,
            Err(OptionError::ReservedOption("presentation".to_owned()))
        );

        let requests = build_option_requests(
            &options(&[("presentation", "my fancy table")]),
            &[],
            true,
        )
        .unwrap();
        assert_eq!(requests[0].path, "/table/table/setpresentation.html");
    }

    #[test]
    fn test_build_option_requests_default_presentation_not_gated() {
        let merged = merge_options(&[], &[], &[]);
        assert!(build_option_requests(&merged, &[], false).is_ok());
    }

    #[test]
    fn test_build_option_requests_group_prefix_match() {
        let groups = vec![
            ("123".to_owned(), "My Gaming Group".to_owned()),
            ("456".to_owned(), "Work Friends".to_owned()),
        ];
        let requests = build_option_requests(
            &options(&[("restrictgroup", "work")]),
            &groups,
            false,
        )
        .unwrap();
        assert_eq!(requests[0].path, "/table/table/restrictToGroup.html");
        assert_eq!(requests[0].params, options(&[("group", "456")]));
    }

    #[test]
    fn test_build_option_requests_unknown_group_lists_memberships() {
        let groups = vec![
            ("123".to_owned(), "My Gaming Group".to_owned()),
            ("0".to_owned(), "-".to_owned()),
        ];
        let result = build_option_requests(
            &options(&[("restrictgroup", "chess club")]),
            &groups,
            false,
        );
        match result {
            Err(OptionError::UnknownGroup { name, groups }) => {
                assert_eq!(name, "chess club");
                assert_eq!(groups, vec!["My Gaming Group"]);
            }
            other => panic!("expected UnknownGroup, got {:?}", other),
        }
    }

    #[test]
    fn test_build_option_requests_open_false_is_skipped() {
        let requests =
            build_option_requests(&options(&[("open", "false")]), &[], false).unwrap();
        assert!(requests.is_empty());
    }

    #[test]
    fn test_build_option_requests_players_pair() {
        let requests =
            build_option_requests(&options(&[("players", "2-5")]), &[], false).unwrap();
        assert_eq!(requests[0].path, "/table/table/changeWantedPlayers.html");
        assert_eq!(requests[0].params, options(&[("minp", "2"), ("maxp", "5")]));
    }

    #[test]
    fn test_build_option_requests_players_reversed_rejected() {
        let result = build_option_requests(&options(&[("players", "5-2")]), &[], false);
        assert!(matches!(result, Err(OptionError::InvalidValue { .. })));
    }

    #[test]
    fn test_build_option_requests_players_zero_minimum_rejected() {
        let result = build_option_requests(&options(&[("players", "0-0")]), &[], false);
        match result {
            Err(OptionError::InvalidValue { key, message }) => {
                assert_eq!(key, "players");
                assert!(message.contains("at least one player"));
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_build_option_requests_group_match_ignores_case_and_punctuation() {
        let groups = vec![("789".to_owned(), "Rob's Crew".to_owned())];
        let requests =
            build_option_requests(&options(&[("restrictgroup", "ROBS crew")]), &groups, false)
                .unwrap();
        assert_eq!(requests[0].params, options(&[("group", "789")]));
    }

    #[test]
    fn test_build_option_requests_ambiguous_group_prefix_rejected() {
        let groups = vec![
            ("1".to_owned(), "Boardgame Buddies".to_owned()),
            ("2".to_owned(), "Boardgame Bunch".to_owned()),
        ];
        let result =
            build_option_requests(&options(&[("restrictgroup", "boardgame")]), &groups, false);
        assert!(matches!(result, Err(OptionError::UnknownGroup { .. })));
    }
}
