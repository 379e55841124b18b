//! The state machine advancing interactive sessions.
//!
//! [`InteractionEngine::advance`] handles one message from a user who has a
//! session open: expiry and the `cancel` keyword are checked first, then the
//! message is routed to the state machine of the session's subcommand. The
//! engine is synchronous; anything that needs the network comes in as a
//! snapshot ([`EngineInput`]) or goes out as a [`CompletedAction`].

use log::{debug, info};

use crate::bga::GameCatalogEntry;
use crate::bga::options::{
    KARMA_TYPES, LEVEL_VALUES, MODE_TYPES, OPTION_KEYS, SPEED_TYPES,
};
use crate::bga::resolver::ResolutionError;
use crate::creds::CredentialRecord;
use crate::interaction::store::{Clock, SessionLookup, SessionStore, SystemClock};
use crate::interaction::{
    CompletedAction, SessionSeed, StepInput, Subcommand, UserSession, friend,
    play, setup, status,
};

/// Everything the engine needs to handle one message.
pub struct EngineInput<'a> {
    /// Chat user the message came from
    pub user_id: &'a str,
    /// Raw message body
    pub body: &'a str,
    /// Room the message arrived in
    pub channel: &'a str,
    /// Catalog snapshot for game name resolution
    pub catalog: &'a [GameCatalogEntry],
    /// The user's stored credentials, if any
    pub record: Option<&'a CredentialRecord>,
}

/// What the engine wants done after handling a message.
pub struct EngineReply {
    /// Replies to send, in order
    pub messages: Vec<String>,
    /// Operation to execute with the command handlers, if one completed
    pub action: Option<CompletedAction>,
}

impl EngineReply {
    fn empty() -> Self {
        EngineReply {
            messages: Vec::new(),
            action: None,
        }
    }
}

/// Per-user interactive session engine.
pub struct InteractionEngine {
    store: SessionStore,
}

impl Default for InteractionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionEngine {
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        InteractionEngine {
            store: SessionStore::new(clock),
        }
    }

    /// Whether this user's messages belong to the engine.
    ///
    /// True for expired sessions too: their next message is answered with the
    /// timeout notice instead of being parsed as a command.
    pub fn has_session(&self, user_id: &str) -> bool {
        self.store.contains(user_id)
    }

    /// Opens a session for a command that was given too few arguments.
    ///
    /// Whatever was parsed from the command seeds the session's draft, so the
    /// user is never asked for something they already typed.
    pub fn begin(
        &mut self,
        input: &EngineInput,
        subcommand: Subcommand,
        seed: SessionSeed,
    ) -> EngineReply {
        let step_input = StepInput {
            body: input.body.trim(),
            catalog: input.catalog,
            record: input.record,
        };

        let (draft, context, messages) = match subcommand {
            Subcommand::Play => play::begin(input.user_id, input.channel, &seed, &step_input),
            Subcommand::Setup => setup::begin(&seed, &step_input),
            Subcommand::Status => status::begin(&seed),
            Subcommand::Friend => friend::begin(&seed),
        };

        info!(
            "opening {:?} session for {} in {:?}",
            subcommand, input.user_id, context
        );
        self.store.put(UserSession {
            user_id: input.user_id.to_owned(),
            subcommand,
            context,
            draft,
            last_activity: std::time::Instant::now(),
        });

        EngineReply {
            messages,
            action: None,
        }
    }

    /// Advances the user's session with one message.
    ///
    /// `cancel` always wins, whatever state the session is in. An expired
    /// session answers with the timeout notice and the message itself is not
    /// interpreted. The session is dropped on any terminal step, so a failed
    /// final operation never leaves a stuck menu behind.
    pub fn advance(&mut self, input: &EngineInput) -> EngineReply {
        let mut session = match self.store.lookup(input.user_id) {
            SessionLookup::Absent => return EngineReply::empty(),
            SessionLookup::Expired => {
                info!("session for {} expired", input.user_id);
                self.store.remove(input.user_id);
                return EngineReply {
                    messages: vec![
                        "Your session timed out after 5 minutes of inactivity. Start over with the command you were running.".to_owned(),
                    ],
                    action: None,
                };
            }
            SessionLookup::Active(session) => session,
        };

        let body = input.body.trim();
        if body.eq_ignore_ascii_case("cancel") {
            self.store.remove(input.user_id);
            return EngineReply {
                messages: vec!["Canceled, nothing was done.".to_owned()],
                action: None,
            };
        }

        let step_input = StepInput {
            body,
            catalog: input.catalog,
            record: input.record,
        };
        debug!(
            "advancing {:?} session for {} from {:?}",
            session.subcommand, input.user_id, session.context
        );

        let step = match session.subcommand {
            Subcommand::Play => play::step(&mut session, &step_input),
            Subcommand::Setup => setup::step(&mut session, &step_input),
            Subcommand::Status => status::step(&mut session, &step_input),
            Subcommand::Friend => friend::step(&mut session, &step_input),
        };

        if step.done {
            self.store.remove(input.user_id);
        } else {
            self.store.put(session);
        }

        EngineReply {
            messages: step.messages,
            action: step.action,
        }
    }
}

/// Parses a numbered-menu answer.
pub(crate) fn menu_choice(body: &str) -> Option<u32> {
    body.trim().parse().ok()
}

/// User-facing message for a failed game name resolution.
pub(crate) fn resolution_message(error: &ResolutionError) -> String {
    match error {
        ResolutionError::NotFound(input) => format!(
            "I could not find a game matching `{}`. Capitalization, spaces and punctuation don't matter, but the name must start the same way.",
            input
        ),
        ResolutionError::Ambiguous(input, candidates) => {
            let candidates = candidates
                .iter()
                .map(|name| format!("`{}`", name))
                .collect::<Vec<String>>()
                .join(", ");
            format!("`{}` matches several games: {}.", input, candidates)
        }
    }
}

/// The numbered list of option keys, shared by the play and setup menus.
pub(crate) fn option_menu_prompt() -> String {
    let mut prompt = String::from("Which option do you want to set?");
    for (i, key) in OPTION_KEYS.iter().enumerate() {
        prompt.push_str(&format!("\n{}. {}", i + 1, key));
    }
    prompt.push_str("\n0. Back\nReply with a number, or `cancel`.");
    prompt
}

/// Maps an option-menu answer to its option key.
pub(crate) fn option_menu_key(choice: u32) -> Option<&'static str> {
    (choice >= 1)
        .then(|| OPTION_KEYS.get(choice as usize - 1).copied())
        .flatten()
}

/// Prompt for an option's value, with the valid domain spelled out.
pub(crate) fn option_value_prompt(key: &str) -> String {
    let named = |table: &[(&str, u32)]| {
        table
            .iter()
            .map(|(name, _)| format!("`{}`", name))
            .collect::<Vec<String>>()
            .join(", ")
    };

    let hint = match key {
        "mode" => format!("One of {}.", named(&MODE_TYPES)),
        "speed" => format!("One of {}.", named(&SPEED_TYPES)),
        "minrep" => format!("One of {}.", named(&KARMA_TYPES)),
        "presentation" => "Free text shown on the table page.".to_owned(),
        "players" => "A range like `2-5`.".to_owned(),
        "levels" => format!("A range like `good-strong` over {}.", LEVEL_VALUES.join(", ")),
        "restrictgroup" => "The name of one of your BGA groups.".to_owned(),
        "lang" => "A 2-letter language code like `en`.".to_owned(),
        "open" => "`true` or `false`.".to_owned(),
        _ => "A raw value for this option id.".to_owned(),
    };

    format!("What value for `{}`? {}", key, hint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::store::{MockClock, SESSION_TIMEOUT_SECS};
    use std::time::{Duration, Instant};

    fn catalog() -> Vec<GameCatalogEntry> {
        [
            ("Race for the Galaxy", 1),
            ("Ra", 2),
            ("Carcassonne", 4),
        ]
        .iter()
        .map(|(name, id)| GameCatalogEntry {
            display_name: (*name).to_owned(),
            bga_id: *id,
        })
        .collect()
    }

    fn input<'a>(body: &'a str, catalog: &'a [GameCatalogEntry]) -> EngineInput<'a> {
        EngineInput {
            user_id: "@alice:example.com",
            body,
            channel: "!room:example.com",
            catalog,
            record: None,
        }
    }

    #[test]
    fn test_play_seeded_game_completes_with_create_action() {
        let catalog = catalog();
        let mut engine = InteractionEngine::new();

        // `!play raceforthegalaxy` had too few arguments: the session opens
        // with the game resolved and the invoker as the only player
        let reply = engine.begin(
            &input("", &catalog),
            Subcommand::Play,
            SessionSeed {
                game_name: Some("raceforthegalaxy".to_owned()),
                ..Default::default()
            },
        );
        assert!(reply.messages[0].contains("Race for the Galaxy"));
        assert!(engine.has_session("@alice:example.com"));

        let reply = engine.advance(&input("1", &catalog));
        match reply.action {
            Some(CompletedAction::CreateGame {
                game,
                players,
                channel,
                ..
            }) => {
                assert_eq!(game.display_name, "Race for the Galaxy");
                assert_eq!(players, vec!["@alice:example.com"]);
                assert_eq!(channel, "!room:example.com");
            }
            other => panic!("expected CreateGame, got {:?}", other),
        }
        assert!(!engine.has_session("@alice:example.com"));
    }

    #[test]
    fn test_cancel_closes_any_session() {
        let catalog = catalog();
        let mut engine = InteractionEngine::new();
        engine.begin(
            &input("", &catalog),
            Subcommand::Play,
            SessionSeed::default(),
        );

        let reply = engine.advance(&input("  CANCEL  ", &catalog));
        assert!(reply.messages[0].contains("Canceled"));
        assert!(reply.action.is_none());
        assert!(!engine.has_session("@alice:example.com"));
    }

    #[test]
    fn test_expired_session_notice_and_reset() {
        let base = Instant::now();
        let mut clock = MockClock::new();
        let mut calls = 0;
        clock.expect_now().returning(move || {
            calls += 1;
            if calls == 1 {
                base
            } else {
                base + Duration::from_secs(SESSION_TIMEOUT_SECS)
            }
        });

        let catalog = catalog();
        let mut engine = InteractionEngine::with_clock(Box::new(clock));
        engine.begin(
            &input("", &catalog),
            Subcommand::Play,
            SessionSeed::default(),
        );

        let reply = engine.advance(&input("1", &catalog));
        assert!(reply.messages[0].contains("timed out"));
        assert!(reply.action.is_none());
        assert!(!engine.has_session("@alice:example.com"));
    }

    #[test]
    fn test_junk_menu_answer_reprompts() {
        let catalog = catalog();
        let mut engine = InteractionEngine::new();
        engine.begin(
            &input("", &catalog),
            Subcommand::Play,
            SessionSeed {
                game_name: Some("carcassonne".to_owned()),
                ..Default::default()
            },
        );

        let reply = engine.advance(&input("banana", &catalog));
        assert!(reply.messages[0].contains("number between 1 and 4"));
        assert!(engine.has_session("@alice:example.com"));
    }

    #[test]
    fn test_play_add_player_and_option_flow() {
        let catalog = catalog();
        let mut engine = InteractionEngine::new();
        engine.begin(
            &input("", &catalog),
            Subcommand::Play,
            SessionSeed {
                game_name: Some("ra".to_owned()),
                ..Default::default()
            },
        );

        engine.advance(&input("2", &catalog));
        engine.advance(&input("bob_bga", &catalog));
        engine.advance(&input("3", &catalog));
        // speed is the second option key
        engine.advance(&input("2", &catalog));
        let reply = engine.advance(&input("1/day", &catalog));
        assert!(reply.messages[0].contains("speed"));

        let reply = engine.advance(&input("1", &catalog));
        match reply.action {
            Some(CompletedAction::CreateGame {
                players, options, ..
            }) => {
                assert_eq!(players, vec!["@alice:example.com", "bob_bga"]);
                assert_eq!(options, vec![("speed".to_owned(), "1/day".to_owned())]);
            }
            other => panic!("expected CreateGame, got {:?}", other),
        }
    }

    #[test]
    fn test_play_invalid_option_value_reprompts() {
        let catalog = catalog();
        let mut engine = InteractionEngine::new();
        engine.begin(
            &input("", &catalog),
            Subcommand::Play,
            SessionSeed {
                game_name: Some("ra".to_owned()),
                ..Default::default()
            },
        );

        engine.advance(&input("3", &catalog));
        engine.advance(&input("2", &catalog));
        let reply = engine.advance(&input("warp", &catalog));
        assert!(reply.messages[0].contains("speed"));
        assert!(engine.has_session("@alice:example.com"));
    }

    #[test]
    fn test_setup_password_requires_username() {
        let catalog = catalog();
        let mut engine = InteractionEngine::new();
        engine.begin(
            &input("", &catalog),
            Subcommand::Setup,
            SessionSeed::default(),
        );

        let reply = engine.advance(&input("2", &catalog));
        assert!(reply.messages[0].contains("username first"));
        assert!(engine.has_session("@alice:example.com"));
    }

    #[test]
    fn test_setup_username_then_password() {
        let catalog = catalog();
        let mut engine = InteractionEngine::new();
        engine.begin(
            &input("", &catalog),
            Subcommand::Setup,
            SessionSeed::default(),
        );

        engine.advance(&input("1", &catalog));
        let reply = engine.advance(&input("alice_bga", &catalog));
        assert_eq!(
            reply.action,
            Some(CompletedAction::SaveUsername {
                username: "alice_bga".to_owned()
            })
        );
        assert!(engine.has_session("@alice:example.com"));

        engine.advance(&input("2", &catalog));
        let reply = engine.advance(&input("s3cret", &catalog));
        assert_eq!(
            reply.action,
            Some(CompletedAction::VerifyAndSavePassword {
                username: "alice_bga".to_owned(),
                password: "s3cret".to_owned()
            })
        );
        assert!(!engine.has_session("@alice:example.com"));
    }

    #[test]
    fn test_setup_per_game_preference() {
        let catalog = catalog();
        let mut engine = InteractionEngine::new();
        engine.begin(
            &input("", &catalog),
            Subcommand::Setup,
            SessionSeed::default(),
        );

        engine.advance(&input("4", &catalog));
        engine.advance(&input("carcassonne", &catalog));
        // mode is the first option key
        engine.advance(&input("1", &catalog));
        let reply = engine.advance(&input("training", &catalog));
        assert_eq!(
            reply.action,
            Some(CompletedAction::SavePreference {
                game: Some("Carcassonne".to_owned()),
                key: "mode".to_owned(),
                value: "training".to_owned()
            })
        );
        assert!(engine.has_session("@alice:example.com"));
    }

    #[test]
    fn test_status_collects_players_and_game() {
        let catalog = catalog();
        let mut engine = InteractionEngine::new();
        engine.begin(
            &input("", &catalog),
            Subcommand::Status,
            SessionSeed::default(),
        );

        engine.advance(&input("2", &catalog));
        engine.advance(&input("bob_bga", &catalog));
        engine.advance(&input("1", &catalog));
        engine.advance(&input("ra", &catalog));
        let reply = engine.advance(&input("0", &catalog));
        assert_eq!(
            reply.action,
            Some(CompletedAction::ShowTables {
                game: Some("Ra".to_owned()),
                players: vec!["bob_bga".to_owned()]
            })
        );
        assert!(!engine.has_session("@alice:example.com"));
    }

    #[test]
    fn test_status_defaults_to_invoker() {
        let catalog = catalog();
        let mut engine = InteractionEngine::new();
        engine.begin(
            &input("", &catalog),
            Subcommand::Status,
            SessionSeed::default(),
        );

        let reply = engine.advance(&input("0", &catalog));
        assert_eq!(
            reply.action,
            Some(CompletedAction::ShowTables {
                game: None,
                players: vec!["@alice:example.com".to_owned()]
            })
        );
    }

    #[test]
    fn test_friend_loop_until_done() {
        let catalog = catalog();
        let mut engine = InteractionEngine::new();
        engine.begin(
            &input("", &catalog),
            Subcommand::Friend,
            SessionSeed::default(),
        );

        engine.advance(&input("bob_bga", &catalog));
        engine.advance(&input("carol_bga", &catalog));
        let reply = engine.advance(&input("0", &catalog));
        assert_eq!(
            reply.action,
            Some(CompletedAction::AddFriends {
                names: vec!["bob_bga".to_owned(), "carol_bga".to_owned()]
            })
        );
        assert!(!engine.has_session("@alice:example.com"));
    }

    #[test]
    fn test_friend_done_without_names() {
        let catalog = catalog();
        let mut engine = InteractionEngine::new();
        engine.begin(
            &input("", &catalog),
            Subcommand::Friend,
            SessionSeed::default(),
        );

        let reply = engine.advance(&input("0", &catalog));
        assert!(reply.action.is_none());
        assert!(!engine.has_session("@alice:example.com"));
    }
}
