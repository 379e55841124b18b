//! Menu flow for linking an account and saving preferences.

use crate::bga::resolver::resolve_game;
use crate::interaction::engine::{
    menu_choice, option_menu_key, option_menu_prompt, option_value_prompt, resolution_message,
};
use crate::interaction::{
    CompletedAction, Draft, MenuContext, SessionSeed, Step, StepInput, UserSession,
};

/// Opens a setup session. A username given on the command line seeds the draft.
pub(crate) fn begin(seed: &SessionSeed, input: &StepInput) -> (Draft, MenuContext, Vec<String>) {
    let draft = Draft {
        username: seed.players.first().cloned(),
        ..Default::default()
    };
    let prompt = main_menu_prompt(&draft, input);
    (draft, MenuContext::SetupMenu, vec![prompt])
}

/// Advances a setup session by one message.
pub(crate) fn step(session: &mut UserSession, input: &StepInput) -> Step {
    match session.context.clone() {
        MenuContext::SetupMenu => match menu_choice(input.body) {
            Some(0) => Step::finish(vec!["Setup finished.".to_owned()], None),
            Some(1) => {
                session.context = MenuContext::Username;
                Step::reply("What is your Board Game Arena username?".to_owned())
            }
            Some(2) => match known_username(session, input) {
                Some(_) => {
                    session.context = MenuContext::Password;
                    Step::reply(
                        "What is your Board Game Arena password? I will remove your message from the room right after reading it.".to_owned(),
                    )
                }
                None => Step::reply(format!(
                    "Set your username first (option 1).\n{}",
                    main_menu_prompt(&session.draft, input)
                )),
            },
            Some(3) => {
                session.draft.pinned_game = None;
                session.context = MenuContext::OptionMenu;
                Step::reply(option_menu_prompt())
            }
            Some(4) => {
                session.context = MenuContext::ChooseGamePrefs;
                Step::reply("For which game? Type its name.".to_owned())
            }
            _ => Step::reply(format!(
                "Please answer with a number between 0 and 4, or `cancel`.\n{}",
                main_menu_prompt(&session.draft, input)
            )),
        },

        MenuContext::Username => {
            session.draft.username = Some(input.body.to_owned());
            session.context = MenuContext::SetupMenu;
            Step::reply_with_action(
                format!(
                    "Your username is now {}.\n{}",
                    input.body,
                    main_menu_prompt(&session.draft, input)
                ),
                CompletedAction::SaveUsername {
                    username: input.body.to_owned(),
                },
            )
        }

        MenuContext::Password => {
            // known_username was checked before entering this state
            let username = known_username(session, input).unwrap_or_default();
            Step::finish(
                vec!["Checking your credentials with Board Game Arena...".to_owned()],
                Some(CompletedAction::VerifyAndSavePassword {
                    username,
                    password: input.body.to_owned(),
                }),
            )
        }

        MenuContext::ChooseGamePrefs => match resolve_game(input.body, input.catalog) {
            Ok(entry) => {
                session.draft.pinned_game = Some(entry.display_name.clone());
                session.context = MenuContext::OptionMenu;
                Step::reply(format!(
                    "Editing your {} options.\n{}",
                    entry.display_name,
                    option_menu_prompt()
                ))
            }
            Err(error) => Step::reply(format!(
                "{} For which game?",
                resolution_message(&error)
            )),
        },

        MenuContext::OptionMenu => match menu_choice(input.body) {
            Some(0) => {
                session.draft.pinned_game = None;
                session.context = MenuContext::SetupMenu;
                Step::reply(main_menu_prompt(&session.draft, input))
            }
            Some(choice) => match option_menu_key(choice) {
                Some(key) => {
                    session.context = MenuContext::OptionValue(key.to_owned());
                    Step::reply(option_value_prompt(key))
                }
                None => Step::reply(
                    "Please answer with a number between 0 and 9, or `cancel`.".to_owned(),
                ),
            },
            None => Step::reply(
                "Please answer with a number between 0 and 9, or `cancel`.".to_owned(),
            ),
        },

        MenuContext::OptionValue(key) => {
            match crate::bga::options::validate_option(&key, input.body) {
                Ok(()) => {
                    let game = session.draft.pinned_game.clone();
                    session.context = MenuContext::OptionMenu;
                    let scope = match &game {
                        Some(game) => format!("for {}", game),
                        None => "for every game".to_owned(),
                    };
                    Step::reply_with_action(
                        format!(
                            "Saved {}:{} {}.\n{}",
                            key,
                            input.body,
                            scope,
                            option_menu_prompt()
                        ),
                        CompletedAction::SavePreference {
                            game,
                            key,
                            value: input.body.to_owned(),
                        },
                    )
                }
                Err(error) => Step::reply(format!("{} {}", error, option_value_prompt(&key))),
            }
        }

        // A setup session never enters the other states
        _ => Step::reply(main_menu_prompt(&session.draft, input)),
    }
}

/// The username to pair a password with: typed this session, or already stored.
fn known_username(session: &UserSession, input: &StepInput) -> Option<String> {
    session
        .draft
        .username
        .clone()
        .or_else(|| {
            input
                .record
                .map(|record| record.username.clone())
                .filter(|username| !username.is_empty())
        })
}

/// The main setup menu, noting the account currently linked.
fn main_menu_prompt(draft: &Draft, input: &StepInput) -> String {
    let linked = draft
        .username
        .clone()
        .or_else(|| {
            input
                .record
                .map(|record| record.username.clone())
                .filter(|username| !username.is_empty())
        });

    let mut prompt = match linked {
        Some(username) => format!("Linked Board Game Arena account: {}\n", username),
        None => "No Board Game Arena account linked yet.\n".to_owned(),
    };
    prompt.push_str(
        "1. Set your BGA username\n2. Set your BGA password\n3. Default table options\n4. Table options for one game\n0. Done\nReply with a number, or `cancel`.",
    );
    prompt
}
