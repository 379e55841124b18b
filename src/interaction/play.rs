//! Menu flow for building a table interactively.

use crate::bga::resolver::resolve_game;
use crate::interaction::engine::{
    menu_choice, option_menu_key, option_menu_prompt, option_value_prompt, resolution_message,
};
use crate::interaction::{
    CompletedAction, Draft, MenuContext, SessionSeed, Step, StepInput, UserSession,
};

/// Opens a play session, resolving whatever the command already carried.
pub(crate) fn begin(
    user_id: &str,
    channel: &str,
    seed: &SessionSeed,
    input: &StepInput,
) -> (Draft, MenuContext, Vec<String>) {
    let mut players = vec![user_id.to_owned()];
    players.extend(seed.players.iter().cloned());

    let mut draft = Draft {
        players,
        options: seed.options.clone(),
        channel: Some(channel.to_owned()),
        ..Default::default()
    };

    match &seed.game_name {
        None => (
            draft,
            MenuContext::ChooseGame,
            vec!["Which game do you want to play? Type its name, or `cancel`.".to_owned()],
        ),
        Some(name) => match resolve_game(name, input.catalog) {
            Ok(entry) => {
                draft.game = Some(entry.clone());
                let prompt = main_menu_prompt(&draft);
                (draft, MenuContext::GameOptionMenu, vec![prompt])
            }
            Err(error) => (
                draft,
                MenuContext::ChooseGame,
                vec![format!(
                    "{} Which game do you want to play?",
                    resolution_message(&error)
                )],
            ),
        },
    }
}

/// Advances a play session by one message.
pub(crate) fn step(session: &mut UserSession, input: &StepInput) -> Step {
    match session.context.clone() {
        MenuContext::ChooseGame => match resolve_game(input.body, input.catalog) {
            Ok(entry) => {
                session.draft.game = Some(entry.clone());
                session.context = MenuContext::GameOptionMenu;
                Step::reply(main_menu_prompt(&session.draft))
            }
            Err(error) => Step::reply(format!(
                "{} Which game do you want to play?",
                resolution_message(&error)
            )),
        },

        MenuContext::GameOptionMenu => match menu_choice(input.body) {
            Some(1) => match session.draft.game.clone() {
                Some(game) => Step::finish(
                    vec![format!("Setting up your {} table...", game.display_name)],
                    Some(CompletedAction::CreateGame {
                        game,
                        players: session.draft.players.clone(),
                        options: session.draft.options.clone(),
                        channel: session.draft.channel.clone().unwrap_or_default(),
                    }),
                ),
                None => {
                    session.context = MenuContext::ChooseGame;
                    Step::reply(
                        "No game chosen yet. Which game do you want to play?".to_owned(),
                    )
                }
            },
            Some(2) => {
                session.context = MenuContext::AddPlayer;
                Step::reply(
                    "Who should I invite? Type a BGA player name or a chat mention.".to_owned(),
                )
            }
            Some(3) => {
                session.context = MenuContext::OptionMenu;
                Step::reply(option_menu_prompt())
            }
            Some(4) => {
                session.context = MenuContext::ChangeChannel;
                Step::reply(
                    "Which room should I announce the table in? Type its id or alias.".to_owned(),
                )
            }
            _ => Step::reply(format!(
                "Please answer with a number between 1 and 4, or `cancel`.\n{}",
                main_menu_prompt(&session.draft)
            )),
        },

        MenuContext::AddPlayer => {
            session.draft.players.push(input.body.to_owned());
            session.context = MenuContext::GameOptionMenu;
            Step::reply(format!(
                "Added {}.\n{}",
                input.body,
                main_menu_prompt(&session.draft)
            ))
        }

        MenuContext::OptionMenu => match menu_choice(input.body) {
            Some(0) => {
                session.context = MenuContext::GameOptionMenu;
                Step::reply(main_menu_prompt(&session.draft))
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
                    set_draft_option(&mut session.draft, &key, input.body);
                    session.context = MenuContext::GameOptionMenu;
                    Step::reply(format!(
                        "Set {} to {}.\n{}",
                        key,
                        input.body,
                        main_menu_prompt(&session.draft)
                    ))
                }
                Err(error) => Step::reply(format!("{} {}", error, option_value_prompt(&key))),
            }
        }

        MenuContext::ChangeChannel => {
            session.draft.channel = Some(input.body.to_owned());
            session.context = MenuContext::GameOptionMenu;
            Step::reply(format!(
                "The table will be announced in {}.\n{}",
                input.body,
                main_menu_prompt(&session.draft)
            ))
        }

        // A play session never enters the other states
        _ => Step::reply(main_menu_prompt(&session.draft)),
    }
}

/// Overrides an option already in the draft, or appends it.
fn set_draft_option(draft: &mut Draft, key: &str, value: &str) {
    match draft.options.iter_mut().find(|(existing, _)| existing == key) {
        Some(entry) => entry.1 = value.to_owned(),
        None => draft.options.push((key.to_owned(), value.to_owned())),
    }
}

/// The main play menu, prefixed with what the draft already holds.
fn main_menu_prompt(draft: &Draft) -> String {
    let mut prompt = String::new();
    if let Some(game) = &draft.game {
        prompt.push_str(&format!("Game: {}\n", game.display_name));
    }
    prompt.push_str(&format!("Players: {}\n", draft.players.join(", ")));
    if !draft.options.is_empty() {
        let options = draft
            .options
            .iter()
            .map(|(key, value)| format!("{}:{}", key, value))
            .collect::<Vec<String>>()
            .join(" ");
        prompt.push_str(&format!("Options: {}\n", options));
    }
    prompt.push_str(
        "1. Create the table\n2. Add a player\n3. Set a table option\n4. Announce in another room\nReply with a number, or `cancel`.",
    );
    prompt
}
