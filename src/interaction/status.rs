//! Menu flow for looking up running tables.

use crate::interaction::engine::{menu_choice, resolution_message};
use crate::bga::resolver::resolve_game;
use crate::interaction::{
    CompletedAction, Draft, MenuContext, SessionSeed, Step, StepInput, UserSession,
};

pub(crate) fn begin(seed: &SessionSeed) -> (Draft, MenuContext, Vec<String>) {
    let draft = Draft {
        players: seed.players.clone(),
        ..Default::default()
    };
    let prompt = menu_prompt(&draft);
    (draft, MenuContext::StatusMenu, vec![prompt])
}

pub(crate) fn step(session: &mut UserSession, input: &StepInput) -> Step {
    match session.context.clone() {
        MenuContext::StatusMenu => match menu_choice(input.body) {
            Some(0) => {
                // Nobody named means the user wants their own tables
                let players = if session.draft.players.is_empty() {
                    vec![session.user_id.clone()]
                } else {
                    session.draft.players.clone()
                };
                Step::finish(
                    vec!["Looking up the tables...".to_owned()],
                    Some(CompletedAction::ShowTables {
                        game: session.draft.pinned_game.clone(),
                        players,
                    }),
                )
            }
            Some(1) => {
                session.context = MenuContext::ChooseStatusGame;
                Step::reply("Which game should the listing be limited to?".to_owned())
            }
            Some(2) => {
                session.context = MenuContext::AddStatusPlayer;
                Step::reply("Whose tables? Type a BGA player name or a chat mention.".to_owned())
            }
            _ => Step::reply(format!(
                "Please answer with a number between 0 and 2, or `cancel`.\n{}",
                menu_prompt(&session.draft)
            )),
        },

        MenuContext::ChooseStatusGame => match resolve_game(input.body, input.catalog) {
            Ok(entry) => {
                session.draft.pinned_game = Some(entry.display_name.clone());
                session.context = MenuContext::StatusMenu;
                Step::reply(format!(
                    "Limiting the listing to {}.\n{}",
                    entry.display_name,
                    menu_prompt(&session.draft)
                ))
            }
            Err(error) => Step::reply(format!(
                "{} Which game should the listing be limited to?",
                resolution_message(&error)
            )),
        },

        MenuContext::AddStatusPlayer => {
            session.draft.players.push(input.body.to_owned());
            session.context = MenuContext::StatusMenu;
            Step::reply(format!(
                "Added {}.\n{}",
                input.body,
                menu_prompt(&session.draft)
            ))
        }

        // A status session never enters the other states
        _ => Step::reply(menu_prompt(&session.draft)),
    }
}

fn menu_prompt(draft: &Draft) -> String {
    let mut prompt = String::new();
    if !draft.players.is_empty() {
        prompt.push_str(&format!("Players: {}\n", draft.players.join(", ")));
    }
    if let Some(game) = &draft.pinned_game {
        prompt.push_str(&format!("Game: {}\n", game));
    }
    prompt.push_str(
        "1. Limit the listing to one game\n2. Add a player\n0. Show the tables\nReply with a number, or `cancel`.",
    );
    prompt
}
