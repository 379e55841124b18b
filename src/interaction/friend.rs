//! Menu flow for adding BGA friends.

use crate::interaction::{
    CompletedAction, Draft, MenuContext, SessionSeed, Step, StepInput, UserSession,
};

pub(crate) fn begin(seed: &SessionSeed) -> (Draft, MenuContext, Vec<String>) {
    let draft = Draft {
        players: seed.players.clone(),
        ..Default::default()
    };
    (
        draft,
        MenuContext::AddFriendName,
        vec![
            "Who should I add as a Board Game Arena friend? Type one name per message; reply `0` when you are done, or `cancel`.".to_owned(),
        ],
    )
}

pub(crate) fn step(session: &mut UserSession, input: &StepInput) -> Step {
    if input.body.trim() == "0" {
        if session.draft.players.is_empty() {
            return Step::finish(vec!["Nobody to add, then.".to_owned()], None);
        }
        return Step::finish(
            vec!["Adding the friends...".to_owned()],
            Some(CompletedAction::AddFriends {
                names: session.draft.players.clone(),
            }),
        );
    }

    session.draft.players.push(input.body.to_owned());
    Step::reply(format!(
        "Noted {}. Anyone else? Reply `0` when you are done.",
        input.body
    ))
}
