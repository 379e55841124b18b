//! Main bot wiring between Matrix and Board Game Arena.
//!
//! The [`Bot`] owns every long-lived service: the Matrix client, the command
//! parser, the interactive session engine, the game catalog and the credential
//! store. Each incoming Matrix message is handled in its own task:
//!
//! ```text
//! Matrix message
//!   ├─ user has an open session → engine.advance() → execute CompletedAction
//!   └─ otherwise → Commander::parse()
//!         ├─ Dispatch::OneShot     → execute the command now
//!         └─ Dispatch::StartSession → engine.begin()
//! ```
//!
//! The engine never awaits: catalog and credential snapshots are fetched
//! before taking its lock, and whatever it completes is executed afterwards by
//! the same handlers the one-shot path uses.

use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, error, warn};
use tokio::sync::Mutex;

use crate::{
    Args,
    bga::GameCatalog,
    bga::requester::BgaRequester,
    commands::{
        Command, CommandParseError, Commander, Dispatch, execute_add_friends, execute_create_game,
        execute_link, execute_list, execute_save_preference, execute_save_username,
        execute_show_tables, execute_verify_and_save,
        markdown_response::{format_help, format_internal_error, format_options_help},
    },
    config::Config,
    creds::CredStore,
    interaction::{CompletedAction, EngineInput, InteractionEngine},
    matrix::{MatrixClient, UserCredentials},
    utils::{get_path, loggable_body},
};

/// Context for processing one Matrix message.
struct MessageContext {
    /// The message body text
    body: String,
    /// The Matrix room the message arrived in
    room_id: String,
    /// The Matrix user who sent the message
    sender_id: String,
    /// The Matrix event id of the message
    event_id: String,
    /// Shared reference to the Matrix client
    matrix_client: Arc<MatrixClient>,
    /// Shared reference to the interactive session engine
    engine: Arc<Mutex<InteractionEngine>>,
    /// Shared reference to the game catalog
    catalog: Arc<GameCatalog>,
    /// Shared reference to the credential store
    creds: Arc<CredStore>,
    /// Shared reference to the command parser
    commander: Arc<Commander>,
    /// BGA base url, for building per-operation requesters
    bga_url: Arc<String>,
    /// Users allowed to set a custom table presentation
    contributors: Arc<Vec<String>>,
}

/// The bot itself, tying the Matrix side to the BGA side.
pub struct Bot {
    /// Matrix client for receiving and sending messages
    matrix_client: Arc<MatrixClient>,

    /// Interactive session engine.
    ///
    /// Behind a `Mutex` because advancing a session mutates the session store.
    /// The lock is only ever held across the synchronous `begin`/`advance`
    /// calls, never across network requests.
    engine: Arc<Mutex<InteractionEngine>>,

    /// Cached catalog of the games BGA offers
    catalog: Arc<GameCatalog>,

    /// Credential records of the linked users
    creds: Arc<CredStore>,

    /// Command parser, stateless
    commander: Arc<Commander>,

    /// BGA base url without trailing slash
    bga_url: Arc<String>,

    /// Users allowed to set a custom table presentation
    contributors: Arc<Vec<String>>,
}

impl Bot {
    /// Creates a bot from the loaded configuration and command line arguments.
    ///
    /// Opens the credential store under the data directory and logs in to
    /// Matrix (or restores the persisted session). The game catalog is scraped
    /// lazily on first use, so startup does not depend on BGA being
    /// reachable.
    ///
    /// # Errors
    ///
    /// Returns an error when the credential store cannot be read or the
    /// Matrix client cannot be set up.
    pub async fn new(config: Config, args: Args) -> Result<Self, anyhow::Error> {
        let catalog = Arc::new(GameCatalog::new(&config.bga.url));

        let creds_path = PathBuf::from(get_path(&args.data, "credentials.json"));
        let creds = Arc::new(CredStore::open(&creds_path).await?);

        let matrix_client = Arc::new(
            MatrixClient::new(
                &UserCredentials {
                    user_id: config.matrix.user_id,
                    password: config.matrix.password,
                    passphrase: config.matrix.passphrase,
                },
                &get_path(&args.data, "session"),
            )
            .await?,
        );

        Ok(Bot {
            matrix_client,
            engine: Arc::new(Mutex::new(InteractionEngine::new())),
            catalog,
            creds,
            commander: Arc::new(Commander::new()),
            bga_url: Arc::new(config.bga.url),
            contributors: Arc::new(config.bga.contributors),
        })
    }

    /// Starts the bot and processes messages until the process terminates.
    ///
    /// # Panics
    ///
    /// Panics if the Matrix sync loop fails to start.
    pub async fn start(self) {
        let matrix_client = Arc::clone(&self.matrix_client);
        let engine = Arc::clone(&self.engine);
        let catalog = Arc::clone(&self.catalog);
        let creds = Arc::clone(&self.creds);
        let commander = Arc::clone(&self.commander);
        let bga_url = Arc::clone(&self.bga_url);
        let contributors = Arc::clone(&self.contributors);

        let on_message =
            move |body: String, room_id: String, sender_id: String, event_id: String| {
                let ctx = MessageContext {
                    body,
                    room_id,
                    sender_id,
                    event_id,
                    matrix_client: Arc::clone(&matrix_client),
                    engine: Arc::clone(&engine),
                    catalog: Arc::clone(&catalog),
                    creds: Arc::clone(&creds),
                    commander: Arc::clone(&commander),
                    bga_url: Arc::clone(&bga_url),
                    contributors: Arc::clone(&contributors),
                };
                Self::handle_matrix_message(ctx);
            };

        self.matrix_client.sync(on_message).await.unwrap();
    }

    /// Handles one incoming Matrix message in its own task.
    ///
    /// A user with an open interactive session gets every message routed to
    /// the engine, command-shaped or not. Everyone else goes through the
    /// command parser; plain chat is ignored silently.
    fn handle_matrix_message(ctx: MessageContext) {
        tokio::spawn(async move {
            let has_session = ctx.engine.lock().await.has_session(&ctx.sender_id);

            // A session answer may be a password, `!setup` always carries one
            debug!(
                "message from {} in {}: {}",
                ctx.sender_id,
                ctx.room_id,
                loggable_body(&ctx.body, has_session)
            );

            if has_session {
                Self::handle_session_message(&ctx).await;
            } else {
                Self::handle_command_message(&ctx).await;
            }
        });
    }

    /// Routes a message to the sender's open session.
    async fn handle_session_message(ctx: &MessageContext) {
        let catalog = ctx.catalog.snapshot().await.unwrap_or_default();
        let record = ctx.creds.get(&ctx.sender_id).await;

        let reply = {
            let input = EngineInput {
                user_id: &ctx.sender_id,
                body: &ctx.body,
                channel: &ctx.room_id,
                catalog: &catalog,
                record: record.as_ref(),
            };
            ctx.engine.lock().await.advance(&input)
        };

        for message in &reply.messages {
            ctx.matrix_client
                .send_reply(&ctx.room_id, &ctx.sender_id, &ctx.event_id, message)
                .await;
        }

        if let Some(action) = reply.action {
            Self::execute_action(ctx, action).await;
        }
    }

    /// Parses a message as a command and runs or seeds it.
    async fn handle_command_message(ctx: &MessageContext) {
        let dispatch = match ctx.commander.parse(&ctx.body) {
            Ok(dispatch) => dispatch,
            Err(CommandParseError::NotForBot) => return,
            Err(CommandParseError::InvalidCommand(message)) => {
                ctx.matrix_client
                    .send_reply(&ctx.room_id, &ctx.sender_id, &ctx.event_id, &message)
                    .await;
                return;
            }
        };

        match dispatch {
            Dispatch::OneShot(command) => Self::execute_command(ctx, command).await,
            Dispatch::StartSession { subcommand, seed } => {
                let catalog = ctx.catalog.snapshot().await.unwrap_or_default();
                let record = ctx.creds.get(&ctx.sender_id).await;

                let reply = {
                    let input = EngineInput {
                        user_id: &ctx.sender_id,
                        body: &ctx.body,
                        channel: &ctx.room_id,
                        catalog: &catalog,
                        record: record.as_ref(),
                    };
                    ctx.engine.lock().await.begin(&input, subcommand, seed)
                };

                for message in &reply.messages {
                    ctx.matrix_client
                        .send_reply(&ctx.room_id, &ctx.sender_id, &ctx.event_id, message)
                        .await;
                }
            }
        }
    }

    /// Executes a fully specified one-shot command and replies with the result.
    async fn execute_command(ctx: &MessageContext, command: Command) {
        let response = match command {
            Command::Play {
                game,
                players,
                options,
            } => {
                let catalog = match ctx.catalog.snapshot().await {
                    Ok(catalog) => catalog,
                    Err(error) => {
                        error!("game list unavailable: {}", error);
                        Self::reply(ctx, &format_internal_error()).await;
                        return;
                    }
                };
                let entry = match crate::bga::resolver::resolve_game(&game, &catalog) {
                    Ok(entry) => entry.clone(),
                    Err(error) => {
                        Self::reply(ctx, &crate::interaction::engine::resolution_message(&error))
                            .await;
                        return;
                    }
                };
                let Some(requester) = Self::requester(ctx).await else {
                    return;
                };
                execute_create_game(
                    requester,
                    &ctx.creds,
                    &ctx.contributors,
                    &ctx.sender_id,
                    &entry,
                    &players,
                    &options,
                )
                .await
            }
            Command::Setup { username, password } => {
                // Scrub the password from the room before anything slow runs
                ctx.matrix_client
                    .redact_message(&ctx.room_id, &ctx.event_id, "contains credentials")
                    .await;
                let Some(requester) = Self::requester(ctx).await else {
                    return;
                };
                execute_verify_and_save(
                    requester,
                    &ctx.creds,
                    &ctx.sender_id,
                    &username,
                    &password,
                )
                .await
            }
            Command::Link { user, username } => {
                execute_link(&ctx.creds, &user, &username).await
            }
            Command::Status { players } => {
                let Some(requester) = Self::requester(ctx).await else {
                    return;
                };
                execute_show_tables(requester, &ctx.creds, &ctx.sender_id, None, &players).await
            }
            Command::Friend { names } => {
                let Some(requester) = Self::requester(ctx).await else {
                    return;
                };
                execute_add_friends(requester, &ctx.creds, &ctx.sender_id, &names).await
            }
            Command::List => match ctx.catalog.snapshot().await {
                Ok(catalog) => execute_list(&catalog),
                Err(error) => format!("Unable to fetch the game list: {}", error),
            },
            Command::Options => format_options_help(),
            Command::Help => format_help(),
        };

        Self::reply(ctx, &response).await;
    }

    /// Executes an operation completed by an interactive session.
    async fn execute_action(ctx: &MessageContext, action: CompletedAction) {
        match action {
            CompletedAction::CreateGame {
                game,
                players,
                options,
                channel,
            } => {
                let Some(requester) = Self::requester(ctx).await else {
                    return;
                };
                let response = execute_create_game(
                    requester,
                    &ctx.creds,
                    &ctx.contributors,
                    &ctx.sender_id,
                    &game,
                    &players,
                    &options,
                )
                .await;
                // The table announcement goes to the channel the session
                // picked, which is not necessarily where the menu ran
                ctx.matrix_client
                    .send_mention(&channel, &response, &ctx.sender_id)
                    .await;
            }
            CompletedAction::SaveUsername { username } => {
                if let Err(error) =
                    execute_save_username(&ctx.creds, &ctx.sender_id, &username).await
                {
                    warn!("saving username for {} failed: {:#}", ctx.sender_id, error);
                    Self::reply(ctx, &format_internal_error()).await;
                }
            }
            CompletedAction::VerifyAndSavePassword { username, password } => {
                // The message being handled is the password itself
                ctx.matrix_client
                    .redact_message(&ctx.room_id, &ctx.event_id, "contains credentials")
                    .await;
                let Some(requester) = Self::requester(ctx).await else {
                    return;
                };
                let response = execute_verify_and_save(
                    requester,
                    &ctx.creds,
                    &ctx.sender_id,
                    &username,
                    &password,
                )
                .await;
                Self::reply(ctx, &response).await;
            }
            CompletedAction::SavePreference { game, key, value } => {
                if let Err(error) = execute_save_preference(
                    &ctx.creds,
                    &ctx.sender_id,
                    game.as_deref(),
                    &key,
                    &value,
                )
                .await
                {
                    warn!(
                        "saving preference for {} failed: {:#}",
                        ctx.sender_id, error
                    );
                    Self::reply(ctx, &format_internal_error()).await;
                }
            }
            CompletedAction::ShowTables { game, players } => {
                let Some(requester) = Self::requester(ctx).await else {
                    return;
                };
                let response = execute_show_tables(
                    requester,
                    &ctx.creds,
                    &ctx.sender_id,
                    game.as_deref(),
                    &players,
                )
                .await;
                Self::reply(ctx, &response).await;
            }
            CompletedAction::AddFriends { names } => {
                let Some(requester) = Self::requester(ctx).await else {
                    return;
                };
                let response =
                    execute_add_friends(requester, &ctx.creds, &ctx.sender_id, &names).await;
                Self::reply(ctx, &response).await;
            }
        }
    }

    /// Builds a fresh BGA requester, replying with a generic error on failure.
    ///
    /// Every operation gets its own cookie jar so two users' BGA sessions can
    /// never bleed into each other.
    async fn requester(ctx: &MessageContext) -> Option<BgaRequester> {
        match BgaRequester::new(&ctx.bga_url) {
            Ok(requester) => Some(requester),
            Err(error) => {
                error!("unable to build a bga client: {}", error);
                Self::reply(ctx, &format_internal_error()).await;
                None
            }
        }
    }

    /// Sends a reply to the message being handled.
    async fn reply(ctx: &MessageContext, message: &str) {
        ctx.matrix_client
            .send_reply(&ctx.room_id, &ctx.sender_id, &ctx.event_id, message)
            .await;
    }
}
