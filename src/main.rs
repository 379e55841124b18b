//! Meeple - A Matrix bot for Board Game Arena tables.
//!
//! Meeple lets Matrix users create, configure and monitor Board Game Arena
//! (BGA) tables from chat. Users link their BGA account once, then start
//! tables, invite co-players, tune table options and check on running games
//! with short commands.
//!
//! # Features
//!
//! - **Table creation**: `!play <game> <players...>` creates an asynchronous
//!   table and invites everyone
//! - **Interactive menus**: a command without enough arguments walks the user
//!   through numbered menus instead of failing
//! - **Account linking**: credentials are verified against BGA before they
//!   are stored, and password messages are redacted from the room
//! - **Option preferences**: per-user defaults, globally or per game
//! - **Table status**: progress, age and move count of running tables
//! - **Session persistence**: the Matrix login survives restarts
//!
//! # Configuration
//!
//! Create a `config.yaml` file:
//!
//! ```yaml
//! bga:
//!   url: "https://boardgamearena.com"
//!   contributors:
//!     - "@alice:example.com"
//!
//! matrix:
//!   user_id: "@meeple:example.com"
//!   password: "your-password"
//!   passphrase: "your-recovery-passphrase"
//! ```
//!
//! Any value can be overridden with a `MEEPLE_` environment variable:
//!
//! ```bash
//! export MEEPLE_MATRIX__PASSWORD="secret-from-env"
//! export MEEPLE_MATRIX__PASSPHRASE="phrase-from-env"
//! ```
//!
//! # Usage
//!
//! ```bash
//! meeple --config config.yaml --data ./meeple-data
//! ```
//!
//! # Bot Commands
//!
//! - `!play <game> <players...> [option:value...]` - Create a table
//! - `!setup <username> <password>` - Link and verify a BGA account
//! - `!link <user> <BGA username>` - Link someone else's account, no password
//! - `!status <players...>` - List the tables the players share
//! - `!friend <players...>` - Add BGA friends
//! - `!list` - List the games BGA offers
//! - `!options` - Describe the table options
//! - `!help` - Describe the commands
//!
//! # Architecture
//!
//! - [`bga`] - BGA endpoints, option schema, game catalog and name resolution
//! - [`bot`] - Message routing between Matrix and the command handlers
//! - [`commands`] - Tokenizing, dispatch, execution and response formatting
//! - [`config`] - YAML configuration with environment variable overrides
//! - [`creds`] - Per-user credential and preference store
//! - [`interaction`] - Interactive multi-turn menu sessions
//! - [`matrix`] - Matrix client, encryption and sync
//! - [`utils`] - Path handling, message splitting, log redaction
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls the logging level (default: `info`)

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use crate::{bot::Bot, config::Config};

mod bga;
mod bot;
mod commands;
mod config;
mod creds;
mod interaction;
mod matrix;
mod utils;

/// Command-line arguments for the Meeple bot.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file.
    ///
    /// Contains the BGA settings and the Matrix account credentials. See the
    /// [`config`] module for the expected format. Values can be overridden
    /// with `MEEPLE_` environment variables.
    #[arg(short, long)]
    config: String,

    /// Path to the directory for persistent data.
    ///
    /// This directory will contain:
    /// - `session/` - Matrix session data and the SQLite store
    /// - `credentials.json` - linked BGA accounts and option preferences
    ///
    /// It holds authentication tokens, encryption keys and BGA passwords, so
    /// keep its permissions tight (`chmod 700`).
    #[arg(short, long)]
    pub data: String,
}

/// Entry point: logging, arguments, configuration, then the bot.
#[tokio::main]
async fn main() {
    // Put logger at info level by default
    let env = Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    info!("Starting meeple {}...", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let mut config: Config = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load config file: {}", e);
            return;
        }
    };

    // Normalize the BGA URL by removing a trailing slash
    if config.bga.url.ends_with('/') {
        config.bga.url.pop();
    }

    let bot = match Bot::new(config, args).await {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to initialize bot: {}", e);
            return;
        }
    };
    bot.start().await;
}
