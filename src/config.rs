//! Configuration file structures and loading for the Meeple bot.
//!
//! The bot reads a YAML configuration file with two sections: the Board Game
//! Arena settings and the Matrix account settings.
//!
//! ```yaml
//! bga:
//!   # Base URL of the Board Game Arena site
//!   url: "https://boardgamearena.com"
//!   # Matrix users allowed to override the table presentation text
//!   contributors:
//!     - "@alice:example.com"
//!
//! matrix:
//!   user_id: "@meeple:example.com"
//!   password: "secret-password"
//!   passphrase: "recovery-passphrase"
//! ```
//!
//! Every value can be overridden with a `MEEPLE_` environment variable, using
//! `__` as the section separator:
//!
//! ```bash
//! export MEEPLE_MATRIX__PASSWORD="secret-from-env"
//! export MEEPLE_BGA__URL="https://boardgamearena.com"
//! ```

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::Deserialize;

/// Root configuration for the Meeple bot.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Board Game Arena settings
    pub bga: Bga,
    /// Matrix account settings
    pub matrix: Matrix,
}

/// Board Game Arena settings.
#[derive(Debug, Deserialize)]
pub struct Bga {
    /// Base URL of the Board Game Arena site.
    ///
    /// Includes the protocol, e.g. `https://boardgamearena.com`. A trailing
    /// slash is stripped at startup.
    pub url: String,

    /// Matrix user ids allowed to set a custom table presentation text.
    ///
    /// Everyone else gets the default presentation on the tables they create.
    #[serde(default)]
    pub contributors: Vec<String>,
}

/// Matrix account settings.
#[derive(Debug, Deserialize)]
pub struct Matrix {
    /// Fully qualified Matrix user id of the bot account, e.g.
    /// `@meeple:example.com`.
    pub user_id: String,

    /// Matrix account password.
    ///
    /// Only used for the first login; afterwards the persisted session is
    /// restored instead.
    pub password: String,

    /// E2EE recovery passphrase.
    ///
    /// Protects the secret storage and the local SQLite store. Required for
    /// encrypted rooms.
    pub passphrase: String,
}

impl Config {
    /// Loads the configuration from a YAML file, then applies `MEEPLE_`
    /// environment variable overrides.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or a required field is
    /// missing after merging file and environment.
    pub fn load(path: &str) -> Result<Config, figment::Error> {
        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("MEEPLE_").split("__"))
            .extract()
    }
}
