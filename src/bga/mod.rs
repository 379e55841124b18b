//! Board Game Arena integration.
//!
//! This module groups everything that talks to, or models, the Board Game Arena
//! (BGA) website:
//!
//! - [`requester`] - HTTP client trait and implementation for the BGA endpoints
//! - [`account`] - Authenticated session resolution and table orchestration
//! - [`catalog`] - Scraped and cached list of games BGA offers
//! - [`resolver`] - Fuzzy name matching for games and other labels
//! - [`options`] - Validation of table options (`mode`, `speed`, `levels`, ...)
//! - [`response_structs`] - serde models for BGA JSON responses

pub mod account;
pub mod catalog;
pub mod options;
pub mod requester;
pub mod resolver;
pub mod response_structs;

use std::fmt;

pub use crate::bga::catalog::{GameCatalog, GameCatalogEntry};

/// Errors raised while talking to Board Game Arena.
#[derive(Debug)]
pub enum BgaError {
    /// Transport-level failure from the HTTP client
    Http(reqwest::Error),
    /// BGA answered with an application-level error message
    Service(String),
    /// BGA answered with a payload we could not make sense of
    BadResponse(String),
}

impl fmt::Display for BgaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BgaError::Http(e) => write!(f, "http error: {}", e),
            BgaError::Service(message) => write!(f, "bga error: {}", message),
            BgaError::BadResponse(message) => write!(f, "unexpected bga response: {}", message),
        }
    }
}

impl std::error::Error for BgaError {}

impl From<reqwest::Error> for BgaError {
    fn from(error: reqwest::Error) -> Self {
        BgaError::Http(error)
    }
}
