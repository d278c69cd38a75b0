//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::store::{GameStore, UserStore};

/// Shared application state. Stores are constructed here and passed
/// explicitly; nothing in the crate reaches for a global registry.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: Arc<UserStore>,
    pub games: Arc<GameStore>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            users: Arc::new(UserStore::new()),
            games: Arc::new(GameStore::new()),
        }
    }
}
