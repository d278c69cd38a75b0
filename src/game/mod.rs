//! Core game state machine

pub mod session;

pub use session::{Game, GameError, PlayerId};
