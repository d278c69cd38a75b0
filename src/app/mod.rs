//! Application state wiring

pub mod state;

pub use state::AppState;
