//! In-memory data stores for users and games

pub mod games;
pub mod users;

pub use games::GameStore;
pub use users::{User, UserStore, UserStoreError};
