//! User registry
//!
//! Plays the Identity Provider role for the game core: it maps opaque user
//! ids to lightweight records, and resolves a player in a roster from the
//! QR token scanned during a kill. It also tracks which game a user is in,
//! which is where the duplicate-join check lives (the game core itself only
//! enforces capacity).

use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

/// One registered user. The `qr_code` token is minted at registration and
/// printed as a QR code badge; scanning it is how kills are reported.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub bio: String,
    pub favourite_location: String,
    pub qr_code: Uuid,
    /// Game the user currently plays in, if any.
    pub game_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum UserStoreError {
    #[error("user id already exists")]
    IdTaken,
}

/// In-memory registry of all users.
pub struct UserStore {
    users: DashMap<String, User>,
}

impl UserStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
        }
    }

    /// Register a new user and mint their QR token.
    pub fn create(
        &self,
        id: String,
        name: String,
        bio: String,
        favourite_location: String,
    ) -> Result<User, UserStoreError> {
        let user = User {
            id: id.clone(),
            name,
            bio,
            favourite_location,
            qr_code: Uuid::new_v4(),
            game_id: None,
        };

        match self.users.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(UserStoreError::IdTaken),
            dashmap::mapref::entry::Entry::Vacant(e) => {
                e.insert(user.clone());
                Ok(user)
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<User> {
        self.users.get(id).map(|u| u.value().clone())
    }

    /// Record that a user joined a game.
    pub fn assign_game(&self, id: &str, game_id: &str) {
        if let Some(mut user) = self.users.get_mut(id) {
            user.game_id = Some(game_id.to_string());
        }
    }

    /// Resolve which of the given players carries this QR token.
    pub fn find_by_qr<'a>(
        &self,
        player_ids: impl IntoIterator<Item = &'a String>,
        qr_code: &Uuid,
    ) -> Option<User> {
        player_ids.into_iter().find_map(|id| {
            self.users
                .get(id)
                .filter(|u| &u.qr_code == qr_code)
                .map(|u| u.value().clone())
        })
    }

    pub fn count(&self) -> usize {
        self.users.len()
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_id_is_rejected() {
        let store = UserStore::new();
        store
            .create("u1".into(), "Ann".into(), "".into(), "library".into())
            .unwrap();
        assert!(store
            .create("u1".into(), "Bob".into(), "".into(), "cafe".into())
            .is_err());
        assert_eq!(store.get("u1").unwrap().name, "Ann");
    }

    #[test]
    fn qr_resolution_is_scoped_to_the_roster() {
        let store = UserStore::new();
        let ann = store
            .create("u1".into(), "Ann".into(), "".into(), "library".into())
            .unwrap();
        store
            .create("u2".into(), "Bob".into(), "".into(), "cafe".into())
            .unwrap();

        let roster = vec!["u2".to_string()];
        // Ann's token does not resolve against a roster she is not in.
        assert!(store.find_by_qr(&roster, &ann.qr_code).is_none());

        let roster = vec!["u1".to_string(), "u2".to_string()];
        let found = store.find_by_qr(&roster, &ann.qr_code).unwrap();
        assert_eq!(found.id, "u1");
    }

    #[test]
    fn assign_game_marks_membership() {
        let store = UserStore::new();
        store
            .create("u1".into(), "Ann".into(), "".into(), "library".into())
            .unwrap();
        assert!(store.get("u1").unwrap().game_id.is_none());
        store.assign_game("u1", "AB12");
        assert_eq!(store.get("u1").unwrap().game_id.as_deref(), Some("AB12"));
    }
}
