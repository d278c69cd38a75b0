//! Game registry
//!
//! Owns game-code allocation and hands out games behind a per-game
//! read-write lock. The lock is what gives the core its single-writer
//! guarantee: handlers take the write lock for `join`/`start`/`eliminate`
//! and the read lock for status views.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use rand::Rng;

use crate::game::Game;

/// Alphabet for game codes, as printed on invites.
const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LEN: usize = 4;

/// Registry of all active games.
pub struct GameStore {
    games: DashMap<String, Arc<RwLock<Game>>>,
}

impl GameStore {
    pub fn new() -> Self {
        Self {
            games: DashMap::new(),
        }
    }

    /// Create a game under a freshly allocated code and return the code.
    /// Codes are short, so collisions with live games are possible; the
    /// allocation loop re-rolls until it lands on a vacant slot.
    pub fn create(
        &self,
        name: String,
        location: String,
        end_date: DateTime<Utc>,
        max_players: usize,
    ) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let code = gen_code(&mut rng);
            match self.games.entry(code.clone()) {
                dashmap::mapref::entry::Entry::Occupied(_) => continue,
                dashmap::mapref::entry::Entry::Vacant(e) => {
                    let game = Game::new(
                        code.clone(),
                        name.clone(),
                        location.clone(),
                        end_date,
                        max_players,
                    );
                    e.insert(Arc::new(RwLock::new(game)));
                    return code;
                }
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<RwLock<Game>>> {
        self.games.get(id).map(|g| g.value().clone())
    }

    pub fn active_games(&self) -> usize {
        self.games.len()
    }

    /// Total roster size across all games, for the health endpoint.
    pub fn total_players(&self) -> usize {
        self.games
            .iter()
            .map(|entry| entry.value().read().roster().len())
            .sum()
    }
}

impl Default for GameStore {
    fn default() -> Self {
        Self::new()
    }
}

fn gen_code(rng: &mut impl Rng) -> String {
    (0..CODE_LEN)
        .map(|_| CODE_CHARS[rng.gen_range(0..CODE_CHARS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn codes_use_the_printed_alphabet() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..100 {
            let code = gen_code(&mut rng);
            assert_eq!(code.len(), CODE_LEN);
            assert!(code
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        }
    }

    #[test]
    fn create_allocates_distinct_codes() {
        let store = GameStore::new();
        let a = store.create("one".into(), "HQ".into(), Utc::now(), 8);
        let b = store.create("two".into(), "HQ".into(), Utc::now(), 8);
        assert_ne!(a, b);
        assert_eq!(store.active_games(), 2);
        assert_eq!(store.get(&a).unwrap().read().name(), "one");
    }

    #[test]
    fn total_players_sums_rosters() {
        let store = GameStore::new();
        let code = store.create("one".into(), "HQ".into(), Utc::now(), 8);
        {
            let game = store.get(&code).unwrap();
            let mut game = game.write();
            game.join("u1".into()).unwrap();
            game.join("u2".into()).unwrap();
        }
        assert_eq!(store.total_players(), 2);
    }
}
