//! Assassination game state machine
//!
//! A `Game` owns the roster, the target ring, per-player scores and the
//! elimination order. The three mutating operations (`join`, `start`,
//! `eliminate`) are synchronous in-memory transitions; callers are expected
//! to serialize writers per game instance (the store keeps each game behind
//! its own lock). A failed operation never leaves partial state behind.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

/// Opaque player identity. The game only ever compares ids for equality
/// and membership; profile data lives in the user store.
pub type PlayerId = String;

/// Validation failures for game operations. None are transient: retrying
/// the same call against the same state fails the same way.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("game is full")]
    GameFull,

    #[error("game has already started")]
    AlreadyStarted,

    #[error("game has not started yet")]
    NotStarted,

    #[error("game has already ended")]
    AlreadyEnded,

    #[error("game has no players")]
    EmptyGame,

    #[error("player is not in this game")]
    NotAPlayer,

    #[error("player has already been eliminated")]
    AlreadyEliminated,

    #[error("that player is not your assigned target")]
    WrongTarget,
}

/// A single assassination game.
#[derive(Debug, Clone)]
pub struct Game {
    id: String,
    name: String,
    location: String,
    end_date: DateTime<Utc>,
    max_players: usize,

    /// Players in join order. Fixed once the game starts.
    roster: Vec<PlayerId>,
    /// Kill counts, keyed by every roster member.
    scores: HashMap<PlayerId, u32>,
    /// player -> their current target. Covers the full original roster once
    /// started; an eliminated player's entry is inherited by their killer
    /// rather than removed, so the live players always form a single ring.
    target_ring: HashMap<PlayerId, PlayerId>,
    /// Eliminated players in elimination order.
    eliminated: Vec<PlayerId>,

    started: bool,
    ended: bool,
    winner: Option<PlayerId>,
}

impl Game {
    pub fn new(
        id: String,
        name: String,
        location: String,
        end_date: DateTime<Utc>,
        max_players: usize,
    ) -> Self {
        Self {
            id,
            name,
            location,
            end_date,
            max_players,
            roster: Vec::new(),
            scores: HashMap::new(),
            target_ring: HashMap::new(),
            eliminated: Vec::new(),
            started: false,
            ended: false,
            winner: None,
        }
    }

    /// Add a player to the roster and open their score at zero.
    ///
    /// Duplicate-join protection is the caller's job (the user store tracks
    /// which game a user is in); the game itself only enforces capacity and
    /// the pre-start window.
    pub fn join(&mut self, player_id: PlayerId) -> Result<(), GameError> {
        if self.started {
            return Err(GameError::AlreadyStarted);
        }
        if self.roster.len() >= self.max_players {
            return Err(GameError::GameFull);
        }

        self.scores.insert(player_id.clone(), 0);
        self.roster.push(player_id);
        Ok(())
    }

    /// Freeze the roster into a randomized target ring and start the game.
    ///
    /// The ring is built from a uniformly random permutation of the roster:
    /// each player targets the next one in the permutation, the last wraps
    /// to the first. That yields exactly one cycle covering every player,
    /// so for two or more players nobody targets themself and no sub-cycle
    /// can exist.
    ///
    /// A single-player game starts already ended, with that player as the
    /// winner (they target themself in the ring, but no elimination is
    /// possible).
    pub fn start(&mut self, rng: &mut impl Rng) -> Result<(), GameError> {
        if self.started {
            return Err(GameError::AlreadyStarted);
        }
        if self.roster.is_empty() {
            return Err(GameError::EmptyGame);
        }

        let mut order = self.roster.clone();
        order.shuffle(rng);
        self.start_with_order(order);
        Ok(())
    }

    /// Build the ring from an explicit ordering. Callers have already
    /// validated the not-started / non-empty preconditions.
    fn start_with_order(&mut self, order: Vec<PlayerId>) {
        for window in order.windows(2) {
            self.target_ring
                .insert(window[0].clone(), window[1].clone());
        }
        // Close the cycle. For a single player this is a self-target.
        self.target_ring
            .insert(order[order.len() - 1].clone(), order[0].clone());

        self.started = true;

        if order.len() == 1 {
            self.ended = true;
            self.winner = Some(order[0].clone());
        }
    }

    /// Record that `actor` eliminated `target`.
    ///
    /// All preconditions are checked before anything mutates: the game must
    /// be running, both players must be alive roster members, and `target`
    /// must be the actor's currently assigned target. On success the target
    /// joins the eliminated list, the actor's score increments, and the
    /// actor inherits the victim's target, keeping the survivors on a
    /// single ring. When one player remains the game ends and they win.
    pub fn eliminate(&mut self, actor: &PlayerId, target: &PlayerId) -> Result<(), GameError> {
        if !self.started {
            return Err(GameError::NotStarted);
        }
        if self.ended {
            return Err(GameError::AlreadyEnded);
        }
        if !self.roster.contains(actor) || !self.roster.contains(target) {
            return Err(GameError::NotAPlayer);
        }
        if self.eliminated.contains(actor) || self.eliminated.contains(target) {
            return Err(GameError::AlreadyEliminated);
        }
        if self.target_ring.get(actor) != Some(target) {
            return Err(GameError::WrongTarget);
        }

        self.eliminated.push(target.clone());
        if let Some(score) = self.scores.get_mut(actor) {
            *score += 1;
        }
        // Actor inherits the victim's target. Ring entries above guarantee
        // the lookup succeeds for any started game.
        if let Some(inherited) = self.target_ring.get(target).cloned() {
            self.target_ring.insert(actor.clone(), inherited);
        }

        if self.eliminated.len() == self.roster.len() - 1 {
            self.ended = true;
            self.winner = self
                .roster
                .iter()
                .find(|p| !self.eliminated.contains(p))
                .cloned();
        }

        Ok(())
    }

    // Read accessors. Status queries go through these; the store hands out
    // the game behind a read-write lock so reads see a consistent snapshot.

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn end_date(&self) -> DateTime<Utc> {
        self.end_date
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    pub fn roster(&self) -> &[PlayerId] {
        &self.roster
    }

    pub fn scores(&self) -> &HashMap<PlayerId, u32> {
        &self.scores
    }

    /// The full target ring. Empty until the game starts.
    pub fn target_ring(&self) -> &HashMap<PlayerId, PlayerId> {
        &self.target_ring
    }

    /// A single player's current target, for restricted views.
    pub fn target_of(&self, player_id: &str) -> Option<&PlayerId> {
        self.target_ring.get(player_id)
    }

    pub fn eliminated(&self) -> &[PlayerId] {
        &self.eliminated
    }

    pub fn is_alive(&self, player_id: &PlayerId) -> bool {
        self.roster.contains(player_id) && !self.eliminated.contains(player_id)
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn ended(&self) -> bool {
        self.ended
    }

    pub fn winner(&self) -> Option<&PlayerId> {
        self.winner.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn game(max_players: usize) -> Game {
        Game::new(
            "TEST".to_string(),
            "office game".to_string(),
            "HQ".to_string(),
            Utc::now(),
            max_players,
        )
    }

    fn game_with_players(n: usize) -> Game {
        let mut g = game(n);
        for i in 0..n {
            g.join(format!("p{i}")).unwrap();
        }
        g
    }

    /// Force a known ring: each player targets the next, last wraps around.
    fn start_in_join_order(g: &mut Game) {
        let order = g.roster().to_vec();
        g.start_with_order(order);
    }

    #[test]
    fn join_initializes_score() {
        let mut g = game(4);
        g.join("alice".to_string()).unwrap();
        assert_eq!(g.roster(), ["alice".to_string()]);
        assert_eq!(g.scores()["alice"], 0);
    }

    #[test]
    fn join_past_capacity_fails_and_leaves_roster_alone() {
        let mut g = game_with_players(3);
        let err = g.join("late".to_string()).unwrap_err();
        assert_eq!(err, GameError::GameFull);
        assert_eq!(g.roster().len(), 3);
        assert!(!g.scores().contains_key("late"));
    }

    #[test]
    fn join_after_start_is_rejected() {
        let mut g = game_with_players(2);
        g.start(&mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        assert_eq!(
            g.join("late".to_string()),
            Err(GameError::AlreadyStarted)
        );
    }

    #[test]
    fn start_empty_game_fails() {
        let mut g = game(4);
        assert_eq!(
            g.start(&mut ChaCha8Rng::seed_from_u64(1)),
            Err(GameError::EmptyGame)
        );
        assert!(!g.started());
    }

    #[test]
    fn start_twice_fails() {
        let mut g = game_with_players(3);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        g.start(&mut rng).unwrap();
        let ring_before = g.target_ring().clone();
        assert_eq!(g.start(&mut rng), Err(GameError::AlreadyStarted));
        // The rejected call must not have re-shuffled anything.
        assert_eq!(g.target_ring(), &ring_before);
    }

    #[test]
    fn start_builds_a_single_cycle_over_all_players() {
        for n in 2..=12 {
            for seed in 0..8 {
                let mut g = game_with_players(n);
                g.start(&mut ChaCha8Rng::seed_from_u64(seed)).unwrap();

                // Follow the ring from any player: no self-targets, and we
                // only return to the start after exactly n hops.
                let first = &g.roster()[0];
                let mut current = first.clone();
                for hop in 1..=n {
                    let next = g.target_of(&current).expect("ring covers roster").clone();
                    assert_ne!(next, current, "self-target in a {n}-player ring");
                    current = next;
                    if hop < n {
                        assert_ne!(&current, first, "sub-cycle of length {hop} in {n}-player ring");
                    }
                }
                assert_eq!(&current, first);
            }
        }
    }

    #[test]
    fn single_player_start_is_an_immediate_win() {
        let mut g = game_with_players(1);
        g.start(&mut ChaCha8Rng::seed_from_u64(3)).unwrap();
        assert!(g.started());
        assert!(g.ended());
        assert_eq!(g.winner(), Some(&"p0".to_string()));
        assert_eq!(g.target_of("p0"), Some(&"p0".to_string()));
        // No further elimination is possible.
        assert_eq!(
            g.eliminate(&"p0".to_string(), &"p0".to_string()),
            Err(GameError::AlreadyEnded)
        );
    }

    #[test]
    fn forced_ring_elimination_scenario() {
        // Ring pinned to p0 -> p1 -> p2 -> p0.
        let mut g = game_with_players(3);
        start_in_join_order(&mut g);

        let (a, b, c) = ("p0".to_string(), "p1".to_string(), "p2".to_string());
        assert_eq!(g.target_of(&a), Some(&b));

        g.eliminate(&a, &b).unwrap();
        assert_eq!(g.eliminated(), [b.clone()]);
        assert_eq!(g.scores()[&a], 1);
        // p0 inherits p1's target.
        assert_eq!(g.target_of(&a), Some(&c));
        assert!(!g.ended());

        // p2 still targets p0; closing the loop ends the game.
        g.eliminate(&c, &a).unwrap();
        assert!(g.ended());
        assert_eq!(g.winner(), Some(&c));
        assert_eq!(g.eliminated(), [b, a]);
    }

    #[test]
    fn wrong_target_is_rejected_before_any_mutation() {
        let mut g = game_with_players(3);
        start_in_join_order(&mut g);

        let scores = g.scores().clone();
        let ring = g.target_ring().clone();

        // p0's target is p1, not p2.
        let err = g
            .eliminate(&"p0".to_string(), &"p2".to_string())
            .unwrap_err();
        assert_eq!(err, GameError::WrongTarget);

        assert!(g.eliminated().is_empty());
        assert_eq!(g.scores(), &scores);
        assert_eq!(g.target_ring(), &ring);
    }

    #[test]
    fn eliminate_requires_a_started_game() {
        let mut g = game_with_players(2);
        assert_eq!(
            g.eliminate(&"p0".to_string(), &"p1".to_string()),
            Err(GameError::NotStarted)
        );
    }

    #[test]
    fn eliminate_rejects_outsiders_and_the_dead() {
        let mut g = game_with_players(3);
        start_in_join_order(&mut g);

        assert_eq!(
            g.eliminate(&"ghost".to_string(), &"p1".to_string()),
            Err(GameError::NotAPlayer)
        );
        assert_eq!(
            g.eliminate(&"p0".to_string(), &"ghost".to_string()),
            Err(GameError::NotAPlayer)
        );

        g.eliminate(&"p0".to_string(), &"p1".to_string()).unwrap();
        // Dead players can neither act nor be targeted again.
        assert_eq!(
            g.eliminate(&"p1".to_string(), &"p2".to_string()),
            Err(GameError::AlreadyEliminated)
        );
        assert_eq!(
            g.eliminate(&"p2".to_string(), &"p1".to_string()),
            Err(GameError::AlreadyEliminated)
        );
    }

    #[test]
    fn full_game_terminates_with_consistent_accounting() {
        for seed in 0..6 {
            let n = 6;
            let mut g = game_with_players(n);
            g.start(&mut ChaCha8Rng::seed_from_u64(seed)).unwrap();

            let mut kills = 0;
            while !g.ended() {
                // Any alive player eliminating their assigned target is a
                // valid move; walk the ring from the first survivor.
                let actor = g
                    .roster()
                    .iter()
                    .find(|p| g.is_alive(p))
                    .cloned()
                    .unwrap();
                let target = g.target_of(&actor).cloned().unwrap();
                g.eliminate(&actor, &target).unwrap();
                kills += 1;

                let total: u32 = g.scores().values().sum();
                assert_eq!(total as usize, g.eliminated().len());
            }

            assert_eq!(kills, n - 1);
            assert_eq!(g.eliminated().len(), n - 1);
            let winner = g.winner().expect("ended game has a winner");
            assert!(g.roster().contains(winner));
            assert!(!g.eliminated().contains(winner));
        }
    }
}
