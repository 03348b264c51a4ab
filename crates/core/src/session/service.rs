//! Game service
//!
//! Serializes every load-transition-save cycle per game id. The store's
//! version check catches writers outside this process.

use rand::Rng;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use super::machine::{Session, Status, Termination};
use crate::error::{Error, Result};
use crate::rules::{self, Role, RulesConfig, Square};
use crate::storage::SessionStore;

pub struct GameService<S> {
    store: S,
    rules: RulesConfig,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: SessionStore> GameService<S> {
    pub fn new(store: S) -> Self {
        Self::with_rules(store, RulesConfig::default())
    }

    pub fn with_rules(store: S, rules: RulesConfig) -> Self {
        Self {
            store,
            rules,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn release(&self, id: &str) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // one reference in the map plus ours
        if locks.get(id).is_some_and(|lock| Arc::strong_count(lock) <= 2) {
            locks.remove(id);
        }
    }

    /// Loads, transforms and saves one session while holding its lock.
    fn update<F>(&self, id: &str, transition: F) -> Result<Session>
    where
        F: FnOnce(&Session) -> Result<Session>,
    {
        let lock = self.lock_for(id);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.store
                .load(id)
                .and_then(|current| transition(&current))
                .and_then(|next| {
                    self.store.save(&next)?;
                    Ok(next)
                })
        };
        self.release(id);
        drop(lock);
        result
    }

    pub fn create_game(&self, initiator: &str) -> Result<Session> {
        let id = format!("{:016x}", rand::rng().random::<u64>());
        let session = Session::create(id, initiator);
        self.store.save(&session)?;
        tracing::info!(game_id = %session.id(), player = %initiator, "game created");
        Ok(session)
    }

    pub fn fetch_game(&self, id: &str, reader: &str) -> Result<Session> {
        let session = self.store.load(id)?;
        if !session.can_read(reader) {
            tracing::debug!(game_id = %id, player = %reader, "read refused");
            return Err(Error::Forbidden);
        }
        Ok(session)
    }

    pub fn list_games(&self, player: &str, status: Option<Status>) -> Result<Vec<Session>> {
        self.store.list_for_player(player, status)
    }

    pub fn join_game(&self, id: &str, joiner: &str) -> Result<Session> {
        let session = self.update(id, |s| s.join(joiner))?;
        tracing::info!(game_id = %id, player = %joiner, "player joined");
        Ok(session)
    }

    pub fn submit_move(
        &self,
        id: &str,
        actor: &str,
        from: Square,
        to: Square,
        promotion: Option<Role>,
    ) -> Result<Session> {
        let result = self.update(id, |s| {
            s.attempt_move_with(actor, from, to, promotion, &self.rules)
        });
        self.log_move(id, actor, &result);
        result
    }

    /// Same as [`submit_move`](Self::submit_move) with the move given in SAN.
    pub fn submit_san(&self, id: &str, actor: &str, san: &str) -> Result<Session> {
        let result = self.update(id, |s| {
            s.mover_color(actor)?;
            let mv = rules::parse_san(s.position(), san)?;
            s.attempt_move_with(actor, mv.from, mv.to, mv.promotion, &self.rules)
        });
        self.log_move(id, actor, &result);
        result
    }

    fn log_move(&self, id: &str, actor: &str, result: &Result<Session>) {
        match result {
            Ok(session) => {
                let san = session.history().last().map(String::as_str).unwrap_or("");
                tracing::debug!(game_id = %id, player = %actor, san, "move accepted");
                if session.status() == Status::Finished {
                    tracing::info!(game_id = %id, winner = ?session.winner(), "game finished");
                }
            }
            Err(e) => tracing::debug!(game_id = %id, player = %actor, error = %e, "move rejected"),
        }
    }

    pub fn set_outcome(&self, id: &str, actor: &str, termination: Termination) -> Result<Session> {
        let session = self.update(id, |s| s.set_outcome(actor, termination))?;
        tracing::info!(
            game_id = %id,
            player = %actor,
            status = %session.status(),
            winner = ?session.winner(),
            "game ended"
        );
        Ok(session)
    }

    /// Legal targets for the piece on `square`, for anyone allowed to read the game.
    pub fn legal_destinations(&self, id: &str, reader: &str, square: Square) -> Result<BTreeSet<Square>> {
        let session = self.fetch_game(id, reader)?;
        if session.status() != Status::Active {
            return Ok(BTreeSet::new());
        }
        Ok(rules::legal_destinations(session.position(), square))
    }
}
