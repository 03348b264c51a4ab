//! Session persistence

mod db;
mod models;

pub use db::Database;
pub use models::StoredGame;

use crate::error::Result;
use crate::session::{Session, Status};

/// Durable home for sessions.
///
/// `save` is a compare-and-set on [`Session::version`]: a session with
/// version `v` only replaces a stored row at version `v - 1`, and version 0
/// only inserts. Anything else is [`Error::Conflict`](crate::Error::Conflict).
pub trait SessionStore: Send + Sync {
    /// Fails with [`Error::NotFound`](crate::Error::NotFound) for unknown ids.
    fn load(&self, id: &str) -> Result<Session>;

    fn save(&self, session: &Session) -> Result<()>;

    /// Games the player takes part in, most recently updated first.
    fn list_for_player(&self, player: &str, status: Option<Status>) -> Result<Vec<Session>>;
}
