//! Database operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::models::StoredGame;
use super::SessionStore;
use crate::error::{Error, Result};
use crate::session::{Session, Status};

pub struct Database {
    conn: Mutex<Connection>,
}

const SELECT_GAME: &str = "SELECT id, white_id, black_id, fen, status, winner, history, version, created_at, updated_at FROM games";

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS games (
                id TEXT PRIMARY KEY NOT NULL,
                white_id TEXT NOT NULL,
                black_id TEXT,
                fen TEXT NOT NULL,
                status TEXT NOT NULL,
                winner TEXT,
                history TEXT NOT NULL DEFAULT '[]',
                version INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_games_white_id ON games(white_id);
            CREATE INDEX IF NOT EXISTS idx_games_black_id ON games(black_id);
            CREATE INDEX IF NOT EXISTS idx_games_updated_at ON games(updated_at);
            "#,
        )?;
        Ok(())
    }

    fn read_row(row: &Row<'_>) -> rusqlite::Result<StoredGame> {
        Ok(StoredGame {
            id: row.get(0)?,
            white_id: row.get(1)?,
            black_id: row.get(2)?,
            fen: row.get(3)?,
            status: row.get(4)?,
            winner: row.get(5)?,
            history: row.get(6)?,
            version: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    pub fn count_games(&self) -> Result<u32> {
        let count: u32 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl SessionStore for Database {
    fn load(&self, id: &str) -> Result<Session> {
        let stored = self
            .conn()
            .query_row(
                &format!("{SELECT_GAME} WHERE id = ?1"),
                params![id],
                Self::read_row,
            )
            .optional()?;

        stored
            .ok_or_else(|| Error::NotFound(id.to_string()))?
            .into_session()
    }

    fn save(&self, session: &Session) -> Result<()> {
        let game = StoredGame::from_session(session)?;
        let conn = self.conn();

        let changed = if game.version == 0 {
            conn.execute(
                r#"
                INSERT OR IGNORE INTO games
                (id, white_id, black_id, fen, status, winner, history, version, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    game.id,
                    game.white_id,
                    game.black_id,
                    game.fen,
                    game.status,
                    game.winner,
                    game.history,
                    game.version,
                    game.created_at,
                    game.updated_at,
                ],
            )?
        } else {
            conn.execute(
                r#"
                UPDATE games
                SET black_id = ?2, fen = ?3, status = ?4, winner = ?5, history = ?6,
                    version = ?7, updated_at = ?8
                WHERE id = ?1 AND version = ?9
                "#,
                params![
                    game.id,
                    game.black_id,
                    game.fen,
                    game.status,
                    game.winner,
                    game.history,
                    game.version,
                    game.updated_at,
                    game.version - 1,
                ],
            )?
        };

        if changed == 0 {
            tracing::warn!(game_id = %game.id, version = game.version, "stale write rejected");
            return Err(Error::Conflict(format!(
                "game {} is not at version {}",
                game.id,
                game.version.saturating_sub(1)
            )));
        }
        Ok(())
    }

    fn list_for_player(&self, player: &str, status: Option<Status>) -> Result<Vec<Session>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "{SELECT_GAME} WHERE (white_id = ?1 OR black_id = ?1) AND (?2 IS NULL OR status = ?2) \
             ORDER BY updated_at DESC, created_at DESC"
        ))?;

        let rows = stmt
            .query_map(params![player, status.map(|s| s.as_str())], Self::read_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(StoredGame::into_session).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let db = Database::open_in_memory().unwrap();
        let session = Session::create("g1", "alice");
        db.save(&session).unwrap();
        assert_eq!(db.load("g1").unwrap(), session);
        assert_eq!(db.count_games().unwrap(), 1);
    }

    #[test]
    fn test_load_missing() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.load("nope"), Err(Error::NotFound(id)) if id == "nope"));
    }

    #[test]
    fn test_version_conflicts() {
        let db = Database::open_in_memory().unwrap();
        let created = Session::create("g1", "alice");
        db.save(&created).unwrap();
        // second insert of the same id
        assert!(matches!(db.save(&created), Err(Error::Conflict(_))));

        let joined = created.join("bob").unwrap();
        db.save(&joined).unwrap();
        // stale writer built from version 0
        let stale = created.join("carol").unwrap();
        assert!(matches!(db.save(&stale), Err(Error::Conflict(_))));

        assert_eq!(db.load("g1").unwrap().black(), Some("bob"));
    }

    #[test]
    fn test_list_for_player() {
        let db = Database::open_in_memory().unwrap();
        let a = Session::create("a", "alice");
        let b = Session::create("b", "bob").join("alice").unwrap();
        let c = Session::create("c", "carol");
        db.save(&a).unwrap();
        db.save(&Session::create("b", "bob")).unwrap();
        db.save(&b).unwrap();
        db.save(&c).unwrap();

        let mut ids: Vec<_> = db
            .list_for_player("alice", None)
            .unwrap()
            .iter()
            .map(|s| s.id().to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, ["a", "b"]);

        let active = db.list_for_player("alice", Some(Status::Active)).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id(), "b");
        assert!(db.list_for_player("dave", None).unwrap().is_empty());
    }

    #[test]
    fn test_reopen_file() {
        let path = std::env::temp_dir().join(format!("chess-duel-test-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);
        {
            let db = Database::open(&path).unwrap();
            db.save(&Session::create("g1", "alice")).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.load("g1").unwrap().white(), "alice");
        let _ = std::fs::remove_file(&path);
    }
}
