//! Database models

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rules::Position;
use crate::session::{Session, Status, Winner};

/// One row of the `games` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredGame {
    pub id: String,
    pub white_id: String,
    pub black_id: Option<String>,
    pub fen: String,
    pub status: String,
    pub winner: Option<String>,
    /// SAN moves as a JSON array.
    pub history: String,
    pub version: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

impl StoredGame {
    pub fn from_session(session: &Session) -> Result<Self> {
        Ok(Self {
            id: session.id().to_string(),
            white_id: session.white().to_string(),
            black_id: session.black().map(str::to_string),
            fen: session.position().to_string(),
            status: session.status().as_str().to_string(),
            winner: session.winner().map(|w| w.as_str().to_string()),
            history: serde_json::to_string(session.history())?,
            version: session.version(),
            created_at: session.created_at(),
            updated_at: session.updated_at(),
        })
    }

    pub fn into_session(self) -> Result<Session> {
        let position: Position = self.fen.parse()?;
        let status: Status = self.status.parse()?;
        let winner = self.winner.as_deref().map(str::parse::<Winner>).transpose()?;
        let history: Vec<String> = serde_json::from_str(&self.history)?;

        Ok(Session::restore(
            self.id,
            self.white_id,
            self.black_id,
            position,
            status,
            winner,
            history,
            self.version,
            self.created_at,
            self.updated_at,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_survives_row_conversion() {
        let session = Session::create("abc", "alice").join("bob").unwrap();
        let row = StoredGame::from_session(&session).unwrap();
        assert_eq!(row.status, "active");
        assert_eq!(row.history, "[]");
        assert_eq!(row.into_session().unwrap(), session);
    }

    #[test]
    fn test_corrupt_row_is_rejected() {
        let session = Session::create("abc", "alice");
        let mut row = StoredGame::from_session(&session).unwrap();
        row.fen = "not a fen".to_string();
        assert!(row.into_session().is_err());
    }
}
