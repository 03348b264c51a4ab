//! Error types for chess-duel-core

use thiserror::Error;

use crate::rules::IllegalMoveReason;
use crate::session::Status;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid position encoding: {0}")]
    InvalidEncoding(String),

    #[error("invalid square: {0}")]
    InvalidSquare(String),

    #[error("invalid SAN: {0}")]
    InvalidSan(String),

    #[error("illegal move: {0}")]
    IllegalMove(IllegalMoveReason),

    #[error("player is not a participant in this game")]
    NotAParticipant,

    #[error("it is not this player's turn")]
    NotYourTurn,

    #[error("operation not allowed while game is {0}")]
    WrongStatus(Status),

    #[error("cannot move game from {from} to {to}")]
    InvalidTransition { from: Status, to: Status },

    #[error("game already has two players")]
    AlreadyFull,

    #[error("cannot join your own game")]
    SelfJoin,

    #[error("access to this game is forbidden")]
    Forbidden,

    #[error("game not found: {0}")]
    NotFound(String),

    #[error("concurrent update rejected: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for failures caused by the request rather than by the service.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Error::Database(_) | Error::Json(_))
    }

    /// Stable machine-readable name of the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidEncoding(_) => "invalid_encoding",
            Error::InvalidSquare(_) => "invalid_square",
            Error::InvalidSan(_) => "invalid_san",
            Error::IllegalMove(_) => "illegal_move",
            Error::NotAParticipant => "not_a_participant",
            Error::NotYourTurn => "not_your_turn",
            Error::WrongStatus(_) => "wrong_status",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::AlreadyFull => "already_full",
            Error::SelfJoin => "self_join",
            Error::Forbidden => "forbidden",
            Error::NotFound(_) => "not_found",
            Error::Conflict(_) => "conflict",
            Error::Database(_) => "database",
            Error::Json(_) => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
