//! Chess Duel Core Library
//!
//! Two-player chess matches: a rules engine, the session lifecycle around
//! it, and SQLite persistence.

pub mod error;
pub mod rules;
pub mod session;
pub mod storage;

pub use error::{Error, Result};
pub use rules::{
    Color, DrawReason, IllegalMoveReason, Move, Outcome, Piece, Position, Role, RulesConfig, Square,
};
pub use session::{GameService, PlayerId, Session, Status, Termination, Winner};
pub use storage::{Database, SessionStore};
