//! Chess rules engine
//!
//! Pure functions over immutable [`Position`] values; safe to call from any
//! number of threads.

mod board;
mod fen;
mod outcome;
mod play;
mod position;
mod san;
mod types;

pub use board::Board;
pub use fen::{decode_position, encode_position, STARTING_FEN};
pub use outcome::{
    game_outcome, game_outcome_with, has_insufficient_material, is_threefold_repetition,
    repetition_key, RepetitionKey, RulesConfig,
};
pub use play::{apply_move, is_promotion_candidate, legal_destinations};
pub use position::Position;
pub use san::{parse_san, to_san};
pub use types::*;
