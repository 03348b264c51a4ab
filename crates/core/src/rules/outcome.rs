//! Game-end detection

use serde::{Deserialize, Serialize};

use super::board::Board;
use super::position::Position;
use super::types::{CastlingRights, Color, DrawReason, Outcome, Role, Square};

/// Which draw-by-rule extensions are in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Draw once 100 plies pass without a capture or pawn move.
    pub fifty_move_rule: bool,
    pub insufficient_material: bool,
    /// Draw on the third occurrence of a position; needs move history.
    pub repetition: bool,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            fifty_move_rule: true,
            insufficient_material: true,
            repetition: true,
        }
    }
}

impl RulesConfig {
    /// Only checkmate and stalemate end the game.
    pub fn strict() -> Self {
        Self {
            fifty_move_rule: false,
            insufficient_material: false,
            repetition: false,
        }
    }
}

/// Outcome under the default rules.
pub fn game_outcome(position: &Position) -> Outcome {
    game_outcome_with(position, &RulesConfig::default())
}

/// Outcome of `position` alone; repetition is judged by [`is_threefold_repetition`].
pub fn game_outcome_with(position: &Position, config: &RulesConfig) -> Outcome {
    if !position.has_legal_move() {
        return if position.is_check() {
            Outcome::Checkmate {
                winner: position.turn().other(),
            }
        } else {
            Outcome::Stalemate
        };
    }
    if config.insufficient_material && has_insufficient_material(position.board()) {
        return Outcome::Draw {
            reason: DrawReason::InsufficientMaterial,
        };
    }
    if config.fifty_move_rule && position.halfmoves() >= 100 {
        return Outcome::Draw {
            reason: DrawReason::FiftyMoves,
        };
    }
    Outcome::InProgress
}

/// K v K, K+minor v K, or only same-colored bishops besides the kings.
pub fn has_insufficient_material(board: &Board) -> bool {
    let mut minors = Vec::new();
    for (square, piece) in board.pieces() {
        match piece.role {
            Role::King => {}
            Role::Knight | Role::Bishop => minors.push((square, piece.role)),
            _ => return false,
        }
    }

    match minors.as_slice() {
        [] | [_] => true,
        [(first, _), ..] => minors
            .iter()
            .all(|(sq, role)| *role == Role::Bishop && sq.is_light() == first.is_light()),
    }
}

/// Identity of a position for repetition purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepetitionKey {
    board: Board,
    turn: Color,
    castling: CastlingRights,
    ep_square: Option<Square>,
}

/// The en-passant square only counts when a capture on it is actually legal.
pub fn repetition_key(position: &Position) -> RepetitionKey {
    let ep_square = position.ep_square().filter(|ep| {
        position.legal_moves().iter().any(|mv| {
            mv.to == *ep
                && mv.from.file() != mv.to.file()
                && position.piece_at(mv.from).map(|p| p.role) == Some(Role::Pawn)
        })
    });
    RepetitionKey {
        board: *position.board(),
        turn: position.turn(),
        castling: position.castling_rights(),
        ep_square,
    }
}

/// True if the last position in `history` has occurred at least three times.
pub fn is_threefold_repetition(history: &[Position]) -> bool {
    let Some(last) = history.last() else {
        return false;
    };
    let key = repetition_key(last);
    history
        .iter()
        .filter(|position| repetition_key(position) == key)
        .count()
        >= 3
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::san::parse_san;

    fn outcome_of(fen: &str) -> Outcome {
        game_outcome(&fen.parse().unwrap())
    }

    #[test]
    fn test_starting_position_in_progress() {
        assert_eq!(game_outcome(&Position::starting()), Outcome::InProgress);
    }

    #[test]
    fn test_fools_mate() {
        let mut pos = Position::starting();
        for san in ["f3", "e5", "g4", "Qh4"] {
            pos = pos.play(&parse_san(&pos, san).unwrap()).unwrap();
        }
        assert_eq!(game_outcome(&pos), Outcome::Checkmate { winner: Color::Black });
    }

    #[test]
    fn test_stalemate() {
        assert_eq!(outcome_of("7k/5Q2/5K2/8/8/8/8/8 b - - 0 1"), Outcome::Stalemate);
    }

    #[test]
    fn test_insufficient_material() {
        let draw = Outcome::Draw {
            reason: DrawReason::InsufficientMaterial,
        };
        assert_eq!(outcome_of("4k3/8/8/8/8/8/8/4K3 w - - 0 1"), draw);
        assert_eq!(outcome_of("4k3/8/8/8/8/8/8/4KN2 w - - 0 1"), draw);
        // bishops on c1 and f8 are both dark squares
        assert_eq!(outcome_of("4kb2/8/8/8/8/8/8/2B1K3 w - - 0 1"), draw);
        assert_eq!(outcome_of("4k1b1/8/8/8/8/8/8/2B1K3 w - - 0 1"), Outcome::InProgress);
        assert_eq!(outcome_of("4k3/8/8/8/8/8/8/3NKN2 w - - 0 1"), Outcome::InProgress);
        assert_eq!(outcome_of("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1"), Outcome::InProgress);
    }

    #[test]
    fn test_fifty_move_rule() {
        let fen = "4k3/8/8/8/8/8/8/R3K3 w - - 100 80";
        assert_eq!(
            outcome_of(fen),
            Outcome::Draw {
                reason: DrawReason::FiftyMoves
            }
        );
        let pos: Position = fen.parse().unwrap();
        assert_eq!(game_outcome_with(&pos, &RulesConfig::strict()), Outcome::InProgress);
    }

    #[test]
    fn test_checkmate_beats_fifty_move_rule() {
        let pos: Position = "R3k3/8/4K3/8/8/8/8/8 b - - 120 90".parse().unwrap();
        assert_eq!(game_outcome(&pos), Outcome::Checkmate { winner: Color::White });
    }

    #[test]
    fn test_threefold_repetition() {
        let mut pos = Position::starting();
        let mut history = vec![pos.clone()];
        for san in ["Nf3", "Nf6", "Ng1", "Ng8", "Nf3", "Nf6", "Ng1", "Ng8"] {
            pos = pos.play(&parse_san(&pos, san).unwrap()).unwrap();
            history.push(pos.clone());
            if history.len() < 9 {
                assert!(!is_threefold_repetition(&history));
            }
        }
        assert!(is_threefold_repetition(&history));
    }

    #[test]
    fn test_uncapturable_ep_square_is_ignored() {
        let with_ep: Position = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
            .parse()
            .unwrap();
        let without: Position = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
            .parse()
            .unwrap();
        assert_eq!(repetition_key(&with_ep), repetition_key(&without));
    }
}
