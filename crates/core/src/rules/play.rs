//! Move validation and application

use std::collections::BTreeSet;

use super::position::Position;
use super::san;
use super::types::{IllegalMoveReason, Move, Piece, Role, Square};
use crate::error::{Error, Result};

fn illegal(reason: IllegalMoveReason) -> Error {
    Error::IllegalMove(reason)
}

/// Squares the piece on `square` may legally move to.
///
/// Empty when the square is empty or holds a piece of the side not to move.
pub fn legal_destinations(position: &Position, square: Square) -> BTreeSet<Square> {
    position
        .legal_moves_from(square)
        .into_iter()
        .map(|mv| mv.to)
        .collect()
}

/// True iff a pawn on `from` stepping to `to` (straight or diagonally, one
/// rank forward) lands on its last rank.
pub fn is_promotion_candidate(position: &Position, from: Square, to: Square) -> bool {
    let Some(Piece { role: Role::Pawn, color }) = position.piece_at(from) else {
        return false;
    };
    let df = to.file() as i8 - from.file() as i8;
    let dr = to.rank() as i8 - from.rank() as i8;
    df.abs() <= 1 && dr == color.pawn_direction() && to.rank() == color.promotion_rank()
}

/// Validates and plays a move, returning the new position and its SAN.
pub fn apply_move(
    position: &Position,
    from: Square,
    to: Square,
    promotion: Option<Role>,
) -> Result<(Position, String)> {
    let piece = position
        .piece_at(from)
        .ok_or(illegal(IllegalMoveReason::NoPiece))?;
    if piece.color != position.turn() {
        return Err(illegal(IllegalMoveReason::WrongSide));
    }

    if !position.pseudo_legal_from(from).iter().any(|mv| mv.to == to) {
        return Err(illegal(unreachable_reason(position, from, piece, to)));
    }

    let promoting = is_promotion_candidate(position, from, to);
    let mv = match (promoting, promotion) {
        (true, None) => return Err(illegal(IllegalMoveReason::PromotionRequired)),
        (true, Some(role)) if !role.is_promotion_choice() => {
            return Err(illegal(IllegalMoveReason::InvalidPromotion))
        }
        (false, Some(_)) => return Err(illegal(IllegalMoveReason::UnexpectedPromotion)),
        (_, promotion) => Move { from, to, promotion },
    };

    if !position.is_safe(&mv) {
        return Err(illegal(IllegalMoveReason::LeavesKingInCheck));
    }

    let next = position.play_unchecked(&mv);
    let san = san::write_san(position, &mv, &next);
    Ok((next, san))
}

/// Explains why `to` is not among the pseudo-legal targets of the piece.
fn unreachable_reason(position: &Position, from: Square, piece: Piece, to: Square) -> IllegalMoveReason {
    if position.piece_at(to).is_some_and(|p| p.color == piece.color) {
        return IllegalMoveReason::InvalidPattern;
    }

    let df = to.file() as i8 - from.file() as i8;
    let dr = to.rank() as i8 - from.rank() as i8;
    let straight = (df == 0) != (dr == 0);
    let diagonal = df != 0 && df.abs() == dr.abs();

    let on_pattern = match piece.role {
        Role::Rook => straight,
        Role::Bishop => diagonal,
        Role::Queen => straight || diagonal,
        Role::Pawn => {
            let dir = piece.color.pawn_direction();
            df == 0 && (dr == dir || (dr == 2 * dir && from.rank() == piece.color.pawn_rank()))
        }
        Role::Knight | Role::King => false,
    };

    if on_pattern {
        IllegalMoveReason::PathBlocked
    } else {
        IllegalMoveReason::InvalidPattern
    }
}
