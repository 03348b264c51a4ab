//! Position value and legal move generation
//!
//! Generation is two-phase: pseudo-legal moves per piece type, then a filter
//! that plays each move on a copy and rejects it if the mover's king is
//! attacked afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::board::{Board, BISHOP_DIRECTIONS, KING_OFFSETS, KNIGHT_OFFSETS, ROOK_DIRECTIONS};
use super::fen;
use super::types::{CastlingRights, CastlingSide, Color, IllegalMoveReason, Move, Piece, Role, Square};
use crate::error::{Error, Result};

/// Complete game state needed to resume play.
///
/// Positions are values: playing a move returns a new `Position`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Position {
    board: Board,
    turn: Color,
    castling: CastlingRights,
    ep_square: Option<Square>,
    halfmoves: u32,
    fullmoves: u32,
}

impl Default for Position {
    fn default() -> Self {
        Position::starting()
    }
}

impl Position {
    pub fn starting() -> Position {
        Position {
            board: Board::standard(),
            turn: Color::White,
            castling: CastlingRights::all(),
            ep_square: None,
            halfmoves: 0,
            fullmoves: 1,
        }
    }

    pub(crate) fn from_parts(
        board: Board,
        turn: Color,
        castling: CastlingRights,
        ep_square: Option<Square>,
        halfmoves: u32,
        fullmoves: u32,
    ) -> Position {
        Position {
            board,
            turn,
            castling,
            ep_square,
            halfmoves,
            fullmoves,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn castling_rights(&self) -> CastlingRights {
        self.castling
    }

    pub fn ep_square(&self) -> Option<Square> {
        self.ep_square
    }

    /// Plies since the last capture or pawn move.
    pub fn halfmoves(&self) -> u32 {
        self.halfmoves
    }

    pub fn fullmoves(&self) -> u32 {
        self.fullmoves
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.board.piece_at(square)
    }

    /// Is the side to move in check?
    pub fn is_check(&self) -> bool {
        self.king_attacked(self.turn)
    }

    pub(crate) fn king_attacked(&self, color: Color) -> bool {
        self.board
            .king_of(color)
            .is_some_and(|king| self.board.is_attacked(king, color.other()))
    }

    /// Moves that follow the piece's pattern from `from`, ignoring own-king safety.
    pub(crate) fn pseudo_legal_from(&self, from: Square) -> Vec<Move> {
        let mut moves = Vec::new();
        if let Some(piece) = self.board.piece_at(from) {
            self.push_pseudo_legal(from, piece, &mut moves);
        }
        moves
    }

    fn push_pseudo_legal(&self, from: Square, piece: Piece, moves: &mut Vec<Move>) {
        match piece.role {
            Role::Pawn => self.push_pawn_moves(from, piece.color, moves),
            Role::Knight => self.push_steps(from, piece.color, &KNIGHT_OFFSETS, moves),
            Role::Bishop => self.push_slides(from, piece.color, &BISHOP_DIRECTIONS, moves),
            Role::Rook => self.push_slides(from, piece.color, &ROOK_DIRECTIONS, moves),
            Role::Queen => {
                self.push_slides(from, piece.color, &ROOK_DIRECTIONS, moves);
                self.push_slides(from, piece.color, &BISHOP_DIRECTIONS, moves);
            }
            Role::King => {
                self.push_steps(from, piece.color, &KING_OFFSETS, moves);
                self.push_castles(from, piece.color, moves);
            }
        }
    }

    fn push_steps(&self, from: Square, color: Color, offsets: &[(i8, i8)], moves: &mut Vec<Move>) {
        for (df, dr) in offsets {
            if let Some(to) = from.offset(*df, *dr) {
                if self.board.piece_at(to).map_or(true, |p| p.color != color) {
                    moves.push(Move::new(from, to));
                }
            }
        }
    }

    fn push_slides(&self, from: Square, color: Color, directions: &[(i8, i8)], moves: &mut Vec<Move>) {
        for (df, dr) in directions {
            let mut current = from;
            while let Some(to) = current.offset(*df, *dr) {
                match self.board.piece_at(to) {
                    None => moves.push(Move::new(from, to)),
                    Some(piece) => {
                        if piece.color != color {
                            moves.push(Move::new(from, to));
                        }
                        break;
                    }
                }
                current = to;
            }
        }
    }

    fn push_pawn_moves(&self, from: Square, color: Color, moves: &mut Vec<Move>) {
        let dir = color.pawn_direction();

        if let Some(one) = from.offset(0, dir) {
            if self.board.piece_at(one).is_none() {
                push_pawn_move(from, one, color, moves);
                if from.rank() == color.pawn_rank() {
                    if let Some(two) = one.offset(0, dir) {
                        if self.board.piece_at(two).is_none() {
                            moves.push(Move::new(from, two));
                        }
                    }
                }
            }
        }

        for df in [-1, 1] {
            if let Some(to) = from.offset(df, dir) {
                match self.board.piece_at(to) {
                    Some(target) if target.color != color => push_pawn_move(from, to, color, moves),
                    None if self.ep_square == Some(to) => moves.push(Move::new(from, to)),
                    _ => {}
                }
            }
        }
    }

    fn push_castles(&self, from: Square, color: Color, moves: &mut Vec<Move>) {
        let rank = color.back_rank();
        if from != Square::new(4, rank) {
            return;
        }
        let enemy = color.other();

        for side in CastlingSide::ALL {
            if !self.castling.has(color, side) {
                continue;
            }
            let rook_home = Square::new(side.rook_file(), rank);
            if self.board.piece_at(rook_home) != Some(Piece::new(color, Role::Rook)) {
                continue;
            }
            if side
                .between_files()
                .iter()
                .any(|file| self.board.piece_at(Square::new(*file, rank)).is_some())
            {
                continue;
            }
            if side
                .king_path_files()
                .iter()
                .any(|file| self.board.is_attacked(Square::new(*file, rank), enemy))
            {
                continue;
            }
            moves.push(Move::new(from, Square::new(side.king_to_file(), rank)));
        }
    }

    /// Would `mv` leave the mover's own king safe?
    pub(crate) fn is_safe(&self, mv: &Move) -> bool {
        !self.play_unchecked(mv).king_attacked(self.turn)
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        for (from, piece) in self.board.pieces() {
            if piece.color == self.turn {
                self.push_pseudo_legal(from, piece, &mut moves);
            }
        }
        moves.retain(|mv| self.is_safe(mv));
        moves
    }

    /// Legal moves of the piece on `from`; empty if it is not the side to move.
    pub fn legal_moves_from(&self, from: Square) -> Vec<Move> {
        match self.board.piece_at(from) {
            Some(piece) if piece.color == self.turn => {
                let mut moves = self.pseudo_legal_from(from);
                moves.retain(|mv| self.is_safe(mv));
                moves
            }
            _ => Vec::new(),
        }
    }

    pub fn has_legal_move(&self) -> bool {
        self.board
            .pieces()
            .filter(|(_, piece)| piece.color == self.turn)
            .any(|(from, _)| self.pseudo_legal_from(from).iter().any(|mv| self.is_safe(mv)))
    }

    pub fn is_legal(&self, mv: &Move) -> bool {
        self.legal_moves_from(mv.from).contains(mv)
    }

    /// Plays a legal move, returning the resulting position.
    pub fn play(&self, mv: &Move) -> Result<Position> {
        if self.is_legal(mv) {
            Ok(self.play_unchecked(mv))
        } else {
            Err(Error::IllegalMove(IllegalMoveReason::InvalidPattern))
        }
    }

    /// Applies a generated move without validating it.
    pub(crate) fn play_unchecked(&self, mv: &Move) -> Position {
        let mut next = self.clone();
        let Some(piece) = next.board.take(mv.from) else {
            return next;
        };

        let captured = next.board.take(mv.to);
        let mut is_capture = captured.is_some();

        let is_ep_capture = piece.role == Role::Pawn
            && captured.is_none()
            && mv.from.file() != mv.to.file()
            && self.ep_square == Some(mv.to);
        if is_ep_capture {
            next.board.take(Square::new(mv.to.file(), mv.from.rank()));
            is_capture = true;
        }

        let file_delta = mv.to.file() as i8 - mv.from.file() as i8;
        if piece.role == Role::King && file_delta.abs() == 2 {
            let side = if file_delta > 0 {
                CastlingSide::KingSide
            } else {
                CastlingSide::QueenSide
            };
            let rank = mv.from.rank();
            let rook = next.board.take(Square::new(side.rook_file(), rank));
            next.board.set(Square::new(side.rook_to_file(), rank), rook);
        }

        let placed = match mv.promotion {
            Some(role) if piece.role == Role::Pawn => Piece::new(piece.color, role),
            _ => piece,
        };
        next.board.set(mv.to, Some(placed));

        if piece.role == Role::King {
            next.castling.clear_color(piece.color);
        }
        next.castling.discard_rook_square(mv.from);
        next.castling.discard_rook_square(mv.to);

        let rank_delta = mv.to.rank() as i8 - mv.from.rank() as i8;
        next.ep_square = if piece.role == Role::Pawn && rank_delta.abs() == 2 {
            Some(Square::new(mv.from.file(), (mv.from.rank() + mv.to.rank()) / 2))
        } else {
            None
        };

        next.halfmoves = if piece.role == Role::Pawn || is_capture {
            0
        } else {
            self.halfmoves + 1
        };
        if piece.color == Color::Black {
            next.fullmoves = self.fullmoves + 1;
        }
        next.turn = self.turn.other();
        next
    }
}

fn push_pawn_move(from: Square, to: Square, color: Color, moves: &mut Vec<Move>) {
    if to.rank() == color.promotion_rank() {
        for role in Role::PROMOTIONS {
            moves.push(Move::with_promotion(from, to, role));
        }
    } else {
        moves.push(Move::new(from, to));
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&fen::encode_position(self))
    }
}

impl FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        fen::decode_position(s)
    }
}

impl TryFrom<String> for Position {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Position> for String {
    fn from(position: Position) -> String {
        position.to_string()
    }
}
