//! Piece placement and attack detection

use super::types::{Color, Piece, Role, Square};

pub(crate) const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

pub(crate) const KING_OFFSETS: [(i8, i8); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

pub(crate) const ROOK_DIRECTIONS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
pub(crate) const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

const BACK_RANK: [Role; 8] = [
    Role::Rook,
    Role::Knight,
    Role::Bishop,
    Role::Queen,
    Role::King,
    Role::Bishop,
    Role::Knight,
    Role::Rook,
];

/// 8×8 mailbox, indexed by `Square::index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    squares: [Option<Piece>; 64],
}

impl Board {
    pub fn empty() -> Board {
        Board {
            squares: [None; 64],
        }
    }

    pub fn standard() -> Board {
        let mut board = Board::empty();
        for color in Color::ALL {
            for (file, role) in BACK_RANK.iter().enumerate() {
                board.set(
                    Square::new(file as u8, color.back_rank()),
                    Some(Piece::new(color, *role)),
                );
                board.set(
                    Square::new(file as u8, color.pawn_rank()),
                    Some(Piece::new(color, Role::Pawn)),
                );
            }
        }
        board
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.squares[square.index()]
    }

    pub(crate) fn set(&mut self, square: Square, piece: Option<Piece>) {
        self.squares[square.index()] = piece;
    }

    pub(crate) fn take(&mut self, square: Square) -> Option<Piece> {
        self.squares[square.index()].take()
    }

    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| self.piece_at(sq).map(|piece| (sq, piece)))
    }

    pub fn count(&self) -> usize {
        self.squares.iter().filter(|s| s.is_some()).count()
    }

    pub fn king_of(&self, color: Color) -> Option<Square> {
        let king = Piece::new(color, Role::King);
        self.pieces()
            .find(|(_, piece)| *piece == king)
            .map(|(sq, _)| sq)
    }

    /// First occupied square walking from `from` (exclusive) in a direction.
    pub(crate) fn first_blocker(&self, from: Square, (df, dr): (i8, i8)) -> Option<(Square, Piece)> {
        let mut current = from;
        while let Some(next) = current.offset(df, dr) {
            if let Some(piece) = self.piece_at(next) {
                return Some((next, piece));
            }
            current = next;
        }
        None
    }

    /// True iff any piece of color `by` attacks `target`.
    pub fn is_attacked(&self, target: Square, by: Color) -> bool {
        let holds = |sq: Option<Square>, role: Role| {
            sq.and_then(|sq| self.piece_at(sq)) == Some(Piece::new(by, role))
        };

        // a pawn of `by` attacks diagonally forward, so look one rank behind the target
        let behind = -by.pawn_direction();
        if holds(target.offset(-1, behind), Role::Pawn) || holds(target.offset(1, behind), Role::Pawn) {
            return true;
        }

        if KNIGHT_OFFSETS
            .iter()
            .any(|(df, dr)| holds(target.offset(*df, *dr), Role::Knight))
        {
            return true;
        }

        if KING_OFFSETS
            .iter()
            .any(|(df, dr)| holds(target.offset(*df, *dr), Role::King))
        {
            return true;
        }

        let slider_hits = |directions: &[(i8, i8)], role: Role| {
            directions.iter().any(|dir| {
                matches!(
                    self.first_blocker(target, *dir),
                    Some((_, piece)) if piece.color == by && (piece.role == role || piece.role == Role::Queen)
                )
            })
        };

        slider_hits(&ROOK_DIRECTIONS, Role::Rook) || slider_hits(&BISHOP_DIRECTIONS, Role::Bishop)
    }
}
