//! Six-field FEN encoding of positions

use super::board::Board;
use super::position::Position;
use super::types::{CastlingRights, CastlingSide, Color, Piece, Role, Square};
use crate::error::{Error, Result};

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidEncoding(msg.into())
}

/// Parses a FEN string, rejecting anything this engine could not have produced
/// from a reachable position.
pub fn decode_position(text: &str) -> Result<Position> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() != 6 {
        return Err(invalid(format!("expected 6 fields, found {}", fields.len())));
    }

    let board = parse_board(fields[0])?;
    let turn = match fields[1] {
        "w" => Color::White,
        "b" => Color::Black,
        other => return Err(invalid(format!("bad side to move '{}'", other))),
    };
    let castling = parse_castling(fields[2], &board)?;
    let ep_square = parse_ep_square(fields[3], &board, turn)?;
    let halfmoves: u32 = fields[4]
        .parse()
        .map_err(|_| invalid(format!("bad half-move clock '{}'", fields[4])))?;
    let fullmoves: u32 = fields[5]
        .parse()
        .map_err(|_| invalid(format!("bad full-move number '{}'", fields[5])))?;
    if fullmoves == 0 {
        return Err(invalid("full-move number starts at 1"));
    }

    let position = Position::from_parts(board, turn, castling, ep_square, halfmoves, fullmoves);
    validate(&position)?;
    Ok(position)
}

fn parse_board(field: &str) -> Result<Board> {
    let ranks: Vec<&str> = field.split('/').collect();
    if ranks.len() != 8 {
        return Err(invalid(format!("expected 8 ranks, found {}", ranks.len())));
    }

    let mut board = Board::empty();
    for (i, rank_text) in ranks.iter().enumerate() {
        let rank = 7 - i as u8;
        let mut file: u8 = 0;
        let mut after_digit = false;

        for c in rank_text.chars() {
            if let Some(run) = c.to_digit(10) {
                if run == 0 || run > 8 || after_digit {
                    return Err(invalid(format!("bad empty-square count in rank '{}'", rank_text)));
                }
                file += run as u8;
                after_digit = true;
            } else {
                let piece = Piece::from_char(c)
                    .ok_or_else(|| invalid(format!("illegal piece letter '{}'", c)))?;
                if file >= 8 {
                    return Err(invalid(format!("rank '{}' is longer than 8 squares", rank_text)));
                }
                board.set(Square::new(file, rank), Some(piece));
                file += 1;
                after_digit = false;
            }
            if file > 8 {
                return Err(invalid(format!("rank '{}' is longer than 8 squares", rank_text)));
            }
        }

        if file != 8 {
            return Err(invalid(format!("rank '{}' does not cover 8 squares", rank_text)));
        }
    }
    Ok(board)
}

fn parse_castling(field: &str, board: &Board) -> Result<CastlingRights> {
    let mut rights = CastlingRights::none();
    if field == "-" {
        return Ok(rights);
    }

    for letter in field.chars() {
        let (color, side) = CastlingRights::from_letter(letter)
            .ok_or_else(|| invalid(format!("bad castling letter '{}'", letter)))?;
        if rights.has(color, side) {
            return Err(invalid(format!("duplicate castling letter '{}'", letter)));
        }
        if !castling_pieces_home(board, color, side) {
            return Err(invalid(format!(
                "castling right '{}' without king and rook on their home squares",
                letter
            )));
        }
        rights.set(color, side, true);
    }
    Ok(rights)
}

fn castling_pieces_home(board: &Board, color: Color, side: CastlingSide) -> bool {
    let rank = color.back_rank();
    board.piece_at(Square::new(4, rank)) == Some(Piece::new(color, Role::King))
        && board.piece_at(Square::new(side.rook_file(), rank)) == Some(Piece::new(color, Role::Rook))
}

fn parse_ep_square(field: &str, board: &Board, turn: Color) -> Result<Option<Square>> {
    if field == "-" {
        return Ok(None);
    }
    let square: Square = field
        .parse()
        .map_err(|_| invalid(format!("bad en-passant square '{}'", field)))?;

    // the side that just moved made the double push
    let pusher = turn.other();
    let dir = pusher.pawn_direction();
    let expected_rank = (pusher.pawn_rank() as i8 + dir) as u8;
    if square.rank() != expected_rank {
        return Err(invalid(format!("en-passant square '{}' on wrong rank", field)));
    }

    let pawn_square = square.offset(0, dir);
    let origin = square.offset(0, -dir);
    let pawn_in_place = pawn_square.and_then(|sq| board.piece_at(sq)) == Some(Piece::new(pusher, Role::Pawn));
    let passed_empty = board.piece_at(square).is_none()
        && origin.is_some_and(|sq| board.piece_at(sq).is_none());
    if !pawn_in_place || !passed_empty {
        return Err(invalid(format!("en-passant square '{}' has no double-pushed pawn", field)));
    }
    Ok(Some(square))
}

fn validate(position: &Position) -> Result<()> {
    let board = position.board();
    for color in Color::ALL {
        let kings = board
            .pieces()
            .filter(|(_, piece)| *piece == Piece::new(color, Role::King))
            .count();
        if kings != 1 {
            return Err(invalid(format!("{} has {} kings", color, kings)));
        }
    }

    if board
        .pieces()
        .any(|(sq, piece)| piece.role == Role::Pawn && (sq.rank() == 0 || sq.rank() == 7))
    {
        return Err(invalid("pawn on first or last rank"));
    }

    if position.king_attacked(position.turn().other()) {
        return Err(invalid("side not to move is in check"));
    }
    Ok(())
}

pub fn encode_position(position: &Position) -> String {
    let board = position.board();
    let mut out = String::with_capacity(90);

    for rank in (0..8u8).rev() {
        let mut empty = 0;
        for file in 0..8u8 {
            match board.piece_at(Square::new(file, rank)) {
                Some(piece) => {
                    if empty > 0 {
                        out.push_str(&empty.to_string());
                        empty = 0;
                    }
                    out.push(piece.char());
                }
                None => empty += 1,
            }
        }
        if empty > 0 {
            out.push_str(&empty.to_string());
        }
        if rank > 0 {
            out.push('/');
        }
    }

    let ep = position
        .ep_square()
        .map(|sq| sq.to_string())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{} {} {} {} {} {}",
        out,
        position.turn().char(),
        position.castling_rights().to_fen(),
        ep,
        position.halfmoves(),
        position.fullmoves()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::types::Move;

    fn assert_invalid(fen: &str) {
        match decode_position(fen) {
            Err(Error::InvalidEncoding(_)) => {}
            other => panic!("expected InvalidEncoding for {fen:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_starting_fen_round_trip() {
        let pos = decode_position(STARTING_FEN).unwrap();
        assert_eq!(pos, Position::starting());
        assert_eq!(encode_position(&pos), STARTING_FEN);
    }

    #[test]
    fn test_encode_after_moves() {
        let pos = Position::starting();
        let e4 = pos
            .play(&Move::new("e2".parse().unwrap(), "e4".parse().unwrap()))
            .unwrap();
        assert_eq!(
            encode_position(&e4),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
        );
        assert_eq!(decode_position(&encode_position(&e4)).unwrap(), e4);
    }

    #[test]
    fn test_round_trip_along_game() {
        let mut pos = Position::starting();
        for ply in 0..80 {
            let moves = pos.legal_moves();
            if moves.is_empty() {
                break;
            }
            pos = pos.play(&moves[(ply * 13 + 5) % moves.len()]).unwrap();
            assert_eq!(decode_position(&encode_position(&pos)).unwrap(), pos);
        }
    }

    #[test]
    fn test_agrees_with_shakmaty_formatting() {
        use shakmaty::{fen::Fen, CastlingMode, Chess, EnPassantMode};

        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let ours = encode_position(&decode_position(fen).unwrap());
        let chess: Chess = fen
            .parse::<Fen>()
            .unwrap()
            .into_position(CastlingMode::Standard)
            .unwrap();
        let theirs = Fen::from_position(&chess, EnPassantMode::Legal).to_string();
        assert_eq!(ours, theirs);
    }

    #[test]
    fn test_rejects_malformed_grids() {
        assert_invalid("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq - 0 1");
        assert_invalid("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR/8 w KQkq - 0 1");
        assert_invalid("rnbqkbnr/ppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        assert_invalid("rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        assert_invalid("rnbqkbnr/pppppppp/44/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        assert_invalid("rnbqkbnr/ppppxppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
    }

    #[test]
    fn test_rejects_bad_metadata() {
        assert_invalid("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1");
        assert_invalid("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR wb KQkq - 0 1");
        assert_invalid("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KKQkq - 0 1");
        assert_invalid("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e3 0 1");
        assert_invalid("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - x 1");
        assert_invalid("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 0");
        assert_invalid("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -");
    }

    #[test]
    fn test_rejects_impossible_castling_rights() {
        // white king already left e1
        assert_invalid("r3k2r/8/8/8/8/8/8/R4K1R w KQkq - 0 1");
        // black h-rook missing
        assert_invalid("r3k3/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
    }

    #[test]
    fn test_rejects_impossible_positions() {
        assert_invalid("8/8/8/8/8/8/8/4K3 w - - 0 1");
        assert_invalid("4k3/8/8/8/8/8/8/3KK3 w - - 0 1");
        assert_invalid("4k2P/8/8/8/8/8/8/4K3 w - - 0 1");
        // black in check with white to move
        assert_invalid("7k/8/8/8/8/8/8/4K2R w - - 0 1");
    }
}
