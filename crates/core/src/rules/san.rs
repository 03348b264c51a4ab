//! Standard algebraic notation

use super::position::Position;
use super::types::{CastlingSide, IllegalMoveReason, Move, Role, Square};
use crate::error::{Error, Result};

/// SAN for a legal `mv` played from `before`, with `after` the resulting position.
pub(crate) fn write_san(before: &Position, mv: &Move, after: &Position) -> String {
    let Some(piece) = before.piece_at(mv.from) else {
        return mv.to_string();
    };
    let mut san = String::new();
    let file_delta = mv.to.file() as i8 - mv.from.file() as i8;

    if piece.role == Role::King && file_delta.abs() == 2 {
        san.push_str(if file_delta > 0 { "O-O" } else { "O-O-O" });
    } else if piece.role == Role::Pawn {
        if file_delta != 0 {
            san.push(mv.from.file_char());
            san.push('x');
        }
        san.push_str(&mv.to.to_string());
        if let Some(role) = mv.promotion {
            san.push('=');
            san.push(role.upper_char());
        }
    } else {
        san.push(piece.role.upper_char());
        push_disambiguation(&mut san, before, mv);
        if before.piece_at(mv.to).is_some() {
            san.push('x');
        }
        san.push_str(&mv.to.to_string());
    }

    if after.is_check() {
        san.push(if after.has_legal_move() { '+' } else { '#' });
    }
    san
}

/// SAN for a legal move, computing the resulting position itself.
pub fn to_san(position: &Position, mv: &Move) -> String {
    let after = position.play_unchecked(mv);
    write_san(position, mv, &after)
}

fn push_disambiguation(san: &mut String, before: &Position, mv: &Move) {
    let piece = before.piece_at(mv.from);
    let rivals: Vec<Square> = before
        .legal_moves()
        .into_iter()
        .filter(|other| other.to == mv.to && other.from != mv.from)
        .filter(|other| before.piece_at(other.from) == piece)
        .map(|other| other.from)
        .collect();

    if rivals.is_empty() {
        return;
    }
    let shares_file = rivals.iter().any(|sq| sq.file() == mv.from.file());
    let shares_rank = rivals.iter().any(|sq| sq.rank() == mv.from.rank());
    if !shares_file {
        san.push(mv.from.file_char());
    } else if !shares_rank {
        san.push(mv.from.rank_char());
    } else {
        san.push(mv.from.file_char());
        san.push(mv.from.rank_char());
    }
}

/// Resolves a SAN string (`Nbd7`, `exd6`, `e8=Q+`, `O-O`) to a legal move.
pub fn parse_san(position: &Position, text: &str) -> Result<Move> {
    let bad = || Error::InvalidSan(text.to_string());
    let trimmed = text
        .trim()
        .trim_end_matches(|c: char| matches!(c, '+' | '#' | '!' | '?'));
    if trimmed.is_empty() {
        return Err(bad());
    }

    let legal = position.legal_moves();

    let castle = match trimmed {
        "O-O" | "0-0" => Some(CastlingSide::KingSide),
        "O-O-O" | "0-0-0" => Some(CastlingSide::QueenSide),
        _ => None,
    };
    if let Some(side) = castle {
        let rank = position.turn().back_rank();
        let from = Square::new(4, rank);
        let to = Square::new(side.king_to_file(), rank);
        return legal
            .into_iter()
            .find(|mv| {
                mv.from == from
                    && mv.to == to
                    && position.piece_at(from).map(|p| p.role) == Some(Role::King)
            })
            .ok_or(Error::IllegalMove(IllegalMoveReason::InvalidPattern));
    }

    let (body, promotion) = split_promotion(trimmed).ok_or_else(bad)?;
    let mut chars: Vec<char> = body.chars().collect();

    let role = match chars.first() {
        Some(c) if c.is_ascii_uppercase() => {
            let role = Role::from_char(*c)
                .filter(|r| *r != Role::Pawn)
                .ok_or_else(bad)?;
            chars.remove(0);
            role
        }
        _ => Role::Pawn,
    };
    if chars.len() < 2 {
        return Err(bad());
    }

    let dest: String = chars[chars.len() - 2..].iter().collect();
    let to: Square = dest.parse().map_err(|_| bad())?;

    let mut from_file = None;
    let mut from_rank = None;
    for c in &chars[..chars.len() - 2] {
        match c {
            'a'..='h' => from_file = Some(*c as u8 - b'a'),
            '1'..='8' => from_rank = Some(*c as u8 - b'1'),
            'x' | ':' | '-' => {}
            _ => return Err(bad()),
        }
    }

    let candidates: Vec<Move> = legal
        .into_iter()
        .filter(|mv| mv.to == to && mv.promotion == promotion)
        .filter(|mv| position.piece_at(mv.from).map(|p| p.role) == Some(role))
        .filter(|mv| from_file.map_or(true, |f| mv.from.file() == f))
        .filter(|mv| from_rank.map_or(true, |r| mv.from.rank() == r))
        .collect();

    match candidates.as_slice() {
        [mv] => Ok(*mv),
        [] if role == Role::Pawn
            && promotion.is_none()
            && to.rank() == position.turn().promotion_rank() =>
        {
            Err(Error::IllegalMove(IllegalMoveReason::PromotionRequired))
        }
        [] => Err(Error::IllegalMove(IllegalMoveReason::InvalidPattern)),
        _ => Err(Error::InvalidSan(format!("ambiguous move '{}'", text))),
    }
}

/// Splits a trailing `=Q` (or bare `Q`) promotion suffix off a SAN body.
fn split_promotion(body: &str) -> Option<(&str, Option<Role>)> {
    if let Some((head, role)) = body.split_once('=') {
        let mut chars = role.chars();
        return match (chars.next().and_then(Role::from_char), chars.next()) {
            (Some(role), None) => Some((head, Some(role))),
            _ => None,
        };
    }
    match body.chars().last() {
        Some(c @ ('Q' | 'R' | 'B' | 'N')) if body.len() > 2 => {
            Some((&body[..body.len() - 1], Role::from_char(c)))
        }
        _ => Some((body, None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play_san(position: &Position, san: &str) -> (Position, String) {
        let mv = parse_san(position, san).unwrap();
        let written = to_san(position, &mv);
        (position.play(&mv).unwrap(), written)
    }

    #[test]
    fn test_scholars_mate_notation() {
        let mut pos = Position::starting();
        let mut written = Vec::new();
        for san in ["e4", "e5", "Qh5", "Nc6", "Bc4", "Nf6", "Qxf7"] {
            let (next, text) = play_san(&pos, san);
            written.push(text);
            pos = next;
        }
        assert_eq!(written, ["e4", "e5", "Qh5", "Nc6", "Bc4", "Nf6", "Qxf7#"]);
    }

    #[test]
    fn test_check_suffix() {
        let pos: Position = "4k3/8/8/8/8/8/8/R3K3 w - - 0 1".parse().unwrap();
        let (_, text) = play_san(&pos, "Ra8");
        assert_eq!(text, "Ra8+");
    }

    #[test]
    fn test_file_disambiguation() {
        let pos: Position = "4k3/8/8/8/8/8/8/1N2KN2 w - - 0 1".parse().unwrap();
        let (_, text) = play_san(&pos, "Nbd2");
        assert_eq!(text, "Nbd2");
        assert!(matches!(parse_san(&pos, "Nd2"), Err(Error::InvalidSan(_))));
    }

    #[test]
    fn test_rank_disambiguation() {
        let pos: Position = "4k3/8/8/R7/8/8/8/R3K3 w - - 0 1".parse().unwrap();
        let (_, text) = play_san(&pos, "R1a3");
        assert_eq!(text, "R1a3");
    }

    #[test]
    fn test_pawn_capture_and_en_passant() {
        let pos: Position = "4k3/8/8/3Pp3/8/8/8/4K3 w - e6 0 1".parse().unwrap();
        let (next, text) = play_san(&pos, "dxe6");
        assert_eq!(text, "dxe6");
        assert_eq!(next.piece_at("e5".parse().unwrap()), None);
    }

    #[test]
    fn test_promotion_notation() {
        let pos: Position = "k7/4P3/8/8/8/8/8/4K3 w - - 0 1".parse().unwrap();
        let (_, text) = play_san(&pos, "e8=Q");
        assert_eq!(text, "e8=Q+");
        let (_, text) = play_san(&pos, "e8N");
        assert_eq!(text, "e8=N");
        assert!(matches!(
            parse_san(&pos, "e8"),
            Err(Error::IllegalMove(IllegalMoveReason::PromotionRequired))
        ));
    }

    #[test]
    fn test_castling_notation() {
        let pos: Position = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1".parse().unwrap();
        let (next, text) = play_san(&pos, "O-O");
        assert_eq!(text, "O-O");
        let (_, text) = play_san(&next, "O-O-O");
        assert_eq!(text, "O-O-O");
    }

    #[test]
    fn test_rejects_garbage() {
        let pos = Position::starting();
        assert!(matches!(parse_san(&pos, ""), Err(Error::InvalidSan(_))));
        assert!(matches!(parse_san(&pos, "Zz9"), Err(Error::InvalidSan(_))));
        assert!(matches!(
            parse_san(&pos, "e5"),
            Err(Error::IllegalMove(IllegalMoveReason::InvalidPattern))
        ));
    }
}
