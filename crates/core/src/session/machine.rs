//! Match lifecycle
//!
//! ```text
//! waiting --join--> active --move/resign/draw--> finished
//!                      \--------abandon-------> abandoned
//! ```
//!
//! Every transition returns a new [`Session`]; the input is never modified.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};
use crate::rules::{self, Color, Outcome, Position, Role, RulesConfig, Square};

pub type PlayerId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Waiting,
    Active,
    Finished,
    Abandoned,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Waiting => "waiting",
            Status::Active => "active",
            Status::Finished => "finished",
            Status::Abandoned => "abandoned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Finished | Status::Abandoned)
    }

    /// The only edges of the lifecycle graph.
    pub fn can_become(self, next: Status) -> bool {
        matches!(
            (self, next),
            (Status::Waiting, Status::Active)
                | (Status::Active, Status::Finished)
                | (Status::Active, Status::Abandoned)
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "waiting" => Ok(Status::Waiting),
            "active" => Ok(Status::Active),
            "finished" => Ok(Status::Finished),
            "abandoned" => Ok(Status::Abandoned),
            other => Err(Error::InvalidEncoding(format!("unknown status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    White,
    Black,
    Draw,
}

impl Winner {
    pub fn as_str(&self) -> &'static str {
        match self {
            Winner::White => "white",
            Winner::Black => "black",
            Winner::Draw => "draw",
        }
    }
}

impl From<Color> for Winner {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Winner::White,
            Color::Black => Winner::Black,
        }
    }
}

impl FromStr for Winner {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "white" => Ok(Winner::White),
            "black" => Ok(Winner::Black),
            "draw" => Ok(Winner::Draw),
            other => Err(Error::InvalidEncoding(format!("unknown winner '{}'", other))),
        }
    }
}

/// Caller-driven ways to end an active game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// The acting player resigns; the opponent wins.
    Resign,
    AgreedDraw,
    /// The acting player walks away; the opponent is credited.
    Abandon,
    /// Direct status/winner update, still limited to participants.
    Override {
        status: Status,
        winner: Option<Winner>,
    },
}

/// One match between two players.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    id: String,
    white: PlayerId,
    black: Option<PlayerId>,
    position: Position,
    status: Status,
    winner: Option<Winner>,
    history: Vec<String>,
    version: u64,
    created_at: u64,
    updated_at: u64,
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl Session {
    /// New waiting game with `initiator` as white.
    pub fn create(id: impl Into<String>, initiator: impl Into<PlayerId>) -> Session {
        let timestamp = now();
        Session {
            id: id.into(),
            white: initiator.into(),
            black: None,
            position: Position::starting(),
            status: Status::Waiting,
            winner: None,
            history: Vec::new(),
            version: 0,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Rebuilds a stored session without running any transition.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        id: String,
        white: PlayerId,
        black: Option<PlayerId>,
        position: Position,
        status: Status,
        winner: Option<Winner>,
        history: Vec<String>,
        version: u64,
        created_at: u64,
        updated_at: u64,
    ) -> Session {
        Session {
            id,
            white,
            black,
            position,
            status,
            winner,
            history,
            version,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn white(&self) -> &str {
        &self.white
    }

    pub fn black(&self) -> Option<&str> {
        self.black.as_deref()
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    /// SAN moves in the order they were played.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn updated_at(&self) -> u64 {
        self.updated_at
    }

    pub fn is_participant(&self, player: &str) -> bool {
        self.white == player || self.black.as_deref() == Some(player)
    }

    pub fn color_of(&self, player: &str) -> Option<Color> {
        if self.white == player {
            Some(Color::White)
        } else if self.black.as_deref() == Some(player) {
            Some(Color::Black)
        } else {
            None
        }
    }

    /// Outsiders may look at a game only while it is open for joining.
    pub fn can_read(&self, reader: &str) -> bool {
        self.status == Status::Waiting || self.is_participant(reader)
    }

    /// Outcome under the default rules.
    pub fn outcome(&self) -> Outcome {
        self.outcome_with(&RulesConfig::default())
    }

    /// Outcome of the current position, repetition over the history included.
    pub fn outcome_with(&self, config: &RulesConfig) -> Outcome {
        let outcome = rules::game_outcome_with(&self.position, config);
        if outcome == Outcome::InProgress && config.repetition && self.is_repetition() {
            return Outcome::Draw {
                reason: rules::DrawReason::Repetition,
            };
        }
        outcome
    }

    /// Next version of this session with the bookkeeping fields advanced.
    fn successor(&self) -> Session {
        let mut next = self.clone();
        next.version = self.version + 1;
        next.updated_at = now().max(self.updated_at);
        next
    }

    fn transition(&self, next: Status) -> Result<Session> {
        if !self.status.can_become(next) {
            return Err(Error::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        let mut session = self.successor();
        session.status = next;
        Ok(session)
    }

    pub fn join(&self, joiner: &str) -> Result<Session> {
        if self.black.is_some() {
            return Err(Error::AlreadyFull);
        }
        if self.status != Status::Waiting {
            return Err(Error::WrongStatus(self.status));
        }
        if self.white == joiner {
            return Err(Error::SelfJoin);
        }
        let mut session = self.transition(Status::Active)?;
        session.black = Some(joiner.to_string());
        Ok(session)
    }

    /// Color `actor` would move with, if they may move right now.
    pub fn mover_color(&self, actor: &str) -> Result<Color> {
        let color = self.color_of(actor).ok_or(Error::NotAParticipant)?;
        if self.status != Status::Active {
            return Err(Error::WrongStatus(self.status));
        }
        if color != self.position.turn() {
            return Err(Error::NotYourTurn);
        }
        Ok(color)
    }

    pub fn attempt_move(
        &self,
        actor: &str,
        from: Square,
        to: Square,
        promotion: Option<Role>,
    ) -> Result<Session> {
        self.attempt_move_with(actor, from, to, promotion, &RulesConfig::default())
    }

    pub fn attempt_move_with(
        &self,
        actor: &str,
        from: Square,
        to: Square,
        promotion: Option<Role>,
        config: &RulesConfig,
    ) -> Result<Session> {
        self.mover_color(actor)?;
        let (position, san) = rules::apply_move(&self.position, from, to, promotion)?;

        let mut session = self.successor();
        session.position = position;
        session.history.push(san);

        match session.outcome_with(config) {
            Outcome::InProgress => {}
            Outcome::Checkmate { winner } => {
                session.status = Status::Finished;
                session.winner = Some(winner.into());
            }
            Outcome::Stalemate | Outcome::Draw { .. } => {
                session.status = Status::Finished;
                session.winner = Some(Winner::Draw);
            }
        }
        Ok(session)
    }

    /// Positions after each move, starting with the initial one.
    pub fn replay(&self) -> Result<Vec<Position>> {
        let mut positions = Vec::with_capacity(self.history.len() + 1);
        let mut position = Position::starting();
        positions.push(position.clone());
        for san in &self.history {
            let mv = rules::parse_san(&position, san)?;
            position = position.play_unchecked(&mv);
            positions.push(position.clone());
        }
        Ok(positions)
    }

    /// Only positions since the last pawn move or capture can recur, and a
    /// third occurrence needs at least eight plies.
    fn is_repetition(&self) -> bool {
        let window = self.position.halfmoves() as usize;
        if window < 8 {
            return false;
        }
        match self.replay() {
            Ok(positions) => {
                let start = positions.len().saturating_sub(window + 1);
                rules::is_threefold_repetition(&positions[start..])
            }
            Err(e) => {
                tracing::warn!(game_id = %self.id, error = %e, "history does not replay; skipping repetition check");
                false
            }
        }
    }

    /// Manual termination: resignation, agreed draw, abandonment or a direct override.
    pub fn set_outcome(&self, actor: &str, termination: Termination) -> Result<Session> {
        let color = self.color_of(actor).ok_or(Error::NotAParticipant)?;
        if self.status != Status::Active {
            return Err(Error::WrongStatus(self.status));
        }

        let (status, winner) = match termination {
            Termination::Resign => (Status::Finished, Some(Winner::from(color.other()))),
            Termination::AgreedDraw => (Status::Finished, Some(Winner::Draw)),
            Termination::Abandon => (Status::Abandoned, Some(Winner::from(color.other()))),
            Termination::Override { status, winner } => (status, winner),
        };

        let mut session = self.transition(status)?;
        session.winner = winner;
        Ok(session)
    }

    /// History as numbered move pairs: `1. e4 e5 2. Nf3`.
    pub fn numbered_history(&self) -> String {
        self.history
            .chunks(2)
            .enumerate()
            .map(|(i, pair)| format!("{}. {}", i + 1, pair.join(" ")))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::IllegalMoveReason;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn active() -> Session {
        Session::create("g1", "alice").join("bob").unwrap()
    }

    fn play(session: &Session, actor: &str, from: &str, to: &str) -> Session {
        session.attempt_move(actor, sq(from), sq(to), None).unwrap()
    }

    #[test]
    fn test_create() {
        let s = Session::create("g1", "alice");
        assert_eq!(s.white(), "alice");
        assert_eq!(s.black(), None);
        assert_eq!(s.status(), Status::Waiting);
        assert_eq!(s.position(), &Position::starting());
        assert!(s.history().is_empty());
        assert_eq!(s.version(), 0);
    }

    #[test]
    fn test_join() {
        let waiting = Session::create("g1", "alice");
        let s = waiting.join("bob").unwrap();
        assert_eq!(s.black(), Some("bob"));
        assert_eq!(s.status(), Status::Active);
        assert_eq!(s.version(), 1);
        // input session is unchanged
        assert_eq!(waiting.status(), Status::Waiting);
    }

    #[test]
    fn test_join_failures() {
        let waiting = Session::create("g1", "alice");
        assert!(matches!(waiting.join("alice"), Err(Error::SelfJoin)));

        let full = waiting.join("bob").unwrap();
        assert!(matches!(full.join("carol"), Err(Error::AlreadyFull)));
        assert!(matches!(full.join("bob"), Err(Error::AlreadyFull)));
        let resigned = full.set_outcome("alice", Termination::Resign).unwrap();
        assert!(matches!(resigned.join("carol"), Err(Error::AlreadyFull)));

        // black set while still waiting, as a store might hand back
        let mut odd = waiting.clone();
        odd.black = Some("bob".to_string());
        assert!(matches!(odd.join("carol"), Err(Error::AlreadyFull)));
    }

    #[test]
    fn test_moves_alternate() {
        let s = active();
        let s = play(&s, "alice", "e2", "e4");
        assert_eq!(s.position().turn(), Color::Black);
        let s = play(&s, "bob", "e7", "e5");
        assert_eq!(s.position().turn(), Color::White);
        assert_eq!(s.history(), ["e4", "e5"]);
        assert_eq!(s.version(), 3);
    }

    #[test]
    fn test_move_failures() {
        let s = active();
        assert!(matches!(
            s.attempt_move("mallory", sq("e2"), sq("e4"), None),
            Err(Error::NotAParticipant)
        ));
        assert!(matches!(
            s.attempt_move("bob", sq("e7"), sq("e5"), None),
            Err(Error::NotYourTurn)
        ));
        assert!(matches!(
            s.attempt_move("alice", sq("e2"), sq("e5"), None),
            Err(Error::IllegalMove(IllegalMoveReason::InvalidPattern))
        ));

        let waiting = Session::create("g2", "alice");
        assert!(matches!(
            waiting.attempt_move("alice", sq("e2"), sq("e4"), None),
            Err(Error::WrongStatus(Status::Waiting))
        ));
    }

    #[test]
    fn test_checkmate_finishes_game() {
        let mut s = active();
        let moves = [
            ("alice", "e2", "e4"),
            ("bob", "e7", "e5"),
            ("alice", "d1", "h5"),
            ("bob", "b8", "c6"),
            ("alice", "f1", "c4"),
            ("bob", "g8", "f6"),
            ("alice", "h5", "f7"),
        ];
        for (actor, from, to) in moves {
            s = play(&s, actor, from, to);
        }
        assert_eq!(s.status(), Status::Finished);
        assert_eq!(s.winner(), Some(Winner::White));
        assert_eq!(s.history().last().map(String::as_str), Some("Qxf7#"));
        assert!(matches!(
            s.attempt_move("bob", sq("e8"), sq("e7"), None),
            Err(Error::WrongStatus(Status::Finished))
        ));
    }

    #[test]
    fn test_repetition_finishes_game_as_draw() {
        let mut s = active();
        let shuffle = [
            ("alice", "g1", "f3"),
            ("bob", "g8", "f6"),
            ("alice", "f3", "g1"),
            ("bob", "f6", "g8"),
        ];
        for _ in 0..2 {
            for (actor, from, to) in shuffle {
                s = play(&s, actor, from, to);
            }
        }
        assert_eq!(s.status(), Status::Finished);
        assert_eq!(s.winner(), Some(Winner::Draw));

        let mut strict = active();
        for _ in 0..2 {
            for (actor, from, to) in shuffle {
                strict = strict
                    .attempt_move_with(actor, sq(from), sq(to), None, &RulesConfig::strict())
                    .unwrap();
            }
        }
        assert_eq!(strict.status(), Status::Active);
    }

    #[test]
    fn test_outcome_reports_repetition_draw() {
        let mut s = active();
        for _ in 0..2 {
            for (actor, from, to) in [
                ("alice", "g1", "f3"),
                ("bob", "g8", "f6"),
                ("alice", "f3", "g1"),
                ("bob", "f6", "g8"),
            ] {
                s = play(&s, actor, from, to);
            }
        }
        assert_eq!(s.status(), Status::Finished);
        assert_eq!(
            s.outcome(),
            Outcome::Draw {
                reason: rules::DrawReason::Repetition
            }
        );
        assert_eq!(s.outcome_with(&RulesConfig::strict()), Outcome::InProgress);
    }

    #[test]
    fn test_repetition_after_pawn_moves() {
        let mut s = active();
        s = play(&s, "alice", "e2", "e4");
        s = play(&s, "bob", "e7", "e5");
        for round in 0..2 {
            for (actor, from, to) in [
                ("alice", "g1", "f3"),
                ("bob", "g8", "f6"),
                ("alice", "f3", "g1"),
                ("bob", "f6", "g8"),
            ] {
                assert_eq!(s.status(), Status::Active, "round {round}");
                s = play(&s, actor, from, to);
            }
        }
        assert_eq!(s.position().halfmoves(), 8);
        assert_eq!(s.status(), Status::Finished);
        assert_eq!(s.winner(), Some(Winner::Draw));
    }

    #[test]
    fn test_outcome_follows_rules_config() {
        let position: Position = "4k3/8/8/8/8/8/8/R3K3 w - - 100 80".parse().unwrap();
        let s = Session::restore(
            "g1".to_string(),
            "alice".to_string(),
            Some("bob".to_string()),
            position,
            Status::Active,
            None,
            Vec::new(),
            1,
            0,
            0,
        );
        assert_eq!(
            s.outcome(),
            Outcome::Draw {
                reason: rules::DrawReason::FiftyMoves
            }
        );
        assert_eq!(s.outcome_with(&RulesConfig::strict()), Outcome::InProgress);
    }

    #[test]
    fn test_resign_and_abandon() {
        let s = active();
        let resigned = s.set_outcome("alice", Termination::Resign).unwrap();
        assert_eq!(resigned.status(), Status::Finished);
        assert_eq!(resigned.winner(), Some(Winner::Black));

        let abandoned = s.set_outcome("bob", Termination::Abandon).unwrap();
        assert_eq!(abandoned.status(), Status::Abandoned);
        assert_eq!(abandoned.winner(), Some(Winner::White));

        let drawn = s.set_outcome("bob", Termination::AgreedDraw).unwrap();
        assert_eq!(drawn.winner(), Some(Winner::Draw));
    }

    #[test]
    fn test_set_outcome_failures() {
        let s = active();
        assert!(matches!(
            s.set_outcome("mallory", Termination::Resign),
            Err(Error::NotAParticipant)
        ));
        assert!(matches!(
            Session::create("g1", "alice").set_outcome("alice", Termination::Resign),
            Err(Error::WrongStatus(Status::Waiting))
        ));
        assert!(matches!(
            s.set_outcome(
                "alice",
                Termination::Override {
                    status: Status::Waiting,
                    winner: None
                }
            ),
            Err(Error::InvalidTransition { .. })
        ));
        let finished = s.set_outcome("alice", Termination::Resign).unwrap();
        assert!(matches!(
            finished.set_outcome("bob", Termination::AgreedDraw),
            Err(Error::WrongStatus(Status::Finished))
        ));
    }

    #[test]
    fn test_read_access() {
        let waiting = Session::create("g1", "alice");
        assert!(waiting.can_read("mallory"));
        let s = waiting.join("bob").unwrap();
        assert!(!s.can_read("mallory"));
        assert!(s.can_read("alice"));
        assert!(s.can_read("bob"));
    }

    #[test]
    fn test_numbered_history() {
        let s = active();
        let s = play(&s, "alice", "e2", "e4");
        let s = play(&s, "bob", "e7", "e5");
        let s = play(&s, "alice", "g1", "f3");
        assert_eq!(s.numbered_history(), "1. e4 e5 2. Nf3");
    }

    #[test]
    fn test_replay_matches_position() {
        let s = active();
        let s = play(&s, "alice", "e2", "e4");
        let s = play(&s, "bob", "c7", "c5");
        let positions = s.replay().unwrap();
        assert_eq!(positions.len(), 3);
        assert_eq!(positions.last(), Some(s.position()));
    }
}
