use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use chess_duel_core::{
    Color, Outcome, Role, RulesConfig, Session, Square, Status, Termination, Winner,
};

use crate::error::ApiError;
use crate::AppState;

pub const PLAYER_HEADER: &str = "x-player-id";

/// Caller identity taken from the `x-player-id` header.
pub struct Player(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Player {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(PLAYER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Player(value.to_string()))
            .ok_or(ApiError::Unauthorized)
    }
}

#[derive(Debug, Serialize)]
pub struct GameView {
    pub id: String,
    pub white: String,
    pub black: Option<String>,
    pub status: Status,
    pub winner: Option<Winner>,
    pub fen: String,
    pub turn: Color,
    pub check: bool,
    pub outcome: Outcome,
    pub history: Vec<String>,
    pub moves: String,
    pub version: u64,
    pub created_at: String,
    pub updated_at: String,
}

fn timestamp(secs: u64) -> String {
    chrono::DateTime::from_timestamp(secs as i64, 0)
        .map(|d| d.to_rfc3339())
        .unwrap_or_default()
}

impl GameView {
    /// Snapshot of `session`, with the outcome judged under `rules`.
    pub fn new(session: &Session, rules: &RulesConfig) -> Self {
        let position = session.position();
        Self {
            id: session.id().to_string(),
            white: session.white().to_string(),
            black: session.black().map(str::to_string),
            status: session.status(),
            winner: session.winner(),
            fen: position.to_string(),
            turn: position.turn(),
            check: position.is_check(),
            outcome: session.outcome_with(rules),
            history: session.history().to_vec(),
            moves: session.numbered_history(),
            version: session.version(),
            created_at: timestamp(session.created_at()),
            updated_at: timestamp(session.updated_at()),
        }
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct LegalQuery {
    pub square: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Resign,
    Draw,
    Abandon,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub join: bool,
    pub action: Option<Action>,
    pub status: Option<Status>,
    pub winner: Option<Winner>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MoveRequest {
    San {
        san: String,
    },
    Squares {
        from: String,
        to: String,
        promotion: Option<String>,
    },
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

pub async fn create_game(
    Player(player): Player,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.games.create_game(&player)?;
    Ok((StatusCode::CREATED, Json(GameView::new(&session, state.games.rules()))))
}

pub async fn list_games(
    Player(player): Player,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<GameView>>, ApiError> {
    let status = query.status.as_deref().map(str::parse::<Status>).transpose()?;
    let sessions = state.games.list_games(&player, status)?;
    let views = sessions
        .iter()
        .map(|session| GameView::new(session, state.games.rules()))
        .collect();
    Ok(Json(views))
}

pub async fn get_game(
    Player(player): Player,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GameView>, ApiError> {
    let session = state.games.fetch_game(&id, &player)?;
    Ok(Json(GameView::new(&session, state.games.rules())))
}

pub async fn update_game(
    Player(player): Player,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<GameView>, ApiError> {
    let req = body(payload)?;

    let session = if req.join {
        state.games.join_game(&id, &player)?
    } else {
        let termination = match (req.action, req.status) {
            (Some(Action::Resign), _) => Termination::Resign,
            (Some(Action::Draw), _) => Termination::AgreedDraw,
            (Some(Action::Abandon), _) => Termination::Abandon,
            (None, Some(status)) => Termination::Override {
                status,
                winner: req.winner,
            },
            (None, None) => {
                return Err(ApiError::BadRequest(
                    "expected join, action or status".to_string(),
                ))
            }
        };
        state.games.set_outcome(&id, &player, termination)?
    };
    Ok(Json(GameView::new(&session, state.games.rules())))
}

pub async fn submit_move(
    Player(player): Player,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> Result<Json<GameView>, ApiError> {
    let session = match body(payload)? {
        MoveRequest::San { san } => state.games.submit_san(&id, &player, &san)?,
        MoveRequest::Squares {
            from,
            to,
            promotion,
        } => {
            let from: Square = from.parse()?;
            let to: Square = to.parse()?;
            let promotion = promotion.as_deref().map(str::parse::<Role>).transpose()?;
            state.games.submit_move(&id, &player, from, to, promotion)?
        }
    };
    Ok(Json(GameView::new(&session, state.games.rules())))
}

pub async fn legal_destinations(
    Player(player): Player,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<LegalQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let square: Square = query.square.parse()?;
    let destinations = state.games.legal_destinations(&id, &player, square)?;
    Ok(Json(json!({ "square": square, "destinations": destinations })))
}
