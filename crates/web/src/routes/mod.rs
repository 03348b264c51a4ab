use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod games;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/games", post(games::create_game).get(games::list_games))
        .route("/api/games/:id", get(games::get_game).patch(games::update_game))
        .route("/api/games/:id/moves", post(games::submit_move))
        .route("/api/games/:id/legal", get(games::legal_destinations))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn health() -> &'static str {
    "OK"
}
