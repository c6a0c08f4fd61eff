//! `/ratings` endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use platform_core::model::Role;
use platform_core::rating;
use serde::Deserialize;

use crate::auth::require_login;
use crate::envelope::{api_error, ok_empty};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddRatingRequest {
    pub player: String,
    pub game_id: String,
    pub score: u8,
    #[serde(default)]
    pub comment: String,
}

pub async fn add_rating(State(state): State<AppState>, Json(req): Json<AddRatingRequest>) -> Response {
    if let Err(resp) = require_login(&state, Role::Player, &req.player) {
        return resp;
    }
    match rating::add_rating(&state.store, &req.player, &req.game_id, req.score, &req.comment) {
        Ok(()) => ok_empty(StatusCode::OK),
        Err(e) => api_error(e),
    }
}
