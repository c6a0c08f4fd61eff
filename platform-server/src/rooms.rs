//! `/rooms/*` endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use platform_core::model::{Role, RoomId};
use platform_core::rooms;
use serde::Deserialize;

use crate::auth::require_login;
use crate::envelope::{api_error, ok};
use crate::state::AppState;

pub async fn list_rooms(State(state): State<AppState>) -> Response {
    let rooms = rooms::list_rooms(&state.store, &state.supervisor, state.room_policy());
    ok(StatusCode::OK, rooms)
}

pub async fn get_room(State(state): State<AppState>, Path(id): Path<RoomId>) -> Response {
    match rooms::get_room(&state.store, &state.supervisor, state.room_policy(), id) {
        Ok(room) => ok(StatusCode::OK, room),
        Err(e) => api_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub player: String,
    pub game_id: String,
}

pub async fn create_room(State(state): State<AppState>, Json(req): Json<CreateRoomRequest>) -> Response {
    if let Err(resp) = require_login(&state, Role::Player, &req.player) {
        return resp;
    }
    match rooms::create_room(&state.store, &state.supervisor, state.room_policy(), &req.player, &req.game_id) {
        Ok(room) => ok(StatusCode::CREATED, room),
        Err(e) => api_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct PlayerOnly {
    pub player: String,
}

pub async fn join_room(
    State(state): State<AppState>,
    Path(id): Path<RoomId>,
    Json(req): Json<PlayerOnly>,
) -> Response {
    if let Err(resp) = require_login(&state, Role::Player, &req.player) {
        return resp;
    }
    match rooms::join_room(&state.store, &state.supervisor, state.room_policy(), id, &req.player) {
        Ok(room) => ok(StatusCode::OK, room),
        Err(e) => api_error(e),
    }
}

pub async fn leave_room(
    State(state): State<AppState>,
    Path(id): Path<RoomId>,
    Json(req): Json<PlayerOnly>,
) -> Response {
    if let Err(resp) = require_login(&state, Role::Player, &req.player) {
        return resp;
    }
    match rooms::leave_room(&state.store, &state.supervisor, state.room_policy(), id, &req.player) {
        Ok(room) => ok(StatusCode::OK, room),
        Err(e) => api_error(e),
    }
}

pub async fn close_room(
    State(state): State<AppState>,
    Path(id): Path<RoomId>,
    Json(req): Json<PlayerOnly>,
) -> Response {
    if let Err(resp) = require_login(&state, Role::Player, &req.player) {
        return resp;
    }
    match rooms::close_room(&state.store, &state.supervisor, state.room_policy(), id, &req.player) {
        Ok(room) => ok(StatusCode::OK, room),
        Err(e) => api_error(e),
    }
}

pub async fn room_heartbeat(
    State(state): State<AppState>,
    Path(id): Path<RoomId>,
    Json(req): Json<PlayerOnly>,
) -> Response {
    if let Err(resp) = require_login(&state, Role::Player, &req.player) {
        return resp;
    }
    match rooms::room_heartbeat(&state.store, &state.supervisor, state.room_policy(), id, &req.player) {
        Ok(room) => ok(StatusCode::OK, room),
        Err(e) => api_error(e),
    }
}

pub async fn start_room(
    State(state): State<AppState>,
    Path(id): Path<RoomId>,
    Json(req): Json<PlayerOnly>,
) -> Response {
    if let Err(resp) = require_login(&state, Role::Player, &req.player) {
        return resp;
    }
    let result = rooms::start_room(
        &state.store,
        &state.supervisor,
        state.room_policy(),
        &state.config.games_dir(),
        state.fallback_game_server_addr(),
        id,
        &req.player,
    )
    .await;
    match result {
        Ok(room) => ok(StatusCode::OK, room),
        Err(e) => api_error(e),
    }
}

/// `POST /rooms/<id>/played` — any current member reports the room as
/// played, gating a player's future rating on this game. `mark_room_played`
/// is caller-identified and membership-gated, a shape that only makes sense
/// invoked by an authenticated request rather than a background transition.
/// `DESIGN.md` records this as a supplemented route.
pub async fn mark_room_played(
    State(state): State<AppState>,
    Path(id): Path<RoomId>,
    Json(req): Json<PlayerOnly>,
) -> Response {
    if let Err(resp) = require_login(&state, Role::Player, &req.player) {
        return resp;
    }
    match rooms::mark_room_played(&state.store, &state.supervisor, state.room_policy(), id, &req.player) {
        Ok(()) => crate::envelope::ok_empty(StatusCode::OK),
        Err(e) => api_error(e),
    }
}
