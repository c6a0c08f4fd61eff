//! `/dev/*` and `/player/*` session endpoints.
//!
//! Developer and player accounts share one session-layer implementation in
//! `platform-core`; this module is the thin routing split between the two
//! roles the HTTP surface exposes as separate paths.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use platform_core::model::Role;
use platform_core::{session, ApiError};
use serde::{Deserialize, Serialize};

use crate::envelope::{api_error, ok, ok_empty};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UsernameOnly {
    pub username: String,
}

/// Checks `is_logged_in` (read-only) and, on success, refreshes the
/// session heartbeat as an explicit, separate call. Returns the 401
/// envelope response on failure.
pub fn require_login(state: &AppState, role: Role, username: &str) -> Result<(), Response> {
    if !session::is_logged_in(&state.store, role, username, state.config.session_timeout.as_secs()) {
        return Err(api_error(ApiError::Unauthorized));
    }
    session::heartbeat(&state.store, role, username);
    Ok(())
}

async fn register(state: AppState, role: Role, body: Credentials) -> Response {
    match session::register(&state.store, role, &body.username, &body.password) {
        Ok(()) => ok_empty(StatusCode::CREATED),
        Err(e) => api_error(e),
    }
}

async fn login(state: AppState, role: Role, body: Credentials) -> Response {
    match session::login(
        &state.store,
        role,
        &body.username,
        &body.password,
        state.config.concurrent_login_lock.as_secs(),
    ) {
        Ok(()) => ok_empty(StatusCode::OK),
        Err(e) => api_error(e),
    }
}

async fn logout(state: AppState, role: Role, body: UsernameOnly) -> Response {
    session::logout(&state.store, role, &body.username);
    ok_empty(StatusCode::OK)
}

async fn heartbeat(state: AppState, role: Role, body: UsernameOnly) -> Response {
    if let Err(resp) = require_login(&state, role, &body.username) {
        return resp;
    }
    ok_empty(StatusCode::OK)
}

pub async fn dev_register(State(state): State<AppState>, Json(body): Json<Credentials>) -> Response {
    register(state, Role::Developer, body).await
}

pub async fn dev_login(State(state): State<AppState>, Json(body): Json<Credentials>) -> Response {
    login(state, Role::Developer, body).await
}

pub async fn dev_logout(State(state): State<AppState>, Json(body): Json<UsernameOnly>) -> Response {
    logout(state, Role::Developer, body).await
}

pub async fn dev_heartbeat(State(state): State<AppState>, Json(body): Json<UsernameOnly>) -> Response {
    heartbeat(state, Role::Developer, body).await
}

pub async fn player_register(State(state): State<AppState>, Json(body): Json<Credentials>) -> Response {
    register(state, Role::Player, body).await
}

pub async fn player_login(State(state): State<AppState>, Json(body): Json<Credentials>) -> Response {
    login(state, Role::Player, body).await
}

pub async fn player_logout(State(state): State<AppState>, Json(body): Json<UsernameOnly>) -> Response {
    logout(state, Role::Player, body).await
}

pub async fn player_heartbeat(State(state): State<AppState>, Json(body): Json<UsernameOnly>) -> Response {
    heartbeat(state, Role::Player, body).await
}

#[derive(Debug, Deserialize)]
pub struct MeQuery {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct PlayerProfile {
    pub username: String,
    pub played_games: std::collections::HashMap<String, u32>,
    pub online: bool,
}

pub async fn player_me(State(state): State<AppState>, Query(q): Query<MeQuery>) -> Response {
    if let Err(resp) = require_login(&state, Role::Player, &q.username) {
        return resp;
    }
    let doc = state.store.snapshot();
    let Some(player) = doc.players.get(&q.username) else {
        return api_error(ApiError::PlayerNotFound);
    };
    let online = session::is_online(&state.store, Role::Player, &q.username, state.config.online_timeout.as_secs());
    ok(
        StatusCode::OK,
        PlayerProfile {
            username: q.username,
            played_games: player.played_games.clone(),
            online,
        },
    )
}

#[derive(Debug, Serialize)]
pub struct PlayerListEntry {
    pub name: String,
    pub online: bool,
}

pub async fn list_players(State(state): State<AppState>) -> Response {
    let doc = state.store.snapshot();
    let online_timeout = state.config.online_timeout.as_secs();
    let mut players: Vec<PlayerListEntry> = doc
        .players
        .keys()
        .map(|name| PlayerListEntry {
            name: name.clone(),
            online: session::is_online(&state.store, Role::Player, name, online_timeout),
        })
        .collect();
    players.sort_by(|a, b| a.name.cmp(&b.name));
    ok(StatusCode::OK, players)
}
