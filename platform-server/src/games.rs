//! `/games/*` endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use platform_core::model::{Game, Role};
use platform_core::{artifact, integrity, rating, ApiError};
use serde::{Deserialize, Serialize};

use crate::auth::require_login;
use crate::envelope::{api_error, ok};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct GameView {
    #[serde(flatten)]
    pub game: Game,
    pub average_score: Option<f64>,
}

fn view(state: &AppState, game: Game) -> GameView {
    let average_score = rating::average_score(&state.store, &game.id);
    GameView { game, average_score }
}

#[derive(Debug, Deserialize)]
pub struct ListGamesQuery {
    #[serde(default)]
    pub all: Option<u8>,
}

pub async fn list_games(State(state): State<AppState>, Query(q): Query<ListGamesQuery>) -> Response {
    let include_inactive = q.all.unwrap_or(0) != 0;
    let doc = state.store.snapshot();
    let mut games: Vec<GameView> = doc
        .games
        .values()
        .filter(|g| include_inactive || g.active)
        .cloned()
        .map(|g| view(&state, g))
        .collect();
    games.sort_by(|a, b| a.game.id.cmp(&b.game.id));
    ok(StatusCode::OK, games)
}

pub async fn get_game(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let doc = state.store.snapshot();
    match doc.games.get(&id).cloned() {
        Some(game) => ok(StatusCode::OK, view(&state, game)),
        None => api_error(ApiError::GameNotFound),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateGameRequest {
    pub developer: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub version: String,
    pub file_data: String,
}

pub async fn create_game(State(state): State<AppState>, Json(req): Json<CreateGameRequest>) -> Response {
    if let Err(resp) = require_login(&state, Role::Developer, &req.developer) {
        return resp;
    }
    match artifact::create_game(
        &state.store,
        &state.config.games_dir(),
        &req.developer,
        &req.name,
        &req.description,
        &req.version,
        &req.file_data,
    ) {
        Ok(game) => ok(StatusCode::CREATED, view(&state, game)),
        Err(e) => api_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateGameRequest {
    pub developer: String,
    pub version: String,
    pub file_data: String,
    #[serde(default)]
    pub notes: String,
}

pub async fn update_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateGameRequest>,
) -> Response {
    if let Err(resp) = require_login(&state, Role::Developer, &req.developer) {
        return resp;
    }
    match artifact::update_game_version(
        &state.store,
        &state.config.games_dir(),
        &req.developer,
        &id,
        &req.version,
        &req.file_data,
        &req.notes,
    ) {
        Ok(game) => ok(StatusCode::OK, view(&state, game)),
        Err(e) => api_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct RemoveGameRequest {
    pub developer: String,
}

#[derive(Debug, Serialize)]
pub struct RemoveGameResponse {
    pub active_rooms: usize,
}

pub async fn remove_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RemoveGameRequest>,
) -> Response {
    if let Err(resp) = require_login(&state, Role::Developer, &req.developer) {
        return resp;
    }
    match artifact::remove_game(&state.store, &req.developer, &id) {
        Ok(active_rooms) => ok(StatusCode::OK, RemoveGameResponse { active_rooms }),
        Err(e) => api_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct VersionQuery {
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub file_data: String,
    pub version: String,
    pub name: String,
    pub game_id: String,
}

pub async fn download_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<VersionQuery>,
) -> Response {
    match artifact::download_game(&state.store, &id, q.version.as_deref()) {
        Ok(blob) => ok(
            StatusCode::OK,
            DownloadResponse {
                file_data: blob.file_data,
                version: blob.version,
                name: blob.name,
                game_id: blob.game_id,
            },
        ),
        Err(e) => api_error(e),
    }
}

#[derive(Debug, Serialize)]
pub struct IntegrityResponse {
    pub game_id: String,
    pub version: String,
    pub files: std::collections::BTreeMap<String, String>,
}

pub async fn game_integrity(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<VersionQuery>,
) -> Response {
    match integrity::game_integrity(&state.store, &id, q.version.as_deref()) {
        Ok(manifest) => ok(
            StatusCode::OK,
            IntegrityResponse {
                game_id: manifest.game_id,
                version: manifest.version,
                files: manifest.files,
            },
        ),
        Err(e) => api_error(e),
    }
}
