//! Route table — every HTTP path the platform exposes, wired to its handler.

use axum::routing::{get, post};
use axum::Router;

use crate::{auth, games, ratings, rooms};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/dev/register", post(auth::dev_register))
        .route("/dev/login", post(auth::dev_login))
        .route("/dev/logout", post(auth::dev_logout))
        .route("/dev/heartbeat", post(auth::dev_heartbeat))
        .route("/player/register", post(auth::player_register))
        .route("/player/login", post(auth::player_login))
        .route("/player/logout", post(auth::player_logout))
        .route("/player/heartbeat", post(auth::player_heartbeat))
        .route("/player/me", get(auth::player_me))
        .route("/players", get(auth::list_players))
        .route("/games", get(games::list_games).post(games::create_game))
        .route(
            "/games/:id",
            get(games::get_game).put(games::update_game).delete(games::remove_game),
        )
        .route("/games/:id/download", get(games::download_game))
        .route("/games/:id/integrity", get(games::game_integrity))
        .route("/rooms", get(rooms::list_rooms).post(rooms::create_room))
        .route("/rooms/:id", get(rooms::get_room))
        .route("/rooms/:id/join", post(rooms::join_room))
        .route("/rooms/:id/leave", post(rooms::leave_room))
        .route("/rooms/:id/start", post(rooms::start_room))
        .route("/rooms/:id/close", post(rooms::close_room))
        .route("/rooms/:id/heartbeat", post(rooms::room_heartbeat))
        .route("/rooms/:id/played", post(rooms::mark_room_played))
        .route("/ratings", post(ratings::add_rating))
        .with_state(state)
}
