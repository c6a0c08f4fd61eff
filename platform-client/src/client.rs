//! HTTP client for the game hosting platform.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::{ClientError, ClientResult};
use crate::types::{
    DownloadedBundle, Game, IntegrityManifest, PlayerListEntry, PlayerProfile, RemoveGameOutcome, Room,
};

#[derive(serde::Deserialize)]
struct Envelope<T> {
    success: bool,
    message: String,
    #[serde(default)]
    data: Option<T>,
}

/// Thin wrapper over [`reqwest::Client`] plus the platform's base URL.
/// Holds no session state of its own — every call that needs an identity
/// takes the username explicitly, matching the server's stateless-per-call
/// session checks.
pub struct PlatformClient {
    http: reqwest::Client,
    base_url: String,
}

impl PlatformClient {
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let base_url = base_url.into();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidUrl(base_url));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn request<T: DeserializeOwned>(&self, method: Method, path: &str, body: Option<Value>) -> ClientResult<T> {
        let url = format!("{}{path}", self.base_url);
        let mut builder = self.http.request(method, url);
        if let Some(body) = &body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        let status = response.status();
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        if envelope.success {
            envelope
                .data
                .ok_or_else(|| ClientError::InvalidResponse("response carried no data".into()))
        } else {
            Err(ClientError::Api {
                status: status.as_u16(),
                message: envelope.message,
            })
        }
    }

    async fn request_empty(&self, method: Method, path: &str, body: Option<Value>) -> ClientResult<()> {
        let url = format!("{}{path}", self.base_url);
        let mut builder = self.http.request(method, url);
        if let Some(body) = &body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        let status = response.status();
        let envelope: Envelope<Value> = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        if envelope.success {
            Ok(())
        } else {
            Err(ClientError::Api {
                status: status.as_u16(),
                message: envelope.message,
            })
        }
    }

    fn credentials(username: &str, password: &str) -> Value {
        json!({"username": username, "password": password})
    }

    fn username_only(username: &str) -> Value {
        json!({"username": username})
    }

    // --- session layer -----------------------------------------------------

    pub async fn register_developer(&self, username: &str, password: &str) -> ClientResult<()> {
        self.request_empty(Method::POST, "/dev/register", Some(Self::credentials(username, password)))
            .await
    }

    pub async fn login_developer(&self, username: &str, password: &str) -> ClientResult<()> {
        self.request_empty(Method::POST, "/dev/login", Some(Self::credentials(username, password)))
            .await
    }

    pub async fn logout_developer(&self, username: &str) -> ClientResult<()> {
        self.request_empty(Method::POST, "/dev/logout", Some(Self::username_only(username)))
            .await
    }

    pub async fn heartbeat_developer(&self, username: &str) -> ClientResult<()> {
        self.request_empty(Method::POST, "/dev/heartbeat", Some(Self::username_only(username)))
            .await
    }

    pub async fn register_player(&self, username: &str, password: &str) -> ClientResult<()> {
        self.request_empty(Method::POST, "/player/register", Some(Self::credentials(username, password)))
            .await
    }

    pub async fn login_player(&self, username: &str, password: &str) -> ClientResult<()> {
        self.request_empty(Method::POST, "/player/login", Some(Self::credentials(username, password)))
            .await
    }

    pub async fn logout_player(&self, username: &str) -> ClientResult<()> {
        self.request_empty(Method::POST, "/player/logout", Some(Self::username_only(username)))
            .await
    }

    pub async fn heartbeat_player(&self, username: &str) -> ClientResult<()> {
        self.request_empty(Method::POST, "/player/heartbeat", Some(Self::username_only(username)))
            .await
    }

    pub async fn player_me(&self, username: &str) -> ClientResult<PlayerProfile> {
        self.request(Method::GET, &format!("/player/me?username={username}"), None).await
    }

    pub async fn list_players(&self) -> ClientResult<Vec<PlayerListEntry>> {
        self.request(Method::GET, "/players", None).await
    }

    // --- artifact store ------------------------------------------------

    pub async fn list_games(&self, include_inactive: bool) -> ClientResult<Vec<Game>> {
        let path = if include_inactive { "/games?all=1" } else { "/games" };
        self.request(Method::GET, path, None).await
    }

    pub async fn get_game(&self, game_id: &str) -> ClientResult<Game> {
        self.request(Method::GET, &format!("/games/{game_id}"), None).await
    }

    pub async fn create_game(
        &self,
        developer: &str,
        name: &str,
        description: &str,
        version: &str,
        file_data_base64: &str,
    ) -> ClientResult<Game> {
        self.request(
            Method::POST,
            "/games",
            Some(json!({
                "developer": developer,
                "name": name,
                "description": description,
                "version": version,
                "file_data": file_data_base64,
            })),
        )
        .await
    }

    pub async fn update_game(
        &self,
        developer: &str,
        game_id: &str,
        version: &str,
        file_data_base64: &str,
        notes: &str,
    ) -> ClientResult<Game> {
        self.request(
            Method::PUT,
            &format!("/games/{game_id}"),
            Some(json!({
                "developer": developer,
                "version": version,
                "file_data": file_data_base64,
                "notes": notes,
            })),
        )
        .await
    }

    pub async fn remove_game(&self, developer: &str, game_id: &str) -> ClientResult<RemoveGameOutcome> {
        self.request(
            Method::DELETE,
            &format!("/games/{game_id}"),
            Some(json!({"developer": developer})),
        )
        .await
    }

    pub async fn download_game(&self, game_id: &str, version: Option<&str>) -> ClientResult<DownloadedBundle> {
        let path = match version {
            Some(v) => format!("/games/{game_id}/download?version={v}"),
            None => format!("/games/{game_id}/download"),
        };
        self.request(Method::GET, &path, None).await
    }

    pub async fn game_integrity(&self, game_id: &str, version: Option<&str>) -> ClientResult<IntegrityManifest> {
        let path = match version {
            Some(v) => format!("/games/{game_id}/integrity?version={v}"),
            None => format!("/games/{game_id}/integrity"),
        };
        self.request(Method::GET, &path, None).await
    }

    // --- room lifecycle --------------------------------------------------

    pub async fn list_rooms(&self) -> ClientResult<Vec<Room>> {
        self.request(Method::GET, "/rooms", None).await
    }

    pub async fn get_room(&self, room_id: u64) -> ClientResult<Room> {
        self.request(Method::GET, &format!("/rooms/{room_id}"), None).await
    }

    pub async fn create_room(&self, player: &str, game_id: &str) -> ClientResult<Room> {
        self.request(
            Method::POST,
            "/rooms",
            Some(json!({"player": player, "game_id": game_id})),
        )
        .await
    }

    pub async fn join_room(&self, room_id: u64, player: &str) -> ClientResult<Room> {
        self.request(
            Method::POST,
            &format!("/rooms/{room_id}/join"),
            Some(json!({"player": player})),
        )
        .await
    }

    pub async fn leave_room(&self, room_id: u64, player: &str) -> ClientResult<Room> {
        self.request(
            Method::POST,
            &format!("/rooms/{room_id}/leave"),
            Some(json!({"player": player})),
        )
        .await
    }

    pub async fn start_room(&self, room_id: u64, player: &str) -> ClientResult<Room> {
        self.request(
            Method::POST,
            &format!("/rooms/{room_id}/start"),
            Some(json!({"player": player})),
        )
        .await
    }

    pub async fn close_room(&self, room_id: u64, player: &str) -> ClientResult<Room> {
        self.request(
            Method::POST,
            &format!("/rooms/{room_id}/close"),
            Some(json!({"player": player})),
        )
        .await
    }

    pub async fn room_heartbeat(&self, room_id: u64, player: &str) -> ClientResult<Room> {
        self.request(
            Method::POST,
            &format!("/rooms/{room_id}/heartbeat"),
            Some(json!({"player": player})),
        )
        .await
    }

    pub async fn mark_room_played(&self, room_id: u64, player: &str) -> ClientResult<()> {
        self.request_empty(
            Method::POST,
            &format!("/rooms/{room_id}/played"),
            Some(json!({"player": player})),
        )
        .await
    }

    // --- ratings -----------------------------------------------------------

    pub async fn add_rating(&self, player: &str, game_id: &str, score: u8, comment: &str) -> ClientResult<()> {
        self.request_empty(
            Method::POST,
            "/ratings",
            Some(json!({"player": player, "game_id": game_id, "score": score, "comment": comment})),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_url_without_scheme() {
        assert!(PlatformClient::new("localhost:5000").is_err());
    }

    #[test]
    fn strips_trailing_slash() {
        let client = PlatformClient::new("http://localhost:5000/").unwrap();
        assert_eq!(client.base_url, "http://localhost:5000");
    }
}
