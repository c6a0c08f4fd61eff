//! Wire DTOs mirroring the JSON shapes `platform-server` returns. Kept
//! independent of `platform-core`'s model types on purpose — the HTTP
//! surface is the contract, not the server's internal representation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Version {
    pub version: String,
    pub path: String,
    pub uploaded_at: u64,
    pub notes: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Game {
    pub id: String,
    pub name: String,
    pub developer: String,
    pub description: String,
    pub min_players: u32,
    pub max_players: u32,
    pub active: bool,
    pub accept_new_rooms: bool,
    pub versions: Vec<Version>,
    pub latest_version: String,
    #[serde(default)]
    pub deactivated_at: Option<u64>,
    #[serde(default)]
    pub average_score: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    InGame,
    Finished,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GameServerAddr {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Room {
    pub id: u64,
    pub game_id: String,
    pub version: String,
    pub host: String,
    pub players: Vec<String>,
    pub max_players: u32,
    pub min_players: u32,
    pub status: RoomStatus,
    pub created_at: u64,
    #[serde(default)]
    pub started_at: Option<u64>,
    #[serde(default)]
    pub heartbeats: HashMap<String, u64>,
    #[serde(default)]
    pub ended_at: Option<u64>,
    #[serde(default)]
    pub ended_reason: Option<String>,
    #[serde(default)]
    pub played_counted: bool,
    #[serde(default)]
    pub game_server: Option<GameServerAddr>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerProfile {
    pub username: String,
    pub played_games: HashMap<String, u32>,
    pub online: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerListEntry {
    pub name: String,
    pub online: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadedBundle {
    pub file_data: String,
    pub version: String,
    pub name: String,
    pub game_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntegrityManifest {
    pub game_id: String,
    pub version: String,
    pub files: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoveGameOutcome {
    pub active_rooms: usize,
}
