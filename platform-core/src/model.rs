//! The single persisted document and the entities it holds.
//!
//! Everything here is plain data: no method on these types talks to the
//! filesystem or a process. Behavior lives in `session`, `artifact`,
//! `rooms`, `runtime` and `rating`, all of which operate on a `Document`
//! handed to them by the `PersistentStore`.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

pub type RoomId = u64;
pub type RatingId = u64;

/// Current unix timestamp in seconds.
pub fn now_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    pub developers: HashMap<String, Developer>,
    pub players: HashMap<String, Player>,
    pub games: HashMap<String, Game>,
    pub rooms: HashMap<RoomId, Room>,
    pub ratings: HashMap<RatingId, Rating>,
    pub sessions: SessionTable,
    pub next_ids: NextIds,
}

impl Document {
    pub fn empty() -> Self {
        Self {
            next_ids: NextIds { room: 1, rating: 1 },
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionTable {
    pub developer: HashMap<String, u64>,
    pub player: HashMap<String, u64>,
}

impl SessionTable {
    pub fn table_mut(&mut self, role: Role) -> &mut HashMap<String, u64> {
        match role {
            Role::Developer => &mut self.developer,
            Role::Player => &mut self.player,
        }
    }

    pub fn table(&self, role: Role) -> &HashMap<String, u64> {
        match role {
            Role::Developer => &self.developer,
            Role::Player => &self.player,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Developer,
    Player,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NextIds {
    pub room: RoomId,
    pub rating: RatingId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Developer {
    pub password: String,
    pub games: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub password: String,
    pub played_games: HashMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub version: String,
    pub path: String,
    pub uploaded_at: u64,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
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
}

impl Game {
    pub fn version(&self, version: &str) -> Option<&Version> {
        self.versions.iter().find(|v| v.version == version)
    }

    pub fn latest(&self) -> Option<&Version> {
        self.version(&self.latest_version)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    InGame,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameServerAddr {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub id: RatingId,
    pub player: String,
    pub game_id: String,
    pub score: u8,
    pub comment: String,
    pub created_at: u64,
}
