//! Tunables for the platform, resolved from the environment.
//!
//! Follows the precedence style of a typical data-directory resolver: an
//! explicit environment variable wins, otherwise a sensible default is used.
//! Every field here corresponds to a row in the spec's configuration table.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CONFIG_DIR: &str = ".config/platform/data";
const DEV_DATA_DIR: &str = "./data";

/// Runtime configuration, assembled once at startup and shared (via `Arc`)
/// by every component that needs a tunable.
#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub session_timeout: Duration,
    pub concurrent_login_lock: Duration,
    pub room_heartbeat_timeout: Duration,
    pub finished_room_grace: Duration,
    pub online_timeout: Duration,
    pub max_rooms: usize,
    pub game_server_host: String,
    pub game_server_public_host: Option<String>,
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 5000,
            session_timeout: Duration::from_secs(3600),
            concurrent_login_lock: Duration::from_secs(30),
            room_heartbeat_timeout: Duration::from_secs(15),
            finished_room_grace: Duration::from_secs(30),
            online_timeout: Duration::from_secs(20),
            max_rooms: 0,
            game_server_host: "0.0.0.0".to_string(),
            game_server_public_host: None,
            data_dir: get_data_dir(),
        }
    }
}

impl Config {
    /// Build configuration from the process environment, falling back to
    /// `Default` for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            http_port: env_u16("PORT", defaults.http_port),
            session_timeout: env_secs("SESSION_TIMEOUT", defaults.session_timeout),
            concurrent_login_lock: env_secs("CONCURRENT_LOGIN_LOCK", defaults.concurrent_login_lock),
            room_heartbeat_timeout: env_secs("ROOM_HEARTBEAT_TIMEOUT", defaults.room_heartbeat_timeout),
            finished_room_grace: env_secs("FINISHED_ROOM_GRACE_SECONDS", defaults.finished_room_grace),
            online_timeout: env_secs("ONLINE_TIMEOUT", defaults.online_timeout),
            max_rooms: env_usize("MAX_ROOMS", defaults.max_rooms),
            game_server_host: std::env::var("GAME_SERVER_HOST")
                .unwrap_or(defaults.game_server_host),
            game_server_public_host: std::env::var("GAME_SERVER_PUBLIC_HOST").ok(),
            data_dir: defaults.data_dir,
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("store.json")
    }

    pub fn games_dir(&self) -> PathBuf {
        self.data_dir.join("storage").join("games")
    }

    pub fn runtime_dir(&self) -> PathBuf {
        self.data_dir.join("storage").join("runtime")
    }
}

fn env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Get the data directory for persistence.
///
/// Priority:
/// 1. `PLATFORM_DATA_DIR` env variable if set
/// 2. `$HOME/.config/platform/data` if `HOME` is set
/// 3. `./data` as fallback
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PLATFORM_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(DEFAULT_CONFIG_DIR);
    }

    PathBuf::from(DEV_DATA_DIR)
}
