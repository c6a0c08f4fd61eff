//! Facade gluing every component together behind one handle the HTTP
//! layer can hold in an `Arc` and pass to every request.

use crate::config::Config;
use crate::model::GameServerAddr;
use crate::rooms::RoomPolicy;
use crate::runtime::RuntimeSupervisor;
use crate::store::{PersistentStore, StoreError};

pub struct Platform {
    pub config: Config,
    pub store: PersistentStore,
    pub supervisor: RuntimeSupervisor,
}

impl Platform {
    pub fn open(config: Config) -> Result<Self, StoreError> {
        std::fs::create_dir_all(config.games_dir()).ok();
        std::fs::create_dir_all(config.runtime_dir()).ok();

        let store = PersistentStore::open(config.store_path())?;
        crate::rooms::cold_boot_cleanup(&store);

        let supervisor = RuntimeSupervisor::new(
            config.runtime_dir(),
            config.game_server_host.clone(),
            config.game_server_public_host.clone(),
        );

        Ok(Self {
            config,
            store,
            supervisor,
        })
    }

    pub fn room_policy(&self) -> RoomPolicy {
        RoomPolicy {
            room_heartbeat_timeout_secs: self.config.room_heartbeat_timeout.as_secs(),
            finished_room_grace_secs: self.config.finished_room_grace.as_secs(),
            max_rooms: self.config.max_rooms,
        }
    }

    /// The address clients should use for a room whose bundle has no
    /// `server_entry` — the platform's own advertised address.
    pub fn fallback_game_server_addr(&self) -> GameServerAddr {
        GameServerAddr {
            host: self
                .config
                .game_server_public_host
                .clone()
                .unwrap_or_else(|| self.config.game_server_host.clone()),
            port: self.config.http_port,
        }
    }
}
