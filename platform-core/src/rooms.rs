//! Room Registry: the room state machine, its garbage collector, and the
//! two-phase `start_room` transaction that hands off to the Runtime
//! Supervisor without ever holding the store lock across an `.await`.

use std::path::PathBuf;

use crate::error::ApiError;
use crate::model::{now_ts, Document, GameServerAddr, Room, RoomId, RoomStatus};
use crate::runtime::RuntimeSupervisor;
use crate::store::PersistentStore;

/// Tunables the registry needs on every call; bundled so call sites don't
/// thread five separate numbers through every function.
#[derive(Debug, Clone, Copy)]
pub struct RoomPolicy {
    pub room_heartbeat_timeout_secs: u64,
    pub finished_room_grace_secs: u64,
    pub max_rooms: usize,
}

/// Garbage-collect `doc.rooms` in place. Run at the top of every
/// registry operation so no caller ever observes a half-GC'd room.
///
/// Returns the ids of rooms that transitioned to `finished` during this
/// pass (so the caller can tear down their runtime handles after the store
/// lock is released) and the ids fully removed (past their grace period).
fn cleanup_rooms(doc: &mut Document, policy: RoomPolicy) -> (Vec<RoomId>, Vec<RoomId>) {
    let now = now_ts();
    let mut newly_finished = Vec::new();
    let mut removed = Vec::new();

    let ids: Vec<RoomId> = doc.rooms.keys().copied().collect();
    for id in ids {
        let room = doc.rooms.get_mut(&id).expect("id came from this map");

        if room.status == RoomStatus::Finished {
            let ended_at = room.ended_at.unwrap_or(room.created_at);
            if now.saturating_sub(ended_at) > policy.finished_room_grace_secs {
                removed.push(id);
            }
            continue;
        }

        for player in room.players.clone() {
            room.heartbeats.entry(player).or_insert(room.created_at);
        }

        let stale: Vec<String> = room
            .players
            .iter()
            .filter(|p| {
                let hb = room.heartbeats.get(*p).copied().unwrap_or(room.created_at);
                now.saturating_sub(hb) > policy.room_heartbeat_timeout_secs
            })
            .cloned()
            .collect();

        if stale.is_empty() {
            continue;
        }

        let host = room.players.first().cloned();
        match room.status {
            RoomStatus::Waiting => {
                if host.as_deref().is_some_and(|h| stale.iter().any(|s| s == h)) {
                    finish_room(room, format!("host disconnected: {}", host.unwrap()));
                    newly_finished.push(id);
                } else {
                    room.players.retain(|p| !stale.contains(p));
                    for p in &stale {
                        room.heartbeats.remove(p);
                    }
                }
            }
            RoomStatus::InGame => {
                finish_room(room, format!("players disconnected: {}", stale.join(", ")));
                newly_finished.push(id);
            }
            RoomStatus::Finished => unreachable!("handled above"),
        }
    }

    for id in &removed {
        doc.rooms.remove(id);
    }

    (newly_finished, removed)
}

fn finish_room(room: &mut Room, reason: String) {
    room.status = RoomStatus::Finished;
    room.ended_at = Some(now_ts());
    room.ended_reason = Some(reason);
    room.game_server = None;
}

/// List all non-finished rooms.
pub fn list_rooms(
    store: &PersistentStore,
    supervisor: &RuntimeSupervisor,
    policy: RoomPolicy,
) -> Vec<Room> {
    let rooms = store.update(|doc| {
        let (finished, _) = cleanup_rooms(doc, policy);
        let rooms: Vec<Room> = doc
            .rooms
            .values()
            .filter(|r| r.status != RoomStatus::Finished)
            .cloned()
            .collect();
        (finished, rooms)
    });
    tear_down_async(supervisor.clone(), rooms.0);
    rooms.1
}

/// Fetch a single room, `finished` or not — GC removes finished rooms only
/// after their grace period, so clients can still see the terminal reason.
pub fn get_room(
    store: &PersistentStore,
    supervisor: &RuntimeSupervisor,
    policy: RoomPolicy,
    room_id: RoomId,
) -> Result<Room, ApiError> {
    let (finished, room) = store.update(|doc| {
        let (finished, _) = cleanup_rooms(doc, policy);
        (finished, doc.rooms.get(&room_id).cloned())
    });
    tear_down_async(supervisor.clone(), finished);
    room.ok_or(ApiError::RoomNotFound)
}

pub fn create_room(
    store: &PersistentStore,
    supervisor: &RuntimeSupervisor,
    policy: RoomPolicy,
    host: &str,
    game_id: &str,
) -> Result<Room, ApiError> {
    let (finished, result) = store.update(|doc| -> (Vec<RoomId>, Result<Room, ApiError>) {
        let (finished, _) = cleanup_rooms(doc, policy);

        let result = (|| {
            let game = doc.games.get(game_id).ok_or(ApiError::GameNotFound)?;
            if !game.active || !game.accept_new_rooms {
                return Err(ApiError::GameInactive);
            }
            if policy.max_rooms > 0 && doc.rooms.len() >= policy.max_rooms {
                return Err(ApiError::RoomCapExceeded);
            }

            let id = doc.next_ids.room;
            doc.next_ids.room += 1;

            let room = Room {
                id,
                game_id: game_id.to_string(),
                version: game.latest_version.clone(),
                host: host.to_string(),
                players: vec![host.to_string()],
                max_players: game.max_players,
                min_players: game.min_players,
                status: RoomStatus::Waiting,
                created_at: now_ts(),
                started_at: None,
                heartbeats: [(host.to_string(), now_ts())].into_iter().collect(),
                ended_at: None,
                ended_reason: None,
                played_counted: false,
                game_server: None,
            };
            doc.rooms.insert(id, room.clone());
            Ok(room)
        })();

        (finished, result)
    });
    tear_down_async(supervisor.clone(), finished);
    result
}

pub fn join_room(
    store: &PersistentStore,
    supervisor: &RuntimeSupervisor,
    policy: RoomPolicy,
    room_id: RoomId,
    player: &str,
) -> Result<Room, ApiError> {
    let (finished, result) = store.update(|doc| -> (Vec<RoomId>, Result<Room, ApiError>) {
        let (finished, _) = cleanup_rooms(doc, policy);

        let result = (|| {
            let room = doc.rooms.get_mut(&room_id).ok_or(ApiError::RoomNotFound)?;
            if room.status != RoomStatus::Waiting {
                return Err(ApiError::NotWaiting(
                    room.ended_reason.clone().unwrap_or_else(|| "room is not waiting".into()),
                ));
            }
            if room.players.iter().any(|p| p == player) {
                return Err(ApiError::InvalidInput("already a member of this room".into()));
            }
            if room.players.len() as u32 >= room.max_players {
                return Err(ApiError::RoomFull);
            }

            room.players.push(player.to_string());
            room.heartbeats.insert(player.to_string(), now_ts());
            Ok(room.clone())
        })();

        (finished, result)
    });
    tear_down_async(supervisor.clone(), finished);
    result
}

pub fn leave_room(
    store: &PersistentStore,
    supervisor: &RuntimeSupervisor,
    policy: RoomPolicy,
    room_id: RoomId,
    player: &str,
) -> Result<Room, ApiError> {
    let (to_tear_down, result) = store.update(|doc| -> (Vec<RoomId>, Result<Room, ApiError>) {
        let (mut finished, _) = cleanup_rooms(doc, policy);

        let result = (|| {
            let room = doc.rooms.get_mut(&room_id).ok_or(ApiError::RoomNotFound)?;
            if !room.players.iter().any(|p| p == player) {
                return Err(ApiError::NotMember);
            }

            let is_host = room.host == player;
            if room.status == RoomStatus::Waiting && !is_host {
                room.players.retain(|p| p != player);
                room.heartbeats.remove(player);
                return Ok(room.clone());
            }

            let reason = if is_host {
                format!("host left: {player}")
            } else {
                format!("{player} left during match")
            };
            finish_room(room, reason);
            finished.push(room_id);
            Ok(room.clone())
        })();

        (finished, result)
    });
    tear_down_async(supervisor.clone(), to_tear_down);
    result
}

pub fn close_room(
    store: &PersistentStore,
    supervisor: &RuntimeSupervisor,
    policy: RoomPolicy,
    room_id: RoomId,
    player: &str,
) -> Result<Room, ApiError> {
    let (to_tear_down, result) = store.update(|doc| -> (Vec<RoomId>, Result<Room, ApiError>) {
        let (mut finished, _) = cleanup_rooms(doc, policy);

        let result = (|| {
            let room = doc.rooms.get_mut(&room_id).ok_or(ApiError::RoomNotFound)?;
            if !room.players.iter().any(|p| p == player) {
                return Err(ApiError::NotMember);
            }
            finish_room(room, format!("{player} closed the room"));
            finished.push(room_id);
            Ok(room.clone())
        })();

        (finished, result)
    });
    tear_down_async(supervisor.clone(), to_tear_down);
    result
}

pub fn room_heartbeat(
    store: &PersistentStore,
    supervisor: &RuntimeSupervisor,
    policy: RoomPolicy,
    room_id: RoomId,
    player: &str,
) -> Result<Room, ApiError> {
    let (finished, result) = store.update(|doc| -> (Vec<RoomId>, Result<Room, ApiError>) {
        let (finished, _) = cleanup_rooms(doc, policy);

        let result = (|| {
            let room = doc.rooms.get(&room_id).ok_or(ApiError::RoomGone)?;
            if !room.players.iter().any(|p| p == player) {
                return Err(ApiError::NotMember);
            }
            if room.status == RoomStatus::Finished {
                return Err(ApiError::NotWaiting(
                    room.ended_reason.clone().unwrap_or_else(|| "room is finished".into()),
                ));
            }
            let room = doc.rooms.get_mut(&room_id).expect("checked above");
            room.heartbeats.insert(player.to_string(), now_ts());
            Ok(room.clone())
        })();

        (finished, result)
    });
    tear_down_async(supervisor.clone(), finished);
    result
}

pub fn mark_room_played(
    store: &PersistentStore,
    supervisor: &RuntimeSupervisor,
    policy: RoomPolicy,
    room_id: RoomId,
    caller: &str,
) -> Result<(), ApiError> {
    let (finished, result) = store.update(|doc| -> (Vec<RoomId>, Result<(), ApiError>) {
        let (finished, _) = cleanup_rooms(doc, policy);

        let result = (|| {
            let room = doc.rooms.get(&room_id).ok_or(ApiError::RoomNotFound)?;
            if room.status != RoomStatus::InGame {
                return Err(ApiError::NotWaiting("room is not in game".into()));
            }
            if !room.players.iter().any(|p| p == caller) {
                return Err(ApiError::NotMember);
            }
            if room.played_counted {
                return Ok(());
            }

            let game_id = room.game_id.clone();
            let players = room.players.clone();
            for player_name in &players {
                if let Some(player) = doc.players.get_mut(player_name) {
                    *player.played_games.entry(game_id.clone()).or_insert(0) += 1;
                }
            }
            let room = doc.rooms.get_mut(&room_id).expect("checked above");
            room.played_counted = true;
            Ok(())
        })();

        (finished, result)
    });
    tear_down_async(supervisor.clone(), finished);
    result
}

/// Start a room. Two-phase to respect the store's lock ordering: the store lock
/// is released before the supervisor is invoked, and the room is only
/// flipped to `in_game` in a second transaction that re-validates the room
/// is still startable. If a concurrent change invalidated the room while
/// the supervisor was spawning, the freshly started process is torn down
/// (compensating action) rather than left orphaned.
pub async fn start_room(
    store: &PersistentStore,
    supervisor: &RuntimeSupervisor,
    policy: RoomPolicy,
    games_dir: &std::path::Path,
    fallback_addr: GameServerAddr,
    room_id: RoomId,
    host: &str,
) -> Result<Room, ApiError> {
    struct StartPlan {
        game_id: String,
        version: String,
        bundle_path: PathBuf,
    }

    let (finished, plan) = store.update(|doc| -> (Vec<RoomId>, Result<StartPlan, ApiError>) {
        let (finished, _) = cleanup_rooms(doc, policy);

        let plan = (|| {
            let room = doc.rooms.get(&room_id).ok_or(ApiError::RoomNotFound)?;
            if room.host != host {
                return Err(ApiError::NotHost);
            }
            if room.status != RoomStatus::Waiting {
                return Err(ApiError::NotWaiting(
                    room.ended_reason.clone().unwrap_or_else(|| "room is not waiting".into()),
                ));
            }
            if (room.players.len() as u32) < room.min_players {
                return Err(ApiError::BelowMinPlayers);
            }

            let game = doc.games.get(&room.game_id).ok_or(ApiError::GameNotFound)?;
            let version = game.version(&room.version).ok_or(ApiError::GameNotFound)?;
            Ok(StartPlan {
                game_id: room.game_id.clone(),
                version: room.version.clone(),
                bundle_path: PathBuf::from(&version.path),
            })
        })();

        (finished, plan)
    });
    tear_down_async(supervisor.clone(), finished);
    let plan = plan?;

    let addr = supervisor
        .start_game_server(&plan.game_id, &plan.version, room_id, &plan.bundle_path)
        .await;

    let spawned = match addr {
        Ok(addr) => addr,
        Err(e) => return Err(e),
    };

    let result = store.update(|doc| -> Result<Room, ApiError> {
        let room = doc.rooms.get_mut(&room_id).ok_or(ApiError::RoomGone)?;
        if room.status != RoomStatus::Waiting || room.host != host {
            return Err(ApiError::RoomGone);
        }

        room.started_at = Some(now_ts());
        room.status = RoomStatus::InGame;
        room.game_server = Some(match &spawned {
            Some(addr) => GameServerAddr {
                host: addr.host.clone(),
                port: addr.port,
            },
            None => fallback_addr.clone(),
        });
        for player in room.players.clone() {
            room.heartbeats.insert(player, now_ts());
        }
        Ok(room.clone())
    });

    if result.is_err() {
        let supervisor = supervisor.clone();
        tokio::spawn(async move {
            supervisor.stop_game_server(room_id).await;
        });
    }

    result
}

/// Cold-boot cleanup: rooms left `in_game` across a restart have no
/// surviving Runtime Supervisor handle, so they are marked `finished` with
/// reason `server_restart` rather than attempted for reconciliation.
pub fn cold_boot_cleanup(store: &PersistentStore) {
    store.update(|doc| {
        for room in doc.rooms.values_mut() {
            if room.status == RoomStatus::InGame {
                finish_room(room, "server_restart".to_string());
            }
        }
    });
}

/// Fire-and-forget teardown for rooms GC just finished. The store lock is
/// already released by the time this runs, so these calls may take their
/// time without blocking any other registry operation.
fn tear_down_async(supervisor: RuntimeSupervisor, room_ids: Vec<RoomId>) {
    if room_ids.is_empty() {
        return;
    }
    tokio::spawn(async move {
        for id in room_ids {
            supervisor.stop_game_server(id).await;
        }
    });
}
