//! Game Runtime Supervisor.
//!
//! Grounded on an engine-process pattern (spawn via
//! `tokio::process::Command` with piped stdio, bounded shutdown via
//! `timeout` + `kill`): here the "engine" is an arbitrary per-room game
//! server, so the protocol on stdio is opaque and the sole liveness
//! signal is a TCP connect.
//!
//! The handle map carries its own mutex, independent of the persistent
//! store's — the supervisor must never be nested under the store lock,
//! and this type is never reached except from outside an `update` closure.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};

use crate::error::ApiError;
use crate::model::RoomId;

const READINESS_BUDGET: Duration = Duration::from_secs(3);
const READINESS_BACKOFF: Duration = Duration::from_millis(50);

#[derive(Debug, Deserialize)]
struct EntryManifest {
    server_entry: Option<String>,
}

/// A launched game server's address, handed back to the Room Registry to
/// publish as `room.game_server`.
#[derive(Debug, Clone)]
pub struct GameServerAddr {
    pub host: String,
    pub port: u16,
}

/// An in-memory record of a spawned (or client-only) room server.
struct RuntimeHandle {
    child: Option<Child>,
    port: Option<u16>,
    #[allow(dead_code)]
    extract_dir: PathBuf,
}

/// Owns the extraction cache and the live process registry. Cheaply
/// clonable (`Arc` inside) so the HTTP layer can hand it to every request
/// handler without wrapping it again.
#[derive(Clone)]
pub struct RuntimeSupervisor {
    runtime_dir: PathBuf,
    bind_host: String,
    public_host: Option<String>,
    handles: Arc<Mutex<HashMap<RoomId, RuntimeHandle>>>,
}

impl RuntimeSupervisor {
    pub fn new(runtime_dir: PathBuf, bind_host: String, public_host: Option<String>) -> Self {
        Self {
            runtime_dir,
            bind_host,
            public_host,
            handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Extract the bundle (idempotent per `(game_id, version)`), resolve
    /// `server_entry`, allocate a port, spawn, and probe readiness.
    ///
    /// Returns `Ok(None)` when the bundle has no `server_entry` — the game
    /// is client-only and the caller should fall back to the platform's own
    /// address.
    pub async fn start_game_server(
        &self,
        game_id: &str,
        version: &str,
        room_id: RoomId,
        bundle_path: &Path,
    ) -> Result<Option<GameServerAddr>, ApiError> {
        let extract_dir = self.extract_dir(game_id, version);
        extract_once(bundle_path, &extract_dir).await?;

        let manifest_path = extract_dir.join("manifest.json");
        let manifest_bytes = tokio::fs::read(&manifest_path)
            .await
            .map_err(|e| ApiError::Internal(format!("reading extracted manifest: {e}")))?;
        let manifest: EntryManifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| ApiError::Internal(format!("corrupt extracted manifest: {e}")))?;

        let Some(server_entry) = manifest.server_entry.filter(|s| !s.is_empty()) else {
            return Ok(None);
        };

        let entry_path = extract_dir.join(&server_entry);
        if !entry_path.exists() {
            return Err(ApiError::RuntimeMissingEntry);
        }

        let public_host = self
            .public_host
            .clone()
            .or_else(|| hostname())
            .unwrap_or_else(|| self.bind_host.clone());

        let port = allocate_ephemeral_port(&self.bind_host)
            .await
            .map_err(|e| ApiError::Internal(format!("port allocation failed: {e}")))?;

        let mut command = Command::new(&entry_path);
        command
            .arg("--room")
            .arg(room_id.to_string())
            .arg("--port")
            .arg(port.to_string())
            .current_dir(&extract_dir)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());

        let mut child = command
            .spawn()
            .map_err(|e| ApiError::Internal(format!("spawn failed: {e}")))?;

        match wait_for_readiness(&mut child, port).await {
            Ok(()) => {
                self.handles.lock().await.insert(
                    room_id,
                    RuntimeHandle {
                        child: Some(child),
                        port: Some(port),
                        extract_dir,
                    },
                );
                Ok(Some(GameServerAddr {
                    host: public_host,
                    port,
                }))
            }
            Err(e) => {
                let _ = child.kill().await;
                Err(e)
            }
        }
    }

    /// Pop the handle (if any) and terminate the process. Idempotent and
    /// best-effort: a dead or already-removed process is not an error.
    pub async fn stop_game_server(&self, room_id: RoomId) {
        let handle = self.handles.lock().await.remove(&room_id);
        if let Some(mut handle) = handle {
            if let Some(mut child) = handle.child.take() {
                let _ = child.kill().await;
                let _ = child.wait().await;
            }
        }
    }

    fn extract_dir(&self, game_id: &str, version: &str) -> PathBuf {
        self.runtime_dir.join(game_id).join(version)
    }
}

/// Extract `bundle_path` into `extract_dir` unless it's already present.
async fn extract_once(bundle_path: &Path, extract_dir: &Path) -> Result<(), ApiError> {
    if extract_dir.join("manifest.json").exists() {
        return Ok(());
    }

    let bundle_path = bundle_path.to_path_buf();
    let extract_dir = extract_dir.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<(), ApiError> {
        std::fs::create_dir_all(&extract_dir).map_err(|e| ApiError::Internal(e.to_string()))?;
        let file = std::fs::File::open(&bundle_path).map_err(|_| ApiError::ArtifactMissing)?;
        let mut archive =
            zip::ZipArchive::new(file).map_err(|e| ApiError::Internal(format!("corrupt bundle: {e}")))?;
        archive
            .extract(&extract_dir)
            .map_err(|e| ApiError::Internal(format!("extract failed: {e}")))?;
        Ok(())
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
}

/// Bind `(bind_host, 0)`, read back the assigned port, then drop the
/// listener. Race-tolerant: the readiness probe, not this allocation, is
/// the authoritative liveness check.
async fn allocate_ephemeral_port(bind_host: &str) -> std::io::Result<u16> {
    let listener = TcpListener::bind((bind_host, 0)).await?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

async fn wait_for_readiness(child: &mut Child, port: u16) -> Result<(), ApiError> {
    let deadline = tokio::time::Instant::now() + READINESS_BUDGET;
    let addr: SocketAddr = ([127, 0, 0, 1], port).into();

    loop {
        if let Some(status) = child.try_wait().map_err(|e| ApiError::Internal(e.to_string()))? {
            return Err(ApiError::SpawnFailed(status.code()));
        }

        if TcpStream::connect(addr).await.is_ok() {
            return Ok(());
        }

        if tokio::time::Instant::now() >= deadline {
            return Err(ApiError::StartupTimeout);
        }

        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        let _ = timeout(remaining.min(READINESS_BACKOFF), sleep(READINESS_BACKOFF)).await;
    }
}

fn hostname() -> Option<String> {
    std::env::var("HOSTNAME").ok().filter(|h| !h.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allocate_ephemeral_port_returns_a_bindable_port() {
        let port = allocate_ephemeral_port("127.0.0.1").await.unwrap();
        assert!(port > 0);
    }

    #[tokio::test]
    async fn stop_game_server_on_unknown_room_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = RuntimeSupervisor::new(dir.path().to_path_buf(), "0.0.0.0".into(), None);
        supervisor.stop_game_server(999).await;
    }

    #[tokio::test]
    async fn start_game_server_without_server_entry_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let games_dir = dir.path().join("games");
        std::fs::create_dir_all(&games_dir).unwrap();
        let bundle_path = games_dir.join("dice-1.0.0.zip");

        let mut buf = Vec::new();
        {
            use std::io::Write as _;
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("manifest.json", options).unwrap();
            writer
                .write_all(br#"{"entry":"main.py"}"#)
                .unwrap();
            writer.finish().unwrap();
        }
        std::fs::write(&bundle_path, buf).unwrap();

        let supervisor = RuntimeSupervisor::new(dir.path().join("runtime"), "127.0.0.1".into(), None);
        let result = supervisor
            .start_game_server("dice", "1.0.0", 1, &bundle_path)
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
