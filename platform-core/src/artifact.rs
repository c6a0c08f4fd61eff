//! Artifact Store: bundle validation, versioned persistence, and the
//! download blob.
//!
//! Validation runs in a fixed order — base64, then zip, then manifest
//! schema, then path safety, then player-count bounds — so a
//! caller always gets the earliest applicable failure rather than a
//! later, more confusing one.

use std::collections::HashSet;
use std::io::Read;
use std::path::PathBuf;

use base64::Engine;
use serde::Deserialize;

use crate::error::ApiError;
use crate::model::{now_ts, Game, Version};
use crate::store::PersistentStore;

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    entry: Option<serde_json::Value>,
    #[serde(default)]
    server_entry: Option<serde_json::Value>,
    #[serde(default)]
    min_players: Option<serde_json::Value>,
    #[serde(default)]
    max_players: Option<serde_json::Value>,
    #[serde(flatten)]
    extra: std::collections::BTreeMap<String, serde_json::Value>,
}

/// A validated manifest plus the decoded zip bytes it came from.
pub struct ValidatedBundle {
    pub zip_bytes: Vec<u8>,
    pub entry: String,
    pub server_entry: String,
    pub min_players: u32,
    pub max_players: u32,
}

/// Run the full validation pipeline over a base64-encoded zip blob.
pub fn validate_bundle(file_data: &str) -> Result<ValidatedBundle, ApiError> {
    let zip_bytes = base64::engine::general_purpose::STANDARD
        .decode(file_data.trim())
        .map_err(|e| ApiError::BundleInvalid(format!("invalid base64: {e}")))?;

    let cursor = std::io::Cursor::new(&zip_bytes);
    let mut archive = zip::ZipArchive::new(cursor)
        .map_err(|e| ApiError::BundleInvalid(format!("invalid zip: {e}")))?;

    let manifest_bytes = read_archive_file(&mut archive, "manifest.json")
        .ok_or_else(|| ApiError::BundleInvalid("manifest.json missing at zip root".into()))?;

    let raw: RawManifest = serde_json::from_slice(&manifest_bytes)
        .map_err(|e| ApiError::ManifestSchema(format!("not a JSON object: {e}")))?;

    if !raw.extra.is_empty() {
        let extra_keys: Vec<_> = raw.extra.keys().cloned().collect();
        return Err(ApiError::ManifestSchema(format!(
            "unexpected keys: {}",
            extra_keys.join(", ")
        )));
    }

    let entry = raw
        .entry
        .as_ref()
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::ManifestSchema("entry must be a non-empty string".into()))?
        .to_string();
    let server_entry = raw
        .server_entry
        .as_ref()
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ApiError::ManifestSchema("server_entry must be a non-empty string".into())
        })?
        .to_string();
    let min_players = raw
        .min_players
        .as_ref()
        .and_then(|v| v.as_u64())
        .filter(|&v| v > 0)
        .ok_or_else(|| ApiError::ManifestSchema("min_players must be a positive integer".into()))?
        as u32;
    let max_players = raw
        .max_players
        .as_ref()
        .and_then(|v| v.as_u64())
        .filter(|&v| v > 0)
        .ok_or_else(|| ApiError::ManifestSchema("max_players must be a positive integer".into()))?
        as u32;

    if min_players > max_players {
        return Err(ApiError::ManifestSchema(
            "min_players must be <= max_players".into(),
        ));
    }

    let entry_norm = normalize_path(&entry)
        .ok_or_else(|| ApiError::BundleInvalid(format!("unsafe entry path: {entry}")))?;
    let server_entry_norm = normalize_path(&server_entry)
        .ok_or_else(|| ApiError::BundleInvalid(format!("unsafe server_entry path: {server_entry}")))?;

    if read_archive_file(&mut archive, &entry_norm).is_none() {
        return Err(ApiError::BundleInvalid(format!(
            "entry file not found in bundle: {entry_norm}"
        )));
    }
    if read_archive_file(&mut archive, &server_entry_norm).is_none() {
        return Err(ApiError::BundleInvalid(format!(
            "server_entry file not found in bundle: {server_entry_norm}"
        )));
    }

    Ok(ValidatedBundle {
        zip_bytes,
        entry: entry_norm,
        server_entry: server_entry_norm,
        min_players,
        max_players,
    })
}

/// Strip a leading `./`, collapse backslashes to forward slashes, strip a
/// leading `/`, then reject any remaining `..` path component.
pub fn normalize_path(raw: &str) -> Option<String> {
    let mut s = raw.replace('\\', "/");
    if let Some(rest) = s.strip_prefix("./") {
        s = rest.to_string();
    }
    if let Some(rest) = s.strip_prefix('/') {
        s = rest.to_string();
    }
    if s.split('/').any(|component| component == "..") {
        return None;
    }
    if s.is_empty() {
        return None;
    }
    Some(s)
}

fn read_archive_file<R: Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
) -> Option<Vec<u8>> {
    let mut file = archive.by_name(name).ok()?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).ok()?;
    Some(buf)
}

/// `slug = lowercase(name)` with every run of non-alphanumerics collapsed to
/// a single `-`, trimmed of leading/trailing `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::new();
    let mut last_was_dash = false;
    for ch in name.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    slug.trim_matches('-').to_string()
}

fn bundle_path(games_dir: &std::path::Path, game_id: &str, version: &str) -> PathBuf {
    games_dir.join(game_id).join(format!("{version}.zip"))
}

/// Validate and persist a brand-new game. Returns the freshly created
/// `Game` on success; the store document is committed as part of the same
/// call.
pub fn create_game(
    store: &PersistentStore,
    games_dir: &std::path::Path,
    developer: &str,
    name: &str,
    description: &str,
    version: &str,
    file_data: &str,
) -> Result<Game, ApiError> {
    if name.trim().is_empty() || version.trim().is_empty() {
        return Err(ApiError::InvalidInput("name and version are required".into()));
    }
    let bundle = validate_bundle(file_data)?;
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(ApiError::InvalidInput("name must contain alphanumerics".into()));
    }

    store.update(|doc| -> Result<Game, ApiError> {
        if !doc.developers.contains_key(developer) {
            return Err(ApiError::Unauthorized);
        }
        if doc.games.contains_key(&slug) {
            return Err(ApiError::InvalidInput(format!("game slug already exists: {slug}")));
        }

        let path = bundle_path(games_dir, &slug, version);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ApiError::Internal(e.to_string()))?;
        }
        std::fs::write(&path, &bundle.zip_bytes).map_err(|e| ApiError::Internal(e.to_string()))?;

        let game = Game {
            id: slug.clone(),
            name: name.to_string(),
            developer: developer.to_string(),
            description: description.to_string(),
            min_players: bundle.min_players,
            max_players: bundle.max_players,
            active: true,
            accept_new_rooms: true,
            versions: vec![Version {
                version: version.to_string(),
                path: path.to_string_lossy().to_string(),
                uploaded_at: now_ts(),
                notes: "Initial release".to_string(),
            }],
            latest_version: version.to_string(),
            deactivated_at: None,
        };

        doc.games.insert(slug.clone(), game.clone());
        if let Some(dev) = doc.developers.get_mut(developer) {
            dev.games.push(slug.clone());
        }
        Ok(game)
    })
}

/// Validate and append a new version to an existing, owned, active game.
pub fn update_game_version(
    store: &PersistentStore,
    games_dir: &std::path::Path,
    developer: &str,
    game_id: &str,
    version: &str,
    file_data: &str,
    notes: &str,
) -> Result<Game, ApiError> {
    if version.trim().is_empty() {
        return Err(ApiError::InvalidInput("version is required".into()));
    }
    let bundle = validate_bundle(file_data)?;

    store.update(|doc| -> Result<Game, ApiError> {
        let existing = doc.games.get(game_id).ok_or(ApiError::GameNotFound)?;
        if existing.developer != developer {
            return Err(ApiError::NotOwner);
        }
        if !existing.active {
            return Err(ApiError::GameInactive);
        }
        if existing.min_players != bundle.min_players || existing.max_players != bundle.max_players {
            return Err(ApiError::InvalidInput(
                "min_players/max_players must match the original game".into(),
            ));
        }
        if existing.version(version).is_some() {
            return Err(ApiError::DuplicateVersion);
        }

        let path = bundle_path(games_dir, game_id, version);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ApiError::Internal(e.to_string()))?;
        }
        std::fs::write(&path, &bundle.zip_bytes).map_err(|e| ApiError::Internal(e.to_string()))?;

        let game = doc.games.get_mut(game_id).expect("checked above");
        game.versions.push(Version {
            version: version.to_string(),
            path: path.to_string_lossy().to_string(),
            uploaded_at: now_ts(),
            notes: notes.to_string(),
        });
        game.latest_version = version.to_string();
        Ok(game.clone())
    })
}

/// Soft-disable a game: the bundle and any in-flight rooms are left alone.
/// Returns the number of rooms still referencing this game that are not
/// `finished`.
pub fn remove_game(store: &PersistentStore, developer: &str, game_id: &str) -> Result<usize, ApiError> {
    store.update(|doc| -> Result<usize, ApiError> {
        let game = doc.games.get(game_id).ok_or(ApiError::GameNotFound)?;
        if game.developer != developer {
            return Err(ApiError::NotOwner);
        }

        let active_rooms = doc
            .rooms
            .values()
            .filter(|r| r.game_id == game_id && r.status != crate::model::RoomStatus::Finished)
            .count();

        let game = doc.games.get_mut(game_id).expect("checked above");
        game.active = false;
        game.accept_new_rooms = false;
        game.deactivated_at = Some(now_ts());
        Ok(active_rooms)
    })
}

pub struct DownloadBlob {
    pub file_data: String,
    pub version: String,
    pub name: String,
    pub game_id: String,
}

/// Resolve `version` (explicit, or the game's latest) and return its bundle
/// as a base64 blob. Refuses inactive games unless an active room still
/// references them.
pub fn download_game(
    store: &PersistentStore,
    game_id: &str,
    version: Option<&str>,
) -> Result<DownloadBlob, ApiError> {
    let doc = store.snapshot();
    let game = doc.games.get(game_id).ok_or(ApiError::GameNotFound)?;

    if !game.active {
        let has_active_room = doc
            .rooms
            .values()
            .any(|r| r.game_id == game_id && r.status != crate::model::RoomStatus::Finished);
        if !has_active_room {
            return Err(ApiError::GameInactive);
        }
    }

    let version_str = version.unwrap_or(&game.latest_version);
    let version_entry = game.version(version_str).ok_or(ApiError::GameNotFound)?;

    let bytes = std::fs::read(&version_entry.path).map_err(|_| ApiError::ArtifactMissing)?;
    let file_data = base64::engine::general_purpose::STANDARD.encode(bytes);

    Ok(DownloadBlob {
        file_data,
        version: version_entry.version.clone(),
        name: game.name.clone(),
        game_id: game.id.clone(),
    })
}

/// Ignore set shared between the Artifact/Integrity services and, by
/// contract, every client: entries under these names never enter a
/// content-hash manifest.
pub fn ignored_top_level_dirs() -> HashSet<&'static str> {
    ["__MACOSX", ".git", ".idea", ".vscode"].into_iter().collect()
}

pub fn is_ignored_path(path: &str) -> bool {
    let top_level = ignored_top_level_dirs();
    let components: Vec<&str> = path.split('/').collect();
    if let Some(first) = components.first() {
        if top_level.contains(first) {
            return true;
        }
    }
    if components.iter().any(|c| *c == "__pycache__") {
        return true;
    }
    let basename = components.last().copied().unwrap_or("");
    basename == ".DS_Store"
        || basename == "Thumbs.db"
        || basename.ends_with(".pyc")
        || basename.ends_with(".pyo")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn zip_with(files: &[(&str, &[u8])]) -> String {
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            let options =
                zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
            for (name, contents) in files {
                writer.start_file(*name, options).unwrap();
                writer.write_all(contents).unwrap();
            }
            writer.finish().unwrap();
        }
        base64::engine::general_purpose::STANDARD.encode(buf)
    }

    fn valid_manifest_zip() -> String {
        zip_with(&[
            (
                "manifest.json",
                br#"{"entry":"main.py","server_entry":"server.py","min_players":2,"max_players":4}"#,
            ),
            ("main.py", b"print('hi')"),
            ("server.py", b"print('server')"),
        ])
    }

    #[test]
    fn validate_bundle_accepts_well_formed_zip() {
        let bundle = validate_bundle(&valid_manifest_zip()).unwrap();
        assert_eq!(bundle.entry, "main.py");
        assert_eq!(bundle.server_entry, "server.py");
        assert_eq!(bundle.min_players, 2);
        assert_eq!(bundle.max_players, 4);
    }

    #[test]
    fn validate_bundle_rejects_bad_base64() {
        assert!(matches!(
            validate_bundle("not base64!!"),
            Err(ApiError::BundleInvalid(_))
        ));
    }

    #[test]
    fn validate_bundle_rejects_extra_manifest_keys() {
        let data = zip_with(&[(
            "manifest.json",
            br#"{"entry":"a","server_entry":"b","min_players":1,"max_players":1,"extra":true}"#,
        ), ("a", b""), ("b", b"")]);
        assert!(matches!(validate_bundle(&data), Err(ApiError::ManifestSchema(_))));
    }

    #[test]
    fn validate_bundle_rejects_traversal() {
        let data = zip_with(&[(
            "manifest.json",
            br#"{"entry":"../escape.py","server_entry":"server.py","min_players":1,"max_players":1}"#,
        ), ("server.py", b"")]);
        assert!(matches!(validate_bundle(&data), Err(ApiError::BundleInvalid(_))));
    }

    #[test]
    fn validate_bundle_rejects_min_greater_than_max() {
        let data = zip_with(&[(
            "manifest.json",
            br#"{"entry":"a","server_entry":"b","min_players":4,"max_players":2}"#,
        ), ("a", b""), ("b", b"")]);
        assert!(matches!(validate_bundle(&data), Err(ApiError::ManifestSchema(_))));
    }

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("My Cool Game!!"), "my-cool-game");
        assert_eq!(slugify("  Dice  "), "dice");
    }

    #[test]
    fn normalize_path_strips_prefixes_and_rejects_traversal() {
        assert_eq!(normalize_path("./a/b.py").as_deref(), Some("a/b.py"));
        assert_eq!(normalize_path("/a/b.py").as_deref(), Some("a/b.py"));
        assert_eq!(normalize_path(r"a\b.py").as_deref(), Some("a/b.py"));
        assert_eq!(normalize_path("../escape"), None);
        assert_eq!(normalize_path("a/../b"), None);
    }

    #[test]
    fn is_ignored_path_matches_spec_ignore_set() {
        assert!(is_ignored_path("__MACOSX/foo"));
        assert!(is_ignored_path("a/__pycache__/b.pyc"));
        assert!(is_ignored_path("a/.DS_Store"));
        assert!(!is_ignored_path("server.py"));
    }

    #[test]
    fn create_game_persists_and_writes_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let store = PersistentStore::open(dir.path().join("store.json")).unwrap();
        let games_dir = dir.path().join("games");
        crate::session::register(&store, crate::model::Role::Developer, "alice", "pw").unwrap();

        let game = create_game(
            &store,
            &games_dir,
            "alice",
            "Dice",
            "roll stuff",
            "1.0.0",
            &valid_manifest_zip(),
        )
        .unwrap();

        assert_eq!(game.id, "dice");
        assert_eq!(game.latest_version, "1.0.0");
        assert!(games_dir.join("dice").join("1.0.0.zip").exists());
    }

    #[test]
    fn update_rejects_mismatched_player_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let store = PersistentStore::open(dir.path().join("store.json")).unwrap();
        let games_dir = dir.path().join("games");
        crate::session::register(&store, crate::model::Role::Developer, "alice", "pw").unwrap();
        create_game(&store, &games_dir, "alice", "Dice", "", "1.0.0", &valid_manifest_zip()).unwrap();

        let mismatched = zip_with(&[(
            "manifest.json",
            br#"{"entry":"main.py","server_entry":"server.py","min_players":3,"max_players":4}"#,
        ), ("main.py", b""), ("server.py", b"")]);

        assert_eq!(
            update_game_version(&store, &games_dir, "alice", "dice", "1.0.1", &mismatched, ""),
            Err(ApiError::InvalidInput(
                "min_players/max_players must match the original game".into()
            ))
        );
    }

    #[test]
    fn remove_game_preserves_active_room_count() {
        let dir = tempfile::tempdir().unwrap();
        let store = PersistentStore::open(dir.path().join("store.json")).unwrap();
        let games_dir = dir.path().join("games");
        crate::session::register(&store, crate::model::Role::Developer, "alice", "pw").unwrap();
        create_game(&store, &games_dir, "alice", "Dice", "", "1.0.0", &valid_manifest_zip()).unwrap();

        let active_rooms = remove_game(&store, "alice", "dice").unwrap();
        assert_eq!(active_rooms, 0);
        assert!(!store.snapshot().games["dice"].active);
    }
}
