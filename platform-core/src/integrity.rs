//! Integrity Service: deterministic per-file hashing over a stored bundle
//! zip, with an ignore set shared with every client.

use std::io::Read;

use sha2::{Digest, Sha256};

use crate::artifact::is_ignored_path;
use crate::error::ApiError;
use crate::store::PersistentStore;

pub struct IntegrityManifest {
    pub game_id: String,
    pub version: String,
    pub files: std::collections::BTreeMap<String, String>,
}

/// Hash every non-directory, non-ignored entry of the stored zip for
/// `(game_id, version)`.
pub fn game_integrity(
    store: &PersistentStore,
    game_id: &str,
    version: Option<&str>,
) -> Result<IntegrityManifest, ApiError> {
    let doc = store.snapshot();
    let game = doc.games.get(game_id).ok_or(ApiError::GameNotFound)?;
    let version_str = version.unwrap_or(&game.latest_version);
    let version_entry = game.version(version_str).ok_or(ApiError::GameNotFound)?;

    let bytes = std::fs::read(&version_entry.path).map_err(|_| ApiError::ArtifactMissing)?;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ApiError::Internal(format!("corrupt stored bundle: {e}")))?;

    let mut files = std::collections::BTreeMap::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        if entry.is_dir() {
            continue;
        }
        let path = entry.name().replace('\\', "/");
        let path = path.strip_prefix('/').unwrap_or(&path).to_string();
        if is_ignored_path(&path) {
            continue;
        }

        let mut contents = Vec::new();
        entry
            .read_to_end(&mut contents)
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        let digest = hex::encode(Sha256::digest(&contents));
        files.insert(path, digest);
    }

    Ok(IntegrityManifest {
        game_id: game.id.clone(),
        version: version_entry.version.clone(),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use std::io::Write as _;

    fn zip_b64(files: &[(&str, &[u8])]) -> Vec<u8> {
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
        buf
    }

    #[test]
    fn integrity_excludes_ignored_paths_and_hashes_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let store = PersistentStore::open(dir.path().join("store.json")).unwrap();
        let games_dir = dir.path().join("games");

        crate::session::register(&store, crate::model::Role::Developer, "alice", "pw").unwrap();
        let zip_bytes = zip_b64(&[
            ("manifest.json", br#"{"entry":"main.py","server_entry":"server.py","min_players":2,"max_players":2}"#),
            ("main.py", b"print(1)"),
            ("server.py", b"print(2)"),
            ("__MACOSX/junk", b"noise"),
        ]);
        let file_data = base64::engine::general_purpose::STANDARD.encode(&zip_bytes);
        crate::artifact::create_game(&store, &games_dir, "alice", "Dice", "", "1.0.0", &file_data)
            .unwrap();

        let manifest = game_integrity(&store, "dice", None).unwrap();
        assert_eq!(manifest.files.len(), 3); // manifest.json, main.py, server.py
        assert!(!manifest.files.contains_key("__MACOSX/junk"));

        let expected = hex::encode(Sha256::digest(b"print(1)"));
        assert_eq!(manifest.files["main.py"], expected);
    }

    #[test]
    fn tampering_changes_the_digest() {
        let dir = tempfile::tempdir().unwrap();
        let store = PersistentStore::open(dir.path().join("store.json")).unwrap();
        let games_dir = dir.path().join("games");
        crate::session::register(&store, crate::model::Role::Developer, "alice", "pw").unwrap();
        let zip_bytes = zip_b64(&[
            ("manifest.json", br#"{"entry":"main.py","server_entry":"server.py","min_players":2,"max_players":2}"#),
            ("main.py", b"print(1)"),
            ("server.py", b"print(2)"),
        ]);
        let file_data = base64::engine::general_purpose::STANDARD.encode(&zip_bytes);
        crate::artifact::create_game(&store, &games_dir, "alice", "Dice", "", "1.0.0", &file_data)
            .unwrap();

        let original = game_integrity(&store, "dice", None).unwrap();
        let tampered_digest = hex::encode(Sha256::digest(b"print(1) tampered"));
        assert_ne!(original.files["main.py"], tampered_digest);
    }
}
