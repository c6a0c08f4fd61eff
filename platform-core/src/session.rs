//! Session & Heartbeat Layer.
//!
//! An account is "logged in" purely as a function of its entry in the
//! session table: `sessions[role][username] = last_seen`. There is no
//! separate `online` bit to keep in sync — `is_logged_in` recomputes
//! freshness against `SESSION_TIMEOUT` on every call and never writes,
//! and the "online" badge shown in `GET /players` recomputes freshness
//! against the shorter `ONLINE_TIMEOUT` window the same way.

use std::collections::HashMap;

use crate::error::ApiError;
use crate::model::{now_ts, Developer, Player, Role};
use crate::store::PersistentStore;

/// Register a new account under `role`. Fails if the username is taken.
pub fn register(
    store: &PersistentStore,
    role: Role,
    username: &str,
    password: &str,
) -> Result<(), ApiError> {
    if username.is_empty() || password.is_empty() {
        return Err(ApiError::InvalidInput(
            "username and password must not be empty".into(),
        ));
    }

    store.update(|doc| {
        let taken = match role {
            Role::Developer => doc.developers.contains_key(username),
            Role::Player => doc.players.contains_key(username),
        };
        if taken {
            return Err(ApiError::UsernameTaken);
        }
        match role {
            Role::Developer => {
                doc.developers.insert(
                    username.to_string(),
                    Developer {
                        password: password.to_string(),
                        games: Vec::new(),
                    },
                );
            }
            Role::Player => {
                doc.players.insert(
                    username.to_string(),
                    Player {
                        password: password.to_string(),
                        played_games: HashMap::new(),
                    },
                );
            }
        }
        Ok(())
    })
}

/// Log in. Fails on a missing user or mismatched secret, and on a still-fresh
/// existing session (`now - last_seen < CONCURRENT_LOGIN_LOCK`). On success,
/// `sessions[role][username] = now`.
pub fn login(
    store: &PersistentStore,
    role: Role,
    username: &str,
    password: &str,
    concurrent_login_lock_secs: u64,
) -> Result<(), ApiError> {
    store.update(|doc| {
        let password_matches = match role {
            Role::Developer => doc.developers.get(username).map(|d| d.password == password),
            Role::Player => doc.players.get(username).map(|p| p.password == password),
        };
        if password_matches != Some(true) {
            return Err(ApiError::BadCredentials);
        }

        if let Some(last_seen) = doc.sessions.table(role).get(username).copied() {
            if now_ts().saturating_sub(last_seen) < concurrent_login_lock_secs {
                return Err(ApiError::ConcurrentLogin);
            }
        }

        doc.sessions.table_mut(role).insert(username.to_string(), now_ts());
        Ok(())
    })
}

/// Idempotent. Removes the session entry if the user exists; a no-op
/// otherwise (there is nothing to clean up for an unknown user).
pub fn logout(store: &PersistentStore, role: Role, username: &str) {
    store.update(|doc| {
        doc.sessions.table_mut(role).remove(username);
    });
}

/// Read-only: true iff a session entry exists and `now - last_seen <=
/// SESSION_TIMEOUT`. Performs no mutation — no sliding renewal on every
/// check, which is what lets this be called on every authenticated request
/// without touching the store's write path.
pub fn is_logged_in(
    store: &PersistentStore,
    role: Role,
    username: &str,
    session_timeout_secs: u64,
) -> bool {
    let doc = store.snapshot();
    doc.sessions
        .table(role)
        .get(username)
        .map(|&last_seen| now_ts().saturating_sub(last_seen) <= session_timeout_secs)
        .unwrap_or(false)
}

/// Whether `username` should be shown as online in a player listing: a
/// session entry fresh within the shorter `ONLINE_TIMEOUT` window.
pub fn is_online(
    store: &PersistentStore,
    role: Role,
    username: &str,
    online_timeout_secs: u64,
) -> bool {
    let doc = store.snapshot();
    doc.sessions
        .table(role)
        .get(username)
        .map(|&last_seen| now_ts().saturating_sub(last_seen) <= online_timeout_secs)
        .unwrap_or(false)
}

/// If a session entry exists, refresh it to `now`; otherwise no-op. The
/// HTTP layer is responsible for rejecting an unauthenticated caller before
/// ever reaching this call — this function itself never fails.
pub fn heartbeat(store: &PersistentStore, role: Role, username: &str) {
    store.update(|doc| {
        if doc.sessions.table(role).contains_key(username) {
            doc.sessions.table_mut(role).insert(username.to_string(), now_ts());
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> PersistentStore {
        let dir = tempfile::tempdir().unwrap();
        PersistentStore::open(dir.path().join("store.json")).unwrap()
    }

    #[test]
    fn register_then_login_roundtrip() {
        let s = store();
        register(&s, Role::Player, "alice", "pw").unwrap();
        login(&s, Role::Player, "alice", "pw", 30).unwrap();
        assert!(is_logged_in(&s, Role::Player, "alice", 3600));
    }

    #[test]
    fn duplicate_registration_rejected() {
        let s = store();
        register(&s, Role::Player, "alice", "pw").unwrap();
        assert_eq!(
            register(&s, Role::Player, "alice", "pw2"),
            Err(ApiError::UsernameTaken)
        );
    }

    #[test]
    fn wrong_password_rejected() {
        let s = store();
        register(&s, Role::Developer, "bob", "pw").unwrap();
        assert_eq!(
            login(&s, Role::Developer, "bob", "wrong", 30),
            Err(ApiError::BadCredentials)
        );
    }

    #[test]
    fn concurrent_login_locked_until_stale() {
        let s = store();
        register(&s, Role::Player, "carol", "pw").unwrap();
        login(&s, Role::Player, "carol", "pw", 30).unwrap();
        assert_eq!(
            login(&s, Role::Player, "carol", "pw", 30),
            Err(ApiError::ConcurrentLogin)
        );
        s.update(|doc| {
            doc.sessions.player.insert("carol".into(), 0);
        });
        assert!(login(&s, Role::Player, "carol", "pw", 30).is_ok());
    }

    #[test]
    fn logout_clears_session() {
        let s = store();
        register(&s, Role::Player, "dana", "pw").unwrap();
        login(&s, Role::Player, "dana", "pw", 30).unwrap();
        logout(&s, Role::Player, "dana");
        assert!(!is_logged_in(&s, Role::Player, "dana", 3600));
    }

    #[test]
    fn logout_of_unknown_user_is_a_noop() {
        let s = store();
        logout(&s, Role::Player, "ghost");
    }

    #[test]
    fn heartbeat_without_session_is_a_noop() {
        let s = store();
        register(&s, Role::Player, "eve", "pw").unwrap();
        heartbeat(&s, Role::Player, "eve");
        assert!(!is_logged_in(&s, Role::Player, "eve", 3600));
    }

    #[test]
    fn session_expires_past_timeout() {
        let s = store();
        register(&s, Role::Player, "frank", "pw").unwrap();
        login(&s, Role::Player, "frank", "pw", 30).unwrap();
        s.update(|doc| {
            doc.sessions.player.insert("frank".into(), 0);
        });
        assert!(!is_logged_in(&s, Role::Player, "frank", 10));
        assert!(is_logged_in(&s, Role::Player, "frank", 10_000_000));
    }

    #[test]
    fn is_logged_in_performs_no_write() {
        let s = store();
        register(&s, Role::Player, "gail", "pw").unwrap();
        login(&s, Role::Player, "gail", "pw", 30).unwrap();
        let writes_before = s.write_count();
        for _ in 0..10_000 {
            is_logged_in(&s, Role::Player, "gail", 3600);
        }
        assert_eq!(s.write_count(), writes_before);
    }
}
