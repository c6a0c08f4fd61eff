//! Business-rule errors surfaced to clients.
//!
//! One enum for every business-rule error kind. Each variant carries
//! just enough context for the message shown to the client; the HTTP layer
//! (in `platform-server`) maps `status_hint()` to the concrete status code,
//! keeping this crate free of any HTTP dependency.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("incorrect username or password")]
    BadCredentials,

    #[error("username already taken")]
    UsernameTaken,

    #[error("account already logged in elsewhere")]
    ConcurrentLogin,

    #[error("not logged in")]
    Unauthorized,

    #[error("manifest.json does not match the required schema: {0}")]
    ManifestSchema(String),

    #[error("bundle is invalid: {0}")]
    BundleInvalid(String),

    #[error("stored bundle file is missing")]
    ArtifactMissing,

    #[error("player not found")]
    PlayerNotFound,

    #[error("game not found")]
    GameNotFound,

    #[error("game is inactive")]
    GameInactive,

    #[error("not the owner of this game")]
    NotOwner,

    #[error("version already exists")]
    DuplicateVersion,

    #[error("room not found")]
    RoomNotFound,

    #[error("room is full")]
    RoomFull,

    #[error("room is not waiting: {0}")]
    NotWaiting(String),

    #[error("not a member of this room")]
    NotMember,

    #[error("not the host of this room")]
    NotHost,

    #[error("below minimum player count")]
    BelowMinPlayers,

    #[error("room cap exceeded")]
    RoomCapExceeded,

    #[error("room is gone")]
    RoomGone,

    #[error("game server failed to start (exit code {0:?})")]
    SpawnFailed(Option<i32>),

    #[error("game server startup timed out")]
    StartupTimeout,

    #[error("server_entry file is missing from the bundle")]
    RuntimeMissingEntry,

    #[error("rating score must be between 1 and 5")]
    RatingOutOfRange,

    #[error("player has never played this game")]
    NeverPlayed,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Broad classification used by the HTTP layer to pick a status code.
/// Mirrors a plain 2xx/400/401/404 convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusHint {
    BadRequest,
    Unauthorized,
    NotFound,
    Internal,
}

impl ApiError {
    pub fn status_hint(&self) -> StatusHint {
        match self {
            ApiError::BadCredentials | ApiError::ConcurrentLogin | ApiError::Unauthorized => {
                StatusHint::Unauthorized
            }
            ApiError::GameNotFound
            | ApiError::RoomNotFound
            | ApiError::RoomGone
            | ApiError::PlayerNotFound => StatusHint::NotFound,
            ApiError::Internal(_) => StatusHint::Internal,
            ApiError::InvalidInput(_)
            | ApiError::UsernameTaken
            | ApiError::ManifestSchema(_)
            | ApiError::BundleInvalid(_)
            | ApiError::ArtifactMissing
            | ApiError::GameInactive
            | ApiError::NotOwner
            | ApiError::DuplicateVersion
            | ApiError::RoomFull
            | ApiError::NotWaiting(_)
            | ApiError::NotMember
            | ApiError::NotHost
            | ApiError::BelowMinPlayers
            | ApiError::RoomCapExceeded
            | ApiError::SpawnFailed(_)
            | ApiError::StartupTimeout
            | ApiError::RuntimeMissingEntry
            | ApiError::RatingOutOfRange
            | ApiError::NeverPlayed => StatusHint::BadRequest,
        }
    }
}

impl From<crate::store::StoreError> for ApiError {
    fn from(e: crate::store::StoreError) -> Self {
        ApiError::Internal(e.to_string())
    }
}
