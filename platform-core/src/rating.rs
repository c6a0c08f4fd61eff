//! Rating Store: play-gated upsert and average computation.

use crate::error::ApiError;
use crate::model::{now_ts, Rating};
use crate::store::PersistentStore;

/// Add or overwrite `player`'s rating for `game_id`. Rejects, in order: a
/// score outside `[1, 5]`, an unknown player, a player who has never played
/// the game, then an unknown/inactive game. Never-played is checked before
/// the game lookup so a soft-deactivated game still reports `NeverPlayed`
/// rather than `GameInactive` for a player who never played it.
pub fn add_rating(
    store: &PersistentStore,
    player: &str,
    game_id: &str,
    score: u8,
    comment: &str,
) -> Result<(), ApiError> {
    if !(1..=5).contains(&score) {
        return Err(ApiError::RatingOutOfRange);
    }

    store.update(|doc| -> Result<(), ApiError> {
        let player_record = doc.players.get(player).ok_or(ApiError::PlayerNotFound)?;
        if player_record.played_games.get(game_id).copied().unwrap_or(0) == 0 {
            return Err(ApiError::NeverPlayed);
        }
        let game = doc.games.get(game_id).ok_or(ApiError::GameNotFound)?;
        if !game.active {
            return Err(ApiError::GameInactive);
        }

        let existing_id = doc
            .ratings
            .values()
            .find(|r| r.player == player && r.game_id == game_id)
            .map(|r| r.id);

        let id = existing_id.unwrap_or_else(|| {
            let id = doc.next_ids.rating;
            doc.next_ids.rating += 1;
            id
        });

        doc.ratings.insert(
            id,
            Rating {
                id,
                player: player.to_string(),
                game_id: game_id.to_string(),
                score,
                comment: comment.to_string(),
                created_at: now_ts(),
            },
        );
        Ok(())
    })
}

/// Arithmetic mean of every rating for `game_id`, rounded to two decimals.
/// `None` if the game has no ratings yet.
pub fn average_score(store: &PersistentStore, game_id: &str) -> Option<f64> {
    let doc = store.snapshot();
    let scores: Vec<u8> = doc
        .ratings
        .values()
        .filter(|r| r.game_id == game_id)
        .map(|r| r.score)
        .collect();
    if scores.is_empty() {
        return None;
    }
    let sum: u32 = scores.iter().map(|&s| s as u32).sum();
    let mean = sum as f64 / scores.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}
