//! Record models shared between the loader and the bot services
//!
//! Catalog records are deliberately flat: numeric columns from the source CSV
//! (scores, year) are carried as opaque strings, exactly as the document store
//! receives them. Multi-valued columns (genre, platform) stay comma-separated
//! on the record and are only expanded into category nodes at graph
//! population time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Lowest rank a liked-edge may carry
pub const RANK_MIN: i64 = 1;

/// Highest rank a liked-edge may carry
pub const RANK_MAX: i64 = 5;

/// An insertable catalog row, positionally mapped from the games CSV.
///
/// `validate()` must pass before the record is handed to a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct GameRecord {
    /// Canonical short name, used as the graph node display name
    #[validate(length(min = 1, message = "basename must not be empty"))]
    pub basename: String,

    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,

    /// Comma-separated genre tokens
    #[validate(length(min = 1, message = "genre must not be empty"))]
    pub genre: String,

    /// Comma-separated platform tokens
    #[validate(length(min = 1, message = "platform must not be empty"))]
    pub platform: String,

    pub publisher: String,
    pub developer: String,
    pub critic_score: String,
    pub user_score: String,
    pub year: String,
}

/// A catalog record reloaded from the document store, id stringified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    /// Hex form of the store-assigned object id
    pub id: String,

    #[serde(flatten)]
    pub record: GameRecord,
}

/// A deduplicated categorical value (genre or platform)
///
/// Ids are process-local: they are assigned during the deduplication pass of
/// a single pipeline run and reassigned on the next run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A chat-platform user; upserts overwrite every field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub language_code: String,
    pub is_bot: bool,
}

/// A streaming-platform channel owner, identified by its external id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streamer {
    pub id: String,
    pub name: String,
}

/// Payload of a LIKED edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Liked {
    /// Bounded RANK_MIN..=RANK_MAX
    pub rank: i64,
    pub at: DateTime<Utc>,
}

/// Payload of an ADDED edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Added {
    pub at: DateTime<Utc>,
}

/// Payload of a REQUESTED edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requested {
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> GameRecord {
        GameRecord {
            basename: "half-life-2".to_string(),
            name: "Half-Life 2".to_string(),
            genre: "Shooter, Action".to_string(),
            platform: "PC, Xbox".to_string(),
            publisher: "Valve".to_string(),
            developer: "Valve".to_string(),
            critic_score: "96".to_string(),
            user_score: "9.2".to_string(),
            year: "2004".to_string(),
        }
    }

    #[test]
    fn test_valid_record_passes() {
        assert!(sample_record().validate().is_ok());
    }

    #[test]
    fn test_empty_required_field_rejected() {
        let mut record = sample_record();
        record.genre = String::new();
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_opaque_numeric_fields_are_not_validated() {
        let mut record = sample_record();
        record.critic_score = "not-a-number".to_string();
        record.year = String::new();
        assert!(record.validate().is_ok());
    }
}
