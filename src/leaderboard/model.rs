use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// One immutable score submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub id: Uuid,
    pub user_id: String,
    pub username: String,
    pub score: i64,
    pub created_at: OffsetDateTime,
}

impl LeaderboardEntry {
    pub fn new(user_id: String, username: String, score: i64, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            username,
            score,
            created_at: now,
        }
    }
}

/// An entry paired with a rank computed at read time. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub entry: LeaderboardEntry,
    pub rank: i64,
}
