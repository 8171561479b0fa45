use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{model::RankedEntry, service::DEFAULT_LIMIT};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitScoreRequest {
    pub user_id: String,
    pub username: String,
    pub score: i64,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}
fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntryResponse {
    pub id: Uuid,
    pub user_id: String,
    pub username: String,
    pub score: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub rank: i64,
}

impl From<RankedEntry> for LeaderboardEntryResponse {
    fn from(r: RankedEntry) -> Self {
        Self {
            id: r.entry.id,
            user_id: r.entry.user_id,
            username: r.entry.username,
            score: r.entry.score,
            created_at: r.entry.created_at,
            rank: r.rank,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::model::LeaderboardEntry;
    use time::macros::datetime;

    #[test]
    fn response_uses_boundary_names() {
        let entry = LeaderboardEntry::new("u1".into(), "alice".into(), 300, datetime!(2024-05-01 08:30 UTC));
        let v = serde_json::to_value(LeaderboardEntryResponse::from(RankedEntry { entry, rank: 2 })).unwrap();
        assert_eq!(v["userId"], "u1");
        assert_eq!(v["username"], "alice");
        assert_eq!(v["score"], 300);
        assert_eq!(v["rank"], 2);
        assert_eq!(v["createdAt"], "2024-05-01T08:30:00Z");
    }

    #[test]
    fn limit_defaults_to_ten() {
        let q: LeaderboardQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.limit, 10);
    }
}
