//! Score submission and ranking.
//!
//! Two rank definitions coexist and are not interchangeable:
//! - a submitted entry is ranked globally as `1 + count(score > submitted)`;
//! - a listed page is ranked by position, `index + 1` within the returned page.
//!
//! Both are point-in-time values; a concurrent submission can make them stale.

use time::OffsetDateTime;
use tracing::info;

use super::model::{LeaderboardEntry, RankedEntry};
use crate::{
    auth::jwt::Caller,
    error::{AppError, AppResult},
    store::LeaderboardStore,
};

pub const DEFAULT_LIMIT: i64 = 10;

pub async fn submit<S: LeaderboardStore + ?Sized>(
    store: &S,
    caller: Caller,
    user_id: String,
    username: String,
    score: i64,
) -> AppResult<RankedEntry> {
    caller.check_owner(&user_id)?;
    let entry = LeaderboardEntry::new(user_id, username, score, OffsetDateTime::now_utc());
    store.insert_entry(&entry).await?;

    // The new entry is in the set but never strictly above itself.
    let rank = store.count_entries_above(entry.score).await? + 1;
    info!(entry_id = %entry.id, user_id = %entry.user_id, score, rank, "score submitted");
    Ok(RankedEntry { entry, rank })
}

pub async fn list<S: LeaderboardStore + ?Sized>(store: &S, limit: i64) -> AppResult<Vec<RankedEntry>> {
    if limit < 0 {
        return Err(AppError::Validation("limit must be non-negative".into()));
    }
    let entries = store.top_entries(limit).await?;
    Ok(page_ranks(entries))
}

fn page_ranks(entries: Vec<LeaderboardEntry>) -> Vec<RankedEntry> {
    entries
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| RankedEntry {
            entry,
            rank: idx as i64 + 1,
        })
        .collect()
}
