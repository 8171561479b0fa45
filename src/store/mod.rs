//! Persistence interface consumed by the core services.
//!
//! Every method touches a single record or runs a single read query; nothing
//! here spans a transaction. Concurrent writers to the same record race with
//! last-write-wins.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{auth::model::User, leaderboard::model::LeaderboardEntry, sessions::model::GameSession};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Why a user could not be inserted.
#[derive(Debug, thiserror::Error)]
pub enum InsertUserError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("username already taken")]
    DuplicateUsername,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Email and username are unique; a clash is reported as a typed duplicate
    /// even when it loses a race against a concurrent insert.
    async fn insert_user(&self, user: &User) -> Result<(), InsertUserError>;
    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: &GameSession) -> anyhow::Result<()>;
    async fn get_session(&self, id: Uuid) -> anyhow::Result<Option<GameSession>>;
    /// Sessions with `is_active = true`, oldest first.
    async fn list_active_sessions(&self) -> anyhow::Result<Vec<GameSession>>;
    /// Overwrites the stored record. Returns `false` when no record has that id.
    async fn update_session(&self, session: &GameSession) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait LeaderboardStore: Send + Sync {
    async fn insert_entry(&self, entry: &LeaderboardEntry) -> anyhow::Result<()>;
    /// Number of entries whose score is strictly greater than `score`.
    async fn count_entries_above(&self, score: i64) -> anyhow::Result<i64>;
    /// Highest scores first; equal scores keep insertion order.
    async fn top_entries(&self, limit: i64) -> anyhow::Result<Vec<LeaderboardEntry>>;
}

/// Everything the HTTP layer needs from a backend.
pub trait Store: UserStore + SessionStore + LeaderboardStore {}

impl<T> Store for T where T: UserStore + SessionStore + LeaderboardStore {}
