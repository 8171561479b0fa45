use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{InsertUserError, LeaderboardStore, SessionStore, UserStore};
use crate::{auth::model::User, leaderboard::model::LeaderboardEntry, sessions::model::GameSession};

/// Process-local store. Used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    sessions: HashMap<Uuid, GameSession>,
    /// Append-only, in insertion order.
    entries: Vec<LeaderboardEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), InsertUserError> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(InsertUserError::DuplicateEmail);
        }
        if inner.users.values().any(|u| u.username == user.username) {
            return Err(InsertUserError::DuplicateUsername);
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(&self, session: &GameSession) -> anyhow::Result<()> {
        let mut inner = self.inner.write().await;
        if inner.sessions.contains_key(&session.id) {
            anyhow::bail!("session {} already exists", session.id);
        }
        inner.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> anyhow::Result<Option<GameSession>> {
        Ok(self.inner.read().await.sessions.get(&id).cloned())
    }

    async fn list_active_sessions(&self) -> anyhow::Result<Vec<GameSession>> {
        let inner = self.inner.read().await;
        let mut active: Vec<GameSession> = inner
            .sessions
            .values()
            .filter(|s| s.is_active)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.started_at.cmp(&b.started_at).then(a.id.cmp(&b.id)));
        Ok(active)
    }

    async fn update_session(&self, session: &GameSession) -> anyhow::Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.sessions.get_mut(&session.id) {
            Some(slot) => {
                *slot = session.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl LeaderboardStore for MemoryStore {
    async fn insert_entry(&self, entry: &LeaderboardEntry) -> anyhow::Result<()> {
        self.inner.write().await.entries.push(entry.clone());
        Ok(())
    }

    async fn count_entries_above(&self, score: i64) -> anyhow::Result<i64> {
        let inner = self.inner.read().await;
        Ok(inner.entries.iter().filter(|e| e.score > score).count() as i64)
    }

    async fn top_entries(&self, limit: i64) -> anyhow::Result<Vec<LeaderboardEntry>> {
        let inner = self.inner.read().await;
        let mut entries = inner.entries.clone();
        // stable: ties stay in insertion order
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn entry(name: &str, score: i64) -> LeaderboardEntry {
        LeaderboardEntry::new(name.into(), name.into(), score, OffsetDateTime::now_utc())
    }

    #[tokio::test]
    async fn top_entries_orders_by_score_then_insertion() {
        let store = MemoryStore::new();
        for (name, score) in [("a", 10), ("b", 30), ("c", 10), ("d", 20)] {
            store.insert_entry(&entry(name, score)).await.unwrap();
        }
        let names: Vec<String> = store
            .top_entries(10)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.username)
            .collect();
        assert_eq!(names, ["b", "d", "a", "c"]);
        assert_eq!(store.top_entries(2).await.unwrap().len(), 2);
        assert!(store.top_entries(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn count_above_is_strict() {
        let store = MemoryStore::new();
        for score in [500, 300, 300] {
            store.insert_entry(&entry("x", score)).await.unwrap();
        }
        assert_eq!(store.count_entries_above(300).await.unwrap(), 1);
        assert_eq!(store.count_entries_above(299).await.unwrap(), 3);
        assert_eq!(store.count_entries_above(500).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_of_missing_session_reports_false() {
        let store = MemoryStore::new();
        let s = GameSession::new("u".into(), "n".into(), OffsetDateTime::now_utc());
        assert!(!store.update_session(&s).await.unwrap());
        store.insert_session(&s).await.unwrap();
        assert!(store.update_session(&s).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_user_email_is_refused() {
        let store = MemoryStore::new();
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "a@example.com".into(),
            password_hash: "h".into(),
            created_at: OffsetDateTime::now_utc(),
        };
        store.insert_user(&user).await.unwrap();
        let dup = User {
            id: Uuid::new_v4(),
            username: "other".into(),
            ..user.clone()
        };
        assert!(matches!(
            store.insert_user(&dup).await,
            Err(InsertUserError::DuplicateEmail)
        ));
        assert_eq!(
            store.find_user_by_email("a@example.com").await.unwrap().map(|u| u.id),
            Some(user.id)
        );

        let same_name = User {
            id: Uuid::new_v4(),
            email: "b@example.com".into(),
            ..user.clone()
        };
        assert!(matches!(
            store.insert_user(&same_name).await,
            Err(InsertUserError::DuplicateUsername)
        ));
    }
}
