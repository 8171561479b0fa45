//! Session lifecycle: create, read, patch and end game sessions.
//!
//! Each operation loads at most one record and writes at most one record.
//! There is no session-level locking; concurrent patches to the same id race
//! and the last write wins.

use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use super::model::{GameSession, SessionPatch};
use crate::{
    auth::jwt::Caller,
    error::{AppError, AppResult},
    store::SessionStore,
};

pub async fn list_active<S: SessionStore + ?Sized>(store: &S) -> AppResult<Vec<GameSession>> {
    Ok(store.list_active_sessions().await?)
}

pub async fn create<S: SessionStore + ?Sized>(
    store: &S,
    caller: Caller,
    user_id: String,
    username: String,
) -> AppResult<GameSession> {
    caller.check_owner(&user_id)?;
    let session = GameSession::new(user_id, username, OffsetDateTime::now_utc());
    store.insert_session(&session).await?;
    info!(session_id = %session.id, user_id = %session.user_id, "session created");
    Ok(session)
}

pub async fn get<S: SessionStore + ?Sized>(store: &S, id: Uuid) -> AppResult<GameSession> {
    store
        .get_session(id)
        .await?
        .ok_or(AppError::NotFound("Session"))
}

pub async fn update<S: SessionStore + ?Sized>(
    store: &S,
    caller: Caller,
    id: Uuid,
    patch: SessionPatch,
) -> AppResult<GameSession> {
    let mut session = get(store, id).await?;
    caller.check_owner(&session.user_id)?;
    session.apply(patch, OffsetDateTime::now_utc())?;
    save(store, &session).await?;
    debug!(session_id = %id, score = session.score, active = session.is_active, "session updated");
    Ok(session)
}

pub async fn end<S: SessionStore + ?Sized>(
    store: &S,
    caller: Caller,
    id: Uuid,
    final_score: i64,
) -> AppResult<()> {
    let mut session = get(store, id).await?;
    caller.check_owner(&session.user_id)?;
    session.end(final_score, OffsetDateTime::now_utc())?;
    save(store, &session).await?;
    info!(session_id = %id, final_score, "session ended");
    Ok(())
}

async fn save<S: SessionStore + ?Sized>(store: &S, session: &GameSession) -> AppResult<()> {
    // Vanished between read and write.
    if !store.update_session(session).await? {
        return Err(AppError::NotFound("Session"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::model::{Direction, Position, INITIAL_FOOD, INITIAL_SNAKE};
    use crate::store::MemoryStore;

    fn caller() -> Caller {
        Caller {
            user_id: Uuid::new_v4(),
            enforce_ownership: false,
        }
    }

    #[tokio::test]
    async fn create_then_get_returns_initial_state() {
        let store = MemoryStore::new();
        let created = create(&store, caller(), "u1".into(), "alice".into())
            .await
            .unwrap();
        let fetched = get(&store, created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.snake.as_deref(), Some(&INITIAL_SNAKE[..]));
        assert_eq!(fetched.food, Some(INITIAL_FOOD));
        assert_eq!(fetched.direction, Direction::Right);
        assert_eq!(fetched.score, 0);
        assert!(fetched.is_active);
    }

    #[tokio::test]
    async fn missing_session_is_not_found() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(get(&store, id).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            update(&store, caller(), id, SessionPatch::default()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            end(&store, caller(), id, 10).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_persists_partial_fields_and_stamps_time() {
        let store = MemoryStore::new();
        let s = create(&store, caller(), "u1".into(), "alice".into())
            .await
            .unwrap();
        let updated = update(
            &store,
            caller(),
            s.id,
            SessionPatch {
                score: Some(50),
                direction: Some(Direction::Up),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.score, 50);
        assert_eq!(updated.direction, Direction::Up);
        assert_eq!(updated.snake, s.snake);
        assert_eq!(updated.food, s.food);
        assert!(updated.updated_at.is_some());
        assert_eq!(get(&store, s.id).await.unwrap(), updated);

        let moved = update(
            &store,
            caller(),
            s.id,
            SessionPatch {
                snake: Some(Some(vec![Position::new(11, 10), Position::new(10, 10)])),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(moved.score, 50);
        assert_eq!(moved.snake.map(|v| v.len()), Some(2));
    }

    #[tokio::test]
    async fn ended_session_leaves_active_list_and_rejects_updates() {
        let store = MemoryStore::new();
        let a = create(&store, caller(), "u1".into(), "alice".into())
            .await
            .unwrap();
        let b = create(&store, caller(), "u2".into(), "bob".into())
            .await
            .unwrap();

        end(&store, caller(), a.id, 70).await.unwrap();

        let active: Vec<Uuid> = list_active(&store)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(active, vec![b.id]);

        let ended = get(&store, a.id).await.unwrap();
        assert!(!ended.is_active);
        assert_eq!(ended.score, 70);

        let err = update(
            &store,
            caller(),
            a.id,
            SessionPatch {
                score: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::SessionEnded));
    }

    #[tokio::test]
    async fn ending_twice_keeps_state() {
        let store = MemoryStore::new();
        let s = create(&store, caller(), "u1".into(), "alice".into())
            .await
            .unwrap();
        end(&store, caller(), s.id, 12).await.unwrap();
        let once = get(&store, s.id).await.unwrap();
        end(&store, caller(), s.id, 12).await.unwrap();
        let twice = get(&store, s.id).await.unwrap();
        assert_eq!(
            (twice.is_active, twice.score, &twice.snake, twice.food, twice.direction),
            (once.is_active, once.score, &once.snake, once.food, once.direction)
        );
    }

    #[tokio::test]
    async fn ownership_is_checked_only_when_enforced() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let strict = Caller {
            user_id: owner,
            enforce_ownership: true,
        };
        let stranger = Caller {
            user_id: Uuid::new_v4(),
            enforce_ownership: true,
        };

        assert!(matches!(
            create(&store, strict, "someone-else".into(), "x".into()).await,
            Err(AppError::Forbidden(_))
        ));

        let s = create(&store, strict, owner.to_string(), "owner".into())
            .await
            .unwrap();
        assert!(matches!(
            end(&store, stranger, s.id, 5).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(get(&store, s.id).await.unwrap().is_active);

        // permissive callers may act on anyone's session
        end(&store, caller(), s.id, 5).await.unwrap();
    }
}
