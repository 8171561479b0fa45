use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{InsertUserError, LeaderboardStore, SessionStore, UserStore};
use crate::{
    auth::model::User,
    leaderboard::model::LeaderboardEntry,
    sessions::model::{GameSession, Position},
};

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct GameSessionRow {
    id: Uuid,
    user_id: String,
    username: String,
    score: i64,
    is_active: bool,
    snake: Option<Json<Vec<Position>>>,
    food: Option<Json<Position>>,
    direction: String,
    started_at: OffsetDateTime,
    updated_at: Option<OffsetDateTime>,
}

impl TryFrom<GameSessionRow> for GameSession {
    type Error = anyhow::Error;

    fn try_from(r: GameSessionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            username: r.username,
            score: r.score,
            is_active: r.is_active,
            snake: r.snake.map(|j| j.0),
            food: r.food.map(|j| j.0),
            direction: r
                .direction
                .parse()
                .with_context(|| format!("session {} has bad direction", r.id))?,
            started_at: r.started_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct LeaderboardRow {
    id: Uuid,
    user_id: String,
    username: String,
    score: i64,
    created_at: OffsetDateTime,
}

impl From<LeaderboardRow> for LeaderboardEntry {
    fn from(r: LeaderboardRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            username: r.username,
            score: r.score,
            created_at: r.created_at,
        }
    }
}

const UNIQUE_VIOLATION: &str = "23505";

/// Maps unique-constraint failures on `users` to typed duplicates.
fn classify_user_insert(err: sqlx::Error) -> InsertUserError {
    let duplicate = match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            match db.constraint() {
                Some("users_email_key") => Some(InsertUserError::DuplicateEmail),
                Some("users_username_key") => Some(InsertUserError::DuplicateUsername),
                _ => None,
            }
        }
        _ => None,
    };
    match duplicate {
        Some(d) => d,
        None => InsertUserError::Other(anyhow::Error::new(err).context("insert user")),
    }
}

const SESSION_COLUMNS: &str = "id, user_id, username, score, is_active, snake, food, direction, started_at, updated_at";

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &User) -> Result<(), InsertUserError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.db)
        .await
        .map_err(classify_user_insert)?;
        Ok(())
    }

    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, username, email, password_hash, created_at FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, username, email, password_hash, created_at FROM users WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, username, email, password_hash, created_at FROM users WHERE username = $1"#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .context("find user by username")?;
        Ok(user)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn insert_session(&self, s: &GameSession) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO game_sessions
                (id, user_id, username, score, is_active, snake, food, direction, started_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(s.id)
        .bind(&s.user_id)
        .bind(&s.username)
        .bind(s.score)
        .bind(s.is_active)
        .bind(s.snake.clone().map(Json))
        .bind(s.food.map(Json))
        .bind(s.direction.as_str())
        .bind(s.started_at)
        .bind(s.updated_at)
        .execute(&self.db)
        .await
        .context("insert game session")?;
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> anyhow::Result<Option<GameSession>> {
        let row = sqlx::query_as::<_, GameSessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM game_sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get game session")?;
        row.map(GameSession::try_from).transpose()
    }

    async fn list_active_sessions(&self) -> anyhow::Result<Vec<GameSession>> {
        let rows = sqlx::query_as::<_, GameSessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM game_sessions WHERE is_active ORDER BY started_at ASC, id ASC"
        ))
        .fetch_all(&self.db)
        .await
        .context("list active game sessions")?;
        rows.into_iter().map(GameSession::try_from).collect()
    }

    async fn update_session(&self, s: &GameSession) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE game_sessions
               SET score = $2, is_active = $3, snake = $4, food = $5,
                   direction = $6, updated_at = $7
             WHERE id = $1
            "#,
        )
        .bind(s.id)
        .bind(s.score)
        .bind(s.is_active)
        .bind(s.snake.clone().map(Json))
        .bind(s.food.map(Json))
        .bind(s.direction.as_str())
        .bind(s.updated_at)
        .execute(&self.db)
        .await
        .context("update game session")?;
        Ok(res.rows_affected() == 1)
    }
}

#[async_trait]
impl LeaderboardStore for PgStore {
    async fn insert_entry(&self, e: &LeaderboardEntry) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO leaderboard (id, user_id, username, score, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(e.id)
        .bind(&e.user_id)
        .bind(&e.username)
        .bind(e.score)
        .bind(e.created_at)
        .execute(&self.db)
        .await
        .context("insert leaderboard entry")?;
        Ok(())
    }

    async fn count_entries_above(&self, score: i64) -> anyhow::Result<i64> {
        let (count,): (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM leaderboard WHERE score > $1"#)
            .bind(score)
            .fetch_one(&self.db)
            .await
            .context("count leaderboard entries above score")?;
        Ok(count)
    }

    async fn top_entries(&self, limit: i64) -> anyhow::Result<Vec<LeaderboardEntry>> {
        let rows = sqlx::query_as::<_, LeaderboardRow>(
            r#"
            SELECT id, user_id, username, score, created_at
              FROM leaderboard
             ORDER BY score DESC, seq ASC
             LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await
        .context("list top leaderboard entries")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
