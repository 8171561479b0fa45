use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// A single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
    Left,
    #[default]
    Right,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UP" => Ok(Direction::Up),
            "DOWN" => Ok(Direction::Down),
            "LEFT" => Ok(Direction::Left),
            "RIGHT" => Ok(Direction::Right),
            other => anyhow::bail!("unknown direction {other:?}"),
        }
    }
}

pub const INITIAL_SNAKE: [Position; 3] = [
    Position::new(10, 10),
    Position::new(9, 10),
    Position::new(8, 10),
];
pub const INITIAL_FOOD: Position = Position::new(15, 15);

/// Persisted state of one game. The head of the snake is its first cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    pub id: Uuid,
    pub user_id: String,
    /// Snapshot taken at creation; not kept in sync with the user record.
    pub username: String,
    pub score: i64,
    pub is_active: bool,
    pub snake: Option<Vec<Position>>,
    pub food: Option<Position>,
    pub direction: Direction,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

/// Partial update. `None` leaves the field untouched; for `snake` and `food`,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPatch {
    pub score: Option<i64>,
    pub snake: Option<Option<Vec<Position>>>,
    pub food: Option<Option<Position>>,
    pub direction: Option<Direction>,
    pub is_active: Option<bool>,
}

impl GameSession {
    pub fn new(user_id: String, username: String, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            username,
            score: 0,
            is_active: true,
            snake: Some(INITIAL_SNAKE.to_vec()),
            food: Some(INITIAL_FOOD),
            direction: Direction::Right,
            started_at: now,
            updated_at: None,
        }
    }

    /// Applies the fields present in `patch`, each replacing the prior value whole.
    ///
    /// Ended sessions are terminal and reject every patch.
    pub fn apply(&mut self, patch: SessionPatch, now: OffsetDateTime) -> AppResult<()> {
        if !self.is_active {
            return Err(AppError::SessionEnded);
        }
        if let Some(score) = patch.score {
            validate_score(score)?;
        }

        if let Some(score) = patch.score {
            self.score = score;
        }
        if let Some(snake) = patch.snake {
            self.snake = snake;
        }
        if let Some(food) = patch.food {
            self.food = food;
        }
        if let Some(direction) = patch.direction {
            self.direction = direction;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        self.updated_at = Some(now);
        Ok(())
    }

    /// Marks the session finished with `final_score`. Ending twice with the same
    /// score leaves the gameplay fields as they were.
    pub fn end(&mut self, final_score: i64, now: OffsetDateTime) -> AppResult<()> {
        validate_score(final_score)?;
        self.is_active = false;
        self.score = final_score;
        self.updated_at = Some(now);
        Ok(())
    }
}

fn validate_score(score: i64) -> AppResult<()> {
    if score < 0 {
        return Err(AppError::Validation("score must be non-negative".into()));
    }
    Ok(())
}
