use serde::{Deserialize, Deserializer, Serialize};

use super::model::{Direction, Position, SessionPatch};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub user_id: String,
    pub username: String,
}

/// PATCH body. Absent keys are left alone; `null` clears `snake`/`food`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionRequest {
    pub score: Option<i64>,
    #[serde(default, deserialize_with = "present")]
    pub snake: Option<Option<Vec<Position>>>,
    #[serde(default, deserialize_with = "present")]
    pub food: Option<Option<Position>>,
    pub direction: Option<Direction>,
    pub is_active: Option<bool>,
}

/// Maps a key that is present (even as `null`) to `Some(..)`.
fn present<'de, D, T>(d: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Some)
}

impl From<UpdateSessionRequest> for SessionPatch {
    fn from(r: UpdateSessionRequest) -> Self {
        Self {
            score: r.score,
            snake: r.snake,
            food: r.food,
            direction: r.direction,
            is_active: r.is_active,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndSessionRequest {
    pub final_score: i64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_null_keys_differ_for_snake_and_food() {
        let r: UpdateSessionRequest = serde_json::from_str(r#"{"score": 5}"#).unwrap();
        assert_eq!(r.score, Some(5));
        assert!(r.snake.is_none());
        assert!(r.food.is_none());

        let r: UpdateSessionRequest =
            serde_json::from_str(r#"{"snake": null, "food": {"x": 1, "y": 2}}"#).unwrap();
        assert_eq!(r.snake, Some(None));
        assert_eq!(r.food, Some(Some(Position::new(1, 2))));
    }

    #[test]
    fn camel_case_keys_are_accepted() {
        let r: UpdateSessionRequest =
            serde_json::from_str(r#"{"isActive": false, "direction": "DOWN"}"#).unwrap();
        let patch = SessionPatch::from(r);
        assert_eq!(patch.is_active, Some(false));
        assert_eq!(patch.direction, Some(Direction::Down));

        let end: EndSessionRequest = serde_json::from_str(r#"{"finalScore": 12}"#).unwrap();
        assert_eq!(end.final_score, 12);
        let create: CreateSessionRequest =
            serde_json::from_str(r#"{"userId": "u1", "username": "alice"}"#).unwrap();
        assert_eq!(create.user_id, "u1");
    }

    #[test]
    fn malformed_cells_are_rejected() {
        assert!(serde_json::from_str::<UpdateSessionRequest>(r#"{"snake": [{"x": 1}]}"#).is_err());
        assert!(serde_json::from_str::<UpdateSessionRequest>(r#"{"food": "here"}"#).is_err());
        assert!(serde_json::from_str::<UpdateSessionRequest>(r#"{"direction": "NORTH"}"#).is_err());
    }
}
