use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventComment {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub user_name: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub event_id: String,
    pub user_id: String,
    pub user_name: String,
    pub comment: String,
}

impl NewComment {
    pub fn is_blank(&self) -> bool {
        self.comment.trim().is_empty()
    }
}
