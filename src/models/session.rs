use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Session {
    pub session_id: String,
    pub created_at: DateTime<Local>,
}

impl Session {
    /// Whether the session is still inside its validity window at `now`.
    pub fn is_valid_at(&self, ttl: Duration, now: DateTime<Local>) -> bool {
        let age_ms = now
            .signed_duration_since(self.created_at)
            .num_milliseconds()
            .unsigned_abs();
        u128::from(age_ms) < ttl.as_millis()
    }

    pub fn is_valid(&self, ttl: Duration) -> bool {
        self.is_valid_at(ttl, Local::now())
    }
}
