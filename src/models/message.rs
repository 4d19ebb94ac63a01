use super::trace::TraceEvent;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Local>,
    /// Time from sending the request until the first content chunk arrived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_start_time: Option<Duration>,
    /// Time from sending the request until the turn finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<Duration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traces: Vec<TraceEvent>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content.into())
    }

    fn new(role: Role, content: String) -> Self {
        Self {
            role,
            content,
            timestamp: Local::now(),
            response_start_time: None,
            response_time: None,
            traces: Vec::new(),
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}
