mod filesystem;
mod memory;
mod storage;

pub use filesystem::FilesystemSessionStore;
pub use memory::MemorySessionStore;
pub use storage::SessionStore;

use crate::error::Result;
use crate::models::Session;
use chrono::{Local, TimeZone};
use std::time::Duration;
use uuid::Uuid;

/// Store key holding the session identifier.
pub const SESSION_ID_KEY: &str = "chatSessionId";
/// Store key holding the session creation time in epoch milliseconds.
pub const SESSION_TIMESTAMP_KEY: &str = "chatSessionTimestamp";

/// Mint a new session
pub fn create_new_session() -> Session {
    Session {
        session_id: Uuid::new_v4().to_string(),
        created_at: Local::now(),
    }
}

/// Read the stored session, if both values are present and well-formed
pub fn load_session(store: &dyn SessionStore) -> Option<Session> {
    let session_id = store.get(SESSION_ID_KEY).filter(|id| !id.is_empty())?;
    let millis = store.get(SESSION_TIMESTAMP_KEY)?.trim().parse::<i64>().ok()?;
    let created_at = Local.timestamp_millis_opt(millis).single()?;
    Some(Session {
        session_id,
        created_at,
    })
}

pub fn save_session(store: &dyn SessionStore, session: &Session) -> Result<()> {
    store.set(SESSION_ID_KEY, &session.session_id)?;
    store.set(
        SESSION_TIMESTAMP_KEY,
        &session.created_at.timestamp_millis().to_string(),
    )?;
    Ok(())
}

/// Reuse the stored session while it is inside `ttl`, otherwise mint and store a new one
pub fn restore_or_create(store: &dyn SessionStore, ttl: Duration) -> Result<Session> {
    if let Some(session) = load_session(store) {
        if session.is_valid(ttl) {
            tracing::debug!(session_id = %session.session_id, "reusing stored session");
            return Ok(session);
        }
        tracing::info!(session_id = %session.session_id, "stored session expired");
    }
    rotate_session(store)
}

/// Mint a new session and store it, replacing the previous one
pub fn rotate_session(store: &dyn SessionStore) -> Result<Session> {
    let session = create_new_session();
    save_session(store, &session)?;
    tracing::info!(session_id = %session.session_id, "started new session");
    Ok(session)
}
