use crate::error::Result;

/// Trait for session storage backends: a small string key/value store
pub trait SessionStore: Send + Sync {
    /// Read a stored value
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove every stored value
    fn clear(&self) -> Result<()>;
}
