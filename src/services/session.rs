//! Session-scoped password cache
//!
//! Holds the password last used to unlock each note, for the lifetime of
//! the process only. Owned by the top-level application session and passed
//! explicitly to the services that need it; never written to the store.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Volatile per-note password cache.
///
/// Cloning shares the underlying map, so every service holding a clone
/// sees the same session state.
#[derive(Clone, Default)]
pub struct SessionSecrets {
    passwords: Arc<Mutex<HashMap<i64, String>>>,
}

impl SessionSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Password cached for a note in this session, if any.
    pub async fn get(&self, note_id: i64) -> Option<String> {
        self.passwords.lock().await.get(&note_id).cloned()
    }

    /// Cache the password that just unlocked a note.
    pub async fn set(&self, note_id: i64, password: String) {
        self.passwords.lock().await.insert(note_id, password);
    }

    /// Forget the cached password for a note.
    pub async fn clear(&self, note_id: i64) {
        self.passwords.lock().await.remove(&note_id);
    }

    /// Forget every cached password (session end).
    pub async fn clear_all(&self) {
        self.passwords.lock().await.clear();
    }
}

// Passwords must not leak through debug logging
impl fmt::Debug for SessionSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionSecrets(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_clear() {
        let secrets = SessionSecrets::new();

        assert_eq!(secrets.get(1).await, None);

        secrets.set(1, "pw1".to_string()).await;
        secrets.set(2, "pw2".to_string()).await;

        assert_eq!(secrets.get(1).await, Some("pw1".to_string()));
        assert_eq!(secrets.get(2).await, Some("pw2".to_string()));

        secrets.clear(1).await;
        assert_eq!(secrets.get(1).await, None);
        assert_eq!(secrets.get(2).await, Some("pw2".to_string()));

        secrets.clear_all().await;
        assert_eq!(secrets.get(2).await, None);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let secrets = SessionSecrets::new();
        let other = secrets.clone();

        secrets.set(5, "shared".to_string()).await;
        assert_eq!(other.get(5).await, Some("shared".to_string()));
    }

    #[test]
    fn test_debug_redacts() {
        let secrets = SessionSecrets::new();
        assert_eq!(format!("{:?}", secrets), "SessionSecrets(<redacted>)");
    }
}
