//! Save orchestrator
//!
//! The single entry point through which the editing surface's in-memory
//! note state reaches the document store. Applies the lock rules first
//! (re-encrypting locked content with the session password), then commits
//! through a per-note guard so saves for the same note never interleave.

use crate::crypto;
use crate::database::{Note, NoteBody, NoteDraft, Repository};
use crate::error::{AppError, Result};
use crate::services::SessionSecrets;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard};

/// The editing surface's in-memory state for the active note.
///
/// `content` always holds plaintext markup — for a locked-but-open note
/// this is the decrypted content that exists only in volatile memory.
#[derive(Debug, Clone)]
pub struct ActiveNote {
    /// None until the first save assigns an id
    pub id: Option<i64>,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub is_pinned: bool,
    pub is_locked: bool,
}

impl ActiveNote {
    /// Fresh unsaved note; timestamps are set by the store on first save.
    pub fn empty() -> Self {
        Self {
            id: None,
            title: String::new(),
            content: String::new(),
            tags: Vec::new(),
            is_pinned: false,
            is_locked: false,
        }
    }

    /// In-memory state for a stored note. For a locked note the content
    /// starts empty until the lock service unlocks it for this session.
    pub fn from_note(note: &Note) -> Self {
        Self {
            id: Some(note.id),
            title: note.title.clone(),
            content: note.content.clone(),
            tags: note.tags.clone(),
            is_pinned: note.is_pinned,
            is_locked: note.is_locked,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.content.is_empty()
    }
}

/// Save outcome events a UI layer can subscribe to.
#[derive(Debug, Clone)]
pub enum SaveEvent {
    Saved { note_id: i64 },
    SaveFailed { note_id: Option<i64>, message: String },
}

/// Orchestrates all writes into the document store.
#[derive(Clone)]
pub struct SaveService {
    repo: Repository,
    secrets: SessionSecrets,
    guards: Arc<Mutex<HashMap<i64, Arc<Mutex<()>>>>>,
    events: broadcast::Sender<SaveEvent>,
}

impl SaveService {
    pub fn new(repo: Repository, secrets: SessionSecrets) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            repo,
            secrets,
            guards: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    /// Subscribe to save success/failure events.
    pub fn subscribe(&self) -> broadcast::Receiver<SaveEvent> {
        self.events.subscribe()
    }

    /// Persist the in-memory note state.
    ///
    /// A locked note is re-encrypted with the session password before the
    /// write; without a cached password the save fails with
    /// [`AppError::CannotSaveLocked`] rather than discarding the edit or
    /// writing plaintext. `quiet` suppresses the user-facing event but
    /// never changes persistence semantics.
    ///
    /// The per-note guard is taken on entry, before re-encryption: key
    /// derivation time varies, and encrypting outside the guard would let
    /// a later save for the same note overtake an earlier one.
    pub async fn save(&self, active: &ActiveNote, quiet: bool) -> Result<Note> {
        let held = self.acquire(active.id).await;
        let result = self.save_under_guard(active, quiet).await;
        drop(held);
        self.release(active.id).await;
        result
    }

    async fn save_under_guard(&self, active: &ActiveNote, quiet: bool) -> Result<Note> {
        let draft = match self.build_draft(active).await {
            Ok(draft) => draft,
            Err(e) => {
                tracing::warn!("Save rejected before write: {}", e);
                if !quiet {
                    let _ = self.events.send(SaveEvent::SaveFailed {
                        note_id: active.id,
                        message: e.to_string(),
                    });
                }
                return Err(e);
            }
        };

        self.write(active.id, draft, quiet).await
    }

    /// Await completion of any in-flight save for a note. Called when the
    /// active note is switched or the application shuts down, so the last
    /// edit is durable before its in-memory state is discarded.
    pub async fn flush(&self, note_id: i64) {
        let held = self.acquire(Some(note_id)).await;
        drop(held);
        self.release(Some(note_id)).await;
    }

    /// Commit a fully built draft under the per-note guard. Used by the
    /// lock service, whose transitions arrive with the ciphertext already
    /// built.
    pub(crate) async fn commit(
        &self,
        id: Option<i64>,
        draft: NoteDraft,
        quiet: bool,
    ) -> Result<Note> {
        let held = self.acquire(id).await;
        let result = self.write(id, draft, quiet).await;
        drop(held);
        self.release(id).await;
        result
    }

    async fn write(&self, id: Option<i64>, draft: NoteDraft, quiet: bool) -> Result<Note> {
        let result = match id {
            Some(id) => self.repo.update_note(id, draft).await,
            None => self.repo.insert_note(draft).await,
        };

        match &result {
            Ok(note) => {
                tracing::debug!("Saved note {}", note.id);
                if !quiet {
                    let _ = self.events.send(SaveEvent::Saved { note_id: note.id });
                }
            }
            Err(e) => {
                // quiet suppresses the notification, never the log
                tracing::warn!("Save failed for note {:?}: {}", id, e);
                if !quiet {
                    let _ = self.events.send(SaveEvent::SaveFailed {
                        note_id: id,
                        message: e.to_string(),
                    });
                }
            }
        }

        result
    }

    async fn build_draft(&self, active: &ActiveNote) -> Result<NoteDraft> {
        let body = if active.is_locked {
            // A note can only be locked after its first save assigned an id
            let id = active.id.ok_or(AppError::CannotSaveLocked)?;
            let password = self
                .secrets
                .get(id)
                .await
                .ok_or(AppError::CannotSaveLocked)?;
            let payload = crypto::encrypt_blocking(active.content.clone(), password).await?;
            NoteBody::Encrypted(payload)
        } else {
            NoteBody::Plaintext {
                content: active.content.clone(),
            }
        };

        Ok(NoteDraft {
            title: active.title.clone(),
            tags: active.tags.clone(),
            is_pinned: active.is_pinned,
            body,
        })
    }

    /// Take the per-note guard, a fair mutex: concurrent saves for the
    /// same note queue and run in request order, while saves for
    /// different notes proceed independently. A first save has no id and
    /// nothing to order against.
    async fn acquire(&self, id: Option<i64>) -> Option<OwnedMutexGuard<()>> {
        match id {
            Some(id) => Some(self.note_guard(id).await.lock_owned().await),
            None => None,
        }
    }

    /// Evict the guard map entry for a note once nothing holds or awaits
    /// it, so the map does not grow with every note ever saved.
    async fn release(&self, id: Option<i64>) {
        let Some(id) = id else { return };
        let mut guards = self.guards.lock().await;
        if let Some(entry) = guards.get(&id) {
            // The map's own reference is the only one left
            if Arc::strong_count(entry) == 1 {
                guards.remove(&id);
            }
        }
    }

    async fn note_guard(&self, id: i64) -> Arc<Mutex<()>> {
        let mut guards = self.guards.lock().await;
        guards
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
