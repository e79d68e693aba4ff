//! Lock state machine
//!
//! Governs the transitions between a note's unlocked, locked-closed and
//! locked-open states. Encryption happens here (via the crypto module);
//! persistence goes through the save orchestrator so lock transitions
//! share the same per-note serialization as every other save.
//!
//! Password mismatches are recoverable (`WrongPassword`, the user may
//! retry); a damaged payload surfaces as `DecryptFailed` so a UI can
//! explain the data itself is broken instead of prompting forever.

use crate::crypto::{self, CiphertextPayload};
use crate::database::{Note, NoteBody, NoteDraft, Repository};
use crate::error::{AppError, Result};
use crate::services::{ActiveNote, SaveService, SessionSecrets};

/// Lock, unlock and remove-lock flows for notes.
#[derive(Clone)]
pub struct LockService {
    repo: Repository,
    secrets: SessionSecrets,
    saver: SaveService,
}

impl LockService {
    pub fn new(repo: Repository, secrets: SessionSecrets, saver: SaveService) -> Self {
        Self {
            repo,
            secrets,
            saver,
        }
    }

    /// Unlocked -> LockedClosed.
    ///
    /// Encrypts the current in-memory content under the supplied password
    /// and persists the locked state (empty content, ciphertext present).
    /// The password is not retained: the note is closed, not open.
    pub async fn lock(&self, active: &ActiveNote, password: &str) -> Result<Note> {
        let payload =
            crypto::encrypt_blocking(active.content.clone(), password.to_string()).await?;

        let draft = NoteDraft {
            title: active.title.clone(),
            tags: active.tags.clone(),
            is_pinned: active.is_pinned,
            body: NoteBody::Encrypted(payload),
        };

        let note = self.saver.commit(active.id, draft, true).await?;
        self.secrets.clear(note.id).await;

        tracing::info!("Locked note {}", note.id);
        Ok(note)
    }

    /// LockedClosed -> LockedOpen.
    ///
    /// On success the password is cached for this session and the
    /// decrypted plaintext is returned for the editing surface; nothing
    /// in the store changes. On failure the note stays LockedClosed.
    pub async fn unlock(&self, note_id: i64, password: &str) -> Result<String> {
        let note = self.repo.get_note(note_id).await?;
        let payload = locked_payload(&note)?;

        let plaintext = decrypt_checked(payload, password).await?;

        self.secrets.set(note_id, password.to_string()).await;
        tracing::info!("Unlocked note {} for this session", note_id);

        Ok(plaintext)
    }

    /// LockedOpen -> Unlocked.
    ///
    /// Decrypts with the supplied password, persists the plaintext as
    /// regular content, clears the now-stale ciphertext and forgets the
    /// cached password. On failure nothing changes.
    pub async fn remove_lock(&self, note_id: i64, password: &str) -> Result<Note> {
        let note = self.repo.get_note(note_id).await?;
        let payload = locked_payload(&note)?;

        let plaintext = decrypt_checked(payload, password).await?;

        // Persisting a plaintext body also nulls the ciphertext columns,
        // so no stale payload lingers next to restored content
        let draft = NoteDraft {
            title: note.title,
            tags: note.tags,
            is_pinned: note.is_pinned,
            body: NoteBody::Plaintext { content: plaintext },
        };

        let saved = self.saver.commit(Some(note_id), draft, true).await?;
        self.secrets.clear(note_id).await;

        tracing::info!("Removed lock from note {}", note_id);
        Ok(saved)
    }
}

/// The ciphertext of a locked note, or `DecryptFailed` when the record is
/// damaged (locked flag without a payload, or a structurally broken one).
fn locked_payload(note: &Note) -> Result<&CiphertextPayload> {
    let payload = note.encrypted.as_ref().ok_or(AppError::DecryptFailed)?;
    if !payload.is_well_formed() {
        return Err(AppError::DecryptFailed);
    }
    Ok(payload)
}

/// Decrypt a well-formed payload. An authentication failure on a payload
/// that passed the structural check means the password is wrong, not that
/// the data is damaged.
async fn decrypt_checked(payload: &CiphertextPayload, password: &str) -> Result<String> {
    match crypto::decrypt_blocking(payload.clone(), password.to_string()).await {
        Ok(plaintext) => Ok(plaintext),
        Err(AppError::DecryptFailed) => Err(AppError::WrongPassword),
        Err(e) => Err(e),
    }
}
