//! Repository layer for database operations
//!
//! CRUD for notes plus the append-only revision ledger. Every mutation runs
//! in a transaction; every successful insert or update appends exactly one
//! revision in that same transaction, so no save ever commits without its
//! history record.

use super::models::{Note, NoteDraft, RevisionEntry};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new note and its first revision. The store assigns the id
    /// and sets `created_at = updated_at = now`.
    pub async fn insert_note(&self, draft: NoteDraft) -> Result<Note> {
        let now = Utc::now();
        let tags = normalize_tags(&draft.tags);
        let tags_json = serde_json::to_string(&tags)?;
        let payload = draft.body.payload();

        let mut tx = self.pool.begin().await?;

        let note = sqlx::query_as::<_, Note>(
            r#"
            INSERT INTO notes (title, content, plain_text_content, tags, is_pinned, is_locked,
                               enc_salt, enc_nonce, enc_ciphertext, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&draft.title)
        .bind(draft.body.content())
        .bind(draft.body.plain_text())
        .bind(&tags_json)
        .bind(draft.is_pinned)
        .bind(draft.body.is_locked())
        .bind(payload.map(|p| p.salt.as_slice()))
        .bind(payload.map(|p| p.nonce.as_slice()))
        .bind(payload.map(|p| p.ciphertext.as_slice()))
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        replace_tag_rows(&mut tx, note.id, &tags).await?;
        append_revision(&mut tx, note.id, &note.title, &note.content, now).await?;

        tx.commit().await?;

        tracing::debug!("Created note: {}", note.id);
        Ok(note)
    }

    /// Full replacement update of an existing note, appending one revision
    /// mirroring the new state. `created_at` of the stored record is
    /// preserved; `updated_at` is clamped so it never moves backwards even
    /// if the wall clock does.
    pub async fn update_note(&self, id: i64, draft: NoteDraft) -> Result<Note> {
        let now = Utc::now();
        let tags = normalize_tags(&draft.tags);
        let tags_json = serde_json::to_string(&tags)?;
        let payload = draft.body.payload();

        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NoteNotFound(id))?;

        let updated_at = now.max(existing.updated_at);

        let note = sqlx::query_as::<_, Note>(
            r#"
            UPDATE notes
            SET title = ?, content = ?, plain_text_content = ?, tags = ?, is_pinned = ?,
                is_locked = ?, enc_salt = ?, enc_nonce = ?, enc_ciphertext = ?, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&draft.title)
        .bind(draft.body.content())
        .bind(draft.body.plain_text())
        .bind(&tags_json)
        .bind(draft.is_pinned)
        .bind(draft.body.is_locked())
        .bind(payload.map(|p| p.salt.as_slice()))
        .bind(payload.map(|p| p.nonce.as_slice()))
        .bind(payload.map(|p| p.ciphertext.as_slice()))
        .bind(updated_at)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM note_tags WHERE note_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        replace_tag_rows(&mut tx, id, &tags).await?;
        append_revision(&mut tx, id, &note.title, &note.content, updated_at).await?;

        tx.commit().await?;

        tracing::debug!("Updated note: {}", id);
        Ok(note)
    }

    /// Get a note by id
    pub async fn get_note(&self, id: i64) -> Result<Note> {
        let note = sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NoteNotFound(id))?;

        Ok(note)
    }

    /// List all notes, most recently modified first. The ordering is the
    /// store's contract, not a client-side sort.
    pub async fn list_notes(&self) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, Note>(
            r#"
            SELECT * FROM notes
            ORDER BY updated_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(notes)
    }

    /// List notes carrying a tag, most recently modified first.
    pub async fn list_notes_by_tag(&self, tag: &str) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, Note>(
            r#"
            SELECT n.* FROM notes n
            JOIN note_tags t ON t.note_id = n.id
            WHERE t.tag = ?
            ORDER BY n.updated_at DESC, n.id DESC
            "#,
        )
        .bind(tag)
        .fetch_all(&self.pool)
        .await?;

        Ok(notes)
    }

    /// Delete a note together with all its revisions and tag rows.
    pub async fn delete_note(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM revisions WHERE note_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM note_tags WHERE note_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let rows = sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::NoteNotFound(id));
        }

        tx.commit().await?;

        tracing::debug!("Deleted note: {}", id);
        Ok(())
    }

    /// List revisions for a note, most recent first.
    pub async fn list_revisions(&self, note_id: i64) -> Result<Vec<RevisionEntry>> {
        let revisions = sqlx::query_as::<_, RevisionEntry>(
            r#"
            SELECT * FROM revisions
            WHERE note_id = ?
            ORDER BY timestamp DESC, id DESC
            "#,
        )
        .bind(note_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(revisions)
    }
}

/// Drop empty and duplicate tags, preserving first-seen order.
fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() || seen.iter().any(|s| s == tag) {
            continue;
        }
        seen.push(tag.to_string());
    }
    seen
}

async fn replace_tag_rows(
    tx: &mut Transaction<'_, Sqlite>,
    note_id: i64,
    tags: &[String],
) -> Result<()> {
    for tag in tags {
        sqlx::query("INSERT OR IGNORE INTO note_tags (note_id, tag) VALUES (?, ?)")
            .bind(note_id)
            .bind(tag)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

async fn append_revision(
    tx: &mut Transaction<'_, Sqlite>,
    note_id: i64,
    title: &str,
    content: &str,
    timestamp: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO revisions (note_id, title, content, timestamp)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(note_id)
    .bind(title)
    .bind(content)
    .bind(timestamp)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
