//! Database models
//!
//! Rust structs representing store entities, plus the tagged draft type
//! that callers hand to the repository. All models use serde so they can
//! be serialized to a UI layer.

use crate::crypto::CiphertextPayload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// A note as stored. For a locked note `content` and `plain_text_content`
/// are empty and `encrypted` carries the ciphertext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    /// Rich document markup (HTML)
    pub content: String,
    /// Search-optimized plain text derived from `content`
    pub plain_text_content: String,
    pub tags: Vec<String>,
    pub is_pinned: bool,
    pub is_locked: bool,
    pub encrypted: Option<CiphertextPayload>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for Note {
    fn from_row(row: &SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        let tags_json: String = row.try_get("tags")?;
        let tags: Vec<String> =
            serde_json::from_str(&tags_json).map_err(|e| sqlx::Error::ColumnDecode {
                index: "tags".into(),
                source: Box::new(e),
            })?;

        let salt: Option<Vec<u8>> = row.try_get("enc_salt")?;
        let nonce: Option<Vec<u8>> = row.try_get("enc_nonce")?;
        let ciphertext: Option<Vec<u8>> = row.try_get("enc_ciphertext")?;
        let encrypted = match (salt, nonce, ciphertext) {
            (Some(salt), Some(nonce), Some(ciphertext)) => Some(CiphertextPayload {
                salt,
                nonce,
                ciphertext,
            }),
            _ => None,
        };

        Ok(Note {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            plain_text_content: row.try_get("plain_text_content")?,
            tags,
            is_pinned: row.try_get("is_pinned")?,
            is_locked: row.try_get("is_locked")?,
            encrypted,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// An immutable snapshot appended on every successful save.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RevisionEntry {
    pub id: i64,
    pub note_id: i64,
    pub title: String,
    /// Markup as committed by that save; empty for saves of a locked note
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Body of a note being saved.
///
/// The variant decides what the store persists: plaintext content with its
/// derived search text, or a ciphertext with empty content columns. Content
/// is absent exactly when a ciphertext is present.
#[derive(Debug, Clone)]
pub enum NoteBody {
    Plaintext { content: String },
    Encrypted(CiphertextPayload),
}

impl NoteBody {
    /// Markup to persist in the `content` column.
    pub fn content(&self) -> &str {
        match self {
            NoteBody::Plaintext { content } => content,
            NoteBody::Encrypted(_) => "",
        }
    }

    /// Derived search text; always empty for locked notes so locked
    /// content cannot leak through search.
    pub fn plain_text(&self) -> String {
        match self {
            NoteBody::Plaintext { content } => html_to_plain_text(content),
            NoteBody::Encrypted(_) => String::new(),
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, NoteBody::Encrypted(_))
    }

    pub fn payload(&self) -> Option<&CiphertextPayload> {
        match self {
            NoteBody::Plaintext { .. } => None,
            NoteBody::Encrypted(payload) => Some(payload),
        }
    }
}

/// Full replacement state handed to the repository by the save path.
#[derive(Debug, Clone)]
pub struct NoteDraft {
    pub title: String,
    pub tags: Vec<String>,
    pub is_pinned: bool,
    pub body: NoteBody,
}

/// Strip markup down to searchable plain text.
///
/// Line breaks become spaces, every other tag is dropped, and the handful
/// of entities the editor emits are decoded. Unterminated tags swallow the
/// remainder rather than leaking markup into search results.
pub fn html_to_plain_text(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        match rest[start..].find('>') {
            Some(offset) => {
                let tag = rest[start + 1..start + offset]
                    .trim_start_matches('/')
                    .trim();
                if tag.to_ascii_lowercase().starts_with("br") {
                    out.push(' ');
                }
                rest = &rest[start + offset + 1..];
            }
            None => {
                rest = "";
            }
        }
    }
    out.push_str(rest);

    out.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_strips_tags() {
        assert_eq!(html_to_plain_text("<p>Hello</p>"), "Hello");
        assert_eq!(
            html_to_plain_text("<h1>Title</h1><p>Body <b>bold</b></p>"),
            "TitleBody bold"
        );
    }

    #[test]
    fn test_plain_text_br_becomes_space() {
        assert_eq!(html_to_plain_text("line<br>break"), "line break");
        assert_eq!(html_to_plain_text("line<br/>break"), "line break");
        assert_eq!(html_to_plain_text("line<BR />break"), "line break");
    }

    #[test]
    fn test_plain_text_decodes_entities() {
        assert_eq!(html_to_plain_text("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(html_to_plain_text("one&nbsp;two"), "one two");
    }

    #[test]
    fn test_plain_text_unterminated_tag() {
        assert_eq!(html_to_plain_text("text <p unterminated"), "text ");
    }

    #[test]
    fn test_plain_text_empty() {
        assert_eq!(html_to_plain_text(""), "");
    }

    #[test]
    fn test_body_content_empty_when_encrypted() {
        let body = NoteBody::Encrypted(CiphertextPayload {
            salt: vec![0; 16],
            nonce: vec![0; 12],
            ciphertext: vec![0; 32],
        });

        assert_eq!(body.content(), "");
        assert_eq!(body.plain_text(), "");
        assert!(body.is_locked());
        assert!(body.payload().is_some());
    }

    #[test]
    fn test_body_plaintext() {
        let body = NoteBody::Plaintext {
            content: "<p>Hi</p>".to_string(),
        };

        assert_eq!(body.content(), "<p>Hi</p>");
        assert_eq!(body.plain_text(), "Hi");
        assert!(!body.is_locked());
        assert!(body.payload().is_none());
    }
}
