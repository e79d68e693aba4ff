//! Error types for the NoteVault store
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized across an IPC boundary to a UI layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Note not found: {0}")]
    NoteNotFound(i64),

    #[error("Wrong password")]
    WrongPassword,

    #[error("Decryption failed: payload is damaged or was produced by an incompatible cipher")]
    DecryptFailed,

    #[error("Cannot save locked note: no password cached for this session")]
    CannotSaveLocked,

    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
