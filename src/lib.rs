//! NoteVault library
//!
//! Local-first document store for a note-taking application: durable CRUD
//! with an append-only revision ledger, password-based note locking
//! (AES-256-GCM with Argon2id key derivation), and a save orchestrator
//! that serializes writes per note.

pub mod config;
pub mod crypto;
pub mod database;
pub mod error;
pub mod services;
