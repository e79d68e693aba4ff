//! Application configuration constants
//!
//! Central location for configuration constants, resource limits,
//! and validation boundaries used throughout the crate.

// ===== Autosave Settings Limits =====

/// Minimum autosave interval in milliseconds.
/// Values below this cause excessive disk I/O and degrade performance.
pub const MIN_AUTO_SAVE_DELAY_MS: u64 = 100;

/// Maximum autosave interval in milliseconds (5 minutes).
/// Values above this risk data loss on unexpected shutdown.
pub const MAX_AUTO_SAVE_DELAY_MS: u64 = 300_000;

/// Default autosave interval in milliseconds.
pub const DEFAULT_AUTO_SAVE_DELAY_MS: u64 = 2_000;

// ===== Database Settings =====

/// Maximum number of connections in the application pool.
pub const DB_MAX_CONNECTIONS: u32 = 5;

/// How long a connection waits on a locked database before failing, in seconds.
pub const DB_BUSY_TIMEOUT_SECS: u64 = 5;
