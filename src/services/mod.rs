//! Services module
//!
//! Business logic layered over the repository: the session password
//! cache, the lock state machine, the save orchestrator and autosave.

pub mod autosave;
pub mod lock;
pub mod save;
pub mod session;

pub use autosave::{ActiveNoteHandle, AutosaveHandle, Autosaver};
pub use lock::LockService;
pub use save::{ActiveNote, SaveEvent, SaveService};
pub use session::SessionSecrets;
