//! Autosave task
//!
//! Periodically persists the active note through the same
//! [`SaveService::save`] entry point as a manual save, so autosave shares
//! the per-note serialization guarantee instead of owning a second write
//! path. Runs quietly: failures are logged, not surfaced as events.

use crate::config::{MAX_AUTO_SAVE_DELAY_MS, MIN_AUTO_SAVE_DELAY_MS};
use crate::services::{ActiveNote, SaveService};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Shared handle to the editing surface's in-memory state.
pub type ActiveNoteHandle = Arc<RwLock<Option<ActiveNote>>>;

/// Periodic autosave over the active note.
pub struct Autosaver {
    saver: SaveService,
    active: ActiveNoteHandle,
    delay: Duration,
}

impl Autosaver {
    /// The interval is clamped to the configured bounds; values below the
    /// minimum thrash the disk, values above it risk losing edits.
    pub fn new(saver: SaveService, active: ActiveNoteHandle, delay_ms: u64) -> Self {
        let delay_ms = delay_ms.clamp(MIN_AUTO_SAVE_DELAY_MS, MAX_AUTO_SAVE_DELAY_MS);
        Self {
            saver,
            active,
            delay: Duration::from_millis(delay_ms),
        }
    }

    /// Start the periodic task. The returned handle stops it and performs
    /// one final save so the last edit is not lost on shutdown.
    pub fn spawn(self) -> AutosaveHandle {
        let (shutdown, mut stopped) = watch::channel(false);

        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + self.delay;
            let mut ticker = tokio::time::interval_at(start, self.delay);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.save_active().await;
                    }
                    _ = stopped.changed() => {
                        // Final flush before the in-memory state goes away
                        self.save_active().await;
                        break;
                    }
                }
            }
        });

        AutosaveHandle { shutdown, task }
    }

    async fn save_active(&self) {
        let snapshot = self.active.read().await.clone();
        let Some(note) = snapshot else { return };

        // Never persist notes with no title and no content
        if note.is_empty() {
            return;
        }

        match self.saver.save(&note, true).await {
            Ok(saved) => {
                // Propagate the store-assigned id back so the next tick
                // updates instead of inserting a duplicate
                let mut active = self.active.write().await;
                if let Some(active_note) = active.as_mut() {
                    if active_note.id.is_none() {
                        active_note.id = Some(saved.id);
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Autosave failed: {}", e);
            }
        }
    }
}

/// Stops the autosave task.
pub struct AutosaveHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl AutosaveHandle {
    /// Signal shutdown and wait for the final save to complete.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{initialize_database, Repository};
    use crate::services::SessionSecrets;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_saver() -> (SaveService, Repository) {
        let pool = SqlitePoolOptions::new()
            // The pre-acquire ping awaits sqlite's blocking worker thread;
            // under a paused clock that await auto-advances time past the
            // pool's acquire timeout, so every acquire reports PoolTimedOut.
            .test_before_acquire(false)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        let repo = Repository::new(pool);
        (
            SaveService::new(repo.clone(), SessionSecrets::new()),
            repo,
        )
    }

    fn handle_with(note: Option<ActiveNote>) -> ActiveNoteHandle {
        Arc::new(RwLock::new(note))
    }

    #[tokio::test]
    async fn test_autosave_persists_active_note() {
        // Pause only after the pool is connected: sqlite connects on a
        // blocking thread, and a paused clock auto-advances past the pool
        // acquire timeout while the runtime waits on it.
        let (saver, repo) = create_saver().await;
        tokio::time::pause();

        let mut note = ActiveNote::empty();
        note.title = "Draft".to_string();
        note.content = "<p>typing...</p>".to_string();
        let active = handle_with(Some(note));

        let autosaver = Autosaver::new(saver, active.clone(), 1_000).spawn();

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        autosaver.stop().await;

        let notes = repo.list_notes().await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Draft");

        // The assigned id flowed back into the in-memory state
        assert_eq!(active.read().await.as_ref().unwrap().id, Some(notes[0].id));
    }

    #[tokio::test]
    async fn test_autosave_updates_instead_of_duplicating() {
        let (saver, repo) = create_saver().await;
        tokio::time::pause();

        let mut note = ActiveNote::empty();
        note.title = "Draft".to_string();
        note.content = "<p>v1</p>".to_string();
        let saved = saver.save(&note, true).await.unwrap();
        note.id = Some(saved.id);
        let active = handle_with(Some(note));

        let autosaver = Autosaver::new(saver, active.clone(), 1_000).spawn();

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        active.write().await.as_mut().unwrap().content = "<p>v2</p>".to_string();
        tokio::time::sleep(Duration::from_millis(1_000)).await;

        autosaver.stop().await;

        let notes = repo.list_notes().await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].content, "<p>v2</p>");
    }

    #[tokio::test]
    async fn test_autosave_skips_empty_note() {
        let (saver, repo) = create_saver().await;
        tokio::time::pause();

        let active = handle_with(Some(ActiveNote::empty()));
        let autosaver = Autosaver::new(saver, active, 1_000).spawn();

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        autosaver.stop().await;

        assert!(repo.list_notes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stop_performs_final_save() {
        let (saver, repo) = create_saver().await;
        tokio::time::pause();

        let mut note = ActiveNote::empty();
        note.title = "Last edit".to_string();
        note.content = "<p>unsaved</p>".to_string();
        let active = handle_with(Some(note));

        // Stop before the first tick would have fired
        let autosaver = Autosaver::new(saver, active, 60_000).spawn();
        autosaver.stop().await;

        let notes = repo.list_notes().await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].content, "<p>unsaved</p>");
    }

    #[test]
    fn test_interval_is_clamped() {
        // Construction only; no runtime needed for the clamp itself
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let (saver, _repo) = create_saver().await;
            let active = handle_with(None);

            let fast = Autosaver::new(saver.clone(), active.clone(), 1);
            assert_eq!(fast.delay, Duration::from_millis(MIN_AUTO_SAVE_DELAY_MS));

            let slow = Autosaver::new(saver, active, u64::MAX);
            assert_eq!(slow.delay, Duration::from_millis(MAX_AUTO_SAVE_DELAY_MS));
        });
    }
}
