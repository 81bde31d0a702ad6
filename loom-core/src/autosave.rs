//! Periodic autosave.
//!
//! The [`Autosaver`] task holds only a weak handle to the session, so it
//! always sees the live state and never keeps a finished session alive.

use crate::session::SharedSession;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Default time between autosaves.
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

/// Handle to a running autosave task. The task stops when this is dropped.
#[derive(Debug)]
pub struct Autosaver {
    handle: JoinHandle<()>,
    period: Duration,
}

impl Autosaver {
    /// Autosave `session` every `period`, starting one period from now.
    ///
    /// Must be called from within a tokio runtime. A zero period falls back
    /// to [`AUTOSAVE_INTERVAL`].
    pub fn spawn(session: &SharedSession, period: Duration) -> Self {
        let period = if period.is_zero() {
            AUTOSAVE_INTERVAL
        } else {
            period
        };
        let weak = Arc::downgrade(session);

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let Some(session) = weak.upgrade() else {
                    tracing::debug!("session dropped, autosave stopping");
                    break;
                };
                let mut session = session.lock().await;
                if let Some(at) = session.autosave().await {
                    tracing::info!(at = %at, "autosave complete");
                }
            }
        });

        tracing::debug!(period_secs = period.as_secs_f64(), "autosave scheduled");
        Self { handle, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Whether the task has exited (session dropped or stopped).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for Autosaver {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
