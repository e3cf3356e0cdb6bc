//! Host-level ownership of collection runs: one active run at a time.

use super::history::{HistoryCollector, RunOutcome};
use super::progress::{ProgressSnapshot, RunProgress, RunState};
use crate::error::{CollectorError, Result};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorStatus {
    NotStarted,
    Starting,
    Collecting,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub status: SupervisorStatus,
    pub current_step: usize,
    pub total_steps: usize,
    pub current_step_percent: u8,
}

impl StatusReport {
    fn idle(status: SupervisorStatus) -> Self {
        Self {
            status,
            current_step: 0,
            total_steps: 0,
            current_step_percent: 0,
        }
    }
}

/// Sent once per run that ends on its own (not on stop requests).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunNotification {
    Success { exchange: String, path: PathBuf },
    Danger { exchange: String, message: String },
}

pub struct CollectorHandle {
    id: Uuid,
    exchange: String,
    progress: Arc<RunProgress>,
    task: Mutex<Option<JoinHandle<Result<RunOutcome>>>>,
}

impl fmt::Debug for CollectorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectorHandle")
            .field("id", &self.id)
            .field("exchange", &self.exchange)
            .field("state", &self.progress.state())
            .finish()
    }
}

impl CollectorHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn status(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// Ask the run to wind down at its next job or page boundary.
    pub fn request_stop(&self) {
        self.progress.request_stop();
    }

    pub fn is_finished(&self) -> bool {
        if self.progress.state().is_terminal() {
            return true;
        }
        match self.task.try_lock() {
            Ok(task) => task.as_ref().map_or(true, |t| t.is_finished()),
            // Someone is awaiting the task, so it is still running.
            Err(_) => false,
        }
    }

    /// Wait for the run to end. Only the first caller to see it end receives
    /// the outcome; dropping this future leaves the run awaitable.
    pub async fn wait(&self) -> Result<RunOutcome> {
        let mut task = self.task.lock().await;
        let join = task.as_mut().ok_or_else(|| {
            CollectorError::Configuration(format!("Run {} has already been awaited", self.id))
        })?;
        let joined = join.await;
        *task = None;
        joined.map_err(|e| CollectorError::Configuration(format!("Collection task {} aborted: {}", self.id, e)))?
    }
}

pub struct CollectorSupervisor {
    active: RwLock<Option<Arc<CollectorHandle>>>,
    notifications: broadcast::Sender<RunNotification>,
}

impl Default for CollectorSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectorSupervisor {
    pub fn new() -> Self {
        let (notifications, _) = broadcast::channel(16);
        Self {
            active: RwLock::new(None),
            notifications,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunNotification> {
        self.notifications.subscribe()
    }

    /// Spawn `collector` on the runtime unless another run is still active.
    pub async fn launch(&self, mut collector: HistoryCollector) -> Result<Arc<CollectorHandle>> {
        let mut active = self.active.write().await;
        if active.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Err(CollectorError::AlreadyRunning);
        }
        let progress = collector.progress();
        if progress.state() != RunState::NotStarted {
            return Err(CollectorError::Configuration(
                "This collector has already been started".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let exchange = collector.exchange_name().to_string();
        let notifications = self.notifications.clone();
        let task_exchange = exchange.clone();
        let task = tokio::spawn(async move {
            let outcome = collector.start().await;
            let notification = match &outcome {
                Ok(RunOutcome::Finished(path)) => {
                    info!(run_id = %id, exchange = %task_exchange, path = %path.display(), "Data collection complete");
                    Some(RunNotification::Success {
                        exchange: task_exchange,
                        path: path.clone(),
                    })
                }
                Ok(RunOutcome::Stopped) => None,
                Err(e) => {
                    error!(run_id = %id, exchange = %task_exchange, error = %e, "Data collection failed");
                    Some(RunNotification::Danger {
                        exchange: task_exchange,
                        message: e.to_string(),
                    })
                }
            };
            if let Some(notification) = notification {
                // No subscriber is fine.
                let _ = notifications.send(notification);
            }
            outcome
        });

        let handle = Arc::new(CollectorHandle {
            id,
            exchange,
            progress,
            task: Mutex::new(Some(task)),
        });
        info!(run_id = %id, exchange = %handle.exchange, "Launched historical data collector");
        *active = Some(handle.clone());
        Ok(handle)
    }

    pub async fn status(&self) -> StatusReport {
        let active = self.active.read().await;
        let Some(handle) = active.as_ref() else {
            return StatusReport::idle(SupervisorStatus::NotStarted);
        };
        if handle.is_finished() {
            return StatusReport::idle(SupervisorStatus::Finished);
        }
        let snapshot = handle.status();
        match snapshot.state {
            RunState::NotStarted => StatusReport::idle(SupervisorStatus::Starting),
            _ => StatusReport {
                status: SupervisorStatus::Collecting,
                current_step: snapshot.current_step,
                total_steps: snapshot.total_steps,
                current_step_percent: snapshot.current_step_percent,
            },
        }
    }

    pub async fn is_running(&self) -> bool {
        self.active
            .read()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop and unregister the active run. Returns whether there was one.
    pub async fn stop(&self) -> bool {
        let Some(handle) = self.active.write().await.take() else {
            return false;
        };
        if handle.is_finished() {
            return false;
        }
        handle.request_stop();
        match handle.wait().await {
            Ok(outcome) => info!(run_id = %handle.id, ?outcome, "Historical data collector stopped"),
            Err(e) => warn!(run_id = %handle.id, error = %e, "Historical data collector ended with an error"),
        }
        true
    }
}
