//! Historical candle collection runs and their supervision.

pub mod history;
pub mod job;
pub mod progress;
pub mod supervisor;
pub mod window;

pub use history::{CollectorSettings, HistoryCollector, RunOutcome};
pub use job::CollectionJob;
pub use progress::{ProgressSnapshot, RunProgress, RunState};
pub use supervisor::{CollectorHandle, CollectorSupervisor, RunNotification, StatusReport, SupervisorStatus};
pub use window::TimeWindow;
