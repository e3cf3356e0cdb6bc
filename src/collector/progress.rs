//! Lock-free run progress shared between a collection run and its observers.
//!
//! The running collector is the only writer. Readers (status polls, the
//! supervisor) may see a slightly stale snapshot, which is acceptable.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RunState {
    NotStarted = 0,
    InProgress = 1,
    Finished = 2,
    Stopped = 3,
    Errored = 4,
}

impl RunState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RunState::InProgress,
            2 => RunState::Finished,
            3 => RunState::Stopped,
            4 => RunState::Errored,
            _ => RunState::NotStarted,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Finished | RunState::Stopped | RunState::Errored)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub state: RunState,
    pub current_step: usize,
    pub total_steps: usize,
    pub current_step_percent: u8,
}

#[derive(Debug, Default)]
pub struct RunProgress {
    state: AtomicU8,
    total_steps: AtomicUsize,
    current_step: AtomicUsize,
    current_step_percent: AtomicU8,
    should_stop: AtomicBool,
}

impl RunProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `NotStarted` to `InProgress`. Returns false if the run already began.
    pub fn begin(&self) -> bool {
        self.state
            .compare_exchange(
                RunState::NotStarted as u8,
                RunState::InProgress as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub fn set_total_steps(&self, total: usize) {
        self.total_steps.store(total, Ordering::Release);
    }

    /// Enter the 1-based step `index` with its percent reset.
    pub fn start_step(&self, index: usize) {
        self.current_step.store(index, Ordering::Release);
        self.current_step_percent.store(0, Ordering::Release);
    }

    pub fn set_percent(&self, percent: u8) {
        self.current_step_percent.store(percent.min(100), Ordering::Release);
    }

    pub fn complete(&self, state: RunState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn request_stop(&self) {
        self.should_stop.store(true, Ordering::Release);
    }

    pub fn should_stop(&self) -> bool {
        self.should_stop.load(Ordering::Acquire)
    }

    pub fn state(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn current_step_percent(&self) -> u8 {
        self.current_step_percent.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            state: self.state(),
            current_step: self.current_step.load(Ordering::Acquire),
            total_steps: self.total_steps.load(Ordering::Acquire),
            current_step_percent: self.current_step_percent(),
        }
    }
}

/// Share of `[first, end]` covered once candles up to `last` are fetched,
/// rounded and clamped to `0..=100`. An empty span counts as complete.
pub fn compute_percent(first: i64, last: i64, end: i64) -> u8 {
    let total = end - first;
    if total <= 0 {
        return 100;
    }
    let percent = ((last - first) as f64 / total as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}
