//! Unit tests for run progress tracking

use perptrix_history::collector::progress::compute_percent;
use perptrix_history::collector::{RunProgress, RunState};

#[test]
fn new_progress_is_idle() {
    let snapshot = RunProgress::new().snapshot();
    assert_eq!(snapshot.state, RunState::NotStarted);
    assert_eq!(snapshot.current_step, 0);
    assert_eq!(snapshot.total_steps, 0);
    assert_eq!(snapshot.current_step_percent, 0);
}

#[test]
fn starting_a_step_resets_its_percent() {
    let progress = RunProgress::new();
    progress.begin();
    progress.set_total_steps(4);
    progress.start_step(1);
    progress.set_percent(80);
    progress.start_step(2);

    let snapshot = progress.snapshot();
    assert_eq!(snapshot.current_step, 2);
    assert_eq!(snapshot.total_steps, 4);
    assert_eq!(snapshot.current_step_percent, 0);
}

#[test]
fn percent_never_exceeds_one_hundred() {
    let progress = RunProgress::new();
    progress.set_percent(250);
    assert_eq!(progress.current_step_percent(), 100);
}

#[test]
fn stop_request_is_sticky() {
    let progress = RunProgress::new();
    assert!(!progress.should_stop());
    progress.request_stop();
    progress.request_stop();
    assert!(progress.should_stop());
}

#[test]
fn terminal_states() {
    assert!(RunState::Finished.is_terminal());
    assert!(RunState::Stopped.is_terminal());
    assert!(RunState::Errored.is_terminal());
    assert!(!RunState::InProgress.is_terminal());
}

#[test]
fn percent_is_rounded_share_of_window() {
    assert_eq!(compute_percent(0, 1, 3), 33);
    assert_eq!(compute_percent(0, 2, 3), 67);
    assert_eq!(compute_percent(100, 50, 200), 0);
}
