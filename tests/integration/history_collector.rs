//! Integration tests for a full collection run against an in-memory exchange.

use std::sync::{Arc, OnceLock};

use perptrix_history::collector::{HistoryCollector, RunOutcome, RunProgress, RunState};
use perptrix_history::db::{read_artifact, FileCandleStore};
use perptrix_history::error::CollectorError;
use perptrix_history::models::TimeFrame;

use crate::test_utils::{minutes, recording_collector, settings, temp_data_dir, MockExchange};

fn expected_open_times(start: i64, end: i64, step: i64) -> Vec<i64> {
    (start..=end).step_by(step as usize).collect()
}

#[tokio::test]
async fn collects_exactly_the_window_in_order() {
    let exchange = Arc::new(MockExchange::new(minutes(10_000), 2));
    let (mut collector, record) = recording_collector(
        exchange.clone(),
        settings(&["BTC/USDC"], &[TimeFrame::OneMinute], Some(0), Some(minutes(300))),
    );
    let progress = collector.progress();

    let outcome = collector.start().await.expect("run succeeds");

    assert!(matches!(outcome, RunOutcome::Finished(_)));
    assert_eq!(
        record.open_times("BTC/USDC", TimeFrame::OneMinute),
        expected_open_times(0, minutes(300), minutes(1))
    );
    let snapshot = progress.snapshot();
    assert_eq!(snapshot.state, RunState::Finished);
    assert_eq!(snapshot.current_step, 1);
    assert_eq!(snapshot.total_steps, 1);
    assert_eq!(snapshot.current_step_percent, 100);
    assert_eq!(record.stop_calls(), 1);
    assert!(record.finalized());
    assert_eq!(exchange.close_calls(), 1);
}

#[tokio::test]
async fn appends_closing_timestamps_and_base_asset() {
    let exchange = Arc::new(MockExchange::new(minutes(100), 5));
    let (mut collector, record) = recording_collector(
        exchange,
        settings(&["ETH/USDC"], &[TimeFrame::FiveMinutes], Some(0), Some(minutes(20))),
    );

    collector.start().await.expect("run succeeds");

    let appended = record.appended.lock().unwrap().clone();
    assert_eq!(appended.len(), 5);
    for entry in &appended {
        assert_eq!(entry.close_time, entry.candle.open_time + minutes(5));
        assert_eq!(entry.cryptocurrency, "ETH");
        assert_eq!(entry.exchange, "mock");
    }
}

#[tokio::test]
async fn file_store_holds_description_then_candles() {
    let dir = temp_data_dir();
    let exchange = Arc::new(MockExchange::new(minutes(10_000), 50));
    let store = FileCandleStore::new(&dir, "btc_window");
    let part_path = dir.join("btc_window.data.part");
    let mut collector = HistoryCollector::new(
        settings(&["BTC"], &[TimeFrame::OneMinute], Some(0), Some(minutes(120))),
        exchange,
        Box::new(store),
    )
    .unwrap();

    let outcome = collector.start().await.unwrap();

    let path = match outcome {
        RunOutcome::Finished(path) => path,
        other => panic!("expected a finished run, got {:?}", other),
    };
    assert_eq!(path, dir.join("btc_window.data"));
    assert!(!part_path.exists());

    let (description, candles) = read_artifact(&path).await.unwrap();
    assert_eq!(description.exchange, "mock");
    assert_eq!(description.symbols, vec!["BTC".to_string()]);
    assert_eq!(description.time_frames, vec![TimeFrame::OneMinute]);
    assert_eq!(description.start_timestamp, Some(0));
    assert_eq!(description.end_timestamp, Some(minutes(120)));
    assert_eq!(candles.len(), 121);
    assert!(candles.windows(2).all(|w| w[1].open_time - w[0].open_time == minutes(1)));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn start_below_first_candle_is_raised_to_it() {
    let exchange = Arc::new(
        MockExchange::new(minutes(2_000), 100)
            .with_listing("BTC", Some(minutes(1_000)))
            .with_listing("ETH", Some(minutes(500)))
            .with_listing("NEW", None),
    );
    let (mut collector, record) = recording_collector(
        exchange,
        settings(&["BTC", "ETH", "NEW"], &[TimeFrame::OneHour, TimeFrame::OneMinute], Some(0), Some(minutes(1_200))),
    );

    collector.start().await.expect("run succeeds");

    let description = record.description().expect("description written");
    assert_eq!(description.start_timestamp, Some(minutes(500)));
    // Each job also starts at its own first candle.
    let btc = record.open_times("BTC", TimeFrame::OneMinute);
    assert_eq!(btc.first(), Some(&minutes(1_000)));
    assert_eq!(btc.last(), Some(&minutes(1_200)));
    assert!(record.open_times("NEW", TimeFrame::OneMinute).is_empty());
}

#[tokio::test]
async fn floor_after_end_is_a_configuration_error() {
    let exchange = Arc::new(MockExchange::new(minutes(2_000), 100).with_listing("BTC", Some(minutes(1_000))));
    let (mut collector, record) = recording_collector(
        exchange.clone(),
        settings(&["BTC"], &[TimeFrame::OneMinute], Some(0), Some(minutes(100))),
    );
    let progress = collector.progress();

    let err = collector.start().await.unwrap_err();

    assert!(matches!(err, CollectorError::Collection { .. }));
    assert!(matches!(err.root(), CollectorError::Configuration(_)));
    assert_eq!(progress.state(), RunState::Errored);
    assert!(record.description().is_none());
    assert_eq!(exchange.page_calls(), 0);
    assert_eq!(record.stop_calls(), 1);
}

#[tokio::test]
async fn check_timestamps_rejects_start_after_end() {
    let exchange = Arc::new(MockExchange::new(minutes(100), 10));
    let result = HistoryCollector::new(
        settings(&["BTC"], &[TimeFrame::OneMinute], Some(minutes(50)), Some(minutes(10))),
        exchange,
        Box::new(crate::test_utils::RecordingStore::new().0),
    );

    assert!(matches!(result, Err(CollectorError::Configuration(_))));
}

#[tokio::test]
async fn empty_pages_after_the_first_end_the_job() {
    let exchange = Arc::new(MockExchange::new(minutes(10_000), 2).empty_after_first_page());
    let (mut collector, record) = recording_collector(
        exchange.clone(),
        settings(&["BTC"], &[TimeFrame::OneMinute], Some(0), Some(minutes(300))),
    );
    let progress = collector.progress();

    let outcome = collector.start().await.expect("run succeeds");

    assert!(matches!(outcome, RunOutcome::Finished(_)));
    assert_eq!(record.open_times("BTC", TimeFrame::OneMinute), vec![0, minutes(1)]);
    assert_eq!(exchange.page_calls(), 2);
    assert_eq!(progress.current_step_percent(), 100);
}

#[tokio::test]
async fn exchange_ignoring_since_does_not_loop() {
    let exchange = Arc::new(MockExchange::new(minutes(10_000), 3).ignoring_since());
    let (mut collector, record) = recording_collector(
        exchange.clone(),
        settings(&["BTC"], &[TimeFrame::OneMinute], Some(0), Some(minutes(300))),
    );

    collector.start().await.expect("run succeeds");

    assert_eq!(record.open_times("BTC", TimeFrame::OneMinute), vec![0, minutes(1), minutes(2)]);
    assert_eq!(exchange.page_calls(), 2);
}

#[tokio::test]
async fn error_on_second_page_aborts_the_run() {
    let exchange = Arc::new(MockExchange::new(minutes(10_000), 2).failing_on_page(2));
    let (mut collector, record) = recording_collector(
        exchange.clone(),
        settings(&["BTC", "ETH"], &[TimeFrame::OneMinute], Some(0), Some(minutes(300))),
    );
    let progress = collector.progress();

    let err = collector.start().await.unwrap_err();

    match &err {
        CollectorError::Collection { exchange, symbols, .. } => {
            assert_eq!(exchange, "mock");
            assert_eq!(symbols, "BTC, ETH");
        }
        other => panic!("expected a collection error, got {:?}", other),
    }
    assert!(matches!(err.root(), CollectorError::Transport(_)));
    assert_eq!(progress.state(), RunState::Errored);
    assert_eq!(record.stop_calls(), 1);
    assert!(record.discarded());
    assert!(!record.finalized());
    assert_eq!(exchange.close_calls(), 1);
    assert_eq!(exchange.page_calls(), 2);
}

#[tokio::test]
async fn failed_run_leaves_no_file_behind() {
    let dir = temp_data_dir();
    let exchange = Arc::new(MockExchange::new(minutes(10_000), 2).failing_on_page(2));
    let store = FileCandleStore::new(&dir, "failed");
    let mut collector = HistoryCollector::new(
        settings(&["BTC"], &[TimeFrame::OneMinute], Some(0), Some(minutes(300))),
        exchange,
        Box::new(store),
    )
    .unwrap();

    assert!(collector.start().await.is_err());

    assert!(!dir.join("failed.data.part").exists());
    assert!(!dir.join("failed.data").exists());
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn stop_request_ends_the_run_without_error() {
    let progress_slot: Arc<OnceLock<Arc<RunProgress>>> = Arc::new(OnceLock::new());
    let hook_slot = progress_slot.clone();
    let exchange = Arc::new(MockExchange::new(minutes(10_000), 2).on_page(move |page| {
        if page == 3 {
            if let Some(progress) = hook_slot.get() {
                progress.request_stop();
            }
        }
    }));
    let (mut collector, record) = recording_collector(
        exchange.clone(),
        settings(&["BTC", "ETH"], &[TimeFrame::OneMinute], Some(0), Some(minutes(300))),
    );
    let progress = collector.progress();
    progress_slot.set(progress.clone()).ok();

    let outcome = collector.start().await.expect("stop is not an error");

    assert_eq!(outcome, RunOutcome::Stopped);
    assert_eq!(progress.state(), RunState::Stopped);
    assert_eq!(progress.snapshot().current_step, 1);
    assert_eq!(exchange.page_calls(), 3);
    assert_eq!(record.stop_calls(), 1);
    assert!(record.discarded());
    assert!(!record.finalized());
    assert_eq!(exchange.close_calls(), 1);
}

#[tokio::test]
async fn uses_every_known_time_frame_the_exchange_offers() {
    let exchange = Arc::new(MockExchange::new(minutes(2_000), 100).with_time_frames(&["1h", "7h", "4h", "1h"]));
    let mut run_settings = settings(&["BTC", "ETH"], &[], Some(0), Some(minutes(8 * 60)));
    run_settings.use_all_available_time_frames = true;
    let (mut collector, record) = recording_collector(exchange, run_settings);
    let progress = collector.progress();

    collector.start().await.expect("run succeeds");

    let description = record.description().unwrap();
    assert_eq!(description.time_frames, vec![TimeFrame::OneHour, TimeFrame::FourHours]);
    assert_eq!(record.open_times("ETH", TimeFrame::OneHour).len(), 9);
    assert_eq!(
        record.open_times("ETH", TimeFrame::FourHours),
        vec![0, minutes(240), minutes(480)]
    );
    let snapshot = progress.snapshot();
    assert_eq!(snapshot.total_steps, 4);
    assert_eq!(snapshot.current_step, 4);
}

#[tokio::test]
async fn no_start_fetches_a_single_latest_page() {
    let exchange = Arc::new(MockExchange::new(minutes(100), 10));
    let (mut collector, record) = recording_collector(exchange.clone(), settings(&["BTC"], &[TimeFrame::OneMinute], None, None));

    collector.start().await.expect("run succeeds");

    assert_eq!(
        record.open_times("BTC", TimeFrame::OneMinute),
        expected_open_times(minutes(91), minutes(100), minutes(1))
    );
    assert_eq!(exchange.page_calls(), 1);
    assert_eq!(exchange.probe_calls(), 0);
}

#[tokio::test]
async fn window_shorter_than_a_candle_fetches_nothing() {
    let exchange = Arc::new(MockExchange::new(minutes(100), 10));
    let (mut collector, record) = recording_collector(
        exchange.clone(),
        settings(&["BTC"], &[TimeFrame::OneHour], Some(0), Some(minutes(30))),
    );

    let outcome = collector.start().await.expect("run succeeds");

    assert!(matches!(outcome, RunOutcome::Finished(_)));
    assert_eq!(record.appended_count(), 0);
    assert_eq!(exchange.page_calls(), 0);
}

#[tokio::test]
async fn collector_runs_only_once() {
    let exchange = Arc::new(MockExchange::new(minutes(10), 10));
    let (mut collector, _record) = recording_collector(exchange, settings(&["BTC"], &[TimeFrame::OneMinute], Some(0), Some(minutes(5))));

    collector.start().await.unwrap();
    let err = collector.start().await.unwrap_err();

    assert!(matches!(err, CollectorError::Configuration(_)));
}
