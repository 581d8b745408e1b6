use std::collections::VecDeque;
use std::fs;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use trawler_core::{HarvestSettings, HarvestState};
use trawler_engine::{
    CheckpointStore, DriverError, HarvestRunner, Outcome, PageDriver, RunnerSettings,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(trawler_logging::initialize_for_tests);
}

fn row(item: &str, sku: &str) -> Vec<String> {
    vec![
        item.to_string(),
        "$9.99".to_string(),
        sku.to_string(),
        "boxed".to_string(),
        "Widget".to_string(),
        "2x3x4".to_string(),
        "1.5".to_string(),
        "hardware".to_string(),
    ]
}

type Snapshot = Result<Vec<Vec<String>>, DriverError>;

/// Plays back a fixed sequence of snapshots, then holds the last
/// configured one forever, like a view that has stopped growing.
struct ScriptedDriver {
    script: VecDeque<Snapshot>,
    hold: Snapshot,
    calls: usize,
    next_pages: Arc<AtomicUsize>,
    stop_at_call: Option<(usize, Arc<AtomicBool>)>,
}

impl ScriptedDriver {
    fn new(script: Vec<Snapshot>, hold: Snapshot) -> Self {
        Self {
            script: script.into(),
            hold,
            calls: 0,
            next_pages: Arc::new(AtomicUsize::new(0)),
            stop_at_call: None,
        }
    }

    fn next_page_counter(&self) -> Arc<AtomicUsize> {
        self.next_pages.clone()
    }

    fn raise_stop_at_call(mut self, call: usize, flag: Arc<AtomicBool>) -> Self {
        self.stop_at_call = Some((call, flag));
        self
    }
}

impl PageDriver for ScriptedDriver {
    fn advance(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    fn visible_rows(&mut self) -> Result<Vec<Vec<String>>, DriverError> {
        self.calls += 1;
        if let Some((at, flag)) = &self.stop_at_call {
            if self.calls == *at {
                flag.store(true, Ordering::SeqCst);
            }
        }
        self.script.pop_front().unwrap_or_else(|| self.hold.clone())
    }

    fn request_next_page(&mut self) -> Result<(), DriverError> {
        self.next_pages.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn test_runner_settings() -> RunnerSettings {
    RunnerSettings {
        poll_interval: Duration::ZERO,
    }
}

fn harvest_settings(batch: usize, stalls: u32, next_page: u32) -> HarvestSettings {
    HarvestSettings {
        batch_threshold: batch,
        max_stall_attempts: stalls,
        next_page_interval: next_page,
    }
}

#[test]
fn static_source_exhausts_the_budget_and_flushes_at_exit() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp.path().join("records.json"));

    let snapshot = vec![row("1", "SKU-1"), row("2", "SKU-2")];
    let driver = ScriptedDriver::new(vec![Ok(snapshot.clone())], Ok(snapshot));

    let mut runner = HarvestRunner::new(driver, store, test_runner_settings());
    let state = HarvestState::new(harvest_settings(50, 3, 0));
    let stop = AtomicBool::new(false);

    let report = runner.run(state, &stop).unwrap();
    assert_eq!(report.outcome, Outcome::Exhausted);
    assert_eq!(report.stats.accepted_this_run, 2);
    assert_eq!(report.records_in_memory, 2);
    assert_eq!(report.records_on_disk, 2);

    let loaded = runner.store().load();
    let keys: Vec<&str> = loaded.iter().map(|r| r.identity()).collect();
    assert_eq!(keys, vec!["1", "2"]);
}

#[test]
fn batch_threshold_triggers_an_interim_flush() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("records.json");
    let store = CheckpointStore::new(&path);

    // Two accepted rows hit the threshold on the first tick; the source
    // then disappears before any exit flush could mask the distinction.
    let driver = ScriptedDriver::new(
        vec![
            Ok(vec![row("1", "SKU-1"), row("2", "SKU-2")]),
            Err(DriverError::Gone("browser closed".into())),
        ],
        Err(DriverError::Gone("browser closed".into())),
    );

    let mut runner = HarvestRunner::new(driver, store, test_runner_settings());
    let state = HarvestState::new(harvest_settings(2, 10, 0));
    let stop = AtomicBool::new(false);

    let report = runner.run(state, &stop).unwrap();
    assert_eq!(report.outcome, Outcome::SourceClosed);
    assert_eq!(report.records_on_disk, 2);
    assert!(path.is_file());
}

#[test]
fn transient_read_failures_stall_but_do_not_abort() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp.path().join("records.json"));

    let snapshot = vec![row("1", "SKU-1")];
    let driver = ScriptedDriver::new(
        vec![
            Err(DriverError::Read("timeout".into())),
            Err(DriverError::Read("timeout".into())),
            Ok(snapshot.clone()),
        ],
        Ok(snapshot),
    );

    let mut runner = HarvestRunner::new(driver, store, test_runner_settings());
    let state = HarvestState::new(harvest_settings(50, 5, 0));
    let stop = AtomicBool::new(false);

    let report = runner.run(state, &stop).unwrap();
    assert_eq!(report.outcome, Outcome::Exhausted);
    assert_eq!(report.stats.accepted_this_run, 1);
    assert_eq!(report.records_on_disk, 1);
}

#[test]
fn source_loss_flushes_the_pending_batch() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp.path().join("records.json"));

    let driver = ScriptedDriver::new(
        vec![
            Ok(vec![row("1", "SKU-1"), row("2", "SKU-2"), row("3", "SKU-3")]),
            Err(DriverError::Gone("session expired".into())),
        ],
        Err(DriverError::Gone("session expired".into())),
    );

    let mut runner = HarvestRunner::new(driver, store, test_runner_settings());
    let state = HarvestState::new(harvest_settings(50, 10, 0));
    let stop = AtomicBool::new(false);

    let report = runner.run(state, &stop).unwrap();
    assert_eq!(report.outcome, Outcome::SourceClosed);
    assert_eq!(report.records_in_memory, 3);
    assert_eq!(report.records_on_disk, 3);
}

#[test]
fn stop_flag_interrupts_and_flushes_best_effort() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp.path().join("records.json"));

    let stop = Arc::new(AtomicBool::new(false));
    let snapshot = vec![row("1", "SKU-1"), row("2", "SKU-2")];
    let driver = ScriptedDriver::new(vec![Ok(snapshot.clone())], Ok(snapshot))
        .raise_stop_at_call(1, stop.clone());

    let mut runner = HarvestRunner::new(driver, store, test_runner_settings());
    let state = HarvestState::new(harvest_settings(50, 100, 0));

    let report = runner.run(state, &stop).unwrap();
    assert_eq!(report.outcome, Outcome::Interrupted);
    assert_eq!(report.records_on_disk, 2);
}

#[test]
fn next_page_affordance_follows_the_stall_cadence() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp.path().join("records.json"));

    let snapshot = vec![row("1", "SKU-1")];
    let driver = ScriptedDriver::new(vec![Ok(snapshot.clone())], Ok(snapshot));
    let next_pages = driver.next_page_counter();

    let mut runner = HarvestRunner::new(driver, store, test_runner_settings());
    // Seven stalls after the initial acceptance; requests at 3 and 6 only
    // (the terminating stall never asks).
    let state = HarvestState::new(harvest_settings(50, 7, 3));
    let stop = AtomicBool::new(false);

    let report = runner.run(state, &stop).unwrap();
    assert_eq!(report.outcome, Outcome::Exhausted);
    assert_eq!(next_pages.load(Ordering::SeqCst), 2);
}

#[test]
fn second_run_over_the_same_source_is_idempotent() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("records.json");
    let snapshot = vec![row("1", "SKU-1"), row("2", "SKU-2"), row("3", "SKU-3")];

    let driver = ScriptedDriver::new(vec![Ok(snapshot.clone())], Ok(snapshot.clone()));
    let mut runner = HarvestRunner::new(
        driver,
        CheckpointStore::new(&path),
        test_runner_settings(),
    );
    let stop = AtomicBool::new(false);
    let report = runner
        .run(HarvestState::new(harvest_settings(50, 2, 0)), &stop)
        .unwrap();
    assert_eq!(report.records_on_disk, 3);
    let after_first = fs::read_to_string(&path).unwrap();

    // Second process lifetime: fresh store, state seeded from disk.
    let store = CheckpointStore::new(&path);
    let loaded = store.load();
    let state = HarvestState::resume(harvest_settings(50, 2, 0), loaded);
    let driver = ScriptedDriver::new(vec![Ok(snapshot.clone())], Ok(snapshot));
    let mut runner = HarvestRunner::new(driver, store, test_runner_settings());

    let report = runner.run(state, &stop).unwrap();
    assert_eq!(report.outcome, Outcome::Exhausted);
    assert_eq!(report.stats.accepted_this_run, 0);
    assert_eq!(report.records_on_disk, 3);
    assert_eq!(fs::read_to_string(&path).unwrap(), after_first);
}
