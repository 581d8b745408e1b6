use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use trawler_core::{update, Effect, HarvestState, HarvestStats, Msg, Phase};
use trawler_logging::{set_poll_tick, trawl_debug, trawl_error, trawl_info, trawl_trace, trawl_warn};

use crate::{CheckpointStore, DriverError, PageDriver, PersistError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Why the harvest loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The stall budget ran out; the source is considered exhausted.
    Exhausted,
    /// The driver reported its underlying resource gone.
    SourceClosed,
    /// The stop flag was raised.
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestReport {
    pub outcome: Outcome,
    pub stats: HarvestStats,
    /// Accepted records held in memory at exit, across all runs.
    pub records_in_memory: usize,
    /// Records durable on disk per a final diagnostic load.
    pub records_on_disk: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct RunnerSettings {
    /// Pause between poll ticks. The view mutates asynchronously and offers
    /// no push notification, so the loop polls.
    pub poll_interval: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Drives the cooperative polling loop against one driver and one store.
///
/// One tick: advance the view, take a fresh snapshot, feed it to the pure
/// update function, execute the returned effects, sleep. The only
/// suspension points are the driver calls and the sleep.
pub struct HarvestRunner<D: PageDriver> {
    driver: D,
    store: CheckpointStore,
    settings: RunnerSettings,
}

impl<D: PageDriver> HarvestRunner<D> {
    pub fn new(driver: D, store: CheckpointStore, settings: RunnerSettings) -> Self {
        Self {
            driver,
            store,
            settings,
        }
    }

    /// The store, for diagnostic reads after a run (also after a failed one).
    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Runs the loop until termination, source loss or the stop flag.
    ///
    /// Returns `Err` only for the fatal persistence path; every other
    /// failure is absorbed into the loop's stall accounting.
    pub fn run(
        &mut self,
        mut state: HarvestState,
        stop: &AtomicBool,
    ) -> Result<HarvestReport, EngineError> {
        let mut tick: u64 = 0;
        // Set when an interim save failed recoverably, so the exit flush
        // still runs even though the core's batch counter was consumed.
        let mut retry_flush_at_exit = false;

        let outcome = 'poll: loop {
            if stop.load(Ordering::SeqCst) {
                break Outcome::Interrupted;
            }
            tick += 1;
            set_poll_tick(tick);

            match self.driver.advance() {
                Ok(()) => {}
                Err(DriverError::Gone(reason)) => {
                    trawl_warn!("view gone while advancing: {}", reason);
                    break Outcome::SourceClosed;
                }
                Err(err) => trawl_debug!("advance failed: {}", err),
            }

            let msg = match self.driver.visible_rows() {
                Ok(rows) => Msg::RowsObserved(rows),
                Err(DriverError::Gone(reason)) => {
                    trawl_warn!("view gone: {}", reason);
                    break Outcome::SourceClosed;
                }
                Err(err) => {
                    trawl_warn!("snapshot failed: {}", err);
                    Msg::ObservationFailed
                }
            };

            let before = state.stats();
            let (next, effects) = update(state, msg);
            state = next;
            log_tick_outcome(&state, before);

            for effect in effects {
                match effect {
                    Effect::Flush => match self.store.save(state.records()) {
                        Ok(()) => {
                            retry_flush_at_exit = false;
                            trawl_info!("flushed {} records to disk", state.record_count());
                        }
                        Err(err) if err.is_fatal() => return Err(err.into()),
                        Err(err) => {
                            trawl_warn!("interim save failed, retrying at exit: {}", err);
                            retry_flush_at_exit = true;
                        }
                    },
                    Effect::RequestNextPage => match self.driver.request_next_page() {
                        Ok(()) => trawl_debug!("requested the next-page affordance"),
                        Err(DriverError::Gone(reason)) => {
                            trawl_warn!("view gone at next-page request: {}", reason);
                            break 'poll Outcome::SourceClosed;
                        }
                        Err(err) => trawl_debug!("next-page request failed: {}", err),
                    },
                }
            }

            if state.phase() == Phase::Terminated {
                trawl_info!(
                    "attempt budget exhausted after {} consecutive stalls",
                    state.stall_attempts()
                );
                break Outcome::Exhausted;
            }
            if stop.load(Ordering::SeqCst) {
                break Outcome::Interrupted;
            }
            std::thread::sleep(self.settings.poll_interval);
        };

        // Flush whatever the batch threshold had not yet persisted,
        // best-effort on every exit path.
        if state.pending_flush() || retry_flush_at_exit {
            match self.store.save(state.records()) {
                Ok(()) => trawl_info!("final flush: {} records", state.record_count()),
                Err(err) if err.is_fatal() => return Err(err.into()),
                Err(err) => trawl_error!("final flush failed: {}", err),
            }
        }

        let records_on_disk = self.store.record_count();
        Ok(HarvestReport {
            outcome,
            stats: state.stats(),
            records_in_memory: state.record_count(),
            records_on_disk,
        })
    }
}

fn log_tick_outcome(state: &HarvestState, before: HarvestStats) {
    let stats = state.stats();
    let invalid = stats.invalid_dropped - before.invalid_dropped;
    if invalid > 0 {
        trawl_warn!("dropped {} malformed rows", invalid);
    }
    let accepted = stats.accepted_this_run - before.accepted_this_run;
    if accepted > 0 {
        trawl_info!(
            "accepted {} new records (collection now {})",
            accepted,
            state.record_count()
        );
    }
    let duplicates = stats.duplicates_skipped - before.duplicates_skipped;
    if duplicates > 0 {
        trawl_trace!("skipped {} already-known rows", duplicates);
    }
}
