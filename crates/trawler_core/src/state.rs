use crate::{Deduplicator, Record};

/// Harvest loop phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Actively finding new rows.
    #[default]
    Advancing,
    /// No newly accepted record recently; still within the attempt budget.
    Stalled,
    /// Attempt budget exhausted; the loop must exit.
    Terminated,
}

/// Tunable knobs of the harvest loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestSettings {
    /// Newly accepted records that trigger an interim flush.
    pub batch_threshold: usize,
    /// Consecutive stalled iterations before termination.
    pub max_stall_attempts: u32,
    /// Request the next-page affordance every this many consecutive stalls.
    /// Zero disables the secondary recovery strategy.
    pub next_page_interval: u32,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            batch_threshold: 50,
            max_stall_attempts: 500,
            next_page_interval: 3,
        }
    }
}

/// Running counters for reporting. `accepted_this_run` excludes records
/// loaded from the checkpoint at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HarvestStats {
    pub accepted_this_run: usize,
    pub duplicates_skipped: usize,
    pub invalid_dropped: usize,
}

/// The full state of the harvest loop between ticks.
///
/// Mutated only through [`crate::update`]; the collection grows append-only
/// and accepted records are never revised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestState {
    settings: HarvestSettings,
    records: Vec<Record>,
    dedupe: Deduplicator,
    phase: Phase,
    last_row_count: usize,
    stall_attempts: u32,
    new_since_last_save: usize,
    stats: HarvestStats,
}

impl HarvestState {
    /// Fresh state with an empty collection.
    pub fn new(settings: HarvestSettings) -> Self {
        Self::resume(settings, Vec::new())
    }

    /// State resumed from a previously persisted collection.
    ///
    /// Seeds the deduplicator with every loaded key. The row count starts at
    /// zero regardless of how many records are already known: the view
    /// restarts its own row indexing per navigation, and it is identity
    /// deduplication, not index continuity, that keeps a second run additive.
    pub fn resume(settings: HarvestSettings, loaded: Vec<Record>) -> Self {
        let dedupe = Deduplicator::seeded(loaded.iter());
        Self {
            settings,
            records: loaded,
            dedupe,
            phase: Phase::Advancing,
            last_row_count: 0,
            stall_attempts: 0,
            new_since_last_save: 0,
            stats: HarvestStats::default(),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stats(&self) -> HarvestStats {
        self.stats
    }

    pub fn stall_attempts(&self) -> u32 {
        self.stall_attempts
    }

    pub fn last_row_count(&self) -> usize {
        self.last_row_count
    }

    /// Whether accepted records are sitting in memory beyond the last flush.
    pub fn pending_flush(&self) -> bool {
        self.new_since_last_save > 0
    }

    pub(crate) fn settings(&self) -> HarvestSettings {
        self.settings
    }

    /// Validates, deduplicates and appends the trailing rows of a snapshot.
    /// Returns how many records were newly accepted.
    pub(crate) fn process_new_rows(&mut self, fresh: &[Vec<String>]) -> usize {
        let mut accepted = 0;
        for cells in fresh {
            let record = Record::from_cells(cells);
            if !record.is_well_formed() {
                self.stats.invalid_dropped += 1;
                continue;
            }
            if self.dedupe.is_duplicate(record.identity()) {
                self.stats.duplicates_skipped += 1;
                continue;
            }
            self.dedupe.record(record.identity().to_owned());
            self.records.push(record);
            self.stats.accepted_this_run += 1;
            self.new_since_last_save += 1;
            accepted += 1;
        }
        accepted
    }

    /// At least one record was newly accepted this tick.
    pub(crate) fn mark_progress(&mut self, current_row_count: usize) {
        self.stall_attempts = 0;
        self.last_row_count = current_row_count;
        self.phase = Phase::Advancing;
    }

    /// Nothing newly accepted this tick. Returns true when the attempt
    /// budget is now exhausted.
    pub(crate) fn mark_stall(&mut self) -> bool {
        self.stall_attempts += 1;
        if self.stall_attempts >= self.settings.max_stall_attempts {
            self.phase = Phase::Terminated;
            true
        } else {
            self.phase = Phase::Stalled;
            false
        }
    }

    /// Whether the interim-flush threshold has been reached.
    pub(crate) fn flush_due(&self) -> bool {
        self.settings.batch_threshold > 0 && self.new_since_last_save >= self.settings.batch_threshold
    }

    pub(crate) fn reset_flush_counter(&mut self) {
        self.new_since_last_save = 0;
    }
}
