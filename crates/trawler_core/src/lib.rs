//! Trawler core: pure harvest state machine, validation and deduplication.
mod dedupe;
mod effect;
mod msg;
mod record;
mod state;
mod update;

pub use dedupe::Deduplicator;
pub use effect::Effect;
pub use msg::Msg;
pub use record::{Record, FIELD_COUNT, MIN_SKU_CHARS};
pub use state::{HarvestSettings, HarvestState, HarvestStats, Phase};
pub use update::update;
