use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use trawler_core::HarvestSettings;
use trawler_engine::RunnerSettings;

use crate::logging::LogDestination;

/// Harvest records from a virtualized, scroll-driven table view into a
/// durable JSON checkpoint. Re-running resumes from the checkpoint and only
/// adds records with unseen item numbers.
#[derive(Debug, Parser)]
#[command(name = "trawler", version)]
pub struct Cli {
    /// Source URL serving the rendered table.
    pub url: String,

    /// Checkpoint file holding the harvested collection.
    #[arg(long, default_value = "records.json")]
    pub checkpoint: PathBuf,

    /// Newly accepted records between interim flushes.
    #[arg(long, default_value_t = 50)]
    pub batch_size: usize,

    /// Consecutive no-progress polls before the source counts as exhausted.
    #[arg(long, default_value_t = 500)]
    pub max_stalls: u32,

    /// Ask for the next-page affordance every N consecutive stalls
    /// (0 disables it).
    #[arg(long, default_value_t = 3)]
    pub next_page_every: u32,

    /// Pause between polls, in milliseconds.
    #[arg(long, default_value_t = 500)]
    pub poll_interval_ms: u64,

    /// Query parameter that widens the server's visible window on each
    /// next-page request.
    #[arg(long)]
    pub page_param: Option<String>,

    /// Where log lines go.
    #[arg(long, value_enum, default_value = "terminal")]
    pub log: LogDestination,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn harvest_settings(&self) -> HarvestSettings {
        HarvestSettings {
            batch_threshold: self.batch_size,
            max_stall_attempts: self.max_stalls,
            next_page_interval: self.next_page_every,
        }
    }

    pub fn runner_settings(&self) -> RunnerSettings {
        RunnerSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_contract() {
        let cli = Cli::try_parse_from(["trawler", "http://example.com/inventory"]).unwrap();
        assert_eq!(cli.checkpoint, PathBuf::from("records.json"));
        assert_eq!(cli.batch_size, 50);
        assert_eq!(cli.max_stalls, 500);
        assert_eq!(cli.next_page_every, 3);
        assert_eq!(cli.poll_interval_ms, 500);
        assert_eq!(cli.page_param, None);
        assert_eq!(cli.log, LogDestination::Terminal);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn settings_are_derived_from_flags() {
        let cli = Cli::try_parse_from([
            "trawler",
            "http://example.com",
            "--batch-size",
            "10",
            "--max-stalls",
            "20",
            "--next-page-every",
            "0",
            "--poll-interval-ms",
            "50",
            "--page-param",
            "pages",
        ])
        .unwrap();

        let harvest = cli.harvest_settings();
        assert_eq!(harvest.batch_threshold, 10);
        assert_eq!(harvest.max_stall_attempts, 20);
        assert_eq!(harvest.next_page_interval, 0);

        let runner = cli.runner_settings();
        assert_eq!(runner.poll_interval, Duration::from_millis(50));
        assert_eq!(cli.page_param.as_deref(), Some("pages"));
    }

    #[test]
    fn url_is_required() {
        assert!(Cli::try_parse_from(["trawler"]).is_err());
    }
}
