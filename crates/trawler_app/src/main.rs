mod cli;
mod logging;
mod signal;

use anyhow::Context;
use clap::Parser;
use trawler_core::HarvestState;
use trawler_engine::{
    CheckpointStore, HarvestRunner, HttpDriverSettings, HttpTableDriver, Outcome,
};
use trawler_logging::{trawl_error, trawl_info};
use url::Url;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    logging::initialize(cli.log, cli.verbose);
    signal::install_signal_handlers();

    let url = Url::parse(&cli.url).context("invalid source url")?;
    let mut driver_settings = HttpDriverSettings::new(url);
    driver_settings.page_param = cli.page_param.clone();
    let driver = HttpTableDriver::new(driver_settings).context("driver setup failed")?;

    let store = CheckpointStore::new(&cli.checkpoint);
    let loaded = store.load();
    trawl_info!(
        "resuming with {} previously harvested records from {:?}",
        loaded.len(),
        cli.checkpoint
    );
    println!("Loaded {} existing records", loaded.len());

    let state = HarvestState::resume(cli.harvest_settings(), loaded);
    let mut runner = HarvestRunner::new(driver, store, cli.runner_settings());

    let result = runner.run(state, &signal::SHUTDOWN);

    // Every exit path (completion, interruption, error) reports what is
    // durable before the process ends. The diagnostic read goes through the
    // same store the loop used and cannot itself fail.
    let durable = runner.store().record_count();
    match &result {
        Ok(report) => {
            let outcome = match report.outcome {
                Outcome::Exhausted => "source exhausted",
                Outcome::SourceClosed => "source closed",
                Outcome::Interrupted => "interrupted",
            };
            println!("Harvest finished: {outcome}");
            println!(
                "  new {}, duplicates skipped {}, invalid dropped {}",
                report.stats.accepted_this_run,
                report.stats.duplicates_skipped,
                report.stats.invalid_dropped
            );
        }
        Err(err) => trawl_error!("harvest aborted: {}", err),
    }
    println!("Total records on disk: {durable}");

    result.context("harvest aborted")?;
    Ok(())
}
