//! Cron-driven scrape scheduling.
//!
//! The scheduler is a thin external trigger around the pipeline: it fires
//! on the configured cadence, logs the outcome, and keeps running after a
//! failed run so one bad week never kills the process.

use anyhow::Context;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::Settings;
use crate::scrapers;

/// Run scrapes on the configured cron cadence until ctrl-c.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    info!(
        "scheduler starting, cron schedule {:?} in {}",
        settings.cron_schedule, settings.timezone
    );

    let sched = JobScheduler::new().await.context("creating scheduler")?;

    let job_settings = settings.clone();
    let job = Job::new_async_tz(
        settings.cron_schedule.as_str(),
        settings.timezone,
        move |_uuid, _lock| {
            let settings = job_settings.clone();
            Box::pin(async move {
                info!("scheduled scrape triggered");
                match scrapers::run_scrape(&settings).await {
                    Ok(summary) => info!(
                        "scheduled scrape complete for {}: {} agents, {} maps, {} weapons",
                        summary.week, summary.agents, summary.maps, summary.weapons
                    ),
                    Err(err) => error!("scheduled scrape failed: {err:#}"),
                }
            })
        },
    )
    .with_context(|| format!("invalid cron expression {:?}", settings.cron_schedule))?;

    sched.add(job).await.context("adding scrape job")?;
    sched.start().await.context("starting scheduler")?;

    info!("scheduler running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    info!("shutting down scheduler");
    let mut sched = sched;
    sched.shutdown().await.context("stopping scheduler")?;
    Ok(())
}
