//! Job worker command.

use std::time::Duration;

use tokio::runtime::Runtime;

use crate::jobs::{self, JobQueue};

use super::{AppContext, Cli};

/// Drain the analysis queue; keep polling unless `once` is set.
pub fn cmd_worker(rt: &Runtime, cli: &Cli, once: bool, poll_secs: u64) -> anyhow::Result<()> {
    rt.block_on(async {
        let ctx = AppContext::open(cli).await?;
        let pipeline = ctx.pipeline()?;
        let queue = JobQueue::new(ctx.pool.clone());

        let queued = queue.queued_count().await?;
        tracing::info!("Worker starting with {} queued jobs", queued);

        jobs::run_worker(&queue, &pipeline, Duration::from_secs(poll_secs), once).await?;
        Ok::<_, anyhow::Error>(())
    })
}
