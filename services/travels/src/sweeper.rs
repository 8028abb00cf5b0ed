//! Periodic deletion of expired pending ride requests
//!
//! Expiry is a deadline, not a cancellation signal: the matching predicate
//! re-checks `expires_at`, so a request that outlives its deadline is
//! unmatchable even before the sweep physically removes it. The sweep is a
//! single conditional delete scoped to pending rows, which keeps it disjoint
//! from concurrent claims at the row level.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::error::TravelsResult;
use crate::store::RequestTravelStore;

/// Retires expired pending requests on a schedule
#[derive(Clone)]
pub struct ExpirySweeper {
    requests: Arc<dyn RequestTravelStore>,
}

impl ExpirySweeper {
    pub fn new(requests: Arc<dyn RequestTravelStore>) -> Self {
        Self { requests }
    }

    /// Delete every pending request whose deadline has passed
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> TravelsResult<u64> {
        let deleted = self.requests.delete_expired_pending(now).await?;
        info!("Deleted {} expired request travels", deleted);
        Ok(deleted)
    }

    /// Run the sweep on a cron schedule
    pub async fn start_schedule(&self, schedule: &str) -> anyhow::Result<()> {
        let sweeper = self.clone();

        let scheduler = JobScheduler::new().await?;

        let job = Job::new_async(schedule, move |_, _| {
            let sweeper = sweeper.clone();
            Box::pin(async move {
                if let Err(e) = sweeper.sweep_expired(Utc::now()).await {
                    error!("Expiry sweep failed: {}", e);
                }
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;

        info!("Started expiry sweep scheduler with schedule: {}", schedule);
        Ok(())
    }
}
