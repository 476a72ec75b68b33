//! Periodic driver for the check-in worker.
//!
//! Wraps tokio-cron-scheduler so `CheckInWorker::poll` runs on a fixed
//! interval in the background.

use std::sync::Arc;
use std::time::Duration;

use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info};

use super::worker::CheckInWorker;
use crate::error::{AssessorError, AssessorResult};

pub struct CheckInScheduler {
    scheduler: JobScheduler,
    worker: Arc<CheckInWorker>,
    interval: Duration,
    running: bool,
}

impl CheckInScheduler {
    /// Create a scheduler. Call `start()` to begin polling.
    pub async fn new(worker: Arc<CheckInWorker>, interval: Duration) -> AssessorResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AssessorError::Internal(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            worker,
            interval: interval.max(Duration::from_secs(1)),
            running: false,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub async fn start(&mut self) -> AssessorResult<()> {
        if self.running {
            return Ok(());
        }

        let worker = self.worker.clone();
        let job = Job::new_repeated_async(self.interval, move |_uuid, _lock| {
            let worker = worker.clone();
            Box::pin(async move {
                let delivered = worker.poll();
                debug!(delivered = delivered.len(), "Check-in poll finished");
            })
        })
        .map_err(|e| AssessorError::Internal(format!("Failed to create poll job: {}", e)))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AssessorError::Internal(format!("Failed to add poll job: {}", e)))?;
        self.scheduler
            .start()
            .await
            .map_err(|e| AssessorError::Internal(format!("Failed to start scheduler: {}", e)))?;
        self.running = true;

        info!(
            interval_secs = self.interval.as_secs(),
            "Check-in scheduler started"
        );
        Ok(())
    }

    pub async fn shutdown(&mut self) -> AssessorResult<()> {
        if !self.running {
            return Ok(());
        }
        info!("Shutting down check-in scheduler");
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AssessorError::Internal(format!("Failed to shutdown scheduler: {}", e)))?;
        self.running = false;
        Ok(())
    }

    pub fn worker(&self) -> &Arc<CheckInWorker> {
        &self.worker
    }
}
