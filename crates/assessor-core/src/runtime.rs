//! Background runtime for the check-in worker.
//!
//! Owns the profile store, the worker and its scheduler, and provides
//! unified startup and graceful shutdown.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::checkin::{CheckInMessage, CheckInScheduler, CheckInWorker, DeliveryCallback};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::AssessorResult;
use crate::store::{SafeStore, SqliteProfileStore};
use crate::types::UserId;

/// Buffered check-ins before new ones are dropped.
const DELIVERY_BUFFER: usize = 100;

/// Receiver for rendered check-ins when no callback was injected.
pub type DeliveryReceiver = mpsc::Receiver<(UserId, CheckInMessage)>;

/// Open the configured profile store: file-backed when a path is set,
/// in-memory otherwise.
pub fn open_store(config: &EngineConfig) -> AssessorResult<SafeStore> {
    let store = match &config.db_path {
        Some(path) => {
            debug!(path = %path, "Creating file-backed profile store");
            SqliteProfileStore::new(path)?
        }
        None => {
            debug!("Creating in-memory profile store");
            SqliteProfileStore::in_memory()?
        }
    };
    Ok(SafeStore::new(Arc::new(store)))
}

pub struct BackgroundRuntime {
    store: SafeStore,
    worker: Arc<CheckInWorker>,
    scheduler: Option<CheckInScheduler>,
    delivery_rx: Option<DeliveryReceiver>,
    config: EngineConfig,
}

impl BackgroundRuntime {
    /// Create a runtime whose check-ins are read from [`take_delivery_rx`].
    ///
    /// [`take_delivery_rx`]: BackgroundRuntime::take_delivery_rx
    pub async fn new(
        config: EngineConfig,
        store: SafeStore,
        clock: Arc<dyn Clock>,
    ) -> AssessorResult<Self> {
        let (tx, rx) = mpsc::channel(DELIVERY_BUFFER);
        let delivery: DeliveryCallback = Arc::new(move |user_id: UserId, message: CheckInMessage| {
            if let Err(e) = tx.try_send((user_id, message)) {
                warn!(user_id, error = %e, "Dropping check-in delivery");
            }
        });
        let mut runtime = Self::with_delivery(config, store, clock, delivery).await?;
        runtime.delivery_rx = Some(rx);
        Ok(runtime)
    }

    /// Create a runtime that hands check-ins to `delivery`.
    pub async fn with_delivery(
        config: EngineConfig,
        store: SafeStore,
        clock: Arc<dyn Clock>,
        delivery: DeliveryCallback,
    ) -> AssessorResult<Self> {
        debug!(
            checkins_enabled = config.enable_checkins,
            poll_seconds = config.checkin_poll_seconds,
            "Creating BackgroundRuntime"
        );

        let worker = Arc::new(CheckInWorker::new(store.clone(), clock).with_delivery(delivery));
        let scheduler = if config.enable_checkins {
            Some(CheckInScheduler::new(worker.clone(), config.checkin_poll_interval()).await?)
        } else {
            None
        };

        Ok(Self {
            store,
            worker,
            scheduler,
            delivery_rx: None,
            config,
        })
    }

    pub async fn start(&mut self) -> AssessorResult<()> {
        match self.scheduler.as_mut() {
            Some(scheduler) => {
                scheduler.start().await?;
                info!("Background runtime started");
            }
            None => info!("Check-ins disabled, background runtime idle"),
        }
        Ok(())
    }

    pub async fn shutdown(&mut self) -> AssessorResult<()> {
        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.shutdown().await?;
        }
        info!("Background runtime stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.as_ref().is_some_and(CheckInScheduler::is_running)
    }

    /// Seed check-in jobs for a user. Returns `false` if already enrolled.
    pub fn enroll(&self, user_id: UserId) -> bool {
        self.worker.enroll(user_id)
    }

    /// Can only be taken once; later calls return `None`.
    pub fn take_delivery_rx(&mut self) -> Option<DeliveryReceiver> {
        self.delivery_rx.take()
    }

    pub fn worker(&self) -> Arc<CheckInWorker> {
        self.worker.clone()
    }

    pub fn store(&self) -> SafeStore {
        self.store.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
