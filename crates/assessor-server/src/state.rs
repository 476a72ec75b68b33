//! Server state management.

use std::sync::Arc;

use assessor_core::error::AssessorResult;
use assessor_core::traits::{NoopEnricher, ProfileEnricher};
use assessor_core::{
    open_store, BackgroundRuntime, ChatService, CheckInWorker, Clock, EngineConfig, MatchingEngine, SafeStore,
    SystemClock, TimelineService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub matching: Arc<MatchingEngine>,
    pub timeline: Arc<TimelineService>,
}

impl AppState {
    /// Wire the chat, matching and timeline services over one store.
    pub fn new(
        store: SafeStore,
        clock: Arc<dyn Clock>,
        config: &EngineConfig,
        enricher: Arc<dyn ProfileEnricher>,
    ) -> Self {
        Self::build(store, clock, config, enricher, None)
    }

    /// State whose chat path enrolls users with the runtime's check-in worker.
    pub fn from_runtime(
        runtime: &BackgroundRuntime,
        clock: Arc<dyn Clock>,
        enricher: Arc<dyn ProfileEnricher>,
    ) -> Self {
        Self::build(
            runtime.store(),
            clock,
            runtime.config(),
            enricher,
            Some(runtime.worker()),
        )
    }

    fn build(
        store: SafeStore,
        clock: Arc<dyn Clock>,
        config: &EngineConfig,
        enricher: Arc<dyn ProfileEnricher>,
        worker: Option<Arc<CheckInWorker>>,
    ) -> Self {
        let mut chat = ChatService::new(store.clone(), clock.clone())
            .with_enricher(enricher)
            .with_recent_limit(config.recent_messages);
        if let Some(worker) = worker {
            chat = chat.with_check_in_worker(worker);
        }
        let matching = MatchingEngine::new(store.clone(), clock.clone()).with_feed_config(config.feed);
        Self {
            chat: Arc::new(chat),
            matching: Arc::new(matching),
            timeline: Arc::new(TimelineService::new(store, clock)),
        }
    }

    /// In-memory store, system clock, no enrichment.
    pub fn in_memory() -> AssessorResult<Self> {
        let config = EngineConfig::default();
        let store = open_store(&config)?;
        Ok(Self::new(store, Arc::new(SystemClock), &config, Arc::new(NoopEnricher)))
    }

    pub fn enrichment_enabled(&self) -> bool {
        self.chat.enrichment_enabled()
    }
}
