//! Builds the enrichment provider from configuration.

use std::sync::Arc;

use tracing::{info, warn};

use assessor_core::config::EnrichmentConfig;
use assessor_core::error::AssessorResult;
use assessor_core::inference::LlmEnricher;
use assessor_core::traits::{Llm, LlmConfig, NoopEnricher, ProfileEnricher};

use crate::forge::ForgeLlm;

/// Factory for enrichment providers.
pub struct LlmFactory;

impl LlmFactory {
    /// Create the chat-completions client described by `config`.
    pub fn create(config: &EnrichmentConfig) -> AssessorResult<Arc<dyn Llm>> {
        let llm_config = LlmConfig {
            model: config.model.clone().unwrap_or_default(),
            api_key: config.api_key.clone(),
            base_url: config.api_url.clone(),
            ..LlmConfig::default()
        };
        Ok(Arc::new(ForgeLlm::new(llm_config)?))
    }

    /// Create the profile enricher for `config`.
    ///
    /// Falls back to [`NoopEnricher`] when enrichment is disabled or the
    /// client cannot be built; enrichment never blocks startup.
    pub fn enricher(config: &EnrichmentConfig) -> Arc<dyn ProfileEnricher> {
        if !config.is_enabled() {
            return Arc::new(NoopEnricher);
        }
        match Self::create(config) {
            Ok(llm) => {
                info!(model = llm.model_name(), "Profile enrichment enabled");
                Arc::new(LlmEnricher::new(llm))
            }
            Err(e) => {
                warn!(error = %e, "Enrichment misconfigured, continuing without it");
                Arc::new(NoopEnricher)
            }
        }
    }
}
