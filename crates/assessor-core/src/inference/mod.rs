//! Profile inference: fold each incoming message into the stored profile.
//!
//! Domain signals, topic micro-modules, identity statements and
//! habit/preference markers are derived by rules. An optional
//! [`ProfileEnricher`] may add more; its failures are logged and ignored.

pub mod json_parser;
mod llm_enricher;

pub use llm_enricher::{enrichment_schema, LlmEnricher, ENRICHMENT_PROMPT, ENRICHMENT_SCHEMA_NAME};

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::clock::Clock;
use crate::log_once::warn_once;
use crate::profile::{
    active_domains, detect_domains, detect_micro_modules, upsert_domain_signals,
    ActivationState, Behavior, CoreProfileUpdate, Domain, DomainState, Identity, ModuleState,
};
use crate::signals;
use crate::store::SafeStore;
use crate::traits::{NoopEnricher, ProfileEnricher};
use crate::types::UserId;

/// What one observed message changed.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceOutcome {
    /// Update merged into the core profile (empty when nothing was found).
    pub core_update: CoreProfileUpdate,
    /// Domains mentioned by this message.
    pub detected_domains: Vec<Domain>,
    /// Domains active after this message.
    pub active_domains: Vec<Domain>,
    /// Names of template modules switched on by this message.
    pub activated_modules: Vec<String>,
    /// Whether the enricher contributed to `core_update`.
    pub enriched: bool,
}

pub struct ProfileInference {
    store: SafeStore,
    enricher: Arc<dyn ProfileEnricher>,
    clock: Arc<dyn Clock>,
}

impl ProfileInference {
    pub fn new(store: SafeStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            enricher: Arc::new(NoopEnricher),
            clock,
        }
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn ProfileEnricher>) -> Self {
        self.enricher = enricher;
        self
    }

    pub fn enrichment_enabled(&self) -> bool {
        self.enricher.is_enabled()
    }

    /// Observe one user message. The message itself is not logged here.
    pub async fn observe(&self, user_id: UserId, message: &str) -> InferenceOutcome {
        let now = self.clock.now();
        let core = self.store.ensure_core(user_id);

        let mut domains = self.store.get_domains(user_id);
        let detected = detect_domains(message, now);
        let mut changed: Vec<DomainState> = Vec::with_capacity(detected.len());
        for hit in &detected {
            let current = domains
                .get(&hit.domain)
                .cloned()
                .unwrap_or_else(|| DomainState::empty(hit.domain));
            let updated = upsert_domain_signals(
                &current,
                std::slice::from_ref(&hit.signal),
                Some(&hit.signal.reason),
            );
            domains.insert(hit.domain, updated.clone());
            changed.push(updated);
        }
        if !changed.is_empty() {
            self.store.upsert_domain_states(user_id, &changed);
        }

        let active = active_domains(&domains);
        let modules = detect_micro_modules(message, &active);
        for module in &modules {
            let state = ModuleState::Activation(ActivationState {
                last_triggered_at: now,
            });
            self.store.upsert_micro_module(user_id, module, true, &state);
        }

        let mut update = heuristic_update(message);
        let mut enriched = false;
        if self.enricher.is_enabled() {
            match self.enricher.enrich(message, &core).await {
                Ok(Some(extra)) => {
                    update = update.combine(extra);
                    enriched = true;
                }
                Ok(None) => {}
                Err(e) => warn_once(
                    "enrichment:failed",
                    format_args!("Profile enrichment failed, using heuristics only: {}", e),
                ),
            }
        }

        if !update.is_empty() {
            self.store.update_core(user_id, &update);
        }

        debug!(
            user_id,
            detected = detected.len(),
            active = active.len(),
            modules = modules.len(),
            enriched,
            "Observed message"
        );

        InferenceOutcome {
            core_update: update,
            detected_domains: detected.iter().map(|hit| hit.domain).collect(),
            active_domains: active,
            activated_modules: modules.into_iter().map(|m| m.name).collect(),
            enriched,
        }
    }
}

/// Rule-based profile update: identity statements and behaviour markers.
pub fn heuristic_update(message: &str) -> CoreProfileUpdate {
    let lowered = message.to_lowercase();
    CoreProfileUpdate {
        identity: Identity {
            statements: signals::extract_identity_statements(message),
            aliases: Vec::new(),
        },
        behavior: Behavior {
            habits: signals::habit_markers(&lowered)
                .into_iter()
                .map(|marker| format!("Hábito detectado: {}", marker))
                .collect(),
            preferences: signals::preference_markers(&lowered)
                .into_iter()
                .map(|marker| format!("Preferência detectada: {}", marker))
                .collect(),
        },
        ..CoreProfileUpdate::default()
    }
}
