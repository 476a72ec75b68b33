//! A store wrapper that never fails.
//!
//! Reads that error come back empty or default, writes that error become
//! no-ops, and each failing operation is logged once per process.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::AssessorResult;
use crate::log_once::warn_once;
use crate::profile::{
    default_domain_states, CoreProfile, CoreProfileUpdate, DomainState, DomainStates,
    MicroModule, MicroModuleActivation, ModuleState,
};
use crate::store::ProfileStore;
use crate::types::{MessageRole, PatternInsight, StoredInsight, StoredMessage, UserId};

#[derive(Clone)]
pub struct SafeStore {
    inner: Arc<dyn ProfileStore>,
}

impl SafeStore {
    pub fn new(inner: Arc<dyn ProfileStore>) -> Self {
        Self { inner }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &Arc<dyn ProfileStore> {
        &self.inner
    }

    fn read<T>(&self, operation: &str, result: AssessorResult<T>, fallback: impl FnOnce() -> T) -> T {
        match result {
            Ok(value) => value,
            Err(e) => {
                warn_once(
                    &format!("store:{}", operation),
                    format_args!("Profile store {} failed, using defaults: {}", operation, e),
                );
                fallback()
            }
        }
    }

    fn write(&self, operation: &str, result: AssessorResult<()>) {
        self.read(operation, result, || ())
    }

    pub fn get_core(&self, user_id: UserId) -> CoreProfile {
        let result = self.inner.get_core(user_id);
        self.read("get_core", result, || None).unwrap_or_default()
    }

    pub fn ensure_core(&self, user_id: UserId) -> CoreProfile {
        let result = self.inner.ensure_core(user_id);
        self.read("ensure_core", result, CoreProfile::default)
    }

    /// Merge an update; on failure the merge is computed locally but not kept.
    pub fn update_core(&self, user_id: UserId, update: &CoreProfileUpdate) -> CoreProfile {
        let result = self.inner.update_core(user_id, update);
        self.read("update_core", result, || {
            crate::profile::merge_core_profile(&CoreProfile::default(), update)
        })
    }

    pub fn get_domains(&self, user_id: UserId) -> DomainStates {
        let result = self.inner.get_domains(user_id);
        self.read("get_domains", result, default_domain_states)
    }

    pub fn upsert_domain_states(&self, user_id: UserId, states: &[DomainState]) {
        let result = self.inner.upsert_domain_states(user_id, states);
        self.write("upsert_domain_states", result)
    }

    pub fn upsert_micro_module(
        &self,
        user_id: UserId,
        activation: &MicroModuleActivation,
        active: bool,
        state: &ModuleState,
    ) {
        let result = self
            .inner
            .upsert_micro_module(user_id, activation, active, state);
        self.write("upsert_micro_module", result)
    }

    pub fn get_micro_modules(&self, user_id: UserId) -> Vec<MicroModule> {
        let result = self.inner.get_micro_modules(user_id);
        self.read("get_micro_modules", result, Vec::new)
    }

    pub fn log_message(&self, user_id: UserId, role: MessageRole, content: &str, at: DateTime<Utc>) {
        let result = self.inner.log_message(user_id, role, content, at);
        self.write("log_message", result)
    }

    pub fn list_recent_messages(&self, user_id: UserId, limit: usize) -> Vec<StoredMessage> {
        let result = self.inner.list_recent_messages(user_id, limit);
        self.read("list_recent_messages", result, Vec::new)
    }

    pub fn add_insights(&self, user_id: UserId, insights: &[PatternInsight], at: DateTime<Utc>) {
        if insights.is_empty() {
            return;
        }
        let result = self.inner.add_insights(user_id, insights, at);
        self.write("add_insights", result)
    }

    pub fn list_recent_insights(&self, user_id: UserId, limit: usize) -> Vec<StoredInsight> {
        let result = self.inner.list_recent_insights(user_id, limit);
        self.read("list_recent_insights", result, Vec::new)
    }

    pub fn list_insights(&self, user_id: UserId) -> Vec<PatternInsight> {
        let result = self.inner.list_insights(user_id);
        self.read("list_insights", result, Vec::new)
    }

    pub fn list_user_ids(&self, limit: usize) -> Vec<UserId> {
        let result = self.inner.list_user_ids(limit);
        self.read("list_user_ids", result, Vec::new)
    }
}

impl std::fmt::Debug for SafeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafeStore").finish_non_exhaustive()
    }
}
