//! Matching engine: profile builder, scorer and feed memory wired together.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use serde::Serialize;
use tracing::debug;

use crate::clock::Clock;
use crate::config::FeedConfig;
use crate::matching::compatibility::{calculate_compatibility, CompatibilityBias, CompatibilityResult};
use crate::matching::feed::{FeedSuggestion, InteractionRecord, InteractionType, MatchingMemory};
use crate::matching::profile_builder::{DeepProfile, ProfileBuilder};
use crate::matching::synthetic::{synthetic_profiles, FeedCard};
use crate::store::SafeStore;
use crate::types::UserId;

/// Candidate ids fetched per requested card.
const CANDIDATE_FANOUT: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct PairCompatibility {
    pub user: DeepProfile,
    pub candidate: DeepProfile,
    pub result: CompatibilityResult,
}

/// Feed memory is process-local and locked per user; there is no global
/// lock held across scoring.
pub struct MatchingEngine {
    store: SafeStore,
    builder: ProfileBuilder,
    clock: Arc<dyn Clock>,
    limits: FeedConfig,
    memories: RwLock<HashMap<UserId, Arc<Mutex<MatchingMemory>>>>,
}

impl MatchingEngine {
    pub fn new(store: SafeStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            builder: ProfileBuilder::new(store.clone()),
            store,
            clock,
            limits: FeedConfig::default(),
            memories: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_feed_config(mut self, limits: FeedConfig) -> Self {
        self.limits = limits;
        self
    }

    fn memory(&self, user_id: UserId) -> Arc<Mutex<MatchingMemory>> {
        if let Some(memory) = self
            .memories
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&user_id)
        {
            return memory.clone();
        }
        self.memories
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(MatchingMemory::new(self.limits))))
            .clone()
    }

    fn lock(memory: &Mutex<MatchingMemory>) -> MutexGuard<'_, MatchingMemory> {
        memory.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn build_profile(&self, user_id: UserId) -> DeepProfile {
        self.builder.build(user_id)
    }

    /// Current learned bias for a user.
    pub fn bias(&self, user_id: UserId) -> CompatibilityBias {
        Self::lock(&self.memory(user_id)).bias().clone()
    }

    pub fn interactions(&self, user_id: UserId) -> Vec<InteractionRecord> {
        Self::lock(&self.memory(user_id)).interactions().cloned().collect()
    }

    pub fn calculate_pair_compatibility(&self, user_id: UserId, candidate_id: UserId) -> PairCompatibility {
        let user = self.builder.build(user_id);
        let candidate = self.builder.build(candidate_id);
        let bias = self.bias(user_id);
        let result = calculate_compatibility(&user, &candidate, Some(&bias));
        PairCompatibility {
            user,
            candidate,
            result,
        }
    }

    /// Rank `candidate_ids` for `user_id`. Self and already-seen ids are
    /// dropped, and every returned id is marked seen.
    pub fn suggest_matches(
        &self,
        user_id: UserId,
        candidate_ids: &[UserId],
        limit: Option<usize>,
    ) -> Vec<FeedSuggestion> {
        let user = self.builder.build(user_id);
        let candidates: Vec<DeepProfile> = candidate_ids
            .iter()
            .filter(|id| **id != user_id)
            .map(|id| self.builder.build(*id))
            .collect();
        self.rank(&user, candidates, limit).0
    }

    fn rank(
        &self,
        user: &DeepProfile,
        candidates: Vec<DeepProfile>,
        limit: Option<usize>,
    ) -> (Vec<FeedSuggestion>, Vec<DeepProfile>) {
        let memory = self.memory(user.user_id);
        let mut memory = Self::lock(&memory);
        let bias = memory.bias().clone();

        let scored: Vec<(DeepProfile, CompatibilityResult)> = candidates
            .into_iter()
            .map(|candidate| {
                let result = calculate_compatibility(user, &candidate, Some(&bias));
                (candidate, result)
            })
            .collect();
        let suggestions = memory.build_feed(user, &scored, limit);
        debug!(
            user_id = user.user_id,
            candidates = scored.len(),
            suggested = suggestions.len(),
            "Ranked matching feed"
        );
        (suggestions, scored.into_iter().map(|(profile, _)| profile).collect())
    }

    pub fn record_interaction(
        &self,
        user_id: UserId,
        candidate: &DeepProfile,
        kind: InteractionType,
        score: Option<u8>,
    ) {
        let now = self.clock.now();
        Self::lock(&self.memory(user_id)).record(candidate, kind, score, now);
        debug!(user_id, target_id = candidate.user_id, kind = %kind, "Recorded interaction");
    }

    /// Up to `limit * 3` other users from the store.
    pub fn candidate_ids(&self, user_id: UserId, limit: usize) -> Vec<UserId> {
        let wanted = limit * CANDIDATE_FANOUT;
        self.store
            .list_user_ids(wanted + 1)
            .into_iter()
            .filter(|id| *id != user_id)
            .take(wanted)
            .collect()
    }

    /// Feed cards for a user, falling back to synthetic seeds when no real
    /// candidate is left to show. Seeds are scored without the learned bias.
    pub fn feed_cards(&self, user_id: UserId, limit: usize) -> Vec<FeedCard> {
        let user = self.builder.build(user_id);
        let candidates: Vec<DeepProfile> = self
            .candidate_ids(user_id, limit)
            .into_iter()
            .map(|id| self.builder.build(id))
            .collect();

        let (mut suggestions, mut profiles) = self.rank(&user, candidates, Some(limit));
        if suggestions.is_empty() {
            debug!(user_id, "No real candidates, using synthetic feed");
            profiles = synthetic_profiles(user_id, limit, self.clock.now());
            let scored: Vec<(DeepProfile, CompatibilityResult)> = profiles
                .iter()
                .map(|profile| (profile.clone(), calculate_compatibility(&user, profile, None)))
                .collect();
            // synthetic seeds never count as seen
            suggestions = MatchingMemory::new(self.limits).build_feed(&user, &scored, Some(limit));
        }

        let by_id: HashMap<UserId, &DeepProfile> =
            profiles.iter().map(|profile| (profile.user_id, profile)).collect();
        suggestions
            .iter()
            .map(|suggestion| {
                FeedCard::from_suggestion(by_id.get(&suggestion.user_id).copied(), suggestion)
            })
            .collect()
    }
}

impl std::fmt::Debug for MatchingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let users = self.memories.read().map(|m| m.len()).unwrap_or(0);
        f.debug_struct("MatchingEngine")
            .field("limits", &self.limits)
            .field("users", &users)
            .finish()
    }
}
