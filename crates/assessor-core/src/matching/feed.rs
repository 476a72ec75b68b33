//! Per-user feed memory: anti-repeat, interaction log and the learned bias.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::config::FeedConfig;
use crate::matching::compatibility::{CompatibilityBias, CompatibilityResult};
use crate::matching::profile_builder::DeepProfile;
use crate::types::UserId;

const LIKE_WEIGHT: f64 = 1.0;
const PASS_WEIGHT: f64 = -0.5;
/// Tone tallies move at half the rate of domains and interests.
const TONE_FACTOR: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    View,
    Like,
    Pass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    pub target_id: UserId,
    #[serde(rename = "type")]
    pub kind: InteractionType,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSuggestion {
    pub user_id: UserId,
    pub score: u8,
    pub rationale: Vec<String>,
    pub feed_preview: String,
}

/// What the feed remembers about one evaluating user.
///
/// `seen` and the interaction log are FIFO-bounded by [`FeedConfig`]; an id
/// evicted from `seen` may be suggested again.
#[derive(Debug, Clone)]
pub struct MatchingMemory {
    seen: HashSet<UserId>,
    seen_order: VecDeque<UserId>,
    interactions: VecDeque<InteractionRecord>,
    tally: CompatibilityBias,
    limits: FeedConfig,
}

impl MatchingMemory {
    pub fn new(limits: FeedConfig) -> Self {
        Self {
            seen: HashSet::new(),
            seen_order: VecDeque::new(),
            interactions: VecDeque::new(),
            tally: CompatibilityBias::default(),
            limits,
        }
    }

    pub fn has_seen(&self, user_id: UserId) -> bool {
        self.seen.contains(&user_id)
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn interactions(&self) -> impl Iterator<Item = &InteractionRecord> {
        self.interactions.iter()
    }

    /// The feature tally, used directly as the compatibility bias.
    pub fn bias(&self) -> &CompatibilityBias {
        &self.tally
    }

    pub fn remember(&mut self, ids: impl IntoIterator<Item = UserId>) {
        for id in ids {
            if !self.seen.insert(id) {
                continue;
            }
            self.seen_order.push_back(id);
            while self.seen_order.len() > self.limits.max_seen {
                if let Some(oldest) = self.seen_order.pop_front() {
                    self.seen.remove(&oldest);
                }
            }
        }
    }

    pub fn record(
        &mut self,
        candidate: &DeepProfile,
        kind: InteractionType,
        compatibility: Option<u8>,
        at: DateTime<Utc>,
    ) {
        self.interactions.push_back(InteractionRecord {
            target_id: candidate.user_id,
            kind,
            timestamp: at,
            compatibility,
        });
        while self.interactions.len() > self.limits.max_interactions {
            self.interactions.pop_front();
        }

        match kind {
            InteractionType::Like => self.adjust(candidate, LIKE_WEIGHT),
            InteractionType::Pass => self.adjust(candidate, PASS_WEIGHT),
            InteractionType::View => {}
        }
    }

    fn adjust(&mut self, candidate: &DeepProfile, weight: f64) {
        for domain in &candidate.active_domains {
            *self.tally.preferred_domains.entry(*domain).or_default() += weight;
        }
        for interest in &candidate.interests {
            *self
                .tally
                .favored_interests
                .entry(interest.to_lowercase())
                .or_default() += weight;
        }
        for tone in &candidate.conversation_style {
            *self
                .tally
                .conversation_tone
                .entry(tone.to_lowercase())
                .or_default() += weight * TONE_FACTOR;
        }
    }

    /// Rank scored candidates, dropping self and anything already seen, then
    /// mark the returned ids as seen.
    ///
    /// Ties on score go to the lower id. Candidates cut by `limit` stay unseen.
    pub fn build_feed(
        &mut self,
        user: &DeepProfile,
        scored: &[(DeepProfile, CompatibilityResult)],
        limit: Option<usize>,
    ) -> Vec<FeedSuggestion> {
        let mut listed = HashSet::new();
        let mut ranked: Vec<FeedSuggestion> = scored
            .iter()
            .filter(|(profile, _)| profile.user_id != user.user_id && !self.has_seen(profile.user_id))
            .filter(|(profile, _)| listed.insert(profile.user_id))
            .map(|(profile, result)| FeedSuggestion {
                user_id: profile.user_id,
                score: result.score,
                rationale: result.rationale.clone(),
                feed_preview: feed_preview(profile, result),
            })
            .collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score).then(a.user_id.cmp(&b.user_id)));
        if let Some(limit) = limit {
            ranked.truncate(limit);
        }

        self.remember(ranked.iter().map(|suggestion| suggestion.user_id));
        ranked
    }
}

impl Default for MatchingMemory {
    fn default() -> Self {
        Self::new(FeedConfig::default())
    }
}

/// One-line summary shown on a feed card.
pub fn feed_preview(profile: &DeepProfile, result: &CompatibilityResult) -> String {
    let domains = profile
        .active_domains
        .iter()
        .take(2)
        .map(|domain| domain.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let themes = profile
        .recurring_themes
        .iter()
        .take(2)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    let reason = result
        .rationale
        .first()
        .map(String::as_str)
        .unwrap_or("Alinhamento de valores detectado");

    format!(
        "Domínios: {}. Temas: {}. {}.",
        if domains.is_empty() { "interesses diversos" } else { domains.as_str() },
        if themes.is_empty() { "temas variados" } else { themes.as_str() },
        reason
    )
}
