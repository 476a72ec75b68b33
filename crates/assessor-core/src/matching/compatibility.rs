//! Weighted multi-factor compatibility between two deep profiles.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::matching::profile_builder::DeepProfile;
use crate::profile::Domain;

const WEIGHT_BIG_FIVE: f64 = 0.35;
const WEIGHT_DOMAINS: f64 = 0.25;
const WEIGHT_THEMES: f64 = 0.15;
const WEIGHT_HOBBIES: f64 = 0.10;
const WEIGHT_CONVERSATION: f64 = 0.10;
const WEIGHT_TRIGGERS: f64 = 0.05;

/// Sub-score when either side has no active domains.
const EMPTY_DOMAIN_SCORE: u8 = 50;
/// Sub-score when either side of a set similarity is empty.
const EMPTY_SET_SCORE: u8 = 40;

/// Additive weights learned from feed feedback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityBias {
    pub preferred_domains: BTreeMap<Domain, f64>,
    pub favored_interests: BTreeMap<String, f64>,
    pub conversation_tone: BTreeMap<String, f64>,
}

impl CompatibilityBias {
    pub fn is_empty(&self) -> bool {
        self.preferred_domains.is_empty()
            && self.favored_interests.is_empty()
            && self.conversation_tone.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityBreakdown {
    pub big_five: u8,
    pub domains: u8,
    pub themes: u8,
    pub hobbies: u8,
    pub conversation: u8,
    pub emotional_triggers: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityResult {
    pub score: u8,
    pub breakdown: CompatibilityBreakdown,
    pub rationale: Vec<String>,
}

/// Score `candidate` from `user`'s point of view.
///
/// Only the Big Five sub-score is symmetric; bias makes the rest directional.
pub fn calculate_compatibility(
    user: &DeepProfile,
    candidate: &DeepProfile,
    bias: Option<&CompatibilityBias>,
) -> CompatibilityResult {
    let empty = CompatibilityBias::default();
    let bias = bias.unwrap_or(&empty);

    let breakdown = CompatibilityBreakdown {
        big_five: score_big_five(user, candidate),
        domains: score_domains(user, candidate, &bias.preferred_domains),
        themes: similarity(
            &user.recurring_themes,
            &candidate.recurring_themes,
            Some(&bias.favored_interests),
        ),
        hobbies: similarity(&user.hobbies, &candidate.hobbies, Some(&bias.favored_interests)),
        conversation: similarity(
            &user.conversation_style,
            &candidate.conversation_style,
            Some(&bias.conversation_tone),
        ),
        emotional_triggers: similarity(&user.emotional_triggers, &candidate.emotional_triggers, None),
    };

    let weighted = f64::from(breakdown.big_five) * WEIGHT_BIG_FIVE
        + f64::from(breakdown.domains) * WEIGHT_DOMAINS
        + f64::from(breakdown.themes) * WEIGHT_THEMES
        + f64::from(breakdown.hobbies) * WEIGHT_HOBBIES
        + f64::from(breakdown.conversation) * WEIGHT_CONVERSATION
        + f64::from(breakdown.emotional_triggers) * WEIGHT_TRIGGERS;

    CompatibilityResult {
        score: clamp(weighted),
        rationale: rationale(user, candidate, &breakdown),
        breakdown,
    }
}

fn clamp(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

fn score_big_five(user: &DeepProfile, candidate: &DeepProfile) -> u8 {
    let a = user.core.big_five.as_array();
    let b = candidate.core.big_five.as_array();
    let distance: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(x.abs_diff(*y)))
        .sum();
    clamp(100.0 - distance / a.len() as f64)
}

fn score_domains(
    user: &DeepProfile,
    candidate: &DeepProfile,
    bias: &BTreeMap<Domain, f64>,
) -> u8 {
    if user.active_domains.is_empty() || candidate.active_domains.is_empty() {
        return EMPTY_DOMAIN_SCORE;
    }

    let ours: HashSet<Domain> = user.active_domains.iter().copied().collect();
    let theirs: HashSet<Domain> = candidate.active_domains.iter().copied().collect();
    let shared: Vec<Domain> = ours.intersection(&theirs).copied().collect();
    let union = ours.union(&theirs).count();

    let base = shared.len() as f64 / union as f64 * 100.0;
    let boost: f64 = shared.iter().filter_map(|d| bias.get(d)).sum();
    clamp(base + boost)
}

/// Case-insensitive intersection over union, scaled to 100, plus bias on shared items.
fn similarity(a: &[String], b: &[String], bias: Option<&BTreeMap<String, f64>>) -> u8 {
    if a.is_empty() || b.is_empty() {
        return EMPTY_SET_SCORE;
    }

    let left: HashSet<String> = a.iter().map(|item| item.to_lowercase()).collect();
    let right: HashSet<String> = b.iter().map(|item| item.to_lowercase()).collect();
    let shared: Vec<&String> = left.intersection(&right).collect();
    let union = left.union(&right).count();

    let base = shared.len() as f64 / union as f64 * 100.0;
    let boost: f64 = bias
        .map(|weights| shared.iter().filter_map(|item| weights.get(*item)).sum())
        .unwrap_or(0.0);
    clamp(base + boost)
}

fn shared_items(a: &[String], b: &[String]) -> String {
    a.iter()
        .filter(|item| b.contains(item))
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}

fn rationale(
    user: &DeepProfile,
    candidate: &DeepProfile,
    breakdown: &CompatibilityBreakdown,
) -> Vec<String> {
    let mut reasons = Vec::new();

    if breakdown.domains >= 60 && !user.active_domains.is_empty() {
        let shared: Vec<String> = user
            .active_domains
            .iter()
            .filter(|domain| candidate.active_domains.contains(domain))
            .map(|domain| domain.to_string())
            .collect();
        reasons.push(format!("Domínios em comum: {}", shared.join(", ")));
    }
    if breakdown.big_five >= 65 {
        reasons.push("Compatibilidade alta de perfil comportamental (Big Five)".to_string());
    }
    if breakdown.themes >= 50 {
        reasons.push(format!(
            "Temas recorrentes alinhados: {}",
            shared_items(&user.recurring_themes, &candidate.recurring_themes)
        ));
    }
    if breakdown.hobbies >= 50 {
        reasons.push(format!(
            "Hobbies compatíveis: {}",
            shared_items(&user.hobbies, &candidate.hobbies)
        ));
    }
    if breakdown.conversation >= 50 {
        reasons.push("Estilos de conversa combinam".to_string());
    }
    if breakdown.emotional_triggers >= 50 {
        reasons.push("Gatilhos emocionais parecidos".to_string());
    }

    reasons
}
