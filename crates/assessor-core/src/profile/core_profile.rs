//! Core identity and personality profile.
//!
//! A [`CoreProfile`] is only ever changed through [`merge_core_profile`]:
//! sets are unioned in insertion order, scalars are last-writer-wins, and
//! Big Five scores are clamped into `[0, 100]`. Merging the same update twice
//! yields the same profile as merging it once.

use serde::{Deserialize, Serialize};

/// Neutral score for every Big Five dimension.
pub const NEUTRAL_TRAIT_SCORE: u8 = 50;

/// Big Five personality scores, each an integer in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BigFive {
    pub openness: u8,
    pub conscientiousness: u8,
    pub extraversion: u8,
    pub agreeableness: u8,
    pub neuroticism: u8,
}

impl Default for BigFive {
    fn default() -> Self {
        Self {
            openness: NEUTRAL_TRAIT_SCORE,
            conscientiousness: NEUTRAL_TRAIT_SCORE,
            extraversion: NEUTRAL_TRAIT_SCORE,
            agreeableness: NEUTRAL_TRAIT_SCORE,
            neuroticism: NEUTRAL_TRAIT_SCORE,
        }
    }
}

impl BigFive {
    /// Scores in a fixed dimension order.
    pub fn as_array(&self) -> [u8; 5] {
        [
            self.openness,
            self.conscientiousness,
            self.extraversion,
            self.agreeableness,
            self.neuroticism,
        ]
    }
}

/// Unvalidated Big Five scores as they arrive from callers or enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawBigFive {
    pub openness: f64,
    pub conscientiousness: f64,
    pub extraversion: f64,
    pub agreeableness: f64,
    pub neuroticism: f64,
}

impl Default for RawBigFive {
    fn default() -> Self {
        let neutral = f64::from(NEUTRAL_TRAIT_SCORE);
        Self {
            openness: neutral,
            conscientiousness: neutral,
            extraversion: neutral,
            agreeableness: neutral,
            neuroticism: neutral,
        }
    }
}

impl From<BigFive> for RawBigFive {
    fn from(scores: BigFive) -> Self {
        Self {
            openness: f64::from(scores.openness),
            conscientiousness: f64::from(scores.conscientiousness),
            extraversion: f64::from(scores.extraversion),
            agreeableness: f64::from(scores.agreeableness),
            neuroticism: f64::from(scores.neuroticism),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Identity {
    pub statements: Vec<String>,
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifeContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub roles: Vec<String>,
    pub goals: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Behavior {
    pub habits: Vec<String>,
    pub preferences: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Metacognition {
    pub self_reflection: Vec<String>,
    pub blindspots: Vec<String>,
}

/// One user's durable identity and personality state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoreProfile {
    pub identity: Identity,
    pub life_context: LifeContext,
    pub big_five: BigFive,
    pub behavior: Behavior,
    pub metacognition: Metacognition,
}

/// A partial update folded into a [`CoreProfile`].
///
/// Empty collections contribute nothing; `big_five`, when present, replaces
/// the stored scores after clamping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoreProfileUpdate {
    pub identity: Identity,
    pub life_context: LifeContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub big_five: Option<RawBigFive>,
    pub behavior: Behavior,
    pub metacognition: Metacognition,
}

impl CoreProfileUpdate {
    /// Whether merging this update would leave any profile unchanged.
    pub fn is_empty(&self) -> bool {
        self.identity == Identity::default()
            && self.life_context == LifeContext::default()
            && self.big_five.is_none()
            && self.behavior == Behavior::default()
            && self.metacognition == Metacognition::default()
    }

    /// Combine two updates. Sets are unioned and `other` wins on scalars.
    pub fn combine(mut self, other: CoreProfileUpdate) -> Self {
        self.identity.statements = union_ordered(&self.identity.statements, &other.identity.statements);
        self.identity.aliases = union_ordered(&self.identity.aliases, &other.identity.aliases);
        self.life_context.location = other.life_context.location.or(self.life_context.location);
        self.life_context.roles = union_ordered(&self.life_context.roles, &other.life_context.roles);
        self.life_context.goals = union_ordered(&self.life_context.goals, &other.life_context.goals);
        self.big_five = other.big_five.or(self.big_five);
        self.behavior.habits = union_ordered(&self.behavior.habits, &other.behavior.habits);
        self.behavior.preferences =
            union_ordered(&self.behavior.preferences, &other.behavior.preferences);
        self.metacognition.self_reflection = union_ordered(
            &self.metacognition.self_reflection,
            &other.metacognition.self_reflection,
        );
        self.metacognition.blindspots =
            union_ordered(&self.metacognition.blindspots, &other.metacognition.blindspots);
        self
    }
}

/// Merge an update into a profile without ever dropping stored evidence.
pub fn merge_core_profile(base: &CoreProfile, update: &CoreProfileUpdate) -> CoreProfile {
    CoreProfile {
        identity: Identity {
            statements: union_ordered(&base.identity.statements, &update.identity.statements),
            aliases: union_ordered(&base.identity.aliases, &update.identity.aliases),
        },
        life_context: LifeContext {
            location: update
                .life_context
                .location
                .clone()
                .filter(|l| !l.is_empty())
                .or_else(|| base.life_context.location.clone()),
            roles: union_ordered(&base.life_context.roles, &update.life_context.roles),
            goals: union_ordered(&base.life_context.goals, &update.life_context.goals),
        },
        big_five: update
            .big_five
            .map(|raw| normalize_big_five(&raw))
            .unwrap_or_else(|| normalize_big_five(&base.big_five.into())),
        behavior: Behavior {
            habits: union_ordered(&base.behavior.habits, &update.behavior.habits),
            preferences: union_ordered(&base.behavior.preferences, &update.behavior.preferences),
        },
        metacognition: Metacognition {
            self_reflection: union_ordered(
                &base.metacognition.self_reflection,
                &update.metacognition.self_reflection,
            ),
            blindspots: union_ordered(
                &base.metacognition.blindspots,
                &update.metacognition.blindspots,
            ),
        },
    }
}

/// Round and clamp every dimension into `[0, 100]`.
pub fn normalize_big_five(scores: &RawBigFive) -> BigFive {
    BigFive {
        openness: clamp_score(scores.openness),
        conscientiousness: clamp_score(scores.conscientiousness),
        extraversion: clamp_score(scores.extraversion),
        agreeableness: clamp_score(scores.agreeableness),
        neuroticism: clamp_score(scores.neuroticism),
    }
}

/// Round and clamp a score. Non-numeric input falls back to neutral.
pub fn clamp_score(value: f64) -> u8 {
    if value.is_nan() {
        return NEUTRAL_TRAIT_SCORE;
    }
    value.round().clamp(0.0, 100.0) as u8
}

/// Union of two string sequences preserving first-seen order, dropping empties.
pub fn union_ordered(base: &[String], extra: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(base.len() + extra.len());
    for value in base.iter().chain(extra.iter()) {
        if !value.is_empty() && !out.contains(value) {
            out.push(value.clone());
        }
    }
    out
}
