//! Deep profiles: the derived view of a user that compatibility scoring reads.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::profile::{active_domains, CoreProfile, Domain, DomainStates};
use crate::store::SafeStore;
use crate::types::{InsightCategory, PatternInsight, StoredMessage, UserId};

/// Recent messages considered per profile.
pub const PROFILE_MESSAGE_WINDOW: usize = 50;
/// Trait score at which a conversational style flag fires.
const STYLE_THRESHOLD: u8 = 60;
/// Punctuation marks needed before "ênfases" counts as a style.
const EMPHASIS_MARKS: usize = 10;
const RECENT_TOPIC_LIMIT: usize = 10;

static HOBBY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)jogar|música|esporte|ler|cozinhar|arte|hobby").expect("hobby pattern is valid")
});
static STRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)ansiedade|stress|preocupação|cansado|exausto").expect("stress pattern is valid")
});
static EXCITEMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)empolgado|animado|feliz|grato").expect("excitement pattern is valid")
});
static TOPIC_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,.;\n]").expect("topic split pattern is valid"));

pub const STRESS_TRIGGER: &str = "stress/contexto";
pub const EXCITEMENT_TRIGGER: &str = "entusiasmo/novidade";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepProfile {
    pub user_id: UserId,
    pub core: CoreProfile,
    pub domains: DomainStates,
    pub active_domains: Vec<Domain>,
    pub recurring_themes: Vec<String>,
    pub hobbies: Vec<String>,
    pub interests: Vec<String>,
    pub conversation_style: Vec<String>,
    pub emotional_triggers: Vec<String>,
    pub recent_topics: Vec<String>,
}

impl DeepProfile {
    /// Derive every facet from raw profile pieces.
    pub fn derive(
        user_id: UserId,
        core: CoreProfile,
        domains: DomainStates,
        messages: &[StoredMessage],
        insights: &[PatternInsight],
    ) -> Self {
        let active = active_domains(&domains);

        Self {
            user_id,
            recurring_themes: recurring_themes(&core, insights, &active),
            hobbies: hobbies(&core, insights),
            interests: interests(&core, insights, &active),
            conversation_style: conversation_style(&core, messages),
            emotional_triggers: emotional_triggers(insights, messages),
            recent_topics: recent_topics(messages, insights),
            active_domains: active,
            core,
            domains,
        }
    }

    /// Display name: first alias, else first identity statement.
    pub fn display_name(&self) -> Option<&str> {
        self.core
            .identity
            .aliases
            .first()
            .or_else(|| self.core.identity.statements.first())
            .map(String::as_str)
    }
}

/// Builds deep profiles from the store.
#[derive(Debug, Clone)]
pub struct ProfileBuilder {
    store: SafeStore,
}

impl ProfileBuilder {
    pub fn new(store: SafeStore) -> Self {
        Self { store }
    }

    pub fn build(&self, user_id: UserId) -> DeepProfile {
        let core = self.store.get_core(user_id);
        let domains = self.store.get_domains(user_id);
        let messages = self.store.list_recent_messages(user_id, PROFILE_MESSAGE_WINDOW);
        let insights = self.store.list_insights(user_id);
        DeepProfile::derive(user_id, core, domains, &messages, &insights)
    }
}

fn unique(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|value| !value.is_empty() && seen.insert(value.clone()))
        .collect()
}

fn labels<'a>(
    insights: &'a [PatternInsight],
    categories: &'a [InsightCategory],
) -> impl Iterator<Item = &'a str> + 'a {
    insights
        .iter()
        .filter(move |insight| categories.contains(&insight.category))
        .map(|insight| insight.label.as_str())
}

fn recurring_themes(core: &CoreProfile, insights: &[PatternInsight], active: &[Domain]) -> Vec<String> {
    unique(
        labels(insights, &[InsightCategory::Theme])
            .map(str::to_string)
            .chain(active.iter().map(|domain| format!("domínio:{}", domain)))
            .chain(core.behavior.habits.iter().cloned())
            .chain(core.behavior.preferences.iter().cloned()),
    )
}

fn hobbies(core: &CoreProfile, insights: &[PatternInsight]) -> Vec<String> {
    unique(
        labels(insights, &[InsightCategory::Habit, InsightCategory::Preference])
            .map(str::to_string)
            .chain(
                core.behavior
                    .preferences
                    .iter()
                    .filter(|pref| HOBBY_RE.is_match(pref))
                    .map(|pref| pref.to_lowercase()),
            ),
    )
}

fn interests(core: &CoreProfile, insights: &[PatternInsight], active: &[Domain]) -> Vec<String> {
    unique(
        labels(insights, &[InsightCategory::Domain, InsightCategory::Preference])
            .map(str::to_lowercase)
            .chain(core.identity.statements.iter().map(|s| s.to_lowercase()))
            .chain(core.life_context.goals.iter().map(|g| g.to_lowercase()))
            .chain(active.iter().map(|domain| domain.to_string())),
    )
}

fn conversation_style(core: &CoreProfile, messages: &[StoredMessage]) -> Vec<String> {
    let traits = &core.big_five;
    let flags = [
        (traits.extraversion, "gosta de conversas dinâmicas"),
        (traits.agreeableness, "prefere tom acolhedor"),
        (traits.conscientiousness, "organiza ideias em passos"),
        (traits.openness, "aprecia explorar possibilidades"),
        (traits.neuroticism, "valoriza segurança e previsibilidade"),
    ];

    let marks: usize = messages
        .iter()
        .map(|message| {
            message
                .content
                .chars()
                .filter(|c| matches!(c, '!' | '?' | '.'))
                .count()
        })
        .sum();

    unique(
        flags
            .into_iter()
            .filter(|(score, _)| *score >= STYLE_THRESHOLD)
            .map(|(_, label)| label.to_string())
            .chain((marks > EMPHASIS_MARKS).then(|| "engaja com pontuações e ênfases".to_string())),
    )
}

fn emotional_triggers(insights: &[PatternInsight], messages: &[StoredMessage]) -> Vec<String> {
    let stressed = messages.iter().any(|m| STRESS_RE.is_match(&m.content));
    let excited = messages.iter().any(|m| EXCITEMENT_RE.is_match(&m.content));

    unique(
        labels(insights, &[InsightCategory::Emotion])
            .map(str::to_lowercase)
            .chain(stressed.then(|| STRESS_TRIGGER.to_string()))
            .chain(excited.then(|| EXCITEMENT_TRIGGER.to_string())),
    )
}

fn recent_topics(messages: &[StoredMessage], insights: &[PatternInsight]) -> Vec<String> {
    let fragments: Vec<String> = messages
        .iter()
        .flat_map(|message| TOPIC_SPLIT_RE.split(&message.content))
        .map(str::trim)
        .filter(|part| part.chars().count() > 4)
        .map(str::to_string)
        .collect();
    let skip = fragments.len().saturating_sub(RECENT_TOPIC_LIMIT);

    unique(
        fragments.into_iter().skip(skip).chain(
            labels(insights, &[InsightCategory::Domain, InsightCategory::Theme])
                .map(str::to_lowercase),
        ),
    )
}
