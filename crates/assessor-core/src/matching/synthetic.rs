//! Feed cards and the synthetic seed profiles shown when nobody else exists yet.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::matching::feed::FeedSuggestion;
use crate::matching::profile_builder::DeepProfile;
use crate::profile::{
    default_domain_states, upsert_domain_signals, CoreProfile, Domain, DomainSignal,
    KEYWORD_SIGNAL_WEIGHT,
};
use crate::types::UserId;

/// Offset added to the requesting user's id for synthetic ids.
const SYNTHETIC_ID_OFFSET: UserId = 100;
const MAX_CARD_TAGS: usize = 3;
const FALLBACK_TAG: &str = "perfil em descoberta";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedCard {
    pub id: UserId,
    pub name: String,
    #[serde(rename = "match")]
    pub score: u8,
    pub headline: String,
    pub tags: Vec<String>,
}

impl FeedCard {
    pub fn from_suggestion(profile: Option<&DeepProfile>, suggestion: &FeedSuggestion) -> Self {
        let name = profile
            .and_then(DeepProfile::display_name)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Conexão #{}", suggestion.user_id));

        let mut candidates: Vec<String> = suggestion.rationale.clone();
        if let Some(profile) = profile {
            candidates.extend(profile.active_domains.iter().take(2).map(|d| d.to_string()));
            candidates.extend(profile.hobbies.iter().take(2).cloned());
        }

        let mut seen = HashSet::new();
        let mut tags: Vec<String> = candidates
            .into_iter()
            .filter(|tag| !tag.is_empty() && seen.insert(tag.clone()))
            .take(MAX_CARD_TAGS)
            .collect();
        if tags.is_empty() {
            tags.push(FALLBACK_TAG.to_string());
        }

        Self {
            id: suggestion.user_id,
            name,
            score: suggestion.score,
            headline: suggestion.feed_preview.clone(),
            tags,
        }
    }
}

struct Seed {
    alias: Option<&'static str>,
    domains: [Domain; 2],
    themes: &'static [&'static str],
    hobbies: &'static [&'static str],
    interests: &'static [&'static str],
    style: &'static [&'static str],
    topics: &'static [&'static str],
}

static NAMED_SEEDS: [Seed; 3] = [
    Seed {
        alias: Some("Lia"),
        domains: [Domain::Relationships, Domain::Learning],
        themes: &["impacto social", "criatividade"],
        hobbies: &["música", "arte", "fotografia"],
        interests: &["educação", "inovação"],
        style: &["prefere tom acolhedor", "aprecia explorar possibilidades"],
        topics: &["projetos comunitários", "design"],
    },
    Seed {
        alias: Some("Rafa"),
        domains: [Domain::Career, Domain::Performance],
        themes: &["mentoria", "liderança"],
        hobbies: &["corrida", "tecnologia"],
        interests: &["engenharia", "mentoria"],
        style: &["organiza ideias em passos"],
        topics: &["carreira", "foco"],
    },
    Seed {
        alias: Some("Maya"),
        domains: [Domain::Learning, Domain::Relationships],
        themes: &["criatividade", "autenticidade"],
        hobbies: &["produção musical", "shows", "arte"],
        interests: &["comunidade", "projetos paralelos"],
        style: &["gosta de conversas dinâmicas"],
        topics: &["música", "colaborações"],
    },
];

static FILLER_SEED: Seed = Seed {
    alias: None,
    domains: [Domain::Learning, Domain::Performance],
    themes: &["crescimento", "colaboração"],
    hobbies: &["leitura", "construir projetos"],
    interests: &["produtividade", "tecnologia"],
    style: &["aprecia explorar possibilidades"],
    topics: &["trabalho em equipe"],
};

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn seed_profile(id: UserId, seed: &Seed, now: DateTime<Utc>) -> DeepProfile {
    let mut core = CoreProfile::default();
    core.identity.aliases = vec![seed
        .alias
        .map(str::to_string)
        .unwrap_or_else(|| format!("Conexão {}", id))];

    let mut domains = default_domain_states();
    let signal = DomainSignal {
        reason: "interesse registrado".to_string(),
        weight: KEYWORD_SIGNAL_WEIGHT,
        last_seen_at: now,
    };
    for domain in seed.domains {
        if let Some(state) = domains.get(&domain) {
            let updated =
                upsert_domain_signals(state, std::slice::from_ref(&signal), Some("sugestão sintética"));
            domains.insert(domain, updated);
        }
    }

    let mut profile = DeepProfile::derive(id, core, domains, &[], &[]);
    profile.active_domains = seed.domains.to_vec();
    profile.recurring_themes = owned(seed.themes);
    profile.hobbies = owned(seed.hobbies);
    profile.interests = owned(seed.interests);
    profile.conversation_style = owned(seed.style);
    profile.emotional_triggers = owned(&["entusiasmo/novidade"]);
    profile.recent_topics = owned(seed.topics);
    profile
}

/// Up to `limit` seed profiles with ids `user_id + 100 + k`, k starting at 1.
pub fn synthetic_profiles(user_id: UserId, limit: usize, now: DateTime<Utc>) -> Vec<DeepProfile> {
    let base = user_id + SYNTHETIC_ID_OFFSET;
    (0..limit)
        .map(|k| {
            let id = base + k as UserId + 1;
            let seed = NAMED_SEEDS.get(k).unwrap_or(&FILLER_SEED);
            seed_profile(id, seed, now)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_named_seeds_then_fillers() {
        let profiles = synthetic_profiles(7, 5, now());
        let names: Vec<&str> = profiles.iter().filter_map(|p| p.display_name()).collect();
        assert_eq!(names, vec!["Lia", "Rafa", "Maya", "Conexão 111", "Conexão 112"]);
        assert_eq!(profiles[0].user_id, 108);
        assert!(profiles[1].domains[&Domain::Career].active);
        assert_eq!(
            profiles[1].domains[&Domain::Career].activation_reason.as_deref(),
            Some("sugestão sintética")
        );
        assert_eq!(synthetic_profiles(7, 2, now()).len(), 2);
    }

    #[test]
    fn test_card_tags_and_fallbacks() {
        let suggestion = FeedSuggestion {
            user_id: 42,
            score: 81,
            rationale: vec!["Estilos de conversa combinam".to_string()],
            feed_preview: "Domínios: career".to_string(),
        };
        let profile = &synthetic_profiles(1, 2, now())[1];
        let card = FeedCard::from_suggestion(Some(profile), &suggestion);
        assert_eq!(card.name, "Rafa");
        assert_eq!(card.tags, vec!["Estilos de conversa combinam", "career", "performance"]);

        let bare = FeedSuggestion {
            rationale: Vec::new(),
            ..suggestion
        };
        let card = FeedCard::from_suggestion(None, &bare);
        assert_eq!(card.name, "Conexão #42");
        assert_eq!(card.tags, vec![FALLBACK_TAG]);
        assert_eq!(serde_json::to_value(&card).unwrap()["match"], 81);
    }
}
