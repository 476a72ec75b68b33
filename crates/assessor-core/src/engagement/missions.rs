//! Micro-mission planning from a domain-keyed template table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::profile::Domain;

/// Missions kept in the rolling list.
pub const MAX_MISSIONS: usize = 3;

/// Answers offered with every mission.
pub const GUIDED_CHOICES: [&str; 3] = ["Vamos lá", "Quero ajustar", "Pular por enquanto"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    #[default]
    Today,
    ThisWeek,
}

/// A small, concrete task suggested to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroMission {
    pub id: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
    pub reward: String,
    pub timeframe: Timeframe,
    pub commitment_question: String,
    pub guided_choices: Vec<String>,
    pub meaning: String,
}

/// Rolling mission list kept in the `micro_missions` module, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionState {
    pub missions: Vec<MicroMission>,
    pub last_updated: DateTime<Utc>,
}

/// Planner hints derived from the current turn.
#[derive(Debug, Clone, Default)]
pub struct MissionHints {
    pub domain: Option<Domain>,
    pub preferred_style: Option<String>,
}

struct MissionTemplate {
    description: &'static str,
    meaning: &'static str,
}

fn template_for(domain: Option<Domain>) -> MissionTemplate {
    match domain {
        Some(Domain::Health) => MissionTemplate {
            description: "Fazer 1 micro-pausa de respiração por 2 minutos",
            meaning: "Cuida do seu corpo e mente em pequenas doses.",
        },
        Some(Domain::Career) => MissionTemplate {
            description: "Anotar 1 vitória ou aprendizado do dia",
            meaning: "Refinar seu portfólio mental e alimentar o Second Brain.",
        },
        _ => MissionTemplate {
            description: "Registrar uma pequena ação que avance seu objetivo central",
            meaning: "Transformar intenção em progresso medido.",
        },
    }
}

/// Reward rotation keyed by the variety seed.
pub fn reward_for(seed: u32) -> &'static str {
    if seed % 2 == 0 {
        "emoji surpresa"
    } else {
        "elogio personalizado"
    }
}

/// Build one mission from the template table.
pub fn build_mission(hints: &MissionHints, seed: u32) -> MicroMission {
    let template = template_for(hints.domain);
    let style = hints.preferred_style.as_deref().unwrap_or("curto");

    MicroMission {
        id: Uuid::new_v4().to_string(),
        description: template.description.to_string(),
        domain: hints.domain,
        reward: reward_for(seed).to_string(),
        timeframe: Timeframe::Today,
        commitment_question: format!(
            "Quer assumir isso hoje? Posso te lembrar depois em formato {}.",
            style
        ),
        guided_choices: GUIDED_CHOICES.iter().map(|c| c.to_string()).collect(),
        meaning: template.meaning.to_string(),
    }
}

/// Prepend a new mission to the rolling list when one is due.
///
/// Returns `None` when nothing is due; otherwise the new state to persist,
/// holding at most [`MAX_MISSIONS`] missions with the oldest dropped.
pub fn plan_micro_missions(
    existing: Option<&MissionState>,
    due: bool,
    seed: u32,
    hints: &MissionHints,
    now: DateTime<Utc>,
) -> Option<MissionState> {
    if !due {
        return None;
    }

    let mut missions = Vec::with_capacity(MAX_MISSIONS);
    missions.push(build_mission(hints, seed));
    if let Some(state) = existing {
        missions.extend(state.missions.iter().take(MAX_MISSIONS - 1).cloned());
    }

    Some(MissionState {
        missions,
        last_updated: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hints(domain: Option<Domain>) -> MissionHints {
        MissionHints {
            domain,
            preferred_style: None,
        }
    }

    #[test]
    fn test_not_due_plans_nothing() {
        assert!(plan_micro_missions(None, false, 0, &hints(None), Utc::now()).is_none());
    }

    #[test]
    fn test_templates_by_domain() {
        let health = build_mission(&hints(Some(Domain::Health)), 2);
        assert_eq!(health.description, "Fazer 1 micro-pausa de respiração por 2 minutos");
        assert_eq!(health.reward, "emoji surpresa");

        let career = build_mission(&hints(Some(Domain::Career)), 3);
        assert_eq!(career.description, "Anotar 1 vitória ou aprendizado do dia");
        assert_eq!(career.reward, "elogio personalizado");

        let other = build_mission(&hints(Some(Domain::Finance)), 3);
        assert_eq!(
            other.description,
            "Registrar uma pequena ação que avance seu objetivo central"
        );
        assert_eq!(
            other.commitment_question,
            "Quer assumir isso hoje? Posso te lembrar depois em formato curto."
        );
        assert_eq!(other.guided_choices.len(), 3);
    }

    #[test]
    fn test_rolling_list_keeps_three_newest() {
        let now = Utc::now();
        let mut state: Option<MissionState> = None;
        let mut ids = Vec::new();
        for seed in 0..5 {
            let next = plan_micro_missions(state.as_ref(), true, seed, &hints(None), now).unwrap();
            ids.push(next.missions[0].id.clone());
            state = Some(next);
        }
        let missions = state.unwrap().missions;
        assert_eq!(missions.len(), MAX_MISSIONS);
        let kept: Vec<String> = missions.into_iter().map(|m| m.id).collect();
        assert_eq!(kept, vec![ids[4].clone(), ids[3].clone(), ids[2].clone()]);
    }

    #[test]
    fn test_preferred_style_in_commitment_question() {
        let mission = build_mission(
            &MissionHints {
                domain: None,
                preferred_style: Some("balas".to_string()),
            },
            0,
        );
        assert!(mission.commitment_question.ends_with("formato balas."));
    }
}
