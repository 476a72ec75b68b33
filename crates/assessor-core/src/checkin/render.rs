//! Rendering check-in jobs into user-facing messages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::checkin::queue::JobKind;
use crate::profile::{find_module, CoreProfile, DomainStates, MicroModule, MISSIONS_MODULE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Chat,
    Notification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInMessage {
    pub title: String,
    pub body: String,
    pub kind: JobKind,
    pub channel: Channel,
    /// Context fields that went into the body.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub metadata: BTreeMap<String, String>,
}

/// Live profile facts a check-in can mention. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckInContext {
    pub alias: Option<String>,
    pub top_goal: Option<String>,
    pub top_habit: Option<String>,
    pub top_domain: Option<String>,
    pub last_mission: Option<String>,
    pub last_signal: Option<String>,
}

impl CheckInContext {
    /// Gather context from the stored profile pieces.
    pub fn gather(core: &CoreProfile, domains: &DomainStates, modules: &[MicroModule]) -> Self {
        let top_domain = domains
            .values()
            .filter(|state| state.active)
            .filter_map(|state| state.strongest_signal().map(|s| (state.name, s.weight)))
            .fold(None, |best: Option<(_, f64)>, (name, weight)| match best {
                Some((_, top)) if top >= weight => best,
                _ => Some((name, weight)),
            })
            .map(|(name, _)| name.to_string());

        let last_signal = domains
            .values()
            .filter_map(|state| state.latest_signal())
            .max_by_key(|signal| signal.last_seen_at)
            .map(|signal| signal.reason.clone());

        let last_mission = find_module(modules, MISSIONS_MODULE)
            .and_then(|module| module.state.as_missions())
            .and_then(|state| state.missions.first())
            .map(|mission| mission.description.clone());

        Self {
            alias: core.identity.aliases.first().cloned(),
            top_goal: core.life_context.goals.first().cloned(),
            top_habit: core.behavior.habits.first().cloned(),
            top_domain,
            last_mission,
            last_signal,
        }
    }

    fn metadata(&self) -> BTreeMap<String, String> {
        [
            ("alias", &self.alias),
            ("topGoal", &self.top_goal),
            ("topHabit", &self.top_habit),
            ("topDomain", &self.top_domain),
            ("lastMission", &self.last_mission),
            ("lastSignal", &self.last_signal),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| (key.to_string(), v.clone())))
        .collect()
    }
}

pub fn render_check_in(kind: JobKind, context: &CheckInContext) -> CheckInMessage {
    let (title, channel, body) = match kind {
        JobKind::Daily => ("Check-in diário", Channel::Chat, daily_body(context)),
        JobKind::MotivationalMission => (
            "Missão do dia",
            Channel::Notification,
            mission_body(context),
        ),
        JobKind::WeeklyReview => ("Revisão semanal", Channel::Chat, weekly_body(context)),
        JobKind::ReturnPing => (
            "Sentimos sua falta",
            Channel::Notification,
            return_body(context),
        ),
    };

    CheckInMessage {
        title: title.to_string(),
        body,
        kind,
        channel,
        metadata: context.metadata(),
    }
}

fn daily_body(context: &CheckInContext) -> String {
    let greeting = match &context.alias {
        Some(alias) => format!("Bom dia, {}!", alias),
        None => "Bom dia!".to_string(),
    };
    let focus = match &context.top_goal {
        Some(goal) => format!("Como está o avanço em \"{}\" hoje?", goal),
        None => "Qual é a intenção principal para hoje?".to_string(),
    };
    let mut body = format!("{} {}", greeting, focus);
    if let Some(habit) = &context.top_habit {
        body.push_str(&format!(" Lembrete do seu hábito: {}.", habit));
    }
    body
}

fn mission_body(context: &CheckInContext) -> String {
    match (&context.last_mission, &context.top_domain) {
        (Some(mission), _) => format!("Missão sugerida: {}. Topa fazer agora?", mission),
        (None, Some(domain)) => {
            format!("Que tal um passo de 3 minutos em {} hoje?", domain)
        }
        (None, None) => "Escolha uma ação de 3 minutos que mova seu objetivo hoje.".to_string(),
    }
}

fn weekly_body(context: &CheckInContext) -> String {
    let mut body = match &context.top_domain {
        Some(domain) => format!(
            "Vamos fechar a semana: o que avançou em {}? Qual o próximo passo?",
            domain
        ),
        None => "Vamos fechar a semana com 1 insight e 1 próximo passo?".to_string(),
    };
    if let Some(signal) = &context.last_signal {
        body.push_str(&format!(" Último sinal que registrei: {}.", signal));
    }
    body
}

fn return_body(context: &CheckInContext) -> String {
    let opening = match &context.alias {
        Some(alias) => format!("{}, sentimos sua falta!", alias),
        None => "Sentimos sua falta!".to_string(),
    };
    let resume = match &context.last_mission {
        Some(mission) => format!("Quer retomar a missão: {}?", mission),
        None => "Quer retomar de onde parou?".to_string(),
    };
    format!("{} {}", opening, resume)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{default_domain_states, upsert_domain_signals, Domain, DomainSignal};
    use chrono::{TimeZone, Utc};

    fn rich_context() -> CheckInContext {
        CheckInContext {
            alias: Some("Bia".to_string()),
            top_goal: Some("correr 10k".to_string()),
            top_habit: Some("Hábito detectado: sempre".to_string()),
            top_domain: Some("health".to_string()),
            last_mission: Some("Fazer 1 micro-pausa".to_string()),
            last_signal: Some("keyword: sono".to_string()),
        }
    }

    #[test]
    fn test_titles_and_channels() {
        let context = CheckInContext::default();
        let daily = render_check_in(JobKind::Daily, &context);
        assert_eq!(daily.title, "Check-in diário");
        assert_eq!(daily.channel, Channel::Chat);

        let mission = render_check_in(JobKind::MotivationalMission, &context);
        assert_eq!(mission.title, "Missão do dia");
        assert_eq!(mission.channel, Channel::Notification);

        assert_eq!(render_check_in(JobKind::WeeklyReview, &context).title, "Revisão semanal");
        assert_eq!(render_check_in(JobKind::ReturnPing, &context).title, "Sentimos sua falta");
    }

    #[test]
    fn test_generic_bodies_without_context() {
        let context = CheckInContext::default();
        assert_eq!(
            render_check_in(JobKind::Daily, &context).body,
            "Bom dia! Qual é a intenção principal para hoje?"
        );
        assert_eq!(
            render_check_in(JobKind::ReturnPing, &context).body,
            "Sentimos sua falta! Quer retomar de onde parou?"
        );
        assert!(render_check_in(JobKind::WeeklyReview, &context).metadata.is_empty());
    }

    #[test]
    fn test_bodies_use_context() {
        let context = rich_context();
        let daily = render_check_in(JobKind::Daily, &context);
        assert_eq!(
            daily.body,
            "Bom dia, Bia! Como está o avanço em \"correr 10k\" hoje? Lembrete do seu hábito: Hábito detectado: sempre."
        );
        assert_eq!(daily.metadata.get("alias").map(String::as_str), Some("Bia"));
        assert_eq!(daily.metadata.len(), 6);

        let weekly = render_check_in(JobKind::WeeklyReview, &context);
        assert!(weekly.body.contains("em health?"));
        assert!(weekly.body.ends_with("Último sinal que registrei: keyword: sono."));
    }

    #[test]
    fn test_gather_picks_strongest_active_domain() {
        let mut domains = default_domain_states();
        let seen = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        let strong = DomainSignal {
            reason: "keyword: carreira".to_string(),
            weight: 0.9,
            last_seen_at: seen,
        };
        let weak = DomainSignal {
            reason: "keyword: sono".to_string(),
            weight: 0.6,
            last_seen_at: seen + chrono::Duration::hours(1),
        };
        let career = upsert_domain_signals(&domains[&Domain::Career], &[strong], None);
        let health = upsert_domain_signals(&domains[&Domain::Health], &[weak], None);
        domains.insert(Domain::Career, career);
        domains.insert(Domain::Health, health);

        let context = CheckInContext::gather(&CoreProfile::default(), &domains, &[]);
        assert_eq!(context.top_domain.as_deref(), Some("career"));
        assert_eq!(context.last_signal.as_deref(), Some("keyword: sono"));
        assert!(context.alias.is_none());
        assert!(context.last_mission.is_none());
    }
}
