//! Engagement engine: sequences the planners for one incoming message.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::clock::Clock;
use crate::config::DEFAULT_RECENT_MESSAGES;
use crate::engagement::checkins::{plan_check_ins, CheckInPlan};
use crate::engagement::insights::{generate_micro_insights, InsightOptions};
use crate::engagement::missions::{plan_micro_missions, MicroMission, MissionHints, MissionState};
use crate::engagement::notifications::{build_notifications, NotificationPlan};
use crate::engagement::triggers::{evaluate_triggers, EngagementMemory, Pacing, TriggerEvaluation};
use crate::engagement::zeigarnik::{build_zeigarnik_hooks, ZeigarnikHook};
use crate::profile::{
    find_module, Behavior, CoreProfileUpdate, Domain, Identity, MicroModule,
    MicroModuleActivation, ModuleState, ENGAGEMENT_MEMORY_MODULE, MISSIONS_MODULE,
    ZEIGARNIK_MODULE,
};
use crate::signals;
use crate::store::SafeStore;
use crate::types::{
    InsightCategory, InsightIndex, Message, MessageRole, PatternInsight, UserId,
};

/// Voice of the assistant, shown in context logs.
pub const STYLE_VOICE: &str = "assessor ativo, direto e caloroso";
/// Closing line of every reply.
pub const STYLE_SIGNATURE: &str = "Estou acompanhando você em tempo real.";

/// Messages longer than this read as "Alongado".
const LONG_MESSAGE_CHARS: usize = 140;

/// The fixed conversational frame of a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rhythm {
    pub question: String,
    pub observation: String,
    pub insight: String,
    pub deep_question: String,
    pub style_note: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VarietyMix {
    pub focus: f64,
    pub exploration: f64,
}

impl Default for VarietyMix {
    fn default() -> Self {
        Self {
            focus: 0.8,
            exploration: 0.2,
        }
    }
}

/// Everything one turn produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementResult {
    pub reply: Message,
    pub rhythm: Rhythm,
    pub insights: Vec<PatternInsight>,
    pub micro_missions: Vec<MicroMission>,
    pub check_ins: Vec<CheckInPlan>,
    pub zeigarnik_hooks: Vec<ZeigarnikHook>,
    pub notifications: Vec<NotificationPlan>,
    pub conversational_style: Vec<String>,
    pub guided_questions: Vec<String>,
    pub fragments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_mechanic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_story: Option<String>,
    pub pacing: Pacing,
    pub variety_mix: VarietyMix,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub micro_insight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub micro_mission: Option<String>,
}

pub struct EngagementEngine {
    store: SafeStore,
    clock: Arc<dyn Clock>,
    recent_limit: usize,
}

impl EngagementEngine {
    pub fn new(store: SafeStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            recent_limit: DEFAULT_RECENT_MESSAGES,
        }
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit.max(1);
        self
    }

    /// Evaluate triggers for a user without logging anything.
    pub fn evaluate(&self, user_id: UserId) -> TriggerEvaluation {
        let recent = self.store.list_recent_messages(user_id, self.recent_limit);
        let modules = self.store.get_micro_modules(user_id);
        evaluate_triggers(&recent, &engagement_memory(&modules), self.clock.now())
    }

    /// Run one turn for an incoming user message.
    pub fn process_message(
        &self,
        user_id: UserId,
        message: &str,
        history: &[Message],
    ) -> EngagementResult {
        let now = self.clock.now();
        self.store.ensure_core(user_id);
        self.store.log_message(user_id, MessageRole::User, message, now);

        let recent = self.store.list_recent_messages(user_id, self.recent_limit);
        let modules = self.store.get_micro_modules(user_id);
        let memory = engagement_memory(&modules);
        let triggers = evaluate_triggers(&recent, &memory, now);

        let mut index = InsightIndex::from_insights(&self.store.list_insights(user_id));
        let plan = generate_micro_insights(
            message,
            &recent,
            &mut index,
            InsightOptions {
                due: triggers.micro_insight_due,
                variety_seed: triggers.variety_seed,
            },
        );
        self.store.add_insights(user_id, &plan.insights, now);

        let primary_domain = detect_primary_domain(&plan.insights);
        let existing_missions = find_module(&modules, MISSIONS_MODULE)
            .and_then(|module| module.state.as_missions());
        let hints = MissionHints {
            domain: primary_domain,
            preferred_style: Some(
                if triggers.pacing == Pacing::Fast { "balas" } else { "parágrafos curtos" }.to_string(),
            ),
        };
        let mission_state = plan_micro_missions(
            existing_missions,
            triggers.micro_mission_due,
            triggers.variety_seed,
            &hints,
            now,
        );
        let micro_missions = match &mission_state {
            Some(state) => {
                let stored = ModuleState::Missions(state.clone());
                self.save_module(user_id, MISSIONS_MODULE, 2, &["mission", "commitment"], stored);
                state.missions.clone()
            }
            None => Vec::new(),
        };

        let check_ins = plan_check_ins(triggers.check_in_slot, triggers.variety_seed);

        let current_missions: Option<&MissionState> = mission_state.as_ref().or(existing_missions);
        let zeigarnik_hooks =
            match build_zeigarnik_hooks(current_missions, &recent, triggers.zeigarnik_hook, now) {
                Some((hooks, marker)) => {
                    let stored = ModuleState::Zeigarnik(marker);
                    self.save_module(user_id, ZEIGARNIK_MODULE, 1, &["resume", "loop"], stored);
                    hooks
                }
                None => Vec::new(),
            };

        let notifications = build_notifications(&check_ins, &micro_missions, &zeigarnik_hooks);

        if let Some(update) = core_updates(&plan.insights, message) {
            self.store.update_core(user_id, &update);
        }

        let next_memory = next_engagement_memory(
            &memory,
            now,
            !plan.insights.is_empty(),
            !micro_missions.is_empty(),
            !check_ins.is_empty(),
            triggers.pacing,
        );
        self.save_module(
            user_id,
            ENGAGEMENT_MEMORY_MODULE,
            1,
            &["message_count", "checkins", "pacing"],
            ModuleState::EngagementMemory(next_memory),
        );

        let rhythm = build_rhythm(message, history);
        let micro_insight = plan.insights.first().map(|i| i.label.clone());
        let micro_mission = micro_missions.first().map(|m| m.description.clone());
        let reply = Message::assistant(format_reply(&ReplyParts {
            rhythm: &rhythm,
            micro_insight: micro_insight.as_deref(),
            micro_mission: micro_mission.as_deref(),
            zeigarnik: zeigarnik_hooks.first().map(|h| h.reminder.as_str()),
            check_in: check_ins.first().map(|c| c.prompt.as_str()),
        }));

        debug!(
            user_id,
            insights = plan.insights.len(),
            missions = micro_missions.len(),
            check_ins = check_ins.len(),
            hooks = zeigarnik_hooks.len(),
            pacing = ?triggers.pacing,
            "Processed engagement turn"
        );

        EngagementResult {
            reply,
            rhythm,
            conversational_style: build_style(triggers.pacing, &plan.mirrored_patterns),
            guided_questions: build_guided_questions(&micro_missions, primary_domain),
            fragments: plan.content_fragments,
            resume_mechanic: zeigarnik_hooks.first().map(|h| h.reminder.clone()),
            matching_hint: primary_domain
                .map(|d| format!("Match com peers interessados em {}", d)),
            weekly_story: build_weekly_story(plan.weekly_insight.as_deref(), primary_domain),
            pacing: triggers.pacing,
            variety_mix: VarietyMix::default(),
            insights: plan.insights,
            micro_missions,
            check_ins,
            zeigarnik_hooks,
            notifications,
            micro_insight,
            micro_mission,
        }
    }

    /// Engine-owned modules all live under the performance domain.
    fn save_module(&self, user_id: UserId, name: &str, depth: u32, triggers: &[&str], state: ModuleState) {
        let activation = MicroModuleActivation::new(name, Some(Domain::Performance), depth, triggers);
        self.store.upsert_micro_module(user_id, &activation, true, &state);
    }
}

/// Stored engagement memory, or an empty one.
pub fn engagement_memory(modules: &[MicroModule]) -> EngagementMemory {
    find_module(modules, ENGAGEMENT_MEMORY_MODULE)
        .and_then(|module| module.state.as_engagement_memory())
        .cloned()
        .unwrap_or_default()
}

/// Memory after a turn. Timestamps not refreshed this turn are carried over.
pub fn next_engagement_memory(
    previous: &EngagementMemory,
    now: DateTime<Utc>,
    insight_surfaced: bool,
    mission_surfaced: bool,
    check_in_surfaced: bool,
    pacing: Pacing,
) -> EngagementMemory {
    let refresh = |surfaced: bool, prior: Option<DateTime<Utc>>| surfaced.then_some(now).or(prior);
    EngagementMemory {
        last_insight_at: refresh(insight_surfaced, previous.last_insight_at),
        last_mission_at: refresh(mission_surfaced, previous.last_mission_at),
        last_check_in_at: refresh(check_in_surfaced, previous.last_check_in_at),
        last_pace: Some(pacing),
    }
}

/// Domain named by the first domain insight, if its label carries a hint.
pub fn detect_primary_domain(insights: &[PatternInsight]) -> Option<Domain> {
    let label = &insights
        .iter()
        .find(|i| i.category == InsightCategory::Domain)?
        .label;
    [
        ("saúde", Domain::Health),
        ("carreira", Domain::Career),
        ("relacionamento", Domain::Relationships),
        ("estudo", Domain::Learning),
        ("finan", Domain::Finance),
    ]
    .into_iter()
    .find(|(hint, _)| label.contains(hint))
    .map(|(_, domain)| domain)
}

/// Habit/preference insight labels and "me chama de" aliases.
fn core_updates(insights: &[PatternInsight], message: &str) -> Option<CoreProfileUpdate> {
    let behavior: Vec<String> = insights
        .iter()
        .filter(|i| matches!(i.category, InsightCategory::Habit | InsightCategory::Preference))
        .map(|i| i.label.clone())
        .collect();
    let aliases = signals::extract_aliases(message);
    if behavior.is_empty() && aliases.is_empty() {
        return None;
    }

    Some(CoreProfileUpdate {
        identity: Identity {
            statements: Vec::new(),
            aliases,
        },
        behavior: Behavior {
            habits: behavior.clone(),
            preferences: behavior,
        },
        ..CoreProfileUpdate::default()
    })
}

pub fn build_rhythm(message: &str, history: &[Message]) -> Rhythm {
    let cue = if message.chars().count() > LONG_MESSAGE_CHARS {
        "Alongado"
    } else {
        "Enxuto"
    };
    let observation = history
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::Assistant)
        .map(|m| format!("Notei que você reagiu bem quando falei sobre: {}", m.content))
        .unwrap_or_else(|| "Estou entrando em ritmo com você em tempo real.".to_string());

    Rhythm {
        question: format!("O que você realmente quer destravar agora? ({})", cue),
        observation,
        insight: "Padrão: você busca clareza rápida e pequenas vitórias.".to_string(),
        deep_question: "Se der certo, como você saberá em 48h?".to_string(),
        style_note: STYLE_SIGNATURE.to_string(),
    }
}

struct ReplyParts<'a> {
    rhythm: &'a Rhythm,
    micro_insight: Option<&'a str>,
    micro_mission: Option<&'a str>,
    zeigarnik: Option<&'a str>,
    check_in: Option<&'a str>,
}

fn format_reply(parts: &ReplyParts<'_>) -> String {
    [
        format!("❓ Pergunta rápida: {}", parts.rhythm.question),
        format!("👀 Observação: {}", parts.rhythm.observation),
        format!("💡 Insight: {}", parts.rhythm.insight),
        format!("🔎 Pergunta profunda: {}", parts.rhythm.deep_question),
        format!(
            "🧠 Micro-insight: {}",
            parts.micro_insight.unwrap_or("Vou registrar o que você disse.")
        ),
        format!(
            "🎯 Micro-missão: {}",
            parts.micro_mission.unwrap_or("Posso sugerir um passo de 3 minutos.")
        ),
        format!(
            "🔁 Zeigarnik: {}",
            parts
                .zeigarnik
                .unwrap_or("Me avisa se quiser que eu guarde algo em aberto.")
        ),
        format!(
            "📅 Check-in: {}",
            parts.check_in.unwrap_or("Quer que eu te lembre disso depois?")
        ),
        format!("✨ {}", parts.rhythm.style_note),
    ]
    .join("\n")
}

fn build_style(pacing: Pacing, mirrored: &[String]) -> Vec<String> {
    let base = match pacing {
        Pacing::Fast => "Respostas curtas, objetivas.",
        Pacing::Slow => "Tom calmo e reflexivo.",
        Pacing::Balanced => "Tom equilibrado.",
    };
    [
        base,
        "Manter coerência com preferências já registradas.",
        "Variar 20% com curiosidade e 80% com foco no objetivo.",
    ]
    .iter()
    .map(|s| s.to_string())
    .chain(mirrored.iter().cloned())
    .collect()
}

fn build_guided_questions(missions: &[MicroMission], domain: Option<Domain>) -> Vec<String> {
    let closing = match domain {
        Some(d) => format!("Quer explorar opções rápidas ou aprofundar em {}?", d),
        None => "Prefere que eu ofereça 3 opções ou siga com uma sugestão direta?".to_string(),
    };
    missions
        .iter()
        .map(|m| m.commitment_question.clone())
        .chain(std::iter::once(closing))
        .collect()
}

fn build_weekly_story(insight: Option<&str>, domain: Option<Domain>) -> Option<String> {
    let insight = insight?;
    let focus = match domain {
        Some(d) => format!("no domínio {}", d),
        None => "na sua jornada".to_string(),
    };
    Some(format!("Micro-história da semana {}: {}", focus, insight))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::SqliteProfileStore;
    use chrono::{Duration, TimeZone};

    fn engine() -> (SafeStore, Arc<ManualClock>, EngagementEngine) {
        let store = SafeStore::new(Arc::new(SqliteProfileStore::in_memory().unwrap()));
        // Monday 09:00 UTC
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(),
        ));
        let engine = EngagementEngine::new(store.clone(), clock.clone());
        (store, clock, engine)
    }

    #[test]
    fn test_first_turn_placeholders_and_plans() {
        let (store, _, engine) = engine();
        let result = engine.process_message(1, "Oi, tudo bem?", &[]);

        assert!(result.insights.is_empty());
        assert_eq!(result.micro_missions.len(), 1);
        assert_eq!(result.check_ins.len(), 1);
        assert!(result.zeigarnik_hooks.is_empty());

        let lines: Vec<&str> = result.reply.content.lines().collect();
        assert_eq!(lines.len(), 9);
        assert_eq!(
            lines[0],
            "❓ Pergunta rápida: O que você realmente quer destravar agora? (Enxuto)"
        );
        assert_eq!(
            lines[1],
            "👀 Observação: Estou entrando em ritmo com você em tempo real."
        );
        assert_eq!(lines[4], "🧠 Micro-insight: Vou registrar o que você disse.");
        assert_eq!(
            lines[5],
            "🎯 Micro-missão: Registrar uma pequena ação que avance seu objetivo central"
        );
        assert_eq!(
            lines[6],
            "🔁 Zeigarnik: Me avisa se quiser que eu guarde algo em aberto."
        );
        assert!(lines[7].starts_with("📅 Check-in: Qual é a intenção principal para hoje?"));
        assert_eq!(lines[8], "✨ Estou acompanhando você em tempo real.");

        assert_eq!(store.list_recent_messages(1, 10).len(), 1);
        let memory = engagement_memory(&store.get_micro_modules(1));
        assert!(memory.last_mission_at.is_some());
        assert!(memory.last_check_in_at.is_some());
        assert!(memory.last_insight_at.is_none());
        assert_eq!(memory.last_pace, Some(Pacing::Balanced));
    }

    #[test]
    fn test_memory_carries_forward_unrefreshed_timestamps() {
        let (store, clock, engine) = engine();
        engine.process_message(1, "primeira", &[]);
        let first = engagement_memory(&store.get_micro_modules(1));

        clock.advance(Duration::hours(1));
        let result = engine.process_message(1, "segunda", &[]);
        assert!(result.micro_missions.is_empty());
        assert!(result.check_ins.is_empty());

        let second = engagement_memory(&store.get_micro_modules(1));
        assert_eq!(second.last_mission_at, first.last_mission_at);
        assert_eq!(second.last_check_in_at, first.last_check_in_at);
    }

    #[test]
    fn test_observation_mirrors_last_assistant_message() {
        let (_, _, engine) = engine();
        let history = vec![
            Message::assistant("metas"),
            Message::user("ok"),
            Message::assistant("sono"),
        ];
        let result = engine.process_message(1, "bora", &history);
        assert_eq!(
            result.rhythm.observation,
            "Notei que você reagiu bem quando falei sobre: sono"
        );
    }

    #[test]
    fn test_observation_mirrors_empty_assistant_message() {
        let history = vec![Message::assistant("metas"), Message::assistant("")];
        let rhythm = build_rhythm("bora", &history);
        assert_eq!(
            rhythm.observation,
            "Notei que você reagiu bem quando falei sobre: "
        );
    }

    #[test]
    fn test_fourth_message_surfaces_insights() {
        let (store, clock, engine) = engine();
        for text in ["um", "dois", "tres"] {
            engine.process_message(1, text, &[]);
            clock.advance(Duration::minutes(5));
        }
        let result = engine.process_message(1, "Gosto de cuidar da saúde todo dia", &[]);

        let labels: Vec<&str> = result.insights.iter().map(|i| i.label.as_str()).collect();
        assert!(labels.contains(&"Hábito diário mencionado"));
        assert!(labels.contains(&"Interesse declarado"));
        assert!(labels.contains(&"Domínio ativo: saúde"));
        assert_eq!(result.micro_insight.as_deref(), Some(labels[0]));
        assert_eq!(
            result.matching_hint.as_deref(),
            Some("Match com peers interessados em health")
        );
        assert_eq!(store.list_insights(1).len(), result.insights.len());

        let core = store.get_core(1);
        assert!(core
            .behavior
            .habits
            .contains(&"Hábito diário mencionado".to_string()));
        assert!(core
            .behavior
            .preferences
            .contains(&"Interesse declarado".to_string()));
    }

    #[test]
    fn test_alias_folded_into_core() {
        let (store, _, engine) = engine();
        engine.process_message(1, "Me chama de Bia, por favor", &[]);
        assert_eq!(store.get_core(1).identity.aliases, vec!["Bia"]);
    }

    #[test]
    fn test_primary_domain_hints() {
        let insight = |label: &str| PatternInsight::new(InsightCategory::Domain, label);
        assert_eq!(
            detect_primary_domain(&[insight("Domínio ativo: finanças")]),
            Some(Domain::Finance)
        );
        assert_eq!(detect_primary_domain(&[insight("Domínio ativo: dinheiro")]), None);
        assert_eq!(detect_primary_domain(&[]), None);
    }

    #[test]
    fn test_style_and_guided_questions() {
        let style = build_style(Pacing::Fast, &["eco".to_string()]);
        assert_eq!(style[0], "Respostas curtas, objetivas.");
        assert_eq!(style.last().map(String::as_str), Some("eco"));

        let questions = build_guided_questions(&[], Some(Domain::Career));
        assert_eq!(
            questions,
            vec!["Quer explorar opções rápidas ou aprofundar em career?"]
        );
    }
}
