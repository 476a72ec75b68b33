//! Chat facade: one call per user message, inference first, then engagement.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::checkin::CheckInWorker;
use crate::clock::Clock;
use crate::engagement::{
    plan_check_ins, CheckInPlan, EngagementEngine, EngagementResult, STYLE_SIGNATURE, STYLE_VOICE,
};
use crate::error::{AssessorError, AssessorResult};
use crate::inference::{InferenceOutcome, ProfileInference};
use crate::store::SafeStore;
use crate::traits::ProfileEnricher;
use crate::types::{Message, MessageRole, UserId};

/// Open loops the assistant promises to follow up on.
pub const OPEN_LOOP_PROMPTS: [&str; 3] = [
    "Qual pequena tarefa ficou aberta e merece 10 minutos agora?",
    "Que conversa você adiou e pode destravar seu próximo movimento?",
    "Há um teste simples que confirme se vale avançar com essa ideia?",
];
const FOLLOW_UP_SUFFIX: &str = " (vou cobrar mais tarde)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextEntry {
    pub title: String,
    pub note: String,
}

/// Everything returned for one chat turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    #[serde(flatten)]
    pub engagement: EngagementResult,
    pub context_log: Vec<ContextEntry>,
    pub future_suggestions: Vec<String>,
    pub updated_history: Vec<Message>,
    pub profile: InferenceOutcome,
}

pub struct ChatService {
    inference: ProfileInference,
    engagement: EngagementEngine,
    check_ins: Option<Arc<CheckInWorker>>,
}

impl ChatService {
    pub fn new(store: SafeStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            inference: ProfileInference::new(store.clone(), clock.clone()),
            engagement: EngagementEngine::new(store, clock),
            check_ins: None,
        }
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn ProfileEnricher>) -> Self {
        self.inference = self.inference.with_enricher(enricher);
        self
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.engagement = self.engagement.with_recent_limit(limit);
        self
    }

    /// Enroll every user seen by this service with the given worker.
    pub fn with_check_in_worker(mut self, worker: Arc<CheckInWorker>) -> Self {
        self.check_ins = Some(worker);
        self
    }

    pub fn enrichment_enabled(&self) -> bool {
        self.inference.enrichment_enabled()
    }

    /// Process one user message.
    ///
    /// Only an empty message is an error; store and enrichment failures
    /// degrade to fewer artifacts.
    pub async fn process_user_message(
        &self,
        user_id: UserId,
        message: &str,
        history: &[Message],
    ) -> AssessorResult<ChatTurn> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AssessorError::missing_field("message", "Mensagem obrigatória"));
        }

        let profile = self.inference.observe(user_id, message).await;
        let engagement = self.engagement.process_message(user_id, message, history);

        if let Some(worker) = &self.check_ins {
            if worker.enroll(user_id) {
                info!(user_id, "User enrolled for check-ins");
            }
        }

        let mut enriched = history.to_vec();
        enriched.push(Message::user(message));
        let context_log = context_log(&enriched);
        let future_suggestions = OPEN_LOOP_PROMPTS
            .iter()
            .map(|prompt| format!("{}{}", prompt, FOLLOW_UP_SUFFIX))
            .collect();
        enriched.push(engagement.reply.clone());

        debug!(
            user_id,
            insights = engagement.insights.len(),
            missions = engagement.micro_missions.len(),
            "Processed chat turn"
        );

        Ok(ChatTurn {
            engagement,
            context_log,
            future_suggestions,
            updated_history: enriched,
            profile,
        })
    }

    /// The check-in plan a user would get right now, without logging anything.
    pub fn plan_standalone_check_ins(&self, user_id: UserId) -> Vec<CheckInPlan> {
        let evaluation = self.engagement.evaluate(user_id);
        plan_check_ins(evaluation.check_in_slot, evaluation.variety_seed)
    }
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("enrichment", &self.enrichment_enabled())
            .field("check_ins", &self.check_ins.is_some())
            .finish()
    }
}

/// Last two user messages, then the style line.
fn context_log(history: &[Message]) -> Vec<ContextEntry> {
    let users: Vec<&Message> = history
        .iter()
        .filter(|m| m.role == MessageRole::User)
        .collect();
    let last_two = &users[users.len().saturating_sub(2)..];

    let mut entries: Vec<ContextEntry> = last_two
        .iter()
        .enumerate()
        .map(|(idx, m)| ContextEntry {
            title: if idx + 1 == last_two.len() {
                "Pulso atual"
            } else {
                "Contexto recente"
            }
            .to_string(),
            note: m.content.clone(),
        })
        .collect();
    entries.push(ContextEntry {
        title: "Estilo".to_string(),
        note: format!("{} · {}", STYLE_VOICE, STYLE_SIGNATURE),
    });
    entries
}
