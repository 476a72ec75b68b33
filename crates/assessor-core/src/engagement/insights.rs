//! Micro-insight generation from the current message and recent history.

use serde::Serialize;

use crate::signals;
use crate::types::{InsightCategory, InsightIndex, PatternInsight, StoredMessage};

/// Messages needed before a weekly meta-insight is produced.
pub const WEEKLY_WINDOW: usize = 7;

/// Everything the insight step produced for one turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroInsightPlan {
    /// Insights that survived cadence and de-duplication; to be persisted.
    pub insights: Vec<PatternInsight>,
    pub mirrored_patterns: Vec<String>,
    pub content_fragments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_insight: Option<String>,
}

/// Inputs that vary per turn.
#[derive(Debug, Clone, Copy)]
pub struct InsightOptions {
    pub due: bool,
    pub variety_seed: u32,
}

/// Extract candidate insights and keep the ones that are due and new.
///
/// `index` is the user's existing insight labels; admitted labels are added
/// to it so a caller can reuse it within the same turn.
pub fn generate_micro_insights(
    message: &str,
    recent: &[StoredMessage],
    index: &mut InsightIndex,
    options: InsightOptions,
) -> MicroInsightPlan {
    let lowered = message.to_lowercase();
    let mut candidates = Vec::new();
    let mut mirrored_patterns = Vec::new();
    let mut content_fragments = Vec::new();

    if let Some(keyword) = signals::top_keyword(&signals::tokenize(&lowered)) {
        mirrored_patterns.push(format!(
            "Você vem mencionando {} — quer que eu conecte com algo já registrado?",
            keyword
        ));
        candidates.push(PatternInsight::new(
            InsightCategory::Theme,
            format!("Tema recorrente: {}", keyword),
        ));
    }

    if let Some(emotion) = signals::detect_emotion(&lowered) {
        candidates.push(PatternInsight::new(
            InsightCategory::Emotion,
            format!("Humor detectado: {}", emotion),
        ));
    }

    if let Some(habit) = signals::detect_habit(&lowered) {
        candidates.push(PatternInsight::new(InsightCategory::Habit, habit));
        content_fragments.push(format!(
            "Em micro dose: que tal repetir {} por 2 minutos hoje?",
            habit
        ));
    }

    if let Some(preference) = signals::detect_preference(&lowered) {
        candidates.push(PatternInsight::new(InsightCategory::Preference, preference));
    }

    if let Some(domain) = signals::detect_domain_mention(&lowered) {
        candidates.push(PatternInsight::new(
            InsightCategory::Domain,
            format!("Domínio ativo: {}", domain),
        ));
    }

    let weekly_insight = build_weekly_insight(recent, options.variety_seed);
    if let Some(weekly) = &weekly_insight {
        content_fragments.push(weekly.clone());
    }

    let insights = if options.due {
        index.admit(candidates)
    } else {
        Vec::new()
    };

    MicroInsightPlan {
        insights,
        mirrored_patterns,
        content_fragments,
        weekly_insight,
    }
}

/// Weekly meta-insight over the last seven messages.
pub fn build_weekly_insight(recent: &[StoredMessage], seed: u32) -> Option<String> {
    if recent.len() < WEEKLY_WINDOW {
        return None;
    }

    let window = &recent[recent.len() - WEEKLY_WINDOW..];
    let total: usize = window.iter().map(|m| m.content.chars().count()).sum();
    let average = total as f64 / window.len() as f64;
    let direction = if seed % 2 == 0 {
        "mais concisas"
    } else {
        "mais profundas"
    };

    Some(format!(
        "Insight semanal: suas mensagens ficaram {} (média {} caracteres).",
        direction,
        average.round() as u64
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageRole;
    use chrono::Utc;

    fn history(n: usize, len: usize) -> Vec<StoredMessage> {
        (0..n)
            .map(|_| StoredMessage {
                role: MessageRole::User,
                content: "a".repeat(len),
                created_at: Utc::now(),
            })
            .collect()
    }

    fn due(seed: u32) -> InsightOptions {
        InsightOptions {
            due: true,
            variety_seed: seed,
        }
    }

    #[test]
    fn test_extracts_every_candidate_kind() {
        let mut index = InsightIndex::default();
        let plan = generate_micro_insights(
            "Estou feliz, prefiro treino cedo; treino todo dia pela saúde",
            &[],
            &mut index,
            due(1),
        );
        let labels: Vec<&str> = plan.insights.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Tema recorrente: treino",
                "Humor detectado: ânimo positivo",
                "Hábito diário mencionado",
                "Preferência explicitada",
                "Domínio ativo: saúde",
            ]
        );
        assert_eq!(plan.mirrored_patterns.len(), 1);
        assert_eq!(
            plan.content_fragments,
            vec!["Em micro dose: que tal repetir Hábito diário mencionado por 2 minutos hoje?"]
        );
    }

    #[test]
    fn test_nothing_persisted_when_not_due() {
        let mut index = InsightIndex::default();
        let plan = generate_micro_insights(
            "Prefiro estudar de manhã, tenho uma rotina.",
            &[],
            &mut index,
            InsightOptions {
                due: false,
                variety_seed: 0,
            },
        );
        assert!(plan.insights.is_empty());
        assert!(index.is_empty());
        assert_eq!(plan.content_fragments.len(), 1);
    }

    #[test]
    fn test_dedup_against_existing_log() {
        let existing = vec![PatternInsight::new(InsightCategory::Domain, "Domínio ativo: saúde")];
        let mut index = InsightIndex::from_insights(&existing);
        let plan = generate_micro_insights("cuidar da saúde", &[], &mut index, due(0));
        assert!(plan.insights.is_empty());
    }

    #[test]
    fn test_weekly_insight_needs_seven_messages() {
        assert!(build_weekly_insight(&history(6, 10), 0).is_none());
        assert_eq!(
            build_weekly_insight(&history(9, 10), 2).as_deref(),
            Some("Insight semanal: suas mensagens ficaram mais concisas (média 10 caracteres).")
        );
        assert!(build_weekly_insight(&history(7, 3), 3)
            .unwrap()
            .contains("mais profundas"));
    }
}
