//! Timeline read model: recent activity, habits and emotional patterns.
//!
//! Everything here is derived from stored state on each call; nothing is
//! written back.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{Display, IntoStaticStr};
use tracing::debug;

use crate::clock::Clock;
use crate::profile::DomainStates;
use crate::store::SafeStore;
use crate::types::{StoredInsight, StoredMessage, UserId};

pub const DEFAULT_TIMELINE_LIMIT: usize = 8;
pub const MIN_TIMELINE_LIMIT: usize = 3;
pub const MAX_TIMELINE_LIMIT: usize = 20;

/// Insight confidence assumed when none was recorded.
const DEFAULT_EVENT_IMPACT: u8 = 60;
const MAX_BREAKDOWN_ENTRIES: usize = 4;
const MAX_TRIGGERS: usize = 5;
const TRIGGER_MAX_CHARS: usize = 60;
const TRIGGER_KEEP_CHARS: usize = 57;
const DEFAULT_TRIGGER: &str = "Mensagens recentes orientaram a análise";
const DEFAULT_DOMINANT: &str = "Focado";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Focado,
    Calmo,
    Energizado,
    Curioso,
    Reflexivo,
}

impl Mood {
    const PALETTE: [Mood; 5] = [
        Mood::Focado,
        Mood::Calmo,
        Mood::Energizado,
        Mood::Curioso,
        Mood::Reflexivo,
    ];

    /// Keyword-derived mood; text without a known stem gets a palette entry
    /// picked by its length.
    pub fn from_text(text: &str) -> Mood {
        let lowered = text.to_lowercase();
        if lowered.contains("animad") {
            Mood::Energizado
        } else if lowered.contains("foco") || lowered.contains("focado") {
            Mood::Focado
        } else if lowered.contains("calmo") || lowered.contains("tranquilo") {
            Mood::Calmo
        } else if lowered.contains("curios") {
            Mood::Curioso
        } else if lowered.contains("reflex") {
            Mood::Reflexivo
        } else {
            Self::PALETTE[text.chars().count() % Self::PALETTE.len()]
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub mood: Mood,
    /// Integer in `[0, 100]`.
    pub impact: u8,
    pub created_at: DateTime<Utc>,
    pub time_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub name: String,
    pub cadence: String,
    pub category: String,
    pub consistency: u8,
    pub last_occurrence: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Positive,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionShare {
    pub label: String,
    pub value: u8,
    pub tone: Tone,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionalPatterns {
    pub dominant: String,
    pub breakdown: Vec<EmotionShare>,
    pub triggers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSnapshot {
    pub updated_at: DateTime<Utc>,
    pub events: Vec<TimelineEvent>,
    pub habits: Vec<Habit>,
    pub emotional_patterns: EmotionalPatterns,
}

/// "há 5min", "há 3h" or "2d atrás" for an age in minutes.
pub fn relative_label(minutes_ago: f64) -> String {
    if minutes_ago < 60.0 {
        return format!("há {}min", minutes_ago.round().max(1.0) as i64);
    }
    let hours = (minutes_ago / 60.0).round();
    if hours < 24.0 {
        return format!("há {}h", hours as i64);
    }
    format!("{}d atrás", (hours / 24.0).round() as i64)
}

fn minutes_between(earlier: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - earlier).num_seconds() as f64 / 60.0
}

fn insight_event(index: usize, stored: &StoredInsight) -> TimelineEvent {
    let insight = &stored.insight;
    TimelineEvent {
        id: format!("insight-{}-{}", stored.created_at.timestamp_millis(), index),
        title: "Insight identificado".to_string(),
        description: insight.label.clone(),
        category: insight.category.to_string(),
        mood: Mood::from_text(&insight.label),
        impact: insight.confidence.unwrap_or(DEFAULT_EVENT_IMPACT).min(100),
        created_at: stored.created_at,
        time_label: String::new(),
    }
}

fn message_event(index: usize, message: &StoredMessage) -> TimelineEvent {
    TimelineEvent {
        id: format!("msg-{}-{}", message.created_at.timestamp_millis(), index),
        title: "Mensagem registrada".to_string(),
        description: message.content.clone(),
        category: "mensagem".to_string(),
        mood: Mood::from_text(&message.content),
        impact: 50 + (message.content.chars().count() % 20) as u8,
        created_at: message.created_at,
        time_label: String::new(),
    }
}

/// Insights and messages merged newest first and cut to `limit`.
pub fn build_events(
    insights: &[StoredInsight],
    messages: &[StoredMessage],
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<TimelineEvent> {
    let mut events: Vec<TimelineEvent> = insights
        .iter()
        .enumerate()
        .map(|(i, insight)| insight_event(i, insight))
        .chain(messages.iter().enumerate().map(|(i, m)| message_event(i, m)))
        .collect();
    events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    events.truncate(limit);
    for event in &mut events {
        event.time_label = relative_label(minutes_between(event.created_at, now).max(1.0));
    }
    events
}

/// One habit per active domain, in domain order.
pub fn build_habits(domains: &DomainStates, now: DateTime<Utc>) -> Vec<Habit> {
    domains
        .values()
        .filter(|state| state.active)
        .enumerate()
        .map(|(idx, state)| {
            let consistency = 60 + state.signals.len() * 8 + idx * 4;
            Habit {
                name: format!("Padrão em {}", state.name),
                cadence: state
                    .activation_reason
                    .clone()
                    .unwrap_or_else(|| "registro recente".to_string()),
                category: state.name.to_string(),
                consistency: consistency.clamp(20, 95) as u8,
                last_occurrence: state
                    .latest_signal()
                    .map(|signal| relative_label(minutes_between(signal.last_seen_at, now)))
                    .unwrap_or_else(|| "hoje".to_string()),
            }
        })
        .collect()
}

fn trigger(content: &str) -> String {
    if content.chars().count() > TRIGGER_MAX_CHARS {
        let head: String = content.chars().take(TRIGGER_KEEP_CHARS).collect();
        format!("{}...", head)
    } else {
        content.to_string()
    }
}

/// Category shares over the given insights plus short message excerpts.
pub fn build_emotional_patterns(
    insights: &[StoredInsight],
    messages: &[StoredMessage],
) -> EmotionalPatterns {
    // first-seen order
    let mut counts: Vec<(String, usize)> = Vec::new();
    for stored in insights {
        let label = stored.insight.category.to_string();
        match counts.iter_mut().find(|(existing, _)| *existing == label) {
            Some((_, count)) => *count += 1,
            None => counts.push((label, 1)),
        }
    }
    let total = insights.len().max(1) as f64;

    let breakdown: Vec<EmotionShare> = counts
        .into_iter()
        .take(MAX_BREAKDOWN_ENTRIES)
        .map(|(label, count)| EmotionShare {
            label,
            value: (count as f64 / total * 100.0).round() as u8,
            tone: if count > 1 { Tone::Positive } else { Tone::Neutral },
        })
        .collect();

    let mut triggers: Vec<String> = messages
        .iter()
        .take(MAX_TRIGGERS)
        .map(|m| trigger(&m.content))
        .collect();
    if triggers.is_empty() {
        triggers.push(DEFAULT_TRIGGER.to_string());
    }

    EmotionalPatterns {
        dominant: breakdown
            .first()
            .map(|share| share.label.clone())
            .unwrap_or_else(|| DEFAULT_DOMINANT.to_string()),
        breakdown,
        triggers,
    }
}

pub struct TimelineService {
    store: SafeStore,
    clock: Arc<dyn Clock>,
}

impl TimelineService {
    pub fn new(store: SafeStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Snapshot with at most `limit` events. Callers validate the limit.
    pub fn snapshot(&self, user_id: UserId, limit: usize) -> TimelineSnapshot {
        let now = self.clock.now();
        let messages = self.store.list_recent_messages(user_id, limit * 3);
        let insights = self.store.list_recent_insights(user_id, limit * 2);
        let domains = self.store.get_domains(user_id);

        let events = build_events(&insights, &messages, limit, now);
        let habits = build_habits(&domains, now);
        debug!(
            user_id,
            events = events.len(),
            habits = habits.len(),
            "Built timeline snapshot"
        );
        TimelineSnapshot {
            updated_at: now,
            events,
            habits,
            emotional_patterns: build_emotional_patterns(&insights, &messages),
        }
    }
}

impl std::fmt::Debug for TimelineService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::profile::{upsert_domain_signals, Domain, DomainSignal};
    use crate::store::SqliteProfileStore;
    use crate::types::{InsightCategory, MessageRole, PatternInsight};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap()
    }

    fn service() -> (SafeStore, TimelineService) {
        let store = SafeStore::new(Arc::new(SqliteProfileStore::in_memory().unwrap()));
        let clock = Arc::new(ManualClock::new(now()));
        (store.clone(), TimelineService::new(store, clock))
    }

    fn signal(reason: &str, weight: f64, age: Duration) -> DomainSignal {
        DomainSignal {
            reason: reason.to_string(),
            weight,
            last_seen_at: now() - age,
        }
    }

    #[test]
    fn test_relative_label() {
        assert_eq!(relative_label(0.2), "há 1min");
        assert_eq!(relative_label(42.0), "há 42min");
        assert_eq!(relative_label(150.0), "há 3h");
        assert_eq!(relative_label(60.0 * 50.0), "2d atrás");
    }

    #[test]
    fn test_mood_from_text() {
        assert_eq!(Mood::from_text("Estou animado hoje"), Mood::Energizado);
        assert_eq!(Mood::from_text("Preciso de FOCO"), Mood::Focado);
        assert_eq!(Mood::from_text("dia tranquilo"), Mood::Calmo);
        assert_eq!(Mood::from_text("fiquei curiosa"), Mood::Curioso);
        assert_eq!(Mood::from_text("momento de reflexão"), Mood::Reflexivo);
        // "abcde" has 5 chars, palette slot 0
        assert_eq!(Mood::from_text("abcde"), Mood::Focado);
        assert_eq!(Mood::from_text("abcde"), Mood::from_text("abcde"));
    }

    #[test]
    fn test_events_are_merged_newest_first() {
        let (store, service) = service();
        store.log_message(1, MessageRole::User, "primeira", now() - Duration::hours(3));
        store.add_insights(
            1,
            &[PatternInsight::new(InsightCategory::Habit, "Rotina matinal").with_confidence(80)],
            now() - Duration::hours(2),
        );
        store.log_message(1, MessageRole::Assistant, "segunda", now() - Duration::minutes(10));

        let snapshot = service.snapshot(1, 8);
        let titles: Vec<&str> = snapshot.events.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(titles, vec!["segunda", "Rotina matinal", "primeira"]);

        let insight = &snapshot.events[1];
        assert_eq!(insight.title, "Insight identificado");
        assert_eq!(insight.category, "habit");
        assert_eq!(insight.impact, 80);
        assert_eq!(insight.time_label, "há 2h");
        assert_eq!(snapshot.events[0].category, "mensagem");
        assert_eq!(snapshot.events[0].time_label, "há 10min");
        assert_eq!(snapshot.updated_at, now());
    }

    #[test]
    fn test_events_are_cut_to_limit() {
        let (store, service) = service();
        for minute in (0..10).rev() {
            store.log_message(1, MessageRole::User, &format!("m{}", minute), now() - Duration::minutes(minute));
        }
        let snapshot = service.snapshot(1, 3);
        let titles: Vec<&str> = snapshot.events.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(titles, vec!["m0", "m1", "m2"]);
        assert!(snapshot.events.iter().all(|e| (50..70).contains(&e.impact)));
    }

    #[test]
    fn test_habits_follow_active_domains() {
        let (store, service) = service();
        let domains = store.get_domains(1);
        let health = upsert_domain_signals(
            &domains[&Domain::Health],
            &[
                signal("keyword: sono", 0.9, Duration::hours(5)),
                signal("keyword: dieta", 0.6, Duration::hours(2)),
            ],
            None,
        );
        let career = upsert_domain_signals(
            &domains[&Domain::Career],
            &[signal("keyword: trabalho", 0.6, Duration::days(3))],
            Some("mudança de emprego"),
        );
        store.upsert_domain_states(1, &[health, career]);

        let habits = service.snapshot(1, 8).habits;
        assert_eq!(habits.len(), 2);

        assert_eq!(habits[0].name, "Padrão em health");
        assert_eq!(habits[0].consistency, 76);
        assert_eq!(habits[0].last_occurrence, "há 2h");
        assert_eq!(habits[0].cadence, "keyword: sono");

        assert_eq!(habits[1].category, "career");
        assert_eq!(habits[1].consistency, 72);
        assert_eq!(habits[1].cadence, "mudança de emprego");
        assert_eq!(habits[1].last_occurrence, "3d atrás");
    }

    #[test]
    fn test_habit_consistency_is_capped() {
        let mut domains = crate::profile::default_domain_states();
        let signals: Vec<DomainSignal> = (0..6)
            .map(|i| signal(&format!("keyword: {}", i), 0.6, Duration::hours(1)))
            .collect();
        let state = upsert_domain_signals(&domains[&Domain::Finance], &signals, None);
        domains.insert(Domain::Finance, state);

        let habits = build_habits(&domains, now());
        assert_eq!(habits.len(), 1);
        assert_eq!(habits[0].consistency, 95);
    }

    #[test]
    fn test_no_activity_yields_defaults() {
        let (_, service) = service();
        let snapshot = service.snapshot(9, 8);
        assert!(snapshot.events.is_empty());
        assert!(snapshot.habits.is_empty());
        assert_eq!(snapshot.emotional_patterns.dominant, "Focado");
        assert!(snapshot.emotional_patterns.breakdown.is_empty());
        assert_eq!(snapshot.emotional_patterns.triggers, vec![DEFAULT_TRIGGER.to_string()]);
    }

    #[test]
    fn test_emotional_breakdown_shares() {
        let at = now();
        let stored = |category, label: &str| StoredInsight {
            insight: PatternInsight::new(category, label),
            created_at: at,
        };
        let insights = vec![
            stored(InsightCategory::Emotion, "Humor detectado: feliz"),
            stored(InsightCategory::Theme, "Tema: carreira"),
            stored(InsightCategory::Emotion, "Humor detectado: ansioso"),
            stored(InsightCategory::Habit, "Rotina"),
        ];
        let long = "x".repeat(80);
        let messages = vec![StoredMessage {
            role: MessageRole::User,
            content: long,
            created_at: at,
        }];

        let patterns = build_emotional_patterns(&insights, &messages);
        assert_eq!(patterns.dominant, "emotion");
        assert_eq!(patterns.breakdown[0].value, 50);
        assert_eq!(patterns.breakdown[0].tone, Tone::Positive);
        assert_eq!(patterns.breakdown[1].label, "theme");
        assert_eq!(patterns.breakdown[1].value, 25);
        assert_eq!(patterns.breakdown[1].tone, Tone::Neutral);
        assert_eq!(patterns.triggers[0].chars().count(), 60);
        assert!(patterns.triggers[0].ends_with("..."));
    }
}
