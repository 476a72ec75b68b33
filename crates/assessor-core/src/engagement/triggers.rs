//! Trigger evaluation: what is due this turn, and at what pace.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::types::StoredMessage;

/// Messages longer than this many characters slow the pace down.
pub const SLOW_MESSAGE_CHARS: usize = 320;
/// Messages shorter than this many characters speed the pace up.
pub const FAST_MESSAGE_CHARS: usize = 80;
/// Recent messages needed before pacing is re-evaluated.
pub const PACING_MIN_MESSAGES: usize = 5;

/// Inferred conversational tempo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Pacing {
    Fast,
    #[default]
    Balanced,
    Slow,
}

/// Time-of-day bucket for a check-in, or a weekly review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInSlot {
    Morning,
    Afternoon,
    Evening,
    Weekly,
}

/// Per-user timestamps of the last surfaced artifacts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngagementMemory {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_insight_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_mission_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_check_in_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_pace: Option<Pacing>,
}

/// Outcome of [`evaluate_triggers`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvaluation {
    pub micro_insight_due: bool,
    pub micro_mission_due: bool,
    pub check_in_slot: Option<CheckInSlot>,
    pub zeigarnik_hook: bool,
    pub pacing: Pacing,
    pub variety_seed: u32,
}

/// Decide what is due given the recent message log and engagement memory.
pub fn evaluate_triggers(
    recent: &[StoredMessage],
    memory: &EngagementMemory,
    now: DateTime<Utc>,
) -> TriggerEvaluation {
    let message_count = recent.len();

    TriggerEvaluation {
        micro_insight_due: micro_insight_due(message_count),
        micro_mission_due: memory
            .last_mission_at
            .map_or(true, |at| hours_between(now, at) > 24.0),
        check_in_slot: resolve_check_in_slot(now, memory.last_check_in_at),
        zeigarnik_hook: message_count > 6 && memory.last_mission_at.is_some(),
        pacing: derive_pacing(memory.last_pace, recent),
        variety_seed: variety_seed(now),
    }
}

/// Insights are due on every fourth message once at least three exist.
pub fn micro_insight_due(message_count: usize) -> bool {
    message_count >= 3 && message_count % 4 == 0
}

/// Pick the check-in slot for `now`, or none when the last one is recent.
pub fn resolve_check_in_slot(
    now: DateTime<Utc>,
    last_check_in: Option<DateTime<Utc>>,
) -> Option<CheckInSlot> {
    let Some(last) = last_check_in else {
        return Some(CheckInSlot::Morning);
    };

    let hours = hours_between(now, last);
    if hours > 168.0 {
        return Some(CheckInSlot::Weekly);
    }
    if hours <= 8.0 {
        return None;
    }
    match now.hour() {
        h if h < 12 => Some(CheckInSlot::Morning),
        h if h < 18 => Some(CheckInSlot::Afternoon),
        _ => Some(CheckInSlot::Evening),
    }
}

/// Pace from the last two messages; sticky below five messages.
pub fn derive_pacing(previous: Option<Pacing>, recent: &[StoredMessage]) -> Pacing {
    let fallback = previous.unwrap_or_default();
    if recent.len() < PACING_MIN_MESSAGES {
        return fallback;
    }

    let last_two = &recent[recent.len() - 2..];
    let lengths: Vec<usize> = last_two.iter().map(|m| m.content.chars().count()).collect();
    if lengths.iter().any(|len| *len > SLOW_MESSAGE_CHARS) {
        return Pacing::Slow;
    }
    if lengths.iter().all(|len| *len < FAST_MESSAGE_CHARS) {
        return Pacing::Fast;
    }
    fallback
}

/// Deterministic phrasing seed from weekday (Sunday = 0) and hour.
pub fn variety_seed(now: DateTime<Utc>) -> u32 {
    (now.weekday().num_days_from_sunday() * 24 + now.hour()) % 100
}

fn hours_between(a: DateTime<Utc>, b: DateTime<Utc>) -> f64 {
    (a - b).num_milliseconds().abs() as f64 / 3_600_000.0
}
