//! Engagement: what to surface to a user this turn, and how.

pub mod checkins;
pub mod engine;
pub mod insights;
pub mod missions;
pub mod notifications;
pub mod triggers;
pub mod zeigarnik;

pub use checkins::{plan_check_ins, CheckInPlan, CheckInScope};
pub use engine::{
    build_rhythm, detect_primary_domain, engagement_memory, EngagementEngine, EngagementResult,
    Rhythm, VarietyMix, STYLE_SIGNATURE, STYLE_VOICE,
};
pub use insights::{build_weekly_insight, generate_micro_insights, InsightOptions, MicroInsightPlan};
pub use missions::{plan_micro_missions, MicroMission, MissionHints, MissionState, Timeframe};
pub use notifications::{build_notifications, NotificationPlan, NotificationSchedule};
pub use triggers::{evaluate_triggers, CheckInSlot, EngagementMemory, Pacing, TriggerEvaluation};
pub use zeigarnik::{build_zeigarnik_hooks, ZeigarnikHook, ZeigarnikState};
