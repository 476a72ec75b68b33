//! Micro-modules: small named units of per-user state.
//!
//! Each module name owns exactly one slot per user. The slot's scratch data is
//! a [`ModuleState`], a tagged union encoded to JSON only at the store
//! boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engagement::missions::MissionState;
use crate::engagement::triggers::EngagementMemory;
use crate::engagement::zeigarnik::ZeigarnikState;
use crate::profile::domains::Domain;

/// Module holding trigger timestamps and pacing.
pub const ENGAGEMENT_MEMORY_MODULE: &str = "engagement_memory";
/// Module holding the rolling mission list.
pub const MISSIONS_MODULE: &str = "micro_missions";
/// Module marking whether an open loop is currently surfaced.
pub const ZEIGARNIK_MODULE: &str = "zeigarnik_hooks";

/// Typed scratch state stored in a micro-module slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModuleState {
    Missions(MissionState),
    EngagementMemory(EngagementMemory),
    Zeigarnik(ZeigarnikState),
    Activation(ActivationState),
    #[default]
    Empty,
}

impl ModuleState {
    pub fn as_missions(&self) -> Option<&MissionState> {
        match self {
            Self::Missions(state) => Some(state),
            _ => None,
        }
    }

    pub fn as_engagement_memory(&self) -> Option<&EngagementMemory> {
        match self {
            Self::EngagementMemory(memory) => Some(memory),
            _ => None,
        }
    }
}

/// State written when a template module is triggered by a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationState {
    pub last_triggered_at: DateTime<Utc>,
}

/// Static description of a module: what it is and what wakes it up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroModuleActivation {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
    pub depth: u32,
    pub triggers: Vec<String>,
}

impl MicroModuleActivation {
    pub fn new(name: &str, domain: Option<Domain>, depth: u32, triggers: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            domain,
            depth: depth.max(1),
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// A stored micro-module slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroModule {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
    pub depth: u32,
    pub active: bool,
    pub triggers: Vec<String>,
    pub state: ModuleState,
}

/// Find a module slot by name.
pub fn find_module<'a>(modules: &'a [MicroModule], name: &str) -> Option<&'a MicroModule> {
    modules.iter().find(|module| module.name == name)
}

/// Topic modules that a message can switch on.
pub fn module_templates() -> Vec<MicroModuleActivation> {
    vec![
        MicroModuleActivation::new(
            "sleep_quality",
            Some(Domain::Health),
            2,
            &["sleep", "insomnia", "rest", "sono", "insônia", "descanso"],
        ),
        MicroModuleActivation::new(
            "nutrition_tracking",
            Some(Domain::Health),
            2,
            &["diet", "calories", "nutrition", "alimentação", "dieta"],
        ),
        MicroModuleActivation::new(
            "career_transition",
            Some(Domain::Career),
            2,
            &["new job", "career change", "transition", "novo emprego", "transição"],
        ),
        MicroModuleActivation::new(
            "relationship_conflict",
            Some(Domain::Relationships),
            3,
            &["argument", "conflict", "relationship issue", "briga", "conflito"],
        ),
        MicroModuleActivation::new(
            "financial_planning",
            Some(Domain::Finance),
            2,
            &["budget", "savings", "invest", "debt", "orçamento", "dívida", "poupança"],
        ),
        MicroModuleActivation::new(
            "learning_path",
            Some(Domain::Learning),
            2,
            &["course", "study plan", "certification", "curso", "certificação"],
        ),
        MicroModuleActivation::new(
            "productivity_routines",
            Some(Domain::Performance),
            2,
            &["routine", "habit", "agenda", "planner", "rotina", "hábito"],
        ),
    ]
}

/// Templates whose domain is active and whose trigger appears in the text.
pub fn detect_micro_modules(text: &str, active: &[Domain]) -> Vec<MicroModuleActivation> {
    let lowered = text.to_lowercase();
    module_templates()
        .into_iter()
        .filter(|template| template.domain.map_or(true, |d| active.contains(&d)))
        .filter(|template| template.triggers.iter().any(|t| lowered.contains(t.as_str())))
        .collect()
}
