//! Per-turn check-in planning.

use serde::{Deserialize, Serialize};

use crate::engagement::triggers::CheckInSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInScope {
    Dia,
    Semana,
}

impl CheckInScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dia => "dia",
            Self::Semana => "semana",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInPlan {
    pub slot: CheckInSlot,
    pub prompt: String,
    pub scope: CheckInScope,
}

/// Base prompt for a slot, before the seed-driven suffix.
pub fn slot_prompt(slot: CheckInSlot) -> &'static str {
    match slot {
        CheckInSlot::Morning => "Qual é a intenção principal para hoje?",
        CheckInSlot::Afternoon => "Quer medir o progresso parcial?",
        CheckInSlot::Evening => "Que micro vitória você teve hoje?",
        CheckInSlot::Weekly => "Vamos fechar a semana com 1 insight e 1 próximo passo?",
    }
}

/// Zero or one check-in for the resolved slot.
pub fn plan_check_ins(slot: Option<CheckInSlot>, variety_seed: u32) -> Vec<CheckInPlan> {
    let Some(slot) = slot else {
        return Vec::new();
    };

    let scope = if slot == CheckInSlot::Weekly {
        CheckInScope::Semana
    } else {
        CheckInScope::Dia
    };
    let spice = if variety_seed % 3 == 0 {
        "(responda em uma frase)"
    } else {
        "(posso sugerir 3 opções)"
    };

    vec![CheckInPlan {
        slot,
        prompt: format!("{} {}", slot_prompt(slot), spice),
        scope,
    }]
}
