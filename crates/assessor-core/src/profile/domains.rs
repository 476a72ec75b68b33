//! Life domains and keyword-driven domain detection.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Weight assigned to a keyword hit.
pub const KEYWORD_SIGNAL_WEIGHT: f64 = 0.6;

/// Minimum strongest-signal weight for a domain to count as active.
pub const ACTIVATION_THRESHOLD: f64 = 0.5;

/// The six fixed life areas a user's messages can activate.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Health,
    Career,
    Relationships,
    Learning,
    Finance,
    Performance,
}

impl Domain {
    /// Keyword list scanned in order; the first hit wins.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Domain::Health => &[
                "exercise", "health", "sleep", "nutrition", "diet", "therapy", "saúde", "sono",
                "exercício", "dieta", "terapia",
            ],
            Domain::Career => &[
                "job", "work", "career", "promotion", "empresa", "startup", "trabalho", "carreira",
                "emprego", "promoção",
            ],
            Domain::Relationships => &[
                "family", "relationship", "friend", "marriage", "partner", "parents", "família",
                "relacionamento", "amig", "casamento",
            ],
            Domain::Learning => &[
                "study", "learning", "course", "class", "training", "leitura", "estud", "curso",
                "aprend",
            ],
            Domain::Finance => &[
                "money", "finance", "budget", "invest", "economy", "expenses", "dinheiro",
                "finanças", "orçamento", "gastos",
            ],
            Domain::Performance => &[
                "focus", "productivity", "performance", "habits", "routine", "discipline",
                "rotina", "foco", "disciplina", "produtiv",
            ],
        }
    }

    /// All domains in declaration order.
    pub fn all() -> Vec<Domain> {
        Domain::iter().collect()
    }
}

/// A single piece of evidence that a domain matters to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainSignal {
    pub reason: String,
    /// Strength in `[0, 1]`.
    pub weight: f64,
    pub last_seen_at: DateTime<Utc>,
}

/// Activation state of one domain for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainState {
    pub name: Domain,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation_reason: Option<String>,
    /// Signals keyed by signal id (the signal's reason).
    pub signals: BTreeMap<String, DomainSignal>,
}

impl DomainState {
    /// A domain nobody has mentioned yet.
    pub fn empty(name: Domain) -> Self {
        Self {
            name,
            active: false,
            activation_reason: None,
            signals: BTreeMap::new(),
        }
    }

    /// Signal with the highest weight, if any.
    pub fn strongest_signal(&self) -> Option<&DomainSignal> {
        self.signals
            .values()
            .max_by(|a, b| a.weight.total_cmp(&b.weight))
    }

    /// Most recently observed signal, if any.
    pub fn latest_signal(&self) -> Option<&DomainSignal> {
        self.signals.values().max_by_key(|s| s.last_seen_at)
    }
}

/// Per-user domain states keyed by domain, always holding all six.
pub type DomainStates = BTreeMap<Domain, DomainState>;

/// Fresh states for every domain.
pub fn default_domain_states() -> DomainStates {
    Domain::iter().map(|d| (d, DomainState::empty(d))).collect()
}

/// Active domains in declaration order.
pub fn active_domains(states: &DomainStates) -> Vec<Domain> {
    states
        .values()
        .filter(|state| state.active)
        .map(|state| state.name)
        .collect()
}

/// A domain hit produced by [`detect_domains`].
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedDomain {
    pub domain: Domain,
    pub signal: DomainSignal,
}

/// Scan text for domain keywords. Several domains may fire per message.
pub fn detect_domains(text: &str, now: DateTime<Utc>) -> Vec<DetectedDomain> {
    let lowered = text.to_lowercase();

    Domain::iter()
        .filter_map(|domain| {
            domain
                .keywords()
                .iter()
                .find(|keyword| lowered.contains(*keyword))
                .map(|hit| DetectedDomain {
                    domain,
                    signal: DomainSignal {
                        reason: format!("keyword: {}", hit),
                        weight: KEYWORD_SIGNAL_WEIGHT,
                        last_seen_at: now,
                    },
                })
        })
        .collect()
}

/// Fold new signals into a domain state.
///
/// A signal replaces the stored one with the same id only when its weight is
/// at least as high. Activation is recomputed from the strongest signal.
pub fn upsert_domain_signals(
    existing: &DomainState,
    new_signals: &[DomainSignal],
    activation_reason: Option<&str>,
) -> DomainState {
    let mut signals = existing.signals.clone();
    for signal in new_signals {
        let keep_existing = signals
            .get(&signal.reason)
            .is_some_and(|current| signal.weight < current.weight);
        if !keep_existing {
            signals.insert(signal.reason.clone(), signal.clone());
        }
    }

    let mut state = DomainState {
        name: existing.name,
        active: false,
        activation_reason: existing.activation_reason.clone(),
        signals,
    };
    let strongest = state.strongest_signal().cloned();
    state.active = strongest
        .as_ref()
        .is_some_and(|s| s.weight >= ACTIVATION_THRESHOLD);
    state.activation_reason = activation_reason
        .map(str::to_string)
        .or_else(|| strongest.map(|s| s.reason))
        .or(state.activation_reason);
    state
}
