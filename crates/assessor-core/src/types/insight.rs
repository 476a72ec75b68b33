//! Pattern insights: the append-only insight log's entries.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Default confidence recorded when an insight does not carry one.
pub const DEFAULT_INSIGHT_CONFIDENCE: u8 = 50;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    Theme,
    Emotion,
    Habit,
    Preference,
    Domain,
}

/// A labelled observation about the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternInsight {
    pub category: InsightCategory,
    pub label: String,
    /// Integer in `[0, 100]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
}

impl PatternInsight {
    pub fn new(category: InsightCategory, label: impl Into<String>) -> Self {
        Self {
            category,
            label: label.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: u8) -> Self {
        self.confidence = Some(confidence.min(100));
        self
    }
}

/// An insight as recorded in the insight log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredInsight {
    #[serde(flatten)]
    pub insight: PatternInsight,
    pub created_at: DateTime<Utc>,
}

/// Labels already present in a user's insight log.
///
/// Loaded once per turn and consulted for every candidate, so the same label
/// is never appended twice for a user.
#[derive(Debug, Clone, Default)]
pub struct InsightIndex {
    labels: HashSet<String>,
}

impl InsightIndex {
    pub fn from_insights(insights: &[PatternInsight]) -> Self {
        Self {
            labels: insights.iter().map(|i| i.label.clone()).collect(),
        }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Keep only candidates whose label is not indexed yet, then index them.
    pub fn admit(&mut self, candidates: Vec<PatternInsight>) -> Vec<PatternInsight> {
        candidates
            .into_iter()
            .filter(|candidate| self.labels.insert(candidate.label.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_rejects_known_labels() {
        let existing = vec![PatternInsight::new(InsightCategory::Domain, "Domínio ativo: saúde")];
        let mut index = InsightIndex::from_insights(&existing);

        let admitted = index.admit(vec![
            PatternInsight::new(InsightCategory::Domain, "Domínio ativo: saúde"),
            PatternInsight::new(InsightCategory::Habit, "Rotina desejada"),
            PatternInsight::new(InsightCategory::Habit, "Rotina desejada"),
        ]);
        assert_eq!(admitted.len(), 1);
        assert_eq!(admitted[0].label, "Rotina desejada");
        assert!(index.contains("Rotina desejada"));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_category_names() {
        assert_eq!(InsightCategory::Preference.to_string(), "preference");
        assert_eq!("emotion".parse::<InsightCategory>().ok(), Some(InsightCategory::Emotion));
    }
}
