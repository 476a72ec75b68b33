//! Zeigarnik hooks: at most one "open loop" reminder per turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engagement::missions::MissionState;
use crate::signals::truncate_chars;
use crate::types::StoredMessage;

/// Characters of the last message quoted in a fallback hook.
pub const SUMMARY_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZeigarnikHook {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mission_id: Option<String>,
    pub reminder: String,
    pub next_step: String,
}

/// Marker written to the `zeigarnik_hooks` module every enabled turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZeigarnikState {
    pub active: bool,
    pub last_refreshed: DateTime<Utc>,
}

/// Build the hooks for this turn.
///
/// Returns `None` when disabled. Otherwise returns the hooks (zero or one)
/// together with the marker state the caller must persist, even when no hook
/// was produced.
pub fn build_zeigarnik_hooks(
    missions: Option<&MissionState>,
    recent: &[StoredMessage],
    enabled: bool,
    now: DateTime<Utc>,
) -> Option<(Vec<ZeigarnikHook>, ZeigarnikState)> {
    if !enabled {
        return None;
    }

    let mut hooks: Vec<ZeigarnikHook> = missions
        .and_then(|state| state.missions.first())
        .map(|mission| ZeigarnikHook {
            mission_id: Some(mission.id.clone()),
            reminder: format!("Quer retomar a missão: {}?", mission.description),
            next_step: "Eu posso quebrar em 1 passo de 3 minutos agora.".to_string(),
        })
        .into_iter()
        .collect();

    if hooks.is_empty() {
        if let Some(last) = recent.last() {
            hooks.push(ZeigarnikHook {
                mission_id: None,
                reminder: "Você deixou uma ideia em aberto, posso fechar agora?".to_string(),
                next_step: format!(
                    "Resumo do último ponto: {}",
                    truncate_chars(&last.content, SUMMARY_CHARS)
                ),
            });
        }
    }

    let state = ZeigarnikState {
        active: !hooks.is_empty(),
        last_refreshed: now,
    };
    Some((hooks, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engagement::missions::{build_mission, MissionHints};
    use crate::types::MessageRole;

    fn said(text: &str) -> StoredMessage {
        StoredMessage {
            role: MessageRole::User,
            content: text.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_disabled_returns_nothing() {
        assert!(build_zeigarnik_hooks(None, &[said("oi")], false, Utc::now()).is_none());
    }

    #[test]
    fn test_hook_for_latest_mission() {
        let mission = build_mission(&MissionHints::default(), 0);
        let state = MissionState {
            missions: vec![mission.clone(), build_mission(&MissionHints::default(), 1)],
            last_updated: Utc::now(),
        };
        let (hooks, marker) =
            build_zeigarnik_hooks(Some(&state), &[said("oi")], true, Utc::now()).unwrap();
        assert_eq!(hooks.len(), 1);
        assert_eq!(hooks[0].mission_id.as_deref(), Some(mission.id.as_str()));
        assert_eq!(
            hooks[0].reminder,
            format!("Quer retomar a missão: {}?", mission.description)
        );
        assert!(marker.active);
    }

    #[test]
    fn test_falls_back_to_last_message() {
        let long = "p".repeat(150);
        let (hooks, _) =
            build_zeigarnik_hooks(None, &[said("antes"), said(&long)], true, Utc::now()).unwrap();
        assert_eq!(hooks[0].mission_id, None);
        assert_eq!(
            hooks[0].next_step,
            format!("Resumo do último ponto: {}...", "p".repeat(120))
        );
    }

    #[test]
    fn test_marker_written_without_hook() {
        let (hooks, marker) = build_zeigarnik_hooks(None, &[], true, Utc::now()).unwrap();
        assert!(hooks.is_empty());
        assert!(!marker.active);
    }
}
