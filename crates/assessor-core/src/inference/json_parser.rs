//! JSON parsing utilities for enrichment responses.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::{AssessorError, AssessorResult, ErrorCode};
use crate::profile::{Behavior, CoreProfileUpdate, Identity, LifeContext, Metacognition, RawBigFive};

static CODE_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("valid code block regex"));
static FENCED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^```[a-zA-Z0-9]*\n?([\s\S]*?)\n?```$").expect("valid fenced regex")
});
static THINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid think regex"));

/// Extract JSON from potentially wrapped response (code blocks, etc.).
pub fn extract_json(text: &str) -> String {
    let text = text.trim();
    CODE_BLOCK_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| text.to_string())
}

/// Remove code fences and thinking tags from a response.
pub fn remove_code_blocks(content: &str) -> String {
    let content = content.trim();
    let content = FENCED_RE
        .captures(content)
        .and_then(|c| c.get(1).map(|m| m.as_str().trim()))
        .unwrap_or(content);
    THINK_RE.replace_all(content, "").trim().to_string()
}

/// Shape of the enrichment response. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnrichmentResponse {
    /// Identity statements.
    pub identity: Vec<String>,
    pub life_context: Option<LifeContext>,
    pub big_five: Option<RawBigFive>,
    pub behavior: Option<Behavior>,
    pub metacognition: Option<Metacognition>,
}

impl From<EnrichmentResponse> for CoreProfileUpdate {
    fn from(response: EnrichmentResponse) -> Self {
        CoreProfileUpdate {
            identity: Identity {
                statements: response.identity,
                aliases: Vec::new(),
            },
            life_context: response.life_context.unwrap_or_default(),
            big_five: response.big_five,
            behavior: response.behavior.unwrap_or_default(),
            metacognition: response.metacognition.unwrap_or_default(),
        }
    }
}

/// Parse an enrichment response into a profile update.
///
/// An empty response is `Ok(None)`; malformed JSON is an error.
pub fn parse_enrichment(response: &str) -> AssessorResult<Option<CoreProfileUpdate>> {
    let cleaned = remove_code_blocks(response);
    if cleaned.is_empty() {
        return Ok(None);
    }

    let json_str = extract_json(&cleaned);
    if json_str.is_empty() {
        return Ok(None);
    }

    let parsed: EnrichmentResponse =
        serde_json::from_str(&json_str).map_err(|e| AssessorError::Parse {
            message: format!("Failed to parse enrichment JSON: {}", e),
            code: ErrorCode::ParseInvalidJson,
        })?;

    let update = CoreProfileUpdate::from(parsed);
    Ok((!update.is_empty()).then_some(update))
}
