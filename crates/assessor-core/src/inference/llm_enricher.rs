//! Enrichment backed by an [`Llm`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::error::AssessorResult;
use crate::inference::json_parser::parse_enrichment;
use crate::profile::{CoreProfile, CoreProfileUpdate};
use crate::traits::{GenerationOptions, Llm, ProfileEnricher, ResponseFormat};
use crate::types::Message;

/// System prompt sent ahead of the user's message.
pub const ENRICHMENT_PROMPT: &str = "Atue como um \"Second Brain\". Extraia identidade, contexto de vida, Big Five (0-100), comportamentos e metacognição a partir da mensagem do usuário.";

/// Name of the JSON schema sent with every request.
pub const ENRICHMENT_SCHEMA_NAME: &str = "second_brain_inference";

/// JSON schema of `{identity, lifeContext, bigFive, behavior, metacognition}`.
pub fn enrichment_schema() -> serde_json::Value {
    let strings = json!({ "type": "array", "items": { "type": "string" } });
    json!({
        "type": "object",
        "properties": {
            "identity": strings,
            "lifeContext": {
                "type": "object",
                "properties": {
                    "roles": strings,
                    "goals": strings,
                    "location": { "type": ["string", "null"] }
                }
            },
            "bigFive": {
                "type": "object",
                "properties": {
                    "openness": { "type": "number" },
                    "conscientiousness": { "type": "number" },
                    "extraversion": { "type": "number" },
                    "agreeableness": { "type": "number" },
                    "neuroticism": { "type": "number" }
                }
            },
            "behavior": {
                "type": "object",
                "properties": { "habits": strings, "preferences": strings }
            },
            "metacognition": {
                "type": "object",
                "properties": { "selfReflection": strings, "blindspots": strings }
            }
        }
    })
}

pub struct LlmEnricher {
    llm: Arc<dyn Llm>,
}

impl LlmEnricher {
    pub fn new(llm: Arc<dyn Llm>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ProfileEnricher for LlmEnricher {
    async fn enrich(
        &self,
        message: &str,
        _current: &CoreProfile,
    ) -> AssessorResult<Option<CoreProfileUpdate>> {
        let messages = vec![Message::system(ENRICHMENT_PROMPT), Message::user(message)];
        let options = GenerationOptions {
            response_format: Some(ResponseFormat::JsonSchema {
                name: ENRICHMENT_SCHEMA_NAME.to_string(),
                schema: enrichment_schema(),
            }),
            ..Default::default()
        };

        let response = self.llm.generate(&messages, Some(options)).await?;
        debug!(model = self.llm.model_name(), "Received enrichment response");
        parse_enrichment(response.content_or_empty())
    }
}
