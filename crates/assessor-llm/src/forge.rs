//! OpenAI-compatible chat-completions client.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use assessor_core::error::{AssessorError, AssessorResult};
use assessor_core::traits::{
    GenerationOptions, Llm, LlmConfig, LlmResponse, ResponseFormat, TokenUsage,
};
use assessor_core::types::Message;

/// Base URL used when none is configured.
pub const DEFAULT_API_URL: &str = "https://api.openai.com";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

const COMPLETIONS_PATH: &str = "v1/chat/completions";

/// Chat-completions provider speaking the OpenAI wire format.
pub struct ForgeLlm {
    client: Client,
    endpoint: Url,
    api_key: SecretString,
    config: LlmConfig,
}

impl std::fmt::Debug for ForgeLlm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForgeLlm")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: WireErrorDetail,
}

#[derive(Debug, Deserialize)]
struct WireErrorDetail {
    message: String,
}

impl ForgeLlm {
    /// Build a client. The API key is required; the base URL and model fall
    /// back to [`DEFAULT_API_URL`] and [`DEFAULT_MODEL`].
    pub fn new(config: LlmConfig) -> AssessorResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                AssessorError::Configuration(
                    "Enrichment API key not found. Set BUILT_IN_FORGE_API_KEY.".to_string(),
                )
            })?;

        let base = config.base_url.as_deref().unwrap_or(DEFAULT_API_URL);
        let endpoint = completions_endpoint(base)?;

        let client = Client::builder()
            .build()
            .map_err(|e| AssessorError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        let mut config = config;
        if config.model.is_empty() {
            config.model = DEFAULT_MODEL.to_string();
        }

        Ok(Self {
            client,
            endpoint,
            api_key: SecretString::new(api_key),
            config,
        })
    }

    /// Full URL requests are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn build_request<'a>(
        &'a self,
        messages: &'a [Message],
        options: &GenerationOptions,
    ) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.config.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: Some(options.temperature.unwrap_or(self.config.temperature)),
            max_tokens: Some(options.max_tokens.unwrap_or(self.config.max_tokens)),
            response_format: options.response_format.as_ref().and_then(wire_format),
        }
    }
}

/// Resolve `{base}/v1/chat/completions`, tolerating a trailing slash or an
/// already-present `/v1` suffix on the base.
fn completions_endpoint(base: &str) -> AssessorResult<Url> {
    let trimmed = base.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix("/v1").unwrap_or(trimmed);
    let base = Url::parse(&format!("{}/", trimmed))
        .map_err(|e| AssessorError::Configuration(format!("Invalid enrichment API URL '{}': {}", base, e)))?;
    base.join(COMPLETIONS_PATH)
        .map_err(|e| AssessorError::Configuration(format!("Invalid enrichment API URL: {}", e)))
}

fn wire_format(format: &ResponseFormat) -> Option<serde_json::Value> {
    match format {
        ResponseFormat::Text => None,
        ResponseFormat::Json => Some(serde_json::json!({ "type": "json_object" })),
        ResponseFormat::JsonSchema { name, schema } => Some(serde_json::json!({
            "type": "json_schema",
            "json_schema": { "name": name, "schema": schema }
        })),
    }
}

fn parse_completion(body: &str) -> AssessorResult<LlmResponse> {
    let response: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| AssessorError::llm_invalid_response(format!("Failed to parse response: {}", e)))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty());

    let usage = response.usage.map(|u| TokenUsage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(LlmResponse { content, usage })
}

#[async_trait]
impl Llm for ForgeLlm {
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> AssessorResult<LlmResponse> {
        let options = options.unwrap_or_default();
        let request = self.build_request(messages, &options);

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| AssessorError::llm(format!("Enrichment request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AssessorError::llm(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<WireError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(AssessorError::llm(format!(
                "Enrichment API error ({}): {}",
                status, message
            )));
        }

        let parsed = parse_completion(&body)?;
        debug!(
            model = %self.config.model,
            tokens = parsed.usage.as_ref().map(|u| u.total_tokens).unwrap_or(0),
            "enrichment completion received"
        );
        Ok(parsed)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
