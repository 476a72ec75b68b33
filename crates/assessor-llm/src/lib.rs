//! assessor-llm - the optional profile enrichment provider.
//!
//! Speaks the OpenAI chat-completions wire format against any compatible
//! endpoint and asks for JSON-schema shaped output.
//!
//! # Example
//!
//! ```ignore
//! use assessor_core::EnrichmentConfig;
//! use assessor_llm::LlmFactory;
//!
//! let enricher = LlmFactory::enricher(&EnrichmentConfig::from_env());
//! ```

mod factory;
mod forge;

pub use factory::LlmFactory;
pub use forge::{ForgeLlm, DEFAULT_API_URL, DEFAULT_MODEL};

pub use assessor_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, ResponseFormat};
