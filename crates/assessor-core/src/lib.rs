//! assessor-core - behavioral profiling, engagement and compatibility matching.
//!
//! This crate infers a structured profile from conversation, decides what to
//! surface to a user each turn (insights, micro-missions, check-ins, open-loop
//! reminders) and ranks other users for a compatibility-based feed.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use assessor_core::{open_store, ChatService, EngineConfig, SystemClock};
//!
//! let store = open_store(&EngineConfig::default())?;
//! let chat = ChatService::new(store, Arc::new(SystemClock));
//!
//! let turn = chat.process_user_message(1, "Prefiro estudar de manhã", &[]).await?;
//! println!("{}", turn.engagement.reply.content);
//! ```

pub mod chat;
pub mod checkin;
pub mod clock;
pub mod config;
pub mod engagement;
pub mod error;
pub mod inference;
pub mod log_once;
pub mod matching;
pub mod profile;
pub mod runtime;
pub mod signals;
pub mod store;
pub mod timeline;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use chat::{ChatService, ChatTurn, ContextEntry};
pub use checkin::{CheckInMessage, CheckInWorker, JobKind};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, EnrichmentConfig, FeedConfig};
pub use engagement::{EngagementEngine, EngagementResult};
pub use error::{AssessorError, AssessorResult, ErrorCode};
pub use inference::{InferenceOutcome, LlmEnricher, ProfileInference};
pub use matching::{DeepProfile, FeedCard, InteractionType, MatchingEngine};
pub use profile::{CoreProfile, Domain};
pub use runtime::{open_store, BackgroundRuntime, DeliveryReceiver};
pub use store::{ProfileStore, SafeStore, SqliteProfileStore};
pub use timeline::{TimelineService, TimelineSnapshot};
pub use traits::{
    GenerationOptions, Llm, LlmConfig, LlmResponse, NoopEnricher, ProfileEnricher, ResponseFormat,
};
pub use types::{Message, MessageRole, PatternInsight, UserId};
