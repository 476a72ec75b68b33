//! Compatibility matching: deep profiles, scoring and the discovery feed.

pub mod compatibility;
pub mod engine;
pub mod feed;
pub mod profile_builder;
pub mod synthetic;

pub use compatibility::{
    calculate_compatibility, CompatibilityBias, CompatibilityBreakdown, CompatibilityResult,
};
pub use engine::{MatchingEngine, PairCompatibility};
pub use feed::{feed_preview, FeedSuggestion, InteractionRecord, InteractionType, MatchingMemory};
pub use profile_builder::{DeepProfile, ProfileBuilder};
pub use synthetic::{synthetic_profiles, FeedCard};
