//! Core traits for assessor providers.

mod enricher;
mod llm;

pub use enricher::*;
pub use llm::*;
