//! Optional profile enrichment.

use async_trait::async_trait;

use crate::error::AssessorResult;
use crate::profile::{CoreProfile, CoreProfileUpdate};

/// Turns one message (plus the current profile) into a profile update.
///
/// Implementations may fail; callers treat any error as "no update".
#[async_trait]
pub trait ProfileEnricher: Send + Sync {
    async fn enrich(
        &self,
        message: &str,
        current: &CoreProfile,
    ) -> AssessorResult<Option<CoreProfileUpdate>>;

    /// Whether this enricher can ever produce an update.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// The default enricher: never produces anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEnricher;

#[async_trait]
impl ProfileEnricher for NoopEnricher {
    async fn enrich(
        &self,
        _message: &str,
        _current: &CoreProfile,
    ) -> AssessorResult<Option<CoreProfileUpdate>> {
        Ok(None)
    }

    fn is_enabled(&self) -> bool {
        false
    }
}
