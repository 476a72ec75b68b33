//! Profile store: the narrow read/write contract the engines run against.
//!
//! Every operation is keyed by integer user id and is safe to call for a
//! user with no prior state: reads return empty or default values.

mod safe;
mod sqlite;

pub use safe::SafeStore;
pub use sqlite::SqliteProfileStore;

use chrono::{DateTime, Utc};

use crate::error::AssessorResult;
use crate::profile::{
    CoreProfile, CoreProfileUpdate, DomainState, DomainStates, MicroModule,
    MicroModuleActivation, ModuleState,
};
use crate::types::{MessageRole, PatternInsight, StoredInsight, StoredMessage, UserId};

/// Trait for profile storage operations.
#[cfg_attr(test, mockall::automock)]
pub trait ProfileStore: Send + Sync {
    /// Get a user's core profile, if one was ever created.
    fn get_core(&self, user_id: UserId) -> AssessorResult<Option<CoreProfile>>;

    /// Get the core profile, creating a default one first if missing.
    fn ensure_core(&self, user_id: UserId) -> AssessorResult<CoreProfile>;

    /// Merge a partial update into the core profile and return the result.
    fn update_core(
        &self,
        user_id: UserId,
        update: &CoreProfileUpdate,
    ) -> AssessorResult<CoreProfile>;

    /// All six domain states; domains never written come back inactive.
    fn get_domains(&self, user_id: UserId) -> AssessorResult<DomainStates>;

    /// Insert or replace one domain state.
    fn upsert_domain_state(&self, user_id: UserId, state: &DomainState) -> AssessorResult<()>;

    /// Insert or replace several domain states.
    fn upsert_domain_states(&self, user_id: UserId, states: &[DomainState]) -> AssessorResult<()> {
        for state in states {
            self.upsert_domain_state(user_id, state)?;
        }
        Ok(())
    }

    /// Insert or replace the module slot named by `activation.name`.
    fn upsert_micro_module(
        &self,
        user_id: UserId,
        activation: &MicroModuleActivation,
        active: bool,
        state: &ModuleState,
    ) -> AssessorResult<()>;

    /// All module slots for a user.
    fn get_micro_modules(&self, user_id: UserId) -> AssessorResult<Vec<MicroModule>>;

    /// Append to the message log.
    fn log_message(
        &self,
        user_id: UserId,
        role: MessageRole,
        content: &str,
        at: DateTime<Utc>,
    ) -> AssessorResult<()>;

    /// The most recent `limit` messages, oldest first.
    fn list_recent_messages(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> AssessorResult<Vec<StoredMessage>>;

    /// Append to the insight log. Missing confidences are stored as 50.
    fn add_insights(
        &self,
        user_id: UserId,
        insights: &[PatternInsight],
        at: DateTime<Utc>,
    ) -> AssessorResult<()>;

    /// The most recent `limit` insights, newest first.
    fn list_recent_insights(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> AssessorResult<Vec<StoredInsight>>;

    /// The whole insight log, oldest first.
    fn list_insights(&self, user_id: UserId) -> AssessorResult<Vec<PatternInsight>>;

    /// Ids of users that have a core profile, ascending.
    fn list_user_ids(&self, limit: usize) -> AssessorResult<Vec<UserId>>;
}
