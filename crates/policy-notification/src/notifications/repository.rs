use chrono::{NaiveDate, NaiveDateTime};

use super::collection::Collection;
use super::domain::{FamilyRecord, NotificationType, PolicyRecord, RecordId};

/// Storage abstraction over policies and their families.
pub trait PolicyRepository: Send + Sync {
    fn policies(&self) -> Result<Vec<PolicyRecord>, RepositoryError>;
    /// Distinct families referenced by the stored policies.
    fn families(&self) -> Result<Vec<FamilyRecord>, RepositoryError>;
    /// Identifier of the policy renewing `policy`, if one was issued.
    fn renewal_of(&self, policy: &PolicyRecord) -> Result<Option<RecordId>, RepositoryError>;
}

/// Remembers which notifications were already delivered for a policy.
pub trait NotificationTracker: Send + Sync {
    fn sent_at(
        &self,
        policy: RecordId,
        notification_type: NotificationType,
    ) -> Result<Option<NaiveDateTime>, RepositoryError>;

    fn mark_sent(
        &self,
        policy: RecordId,
        notification_type: NotificationType,
        at: NaiveDateTime,
    ) -> Result<(), RepositoryError>;
}

/// Supplies the initial candidates for a notification type.
pub trait CandidateSource {
    fn candidates(
        &self,
        notification_type: NotificationType,
        today: NaiveDate,
    ) -> Result<Collection<PolicyRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record {0} not found")]
    NotFound(RecordId),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
