use tracing::debug;

use super::{
    EligibilityRules, IneligibleEntry, RejectionReason, TypeValidation, ValidationError,
};
use crate::notifications::collection::Collection;
use crate::notifications::domain::{FamilyRecord, NotificationType};

pub(crate) const FAMILY_ARCHIVED: &str = "family record archived";

/// Eligibility rules evaluated per family instead of per policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct FamilyEligibilityRules;

impl EligibilityRules for FamilyEligibilityRules {
    type Record = FamilyRecord;

    const BASE_VALIDATION_REJECTION_REASON: RejectionReason = RejectionReason(1);
    const TYPE_VALIDATION_REJECTION_REASON: RejectionReason = RejectionReason(2);

    fn base_eligibility_validation(
        &self,
        collection: &Collection<FamilyRecord>,
        _notification_type: NotificationType,
    ) -> Result<Collection<FamilyRecord>, ValidationError> {
        Ok(collection
            .filter(|family| family.approval_of_notification && family.contact().is_some()))
    }

    fn validation_for_notification_type(
        &self,
        notification_type: NotificationType,
    ) -> Result<Option<TypeValidation<'_, FamilyRecord>>, ValidationError> {
        match notification_type {
            NotificationType::NeedForRenewal | NotificationType::ReminderAfterExpiration => {
                Ok(Some(TypeValidation::new(
                    FAMILY_ARCHIVED,
                    |families: &Collection<FamilyRecord>| {
                        Ok(families.filter(|family| !family.archived))
                    },
                )))
            }
            _ => Ok(None),
        }
    }

    fn handle_not_valid_entries(
        &self,
        notification_type: NotificationType,
        entries: &[IneligibleEntry<'_, FamilyRecord>],
    ) -> Result<(), ValidationError> {
        debug!(
            %notification_type,
            rejected = entries.len(),
            "families excluded from notification"
        );
        Ok(())
    }
}
