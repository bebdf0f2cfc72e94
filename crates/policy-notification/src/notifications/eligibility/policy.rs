use chrono::NaiveDate;
use tracing::{debug, info};

use super::{
    EligibilityRules, IneligibleEntry, RejectionReason, TypeValidation, ValidationError,
};
use crate::notifications::collection::Collection;
use crate::notifications::domain::{NotificationType, PolicyRecord, PolicyStatus};
use crate::notifications::repository::{NotificationTracker, PolicyRepository};

pub(crate) const NOT_ACTIVE: &str = "policy is not active";
pub(crate) const ALREADY_RENEWED: &str = "policy already renewed";
pub(crate) const NOT_EXPIRING_TODAY: &str = "not expiring today";

/// Eligibility rules for policy-level notifications.
///
/// Base rules: the family approved notifications, has a phone number, and the
/// notification was not already sent for this policy.
pub struct PolicyEligibilityRules<'a, S: ?Sized> {
    store: &'a S,
    today: NaiveDate,
}

impl<'a, S> PolicyEligibilityRules<'a, S>
where
    S: PolicyRepository + NotificationTracker + ?Sized,
{
    pub fn new(store: &'a S, today: NaiveDate) -> Self {
        Self { store, today }
    }

    fn not_renewed(&self, policy: &PolicyRecord) -> Result<bool, ValidationError> {
        Ok(self.store.renewal_of(policy)?.is_none())
    }
}

impl<'a, S> EligibilityRules for PolicyEligibilityRules<'a, S>
where
    S: PolicyRepository + NotificationTracker + ?Sized,
{
    type Record = PolicyRecord;

    const BASE_VALIDATION_REJECTION_REASON: RejectionReason = RejectionReason(1);
    const TYPE_VALIDATION_REJECTION_REASON: RejectionReason = RejectionReason(2);

    fn base_eligibility_validation(
        &self,
        collection: &Collection<PolicyRecord>,
        notification_type: NotificationType,
    ) -> Result<Collection<PolicyRecord>, ValidationError> {
        collection.try_filter(|policy: &PolicyRecord| -> Result<bool, ValidationError> {
            if !policy.family.approval_of_notification || policy.family.contact().is_none() {
                return Ok(false);
            }
            Ok(self.store.sent_at(policy.id, notification_type)?.is_none())
        })
    }

    fn validation_for_notification_type(
        &self,
        notification_type: NotificationType,
    ) -> Result<Option<TypeValidation<'_, PolicyRecord>>, ValidationError> {
        let today = self.today;
        let validation = match notification_type {
            NotificationType::ActivationOfPolicy => Some(TypeValidation::per_record(
                NOT_ACTIVE,
                |policy: &PolicyRecord| Ok(policy.status == PolicyStatus::Active),
            )),
            NotificationType::NeedForRenewal | NotificationType::ReminderAfterExpiration => {
                Some(TypeValidation::per_record(
                    ALREADY_RENEWED,
                    move |policy: &PolicyRecord| self.not_renewed(policy),
                ))
            }
            NotificationType::ExpirationOfPolicy => Some(TypeValidation::per_record(
                NOT_EXPIRING_TODAY,
                move |policy: &PolicyRecord| Ok(policy.expiry_date == today),
            )),
            NotificationType::StartingOfPolicy | NotificationType::RenewalOfPolicy => None,
        };
        Ok(validation)
    }

    fn handle_not_valid_entries(
        &self,
        notification_type: NotificationType,
        entries: &[IneligibleEntry<'_, PolicyRecord>],
    ) -> Result<(), ValidationError> {
        for entry in entries {
            debug!(
                policy = %entry.record.id,
                %notification_type,
                reason = entry.rejection_reason.0,
                details = %entry.rejection_details,
                "policy not eligible for notification"
            );
        }
        if !entries.is_empty() {
            info!(
                %notification_type,
                rejected = entries.len(),
                "policies excluded from notification"
            );
        }
        Ok(())
    }
}
