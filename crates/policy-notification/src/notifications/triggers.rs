use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::collection::Collection;
use super::domain::{NotificationType, PolicyRecord, PolicyStage, PolicyStatus};
use super::repository::{CandidateSource, PolicyRepository, RepositoryError};

/// Day windows used by the renewal related triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TriggerWindows {
    pub need_for_renewal_days: u32,
    pub reminder_after_expiration_days: u32,
}

impl Default for TriggerWindows {
    fn default() -> Self {
        Self {
            need_for_renewal_days: 14,
            reminder_after_expiration_days: 7,
        }
    }
}

/// Detects which policies an event happened to on a given day.
pub struct TriggerDetector<'a, R: ?Sized> {
    repository: &'a R,
    windows: TriggerWindows,
}

impl<'a, R: PolicyRepository + ?Sized> TriggerDetector<'a, R> {
    pub fn new(repository: &'a R, windows: TriggerWindows) -> Self {
        Self {
            repository,
            windows,
        }
    }

    pub fn is_triggered(
        &self,
        notification_type: NotificationType,
        policy: &PolicyRecord,
        today: NaiveDate,
    ) -> bool {
        let active = policy.status == PolicyStatus::Active;
        match notification_type {
            NotificationType::ActivationOfPolicy => {
                active
                    && policy.stage == PolicyStage::New
                    && policy.effective_date == Some(today)
            }
            NotificationType::StartingOfPolicy => active && policy.start_date == today,
            NotificationType::NeedForRenewal => {
                // a window past the calendar range has no upper bound
                let horizon = today
                    .checked_add_days(Days::new(u64::from(self.windows.need_for_renewal_days)));
                active
                    && policy.expiry_date > today
                    && horizon.map_or(true, |horizon| policy.expiry_date <= horizon)
            }
            NotificationType::ExpirationOfPolicy => policy.expiry_date == today,
            NotificationType::ReminderAfterExpiration => {
                let earliest = today.checked_sub_days(Days::new(u64::from(
                    self.windows.reminder_after_expiration_days,
                )));
                policy.status == PolicyStatus::Expired
                    && earliest.map_or(true, |earliest| policy.expiry_date >= earliest)
                    && policy.expiry_date < today
            }
            NotificationType::RenewalOfPolicy => {
                active
                    && policy.stage == PolicyStage::Renewal
                    && policy.effective_date == Some(today)
            }
        }
    }
}

impl<'a, R: PolicyRepository + ?Sized> CandidateSource for TriggerDetector<'a, R> {
    fn candidates(
        &self,
        notification_type: NotificationType,
        today: NaiveDate,
    ) -> Result<Collection<PolicyRecord>, RepositoryError> {
        let policies = self.repository.policies()?;
        Ok(policies
            .into_iter()
            .filter(|policy| self.is_triggered(notification_type, policy, today))
            .collect())
    }
}
