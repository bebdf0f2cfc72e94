use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{error, info, warn};

use super::collection::Collection;
use super::domain::{FamilyRecord, Identified, NotificationType, PolicyRecord, RecordId};
use super::eligibility::{
    EligibilityRules, EligibilityValidator, FamilyEligibilityRules, IneligibleEntry,
    PolicyEligibilityRules, ValidationError,
};
use super::providers::NotificationProvider;
use super::repository::{CandidateSource, NotificationTracker, PolicyRepository, RepositoryError};
use super::templates::TemplateSource;
use super::triggers::{TriggerDetector, TriggerWindows};

/// Rejected record with the code and text explaining the rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectionView {
    pub record_id: RecordId,
    pub rejection_reason: u16,
    pub rejection_details: String,
}

impl<T: Identified> From<&IneligibleEntry<'_, T>> for RejectionView {
    fn from(entry: &IneligibleEntry<'_, T>) -> Self {
        Self {
            record_id: entry.record.record_id(),
            rejection_reason: entry.rejection_reason.0,
            rejection_details: entry.rejection_details.clone(),
        }
    }
}

/// Eligibility outcome without any delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EligibilityPreview {
    pub notification_type: NotificationType,
    pub eligible: Vec<RecordId>,
    pub ineligible: Vec<RejectionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDelivery {
    pub record_id: RecordId,
    pub errors: Vec<String>,
}

/// Outcome of one notification type within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDispatchReport {
    pub notification_type: NotificationType,
    pub candidates: usize,
    pub ineligible: Vec<RejectionView>,
    pub sent: Vec<RecordId>,
    pub failed: Vec<FailedDelivery>,
}

/// Outcome of a full dispatch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub run_at: NaiveDateTime,
    pub types: Vec<TypeDispatchReport>,
    pub unavailable_providers: Vec<String>,
}

impl DispatchReport {
    pub fn sent_count(&self) -> usize {
        self.types.iter().map(|report| report.sent.len()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.types.iter().map(|report| report.failed.len()).sum()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Sends every enabled notification type to the policies eligible for it.
pub struct NotificationDispatcher<R, T> {
    store: Arc<R>,
    templates: Arc<T>,
    providers: Vec<Arc<dyn NotificationProvider>>,
    enabled: Vec<NotificationType>,
    windows: TriggerWindows,
}

impl<R, T> NotificationDispatcher<R, T>
where
    R: PolicyRepository + NotificationTracker + 'static,
    T: TemplateSource + 'static,
{
    pub fn new(
        store: Arc<R>,
        templates: Arc<T>,
        providers: Vec<Arc<dyn NotificationProvider>>,
        enabled: Vec<NotificationType>,
        windows: TriggerWindows,
    ) -> Self {
        Self {
            store,
            templates,
            providers,
            enabled,
            windows,
        }
    }

    pub fn store(&self) -> &Arc<R> {
        &self.store
    }

    pub fn enabled_notification_types(&self) -> &[NotificationType] {
        &self.enabled
    }

    /// Run every enabled notification type once, stamping deliveries with `now`.
    pub fn dispatch(&self, now: NaiveDateTime) -> Result<DispatchReport, DispatchError> {
        info!(
            run_at = %now,
            types = self.enabled.len(),
            providers = self.providers.len(),
            "notification dispatch started"
        );

        let mut unavailable = BTreeSet::new();
        let mut types = Vec::with_capacity(self.enabled.len());
        for &notification_type in &self.enabled {
            types.push(self.dispatch_type(notification_type, now, &mut unavailable)?);
        }

        let report = DispatchReport {
            run_at: now,
            types,
            unavailable_providers: unavailable.into_iter().collect(),
        };
        info!(
            sent = report.sent_count(),
            failed = report.failed_count(),
            "notification dispatch finished"
        );
        Ok(report)
    }

    /// Eligibility of the policies triggered by `notification_type` on `today`.
    pub fn preview(
        &self,
        notification_type: NotificationType,
        today: NaiveDate,
    ) -> Result<EligibilityPreview, DispatchError> {
        let candidates = self.candidates(notification_type, today)?;
        let rules = PolicyEligibilityRules::new(self.store.as_ref(), today);
        Ok(run_preview(rules, candidates, notification_type)?)
    }

    /// Eligibility of every stored family for `notification_type`.
    pub fn preview_families(
        &self,
        notification_type: NotificationType,
    ) -> Result<EligibilityPreview, DispatchError> {
        let families: Collection<FamilyRecord> =
            Collection::from_records(self.store.families()?);
        Ok(run_preview(FamilyEligibilityRules, families, notification_type)?)
    }

    fn candidates(
        &self,
        notification_type: NotificationType,
        today: NaiveDate,
    ) -> Result<Collection<PolicyRecord>, RepositoryError> {
        TriggerDetector::new(self.store.as_ref(), self.windows)
            .candidates(notification_type, today)
    }

    fn dispatch_type(
        &self,
        notification_type: NotificationType,
        now: NaiveDateTime,
        unavailable: &mut BTreeSet<String>,
    ) -> Result<TypeDispatchReport, DispatchError> {
        let today = now.date();
        let candidates = self.candidates(notification_type, today)?;
        let candidate_count = candidates.count();

        let mut validator = EligibilityValidator::new(
            PolicyEligibilityRules::new(self.store.as_ref(), today),
            candidates,
            notification_type,
        );
        validator.validate_notification_eligibility()?;

        let ineligible: Vec<RejectionView> = validator
            .invalid_collection()?
            .iter()
            .map(RejectionView::from)
            .collect();

        let mut sent = Vec::new();
        let mut failed = Vec::new();
        for policy in validator.valid_collection()?.iter() {
            match self.deliver(notification_type, policy, unavailable) {
                Ok(providers) => {
                    info!(
                        policy = %policy.id,
                        %notification_type,
                        providers = ?providers,
                        "notification sent"
                    );
                    if let Err(err) = self.store.mark_sent(policy.id, notification_type, now) {
                        error!(
                            policy = %policy.id,
                            %notification_type,
                            error = %err,
                            "notification sent but not recorded"
                        );
                    }
                    sent.push(policy.id);
                }
                Err(errors) => {
                    warn!(
                        policy = %policy.id,
                        %notification_type,
                        errors = ?errors,
                        "notification not delivered"
                    );
                    failed.push(FailedDelivery {
                        record_id: policy.id,
                        errors,
                    });
                }
            }
        }

        Ok(TypeDispatchReport {
            notification_type,
            candidates: candidate_count,
            ineligible,
            sent,
            failed,
        })
    }

    /// Deliver through every available provider. Succeeds when at least one
    /// provider accepted the message.
    fn deliver(
        &self,
        notification_type: NotificationType,
        policy: &PolicyRecord,
        unavailable: &mut BTreeSet<String>,
    ) -> Result<Vec<String>, Vec<String>> {
        let message = self
            .templates
            .render(notification_type, policy)
            .map_err(|err| vec![err.to_string()])?;
        let Some(destination) = policy.family.contact() else {
            return Err(vec!["family has no contact number".to_string()]);
        };

        let mut delivered = Vec::new();
        let mut errors = Vec::new();
        for provider in &self.providers {
            let name = provider.name();
            if unavailable.contains(name) {
                continue;
            }
            match provider.send(&message, destination) {
                Ok(()) => delivered.push(name.to_string()),
                Err(err) => {
                    if err.is_systemic() {
                        warn!(
                            provider = name,
                            error = %err,
                            "provider unavailable, skipping it for this run"
                        );
                        unavailable.insert(name.to_string());
                    }
                    errors.push(format!("{name}: {err}"));
                }
            }
        }

        if delivered.is_empty() {
            if errors.is_empty() {
                errors.push("no provider available".to_string());
            }
            Err(errors)
        } else {
            Ok(delivered)
        }
    }
}

fn run_preview<V: EligibilityRules>(
    rules: V,
    collection: Collection<V::Record>,
    notification_type: NotificationType,
) -> Result<EligibilityPreview, ValidationError> {
    let mut validator = EligibilityValidator::new(rules, collection, notification_type);
    validator.validate_notification_eligibility()?;

    let eligible = validator
        .valid_collection()?
        .iter()
        .map(Identified::record_id)
        .collect();
    let ineligible = validator
        .invalid_collection()?
        .iter()
        .map(RejectionView::from)
        .collect();

    Ok(EligibilityPreview {
        notification_type,
        eligible,
        ineligible,
    })
}
