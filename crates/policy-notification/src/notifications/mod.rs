//! Policy notification eligibility, candidate detection and delivery.

pub mod collection;
pub mod dispatcher;
pub mod domain;
pub mod eligibility;
pub mod import;
pub mod providers;
pub mod repository;
pub mod router;
pub mod store;
pub mod templates;
pub mod triggers;

#[cfg(test)]
mod tests;

pub use collection::Collection;
pub use dispatcher::{
    DispatchError, DispatchReport, EligibilityPreview, FailedDelivery, NotificationDispatcher,
    RejectionView, TypeDispatchReport,
};
pub use domain::{
    FamilyRecord, Identified, NotificationType, PolicyRecord, PolicyStage, PolicyStatus,
    RecordId,
};
pub use eligibility::{
    EligibilityRules, EligibilityValidator, FamilyEligibilityRules, IneligibleEntry,
    PolicyEligibilityRules, RejectionLedger, RejectionReason, TypeValidation, ValidationError,
};
pub use import::{import_policies, import_policies_from_path, ImportError, ImportedPolicies};
pub use providers::{build_providers, DeliveryError, NotificationProvider, TextNotificationProvider};
pub use repository::{CandidateSource, NotificationTracker, PolicyRepository, RepositoryError};
pub use router::notification_router;
pub use store::InMemoryPolicyStore;
pub use templates::{DefaultNotificationTemplates, TemplateError, TemplateSource};
pub use triggers::{TriggerDetector, TriggerWindows};
