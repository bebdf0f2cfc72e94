//! Two-phase eligibility validation of notification candidates.
//!
//! A run first applies the base rules shared by every notification type and
//! then the rules registered for the requested type. Every input record ends
//! up either in the valid collection or in the invalid one, where the
//! [`RejectionLedger`] explains why.

mod family;
mod ledger;
mod policy;

pub use family::FamilyEligibilityRules;
pub use ledger::{IneligibleEntry, RejectionLedger, RejectionReason};
pub use policy::PolicyEligibilityRules;

use tracing::debug;

use super::collection::Collection;
use super::domain::{Identified, NotificationType};
use super::repository::RepositoryError;

/// Errors raised while validating a candidate collection.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error(
        "collection was not yet validated, call validate_notification_eligibility before accessing {collection}"
    )]
    NotYetValidated { collection: &'static str },
    #[error("eligibility hook `{hook}` has to be implemented")]
    NotImplemented { hook: &'static str },
    #[error("{tagged} of {total} ineligible records carry a rejection reason")]
    InconsistentLedger { tagged: usize, total: usize },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

type CollectionFilter<'a, R> =
    Box<dyn Fn(&Collection<R>) -> Result<Collection<R>, ValidationError> + 'a>;

/// Validation registered for a single notification type.
pub struct TypeValidation<'a, R> {
    details: String,
    filter: CollectionFilter<'a, R>,
}

impl<'a, R> TypeValidation<'a, R> {
    /// Validation expressed over the whole collection.
    pub fn new<F>(details: impl Into<String>, filter: F) -> Self
    where
        F: Fn(&Collection<R>) -> Result<Collection<R>, ValidationError> + 'a,
    {
        Self {
            details: details.into(),
            filter: Box::new(filter),
        }
    }

    /// Validation expressed as a predicate over one record.
    pub fn per_record<F>(details: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&R) -> Result<bool, ValidationError> + 'a,
    {
        Self::new(details, move |collection: &Collection<R>| {
            collection.try_filter(&predicate)
        })
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn apply(&self, collection: &Collection<R>) -> Result<Collection<R>, ValidationError> {
        (self.filter)(collection)
    }
}

/// Rules a concrete validator supplies to [`EligibilityValidator`].
///
/// The hooks default to [`ValidationError::NotImplemented`], so a missing
/// implementation surfaces when a run reaches it rather than when the
/// validator is built.
pub trait EligibilityRules {
    type Record: Identified + Clone;

    const BASE_VALIDATION_REJECTION_REASON: RejectionReason;
    const TYPE_VALIDATION_REJECTION_REASON: RejectionReason;

    /// Rules applicable regardless of the notification type. Returns the
    /// entries of `collection` that passed.
    fn base_eligibility_validation(
        &self,
        _collection: &Collection<Self::Record>,
        _notification_type: NotificationType,
    ) -> Result<Collection<Self::Record>, ValidationError> {
        Err(ValidationError::NotImplemented {
            hook: "base_eligibility_validation",
        })
    }

    /// Validation specific to `notification_type`, or `None` when every
    /// base-valid entry should pass.
    fn validation_for_notification_type(
        &self,
        _notification_type: NotificationType,
    ) -> Result<Option<TypeValidation<'_, Self::Record>>, ValidationError> {
        Err(ValidationError::NotImplemented {
            hook: "validation_for_notification_type",
        })
    }

    /// Called once per run with the annotated ineligible entries.
    fn handle_not_valid_entries(
        &self,
        _notification_type: NotificationType,
        _entries: &[IneligibleEntry<'_, Self::Record>],
    ) -> Result<(), ValidationError> {
        Err(ValidationError::NotImplemented {
            hook: "handle_not_valid_entries",
        })
    }
}

struct ValidationRun<R> {
    eligible: Collection<R>,
    ineligible: Collection<R>,
}

/// Partitions a candidate collection into eligible and ineligible records for
/// one notification type.
///
/// An instance is not meant to be shared between overlapping runs; each run
/// replaces the results and ledger of the previous one.
pub struct EligibilityValidator<V: EligibilityRules> {
    rules: V,
    collection: Collection<V::Record>,
    notification_type: NotificationType,
    ledger: RejectionLedger,
    run: Option<ValidationRun<V::Record>>,
}

impl<V: EligibilityRules> EligibilityValidator<V> {
    pub fn new(
        rules: V,
        collection: Collection<V::Record>,
        notification_type: NotificationType,
    ) -> Self {
        Self {
            rules,
            collection,
            notification_type,
            ledger: RejectionLedger::default(),
            run: None,
        }
    }

    pub fn notification_type(&self) -> NotificationType {
        self.notification_type
    }

    pub fn collection(&self) -> &Collection<V::Record> {
        &self.collection
    }

    pub fn ledger(&self) -> &RejectionLedger {
        &self.ledger
    }

    /// Run both phases over the collection given at construction.
    pub fn validate_notification_eligibility(&mut self) -> Result<(), ValidationError> {
        self.run = None;
        self.ledger.clear();

        let (base_valid, base_rejected) = self.base_validation()?;
        let (eligible, type_rejected) = self.notification_type_validation(&base_valid)?;
        let ineligible = match type_rejected {
            Some(rejected) => base_rejected.union(&rejected),
            None => base_rejected,
        };

        debug!(
            notification_type = %self.notification_type,
            input = self.collection.count(),
            eligible = eligible.count(),
            ineligible = ineligible.count(),
            "eligibility validated"
        );

        // results become visible only once the ineligible entries were handled
        let run = ValidationRun {
            eligible,
            ineligible,
        };
        {
            let entries = self.ledger.annotate(&run.ineligible)?;
            self.rules
                .handle_not_valid_entries(self.notification_type, &entries)?;
        }

        self.run = Some(run);
        Ok(())
    }

    pub fn valid_collection(&self) -> Result<&Collection<V::Record>, ValidationError> {
        self.run
            .as_ref()
            .map(|run| &run.eligible)
            .ok_or(ValidationError::NotYetValidated {
                collection: "valid_collection",
            })
    }

    /// Ineligible records annotated with their rejection reason and detail.
    pub fn invalid_collection(
        &self,
    ) -> Result<Vec<IneligibleEntry<'_, V::Record>>, ValidationError> {
        let run = self.run.as_ref().ok_or(ValidationError::NotYetValidated {
            collection: "invalid_collection",
        })?;
        self.ledger.annotate(&run.ineligible)
    }

    fn base_validation(
        &mut self,
    ) -> Result<(Collection<V::Record>, Collection<V::Record>), ValidationError> {
        let passed = self
            .rules
            .base_eligibility_validation(&self.collection, self.notification_type)?;
        let valid = self.collection.retain_ids(&passed.ids());
        let rejected = self.collection.subtract(&valid);

        self.ledger
            .record(V::BASE_VALIDATION_REJECTION_REASON, "", rejected.ids());

        Ok((valid, rejected))
    }

    fn notification_type_validation(
        &mut self,
        base_valid: &Collection<V::Record>,
    ) -> Result<(Collection<V::Record>, Option<Collection<V::Record>>), ValidationError> {
        let Some(validation) = self
            .rules
            .validation_for_notification_type(self.notification_type)?
        else {
            return Ok((base_valid.clone(), None));
        };

        let passed = validation.apply(base_valid)?;
        let valid = base_valid.retain_ids(&passed.ids());
        let rejected = base_valid.subtract(&valid);

        self.ledger.record(
            V::TYPE_VALIDATION_REJECTION_REASON,
            validation.details(),
            rejected.ids(),
        );

        Ok((valid, Some(rejected)))
    }
}
