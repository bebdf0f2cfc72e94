use std::collections::BTreeSet;

use serde::Serialize;
use tracing::error;

use super::ValidationError;
use crate::notifications::collection::Collection;
use crate::notifications::domain::{Identified, RecordId};

/// Integer code explaining why a record was not eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RejectionReason(pub u16);

impl RejectionReason {
    pub const UNASSIGNED: RejectionReason = RejectionReason(0);

    pub const fn is_assigned(self) -> bool {
        self.0 != Self::UNASSIGNED.0
    }
}

/// Ineligible record stamped with the reason and detail recorded for its id.
#[derive(Debug, Clone, PartialEq)]
pub struct IneligibleEntry<'a, T> {
    pub record: &'a T,
    pub rejection_reason: RejectionReason,
    pub rejection_details: String,
}

/// Keeps, for one validator, which ids were rejected under which reason and
/// detail.
///
/// Both maps are kept in insertion order. When an id was recorded under more
/// than one reason (or detail) the earliest entry wins, which makes the base
/// phase take precedence over the type-specific one.
#[derive(Debug, Clone, Default)]
pub struct RejectionLedger {
    reasons: Vec<(RejectionReason, BTreeSet<RecordId>)>,
    details: Vec<(String, BTreeSet<RecordId>)>,
}

impl RejectionLedger {
    pub fn record<I>(&mut self, reason: RejectionReason, detail: &str, ids: I)
    where
        I: IntoIterator<Item = RecordId>,
    {
        let ids: BTreeSet<RecordId> = ids.into_iter().collect();
        if ids.is_empty() {
            return;
        }

        match self.reasons.iter_mut().find(|(known, _)| *known == reason) {
            Some((_, known_ids)) => known_ids.extend(ids.iter().copied()),
            None => self.reasons.push((reason, ids.clone())),
        }

        match self.details.iter_mut().find(|(known, _)| known.as_str() == detail) {
            Some((_, known_ids)) => known_ids.extend(ids),
            None => self.details.push((detail.to_string(), ids)),
        }
    }

    pub fn clear(&mut self) {
        self.reasons.clear();
        self.details.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }

    pub fn reasons(&self) -> impl Iterator<Item = (RejectionReason, &BTreeSet<RecordId>)> {
        self.reasons.iter().map(|(reason, ids)| (*reason, ids))
    }

    pub fn details(&self) -> impl Iterator<Item = (&str, &BTreeSet<RecordId>)> {
        self.details.iter().map(|(detail, ids)| (detail.as_str(), ids))
    }

    pub fn reason_for(&self, id: RecordId) -> RejectionReason {
        self.reasons
            .iter()
            .find(|(_, ids)| ids.contains(&id))
            .map(|(reason, _)| *reason)
            .unwrap_or(RejectionReason::UNASSIGNED)
    }

    pub fn details_for(&self, id: RecordId) -> &str {
        self.details
            .iter()
            .find(|(_, ids)| ids.contains(&id))
            .map(|(detail, _)| detail.as_str())
            .unwrap_or("")
    }

    /// Stamp every record of `ineligible` with its recorded reason and detail.
    ///
    /// Fails when any record ends up without an assigned reason, which means
    /// the ledger and the ineligible partition went out of sync.
    pub fn annotate<'a, T: Identified>(
        &self,
        ineligible: &'a Collection<T>,
    ) -> Result<Vec<IneligibleEntry<'a, T>>, ValidationError> {
        let entries: Vec<IneligibleEntry<'a, T>> = ineligible
            .iter()
            .map(|record| {
                let id = record.record_id();
                IneligibleEntry {
                    record,
                    rejection_reason: self.reason_for(id),
                    rejection_details: self.details_for(id).to_string(),
                }
            })
            .collect();

        let tagged = entries
            .iter()
            .filter(|entry| entry.rejection_reason.is_assigned())
            .count();
        if tagged != entries.len() {
            error!(
                tagged,
                total = entries.len(),
                "ineligible records without a rejection reason"
            );
            return Err(ValidationError::InconsistentLedger {
                tagged,
                total: entries.len(),
            });
        }

        Ok(entries)
    }
}
