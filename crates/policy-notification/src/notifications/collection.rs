use std::collections::BTreeSet;
use std::sync::Arc;

use super::domain::{Identified, RecordId};

/// Read-only view over a shared set of candidate records.
///
/// Narrowing operations only produce a new selection of positions into the
/// same source, so records are never copied while a validation run filters
/// them. Two collections derived from the same source compare records by
/// [`RecordId`], never by value.
#[derive(Debug)]
pub struct Collection<T> {
    source: Arc<[T]>,
    selection: Vec<usize>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            selection: self.selection.clone(),
        }
    }
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self::from_records(Vec::new())
    }
}

impl<T> FromIterator<T> for Collection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_records(iter.into_iter().collect())
    }
}

impl<T> Collection<T> {
    pub fn from_records(records: Vec<T>) -> Self {
        let selection = (0..records.len()).collect();
        Self {
            source: Arc::from(records),
            selection,
        }
    }

    pub fn count(&self) -> usize {
        self.selection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selection.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.selection.iter().map(|&position| &self.source[position])
    }

    /// Empty selection over the same source.
    pub fn none(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            selection: Vec::new(),
        }
    }

    pub fn filter<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&T) -> bool,
    {
        let selection = self
            .selection
            .iter()
            .copied()
            .filter(|&position| predicate(&self.source[position]))
            .collect();
        Self {
            source: Arc::clone(&self.source),
            selection,
        }
    }

    /// Like [`Collection::filter`] but stops at the first predicate error.
    pub fn try_filter<F, E>(&self, mut predicate: F) -> Result<Self, E>
    where
        F: FnMut(&T) -> Result<bool, E>,
    {
        let mut selection = Vec::with_capacity(self.selection.len());
        for &position in &self.selection {
            if predicate(&self.source[position])? {
                selection.push(position);
            }
        }
        Ok(Self {
            source: Arc::clone(&self.source),
            selection,
        })
    }

    fn shares_source(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.source, &other.source)
    }
}

impl<T: Identified> Collection<T> {
    pub fn ids(&self) -> BTreeSet<RecordId> {
        self.iter().map(Identified::record_id).collect()
    }

    pub fn contains_id(&self, id: RecordId) -> bool {
        self.iter().any(|record| record.record_id() == id)
    }

    pub fn retain_ids(&self, ids: &BTreeSet<RecordId>) -> Self {
        self.filter(|record| ids.contains(&record.record_id()))
    }

    pub fn exclude_ids(&self, ids: &BTreeSet<RecordId>) -> Self {
        self.filter(|record| !ids.contains(&record.record_id()))
    }

    /// Records of `self` whose id does not appear in `other`.
    pub fn subtract(&self, other: &Self) -> Self {
        self.exclude_ids(&other.ids())
    }
}

impl<T: Identified + Clone> Collection<T> {
    /// Records of `self` followed by the records of `other` with unseen ids.
    pub fn union(&self, other: &Self) -> Self {
        let seen = self.ids();

        if self.shares_source(other) {
            let mut selection = self.selection.clone();
            selection.extend(
                other
                    .selection
                    .iter()
                    .copied()
                    .filter(|&position| !seen.contains(&other.source[position].record_id())),
            );
            return Self {
                source: Arc::clone(&self.source),
                selection,
            };
        }

        let mut records: Vec<T> = self.iter().cloned().collect();
        records.extend(
            other
                .iter()
                .filter(|record| !seen.contains(&record.record_id()))
                .cloned(),
        );
        Self::from_records(records)
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}
