use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use chrono::NaiveDateTime;

use super::domain::{FamilyRecord, NotificationType, PolicyRecord, PolicyStage, RecordId};
use super::repository::{NotificationTracker, PolicyRepository, RepositoryError};

/// Process-local policy store used by the CLI, the HTTP service and tests.
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    policies: Mutex<BTreeMap<RecordId, PolicyRecord>>,
    sent: Mutex<HashMap<(RecordId, NotificationType), NaiveDateTime>>,
}

impl InMemoryPolicyStore {
    pub fn new(policies: impl IntoIterator<Item = PolicyRecord>) -> Self {
        let policies = policies
            .into_iter()
            .map(|policy| (policy.id, policy))
            .collect();
        Self {
            policies: Mutex::new(policies),
            sent: Mutex::new(HashMap::new()),
        }
    }

    pub fn upsert(&self, policy: PolicyRecord) -> Result<(), RepositoryError> {
        self.policies
            .lock()
            .map_err(|_| poisoned())?
            .insert(policy.id, policy);
        Ok(())
    }

    pub fn sent_notifications(
        &self,
    ) -> Result<Vec<(RecordId, NotificationType, NaiveDateTime)>, RepositoryError> {
        let guard = self.sent.lock().map_err(|_| poisoned())?;
        let mut entries: Vec<_> = guard
            .iter()
            .map(|(&(policy, kind), &at)| (policy, kind, at))
            .collect();
        entries.sort();
        Ok(entries)
    }
}

fn poisoned() -> RepositoryError {
    RepositoryError::Unavailable("policy store mutex poisoned".to_string())
}

impl PolicyRepository for InMemoryPolicyStore {
    fn policies(&self) -> Result<Vec<PolicyRecord>, RepositoryError> {
        let guard = self.policies.lock().map_err(|_| poisoned())?;
        Ok(guard.values().cloned().collect())
    }

    fn families(&self) -> Result<Vec<FamilyRecord>, RepositoryError> {
        let guard = self.policies.lock().map_err(|_| poisoned())?;
        let mut families = BTreeMap::new();
        for policy in guard.values() {
            families
                .entry(policy.family.id)
                .or_insert_with(|| policy.family.clone());
        }
        Ok(families.into_values().collect())
    }

    fn renewal_of(&self, policy: &PolicyRecord) -> Result<Option<RecordId>, RepositoryError> {
        let guard = self.policies.lock().map_err(|_| poisoned())?;
        Ok(guard
            .values()
            .find(|candidate| {
                candidate.id != policy.id
                    && candidate.stage == PolicyStage::Renewal
                    && candidate.family.id == policy.family.id
                    && candidate.product_code == policy.product_code
                    && candidate.start_date > policy.start_date
            })
            .map(|renewal| renewal.id))
    }
}

impl NotificationTracker for InMemoryPolicyStore {
    fn sent_at(
        &self,
        policy: RecordId,
        notification_type: NotificationType,
    ) -> Result<Option<NaiveDateTime>, RepositoryError> {
        let guard = self.sent.lock().map_err(|_| poisoned())?;
        Ok(guard.get(&(policy, notification_type)).copied())
    }

    fn mark_sent(
        &self,
        policy: RecordId,
        notification_type: NotificationType,
        at: NaiveDateTime,
    ) -> Result<(), RepositoryError> {
        if !self
            .policies
            .lock()
            .map_err(|_| poisoned())?
            .contains_key(&policy)
        {
            return Err(RepositoryError::NotFound(policy));
        }
        self.sent
            .lock()
            .map_err(|_| poisoned())?
            .insert((policy, notification_type), at);
        Ok(())
    }
}
