use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::notifications::domain::{
    FamilyRecord, NotificationType, PolicyRecord, PolicyStage, PolicyStatus, RecordId,
};
use crate::notifications::providers::{DeliveryError, NotificationProvider};
use crate::notifications::repository::{NotificationTracker, PolicyRepository, RepositoryError};
use crate::notifications::store::InMemoryPolicyStore;
use crate::notifications::templates::DefaultNotificationTemplates;
use crate::notifications::triggers::TriggerWindows;
use crate::notifications::NotificationDispatcher;

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date")
}

pub(super) fn now() -> NaiveDateTime {
    today().and_hms_opt(8, 30, 0).expect("valid time")
}

pub(super) fn phone(id: u64) -> String {
    format!("+2557000000{id:02}")
}

pub(super) fn family(id: u64) -> FamilyRecord {
    FamilyRecord {
        id: RecordId(1000 + id),
        head_name: format!("Head of family {id}"),
        phone: Some(phone(id)),
        approval_of_notification: true,
        language: "en".to_string(),
        archived: false,
    }
}

/// Active policy expiring today.
pub(super) fn policy(id: u64) -> PolicyRecord {
    PolicyRecord {
        id: RecordId(id),
        family: family(id),
        product_code: "BASIC".to_string(),
        product_name: "Basic Health Cover".to_string(),
        status: PolicyStatus::Active,
        stage: PolicyStage::New,
        start_date: NaiveDate::from_ymd_opt(2025, 10, 20).expect("valid date"),
        effective_date: NaiveDate::from_ymd_opt(2025, 10, 20),
        expiry_date: today(),
    }
}

pub(super) fn policies(ids: &[u64]) -> Vec<PolicyRecord> {
    ids.iter().copied().map(policy).collect()
}

pub(super) fn ids(values: &[u64]) -> Vec<RecordId> {
    values.iter().copied().map(RecordId).collect()
}

pub(super) fn store_with(policies: Vec<PolicyRecord>) -> Arc<InMemoryPolicyStore> {
    Arc::new(InMemoryPolicyStore::new(policies))
}

pub(super) fn mark_sent(
    store: &InMemoryPolicyStore,
    policy: u64,
    notification_type: NotificationType,
) {
    store
        .mark_sent(
            RecordId(policy),
            notification_type,
            now() - chrono::Duration::days(1),
        )
        .expect("mark sent");
}

pub(super) fn dispatcher<R>(
    store: Arc<R>,
    providers: Vec<Arc<dyn NotificationProvider>>,
    enabled: Vec<NotificationType>,
) -> NotificationDispatcher<R, DefaultNotificationTemplates>
where
    R: PolicyRepository + NotificationTracker + 'static,
{
    NotificationDispatcher::new(
        store,
        Arc::new(DefaultNotificationTemplates),
        providers,
        enabled,
        TriggerWindows::default(),
    )
}

/// Provider double recording deliveries and failing on demand.
#[derive(Debug)]
pub(super) struct RecordingProvider {
    name: String,
    failing: BTreeSet<String>,
    unavailable: bool,
    attempts: AtomicUsize,
    deliveries: Mutex<Vec<(String, String)>>,
}

impl RecordingProvider {
    pub(super) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            failing: BTreeSet::new(),
            unavailable: false,
            attempts: AtomicUsize::new(0),
            deliveries: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn failing_for(mut self, destination: String) -> Self {
        self.failing.insert(destination);
        self
    }

    pub(super) fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub(super) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(super) fn destinations(&self) -> Vec<String> {
        self.deliveries
            .lock()
            .expect("delivery mutex poisoned")
            .iter()
            .map(|(destination, _)| destination.clone())
            .collect()
    }

    pub(super) fn messages(&self) -> Vec<String> {
        self.deliveries
            .lock()
            .expect("delivery mutex poisoned")
            .iter()
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl NotificationProvider for RecordingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, message: &str, destination: &str) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(DeliveryError::Unavailable("gateway offline".to_string()));
        }
        if self.failing.contains(destination) {
            return Err(DeliveryError::Rejected(format!("{destination} rejected")));
        }
        self.deliveries
            .lock()
            .expect("delivery mutex poisoned")
            .push((destination.to_string(), message.to_string()));
        Ok(())
    }
}

pub(super) fn as_providers(
    providers: &[Arc<RecordingProvider>],
) -> Vec<Arc<dyn NotificationProvider>> {
    providers
        .iter()
        .map(|provider| Arc::clone(provider) as Arc<dyn NotificationProvider>)
        .collect()
}

pub(super) struct UnavailableStore;

impl PolicyRepository for UnavailableStore {
    fn policies(&self) -> Result<Vec<PolicyRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn families(&self) -> Result<Vec<FamilyRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn renewal_of(&self, _policy: &PolicyRecord) -> Result<Option<RecordId>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

impl NotificationTracker for UnavailableStore {
    fn sent_at(
        &self,
        _policy: RecordId,
        _notification_type: NotificationType,
    ) -> Result<Option<NaiveDateTime>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn mark_sent(
        &self,
        _policy: RecordId,
        _notification_type: NotificationType,
        _at: NaiveDateTime,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
