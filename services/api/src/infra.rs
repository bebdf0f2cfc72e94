use chrono::{NaiveDate, NaiveDateTime};
use metrics_exporter_prometheus::PrometheusHandle;
use policy_notification::config::{AppConfig, ModuleConfig};
use policy_notification::error::AppError;
use policy_notification::notifications::{
    build_providers, import_policies_from_path, DefaultNotificationTemplates,
    InMemoryPolicyStore, NotificationDispatcher, NotificationTracker,
};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) type PolicyDispatcher =
    NotificationDispatcher<InMemoryPolicyStore, DefaultNotificationTemplates>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Loads the policy export into a fresh store. Notifications listed as
/// already delivered are stamped with `seeded_at`.
pub(crate) fn load_store(
    policies: Option<PathBuf>,
    module: &ModuleConfig,
    seeded_at: NaiveDateTime,
) -> Result<InMemoryPolicyStore, AppError> {
    let Some(path) = policies else {
        warn!("no policy export configured, starting with an empty store");
        return Ok(InMemoryPolicyStore::default());
    };

    let imported = import_policies_from_path(&path, &module.default_notification_data)?;
    let store = InMemoryPolicyStore::new(imported.policies);
    for (policy, notification_type) in imported.notified {
        store.mark_sent(policy, notification_type, seeded_at)?;
    }

    info!(path = %path.display(), "policy export loaded");
    Ok(store)
}

/// Dispatcher over the configured module settings and policy export.
/// An explicit `policies` path takes precedence over the environment.
pub(crate) fn build_dispatcher(
    config: &AppConfig,
    policies: Option<PathBuf>,
    module_config: Option<PathBuf>,
    seeded_at: NaiveDateTime,
) -> Result<PolicyDispatcher, AppError> {
    let module = match module_config {
        Some(path) => ModuleConfig::from_path(&path)?,
        None => config.module_config()?,
    };
    let policies = policies.or_else(|| config.notifications.policies_csv.clone());
    let store = load_store(policies, &module, seeded_at)?;

    Ok(NotificationDispatcher::new(
        Arc::new(store),
        Arc::new(DefaultNotificationTemplates),
        build_providers(&module.providers),
        module.enabled_notification_types(),
        module.trigger_windows,
    ))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_datetime(raw: &str) -> Result<NaiveDateTime, String> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DDTHH:MM:SS ({err})"))
}
