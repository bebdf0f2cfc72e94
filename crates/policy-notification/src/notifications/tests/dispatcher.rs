use std::sync::Arc;

use super::common::*;
use crate::notifications::domain::{NotificationType, PolicyStatus, RecordId};
use crate::notifications::repository::NotificationTracker;

#[test]
fn delivers_to_eligible_policies_and_reports_failures() {
    let mut records = policies(&[1, 2, 3, 4]);
    records[2].family.approval_of_notification = false;
    let store = store_with(records);
    let provider = Arc::new(RecordingProvider::new("sms").failing_for(phone(2)));
    let dispatcher = dispatcher(
        Arc::clone(&store),
        as_providers(&[Arc::clone(&provider)]),
        vec![NotificationType::ExpirationOfPolicy],
    );

    let report = dispatcher.dispatch(now()).expect("dispatch succeeds");

    assert_eq!(report.types.len(), 1);
    let expiration = &report.types[0];
    assert_eq!(expiration.candidates, 4);
    assert_eq!(expiration.sent, ids(&[1, 4]));
    assert_eq!(expiration.failed.len(), 1);
    assert_eq!(expiration.failed[0].record_id, RecordId(2));
    assert!(expiration.failed[0].errors[0].starts_with("sms:"));
    assert_eq!(expiration.ineligible.len(), 1);
    assert_eq!(expiration.ineligible[0].record_id, RecordId(3));
    assert_eq!(expiration.ineligible[0].rejection_reason, 1);

    assert_eq!(provider.destinations(), vec![phone(1), phone(4)]);
    assert!(provider.messages()[0].contains("expires today, 19-10-2026"));

    let sent_at = |id| {
        store
            .sent_at(RecordId(id), NotificationType::ExpirationOfPolicy)
            .expect("tracker readable")
    };
    assert_eq!(sent_at(1), Some(now()));
    assert_eq!(sent_at(2), None);
    assert_eq!(sent_at(4), Some(now()));
    assert!(report.unavailable_providers.is_empty());
}

#[test]
fn second_run_does_not_resend() {
    let store = store_with(policies(&[1, 2]));
    let provider = Arc::new(RecordingProvider::new("sms"));
    let dispatcher = dispatcher(
        store,
        as_providers(&[Arc::clone(&provider)]),
        vec![NotificationType::ExpirationOfPolicy],
    );

    let first = dispatcher.dispatch(now()).expect("first run");
    let second = dispatcher.dispatch(now()).expect("second run");

    assert_eq!(first.sent_count(), 2);
    assert_eq!(second.sent_count(), 0);
    assert_eq!(second.types[0].ineligible.len(), 2);
    assert_eq!(provider.attempts(), 2);
}

#[test]
fn unavailable_provider_is_skipped_for_the_rest_of_the_run() {
    let store = store_with(policies(&[1, 2, 3]));
    let offline = Arc::new(RecordingProvider::new("gateway").unavailable());
    let text = Arc::new(RecordingProvider::new("text"));
    let dispatcher = dispatcher(
        store,
        as_providers(&[Arc::clone(&offline), Arc::clone(&text)]),
        vec![NotificationType::ExpirationOfPolicy],
    );

    let report = dispatcher.dispatch(now()).expect("dispatch succeeds");

    assert_eq!(offline.attempts(), 1);
    assert_eq!(text.attempts(), 3);
    assert_eq!(report.types[0].sent, ids(&[1, 2, 3]));
    assert_eq!(report.unavailable_providers, vec!["gateway".to_string()]);
}

#[test]
fn only_enabled_types_are_dispatched() {
    let mut records = policies(&[1, 2]);
    records[1].start_date = today();
    let store = store_with(records);
    let provider = Arc::new(RecordingProvider::new("sms"));
    let dispatcher = dispatcher(
        Arc::clone(&store),
        as_providers(&[Arc::clone(&provider)]),
        vec![NotificationType::StartingOfPolicy],
    );

    let report = dispatcher.dispatch(now()).expect("dispatch succeeds");

    assert_eq!(report.types.len(), 1);
    assert_eq!(report.types[0].notification_type, NotificationType::StartingOfPolicy);
    assert_eq!(report.types[0].sent, ids(&[2]));
    let recorded: Vec<_> = store
        .sent_notifications()
        .expect("tracker readable")
        .into_iter()
        .map(|(policy, kind, _)| (policy, kind))
        .collect();
    assert_eq!(
        recorded,
        vec![(RecordId(2), NotificationType::StartingOfPolicy)]
    );
}

#[test]
fn without_providers_every_eligible_policy_fails() {
    let store = store_with(policies(&[1, 2]));
    let dispatcher = dispatcher(
        Arc::clone(&store),
        Vec::new(),
        vec![NotificationType::ExpirationOfPolicy],
    );

    let report = dispatcher.dispatch(now()).expect("dispatch succeeds");

    assert_eq!(report.sent_count(), 0);
    assert_eq!(report.failed_count(), 2);
    assert_eq!(report.types[0].failed[0].errors, vec!["no provider available"]);
    assert!(store.sent_notifications().expect("tracker readable").is_empty());
}

#[test]
fn preview_reports_without_delivering() {
    let mut records = policies(&[1, 2]);
    records[1].status = PolicyStatus::Idle;
    records[1].effective_date = Some(today());
    records[0].effective_date = Some(today());
    let store = store_with(records);
    let provider = Arc::new(RecordingProvider::new("sms"));
    let dispatcher = dispatcher(
        Arc::clone(&store),
        as_providers(&[Arc::clone(&provider)]),
        vec![NotificationType::ActivationOfPolicy],
    );

    let preview = dispatcher
        .preview(NotificationType::ActivationOfPolicy, today())
        .expect("preview succeeds");

    // only active policies are detected as activated today
    assert_eq!(preview.eligible, ids(&[1]));
    assert!(preview.ineligible.is_empty());
    assert_eq!(provider.attempts(), 0);
    assert!(store.sent_notifications().expect("tracker readable").is_empty());
}

#[test]
fn repository_outage_aborts_the_run() {
    let dispatcher = dispatcher(
        Arc::new(UnavailableStore),
        Vec::new(),
        vec![NotificationType::ExpirationOfPolicy],
    );

    let err = dispatcher.dispatch(now()).expect_err("store offline");
    assert!(err.to_string().contains("database offline"));
}
