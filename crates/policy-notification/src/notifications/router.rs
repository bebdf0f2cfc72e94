use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::dispatcher::{DispatchError, NotificationDispatcher};
use super::domain::NotificationType;
use super::repository::{NotificationTracker, PolicyRepository};
use super::templates::TemplateSource;

/// Which record kind an eligibility preview is computed for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewSubject {
    #[default]
    Policies,
    Families,
}

#[derive(Debug, Deserialize)]
pub struct EligibilityRequest {
    pub notification_type: NotificationType,
    #[serde(default)]
    pub today: Option<NaiveDate>,
    #[serde(default)]
    pub subject: PreviewSubject,
}

#[derive(Debug, Default, Deserialize)]
pub struct DispatchRequest {
    #[serde(default)]
    pub now: Option<NaiveDateTime>,
}

/// Router builder exposing eligibility previews and on-demand dispatch runs.
pub fn notification_router<R, T>(dispatcher: Arc<NotificationDispatcher<R, T>>) -> Router
where
    R: PolicyRepository + NotificationTracker + 'static,
    T: TemplateSource + 'static,
{
    Router::new()
        .route(
            "/api/v1/notifications/eligibility",
            post(eligibility_handler::<R, T>),
        )
        .route(
            "/api/v1/notifications/dispatch",
            post(dispatch_handler::<R, T>),
        )
        .with_state(dispatcher)
}

pub(crate) async fn eligibility_handler<R, T>(
    State(dispatcher): State<Arc<NotificationDispatcher<R, T>>>,
    Json(request): Json<EligibilityRequest>,
) -> Response
where
    R: PolicyRepository + NotificationTracker + 'static,
    T: TemplateSource + 'static,
{
    let today = request
        .today
        .unwrap_or_else(|| Local::now().date_naive());
    let preview = tokio::task::spawn_blocking(move || match request.subject {
        PreviewSubject::Policies => dispatcher.preview(request.notification_type, today),
        PreviewSubject::Families => dispatcher.preview_families(request.notification_type),
    })
    .await;

    match preview {
        Ok(Ok(preview)) => (StatusCode::OK, Json(preview)).into_response(),
        Ok(Err(err)) => error_response(err),
        Err(err) => join_error_response(err),
    }
}

pub(crate) async fn dispatch_handler<R, T>(
    State(dispatcher): State<Arc<NotificationDispatcher<R, T>>>,
    Json(request): Json<DispatchRequest>,
) -> Response
where
    R: PolicyRepository + NotificationTracker + 'static,
    T: TemplateSource + 'static,
{
    let now = request.now.unwrap_or_else(|| Local::now().naive_local());
    // delivery writes files and locks the store
    match tokio::task::spawn_blocking(move || dispatcher.dispatch(now)).await {
        Ok(Ok(report)) => (StatusCode::OK, Json(report)).into_response(),
        Ok(Err(err)) => error_response(err),
        Err(err) => join_error_response(err),
    }
}

fn error_response(err: DispatchError) -> Response {
    let status = match err {
        DispatchError::Repository(_) => StatusCode::SERVICE_UNAVAILABLE,
        DispatchError::Validation(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": err.to_string() });
    (status, Json(payload)).into_response()
}

fn join_error_response(err: tokio::task::JoinError) -> Response {
    error!(error = %err, "notification task did not complete");
    let payload = json!({ "error": "notification task did not complete" });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}
