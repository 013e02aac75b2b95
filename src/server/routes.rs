//! Route handlers

use axum::{
    extract::{Query, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::controller::{Controller, ControllerError};
use crate::severity::Severity;
use crate::state::{ConfigFields, LogPage, RuntimeConfig, Status};

/// Full dashboard view
#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub status: Status,
    pub config: RuntimeConfig,
    pub logs: LogPage,
}

/// Configuration plus the outcome of the last edit
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub config: RuntimeConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    #[serde(rename = "LoadNext")]
    load_next: u64,
}

/// Build the dashboard router
pub fn router(controller: Controller) -> Router {
    Router::new()
        .route("/", get(index).fallback(unsupported))
        .route("/status", get(status).fallback(unsupported))
        .route("/logs", get(logs).fallback(unsupported))
        .route(
            "/config",
            get(show_config).put(update_config).fallback(unsupported),
        )
        .route(
            "/config/edit",
            get(show_config).delete(reset_config).fallback(unsupported),
        )
        .fallback(unsupported)
        .with_state(controller)
}

fn unavailable(err: ControllerError) -> Response {
    error!(error = %err, "Request failed");
    StatusCode::SERVICE_UNAVAILABLE.into_response()
}

/// GET /
async fn index(State(controller): State<Controller>) -> Response {
    match controller.get_snapshot().await {
        Ok(snapshot) => {
            let logs = snapshot.filter_logs_from(0);
            Json(DashboardView {
                status: snapshot.status,
                config: snapshot.config,
                logs,
            })
            .into_response()
        }
        Err(e) => unavailable(e),
    }
}

/// GET /status
async fn status(State(controller): State<Controller>) -> Response {
    match controller.get_snapshot().await {
        Ok(snapshot) => Json(snapshot.status).into_response(),
        Err(e) => unavailable(e),
    }
}

/// GET /logs?LoadNext=<n>
///
/// Returns entries the caller has not seen yet. `LoadNext` is unsigned, so
/// a missing, non-numeric or negative value is rejected with 400 by the
/// extractor.
async fn logs(State(controller): State<Controller>, Query(query): Query<LogsQuery>) -> Response {
    match controller.get_snapshot().await {
        Ok(snapshot) => Json(snapshot.filter_logs_from(query.load_next)).into_response(),
        Err(e) => unavailable(e),
    }
}

/// GET /config and GET /config/edit
async fn show_config(State(controller): State<Controller>) -> Response {
    match controller.get_snapshot().await {
        Ok(snapshot) => Json(ConfigResponse {
            config: snapshot.config,
            error: None,
        })
        .into_response(),
        Err(e) => unavailable(e),
    }
}

/// PUT /config
///
/// Form fields `LogSeverity` and `StatusUpdatePeriod`. A repeated key keeps
/// every value in arrival order and only the first one is used. A rejected
/// edit answers 422 with the configuration as it now stands, so the
/// submitted values can be corrected.
async fn update_config(
    State(controller): State<Controller>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response {
    let mut fields = ConfigFields::new();
    for (key, value) in pairs {
        fields.entry(key).or_default().push(value);
    }

    let (code, error) = match controller.submit_config_update(fields).await {
        Ok(()) => (StatusCode::OK, None),
        Err(ControllerError::Config(e)) => {
            (StatusCode::UNPROCESSABLE_ENTITY, Some(e.to_string()))
        }
        Err(e) => return unavailable(e),
    };

    match controller.get_snapshot().await {
        Ok(snapshot) => (
            code,
            Json(ConfigResponse {
                config: snapshot.config,
                error,
            }),
        )
            .into_response(),
        Err(e) => unavailable(e),
    }
}

/// DELETE /config/edit
async fn reset_config(State(controller): State<Controller>) -> Response {
    if let Err(e) = controller.reset_config().await {
        return unavailable(e);
    }
    show_config(State(controller)).await
}

/// Anything else
async fn unsupported(State(controller): State<Controller>, method: Method, uri: Uri) -> StatusCode {
    let message = format!(
        "Unsupported request with Method '{}' to URL '{}'",
        method,
        uri.path()
    );
    warn!("{}", message);
    controller.log(Severity::Error, message);
    StatusCode::NOT_FOUND
}
