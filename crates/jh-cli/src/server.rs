//! HTTP front end: trigger a fetch run and download its export.
//!
//! Exposes `POST /fetch-issues` (form field `project_key`) and
//! `GET /download-csv`. Responses are JSON except for the CSV download and
//! the form page at `GET /`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

use jh_core::{IssueTracker, ProjectKey};

use crate::pipeline::{RunSettings, run_project};

/// Shared state of all request handlers.
#[derive(Clone)]
pub struct AppState {
    tracker: Arc<dyn IssueTracker>,
    settings: Arc<RunSettings>,
    /// Export written by the most recent successful fetch.
    last_export: Arc<RwLock<Option<PathBuf>>>,
}

impl AppState {
    pub fn new(tracker: Arc<dyn IssueTracker>, settings: RunSettings) -> Self {
        Self {
            tracker,
            settings: Arc::new(settings),
            last_export: Arc::new(RwLock::new(None)),
        }
    }
}

/// Browser front end for the two endpoints.
const INDEX_HTML: &str = include_str!("index.html");

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/fetch-issues", post(fetch_issues))
        .route("/download-csv", get(download_csv))
        .with_state(state)
}

/// Binds `addr` and serves until Ctrl-C.
pub async fn serve(addr: &str, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for Ctrl-C");
        return;
    }
    tracing::info!("shutting down");
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[derive(Debug, Deserialize)]
struct FetchForm {
    #[serde(default)]
    project_key: Option<String>,
}

async fn fetch_issues(
    State(state): State<AppState>,
    form: Result<Form<FetchForm>, FormRejection>,
) -> Response {
    let raw = form
        .ok()
        .and_then(|Form(form)| form.project_key)
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty());
    let Some(raw) = raw else {
        return error_response(StatusCode::BAD_REQUEST, "Project key is required");
    };
    let project = match ProjectKey::new(raw) {
        Ok(project) => project,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    };

    match state.tracker.authenticate().await {
        Ok(user) => tracing::debug!(%user, "authenticated"),
        Err(err) => {
            tracing::error!(error = %err, "authentication failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("error authenticating with Jira: {err}"),
            );
        }
    }

    match run_project(state.tracker.as_ref(), &project, &state.settings).await {
        Ok(outcome) => {
            *state.last_export.write().await = Some(outcome.export_path.clone());
            tracing::info!(
                project = %project,
                rows = outcome.rows.len(),
                failed = outcome.report.failures.len(),
                "fetch completed"
            );
            Json(json!({
                "success": true,
                "data": outcome.rows,
                "message": format!("Successfully fetched {} issues", outcome.report.issues.len()),
                "failed_issues": outcome.report.failures,
            }))
            .into_response()
        }
        Err(err) => {
            let message = format!("{err:#}");
            tracing::error!(project = %project, error = %message, "fetch failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &message)
        }
    }
}

async fn download_csv(State(state): State<AppState>) -> Response {
    let Some(path) = state.last_export.read().await.clone() else {
        return error_response(StatusCode::NOT_FOUND, "No CSV file found");
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            (
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{filename}\""),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "export file disappeared");
            error_response(StatusCode::NOT_FOUND, "No CSV file found")
        }
        Err(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("failed to read {}: {err}", path.display()),
        ),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::pipeline::testing::{FakeTracker, settings};

    fn state(tracker: FakeTracker, dir: &std::path::Path) -> AppState {
        AppState::new(Arc::new(tracker), settings(dir))
    }

    fn fetch_request(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/fetch-issues")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn download_request() -> Request<Body> {
        Request::builder()
            .uri("/download-csv")
            .body(Body::empty())
            .unwrap()
    }

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    async fn send_json(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = send(state, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn index_serves_fetch_form() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(FakeTracker::sample(), dir.path());
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains(r#"name="project_key""#));
        assert!(html.contains("/fetch-issues"));
        assert!(html.contains("/download-csv"));
    }

    #[tokio::test]
    async fn missing_project_key_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(FakeTracker::sample(), dir.path());

        for body in ["", "project_key=", "project_key=%20%20"] {
            let (status, json) = send_json(&state, fetch_request(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json, json!({ "error": "Project key is required" }));
        }
    }

    #[tokio::test]
    async fn invalid_project_key_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(FakeTracker::sample(), dir.path());

        let (status, json) = send_json(&state, fetch_request("project_key=A%2BB")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "project key contains invalid character '+'");
    }

    #[tokio::test]
    async fn fetch_returns_rows_and_failures() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(FakeTracker::sample(), dir.path());

        let (status, json) = send_json(&state, fetch_request("project_key=ABC")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Successfully fetched 1 issues");
        assert_eq!(json["data"].as_array().unwrap().len(), 3);
        assert_eq!(json["data"][0]["field"], "created");
        assert_eq!(json["data"][0]["duration"], "24h0m0s");
        assert_eq!(json["data"][2]["duration"], "N/A");
        assert_eq!(json["failed_issues"][0]["issue_key"], "ABC-2");
    }

    #[tokio::test]
    async fn download_serves_latest_export() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(FakeTracker::sample(), dir.path());

        let (status, _) = send(&state, fetch_request("project_key=ABC")).await;
        assert_eq!(status, StatusCode::OK);

        let response = router(state.clone())
            .oneshot(download_request())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"All_Issues_History_ABC_"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let csv = String::from_utf8(body.to_vec()).unwrap();
        assert!(csv.starts_with("Issue Key,Summary,Assignee,"));
        assert_eq!(csv.lines().count(), 4);
    }

    #[tokio::test]
    async fn download_without_export_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(FakeTracker::sample(), dir.path());

        let (status, json) = send_json(&state, download_request()).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json, json!({ "error": "No CSV file found" }));
    }

    #[tokio::test]
    async fn rejected_credentials_are_server_errors() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = FakeTracker {
            user: None,
            ..FakeTracker::sample()
        };
        let state = state(tracker, dir.path());

        let (status, json) = send_json(&state, fetch_request("project_key=ABC")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json["error"],
            "error authenticating with Jira: tracker rejected credentials: Unauthorized"
        );
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn export_failure_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(FakeTracker::sample(), &dir.path().join("missing"));

        let (status, json) = send_json(&state, fetch_request("project_key=ABC")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let error = json["error"].as_str().unwrap();
        assert!(error.starts_with("error exporting to CSV: failed to create"));

        let (status, _) = send(&state, download_request()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
