//! Request handlers

use axum::{
    extract::{rejection::FormRejection, rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::AppState;
use crate::error::{Error, Result};
use crate::executor::TaskId;
use crate::transcription::{submit_job, TranscriptionJob};

const FORM_PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>transcribe4all</title>
  </head>
  <body>
    <form action="/add_job" method="POST">
      <div>URL: <input type="url" name="AudioURL" required></div>
      <div>Email Addresses: <input type="email" name="EmailAddresses" multiple required></div>
      <div><input type="submit" value="Submit"></div>
    </form>
  </body>
</html>
"#;

/// Fields posted by the submission form
#[derive(Debug, Deserialize)]
pub struct JobForm {
    #[serde(rename = "AudioURL")]
    audio_url: String,

    /// Comma-separated, as sent by a `multiple` e-mail input
    #[serde(rename = "EmailAddresses", default)]
    email_addresses: String,
}

pub async fn form_page() -> Html<&'static str> {
    Html(FORM_PAGE)
}

pub async fn health(State(state): State<AppState>) -> &'static str {
    let summary = state.executor.summary();
    debug!(
        in_progress = summary.in_progress,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Health check"
    );
    "healthy!"
}

pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.executor.summary())
}

/// Queue a job from the HTML form and redirect to its status page
pub async fn add_job(
    State(state): State<AppState>,
    form: std::result::Result<Form<JobForm>, FormRejection>,
) -> Result<Redirect> {
    let Form(form) = form.map_err(|e| Error::InvalidRequest(e.body_text()))?;
    let job = TranscriptionJob::from_address_list(form.audio_url, &form.email_addresses);

    let id = submit_job(&state.executor, job, state.pipeline.clone())?;
    info!(task_id = %id, "Accepted job from form");

    Ok(Redirect::to(&format!("/job_status/{}", id)))
}

/// Queue a job from a JSON body
pub async fn create_job(
    State(state): State<AppState>,
    body: std::result::Result<Json<TranscriptionJob>, JsonRejection>,
) -> Response {
    let job = match body {
        Ok(Json(job)) => job,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, e.body_text()),
    };

    match submit_job(&state.executor, job, state.pipeline.clone()) {
        Ok(id) => {
            info!(task_id = %id, "Accepted job from API");
            (StatusCode::ACCEPTED, Json(json!({ "id": id }))).into_response()
        }
        Err(e) => json_error(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

/// Plain-text status of a job
pub async fn job_status(State(state): State<AppState>, Path(raw): Path<String>) -> Result<Response> {
    let id = parse_id(&raw)?;
    let status = state.executor.task_status(&id)?;

    Ok(([(header::CACHE_CONTROL, "no-store")], status.as_str()).into_response())
}

/// JSON snapshot of a job's record
pub async fn job_record(State(state): State<AppState>, Path(raw): Path<String>) -> Response {
    let id = match parse_id(&raw) {
        Ok(id) => id,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match state.executor.task_record(&id) {
        Ok(record) => Json(json!({ "id": id, "record": record })).into_response(),
        Err(e) => json_error(StatusCode::NOT_FOUND, e.to_string()),
    }
}

fn parse_id(raw: &str) -> Result<TaskId> {
    raw.parse()
        .map_err(|_| Error::InvalidRequest(format!("'{}' is not a task id", raw)))
}

fn json_error(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
