//! Route table

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::{handlers, AppState};

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // ========== Form ==========
        .route("/", get(handlers::form_page))
        .route("/add_job", post(handlers::add_job))
        .route("/job_status/:id", get(handlers::job_status))
        // ========== JSON API ==========
        .route("/api/jobs", post(handlers::create_job))
        .route("/api/jobs/:id", get(handlers::job_record))
        .route("/api/stats", get(handlers::stats))
        // ========== Health ==========
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{TaskExecutor, TaskId, TaskStatus};
    use crate::transcription::{FfmpegConverter, PipelineContext};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use std::sync::{mpsc, Arc};
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_state(work: &TempDir) -> AppState {
        let pipeline = PipelineContext::new(
            reqwest::Client::new(),
            Arc::new(FfmpegConverter::new("ffmpeg")),
            work.path(),
        );
        AppState::new(TaskExecutor::new(), pipeline)
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let work = TempDir::new().unwrap();
        let response = create_router(test_state(&work)).oneshot(get("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "healthy!");
    }

    #[tokio::test]
    async fn test_form_page() {
        let work = TempDir::new().unwrap();
        let response = create_router(test_state(&work)).oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains(r#"action="/add_job""#));
        assert!(body.contains(r#"name="EmailAddresses""#));
    }

    #[tokio::test]
    async fn test_job_status_reports_each_state() {
        let work = TempDir::new().unwrap();
        let state = test_state(&work);
        let executor = state.executor.clone();
        let app = create_router(state);

        let (tx, rx) = mpsc::channel::<()>();
        let blocked = executor.queue_task(move || rx.recv().map_err(|e| e.to_string()));
        let failed = executor.queue_task(|| Err::<(), _>("bad input"));

        let response = app.clone().oneshot(get(&format!("/job_status/{}", blocked))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "INPROGRESS");

        tx.send(()).unwrap();
        executor.wait_for(&blocked, Duration::from_millis(1)).await.unwrap();
        executor.wait_for(&failed, Duration::from_millis(1)).await.unwrap();

        let response = app.clone().oneshot(get(&format!("/job_status/{}", blocked))).await.unwrap();
        assert_eq!(body_text(response).await, "SUCCESS");

        let response = app.oneshot(get(&format!("/job_status/{}", failed))).await.unwrap();
        assert_eq!(body_text(response).await, "FAILURE");
    }

    #[tokio::test]
    async fn test_job_status_unknown_and_malformed_ids() {
        let work = TempDir::new().unwrap();
        let app = create_router(test_state(&work));

        let response = app.clone().oneshot(get(&format!("/job_status/{}", TaskId::new()))).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(get("/job_status/42")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_add_job_redirects_to_status() {
        let work = TempDir::new().unwrap();
        let state = test_state(&work);
        let executor = state.executor.clone();
        let app = create_router(state);

        let request = Request::builder()
            .method("POST")
            .uri("/add_job")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(
                "AudioURL=http%3A%2F%2F127.0.0.1%3A9%2Fep1.mp3&EmailAddresses=a%40example.org%2Cb%40example.org",
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        let id: TaskId = location.strip_prefix("/job_status/").unwrap().parse().unwrap();
        assert!(executor.task_status(&id).is_ok());
    }

    #[tokio::test]
    async fn test_add_job_rejects_invalid_form() {
        let work = TempDir::new().unwrap();
        let state = test_state(&work);
        let executor = state.executor.clone();
        let app = create_router(state);

        let request = Request::builder()
            .method("POST")
            .uri("/add_job")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("AudioURL=https%3A%2F%2Fexample.org%2Fa.mp3&EmailAddresses="))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(executor.summary().total(), 0);
    }

    #[tokio::test]
    async fn test_api_create_and_fetch_job() {
        let work = TempDir::new().unwrap();
        let app = create_router(test_state(&work));

        let request = Request::builder()
            .method("POST")
            .uri("/api/jobs")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"audioURL":"http://127.0.0.1:9/ep1.mp3","emailAddresses":["a@example.org"]}"#,
            ))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let created: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        let id = created["id"].as_str().unwrap().to_string();

        let response = app.oneshot(get(&format!("/api/jobs/{}", id))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(fetched["id"], id.as_str());
        let status = fetched["record"]["status"].as_str().unwrap();
        assert!(["INPROGRESS", "FAILURE"].contains(&status), "{}", status);
    }

    #[tokio::test]
    async fn test_api_rejects_bad_body() {
        let work = TempDir::new().unwrap();
        let app = create_router(test_state(&work));

        let request = Request::builder()
            .method("POST")
            .uri("/api/jobs")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"audioURL":"http://example.org/a.mp3"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_stats_counts_tasks() {
        let work = TempDir::new().unwrap();
        let state = test_state(&work);
        let executor = state.executor.clone();
        let app = create_router(state);

        let id = executor.queue_task(|| Ok::<(), String>(()));
        assert_eq!(
            executor.wait_for(&id, Duration::from_millis(1)).await,
            Ok(TaskStatus::Success)
        );

        let response = app.oneshot(get("/api/stats")).await.unwrap();
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["succeeded"], 1);
        assert_eq!(body["in_progress"], 0);
    }
}
