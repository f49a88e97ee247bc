pub mod health;
pub mod templates;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::session::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/templates", get(templates::list_templates_handler))
        // Session lifecycle
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/resume",
            post(handlers::handle_upload_resume),
        )
        // CV
        .route("/api/v1/sessions/:id/cv", post(handlers::handle_generate_cv))
        .route(
            "/api/v1/sessions/:id/cv/source",
            get(handlers::handle_download_cv_source).put(handlers::handle_update_cv_source),
        )
        .route(
            "/api/v1/sessions/:id/cv/compile",
            post(handlers::handle_compile_cv),
        )
        .route("/api/v1/sessions/:id/cv/pdf", get(handlers::handle_download_cv_pdf))
        .route("/api/v1/sessions/:id/cv/build", post(handlers::handle_build_cv))
        // Cover letter
        .route(
            "/api/v1/sessions/:id/cover-letter",
            post(handlers::handle_generate_cover_letter),
        )
        .route(
            "/api/v1/sessions/:id/cover-letter/text",
            get(handlers::handle_download_cover_letter).put(handlers::handle_update_cover_letter),
        )
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}

#[cfg(all(test, unix))]
mod tests {
    use axum::{
        body::{to_bytes, Body, Bytes},
        http::{header, HeaderMap, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::generation::{DocumentKind, GeneratedArtifact};
    use crate::llm_client::{LlmError, MockTextGenerator};
    use crate::test_support::{test_state, FakeTex, HELLO_WORLD, UNBALANCED};

    const BOUNDARY: &str = "tailor-test-boundary";
    const RESUME: &str = "Grace Hopper\ngrace@example.com\nRear Admiral, COBOL";

    fn happy_generator() -> MockTextGenerator {
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().returning(|req| match req.kind() {
            DocumentKind::Cv => Ok(GeneratedArtifact::LatexSource(HELLO_WORLD.to_string())),
            DocumentKind::CoverLetter => {
                Ok(GeneratedArtifact::CoverLetter("Dear Hiring Manager,".to_string()))
            }
        });
        generator
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body)
    }

    fn empty(method: Method, uri: &str) -> Request<Body> {
        Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn upload(uri: &str, file_name: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             {content}\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json(body: &Bytes) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    async fn create_session(app: &Router) -> String {
        let (status, _, body) = send(app, empty(Method::POST, "/api/v1/sessions")).await;
        assert_eq!(status, StatusCode::CREATED);
        json(&body)["session_id"].as_str().unwrap().to_string()
    }

    fn job() -> Value {
        json!({
            "job_description": "Compiler engineer for a systems team",
            "company_name": "Initech",
            "enhancement_mode": "conservative"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let tex = FakeTex::pdflatex();
        let app = build_router(test_state(MockTextGenerator::new(), &tex));
        let (status, _, body) = send(&app, empty(Method::GET, "/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["status"], "ok");
    }

    #[tokio::test]
    async fn test_templates_are_listed_with_placeholders() {
        let tex = FakeTex::pdflatex();
        let app = build_router(test_state(MockTextGenerator::new(), &tex));
        let (status, _, body) = send(&app, empty(Method::GET, "/api/v1/templates")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json(&body),
            json!([{ "id": "cv_template", "placeholders": ["FULL_NAME", "EMAIL"] }])
        );
    }

    #[tokio::test]
    async fn test_full_session_flow() {
        let tex = FakeTex::pdflatex();
        let app = build_router(test_state(happy_generator(), &tex));
        let id = create_session(&app).await;
        let base = format!("/api/v1/sessions/{id}");

        let (status, _, body) = send(&app, upload(&format!("{base}/resume"), "resume.txt", RESUME)).await;
        assert_eq!(status, StatusCode::OK);
        let resume = json(&body);
        assert_eq!(resume["format"], "plain_text");
        assert_eq!(resume["text"], RESUME);

        let (status, _, body) = send(&app, json_request(Method::POST, &format!("{base}/cv"), job())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["latex_source"], HELLO_WORLD);

        let (status, headers, body) = send(&app, empty(Method::POST, &format!("{base}/cv/compile"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(headers[header::CONTENT_DISPOSITION], "attachment; filename=\"cv.pdf\"");
        assert!(body.starts_with(b"%PDF"));

        let (status, _, pdf) = send(&app, empty(Method::GET, &format!("{base}/cv/pdf"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pdf, body);

        let (status, headers, source) = send(&app, empty(Method::GET, &format!("{base}/cv/source"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_DISPOSITION], "attachment; filename=\"cv.tex\"");
        assert_eq!(source, HELLO_WORLD.as_bytes());

        let (status, _, body) =
            send(&app, json_request(Method::POST, &format!("{base}/cover-letter"), job())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["cover_letter"], "Dear Hiring Manager,");

        let (status, _, _) = send(
            &app,
            json_request(
                Method::PUT,
                &format!("{base}/cover-letter/text"),
                json!({ "cover_letter": "Dear Ms. Bolton," }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _, text) = send(&app, empty(Method::GET, &format!("{base}/cover-letter/text"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "Dear Ms. Bolton,".as_bytes());

        let (status, _, summary) = send(&app, empty(Method::GET, &base)).await;
        assert_eq!(status, StatusCode::OK);
        let summary = json(&summary);
        assert_eq!(summary["has_cv_pdf"], true);
        assert_eq!(summary["resume"]["file_name"], "resume.txt");

        let (status, _, _) = send(&app, empty(Method::DELETE, &base)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _, _) = send(&app, empty(Method::GET, &base)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_quota_error_reports_generation_stage_without_compiling() {
        let tex = FakeTex::pdflatex();
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_| Err(LlmError::QuotaExceeded("per-minute limit".into())));
        let app = build_router(test_state(generator, &tex));
        let id = create_session(&app).await;
        let base = format!("/api/v1/sessions/{id}");

        send(&app, upload(&format!("{base}/resume"), "resume.txt", RESUME)).await;
        let (status, _, body) =
            send(&app, json_request(Method::POST, &format!("{base}/cv/build"), job())).await;

        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        let error = &json(&body)["error"];
        assert_eq!(error["stage"], "generation");
        assert_eq!(error["code"], "QUOTA_EXCEEDED");
        assert!(tex.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_compile_failure_returns_diagnostics() {
        let tex = FakeTex::pdflatex();
        let app = build_router(test_state(MockTextGenerator::new(), &tex));
        let id = create_session(&app).await;
        let base = format!("/api/v1/sessions/{id}");

        let (status, _, _) = send(
            &app,
            json_request(
                Method::PUT,
                &format!("{base}/cv/source"),
                json!({ "latex_source": UNBALANCED }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _, body) = send(&app, empty(Method::POST, &format!("{base}/cv/compile"))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let error = &json(&body)["error"];
        assert_eq!(error["stage"], "compilation");
        assert!(error["diagnostics"].as_str().unwrap().contains("Missing }"));

        let (status, _, _) = send(&app, empty(Method::GET, &format!("{base}/cv/pdf"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_errors() {
        let tex = FakeTex::pdflatex();
        let app = build_router(test_state(MockTextGenerator::new(), &tex));
        let id = create_session(&app).await;
        let uri = format!("/api/v1/sessions/{id}/resume");

        let (status, _, body) = send(&app, upload(&uri, "resume.doc", "legacy")).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(json(&body)["error"]["stage"], "ingestion");

        let (status, _, body) = send(&app, upload(&uri, "resume.txt", "  \n ")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json(&body)["error"]["code"], "EMPTY_DOCUMENT");

        let (status, _, body) = send(&app, upload(&uri, "resume.pdf", "not a pdf")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json(&body)["error"]["code"], "CORRUPT_DOCUMENT");
    }

    #[tokio::test]
    async fn test_rejected_upload_replaces_previous_resume() {
        let tex = FakeTex::pdflatex();
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().never();
        let app = build_router(test_state(generator, &tex));
        let id = create_session(&app).await;
        let base = format!("/api/v1/sessions/{id}");

        let (status, _, _) = send(&app, upload(&format!("{base}/resume"), "resume.txt", RESUME)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, _) =
            send(&app, upload(&format!("{base}/resume"), "resume.doc", "legacy")).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let (_, _, body) = send(&app, empty(Method::GET, &base)).await;
        assert!(json(&body)["resume"].is_null());

        let (status, _, body) =
            send(&app, json_request(Method::POST, &format!("{base}/cv"), job())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["error"]["code"], "MISSING_REQUIRED_FIELD");
    }

    #[tokio::test]
    async fn test_oversized_upload_is_payload_too_large() {
        let tex = FakeTex::pdflatex();
        let app = build_router(test_state(MockTextGenerator::new(), &tex));
        let id = create_session(&app).await;
        let uri = format!("/api/v1/sessions/{id}/resume");

        let content = "a".repeat(2 * 1024 * 1024);
        let (status, _, body) = send(&app, upload(&uri, "resume.txt", &content)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json(&body)["error"]["code"], "PAYLOAD_TOO_LARGE");
        assert_eq!(json(&body)["error"]["stage"], "input");
    }

    #[tokio::test]
    async fn test_unknown_template_is_an_input_error() {
        let tex = FakeTex::pdflatex();
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().never();
        let app = build_router(test_state(generator, &tex));
        let id = create_session(&app).await;
        let base = format!("/api/v1/sessions/{id}");
        send(&app, upload(&format!("{base}/resume"), "resume.txt", RESUME)).await;

        let mut request = job();
        request["template_id"] = json!("does-not-exist");
        let (status, _, body) =
            send(&app, json_request(Method::POST, &format!("{base}/cv"), request)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json(&body)["error"]["code"], "TEMPLATE_NOT_FOUND");
        assert_eq!(json(&body)["error"]["stage"], "input");
    }

    #[tokio::test]
    async fn test_missing_fields_are_client_errors() {
        let tex = FakeTex::pdflatex();
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().never();
        let app = build_router(test_state(generator, &tex));
        let id = create_session(&app).await;
        let base = format!("/api/v1/sessions/{id}");

        let (status, _, body) =
            send(&app, json_request(Method::POST, &format!("{base}/cv"), job())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["error"]["code"], "MISSING_REQUIRED_FIELD");

        send(&app, upload(&format!("{base}/resume"), "resume.txt", RESUME)).await;
        let (status, _, body) = send(
            &app,
            json_request(
                Method::POST,
                &format!("{base}/cover-letter"),
                json!({ "job_description": "Compiler engineer" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["error"]["stage"], "input");
    }

    #[tokio::test]
    async fn test_busy_session_conflicts() {
        let tex = FakeTex::pdflatex();
        let state = test_state(MockTextGenerator::new(), &tex);
        let app = build_router(state.clone());
        let id = create_session(&app).await;

        let _held = state.sessions.lease(id.parse::<Uuid>().unwrap()).await.unwrap();
        let (status, _, body) =
            send(&app, empty(Method::POST, &format!("/api/v1/sessions/{id}/cv/compile"))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json(&body)["error"]["stage"], "session");
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let tex = FakeTex::pdflatex();
        let app = build_router(test_state(MockTextGenerator::new(), &tex));
        let uri = format!("/api/v1/sessions/{}/cv/pdf", Uuid::new_v4());
        let (status, _, _) = send(&app, empty(Method::GET, &uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
