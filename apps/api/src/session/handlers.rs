//! Axum route handlers for the Session API.

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::{DocumentKind, JobContext};
use crate::ingest::UploadedDocument;
use crate::render::CompiledDocument;
use crate::session::{actions, ResumeSummary, SessionSummary};
use crate::state::AppState;

const UPLOAD_FIELD: &str = "file";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CvRequest {
    #[serde(flatten)]
    pub job: JobContext,
    #[serde(default)]
    pub custom_template: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CvSourceBody {
    pub latex_source: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CoverLetterBody {
    pub cover_letter: String,
}

fn attachment(file_name: &str, content_type: &str, body: impl Into<Body>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body.into(),
    )
        .into_response()
}

/// Keeps the body-limit rejection distinct from a malformed request.
fn multipart_error(e: MultipartError, limit: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("the upload exceeds the {limit} byte limit"))
    } else {
        AppError::Validation(format!("Could not read the multipart body: {e}"))
    }
}

fn pdf_attachment(document: CompiledDocument) -> Response {
    attachment("cv.pdf", document.mime_type, document.bytes)
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let session_id = state.sessions.create().await;
    (StatusCode::CREATED, Json(CreateSessionResponse { session_id }))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>, AppError> {
    let lease = state.sessions.lease(id).await?;
    Ok(Json(lease.summary()))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/resume
///
/// Multipart upload; the résumé is read from the `file` field.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ResumeSummary>, AppError> {
    let mut lease = state.sessions.lease(id).await?;
    let limit = state.config.max_upload_bytes;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        // An unusable replacement still retires the old résumé
        let document = UploadedDocument::new(file_name, content_type.as_deref(), bytes)
            .inspect_err(|_| lease.resume = None)?;
        upload = Some(document);
        break;
    }

    let upload = upload.ok_or_else(|| {
        AppError::Validation(format!("multipart field '{UPLOAD_FIELD}' is required"))
    })?;
    let resume = actions::ingest_resume(&mut lease, upload).await?;
    Ok(Json(ResumeSummary::from(&resume)))
}

/// POST /api/v1/sessions/:id/cv
pub async fn handle_generate_cv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CvRequest>,
) -> Result<Json<CvSourceBody>, AppError> {
    let mut lease = state.sessions.lease(id).await?;
    let latex_source = actions::generate_document(
        &mut lease,
        state.generator.as_ref(),
        &state.templates,
        DocumentKind::Cv,
        &req.job,
        req.custom_template.as_deref(),
    )
    .await?;
    Ok(Json(CvSourceBody { latex_source }))
}

/// GET /api/v1/sessions/:id/cv/source
pub async fn handle_download_cv_source(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let lease = state.sessions.lease(id).await?;
    let source = lease
        .cv_source
        .clone()
        .ok_or_else(|| AppError::NotFound("This session has no CV source yet".into()))?;
    Ok(attachment("cv.tex", "application/x-tex; charset=utf-8", source))
}

/// PUT /api/v1/sessions/:id/cv/source
pub async fn handle_update_cv_source(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CvSourceBody>,
) -> Result<StatusCode, AppError> {
    let mut lease = state.sessions.lease(id).await?;
    actions::update_cv_source(&mut lease, body.latex_source)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/cv/compile
pub async fn handle_compile_cv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let mut lease = state.sessions.lease(id).await?;
    let document = actions::compile_cv(&mut lease, &state.compiler).await?;
    Ok(pdf_attachment(document))
}

/// GET /api/v1/sessions/:id/cv/pdf
pub async fn handle_download_cv_pdf(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let lease = state.sessions.lease(id).await?;
    let document = lease
        .cv_pdf
        .clone()
        .ok_or_else(|| AppError::NotFound("This session has no compiled CV; compile it first".into()))?;
    Ok(pdf_attachment(document))
}

/// POST /api/v1/sessions/:id/cv/build
pub async fn handle_build_cv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CvRequest>,
) -> Result<Response, AppError> {
    let mut lease = state.sessions.lease(id).await?;
    let document = actions::build_cv(
        &mut lease,
        state.generator.as_ref(),
        &state.templates,
        &state.compiler,
        &req.job,
        req.custom_template.as_deref(),
    )
    .await?;
    Ok(pdf_attachment(document))
}

/// POST /api/v1/sessions/:id/cover-letter
pub async fn handle_generate_cover_letter(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(job): Json<JobContext>,
) -> Result<Json<CoverLetterBody>, AppError> {
    let mut lease = state.sessions.lease(id).await?;
    let cover_letter = actions::generate_document(
        &mut lease,
        state.generator.as_ref(),
        &state.templates,
        DocumentKind::CoverLetter,
        &job,
        None,
    )
    .await?;
    Ok(Json(CoverLetterBody { cover_letter }))
}

/// GET /api/v1/sessions/:id/cover-letter/text
pub async fn handle_download_cover_letter(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let lease = state.sessions.lease(id).await?;
    let text = lease
        .cover_letter
        .clone()
        .ok_or_else(|| AppError::NotFound("This session has no cover letter yet".into()))?;
    Ok(attachment("cover_letter.txt", "text/plain; charset=utf-8", text))
}

/// PUT /api/v1/sessions/:id/cover-letter/text
pub async fn handle_update_cover_letter(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CoverLetterBody>,
) -> Result<StatusCode, AppError> {
    let mut lease = state.sessions.lease(id).await?;
    actions::update_cover_letter(&mut lease, body.cover_letter)?;
    Ok(StatusCode::NO_CONTENT)
}
