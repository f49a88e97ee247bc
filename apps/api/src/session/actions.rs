//! The steps a user drives a session through. Each action runs on a leased
//! session and either updates it or leaves the previous state cleared.

use std::future::Future;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::errors::AppError;
use crate::generation::{compose, ComposeError, DocumentKind, JobContext};
use crate::ingest::{extract_text, UploadedDocument};
use crate::llm_client::TextGenerator;
use crate::render::{CompiledDocument, LatexCompiler};
use crate::session::{Resume, SessionLease};
use crate::templates::TemplateCatalog;

/// Runs `fut` unless the session is deleted first; the dropped future takes
/// any in-flight request or compiler child down with it.
async fn until_cancelled<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::SessionClosed),
        result = fut => result,
    }
}

/// Extracts the résumé text and stores it. Other session fields are untouched.
///
/// The previous résumé is dropped first, so a failed re-upload leaves the
/// session with no résumé rather than the one the user meant to replace.
pub async fn ingest_resume(
    lease: &mut SessionLease,
    document: UploadedDocument,
) -> Result<Resume, AppError> {
    let file_name = document.file_name.clone();
    let format = document.format;
    lease.resume = None;

    let text = until_cancelled(lease.cancel_token(), async {
        extract_text(document).await.map_err(AppError::from)
    })
    .await?;

    let resume = Resume {
        text,
        file_name,
        format,
    };
    info!(
        session_id = %lease.id(),
        file = %resume.file_name,
        %format,
        chars = resume.text.char_count(),
        "résumé ingested"
    );
    lease.resume = Some(resume.clone());
    Ok(resume)
}

/// Picks the template for a CV: inline text, then a named catalog entry, then
/// the catalog default.
fn resolve_template<'a>(
    templates: &'a TemplateCatalog,
    job: &JobContext,
    custom_template: Option<&'a str>,
) -> Result<Option<&'a str>, AppError> {
    if let Some(custom) = custom_template.filter(|t| !t.trim().is_empty()) {
        return Ok(Some(custom));
    }

    match job.template_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => templates
            .get(id)
            .map(Some)
            .ok_or_else(|| AppError::UnknownTemplate(id.to_string())),
        None => Ok(templates.default_template()),
    }
}

/// Generates a CV or cover letter from the session's résumé and stores it,
/// replacing the previous one. A new CV also invalidates the compiled PDF.
pub async fn generate_document(
    lease: &mut SessionLease,
    generator: &dyn TextGenerator,
    templates: &TemplateCatalog,
    kind: DocumentKind,
    job: &JobContext,
    custom_template: Option<&str>,
) -> Result<String, AppError> {
    let resume = lease
        .resume
        .as_ref()
        .ok_or(ComposeError::MissingRequiredField("resume"))?;
    if job.company_name.trim().is_empty() {
        return Err(ComposeError::MissingRequiredField("company_name").into());
    }

    let template = match kind {
        DocumentKind::Cv => resolve_template(templates, job, custom_template)?,
        DocumentKind::CoverLetter => None,
    };
    let request = compose(kind, resume.text.as_str(), job, template)?;

    match kind {
        DocumentKind::Cv => {
            lease.cv_source = None;
            lease.cv_pdf = None;
        }
        DocumentKind::CoverLetter => lease.cover_letter = None,
    }

    let started = Instant::now();
    let artifact = until_cancelled(lease.cancel_token(), async {
        generator.generate(&request).await.map_err(AppError::from)
    })
    .await?;

    info!(
        session_id = %lease.id(),
        kind = kind.label(),
        chars = artifact.text().len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "document generated"
    );

    let text = artifact.into_text();
    match kind {
        DocumentKind::Cv => lease.cv_source = Some(text.clone()),
        DocumentKind::CoverLetter => lease.cover_letter = Some(text.clone()),
    }
    Ok(text)
}

/// Replaces the CV source with the user's edit. The old PDF no longer matches it.
pub fn update_cv_source(lease: &mut SessionLease, latex_source: String) -> Result<(), AppError> {
    if latex_source.trim().is_empty() {
        return Err(AppError::Validation("latex_source must not be empty".into()));
    }
    lease.cv_source = Some(latex_source);
    lease.cv_pdf = None;
    Ok(())
}

pub fn update_cover_letter(lease: &mut SessionLease, cover_letter: String) -> Result<(), AppError> {
    if cover_letter.trim().is_empty() {
        return Err(AppError::Validation("cover_letter must not be empty".into()));
    }
    lease.cover_letter = Some(cover_letter);
    Ok(())
}

/// Compiles the current CV source. On failure the session holds no PDF.
pub async fn compile_cv(
    lease: &mut SessionLease,
    compiler: &LatexCompiler,
) -> Result<CompiledDocument, AppError> {
    let source = lease.cv_source.clone().ok_or_else(|| {
        AppError::NotFound("This session has no CV source yet; generate a CV first".into())
    })?;
    lease.cv_pdf = None;

    let document = until_cancelled(lease.cancel_token(), async {
        compiler.compile(&source).await.map_err(AppError::from)
    })
    .await?;

    info!(session_id = %lease.id(), bytes = document.bytes.len(), "CV compiled");
    lease.cv_pdf = Some(document.clone());
    Ok(document)
}

/// Generates a CV and compiles it. Nothing is compiled if generation fails.
pub async fn build_cv(
    lease: &mut SessionLease,
    generator: &dyn TextGenerator,
    templates: &TemplateCatalog,
    compiler: &LatexCompiler,
    job: &JobContext,
    custom_template: Option<&str>,
) -> Result<CompiledDocument, AppError> {
    generate_document(lease, generator, templates, DocumentKind::Cv, job, custom_template).await?;
    compile_cv(lease, compiler).await
}
