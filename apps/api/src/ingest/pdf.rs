use bytes::Bytes;
use tracing::warn;

use crate::ingest::IngestError;

/// Extracts the text layer of a PDF.
///
/// Parsing is CPU-bound, so it runs on the blocking pool. `pdf-extract` panics
/// on some malformed inputs; a panicked task surfaces as a `JoinError` and is
/// reported as a corrupt document like any other parse failure.
pub async fn extract(bytes: Bytes) -> Result<String, IngestError> {
    let result = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| {
            warn!("PDF parser aborted: {e}");
            IngestError::CorruptDocument("the PDF structure could not be parsed".to_string())
        })?;

    result.map_err(|e| {
        IngestError::CorruptDocument(format!(
            "PDF text extraction failed ({e}); the file may be damaged or password-protected"
        ))
    })
}
