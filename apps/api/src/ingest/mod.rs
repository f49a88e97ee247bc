//! Résumé ingestion: turns an uploaded PDF, DOCX or plain-text file into
//! normalized plain text for the prompt composer.
//!
//! Dispatch is on `DocumentFormat`, resolved once when the upload is accepted.
//! Every strategy either yields non-empty text or a typed `IngestError`; an
//! upload never silently becomes an empty résumé.

use std::fmt;
use std::ops::Deref;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

pub mod docx;
pub mod normalize;
pub mod pdf;

use normalize::normalize_whitespace;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported file format '{0}': upload a .pdf, .docx or .txt file")]
    UnsupportedFormat(String),

    #[error("the uploaded file could not be read: {0}")]
    CorruptDocument(String),

    #[error("no text could be extracted from the uploaded file; it may be empty, scanned or image-only")]
    EmptyDocument,
}

/// The three upload kinds the service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::PlainText),
            _ => None,
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        // Strip parameters such as `; charset=utf-8`
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "application/pdf" => Some(Self::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Docx)
            }
            "text/plain" => Some(Self::PlainText),
            _ => None,
        }
    }

    /// Resolves the format from the file name's extension, falling back to the
    /// declared content type. The extension wins because browsers frequently
    /// send `application/octet-stream` for DOCX uploads.
    pub fn detect(file_name: &str, content_type: Option<&str>) -> Result<Self, IngestError> {
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or_default();

        Self::from_extension(ext)
            .or_else(|| content_type.and_then(Self::from_mime))
            .ok_or_else(|| {
                let declared = if ext.is_empty() {
                    content_type.unwrap_or("unknown").to_string()
                } else {
                    ext.to_string()
                };
                IngestError::UnsupportedFormat(declared)
            })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::PlainText => "txt",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw upload plus its resolved format tag.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: String,
    pub format: DocumentFormat,
    pub bytes: Bytes,
}

impl UploadedDocument {
    pub fn new(
        file_name: impl Into<String>,
        content_type: Option<&str>,
        bytes: Bytes,
    ) -> Result<Self, IngestError> {
        let file_name = file_name.into();
        let format = DocumentFormat::detect(&file_name, content_type)?;
        Ok(Self {
            file_name,
            format,
            bytes,
        })
    }
}

/// Normalized résumé text. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExtractedText(String);

impl ExtractedText {
    /// Normalizes `raw` and rejects it if nothing but whitespace remains.
    pub fn from_raw(raw: &str) -> Result<Self, IngestError> {
        let text = normalize_whitespace(raw);
        if text.is_empty() {
            return Err(IngestError::EmptyDocument);
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

impl Deref for ExtractedText {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

/// Extracts and normalizes the text of an uploaded résumé.
pub async fn extract_text(document: UploadedDocument) -> Result<ExtractedText, IngestError> {
    if document.bytes.is_empty() {
        return Err(IngestError::EmptyDocument);
    }

    let UploadedDocument {
        file_name,
        format,
        bytes,
    } = document;

    let raw = match format {
        DocumentFormat::Pdf => pdf::extract(bytes).await?,
        DocumentFormat::Docx => docx::extract_blocking(bytes).await?,
        DocumentFormat::PlainText => decode_plain_text(&bytes)?,
    };

    let text = ExtractedText::from_raw(&raw)
        .inspect_err(|_| warn!(file = %file_name, %format, "upload yielded no text"))?;

    debug!(
        file = %file_name,
        %format,
        raw_len = raw.len(),
        chars = text.char_count(),
        "résumé text extracted"
    );

    Ok(text)
}

fn decode_plain_text(bytes: &[u8]) -> Result<String, IngestError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| IngestError::CorruptDocument(format!("text file is not valid UTF-8: {e}")))
}
