use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::generation::ComposeError;
use crate::ingest::IngestError;
use crate::llm_client::LlmError;
use crate::render::CompileError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Stage errors keep their own enums and are wrapped here unchanged.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Generation(#[from] LlmError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("unknown template '{0}'; list the available ones at /api/v1/templates")]
    UnknownTemplate(String),

    #[error("another action is already running for this session; wait for it to finish")]
    Conflict,

    #[error("the session was closed while the action was running")]
    SessionClosed,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Where in the pipeline an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Input,
    Ingestion,
    Generation,
    Compilation,
    Session,
    Server,
}

impl Stage {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Ingestion => "ingestion",
            Self::Generation => "generation",
            Self::Compilation => "compilation",
            Self::Session => "session",
            Self::Server => "server",
        }
    }
}

impl AppError {
    pub fn stage(&self) -> Stage {
        match self {
            AppError::Ingest(_) => Stage::Ingestion,
            AppError::Compose(_)
            | AppError::Validation(_)
            | AppError::PayloadTooLarge(_)
            | AppError::UnknownTemplate(_) => Stage::Input,
            AppError::Generation(_) => Stage::Generation,
            AppError::Compile(CompileError::Workspace(_)) => Stage::Server,
            AppError::Compile(_) => Stage::Compilation,
            AppError::NotFound(_) | AppError::Conflict | AppError::SessionClosed => Stage::Session,
            AppError::Internal(_) => Stage::Server,
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Ingest(e) => match e {
                IngestError::UnsupportedFormat(_) => {
                    (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_FORMAT")
                }
                IngestError::CorruptDocument(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "CORRUPT_DOCUMENT")
                }
                IngestError::EmptyDocument => (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_DOCUMENT"),
            },
            AppError::Compose(ComposeError::MissingRequiredField(_)) => {
                (StatusCode::BAD_REQUEST, "MISSING_REQUIRED_FIELD")
            }
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            AppError::UnknownTemplate(_) => (StatusCode::NOT_FOUND, "TEMPLATE_NOT_FOUND"),
            AppError::Generation(e) => match e {
                LlmError::Authentication(_) => (StatusCode::BAD_GATEWAY, "AUTHENTICATION_FAILED"),
                LlmError::QuotaExceeded(_) => (StatusCode::TOO_MANY_REQUESTS, "QUOTA_EXCEEDED"),
                LlmError::Network(_) => (StatusCode::GATEWAY_TIMEOUT, "NETWORK_ERROR"),
                LlmError::Generation(_) => (StatusCode::BAD_GATEWAY, "GENERATION_FAILED"),
            },
            AppError::Compile(e) => match e {
                CompileError::CompilerNotFound { .. } => {
                    (StatusCode::SERVICE_UNAVAILABLE, "COMPILER_NOT_FOUND")
                }
                CompileError::CompilationFailed { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "COMPILATION_FAILED")
                }
                CompileError::Timeout(_) => (StatusCode::UNPROCESSABLE_ENTITY, "COMPILATION_TIMEOUT"),
                CompileError::Workspace(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::SessionClosed => (StatusCode::GONE, "SESSION_CLOSED"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Generation(LlmError::Authentication(detail)) => {
                format!("{detail}; check the configured GEMINI_API_KEY")
            }
            AppError::Generation(LlmError::Network(_)) => {
                "could not reach the generation service; check the network connection and try again"
                    .to_string()
            }
            AppError::Compile(CompileError::Workspace(_)) | AppError::Internal(_) => {
                "An internal server error occurred".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let stage = self.stage();

        if status.is_server_error() && matches!(stage, Stage::Server) {
            tracing::error!(code, "Internal error: {self:?}");
        } else {
            tracing::warn!(code, stage = stage.as_str(), "{self}");
        }

        let mut error = json!({
            "code": code,
            "stage": stage.as_str(),
            "message": self.message(),
        });
        if let AppError::Compile(CompileError::CompilationFailed { diagnostics }) = &self {
            error["diagnostics"] = json!(diagnostics);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
