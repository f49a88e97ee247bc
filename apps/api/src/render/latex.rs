//! LaTeX → PDF compilation in a disposable working directory.
//!
//! Every compile gets its own `TempDir`; the guard removes it when `compile`
//! returns or its future is dropped, and the child is spawned with
//! `kill_on_drop` so a timeout or cancellation never leaves TeX running.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use bytes::Bytes;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::render::diagnostics;

pub const PDF_MIME: &str = "application/pdf";

const SOURCE_FILE: &str = "document.tex";
const LOG_FILE: &str = "document.log";
const OUTPUT_FILE: &str = "document.pdf";
const WORKDIR_PREFIX: &str = "tailor-latex-";

/// Flags every pass runs with: never prompt, stop at the first error, and no
/// `\write18` from model-generated source.
const STANDARD_ARGS: &[&str] = &[
    "-interaction=nonstopmode",
    "-halt-on-error",
    "-no-shell-escape",
];

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("LaTeX compiler '{program}' was not found; install a TeX distribution (TeX Live, MiKTeX or MacTeX) or set LATEX_PROGRAM")]
    CompilerNotFound { program: String },

    #[error("LaTeX compilation failed: {}", .diagnostics.lines().next().unwrap_or_default())]
    CompilationFailed { diagnostics: String },

    #[error("LaTeX compilation did not finish within {} seconds", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("could not prepare the compilation workspace: {0}")]
    Workspace(#[from] std::io::Error),
}

/// A successfully rendered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledDocument {
    pub bytes: Bytes,
    pub mime_type: &'static str,
}

#[derive(Debug, Clone)]
pub struct LatexCompiler {
    program: String,
    extra_args: Vec<String>,
    passes: u8,
    timeout: Duration,
}

impl LatexCompiler {
    /// `passes` is clamped to at least one; `timeout` bounds the whole compile,
    /// not each pass.
    pub fn new(program: impl Into<String>, passes: u8, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
            passes: passes.max(1),
            timeout,
        }
    }

    /// Arguments placed before the standard flags on every pass.
    #[cfg(test)]
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub async fn compile(&self, source: &str) -> Result<CompiledDocument, CompileError> {
        if source.trim().is_empty() {
            return Err(CompileError::CompilationFailed {
                diagnostics: "the LaTeX source is empty".to_string(),
            });
        }

        let workdir = tempfile::Builder::new()
            .prefix(WORKDIR_PREFIX)
            .tempdir()?;
        tokio::fs::write(workdir.path().join(SOURCE_FILE), source).await?;

        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.run_passes(workdir.path()))
            .await
            .unwrap_or(Err(CompileError::Timeout(self.timeout)));

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(doc) => info!(
                program = %self.program,
                bytes = doc.bytes.len(),
                elapsed_ms,
                "LaTeX compilation succeeded"
            ),
            Err(e) => warn!(program = %self.program, elapsed_ms, "LaTeX compilation failed: {e}"),
        }

        outcome
    }

    async fn run_passes(&self, dir: &Path) -> Result<CompiledDocument, CompileError> {
        for pass in 1..=self.passes {
            let output = Command::new(&self.program)
                .args(&self.extra_args)
                .args(STANDARD_ARGS)
                .arg(SOURCE_FILE)
                .current_dir(dir)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => CompileError::CompilerNotFound {
                        program: self.program.clone(),
                    },
                    _ => CompileError::Workspace(e),
                })?;

            if !output.status.success() {
                debug!(pass, status = %output.status, "LaTeX pass exited unsuccessfully");
                let log = tokio::fs::read(dir.join(LOG_FILE))
                    .await
                    .ok()
                    .map(|b| String::from_utf8_lossy(&b).into_owned());
                let console = format!(
                    "{}\n{}",
                    String::from_utf8_lossy(&output.stdout),
                    String::from_utf8_lossy(&output.stderr)
                );
                return Err(CompileError::CompilationFailed {
                    diagnostics: diagnostics::summarize(log.as_deref(), &console),
                });
            }

            debug!(pass, "LaTeX pass completed");
        }

        match tokio::fs::read(dir.join(OUTPUT_FILE)).await {
            Ok(bytes) if !bytes.is_empty() => Ok(CompiledDocument {
                bytes: Bytes::from(bytes),
                mime_type: PDF_MIME,
            }),
            _ => Err(CompileError::CompilationFailed {
                diagnostics: "the compiler exited successfully but produced no PDF".to_string(),
            }),
        }
    }
}
