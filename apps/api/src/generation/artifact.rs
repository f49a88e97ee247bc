use serde::Serialize;

use crate::generation::composer::DocumentKind;
use crate::llm_client::LlmError;

/// Output of one generation call. The variant always matches the request's kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum GeneratedArtifact {
    LatexSource(String),
    CoverLetter(String),
}

impl GeneratedArtifact {
    /// Cleans a raw completion and checks it has the shape `kind` needs.
    ///
    /// Empty completions are rejected for both kinds; a CV must contain a
    /// LaTeX document body or it could never compile.
    pub fn from_completion(kind: DocumentKind, completion: &str) -> Result<Self, LlmError> {
        let text = strip_code_fences(completion);
        if text.is_empty() {
            return Err(LlmError::Generation(format!(
                "the model returned an empty {}",
                kind.label()
            )));
        }

        match kind {
            DocumentKind::Cv => {
                if !text.contains(r"\begin{document}") {
                    return Err(LlmError::Generation(
                        r"the model's CV is not a LaTeX document (no \begin{document})".to_string(),
                    ));
                }
                Ok(Self::LatexSource(text.to_string()))
            }
            DocumentKind::CoverLetter => Ok(Self::CoverLetter(text.to_string())),
        }
    }

    #[cfg(test)]
    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::LatexSource(_) => DocumentKind::Cv,
            Self::CoverLetter(_) => DocumentKind::CoverLetter,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::LatexSource(text) | Self::CoverLetter(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::LatexSource(text) | Self::CoverLetter(text) => text,
        }
    }
}

/// Strips a surrounding Markdown code fence (```latex ... ``` or ``` ... ```).
pub fn strip_code_fences(text: &str) -> &str {
    let mut text = text.trim();

    if let Some(fenced) = text.strip_prefix("```") {
        // Drop the info string (`latex`, `tex`, ...) along with the opening fence line
        text = match fenced.find('\n') {
            Some(newline) => fenced[newline + 1..].trim(),
            None => fenced.trim_end_matches('`').trim(),
        };
    }

    if let Some(body) = text.strip_suffix("```") {
        text = body.trim();
    }

    text
}
