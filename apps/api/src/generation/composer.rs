//! Prompt Composer: turns résumé text and job context into an immutable
//! `GenerationRequest`. Pure: no I/O, deterministic for identical inputs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generation::prompts::{
    AGGRESSIVE_MODE_INSTRUCTIONS, BALANCED_MODE_INSTRUCTIONS, CONSERVATIVE_MODE_INSTRUCTIONS,
    COVER_LETTER_PROMPT_TEMPLATE, COVER_LETTER_SYSTEM, CV_PROMPT_TEMPLATE, CV_SYSTEM,
    PLACEHOLDER_INSTRUCTION_TEMPLATE, TEMPLATE_INSTRUCTION_TEMPLATE,
};
use crate::llm_client::prompts::RAW_OUTPUT_INSTRUCTION;
use crate::templates::placeholder_markers;

pub const DEFAULT_LANGUAGE: &str = "English";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComposeError {
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Cv,
    CoverLetter,
}

impl DocumentKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cv => "CV",
            Self::CoverLetter => "cover letter",
        }
    }
}

/// How far the model may go beyond the original CV's wording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementMode {
    Conservative,
    #[default]
    Balanced,
    Aggressive,
}

impl EnhancementMode {
    fn instructions(&self) -> &'static str {
        match self {
            Self::Conservative => CONSERVATIVE_MODE_INSTRUCTIONS,
            Self::Balanced => BALANCED_MODE_INSTRUCTIONS,
            Self::Aggressive => AGGRESSIVE_MODE_INSTRUCTIONS,
        }
    }
}

/// Job details supplied by the user for one generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JobContext {
    #[serde(default)]
    pub job_description: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub enhancement_mode: EnhancementMode,
    #[serde(default)]
    pub language: Option<String>,
}

impl JobContext {
    fn language(&self) -> &str {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE)
    }

    /// The cover letter sees the title ahead of the description; the CV prompt
    /// gets the description alone.
    fn cover_letter_description(&self) -> String {
        let description = self.job_description.trim();
        match self.job_title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => format!("Job Title: {title}\n\n{description}"),
            _ => description.to_string(),
        }
    }
}

/// A fully composed prompt. Fields are private so a request cannot be altered
/// between composition and sending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    kind: DocumentKind,
    system: String,
    prompt: String,
}

impl GenerationRequest {
    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// Builds the generation request for `kind`.
///
/// `template` is only used for CVs and is embedded verbatim, so any `<<NAME>>`
/// markers reach the model unchanged.
pub fn compose(
    kind: DocumentKind,
    resume_text: &str,
    job: &JobContext,
    template: Option<&str>,
) -> Result<GenerationRequest, ComposeError> {
    let resume_text = resume_text.trim();
    if resume_text.is_empty() {
        return Err(ComposeError::MissingRequiredField("resume_text"));
    }
    if job.job_description.trim().is_empty() {
        return Err(ComposeError::MissingRequiredField("job_description"));
    }

    let company_name = job.company_name.trim();
    let language = job.language();

    let (system, prompt) = match kind {
        DocumentKind::Cv => {
            let template_instruction = template
                .filter(|t| !t.trim().is_empty())
                .map(template_instruction)
                .unwrap_or_default();
            let prompt = fill_slots(
                CV_PROMPT_TEMPLATE,
                &[
                    ("resume_text", resume_text),
                    ("job_description", job.job_description.trim()),
                    ("company_name", company_name),
                    ("language", language),
                    ("mode_instructions", job.enhancement_mode.instructions()),
                    ("template_instruction", &template_instruction),
                    ("raw_output_instruction", RAW_OUTPUT_INSTRUCTION),
                ],
            );
            (CV_SYSTEM, prompt)
        }
        DocumentKind::CoverLetter => {
            let job_description = job.cover_letter_description();
            let prompt = fill_slots(
                COVER_LETTER_PROMPT_TEMPLATE,
                &[
                    ("resume_text", resume_text),
                    ("job_description", &job_description),
                    ("company_name", company_name),
                    ("language", language),
                    ("raw_output_instruction", RAW_OUTPUT_INSTRUCTION),
                ],
            );
            (COVER_LETTER_SYSTEM, prompt)
        }
    };

    Ok(GenerationRequest {
        kind,
        system: system.to_string(),
        prompt,
    })
}

fn template_instruction(template: &str) -> String {
    let markers = placeholder_markers(template);
    let placeholder_instruction = if markers.is_empty() {
        String::new()
    } else {
        let list = markers
            .iter()
            .map(|m| format!("<<{m}>>"))
            .collect::<Vec<_>>()
            .join(", ");
        fill_slots(PLACEHOLDER_INSTRUCTION_TEMPLATE, &[("placeholders", &list)])
    };

    fill_slots(
        TEMPLATE_INSTRUCTION_TEMPLATE,
        &[
            ("template", template),
            ("placeholder_instruction", &placeholder_instruction),
        ],
    )
}

/// Replaces `{name}` slots in a single left-to-right pass. Values are never
/// re-scanned and unknown brace groups are copied as-is.
pub fn fill_slots(template: &str, slots: &[(&str, &str)]) -> String {
    let extra: usize = slots.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after
            .find('}')
            .and_then(|close| {
                let key = &after[..close];
                slots
                    .iter()
                    .find(|(name, _)| *name == key)
                    .map(|(_, value)| (close, *value))
            });
        match value {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
