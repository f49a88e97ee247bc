// Shared prompt fragments used by every generation prompt.
// Each service that needs LLM calls defines its own prompts.rs alongside it.

/// The model must emit the document itself; fences are still stripped defensively
/// by `strip_code_fences` because models ignore this often enough.
pub const RAW_OUTPUT_INSTRUCTION: &str = "\
CRITICAL: Output ONLY the raw text. Do NOT wrap the output in markdown code blocks (no triple backticks). \
Do NOT add explanations before or after the document.";
