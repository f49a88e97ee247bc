// CV and cover-letter generation: prompt composition and the artifacts the
// generation client hands back. All LLM calls go through llm_client.

pub mod artifact;
pub mod composer;
pub mod prompts;

pub use artifact::GeneratedArtifact;
pub use composer::{compose, ComposeError, DocumentKind, GenerationRequest, JobContext};
