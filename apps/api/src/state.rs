use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::TextGenerator;
use crate::render::LatexCompiler;
use crate::session::SessionStore;
use crate::templates::TemplateCatalog;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: SessionStore,
    /// Pluggable generation backend. Gemini in production, a mock in tests.
    pub generator: Arc<dyn TextGenerator>,
    pub compiler: LatexCompiler,
    pub templates: Arc<TemplateCatalog>,
}
