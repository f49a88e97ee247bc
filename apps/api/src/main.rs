mod config;
mod errors;
mod generation;
mod ingest;
mod llm_client;
mod render;
mod routes;
mod session;
mod state;
mod templates;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::GeminiClient;
use crate::render::LatexCompiler;
use crate::routes::build_router;
use crate::session::SessionStore;
use crate::state::AppState;
use crate::templates::TemplateCatalog;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing or malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tailor API v{}", env!("CARGO_PKG_VERSION"));

    let templates = TemplateCatalog::load(&config.templates_dir)
        .context("Failed to load LaTeX templates")?;

    let generator = GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_base_url.clone(),
        config.generation_timeout,
    )?;
    info!("Generation client initialized (model: {})", generator.model());

    let compiler = LatexCompiler::new(
        config.latex_program.clone(),
        config.latex_passes,
        config.compile_timeout,
    );
    if which_program(compiler.program()).is_none() {
        warn!(
            program = compiler.program(),
            "LaTeX compiler not found on PATH; compile requests will fail until a TeX distribution is installed"
        );
    }

    let state = AppState {
        sessions: SessionStore::new(config.session_ttl),
        generator: Arc::new(generator),
        compiler,
        templates: Arc::new(templates),
        config: config.clone(),
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Resolves a bare program name against `PATH`; paths are checked directly.
fn which_program(program: &str) -> Option<std::path::PathBuf> {
    let candidate = std::path::Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths)
            .map(|dir| dir.join(program))
            .find(|path| path.is_file())
    })
}
