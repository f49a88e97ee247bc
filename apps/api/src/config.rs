use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::llm_client::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Application configuration loaded from environment variables.
/// Fails at startup if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub generation_timeout: Duration,
    pub latex_program: String,
    pub latex_passes: u8,
    pub compile_timeout: Duration,
    pub templates_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub session_ttl: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let gemini_api_key = require_env("GEMINI_API_KEY")?;
        if gemini_api_key.trim().is_empty() {
            bail!("Required environment variable 'GEMINI_API_KEY' is empty");
        }

        Ok(Config {
            gemini_api_key,
            gemini_model: env_or("GEMINI_MODEL", DEFAULT_MODEL),
            gemini_base_url: env_or("GEMINI_BASE_URL", DEFAULT_BASE_URL),
            generation_timeout: Duration::from_secs(parse_env("GENERATION_TIMEOUT_SECS", 120)?),
            latex_program: env_or("LATEX_PROGRAM", "pdflatex"),
            latex_passes: parse_env("LATEX_PASSES", 2)?,
            compile_timeout: Duration::from_secs(parse_env("COMPILE_TIMEOUT_SECS", 30)?),
            templates_dir: std::env::var("TEMPLATES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates")),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            session_ttl: Duration::from_secs(parse_env::<u64>("SESSION_TTL_MINS", 60)? * 60),
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_or(key, std::env::var(key).ok().as_deref(), default)
}

/// Parses `raw` when present, naming `key` in the error.
fn parse_or<T>(key: &str, raw: Option<&str>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{value}'")),
    }
}
