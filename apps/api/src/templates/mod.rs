//! LaTeX CV template catalog, loaded once at startup from `TEMPLATES_DIR`.
//!
//! A template is any `*.tex` file; its id is the file stem. Templates mark the
//! slots the model must fill with `<<UPPER_SNAKE>>` placeholders.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

/// Template used when the caller names none.
pub const DEFAULT_TEMPLATE_ID: &str = "cv_template";

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<<([A-Z][A-Z0-9_]*)>>").expect("static regex"));

#[derive(Debug, Clone, Serialize)]
pub struct TemplateSummary {
    pub id: String,
    pub placeholders: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, String>,
}

impl TemplateCatalog {
    /// Reads every `*.tex` file in `dir`. A missing directory yields an empty
    /// catalog (generation then runs without a template); an unreadable file
    /// is a startup error.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut templates = BTreeMap::new();

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Template directory {} not found; no templates loaded", dir.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to list templates in {}", dir.display()))
            }
        };

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("tex") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let body = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template {}", path.display()))?;
            templates.insert(id.to_string(), body);
        }

        info!(
            "Loaded {} LaTeX template(s) from {}",
            templates.len(),
            dir.display()
        );
        Ok(Self { templates })
    }

    #[cfg(test)]
    pub fn from_templates<I, K, V>(templates: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            templates: templates
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.templates.get(id).map(String::as_str)
    }

    pub fn default_template(&self) -> Option<&str> {
        self.get(DEFAULT_TEMPLATE_ID)
    }

    pub fn summaries(&self) -> Vec<TemplateSummary> {
        self.templates
            .iter()
            .map(|(id, body)| TemplateSummary {
                id: id.clone(),
                placeholders: placeholder_markers(body),
            })
            .collect()
    }
}

/// Distinct placeholder names in order of first appearance.
pub fn placeholder_markers(template: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for caps in PLACEHOLDER_RE.captures_iter(template) {
        let name = &caps[1];
        if !seen.iter().any(|s: &String| s == name) {
            seen.push(name.to_string());
        }
    }
    seen
}
