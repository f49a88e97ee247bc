use axum::{extract::State, Json};

use crate::state::AppState;
use crate::templates::TemplateSummary;

/// GET /api/v1/templates
/// Lists the bundled CV templates with the placeholder markers each expects.
pub async fn list_templates_handler(State(state): State<AppState>) -> Json<Vec<TemplateSummary>> {
    Json(state.templates.summaries())
}
