use crate::catalog::{ToolCatalog, ToolDescriptor};
use crate::error::Result;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct ToolsResponse {
    pub fingerprint: String,
    pub count: usize,
    pub tools: Vec<ToolDescriptor>,
    /// The exact tool listing the selection model is shown.
    pub prompt_fragment: String,
}

impl From<&ToolCatalog> for ToolsResponse {
    fn from(catalog: &ToolCatalog) -> Self {
        Self {
            fingerprint: catalog.fingerprint().to_string(),
            count: catalog.len(),
            tools: catalog.tools().to_vec(),
            prompt_fragment: catalog.prompt_fragment().to_string(),
        }
    }
}

/// GET /tools - Current catalog snapshot
pub async fn tools_handler(State(state): State<Arc<AppState>>) -> Json<ToolsResponse> {
    let catalog = state.catalog().await;
    Json(ToolsResponse::from(catalog.as_ref()))
}

/// POST /tools/refresh - Re-fetch the catalog and swap the snapshot
pub async fn refresh_tools_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ToolsResponse>> {
    let previous = state.catalog().await;
    let catalog = state.refresh_catalog().await?;

    tracing::info!(
        previous = %previous.fingerprint(),
        current = %catalog.fingerprint(),
        changed = previous.fingerprint() != catalog.fingerprint(),
        "Catalog refreshed"
    );
    metrics::counter!("catalog_refreshes_total").increment(1);

    Ok(Json(ToolsResponse::from(catalog.as_ref())))
}
