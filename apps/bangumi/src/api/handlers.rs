//! # API Endpoint Handlers
//!
//! Every read endpoint is stateless: the full query state travels in the
//! request's query string, decoded with the same codec the browser uses.

use super::{
    AppState,
    types::{
        BrowseResponse, HealthResponse, PresetJson, PresetToggleResponse, PresetsResponse,
        StatsResponse, StatusRequest, StatusResponse, SubjectResponse, SubjectSummary,
    },
};
use axum::{
    Json,
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::IntoResponse,
};
use bangumi_core::{
    ExplorerError, PRESETS, QueryState, StatusLookup, SubjectId,
    query::{self, preset, url},
};
use std::sync::Arc;

/// Map an engine error to the HTTP status reported for it.
fn error_status(error: &ExplorerError) -> StatusCode {
    match error {
        ExplorerError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
        ExplorerError::SubjectNotFound(_) | ExplorerError::UnknownPreset(_) => {
            StatusCode::NOT_FOUND
        }
        ExplorerError::InvalidValue { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn decode_state(raw: Option<String>) -> QueryState {
    url::decode(raw.as_deref().unwrap_or_default())
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// BROWSE HANDLER
// =============================================================================

/// Run the query pipeline for the state in the query string.
pub async fn browse_handler(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> impl IntoResponse {
    let mut query_state = decode_state(raw);
    let registry = state.registry.read().await;
    let view = query::execute(&state.catalog, &query_state, &*registry, &state.paginator);

    query_state.clamp_page(view.page_count);
    let items = view
        .items
        .iter()
        .map(|subject| SubjectSummary::new(subject, registry.status(subject.id)))
        .collect();

    let response = BrowseResponse {
        url: url::encode(&query_state),
        page: view.page,
        page_count: view.page_count,
        matched: view.matched,
        total: view.total,
        items,
        active_presets: preset::active(&query_state)
            .iter()
            .map(|p| p.id.to_string())
            .collect(),
        season_selectable: query_state.season_selectable(),
        episode_shortcuts: query_state.episode_shortcuts_enabled(),
    };

    (StatusCode::OK, Json(response))
}

// =============================================================================
// SUBJECT HANDLER
// =============================================================================

/// Full record of one subject, with its status.
pub async fn subject_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    let id = SubjectId(id);
    let Some(subject) = state.catalog.get(id) else {
        let error = ExplorerError::SubjectNotFound(id);
        return (error_status(&error), Json(SubjectResponse::error(error.to_string())));
    };

    let registry = state.registry.read().await;
    (
        StatusCode::OK,
        Json(SubjectResponse::success(
            subject.clone(),
            registry.get(id),
            registry.is_pending(id),
        )),
    )
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Classify a subject.
///
/// The new value is visible to other requests as soon as the write starts.
/// The store runs on the blocking pool and a failure restores the previous
/// value. Writes queue behind each other, so the store always ends up
/// holding the value the registry settled on last.
pub async fn status_handler(
    State(state): State<AppState>,
    Json(request): Json<StatusRequest>,
) -> impl IntoResponse {
    let (id, status) = match request.to_assignment() {
        Ok(assignment) => assignment,
        Err(e) => {
            return (error_status(&e), Json(StatusResponse::error(e.to_string())));
        }
    };
    if !state.catalog.contains(id) {
        let error = ExplorerError::SubjectNotFound(id);
        return (error_status(&error), Json(StatusResponse::error(error.to_string())));
    }

    let _writer = state.lock_writer().await;
    let ticket = state.registry.write().await.begin(id, status);

    let store = Arc::clone(&state.store);
    let outcome = tokio::task::spawn_blocking(move || store.store(id, status))
        .await
        .unwrap_or_else(|e| Err(ExplorerError::IoError(format!("Status writer failed: {}", e))));

    let mut registry = state.registry.write().await;
    let settled = registry.complete(&ticket, outcome);
    let response = StatusResponse::settled(id, registry.get(id), settled, registry.take_notices());

    let code = if response.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (code, Json(response))
}

// =============================================================================
// PRESET HANDLERS
// =============================================================================

/// List presets, flagging the ones the query string's state matches.
pub async fn presets_handler(RawQuery(raw): RawQuery) -> impl IntoResponse {
    let query_state = decode_state(raw);
    let presets = PRESETS
        .iter()
        .map(|p| PresetJson::new(p, p.is_active(&query_state)))
        .collect();

    (StatusCode::OK, Json(PresetsResponse { presets }))
}

/// Apply or toggle off a preset on the query string's state.
pub async fn toggle_preset_handler(
    Path(id): Path<String>,
    RawQuery(raw): RawQuery,
) -> impl IntoResponse {
    let Some(preset) = preset::find(&id) else {
        let error = ExplorerError::UnknownPreset(id.clone());
        return (
            error_status(&error),
            Json(PresetToggleResponse::error(id, error.to_string())),
        );
    };

    let mut query_state = decode_state(raw);
    let active = preset.apply(&mut query_state);
    (
        StatusCode::OK,
        Json(PresetToggleResponse::success(
            id,
            active,
            url::encode(&query_state),
        )),
    )
}

// =============================================================================
// STATS HANDLER
// =============================================================================

/// Catalog and registry counters.
pub async fn stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.registry.read().await;

    let response = StatsResponse {
        subjects: state.catalog.len(),
        categories: state.catalog.category_counts(),
        statuses: registry
            .counts()
            .into_iter()
            .map(|(status, count)| (status.to_string(), count))
            .collect(),
        pending_writes: registry.pending_count(),
    };

    (StatusCode::OK, Json(response))
}
