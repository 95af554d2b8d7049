use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::rows::RowId;
use crate::validation::parse_ip;

use super::dto::{
    HealthResponse, LookupResponse, RowResponse, RowsResponse, SubmitAddressRequest,
};
use super::error::AppError;
use super::routes::AppState;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}

/// Validate and resolve a single address without touching any row state.
pub async fn lookup_address(
    State(state): State<AppState>,
    Path(ip): Path<String>,
) -> Result<Json<LookupResponse>, AppError> {
    let ip = parse_ip(&ip)?;
    let info = state.geolocator.lookup(ip).await?;
    Ok(Json(info.into()))
}

pub async fn add_row(State(state): State<AppState>) -> Result<Json<RowResponse>, AppError> {
    let id = state.registry.add_row().await;
    row_response(&state, id).await
}

pub async fn list_rows(State(state): State<AppState>) -> Json<RowsResponse> {
    let rows = state
        .registry
        .views()
        .await
        .into_iter()
        .map(RowResponse::from)
        .collect();
    Json(RowsResponse { rows })
}

pub async fn get_row(
    State(state): State<AppState>,
    Path(id): Path<RowId>,
) -> Result<Json<RowResponse>, AppError> {
    row_response(&state, id).await
}

/// The blur event: validate the value and, when well-formed, look it up.
pub async fn submit_address(
    State(state): State<AppState>,
    Path(id): Path<RowId>,
    Json(request): Json<SubmitAddressRequest>,
) -> Result<Json<RowResponse>, AppError> {
    if !state.registry.submit(id, &request.address).await {
        return Err(not_found(id));
    }
    row_response(&state, id).await
}

/// The edit event: clear the row's validation error only.
pub async fn clear_error(
    State(state): State<AppState>,
    Path(id): Path<RowId>,
) -> Result<Json<RowResponse>, AppError> {
    if !state.registry.clear_validation_error(id).await {
        return Err(not_found(id));
    }
    row_response(&state, id).await
}

pub async fn delete_row(
    State(state): State<AppState>,
    Path(id): Path<RowId>,
) -> Result<StatusCode, AppError> {
    if !state.registry.remove_row(id).await {
        return Err(not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn row_response(state: &AppState, id: RowId) -> Result<Json<RowResponse>, AppError> {
    state
        .registry
        .view(id)
        .await
        .map(|view| Json(view.into()))
        .ok_or_else(|| not_found(id))
}

fn not_found(id: RowId) -> AppError {
    AppError::NotFound(format!("Row not found: {}", id))
}
