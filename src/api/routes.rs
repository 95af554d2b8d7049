use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::geo::IpGeolocator;
use crate::rows::RowRegistry;

use super::handlers;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RowRegistry>,
    pub geolocator: Arc<dyn IpGeolocator>,
    pub metrics_handle: PrometheusHandle,
}

async fn metrics_handler(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> String {
    state.metrics_handle.render()
}

pub fn create_router(
    registry: Arc<RowRegistry>,
    geolocator: Arc<dyn IpGeolocator>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let state = AppState {
        registry,
        geolocator,
        metrics_handle,
    };

    let api_routes = Router::new()
        .route("/lookup/{ip}", get(handlers::lookup_address))
        .route("/rows", get(handlers::list_rows).post(handlers::add_row))
        .route(
            "/rows/{id}",
            get(handlers::get_row).delete(handlers::delete_row),
        )
        .route("/rows/{id}/address", put(handlers::submit_address))
        .route("/rows/{id}/clear-error", post(handlers::clear_error));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(metrics_handler))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
