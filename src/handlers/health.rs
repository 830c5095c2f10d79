use crate::{
    handlers::AppState,
    models::{HealthStatus, Stats},
};
use axum::{extract::State, Json};
use chrono::Utc;

pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    let store_ok = state.store.ping().await;

    Json(HealthStatus {
        status: if store_ok { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: store_ok,
        checks_in_flight: state.verifier.guard().in_flight(),
        uptime_seconds: state.verifier.stats().uptime_seconds(),
        timestamp: Utc::now(),
    })
}

pub async fn get_stats(State(state): State<AppState>) -> Json<Stats> {
    Json(state.verifier.stats().snapshot())
}
