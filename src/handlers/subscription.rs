use crate::{
    error::GateError,
    models::{ApiResponse, CheckResult, PaymentInstructions, Subscription},
    services::{PaymentVerifier, PurchaseTerms, SubscriptionStore},
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<PaymentVerifier>,
    pub store: Arc<dyn SubscriptionStore>,
    pub terms: PurchaseTerms,
    pub receiving_address: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(super::health_check))
        .route("/stats", get(super::get_stats))
        .route(
            "/api/subscriptions/:user_id",
            get(get_subscription).delete(cancel_subscription),
        )
        .route("/api/subscriptions/:user_id/intents", post(create_intent))
        .route("/api/subscriptions/:user_id/check", post(check_payment))
        .with_state(state)
}

pub async fn create_intent(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Json<ApiResponse<PaymentInstructions>> {
    let intent = state.verifier.start_purchase(user_id, &state.terms).await;
    Json(ApiResponse::ok(PaymentInstructions::new(
        &intent,
        &state.receiving_address,
    )))
}

pub async fn check_payment(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<CheckResult>>, GateError> {
    let outcome = state.verifier.check_payment(user_id).await?;

    Ok(Json(ApiResponse::ok(CheckResult {
        outcome: outcome.code().to_string(),
        message: outcome.user_message(),
        subscription: outcome.subscription().cloned(),
    })))
}

pub async fn get_subscription(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<Subscription>>, GateError> {
    let subscription = state
        .store
        .get_active_subscription(user_id)
        .await?
        .ok_or(GateError::SubscriptionNotFound(user_id))?;
    Ok(Json(ApiResponse::ok(subscription)))
}

pub async fn cancel_subscription(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<Subscription>>, GateError> {
    let subscription = state
        .store
        .cancel_subscription(user_id)
        .await?
        .ok_or(GateError::SubscriptionNotFound(user_id))?;

    tracing::info!("Subscription cancelled for user {}", user_id);
    Ok(Json(ApiResponse::ok(subscription)))
}
