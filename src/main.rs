use anyhow::Result;
use std::sync::Arc;
use sub_gate::{
    config::Config,
    handlers::{router, AppState},
    services::*,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!("Starting sub-gate v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {:?}", config.environment);

    // Initialize collaborators
    let store: Arc<dyn SubscriptionStore> = match &config.redis_url {
        Some(url) => match RedisSubscriptionStore::connect(url).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::warn!("Redis connection failed: {}, using memory store only", e);
                Arc::new(InMemorySubscriptionStore::new())
            }
        },
        None => {
            tracing::warn!("REDIS_URL not set, subscriptions are kept in memory");
            Arc::new(InMemorySubscriptionStore::new())
        }
    };

    let messenger: Arc<dyn Messenger> = match &config.telegram_bot_token {
        Some(token) => Arc::new(TelegramMessenger::new(
            &config.telegram_api_url,
            token.clone(),
        )),
        None => {
            tracing::warn!("TELEGRAM_BOT_TOKEN not set, onboarding messages are only logged");
            Arc::new(LoggingMessenger)
        }
    };

    let fetcher = Arc::new(TonApiFetcher::new(
        &config.tonapi_base_url,
        config.tonapi_key.clone(),
        &config.receiving_address,
        config.tonapi_timeout,
    )?);

    // Initialize verification engine
    let registry = Arc::new(PaymentIntentRegistry::new(config.reference_prefix.clone()));
    let matcher = PaymentMatcher::new(config.jetton_master_address.clone(), config.reference_match);
    let retry = RetryController::new(fetcher, matcher, registry.clone(), config.retry_policy());
    let activator = SubscriptionActivator::new(
        store.clone(),
        registry.clone(),
        messenger,
        config.subscription_days,
    );
    let verifier = Arc::new(PaymentVerifier::new(
        registry,
        retry,
        activator,
        Arc::new(VerificationStats::new()),
        config.run_deadline,
    ));

    let terms = PurchaseTerms {
        native_amount: config.pricing.native_amount()?,
        token_amount: config.pricing.token_amount()?,
        token_contract_address: config.jetton_master_address.clone(),
    };
    tracing::info!(
        "Subscription price: {} nanoTON or {} jetton units ({} days)",
        terms.native_amount,
        terms.token_amount,
        config.subscription_days
    );

    let app = router(AppState {
        verifier,
        store,
        terms,
        receiving_address: config.receiving_address.clone(),
    })
    .layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::default().include_headers(true)),
    )
    .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl+c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down gracefully...");
}
