//! OpenSASE Print Shop - custom 3D-print requests and delivery pricing

use std::sync::Arc;

use anyhow::Result;
use opensase_printshop::adapters::{
    AnonymousIdentityProvider, LogEventPublisher, NatsEventPublisher, UnconfiguredObjectStorage, UnconfiguredPaymentGateway,
};
use opensase_printshop::config::AppConfig;
use opensase_printshop::http::{router, AppState};
use opensase_printshop::ports::EventPublisher;
use opensase_printshop::{store, CheckoutService, PrintRequestReconciler};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let config = AppConfig::from_env()?;
    let (requests, catalog) = store::init_storage(&config).await?;

    let events: Arc<dyn EventPublisher> = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Arc::new(NatsEventPublisher::new(client, config.subject_prefix.clone())),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable; events will only be logged");
                Arc::new(LogEventPublisher)
            }
        },
        None => Arc::new(LogEventPublisher),
    };

    let reconciler = Arc::new(
        PrintRequestReconciler::new(requests, catalog.clone())
            .with_storage(Arc::new(UnconfiguredObjectStorage))
            .with_identity(Arc::new(AnonymousIdentityProvider))
            .with_events(events)
            .with_currency(config.currency.clone()),
    );
    let checkout = Arc::new(CheckoutService::new(reconciler.clone(), catalog, Arc::new(UnconfiguredPaymentGateway)));
    let app = router(AppState { reconciler, checkout });

    tracing::info!("🚀 OpenSASE Print Shop listening on {}", config.bind_address());
    axum::serve(tokio::net::TcpListener::bind(config.bind_address()).await?, app).await?;
    Ok(())
}
