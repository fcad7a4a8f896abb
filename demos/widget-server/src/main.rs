mod widgets;

use routecraft::middleware::RateLimiter;
use routecraft::prelude::*;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use widgets::{WidgetController, WidgetStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("widget_server=debug,routecraft=debug,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_service(&ConfigService::from_env_file("config.env"))?;
    tracing::info!("Starting widget server in {} mode", config.environment);

    let limiter = RateLimiter::new(config.rate_limit.clone());
    let _sweeper = limiter.spawn_sweeper();

    let store = Arc::new(WidgetStore::default());
    let router = SharedRouter::builder()
        .use_global(Arc::new(limiter))
        .use_global(Arc::new(ParameterSanitizer::new()))
        .controller(WidgetController::base_path(), Arc::new(WidgetController::new(store)))
        .build()?;

    for (path, method) in router.routes() {
        tracing::info!("Route {} {}", method, path);
    }

    let app: Router = router
        .into_axum(Arc::new(GlobalErrorFilter::new(config.environment)), config.body_limit)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
